//! Color palette and preset styles for the terminal front end.
//!
//! Night-clinic palette: indigo accents on a dark slate background, with the
//! three risk tiers mapped to green, amber and red.

use ratatui::style::{Color, Modifier, Style};

use crate::domain::RiskTier;

/// Palette and preset styles.
pub struct ClinicTheme;

impl ClinicTheme {
    /// Indigo accent
    pub const ACCENT: Color = Color::Rgb(99, 102, 241); // #6366F1

    pub const ACCENT_LIGHT: Color = Color::Rgb(165, 180, 252); // #A5B4FC

    pub const ACCENT_DARK: Color = Color::Rgb(55, 48, 163); // #3730A3

    pub const BORDER: Color = Color::Rgb(100, 116, 139); // #64748B

    pub const LOW: Color = Color::Rgb(34, 197, 94); // #22C55E
    pub const INTERMEDIATE: Color = Color::Rgb(245, 158, 11); // #F59E0B
    pub const HIGH: Color = Color::Rgb(239, 68, 68); // #EF4444

    pub const BG_DARK: Color = Color::Rgb(15, 23, 42); // #0F172A

    pub const TEXT_PRIMARY: Color = Color::Rgb(241, 245, 249); // #F1F5F9
    pub const TEXT_SECONDARY: Color = Color::Rgb(148, 163, 184); // #94A3B8
    pub const TEXT_MUTED: Color = Color::Rgb(100, 116, 139); // #64748B

    #[must_use]
    pub fn title() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn subtitle() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn text() -> Style {
        Style::default().fg(Self::TEXT_PRIMARY)
    }

    #[must_use]
    pub fn text_secondary() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    #[must_use]
    pub fn text_muted() -> Style {
        Style::default().fg(Self::TEXT_MUTED)
    }

    /// Confirmation messages
    #[must_use]
    pub fn success() -> Style {
        Style::default().fg(Self::LOW)
    }

    /// Errors and destructive prompts
    #[must_use]
    pub fn danger() -> Style {
        Style::default().fg(Self::HIGH)
    }

    /// Highlighted table row
    #[must_use]
    pub fn selected() -> Style {
        Style::default()
            .fg(Self::BG_DARK)
            .bg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn focused() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn cursor() -> Style {
        Style::default().fg(Self::ACCENT_LIGHT)
    }

    #[must_use]
    pub fn border() -> Style {
        Style::default().fg(Self::BORDER)
    }

    #[must_use]
    pub fn border_focused() -> Style {
        Style::default().fg(Self::ACCENT)
    }

    /// Table header row
    #[must_use]
    pub fn header() -> Style {
        Style::default()
            .fg(Self::TEXT_PRIMARY)
            .bg(Self::ACCENT_DARK)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_hint() -> Style {
        Style::default()
            .fg(Self::ACCENT_LIGHT)
            .add_modifier(Modifier::BOLD)
    }

    #[must_use]
    pub fn key_desc() -> Style {
        Style::default().fg(Self::TEXT_SECONDARY)
    }

    /// Color coding of a risk tier.
    #[must_use]
    pub fn risk_tier(tier: RiskTier) -> Style {
        let color = match tier {
            RiskTier::Low => Self::LOW,
            RiskTier::Intermediate => Self::INTERMEDIATE,
            RiskTier::High => Self::HIGH,
        };
        Style::default().fg(color).add_modifier(Modifier::BOLD)
    }
}
