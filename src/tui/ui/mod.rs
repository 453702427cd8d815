//! UI module: view components for the TUI.

pub mod form;
pub mod home;
pub mod patients;
pub mod result;
pub mod statistics;

use ratatui::{
    layout::Rect,
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph, Wrap},
    Frame,
};

use crate::tui::styles::ClinicTheme;

/// One-line feedback shown under the active screen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusMessage {
    pub text: String,
    pub is_error: bool,
}

impl StatusMessage {
    pub fn info(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: false,
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            is_error: true,
        }
    }
}

pub fn render_disclaimer(f: &mut Frame, area: Rect, status: Option<&StatusMessage>) {
    let mut text = Vec::with_capacity(2);
    if let Some(status) = status {
        let (marker, style) = if status.is_error {
            ("! ", ClinicTheme::danger())
        } else {
            ("", ClinicTheme::success())
        };
        text.push(Line::from(vec![
            Span::styled(marker, style),
            Span::styled(status.text.clone(), style),
        ]));
    }
    text.push(Line::from(Span::styled(
        "Screening aid only: STOP-BANG estimates OSA risk and does not replace a sleep study or clinical evaluation.",
        ClinicTheme::text_muted(),
    )));

    let block = Block::default()
        .borders(Borders::TOP)
        .border_style(ClinicTheme::border());

    let p = Paragraph::new(text).block(block).wrap(Wrap { trim: true });

    f.render_widget(p, area);
}

/// `[key] description` pairs for footers and menus.
pub fn key_hints(pairs: &[(&'static str, &'static str)]) -> Line<'static> {
    let mut spans = Vec::with_capacity(pairs.len() * 2);
    for (key, desc) in pairs {
        spans.push(Span::styled(format!("[{key}] "), ClinicTheme::key_hint()));
        spans.push(Span::styled(format!("{desc}  "), ClinicTheme::key_desc()));
    }
    Line::from(spans)
}

/// Title bar shared by every screen.
pub fn render_header(f: &mut Frame, area: Rect, title: &str, subtitle: &str) {
    let header = Paragraph::new(Line::from(vec![
        Span::raw(" "),
        Span::styled(title.to_string(), ClinicTheme::title()),
        Span::styled(" │ ", ClinicTheme::text_muted()),
        Span::styled(subtitle.to_string(), ClinicTheme::text_secondary()),
    ]))
    .block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(ClinicTheme::border()),
    );

    f.render_widget(header, area);
}
