//! Statistics view: risk tier and sex breakdown of a doctor's cohort.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use super::{key_hints, render_header};
use crate::application::CohortStatistics;
use crate::domain::{RiskTier, Sex};
use crate::tui::styles::ClinicTheme;

pub fn render_statistics(f: &mut Frame, area: Rect, stats: &CohortStatistics) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    let subtitle = format!("{} patients of {}", stats.total(), stats.doctor);
    render_header(f, chunks[0], "Cohort Statistics", &subtitle);

    if stats.total() == 0 {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No assigned patients yet.",
            ClinicTheme::text_muted(),
        )))
        .block(
            Block::default()
                .borders(Borders::ALL)
                .border_style(ClinicTheme::border()),
        );
        f.render_widget(empty, chunks[1]);
    } else {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
            .margin(1)
            .split(chunks[1]);

        let tiers: Vec<_> = RiskTier::ALL
            .iter()
            .map(|&tier| {
                (
                    tier.description().to_string(),
                    stats.counts.tier(tier),
                    stats.tier_share(tier),
                    ClinicTheme::risk_tier(tier),
                )
            })
            .collect();
        render_gauges(f, columns[0], " Risk tiers ", &tiers);

        let sexes: Vec<_> = [Some(Sex::Male), Some(Sex::Female), None]
            .into_iter()
            .map(|sex| {
                let (label, count) = match sex {
                    Some(Sex::Male) => ("Male", stats.counts.male),
                    Some(Sex::Female) => ("Female", stats.counts.female),
                    None => ("Not recorded", stats.counts.unspecified_sex),
                };
                (label.to_string(), count, stats.sex_share(sex), ClinicTheme::focused())
            })
            .collect();
        render_gauges(f, columns[1], " Sex ", &sexes);
    }

    let footer = Paragraph::new(key_hints(&[("Esc", "Back to console")])).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicTheme::border()),
    );
    f.render_widget(footer, chunks[2]);
}

fn render_gauges(
    f: &mut Frame,
    area: Rect,
    title: &'static str,
    rows: &[(String, usize, f64, ratatui::style::Style)],
) {
    let block = Block::default()
        .title(Span::styled(title, ClinicTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicTheme::border());
    let inner = block.inner(area);
    f.render_widget(block, area);

    let constraints: Vec<Constraint> = rows
        .iter()
        .map(|_| Constraint::Length(4))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .margin(1)
        .split(inner);

    for (i, (label, count, share, style)) in rows.iter().enumerate() {
        let gauge = Gauge::default()
            .block(
                Block::default()
                    .title(Span::styled(format!(" {label} "), ClinicTheme::text_secondary()))
                    .borders(Borders::ALL)
                    .border_style(ClinicTheme::border()),
            )
            .gauge_style(*style)
            .ratio(share.clamp(0.0, 1.0))
            .label(format!("{count} ({:.0}%)", share * 100.0));
        f.render_widget(gauge, chunks[i]);
    }
}
