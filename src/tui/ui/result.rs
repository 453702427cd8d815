//! Assessment result view.

use std::path::PathBuf;

use ratatui::{
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Gauge, Paragraph},
    Frame,
};

use super::{key_hints, render_header};
use crate::domain::screening::MAX_STOP_BANG_SCORE as MAX_SCORE;
use crate::domain::{Criterion, PatientRecord, Questionnaire};
use crate::tui::styles::ClinicTheme;

pub struct ResultState {
    pub record: PatientRecord,
    /// Where the last exported pass was written
    pub pass_path: Option<PathBuf>,
}

impl ResultState {
    #[must_use]
    pub fn new(record: PatientRecord) -> Self {
        Self {
            record,
            pass_path: None,
        }
    }
}

pub fn render_result(f: &mut Frame, area: Rect, state: &ResultState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Content
            Constraint::Length(3), // Footer
        ])
        .split(area);

    let title = format!("File {}", state.record.id());
    render_header(f, chunks[0], "Screening Result", &title);

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(chunks[1]);

    render_details(f, columns[0], &state.record);
    render_score(f, columns[1], &state.record);

    let footer = match &state.pass_path {
        Some(path) => Line::from(vec![
            Span::styled("Pass saved to ", ClinicTheme::success()),
            Span::styled(path.display().to_string(), ClinicTheme::text()),
        ]),
        None => key_hints(&[("P", "Export pass (PDF)"), ("Esc", "Back")]),
    };
    let footer = Paragraph::new(footer).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicTheme::border()),
    );
    f.render_widget(footer, chunks[2]);
}

fn detail(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("{label}: "), ClinicTheme::text_secondary()),
        Span::styled(value, ClinicTheme::text()),
    ])
}

fn render_details(f: &mut Frame, area: Rect, record: &PatientRecord) {
    let intake = record.intake();
    let dash = || "-".to_string();

    let mut lines = vec![
        detail("Name", Some(record.full_name()).filter(|n| !n.is_empty()).unwrap_or_else(dash)),
        detail("Age", intake.age.map(|a| format!("{a} years")).unwrap_or_else(dash)),
        detail("Sex", intake.sex.map(|s| s.label().to_string()).unwrap_or_else(dash)),
        detail("Doctor", record.assigned_doctor().unwrap_or("Unassigned").to_string()),
        Line::from(""),
        detail("Height", intake.height_m.map(|h| format!("{h:.2} m")).unwrap_or_else(dash)),
        detail("Weight", intake.weight_kg.map(|w| format!("{w:.1} kg")).unwrap_or_else(dash)),
        detail(
            "Neck",
            intake
                .neck_circumference_cm
                .map(|n| format!("{n:.1} cm"))
                .unwrap_or_else(dash),
        ),
        detail("BMI", record.bmi().map(|b| format!("{b:.2}")).unwrap_or_else(dash)),
        Line::from(""),
    ];

    for (label, answer) in Questionnaire::LABELS
        .iter()
        .zip(intake.questionnaire.answers())
    {
        let answer = match answer {
            Some(true) => "Yes",
            Some(false) => "No",
            None => "-",
        };
        lines.push(detail(label, answer.to_string()));
    }

    let block = Block::default()
        .title(Span::styled(" Patient ", ClinicTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicTheme::border());
    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_score(f: &mut Frame, area: Rect, record: &PatientRecord) {
    let tier = record.risk_tier();
    let block = Block::default()
        .title(Span::styled(" STOP-BANG ", ClinicTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicTheme::risk_tier(tier));

    let inner = block.inner(area);
    f.render_widget(block, area);

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Tier
            Constraint::Length(3), // Score gauge
            Constraint::Min(0),    // Criteria
        ])
        .margin(1)
        .split(inner);

    let headline = Paragraph::new(vec![
        Line::from(Span::styled(tier.to_string(), ClinicTheme::risk_tier(tier))),
        Line::from(Span::styled(tier.description(), ClinicTheme::text())),
    ])
    .alignment(Alignment::Center);
    f.render_widget(headline, chunks[0]);

    let score = record.stop_bang_score();
    let gauge = Gauge::default()
        .gauge_style(ClinicTheme::risk_tier(tier))
        .ratio(f64::from(score) / f64::from(MAX_SCORE))
        .label(format!("{score} / {MAX_SCORE}"));
    f.render_widget(gauge, chunks[1]);

    let mut lines = vec![Line::from(Span::styled(
        "Criteria met",
        ClinicTheme::text_secondary(),
    ))];
    for criterion in Criterion::ALL {
        let met = record.assessment().criteria().contains(&criterion);
        let (mark, style) = if met {
            ("■ ", ClinicTheme::risk_tier(tier))
        } else {
            ("□ ", ClinicTheme::text_muted())
        };
        lines.push(Line::from(vec![
            Span::styled(mark, style),
            Span::styled(criterion.label(), style),
        ]));
    }
    f.render_widget(Paragraph::new(lines), chunks[2]);
}
