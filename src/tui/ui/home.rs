//! Home view: public menu and clinician entry points.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};

use super::render_header;
use crate::tui::styles::ClinicTheme;

/// What the home screen shows besides the menu.
#[derive(Debug, Clone, Default)]
pub struct HomeState {
    pub clinic_name: String,
    pub patient_count: usize,
    /// Logged-in doctor, if any
    pub doctor: Option<String>,
}

pub fn render_home(f: &mut Frame, area: Rect, state: &HomeState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(3), Constraint::Min(0)])
        .split(area);

    render_header(f, chunks[0], &state.clinic_name, "Obstructive sleep apnea screening");

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(chunks[1]);

    render_patient_menu(f, columns[0], state);
    render_doctor_menu(f, columns[1], state);
}

fn menu_line(key: &'static str, desc: &'static str) -> Line<'static> {
    Line::from(vec![
        Span::styled(format!("[{key}] "), ClinicTheme::key_hint()),
        Span::styled(desc, ClinicTheme::key_desc()),
    ])
}

fn render_patient_menu(f: &mut Frame, area: Rect, state: &HomeState) {
    let lines = vec![
        menu_line("I", "Take the STOP-BANG screening"),
        menu_line("F", "Find my result by file number"),
        Line::from(""),
        Line::from(vec![
            Span::styled("Screenings on file: ", ClinicTheme::text_secondary()),
            Span::styled(state.patient_count.to_string(), ClinicTheme::text()),
        ]),
        Line::from(""),
        menu_line("Q", "Quit"),
    ];

    let block = Block::default()
        .title(Span::styled(" Patients ", ClinicTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn render_doctor_menu(f: &mut Frame, area: Rect, state: &HomeState) {
    let lines = match &state.doctor {
        Some(doctor) => vec![
            Line::from(vec![
                Span::styled("Signed in as ", ClinicTheme::text_secondary()),
                Span::styled(doctor.clone(), ClinicTheme::focused()),
            ]),
            Line::from(""),
            menu_line("D", "Open patient console"),
            menu_line("O", "Sign out"),
        ],
        None => vec![
            menu_line("L", "Doctor login"),
            menu_line("R", "Register as doctor"),
            menu_line("P", "Reset password with recovery PIN"),
        ],
    };

    let block = Block::default()
        .title(Span::styled(" Doctors ", ClinicTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicTheme::border());

    f.render_widget(Paragraph::new(lines).block(block), area);
}
