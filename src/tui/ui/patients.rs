//! Doctor console: searchable, paged list of assigned patients.

use chrono::Local;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Cell, Paragraph, Row, Table, TableState},
    Frame,
};

use super::{key_hints, render_header};
use crate::domain::PatientRecord;
use crate::ports::PatientPage;
use crate::tui::styles::ClinicTheme;

pub struct PatientListState {
    pub doctor: String,
    pub query: String,
    /// Typing goes to the search box instead of triggering shortcuts
    pub editing_query: bool,
    pub page: PatientPage,
    pub selected: usize,
    /// Waiting for `y` to confirm deleting the selected patient
    pub confirm_delete: bool,
}

impl PatientListState {
    #[must_use]
    pub fn new(doctor: impl Into<String>, page_size: usize) -> Self {
        Self {
            doctor: doctor.into(),
            query: String::new(),
            editing_query: false,
            page: PatientPage::empty(page_size),
            selected: 0,
            confirm_delete: false,
        }
    }

    /// Replace the visible page, keeping the cursor in range.
    pub fn set_page(&mut self, page: PatientPage) {
        self.page = page;
        if self.selected >= self.page.items.len() {
            self.selected = self.page.items.len().saturating_sub(1);
        }
        self.confirm_delete = false;
    }

    pub fn select_next(&mut self) {
        if self.selected + 1 < self.page.items.len() {
            self.selected += 1;
        }
        self.confirm_delete = false;
    }

    pub fn select_prev(&mut self) {
        self.selected = self.selected.saturating_sub(1);
        self.confirm_delete = false;
    }

    #[must_use]
    pub fn selected_record(&self) -> Option<&PatientRecord> {
        self.page.items.get(self.selected)
    }
}

pub fn render_patient_list(f: &mut Frame, area: Rect, state: &PatientListState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Length(3), // Search box
            Constraint::Min(0),    // Table
            Constraint::Length(3), // Footer
        ])
        .split(area);

    render_header(f, chunks[0], "Patient Console", &state.doctor);
    render_search_box(f, chunks[1], state);
    render_table(f, chunks[2], state);
    render_list_footer(f, chunks[3], state);
}

fn render_search_box(f: &mut Frame, area: Rect, state: &PatientListState) {
    let border_style = if state.editing_query {
        ClinicTheme::border_focused()
    } else {
        ClinicTheme::border()
    };

    let text = if state.query.is_empty() && !state.editing_query {
        Span::styled("file number, name or surname", ClinicTheme::text_muted())
    } else {
        Span::styled(state.query.clone(), ClinicTheme::text())
    };
    let mut spans = vec![Span::raw(" "), text];
    if state.editing_query {
        spans.push(Span::styled("▌", ClinicTheme::cursor()));
    }

    let search = Paragraph::new(Line::from(spans)).block(
        Block::default()
            .title(Span::styled(" Search ", ClinicTheme::subtitle()))
            .borders(Borders::ALL)
            .border_style(border_style),
    );
    f.render_widget(search, area);
}

fn render_table(f: &mut Frame, area: Rect, state: &PatientListState) {
    let page = &state.page;
    let title = format!(
        " Patients {} (page {} of {}) ",
        page.total_count,
        page.page_number(),
        page.page_count()
    );
    let block = Block::default()
        .title(Span::styled(title, ClinicTheme::subtitle()))
        .borders(Borders::ALL)
        .border_style(ClinicTheme::border());

    if page.items.is_empty() {
        let empty = Paragraph::new(Line::from(Span::styled(
            "No patients match. Press [A] to add one.",
            ClinicTheme::text_muted(),
        )))
        .block(block);
        f.render_widget(empty, area);
        return;
    }

    let header = Row::new(["File", "Name", "Age", "BMI", "Score", "Risk", "Updated"])
        .style(ClinicTheme::header());

    let rows = page.items.iter().map(|record| {
        let tier = record.risk_tier();
        Row::new(vec![
            Cell::from(record.id().to_string()),
            Cell::from(record.full_name()),
            Cell::from(record.intake().age.map(|a| a.to_string()).unwrap_or_default()),
            Cell::from(record.bmi().map(|b| format!("{b:.2}")).unwrap_or_else(|| "-".to_string())),
            Cell::from(record.stop_bang_score().to_string()),
            Cell::from(Span::styled(tier.to_string(), ClinicTheme::risk_tier(tier))),
            Cell::from(
                record
                    .updated_at()
                    .with_timezone(&Local)
                    .format("%Y-%m-%d %H:%M")
                    .to_string(),
            ),
        ])
    });

    let table = Table::new(
        rows,
        [
            Constraint::Length(20),
            Constraint::Min(16),
            Constraint::Length(4),
            Constraint::Length(6),
            Constraint::Length(5),
            Constraint::Length(12),
            Constraint::Length(16),
        ],
    )
    .header(header)
    .block(block)
    .row_highlight_style(ClinicTheme::selected());

    let mut table_state = TableState::default().with_selected(Some(state.selected));
    f.render_stateful_widget(table, area, &mut table_state);
}

fn render_list_footer(f: &mut Frame, area: Rect, state: &PatientListState) {
    let content = if state.confirm_delete {
        let id = state.selected_record().map(PatientRecord::id).unwrap_or_default();
        Line::from(vec![
            Span::styled(format!("Delete patient {id}? "), ClinicTheme::danger()),
            Span::styled("[Y] ", ClinicTheme::key_hint()),
            Span::styled("Confirm  ", ClinicTheme::key_desc()),
            Span::styled("[any key] ", ClinicTheme::key_hint()),
            Span::styled("Cancel", ClinicTheme::key_desc()),
        ])
    } else if state.editing_query {
        key_hints(&[("Enter", "Search"), ("Esc", "Stop typing")])
    } else {
        key_hints(&[
            ("/", "Search"),
            ("←→", "Page"),
            ("A", "Add"),
            ("E", "Edit"),
            ("V", "View"),
            ("X", "Delete"),
            ("P", "Pass"),
            ("S", "Statistics"),
            ("O", "Sign out"),
            ("Esc", "Home"),
        ])
    };

    let footer = Paragraph::new(content).block(
        Block::default()
            .borders(Borders::TOP)
            .border_style(ClinicTheme::border()),
    );
    f.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PatientIntake, Questionnaire};

    fn record(id: &str) -> PatientRecord {
        let mut intake = PatientIntake::new(id);
        intake.questionnaire = Questionnaire::answered(false, false, false, false);
        PatientRecord::assess(intake).expect("Should assess")
    }

    #[test]
    fn test_selection_stays_in_page() {
        let mut state = PatientListState::new("dr.a", 15);
        state.set_page(PatientPage::new(vec![record("A"), record("B")], 2, 0, 15));

        state.select_prev();
        assert_eq!(state.selected, 0);
        state.select_next();
        state.select_next();
        assert_eq!(state.selected, 1);
        assert_eq!(state.selected_record().map(PatientRecord::id), Some("B"));
    }

    #[test]
    fn test_smaller_page_clamps_selection() {
        let mut state = PatientListState::new("dr.a", 15);
        state.set_page(PatientPage::new(vec![record("A"), record("B")], 2, 0, 15));
        state.selected = 1;
        state.confirm_delete = true;

        state.set_page(PatientPage::new(vec![record("A")], 1, 0, 15));
        assert_eq!(state.selected, 0);
        assert!(!state.confirm_delete);

        state.set_page(PatientPage::empty(15));
        assert!(state.selected_record().is_none());
    }
}
