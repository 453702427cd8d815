//! Main TUI application state machine.
//!
//! Handles screen navigation, key input and the calls into the
//! application services. Every service error ends up as a message on the
//! status line or in the open form; none of them stops the program.

use std::io;
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Local;
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind, KeyModifiers},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
    Terminal,
};

use crate::adapters::pdf::PdfPassRenderer;
use crate::adapters::sqlite::SqliteStorage;
use crate::application::{
    AnalyticsService, CohortStatistics, DoctorDirectory, PassService, PatientService,
};
use crate::config::AppConfig;
use crate::domain::{DoctorAccess, PatientRecord};
use crate::ApneaError;

use super::ui::{
    form::{render_form, FormKind, FormState},
    home::{render_home, HomeState},
    patients::{render_patient_list, PatientListState},
    render_disclaimer,
    result::{render_result, ResultState},
    statistics::render_statistics,
    StatusMessage,
};

/// Current screen/view in the application
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Screen {
    Home,
    Form,
    Result,
    Patients,
    Statistics,
}

/// Main application state
pub struct App {
    screen: Screen,
    should_quit: bool,
    config: AppConfig,

    patients: PatientService<SqliteStorage>,
    directory: DoctorDirectory<SqliteStorage>,
    passes: PassService<SqliteStorage, PdfPassRenderer>,
    analytics: AnalyticsService<SqliteStorage>,

    /// Logged-in doctor
    session: Option<DoctorAccess>,

    home_state: HomeState,
    form_state: FormState,
    result_state: Option<ResultState>,
    /// Where Esc leads from the result view
    result_origin: Screen,
    list_state: Option<PatientListState>,
    statistics: Option<CohortStatistics>,
    status: Option<StatusMessage>,
}

impl App {
    /// Open the configured database and build the services.
    ///
    /// # Errors
    /// Returns error if the database cannot be opened.
    pub fn new() -> Result<Self> {
        let config = AppConfig::from_env();
        let storage = Arc::new(SqliteStorage::new(&config.db_path)?);
        tracing::info!(db = %config.db_path.display(), "Database opened");
        Ok(Self::with_dependencies(config, storage))
    }

    /// Build the application over an existing storage adapter.
    pub fn with_dependencies(config: AppConfig, storage: Arc<SqliteStorage>) -> Self {
        let passes = PassService::new(
            Arc::clone(&storage),
            PdfPassRenderer::new(),
            config.clinic_name.clone(),
        );
        let home_state = HomeState {
            clinic_name: config.clinic_name.clone(),
            ..HomeState::default()
        };

        let mut app = Self {
            screen: Screen::Home,
            should_quit: false,
            patients: PatientService::new(Arc::clone(&storage)),
            directory: DoctorDirectory::new(Arc::clone(&storage)),
            analytics: AnalyticsService::new(storage),
            passes,
            config,
            session: None,
            home_state,
            form_state: FormState::new(FormKind::PatientIntake),
            result_state: None,
            result_origin: Screen::Home,
            list_state: None,
            statistics: None,
            status: None,
        };
        app.update_home_state();
        app
    }

    /// Run the main application loop.
    ///
    /// # Errors
    /// Returns error if terminal operations fail.
    pub fn run(&mut self) -> Result<()> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        let result = self.main_loop(&mut terminal);

        // Restore terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        // Nothing typed into a form outlives the session
        self.form_state.clear_sensitive();
        result
    }

    fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<io::Stdout>>) -> Result<()> {
        loop {
            terminal.draw(|f| {
                let chunks = Layout::default()
                    .direction(Direction::Vertical)
                    .constraints([Constraint::Min(0), Constraint::Length(3)])
                    .split(f.area());

                let content_area = chunks[0];
                match self.screen {
                    Screen::Home => render_home(f, content_area, &self.home_state),
                    Screen::Form => render_form(f, content_area, &self.form_state),
                    Screen::Result => {
                        if let Some(state) = &self.result_state {
                            render_result(f, content_area, state);
                        }
                    }
                    Screen::Patients => {
                        if let Some(state) = &self.list_state {
                            render_patient_list(f, content_area, state);
                        }
                    }
                    Screen::Statistics => {
                        if let Some(stats) = &self.statistics {
                            render_statistics(f, content_area, stats);
                        }
                    }
                }

                render_disclaimer(f, chunks[1], self.status.as_ref());
            })?;

            if event::poll(Duration::from_millis(100))? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key(key.code, key.modifiers);
                    }
                }
            }

            if self.should_quit {
                break;
            }
        }

        Ok(())
    }

    fn handle_key(&mut self, key: KeyCode, modifiers: KeyModifiers) {
        if modifiers.contains(KeyModifiers::CONTROL) && matches!(key, KeyCode::Char('q' | 'c')) {
            self.should_quit = true;
            return;
        }

        match self.screen {
            Screen::Home => self.handle_home_key(key),
            Screen::Form => self.handle_form_key(key),
            Screen::Result => self.handle_result_key(key),
            Screen::Patients => self.handle_patients_key(key),
            Screen::Statistics => {
                if matches!(key, KeyCode::Esc | KeyCode::Char('q')) {
                    self.statistics = None;
                    self.screen = Screen::Patients;
                }
            }
        }
    }

    fn handle_home_key(&mut self, key: KeyCode) {
        self.status = None;
        match key {
            KeyCode::Char('i' | 'I') => self.open_form(FormState::new(FormKind::PatientIntake)),
            KeyCode::Char('f' | 'F') => self.open_form(FormState::new(FormKind::PublicLookup)),
            KeyCode::Char('l' | 'L') if self.session.is_none() => {
                self.open_form(FormState::new(FormKind::DoctorLogin));
            }
            KeyCode::Char('r' | 'R') if self.session.is_none() => {
                self.open_form(FormState::new(FormKind::DoctorRegister));
            }
            KeyCode::Char('p' | 'P') if self.session.is_none() => {
                self.open_form(FormState::new(FormKind::PasswordReset));
            }
            KeyCode::Char('d' | 'D') if self.session.is_some() => self.open_console(),
            KeyCode::Char('o' | 'O') if self.session.is_some() => self.logout(),
            KeyCode::Char('q' | 'Q') | KeyCode::Esc => self.should_quit = true,
            _ => {}
        }
    }

    fn handle_form_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Esc => {
                self.form_state.clear_sensitive();
                let back_to_console = matches!(
                    self.form_state.kind,
                    FormKind::NewPatient | FormKind::EditPatient
                ) && self.session.is_some();
                if back_to_console {
                    self.screen = Screen::Patients;
                } else {
                    self.go_home();
                }
            }
            KeyCode::Up | KeyCode::BackTab => self.form_state.prev_field(),
            KeyCode::Down | KeyCode::Tab => self.form_state.next_field(),
            KeyCode::F(2) => self.form_state.load_sample_data(),
            KeyCode::Char(c) => self.form_state.input_char(c),
            KeyCode::Backspace => self.form_state.delete_char(),
            KeyCode::Delete => self.form_state.clear_field(),
            KeyCode::Enter => self.submit_form(),
            _ => {}
        }
    }

    fn handle_result_key(&mut self, key: KeyCode) {
        match key {
            KeyCode::Char('p' | 'P') => {
                let Some(id) = self.result_state.as_ref().map(|s| s.record.id().to_string())
                else {
                    return;
                };
                match self.export_pass(&id) {
                    Ok(path) => {
                        if let Some(state) = self.result_state.as_mut() {
                            state.pass_path = Some(path);
                        }
                    }
                    Err(e) => self.report(&e),
                }
            }
            KeyCode::Esc | KeyCode::Enter | KeyCode::Char('q') => {
                self.result_state = None;
                if self.result_origin == Screen::Patients && self.session.is_some() {
                    self.screen = Screen::Patients;
                    self.refresh_patients();
                } else {
                    self.go_home();
                }
            }
            _ => {}
        }
    }

    fn handle_patients_key(&mut self, key: KeyCode) {
        let Some(list) = self.list_state.as_mut() else {
            self.go_home();
            return;
        };

        if list.confirm_delete {
            list.confirm_delete = false;
            if matches!(key, KeyCode::Char('y' | 'Y')) {
                self.delete_selected();
            }
            return;
        }

        if list.editing_query {
            match key {
                KeyCode::Char(c) => list.query.push(c),
                KeyCode::Backspace => {
                    list.query.pop();
                }
                KeyCode::Enter => {
                    list.editing_query = false;
                    list.page.offset = 0;
                    list.selected = 0;
                    self.refresh_patients();
                }
                KeyCode::Esc => list.editing_query = false,
                _ => {}
            }
            return;
        }

        self.status = None;
        match key {
            KeyCode::Char('/') => list.editing_query = true,
            KeyCode::Up => list.select_prev(),
            KeyCode::Down => list.select_next(),
            KeyCode::Left => {
                if let Some(offset) = list.page.prev_offset() {
                    self.load_page(offset);
                }
            }
            KeyCode::Right => {
                if let Some(offset) = list.page.next_offset() {
                    self.load_page(offset);
                }
            }
            KeyCode::Char('a' | 'A') => {
                let doctor = list.doctor.clone();
                self.open_form(FormState::new_patient(&doctor));
            }
            KeyCode::Char('e' | 'E') => {
                if let Some(record) = list.selected_record() {
                    let form = FormState::edit(record);
                    self.open_form(form);
                }
            }
            KeyCode::Char('v' | 'V') | KeyCode::Enter => {
                if let Some(record) = list.selected_record().cloned() {
                    self.show_result(record, Screen::Patients);
                }
            }
            KeyCode::Char('x' | 'X') => {
                if list.selected_record().is_some() {
                    list.confirm_delete = true;
                }
            }
            KeyCode::Char('p' | 'P') => {
                if let Some(id) = list.selected_record().map(|r| r.id().to_string()) {
                    match self.export_pass(&id) {
                        Ok(path) => {
                            self.status = Some(StatusMessage::info(format!(
                                "Pass saved to {}",
                                path.display()
                            )));
                        }
                        Err(e) => self.report(&e),
                    }
                }
            }
            KeyCode::Char('s' | 'S') => self.open_statistics(),
            KeyCode::Char('o' | 'O') => self.logout(),
            KeyCode::Esc | KeyCode::Char('q') => self.go_home(),
            _ => {}
        }
    }

    fn submit_form(&mut self) {
        let outcome = match self.form_state.kind {
            FormKind::PatientIntake | FormKind::NewPatient | FormKind::EditPatient => {
                self.submit_patient_form()
            }
            FormKind::PublicLookup => self.submit_lookup(),
            FormKind::DoctorLogin => self.submit_login(),
            FormKind::DoctorRegister => self.submit_registration(),
            FormKind::PasswordReset => self.submit_password_reset(),
        };

        if let Err(message) = outcome {
            self.form_state.error_message = Some(message);
        }
    }

    fn submit_patient_form(&mut self) -> std::result::Result<(), String> {
        let intake = self.form_state.to_intake()?;

        let saved = match (self.form_state.kind, &self.session) {
            (FormKind::PatientIntake, _) => self.patients.intake(intake),
            (FormKind::NewPatient, Some(access)) => self.patients.create(access, intake),
            (FormKind::EditPatient, Some(access)) => {
                let id = self.form_state.editing_id.clone().unwrap_or_default();
                self.patients.edit(access, &id, intake)
            }
            _ => return Err("Sign in as a doctor first".to_string()),
        };
        let record = saved.map_err(|e| self.error_text(&e))?;

        let origin = if self.form_state.kind == FormKind::PatientIntake {
            Screen::Home
        } else {
            Screen::Patients
        };
        self.form_state.clear_sensitive();
        self.status = Some(StatusMessage::info("Screening saved"));
        self.show_result(record, origin);
        Ok(())
    }

    fn submit_lookup(&mut self) -> std::result::Result<(), String> {
        let found = self
            .patients
            .find_by_exact_id(self.form_state.value("id"))
            .map_err(|e| self.error_text(&e))?;
        let record = found
            .into_iter()
            .next()
            .ok_or_else(|| "No screening found for that file number".to_string())?;

        self.form_state.clear_sensitive();
        self.show_result(record, Screen::Home);
        Ok(())
    }

    fn submit_login(&mut self) -> std::result::Result<(), String> {
        let access = self
            .directory
            .login(
                self.form_state.value("username"),
                self.form_state.value("password"),
            )
            .map_err(|e| self.error_text(&e))?;

        self.form_state.clear_sensitive();
        self.status = Some(StatusMessage::info(format!("Welcome, {}", access.username())));
        self.session = Some(access);
        self.open_console();
        Ok(())
    }

    fn submit_registration(&mut self) -> std::result::Result<(), String> {
        if self.form_state.value("password") != self.form_state.value("confirm") {
            return Err("Passwords do not match".to_string());
        }
        let account = self
            .directory
            .register(
                self.form_state.value("username"),
                self.form_state.value("password"),
                self.form_state.value("pin"),
            )
            .map_err(|e| self.error_text(&e))?;

        self.form_state.clear_sensitive();
        self.go_home();
        self.status = Some(StatusMessage::info(format!(
            "Account {} created. Press [L] to log in",
            account.username
        )));
        Ok(())
    }

    fn submit_password_reset(&mut self) -> std::result::Result<(), String> {
        if self.form_state.value("password") != self.form_state.value("confirm") {
            return Err("Passwords do not match".to_string());
        }
        self.directory
            .reset_password(
                self.form_state.value("username"),
                self.form_state.value("pin"),
                self.form_state.value("password"),
            )
            .map_err(|e| self.error_text(&e))?;

        self.form_state.clear_sensitive();
        self.go_home();
        self.status = Some(StatusMessage::info("Password updated. Press [L] to log in"));
        Ok(())
    }

    fn delete_selected(&mut self) {
        let (Some(access), Some(id)) = (
            self.session.as_ref(),
            self.list_state
                .as_ref()
                .and_then(|l| l.selected_record())
                .map(|r| r.id().to_string()),
        ) else {
            return;
        };

        match self.patients.delete(access, &id) {
            Ok(()) => {
                self.status = Some(StatusMessage::info("Patient deleted"));
                self.refresh_patients();
            }
            Err(e) => self.report(&e),
        }
    }

    fn export_pass(&self, id: &str) -> crate::Result<PathBuf> {
        let pass = self.passes.issue(id, Local::now().date_naive())?;
        pass.write_to(&self.config.pass_dir)
    }

    fn open_form(&mut self, form: FormState) {
        self.form_state.clear_sensitive();
        self.form_state = form;
        self.screen = Screen::Form;
    }

    fn show_result(&mut self, record: PatientRecord, origin: Screen) {
        self.result_state = Some(ResultState::new(record));
        self.result_origin = origin;
        self.screen = Screen::Result;
    }

    fn open_console(&mut self) {
        let Some(access) = &self.session else {
            return;
        };
        if self.list_state.is_none() {
            self.list_state = Some(PatientListState::new(
                access.username(),
                self.config.page_size,
            ));
        }
        self.screen = Screen::Patients;
        self.refresh_patients();
    }

    fn open_statistics(&mut self) {
        let Some(access) = &self.session else {
            return;
        };
        match self.analytics.cohort_statistics(access) {
            Ok(stats) => {
                self.statistics = Some(stats);
                self.screen = Screen::Statistics;
            }
            Err(e) => self.report(&e),
        }
    }

    fn refresh_patients(&mut self) {
        let offset = self.list_state.as_ref().map_or(0, |l| l.page.offset);
        self.load_page(offset);
    }

    fn load_page(&mut self, offset: usize) {
        let (Some(access), Some(list)) = (&self.session, self.list_state.as_mut()) else {
            return;
        };

        let page = self
            .patients
            .search_assigned(access, &list.query, offset, self.config.page_size);
        match page {
            // Deleting the last row of a page leaves it empty; step back.
            Ok(page) if page.items.is_empty() && offset > 0 => {
                let previous = page.prev_offset().unwrap_or(0);
                self.load_page(previous);
            }
            Ok(page) => list.set_page(page),
            Err(e) => self.report(&e),
        }
    }

    fn logout(&mut self) {
        if let Some(access) = self.session.take() {
            tracing::info!(doctor = access.username(), "Doctor signed out");
        }
        self.list_state = None;
        self.statistics = None;
        self.go_home();
        self.status = Some(StatusMessage::info("Signed out"));
    }

    fn go_home(&mut self) {
        self.update_home_state();
        self.screen = Screen::Home;
    }

    fn update_home_state(&mut self) {
        match self.patients.count() {
            Ok(count) => self.home_state.patient_count = count,
            Err(e) => tracing::warn!("Failed to count patients: {e}"),
        }
        self.home_state.doctor = self.session.as_ref().map(|a| a.username().to_string());
    }

    fn error_text(&self, err: &ApneaError) -> String {
        if err.is_fatal() {
            tracing::error!("Operation failed: {err}");
        }
        err.to_string()
    }

    fn report(&mut self, err: &ApneaError) {
        let text = self.error_text(err);
        self.status = Some(StatusMessage::error(text));
    }
}
