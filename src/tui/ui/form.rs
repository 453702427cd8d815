//! Data-entry forms: patient intake, lookup and doctor accounts.
//!
//! Every form is a list of typed fields. Input is filtered per field kind as
//! it is typed; full validation happens in the domain once the form is
//! submitted.

use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    text::{Line, Span},
    widgets::{Block, Borders, Paragraph},
    Frame,
};
use zeroize::Zeroize;

use super::{key_hints, render_header};
use crate::domain::{
    PatientIntake, PatientRecord, Questionnaire, Sex, MAX_ID_LEN, MAX_NAME_LEN,
    MAX_USERNAME_LEN, PIN_LENGTH,
};
use crate::tui::styles::ClinicTheme;

const MAX_SECRET_LEN: usize = 128;
const MAX_NUMBER_LEN: usize = 7;

/// What a field accepts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text { max_len: usize },
    Integer,
    Decimal,
    YesNo,
    Sex,
    /// Masked free text
    Secret,
    /// Masked digits, at most `PIN_LENGTH`
    Pin,
}

#[derive(Debug, Clone)]
pub struct FormField {
    pub key: &'static str,
    pub label: &'static str,
    pub hint: &'static str,
    pub kind: FieldKind,
    pub value: String,
}

impl FormField {
    fn new(key: &'static str, label: &'static str, hint: &'static str, kind: FieldKind) -> Self {
        Self {
            key,
            label,
            hint,
            kind,
            value: String::new(),
        }
    }

    fn is_masked(&self) -> bool {
        matches!(self.kind, FieldKind::Secret | FieldKind::Pin)
    }

    /// Text as drawn on screen; secrets show one dot per character.
    #[must_use]
    pub fn display_value(&self) -> String {
        if self.is_masked() {
            "•".repeat(self.value.chars().count())
        } else {
            self.value.clone()
        }
    }

    fn accept(&mut self, c: char) -> bool {
        let len = self.value.chars().count();
        match self.kind {
            FieldKind::Text { max_len } => {
                if c.is_control() || len >= max_len {
                    return false;
                }
                self.value.push(c);
            }
            FieldKind::Integer => {
                if !c.is_ascii_digit() || len >= 3 {
                    return false;
                }
                self.value.push(c);
            }
            FieldKind::Decimal => {
                let c = if c == ',' { '.' } else { c };
                let ok = c.is_ascii_digit() || (c == '.' && !self.value.contains('.'));
                if !ok || len >= MAX_NUMBER_LEN {
                    return false;
                }
                self.value.push(c);
            }
            FieldKind::YesNo => {
                let answer = match c.to_ascii_lowercase() {
                    'y' | 's' | '1' => "Yes",
                    'n' | '0' => "No",
                    _ => return false,
                };
                self.value = answer.to_string();
            }
            FieldKind::Sex => {
                let Some(sex) = Sex::from_code(&c.to_string()) else {
                    return false;
                };
                self.value = sex.code().to_string();
            }
            FieldKind::Secret => {
                if c.is_control() || len >= MAX_SECRET_LEN {
                    return false;
                }
                self.value.push(c);
            }
            FieldKind::Pin => {
                if !c.is_ascii_digit() || len >= PIN_LENGTH {
                    return false;
                }
                self.value.push(c);
            }
        }
        true
    }

    fn text(&self) -> Option<String> {
        let v = self.value.trim();
        (!v.is_empty()).then(|| v.to_string())
    }

    fn parse_number<T: std::str::FromStr>(&self) -> Result<Option<T>, String> {
        match self.text() {
            None => Ok(None),
            Some(v) => v
                .parse()
                .map(Some)
                .map_err(|_| format!("{}: Invalid number", self.label)),
        }
    }

    fn yes_no(&self) -> Option<bool> {
        match self.value.as_str() {
            "Yes" => Some(true),
            "No" => Some(false),
            _ => None,
        }
    }
}

/// Which form is open; decides fields and what submitting does.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FormKind {
    /// Public self-registration
    PatientIntake,
    /// Doctor console entry
    NewPatient,
    EditPatient,
    PublicLookup,
    DoctorLogin,
    DoctorRegister,
    PasswordReset,
}

impl FormKind {
    #[must_use]
    pub fn title(&self) -> &'static str {
        match self {
            Self::PatientIntake => "Patient Intake",
            Self::NewPatient => "New Patient",
            Self::EditPatient => "Edit Patient",
            Self::PublicLookup => "Find My Result",
            Self::DoctorLogin => "Doctor Login",
            Self::DoctorRegister => "Doctor Registration",
            Self::PasswordReset => "Password Reset",
        }
    }

    #[must_use]
    pub fn is_patient_form(&self) -> bool {
        matches!(self, Self::PatientIntake | Self::NewPatient | Self::EditPatient)
    }
}

fn patient_fields() -> Vec<FormField> {
    // Yes/no fields show the full question until answered.
    let yes_no = |key, i: usize| {
        FormField::new(key, Questionnaire::LABELS[i], Questionnaire::PROMPTS[i], FieldKind::YesNo)
    };
    vec![
        FormField::new(
            "id",
            "File number",
            "required, up to 20 characters",
            FieldKind::Text { max_len: MAX_ID_LEN },
        ),
        FormField::new("name", "Name", "optional", FieldKind::Text { max_len: MAX_NAME_LEN }),
        FormField::new("surname", "Surname", "optional", FieldKind::Text { max_len: MAX_NAME_LEN }),
        FormField::new(
            "assigned_doctor",
            "Doctor",
            "username, optional",
            FieldKind::Text { max_len: MAX_USERNAME_LEN },
        ),
        FormField::new("age", "Age", "years", FieldKind::Integer),
        FormField::new("sex", "Sex", "m / f", FieldKind::Sex),
        FormField::new("height_m", "Height", "metres, e.g. 1.70", FieldKind::Decimal),
        FormField::new("weight_kg", "Weight", "kg, e.g. 82.5", FieldKind::Decimal),
        FormField::new("neck_circumference_cm", "Neck circumference", "cm", FieldKind::Decimal),
        yes_no("snores_loudly", 0),
        yes_no("tired_during_day", 1),
        yes_no("observed_apnea", 2),
        yes_no("treated_hypertension", 3),
    ]
}

fn username_field() -> FormField {
    FormField::new(
        "username",
        "Username",
        "letters, digits and @.+-_",
        FieldKind::Text { max_len: MAX_USERNAME_LEN },
    )
}

/// State of the open form.
pub struct FormState {
    pub kind: FormKind,
    pub fields: Vec<FormField>,
    pub selected_field: usize,
    pub error_message: Option<String>,
    /// File number of the record being edited
    pub editing_id: Option<String>,
}

impl FormState {
    #[must_use]
    pub fn new(kind: FormKind) -> Self {
        let fields = match kind {
            FormKind::PatientIntake | FormKind::NewPatient | FormKind::EditPatient => {
                patient_fields()
            }
            FormKind::PublicLookup => vec![FormField::new(
                "id",
                "File number",
                "exact file number",
                FieldKind::Text { max_len: MAX_ID_LEN },
            )],
            FormKind::DoctorLogin => vec![
                username_field(),
                FormField::new("password", "Password", "", FieldKind::Secret),
            ],
            FormKind::DoctorRegister => vec![
                username_field(),
                FormField::new("password", "Password", "", FieldKind::Secret),
                FormField::new("confirm", "Confirm password", "", FieldKind::Secret),
                FormField::new("pin", "Recovery PIN", "5 digits", FieldKind::Pin),
            ],
            FormKind::PasswordReset => vec![
                username_field(),
                FormField::new("pin", "Recovery PIN", "5 digits", FieldKind::Pin),
                FormField::new("password", "New password", "", FieldKind::Secret),
                FormField::new("confirm", "Confirm password", "", FieldKind::Secret),
            ],
        };

        Self {
            kind,
            fields,
            selected_field: 0,
            error_message: None,
            editing_id: None,
        }
    }

    /// Patient form for a doctor, with the doctor field prefilled.
    #[must_use]
    pub fn new_patient(doctor: &str) -> Self {
        let mut state = Self::new(FormKind::NewPatient);
        state.set("assigned_doctor", doctor);
        state
    }

    /// Edit form holding the stored values of `record`.
    #[must_use]
    pub fn edit(record: &PatientRecord) -> Self {
        let intake = record.intake();
        let mut state = Self::new(FormKind::EditPatient);
        state.editing_id = Some(intake.id.clone());

        let number = |v: Option<f64>| v.map(|v| v.to_string()).unwrap_or_default();
        let yes_no = |v: Option<bool>| match v {
            Some(true) => "Yes",
            Some(false) => "No",
            None => "",
        };

        state.set("id", &intake.id);
        state.set("name", intake.name.as_deref().unwrap_or_default());
        state.set("surname", intake.surname.as_deref().unwrap_or_default());
        state.set(
            "assigned_doctor",
            intake.assigned_doctor.as_deref().unwrap_or_default(),
        );
        state.set("age", &intake.age.map(|a| a.to_string()).unwrap_or_default());
        state.set("sex", intake.sex.map(|s| s.code()).unwrap_or_default());
        state.set("height_m", &number(intake.height_m));
        state.set("weight_kg", &number(intake.weight_kg));
        state.set("neck_circumference_cm", &number(intake.neck_circumference_cm));

        let q = &intake.questionnaire;
        state.set("snores_loudly", yes_no(q.snores_loudly));
        state.set("tired_during_day", yes_no(q.tired_during_day));
        state.set("observed_apnea", yes_no(q.observed_apnea));
        state.set("treated_hypertension", yes_no(q.treated_hypertension));
        state
    }

    fn set(&mut self, key: &str, value: &str) {
        if let Some(field) = self.fields.iter_mut().find(|f| f.key == key) {
            field.value = value.to_string();
        }
    }

    /// Current text of the field named `key`; empty if there is none.
    #[must_use]
    pub fn value(&self, key: &str) -> &str {
        self.fields
            .iter()
            .find(|f| f.key == key)
            .map_or("", |f| f.value.as_str())
    }

    pub fn next_field(&mut self) {
        self.selected_field = (self.selected_field + 1) % self.fields.len();
    }

    pub fn prev_field(&mut self) {
        if self.selected_field == 0 {
            self.selected_field = self.fields.len() - 1;
        } else {
            self.selected_field -= 1;
        }
    }

    pub fn input_char(&mut self, c: char) {
        let editing_locked_id = self.kind == FormKind::EditPatient
            && self.fields[self.selected_field].key == "id";
        if editing_locked_id {
            self.error_message = Some("File number cannot be changed".to_string());
            return;
        }
        if self.fields[self.selected_field].accept(c) {
            self.error_message = None;
        }
    }

    pub fn delete_char(&mut self) {
        let field = &mut self.fields[self.selected_field];
        if self.kind == FormKind::EditPatient && field.key == "id" {
            return;
        }
        match field.kind {
            FieldKind::YesNo | FieldKind::Sex => field.value.clear(),
            _ => {
                field.value.pop();
            }
        }
    }

    pub fn clear_field(&mut self) {
        if self.kind == FormKind::EditPatient && self.fields[self.selected_field].key == "id" {
            return;
        }
        self.fields[self.selected_field].value.zeroize();
    }

    /// Wipe every field buffer. Called once a form has been submitted so
    /// passwords, PINs and patient data do not linger in UI state.
    pub fn clear_sensitive(&mut self) {
        for field in self.fields.iter_mut() {
            field.value.zeroize();
        }
        self.error_message = None;
        self.selected_field = 0;
    }

    /// Parse a patient form into an intake.
    ///
    /// Only reports fields that cannot be parsed at all; missing answers
    /// and out-of-range values are left to `PatientIntake::validate`.
    pub fn to_intake(&self) -> Result<PatientIntake, String> {
        let field = |key: &str| {
            self.fields
                .iter()
                .find(|f| f.key == key)
                .ok_or_else(|| format!("Missing field {key}"))
        };

        Ok(PatientIntake {
            id: self.value("id").trim().to_string(),
            name: field("name")?.text(),
            surname: field("surname")?.text(),
            assigned_doctor: field("assigned_doctor")?.text(),
            age: field("age")?.parse_number()?,
            height_m: field("height_m")?.parse_number()?,
            weight_kg: field("weight_kg")?.parse_number()?,
            neck_circumference_cm: field("neck_circumference_cm")?.parse_number()?,
            sex: Sex::from_code(self.value("sex")),
            questionnaire: Questionnaire {
                snores_loudly: field("snores_loudly")?.yes_no(),
                tired_during_day: field("tired_during_day")?.yes_no(),
                observed_apnea: field("observed_apnea")?.yes_no(),
                treated_hypertension: field("treated_hypertension")?.yes_no(),
            },
        })
    }

    /// Fill a patient form with a typical high-risk patient.
    pub fn load_sample_data(&mut self) {
        if !self.kind.is_patient_form() {
            return;
        }
        let sample = [
            ("name", "Ana"),
            ("surname", "Lopez"),
            ("age", "55"),
            ("sex", "F"),
            ("height_m", "1.70"),
            ("weight_kg", "110"),
            ("neck_circumference_cm", "42"),
            ("snores_loudly", "Yes"),
            ("tired_during_day", "No"),
            ("observed_apnea", "Yes"),
            ("treated_hypertension", "No"),
        ];
        if self.editing_id.is_none() && self.value("id").is_empty() {
            self.set("id", "EXP-0001");
        }
        for (key, value) in sample {
            self.set(key, value);
        }
        self.error_message = None;
    }
}

/// Render the open form.
pub fn render_form(f: &mut Frame, area: Rect, state: &FormState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header
            Constraint::Min(0),    // Fields
            Constraint::Length(3), // Footer/error
        ])
        .split(area);

    let subtitle = match state.kind {
        FormKind::PatientIntake | FormKind::NewPatient => "STOP-BANG questionnaire",
        FormKind::EditPatient => state.editing_id.as_deref().unwrap_or_default(),
        FormKind::PublicLookup => "Look up a saved screening",
        FormKind::DoctorLogin | FormKind::DoctorRegister | FormKind::PasswordReset => {
            "Clinician access"
        }
    };
    render_header(f, chunks[0], state.kind.title(), subtitle);
    render_form_fields(f, chunks[1], state);
    render_form_footer(f, chunks[2], state);
}

fn render_form_fields(f: &mut Frame, area: Rect, state: &FormState) {
    if state.fields.len() <= 4 {
        let column = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Min(0)])
            .margin(1)
            .split(area);
        render_field_column(f, column[0], &state.fields, 0, state.selected_field);
        return;
    }

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .margin(1)
        .split(area);

    // Identity and measurements on the left, questionnaire on the right
    let mid = state.fields.len() - Questionnaire::LABELS.len();
    render_field_column(f, columns[0], &state.fields[..mid], 0, state.selected_field);
    render_field_column(
        f,
        columns[1],
        &state.fields[mid..],
        mid,
        state.selected_field,
    );
}

fn render_field_column(
    f: &mut Frame,
    area: Rect,
    fields: &[FormField],
    offset: usize,
    selected: usize,
) {
    let constraints: Vec<Constraint> = fields
        .iter()
        .map(|_| Constraint::Length(3))
        .chain(std::iter::once(Constraint::Min(0)))
        .collect();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints(constraints)
        .split(area);

    for (i, field) in fields.iter().enumerate() {
        let is_selected = offset + i == selected;
        let (border_style, title_style) = if is_selected {
            (ClinicTheme::border_focused(), ClinicTheme::focused())
        } else {
            (ClinicTheme::border(), ClinicTheme::text_secondary())
        };

        let block = Block::default()
            .title(Span::styled(format!(" {} ", field.label), title_style))
            .borders(Borders::ALL)
            .border_style(border_style);

        let value_display = if field.value.is_empty() {
            Span::styled(field.hint, ClinicTheme::text_muted())
        } else {
            Span::styled(field.display_value(), ClinicTheme::text())
        };

        let content = Paragraph::new(Line::from(vec![
            Span::raw(" "),
            value_display,
            if is_selected {
                Span::styled("▌", ClinicTheme::cursor())
            } else {
                Span::raw("")
            },
        ]))
        .block(block);

        f.render_widget(content, chunks[i]);
    }
}

fn render_form_footer(f: &mut Frame, area: Rect, state: &FormState) {
    let content = if let Some(err) = &state.error_message {
        Line::from(vec![
            Span::styled("! ", ClinicTheme::danger()),
            Span::styled(err.clone(), ClinicTheme::danger()),
        ])
    } else if state.kind.is_patient_form() {
        key_hints(&[
            ("↑↓", "Navigate"),
            ("y/n", "Answer"),
            ("Enter", "Submit"),
            ("Del", "Clear field"),
            ("F2", "Sample data"),
            ("Esc", "Cancel"),
        ])
    } else {
        key_hints(&[("↑↓", "Navigate"), ("Enter", "Submit"), ("Esc", "Cancel")])
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
    use crate::domain::RiskTier;

    fn type_into(state: &mut FormState, key: &str, text: &str) {
        state.selected_field = state
            .fields
            .iter()
            .position(|f| f.key == key)
            .expect("Should have field");
        for c in text.chars() {
            state.input_char(c);
        }
    }

    #[test]
    fn test_navigation_wraps() {
        let mut state = FormState::new(FormKind::DoctorLogin);
        state.prev_field();
        assert_eq!(state.selected_field, 1);
        state.next_field();
        assert_eq!(state.selected_field, 0);
    }

    #[test]
    fn test_input_is_filtered_by_kind() {
        let mut state = FormState::new(FormKind::PatientIntake);
        type_into(&mut state, "age", "5x5a1");
        assert_eq!(state.value("age"), "551");

        type_into(&mut state, "height_m", "1,7.2");
        assert_eq!(state.value("height_m"), "1.72");

        type_into(&mut state, "snores_loudly", "qy");
        assert_eq!(state.value("snores_loudly"), "Yes");
        type_into(&mut state, "snores_loudly", "n");
        assert_eq!(state.value("snores_loudly"), "No");

        type_into(&mut state, "sex", "zf");
        assert_eq!(state.value("sex"), "F");
    }

    #[test]
    fn test_pin_accepts_five_digits_only() {
        let mut state = FormState::new(FormKind::DoctorRegister);
        type_into(&mut state, "pin", "12a34567");
        assert_eq!(state.value("pin"), "12345");
    }

    #[test]
    fn test_secrets_are_masked() {
        let mut state = FormState::new(FormKind::DoctorLogin);
        type_into(&mut state, "password", "hunter2");
        assert_eq!(state.fields[1].display_value(), "•••••••");
        assert_eq!(state.value("password"), "hunter2");
    }

    #[test]
    fn test_sample_data_builds_high_risk_intake() {
        let mut state = FormState::new(FormKind::PatientIntake);
        state.load_sample_data();

        let intake = state.to_intake().expect("Should parse");
        assert_eq!(intake.id, "EXP-0001");
        assert_eq!(intake.sex, Some(Sex::Female));
        assert!(intake.validate().is_ok());

        let record = PatientRecord::assess(intake).expect("Should assess");
        assert_eq!(record.stop_bang_score(), 5);
        assert_eq!(record.risk_tier(), RiskTier::High);
    }

    #[test]
    fn test_blank_fields_become_none() {
        let mut state = FormState::new(FormKind::PatientIntake);
        type_into(&mut state, "id", "A-1");
        let intake = state.to_intake().expect("Should parse");
        assert_eq!(intake.name, None);
        assert_eq!(intake.height_m, None);
        assert_eq!(intake.questionnaire.snores_loudly, None);
        assert_eq!(intake.questionnaire.unanswered().len(), 4);
    }

    #[test]
    fn test_invalid_number_is_reported() {
        let mut state = FormState::new(FormKind::PatientIntake);
        type_into(&mut state, "weight_kg", ".");
        let err = state.to_intake().expect_err("Should reject");
        assert_eq!(err, "Weight: Invalid number");
    }

    #[test]
    fn test_edit_form_round_trips_record() {
        let mut source = FormState::new(FormKind::PatientIntake);
        source.load_sample_data();
        let record = PatientRecord::assess(source.to_intake().expect("Should parse"))
            .expect("Should assess");

        let mut state = FormState::edit(&record);
        assert_eq!(state.editing_id.as_deref(), Some("EXP-0001"));
        assert_eq!(state.to_intake().expect("Should parse"), *record.intake());

        type_into(&mut state, "id", "X");
        assert_eq!(state.value("id"), "EXP-0001");
        assert!(state.error_message.is_some());
    }

    #[test]
    fn test_clear_sensitive_wipes_all_fields() {
        let mut state = FormState::new(FormKind::PasswordReset);
        type_into(&mut state, "username", "dr.a");
        type_into(&mut state, "pin", "12345");
        type_into(&mut state, "password", "new-pass");
        state.error_message = Some("Passwords do not match".to_string());

        state.clear_sensitive();
        assert!(state.fields.iter().all(|f| f.value.is_empty()));
        assert_eq!(state.selected_field, 0);
        assert!(state.error_message.is_none());
    }

    #[test]
    fn test_new_patient_prefills_doctor() {
        let state = FormState::new_patient("dr.a");
        assert_eq!(state.value("assigned_doctor"), "dr.a");
        assert_eq!(state.kind, FormKind::NewPatient);
    }

    #[test]
    fn test_questions_are_shown_as_hints() {
        let state = FormState::new_patient("dr.a");
        let keys = ["snores_loudly", "tired_during_day", "observed_apnea", "treated_hypertension"];
        for (i, key) in keys.iter().enumerate() {
            let field = state
                .fields
                .iter()
                .find(|f| f.key == *key)
                .expect("Should have question field");
            assert_eq!(field.label, Questionnaire::LABELS[i]);
            assert_eq!(field.hint, Questionnaire::PROMPTS[i]);
        }
    }
}
