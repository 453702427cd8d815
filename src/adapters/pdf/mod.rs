//! PDF adapter: A4 patient passes via `printpdf`.
//!
//! Layout is computed as a list of styled lines first, then written top to
//! bottom with the built-in Helvetica fonts, continuing on a new page when
//! the bottom margin is reached.

use std::io::BufWriter;

use printpdf::{BuiltinFont, Mm, PdfDocument};

use crate::domain::{Criterion, Questionnaire};
use crate::ports::{PassDocument, PassError, PassRenderer};

const PAGE_WIDTH_MM: f32 = 210.0;
const PAGE_HEIGHT_MM: f32 = 297.0;
const TOP_MM: f32 = 280.0;
const BOTTOM_MM: f32 = 20.0;

const DISCLAIMER: &str =
    "Screening aid only. It does not replace a sleep study or a clinical evaluation.";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineStyle {
    Title,
    Heading,
    Body,
    Footer,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassLine {
    pub style: LineStyle,
    pub text: String,
}

impl PassLine {
    fn new(style: LineStyle, text: impl Into<String>) -> Self {
        Self {
            style,
            text: text.into(),
        }
    }
}

fn or_not_recorded(value: Option<String>) -> String {
    value.unwrap_or_else(|| "Not recorded".to_string())
}

fn answer_label(answer: Option<bool>) -> &'static str {
    match answer {
        Some(true) => "Yes",
        Some(false) => "No",
        None => "Not answered",
    }
}

/// Text content of a pass, in reading order.
#[must_use]
pub fn pass_lines(document: &PassDocument) -> Vec<PassLine> {
    use LineStyle::{Body, Footer, Heading, Title};

    let record = &document.record;
    let intake = record.intake();
    let mut lines = vec![
        PassLine::new(Title, &document.clinic_name),
        PassLine::new(Body, "Sleep apnea screening pass"),
        PassLine::new(Body, format!("Issued: {}", document.issue_date_label())),
        PassLine::new(Heading, "PATIENT"),
        PassLine::new(Body, format!("File number: {}", record.id())),
    ];

    let name = record.full_name();
    lines.push(PassLine::new(
        Body,
        format!("Name: {}", or_not_recorded((!name.is_empty()).then_some(name))),
    ));
    lines.push(PassLine::new(
        Body,
        format!("Age: {}", or_not_recorded(intake.age.map(|a| format!("{a} years")))),
    ));
    lines.push(PassLine::new(
        Body,
        format!("Sex: {}", or_not_recorded(intake.sex.map(|s| s.label().to_string()))),
    ));
    lines.push(PassLine::new(
        Body,
        format!("Assigned doctor: {}", record.assigned_doctor().unwrap_or("Unassigned")),
    ));

    lines.push(PassLine::new(Heading, "MEASUREMENTS"));
    lines.push(PassLine::new(
        Body,
        format!("Height: {}", or_not_recorded(intake.height_m.map(|h| format!("{h:.2} m")))),
    ));
    lines.push(PassLine::new(
        Body,
        format!("Weight: {}", or_not_recorded(intake.weight_kg.map(|w| format!("{w:.1} kg")))),
    ));
    lines.push(PassLine::new(
        Body,
        format!(
            "Neck circumference: {}",
            or_not_recorded(intake.neck_circumference_cm.map(|n| format!("{n:.1} cm")))
        ),
    ));
    lines.push(PassLine::new(
        Body,
        format!("BMI: {}", or_not_recorded(record.bmi().map(|b| format!("{b:.2}")))),
    ));

    lines.push(PassLine::new(Heading, "STOP-BANG QUESTIONNAIRE"));
    for (label, answer) in Questionnaire::LABELS
        .iter()
        .zip(intake.questionnaire.answers())
    {
        lines.push(PassLine::new(Body, format!("{label}: {}", answer_label(answer))));
    }

    lines.push(PassLine::new(Heading, "RESULT"));
    lines.push(PassLine::new(
        Body,
        format!("STOP-BANG score: {} / 7", record.stop_bang_score()),
    ));
    lines.push(PassLine::new(
        Body,
        format!("Risk: {}", record.risk_tier().description()),
    ));
    let criteria = record.assessment().criteria();
    let met = if criteria.is_empty() {
        "none".to_string()
    } else {
        criteria
            .iter()
            .map(Criterion::label)
            .collect::<Vec<_>>()
            .join(", ")
    };
    lines.push(PassLine::new(Body, format!("Criteria met: {met}")));

    lines.push(PassLine::new(Footer, DISCLAIMER));
    lines.push(PassLine::new(
        Footer,
        format!("\u{a9} {} {}", document.year(), document.clinic_name),
    ));

    lines
}

/// `PassRenderer` producing PDF bytes.
#[derive(Debug, Clone, Copy, Default)]
pub struct PdfPassRenderer;

impl PdfPassRenderer {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

impl PassRenderer for PdfPassRenderer {
    fn render(&self, document: &PassDocument) -> Result<Vec<u8>, PassError> {
        let title = format!("Patient pass {}", document.record.id());
        let (doc, page1, layer1) =
            PdfDocument::new(&title, Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
        let font = doc
            .add_builtin_font(BuiltinFont::Helvetica)
            .map_err(|e| PassError::Rendering(format!("font error: {e}")))?;
        let bold = doc
            .add_builtin_font(BuiltinFont::HelveticaBold)
            .map_err(|e| PassError::Rendering(format!("font error: {e}")))?;

        let mut layer = doc.get_page(page1).get_layer(layer1);
        let mut y = Mm(TOP_MM);

        for line in pass_lines(document) {
            let (size, x, gap_before, advance, face) = match line.style {
                LineStyle::Title => (16.0, 20.0, 0.0, 8.0, &bold),
                LineStyle::Heading => (11.0, 20.0, 4.0, 6.0, &bold),
                LineStyle::Body => (10.0, 25.0, 0.0, 5.0, &font),
                LineStyle::Footer => (8.0, 20.0, 6.0, 4.0, &font),
            };

            y -= Mm(gap_before);
            if y.0 < BOTTOM_MM {
                let (page, page_layer) =
                    doc.add_page(Mm(PAGE_WIDTH_MM), Mm(PAGE_HEIGHT_MM), "Layer 1");
                layer = doc.get_page(page).get_layer(page_layer);
                y = Mm(TOP_MM);
            }

            layer.use_text(&line.text, size, Mm(x), y, face);
            y -= Mm(advance);
        }

        let mut buf = BufWriter::new(Vec::new());
        doc.save(&mut buf)
            .map_err(|e| PassError::Rendering(format!("PDF save error: {e}")))?;
        buf.into_inner()
            .map_err(|e| PassError::Rendering(format!("PDF buffer error: {e}")))
    }
}
