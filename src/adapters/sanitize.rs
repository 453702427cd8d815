//! Log sanitization for patient data and account secrets.
//!
//! Applied line by line to formatted log output through
//! [`SanitizingMakeWriter`]. It redacts:
//! - Patient file numbers logged as `patient_id` fields or in free text
//!   (`file number X`, `patient X`)
//! - Password, PIN and token assignments (`password=...`, `pin: ...`)
//! - Argon2 PHC hash strings
//! - Email addresses, phone numbers and CURP identifiers
//!
//! Sanitizing strings is a fallback. Secrets never reach logging calls in
//! the first place: accounts and PINs redact themselves in `Debug`.
//!
//! # Performance
//!
//! Input is capped per call (see `APNEASCREEN_SANITIZE_MAX_BYTES`, default
//! 16 KiB); anything beyond the cap is dropped and marked `[TRUNCATED]`.

use regex::{Regex, RegexSet};
use std::sync::OnceLock;
use tracing_subscriber::fmt::MakeWriter;

static PII_PATTERNS: OnceLock<PiiPatterns> = OnceLock::new();

const MAX_BYTES_ENV: &str = "APNEASCREEN_SANITIZE_MAX_BYTES";
const DEFAULT_SANITIZE_MAX_BYTES: usize = 16 * 1024;

struct PiiPattern {
    regex: Regex,
    replacement: &'static str,
}

struct PiiPatterns {
    any: RegexSet,
    rules: Vec<PiiPattern>,
}

fn truncate_to_char_boundary(input: &str, max_bytes: usize) -> (&str, bool) {
    if input.len() <= max_bytes {
        return (input, false);
    }

    let mut end = max_bytes;
    while end > 0 && !input.is_char_boundary(end) {
        end -= 1;
    }
    (&input[..end], true)
}

fn max_sanitize_bytes() -> usize {
    std::env::var(MAX_BYTES_ENV)
        .ok()
        .and_then(|v| v.parse::<usize>().ok())
        .filter(|&v| v > 0)
        .unwrap_or(DEFAULT_SANITIZE_MAX_BYTES)
}

fn get_patterns() -> &'static PiiPatterns {
    PII_PATTERNS.get_or_init(|| {
        // Order matters: hashes before generic secret assignments, so a
        // `password_hash=$argon2id$...` field is reported as a hash.
        let rules: Vec<(&'static str, &'static str)> = vec![
            (r"\$argon2(?:id|i|d)\$[A-Za-z0-9+/=,$.-]+", "[REDACTED-HASH]"),
            (
                r#"(?i)\b(?:new_password|password|passwd|pwd|recovery_pin|pin|nip|secret|token)\b\s*[:=]\s*"?[^\s",]+"?"#,
                "[REDACTED-SECRET]",
            ),
            (r#"\bpatient_id\s*[:=]\s*"?[^\s",]+"?"#, "patient_id=[REDACTED]"),
            (
                r"(?i)\b(?:file number|patient)\s*[:#]?\s*[A-Za-z_-]*\d[A-Za-z0-9_-]*",
                "[REDACTED-FILE-NUMBER]",
            ),
            (
                r"(?i)\b[a-z0-9](?:[a-z0-9._%+-]{0,62}[a-z0-9])?@(?:[a-z0-9](?:[a-z0-9-]{0,61}[a-z0-9])?\.)+[a-z]{2,}\b",
                "[REDACTED-EMAIL]",
            ),
            (
                r"\b(?:\+?\d{1,3}[-.\s]?)?\(?[0-9]{3}\)?[-.\s]?[0-9]{3}[-.\s]?[0-9]{4}\b",
                "[REDACTED-PHONE]",
            ),
            (r"\b[A-Z]{4}\d{6}[HM][A-Z]{5}[A-Z0-9]\d\b", "[REDACTED-CURP]"),
        ];

        let any = RegexSet::new(rules.iter().map(|(p, _)| *p)).expect("Valid regex set");
        let rules = rules
            .into_iter()
            .map(|(pattern, replacement)| PiiPattern {
                regex: Regex::new(pattern).expect("Valid regex"),
                replacement,
            })
            .collect();

        PiiPatterns { any, rules }
    })
}

/// Replace every known PII or secret pattern in `input`.
#[must_use]
pub fn sanitize(input: &str) -> String {
    sanitize_with_limit(input, max_sanitize_bytes())
}

fn sanitize_with_limit(input: &str, max_bytes: usize) -> String {
    let patterns = get_patterns();
    let (prefix, truncated) = truncate_to_char_boundary(input, max_bytes);

    let mut result = prefix.to_string();
    for idx in patterns.any.matches(prefix).into_iter() {
        let pattern = &patterns.rules[idx];
        result = pattern
            .regex
            .replace_all(&result, pattern.replacement)
            .into_owned();
    }

    if truncated {
        result.push_str(" [TRUNCATED]");
    }
    result
}

/// A `tracing_subscriber` writer that sanitizes each formatted line before
/// it reaches the underlying sink.
#[derive(Debug, Clone)]
pub struct SanitizingMakeWriter<M> {
    inner: M,
}

impl<M> SanitizingMakeWriter<M> {
    #[must_use]
    pub fn new(inner: M) -> Self {
        Self { inner }
    }
}

pub struct SanitizingWriter<W> {
    inner: W,
    buffer: Vec<u8>,
}

impl<W> SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn new(inner: W) -> Self {
        Self {
            inner,
            buffer: Vec::new(),
        }
    }

    fn flush_lines(&mut self) -> std::io::Result<()> {
        while let Some(pos) = self.buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = self.buffer.drain(..=pos).collect();
            let sanitized = sanitize(&String::from_utf8_lossy(&line));
            self.inner.write_all(sanitized.as_bytes())?;
        }
        Ok(())
    }
}

impl<W> std::io::Write for SanitizingWriter<W>
where
    W: std::io::Write,
{
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.buffer.extend_from_slice(buf);

        // A line with no newline in sight is flushed as-is once it passes the cap.
        let hard_cap = max_sanitize_bytes().saturating_mul(2);
        if self.buffer.len() > hard_cap {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.inner.write_all(b"\n")?;
            self.buffer.clear();
            return Ok(buf.len());
        }

        self.flush_lines()?;
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        self.flush_lines()?;

        if !self.buffer.is_empty() {
            let sanitized = sanitize(&String::from_utf8_lossy(&self.buffer));
            self.inner.write_all(sanitized.as_bytes())?;
            self.buffer.clear();
        }

        self.inner.flush()
    }
}

impl<'a, M> MakeWriter<'a> for SanitizingMakeWriter<M>
where
    M: MakeWriter<'a>,
{
    type Writer = SanitizingWriter<M::Writer>;

    fn make_writer(&'a self) -> Self::Writer {
        SanitizingWriter::new(self.inner.make_writer())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_sanitize_secret_assignments() {
        let sanitized = sanitize("login attempt password=hunter2 pin: 12345");
        assert!(!sanitized.contains("hunter2"));
        assert!(!sanitized.contains("12345"));
        assert_eq!(sanitized.matches("[REDACTED-SECRET]").count(), 2);
    }

    #[test]
    fn test_sanitize_argon2_hash() {
        let input = "stored $argon2id$v=19$m=47104,t=1,p=1$c2FsdHNhbHQ$aGFzaGhhc2g done";
        let sanitized = sanitize(input);
        assert_eq!(sanitized, "stored [REDACTED-HASH] done");
    }

    #[test]
    fn test_sanitize_patient_id_field() {
        let sanitized = sanitize(r#"DEBUG Inserted patient patient_id="EXP-0042""#);
        assert!(sanitized.contains("patient_id=[REDACTED]"));
        assert!(!sanitized.contains("EXP-0042"));

        let bare = sanitize("Delete patient patient_id=A1 deleted=true");
        assert_eq!(bare, "Delete patient patient_id=[REDACTED] deleted=true");
    }

    #[test]
    fn test_sanitize_file_number_text() {
        let sanitized = sanitize("Not found: No patient with file number EXP-77");
        assert!(!sanitized.contains("EXP-77"));
        assert!(sanitized.contains("[REDACTED-FILE-NUMBER]"));

        let untouched = "File number cannot be changed once stored";
        assert_eq!(sanitize(untouched), untouched);
    }

    #[test]
    fn test_sanitize_contact_details() {
        assert!(sanitize("Contact: patient@hospital.mx").contains("[REDACTED-EMAIL]"));
        assert!(sanitize("call 555-123-4567").contains("[REDACTED-PHONE]"));
        assert!(sanitize("CURP GOMA800101HDFRRN09").contains("[REDACTED-CURP]"));
    }

    #[test]
    fn test_sanitize_patient_mentions() {
        let sanitized = sanitize("Loaded Patient HOSP-778812 for review");
        assert_eq!(sanitized, "Loaded [REDACTED-FILE-NUMBER] for review");

        let untouched = "Patient record created score=5";
        assert_eq!(sanitize(untouched), untouched);
    }

    #[test]
    fn test_refused_edit_line_has_no_file_number() {
        use crate::domain::{
            authorize_doctor, Account, PatientIntake, PatientRecord, Questionnaire, Role,
        };

        let account = Account {
            username: "dr.b".to_string(),
            password_hash: String::new(),
            pin_hash: String::new(),
            role: Role::Doctor,
            created_at: chrono::Utc::now(),
        };
        let access = authorize_doctor(&account).expect("Should authorize");

        let intake = PatientIntake {
            id: "HOSP-778812".to_string(),
            assigned_doctor: Some("dr.a".to_string()),
            questionnaire: Questionnaire::answered(false, true, false, false),
            ..Default::default()
        };
        let record = PatientRecord::assess(intake).expect("Should assess");

        let denied = access.may_modify(&record).expect_err("Should refuse");
        let line = format!(
            "WARN apneascreen::application::patients: Edit refused: {denied} doctor=\"dr.b\"\n"
        );
        assert!(!line.contains("HOSP-778812"));
        assert!(!sanitize(&line).contains("HOSP-778812"));

        let debug_line = format!("DEBUG Edit refused for patient patient_id=\"{}\"", record.id());
        assert!(!sanitize(&debug_line).contains("HOSP-778812"));
    }

    #[test]
    fn test_timestamps_survive() {
        let line = "2026-10-17T09:15:02.123456Z  INFO apneascreen: Patient record created score=5";
        assert_eq!(sanitize(line), line);
    }

    #[test]
    fn test_sanitize_truncates_large_inputs() {
        let input = "prefix password=abcdefabcdef suffix with more text";
        let sanitized = sanitize_with_limit(input, 16);
        assert!(sanitized.ends_with("[TRUNCATED]"));
        assert!(!sanitized.contains("suffix"));
    }

    #[test]
    fn test_truncation_respects_char_boundaries() {
        let (prefix, truncated) = truncate_to_char_boundary("ñaña", 4);
        assert!(truncated);
        assert_eq!(prefix, "ña");
    }

    #[test]
    fn test_writer_sanitizes_per_line() {
        let mut writer = SanitizingWriter::new(Vec::new());
        writer
            .write_all(b"first password=s3cr3t\nsecond line")
            .expect("Should write");
        assert_eq!(writer.inner, b"first [REDACTED-SECRET]\n".to_vec());

        writer.write_all(b" pin=11111\n").expect("Should write");
        writer.flush().expect("Should flush");
        assert_eq!(
            String::from_utf8(writer.inner).expect("Valid UTF-8"),
            "first [REDACTED-SECRET]\nsecond line [REDACTED-SECRET]\n"
        );
    }
}
