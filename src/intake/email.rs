//! Email text parsing: header split and actionable-text extraction.
//!
//! Pure string parsing, no network. Headers are `From:`, `To:` and `Subject:`
//! lines up to the first blank line; everything after it is the body.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::info;

use crate::error::IntakeError;

/// Signature lines stripped from actionable text, applied in order.
static SIGNATURE_PATTERNS: LazyLock<[Regex; 3]> = LazyLock::new(|| {
    [
        Regex::new(r"(?m)^\s*--.*").expect("valid signature regex"),
        Regex::new(r"(?m)^\s*Best,.*").expect("valid signature regex"),
        Regex::new(r"(?m)^\s*Thanks,.*").expect("valid signature regex"),
    ]
});

/// Components of a plain-text email.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ParsedEmail {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Split raw email text into headers and body.
///
/// Scanning stops at the first blank line. Without one the whole text,
/// headers included, becomes the body.
pub fn parse_email(raw: &str) -> ParsedEmail {
    let mut email = ParsedEmail::default();
    let lines: Vec<&str> = raw.split('\n').collect();
    let mut body_start = 0;

    for (i, line) in lines.iter().enumerate() {
        if let Some(rest) = line.strip_prefix("From:") {
            email.from = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("To:") {
            email.to = rest.trim().to_string();
        } else if let Some(rest) = line.strip_prefix("Subject:") {
            email.subject = rest.trim().to_string();
        } else if line.trim().is_empty() {
            body_start = i + 1;
            break;
        }
    }

    email.body = lines[body_start..].join("\n").trim().to_string();
    email
}

/// Turn a parsed email into text suitable for task extraction:
/// `"{subject}. {body}"` with signature lines removed.
pub fn actionable_text(email: &ParsedEmail) -> String {
    let mut text = format!("{}. {}", email.subject, email.body);
    for pattern in SIGNATURE_PATTERNS.iter() {
        text = pattern.replace_all(&text, "").into_owned();
    }
    text.trim().to_string()
}

/// Parse raw email text and return its actionable text.
///
/// Fails when the email carries neither a subject nor a body.
pub fn extract_email_text(raw: &str) -> Result<String, IntakeError> {
    let email = parse_email(raw);
    if email.subject.is_empty() && email.body.is_empty() {
        return Err(IntakeError::MalformedEmail(
            "no subject or body found".to_string(),
        ));
    }

    info!(from = %email.from, subject = %email.subject, "Email parsed");
    Ok(actionable_text(&email))
}
