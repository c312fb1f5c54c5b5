//! Configuration validation.
//!
//! Reports the problems that would make a share invocation cancel before it
//! starts, plus a few settings that are legal but likely mistakes.

use std::fmt;

use crate::schema::{ShareConfig, wake_uri};

/// Severity level for a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Severity {
    Error,
    Warning,
    Info,
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warning => write!(f, "warning"),
            Self::Info => write!(f, "info"),
        }
    }
}

/// A single validation diagnostic.
#[derive(Debug, Clone)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Dotted path, e.g. "host.url_scheme"
    pub path: &'static str,
    pub message: String,
}

impl Diagnostic {
    fn new(severity: Severity, path: &'static str, message: impl Into<String>) -> Self {
        Self {
            severity,
            path,
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} [{}] {}", self.severity, self.path, self.message)
    }
}

#[derive(Debug, Clone, Default)]
pub struct ValidationResult {
    pub diagnostics: Vec<Diagnostic>,
}

impl ValidationResult {
    /// Returns `true` if any diagnostic is an error.
    #[must_use]
    pub fn has_errors(&self) -> bool {
        self.diagnostics
            .iter()
            .any(|d| d.severity == Severity::Error)
    }

    /// Count diagnostics by severity.
    #[must_use]
    pub fn count(&self, severity: Severity) -> usize {
        self.diagnostics
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

pub fn validate(config: &ShareConfig) -> ValidationResult {
    let mut diagnostics = Vec::new();

    match config.host.app_id.as_deref().map(str::trim) {
        None | Some("") => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "host.app_id",
            "host application identifier is not set",
        )),
        Some(id) if id.contains(char::is_whitespace) => diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "host.app_id",
            format!("identifier `{id}` contains whitespace"),
        )),
        Some(_) => {},
    }

    match config.host.url_scheme.as_deref() {
        None => diagnostics.push(Diagnostic::new(
            Severity::Error,
            "host.url_scheme",
            "host wake-up address is not set",
        )),
        Some(address) => {
            if let Err(e) = wake_uri(address) {
                diagnostics.push(Diagnostic::new(
                    Severity::Error,
                    "host.url_scheme",
                    e.to_string(),
                ));
            }
        },
    }

    if config.handoff.items_key == config.handoff.extra_key {
        diagnostics.push(Diagnostic::new(
            Severity::Error,
            "handoff.extra_key",
            "items and extra data would be written under the same key",
        ));
    }

    if config.storage.group_prefix.is_empty() {
        diagnostics.push(Diagnostic::new(
            Severity::Warning,
            "storage.group_prefix",
            "empty group prefix; the container is named after the bare app id",
        ));
    }

    if !config.handoff.wake {
        diagnostics.push(Diagnostic::new(
            Severity::Info,
            "handoff.wake",
            "host application will not be woken after publishing",
        ));
    }

    ValidationResult { diagnostics }
}
