//! Warnings collected while loading files.
//!
//! Parsers report every non-fatal problem (unknown names, count mismatches,
//! bad links) here instead of failing. Each record carries the file and line
//! it came from and is also forwarded to the `log` facade.

use log::{info, warn};
use std::fmt;

#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub enum Severity {
    Information,
    Warning,
}

#[derive(Clone, Debug, PartialEq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub file: String,
    pub line: usize,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let kind = match self.severity {
            Severity::Information => "info",
            Severity::Warning => "warning",
        };
        write!(f, "{}:{}: {}: {}", self.file, self.line, kind, self.message)
    }
}

#[derive(Debug, Default)]
pub struct Diagnostics {
    pub records: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Diagnostics {
        Diagnostics { records: Vec::new() }
    }

    pub fn warn(&mut self, file: &str, line: usize, message: impl Into<String>) {
        let message = message.into();
        warn!("{}:{}: {}", file, line, message);
        self.records.push(Diagnostic {
            severity: Severity::Warning,
            file: file.to_string(),
            line,
            message,
        });
    }

    pub fn info(&mut self, file: &str, line: usize, message: impl Into<String>) {
        let message = message.into();
        info!("{}:{}: {}", file, line, message);
        self.records.push(Diagnostic {
            severity: Severity::Information,
            file: file.to_string(),
            line,
            message,
        });
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Diagnostic> {
        self.records.iter().filter(|d| d.severity == Severity::Warning)
    }

    /// True if any recorded message contains `needle`. Mostly for tests.
    pub fn contains(&self, needle: &str) -> bool {
        self.records.iter().any(|d| d.message.contains(needle))
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }
}
