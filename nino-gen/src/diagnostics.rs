//! Generator diagnostics.
//!
//! Partial failure never aborts a batch: structural rejects are silent,
//! unresolvable member codecs and emission failures surface as
//! warning-level diagnostics identifying the offending type or member, and
//! the batch continues.
use core::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Warning,
    Error,
}

/// Stable diagnostic codes.
pub mod codes {
    /// A member type has no resolvable codec; the owning type is skipped.
    pub const MISSING_MEMBER: &str = "NINO001";
    /// An internal invariant broke mid-emission; a comment-only stub
    /// artifact is produced instead.
    pub const EMISSION_FAILURE: &str = "NINO002";
    /// A surviving type refers to a type that failed extraction.
    pub const INVALID_GENERIC: &str = "NINO003";
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub severity: Severity,
    pub code: &'static str,
    /// The offending type or member, e.g. `Game.Player.Inventory`.
    pub location: String,
    pub message: String,
}

impl Diagnostic {
    #[must_use]
    pub fn warning(code: &'static str, location: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            severity: Severity::Warning,
            code,
            location: location.into(),
            message: message.into(),
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };
        write!(f, "{severity} {}: {} [{}]", self.code, self.message, self.location)
    }
}
