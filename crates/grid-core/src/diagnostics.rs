//! Accumulating diagnostics for compilation and validation.
//!
//! Data-quality problems found while compiling a network never abort the
//! compilation. They are appended to a [`Diagnostics`] value that is threaded
//! through every extractor call and inspected by the caller afterwards.
//!
//! - Severity levels (Warning, Error)
//! - Categories for grouping issues (control, topology, reference, ...)
//! - Optional entity references (e.g., "Bus 14", "Trafo 1-2")
//! - Optional offending / expected values for setpoint conflicts
//!
//! # Example
//!
//! ```
//! use grid_core::diagnostics::{category, Diagnostics};
//!
//! let mut diag = Diagnostics::new();
//! diag.add_warning(category::TOPOLOGY, "Network has no slack bus");
//! diag.add_error_with_values(category::CONTROL, "Different control voltage set points", "Bus 3", 1.05, 1.02);
//!
//! assert_eq!(diag.warning_count(), 1);
//! assert_eq!(diag.error_count(), 1);
//! ```

use serde::Serialize;

/// Well-known issue categories.
pub mod category {
    /// Voltage and tap control arbitration
    pub const CONTROL: &str = "control";
    /// Island / connectivity problems
    pub const TOPOLOGY: &str = "topology";
    /// Dangling or inconsistent references between devices
    pub const REFERENCE: &str = "reference";
    /// Value checks on device parameters
    pub const VALIDATION: &str = "validation";
    /// Contingency and investment application
    pub const CONTINGENCY: &str = "contingency";
    /// Element-wise circuit comparison
    pub const COMPARISON: &str = "comparison";
}

/// Severity level for diagnostic issues
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    /// Unusual but operation continued (e.g., defaulted value)
    Warning,
    /// Inconsistent data; the first value was kept
    Error,
}

/// A single diagnostic issue
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DiagnosticIssue {
    pub severity: Severity,
    /// Category for grouping (see [`category`])
    pub category: String,
    pub message: String,
    /// Optional entity reference (e.g., "Bus 14", "Branch 1-2")
    #[serde(skip_serializing_if = "Option::is_none")]
    pub entity: Option<String>,
    /// Offending value, when the issue is about a number
    #[serde(skip_serializing_if = "Option::is_none")]
    pub value: Option<f64>,
    /// Value that was expected (or kept) instead
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expected: Option<f64>,
}

impl DiagnosticIssue {
    pub fn new(
        severity: Severity,
        category: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            severity,
            category: category.into(),
            message: message.into(),
            entity: None,
            value: None,
            expected: None,
        }
    }

    /// Add entity reference to the issue
    pub fn with_entity(mut self, entity: impl Into<String>) -> Self {
        self.entity = Some(entity.into());
        self
    }

    /// Attach the offending and expected values
    pub fn with_values(mut self, value: f64, expected: f64) -> Self {
        self.value = Some(value);
        self.expected = Some(expected);
        self
    }
}

impl std::fmt::Display for DiagnosticIssue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let severity = match self.severity {
            Severity::Warning => "warning",
            Severity::Error => "error",
        };

        write!(f, "[{}:{}] {}", severity, self.category, self.message)?;

        if let Some(entity) = &self.entity {
            write!(f, " ({})", entity)?;
        }
        match (self.value, self.expected) {
            (Some(v), Some(e)) => write!(f, ": got {}, expected {}", v, e)?,
            (Some(v), None) => write!(f, ": got {}", v)?,
            _ => {}
        }

        Ok(())
    }
}

/// Collection of diagnostic issues for an operation
///
/// Issues are kept in insertion order so the log reads in the same order the
/// devices were processed.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Diagnostics {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub issues: Vec<DiagnosticIssue>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a raw issue directly
    pub fn add(&mut self, issue: DiagnosticIssue) {
        self.issues.push(issue);
    }

    // =========================================================================
    // Warning Methods
    // =========================================================================

    pub fn add_warning(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message));
    }

    pub fn add_warning_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity));
    }

    /// Warning carrying the offending value (e.g. an out-of-range setpoint)
    pub fn add_warning_with_value(
        &mut self,
        category: &str,
        message: &str,
        entity: &str,
        value: f64,
    ) {
        let mut issue =
            DiagnosticIssue::new(Severity::Warning, category, message).with_entity(entity);
        issue.value = Some(value);
        self.issues.push(issue);
    }

    // =========================================================================
    // Error Methods
    // =========================================================================

    pub fn add_error(&mut self, category: &str, message: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message));
    }

    pub fn add_error_with_entity(&mut self, category: &str, message: &str, entity: &str) {
        self.issues
            .push(DiagnosticIssue::new(Severity::Error, category, message).with_entity(entity));
    }

    /// Error with offending and expected values (setpoint conflicts)
    pub fn add_error_with_values(
        &mut self,
        category: &str,
        message: &str,
        entity: &str,
        value: f64,
        expected: f64,
    ) {
        self.issues.push(
            DiagnosticIssue::new(Severity::Error, category, message)
                .with_entity(entity)
                .with_values(value, expected),
        );
    }

    // =========================================================================
    // Query Methods
    // =========================================================================

    pub fn warning_count(&self) -> usize {
        self.warnings().count()
    }

    pub fn error_count(&self) -> usize {
        self.errors().count()
    }

    pub fn len(&self) -> usize {
        self.issues.len()
    }

    pub fn is_empty(&self) -> bool {
        self.issues.is_empty()
    }

    pub fn has_errors(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Error)
    }

    pub fn has_warnings(&self) -> bool {
        self.issues.iter().any(|i| i.severity == Severity::Warning)
    }

    /// Get issues filtered by category
    pub fn issues_by_category<'a>(
        &'a self,
        category: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.category == category)
    }

    /// Issues whose message contains `needle`
    pub fn issues_matching<'a>(
        &'a self,
        needle: &'a str,
    ) -> impl Iterator<Item = &'a DiagnosticIssue> {
        self.issues.iter().filter(move |i| i.message.contains(needle))
    }

    pub fn errors(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues.iter().filter(|i| i.severity == Severity::Error)
    }

    pub fn warnings(&self) -> impl Iterator<Item = &DiagnosticIssue> {
        self.issues
            .iter()
            .filter(|i| i.severity == Severity::Warning)
    }

    // =========================================================================
    // Utility Methods
    // =========================================================================

    /// Merge another diagnostics into this one
    pub fn merge(&mut self, other: Diagnostics) {
        self.issues.extend(other.issues);
    }

    pub fn clear(&mut self) {
        self.issues.clear();
    }

    pub fn summary(&self) -> String {
        let plural = |n: usize| if n == 1 { "" } else { "s" };
        match (self.warning_count(), self.error_count()) {
            (0, 0) => "No issues".to_string(),
            (w, 0) => format!("{} warning{}", w, plural(w)),
            (0, e) => format!("{} error{}", e, plural(e)),
            (w, e) => format!("{} warning{}, {} error{}", w, plural(w), e, plural(e)),
        }
    }
}

impl std::fmt::Display for Diagnostics {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Diagnostics: {}", self.summary())?;
        for issue in &self.issues {
            writeln!(f, "  {}", issue)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostics_counts() {
        let mut diag = Diagnostics::new();
        diag.add_warning(category::TOPOLOGY, "test warning");
        diag.add_error(category::CONTROL, "test error");
        diag.add_warning_with_value(category::CONTROL, "out of bounds", "Trafo 1", -1.0);

        assert_eq!(diag.warning_count(), 2);
        assert_eq!(diag.error_count(), 1);
        assert_eq!(diag.len(), 3);
        assert!(diag.has_errors());
        assert!(diag.has_warnings());
    }

    #[test]
    fn test_diagnostics_serialization() {
        let mut diag = Diagnostics::new();
        diag.add_error_with_values(
            category::CONTROL,
            "Different control voltage set points",
            "Bus 2",
            1.05,
            1.02,
        );

        let json = serde_json::to_string_pretty(&diag).unwrap();
        assert!(json.contains("\"error\""));
        assert!(json.contains("\"entity\": \"Bus 2\""));
        assert!(json.contains("\"expected\": 1.02"));
    }

    #[test]
    fn test_diagnostic_issue_display() {
        let issue = DiagnosticIssue::new(Severity::Error, "control", "Conflicting setpoints")
            .with_entity("Bus 14")
            .with_values(1.05, 1.02);

        let display = format!("{}", issue);
        assert!(display.starts_with("[error:control]"));
        assert!(display.contains("Bus 14"));
        assert!(display.contains("got 1.05, expected 1.02"));
    }

    #[test]
    fn test_diagnostics_summary() {
        let mut diag = Diagnostics::new();
        assert_eq!(diag.summary(), "No issues");

        diag.add_warning("topology", "warning");
        assert_eq!(diag.summary(), "1 warning");

        diag.add_error("control", "error");
        assert_eq!(diag.summary(), "1 warning, 1 error");

        diag.add_warning("topology", "another warning");
        assert_eq!(diag.summary(), "2 warnings, 1 error");
    }

    #[test]
    fn test_issues_by_category_and_message() {
        let mut diag = Diagnostics::new();
        diag.add_warning(category::CONTROL, "Unspecified regulation bus");
        diag.add_warning(category::TOPOLOGY, "Isolated bus");
        diag.add_error(category::CONTROL, "Different control voltage set points");

        assert_eq!(diag.issues_by_category(category::CONTROL).count(), 2);
        assert_eq!(diag.issues_matching("regulation").count(), 1);
    }

    #[test]
    fn test_diagnostics_merge() {
        let mut diag1 = Diagnostics::new();
        diag1.add_warning("topology", "warning 1");

        let mut diag2 = Diagnostics::new();
        diag2.add_error("control", "error 1");

        diag1.merge(diag2);
        assert_eq!(diag1.warning_count(), 1);
        assert_eq!(diag1.error_count(), 1);

        diag1.clear();
        assert!(diag1.is_empty());
    }
}
