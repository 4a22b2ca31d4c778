//! Plain-data report contract. Everything here serializes to nested
//! maps/sequences/scalars so any reporter (table, markdown, JSON dump) can
//! consume it without depending on the validators. Forward compatibility:
//! fields are only ever added, unknown fields are ignored on input, and
//! `schema_version` bumps on additive changes.

use serde::{Deserialize, Serialize};

use spangate_core::SpanId;

pub const SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Critical,
    Major,
    Minor,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum DodLevel {
    L1,
    L2,
    L3,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LieKind {
    /// `code.filepath` points at a file that does not exist.
    FakeFile,
    /// `bpmn.workflow.file` points at a workflow definition that does not exist.
    FakeBpmn,
    /// `bpmn.task.id` is not declared in the referenced workflow definition.
    FakeTask,
    /// `execution.success = true` alongside a non-empty `execution.error`.
    FalseSuccess,
    /// A claim the injected capabilities could not verify. Treated as a lie
    /// (fail-closed): no claim without proof.
    Unverifiable,
}

/// One rule failure on one span. Violations accumulate; they never stop
/// processing of the remaining spans.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Violation {
    pub level: DodLevel,
    pub severity: Severity,
    pub description: String,
    /// Structured context for the failure (span id, name, offending values).
    #[serde(default)]
    pub evidence: serde_json::Value,
}

/// A detected contradiction between a claim and verified reality. Every lie
/// also records a critical [`Violation`] for the same fact.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Lie {
    #[serde(rename = "type")]
    pub kind: LieKind,
    pub claim: String,
    pub reality: String,
    pub span_id: SpanId,
}

/// Aggregate result of the basic validator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ValidationReport {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    /// Fingerprint of the rule table that produced this report.
    pub rules_hash: String,
    pub total_spans: usize,
    pub valid_spans: usize,
    pub semantic_compliance: f64,
    pub coverage_score: f64,
    pub performance_score: f64,
    pub health_score: f64,
    pub hierarchy_valid: bool,
    /// Spans whose parent reference points at nothing in the collection.
    /// Additive detail behind the `hierarchy_valid` boolean.
    #[serde(default)]
    pub orphaned_span_ids: Vec<SpanId>,
    #[serde(default)]
    pub issues: Vec<String>,
    #[serde(default)]
    pub recommendations: Vec<String>,
}

/// Aggregate result of the strict Definition of Done validator.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DodReport {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    pub rules_hash: String,
    pub total_spans: usize,
    pub level1_pass: usize,
    pub level2_pass: usize,
    pub level3_pass: usize,
    #[serde(default)]
    pub violations: Vec<Violation>,
    #[serde(default)]
    pub lies_detected: Vec<Lie>,
    pub trust_score: f64,
    pub is_done: bool,
}

impl DodReport {
    pub fn has_critical(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == Severity::Critical)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lie_kind_serializes_as_snake_case_type() {
        let lie = Lie {
            kind: LieKind::FalseSuccess,
            claim: "execution.success = true".into(),
            reality: "execution.error = boom".into(),
            span_id: SpanId::from_str("ab"),
        };
        let v = serde_json::to_value(&lie).unwrap();
        assert_eq!(v["type"], "false_success");
    }

    #[test]
    fn unknown_fields_are_ignored_on_input() {
        let json = r#"{
            "schema_version": 1,
            "rules_hash": "deadbeef",
            "total_spans": 1,
            "valid_spans": 1,
            "semantic_compliance": 1.0,
            "coverage_score": 0.2,
            "performance_score": 1.0,
            "health_score": 0.76,
            "hierarchy_valid": true,
            "some_future_dimension": 0.5
        }"#;
        let report: ValidationReport = serde_json::from_str(json).unwrap();
        assert_eq!(report.total_spans, 1);
        assert!(report.issues.is_empty());
    }
}
