use serde_json::json;
use tracing::{debug, warn};

use spangate_core::SpanRecord;

use crate::{
    DodLevel, DodReport, FileCheck, Lie, LieKind, RuleTable, Severity, Violation, WorkflowLookup,
    SCHEMA_VERSION,
};

/// Strict, attribution-aware validator: beyond structural sanity it verifies
/// that claims embedded in span attributes are actually true, through the
/// injected capabilities. A claim the capabilities cannot verify is treated
/// as false (fail-closed): no claim without proof.
pub struct DodValidator {
    rules: RuleTable,
    rules_hash: String,
    files: Box<dyn FileCheck>,
    workflows: Box<dyn WorkflowLookup>,
}

impl DodValidator {
    pub fn new(files: Box<dyn FileCheck>, workflows: Box<dyn WorkflowLookup>) -> Self {
        Self::with_rules(RuleTable::default(), files, workflows)
    }

    pub fn with_rules(
        rules: RuleTable,
        files: Box<dyn FileCheck>,
        workflows: Box<dyn WorkflowLookup>,
    ) -> Self {
        let rules_hash = rules.fingerprint();
        Self {
            rules,
            rules_hash,
            files,
            workflows,
        }
    }

    /// Evaluate all three levels per span. The levels are independent: a
    /// span can pass or fail each on its own, and malformed spans never
    /// abort the batch.
    pub fn validate(&self, spans: &[SpanRecord]) -> DodReport {
        debug!(total_spans = spans.len(), "running definition-of-done validation");

        let total = spans.len();
        let mut violations = Vec::new();
        let mut lies = Vec::new();
        let mut level1_pass = 0;
        let mut level2_pass = 0;
        let mut level3_pass = 0;

        for span in spans {
            if self.check_level1(span, &mut violations) {
                level1_pass += 1;
            }
            if self.check_level2(span, &mut violations, &mut lies) {
                level2_pass += 1;
            }
            if self.check_level3(span, &mut violations, &mut lies) {
                level3_pass += 1;
            }
        }

        let trust_score = if total == 0 {
            0.0
        } else {
            let w = &self.rules.trust_weights;
            w.level1 * level1_pass as f64 / total as f64
                + w.level2 * level2_pass as f64 / total as f64
                + w.level3 * level3_pass as f64 / total as f64
        };

        let has_critical = violations.iter().any(|v: &Violation| v.severity == Severity::Critical);
        let is_done = trust_score >= self.rules.done_threshold && lies.is_empty() && !has_critical;

        if !lies.is_empty() {
            warn!(lies = lies.len(), "contradictions detected in span claims");
        }

        DodReport {
            schema_version: SCHEMA_VERSION,
            rules_hash: self.rules_hash.clone(),
            total_spans: total,
            level1_pass,
            level2_pass,
            level3_pass,
            violations,
            lies_detected: lies,
            trust_score,
            is_done,
        }
    }

    /// Level 1, basic execution: named, traced, ran for a strictly positive
    /// and plausible amount of time.
    fn check_level1(&self, span: &SpanRecord, violations: &mut Vec<Violation>) -> bool {
        let before = violations.len();

        if span.name.trim().is_empty() {
            violations.push(Violation {
                level: DodLevel::L1,
                severity: Severity::Critical,
                description: "span has no name".to_string(),
                evidence: evidence(span),
            });
        }
        if span.trace_id.is_empty() {
            violations.push(Violation {
                level: DodLevel::L1,
                severity: Severity::Critical,
                description: "span has no trace id".to_string(),
                evidence: evidence(span),
            });
        }
        let duration = span.duration();
        if duration <= 0 {
            violations.push(Violation {
                level: DodLevel::L1,
                severity: Severity::Major,
                description: "span duration must be strictly positive".to_string(),
                evidence: json!({
                    "span_id": span.span_id.as_str(),
                    "span_name": span.name,
                    "duration_ns": duration,
                }),
            });
        } else if duration > self.rules.max_reasonable_duration_ns {
            violations.push(Violation {
                level: DodLevel::L1,
                severity: Severity::Major,
                description: format!(
                    "span duration {}ns exceeds the reasonable limit of {}ns",
                    duration, self.rules.max_reasonable_duration_ns
                ),
                evidence: json!({
                    "span_id": span.span_id.as_str(),
                    "span_name": span.name,
                    "duration_ns": duration,
                }),
            });
        }

        violations.len() == before
    }

    /// Level 2, full attribution: the span must say where its code lives,
    /// and everything it claims about the filesystem must check out.
    fn check_level2(
        &self,
        span: &SpanRecord,
        violations: &mut Vec<Violation>,
        lies: &mut Vec<Lie>,
    ) -> bool {
        let before = violations.len();

        match span.attributes.non_empty_str("code.filepath") {
            None => violations.push(Violation {
                level: DodLevel::L2,
                severity: Severity::Critical,
                description: "span is missing code.filepath attribution".to_string(),
                evidence: evidence(span),
            }),
            Some(path) => {
                let path = path.to_string();
                self.verify_file_claim(span, "code.filepath", &path, LieKind::FakeFile, violations, lies);
            }
        }

        if let Some(workflow) = span.attributes.non_empty_str("bpmn.workflow.file") {
            let workflow = workflow.to_string();
            let workflow_exists = self.verify_file_claim(
                span,
                "bpmn.workflow.file",
                &workflow,
                LieKind::FakeBpmn,
                violations,
                lies,
            );
            if workflow_exists {
                if let Some(task_id) = span.attributes.non_empty_str("bpmn.task.id") {
                    self.verify_task_claim(span, &workflow, task_id, violations, lies);
                }
            }
        }

        if span.attributes.get_i64("code.lineno").unwrap_or(0) <= 0 {
            violations.push(Violation {
                level: DodLevel::L2,
                severity: Severity::Major,
                description: "code.lineno is missing or not positive".to_string(),
                evidence: evidence(span),
            });
        }
        if !span.attributes.is_present_non_empty("execution.timestamp") {
            violations.push(Violation {
                level: DodLevel::L2,
                severity: Severity::Major,
                description: "span is missing execution.timestamp".to_string(),
                evidence: evidence(span),
            });
        }

        violations.len() == before
    }

    /// Level 3, semantic compliance: category attributes present, and no
    /// internal contradiction between claimed success and a recorded error.
    fn check_level3(
        &self,
        span: &SpanRecord,
        violations: &mut Vec<Violation>,
        lies: &mut Vec<Lie>,
    ) -> bool {
        let before = violations.len();

        if let Some((category, rule)) = self.rules.category_of(span) {
            if !rule.required_attrs.is_empty()
                && !rule.required_attrs.iter().any(|a| span.attributes.has(a))
            {
                violations.push(Violation {
                    level: DodLevel::L3,
                    severity: Severity::Minor,
                    description: format!(
                        "span lacks the required attributes for category '{category}'"
                    ),
                    evidence: json!({
                        "span_id": span.span_id.as_str(),
                        "span_name": span.name,
                        "required_any_of": rule.required_attrs,
                    }),
                });
            }
        }

        // The canonical lie: a span claiming success while also recording
        // an error in the same breath.
        if span.attributes.is_truthy("execution.success")
            && span.attributes.is_present_non_empty("execution.error")
        {
            let error = span
                .attributes
                .get("execution.error")
                .map(display_value)
                .unwrap_or_default();
            lies.push(Lie {
                kind: LieKind::FalseSuccess,
                claim: "execution.success = true".to_string(),
                reality: format!("execution.error = {error}"),
                span_id: span.span_id.clone(),
            });
            violations.push(Violation {
                level: DodLevel::L3,
                severity: Severity::Critical,
                description: "span claims success while recording an error".to_string(),
                evidence: json!({
                    "span_id": span.span_id.as_str(),
                    "span_name": span.name,
                    "execution.error": error,
                }),
            });
        }

        violations.len() == before
    }

    /// Check one claimed file path. Returns true only when the claim
    /// verified as real; a false or unverifiable claim records a lie plus a
    /// critical violation.
    fn verify_file_claim(
        &self,
        span: &SpanRecord,
        attr: &str,
        path: &str,
        lie_kind: LieKind,
        violations: &mut Vec<Violation>,
        lies: &mut Vec<Lie>,
    ) -> bool {
        match self.files.exists(path) {
            Ok(true) => true,
            Ok(false) => {
                lies.push(Lie {
                    kind: lie_kind,
                    claim: format!("{attr} = {path}"),
                    reality: "file does not exist".to_string(),
                    span_id: span.span_id.clone(),
                });
                violations.push(Violation {
                    level: DodLevel::L2,
                    severity: Severity::Critical,
                    description: format!("{attr} points at a nonexistent file: {path}"),
                    evidence: evidence(span),
                });
                false
            }
            Err(err) => {
                lies.push(Lie {
                    kind: LieKind::Unverifiable,
                    claim: format!("{attr} = {path}"),
                    reality: format!("existence check failed: {err:#}"),
                    span_id: span.span_id.clone(),
                });
                violations.push(Violation {
                    level: DodLevel::L2,
                    severity: Severity::Critical,
                    description: format!("could not verify {attr}: {path}"),
                    evidence: evidence(span),
                });
                false
            }
        }
    }

    fn verify_task_claim(
        &self,
        span: &SpanRecord,
        workflow: &str,
        task_id: &str,
        violations: &mut Vec<Violation>,
        lies: &mut Vec<Lie>,
    ) {
        match self.workflows.resolve_task(workflow, task_id) {
            Ok(res) if res.found => {}
            Ok(res) => {
                lies.push(Lie {
                    kind: LieKind::FakeTask,
                    claim: format!("bpmn.task.id = {task_id} in {workflow}"),
                    reality: res.reason,
                    span_id: span.span_id.clone(),
                });
                violations.push(Violation {
                    level: DodLevel::L2,
                    severity: Severity::Critical,
                    description: format!("task '{task_id}' is not declared in {workflow}"),
                    evidence: evidence(span),
                });
            }
            Err(err) => {
                lies.push(Lie {
                    kind: LieKind::Unverifiable,
                    claim: format!("bpmn.task.id = {task_id} in {workflow}"),
                    reality: format!("workflow lookup failed: {err:#}"),
                    span_id: span.span_id.clone(),
                });
                violations.push(Violation {
                    level: DodLevel::L2,
                    severity: Severity::Critical,
                    description: format!("could not verify task '{task_id}' in {workflow}"),
                    evidence: evidence(span),
                });
            }
        }
    }
}

fn evidence(span: &SpanRecord) -> serde_json::Value {
    json!({
        "span_id": span.span_id.as_str(),
        "span_name": span.name,
    })
}

fn display_value(v: &serde_json::Value) -> String {
    match v {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
