use std::collections::BTreeSet;

use tracing::{debug, warn};

use spangate_core::{AttrNamespace, SpanRecord};

use crate::{RuleTable, ValidationReport, SCHEMA_VERSION};

/// Scores a span collection along four independent dimensions (semantic
/// compliance, coverage, hierarchy, performance) and rolls them into one
/// health score. Holds no mutable state; `validate` calls are independent.
pub struct SpanValidator {
    rules: RuleTable,
    rules_hash: String,
}

impl Default for SpanValidator {
    fn default() -> Self {
        Self::new()
    }
}

impl SpanValidator {
    pub fn new() -> Self {
        Self::with_rules(RuleTable::default())
    }

    pub fn with_rules(rules: RuleTable) -> Self {
        let rules_hash = rules.fingerprint();
        Self { rules, rules_hash }
    }

    pub fn rules(&self) -> &RuleTable {
        &self.rules
    }

    pub fn validate(&self, spans: &[SpanRecord]) -> ValidationReport {
        if spans.is_empty() {
            return self.empty_report();
        }
        debug!(total_spans = spans.len(), "validating span collection");

        let total = spans.len();
        let valid = spans.iter().filter(|s| is_span_valid(s)).count();

        let compliant = spans
            .iter()
            .filter(|s| self.is_semantically_compliant(s))
            .count();
        let semantic_compliance = compliant as f64 / total as f64;

        let coverage_score = self.coverage_score(spans);

        // Hierarchy: every non-root parent reference must resolve within the
        // collection. One dangling reference invalidates the whole batch.
        let known_ids: BTreeSet<&str> = spans
            .iter()
            .filter(|s| !s.span_id.is_empty())
            .map(|s| s.span_id.as_str())
            .collect();
        let mut orphaned = Vec::new();
        let mut issues = Vec::new();
        for span in spans {
            if let Some(parent) = span.parent() {
                if !known_ids.contains(parent.as_str()) {
                    warn!(span = %span.name, parent = %parent, "dangling parent reference");
                    issues.push(format!(
                        "span '{}' references missing parent {}",
                        span.name, parent
                    ));
                    orphaned.push(span.span_id.clone());
                }
            }
        }
        let hierarchy_valid = orphaned.is_empty();

        // Boundary typo check: attribute keys one edit away from a known
        // namespace are almost certainly misspelled, and a misspelled key
        // silently fails every required-attribute match above.
        for span in spans {
            for (key, _) in span.attributes.iter() {
                if let Some(intended) = AttrNamespace::near_miss(key) {
                    warn!(span = %span.name, key = %key, "attribute namespace looks misspelled");
                    issues.push(format!(
                        "span '{}' attribute '{}' looks like a typo of namespace '{}'",
                        span.name, key, intended
                    ));
                }
            }
        }

        let long_spans = spans
            .iter()
            .filter(|s| s.duration_ms() > self.rules.long_span_ms)
            .count();
        let performance_score = 1.0 - long_spans as f64 / total as f64;

        let w = &self.rules.health_weights;
        let health_score = w.semantic * semantic_compliance
            + w.coverage * coverage_score
            + w.hierarchy * if hierarchy_valid { 1.0 } else { 0.0 }
            + w.performance * performance_score;

        if valid < total {
            issues.insert(
                0,
                format!("{} of {} spans failed basic validity", total - valid, total),
            );
        }

        // One recommendation per weak dimension, in dimension order.
        let mut recommendations = Vec::new();
        let threshold = self.rules.recommendation_threshold;
        if semantic_compliance < threshold {
            recommendations.push(
                "Add required semantic attributes to low-compliance span categories".to_string(),
            );
        }
        if coverage_score < threshold {
            recommendations
                .push("Instrument missing components to broaden span coverage".to_string());
        }
        if !hierarchy_valid {
            recommendations.push(
                "Repair dangling parent references to restore the span hierarchy".to_string(),
            );
        }
        if performance_score < threshold {
            recommendations.push(
                "Investigate spans exceeding the long-span duration threshold".to_string(),
            );
        }

        ValidationReport {
            schema_version: SCHEMA_VERSION,
            rules_hash: self.rules_hash.clone(),
            total_spans: total,
            valid_spans: valid,
            semantic_compliance,
            coverage_score,
            performance_score,
            health_score,
            hierarchy_valid,
            orphaned_span_ids: orphaned,
            issues,
            recommendations,
        }
    }

    fn empty_report(&self) -> ValidationReport {
        ValidationReport {
            schema_version: SCHEMA_VERSION,
            rules_hash: self.rules_hash.clone(),
            total_spans: 0,
            valid_spans: 0,
            semantic_compliance: 0.0,
            coverage_score: 0.0,
            performance_score: 0.0,
            health_score: 0.0,
            hierarchy_valid: false,
            orphaned_span_ids: Vec::new(),
            issues: vec!["No spans captured".to_string()],
            recommendations: Vec::new(),
        }
    }

    /// Compliant: categorized, and carrying at least one of the category's
    /// required attributes. Uncategorized spans count against the score.
    fn is_semantically_compliant(&self, span: &SpanRecord) -> bool {
        match self.rules.category_of(span) {
            Some((_, rule)) => {
                rule.required_attrs.is_empty()
                    || rule.required_attrs.iter().any(|a| span.attributes.has(a))
            }
            None => false,
        }
    }

    /// Fraction of the expected-component vocabulary that shows up in at
    /// least one span name.
    fn coverage_score(&self, spans: &[SpanRecord]) -> f64 {
        if self.rules.coverage_vocab.is_empty() {
            return 1.0;
        }
        let matched = self
            .rules
            .coverage_vocab
            .iter()
            .filter(|term| spans.iter().any(|s| s.name.contains(term.as_str())))
            .count();
        matched as f64 / self.rules.coverage_vocab.len() as f64
    }
}

fn is_span_valid(span: &SpanRecord) -> bool {
    !span.name.trim().is_empty() && !span.attributes.is_empty() && span.duration() >= 0
}
