use anyhow::{anyhow, Context, Result};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use std::collections::BTreeMap;
use std::path::Path;

use spangate_core::SpanRecord;

/// One span category: classified by substring match on the span name,
/// compliant when any of `required_attrs` is present.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CategoryRule {
    pub keyword: String,
    #[serde(default)]
    pub required_attrs: Vec<String>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct HealthWeights {
    pub semantic: f64,
    pub coverage: f64,
    pub hierarchy: f64,
    pub performance: f64,
}

impl Default for HealthWeights {
    fn default() -> Self {
        Self {
            semantic: 0.3,
            coverage: 0.3,
            hierarchy: 0.2,
            performance: 0.2,
        }
    }
}

impl HealthWeights {
    fn sum(&self) -> f64 {
        self.semantic + self.coverage + self.hierarchy + self.performance
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct TrustWeights {
    pub level1: f64,
    pub level2: f64,
    pub level3: f64,
}

impl Default for TrustWeights {
    fn default() -> Self {
        // Attribution weighted highest: it is the hardest to fake.
        Self {
            level1: 0.3,
            level2: 0.5,
            level3: 0.2,
        }
    }
}

impl TrustWeights {
    fn sum(&self) -> f64 {
        self.level1 + self.level2 + self.level3
    }
}

/// The full rule configuration both validators run against. All scoring
/// policy lives here rather than in code, so new span categories or
/// adjusted weights ship as configuration.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct RuleTable {
    /// category name -> classification keyword + required attributes
    pub categories: BTreeMap<String, CategoryRule>,
    /// Components expected to appear in at least one span name across the
    /// whole collection (breadth of instrumentation, not per-span quality).
    pub coverage_vocab: Vec<String>,
    #[serde(default)]
    pub health_weights: HealthWeights,
    #[serde(default)]
    pub trust_weights: TrustWeights,
    /// Spans longer than this count against the performance score.
    #[serde(default = "default_long_span_ms")]
    pub long_span_ms: f64,
    /// Durations above this are flagged as unreasonable, not rejected.
    #[serde(default = "default_max_reasonable_duration_ns")]
    pub max_reasonable_duration_ns: i64,
    /// Each dimension below this threshold contributes one recommendation.
    #[serde(default = "default_recommendation_threshold")]
    pub recommendation_threshold: f64,
    /// Minimum trust score for the strict validator's `is_done` verdict.
    #[serde(default = "default_done_threshold")]
    pub done_threshold: f64,
}

fn default_long_span_ms() -> f64 {
    5_000.0
}

fn default_max_reasonable_duration_ns() -> i64 {
    30_000_000_000
}

fn default_recommendation_threshold() -> f64 {
    0.8
}

fn default_done_threshold() -> f64 {
    0.95
}

impl Default for RuleTable {
    fn default() -> Self {
        let mut categories = BTreeMap::new();
        categories.insert(
            "bpmn".to_string(),
            CategoryRule {
                keyword: "bpmn".to_string(),
                required_attrs: vec![
                    "bpmn.task.type".to_string(),
                    "bpmn.task.name".to_string(),
                    "bpmn.workflow.file".to_string(),
                ],
            },
        );
        categories.insert(
            "weaver".to_string(),
            CategoryRule {
                keyword: "weaver".to_string(),
                required_attrs: vec!["weaver.command".to_string(), "weaver.registry".to_string()],
            },
        );
        categories.insert(
            "generation".to_string(),
            CategoryRule {
                keyword: "generation".to_string(),
                required_attrs: vec![
                    "generation.target".to_string(),
                    "generation.language".to_string(),
                    "code.filepath".to_string(),
                ],
            },
        );
        categories.insert(
            "validation".to_string(),
            CategoryRule {
                keyword: "validation".to_string(),
                required_attrs: vec![
                    "validation.target".to_string(),
                    "validation.result".to_string(),
                ],
            },
        );

        Self {
            categories,
            coverage_vocab: vec![
                "bpmn".to_string(),
                "weaver".to_string(),
                "python".to_string(),
                "validation".to_string(),
                "generation".to_string(),
            ],
            health_weights: HealthWeights::default(),
            trust_weights: TrustWeights::default(),
            long_span_ms: default_long_span_ms(),
            max_reasonable_duration_ns: default_max_reasonable_duration_ns(),
            recommendation_threshold: default_recommendation_threshold(),
            done_threshold: default_done_threshold(),
        }
    }
}

impl RuleTable {
    pub fn load_from(path: &Path) -> Result<Self> {
        let s = std::fs::read_to_string(path)
            .with_context(|| format!("read rule table: {}", path.display()))?;
        Self::from_yaml_str(&s)
    }

    pub fn from_yaml_str(s: &str) -> Result<Self> {
        let table: Self = serde_yaml::from_str(s).with_context(|| "parse rule table yaml")?;
        table.validate()?;
        Ok(table)
    }

    pub fn validate(&self) -> Result<()> {
        if self.categories.is_empty() {
            return Err(anyhow!("rule table must declare at least one category"));
        }
        for (name, rule) in &self.categories {
            if rule.keyword.trim().is_empty() {
                return Err(anyhow!("category {} has an empty keyword", name));
            }
        }
        if self.coverage_vocab.iter().any(|t| t.trim().is_empty()) {
            return Err(anyhow!("coverage vocabulary contains an empty term"));
        }
        if (self.health_weights.sum() - 1.0).abs() > 1e-9 {
            return Err(anyhow!(
                "health weights must sum to 1.0, got {}",
                self.health_weights.sum()
            ));
        }
        if (self.trust_weights.sum() - 1.0).abs() > 1e-9 {
            return Err(anyhow!(
                "trust weights must sum to 1.0, got {}",
                self.trust_weights.sum()
            ));
        }
        for (label, v) in [
            ("recommendation_threshold", self.recommendation_threshold),
            ("done_threshold", self.done_threshold),
        ] {
            if !(0.0..=1.0).contains(&v) {
                return Err(anyhow!("{} must be in [0, 1], got {}", label, v));
            }
        }
        if self.long_span_ms <= 0.0 {
            return Err(anyhow!("long_span_ms must be positive"));
        }
        if self.max_reasonable_duration_ns <= 0 {
            return Err(anyhow!("max_reasonable_duration_ns must be positive"));
        }
        Ok(())
    }

    /// First category (in name order) whose keyword appears in the span name.
    pub fn category_of(&self, span: &SpanRecord) -> Option<(&str, &CategoryRule)> {
        self.categories
            .iter()
            .find(|(_, rule)| span.name.contains(&rule.keyword))
            .map(|(name, rule)| (name.as_str(), rule))
    }

    /// Content fingerprint stamped into every report so consumers can tell
    /// which rule table produced a verdict.
    pub fn fingerprint(&self) -> String {
        let v = serde_json::to_value(self).expect("RuleTable serializable");
        let bytes = serde_json::to_vec(&sort_json(v)).expect("json bytes");
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        hex::encode(hasher.finalize())
    }
}

/// Recursively sort object keys for stable hashing.
fn sort_json(v: serde_json::Value) -> serde_json::Value {
    match v {
        serde_json::Value::Object(map) => {
            let mut keys: Vec<_> = map.keys().cloned().collect();
            keys.sort();
            let mut new_map = serde_json::Map::new();
            for k in keys {
                let child = map.get(&k).cloned().unwrap_or(serde_json::Value::Null);
                new_map.insert(k, sort_json(child));
            }
            serde_json::Value::Object(new_map)
        }
        serde_json::Value::Array(arr) => {
            serde_json::Value::Array(arr.into_iter().map(sort_json).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_table_is_valid() {
        RuleTable::default().validate().unwrap();
    }

    #[test]
    fn fingerprint_is_stable_and_content_sensitive() {
        let table = RuleTable::default();
        let h1 = table.fingerprint();
        let h2 = table.fingerprint();
        assert_eq!(h1, h2);
        assert_eq!(h1.len(), 64);

        let mut other = table.clone();
        other.long_span_ms = 10_000.0;
        assert_ne!(h1, other.fingerprint());
    }

    #[test]
    fn category_match_is_substring_on_name() {
        let table = RuleTable::default();
        let span = SpanRecord::named("bpmn.service.generate_models");
        assert_eq!(table.category_of(&span).unwrap().0, "bpmn");
        let span = SpanRecord::named("custom.unrelated");
        assert!(table.category_of(&span).is_none());
    }

    #[test]
    fn yaml_round_trip() {
        let table = RuleTable::default();
        let yaml = serde_yaml::to_string(&table).unwrap();
        let back = RuleTable::from_yaml_str(&yaml).unwrap();
        assert_eq!(table, back);
        assert_eq!(table.fingerprint(), back.fingerprint());
    }

    #[test]
    fn bad_weights_are_rejected() {
        let mut table = RuleTable::default();
        table.health_weights.semantic = 0.9;
        assert!(table.validate().is_err());
    }

    #[test]
    fn empty_categories_are_rejected() {
        let mut table = RuleTable::default();
        table.categories.clear();
        assert!(table.validate().is_err());
    }
}
