use serde::{Deserialize, Serialize};

use crate::{AttrMap, CoreError, SpanId, TraceId};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum StatusCode {
    #[default]
    Unset,
    Ok,
    Error,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanStatus {
    #[serde(default)]
    pub code: StatusCode,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanEvent {
    pub name: String,
    #[serde(default)]
    pub timestamp_unix_nano: i64,
    #[serde(default)]
    pub attributes: AttrMap,
}

/// One observed unit of execution, normalized from whatever shape the
/// external tracer exported.
///
/// The serde model is the normalizer: every field except `name` has a
/// default, so a raw record containing only `{"name": "..."}` deserializes
/// cleanly with empty attributes, zero duration, and no parent. Times are
/// signed so malformed exports (end before start) stay representable and
/// get flagged by the validators instead of being silently clamped.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SpanRecord {
    pub name: String,
    #[serde(default)]
    pub span_id: SpanId,
    #[serde(default)]
    pub trace_id: TraceId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent_span_id: Option<SpanId>,
    #[serde(default)]
    pub start_time_unix_nano: i64,
    #[serde(default)]
    pub end_time_unix_nano: i64,
    /// Explicit duration, for exporters that ship one instead of timestamps.
    /// Takes precedence over `end - start` when present.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub duration_ns: Option<i64>,
    #[serde(default)]
    pub attributes: AttrMap,
    #[serde(default)]
    pub status: SpanStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub events: Vec<SpanEvent>,
}

impl SpanRecord {
    /// Minimal constructor used by callers assembling spans in code.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn duration(&self) -> i64 {
        match self.duration_ns {
            Some(d) => d,
            None => self.end_time_unix_nano - self.start_time_unix_nano,
        }
    }

    pub fn duration_ms(&self) -> f64 {
        self.duration() as f64 / 1_000_000.0
    }

    /// Parent reference, with empty and all-zero sentinels treated as root.
    pub fn parent(&self) -> Option<&SpanId> {
        self.parent_span_id
            .as_ref()
            .filter(|p| !p.is_empty() && !p.is_zero())
    }

    pub fn is_root(&self) -> bool {
        self.parent().is_none()
    }

    /// Strict-mode check: normalization itself never rejects a record, but
    /// callers that opt in can refuse unnamed spans up front.
    pub fn check_named(&self) -> Result<(), CoreError> {
        if self.name.trim().is_empty() {
            return Err(CoreError::MissingName);
        }
        Ok(())
    }
}
