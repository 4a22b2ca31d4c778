use serde_json::Value;

use crate::{CoreError, SpanRecord};

/// Deserialize a span collection from the JSON array an external tracer
/// exported. Individual records are normalized leniently (missing optional
/// fields default), but the outer value must be an array.
pub fn spans_from_json(json: &str) -> Result<Vec<SpanRecord>, CoreError> {
    let value: Value = serde_json::from_str(json)?;
    spans_from_value(value)
}

pub fn spans_from_value(value: Value) -> Result<Vec<SpanRecord>, CoreError> {
    match value {
        Value::Array(items) => items
            .into_iter()
            .map(|item| serde_json::from_value(item).map_err(CoreError::from))
            .collect(),
        Value::Null => Err(CoreError::InvalidArgument("null")),
        Value::Object(_) => Err(CoreError::InvalidArgument("object")),
        Value::String(_) => Err(CoreError::InvalidArgument("string")),
        Value::Number(_) => Err(CoreError::InvalidArgument("number")),
        Value::Bool(_) => Err(CoreError::InvalidArgument("bool")),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_array_of_minimal_records() {
        let spans = spans_from_json(r#"[{"name": "a"}, {"name": "b", "duration_ns": 10}]"#).unwrap();
        assert_eq!(spans.len(), 2);
        assert_eq!(spans[0].name, "a");
        assert_eq!(spans[1].duration(), 10);
    }

    #[test]
    fn empty_array_is_fine() {
        assert!(spans_from_json("[]").unwrap().is_empty());
    }

    #[test]
    fn non_array_is_invalid_argument() {
        assert!(matches!(
            spans_from_json("null"),
            Err(CoreError::InvalidArgument("null"))
        ));
        assert!(matches!(
            spans_from_json(r#"{"name": "a"}"#),
            Err(CoreError::InvalidArgument("object"))
        ));
    }

    #[test]
    fn record_without_name_is_a_parse_error() {
        assert!(matches!(
            spans_from_json(r#"[{"span_id": "ab"}]"#),
            Err(CoreError::Parse(_))
        ));
    }
}
