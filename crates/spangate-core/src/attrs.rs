use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

/// Dotted-key namespaces the validators care about. Classification only;
/// attributes are open-world and unknown prefixes are always allowed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AttrNamespace {
    Bpmn,
    Code,
    Semantic,
    Execution,
    Other,
}

impl AttrNamespace {
    pub const KNOWN: [&'static str; 4] = ["bpmn", "code", "semantic", "execution"];

    pub fn of(key: &str) -> Self {
        match key.split('.').next().unwrap_or("") {
            "bpmn" => Self::Bpmn,
            "code" => Self::Code,
            "semantic" => Self::Semantic,
            "execution" => Self::Execution,
            _ => Self::Other,
        }
    }

    /// Known namespace the key's first segment is one edit away from.
    /// Catches prefix typos like `bpnm.task.type` at the boundary without
    /// rejecting genuinely foreign namespaces.
    pub fn near_miss(key: &str) -> Option<&'static str> {
        if Self::of(key) != Self::Other {
            return None;
        }
        let prefix = key.split('.').next().unwrap_or("");
        Self::KNOWN.iter().copied().find(|k| one_edit_away(prefix, k))
    }
}

/// One insertion, deletion, substitution, or adjacent transposition apart.
fn one_edit_away(a: &str, b: &str) -> bool {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    if a == b {
        return false;
    }
    match a.len() as i64 - b.len() as i64 {
        0 => {
            let diffs: Vec<usize> = (0..a.len()).filter(|&i| a[i] != b[i]).collect();
            match diffs.as_slice() {
                [_] => true,
                [i, j] => j - i == 1 && a[*i] == b[*j] && a[*j] == b[*i],
                _ => false,
            }
        }
        1 => one_char_deleted(&b, &a),
        -1 => one_char_deleted(&a, &b),
        _ => false,
    }
}

/// True when `longer` equals `shorter` with exactly one extra char.
fn one_char_deleted(shorter: &[char], longer: &[char]) -> bool {
    let mut skipped = false;
    let (mut i, mut j) = (0, 0);
    while i < shorter.len() && j < longer.len() {
        if shorter[i] == longer[j] {
            i += 1;
        } else if skipped {
            return false;
        } else {
            skipped = true;
        }
        j += 1;
    }
    true
}

/// Free-form span attributes keyed by dotted names.
///
/// Backed by a `BTreeMap` so iteration (and everything derived from it,
/// including report output) is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AttrMap(pub BTreeMap<String, Value>);

impl AttrMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.0.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.0.contains_key(key)
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(Value::as_str)
    }

    /// String value for `key`, only if it is non-empty after trimming.
    pub fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.get_str(key).map(str::trim).filter(|s| !s.is_empty())
    }

    pub fn get_i64(&self, key: &str) -> Option<i64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    /// Loose boolean reading: JSON `true`, the strings "true"/"True"/"1",
    /// or a non-zero number. Exporters disagree on attribute value types.
    pub fn is_truthy(&self, key: &str) -> bool {
        match self.0.get(key) {
            Some(Value::Bool(b)) => *b,
            Some(Value::String(s)) => matches!(s.trim(), "true" | "True" | "1"),
            Some(Value::Number(n)) => n.as_f64().map(|f| f != 0.0).unwrap_or(false),
            _ => false,
        }
    }

    /// Present with a meaningful value: non-empty string, or any non-null
    /// non-string value.
    pub fn is_present_non_empty(&self, key: &str) -> bool {
        match self.0.get(key) {
            None | Some(Value::Null) => false,
            Some(Value::String(s)) => !s.trim().is_empty(),
            Some(_) => true,
        }
    }
}

impl FromIterator<(String, Value)> for AttrMap {
    fn from_iter<T: IntoIterator<Item = (String, Value)>>(iter: T) -> Self {
        Self(iter.into_iter().collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn namespace_classification() {
        assert_eq!(AttrNamespace::of("bpmn.task.type"), AttrNamespace::Bpmn);
        assert_eq!(AttrNamespace::of("code.filepath"), AttrNamespace::Code);
        assert_eq!(AttrNamespace::of("semantic.group.id"), AttrNamespace::Semantic);
        assert_eq!(AttrNamespace::of("execution.success"), AttrNamespace::Execution);
        assert_eq!(AttrNamespace::of("custom.thing"), AttrNamespace::Other);
        assert_eq!(AttrNamespace::of(""), AttrNamespace::Other);
    }

    #[test]
    fn near_miss_flags_prefix_typos_only() {
        // substitution, transposition, deletion, insertion
        assert_eq!(AttrNamespace::near_miss("bpmm.task.type"), Some("bpmn"));
        assert_eq!(AttrNamespace::near_miss("bpnm.task.type"), Some("bpmn"));
        assert_eq!(AttrNamespace::near_miss("excution.success"), Some("execution"));
        assert_eq!(AttrNamespace::near_miss("codee.filepath"), Some("code"));
        // exact known prefixes and foreign namespaces are not typos
        assert_eq!(AttrNamespace::near_miss("bpmn.task.type"), None);
        assert_eq!(AttrNamespace::near_miss("custom.thing"), None);
        assert_eq!(AttrNamespace::near_miss("weaver.command"), None);
    }

    #[test]
    fn truthy_accepts_bool_string_and_number() {
        let mut attrs = AttrMap::new();
        attrs.insert("a", json!(true));
        attrs.insert("b", json!("true"));
        attrs.insert("c", json!(1));
        attrs.insert("d", json!(false));
        attrs.insert("e", json!("no"));
        assert!(attrs.is_truthy("a"));
        assert!(attrs.is_truthy("b"));
        assert!(attrs.is_truthy("c"));
        assert!(!attrs.is_truthy("d"));
        assert!(!attrs.is_truthy("e"));
        assert!(!attrs.is_truthy("missing"));
    }

    #[test]
    fn present_non_empty() {
        let mut attrs = AttrMap::new();
        attrs.insert("empty", json!(""));
        attrs.insert("blank", json!("   "));
        attrs.insert("msg", json!("boom"));
        attrs.insert("null", json!(null));
        attrs.insert("num", json!(0));
        assert!(!attrs.is_present_non_empty("empty"));
        assert!(!attrs.is_present_non_empty("blank"));
        assert!(attrs.is_present_non_empty("msg"));
        assert!(!attrs.is_present_non_empty("null"));
        assert!(attrs.is_present_non_empty("num"));
    }

    #[test]
    fn i64_reads_numbers_and_numeric_strings() {
        let mut attrs = AttrMap::new();
        attrs.insert("n", json!(42));
        attrs.insert("s", json!("17"));
        attrs.insert("bad", json!("x"));
        assert_eq!(attrs.get_i64("n"), Some(42));
        assert_eq!(attrs.get_i64("s"), Some(17));
        assert_eq!(attrs.get_i64("bad"), None);
    }
}
