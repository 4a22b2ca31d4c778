use serde::{Deserialize, Serialize};

macro_rules! id_newtype {
    ($name:ident) => {
        #[derive(Clone, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub String);

        impl $name {
            pub fn from_str(s: impl Into<String>) -> Self {
                Self(s.into())
            }
            pub fn as_str(&self) -> &str {
                &self.0
            }
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
            /// True for the all-zero sentinel some exporters emit instead of omitting an id.
            pub fn is_zero(&self) -> bool {
                !self.0.is_empty() && self.0.bytes().all(|b| b == b'0')
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }
    };
}

id_newtype!(SpanId);
id_newtype!(TraceId);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_sentinel() {
        assert!(SpanId::from_str("0000000000000000").is_zero());
        assert!(!SpanId::from_str("").is_zero());
        assert!(!SpanId::from_str("a0b1").is_zero());
    }
}
