#![forbid(unsafe_code)]

//! Errors raised by the change-notification layer.

use thiserror::Error;

/// A listener was registered on a value that cannot notify.
///
/// Only [`Object`](crate::Object) properties, [`List`](crate::List) content,
/// and a list's `length` are observable.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("cannot observe {}{kind} value", describe_key(.key.as_deref()))]
pub struct UnobservableTarget {
    /// Kind name of the offending value.
    pub kind: &'static str,
    /// Property that was requested, if any.
    pub key: Option<String>,
}

fn describe_key(key: Option<&str>) -> String {
    key.map(|k| format!("property `{k}` of ")).unwrap_or_default()
}

/// Configuration loading failure.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unobservable_message_names_key() {
        let err = UnobservableTarget {
            kind: "number",
            key: Some("length".into()),
        };
        assert_eq!(err.to_string(), "cannot observe property `length` of number value");

        let err = UnobservableTarget {
            kind: "string",
            key: None,
        };
        assert_eq!(err.to_string(), "cannot observe string value");
    }
}
