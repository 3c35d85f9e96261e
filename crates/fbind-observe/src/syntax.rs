#![forbid(unsafe_code)]

//! Syntax trees consumed by the compiler.
//!
//! Nodes arrive from an external parser in the wire shape
//! `{type, value?, id?, label?, args?}`, where `args` is either an ordered
//! array of nodes or, for `record`, a map of named nodes:
//!
//! ```
//! use fbind_observe::Syntax;
//!
//! let node: Syntax = serde_json::from_str(r#"{
//!     "type": "property",
//!     "args": [{"type": "value"}, {"type": "literal", "value": "foo"}]
//! }"#).unwrap();
//! assert_eq!(node, Syntax::path("foo"));
//! ```

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

/// Child nodes of a syntax node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Args {
    Positional(Vec<Syntax>),
    Named(IndexMap<String, Syntax>),
}

/// One node of a parsed binding expression.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Syntax {
    /// Node kind: a primitive kind, a collection construct, or an operator name.
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub label: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub args: Option<Args>,
}

impl Syntax {
    /// A bare node of the given kind.
    #[must_use]
    pub fn node(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            value: None,
            id: None,
            label: None,
            args: None,
        }
    }

    #[must_use]
    pub fn literal(value: impl Into<serde_json::Value>) -> Self {
        Self {
            value: Some(value.into()),
            ..Self::node("literal")
        }
    }

    #[must_use]
    pub fn value() -> Self {
        Self::node("value")
    }

    #[must_use]
    pub fn parameters() -> Self {
        Self::node("parameters")
    }

    #[must_use]
    pub fn element(id: impl Into<String>) -> Self {
        Self {
            id: Some(id.into()),
            ..Self::node("element")
        }
    }

    #[must_use]
    pub fn component(label: impl Into<String>) -> Self {
        Self {
            label: Some(label.into()),
            ..Self::node("component")
        }
    }

    #[must_use]
    pub fn record<K: Into<String>>(fields: impl IntoIterator<Item = (K, Syntax)>) -> Self {
        Self {
            args: Some(Args::Named(
                fields.into_iter().map(|(k, v)| (k.into(), v)).collect(),
            )),
            ..Self::node("record")
        }
    }

    /// A node applying `kind` to positional arguments.
    #[must_use]
    pub fn call(kind: impl Into<String>, args: impl IntoIterator<Item = Syntax>) -> Self {
        Self {
            args: Some(Args::Positional(args.into_iter().collect())),
            ..Self::node(kind)
        }
    }

    /// `object.key`
    #[must_use]
    pub fn property(object: Syntax, key: &str) -> Self {
        Self::call("property", [object, Self::literal(key)])
    }

    /// Dotted property path from the scope value; `"a.b"` reads `value.a.b`.
    #[must_use]
    pub fn path(path: &str) -> Self {
        path.split('.')
            .filter(|segment| !segment.is_empty())
            .fold(Self::value(), Self::property)
    }

    /// Positional arguments, or an empty slice.
    #[must_use]
    pub fn positional(&self) -> &[Syntax] {
        match &self.args {
            Some(Args::Positional(args)) => args,
            _ => &[],
        }
    }

    #[must_use]
    pub fn named(&self) -> Option<&IndexMap<String, Syntax>> {
        match &self.args {
            Some(Args::Named(args)) => Some(args),
            _ => None,
        }
    }
}
