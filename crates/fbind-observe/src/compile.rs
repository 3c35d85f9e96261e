#![forbid(unsafe_code)]

//! Syntax tree to observer/binder compilation.
//!
//! Resolution order for a node's `type`:
//!
//! 1. primitive node kinds (`literal`, `value`, `parameters`, `element`,
//!    `component`, `record`);
//! 2. the closed set of [`Construct`]s;
//! 3. the open [`OperatorTable`].
//!
//! Anything else is a [`CompileError::UnknownNode`].

use std::rc::Rc;

use fbind_core::Value;

use crate::binder::{self, Binder};
use crate::collection;
use crate::error::{BindError, CompileError};
use crate::observer::Observer;
use crate::operators::{self, OperatorTable};
use crate::primitive;
use crate::reconcile;
use crate::syntax::Syntax;

const PRIMITIVES: [&str; 6] = ["literal", "value", "parameters", "element", "component", "record"];

/// Built-in constructs with dedicated observers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Construct {
    Property,
    Get,
    With,
    If,
    RangeContent,
    MapContent,
    Keys,
    Values,
    Items,
    MapBlock,
    FilterBlock,
    EveryBlock,
    SomeBlock,
    SortedBlock,
    GroupBlock,
    GroupMapBlock,
    MinBlock,
    MaxBlock,
    Enumerate,
    Reversed,
    Flatten,
    View,
    Sum,
    Average,
    Has,
    Tuple,
    Range,
}

impl Construct {
    pub const ALL: [Construct; 27] = [
        Self::Property,
        Self::Get,
        Self::With,
        Self::If,
        Self::RangeContent,
        Self::MapContent,
        Self::Keys,
        Self::Values,
        Self::Items,
        Self::MapBlock,
        Self::FilterBlock,
        Self::EveryBlock,
        Self::SomeBlock,
        Self::SortedBlock,
        Self::GroupBlock,
        Self::GroupMapBlock,
        Self::MinBlock,
        Self::MaxBlock,
        Self::Enumerate,
        Self::Reversed,
        Self::Flatten,
        Self::View,
        Self::Sum,
        Self::Average,
        Self::Has,
        Self::Tuple,
        Self::Range,
    ];

    #[must_use]
    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|construct| construct.name() == name)
    }

    /// Node `type` this construct is compiled from.
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Property => "property",
            Self::Get => "get",
            Self::With => "with",
            Self::If => "if",
            Self::RangeContent => "rangeContent",
            Self::MapContent => "mapContent",
            Self::Keys => "keys",
            Self::Values => "values",
            Self::Items => "items",
            Self::MapBlock => "mapBlock",
            Self::FilterBlock => "filterBlock",
            Self::EveryBlock => "everyBlock",
            Self::SomeBlock => "someBlock",
            Self::SortedBlock => "sortedBlock",
            Self::GroupBlock => "groupBlock",
            Self::GroupMapBlock => "groupMapBlock",
            Self::MinBlock => "minBlock",
            Self::MaxBlock => "maxBlock",
            Self::Enumerate => "enumerate",
            Self::Reversed => "reversed",
            Self::Flatten => "flatten",
            Self::View => "view",
            Self::Sum => "sum",
            Self::Average => "average",
            Self::Has => "has",
            Self::Tuple => "tuple",
            Self::Range => "range",
        }
    }

    /// Number of positional arguments; `None` for variadic constructs.
    #[must_use]
    pub const fn arity(self) -> Option<usize> {
        match self {
            Self::Tuple => None,
            Self::RangeContent
            | Self::MapContent
            | Self::Keys
            | Self::Values
            | Self::Items
            | Self::Enumerate
            | Self::Reversed
            | Self::Flatten
            | Self::Sum
            | Self::Average
            | Self::Range => Some(1),
            Self::If | Self::View => Some(3),
            _ => Some(2),
        }
    }

    /// Assemble the observer from already compiled arguments.
    ///
    /// Callers check [`Construct::arity`] first; missing arguments read as
    /// `Undefined`.
    #[must_use]
    pub fn build(self, args: Vec<Observer>) -> Observer {
        let mut args = args.into_iter();
        let mut next = || {
            args.next()
                .unwrap_or_else(|| primitive::literal(Value::Undefined))
        };
        match self {
            Self::Property | Self::Get => primitive::property(next(), next()),
            Self::With => reconcile::with(next(), next()),
            Self::If => reconcile::condition(next(), next(), next()),
            Self::RangeContent | Self::MapContent => next(),
            Self::Keys => collection::keys(next()),
            Self::Values => collection::values(next()),
            Self::Items => collection::items(next()),
            Self::MapBlock => collection::map(next(), next()),
            Self::FilterBlock => collection::filter(next(), next()),
            Self::EveryBlock => collection::every(next(), next()),
            Self::SomeBlock => collection::some(next(), next()),
            Self::SortedBlock => collection::sorted(next(), next()),
            Self::GroupBlock => collection::group(next(), next()),
            Self::GroupMapBlock => collection::group_map(next(), next()),
            Self::MinBlock => collection::min(next(), next()),
            Self::MaxBlock => collection::max(next(), next()),
            Self::Enumerate => collection::enumerate(next()),
            Self::Reversed => collection::reversed(next()),
            Self::Flatten => collection::flatten(next()),
            Self::View => collection::view(next(), next(), next()),
            Self::Sum => collection::sum(next()),
            Self::Average => collection::average(next()),
            Self::Has => collection::has(next(), next()),
            Self::Range => collection::range(next()),
            Self::Tuple => collection::tuple(std::iter::from_fn(|| args.next()).collect()),
        }
    }
}

fn expect_arity(syntax: &Syntax, expected: usize) -> Result<&[Syntax], CompileError> {
    let args = syntax.positional();
    if args.len() == expected {
        Ok(args)
    } else {
        Err(CompileError::Arity {
            kind: syntax.kind.clone(),
            expected,
            found: args.len(),
        })
    }
}

fn missing(syntax: &Syntax, field: &'static str) -> CompileError {
    CompileError::MissingField {
        kind: syntax.kind.clone(),
        field,
    }
}

/// Turns syntax trees into observers and binders.
#[derive(Clone)]
pub struct Compiler {
    operators: OperatorTable,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    /// A compiler over the standard operator set.
    #[must_use]
    pub fn new() -> Self {
        Self::with_operators(OperatorTable::standard())
    }

    #[must_use]
    pub fn with_operators(operators: OperatorTable) -> Self {
        Self { operators }
    }

    #[must_use]
    pub fn operators(&self) -> &OperatorTable {
        &self.operators
    }

    /// Register additional operators.
    pub fn operators_mut(&mut self) -> &mut OperatorTable {
        &mut self.operators
    }

    fn compile_all(&self, args: &[Syntax]) -> Result<Vec<Observer>, CompileError> {
        args.iter().map(|arg| self.compile(arg)).collect()
    }

    /// Compile `syntax` into an observer.
    pub fn compile(&self, syntax: &Syntax) -> Result<Observer, CompileError> {
        tracing::trace!(kind = %syntax.kind, "compile");
        match syntax.kind.as_str() {
            "literal" => Ok(primitive::literal(
                syntax.value.as_ref().map(Value::from_json).unwrap_or_default(),
            )),
            "value" => Ok(primitive::value()),
            "parameters" => Ok(primitive::parameters()),
            "element" => {
                let id = syntax.id.clone().ok_or_else(|| missing(syntax, "id"))?;
                Ok(primitive::element(id))
            }
            "component" => {
                let label = syntax.label.clone().ok_or_else(|| missing(syntax, "label"))?;
                Ok(primitive::component(label))
            }
            "record" => {
                let fields = syntax.named().ok_or_else(|| missing(syntax, "args"))?;
                let fields = fields
                    .iter()
                    .map(|(key, field)| Ok((key.clone(), self.compile(field)?)))
                    .collect::<Result<Vec<_>, CompileError>>()?;
                Ok(primitive::record(fields))
            }
            name => {
                if let Some(construct) = Construct::from_name(name) {
                    let args = match construct.arity() {
                        Some(expected) => expect_arity(syntax, expected)?,
                        None => syntax.positional(),
                    };
                    return Ok(construct.build(self.compile_all(args)?));
                }
                if let Some(operator) = self.operators.get(name) {
                    let args = self.compile_all(syntax.positional())?;
                    return Ok(operators::observe(Rc::clone(&operator.func), args));
                }
                tracing::debug!(kind = name, "unknown syntax node");
                Err(CompileError::UnknownNode {
                    node: Box::new(syntax.clone()),
                })
            }
        }
    }

    /// Compile `syntax` into a binder that writes into the location it denotes.
    pub fn compile_binder(&self, syntax: &Syntax) -> Result<Binder, BindError> {
        tracing::trace!(kind = %syntax.kind, "compile binder");
        match syntax.kind.as_str() {
            "property" | "get" => {
                let args = expect_arity(syntax, 2)?;
                Ok(binder::property(self.compile(&args[0])?, self.compile(&args[1])?))
            }
            "has" => {
                let args = expect_arity(syntax, 2)?;
                Ok(binder::has(self.compile(&args[0])?, self.compile(&args[1])?))
            }
            "equals" => {
                let args = expect_arity(syntax, 2)?;
                Ok(binder::equals(
                    self.compile_binder(&args[0])?,
                    self.compile(&args[1])?,
                ))
            }
            "with" => {
                let args = expect_arity(syntax, 2)?;
                Ok(binder::with(
                    self.compile(&args[0])?,
                    self.compile_binder(&args[1])?,
                ))
            }
            name => {
                let inverse = self.operators.get(name).and_then(|op| op.inverse.clone());
                if let Some(inverse) = inverse {
                    let args = expect_arity(syntax, 1)?;
                    return Ok(binder::invert(inverse, self.compile_binder(&args[0])?));
                }
                let known = PRIMITIVES.contains(&name)
                    || Construct::from_name(name).is_some()
                    || self.operators.contains(name);
                if known {
                    Err(BindError::NonInvertible {
                        kind: name.to_owned(),
                    })
                } else {
                    Err(CompileError::UnknownNode {
                        node: Box::new(syntax.clone()),
                    }
                    .into())
                }
            }
        }
    }
}
