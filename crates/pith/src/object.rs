//! The public value type.
//!
//! [`Object`] is an owned, heap-free mirror of an interpreter value. It is
//! what the REPL API returns and what tests assert against; unlike the
//! internal value representation it needs no heap to inspect.

use std::fmt;

use crate::{
    heap::{Heap, HeapData},
    value::{Value, display_value},
};

/// A Pith value detached from the interpreter's heap.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    /// The unit value; also what statements evaluate to.
    Void,
    Bool(bool),
    Int(i32),
    Float(f64),
    Str(String),
    List(Vec<Object>),
    /// String-keyed map entries in insertion order.
    Map(Vec<(String, Object)>),
    /// Printable form of a value with no owned mapping (functions, classes,
    /// instances, modules, bound methods).
    Repr(String),
}

impl Object {
    /// Converts an interpreter value into its owned form.
    pub(crate) fn from_value(value: Value, heap: &Heap) -> Self {
        Self::convert(value, heap, 64)
    }

    fn convert(value: Value, heap: &Heap, depth: usize) -> Self {
        if depth == 0 {
            return Self::Repr("...".to_owned());
        }
        match value {
            Value::Void => Self::Void,
            Value::Bool(b) => Self::Bool(b),
            Value::Int(i) => Self::Int(i),
            Value::Float(f) => Self::Float(f),
            Value::Ref(id) => match heap.get(id) {
                HeapData::Str(s) => Self::Str(s.clone()),
                HeapData::List(list) => Self::List(
                    list.items
                        .iter()
                        .map(|item| Self::convert(*item, heap, depth - 1))
                        .collect(),
                ),
                HeapData::Map(map) => Self::Map(
                    map.entries
                        .iter()
                        .map(|(k, v)| (k.clone(), Self::convert(*v, heap, depth - 1)))
                        .collect(),
                ),
                _ => Self::Repr(display_value(value, heap)),
            },
            Value::Builtin(_) | Value::Method(_) | Value::ModuleFn(_) => Self::Repr(display_value(value, heap)),
        }
    }
}

impl fmt::Display for Object {
    /// Renders the object the way `print` would.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Void => write!(f, "void"),
            Self::Bool(b) => write!(f, "{}", if *b { "true" } else { "false" }),
            Self::Int(i) => write!(f, "{i}"),
            Self::Float(x) => write!(f, "{x:.6}"),
            Self::Str(s) => write!(f, "{s}"),
            Self::List(items) => {
                write!(f, "[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{item}")?;
                }
                write!(f, "]")
            }
            Self::Map(entries) => {
                write!(f, "{{")?;
                for (i, (key, value)) in entries.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{key}: {value}")?;
                }
                write!(f, "}}")
            }
            Self::Repr(text) => write!(f, "{text}"),
        }
    }
}
