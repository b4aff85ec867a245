//! The runtime value representation.
//!
//! Small values (void, bool, int, float) and native-function handles are
//! stored inline; everything else lives on the heap and is referenced
//! through `Ref(HeapId)`. Values are `Copy`: the mark-and-sweep heap owns
//! every object, so handing a value around carries no ownership.
//!
//! `break`/`continue` are deliberately *not* values. Statement execution
//! returns a [`Flow`] outcome instead, which keeps the signalling tags from
//! ever leaking into the object graph.

use std::fmt::Write;

use crate::{
    builtins::{Builtins, NativeMethod},
    error::{RunError, RunResult},
    heap::{Heap, HeapData, HeapId},
    modules::ModuleFunction,
};

/// A Pith runtime value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Value {
    Void,
    Bool(bool),
    Int(i32),
    Float(f64),
    /// A global native function (`clock`, `input`).
    Builtin(Builtins),
    /// A native method of a built-in type, stored inside bound methods.
    Method(NativeMethod),
    /// A native module member (`math.sqrt`, `io.read_file`, ...).
    ModuleFn(ModuleFunction),
    /// A heap object handle.
    Ref(HeapId),
}

impl Value {
    /// The type name used in error messages, matching the declared type
    /// vocabulary of the language.
    pub(crate) fn type_name(self, heap: &Heap) -> &'static str {
        match self {
            Self::Void => "void",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::Float(_) => "float",
            Self::Builtin(_) | Self::Method(_) | Self::ModuleFn(_) => "native_function",
            Self::Ref(id) => match heap.get(id) {
                HeapData::Str(_) => "string",
                HeapData::List(_) => "list",
                HeapData::Map(_) => "hashmap",
                HeapData::Function(_) => "function",
                HeapData::Module(_) => "module",
                HeapData::Class(_) => "class",
                HeapData::Instance(_) => "instance",
                HeapData::BoundMethod(_) => "bound_method",
                HeapData::Env(_) => "environment",
            },
        }
    }

    /// Interprets the value as a condition: booleans directly, integers by
    /// their zero-ness. Anything else is an error.
    pub(crate) fn as_condition(self, heap: &Heap, line: usize) -> RunResult<bool> {
        match self {
            Self::Bool(b) => Ok(b),
            Self::Int(i) => Ok(i != 0),
            other => Err(RunError::runtime(
                line,
                format!("Condition must be a boolean, got '{}'.", other.type_name(heap)),
            )),
        }
    }

    /// Reads the value as `f64` when it is numeric.
    pub(crate) fn as_number(self) -> Option<f64> {
        match self {
            Self::Int(i) => Some(f64::from(i)),
            Self::Float(f) => Some(f),
            _ => None,
        }
    }
}

/// Outcome of executing a statement.
///
/// `Break` and `Continue` exist only between a loop body and its loop;
/// `Return` carries a value up to the enclosing call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Flow {
    Normal,
    Break,
    Continue,
    Return(Value),
}

/// Cap on nesting while formatting values, so self-referential containers
/// render as `...` instead of recursing forever.
const MAX_DISPLAY_DEPTH: usize = 64;

/// Renders a value the way `print` shows it: strings raw, floats in fixed
/// six-digit form, containers recursively.
pub(crate) fn display_value(value: Value, heap: &Heap) -> String {
    let mut out = String::new();
    write_value(&mut out, value, heap, MAX_DISPLAY_DEPTH);
    out
}

fn write_value(out: &mut String, value: Value, heap: &Heap, depth: usize) {
    if depth == 0 {
        out.push_str("...");
        return;
    }
    match value {
        Value::Void => out.push_str("void"),
        Value::Bool(b) => out.push_str(if b { "true" } else { "false" }),
        Value::Int(i) => {
            let _ = write!(out, "{i}");
        }
        Value::Float(f) => {
            let _ = write!(out, "{f:.6}");
        }
        Value::Builtin(_) | Value::Method(_) | Value::ModuleFn(_) => out.push_str("<native fn>"),
        Value::Ref(id) => match heap.get(id) {
            HeapData::Str(s) => out.push_str(s),
            HeapData::List(list) => {
                out.push('[');
                for (i, item) in list.items.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    write_value(out, *item, heap, depth - 1);
                }
                out.push(']');
            }
            HeapData::Map(map) => {
                out.push('{');
                for (i, (key, val)) in map.entries.iter().enumerate() {
                    if i > 0 {
                        out.push_str(", ");
                    }
                    let _ = write!(out, "{key}: ");
                    write_value(out, *val, heap, depth - 1);
                }
                out.push('}');
            }
            HeapData::Function(func) => {
                let _ = write!(out, "<function {}>", func.def.name);
            }
            HeapData::Module(module) => {
                let _ = write!(out, "<module {}>", module.name);
            }
            HeapData::Class(class) => {
                let _ = write!(out, "<class {}>", class.name);
            }
            HeapData::Instance(instance) => {
                let class = heap.get_class(instance.class);
                let _ = write!(out, "<instance of {}>", class.name);
            }
            HeapData::BoundMethod(_) => out.push_str("<bound method>"),
            HeapData::Env(_) => out.push_str("<environment>"),
        },
    }
}
