//! Native functions and native methods of the built-in types.
//!
//! All natives are enum-dispatched: the registries are closed enums rather
//! than tables of function pointers, so a native handle is a plain `Copy`
//! value and owns nothing on the heap.

use std::{io::BufRead, str::FromStr, sync::OnceLock, time::Instant};

use crate::{
    error::{RunError, RunResult},
    heap::{Heap, HeapData, PithList},
    io::PrintWriter,
    value::{Value, display_value},
};

/// Global native functions, bound in every fresh global environment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum Builtins {
    /// Seconds of wall-clock time since the interpreter started, as float.
    Clock,
    /// Prints its arguments as a prompt, then reads one line from stdin.
    Input,
}

impl Builtins {
    pub(crate) fn call(
        self,
        heap: &mut Heap,
        args: &[Value],
        print: &mut impl PrintWriter,
        _line: usize,
    ) -> RunResult<Value> {
        match self {
            Self::Clock => {
                static START: OnceLock<Instant> = OnceLock::new();
                let start = START.get_or_init(Instant::now);
                Ok(Value::Float(start.elapsed().as_secs_f64()))
            }
            Self::Input => {
                for arg in args {
                    print.stdout_write(&display_value(*arg, heap));
                }
                let mut line = String::new();
                let _ = std::io::stdin().lock().read_line(&mut line);
                while line.ends_with('\n') || line.ends_with('\r') {
                    line.pop();
                }
                Ok(heap.alloc_str(line))
            }
        }
    }
}

/// Native methods on string values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum StrMethod {
    Len,
    Trim,
    Split,
}

/// Native methods on list values.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, strum::Display, strum::EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum ListMethod {
    Len,
    Append,
    Join,
}

/// A native method handle, per receiver type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum NativeMethod {
    Str(StrMethod),
    List(ListMethod),
}

/// Looks up a native string method by name.
pub(crate) fn string_method(name: &str) -> Option<NativeMethod> {
    StrMethod::from_str(name).ok().map(NativeMethod::Str)
}

/// Looks up a native list method by name.
pub(crate) fn list_method(name: &str) -> Option<NativeMethod> {
    ListMethod::from_str(name).ok().map(NativeMethod::List)
}

impl NativeMethod {
    /// Invokes the method. `args[0]` is the receiver, the rest are the call
    /// arguments, mirroring how bound methods prepend `this`.
    pub(crate) fn call(self, heap: &mut Heap, args: &[Value], line: usize) -> RunResult<Value> {
        match self {
            Self::Str(method) => call_str_method(method, heap, args, line),
            Self::List(method) => call_list_method(method, heap, args, line),
        }
    }
}

fn call_str_method(method: StrMethod, heap: &mut Heap, args: &[Value], line: usize) -> RunResult<Value> {
    let receiver = match args.first() {
        Some(Value::Ref(id)) if matches!(heap.get(*id), HeapData::Str(_)) => *id,
        _ => {
            return Err(RunError::runtime(
                line,
                format!("{method}() must be called on a string."),
            ));
        }
    };
    match method {
        StrMethod::Len => {
            if args.len() != 1 {
                return Err(RunError::runtime(line, "len() takes no arguments."));
            }
            let count = heap.get_str(receiver).chars().count();
            Ok(Value::Int(int_len(count)))
        }
        StrMethod::Trim => {
            if args.len() != 1 {
                return Err(RunError::runtime(line, "trim() takes no arguments."));
            }
            let trimmed = heap.get_str(receiver).trim().to_owned();
            Ok(heap.alloc_str(trimmed))
        }
        StrMethod::Split => {
            if args.len() != 2 {
                return Err(RunError::runtime(
                    line,
                    "split() takes exactly one argument (the delimiter).",
                ));
            }
            let delim = match args[1] {
                Value::Ref(id) if matches!(heap.get(id), HeapData::Str(_)) => heap.get_str(id).to_owned(),
                _ => {
                    return Err(RunError::runtime(
                        line,
                        "split() requires a string object and a string delimiter.",
                    ));
                }
            };
            let source = heap.get_str(receiver).to_owned();

            // The delimiter is a set of characters; empty tokens are
            // dropped, and an empty delimiter yields the whole string.
            let tokens: Vec<String> = if delim.is_empty() {
                vec![source]
            } else {
                source
                    .split(|c: char| delim.contains(c))
                    .filter(|t| !t.is_empty())
                    .map(str::to_owned)
                    .collect()
            };

            let list_id = heap.allocate(HeapData::List(PithList {
                items: Vec::with_capacity(tokens.len()),
                is_fixed: false,
            }));
            let mark = heap.root_mark();
            heap.push_root(list_id);
            for token in tokens {
                let item = heap.alloc_str(token);
                match heap.get_mut(list_id) {
                    HeapData::List(list) => list.items.push(item),
                    _ => unreachable!("list allocated above"),
                }
            }
            heap.truncate_roots(mark);
            Ok(Value::Ref(list_id))
        }
    }
}

fn call_list_method(method: ListMethod, heap: &mut Heap, args: &[Value], line: usize) -> RunResult<Value> {
    let receiver = match args.first() {
        Some(Value::Ref(id)) if matches!(heap.get(*id), HeapData::List(_)) => *id,
        _ => {
            return Err(RunError::runtime(
                line,
                format!("{method}() must be called on a list."),
            ));
        }
    };
    match method {
        ListMethod::Len => {
            if args.len() != 1 {
                return Err(RunError::runtime(line, "len() takes no arguments."));
            }
            Ok(Value::Int(int_len(heap.get_list(receiver).items.len())))
        }
        ListMethod::Append => {
            if args.len() != 2 {
                return Err(RunError::runtime(line, "append() takes exactly one argument."));
            }
            let list = heap.get_list_mut(receiver);
            if list.is_fixed {
                return Err(RunError::runtime(line, "Cannot append to a fixed-size list."));
            }
            list.items.push(args[1]);
            Ok(Value::Void)
        }
        ListMethod::Join => {
            if args.len() != 2 {
                return Err(RunError::runtime(
                    line,
                    "join() takes exactly one argument (the delimiter).",
                ));
            }
            let delim = match args[1] {
                Value::Ref(id) if matches!(heap.get(id), HeapData::Str(_)) => heap.get_str(id).to_owned(),
                _ => {
                    return Err(RunError::runtime(
                        line,
                        "join() requires a list object and a string delimiter.",
                    ));
                }
            };
            let items = heap.get_list(receiver).items.clone();
            let mut pieces = Vec::with_capacity(items.len());
            for item in items {
                match item {
                    Value::Ref(id) if matches!(heap.get(id), HeapData::Str(_)) => {
                        pieces.push(heap.get_str(id).to_owned());
                    }
                    _ => {
                        return Err(RunError::runtime(
                            line,
                            "join() can only be called on a list of strings.",
                        ));
                    }
                }
            }
            Ok(heap.alloc_str(pieces.join(&delim)))
        }
    }
}

/// Lengths are reported as Pith ints; clamp rather than wrap on overflow.
fn int_len(len: usize) -> i32 {
    i32::try_from(len).unwrap_or(i32::MAX)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn method_lookup_by_name() {
        assert_eq!(string_method("trim"), Some(NativeMethod::Str(StrMethod::Trim)));
        assert_eq!(list_method("append"), Some(NativeMethod::List(ListMethod::Append)));
        assert_eq!(string_method("append"), None);
        assert_eq!(list_method("trim"), None);
    }

    #[test]
    fn split_drops_empty_tokens() {
        let mut heap = Heap::new();
        let s = heap.alloc_str("a,,b,");
        let delim = heap.alloc_str(",");
        let result = NativeMethod::Str(StrMethod::Split)
            .call(&mut heap, &[s, delim], 1)
            .unwrap();
        let Value::Ref(list_id) = result else {
            panic!("split must return a list");
        };
        let items = heap.get_list(list_id).items.clone();
        assert_eq!(items.len(), 2);
        let Value::Ref(first) = items[0] else { panic!() };
        assert_eq!(heap.get_str(first), "a");
    }

    #[test]
    fn append_to_fixed_list_fails() {
        let mut heap = Heap::new();
        let list = Value::Ref(heap.allocate(HeapData::List(PithList {
            items: vec![Value::Void; 2],
            is_fixed: true,
        })));
        let err = NativeMethod::List(ListMethod::Append)
            .call(&mut heap, &[list, Value::Int(1)], 4)
            .unwrap_err();
        assert_eq!(err.to_string(), "[line 4] Error: Cannot append to a fixed-size list.");
    }

    #[test]
    fn join_concatenates_with_delimiter() {
        let mut heap = Heap::new();
        let a = heap.alloc_str("x");
        let b = heap.alloc_str("y");
        let list = Value::Ref(heap.allocate(HeapData::List(PithList {
            items: vec![a, b],
            is_fixed: false,
        })));
        let delim = heap.alloc_str("-");
        let joined = NativeMethod::List(ListMethod::Join)
            .call(&mut heap, &[list, delim], 1)
            .unwrap();
        let Value::Ref(id) = joined else { panic!() };
        assert_eq!(heap.get_str(id), "x-y");
    }
}
