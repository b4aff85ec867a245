//! The `io` native module: whole-file reads and writes.

use std::fs;

use strum::IntoStaticStr;

use crate::{
    error::{RunError, RunResult},
    heap::{Heap, HeapData},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "snake_case")]
pub(crate) enum IoFunction {
    ReadFile,
    WriteFile,
}

pub(crate) const FUNCTIONS: &[IoFunction] = &[IoFunction::ReadFile, IoFunction::WriteFile];

impl IoFunction {
    pub(crate) fn name(self) -> &'static str {
        self.into()
    }

    pub(crate) fn call(self, heap: &mut Heap, args: &[Value], line: usize) -> RunResult<Value> {
        match self {
            Self::ReadFile => {
                let [path] = args else {
                    return Err(RunError::runtime(
                        line,
                        "read_file() takes exactly one string argument (the path).",
                    ));
                };
                let path = expect_str(heap, *path, line, "read_file() takes exactly one string argument (the path).")?;
                // A missing or unreadable file yields void, not an error.
                match fs::read_to_string(path) {
                    Ok(content) => Ok(heap.alloc_str(content)),
                    Err(_) => Ok(Value::Void),
                }
            }
            Self::WriteFile => {
                let [path, content] = args else {
                    return Err(RunError::runtime(
                        line,
                        "write_file() takes two string arguments (path, content).",
                    ));
                };
                let message = "write_file() takes two string arguments (path, content).";
                let path = expect_str(heap, *path, line, message)?;
                let content = expect_str(heap, *content, line, message)?;
                Ok(Value::Bool(fs::write(path, content).is_ok()))
            }
        }
    }
}

fn expect_str(heap: &Heap, value: Value, line: usize, message: &str) -> RunResult<String> {
    match value {
        Value::Ref(id) => match heap.get(id) {
            HeapData::Str(s) => Ok(s.clone()),
            _ => Err(RunError::runtime(line, message)),
        },
        _ => Err(RunError::runtime(line, message)),
    }
}
