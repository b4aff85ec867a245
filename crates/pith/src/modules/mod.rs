//! Native module implementations.
//!
//! Provides the host-backed modules (`math`, `io`, `sys`). Their members are
//! enum-dispatched functions: `import math` binds each [`ModuleFunction`]
//! into the new module's member map, and calling one dispatches through
//! [`ModuleFunction::call`].

use crate::{
    error::RunResult,
    heap::Heap,
    value::Value,
};

pub(crate) mod io_mod;
pub(crate) mod math;
pub(crate) mod sys;

pub(crate) use io_mod::IoFunction;
pub(crate) use math::MathFunction;
pub(crate) use sys::SysFunction;

/// A native function exported by one of the built-in modules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum ModuleFunction {
    Math(MathFunction),
    Io(IoFunction),
    Sys(SysFunction),
}

impl ModuleFunction {
    pub(crate) fn call(self, heap: &mut Heap, args: &[Value], line: usize) -> RunResult<Value> {
        match self {
            Self::Math(func) => func.call(args, line),
            Self::Io(func) => func.call(heap, args, line),
            Self::Sys(func) => func.call(args, line),
        }
    }
}

/// Returns the member table of a native module, or `None` when `name` names
/// no native module (a source-only module may still exist on disk).
pub(crate) fn native_module(name: &str) -> Option<Vec<(&'static str, ModuleFunction)>> {
    match name {
        "math" => Some(math::FUNCTIONS.iter().map(|f| (f.name(), ModuleFunction::Math(*f))).collect()),
        "io" => Some(io_mod::FUNCTIONS.iter().map(|f| (f.name(), ModuleFunction::Io(*f))).collect()),
        "sys" => Some(sys::FUNCTIONS.iter().map(|f| (f.name(), ModuleFunction::Sys(*f))).collect()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn native_module_lookup() {
        let math = native_module("math").expect("math is native");
        assert!(math.iter().any(|(name, _)| *name == "sqrt"));
        assert!(native_module("collections").is_none());
    }
}
