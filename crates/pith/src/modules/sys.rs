//! The `sys` native module.

use strum::IntoStaticStr;

use crate::{
    error::{RunError, RunResult},
    value::Value,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum SysFunction {
    Exit,
}

pub(crate) const FUNCTIONS: &[SysFunction] = &[SysFunction::Exit];

impl SysFunction {
    pub(crate) fn name(self) -> &'static str {
        self.into()
    }

    pub(crate) fn call(self, args: &[Value], line: usize) -> RunResult<Value> {
        match self {
            Self::Exit => {
                // Surfaces as a distinct error variant so the host process,
                // not the library, performs the actual exit.
                let [Value::Int(code)] = args else {
                    return Err(RunError::runtime(
                        line,
                        "exit() takes exactly one integer argument (the exit code).",
                    ));
                };
                Err(RunError::Exit(*code))
            }
        }
    }
}
