//! The `math` native module: one-argument numeric functions returning float.

use strum::IntoStaticStr;

use crate::{
    error::{RunError, RunResult},
    value::Value,
};

/// Math module functions. The string form of each variant is its Pith name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, IntoStaticStr)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum MathFunction {
    Sqrt,
    Sin,
    Cos,
    Tan,
    Floor,
    Ceil,
    Log,
}

/// Every exported function, in binding order.
pub(crate) const FUNCTIONS: &[MathFunction] = &[
    MathFunction::Sqrt,
    MathFunction::Sin,
    MathFunction::Cos,
    MathFunction::Tan,
    MathFunction::Floor,
    MathFunction::Ceil,
    MathFunction::Log,
];

impl MathFunction {
    pub(crate) fn name(self) -> &'static str {
        self.into()
    }

    pub(crate) fn call(self, args: &[Value], line: usize) -> RunResult<Value> {
        if args.len() != 1 {
            return Err(RunError::runtime(
                line,
                format!("{}() takes exactly one argument.", self.name()),
            ));
        }
        let Some(x) = args[0].as_number() else {
            return Err(RunError::runtime(
                line,
                format!("{}() argument must be a number.", self.name()),
            ));
        };
        let result = match self {
            Self::Sqrt => x.sqrt(),
            Self::Sin => x.sin(),
            Self::Cos => x.cos(),
            Self::Tan => x.tan(),
            Self::Floor => x.floor(),
            Self::Ceil => x.ceil(),
            Self::Log => x.ln(),
        };
        Ok(Value::Float(result))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sqrt_accepts_ints_and_floats() {
        assert_eq!(MathFunction::Sqrt.call(&[Value::Int(9)], 1), Ok(Value::Float(3.0)));
        assert_eq!(
            MathFunction::Sqrt.call(&[Value::Float(16.0)], 1),
            Ok(Value::Float(4.0))
        );
    }

    #[test]
    fn non_numeric_argument_is_an_error() {
        let err = MathFunction::Floor.call(&[Value::Bool(true)], 2).unwrap_err();
        assert_eq!(err.to_string(), "[line 2] Error: floor() argument must be a number.");
    }

    #[test]
    fn arity_is_checked() {
        assert!(MathFunction::Sin.call(&[], 1).is_err());
        assert!(
            MathFunction::Sin
                .call(&[Value::Int(1), Value::Int(2)], 1)
                .is_err()
        );
    }
}
