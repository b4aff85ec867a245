//! One-shot script execution.

use crate::{
    ast::Node,
    error::{ParseError, RunError},
    interp::Interp,
    io::PrintWriter,
    parser::parse,
    tracer::{NoopTracer, Tracer},
};

/// Parses a script once and runs it to completion.
///
/// Parsing never fails outright: syntax problems are collected as
/// diagnostics and the successfully parsed portion still executes, so a
/// script with a bad line behaves the way the language's recovery rules
/// describe. Runtime errors are fatal to the run and returned to the caller.
///
/// # Example
/// ```
/// use pith::{CollectStringPrint, Runner};
///
/// let runner = Runner::new("print(2 + 3 * 4)");
/// let mut out = CollectStringPrint::new();
/// runner.run(&mut out).unwrap();
/// assert_eq!(out.output(), "14\n");
/// ```
pub struct Runner {
    program: Node,
    diagnostics: Vec<ParseError>,
}

impl Runner {
    /// Parses `source`, collecting any syntax diagnostics.
    #[must_use]
    pub fn new(source: &str) -> Self {
        let (program, diagnostics) = parse(source);
        Self { program, diagnostics }
    }

    /// Diagnostics recorded while parsing, in source order.
    #[must_use]
    pub fn parse_errors(&self) -> &[ParseError] {
        &self.diagnostics
    }

    /// Runs the program against a fresh interpreter.
    pub fn run(&self, print: &mut impl PrintWriter) -> Result<(), RunError> {
        self.run_with_tracer(print, NoopTracer)
    }

    /// Runs the program with a custom [`Tracer`].
    pub fn run_with_tracer(&self, print: &mut impl PrintWriter, tracer: impl Tracer) -> Result<(), RunError> {
        let mut interp = Interp::new(tracer);
        interp.run_program(&self.program, print)
    }
}
