//! Execution tracing hooks.
//!
//! The interpreter is parameterised over a [`Tracer`] so tracing costs
//! nothing unless requested: with [`NoopTracer`] every hook monomorphises to
//! an empty body. [`StderrTracer`] prints a human-readable execution log,
//! replacing the compile-time debug-print switches of older interpreters.

/// Hook points at key interpreter events. All methods default to no-ops.
pub trait Tracer {
    /// A statement is about to execute.
    fn statement(&mut self, kind: &'static str, line: usize) {
        let _ = (kind, line);
    }

    /// A function call pushed a frame.
    fn call(&mut self, name: &str, depth: usize) {
        let _ = (name, depth);
    }

    /// A function call popped its frame.
    fn ret(&mut self, name: &str, depth: usize) {
        let _ = (name, depth);
    }

    /// A garbage collection cycle finished.
    fn gc(&mut self, freed: usize, live: usize) {
        let _ = (freed, live);
    }
}

/// Zero-cost default tracer.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopTracer;

impl Tracer for NoopTracer {}

/// Logs execution events to stderr.
#[derive(Debug, Default)]
pub struct StderrTracer;

impl Tracer for StderrTracer {
    fn statement(&mut self, kind: &'static str, line: usize) {
        eprintln!("[trace] line {line}: {kind}");
    }

    fn call(&mut self, name: &str, depth: usize) {
        eprintln!("[trace] {:indent$}-> {name}", "", indent = depth * 2);
    }

    fn ret(&mut self, name: &str, depth: usize) {
        eprintln!("[trace] {:indent$}<- {name}", "", indent = depth * 2);
    }

    fn gc(&mut self, freed: usize, live: usize) {
        eprintln!("[trace] gc: freed {freed}, live {live}");
    }
}
