//! Persistent interactive sessions.
//!
//! `ReplSession` keeps interpreter state (heap and global environment)
//! across `execute()` calls, so interactive snippets share variables,
//! functions, classes, and modules. Each snippet is parsed and discarded;
//! function bodies survive because definitions are reference-counted.

use crate::{
    ast::NodeKind,
    error::RunError,
    heap::HeapStats,
    interp::Interp,
    io::PrintWriter,
    object::Object,
    parser::parse,
    repl_error::ReplError,
    tracer::NoopTracer,
};

/// A persistent REPL session.
pub struct ReplSession {
    interp: Interp<NoopTracer>,
}

impl Default for ReplSession {
    fn default() -> Self {
        Self::new()
    }
}

impl ReplSession {
    /// Creates a session with a fresh heap and the global natives bound.
    #[must_use]
    pub fn new() -> Self {
        Self {
            interp: Interp::new(NoopTracer),
        }
    }

    /// Executes one snippet against the session state.
    ///
    /// A snippet consisting of a single expression statement yields its
    /// value; statement sequences yield [`Object::Void`]. Errors abort the
    /// snippet but leave the session usable: the temporary-root stack is
    /// reset and already-executed statements keep their effects.
    pub fn execute(&mut self, source: &str, print: &mut impl PrintWriter) -> Result<Object, ReplError> {
        let (program, diagnostics) = parse(source);
        if let Some(first) = diagnostics.into_iter().next() {
            return Err(ReplError::Parse(first));
        }

        let NodeKind::Program(stmts) = &program.kind else {
            return Ok(Object::Void);
        };

        if let [only] = stmts.as_slice()
            && only.is_expression()
        {
            let value = self.recovering(|interp| interp.eval_toplevel(only, print))?;
            return Ok(Object::from_value(value, &self.interp.heap));
        }

        for stmt in stmts {
            self.recovering(|interp| interp.exec_toplevel(stmt, print))?;
        }
        Ok(Object::Void)
    }

    /// Runs a whole script in this session (the `-i` flag's file phase).
    ///
    /// Script rules apply: parse diagnostics go to stderr and the parsed
    /// portion still executes; a runtime error stops the script.
    pub fn run_script(&mut self, source: &str, print: &mut impl PrintWriter) -> Result<(), RunError> {
        let (program, diagnostics) = parse(source);
        for diagnostic in &diagnostics {
            eprintln!("{diagnostic}");
        }
        let NodeKind::Program(stmts) = &program.kind else {
            return Ok(());
        };
        for stmt in stmts {
            self.recovering(|interp| interp.exec_toplevel(stmt, print))?;
        }
        Ok(())
    }

    /// Runs `body`, resetting the temporary-root stack if it errors so the
    /// unwound rooting windows cannot pin garbage for the session's life.
    fn recovering<T>(
        &mut self,
        body: impl FnOnce(&mut Interp<NoopTracer>) -> Result<T, RunError>,
    ) -> Result<T, RunError> {
        let result = body(&mut self.interp);
        if result.is_err() {
            self.interp.heap.reset_temp_roots();
        }
        result
    }

    /// Names bound in the global scope, innermost first, shadowed names
    /// dropped.
    #[must_use]
    pub fn list_variables(&self) -> Vec<String> {
        let mut names = Vec::new();
        let mut cursor = self.interp.globals;
        while let Some(id) = cursor {
            let node = self.interp.heap.get_env(id);
            if !names.iter().any(|n| n == &node.name) {
                names.push(node.name.clone());
            }
            cursor = node.next;
        }
        names
    }

    /// Snapshot of the session heap, for inspection and tests.
    #[must_use]
    pub fn heap_stats(&self) -> HeapStats {
        self.interp.heap.stats()
    }

    /// Forces a garbage-collection cycle; returns the number of freed
    /// objects.
    pub fn collect_garbage(&mut self) -> usize {
        self.interp.heap.collect()
    }
}

/// Whether an interactive buffer needs more input before it can run.
///
/// A buffer is incomplete while parentheses, brackets, or braces are
/// unbalanced, while its trailing non-whitespace character is `:`, or while
/// a `:`-terminated line has opened a block that has not yet been closed by
/// a blank line.
#[must_use]
pub fn is_input_incomplete(buffer: &str) -> bool {
    if buffer.trim().is_empty() {
        return false;
    }

    let mut parens = 0i32;
    let mut brackets = 0i32;
    let mut braces = 0i32;
    for c in buffer.chars() {
        match c {
            '(' => parens += 1,
            ')' => parens -= 1,
            '[' => brackets += 1,
            ']' => brackets -= 1,
            '{' => braces += 1,
            '}' => braces -= 1,
            _ => {}
        }
    }
    if parens > 0 || brackets > 0 || braces > 0 || buffer.trim_end().ends_with(':') {
        return true;
    }

    // Once a block opener has appeared, wait for an empty line to close the
    // whole construct.
    let block_started = buffer.lines().any(|line| line.trim_end().ends_with(':'));
    if block_started {
        return !(buffer.ends_with("\n\n") || buffer.ends_with("\r\n\r\n"));
    }
    false
}
