//! Behavioural tests for [`ReplSession`].
//!
//! The session keeps interpreter state (heap, global environment) across
//! `execute()` calls, echoes the value of lone expressions, and stays usable
//! after both parse and runtime errors.

use pith::{CollectStringPrint, NoPrint, Object, ReplError, ReplSession};
use pretty_assertions::assert_eq;

// =============================================================================
// Expression results
// =============================================================================

/// A lone expression evaluates to its value.
#[test]
fn expression_returns_its_value() {
    let mut session = ReplSession::new();
    let result = session.execute("1 + 2", &mut NoPrint).unwrap();
    assert_eq!(result, Object::Int(3));
}

/// Statements evaluate to void, even when they have effects.
#[test]
fn statements_return_void() {
    let mut session = ReplSession::new();
    assert_eq!(session.execute("int x = 5", &mut NoPrint).unwrap(), Object::Void);
    // A sequence containing an expression is still a statement list.
    assert_eq!(session.execute("int y = 1\ny + 1", &mut NoPrint).unwrap(), Object::Void);
}

/// String expressions come back as owned strings.
#[test]
fn string_expressions_come_back_owned() {
    let mut session = ReplSession::new();
    let result = session.execute("\"pith\" + \"!\"", &mut NoPrint).unwrap();
    assert_eq!(result, Object::Str("pith!".to_owned()));
}

/// Containers convert deeply.
#[test]
fn containers_convert_deeply() {
    let mut session = ReplSession::new();
    let result = session.execute("[1, [2, 3]]", &mut NoPrint).unwrap();
    assert_eq!(
        result,
        Object::List(vec![Object::Int(1), Object::List(vec![Object::Int(2), Object::Int(3)])])
    );
    let result = session.execute("{\"a\": 1}", &mut NoPrint).unwrap();
    assert_eq!(result, Object::Map(vec![("a".to_owned(), Object::Int(1))]));
}

/// Function values have no owned mapping and come back as their repr.
#[test]
fn functions_come_back_as_repr() {
    let mut session = ReplSession::new();
    session.execute("define f():\n    return 1\n", &mut NoPrint).unwrap();
    let result = session.execute("f", &mut NoPrint).unwrap();
    assert_eq!(result, Object::Repr("<function f>".to_owned()));
}

// =============================================================================
// Persistence
// =============================================================================

/// Variables persist across execute calls.
#[test]
fn variables_persist_across_snippets() {
    let mut session = ReplSession::new();
    session.execute("int x = 21", &mut NoPrint).unwrap();
    assert_eq!(session.execute("x * 2", &mut NoPrint).unwrap(), Object::Int(42));
}

/// Functions defined in one snippet are callable later, with their bodies
/// intact after the defining snippet's AST is gone.
#[test]
fn functions_persist_across_snippets() {
    let mut session = ReplSession::new();
    session
        .execute("define square(int n):\n    return n * n\n", &mut NoPrint)
        .unwrap();
    assert_eq!(session.execute("square(9)", &mut NoPrint).unwrap(), Object::Int(81));
}

/// Classes persist too, and instances built later still dispatch.
#[test]
fn classes_persist_across_snippets() {
    let mut session = ReplSession::new();
    session
        .execute(
            "class Counter:\n    int n\n    define init(): this.n = 0\n    define bump(): this.n = this.n + 1\n",
            &mut NoPrint,
        )
        .unwrap();
    session.execute("Counter c = new Counter()", &mut NoPrint).unwrap();
    session.execute("c.bump()", &mut NoPrint).unwrap();
    assert_eq!(session.execute("c.n", &mut NoPrint).unwrap(), Object::Int(1));
}

/// The global natives are pre-bound in a fresh session.
#[test]
fn fresh_session_has_the_global_natives() {
    let session = ReplSession::new();
    let names = session.list_variables();
    assert!(names.iter().any(|n| n == "clock"));
    assert!(names.iter().any(|n| n == "input"));
}

// =============================================================================
// Output
// =============================================================================

/// print output goes through the supplied writer.
#[test]
fn print_output_is_captured() {
    let mut session = ReplSession::new();
    let mut out = CollectStringPrint::new();
    session.execute("print(\"a\", 1 + 1)", &mut out).unwrap();
    assert_eq!(out.output(), "a 2\n");
}

// =============================================================================
// Error recovery
// =============================================================================

/// A runtime error aborts the snippet but not the session.
#[test]
fn session_survives_runtime_errors() {
    let mut session = ReplSession::new();
    let err = session.execute("print(nope)", &mut NoPrint).unwrap_err();
    assert!(matches!(err, ReplError::Runtime(_)));
    assert_eq!(session.execute("40 + 2", &mut NoPrint).unwrap(), Object::Int(42));
}

/// A parse error reports without executing anything.
#[test]
fn parse_errors_abort_before_execution() {
    let mut session = ReplSession::new();
    let mut out = CollectStringPrint::new();
    let err = session.execute("} print(1)", &mut out).unwrap_err();
    assert!(matches!(err, ReplError::Parse(_)));
    assert_eq!(out.output(), "", "nothing may execute when the snippet fails to parse");
}

/// Statements before the failing one keep their effects.
#[test]
fn effects_before_an_error_are_kept() {
    let mut session = ReplSession::new();
    let err = session.execute("int kept = 7\nprint(nope)", &mut NoPrint).unwrap_err();
    assert!(matches!(err, ReplError::Runtime(_)));
    assert_eq!(session.execute("kept", &mut NoPrint).unwrap(), Object::Int(7));
}

/// sys.exit is distinguishable from failures.
#[test]
fn sys_exit_reports_its_code() {
    let mut session = ReplSession::new();
    session.execute("import sys", &mut NoPrint).unwrap();
    let err = session.execute("sys.exit(2)", &mut NoPrint).unwrap_err();
    assert_eq!(err.exit_code(), Some(2));
}

// =============================================================================
// Script mode (-i flag)
// =============================================================================

/// run_script seeds the session's globals for later interactive use.
#[test]
fn run_script_preserves_globals_for_the_repl() {
    let mut session = ReplSession::new();
    let mut out = CollectStringPrint::new();
    session
        .run_script("int seeded = 11\nprint(seeded)", &mut out)
        .unwrap();
    assert_eq!(out.output(), "11\n");
    assert_eq!(session.execute("seeded + 1", &mut NoPrint).unwrap(), Object::Int(12));
}
