//! End-to-end interpreter tests.
//!
//! Each test feeds a complete program through [`Runner`] and asserts on the
//! output captured by a [`CollectStringPrint`], so the whole pipeline
//! (lexer, parser, evaluator, heap) is exercised together.

use pith::{CollectStringPrint, RunError, Runner};
use pretty_assertions::assert_eq;

/// Runs a program and returns everything it printed. Panics on parse
/// diagnostics or runtime errors, so tests only assert on output.
fn run(source: &str) -> String {
    let runner = Runner::new(source);
    assert_eq!(runner.parse_errors(), &[], "unexpected parse diagnostics");
    let mut out = CollectStringPrint::new();
    runner.run(&mut out).expect("program should run cleanly");
    out.into_output()
}

/// Runs a program expected to fail and returns the runtime error.
fn run_err(source: &str) -> RunError {
    let runner = Runner::new(source);
    let mut out = CollectStringPrint::new();
    runner.run(&mut out).expect_err("program should fail")
}

// =============================================================================
// Arithmetic and printing
// =============================================================================

#[test]
fn arithmetic_precedence() {
    assert_eq!(run("print(2 + 3 * 4)"), "14\n");
}

#[test]
fn integer_division_truncates() {
    assert_eq!(run("print(7 / 2)"), "3\n");
}

#[test]
fn mixed_arithmetic_promotes_to_float() {
    assert_eq!(run("print(7.0 / 2)"), "3.500000\n");
    assert_eq!(run("print(1 + 0.5)"), "1.500000\n");
}

#[test]
fn power_is_left_associative() {
    assert_eq!(run("print(2 ^ 3 ^ 2)"), "64\n");
    assert_eq!(run("print(2 ^ 0.5 * 0)"), "0.000000\n");
}

#[test]
fn modulo_is_integer_only() {
    assert_eq!(run("print(7 % 3)"), "1\n");
    let err = run_err("print(7.0 % 3)");
    assert_eq!(err.to_string(), "[line 1] Error: Operator '%' requires integer operands.");
}

#[test]
fn unary_operators() {
    assert_eq!(run("print(-2 + 5)"), "3\n");
    assert_eq!(run("print(!true)"), "false\n");
    assert_eq!(run("print(-2.5)"), "-2.500000\n");
}

#[test]
fn division_by_zero_is_reported() {
    let err = run_err("print(1 / 0)");
    assert_eq!(err.to_string(), "[line 1] Error: Division by zero.");
}

#[test]
fn print_separates_arguments_with_single_spaces() {
    assert_eq!(run("print(1, \"two\", 3.0, true)"), "1 two 3.000000 true\n");
}

#[test]
fn string_concatenation_and_equality() {
    assert_eq!(run("print(\"foo\" + \"bar\")"), "foobar\n");
    assert_eq!(run("print(\"a\" == \"a\", \"a\" != \"b\")"), "true true\n");
}

#[test]
fn logical_operators_require_booleans() {
    assert_eq!(run("print(true and false, false or true)"), "false true\n");
    let err = run_err("print(1 and 2)");
    assert_eq!(
        err.to_string(),
        "[line 1] Error: Unsupported operand types for 'and': 'int' and 'int'."
    );
}

#[test]
fn comparisons_promote_mixed_numbers() {
    assert_eq!(run("print(1 < 1.5, 2.0 >= 2, 3 == 3.0)"), "true true true\n");
}

// =============================================================================
// Variables and scoping
// =============================================================================

#[test]
fn declarations_and_assignment() {
    assert_eq!(run("int x = 5\nx = x + 1\nprint(x)"), "6\n");
}

#[test]
fn undeclared_variable_is_an_error() {
    let err = run_err("print(nope)");
    assert_eq!(err.to_string(), "[line 1] Error: Undefined variable 'nope'.");
}

#[test]
fn assignment_to_undeclared_name_is_an_error() {
    let err = run_err("ghost = 1");
    assert_eq!(err.to_string(), "[line 1] Error: Undefined variable 'ghost'.");
}

#[test]
fn block_declarations_shadow_and_expire() {
    let source = "int x = 1\nif true:\n    int x = 2\n    print(x)\nprint(x)";
    assert_eq!(run(source), "2\n1\n");
}

#[test]
fn block_assignment_writes_the_outer_binding() {
    assert_eq!(run("int x = 1\nif true:\n    x = 2\nprint(x)"), "2\n");
}

#[test]
fn declaration_without_initializer_is_void() {
    assert_eq!(run("int x\nprint(x)"), "void\n");
}

// =============================================================================
// Control flow
// =============================================================================

#[test]
fn if_elif_else_chain() {
    let source = "int x = 2\nif x == 1:\n    print(\"one\")\nelif x == 2:\n    print(\"two\")\nelse:\n    print(\"other\")";
    assert_eq!(run(source), "two\n");
}

#[test]
fn integer_conditions_test_zeroness() {
    assert_eq!(run("if 1:\n    print(\"yes\")"), "yes\n");
    assert_eq!(run("if 0:\n    print(\"yes\")\nelse:\n    print(\"no\")"), "no\n");
}

#[test]
fn while_with_break() {
    let source = "int i = 0\nwhile true:\n    i = i + 1\n    if i == 3:\n        break\nprint(i)";
    assert_eq!(run(source), "3\n");
}

#[test]
fn for_loop_counts() {
    assert_eq!(run("for (int i = 0; i < 3; i = i + 1):\n    print(i)"), "0\n1\n2\n");
}

#[test]
fn for_loop_continue_still_increments() {
    let source = "for (int i = 0; i < 4; i = i + 1):\n    if i == 1:\n        continue\n    print(i)";
    assert_eq!(run(source), "0\n2\n3\n");
}

#[test]
fn do_while_runs_body_first() {
    let source = "int i = 0\ndo:\n    i = i + 1\nwhile (i < 3)\nprint(i)";
    assert_eq!(run(source), "3\n");
    // Condition false up front still runs the body once.
    let source = "int i = 9\ndo:\n    i = i + 1\nwhile (false)\nprint(i)";
    assert_eq!(run(source), "10\n");
}

#[test]
fn foreach_iterates_a_list_literal() {
    assert_eq!(run("foreach (int v in [1,2,3]): print(v)"), "1\n2\n3\n");
}

#[test]
fn foreach_continue_skips() {
    let source = "foreach (int v in [1,2,3,4]):\n    if v == 2:\n        continue\n    print(v)";
    assert_eq!(run(source), "1\n3\n4\n");
}

#[test]
fn foreach_requires_a_list() {
    let err = run_err("foreach (int v in 5): print(v)");
    assert_eq!(
        err.to_string(),
        "[line 1] Error: foreach loop can only iterate over a list or array."
    );
}

#[test]
fn loop_variable_is_fresh_each_iteration() {
    // The body shadows nothing and sees the current element only.
    let source = "foreach (string s in [\"a\",\"b\"]):\n    string t = s + \"!\"\n    print(t)";
    assert_eq!(run(source), "a!\nb!\n");
}

// =============================================================================
// Switch
// =============================================================================

#[test]
fn switch_with_break_runs_one_arm() {
    let source = "switch(2): case 1: print(\"a\") case 2: print(\"b\") break default: print(\"d\")";
    assert_eq!(run(source), "b\n");
}

#[test]
fn switch_falls_through_without_break() {
    let source = "switch(1):\n    case 1:\n        print(\"one\")\n    case 2:\n        print(\"two\")\n    default:\n        print(\"d\")";
    assert_eq!(run(source), "one\ntwo\nd\n");
}

#[test]
fn switch_unmatched_runs_default_only() {
    let source = "switch(9):\n    case 1:\n        print(\"one\")\n    default:\n        print(\"d\")";
    assert_eq!(run(source), "d\n");
}

#[test]
fn switch_matches_strings_structurally() {
    let source = "switch(\"b\"):\n    case \"a\":\n        print(1)\n        break\n    case \"b\":\n        print(2)\n        break";
    assert_eq!(run(source), "2\n");
}

#[test]
fn switch_does_not_match_across_types() {
    let source = "switch(1):\n    case \"1\":\n        print(\"s\")\n        break\n    default:\n        print(\"d\")";
    assert_eq!(run(source), "d\n");
}

// =============================================================================
// Functions and closures
// =============================================================================

#[test]
fn function_definition_and_call() {
    let source = "define add(int a, int b):\n    return a + b\nprint(add(2, 3))";
    assert_eq!(run(source), "5\n");
}

#[test]
fn return_type_annotations_are_accepted() {
    let source = "define int double(int x):\n    return x * 2\nprint(double(21))";
    assert_eq!(run(source), "42\n");
}

#[test]
fn closure_captures_definition_site_binding() {
    let source = "define make():\n    int x = 10\n    define inner():\n        return x\n    return inner\nprint(make()())";
    assert_eq!(run(source), "10\n");
}

#[test]
fn closure_state_persists_across_calls() {
    let source = "define make_counter():\n    int n = 0\n    define bump():\n        n = n + 1\n        return n\n    return bump\nint bump = make_counter()\nprint(bump())\nprint(bump())";
    assert_eq!(run(source), "1\n2\n");
}

#[test]
fn independent_closures_do_not_share_state() {
    let source = "define make_counter():\n    int n = 0\n    define bump():\n        n = n + 1\n        return n\n    return bump\nint a = make_counter()\nint b = make_counter()\na()\nprint(a(), b())";
    assert_eq!(run(source), "2 1\n");
}

#[test]
fn call_arity_is_checked() {
    let err = run_err("define f(int a):\n    return a\nf(1, 2)");
    assert_eq!(
        err.to_string(),
        "[line 3] Error: Function 'f' expects 1 argument(s), got 2."
    );
}

#[test]
fn calling_a_non_function_is_an_error() {
    let err = run_err("int x = 3\nx()");
    assert_eq!(err.to_string(), "[line 2] Error: Expression is not callable.");
}

#[test]
fn return_of_a_void_call_still_returns() {
    let source = "define noop():\n    pass\ndefine f():\n    return noop()\n    print(\"unreachable\")\nf()\nprint(\"done\")";
    assert_eq!(run(source), "done\n");
}

#[test]
fn recursion_works() {
    let source = "define fib(int n):\n    if n < 2:\n        return n\n    return fib(n - 1) + fib(n - 2)\nprint(fib(10))";
    assert_eq!(run(source), "55\n");
}

#[test]
fn runaway_recursion_is_a_runtime_error() {
    let err = run_err("define f():\n    return f()\nf()");
    assert_eq!(err.to_string(), "[line 2] Error: Maximum call depth exceeded.");
}

// =============================================================================
// Lists, arrays, and maps
// =============================================================================

#[test]
fn list_literal_index_and_len() {
    assert_eq!(run("list xs = [10, 20, 30]\nprint(xs[1])\nprint(xs.len())"), "20\n3\n");
}

#[test]
fn list_append_and_display() {
    assert_eq!(run("list xs = [1]\nxs.append(2)\nprint(xs)"), "[1, 2]\n");
}

#[test]
fn list_index_assignment() {
    assert_eq!(run("list xs = [1, 2]\nxs[0] = 9\nprint(xs)"), "[9, 2]\n");
}

#[test]
fn list_index_out_of_bounds() {
    let err = run_err("list xs = [1]\nprint(xs[5])");
    assert_eq!(err.to_string(), "[line 2] Error: Index out of bounds.");
}

#[test]
fn list_index_must_be_an_integer() {
    let err = run_err("list xs = [1]\nprint(xs[\"0\"])");
    assert_eq!(err.to_string(), "[line 2] Error: List index must be an integer.");
}

#[test]
fn fixed_array_declaration_prefills_void() {
    assert_eq!(run("int[3] xs\nprint(xs)"), "[void, void, void]\n");
}

#[test]
fn fixed_array_rejects_growth() {
    let err = run_err("int[2] xs\nxs.append(1)");
    assert_eq!(err.to_string(), "[line 2] Error: Cannot append to a fixed-size list.");
}

#[test]
fn fixed_array_allows_element_assignment() {
    assert_eq!(run("int[2] xs\nxs[0] = 7\nprint(xs[0])"), "7\n");
}

#[test]
fn map_literal_index_and_missing_key() {
    let source = "map m = {\"a\": 1, \"b\": 2}\nprint(m[\"a\"])\nprint(m[\"zz\"])";
    assert_eq!(run(source), "1\nvoid\n");
}

#[test]
fn map_index_assignment() {
    assert_eq!(run("map m = {\"a\": 1}\nm[\"b\"] = 2\nprint(m[\"b\"])"), "2\n");
}

#[test]
fn map_keys_must_be_strings() {
    let err = run_err("map m = {1: 2}");
    assert_eq!(err.to_string(), "[line 1] Error: Hashmap keys must be strings.");
}

#[test]
fn typed_map_accepts_matching_inserts() {
    let source = "map<string,int> ages = {\"ada\": 36}\nages[\"alan\"] = 41\nprint(ages[\"alan\"])";
    assert_eq!(run(source), "41\n");
}

#[test]
fn typed_map_rejects_mismatched_value() {
    let err = run_err("map<string,int> ages\nages[\"x\"] = \"old\"");
    assert_eq!(
        err.to_string(),
        "[line 2] Error: Type mismatch: Cannot set value of type 'string' in a hashmap expecting type 'int'."
    );
}

#[test]
fn typed_map_checks_literal_initializer() {
    let err = run_err("map<string,int> ages = {\"x\": \"old\"}");
    assert_eq!(
        err.to_string(),
        "[line 1] Error: Type mismatch: Cannot set value of type 'string' in a hashmap expecting type 'int'."
    );
}

#[test]
fn indexing_a_non_collection_is_an_error() {
    let err = run_err("int x = 1\nprint(x[0])");
    assert_eq!(err.to_string(), "[line 2] Error: Not an indexable type.");
}

// =============================================================================
// Strings
// =============================================================================

#[test]
fn string_method_chain() {
    assert_eq!(run("print(\"  hi \".trim().split(\" \").len())"), "1\n");
}

#[test]
fn split_uses_delimiter_characters_and_drops_empties() {
    assert_eq!(run("print(\"a,b,,c\".split(\",\"))"), "[a, b, c]\n");
}

#[test]
fn join_list_of_strings() {
    assert_eq!(run("print([\"x\", \"y\", \"z\"].join(\"-\"))"), "x-y-z\n");
}

#[test]
fn string_len_counts_characters() {
    assert_eq!(run("print(\"hello\".len())"), "5\n");
}

#[test]
fn unknown_string_method_is_an_error() {
    let err = run_err("\"s\".upper()");
    assert_eq!(
        err.to_string(),
        "[line 1] Error: Value of type 'string' has no field or method named 'upper'."
    );
}

// =============================================================================
// Classes and instances
// =============================================================================

#[test]
fn class_with_init_and_methods() {
    let source = "class Counter:\n    int n\n    define init(): this.n = 0\n    define bump(): this.n = this.n + 1\nCounter c = new Counter()\nc.bump(); c.bump(); print(c.n)";
    assert_eq!(run(source), "2\n");
}

#[test]
fn init_receives_constructor_arguments() {
    let source = "class Point:\n    int x\n    int y\n    define init(int x, int y):\n        this.x = x\n        this.y = y\nPoint p = new Point(3, 4)\nprint(p.x, p.y)";
    assert_eq!(run(source), "3 4\n");
}

#[test]
fn instances_do_not_share_fields() {
    let source = "class P:\n    int x\n    define init(): this.x = 0\nP a = new P()\nP b = new P()\na.x = 5\nprint(a.x, b.x)";
    assert_eq!(run(source), "5 0\n");
}

#[test]
fn methods_can_return_values() {
    let source = "class Box:\n    int v\n    define init(int v): this.v = v\n    define get(): return this.v\nBox b = new Box(9)\nprint(b.get())";
    assert_eq!(run(source), "9\n");
}

#[test]
fn methods_can_call_sibling_methods_through_this() {
    let source = "class T:\n    int n\n    define init(): this.n = 1\n    define a(): return this.b() + 1\n    define b(): return this.n\nT t = new T()\nprint(t.a())";
    assert_eq!(run(source), "2\n");
}

#[test]
fn instantiating_a_non_class_is_an_error() {
    let err = run_err("int x = 1\nnew x()");
    assert_eq!(err.to_string(), "[line 2] Error: Cannot instantiate non-class type.");
}

#[test]
fn missing_member_is_an_error() {
    let source = "class P:\n    define init(): this.q = 1\nP p = new P()\nprint(p.nothing)";
    let err = run_err(source);
    assert_eq!(
        err.to_string(),
        "[line 4] Error: Value of type 'instance' has no field or method named 'nothing'."
    );
}

#[test]
fn extends_stores_the_parent_class() {
    // Methods are not inherited; the parent link only has to resolve.
    let source = "class Animal:\n    define init(): this.kind = \"animal\"\nclass Dog extends Animal:\n    define init(): this.kind = \"dog\"\nDog d = new Dog()\nprint(d.kind)";
    assert_eq!(run(source), "dog\n");
}

#[test]
fn extending_an_unknown_class_is_an_error() {
    let err = run_err("class Dog extends Animal:\n    pass");
    assert_eq!(err.to_string(), "[line 1] Error: Undefined variable 'Animal'.");
}

#[test]
fn instances_print_with_their_class_name() {
    let source = "class P:\n    pass\nP p = new P()\nprint(p)";
    assert_eq!(run(source), "<instance of P>\n");
}

// =============================================================================
// Modules
// =============================================================================

#[test]
fn math_module_functions() {
    assert_eq!(run("import math\nprint(math.sqrt(16))"), "4.000000\n");
    assert_eq!(run("import math\nprint(math.floor(2.7), math.ceil(2.2))"), "2.000000 3.000000\n");
}

#[test]
fn module_values_print_with_their_name() {
    assert_eq!(run("import math\nprint(math)"), "<module math>\n");
}

#[test]
fn absent_module_member_reads_as_void() {
    assert_eq!(run("import math\nprint(math.tau)"), "void\n");
}

#[test]
fn unknown_module_is_an_error() {
    let err = run_err("import nonexistent_module_xyz");
    assert_eq!(
        err.to_string(),
        "[line 1] Error: Module 'nonexistent_module_xyz' not found."
    );
}

#[test]
fn sys_exit_surfaces_the_exit_code() {
    let err = run_err("import sys\nsys.exit(3)");
    assert_eq!(err, RunError::Exit(3));
}

#[test]
fn io_module_roundtrip() {
    let path = std::env::temp_dir().join("pith_io_roundtrip.txt");
    let path_str = path.display().to_string();
    let source = format!(
        "import io\nio.write_file(\"{path_str}\", \"hello from pith\")\nprint(io.read_file(\"{path_str}\"))"
    );
    assert_eq!(run(&source), "hello from pith\n");
    let _ = std::fs::remove_file(path);
}

#[test]
fn io_read_of_missing_file_is_void() {
    assert_eq!(run("import io\nprint(io.read_file(\"/no/such/file.txt\"))"), "void\n");
}

#[test]
fn source_modules_load_and_bind() {
    // Module files resolve relative to the working directory.
    let name = "pith_scratch_module_for_tests";
    std::fs::write(
        format!("{name}.pith"),
        "int answer = 42\ndefine get():\n    return answer\n",
    )
    .expect("write module file");
    let result = std::panic::catch_unwind(|| {
        run(&format!("import {name}\nprint({name}.get())\nprint({name}.answer)"))
    });
    let _ = std::fs::remove_file(format!("{name}.pith"));
    assert_eq!(result.expect("module program should run"), "42\n42\n");
}

// =============================================================================
// Script-mode recovery
// =============================================================================

#[test]
fn parse_diagnostics_do_not_block_execution() {
    let runner = Runner::new("print(1)\n} }\nprint(2)");
    assert!(!runner.parse_errors().is_empty());
    let mut out = CollectStringPrint::new();
    runner.run(&mut out).expect("valid statements still run");
    assert_eq!(out.output(), "1\n2\n");
}

#[test]
fn clock_is_a_global_native() {
    // clock() returns seconds as a float; just prove it is callable and
    // numeric by using it in arithmetic.
    assert_eq!(run("float t = clock()\nprint(t >= 0.0)"), "true\n");
}
