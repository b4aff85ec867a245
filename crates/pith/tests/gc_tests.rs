//! Garbage-collector property tests, driven through the public session API.

use pith::{CollectStringPrint, NoPrint, Object, ReplSession, Runner};
use pretty_assertions::assert_eq;

/// Everything reachable from the global scope survives a collection;
/// loop-local garbage does not.
#[test]
fn collection_keeps_reachable_values() {
    let mut session = ReplSession::new();
    session
        .execute("string keep = \"important\"\nlist xs = [1, 2, 3]", &mut NoPrint)
        .unwrap();
    // Produce garbage: each iteration's concatenation result dies with the
    // loop-local binding.
    session
        .execute(
            "for (int i = 0; i < 100; i = i + 1):\n    string junk = \"a\" + \"b\"\n",
            &mut NoPrint,
        )
        .unwrap();

    let freed = session.collect_garbage();
    assert!(freed > 0, "the loop must have produced garbage");

    assert_eq!(
        session.execute("keep", &mut NoPrint).unwrap(),
        Object::Str("important".to_owned())
    );
    assert_eq!(session.execute("xs[2]", &mut NoPrint).unwrap(), Object::Int(3));
}

/// A second collection immediately after the first frees nothing.
#[test]
fn sweep_is_idempotent() {
    let mut session = ReplSession::new();
    session
        .execute(
            "for (int i = 0; i < 50; i = i + 1):\n    list junk = [i, i, i]\n",
            &mut NoPrint,
        )
        .unwrap();
    session.collect_garbage();
    assert_eq!(session.collect_garbage(), 0, "sweep must be idempotent");
}

/// Collected slots are reused instead of growing the arena.
#[test]
fn freed_slots_are_recycled() {
    let mut session = ReplSession::new();
    session
        .execute(
            "for (int i = 0; i < 20; i = i + 1):\n    string junk = \"x\" + \"y\"\n",
            &mut NoPrint,
        )
        .unwrap();
    session.collect_garbage();
    let before = session.heap_stats();
    assert!(before.free_slots > 0);

    session
        .execute(
            "for (int i = 0; i < 10; i = i + 1):\n    string junk2 = \"x\" + \"y\"\n",
            &mut NoPrint,
        )
        .unwrap();
    let after = session.heap_stats();
    assert_eq!(
        after.total_slots, before.total_slots,
        "new allocations must reuse freed slots before growing the arena"
    );
}

/// Closure environments are reachable through the function that captured
/// them, so collection cannot break a live closure.
#[test]
fn closures_keep_their_environment_alive() {
    let mut session = ReplSession::new();
    session
        .execute(
            "define make():\n    string secret = \"alive\"\n    define read():\n        return secret\n    return read\n",
            &mut NoPrint,
        )
        .unwrap();
    session.execute("int reader = make()", &mut NoPrint).unwrap();
    session.collect_garbage();
    assert_eq!(
        session.execute("reader()", &mut NoPrint).unwrap(),
        Object::Str("alive".to_owned())
    );
}

/// Instances keep their class and field map alive.
#[test]
fn instances_keep_class_and_fields_alive() {
    let mut session = ReplSession::new();
    session
        .execute(
            "class Box:\n    int v\n    define init(int v): this.v = v\nBox b = new Box(5)\n",
            &mut NoPrint,
        )
        .unwrap();
    session.collect_garbage();
    assert_eq!(session.execute("b.v", &mut NoPrint).unwrap(), Object::Int(5));
}

/// Heap statistics reflect live object counts by type.
#[test]
fn stats_break_down_live_objects() {
    let mut session = ReplSession::new();
    session.execute("list xs = [1, 2]", &mut NoPrint).unwrap();
    session.collect_garbage();
    let stats = session.heap_stats();
    assert!(stats.objects_by_type.get("List").copied().unwrap_or(0) >= 1);
    assert!(stats.objects_by_type.get("Env").copied().unwrap_or(0) >= 1);
    assert_eq!(stats.live_objects + stats.free_slots, stats.total_slots);
}

/// Allocation pressure past the threshold triggers collection mid-run and
/// the program still observes every rooted value.
#[test]
fn threshold_collection_preserves_live_data() {
    // Each iteration allocates a ~1 KiB concatenation that immediately
    // becomes garbage; a few thousand cross the 1 MiB threshold.
    let chunk = "a".repeat(512);
    let source = format!(
        "string keep = \"survivor\"\nfor (int i = 0; i < 4000; i = i + 1):\n    string junk = \"{chunk}\" + \"{chunk}\"\nprint(keep)"
    );
    let runner = Runner::new(&source);
    assert_eq!(runner.parse_errors(), &[]);
    let mut out = CollectStringPrint::new();
    runner.run(&mut out).unwrap();
    assert_eq!(out.output(), "survivor\n");
}
