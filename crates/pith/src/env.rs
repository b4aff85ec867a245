//! Lexical environments.
//!
//! A scope is a singly-linked chain of single-binding nodes living on the
//! heap; the head is the innermost binding. Name lookup and assignment walk
//! the local chain first and fall back to the global chain. A closure is a
//! function paired with the chain head captured at its definition site.

use crate::{
    error::{RunError, RunResult},
    heap::{EnvNode, Heap, HeapData, HeapId},
    value::Value,
};

/// Pushes a new binding at the head of `*head`.
///
/// Both the value and the old chain head are temp-rooted across the node
/// allocation, so a collection triggered by it cannot sweep either.
pub(crate) fn define(heap: &mut Heap, head: &mut Option<HeapId>, name: &str, value: Value) {
    let mark = heap.root_mark();
    heap.root_value(value);
    if let Some(old_head) = *head {
        heap.push_root(old_head);
    }
    let id = heap.allocate(HeapData::Env(EnvNode {
        name: name.to_owned(),
        value,
        next: *head,
    }));
    heap.truncate_roots(mark);
    *head = Some(id);
}

/// Looks `name` up in `head`'s chain, then in the global chain.
pub(crate) fn get(heap: &Heap, head: Option<HeapId>, name: &str, line: usize) -> RunResult<Value> {
    if let Some(value) = find(heap, head, name) {
        return Ok(value);
    }
    if let Some(value) = find(heap, heap.globals(), name) {
        return Ok(value);
    }
    Err(undefined(name, line))
}

/// Overwrites the innermost existing binding of `name`, falling back to the
/// global chain; errors when the name is bound nowhere.
pub(crate) fn assign(
    heap: &mut Heap,
    head: Option<HeapId>,
    name: &str,
    value: Value,
    line: usize,
) -> RunResult<()> {
    if let Some(node) = find_node(heap, head, name) {
        heap.get_env_mut(node).value = value;
        return Ok(());
    }
    if let Some(node) = find_node(heap, heap.globals(), name) {
        heap.get_env_mut(node).value = value;
        return Ok(());
    }
    Err(undefined(name, line))
}

fn find(heap: &Heap, head: Option<HeapId>, name: &str) -> Option<Value> {
    find_node(heap, head, name).map(|node| heap.get_env(node).value)
}

fn find_node(heap: &Heap, mut cursor: Option<HeapId>, name: &str) -> Option<HeapId> {
    while let Some(id) = cursor {
        let node = heap.get_env(id);
        if node.name == name {
            return Some(id);
        }
        cursor = node.next;
    }
    None
}

fn undefined(name: &str, line: usize) -> RunError {
    RunError::runtime(line, format!("Undefined variable '{name}'."))
}
