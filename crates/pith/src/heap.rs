//! The garbage-collected heap.
//!
//! All runtime objects (strings, lists, maps, functions, modules, classes,
//! instances, bound methods, and environment nodes) live in a slot arena
//! addressed by [`HeapId`]. Collection is mark-and-sweep: marking walks the
//! root set (the global environment head plus the temporary-root stack) with
//! an explicit worklist, sweeping returns unmarked slots to a free list.
//!
//! A collection is triggered by allocation once the byte estimate crosses the
//! current threshold; after a cycle the threshold is set to twice the live
//! bytes with a 1 MiB floor.

use std::{collections::BTreeMap, rc::Rc};

use ahash::RandomState;
use indexmap::IndexMap;

use crate::{
    ast::{FuncDef, TypeTag},
    value::Value,
};

/// Index of a live object in the heap arena.
///
/// Plain index, no generation counter: the language has no `id()`-style
/// identity observable across slot reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HeapId(usize);

impl HeapId {
    #[inline]
    fn index(self) -> usize {
        self.0
    }
}

/// String-keyed hash map object, also used for instance fields, class method
/// tables, and module member tables.
///
/// `IndexMap` keeps insertion order for display; the language does not
/// guarantee any iteration order.
#[derive(Debug)]
pub(crate) struct PithMap {
    pub entries: IndexMap<String, Value, RandomState>,
    /// Declared key constraint; `None` means unconstrained.
    pub key_type: Option<TypeTag>,
    /// Declared value constraint, checked on every insert.
    pub value_type: Option<TypeTag>,
}

impl PithMap {
    pub(crate) fn unconstrained() -> Self {
        Self::typed(None, None)
    }

    pub(crate) fn typed(key_type: Option<TypeTag>, value_type: Option<TypeTag>) -> Self {
        Self {
            entries: IndexMap::default(),
            key_type,
            value_type,
        }
    }
}

/// List object. `is_fixed` marks arrays declared with a size, which refuse
/// to grow.
#[derive(Debug)]
pub(crate) struct PithList {
    pub items: Vec<Value>,
    pub is_fixed: bool,
}

/// A user function: its shared definition and the environment chain captured
/// at the definition site (the closure).
#[derive(Debug)]
pub(crate) struct Function {
    pub def: Rc<FuncDef>,
    pub env: Option<HeapId>,
}

/// A loaded module: name plus a map of its exported members.
#[derive(Debug)]
pub(crate) struct Module {
    pub name: String,
    /// `HeapData::Map` holding the exported bindings.
    pub members: HeapId,
}

/// A class: method table, declared field names, optional parent.
#[derive(Debug)]
pub(crate) struct Class {
    pub name: String,
    /// `HeapData::Map` from method name to function value.
    pub methods: HeapId,
    pub fields: Vec<String>,
    pub parent: Option<HeapId>,
}

/// An instance: its class and a field map pre-filled with void for every
/// declared field.
#[derive(Debug)]
pub(crate) struct Instance {
    pub class: HeapId,
    /// `HeapData::Map` of field values.
    pub fields: HeapId,
}

/// A `(receiver, method)` pair produced by accessing a method through `.`.
#[derive(Debug)]
pub(crate) struct BoundMethod {
    pub receiver: Value,
    pub method: Value,
}

/// A single lexical binding. Scopes are chains of these nodes, innermost
/// first; `next` points outward.
#[derive(Debug)]
pub(crate) struct EnvNode {
    pub name: String,
    pub value: Value,
    pub next: Option<HeapId>,
}

/// Payload of one heap slot.
#[derive(Debug)]
pub(crate) enum HeapData {
    Str(String),
    List(PithList),
    Map(PithMap),
    Function(Function),
    Module(Module),
    Class(Class),
    Instance(Instance),
    BoundMethod(BoundMethod),
    Env(EnvNode),
}

impl HeapData {
    /// Static variant name, used for heap statistics.
    fn variant_name(&self) -> &'static str {
        match self {
            Self::Str(_) => "Str",
            Self::List(_) => "List",
            Self::Map(_) => "Map",
            Self::Function(_) => "Function",
            Self::Module(_) => "Module",
            Self::Class(_) => "Class",
            Self::Instance(_) => "Instance",
            Self::BoundMethod(_) => "BoundMethod",
            Self::Env(_) => "Env",
        }
    }

    /// Rough byte estimate, charged at allocation time and credited back on
    /// sweep. Mutations after allocation are not re-measured.
    fn estimate_size(&self) -> usize {
        let payload = match self {
            Self::Str(s) => s.len(),
            Self::List(list) => list.items.capacity() * size_of::<Value>(),
            Self::Map(map) => map
                .entries
                .iter()
                .map(|(k, _)| k.len() + size_of::<Value>())
                .sum(),
            Self::Function(_) | Self::Module(_) | Self::Instance(_) | Self::BoundMethod(_) => 0,
            Self::Class(class) => class.fields.iter().map(String::len).sum(),
            Self::Env(env) => env.name.len(),
        };
        size_of::<Self>() + payload
    }
}

struct HeapEntry {
    marked: bool,
    /// Byte estimate charged when the slot was filled.
    size: usize,
    data: HeapData,
}

/// Snapshot of heap state at a point in time, for tests and diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HeapStats {
    /// Number of live objects on the heap.
    pub live_objects: usize,
    /// Number of free (recycled) slots available for reuse.
    pub free_slots: usize,
    /// Total arena capacity (live + free).
    pub total_slots: usize,
    /// Estimated live bytes.
    pub bytes_allocated: usize,
    /// Breakdown of live objects by variant name, in a deterministic order.
    pub objects_by_type: BTreeMap<&'static str, usize>,
}

/// Collection threshold floor.
const MIN_GC_THRESHOLD: usize = 1024 * 1024;

/// Capacity of the temporary-root stack. Overflow means an unbalanced
/// rooting window, which is an interpreter bug rather than a program error.
const MAX_TEMP_ROOTS: usize = 4096;

pub(crate) struct Heap {
    entries: Vec<Option<HeapEntry>>,
    /// Slots freed by sweep, reused before the arena grows.
    free_list: Vec<HeapId>,
    bytes_allocated: usize,
    next_gc: usize,
    /// Head of the global environment chain; the primary GC root.
    globals: Option<HeapId>,
    /// Roots protecting objects that are reachable only from the host stack
    /// (values under construction, call frames, loop environments).
    temp_roots: Vec<HeapId>,
    /// Completed collection cycles.
    collections: usize,
    /// Objects freed by the most recent cycle, for tracing.
    last_freed: usize,
}

impl Heap {
    pub(crate) fn new() -> Self {
        Self {
            entries: Vec::new(),
            free_list: Vec::new(),
            bytes_allocated: 0,
            next_gc: MIN_GC_THRESHOLD,
            globals: None,
            temp_roots: Vec::new(),
            collections: 0,
            last_freed: 0,
        }
    }

    // --- Roots ---

    pub(crate) fn set_globals(&mut self, head: Option<HeapId>) {
        self.globals = head;
    }

    pub(crate) fn globals(&self) -> Option<HeapId> {
        self.globals
    }

    /// Current height of the temporary-root stack. Pass the returned mark to
    /// [`truncate_roots`](Self::truncate_roots) to close the window.
    pub(crate) fn root_mark(&self) -> usize {
        self.temp_roots.len()
    }

    pub(crate) fn push_root(&mut self, id: HeapId) {
        assert!(
            self.temp_roots.len() < MAX_TEMP_ROOTS,
            "temporary-root stack overflow (unbalanced rooting window)"
        );
        self.temp_roots.push(id);
    }

    /// Roots `value` when it is a heap reference; immediates need none.
    pub(crate) fn root_value(&mut self, value: Value) {
        if let Value::Ref(id) = value {
            self.push_root(id);
        }
    }

    pub(crate) fn truncate_roots(&mut self, mark: usize) {
        self.temp_roots.truncate(mark);
    }

    /// Drops every temporary root. Used by REPL error recovery, where the
    /// unwinding `?` chain skips the usual truncation points.
    pub(crate) fn reset_temp_roots(&mut self) {
        self.temp_roots.clear();
    }

    // --- Allocation ---

    /// Allocates a heap object, collecting first when the live-byte estimate
    /// has crossed the threshold. The new object is not yet rooted; callers
    /// root it (or link it into a rooted graph) before allocating again.
    pub(crate) fn allocate(&mut self, data: HeapData) -> HeapId {
        if self.bytes_allocated > self.next_gc {
            self.collect();
        }
        let size = data.estimate_size();
        self.bytes_allocated += size;
        let entry = HeapEntry {
            marked: false,
            size,
            data,
        };
        if let Some(id) = self.free_list.pop() {
            self.entries[id.index()] = Some(entry);
            id
        } else {
            let id = HeapId(self.entries.len());
            self.entries.push(Some(entry));
            id
        }
    }

    pub(crate) fn alloc_str(&mut self, text: impl Into<String>) -> Value {
        Value::Ref(self.allocate(HeapData::Str(text.into())))
    }

    // --- Access ---

    /// # Panics
    /// Panics when the slot was never allocated or has been swept; either is
    /// an interpreter bug (a missing root), not a program error.
    pub(crate) fn get(&self, id: HeapId) -> &HeapData {
        &self
            .entries
            .get(id.index())
            .expect("Heap::get: slot out of range")
            .as_ref()
            .expect("Heap::get: object already freed")
            .data
    }

    pub(crate) fn get_mut(&mut self, id: HeapId) -> &mut HeapData {
        &mut self
            .entries
            .get_mut(id.index())
            .expect("Heap::get_mut: slot out of range")
            .as_mut()
            .expect("Heap::get_mut: object already freed")
            .data
    }

    pub(crate) fn get_str(&self, id: HeapId) -> &str {
        match self.get(id) {
            HeapData::Str(s) => s,
            other => panic!("expected string, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_list(&self, id: HeapId) -> &PithList {
        match self.get(id) {
            HeapData::List(list) => list,
            other => panic!("expected list, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_list_mut(&mut self, id: HeapId) -> &mut PithList {
        match self.get_mut(id) {
            HeapData::List(list) => list,
            other => panic!("expected list, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_map(&self, id: HeapId) -> &PithMap {
        match self.get(id) {
            HeapData::Map(map) => map,
            other => panic!("expected map, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_map_mut(&mut self, id: HeapId) -> &mut PithMap {
        match self.get_mut(id) {
            HeapData::Map(map) => map,
            other => panic!("expected map, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_env(&self, id: HeapId) -> &EnvNode {
        match self.get(id) {
            HeapData::Env(env) => env,
            other => panic!("expected environment node, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_env_mut(&mut self, id: HeapId) -> &mut EnvNode {
        match self.get_mut(id) {
            HeapData::Env(env) => env,
            other => panic!("expected environment node, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_class(&self, id: HeapId) -> &Class {
        match self.get(id) {
            HeapData::Class(class) => class,
            other => panic!("expected class, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_instance(&self, id: HeapId) -> &Instance {
        match self.get(id) {
            HeapData::Instance(instance) => instance,
            other => panic!("expected instance, found {}", other.variant_name()),
        }
    }

    pub(crate) fn get_function(&self, id: HeapId) -> &Function {
        match self.get(id) {
            HeapData::Function(func) => func,
            other => panic!("expected function, found {}", other.variant_name()),
        }
    }

    /// True when `id` currently holds a live object. Only meaningful in
    /// tests probing collection behaviour.
    pub(crate) fn is_live(&self, id: HeapId) -> bool {
        self.entries.get(id.index()).is_some_and(Option::is_some)
    }

    // --- Collection ---

    /// Runs a full mark-and-sweep cycle and returns the number of freed
    /// objects. The threshold for the next cycle is `2 x live bytes`,
    /// floored at 1 MiB.
    pub(crate) fn collect(&mut self) -> usize {
        self.mark_roots();
        let freed = self.sweep();
        self.next_gc = (self.bytes_allocated * 2).max(MIN_GC_THRESHOLD);
        self.collections += 1;
        self.last_freed = freed;
        freed
    }

    pub(crate) fn collections(&self) -> usize {
        self.collections
    }

    pub(crate) fn last_freed(&self) -> usize {
        self.last_freed
    }

    pub(crate) fn live_objects(&self) -> usize {
        self.entries.iter().flatten().count()
    }

    fn mark_roots(&mut self) {
        let mut worklist: Vec<HeapId> = Vec::new();
        if let Some(head) = self.globals {
            worklist.push(head);
        }
        worklist.extend_from_slice(&self.temp_roots);

        while let Some(id) = worklist.pop() {
            let entry = self
                .entries
                .get_mut(id.index())
                .expect("mark: slot out of range")
                .as_mut()
                .expect("mark: reachable object already freed");
            if entry.marked {
                continue;
            }
            entry.marked = true;
            push_children(&entry.data, &mut worklist);
        }
    }

    fn sweep(&mut self) -> usize {
        let mut freed = 0;
        for (index, slot) in self.entries.iter_mut().enumerate() {
            match slot {
                Some(entry) if entry.marked => entry.marked = false,
                Some(entry) => {
                    self.bytes_allocated -= entry.size;
                    *slot = None;
                    self.free_list.push(HeapId(index));
                    freed += 1;
                }
                None => {}
            }
        }
        freed
    }

    // --- Statistics ---

    pub(crate) fn stats(&self) -> HeapStats {
        let mut objects_by_type = BTreeMap::new();
        let mut live_objects = 0;
        for entry in self.entries.iter().flatten() {
            live_objects += 1;
            *objects_by_type.entry(entry.data.variant_name()).or_insert(0) += 1;
        }
        HeapStats {
            live_objects,
            free_slots: self.free_list.len(),
            total_slots: self.entries.len(),
            bytes_allocated: self.bytes_allocated,
            objects_by_type,
        }
    }
}

/// Pushes every heap object directly owned by `data` onto the mark worklist.
fn push_children(data: &HeapData, worklist: &mut Vec<HeapId>) {
    let mut push_value = |worklist: &mut Vec<HeapId>, value: Value| {
        if let Value::Ref(id) = value {
            worklist.push(id);
        }
    };
    match data {
        HeapData::Str(_) => {}
        HeapData::List(list) => {
            for item in &list.items {
                push_value(worklist, *item);
            }
        }
        HeapData::Map(map) => {
            for value in map.entries.values() {
                push_value(worklist, *value);
            }
        }
        HeapData::Function(func) => {
            if let Some(env) = func.env {
                worklist.push(env);
            }
        }
        HeapData::Module(module) => worklist.push(module.members),
        HeapData::Class(class) => {
            worklist.push(class.methods);
            if let Some(parent) = class.parent {
                worklist.push(parent);
            }
        }
        HeapData::Instance(instance) => {
            worklist.push(instance.class);
            worklist.push(instance.fields);
        }
        HeapData::BoundMethod(bound) => {
            push_value(worklist, bound.receiver);
            push_value(worklist, bound.method);
        }
        HeapData::Env(env) => {
            push_value(worklist, env.value);
            if let Some(next) = env.next {
                worklist.push(next);
            }
        }
    }
}
