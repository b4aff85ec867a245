//! The tree-walking evaluator.
//!
//! Two mutually recursive procedures drive execution: [`Interp::eval`] for
//! expressions (producing a value) and [`Interp::exec`] for statements
//! (producing a [`Flow`] outcome). The interpreter owns the heap and the
//! global environment head; every other scope lives on the heap as an
//! environment chain threaded through call frames and blocks.
//!
//! Rooting discipline: any heap value that must survive a subsequent
//! allocation is pushed onto the heap's temporary-root stack for the window
//! in which it is otherwise unreachable (operands while the other side
//! evaluates, containers while their elements evaluate, call frames while
//! bodies run, instances until `init` returns). Roots are truncated on the
//! success path; error propagation is fatal in script mode, and the REPL
//! resets the stack when it recovers.

use std::rc::Rc;

use smallvec::SmallVec;

use crate::{
    ast::{ArraySpec, BinaryOp, ClassMember, Node, NodeKind, SwitchArm, TypeSpec, TypeTag, UnaryOp},
    builtins::{Builtins, list_method, string_method},
    env,
    error::{RunError, RunResult},
    heap::{
        BoundMethod, Class, Function, Heap, HeapData, HeapId, Instance, Module, PithList, PithMap,
    },
    io::PrintWriter,
    modules::native_module,
    parser::parse,
    tracer::Tracer,
    value::{Flow, Value, display_value},
};

/// Call-frame ceiling; crossing it reports a runtime error instead of
/// exhausting the host stack. Each frame costs several levels of host
/// recursion, so this stays well inside a 2 MiB thread stack.
const MAX_CALL_DEPTH: usize = 200;

/// Arguments are usually few; keep them off the general-purpose allocator.
type ArgVec = SmallVec<[Value; 8]>;

pub(crate) struct Interp<Tr: Tracer> {
    pub(crate) heap: Heap,
    pub(crate) globals: Option<HeapId>,
    tracer: Tr,
    call_depth: usize,
    /// Modules currently being loaded, innermost last; used to refuse
    /// cyclic imports.
    loading: Vec<String>,
}

impl<Tr: Tracer> Interp<Tr> {
    /// Creates an interpreter with the global natives (`clock`, `input`)
    /// already bound.
    pub(crate) fn new(tracer: Tr) -> Self {
        let mut interp = Self {
            heap: Heap::new(),
            globals: None,
            tracer,
            call_depth: 0,
            loading: Vec::new(),
        };
        let mut head = interp.globals;
        env::define(&mut interp.heap, &mut head, "clock", Value::Builtin(Builtins::Clock));
        env::define(&mut interp.heap, &mut head, "input", Value::Builtin(Builtins::Input));
        interp.globals = head;
        interp.heap.set_globals(head);
        interp
    }

    /// Executes every statement of a program root against the global scope.
    pub(crate) fn run_program(&mut self, program: &Node, print: &mut impl PrintWriter) -> RunResult<()> {
        let NodeKind::Program(stmts) = &program.kind else {
            return Ok(());
        };
        for stmt in stmts {
            self.exec_toplevel(stmt, print)?;
        }
        Ok(())
    }

    /// Executes a single statement in the global scope, keeping the heap's
    /// root view of the global chain in sync.
    pub(crate) fn exec_toplevel(&mut self, stmt: &Node, print: &mut impl PrintWriter) -> RunResult<()> {
        let cycles_before = self.heap.collections();
        let mut head = self.globals;
        let result = self.exec(stmt, &mut head, print);
        self.globals = head;
        self.heap.set_globals(head);
        if self.heap.collections() > cycles_before {
            self.tracer.gc(self.heap.last_freed(), self.heap.live_objects());
        }
        result.map(|_| ())
    }

    /// Evaluates a single expression in the global scope (REPL echo path).
    pub(crate) fn eval_toplevel(&mut self, expr: &Node, print: &mut impl PrintWriter) -> RunResult<Value> {
        self.eval(expr, self.globals, print)
    }

    // --- Statements ---

    fn exec(&mut self, node: &Node, env: &mut Option<HeapId>, print: &mut impl PrintWriter) -> RunResult<Flow> {
        self.tracer.statement(statement_name(node), node.line);
        match &node.kind {
            NodeKind::Program(stmts) | NodeKind::Block(stmts) => self.exec_block(stmts, *env, print),
            NodeKind::ClassDef { name, parent, members } => {
                self.exec_class_def(node.line, name, parent.as_deref(), members, env)?;
                Ok(Flow::Normal)
            }
            NodeKind::FuncDef(def) => {
                let func = self.heap.allocate(HeapData::Function(Function {
                    def: Rc::clone(def),
                    env: *env,
                }));
                env::define(&mut self.heap, env, &def.name, Value::Ref(func));
                Ok(Flow::Normal)
            }
            NodeKind::Print(args) => {
                for (i, arg) in args.iter().enumerate() {
                    let value = self.eval(arg, *env, print)?;
                    print.stdout_write(&display_value(value, &self.heap));
                    if i + 1 < args.len() {
                        print.stdout_push(' ');
                    }
                }
                print.stdout_push('\n');
                Ok(Flow::Normal)
            }
            NodeKind::VarDecl {
                name,
                type_spec,
                array,
                init,
            } => {
                self.exec_var_decl(node.line, name, type_spec, array.as_ref(), init.as_deref(), env, print)?;
                Ok(Flow::Normal)
            }
            NodeKind::Assign { target, value } => {
                self.exec_assign(target, value, *env, print)?;
                Ok(Flow::Normal)
            }
            NodeKind::If {
                cond,
                then_body,
                else_branch,
            } => {
                let test = self.eval(cond, *env, print)?.as_condition(&self.heap, cond.line)?;
                if test {
                    self.exec_block(then_body, *env, print)
                } else if let Some(branch) = else_branch {
                    self.exec(branch, env, print)
                } else {
                    Ok(Flow::Normal)
                }
            }
            NodeKind::While { cond, body } => {
                loop {
                    let test = self.eval(cond, *env, print)?.as_condition(&self.heap, cond.line)?;
                    if !test {
                        break;
                    }
                    match self.exec_block(body, *env, print)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                }
                Ok(Flow::Normal)
            }
            NodeKind::DoWhile { body, cond } => {
                loop {
                    match self.exec_block(body, *env, print)? {
                        Flow::Break => break,
                        Flow::Continue | Flow::Normal => {}
                        ret @ Flow::Return(_) => return Ok(ret),
                    }
                    let test = match cond {
                        Some(cond) => self.eval(cond, *env, print)?.as_condition(&self.heap, cond.line)?,
                        // Parser recovery for `do` without `while`.
                        None => false,
                    };
                    if !test {
                        break;
                    }
                }
                Ok(Flow::Normal)
            }
            NodeKind::For { init, cond, step, body } => self.exec_for(init, cond, step, body, *env, print),
            NodeKind::Foreach { var, iterable, body } => self.exec_foreach(node.line, var, iterable, body, *env, print),
            NodeKind::Switch { scrutinee, arms } => self.exec_switch(scrutinee, arms, *env, print),
            NodeKind::Break => Ok(Flow::Break),
            NodeKind::Continue => Ok(Flow::Continue),
            NodeKind::Return(value) => {
                let result = match value {
                    Some(expr) => self.eval(expr, *env, print)?,
                    None => Value::Void,
                };
                Ok(Flow::Return(result))
            }
            NodeKind::Import(name) => {
                self.exec_import(node.line, name, env, print)?;
                Ok(Flow::Normal)
            }
            // Expression statement: evaluate for effect, discard the value.
            _ => {
                self.eval(node, *env, print)?;
                Ok(Flow::Normal)
            }
        }
    }

    /// Executes a statement list in a fresh view of `env_head`.
    ///
    /// Declarations extend the chain only for the remainder of the block;
    /// the caller's head is untouched. Each extension is temp-rooted so a
    /// collection mid-block cannot sweep block-local bindings.
    fn exec_block(
        &mut self,
        stmts: &[Node],
        env_head: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Flow> {
        let mark = self.heap.root_mark();
        let mut head = env_head;
        let mut outcome = Flow::Normal;
        for stmt in stmts {
            let before = head;
            let flow = self.exec(stmt, &mut head, print)?;
            if head != before
                && let Some(new_head) = head
            {
                self.heap.push_root(new_head);
            }
            if flow != Flow::Normal {
                outcome = flow;
                break;
            }
        }
        self.heap.truncate_roots(mark);
        Ok(outcome)
    }

    fn exec_class_def(
        &mut self,
        line: usize,
        name: &str,
        parent: Option<&str>,
        members: &[ClassMember],
        env: &mut Option<HeapId>,
    ) -> RunResult<()> {
        let parent_class = match parent {
            Some(parent_name) => {
                let value = env::get(&self.heap, *env, parent_name, line)?;
                match value {
                    Value::Ref(id) if matches!(self.heap.get(id), HeapData::Class(_)) => Some(id),
                    _ => {
                        return Err(RunError::runtime(
                            line,
                            format!("Parent of class '{name}' must be a class."),
                        ));
                    }
                }
            }
            None => None,
        };

        let mark = self.heap.root_mark();
        let methods = self.heap.allocate(HeapData::Map(PithMap::unconstrained()));
        self.heap.push_root(methods);

        let fields = members
            .iter()
            .filter_map(|member| match member {
                ClassMember::Field { name, .. } => Some(name.clone()),
                ClassMember::Method(_) => None,
            })
            .collect();

        let class = self.heap.allocate(HeapData::Class(Class {
            name: name.to_owned(),
            methods,
            fields,
            parent: parent_class,
        }));
        env::define(&mut self.heap, env, name, Value::Ref(class));
        // Method closures are allocated after the binding, so keep the new
        // chain head rooted: the heap's global-root view may still point at
        // the pre-statement chain.
        if let Some(head) = *env {
            self.heap.push_root(head);
        }

        // Methods capture the scope including the class binding, so they can
        // name their own class.
        for member in members {
            if let ClassMember::Method(def) = member {
                let func = self.heap.allocate(HeapData::Function(Function {
                    def: Rc::clone(def),
                    env: *env,
                }));
                map_insert(&mut self.heap, methods, def.name.clone(), Value::Ref(func), def.line)?;
            }
        }
        self.heap.truncate_roots(mark);
        Ok(())
    }

    fn exec_var_decl(
        &mut self,
        line: usize,
        name: &str,
        type_spec: &TypeSpec,
        array: Option<&ArraySpec>,
        init: Option<&Node>,
        env: &mut Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<()> {
        if let Some(spec) = array {
            let value = match spec {
                ArraySpec::Unsized => Value::Ref(self.heap.allocate(HeapData::List(PithList {
                    items: Vec::new(),
                    is_fixed: false,
                }))),
                ArraySpec::Sized(size_expr) => {
                    let size_value = self.eval(size_expr, *env, print)?;
                    let Value::Int(size) = size_value else {
                        return Err(RunError::runtime(line, "Array size must be an integer."));
                    };
                    let Ok(size) = usize::try_from(size) else {
                        return Err(RunError::runtime(line, "Array size must be non-negative."));
                    };
                    Value::Ref(self.heap.allocate(HeapData::List(PithList {
                        items: vec![Value::Void; size],
                        is_fixed: true,
                    })))
                }
            };
            env::define(&mut self.heap, env, name, value);
            return Ok(());
        }

        if let TypeSpec::Map { key, value } = type_spec {
            let map_value = self.exec_typed_map_decl(line, *key, *value, init, *env, print)?;
            env::define(&mut self.heap, env, name, map_value);
            return Ok(());
        }

        let value = match init {
            Some(expr) => self.eval(expr, *env, print)?,
            None => Value::Void,
        };
        env::define(&mut self.heap, env, name, value);
        Ok(())
    }

    /// Builds the value for a `map<k,v>` declaration.
    ///
    /// A map-literal initializer fills a fresh constrained map (each insert
    /// checked); no initializer makes an empty one; any other initializer is
    /// evaluated and must already be a map.
    fn exec_typed_map_decl(
        &mut self,
        line: usize,
        key_type: Option<TypeTag>,
        value_type: Option<TypeTag>,
        init: Option<&Node>,
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Value> {
        match init {
            Some(Node {
                kind: NodeKind::MapLit(pairs),
                ..
            }) => {
                let map = self.heap.allocate(HeapData::Map(PithMap::typed(key_type, value_type)));
                let mark = self.heap.root_mark();
                self.heap.push_root(map);
                self.fill_map_literal(map, pairs, env, print)?;
                self.heap.truncate_roots(mark);
                Ok(Value::Ref(map))
            }
            Some(expr) => {
                let value = self.eval(expr, env, print)?;
                match value {
                    Value::Ref(id) if matches!(self.heap.get(id), HeapData::Map(_)) => Ok(value),
                    other => Err(RunError::runtime(
                        line,
                        format!(
                            "Cannot initialize a typed map from a value of type '{}'.",
                            other.type_name(&self.heap)
                        ),
                    )),
                }
            }
            None => Ok(Value::Ref(
                self.heap.allocate(HeapData::Map(PithMap::typed(key_type, value_type))),
            )),
        }
    }

    /// Evaluates literal pairs into `map`, checking key and value types per
    /// insert. The map must already be rooted by the caller.
    fn fill_map_literal(
        &mut self,
        map: HeapId,
        pairs: &[(Node, Node)],
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<()> {
        for (key_node, value_node) in pairs {
            let key_value = self.eval(key_node, env, print)?;
            let key = match key_value {
                Value::Ref(id) if matches!(self.heap.get(id), HeapData::Str(_)) => self.heap.get_str(id).to_owned(),
                _ => return Err(RunError::runtime(key_node.line, "Hashmap keys must be strings.")),
            };
            let value = self.eval(value_node, env, print)?;
            map_insert(&mut self.heap, map, key, value, value_node.line)?;
        }
        Ok(())
    }

    fn exec_assign(
        &mut self,
        target: &Node,
        value_expr: &Node,
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<()> {
        let value = self.eval(value_expr, env, print)?;
        let mark = self.heap.root_mark();
        self.heap.root_value(value);
        let result = self.assign_into(target, value, env, print);
        self.heap.truncate_roots(mark);
        result
    }

    fn assign_into(
        &mut self,
        target: &Node,
        value: Value,
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<()> {
        match &target.kind {
            NodeKind::VarRef(name) => env::assign(&mut self.heap, env, name, value, target.line),
            NodeKind::FieldAccess { object, field } => {
                let receiver = self.eval(object, env, print)?;
                match receiver {
                    Value::Ref(id) if matches!(self.heap.get(id), HeapData::Instance(_)) => {
                        let fields = self.heap.get_instance(id).fields;
                        map_insert(&mut self.heap, fields, field.clone(), value, target.line)
                    }
                    other => Err(RunError::runtime(
                        target.line,
                        format!(
                            "Cannot assign to a field on a value of type '{}'.",
                            other.type_name(&self.heap)
                        ),
                    )),
                }
            }
            NodeKind::IndexAccess { object, index } => {
                let collection = self.eval(object, env, print)?;
                let mark = self.heap.root_mark();
                self.heap.root_value(collection);
                let index_value = self.eval(index, env, print)?;
                self.heap.truncate_roots(mark);
                match collection {
                    Value::Ref(id) => match self.heap.get(id) {
                        HeapData::Map(_) => {
                            let key = match index_value {
                                Value::Ref(key_id) if matches!(self.heap.get(key_id), HeapData::Str(_)) => {
                                    self.heap.get_str(key_id).to_owned()
                                }
                                _ => {
                                    return Err(RunError::runtime(target.line, "Hashmap index must be a string."));
                                }
                            };
                            map_insert(&mut self.heap, id, key, value, target.line)
                        }
                        HeapData::List(_) => {
                            let Value::Int(raw_index) = index_value else {
                                return Err(RunError::runtime(
                                    target.line,
                                    "List or array index must be an integer.",
                                ));
                            };
                            let list = self.heap.get_list_mut(id);
                            let index = usize::try_from(raw_index).ok().filter(|i| *i < list.items.len());
                            match index {
                                Some(index) => {
                                    list.items[index] = value;
                                    Ok(())
                                }
                                None => Err(RunError::runtime(target.line, "Index out of bounds.")),
                            }
                        }
                        _ => Err(RunError::runtime(target.line, "Not an indexable type.")),
                    },
                    _ => Err(RunError::runtime(target.line, "Not an indexable type.")),
                }
            }
            _ => Err(RunError::runtime(target.line, "Invalid assignment target.")),
        }
    }

    fn exec_for(
        &mut self,
        init: &Node,
        cond: &Node,
        step: &Node,
        body: &[Node],
        env_head: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Flow> {
        let mark = self.heap.root_mark();
        let mut for_env = env_head;
        let result: RunResult<Flow> = (|| {
            self.exec(init, &mut for_env, print)?;
            if for_env != env_head
                && let Some(head) = for_env
            {
                self.heap.push_root(head);
            }
            loop {
                let test = self.eval(cond, for_env, print)?.as_condition(&self.heap, cond.line)?;
                if !test {
                    return Ok(Flow::Normal);
                }
                match self.exec_block(body, for_env, print)? {
                    Flow::Break => return Ok(Flow::Normal),
                    ret @ Flow::Return(_) => return Ok(ret),
                    Flow::Continue | Flow::Normal => {}
                }
                self.exec(step, &mut for_env, print)?;
            }
        })();
        self.heap.truncate_roots(mark);
        result
    }

    fn exec_foreach(
        &mut self,
        line: usize,
        var: &str,
        iterable: &Node,
        body: &[Node],
        env_head: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Flow> {
        let collection = self.eval(iterable, env_head, print)?;
        let list = match collection {
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::List(_)) => id,
            _ => {
                return Err(RunError::runtime(
                    line,
                    "foreach loop can only iterate over a list or array.",
                ));
            }
        };

        let outer_mark = self.heap.root_mark();
        self.heap.push_root(list);
        let result: RunResult<Flow> = (|| {
            let mut index = 0;
            // Re-read the length each iteration: the body may grow the list.
            while index < self.heap.get_list(list).items.len() {
                let item = self.heap.get_list(list).items[index];
                let iter_mark = self.heap.root_mark();
                let mut loop_env = env_head;
                env::define(&mut self.heap, &mut loop_env, var, item);
                if let Some(head) = loop_env {
                    self.heap.push_root(head);
                }
                let flow = self.exec_block(body, loop_env, print);
                self.heap.truncate_roots(iter_mark);
                match flow? {
                    Flow::Break => return Ok(Flow::Normal),
                    ret @ Flow::Return(_) => return Ok(ret),
                    Flow::Continue | Flow::Normal => {}
                }
                index += 1;
            }
            Ok(Flow::Normal)
        })();
        self.heap.truncate_roots(outer_mark);
        result
    }

    fn exec_switch(
        &mut self,
        scrutinee: &Node,
        arms: &[SwitchArm],
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Flow> {
        let subject = self.eval(scrutinee, env, print)?;
        let mark = self.heap.root_mark();
        self.heap.root_value(subject);
        let result = self.run_switch_arms(subject, arms, env, print);
        self.heap.truncate_roots(mark);
        result
    }

    /// Walks the arms with C-style fallthrough: once an arm matches, every
    /// following body runs (guard expressions still evaluate) until a
    /// `break`, which the switch consumes. `default` runs while falling
    /// through, or alone when no case matched.
    fn run_switch_arms(
        &mut self,
        subject: Value,
        arms: &[SwitchArm],
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Flow> {
        let mut matched = false;
        for arm in arms {
            match arm {
                SwitchArm::Case { value, body, .. } => {
                    let candidate = self.eval(value, env, print)?;
                    if matched || switch_eq(&self.heap, subject, candidate) {
                        matched = true;
                        match self.exec_block(body, env, print)? {
                            Flow::Break => return Ok(Flow::Normal),
                            Flow::Normal => {}
                            other => return Ok(other),
                        }
                    }
                }
                SwitchArm::Default { body, .. } => {
                    if matched {
                        match self.exec_block(body, env, print)? {
                            Flow::Break => return Ok(Flow::Normal),
                            Flow::Normal => {}
                            other => return Ok(other),
                        }
                    }
                }
            }
        }
        if !matched {
            for arm in arms {
                if let SwitchArm::Default { body, .. } = arm {
                    match self.exec_block(body, env, print)? {
                        Flow::Break => return Ok(Flow::Normal),
                        Flow::Normal => {}
                        other => return Ok(other),
                    }
                }
            }
        }
        Ok(Flow::Normal)
    }

    fn exec_import(
        &mut self,
        line: usize,
        name: &str,
        env: &mut Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<()> {
        if self.loading.iter().any(|loading| loading == name) {
            return Err(RunError::runtime(line, format!("Cyclic import of '{name}'.")));
        }
        self.loading.push(name.to_owned());
        let result = self.load_module(line, name, env, print);
        self.loading.pop();
        result
    }

    fn load_module(
        &mut self,
        line: usize,
        name: &str,
        env: &mut Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<()> {
        let mut module_env: Option<HeapId> = None;

        // Native bindings first; a source file of the same name layers on top.
        if let Some(functions) = native_module(name) {
            for (func_name, func) in functions {
                env::define(&mut self.heap, &mut module_env, func_name, Value::ModuleFn(func));
            }
        }

        let source = std::fs::read_to_string(format!("stdlib/{name}.pith"))
            .or_else(|_| std::fs::read_to_string(format!("{name}.pith")))
            .ok();

        if module_env.is_none() && source.is_none() {
            return Err(RunError::runtime(line, format!("Module '{name}' not found.")));
        }

        let mark = self.heap.root_mark();
        if let Some(head) = module_env {
            self.heap.push_root(head);
        }
        let result: RunResult<()> = (|| {
            if let Some(source) = source {
                let (program, diagnostics) = parse(&source);
                for diagnostic in &diagnostics {
                    eprintln!("{diagnostic}");
                }
                if let NodeKind::Program(stmts) = &program.kind {
                    for stmt in stmts {
                        let before = module_env;
                        self.exec(stmt, &mut module_env, print)?;
                        if module_env != before
                            && let Some(head) = module_env
                        {
                            self.heap.push_root(head);
                        }
                    }
                }
            }

            // Mirror the environment into the module's member map; the
            // innermost binding wins for shadowed names.
            let members = self.heap.allocate(HeapData::Map(PithMap::unconstrained()));
            self.heap.push_root(members);
            let mut cursor = module_env;
            while let Some(id) = cursor {
                let node = self.heap.get_env(id);
                let (binding_name, value, next) = (node.name.clone(), node.value, node.next);
                if !self.heap.get_map(members).entries.contains_key(&binding_name) {
                    map_insert(&mut self.heap, members, binding_name, value, line)?;
                }
                cursor = next;
            }

            let module = self.heap.allocate(HeapData::Module(Module {
                name: name.to_owned(),
                members,
            }));
            env::define(&mut self.heap, env, name, Value::Ref(module));
            Ok(())
        })();
        self.heap.truncate_roots(mark);
        result
    }

    // --- Expressions ---

    fn eval(&mut self, node: &Node, env: Option<HeapId>, print: &mut impl PrintWriter) -> RunResult<Value> {
        match &node.kind {
            NodeKind::IntLit(value) => Ok(Value::Int(*value)),
            NodeKind::FloatLit(value) => Ok(Value::Float(*value)),
            NodeKind::BoolLit(value) => Ok(Value::Bool(*value)),
            NodeKind::StrLit(text) => Ok(self.heap.alloc_str(text.clone())),
            NodeKind::VarRef(name) => env::get(&self.heap, env, name, node.line),
            NodeKind::ListLit(items) => {
                let list = self.heap.allocate(HeapData::List(PithList {
                    items: Vec::with_capacity(items.len()),
                    is_fixed: false,
                }));
                let mark = self.heap.root_mark();
                self.heap.push_root(list);
                for item in items {
                    let value = self.eval(item, env, print)?;
                    self.heap.get_list_mut(list).items.push(value);
                }
                self.heap.truncate_roots(mark);
                Ok(Value::Ref(list))
            }
            NodeKind::MapLit(pairs) => {
                let map = self.heap.allocate(HeapData::Map(PithMap::unconstrained()));
                let mark = self.heap.root_mark();
                self.heap.push_root(map);
                self.fill_map_literal(map, pairs, env, print)?;
                self.heap.truncate_roots(mark);
                Ok(Value::Ref(map))
            }
            NodeKind::Unary { op, operand } => {
                let value = self.eval(operand, env, print)?;
                match (op, value) {
                    (UnaryOp::Neg, Value::Int(i)) => Ok(Value::Int(i.wrapping_neg())),
                    (UnaryOp::Neg, Value::Float(f)) => Ok(Value::Float(-f)),
                    (UnaryOp::Neg, _) => Err(RunError::runtime(
                        node.line,
                        "Operand for unary '-' must be a number.",
                    )),
                    (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
                    (UnaryOp::Not, _) => Err(RunError::runtime(node.line, "Operand for '!' must be a boolean.")),
                }
            }
            NodeKind::Binary { op, lhs, rhs } => {
                let left = self.eval(lhs, env, print)?;
                let mark = self.heap.root_mark();
                self.heap.root_value(left);
                let right = self.eval(rhs, env, print)?;
                self.heap.root_value(right);
                let result = self.eval_binary(*op, left, right, node.line);
                self.heap.truncate_roots(mark);
                result
            }
            NodeKind::New { class, args } => self.eval_new(node.line, class, args, env, print),
            NodeKind::FieldAccess { object, field } => self.eval_field_access(node.line, object, field, env, print),
            NodeKind::IndexAccess { object, index } => self.eval_index_access(node.line, object, index, env, print),
            NodeKind::Call { callee, args } => self.eval_call(node.line, callee, args, env, print),
            // Statement node reached through an expression position.
            _ => Ok(Value::Void),
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: Value, right: Value, line: usize) -> RunResult<Value> {
        use BinaryOp::{Add, And, Div, Eq, Ge, Gt, Le, Lt, Ne, Or, Pow, Rem, Sub};

        // Logical operators: both operands are evaluated before combining,
        // and both must be booleans.
        if matches!(op, And | Or) {
            return match (left, right) {
                (Value::Bool(a), Value::Bool(b)) => Ok(Value::Bool(if op == And { a && b } else { a || b })),
                _ => Err(self.binary_type_error(op, left, right, line)),
            };
        }

        match (left, right) {
            (Value::Int(a), Value::Int(b)) => match op {
                Add => Ok(Value::Int(a.wrapping_add(b))),
                Sub => Ok(Value::Int(a.wrapping_sub(b))),
                BinaryOp::Mul => Ok(Value::Int(a.wrapping_mul(b))),
                Div => {
                    if b == 0 {
                        Err(RunError::runtime(line, "Division by zero."))
                    } else {
                        Ok(Value::Int(a.wrapping_div(b)))
                    }
                }
                Rem => {
                    if b == 0 {
                        Err(RunError::runtime(line, "Modulo by zero."))
                    } else {
                        Ok(Value::Int(a.wrapping_rem(b)))
                    }
                }
                Pow => Ok(Value::Int(f64::from(a).powf(f64::from(b)) as i32)),
                Lt => Ok(Value::Bool(a < b)),
                Gt => Ok(Value::Bool(a > b)),
                Le => Ok(Value::Bool(a <= b)),
                Ge => Ok(Value::Bool(a >= b)),
                Eq => Ok(Value::Bool(a == b)),
                Ne => Ok(Value::Bool(a != b)),
                And | Or => unreachable!("handled above"),
            },
            (Value::Int(_) | Value::Float(_), Value::Int(_) | Value::Float(_)) => {
                let a = left.as_number().expect("numeric operand");
                let b = right.as_number().expect("numeric operand");
                match op {
                    Add => Ok(Value::Float(a + b)),
                    Sub => Ok(Value::Float(a - b)),
                    BinaryOp::Mul => Ok(Value::Float(a * b)),
                    Div => Ok(Value::Float(a / b)),
                    Pow => Ok(Value::Float(a.powf(b))),
                    Rem => Err(RunError::runtime(line, "Operator '%' requires integer operands.")),
                    Lt => Ok(Value::Bool(a < b)),
                    Gt => Ok(Value::Bool(a > b)),
                    Le => Ok(Value::Bool(a <= b)),
                    Ge => Ok(Value::Bool(a >= b)),
                    Eq => Ok(Value::Bool(a == b)),
                    Ne => Ok(Value::Bool(a != b)),
                    And | Or => unreachable!("handled above"),
                }
            }
            (Value::Ref(l), Value::Ref(r))
                if matches!(self.heap.get(l), HeapData::Str(_)) && matches!(self.heap.get(r), HeapData::Str(_)) =>
            {
                match op {
                    Add => {
                        let mut joined = self.heap.get_str(l).to_owned();
                        joined.push_str(self.heap.get_str(r));
                        Ok(self.heap.alloc_str(joined))
                    }
                    Eq => Ok(Value::Bool(self.heap.get_str(l) == self.heap.get_str(r))),
                    Ne => Ok(Value::Bool(self.heap.get_str(l) != self.heap.get_str(r))),
                    _ => Err(self.binary_type_error(op, left, right, line)),
                }
            }
            (Value::Bool(a), Value::Bool(b)) => match op {
                Eq => Ok(Value::Bool(a == b)),
                Ne => Ok(Value::Bool(a != b)),
                _ => Err(self.binary_type_error(op, left, right, line)),
            },
            _ => Err(self.binary_type_error(op, left, right, line)),
        }
    }

    fn binary_type_error(&self, op: BinaryOp, left: Value, right: Value, line: usize) -> RunError {
        RunError::runtime(
            line,
            format!(
                "Unsupported operand types for '{op}': '{}' and '{}'.",
                left.type_name(&self.heap),
                right.type_name(&self.heap)
            ),
        )
    }

    fn eval_new(
        &mut self,
        line: usize,
        class_expr: &Node,
        args: &[Node],
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Value> {
        let class_value = self.eval(class_expr, env, print)?;
        let class = match class_value {
            Value::Ref(id) if matches!(self.heap.get(id), HeapData::Class(_)) => id,
            _ => return Err(RunError::runtime(line, "Cannot instantiate non-class type.")),
        };

        let mark = self.heap.root_mark();
        let fields = self.heap.allocate(HeapData::Map(PithMap::unconstrained()));
        self.heap.push_root(fields);

        // Every declared field starts as void before init runs.
        let field_names = self.heap.get_class(class).fields.clone();
        for field in field_names {
            map_insert(&mut self.heap, fields, field, Value::Void, line)?;
        }

        let instance = self.heap.allocate(HeapData::Instance(Instance { class, fields }));
        self.heap.push_root(instance);
        let instance_value = Value::Ref(instance);

        let result: RunResult<Value> = (|| {
            // init is looked up in the direct class only.
            let methods = self.heap.get_class(class).methods;
            let init = self.heap.get_map(methods).entries.get("init").copied();
            if let Some(Value::Ref(func)) = init
                && matches!(self.heap.get(func), HeapData::Function(_))
            {
                let mut call_args = ArgVec::new();
                let args_mark = self.heap.root_mark();
                for arg in args {
                    let value = self.eval(arg, env, print)?;
                    self.heap.root_value(value);
                    call_args.push(value);
                }
                self.call_function(func, Some(instance_value), &call_args, line, print)?;
                self.heap.truncate_roots(args_mark);
            }
            Ok(instance_value)
        })();
        self.heap.truncate_roots(mark);
        result
    }

    fn eval_field_access(
        &mut self,
        line: usize,
        object_expr: &Node,
        field: &str,
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Value> {
        let object = self.eval(object_expr, env, print)?;
        if let Value::Ref(id) = object {
            match self.heap.get(id) {
                HeapData::Instance(instance) => {
                    let (class, fields) = (instance.class, instance.fields);
                    // A field that exists and is non-void wins over methods;
                    // a void (or missing) entry falls through to the method
                    // table of the direct class.
                    let field_value = self.heap.get_map(fields).entries.get(field).copied();
                    if let Some(value) = field_value
                        && value != Value::Void
                    {
                        return Ok(value);
                    }
                    let methods = self.heap.get_class(class).methods;
                    let method = self.heap.get_map(methods).entries.get(field).copied();
                    if let Some(method) = method
                        && method != Value::Void
                    {
                        return Ok(self.bind_method(object, method));
                    }
                }
                HeapData::Module(module) => {
                    let members = module.members;
                    // Absent members read as void, like absent map keys.
                    return Ok(self
                        .heap
                        .get_map(members)
                        .entries
                        .get(field)
                        .copied()
                        .unwrap_or(Value::Void));
                }
                HeapData::Str(_) => {
                    if let Some(method) = string_method(field) {
                        return Ok(self.bind_method(object, Value::Method(method)));
                    }
                }
                HeapData::List(_) => {
                    if let Some(method) = list_method(field) {
                        return Ok(self.bind_method(object, Value::Method(method)));
                    }
                }
                _ => {}
            }
        }
        Err(RunError::runtime(
            line,
            format!(
                "Value of type '{}' has no field or method named '{field}'.",
                object.type_name(&self.heap)
            ),
        ))
    }

    fn bind_method(&mut self, receiver: Value, method: Value) -> Value {
        let mark = self.heap.root_mark();
        self.heap.root_value(receiver);
        let bound = self.heap.allocate(HeapData::BoundMethod(BoundMethod { receiver, method }));
        self.heap.truncate_roots(mark);
        Value::Ref(bound)
    }

    fn eval_index_access(
        &mut self,
        line: usize,
        object_expr: &Node,
        index_expr: &Node,
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Value> {
        let collection = self.eval(object_expr, env, print)?;
        let mark = self.heap.root_mark();
        self.heap.root_value(collection);
        let index_value = self.eval(index_expr, env, print)?;
        self.heap.truncate_roots(mark);

        match collection {
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::List(list) => {
                    let Value::Int(raw_index) = index_value else {
                        return Err(RunError::runtime(line, "List index must be an integer."));
                    };
                    usize::try_from(raw_index)
                        .ok()
                        .and_then(|index| list.items.get(index).copied())
                        .ok_or_else(|| RunError::runtime(line, "Index out of bounds."))
                }
                HeapData::Map(map) => {
                    let key = match index_value {
                        Value::Ref(key_id) if matches!(self.heap.get(key_id), HeapData::Str(_)) => {
                            self.heap.get_str(key_id)
                        }
                        _ => return Err(RunError::runtime(line, "Hashmap index must be a string.")),
                    };
                    Ok(map.entries.get(key).copied().unwrap_or(Value::Void))
                }
                _ => Err(RunError::runtime(line, "Not an indexable type.")),
            },
            _ => Err(RunError::runtime(line, "Not an indexable type.")),
        }
    }

    fn eval_call(
        &mut self,
        line: usize,
        callee_expr: &Node,
        arg_exprs: &[Node],
        env: Option<HeapId>,
        print: &mut impl PrintWriter,
    ) -> RunResult<Value> {
        let callee = self.eval(callee_expr, env, print)?;
        let mark = self.heap.root_mark();
        self.heap.root_value(callee);

        let mut args = ArgVec::new();
        for arg in arg_exprs {
            let value = match self.eval(arg, env, print) {
                Ok(value) => value,
                Err(err) => {
                    self.heap.truncate_roots(mark);
                    return Err(err);
                }
            };
            self.heap.root_value(value);
            args.push(value);
        }

        let result = self.dispatch_call(callee, &args, line, print);
        self.heap.truncate_roots(mark);
        result
    }

    fn dispatch_call(
        &mut self,
        callee: Value,
        args: &[Value],
        line: usize,
        print: &mut impl PrintWriter,
    ) -> RunResult<Value> {
        match callee {
            Value::Builtin(builtin) => builtin.call(&mut self.heap, args, print, line),
            Value::ModuleFn(func) => func.call(&mut self.heap, args, line),
            Value::Ref(id) => match self.heap.get(id) {
                HeapData::Function(_) => self.call_function(id, None, args, line, print),
                HeapData::BoundMethod(bound) => {
                    let (receiver, method) = (bound.receiver, bound.method);
                    match method {
                        Value::Method(native) => {
                            // Native methods see the receiver as their first
                            // argument.
                            let mut full_args = ArgVec::with_capacity(args.len() + 1);
                            full_args.push(receiver);
                            full_args.extend_from_slice(args);
                            native.call(&mut self.heap, &full_args, line)
                        }
                        Value::Ref(func) if matches!(self.heap.get(func), HeapData::Function(_)) => {
                            self.call_function(func, Some(receiver), args, line, print)
                        }
                        _ => Err(RunError::runtime(line, "Expression is not callable.")),
                    }
                }
                _ => Err(RunError::runtime(line, "Expression is not callable.")),
            },
            _ => Err(RunError::runtime(line, "Expression is not callable.")),
        }
    }

    /// Invokes a user function.
    ///
    /// The frame is a fresh environment chain: `this` (for methods), then
    /// the parameters, linked in front of the closure's captured chain, so
    /// lookups fall through the parameters into the definition-site scope.
    fn call_function(
        &mut self,
        func: HeapId,
        receiver: Option<Value>,
        args: &[Value],
        line: usize,
        print: &mut impl PrintWriter,
    ) -> RunResult<Value> {
        let (def, captured) = {
            let function = self.heap.get_function(func);
            (Rc::clone(&function.def), function.env)
        };

        if args.len() != def.params.len() {
            return Err(RunError::runtime(
                line,
                format!(
                    "Function '{}' expects {} argument(s), got {}.",
                    def.name,
                    def.params.len(),
                    args.len()
                ),
            ));
        }
        if self.call_depth >= MAX_CALL_DEPTH {
            return Err(RunError::runtime(line, "Maximum call depth exceeded."));
        }

        self.call_depth += 1;
        self.tracer.call(&def.name, self.call_depth);

        let mark = self.heap.root_mark();
        let mut frame = captured;
        if let Some(receiver) = receiver {
            env::define(&mut self.heap, &mut frame, "this", receiver);
        }
        for (param, arg) in def.params.iter().zip(args) {
            env::define(&mut self.heap, &mut frame, param, *arg);
        }
        if let Some(head) = frame {
            self.heap.push_root(head);
        }

        let flow = self.exec_block(&def.body, frame, print);
        self.heap.truncate_roots(mark);

        self.tracer.ret(&def.name, self.call_depth);
        self.call_depth -= 1;

        match flow? {
            Flow::Return(value) => Ok(value),
            // A break/continue escaping the body is absorbed here; the
            // signalling outcomes never cross a call boundary.
            Flow::Normal | Flow::Break | Flow::Continue => Ok(Value::Void),
        }
    }
}

/// Inserts into a map object, enforcing its declared value constraint.
pub(crate) fn map_insert(heap: &mut Heap, map: HeapId, key: String, value: Value, line: usize) -> RunResult<()> {
    let constraint = heap.get_map(map).value_type;
    if let Some(expected) = constraint {
        let ok = matches!(
            (expected, value),
            (TypeTag::Int, Value::Int(_))
                | (TypeTag::Float, Value::Float(_))
                | (TypeTag::Bool, Value::Bool(_))
        ) || (expected == TypeTag::Str
            && matches!(value, Value::Ref(id) if matches!(heap.get(id), HeapData::Str(_))));
        if !ok {
            return Err(RunError::runtime(
                line,
                format!(
                    "Type mismatch: Cannot set value of type '{}' in a hashmap expecting type '{expected}'.",
                    value.type_name(heap)
                ),
            ));
        }
    }
    heap.get_map_mut(map).entries.insert(key, value);
    Ok(())
}

/// Structural equality for switch matching: same type and equal value, for
/// ints and strings only.
fn switch_eq(heap: &Heap, subject: Value, candidate: Value) -> bool {
    match (subject, candidate) {
        (Value::Int(a), Value::Int(b)) => a == b,
        (Value::Ref(a), Value::Ref(b)) => match (heap.get(a), heap.get(b)) {
            (HeapData::Str(s1), HeapData::Str(s2)) => s1 == s2,
            _ => false,
        },
        _ => false,
    }
}

fn statement_name(node: &Node) -> &'static str {
    match &node.kind {
        NodeKind::Program(_) => "program",
        NodeKind::Block(_) => "block",
        NodeKind::VarDecl { .. } => "var-decl",
        NodeKind::Assign { .. } => "assign",
        NodeKind::ClassDef { .. } => "class-def",
        NodeKind::FuncDef(_) => "func-def",
        NodeKind::If { .. } => "if",
        NodeKind::While { .. } => "while",
        NodeKind::DoWhile { .. } => "do-while",
        NodeKind::For { .. } => "for",
        NodeKind::Foreach { .. } => "foreach",
        NodeKind::Switch { .. } => "switch",
        NodeKind::Break => "break",
        NodeKind::Continue => "continue",
        NodeKind::Return(_) => "return",
        NodeKind::Print(_) => "print",
        NodeKind::Import(_) => "import",
        _ => "expression",
    }
}
