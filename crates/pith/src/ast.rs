//! Abstract syntax tree produced by the parser.
//!
//! Nodes carry their 1-based source line for diagnostics. Function bodies are
//! shared behind `Rc` because heap function objects must keep their body
//! alive after the AST of the snippet that defined them has been dropped
//! (REPL lines are parsed and discarded one at a time).

use std::rc::Rc;

use strum::{Display, EnumString};

/// Runtime type tag used by typed hash-map declarations.
///
/// Only the four scalar types constrain inserts; any other declared type
/// (including `void` and class names) leaves the slot unconstrained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase")]
pub(crate) enum TypeTag {
    Int,
    #[strum(serialize = "string")]
    Str,
    Float,
    Bool,
}

impl TypeTag {
    /// Maps a declared type name onto a constraint, `None` for anything the
    /// runtime does not check.
    pub(crate) fn from_name(name: &str) -> Option<Self> {
        name.parse().ok()
    }
}

/// Declared type of a variable, as written in the source.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TypeSpec {
    /// One of the built-in type names (`int`, `string`, ...).
    Builtin(String),
    /// `list<inner>`; the element type is not enforced at runtime.
    List(String),
    /// `map<key, value>` with the runtime constraints derived from the names.
    Map {
        key: Option<TypeTag>,
        value: Option<TypeTag>,
    },
    /// A user-defined class name.
    Named(String),
}

/// The `[size?]` suffix of an array declaration.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ArraySpec {
    /// `type name[]`: a list handle declared without storage.
    Unsized,
    /// `type name[expr]`: a fixed-capacity list of `expr` void slots.
    Sized(Box<Node>),
}

/// A function definition: the unit shared between the AST, heap function
/// objects, and class method tables.
#[derive(Debug, Clone, PartialEq)]
pub(crate) struct FuncDef {
    pub name: String,
    pub params: Vec<String>,
    pub body: Vec<Node>,
    pub line: usize,
}

/// One arm of a `switch` statement.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum SwitchArm {
    Case { value: Node, body: Vec<Node>, line: usize },
    Default { body: Vec<Node>, line: usize },
}

/// A class member as written in the class body.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum ClassMember {
    Method(Rc<FuncDef>),
    Field { name: String, line: usize },
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Node {
    pub kind: NodeKind,
    pub line: usize,
}

impl Node {
    pub(crate) fn new(kind: NodeKind, line: usize) -> Self {
        Self { kind, line }
    }

    /// Whether this node is an expression (as opposed to a statement).
    ///
    /// The REPL uses this to decide if a lone input line should have its
    /// value echoed.
    pub(crate) fn is_expression(&self) -> bool {
        matches!(
            self.kind,
            NodeKind::IntLit(_)
                | NodeKind::FloatLit(_)
                | NodeKind::StrLit(_)
                | NodeKind::BoolLit(_)
                | NodeKind::VarRef(_)
                | NodeKind::Binary { .. }
                | NodeKind::Unary { .. }
                | NodeKind::Call { .. }
                | NodeKind::New { .. }
                | NodeKind::FieldAccess { .. }
                | NodeKind::IndexAccess { .. }
                | NodeKind::ListLit(_)
                | NodeKind::MapLit(_)
        )
    }
}

/// Binary operators, with their source spellings for error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum BinaryOp {
    #[strum(serialize = "+")]
    Add,
    #[strum(serialize = "-")]
    Sub,
    #[strum(serialize = "*")]
    Mul,
    #[strum(serialize = "/")]
    Div,
    #[strum(serialize = "%")]
    Rem,
    #[strum(serialize = "^")]
    Pow,
    #[strum(serialize = "<")]
    Lt,
    #[strum(serialize = ">")]
    Gt,
    #[strum(serialize = "<=")]
    Le,
    #[strum(serialize = ">=")]
    Ge,
    #[strum(serialize = "==")]
    Eq,
    #[strum(serialize = "!=")]
    Ne,
    #[strum(serialize = "and")]
    And,
    #[strum(serialize = "or")]
    Or,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub(crate) enum UnaryOp {
    #[strum(serialize = "-")]
    Neg,
    #[strum(serialize = "!")]
    Not,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum NodeKind {
    Program(Vec<Node>),
    Block(Vec<Node>),
    VarDecl {
        name: String,
        type_spec: TypeSpec,
        array: Option<ArraySpec>,
        init: Option<Box<Node>>,
    },
    Assign {
        target: Box<Node>,
        value: Box<Node>,
    },
    VarRef(String),
    IntLit(i32),
    FloatLit(f64),
    StrLit(String),
    BoolLit(bool),
    ListLit(Vec<Node>),
    MapLit(Vec<(Node, Node)>),
    Binary {
        op: BinaryOp,
        lhs: Box<Node>,
        rhs: Box<Node>,
    },
    Unary {
        op: UnaryOp,
        operand: Box<Node>,
    },
    FuncDef(Rc<FuncDef>),
    Call {
        callee: Box<Node>,
        args: Vec<Node>,
    },
    New {
        class: Box<Node>,
        args: Vec<Node>,
    },
    FieldAccess {
        object: Box<Node>,
        field: String,
    },
    IndexAccess {
        object: Box<Node>,
        index: Box<Node>,
    },
    ClassDef {
        name: String,
        parent: Option<String>,
        members: Vec<ClassMember>,
    },
    If {
        cond: Box<Node>,
        then_body: Vec<Node>,
        /// Either another `If` (an `elif` chain) or a `Block` (`else`).
        else_branch: Option<Box<Node>>,
    },
    While {
        cond: Box<Node>,
        body: Vec<Node>,
    },
    DoWhile {
        body: Vec<Node>,
        /// Absent when the parser recovered from a missing `while` clause.
        cond: Option<Box<Node>>,
    },
    For {
        init: Box<Node>,
        cond: Box<Node>,
        step: Box<Node>,
        body: Vec<Node>,
    },
    Foreach {
        var: String,
        iterable: Box<Node>,
        body: Vec<Node>,
    },
    Switch {
        scrutinee: Box<Node>,
        arms: Vec<SwitchArm>,
    },
    Break,
    Continue,
    Return(Option<Box<Node>>),
    Print(Vec<Node>),
    Import(String),
}
