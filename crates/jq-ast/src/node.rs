//! AST node shape.

use crate::arena::NodeId;

/// Binary operators recognized by [`NodeKind::Binary`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Concat,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
    And,
    Or,
    In,
    Coalesce,
}

/// A reference to `$`, `$$`, or a named variable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VariableRef {
    /// Empty name: the current focus, `$`.
    Focus,
    /// `$$`: the original root passed into the top-level evaluation.
    Root,
    /// `$name`.
    Named(String),
}

/// The callee of a function call: either a name looked up at call time
/// (environment first, then the built-in registry) or an arbitrary
/// sub-expression that must evaluate to a function value.
#[derive(Debug, Clone, PartialEq)]
pub enum Callee {
    Name(String),
    Expr(NodeId),
}

/// One argument position in a call or partial application: either a real
/// expression, or `?`, which promotes the call to a partial application.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arg {
    Expr(NodeId),
    Placeholder,
}

/// A sort key: either a lambda comparator, a unary direction marker
/// (`<expr` / `>expr`), or a plain expression compared with the default
/// ordering rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Ascending,
    Descending,
    Comparator,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortKey {
    pub expr: NodeId,
    pub direction: SortDirection,
}

/// The tag of an AST node, with its kind-specific payload.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    StringLiteral(String),
    NumberLiteral(f64),
    BoolLiteral(bool),
    NullLiteral,
    /// A bare field-access name, e.g. `foo` in `foo.bar`.
    Name(String),
    /// An escaped name, e.g. `` `foo bar` ``; same semantics as `Name` but
    /// parsed without treating keywords specially.
    EscapedName(String),
    Variable(VariableRef),
    /// `*`: all values of the focus object, or all elements of the focus
    /// array.
    Wildcard,
    /// `**`: pre-order descendant traversal from the focus.
    Descendant,
    /// `%`: the enclosing focus during path evaluation.
    Parent,
    /// `A.B`.
    Path { lhs: NodeId, rhs: NodeId, keep_array: bool },
    /// `A[predicate]`.
    Filter { lhs: NodeId, predicate: Option<NodeId>, keep_array: bool },
    /// `A ^ (key1, key2, ...)`.
    Sort { lhs: NodeId, keys: Vec<SortKey> },
    Binary { op: BinaryOp, lhs: NodeId, rhs: NodeId },
    /// `-expr`.
    Neg(NodeId),
    Condition { cond: NodeId, then_branch: NodeId, else_branch: Option<NodeId> },
    /// `(e1; e2; ...; eN)`, a new environment frame, last value wins.
    Block(Vec<NodeId>),
    /// `$var := value`.
    Bind { name: String, value: NodeId },
    /// `[e1, e2, ...]`; sequence-valued elements flatten one level unless
    /// `keep_array` protected them.
    ArrayCtor(Vec<NodeId>),
    /// `{k: v, ...}` (prefix) or `expr{k: v}` (infix, `is_grouping = true`).
    ObjectCtor { base: Option<NodeId>, pairs: Vec<(NodeId, NodeId)>, is_grouping: bool },
    FunctionCall { callee: Callee, args: Vec<NodeId> },
    /// A call with at least one `?` placeholder argument.
    PartialApplication { callee: Callee, args: Vec<Arg> },
    Lambda { params: Vec<String>, body: NodeId, signature: Option<String>, self_name: Option<String> },
    /// `?` used as an argument placeholder.
    Placeholder,
    /// A regex literal with inline flags merged into the pattern text.
    RegexLiteral(String),
    /// `A ~> B`.
    Apply { lhs: NodeId, rhs: NodeId },
    /// `from..to`.
    Range { from: NodeId, to: NodeId },
    /// Reserved marker for the implicit context argument inserted when a
    /// signature declares a parameter contextable and the caller omitted
    /// it. The parser never emits this node directly; the evaluator
    /// synthesizes the substitution at call time (see `jq-evaluator`).
    ContextRef,
    /// Reserved marker for an index produced inside filter evaluation
    /// (`$i`-style implicit index binding). Not emitted by the parser;
    /// reserved for the evaluator's own synthesis.
    IndexRef,
}

/// One node in the AST, with its source position for diagnostics.
#[derive(Debug, Clone, PartialEq)]
pub struct Node {
    pub kind: NodeKind,
    /// Byte offset of the first character of this node's source text.
    pub pos: usize,
}

impl Node {
    pub fn new(kind: NodeKind, pos: usize) -> Self {
        Node { kind, pos }
    }
}
