//! Expression AST nodes.

use crate::ast::stmt::Stmt;
use crate::span::Span;

/// An expression in the AST.
#[derive(Debug, Clone, PartialEq)]
pub struct Expr {
    pub kind: ExprKind,
    pub span: Span,
}

impl Expr {
    pub fn new(kind: ExprKind, span: Span) -> Self {
        Self { kind, span }
    }
}

/// All expression variants.
#[derive(Debug, Clone, PartialEq)]
pub enum ExprKind {
    /// Integer literal: `42`
    IntLiteral(i64),
    /// String literal: `"How far"`
    StringLiteral(String),
    /// Boolean literal: `tru`, `lie`
    BoolLiteral(bool),
    /// The null literal: `nothing`
    Nothing,

    /// Name reference: `x`
    Identifier(String),

    /// Prefix operation: `-x`, `no be x`
    Prefix {
        operator: PrefixOp,
        operand: Box<Expr>,
    },

    /// Infix operation: `a + b`, `a big pass b`
    Infix {
        operator: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },

    /// Conditional: `suppose cond { ... } abi { ... }`
    ///
    /// Both branches are block statements; the conditional yields the
    /// chosen branch's trailing value (or nothing when the alternative is
    /// absent and the condition fails).
    Suppose {
        condition: Box<Expr>,
        consequence: Box<Stmt>,
        alternative: Option<Box<Stmt>>,
    },

    /// Loop: `while cond { ... }`; yields nothing.
    While {
        condition: Box<Expr>,
        body: Box<Stmt>,
    },

    /// Function definition: `make add be do(a, b) { a + b }`
    ///
    /// A named definition also binds the name in the surrounding scope.
    FunctionDef {
        name: Option<String>,
        params: Vec<String>,
        body: Box<Stmt>,
    },

    /// Function call: `add(1, 2)`
    Call {
        callee: Box<Expr>,
        arguments: Vec<Expr>,
    },
}

/// Prefix operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    /// `-x`
    Negate,
    /// `!x`, `no be x`
    Not,
}

/// Infix operators. The pidgin spellings (`be`, `na`, `big pass`,
/// `no reach`, `abi`) map onto these at parse time.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Add,
    Subtract,
    Multiply,
    Divide,
    /// `be` / `na` / `==`
    Equal,
    /// `no be` / `!=`
    NotEqual,
    /// `big pass` / `>`
    Greater,
    /// `no reach` / `<`
    Less,
    /// short-circuit `and`
    And,
    /// short-circuit `abi` / `or`
    Or,
}
