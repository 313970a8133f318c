//! Abstract syntax tree for Pidgin programs.
//!
//! These are the node kinds the bytecode compiler consumes. The lexer and
//! parser that produce them live outside this crate; anything that can build
//! this tree (a parser, a test, a benchmark) can feed the compiler.

pub mod expr;
pub mod stmt;

pub use expr::{Expr, ExprKind, InfixOp, PrefixOp};
pub use stmt::{Program, Stmt, StmtKind};
