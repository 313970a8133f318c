//! Pidgin: a bytecode engine for a Nigerian Pidgin English scripting
//! language.
//!
//! This crate is the execution half of the language: a compiler that lowers
//! a parsed syntax tree ([`ast`]) into linear bytecode ([`bytecode::Chunk`])
//! and a stack-based virtual machine ([`bytecode::Vm`]) that runs it. The
//! lexer, parser and interactive shell live outside this crate and talk to
//! it through the syntax-tree types.
//!
//! ```text
//! syntax tree -> Compiler -> Chunk -> Vm -> value or error
//! ```
//!
//! The VM keeps its globals across runs, so a driver can feed it one chunk
//! per REPL line and observe earlier declarations.

pub mod ast;
pub mod bytecode;
pub mod error;
pub mod span;

pub use bytecode::{disassemble_chunk, Chunk, Compiler, OpCode, Value, Vm};
pub use error::{CompileError, PidginError, RuntimeError};

/// Compile a program into a chunk ready for [`Vm::run`].
pub fn compile(program: &ast::Program) -> Result<bytecode::Chunk, CompileError> {
    Compiler::new().compile(program)
}
