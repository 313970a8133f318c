//! Bytecode compiler: lowers the syntax tree into a chunk.

use crate::ast::{Expr, ExprKind, InfixOp, PrefixOp, Program, Stmt, StmtKind};
use crate::bytecode::builtins::{self, BUILTINS};
use crate::bytecode::chunk::{Chunk, Function};
use crate::bytecode::opcode::OpCode;
use crate::bytecode::symbol::{Resolution, SymbolScope, SymbolTable};
use crate::bytecode::value::Value;
use crate::error::CompileError;

/// Result type for compilation.
pub type CompileResult<T> = Result<T, CompileError>;

/// The bytecode compiler.
///
/// Walks the tree once, emitting instructions and constants into a chunk.
/// Every statement nets exactly one value on the operand stack; sequences
/// pop all but the trailing one, so the trailing statement's value becomes
/// the program's (or block's) value.
pub struct Compiler {
    /// Chunk and metadata of the function currently being compiled.
    state: FunctionState,
    /// Enclosing function compilations, innermost last.
    enclosing: Vec<FunctionState>,
    /// Name bindings, one scope per function plus the root.
    symbols: SymbolTable,
}

struct FunctionState {
    chunk: Chunk,
    name: String,
    arity: u8,
}

impl FunctionState {
    fn new(name: &str) -> Self {
        Self {
            chunk: Chunk::new(),
            name: name.to_string(),
            arity: 0,
        }
    }
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbols = SymbolTable::new();
        for (index, builtin) in BUILTINS.iter().enumerate() {
            symbols.define_builtin(index, builtin.name);
        }
        Self {
            state: FunctionState::new(""),
            enclosing: Vec::new(),
            symbols,
        }
    }

    /// Pre-declare a global binding. REPL drivers use this to compile
    /// references to names that earlier chunks defined on the same VM.
    pub fn define_global(&mut self, name: &str) {
        self.symbols.define(name);
    }

    /// Compile a program into a chunk ending in HALT.
    pub fn compile(mut self, program: &Program) -> CompileResult<Chunk> {
        let count = program.statements.len();
        let mut last_line = 0;
        for (i, stmt) in program.statements.iter().enumerate() {
            self.compile_statement(stmt)?;
            last_line = stmt.span.line;
            // the trailing statement's value is the program's value
            if i + 1 < count {
                self.emit_op(OpCode::Pop, stmt.span.line);
            }
        }
        self.emit_op(OpCode::Halt, last_line);
        Ok(self.state.chunk)
    }

    // ===== Statements =====

    /// Compile one statement. Leaves exactly one value on the stack.
    fn compile_statement(&mut self, stmt: &Stmt) -> CompileResult<()> {
        let line = stmt.span.line;

        match &stmt.kind {
            StmtKind::Expression(expr) => self.compile_expression(expr),

            StmtKind::Make { name, value } => {
                // define before compiling the value so a binding like
                // `make fib be do(n) { ... fib(n - 1) ... }` can recurse
                self.symbols.define(name);
                self.compile_expression(value)?;
                self.compile_binding(name, line)
            }

            StmtKind::Bring(value) => {
                if let Some(expr) = value {
                    self.compile_expression(expr)?;
                } else {
                    self.emit_op(OpCode::Nothing, line);
                }
                self.emit_op(OpCode::Bring, line);
                // dead code, but keeps the static stack shape balanced
                self.emit_op(OpCode::Nothing, line);
                Ok(())
            }

            StmtKind::Block(statements) => self.compile_block(statements, line),
        }
    }

    /// Compile a statement sequence that yields its trailing value.
    fn compile_block(&mut self, statements: &[Stmt], line: u32) -> CompileResult<()> {
        if statements.is_empty() {
            self.emit_op(OpCode::Nothing, line);
            return Ok(());
        }
        let count = statements.len();
        for (i, stmt) in statements.iter().enumerate() {
            self.compile_statement(stmt)?;
            if i + 1 < count {
                self.emit_op(OpCode::Pop, stmt.span.line);
            }
        }
        Ok(())
    }

    /// Bind the value on top of the stack to a name. SET instructions peek,
    /// so the value stays as the statement's value.
    fn compile_binding(&mut self, name: &str, line: u32) -> CompileResult<()> {
        if self.symbols.at_root() {
            self.symbols.define(name);
            let name_idx = self.name_constant(name, line)?;
            self.emit_op(OpCode::SetGlobal, line);
            self.emit_u16(name_idx, line);
            return Ok(());
        }

        let symbol = match self.symbols.resolve_current(name) {
            Some(existing) => existing,
            None => self.symbols.define(name),
        };
        if symbol.index > u8::MAX as usize {
            return Err(CompileError::internal(
                format!("too many locals for '{}'", name),
                line,
            ));
        }
        match symbol.index {
            0 => self.emit_op(OpCode::SetLocal0, line),
            1 => self.emit_op(OpCode::SetLocal1, line),
            slot => {
                self.emit_op(OpCode::SetLocal, line);
                self.emit_byte(slot as u8, line);
            }
        }
        Ok(())
    }

    // ===== Expressions =====

    fn compile_expression(&mut self, expr: &Expr) -> CompileResult<()> {
        let line = expr.span.line;

        match &expr.kind {
            ExprKind::IntLiteral(v) => self.compile_integer(*v, line),

            ExprKind::StringLiteral(s) => {
                let idx = self.string_constant(s, line)?;
                self.emit_op(OpCode::Constant, line);
                self.emit_u16(idx, line);
                Ok(())
            }

            ExprKind::BoolLiteral(b) => {
                self.emit_op(if *b { OpCode::Tru } else { OpCode::Lie }, line);
                Ok(())
            }

            ExprKind::Nothing => {
                self.emit_op(OpCode::Nothing, line);
                Ok(())
            }

            ExprKind::Identifier(name) => self.compile_identifier(name, line),

            ExprKind::Prefix { operator, operand } => {
                self.compile_expression(operand)?;
                match operator {
                    PrefixOp::Negate => self.emit_op(OpCode::Negate, line),
                    PrefixOp::Not => self.emit_op(OpCode::Not, line),
                }
                Ok(())
            }

            ExprKind::Infix {
                operator,
                left,
                right,
            } => self.compile_infix(*operator, left, right, line),

            ExprKind::Suppose {
                condition,
                consequence,
                alternative,
            } => {
                self.compile_expression(condition)?;
                let alt_jump = self.emit_jump(OpCode::JumpIfLie, line);
                self.compile_statement(consequence)?;
                let end_jump = self.emit_jump(OpCode::Jump, line);
                self.patch_jump(alt_jump, line)?;
                match alternative {
                    Some(alt) => self.compile_statement(alt)?,
                    None => self.emit_op(OpCode::Nothing, line),
                }
                self.patch_jump(end_jump, line)
            }

            ExprKind::While { condition, body } => {
                let loop_start = self.state.chunk.len();
                self.compile_expression(condition)?;
                let exit_jump = self.emit_jump(OpCode::JumpIfLie, line);
                self.compile_statement(body)?;
                // discard the body's value so each iteration nets zero
                self.emit_op(OpCode::Pop, line);
                self.emit_loop(loop_start, line)?;
                self.patch_jump(exit_jump, line)?;
                // the loop expression itself yields nothing
                self.emit_op(OpCode::Nothing, line);
                Ok(())
            }

            ExprKind::FunctionDef { name, params, body } => {
                self.compile_function_def(name.as_deref(), params, body, line)
            }

            ExprKind::Call { callee, arguments } => self.compile_call(callee, arguments, line),
        }
    }

    /// Emit the narrowest instruction that can produce the integer.
    fn compile_integer(&mut self, v: i64, line: u32) -> CompileResult<()> {
        match v {
            0 => self.emit_op(OpCode::Const0, line),
            1 => self.emit_op(OpCode::Const1, line),
            -1 => self.emit_op(OpCode::ConstMinus1, line),
            -128..=127 => {
                self.emit_op(OpCode::ConstI8, line);
                self.emit_byte(v as i8 as u8, line);
            }
            -32_768..=32_767 => {
                self.emit_op(OpCode::ConstI16, line);
                self.emit_u16(v as i16 as u16, line);
            }
            _ => {
                let idx = self.add_constant(Value::int(v), line)?;
                self.emit_op(OpCode::Constant, line);
                self.emit_u16(idx, line);
            }
        }
        Ok(())
    }

    fn compile_identifier(&mut self, name: &str, line: u32) -> CompileResult<()> {
        let symbol = match self.symbols.resolve(name) {
            None => {
                return Err(CompileError::UnknownIdentifier {
                    name: name.to_string(),
                    line,
                })
            }
            Some(Resolution::OutOfReach(_)) => {
                return Err(CompileError::OutOfReach {
                    name: name.to_string(),
                    line,
                })
            }
            Some(Resolution::Found(symbol)) => symbol,
        };

        match symbol.scope {
            SymbolScope::Global => {
                let name_idx = self.name_constant(name, line)?;
                self.emit_op(OpCode::GetGlobal, line);
                self.emit_u16(name_idx, line);
            }
            SymbolScope::Local => match symbol.index {
                0 => self.emit_op(OpCode::GetLocal0, line),
                1 => self.emit_op(OpCode::GetLocal1, line),
                2 => self.emit_op(OpCode::GetLocal2, line),
                3 => self.emit_op(OpCode::GetLocal3, line),
                slot => {
                    self.emit_op(OpCode::GetLocal, line);
                    self.emit_byte(slot as u8, line);
                }
            },
            SymbolScope::Builtin => {
                let idx = self.add_constant(Value::builtin(symbol.index), line)?;
                self.emit_op(OpCode::Constant, line);
                self.emit_u16(idx, line);
            }
            SymbolScope::Upvalue => {
                return Err(CompileError::internal(
                    format!("upvalue binding for '{}' is not supported", name),
                    line,
                ))
            }
        }
        Ok(())
    }

    fn compile_infix(
        &mut self,
        operator: InfixOp,
        left: &Expr,
        right: &Expr,
        line: u32,
    ) -> CompileResult<()> {
        // and/abi short-circuit via jumps; there is no AND/OR opcode
        match operator {
            InfixOp::And => return self.compile_short_circuit(left, right, OpCode::JumpIfLie, line),
            InfixOp::Or => return self.compile_short_circuit(left, right, OpCode::JumpIfTru, line),
            _ => {}
        }

        self.compile_expression(left)?;
        self.compile_expression(right)?;

        let op = match operator {
            InfixOp::Add => OpCode::Add,
            InfixOp::Subtract => OpCode::Sub,
            InfixOp::Multiply => OpCode::Mul,
            InfixOp::Divide => OpCode::Div,
            InfixOp::Equal => OpCode::Equal,
            InfixOp::NotEqual => OpCode::NotEqual,
            InfixOp::Greater => OpCode::Greater,
            InfixOp::Less => OpCode::Less,
            InfixOp::And | InfixOp::Or => unreachable!("handled above"),
        };
        self.emit_op(op, line);
        Ok(())
    }

    /// `a and b` / `a abi b`: keep the left value if it decides the answer,
    /// otherwise evaluate the right.
    fn compile_short_circuit(
        &mut self,
        left: &Expr,
        right: &Expr,
        jump_op: OpCode,
        line: u32,
    ) -> CompileResult<()> {
        self.compile_expression(left)?;
        self.emit_op(OpCode::Dup, line);
        let short_jump = self.emit_jump(jump_op, line);
        self.emit_op(OpCode::Pop, line);
        self.compile_expression(right)?;
        self.patch_jump(short_jump, line)
    }

    fn compile_function_def(
        &mut self,
        name: Option<&str>,
        params: &[String],
        body: &Stmt,
        line: u32,
    ) -> CompileResult<()> {
        if params.len() > u8::MAX as usize {
            return Err(CompileError::internal("too many parameters", line));
        }
        let at_root = self.symbols.at_root();

        // bind the name before compiling the body so global functions can
        // recurse into themselves
        if let Some(n) = name {
            let symbol = self.symbols.define(n);
            if !at_root && symbol.index > u8::MAX as usize {
                return Err(CompileError::internal(
                    format!("too many locals for '{}'", n),
                    line,
                ));
            }
        }

        self.enter_function(name.unwrap_or(""));
        self.state.arity = params.len() as u8;
        for param in params {
            self.symbols.define(param);
        }
        self.compile_statement(body)?;
        // the body's trailing value is the implicit return value
        self.emit_op(OpCode::Return, line);
        let function = self.exit_function(line)?;

        let fn_ptr = self.state.chunk.add_function(function);
        let idx = self.add_constant(Value::function(fn_ptr), line)?;
        self.emit_op(OpCode::Closure, line);
        self.emit_u16(idx, line);

        if let Some(n) = name {
            self.compile_binding(n, line)?;
        }
        Ok(())
    }

    fn compile_call(&mut self, callee: &Expr, arguments: &[Expr], line: u32) -> CompileResult<()> {
        if arguments.len() > u8::MAX as usize {
            return Err(CompileError::internal("too many call arguments", line));
        }

        // calls on a builtin name compile to the dedicated instructions
        if let ExprKind::Identifier(name) = &callee.kind {
            if let Some(Resolution::Found(symbol)) = self.symbols.resolve(name) {
                if symbol.scope == SymbolScope::Builtin {
                    for arg in arguments {
                        self.compile_expression(arg)?;
                    }
                    if symbol.index == builtins::YARN {
                        self.emit_op(OpCode::Yarn, line);
                        self.emit_byte(arguments.len() as u8, line);
                    } else {
                        self.emit_op(OpCode::Builtin, line);
                        self.emit_byte(symbol.index as u8, line);
                        self.emit_byte(arguments.len() as u8, line);
                    }
                    return Ok(());
                }
            }
        }

        for arg in arguments {
            self.compile_expression(arg)?;
        }
        self.compile_expression(callee)?;
        match arguments.len() {
            0 => self.emit_op(OpCode::Call0, line),
            1 => self.emit_op(OpCode::Call1, line),
            2 => self.emit_op(OpCode::Call2, line),
            count => {
                self.emit_op(OpCode::Call, line);
                self.emit_byte(count as u8, line);
            }
        }
        Ok(())
    }

    // ===== Function nesting =====

    fn enter_function(&mut self, name: &str) {
        let state = std::mem::replace(&mut self.state, FunctionState::new(name));
        self.enclosing.push(state);
        self.symbols.push_scope();
    }

    fn exit_function(&mut self, line: u32) -> CompileResult<Function> {
        let local_count = self.symbols.num_definitions();
        if local_count > u8::MAX as usize {
            return Err(CompileError::internal("too many locals in function", line));
        }
        self.symbols.pop_scope();
        let enclosing = self.enclosing.pop().ok_or_else(|| {
            CompileError::internal("unbalanced function nesting", line)
        })?;
        let state = std::mem::replace(&mut self.state, enclosing);
        Ok(Function {
            name: state.name,
            arity: state.arity,
            local_count: local_count as u8,
            chunk: state.chunk,
        })
    }

    // ===== Emission =====

    fn emit_op(&mut self, op: OpCode, line: u32) {
        self.state.chunk.write_op(op, line);
    }

    fn emit_byte(&mut self, byte: u8, line: u32) {
        self.state.chunk.write_byte(byte, line);
    }

    fn emit_u16(&mut self, value: u16, line: u32) {
        self.state.chunk.write_u16(value, line);
    }

    /// Emit a jump with a placeholder offset; returns the placeholder
    /// position for patching.
    fn emit_jump(&mut self, op: OpCode, line: u32) -> usize {
        self.emit_op(op, line);
        let offset = self.state.chunk.len();
        self.emit_u16(0xFFFF, line);
        offset
    }

    /// Write the forward distance from a placeholder to the current end of
    /// the chunk.
    fn patch_jump(&mut self, offset: usize, line: u32) -> CompileResult<()> {
        let distance = self.state.chunk.len() - offset - 2;
        if distance > u16::MAX as usize {
            return Err(CompileError::JumpTooFar { line });
        }
        self.state.chunk.patch_u16(offset, distance as u16);
        Ok(())
    }

    /// Emit a backward jump to `loop_start`.
    fn emit_loop(&mut self, loop_start: usize, line: u32) -> CompileResult<()> {
        self.emit_op(OpCode::Loop, line);
        let distance = self.state.chunk.len() + 2 - loop_start;
        if distance > u16::MAX as usize {
            return Err(CompileError::JumpTooFar { line });
        }
        self.emit_u16(distance as u16, line);
        Ok(())
    }

    fn add_constant(&mut self, value: Value, line: u32) -> CompileResult<u16> {
        self.state
            .chunk
            .add_constant(value)
            .ok_or(CompileError::TooManyConstants { line })
    }

    /// Intern a string and pool it, deduplicated by content.
    fn string_constant(&mut self, s: &str, line: u32) -> CompileResult<u16> {
        let ptr = self.state.chunk.intern(s);
        self.add_constant(Value::string(ptr), line)
    }

    /// Pool an identifier's name for GET_GLOBAL / SET_GLOBAL.
    fn name_constant(&mut self, name: &str, line: u32) -> CompileResult<u16> {
        self.string_constant(name, line)
    }
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::span::Span;

    fn expr(kind: ExprKind) -> Expr {
        Expr::new(kind, Span::line_start(1))
    }

    fn int(v: i64) -> Expr {
        expr(ExprKind::IntLiteral(v))
    }

    fn ident(name: &str) -> Expr {
        expr(ExprKind::Identifier(name.to_string()))
    }

    fn infix(op: InfixOp, left: Expr, right: Expr) -> Expr {
        expr(ExprKind::Infix {
            operator: op,
            left: Box::new(left),
            right: Box::new(right),
        })
    }

    fn expr_stmt(e: Expr) -> Stmt {
        Stmt::new(StmtKind::Expression(e), Span::line_start(1))
    }

    fn make(name: &str, value: Expr) -> Stmt {
        Stmt::new(
            StmtKind::Make {
                name: name.to_string(),
                value,
            },
            Span::line_start(1),
        )
    }

    fn block(stmts: Vec<Stmt>) -> Stmt {
        Stmt::new(StmtKind::Block(stmts), Span::line_start(1))
    }

    fn program(stmts: Vec<Stmt>) -> Program {
        Program::new(stmts)
    }

    fn compile(p: &Program) -> Chunk {
        Compiler::new().compile(p).expect("compile error")
    }

    #[test]
    fn integer_literals_use_narrowest_opcode() {
        let chunk = compile(&program(vec![expr_stmt(int(0))]));
        assert_eq!(chunk.code[0], OpCode::Const0 as u8);

        let chunk = compile(&program(vec![expr_stmt(int(1))]));
        assert_eq!(chunk.code[0], OpCode::Const1 as u8);

        let chunk = compile(&program(vec![expr_stmt(int(-1))]));
        assert_eq!(chunk.code[0], OpCode::ConstMinus1 as u8);

        let chunk = compile(&program(vec![expr_stmt(int(100))]));
        assert_eq!(chunk.code[0], OpCode::ConstI8 as u8);
        assert_eq!(chunk.code[1] as i8, 100);

        let chunk = compile(&program(vec![expr_stmt(int(-2000))]));
        assert_eq!(chunk.code[0], OpCode::ConstI16 as u8);
        assert_eq!(chunk.read_u16(1) as i16, -2000);

        let chunk = compile(&program(vec![expr_stmt(int(1_000_000))]));
        assert_eq!(chunk.code[0], OpCode::Constant as u8);
        let idx = chunk.read_u16(1);
        assert_eq!(chunk.constant(idx).unwrap().as_int(), Some(1_000_000));
    }

    #[test]
    fn arithmetic_emits_operator_opcodes() {
        let chunk = compile(&program(vec![expr_stmt(infix(
            InfixOp::Add,
            int(5),
            int(3),
        ))]));
        assert_eq!(
            chunk.code,
            vec![
                OpCode::ConstI8 as u8,
                5,
                OpCode::ConstI8 as u8,
                3,
                OpCode::Add as u8,
                OpCode::Halt as u8,
            ]
        );
    }

    #[test]
    fn non_trailing_statements_are_popped() {
        let chunk = compile(&program(vec![expr_stmt(int(1)), expr_stmt(int(2))]));
        assert_eq!(
            chunk.code,
            vec![
                OpCode::Const1 as u8,
                OpCode::Pop as u8,
                OpCode::ConstI8 as u8,
                2,
                OpCode::Halt as u8,
            ]
        );
    }

    #[test]
    fn global_binding_emits_set_global_with_name() {
        let chunk = compile(&program(vec![make("x", int(42)), expr_stmt(ident("x"))]));
        assert_eq!(chunk.code[0], OpCode::ConstI8 as u8);
        assert_eq!(chunk.code[2], OpCode::SetGlobal as u8);
        let name_idx = chunk.read_u16(3);
        let name = chunk.constant(name_idx).unwrap();
        assert!(name.is_string());
        // binding value popped, then GET_GLOBAL of the same name
        assert_eq!(chunk.code[5], OpCode::Pop as u8);
        assert_eq!(chunk.code[6], OpCode::GetGlobal as u8);
        assert_eq!(chunk.read_u16(7), name_idx);
    }

    #[test]
    fn undefined_identifier_is_a_compile_error() {
        let err = Compiler::new()
            .compile(&program(vec![expr_stmt(ident("wetin"))]))
            .unwrap_err();
        assert!(matches!(
            err,
            CompileError::UnknownIdentifier { ref name, .. } if name == "wetin"
        ));
    }

    #[test]
    fn suppose_compiles_to_patched_jumps() {
        let suppose = expr(ExprKind::Suppose {
            condition: Box::new(expr(ExprKind::BoolLiteral(true))),
            consequence: Box::new(block(vec![expr_stmt(int(1))])),
            alternative: Some(Box::new(block(vec![expr_stmt(int(0))]))),
        });
        let chunk = compile(&program(vec![expr_stmt(suppose)]));

        assert_eq!(chunk.code[0], OpCode::Tru as u8);
        assert_eq!(chunk.code[1], OpCode::JumpIfLie as u8);
        // jump over the consequence (Const1) and the end-jump
        assert_eq!(chunk.read_u16(2), 4);
        assert_eq!(chunk.code[4], OpCode::Const1 as u8);
        assert_eq!(chunk.code[5], OpCode::Jump as u8);
        // jump over the alternative (Const0)
        assert_eq!(chunk.read_u16(6), 1);
        assert_eq!(chunk.code[8], OpCode::Const0 as u8);
        assert_eq!(chunk.code[9], OpCode::Halt as u8);
    }

    #[test]
    fn while_loop_jumps_back_to_condition() {
        let loop_expr = expr(ExprKind::While {
            condition: Box::new(expr(ExprKind::BoolLiteral(false))),
            body: Box::new(block(vec![expr_stmt(int(1))])),
        });
        let chunk = compile(&program(vec![expr_stmt(loop_expr)]));

        assert_eq!(chunk.code[0], OpCode::Lie as u8);
        assert_eq!(chunk.code[1], OpCode::JumpIfLie as u8);
        assert_eq!(chunk.code[4], OpCode::Const1 as u8);
        assert_eq!(chunk.code[5], OpCode::Pop as u8);
        assert_eq!(chunk.code[6], OpCode::Loop as u8);
        // LOOP lands back on the condition at offset 0
        let loop_operand = chunk.read_u16(7) as usize;
        assert_eq!(9 - loop_operand, 0);
        // exit jump lands just past LOOP
        assert_eq!(chunk.read_u16(2) as usize + 4, 9);
        assert_eq!(chunk.code[9], OpCode::Nothing as u8);
    }

    #[test]
    fn short_circuit_and_keeps_left_value() {
        let chunk = compile(&program(vec![expr_stmt(infix(
            InfixOp::And,
            expr(ExprKind::BoolLiteral(false)),
            int(5),
        ))]));
        assert_eq!(
            chunk.code,
            vec![
                OpCode::Lie as u8,
                OpCode::Dup as u8,
                OpCode::JumpIfLie as u8,
                0,
                3,
                OpCode::Pop as u8,
                OpCode::ConstI8 as u8,
                5,
                OpCode::Halt as u8,
            ]
        );
    }

    #[test]
    fn yarn_call_emits_print_instruction() {
        let call = expr(ExprKind::Call {
            callee: Box::new(ident("yarn")),
            arguments: vec![int(1), int(2)],
        });
        let chunk = compile(&program(vec![expr_stmt(call)]));
        assert_eq!(
            chunk.code,
            vec![
                OpCode::Const1 as u8,
                OpCode::ConstI8 as u8,
                2,
                OpCode::Yarn as u8,
                2,
                OpCode::Halt as u8,
            ]
        );
    }

    #[test]
    fn len_call_emits_builtin_instruction() {
        let call = expr(ExprKind::Call {
            callee: Box::new(ident("len")),
            arguments: vec![expr(ExprKind::StringLiteral("abc".to_string()))],
        });
        let chunk = compile(&program(vec![expr_stmt(call)]));
        assert_eq!(chunk.code[3], OpCode::Builtin as u8);
        assert_eq!(chunk.code[4], builtins::LEN as u8);
        assert_eq!(chunk.code[5], 1);
    }

    #[test]
    fn builtin_reference_outside_call_pools_a_builtin_value() {
        let chunk = compile(&program(vec![expr_stmt(ident("type"))]));
        assert_eq!(chunk.code[0], OpCode::Constant as u8);
        let value = chunk.constant(chunk.read_u16(1)).unwrap();
        assert_eq!(value.as_builtin(), Some(builtins::TYPE));
    }

    #[test]
    fn regular_calls_use_specialized_opcodes() {
        let def = expr(ExprKind::FunctionDef {
            name: Some("f".to_string()),
            params: vec![],
            body: Box::new(block(vec![expr_stmt(int(7))])),
        });
        let call = expr(ExprKind::Call {
            callee: Box::new(ident("f")),
            arguments: vec![],
        });
        let chunk = compile(&program(vec![expr_stmt(def), expr_stmt(call)]));
        assert!(chunk.code.contains(&(OpCode::Call0 as u8)));
        assert!(chunk.code.contains(&(OpCode::Closure as u8)));
    }

    #[test]
    fn function_locals_use_slot_instructions() {
        // do(a, b) { a + b }
        let def = expr(ExprKind::FunctionDef {
            name: Some("add".to_string()),
            params: vec!["a".to_string(), "b".to_string()],
            body: Box::new(block(vec![expr_stmt(infix(
                InfixOp::Add,
                ident("a"),
                ident("b"),
            ))])),
        });
        let chunk = compile(&program(vec![expr_stmt(def)]));
        let function = chunk.functions().next().expect("one function record");
        assert_eq!(function.arity, 2);
        assert_eq!(function.local_count, 2);
        assert_eq!(
            function.chunk.code,
            vec![
                OpCode::GetLocal0 as u8,
                OpCode::GetLocal1 as u8,
                OpCode::Add as u8,
                OpCode::Return as u8,
            ]
        );
    }

    #[test]
    fn enclosing_local_is_rejected() {
        // do(a) { do() { a } }
        let inner = expr(ExprKind::FunctionDef {
            name: None,
            params: vec![],
            body: Box::new(block(vec![expr_stmt(ident("a"))])),
        });
        let outer = expr(ExprKind::FunctionDef {
            name: None,
            params: vec!["a".to_string()],
            body: Box::new(block(vec![expr_stmt(inner)])),
        });
        let err = Compiler::new()
            .compile(&program(vec![expr_stmt(outer)]))
            .unwrap_err();
        assert!(matches!(err, CompileError::OutOfReach { ref name, .. } if name == "a"));
    }

    #[test]
    fn constants_pool_has_no_duplicates() {
        let chunk = compile(&program(vec![
            make("x", int(100_000)),
            make("y", int(100_000)),
            expr_stmt(infix(InfixOp::Add, ident("x"), ident("x"))),
        ]));
        for (i, a) in chunk.constants.iter().enumerate() {
            for b in chunk.constants.iter().skip(i + 1) {
                assert_ne!(a, b, "constant pool contains duplicates");
            }
        }
    }
}
