//! AST-to-bytecode compiler
//!
//! Walks a parsed `Program` once, emitting instructions into the current
//! `CompilationScope`'s buffer and interning literals into a shared constant
//! pool. `compile` is a thin dispatcher; the actual per-node logic lives in
//! `compiler::stmt` and `compiler::expr`, each exposing a
//! `compile_*_internal` free function that takes `&mut Compiler` as its
//! first argument.

mod expr;
mod scope;
mod stmt;

use std::rc::Rc;

use crate::ast::{Program, Stmt};
use crate::builtins;
use crate::code::{self, Instructions, Opcode};
use crate::object::Object;
use crate::symbol_table::{Symbol, SymbolScope, SymbolTable};

use scope::{CompilationScope, EmittedInstruction};

/// The compiler's output: a flat instruction stream plus the constant pool
/// it indexes into.
pub struct Bytecode {
    pub instructions: Instructions,
    pub constants: Vec<Rc<Object>>,
}

pub struct Compiler {
    constants: Vec<Rc<Object>>,
    symbol_table: SymbolTable,
    scopes: Vec<CompilationScope>,
}

impl Default for Compiler {
    fn default() -> Self {
        Self::new()
    }
}

impl Compiler {
    pub fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (index, (name, _)) in builtins::BUILTINS.iter().enumerate() {
            symbol_table.define_builtin(index, name);
        }

        Compiler {
            constants: Vec::new(),
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    /// Resumes compilation on top of state carried over from a previous
    /// call — the REPL's mechanism for keeping `let`-bound globals and
    /// already-interned constants alive across separate input lines.
    pub fn new_with_state(symbol_table: SymbolTable, constants: Vec<Rc<Object>>) -> Self {
        Compiler {
            constants,
            symbol_table,
            scopes: vec![CompilationScope::default()],
        }
    }

    pub fn symbol_table(self) -> SymbolTable {
        self.symbol_table
    }

    pub fn constants(&self) -> &[Rc<Object>] {
        &self.constants
    }

    pub fn compile(&mut self, program: &Program) -> Result<(), String> {
        for stmt in &program.statements {
            self.compile_statement(stmt)?;
        }
        Ok(())
    }

    pub fn bytecode(&self) -> Bytecode {
        Bytecode {
            instructions: self.current_instructions().clone(),
            constants: self.constants.clone(),
        }
    }

    pub(crate) fn compile_statement(&mut self, stmt: &Stmt) -> Result<(), String> {
        stmt::compile_statement_internal(self, stmt)
    }

    pub(crate) fn compile_expression(&mut self, expr: &crate::ast::Expr) -> Result<(), String> {
        expr::compile_expression_internal(self, expr)
    }

    fn current_scope(&self) -> &CompilationScope {
        self.scopes.last().expect("compiler always has a scope")
    }

    fn current_scope_mut(&mut self) -> &mut CompilationScope {
        self.scopes.last_mut().expect("compiler always has a scope")
    }

    pub(crate) fn current_instructions(&self) -> &Instructions {
        &self.current_scope().instructions
    }

    /// Encodes `op` with `operands` and appends it to the current scope's
    /// buffer, returning the byte offset it was written at.
    pub(crate) fn emit(&mut self, op: Opcode, operands: &[usize]) -> usize {
        let instruction = code::make(op, operands);
        let position = self.current_instructions().len();
        self.current_scope_mut().instructions.extend(instruction);
        self.set_last_instruction(op, position);
        position
    }

    fn set_last_instruction(&mut self, opcode: Opcode, position: usize) {
        let scope = self.current_scope_mut();
        scope.previous_instruction = scope.last_instruction;
        scope.last_instruction = Some(EmittedInstruction { opcode, position });
    }

    pub(crate) fn last_instruction_is(&self, op: Opcode) -> bool {
        match self.current_scope().last_instruction {
            Some(EmittedInstruction { opcode, .. }) => opcode == op,
            None => false,
        }
    }

    /// Drops a trailing `OpPop`, restoring the scope's `last_instruction` to
    /// what preceded it. Used where an expression statement's value needs to
    /// survive — the tail of a block used as an expression's result.
    pub(crate) fn remove_last_pop(&mut self) {
        let scope = self.current_scope_mut();
        let last = scope
            .last_instruction
            .expect("remove_last_pop called with no instructions emitted");
        scope.instructions.truncate(last.position);
        scope.last_instruction = scope.previous_instruction;
    }

    /// Overwrites the bytes at `position` in place. `new_instruction` must
    /// be exactly the width of the instruction it replaces — used only to
    /// patch jump-target operands after the fact.
    pub(crate) fn replace_instruction(&mut self, position: usize, new_instruction: Instructions) {
        let instructions = &mut self.current_scope_mut().instructions;
        instructions[position..position + new_instruction.len()]
            .copy_from_slice(&new_instruction);
    }

    /// Rewrites the operand of the (2-byte-operand) jump instruction at
    /// `op_position` to `operand`, once its target is known.
    pub(crate) fn change_operand(&mut self, op_position: usize, operand: usize) {
        let op = self.current_instructions()[op_position];
        let new_instruction = code::make(
            code_opcode_from_byte(op),
            &[operand],
        );
        self.replace_instruction(op_position, new_instruction);
    }

    /// If the last statement compiled was an expression statement (and so
    /// ended in `OpPop`), turns it into `OpReturnValue` — the implicit
    /// return every Monkey function body ends with if its final statement
    /// is an expression.
    pub(crate) fn replace_last_pop_with_return(&mut self) {
        let last = match self.current_scope().last_instruction {
            Some(e) => e,
            None => return,
        };
        if last.opcode != Opcode::Pop {
            return;
        }
        let new_instruction = code::make(Opcode::ReturnValue, &[]);
        self.replace_instruction(last.position, new_instruction);
        self.current_scope_mut().last_instruction = Some(EmittedInstruction {
            opcode: Opcode::ReturnValue,
            position: last.position,
        });
    }

    pub(crate) fn add_constant(&mut self, obj: Object) -> usize {
        self.constants.push(Rc::new(obj));
        self.constants.len() - 1
    }

    pub(crate) fn enter_scope(&mut self) {
        self.scopes.push(CompilationScope::default());
        self.symbol_table.push_scope();
    }

    /// Leaves the current scope, returning its finished instruction buffer
    /// to the caller (who embeds it into a `CompiledFunction`).
    pub(crate) fn leave_scope(&mut self) -> Instructions {
        let scope = self.scopes.pop().expect("leave_scope without enter_scope");
        self.symbol_table.pop_scope();
        scope.instructions
    }

    pub(crate) fn define_symbol(&mut self, name: &str) -> Symbol {
        self.symbol_table.define(name)
    }

    pub(crate) fn define_function_name(&mut self, name: &str) {
        self.symbol_table.define_function_name(name);
    }

    pub(crate) fn resolve_symbol(&mut self, name: &str) -> Option<Symbol> {
        self.symbol_table.resolve(name)
    }

    pub(crate) fn num_definitions_in_current_scope(&self) -> usize {
        self.symbol_table.num_definitions()
    }

    pub(crate) fn free_symbols_in_current_scope(&self) -> Vec<Symbol> {
        self.symbol_table.free_symbols.clone()
    }

    /// Emits the load instruction appropriate to where `symbol` lives.
    pub(crate) fn load_symbol(&mut self, symbol: &Symbol) {
        match symbol.scope {
            SymbolScope::Global => {
                self.emit(Opcode::GetGlobal, &[symbol.index]);
            }
            SymbolScope::Local => {
                self.emit(Opcode::GetLocal, &[symbol.index]);
            }
            SymbolScope::Builtin => {
                self.emit(Opcode::GetBuiltin, &[symbol.index]);
            }
            SymbolScope::Free => {
                self.emit(Opcode::GetFree, &[symbol.index]);
            }
            SymbolScope::Function => {
                self.emit(Opcode::CurrentClosure, &[]);
            }
        }
    }
}

fn code_opcode_from_byte(byte: u8) -> Opcode {
    // `code::lookup` already validated this byte when the instruction was
    // first emitted; only jump-family opcodes ever get their operand
    // patched, and both have a 2-byte operand.
    match byte {
        b if b == Opcode::Jump as u8 => Opcode::Jump,
        b if b == Opcode::JumpNotTruthy as u8 => Opcode::JumpNotTruthy,
        _ => unreachable!("change_operand called on a non-jump instruction"),
    }
}
