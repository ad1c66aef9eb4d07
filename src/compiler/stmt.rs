use crate::ast::Stmt;
use crate::code::Opcode;
use crate::symbol_table::SymbolScope;

use super::Compiler;

pub(super) fn compile_statement_internal(compiler: &mut Compiler, stmt: &Stmt) -> Result<(), String> {
    match stmt {
        Stmt::Let { name, value } => compile_let_statement(compiler, name, value),
        Stmt::Return(value) => compile_return_statement(compiler, value),
        Stmt::Expression(expr) => compile_expression_statement(compiler, expr),
        Stmt::Block(stmts) => compile_block_statements(compiler, stmts),
    }
}

/// The symbol is defined *before* the value is compiled, so a function
/// literal on the right-hand side can resolve its own name for recursive
/// self-calls (`let countDown = fn(x) { countDown(x - 1) }`).
fn compile_let_statement(compiler: &mut Compiler, name: &str, value: &crate::ast::Expr) -> Result<(), String> {
    let symbol = compiler.define_symbol(name);
    compiler.compile_expression(value)?;
    match symbol.scope {
        SymbolScope::Global => {
            compiler.emit(Opcode::SetGlobal, &[symbol.index]);
        }
        _ => {
            compiler.emit(Opcode::SetLocal, &[symbol.index]);
        }
    }
    Ok(())
}

fn compile_return_statement(compiler: &mut Compiler, value: &crate::ast::Expr) -> Result<(), String> {
    compiler.compile_expression(value)?;
    compiler.emit(Opcode::ReturnValue, &[]);
    Ok(())
}

fn compile_expression_statement(compiler: &mut Compiler, expr: &crate::ast::Expr) -> Result<(), String> {
    compiler.compile_expression(expr)?;
    compiler.emit(Opcode::Pop, &[]);
    Ok(())
}

/// Compiles a sequence of statements in place, with no scope of its own —
/// `if` branches and function bodies call this directly rather than going
/// through `Stmt::Block`.
pub(super) fn compile_block_statements(compiler: &mut Compiler, stmts: &[Stmt]) -> Result<(), String> {
    for stmt in stmts {
        compiler.compile_statement(stmt)?;
    }
    Ok(())
}
