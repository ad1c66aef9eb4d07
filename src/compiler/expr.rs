use std::rc::Rc;

use crate::ast::{Expr, InfixOp, PrefixOp};
use crate::code::Opcode;
use crate::object::{CompiledFunction, Object};

use super::stmt::compile_block_statements;
use super::Compiler;

pub(super) fn compile_expression_internal(compiler: &mut Compiler, expr: &Expr) -> Result<(), String> {
    match expr {
        Expr::Identifier(name) => compile_identifier(compiler, name),
        Expr::IntegerLiteral(value) => {
            let index = compiler.add_constant(Object::Integer(*value));
            compiler.emit(Opcode::Constant, &[index]);
            Ok(())
        }
        Expr::StringLiteral(value) => {
            let index = compiler.add_constant(Object::Str(Rc::from(value.as_str())));
            compiler.emit(Opcode::Constant, &[index]);
            Ok(())
        }
        Expr::Boolean(true) => {
            compiler.emit(Opcode::PushTrue, &[]);
            Ok(())
        }
        Expr::Boolean(false) => {
            compiler.emit(Opcode::PushFalse, &[]);
            Ok(())
        }
        Expr::Prefix { op, right } => compile_prefix_expression(compiler, *op, right),
        Expr::Infix { op, left, right } => compile_infix_expression(compiler, *op, left, right),
        Expr::If {
            condition,
            consequence,
            alternative,
        } => compile_if_expression(compiler, condition, consequence, alternative.as_deref()),
        Expr::FunctionLiteral {
            parameters,
            body,
            name,
        } => compile_function_literal(compiler, parameters, body, name.as_deref()),
        Expr::Call {
            function,
            arguments,
        } => compile_call_expression(compiler, function, arguments),
        Expr::ArrayLiteral(elements) => compile_array_literal(compiler, elements),
        Expr::HashLiteral(pairs) => compile_hash_literal(compiler, pairs),
        Expr::Index { left, index } => compile_index_expression(compiler, left, index),
    }
}

fn compile_identifier(compiler: &mut Compiler, name: &str) -> Result<(), String> {
    let symbol = compiler
        .resolve_symbol(name)
        .ok_or_else(|| format!("undefined variable {name}"))?;
    compiler.load_symbol(&symbol);
    Ok(())
}

fn compile_prefix_expression(compiler: &mut Compiler, op: PrefixOp, right: &Expr) -> Result<(), String> {
    compiler.compile_expression(right)?;
    match op {
        PrefixOp::Bang => compiler.emit(Opcode::Bang, &[]),
        PrefixOp::Minus => compiler.emit(Opcode::Minus, &[]),
    };
    Ok(())
}

/// `a < b` is never given its own opcode: the compiler swaps the operand
/// order and emits `OpGreaterThan` instead, so the VM only has to implement
/// one direction of comparison.
fn compile_infix_expression(
    compiler: &mut Compiler,
    op: InfixOp,
    left: &Expr,
    right: &Expr,
) -> Result<(), String> {
    if op == InfixOp::Lt {
        compiler.compile_expression(right)?;
        compiler.compile_expression(left)?;
        compiler.emit(Opcode::GreaterThan, &[]);
        return Ok(());
    }

    compiler.compile_expression(left)?;
    compiler.compile_expression(right)?;

    let opcode = match op {
        InfixOp::Plus => Opcode::Add,
        InfixOp::Minus => Opcode::Sub,
        InfixOp::Asterisk => Opcode::Mul,
        InfixOp::Slash => Opcode::Div,
        InfixOp::Eq => Opcode::Equal,
        InfixOp::NotEq => Opcode::NotEqual,
        InfixOp::Gt => Opcode::GreaterThan,
        InfixOp::Lt => unreachable!("handled above"),
    };
    compiler.emit(opcode, &[]);
    Ok(())
}

/// The two-jump, back-patched shape every book-derived Monkey compiler
/// uses: emit a conditional jump with a placeholder target, compile the
/// consequence, emit an unconditional jump (also placeholder) over the
/// alternative, then patch both targets once the final size is known. A
/// missing `else` still produces a value — `OpNull` — so `if` remains an
/// expression.
fn compile_if_expression(
    compiler: &mut Compiler,
    condition: &Expr,
    consequence: &[crate::ast::Stmt],
    alternative: Option<&[crate::ast::Stmt]>,
) -> Result<(), String> {
    compiler.compile_expression(condition)?;

    let jump_not_truthy_pos = compiler.emit(Opcode::JumpNotTruthy, &[9999]);

    compile_block_statements(compiler, consequence)?;
    if compiler.last_instruction_is(Opcode::Pop) {
        compiler.remove_last_pop();
    }

    let jump_pos = compiler.emit(Opcode::Jump, &[9999]);

    let after_consequence_pos = compiler.current_instructions().len();
    compiler.change_operand(jump_not_truthy_pos, after_consequence_pos);

    match alternative {
        None => {
            compiler.emit(Opcode::PushNull, &[]);
        }
        Some(alt) => {
            compile_block_statements(compiler, alt)?;
            if compiler.last_instruction_is(Opcode::Pop) {
                compiler.remove_last_pop();
            }
        }
    }

    let after_alternative_pos = compiler.current_instructions().len();
    compiler.change_operand(jump_pos, after_alternative_pos);

    Ok(())
}

fn compile_function_literal(
    compiler: &mut Compiler,
    parameters: &[String],
    body: &[crate::ast::Stmt],
    name: Option<&str>,
) -> Result<(), String> {
    compiler.enter_scope();

    if let Some(name) = name {
        compiler.define_function_name(name);
    }

    for param in parameters {
        compiler.define_symbol(param);
    }

    compile_block_statements(compiler, body)?;

    if compiler.last_instruction_is(Opcode::Pop) {
        compiler.replace_last_pop_with_return();
    }
    if !compiler.last_instruction_is(Opcode::ReturnValue) {
        compiler.emit(Opcode::Return, &[]);
    }

    let free_symbols = compiler.free_symbols_in_current_scope();
    let num_locals = compiler.num_definitions_in_current_scope();
    let instructions = compiler.leave_scope();

    // Emitted in the *enclosing* scope, now current again: each captured
    // variable is loaded by whatever means it's reachable there, so the
    // closure's free-variable list is built in a fixed, known order.
    for symbol in &free_symbols {
        compiler.load_symbol(symbol);
    }

    let constant = compiler.add_constant(Object::CompiledFunction(Rc::new(CompiledFunction {
        instructions,
        num_locals,
        num_parameters: parameters.len(),
    })));

    compiler.emit(Opcode::Closure, &[constant, free_symbols.len()]);
    Ok(())
}

fn compile_call_expression(
    compiler: &mut Compiler,
    function: &Expr,
    arguments: &[Expr],
) -> Result<(), String> {
    compiler.compile_expression(function)?;
    for arg in arguments {
        compiler.compile_expression(arg)?;
    }
    compiler.emit(Opcode::Call, &[arguments.len()]);
    Ok(())
}

fn compile_array_literal(compiler: &mut Compiler, elements: &[Expr]) -> Result<(), String> {
    for element in elements {
        compiler.compile_expression(element)?;
    }
    compiler.emit(Opcode::Array, &[elements.len()]);
    Ok(())
}

/// Hash keys carry no intrinsic order; sorting by their rendered text keeps
/// the emitted bytecode deterministic regardless of parse order, which
/// matters for reproducible disassembly and for the unit tests that assert
/// on exact constant-pool layout.
fn compile_hash_literal(compiler: &mut Compiler, pairs: &[(Expr, Expr)]) -> Result<(), String> {
    let mut sorted: Vec<&(Expr, Expr)> = pairs.iter().collect();
    sorted.sort_by_key(|(key, _)| key.to_string());

    for (key, value) in sorted {
        compiler.compile_expression(key)?;
        compiler.compile_expression(value)?;
    }
    compiler.emit(Opcode::Hash, &[pairs.len() * 2]);
    Ok(())
}

fn compile_index_expression(compiler: &mut Compiler, left: &Expr, index: &Expr) -> Result<(), String> {
    compiler.compile_expression(left)?;
    compiler.compile_expression(index)?;
    compiler.emit(Opcode::Index, &[]);
    Ok(())
}
