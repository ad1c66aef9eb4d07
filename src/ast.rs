//! AST (Abstract Syntax Tree) module for the Monkey language
//!
//! This module contains all the AST node definitions consumed by the
//! compiler. Nodes expose a `Display` implementation so the compiler can
//! derive a deterministic sort key for hash-literal keys (see
//! `compiler::expr::compile_hash_literal`).

mod expr;
mod stmt;

pub use expr::{Expr, PrefixOp, InfixOp};
pub use stmt::{Program, Stmt};
