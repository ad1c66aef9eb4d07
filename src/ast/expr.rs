use super::stmt::Stmt;
use std::fmt;

/// Prefix operators: `!` and unary `-`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrefixOp {
    Bang,
    Minus,
}

impl fmt::Display for PrefixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PrefixOp::Bang => write!(f, "!"),
            PrefixOp::Minus => write!(f, "-"),
        }
    }
}

/// Infix operators. `Lt` is retained in the AST even though the compiler
/// never emits a dedicated `<` opcode — it rewrites `a < b` into `b > a` at
/// compile time (spec §4.1, §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InfixOp {
    Plus,
    Minus,
    Asterisk,
    Slash,
    Eq,
    NotEq,
    Lt,
    Gt,
}

impl fmt::Display for InfixOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            InfixOp::Plus => "+",
            InfixOp::Minus => "-",
            InfixOp::Asterisk => "*",
            InfixOp::Slash => "/",
            InfixOp::Eq => "==",
            InfixOp::NotEq => "!=",
            InfixOp::Lt => "<",
            InfixOp::Gt => ">",
        };
        write!(f, "{s}")
    }
}

/// Expressions.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Identifier(String),
    IntegerLiteral(i64),
    StringLiteral(String),
    Boolean(bool),
    Prefix {
        op: PrefixOp,
        right: Box<Expr>,
    },
    Infix {
        op: InfixOp,
        left: Box<Expr>,
        right: Box<Expr>,
    },
    If {
        condition: Box<Expr>,
        consequence: Vec<Stmt>,
        alternative: Option<Vec<Stmt>>,
    },
    FunctionLiteral {
        parameters: Vec<String>,
        body: Vec<Stmt>,
        /// Set iff this literal is the right-hand side of a `let` binding
        /// whose target identifier has this name (spec §3.1 invariant).
        name: Option<String>,
    },
    Call {
        function: Box<Expr>,
        arguments: Vec<Expr>,
    },
    ArrayLiteral(Vec<Expr>),
    /// Unordered in principle (spec §3.1); the vector preserves parse order
    /// and the compiler re-sorts by `to_string()` before emitting (§4.3).
    HashLiteral(Vec<(Expr, Expr)>),
    Index {
        left: Box<Expr>,
        index: Box<Expr>,
    },
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Expr::Identifier(name) => write!(f, "{name}"),
            Expr::IntegerLiteral(n) => write!(f, "{n}"),
            Expr::StringLiteral(s) => write!(f, "{s}"),
            Expr::Boolean(b) => write!(f, "{b}"),
            Expr::Prefix { op, right } => write!(f, "({op}{right})"),
            Expr::Infix { op, left, right } => write!(f, "({left} {op} {right})"),
            Expr::If {
                condition,
                consequence,
                alternative,
            } => {
                write!(f, "if{condition} ")?;
                write_block(f, consequence)?;
                if let Some(alt) = alternative {
                    write!(f, "else ")?;
                    write_block(f, alt)?;
                }
                Ok(())
            }
            Expr::FunctionLiteral {
                parameters, body, ..
            } => {
                write!(f, "fn({}) ", parameters.join(", "))?;
                write_block(f, body)
            }
            Expr::Call {
                function,
                arguments,
            } => {
                let args: Vec<String> = arguments.iter().map(|a| a.to_string()).collect();
                write!(f, "{function}({})", args.join(", "))
            }
            Expr::ArrayLiteral(elements) => {
                let elems: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", elems.join(", "))
            }
            Expr::HashLiteral(pairs) => {
                let elems: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{k}:{v}")).collect();
                write!(f, "{{{}}}", elems.join(", "))
            }
            Expr::Index { left, index } => write!(f, "({left}[{index}])"),
        }
    }
}

fn write_block(f: &mut fmt::Formatter<'_>, stmts: &[Stmt]) -> fmt::Result {
    write!(f, "{{ ")?;
    for stmt in stmts {
        write!(f, "{stmt} ")?;
    }
    write!(f, "}}")
}
