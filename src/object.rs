//! Runtime values
//!
//! Everything the VM pushes onto its stack or stores in a global slot is an
//! `Object`. Aggregates hold `Rc<Object>` elements rather than owned values —
//! this crate has no garbage collector of its own; reference counting is the
//! whole story, and a reference cycle (not reachable from ordinary Monkey
//! programs, which have no mutable cells) would leak rather than crash.

use std::collections::HashMap;
use std::fmt;
use std::rc::Rc;

use crate::code::Instructions;

/// A Monkey value, reachable as `Rc<Object>` everywhere it's shared.
#[derive(Debug, Clone, PartialEq)]
pub enum Object {
    Integer(i64),
    Boolean(bool),
    Str(Rc<str>),
    Null,
    Array(Vec<Rc<Object>>),
    Hash(HashMap<HashKey, (Rc<Object>, Rc<Object>)>),
    CompiledFunction(Rc<CompiledFunction>),
    Closure(Rc<Closure>),
    Builtin(BuiltinFn),
}

/// The key half of a hash literal entry, once reduced to something
/// hashable. Only integers, booleans, and strings qualify — arrays, hashes,
/// functions, and `null` are rejected by `Object::hash_key`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum HashKey {
    Integer(i64),
    Boolean(bool),
    Str(String),
}

/// A function body as the compiler leaves it: raw bytecode plus the local
/// frame shape the VM needs to size its stack window.
#[derive(Debug, Clone, PartialEq)]
pub struct CompiledFunction {
    pub instructions: Instructions,
    pub num_locals: usize,
    pub num_parameters: usize,
}

/// A `CompiledFunction` paired with the values it captured from enclosing
/// scopes at the point it was built. Every `fn` literal compiles to an
/// `OpClosure` that produces one of these, even non-capturing ones (`free`
/// is simply empty).
#[derive(Debug, Clone, PartialEq)]
pub struct Closure {
    pub func: Rc<CompiledFunction>,
    pub free: Vec<Rc<Object>>,
}

/// Signature shared by every built-in: the call arguments, the result or an
/// error message describing the misuse.
pub type BuiltinFn = fn(&[Rc<Object>]) -> Result<Rc<Object>, String>;

thread_local! {
    static TRUE: Rc<Object> = Rc::new(Object::Boolean(true));
    static FALSE: Rc<Object> = Rc::new(Object::Boolean(false));
    static NULL: Rc<Object> = Rc::new(Object::Null);
}

/// Shared singleton, so the VM never allocates a fresh `Boolean`/`Null` per
/// push.
pub fn bool_obj(value: bool) -> Rc<Object> {
    if value {
        TRUE.with(Rc::clone)
    } else {
        FALSE.with(Rc::clone)
    }
}

pub fn null_obj() -> Rc<Object> {
    NULL.with(Rc::clone)
}

impl Object {
    /// Every value but `false` and `null` is truthy — including `0` (spec
    /// resolution of the truthiness open question; see DESIGN.md).
    pub fn is_truthy(&self) -> bool {
        !matches!(self, Object::Boolean(false) | Object::Null)
    }

    pub fn type_name(&self) -> &'static str {
        match self {
            Object::Integer(_) => "INTEGER",
            Object::Boolean(_) => "BOOLEAN",
            Object::Str(_) => "STRING",
            Object::Null => "NULL",
            Object::Array(_) => "ARRAY",
            Object::Hash(_) => "HASH",
            Object::CompiledFunction(_) => "COMPILED_FUNCTION_OBJ",
            Object::Closure(_) => "CLOSURE",
            Object::Builtin(_) => "BUILTIN",
        }
    }

    pub fn hash_key(&self) -> Result<HashKey, String> {
        match self {
            Object::Integer(i) => Ok(HashKey::Integer(*i)),
            Object::Boolean(b) => Ok(HashKey::Boolean(*b)),
            Object::Str(s) => Ok(HashKey::Str(s.to_string())),
            other => Err(format!("unusable as hash key: {}", other.type_name())),
        }
    }
}

impl fmt::Display for Object {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Object::Integer(i) => write!(f, "{i}"),
            Object::Boolean(b) => write!(f, "{b}"),
            Object::Str(s) => write!(f, "{s}"),
            Object::Null => write!(f, "null"),
            Object::Array(elements) => {
                let items: Vec<String> = elements.iter().map(|e| e.to_string()).collect();
                write!(f, "[{}]", items.join(", "))
            }
            Object::Hash(pairs) => {
                let items: Vec<String> = pairs
                    .values()
                    .map(|(key, value)| format!("{key}: {value}"))
                    .collect();
                write!(f, "{{{}}}", items.join(", "))
            }
            Object::CompiledFunction(func) => {
                write!(f, "CompiledFunction[{:p}]", Rc::as_ptr(func))
            }
            Object::Closure(closure) => write!(f, "Closure[{:p}]", Rc::as_ptr(closure)),
            Object::Builtin(_) => write!(f, "builtin function"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_strings_hash_to_the_same_key() {
        let a = Object::Str(Rc::from("hello world"));
        let b = Object::Str(Rc::from("hello world"));
        assert_eq!(a.hash_key().unwrap(), b.hash_key().unwrap());
    }

    #[test]
    fn arrays_are_not_hashable() {
        let arr = Object::Array(vec![Rc::new(Object::Integer(1))]);
        assert!(arr.hash_key().is_err());
    }

    #[test]
    fn zero_is_truthy_and_only_false_and_null_are_not() {
        assert!(Object::Integer(0).is_truthy());
        assert!(!Object::Boolean(false).is_truthy());
        assert!(!Object::Null.is_truthy());
        assert!(Object::Boolean(true).is_truthy());
    }

    #[test]
    fn booleans_and_null_are_shared_singletons() {
        assert!(Rc::ptr_eq(&bool_obj(true), &bool_obj(true)));
        assert!(Rc::ptr_eq(&null_obj(), &null_obj()));
    }
}
