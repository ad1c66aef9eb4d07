use std::rc::Rc;

use crate::code::Instructions;
use crate::object::Closure;

/// One call's worth of execution context: the closure being run, where its
/// instruction pointer currently sits, and where its locals begin on the
/// shared value stack.
pub struct Frame {
    pub closure: Rc<Closure>,
    /// Signed so it can start at -1 and be pre-incremented before the first
    /// fetch, matching the rest of the fetch-decode-execute loop's
    /// pre-increment style.
    pub ip: isize,
    pub base_pointer: usize,
}

impl Frame {
    pub fn new(closure: Rc<Closure>, base_pointer: usize) -> Self {
        Frame {
            closure,
            ip: -1,
            base_pointer,
        }
    }

    pub fn instructions(&self) -> &Instructions {
        &self.closure.func.instructions
    }
}
