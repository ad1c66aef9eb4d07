//! Interactive read-eval-print loop
//!
//! Each line is compiled and run independently, but `Session` threads the
//! symbol table, constant pool, and global slots through from one line to
//! the next so that a `let` on one prompt is visible on the next.

use std::io::{self, BufRead, Write};
use std::rc::Rc;

use crate::builtins;
use crate::compiler::Compiler;
use crate::lexer::Lexer;
use crate::object::{null_obj, Object};
use crate::parser::Parser;
use crate::symbol_table::SymbolTable;
use crate::vm::VM;

const PROMPT: &str = ">> ";

const MONKEY_FACE: &str = r#"            __,__
   .--.  .-"     "-.  .--.
  / .. \/  .-. .-.  \/ .. \
 | |  '|  /   Y   \  |'  | |
 | \   \  \ 0 | 0 /  /   / |
  \ '- ,\.-"""""""-./, -' /
   ''-' /_   ^ ^   _\ '-''
       |  \._   _./  |
       \   \ '~' /   /
        '._ '-=-' _.'
           '-----'
"#;

/// Per-connection REPL state, carried across prompts.
struct Session {
    symbol_table: SymbolTable,
    constants: Vec<Rc<Object>>,
    globals: Vec<Rc<Object>>,
}

impl Session {
    fn new() -> Self {
        let mut symbol_table = SymbolTable::new();
        for (name, _) in builtins::BUILTINS.iter() {
            let index = builtins::index_of(name).expect("name comes from BUILTINS itself");
            symbol_table.define_builtin(index, name);
        }

        Session {
            symbol_table,
            constants: Vec::new(),
            globals: vec![null_obj(); crate::vm::GLOBALS_SIZE],
        }
    }
}

pub fn start<R: BufRead, W: Write>(mut input: R, mut output: W) -> io::Result<()> {
    let mut session = Session::new();

    loop {
        write!(output, "{PROMPT}")?;
        output.flush()?;

        let mut line = String::new();
        if input.read_line(&mut line)? == 0 {
            return Ok(());
        }

        let mut parser = Parser::new(Lexer::new(&line));
        let program = parser.parse_program();
        if !parser.errors().is_empty() {
            print_parse_errors(&mut output, parser.errors())?;
            continue;
        }

        let symbol_table = std::mem::take(&mut session.symbol_table);
        let mut compiler = Compiler::new_with_state(symbol_table, session.constants.clone());
        if let Err(e) = compiler.compile(&program) {
            session.symbol_table = compiler.symbol_table();
            writeln!(output, "Woops! Compilation failed:\n\t{e}")?;
            continue;
        }

        let bytecode = compiler.bytecode();
        session.constants = bytecode.constants.clone();
        session.symbol_table = compiler.symbol_table();

        let globals = std::mem::take(&mut session.globals);
        let mut machine = VM::new_with_global_store(bytecode, globals);
        match machine.run() {
            Ok(()) => {
                let result = machine.last_popped_stack_elem();
                session.globals = machine.take_globals();
                writeln!(output, "{result}")?;
            }
            Err(e) => {
                session.globals = machine.take_globals();
                writeln!(output, "Woops! Executing bytecode failed:\n\t{e}")?;
            }
        }
    }
}

fn print_parse_errors<W: Write>(output: &mut W, errors: &[String]) -> io::Result<()> {
    write!(output, "{MONKEY_FACE}")?;
    writeln!(output, "Woops! We ran into some monkey business here!")?;
    writeln!(output, " parser errors:")?;
    for err in errors {
        writeln!(output, "\t{err}")?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builtins_are_callable_on_the_very_first_line() {
        let input = b"len([1, 2, 3])\n".to_vec();
        let mut output = Vec::new();
        start(&input[..], &mut output).unwrap();
        let printed = String::from_utf8(output).unwrap();
        assert!(
            printed.contains('3') && !printed.contains("undefined variable"),
            "got: {printed}"
        );
    }
}
