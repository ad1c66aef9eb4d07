//! `monkey` — run a script file, or drop into the REPL with no arguments.

use std::fs;
use std::io::{self, Write};
use std::process;

use monkey::compiler::Compiler;
use monkey::lexer::Lexer;
use monkey::parser::Parser;
use monkey::repl;
use monkey::vm::VM;

fn main() {
    let args: Vec<String> = std::env::args().collect();

    match args.len() {
        1 => {
            println!("Hello! This is the Monkey programming language!");
            println!("Feel free to type in commands");
            let stdin = io::stdin();
            if let Err(e) = repl::start(stdin.lock(), io::stdout()) {
                eprintln!("repl error: {e}");
                process::exit(1);
            }
        }
        2 => {
            if let Err(e) = run_file(&args[1]) {
                eprintln!("{e}");
                process::exit(1);
            }
        }
        _ => {
            eprintln!("usage: monkey [script]");
            process::exit(1);
        }
    }
}

fn run_file(path: &str) -> Result<(), String> {
    let source = fs::read_to_string(path).map_err(|e| format!("could not read {path}: {e}"))?;

    let mut parser = Parser::new(Lexer::new(&source));
    let program = parser.parse_program();
    if !parser.errors().is_empty() {
        let mut joined = String::from("parser errors:\n");
        for err in parser.errors() {
            joined.push_str(&format!("\t{err}\n"));
        }
        return Err(joined);
    }

    let mut compiler = Compiler::new();
    compiler
        .compile(&program)
        .map_err(|e| format!("compilation failed: {e}"))?;

    let mut machine = VM::new(compiler.bytecode());
    machine.run().map_err(|e| format!("executing bytecode failed: {e}"))?;

    io::stdout().flush().ok();
    Ok(())
}
