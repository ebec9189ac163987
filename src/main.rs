//! Interactive front end: reads lines with history, parses them into the
//! generic token tree, and drives the reader and evaluator, printing each
//! result. The typed exit signal from the evaluator ends the loop; ordinary
//! evaluation errors are just printed values.

use qlisp::Exit;
use qlisp::evaluator::{self, EnvRef};
use qlisp::reader;
use qlisp::syntax;
use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;

fn main() {
    println!("qlisp 0.1.0");
    println!("Enter expressions like (+ 1 2), or press Ctrl+C to exit");
    println!();

    let mut rl = match DefaultEditor::new() {
        Ok(rl) => rl,
        Err(err) => {
            eprintln!("Could not initialize line editor: {err}");
            return;
        }
    };
    let env = evaluator::create_global_env();

    loop {
        match rl.readline("qlisp> ") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let _ = rl.add_history_entry(line);

                if !eval_and_print(&env, line) {
                    break;
                }
            }

            Err(ReadlineError::Eof) | Err(ReadlineError::Interrupted) => {
                println!("Goodbye!");
                break;
            }
            Err(err) => {
                println!("Error: {err:?}");
                break;
            }
        }
    }
}

/// Evaluate one input line and print the outcome.
/// Returns false once the session is over.
fn eval_and_print(env: &EnvRef, line: &str) -> bool {
    let tree = match syntax::parse(line) {
        Ok(tree) => tree,
        Err(err) => {
            println!("Parse error: {err}");
            return true;
        }
    };

    match evaluator::eval(env, reader::read(&tree)) {
        Ok(value) => {
            println!("{value}");
            true
        }
        Err(Exit) => {
            println!("Goodbye!");
            false
        }
    }
}
