//! elc: a compiler from a small S-expression language to stack bytecode,
//! and the virtual machine that runs it.
//!
//! ```text
//! source --lexer--> tokens --parser--> [Node] --compiler--> Program --vm--> output
//! ```

pub mod ast;
pub mod bytecode;
pub mod compiler;
pub mod diagnostic;
pub mod interner;
pub mod lexer;
pub mod parser;
pub mod verify;
pub mod vm;

pub use bytecode::{assemble, Program};
pub use compiler::compile;
pub use vm::run;

/// Any failure along the pipeline.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    Lex(#[from] lexer::LexError),
    #[error(transparent)]
    Parse(#[from] parser::ParseError),
    #[error(transparent)]
    Compile(#[from] compiler::CompileError),
    #[error(transparent)]
    Asm(#[from] bytecode::AsmError),
    #[error(transparent)]
    Run(#[from] vm::Trap),
}

/// Lex, parse and compile source text.
pub fn compile_source(source: &str) -> Result<Program, Error> {
    let nodes = parser::parse_source(source)?;
    Ok(compiler::compile(&nodes)?)
}

/// Compile and run source text, returning the printed lines.
pub fn run_source(source: &str) -> Result<Vec<String>, Error> {
    let program = compile_source(source)?;
    Ok(vm::run(&program, false)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn end_to_end() {
        let out = run_source("(let x 5) (let y (* x 2)) (print (+ x y))").unwrap();
        assert_eq!(out, vec!["15"]);
    }

    #[test]
    fn errors_keep_their_stage() {
        assert!(matches!(run_source("(print \"x)"), Err(Error::Lex(_))));
        assert!(matches!(run_source("(print 1"), Err(Error::Parse(_))));
        assert!(matches!(run_source("(print (f))"), Err(Error::Compile(_))));
        assert!(matches!(run_source("(print (/ 1 0))"), Err(Error::Run(_))));
    }
}
