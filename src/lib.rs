pub mod ast;
mod builtins;
mod chunk;
mod compiler;
mod diagnostic;
mod evaluator;
mod parser;
mod tokens;
mod value;
mod vm;

// An error from any stage of the pipeline
pub use diagnostic::Diagnostic;

// Turn source text into tokens, then into an AST
pub use parser::parse;
pub use tokens::{tokenize, LineNumber, Token, TokenType};

// Compile an AST into bytecode
pub use chunk::{make, read_operands, Chunk, Instructions, OpCode};
pub use compiler::{compile, symbols::SymbolTable, Bytecode, Compiler};

// Run bytecode on the virtual machine
pub use vm::{VM, GLOBALS_SIZE, MAX_FRAMES, STACK_SIZE};

// Walk the AST directly instead of compiling it
pub use evaluator::{Environment, Evaluator};

// A value produced by either engine
pub use value::Value;

/// Run a string of code through the bytecode pipeline, returning the value
/// of its final expression.
pub fn interpret(source: &str) -> Result<Value, Vec<Diagnostic>> {
  let program = parser::parse(source)?;
  let bytecode = compiler::compile(source, &program).map_err(|error| vec![error])?;

  vm::run(bytecode).map_err(|error| vec![error])
}

/// Run a string of code on the tree-walk evaluator; same result as
/// `interpret` for any program.
pub fn evaluate(source: &str) -> Result<Value, Vec<Diagnostic>> {
  let program = parser::parse(source)?;

  evaluator::evaluate(source, &program).map_err(|error| vec![error])
}
