use std::rc::Rc;

use crate::{
  ast::{BinaryOperator, Block, Expr, Expression, Program, Span, Statement, Stmt, UnaryOperator},
  chunk::{Builder as ChunkBuilder, Chunk, OpCode},
  diagnostic::Diagnostic,
  value::{CompiledFunction, Value},
};

pub mod symbols;
use symbols::{Symbol, SymbolScope, SymbolTable};

/// The output of compilation: the top-level program as a function body plus
/// the constant pool it indexes into.
#[derive(Debug)]
pub struct Bytecode {
  pub function: Rc<CompiledFunction>,
  pub constants: Vec<Value>,
}

#[derive(Clone, Copy, Debug)]
struct Emitted {
  opcode: OpCode,
  position: usize,
}

#[derive(Default)]
struct Scope {
  chunk: ChunkBuilder,
  last: Option<Emitted>,
  previous: Option<Emitted>,
}

pub struct Compiler<'source> {
  source: &'source str,

  constants: Vec<Value>,
  symbols: SymbolTable,
  scopes: Vec<Scope>,
}

type CompileResult = Result<(), Diagnostic>;

// Emit bytecode
impl<'source> Compiler<'source> {
  fn current_scope(&mut self) -> &mut Scope {
    self.scopes.last_mut().expect("a scope is always open")
  }

  fn emit(&mut self, span: Span, opcode: OpCode, operands: &[usize]) -> usize {
    let line = span.get_line_number(self.source);
    let scope = self.scopes.last_mut().expect("a scope is always open");

    let position = scope.chunk.len();
    scope.chunk.write_opcode(opcode, line);
    for (operand, width) in operands.iter().zip(opcode.operand_widths()) {
      match width {
        2 => scope.chunk.write_long_value(*operand as u16, line),
        _ => scope.chunk.write_value(*operand as u8, line),
      }
    }

    scope.previous = scope.last;
    scope.last = Some(Emitted { opcode, position });
    position
  }

  fn emit_jump(&mut self, span: Span, opcode: OpCode) -> usize {
    self.emit(span, opcode, &[u16::MAX as usize])
  }

  // Rewrite a jump emitted earlier to land on the next instruction.
  fn patch_jump(&mut self, span: Span, position: usize) -> CompileResult {
    let target = self.current_scope().chunk.len();

    if let Ok(target) = u16::try_from(target) {
      self.current_scope().chunk.set_long_value(position + 1, target);
      Ok(())
    } else {
      Err(self.error("jump out of range".to_string(), span))
    }
  }

  fn add_constant(&mut self, value: Value, span: Span) -> Result<usize, Diagnostic> {
    if self.constants.len() > usize::from(u16::MAX) {
      return Err(self.error("too many constants".to_string(), span));
    }

    self.constants.push(value);
    Ok(self.constants.len() - 1)
  }

  fn emit_constant(&mut self, span: Span, value: Value) -> CompileResult {
    let index = self.add_constant(value, span)?;
    self.emit(span, OpCode::Constant, &[index]);
    Ok(())
  }

  fn last_instruction_is(&mut self, opcode: OpCode) -> bool {
    self
      .current_scope()
      .last
      .is_some_and(|emitted| emitted.opcode == opcode)
  }

  fn remove_last_instruction(&mut self) {
    let scope = self.scopes.last_mut().expect("a scope is always open");

    if let Some(last) = scope.last {
      scope.chunk.truncate(last.position);
      scope.last = scope.previous;
      scope.previous = None;
    }
  }

  fn replace_last_pop_with_return(&mut self) {
    let scope = self.scopes.last_mut().expect("a scope is always open");

    if let Some(last) = &mut scope.last {
      scope.chunk.replace_opcode(last.position, OpCode::ReturnValue);
      last.opcode = OpCode::ReturnValue;
    }
  }
}

impl<'source> Compiler<'source> {
  pub fn new(source: &'source str) -> Self {
    Self::with_state(source, SymbolTable::with_builtins(), Vec::new())
  }

  /// Resume with the symbol table and constant pool of an earlier
  /// compilation, so a REPL can build on previous lines.
  pub fn with_state(
    source: &'source str,
    symbols: SymbolTable,
    constants: Vec<Value>,
  ) -> Self {
    Self {
      source,
      constants,
      symbols,
      scopes: vec![Scope::default()],
    }
  }

  pub fn into_state(self) -> (SymbolTable, Vec<Value>) {
    // A compile error inside a function body leaves enclosed tables open;
    // unwind so the next compilation starts from the globals again.
    let mut symbols = self.symbols;
    while !symbols.is_global() {
      symbols = symbols.pop().0;
    }

    (symbols, self.constants)
  }

  fn error(&self, message: String, span: Span) -> Diagnostic {
    Diagnostic::new("Compile Error", message, span.get_line_number(self.source))
  }

  fn enter_scope(&mut self) {
    self.scopes.push(Scope::default());
    self.symbols = std::mem::take(&mut self.symbols).enclose();
  }

  fn leave_scope(&mut self) -> (Chunk, Vec<Symbol>) {
    let scope = self.scopes.pop().expect("a scope is always open");
    let (outer, free_symbols) = std::mem::take(&mut self.symbols).pop();
    self.symbols = outer;

    (scope.chunk.finalize(), free_symbols)
  }

  pub fn compile(&mut self, program: &Program) -> CompileResult {
    for statement in &program.statements {
      self.compile_statement(statement)?;
    }
    Ok(())
  }

  pub fn bytecode(&mut self) -> Bytecode {
    let scope = std::mem::take(&mut self.scopes[0]);

    Bytecode {
      function: Rc::new(CompiledFunction {
        chunk: scope.chunk.finalize(),
        num_locals: 0,
        num_params: 0,
      }),
      constants: self.constants.clone(),
    }
  }

  fn compile_statement(&mut self, statement: &Statement) -> CompileResult {
    let span = statement.span;

    match &statement.stmt {
      Stmt::Let { name, value } => {
        let symbol = self.symbols.define(name);
        match symbol.scope {
          SymbolScope::Global if symbol.index > usize::from(u16::MAX) => {
            return Err(self.error("too many global variables".to_string(), span));
          }
          SymbolScope::Local if symbol.index > usize::from(u8::MAX) => {
            return Err(self.error("too many local variables".to_string(), span));
          }
          _ => {}
        }

        self.compile_expression(value)?;

        match symbol.scope {
          SymbolScope::Global => self.emit(span, OpCode::SetGlobal, &[symbol.index]),
          _ => self.emit(span, OpCode::SetLocal, &[symbol.index]),
        };
      }
      Stmt::Return { value } => {
        match value {
          Some(value) => self.compile_expression(value)?,
          None => {
            self.emit(span, OpCode::Null, &[]);
          }
        }
        self.emit(span, OpCode::ReturnValue, &[]);
      }
      Stmt::Expression { expression } => {
        self.compile_expression(expression)?;
        self.emit(span, OpCode::Pop, &[]);
      }
    }

    Ok(())
  }

  fn compile_block(&mut self, block: &Block) -> CompileResult {
    for statement in &block.statements {
      self.compile_statement(statement)?;
    }
    Ok(())
  }

  fn load_symbol(&mut self, symbol: &Symbol, span: Span) {
    match symbol.scope {
      SymbolScope::Global => self.emit(span, OpCode::GetGlobal, &[symbol.index]),
      SymbolScope::Local => self.emit(span, OpCode::GetLocal, &[symbol.index]),
      SymbolScope::Free => self.emit(span, OpCode::GetFree, &[symbol.index]),
      SymbolScope::Builtin => self.emit(span, OpCode::GetBuiltin, &[symbol.index]),
      SymbolScope::Function => self.emit(span, OpCode::CurrentClosure, &[]),
    };
  }

  fn compile_expression(&mut self, expression: &Expression) -> CompileResult {
    let span = expression.span;

    match &expression.expr {
      Expr::Integer { value } => self.emit_constant(span, Value::Integer(*value))?,
      Expr::String { value } => self.emit_constant(span, Value::from(value.as_str()))?,
      Expr::Boolean { value: true } => {
        self.emit(span, OpCode::True, &[]);
      }
      Expr::Boolean { value: false } => {
        self.emit(span, OpCode::False, &[]);
      }
      Expr::Identifier { name } => {
        let symbol = self
          .symbols
          .resolve(name)
          .ok_or_else(|| self.error(format!("undefined variable {name}"), span))?;
        self.load_symbol(&symbol, span);
      }
      Expr::Unary { operator, right } => {
        self.compile_expression(right)?;

        match operator {
          UnaryOperator::Minus => self.emit(span, OpCode::Negate, &[]),
          UnaryOperator::Not => self.emit(span, OpCode::Not, &[]),
        };
      }
      Expr::Binary {
        operator,
        left,
        right,
      } => {
        // `<` reuses the greater-than opcode with swapped operands.
        if *operator == BinaryOperator::Less {
          self.compile_expression(right)?;
          self.compile_expression(left)?;
          self.emit(span, OpCode::Greater, &[]);
          return Ok(());
        }

        self.compile_expression(left)?;
        self.compile_expression(right)?;

        match operator {
          BinaryOperator::Plus => self.emit(span, OpCode::Add, &[]),
          BinaryOperator::Minus => self.emit(span, OpCode::Subtract, &[]),
          BinaryOperator::Multiply => self.emit(span, OpCode::Multiply, &[]),
          BinaryOperator::Divide => self.emit(span, OpCode::Divide, &[]),
          BinaryOperator::Equal => self.emit(span, OpCode::Equal, &[]),
          BinaryOperator::NotEqual => self.emit(span, OpCode::NotEqual, &[]),
          BinaryOperator::Greater => self.emit(span, OpCode::Greater, &[]),
          BinaryOperator::Less => unreachable!(),
        };
      }
      Expr::If {
        condition,
        then,
        otherwise,
      } => {
        self.compile_expression(condition)?;
        let jump_if_false = self.emit_jump(span, OpCode::JumpIfFalse);

        self.compile_block(then)?;
        if self.last_instruction_is(OpCode::Pop) {
          self.remove_last_instruction();
        }

        let jump_over_otherwise = self.emit_jump(span, OpCode::Jump);
        self.patch_jump(span, jump_if_false)?;

        match otherwise {
          Some(otherwise) => {
            self.compile_block(otherwise)?;
            if self.last_instruction_is(OpCode::Pop) {
              self.remove_last_instruction();
            }
          }
          None => {
            self.emit(span, OpCode::Null, &[]);
          }
        }

        self.patch_jump(span, jump_over_otherwise)?;
      }
      Expr::Function {
        parameters,
        body,
        name,
      } => {
        if parameters.len() > usize::from(u8::MAX) {
          return Err(self.error("too many parameters".to_string(), span));
        }

        self.enter_scope();
        if let Some(name) = name {
          self.symbols.define_function_name(name);
        }
        for parameter in parameters {
          self.symbols.define(parameter);
        }

        self.compile_block(body)?;

        // A function body yields its final expression unless it returns
        // explicitly; an empty path returns null.
        if self.last_instruction_is(OpCode::Pop) {
          self.replace_last_pop_with_return();
        }
        if !self.last_instruction_is(OpCode::ReturnValue) {
          self.emit(span, OpCode::Return, &[]);
        }

        let num_locals = self.symbols.num_definitions;
        if num_locals > usize::from(u8::MAX) {
          return Err(self.error("too many local variables".to_string(), span));
        }

        let (chunk, free_symbols) = self.leave_scope();

        for symbol in &free_symbols {
          self.load_symbol(symbol, span);
        }

        let function = Value::CompiledFunction(Rc::new(CompiledFunction {
          chunk,
          num_locals,
          num_params: parameters.len(),
        }));
        let index = self.add_constant(function, span)?;
        self.emit(span, OpCode::Closure, &[index, free_symbols.len()]);
      }
      Expr::Call {
        function,
        arguments,
      } => {
        if arguments.len() > usize::from(u8::MAX) {
          return Err(self.error("too many arguments".to_string(), span));
        }

        self.compile_expression(function)?;
        for argument in arguments {
          self.compile_expression(argument)?;
        }

        self.emit(span, OpCode::Call, &[arguments.len()]);
      }
      Expr::Array { elements } => {
        if elements.len() > usize::from(u16::MAX) {
          return Err(self.error("too many array elements".to_string(), span));
        }

        for element in elements {
          self.compile_expression(element)?;
        }

        self.emit(span, OpCode::Array, &[elements.len()]);
      }
      Expr::Hash { pairs } => {
        if pairs.len() * 2 > usize::from(u16::MAX) {
          return Err(self.error("too many hash entries".to_string(), span));
        }

        // Literal entries compile in key order so the emitted bytecode is
        // deterministic.
        let mut sorted: Vec<&(Expression, Expression)> = pairs.iter().collect();
        sorted.sort_by_key(|(key, _)| key.to_string());

        for (key, value) in sorted {
          self.compile_expression(key)?;
          self.compile_expression(value)?;
        }

        self.emit(span, OpCode::Hash, &[pairs.len() * 2]);
      }
      Expr::Index { left, index } => {
        self.compile_expression(left)?;
        self.compile_expression(index)?;
        self.emit(span, OpCode::Index, &[]);
      }
    }

    Ok(())
  }
}

pub fn compile(source: &str, program: &Program) -> Result<Bytecode, Diagnostic> {
  let mut compiler = Compiler::new(source);
  compiler.compile(program)?;
  Ok(compiler.bytecode())
}
