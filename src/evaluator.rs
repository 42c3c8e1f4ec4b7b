use crate::{
  ast::{BinaryOperator, Block, Expr, Expression, Program, Span, Statement, Stmt, UnaryOperator},
  builtins,
  diagnostic::Diagnostic,
  value::{Function, HashPairs, Value},
};
use ahash::AHashMap as HashMap;
use std::{cell::RefCell, rc::Rc};

/// A frame of name bindings linked to the frame it was created in. Function
/// values keep their defining environment alive through the `Rc`.
#[derive(Default)]
pub struct Environment {
  store: HashMap<String, Value>,
  outer: Option<Rc<RefCell<Environment>>>,
}

impl Environment {
  pub fn new() -> Rc<RefCell<Self>> {
    Rc::new(RefCell::new(Self::default()))
  }

  pub fn enclosed(outer: &Rc<RefCell<Environment>>) -> Rc<RefCell<Self>> {
    Rc::new(RefCell::new(Self {
      store: HashMap::new(),
      outer: Some(Rc::clone(outer)),
    }))
  }

  fn get(&self, name: &str) -> Option<Value> {
    match self.store.get(name) {
      Some(value) => Some(value.clone()),
      None => self
        .outer
        .as_ref()
        .and_then(|outer| outer.borrow().get(name)),
    }
  }

  fn set(&mut self, name: &str, value: Value) {
    self.store.insert(name.to_string(), value);
  }
}

// How a statement finished: with a value, or unwinding out of the enclosing
// function with an early return.
enum Control {
  Value(Value),
  Return(Value),
}

type EvalResult = Result<Control, Diagnostic>;

// Unwrap an evaluation, propagating early returns outward.
macro_rules! value_of {
  ($result:expr) => {
    match $result? {
      Control::Value(value) => value,
      control @ Control::Return(_) => return Ok(control),
    }
  };
}

/// Direct interpreter over the AST; the alternative backend to the bytecode
/// pipeline, with the same observable behavior.
pub struct Evaluator<'source> {
  source: &'source str,
}

impl<'source> Evaluator<'source> {
  pub fn new(source: &'source str) -> Self {
    Self { source }
  }

  fn error(&self, message: String, span: Span) -> Diagnostic {
    Diagnostic::new(
      "Runtime Error",
      message,
      span.get_line_number(self.source),
    )
  }

  pub fn eval_program(
    &self,
    program: &Program,
    env: &Rc<RefCell<Environment>>,
  ) -> Result<Value, Diagnostic> {
    let mut result = Value::Null;

    for statement in &program.statements {
      match self.eval_statement(statement, env)? {
        Control::Return(value) => return Ok(value),
        Control::Value(value) => {
          // Only expression statements produce a program result, matching
          // the value the bytecode engine leaves above its stack pointer.
          if matches!(statement.stmt, Stmt::Expression { .. }) {
            result = value;
          }
        }
      }
    }

    Ok(result)
  }

  fn eval_statement(&self, statement: &Statement, env: &Rc<RefCell<Environment>>) -> EvalResult {
    match &statement.stmt {
      Stmt::Let { name, value } => {
        let value = value_of!(self.eval_expression(value, env));
        env.borrow_mut().set(name, value);
        Ok(Control::Value(Value::Null))
      }
      Stmt::Return { value } => {
        let value = match value {
          Some(value) => value_of!(self.eval_expression(value, env)),
          None => Value::Null,
        };
        Ok(Control::Return(value))
      }
      Stmt::Expression { expression } => self.eval_expression(expression, env),
    }
  }

  fn eval_block(&self, block: &Block, env: &Rc<RefCell<Environment>>) -> EvalResult {
    let mut result = Value::Null;

    for statement in &block.statements {
      match self.eval_statement(statement, env)? {
        Control::Return(value) => return Ok(Control::Return(value)),
        Control::Value(value) => {
          if matches!(statement.stmt, Stmt::Expression { .. }) {
            result = value;
          }
        }
      }
    }

    Ok(Control::Value(result))
  }

  fn eval_expression(&self, expression: &Expression, env: &Rc<RefCell<Environment>>) -> EvalResult {
    let span = expression.span;

    let value = match &expression.expr {
      Expr::Integer { value } => Value::Integer(*value),
      Expr::Boolean { value } => Value::Boolean(*value),
      Expr::String { value } => Value::from(value.as_str()),
      Expr::Identifier { name } => match env.borrow().get(name) {
        Some(value) => value,
        None => builtins::lookup(name)
          .ok_or_else(|| self.error(format!("undefined variable {name}"), span))?,
      },
      Expr::Unary { operator, right } => {
        let right = value_of!(self.eval_expression(right, env));

        match operator {
          UnaryOperator::Not => Value::Boolean(right.is_falsy()),
          UnaryOperator::Minus => match right {
            Value::Integer(value) => Value::Integer(value.wrapping_neg()),
            value => {
              return Err(self.error(
                format!("unsupported type for negation: {}", value.get_type()),
                span,
              ))
            }
          },
        }
      }
      Expr::Binary {
        operator,
        left,
        right,
      } => {
        let left = value_of!(self.eval_expression(left, env));
        let right = value_of!(self.eval_expression(right, env));
        self.eval_binary(*operator, left, right, span)?
      }
      Expr::If {
        condition,
        then,
        otherwise,
      } => {
        let condition = value_of!(self.eval_expression(condition, env));

        if condition.is_truthy() {
          value_of!(self.eval_block(then, env))
        } else {
          match otherwise {
            Some(otherwise) => value_of!(self.eval_block(otherwise, env)),
            None => Value::Null,
          }
        }
      }
      Expr::Function {
        parameters, body, ..
      } => Value::Function(Rc::new(Function {
        parameters: parameters.clone(),
        body: body.clone(),
        env: Rc::clone(env),
      })),
      Expr::Call {
        function,
        arguments,
      } => {
        let callee = value_of!(self.eval_expression(function, env));

        let mut args = Vec::with_capacity(arguments.len());
        for argument in arguments {
          args.push(value_of!(self.eval_expression(argument, env)));
        }

        self.apply_function(&callee, &args, span)?
      }
      Expr::Array { elements } => {
        let mut values = Vec::with_capacity(elements.len());
        for element in elements {
          values.push(value_of!(self.eval_expression(element, env)));
        }
        Value::from(values)
      }
      Expr::Hash { pairs } => {
        let mut map = HashPairs::default();

        for (key_expression, value_expression) in pairs {
          let key = value_of!(self.eval_expression(key_expression, env));
          let hash_key = key.hash_key().ok_or_else(|| {
            self.error(
              format!("unusable as hash key: {}", key.get_type()),
              key_expression.span,
            )
          })?;
          let value = value_of!(self.eval_expression(value_expression, env));

          map.insert(hash_key, (key, value));
        }

        Value::Hash(Rc::new(RefCell::new(map)))
      }
      Expr::Index { left, index } => {
        let left = value_of!(self.eval_expression(left, env));
        let index = value_of!(self.eval_expression(index, env));
        self.eval_index(left, index, span)?
      }
    };

    Ok(Control::Value(value))
  }

  fn apply_function(
    &self,
    callee: &Value,
    args: &[Value],
    span: Span,
  ) -> Result<Value, Diagnostic> {
    match callee {
      Value::Function(function) => {
        if args.len() != function.parameters.len() {
          return Err(self.error(
            format!(
              "wrong number of arguments: want={}, got={}",
              function.parameters.len(),
              args.len()
            ),
            span,
          ));
        }

        let env = Environment::enclosed(&function.env);
        for (parameter, value) in function.parameters.iter().zip(args) {
          env.borrow_mut().set(parameter, value.clone());
        }

        match self.eval_block(&function.body, &env)? {
          Control::Return(value) | Control::Value(value) => Ok(value),
        }
      }
      Value::NativeFunction(native) => {
        (native.func)(args).map_err(|message| self.error(message, span))
      }
      _ => Err(self.error("calling non-function".to_string(), span)),
    }
  }

  fn eval_binary(
    &self,
    operator: BinaryOperator,
    left: Value,
    right: Value,
    span: Span,
  ) -> Result<Value, Diagnostic> {
    match (left, right) {
      (Value::Integer(left), Value::Integer(right)) => match operator {
        BinaryOperator::Plus => Ok(Value::Integer(left.wrapping_add(right))),
        BinaryOperator::Minus => Ok(Value::Integer(left.wrapping_sub(right))),
        BinaryOperator::Multiply => Ok(Value::Integer(left.wrapping_mul(right))),
        BinaryOperator::Divide if right == 0 => {
          Err(self.error("division by zero".to_string(), span))
        }
        BinaryOperator::Divide => Ok(Value::Integer(left.wrapping_div(right))),
        BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
        BinaryOperator::Greater => Ok(Value::Boolean(left > right)),
        BinaryOperator::Less => Ok(Value::Boolean(left < right)),
      },
      (Value::String(left), Value::String(right)) => match operator {
        BinaryOperator::Plus => Ok(Value::from(format!("{left}{right}"))),
        BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
        BinaryOperator::Minus | BinaryOperator::Multiply | BinaryOperator::Divide => {
          Err(self.error(format!("unknown string operator: {operator}"), span))
        }
        operator => Err(self.error(
          format!("unsupported types for binary operation: STRING {operator} STRING"),
          span,
        )),
      },
      (left, right) => match operator {
        BinaryOperator::Equal => Ok(Value::Boolean(left == right)),
        BinaryOperator::NotEqual => Ok(Value::Boolean(left != right)),
        operator => Err(self.error(
          format!(
            "unsupported types for binary operation: {} {operator} {}",
            left.get_type(),
            right.get_type()
          ),
          span,
        )),
      },
    }
  }

  fn eval_index(&self, left: Value, index: Value, span: Span) -> Result<Value, Diagnostic> {
    match (left, index) {
      (Value::Array(elements), Value::Integer(index)) => Ok(
        usize::try_from(index)
          .ok()
          .and_then(|index| elements.get(index).cloned())
          .unwrap_or(Value::Null),
      ),
      (Value::Hash(pairs), key) => {
        let hash_key = key
          .hash_key()
          .ok_or_else(|| self.error(format!("unusable as hash key: {}", key.get_type()), span))?;

        Ok(
          pairs
            .borrow()
            .get(&hash_key)
            .map_or(Value::Null, |(_, value)| value.clone()),
        )
      }
      (left, _) => Err(self.error(
        format!("index operator not supported: {}", left.get_type()),
        span,
      )),
    }
  }
}

pub fn evaluate(source: &str, program: &Program) -> Result<Value, Diagnostic> {
  Evaluator::new(source).eval_program(program, &Environment::new())
}
