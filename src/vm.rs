use crate::{
  builtins,
  chunk::{read_u16, read_u8, OpCode},
  compiler::Bytecode,
  diagnostic::Diagnostic,
  value::{Closure, HashPairs, Value},
};
use smallvec::SmallVec;
use std::{cell::RefCell, rc::Rc};

pub const STACK_SIZE: usize = 2048;
pub const GLOBALS_SIZE: usize = 65536;
pub const MAX_FRAMES: usize = 1024;

macro_rules! runtime_error {
  (($vm:expr, $function:expr, $ip:expr), $($message:tt)+) => {{
    let mut lines = vec![$function.chunk.get_line_number($ip)];

    for frame in $vm.frames.iter().rev().skip(1) {
      lines.push(frame.closure.function.chunk.get_line_number(frame.ip));
    }

    Err(Diagnostic {
      title: "Runtime Error".to_string(),
      message: format!($($message)+),
      lines,
    })
  }};
}

macro_rules! push {
  ($vm:expr, $value:expr, ($function:expr, $ip:expr)) => {{
    if $vm.sp >= STACK_SIZE {
      break runtime_error!(($vm, $function, $ip), "stack overflow");
    }

    $vm.stack[$vm.sp] = $value;
    $vm.sp += 1;
  }};
}

macro_rules! numeric_expression {
  ($vm:expr, $method:ident, $symbol:literal, ($function:expr, $ip:expr)) => {
    let (right, left) = ($vm.pop(), $vm.pop());

    match (left, right) {
      (Value::Integer(left), Value::Integer(right)) => {
        push!($vm, Value::Integer(left.$method(right)), ($function, $ip));
      }
      (Value::String(_), Value::String(_)) => {
        break runtime_error!(($vm, $function, $ip), "unknown string operator: {}", $symbol);
      }
      (left, right) => {
        break runtime_error!(
          ($vm, $function, $ip),
          "unsupported types for binary operation: {} {} {}",
          left.get_type(),
          $symbol,
          right.get_type()
        );
      }
    }
  };
}

/// One function activation: the closure being run, the resume address, and
/// where its locals start on the value stack.
struct Frame {
  closure: Rc<Closure>,
  ip: usize,
  base_ptr: usize,
}

pub struct VM {
  constants: Vec<Value>,

  stack: Vec<Value>,
  sp: usize,

  globals: Vec<Value>,
  frames: Vec<Frame>,
}

impl VM {
  pub fn new(bytecode: Bytecode) -> Self {
    Self::with_globals(bytecode, vec![Value::Null; GLOBALS_SIZE])
  }

  /// Reuse the globals array of a previous run, so a REPL keeps bindings
  /// across lines.
  pub fn with_globals(bytecode: Bytecode, globals: Vec<Value>) -> Self {
    debug_assert_eq!(globals.len(), GLOBALS_SIZE);

    let main = Rc::new(Closure {
      function: bytecode.function,
      free: SmallVec::new(),
    });

    let mut frames = Vec::with_capacity(MAX_FRAMES);
    frames.push(Frame {
      closure: main,
      ip: 0,
      base_ptr: 0,
    });

    Self {
      constants: bytecode.constants,
      stack: vec![Value::Null; STACK_SIZE],
      sp: 0,
      globals,
      frames,
    }
  }

  pub fn into_globals(self) -> Vec<Value> {
    self.globals
  }

  /// The value most recently popped off the stack: popping only moves `sp`,
  /// the slot above it still holds the value. This is the result of the
  /// last expression statement.
  pub fn last_popped(&self) -> &Value {
    &self.stack[self.sp]
  }

  #[inline]
  fn pop(&mut self) -> Value {
    self.sp -= 1;
    self.stack[self.sp].clone()
  }

  #[inline]
  fn base_ptr(&self) -> usize {
    self.frames.last().expect("a frame is always active").base_ptr
  }

  #[allow(clippy::too_many_lines)]
  pub fn run(&mut self) -> Result<(), Diagnostic> {
    let mut function = Rc::clone(&self.frames[0].closure.function);
    let mut ip = 0;

    loop {
      if ip >= function.chunk.code.len() {
        break Ok(());
      }

      let byte = function.chunk.code.as_slice()[ip];
      let opcode = match OpCode::from_byte(byte) {
        Some(opcode) => opcode,
        None => break runtime_error!((self, function, ip), "unknown opcode {byte}"),
      };

      match opcode {
        OpCode::Constant => {
          let index = read_u16(function.chunk.code.as_slice(), ip + 1) as usize;
          push!(self, self.constants[index].clone(), (function, ip));
          ip += 3;
        }
        OpCode::Pop => {
          if self.sp > 0 {
            self.sp -= 1;
          }
          ip += 1;
        }

        OpCode::True => {
          push!(self, Value::Boolean(true), (function, ip));
          ip += 1;
        }
        OpCode::False => {
          push!(self, Value::Boolean(false), (function, ip));
          ip += 1;
        }
        OpCode::Null => {
          push!(self, Value::Null, (function, ip));
          ip += 1;
        }

        OpCode::Add => {
          let (right, left) = (self.pop(), self.pop());

          match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => {
              push!(self, Value::Integer(left.wrapping_add(right)), (function, ip));
            }
            (Value::String(left), Value::String(right)) => {
              push!(self, Value::from(format!("{left}{right}")), (function, ip));
            }
            (left, right) => {
              break runtime_error!(
                (self, function, ip),
                "unsupported types for binary operation: {} + {}",
                left.get_type(),
                right.get_type()
              );
            }
          }

          ip += 1;
        }
        OpCode::Subtract => {
          numeric_expression!(self, wrapping_sub, "-", (function, ip));
          ip += 1;
        }
        OpCode::Multiply => {
          numeric_expression!(self, wrapping_mul, "*", (function, ip));
          ip += 1;
        }
        OpCode::Divide => {
          let (right, left) = (self.pop(), self.pop());

          match (left, right) {
            (Value::Integer(_), Value::Integer(0)) => {
              break runtime_error!((self, function, ip), "division by zero");
            }
            (Value::Integer(left), Value::Integer(right)) => {
              push!(self, Value::Integer(left.wrapping_div(right)), (function, ip));
            }
            (Value::String(_), Value::String(_)) => {
              break runtime_error!((self, function, ip), "unknown string operator: /");
            }
            (left, right) => {
              break runtime_error!(
                (self, function, ip),
                "unsupported types for binary operation: {} / {}",
                left.get_type(),
                right.get_type()
              );
            }
          }

          ip += 1;
        }

        OpCode::Equal => {
          let (right, left) = (self.pop(), self.pop());
          push!(self, Value::Boolean(left == right), (function, ip));
          ip += 1;
        }
        OpCode::NotEqual => {
          let (right, left) = (self.pop(), self.pop());
          push!(self, Value::Boolean(left != right), (function, ip));
          ip += 1;
        }
        OpCode::Greater => {
          let (right, left) = (self.pop(), self.pop());

          match (left, right) {
            (Value::Integer(left), Value::Integer(right)) => {
              push!(self, Value::Boolean(left > right), (function, ip));
            }
            (left, right) => {
              break runtime_error!(
                (self, function, ip),
                "unsupported types for binary operation: {} > {}",
                left.get_type(),
                right.get_type()
              );
            }
          }

          ip += 1;
        }

        OpCode::Negate => {
          let value = self.pop();

          match value {
            Value::Integer(value) => {
              push!(self, Value::Integer(value.wrapping_neg()), (function, ip));
            }
            value => {
              break runtime_error!(
                (self, function, ip),
                "unsupported type for negation: {}",
                value.get_type()
              );
            }
          }

          ip += 1;
        }
        OpCode::Not => {
          let value = self.pop();
          push!(self, Value::Boolean(value.is_falsy()), (function, ip));
          ip += 1;
        }

        OpCode::Jump => {
          ip = read_u16(function.chunk.code.as_slice(), ip + 1) as usize;
        }
        OpCode::JumpIfFalse => {
          let target = read_u16(function.chunk.code.as_slice(), ip + 1) as usize;
          let condition = self.pop();

          if condition.is_falsy() {
            ip = target;
          } else {
            ip += 3;
          }
        }

        OpCode::SetGlobal => {
          let index = read_u16(function.chunk.code.as_slice(), ip + 1) as usize;
          self.globals[index] = self.pop();
          ip += 3;
        }
        OpCode::GetGlobal => {
          let index = read_u16(function.chunk.code.as_slice(), ip + 1) as usize;
          push!(self, self.globals[index].clone(), (function, ip));
          ip += 3;
        }
        OpCode::SetLocal => {
          let index = read_u8(function.chunk.code.as_slice(), ip + 1) as usize;
          let value = self.pop();
          let base = self.base_ptr();
          self.stack[base + index] = value;
          ip += 2;
        }
        OpCode::GetLocal => {
          let index = read_u8(function.chunk.code.as_slice(), ip + 1) as usize;
          let value = self.stack[self.base_ptr() + index].clone();
          push!(self, value, (function, ip));
          ip += 2;
        }
        OpCode::GetBuiltin => {
          let index = read_u8(function.chunk.code.as_slice(), ip + 1) as usize;

          match builtins::BUILTINS.get(index) {
            Some(builtin) => push!(self, Value::NativeFunction(builtin), (function, ip)),
            None => break runtime_error!((self, function, ip), "unknown builtin {index}"),
          }

          ip += 2;
        }
        OpCode::GetFree => {
          let index = read_u8(function.chunk.code.as_slice(), ip + 1) as usize;
          let value = self.frames.last().expect("a frame is always active").closure.free[index]
            .clone();
          push!(self, value, (function, ip));
          ip += 2;
        }
        OpCode::CurrentClosure => {
          let closure = Rc::clone(&self.frames.last().expect("a frame is always active").closure);
          push!(self, Value::Closure(closure), (function, ip));
          ip += 1;
        }

        OpCode::Array => {
          let length = read_u16(function.chunk.code.as_slice(), ip + 1) as usize;
          let start = self.sp - length;

          let elements = self.stack[start..self.sp].to_vec();
          self.sp = start;

          push!(self, Value::from(elements), (function, ip));
          ip += 3;
        }
        OpCode::Hash => {
          let length = read_u16(function.chunk.code.as_slice(), ip + 1) as usize;
          let start = self.sp - length;

          let mut pairs = HashPairs::default();
          let mut unusable_key = None;
          let mut position = start;
          while position < self.sp {
            let key = self.stack[position].clone();
            let value = self.stack[position + 1].clone();

            match key.hash_key() {
              Some(hash_key) => {
                pairs.insert(hash_key, (key, value));
              }
              None => {
                unusable_key = Some(key.get_type());
                break;
              }
            }
            position += 2;
          }

          if let Some(type_name) = unusable_key {
            break runtime_error!((self, function, ip), "unusable as hash key: {type_name}");
          }

          self.sp = start;
          push!(self, Value::Hash(Rc::new(RefCell::new(pairs))), (function, ip));
          ip += 3;
        }
        OpCode::Index => {
          let index = self.pop();
          let left = self.pop();

          match (left, index) {
            (Value::Array(elements), Value::Integer(index)) => {
              let value = usize::try_from(index)
                .ok()
                .and_then(|index| elements.get(index).cloned())
                .unwrap_or(Value::Null);
              push!(self, value, (function, ip));
            }
            (Value::Hash(pairs), key) => match key.hash_key() {
              Some(hash_key) => {
                let value = pairs
                  .borrow()
                  .get(&hash_key)
                  .map_or(Value::Null, |(_, value)| value.clone());
                push!(self, value, (function, ip));
              }
              None => {
                break runtime_error!(
                  (self, function, ip),
                  "unusable as hash key: {}",
                  key.get_type()
                );
              }
            },
            (left, _) => {
              break runtime_error!(
                (self, function, ip),
                "index operator not supported: {}",
                left.get_type()
              );
            }
          }

          ip += 1;
        }

        OpCode::Closure => {
          let index = read_u16(function.chunk.code.as_slice(), ip + 1) as usize;
          let num_free = read_u8(function.chunk.code.as_slice(), ip + 3) as usize;

          let compiled = match &self.constants[index] {
            Value::CompiledFunction(compiled) => Rc::clone(compiled),
            value => {
              break runtime_error!((self, function, ip), "not a function: {}", value.get_type());
            }
          };

          let free: SmallVec<_> = self.stack[self.sp - num_free..self.sp].iter().cloned().collect();
          self.sp -= num_free;

          let closure = Value::Closure(Rc::new(Closure {
            function: compiled,
            free,
          }));
          push!(self, closure, (function, ip));
          ip += 4;
        }

        OpCode::Call => {
          let num_args = read_u8(function.chunk.code.as_slice(), ip + 1) as usize;
          let callee = self.stack[self.sp - 1 - num_args].clone();

          match callee {
            Value::Closure(closure) => {
              if num_args != closure.function.num_params {
                break runtime_error!(
                  (self, function, ip),
                  "wrong number of arguments: want={}, got={num_args}",
                  closure.function.num_params
                );
              }
              if self.frames.len() >= MAX_FRAMES {
                break runtime_error!((self, function, ip), "frames overflow");
              }

              let base_ptr = self.sp - num_args;
              if base_ptr + closure.function.num_locals >= STACK_SIZE {
                break runtime_error!((self, function, ip), "stack overflow");
              }

              self
                .frames
                .last_mut()
                .expect("a frame is always active")
                .ip = ip + 2;

              self.sp = base_ptr + closure.function.num_locals;
              function = Rc::clone(&closure.function);
              ip = 0;
              self.frames.push(Frame {
                closure,
                ip: 0,
                base_ptr,
              });
            }
            Value::NativeFunction(native) => {
              let result = (native.func)(&self.stack[self.sp - num_args..self.sp]);

              match result {
                Ok(value) => {
                  self.sp -= num_args + 1;
                  self.stack[self.sp] = value;
                  self.sp += 1;
                }
                Err(message) => break runtime_error!((self, function, ip), "{message}"),
              }

              ip += 2;
            }
            _ => {
              break runtime_error!((self, function, ip), "calling non-function");
            }
          }
        }

        OpCode::ReturnValue => {
          // A return from the top level ends the program; the popped value
          // stays above `sp` as the program result.
          if self.frames.len() == 1 {
            self.pop();
            break Ok(());
          }

          let value = self.pop();
          let frame = self.frames.pop().expect("a frame is always active");
          self.sp = frame.base_ptr - 1;
          self.stack[self.sp] = value;
          self.sp += 1;

          let resumed = self.frames.last().expect("a frame is always active");
          function = Rc::clone(&resumed.closure.function);
          ip = resumed.ip;
        }
        OpCode::Return => {
          if self.frames.len() == 1 {
            self.stack[self.sp] = Value::Null;
            break Ok(());
          }

          let frame = self.frames.pop().expect("a frame is always active");
          self.sp = frame.base_ptr - 1;
          self.stack[self.sp] = Value::Null;
          self.sp += 1;

          let resumed = self.frames.last().expect("a frame is always active");
          function = Rc::clone(&resumed.closure.function);
          ip = resumed.ip;
        }
      }
    }
  }
}

pub fn run(bytecode: Bytecode) -> Result<Value, Diagnostic> {
  let mut vm = VM::new(bytecode);
  vm.run()?;

  Ok(vm.last_popped().clone())
}
