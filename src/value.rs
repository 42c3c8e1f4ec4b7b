use crate::{ast::Block, chunk::Chunk, evaluator::Environment};
use ahash::AHashMap as HashMap;
use smallvec::SmallVec;
use std::{cell::RefCell, fmt, rc::Rc};

/// A function value produced by the tree-walk engine; the body is shared AST
/// and the environment is the one the literal was evaluated in.
pub struct Function {
  pub parameters: Vec<String>,
  pub body: Block,
  pub env: Rc<RefCell<Environment>>,
}

/// A function lowered to bytecode by the compiler.
#[derive(Debug)]
pub struct CompiledFunction {
  pub chunk: Chunk,
  pub num_locals: usize,
  pub num_params: usize,
}

/// A compiled function bound to the values it closes over.
pub struct Closure {
  pub function: Rc<CompiledFunction>,
  pub free: SmallVec<[Value; 4]>,
}

pub struct NativeFunction {
  pub name: &'static str,
  pub func: fn(&[Value]) -> Result<Value, String>,
}

pub type HashPairs = HashMap<HashKey, (Value, Value)>;

#[derive(Clone)]
pub enum Value {
  Null,
  Boolean(bool),
  Integer(i64),
  String(Rc<str>),
  Array(Rc<Vec<Value>>),
  Hash(Rc<RefCell<HashPairs>>),
  Function(Rc<Function>),
  CompiledFunction(Rc<CompiledFunction>),
  Closure(Rc<Closure>),
  NativeFunction(&'static NativeFunction),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum HashTag {
  Integer,
  Boolean,
  String,
}

/// Key identity for hash maps: the value's type plus a 64-bit hash of it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct HashKey {
  pub tag: HashTag,
  pub value: u64,
}

const FNV_OFFSET_BASIS: u64 = 0xcbf2_9ce4_8422_2325;
const FNV_PRIME: u64 = 0x0000_0100_0000_01b3;

fn fnv1a(bytes: &[u8]) -> u64 {
  bytes.iter().fold(FNV_OFFSET_BASIS, |hash, byte| {
    (hash ^ u64::from(*byte)).wrapping_mul(FNV_PRIME)
  })
}

impl Value {
  pub fn is_falsy(&self) -> bool {
    matches!(self, Self::Null | Self::Boolean(false))
  }

  pub fn is_truthy(&self) -> bool {
    !self.is_falsy()
  }

  pub fn get_type(&self) -> &'static str {
    match self {
      Self::Null => "NULL",
      Self::Boolean(_) => "BOOLEAN",
      Self::Integer(_) => "INTEGER",
      Self::String(_) => "STRING",
      Self::Array(_) => "ARRAY",
      Self::Hash(_) => "HASH",
      // Closures are what function values look like at runtime in the
      // bytecode engine; both engines report them the same way.
      Self::Function(_) | Self::Closure(_) => "FUNCTION",
      Self::CompiledFunction(_) => "COMPILED_FUNCTION",
      Self::NativeFunction(_) => "BUILTIN",
    }
  }

  pub fn hash_key(&self) -> Option<HashKey> {
    match self {
      Self::Integer(value) => Some(HashKey {
        tag: HashTag::Integer,
        value: *value as u64,
      }),
      Self::Boolean(value) => Some(HashKey {
        tag: HashTag::Boolean,
        value: u64::from(*value),
      }),
      Self::String(value) => Some(HashKey {
        tag: HashTag::String,
        value: fnv1a(value.as_bytes()),
      }),
      _ => None,
    }
  }
}

impl PartialEq for Value {
  fn eq(&self, other: &Self) -> bool {
    match (self, other) {
      (Self::Null, Self::Null) => true,
      (Self::Boolean(value), Self::Boolean(other)) => value == other,
      (Self::Integer(value), Self::Integer(other)) => value == other,
      (Self::String(value), Self::String(other)) => value == other,
      (Self::Array(value), Self::Array(other)) => {
        value.len() == other.len() && value.iter().zip(other.iter()).all(|(a, b)| a == b)
      }
      (Self::Hash(value), Self::Hash(other)) => Rc::ptr_eq(value, other),
      (Self::Function(value), Self::Function(other)) => Rc::ptr_eq(value, other),
      (Self::CompiledFunction(value), Self::CompiledFunction(other)) => Rc::ptr_eq(value, other),
      (Self::Closure(value), Self::Closure(other)) => Rc::ptr_eq(value, other),
      (Self::NativeFunction(value), Self::NativeFunction(other)) => {
        std::ptr::eq(*value, *other)
      }
      _ => false,
    }
  }
}

impl fmt::Display for Value {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    match self {
      Self::Null => write!(f, "null"),
      Self::Boolean(value) => write!(f, "{value}"),
      Self::Integer(value) => write!(f, "{value}"),
      Self::String(value) => write!(f, "{value}"),
      Self::Array(value) => {
        write!(f, "[")?;
        for (i, element) in value.iter().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{element}")?;
        }
        write!(f, "]")
      }
      Self::Hash(value) => {
        write!(f, "{{")?;
        for (i, (key, entry)) in value.borrow().values().enumerate() {
          if i > 0 {
            write!(f, ", ")?;
          }
          write!(f, "{key}: {entry}")?;
        }
        write!(f, "}}")
      }
      Self::Function(value) => match value.parameters.len() {
        1 => write!(f, "<function(1 parameter)>"),
        count => write!(f, "<function({count} parameters)>"),
      },
      Self::CompiledFunction(_) => write!(f, "<compiled function>"),
      Self::Closure(_) => write!(f, "<closure>"),
      Self::NativeFunction(value) => write!(f, "<builtin {}>", value.name),
    }
  }
}

impl fmt::Debug for Value {
  fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
    write!(f, "{self}")
  }
}

impl From<bool> for Value {
  fn from(value: bool) -> Self {
    Self::Boolean(value)
  }
}
impl From<i64> for Value {
  fn from(value: i64) -> Self {
    Self::Integer(value)
  }
}
impl From<i32> for Value {
  fn from(value: i32) -> Self {
    Self::Integer(i64::from(value))
  }
}
impl From<usize> for Value {
  #[allow(clippy::cast_possible_wrap)]
  fn from(value: usize) -> Self {
    Self::Integer(value as i64)
  }
}
impl From<String> for Value {
  fn from(value: String) -> Self {
    Self::String(Rc::from(value))
  }
}
impl From<&str> for Value {
  fn from(value: &str) -> Self {
    Self::String(Rc::from(value))
  }
}
impl From<Vec<Self>> for Value {
  fn from(value: Vec<Self>) -> Self {
    Self::Array(Rc::new(value))
  }
}
impl From<()> for Value {
  fn from(_value: ()) -> Self {
    Self::Null
  }
}
