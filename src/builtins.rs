use crate::value::{NativeFunction, Value};
use std::io::Write;
use std::rc::Rc;

// Indexed by `GetBuiltin` operands: the order of this table is a stable
// contract with previously compiled bytecode. Append only.
pub static BUILTINS: [NativeFunction; 8] = [
  NativeFunction {
    name: "len",
    func: len,
  },
  NativeFunction {
    name: "puts",
    func: puts,
  },
  NativeFunction {
    name: "first",
    func: first,
  },
  NativeFunction {
    name: "last",
    func: last,
  },
  NativeFunction {
    name: "rest",
    func: rest,
  },
  NativeFunction {
    name: "push",
    func: push,
  },
  NativeFunction {
    name: "updateHash",
    func: update_hash,
  },
  NativeFunction {
    name: "print",
    func: print,
  },
];

pub fn lookup(name: &str) -> Option<Value> {
  BUILTINS
    .iter()
    .find(|builtin| builtin.name == name)
    .map(Value::NativeFunction)
}

fn check_arity(args: &[Value], want: usize) -> Result<(), String> {
  if args.len() == want {
    Ok(())
  } else {
    Err(format!(
      "wrong number of arguments: want={want}, got={}",
      args.len()
    ))
  }
}

fn expect_array<'a>(args: &'a [Value], name: &str) -> Result<&'a Rc<Vec<Value>>, String> {
  match &args[0] {
    Value::Array(elements) => Ok(elements),
    value => Err(format!(
      "argument to '{name}' must be ARRAY, got={}",
      value.get_type()
    )),
  }
}

fn len(args: &[Value]) -> Result<Value, String> {
  check_arity(args, 1)?;

  match &args[0] {
    Value::String(value) => Ok(Value::from(value.len())),
    Value::Array(elements) => Ok(Value::from(elements.len())),
    value => Err(format!(
      "argument to 'len' not supported, got={}",
      value.get_type()
    )),
  }
}

fn puts(args: &[Value]) -> Result<Value, String> {
  for arg in args {
    println!("{arg}");
  }
  Ok(Value::Null)
}

fn print(args: &[Value]) -> Result<Value, String> {
  for arg in args {
    print!("{arg}");
  }
  let _ = std::io::stdout().flush();
  Ok(Value::Null)
}

fn first(args: &[Value]) -> Result<Value, String> {
  check_arity(args, 1)?;
  let elements = expect_array(args, "first")?;

  Ok(elements.first().cloned().unwrap_or(Value::Null))
}

fn last(args: &[Value]) -> Result<Value, String> {
  check_arity(args, 1)?;
  let elements = expect_array(args, "last")?;

  Ok(elements.last().cloned().unwrap_or(Value::Null))
}

fn rest(args: &[Value]) -> Result<Value, String> {
  check_arity(args, 1)?;
  let elements = expect_array(args, "rest")?;

  if elements.is_empty() {
    Ok(Value::Null)
  } else {
    Ok(Value::from(elements[1..].to_vec()))
  }
}

fn push(args: &[Value]) -> Result<Value, String> {
  check_arity(args, 2)?;
  let elements = expect_array(args, "push")?;

  let mut new_elements = elements.as_ref().clone();
  new_elements.push(args[1].clone());
  Ok(Value::from(new_elements))
}

fn update_hash(args: &[Value]) -> Result<Value, String> {
  check_arity(args, 3)?;

  let pairs = match &args[0] {
    Value::Hash(pairs) => pairs,
    value => {
      return Err(format!(
        "argument to 'updateHash' must be HASH, got={}",
        value.get_type()
      ))
    }
  };

  let key = &args[1];
  let hash_key = key
    .hash_key()
    .ok_or_else(|| format!("unusable as hash key: {}", key.get_type()))?;

  pairs
    .borrow_mut()
    .insert(hash_key, (key.clone(), args[2].clone()));
  Ok(Value::Null)
}
