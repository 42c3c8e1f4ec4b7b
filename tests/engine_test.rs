pub use sable::Value;

pub fn run_vm(source: &str) -> Result<Value, String> {
  sable::interpret(source).map_err(|diagnostics| diagnostics[0].message.clone())
}

pub fn run_eval(source: &str) -> Result<Value, String> {
  sable::evaluate(source).map_err(|diagnostics| diagnostics[0].message.clone())
}

// Run one snippet on both engines and expect the same value from each.
#[macro_export]
macro_rules! engine_test {
  ($name:ident, $source:literal, $expected:expr) => {
    mod $name {
      use super::*;

      #[test]
      fn vm() {
        let result = run_vm($source).expect("program should run");
        assert_eq!(result, Value::from($expected));
      }

      #[test]
      fn treewalk() {
        let result = run_eval($source).expect("program should run");
        assert_eq!(result, Value::from($expected));
      }
    }
  };
}

#[macro_export]
macro_rules! engine_error_test {
  ($name:ident, $source:literal, $message:literal) => {
    mod $name {
      use super::*;

      #[test]
      fn vm() {
        assert_eq!(run_vm($source), Err($message.to_string()));
      }

      #[test]
      fn treewalk() {
        assert_eq!(run_eval($source), Err($message.to_string()));
      }
    }
  };
}
