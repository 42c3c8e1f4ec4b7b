mod engine_test;
use engine_test::*;

engine_error_test!(
  adding_integer_and_boolean,
  "1 + true",
  "unsupported types for binary operation: INTEGER + BOOLEAN"
);
engine_error_test!(
  adding_string_and_integer,
  "\"a\" + 1",
  "unsupported types for binary operation: STRING + INTEGER"
);
engine_error_test!(
  comparing_booleans,
  "true > false",
  "unsupported types for binary operation: BOOLEAN > BOOLEAN"
);
engine_error_test!(
  subtracting_strings,
  "\"a\" - \"b\"",
  "unknown string operator: -"
);
engine_error_test!(division_by_zero, "1 / 0", "division by zero");
engine_error_test!(
  division_by_computed_zero,
  "let zero = 5 - 5; 1 / zero",
  "division by zero"
);
engine_error_test!(
  negating_a_boolean,
  "-true",
  "unsupported type for negation: BOOLEAN"
);
engine_error_test!(
  type_mismatch_inside_function,
  "let f = fn() { 1 + true }; f()",
  "unsupported types for binary operation: INTEGER + BOOLEAN"
);

engine_error_test!(undefined_variable, "foobar", "undefined variable foobar");
engine_error_test!(
  undefined_variable_in_function,
  "fn() { undefined }()",
  "undefined variable undefined"
);

engine_error_test!(
  indexing_an_integer,
  "5[0]",
  "index operator not supported: INTEGER"
);
engine_error_test!(
  function_as_hash_key,
  "{\"name\": \"x\"}[fn(x) { x }]",
  "unusable as hash key: FUNCTION"
);
engine_error_test!(
  array_as_hash_literal_key,
  "{[]: 1}",
  "unusable as hash key: ARRAY"
);

mod runaway_recursion {
  use super::*;

  // Only the bytecode engine bounds its call depth, so these stay off the
  // tree-walk path.
  #[test]
  fn vm_overflows_the_frame_stack() {
    let result = run_vm("let f = fn() { f() }; f()");

    assert_eq!(result, Err("frames overflow".to_string()));
  }

  #[test]
  fn vm_overflows_the_value_stack_on_wide_literals() {
    let elements = vec!["1"; 3000].join(", ");
    let source = format!("[{elements}]");

    assert_eq!(run_vm(&source), Err("stack overflow".to_string()));
  }
}
