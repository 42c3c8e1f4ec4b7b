mod engine_test;
use engine_test::*;

engine_test!(no_arguments, "let five = fn() { 5 }; five()", 5);
engine_test!(
  implicit_return_of_last_expression,
  "let add = fn(x, y) { x + y }; add(5, add(5, 5))",
  15
);
engine_test!(
  explicit_return_short_circuits,
  "let f = fn() { return 5; 10 }; f()",
  5
);
engine_test!(empty_body_returns_null, "let f = fn() {}; f()", ());
engine_test!(bare_return_yields_null, "let f = fn() { return; }; f()", ());
engine_test!(
  immediately_invoked,
  "fn(x) { x * 2 }(21)",
  42
);

engine_test!(
  arguments_evaluate_left_to_right,
  "let f = fn(a, b, c) { a * 100 + b * 10 + c }; f(1, 2, 3)",
  123
);

engine_test!(
  functions_are_values,
  "let apply = fn(f, x) { f(x) }; apply(fn(x) { x * 2 }, 21)",
  42
);
engine_test!(
  functions_returned_from_functions,
  "let make = fn() { fn() { 99 } }; make()()",
  99
);

engine_test!(
  closure_captures_parameter,
  "let newAdder = fn(x) { fn(y) { x + y } }; let addTwo = newAdder(2); addTwo(2)",
  4
);
engine_test!(
  closure_captures_local,
  "let f = fn() { let a = 77; fn() { a } }; f()()",
  77
);
engine_test!(
  curried_application,
  "let add = fn(a) { fn(b) { fn(c) { a + b + c } } }; add(1)(2)(3)",
  6
);
engine_test!(
  closures_capture_by_value_independently,
  "
  let counter = fn(x) { fn() { x } };
  let one = counter(1);
  let two = counter(2);
  one() + two()
  ",
  3
);

engine_test!(
  self_reference_through_let,
  "let countDown = fn(x) { if (x == 0) { return 0; } countDown(x - 1) }; countDown(1)",
  0
);
engine_test!(
  recursion_accumulates,
  "let sum = fn(n) { if (n == 0) { return 0; } n + sum(n - 1) }; sum(10)",
  55
);
engine_test!(
  recursive_closure_inside_function,
  "
  let wrapper = fn() {
    let countDown = fn(x) { if (x == 0) { return 0; } countDown(x - 1) };
    countDown(2)
  };
  wrapper()
  ",
  0
);

engine_test!(
  return_unwinds_nested_blocks,
  "
  let f = fn() {
    if (true) {
      if (true) {
        return 10;
      }
      return 1;
    }
  };
  f()
  ",
  10
);

engine_test!(
  globals_visible_inside_functions,
  "let base = 40; let f = fn() { base + 2 }; f()",
  42
);
engine_test!(
  locals_shadow_globals,
  "let x = 1; let f = fn() { let x = 2; x }; f() + x",
  3
);

engine_error_test!(
  too_few_arguments,
  "fn(a, b) { a + b }(1)",
  "wrong number of arguments: want=2, got=1"
);
engine_error_test!(
  too_many_arguments,
  "fn() { 1 }(1)",
  "wrong number of arguments: want=0, got=1"
);
engine_error_test!(calling_an_integer, "1()", "calling non-function");
engine_error_test!(calling_a_string, "\"not a function\"()", "calling non-function");
