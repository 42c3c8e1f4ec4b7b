mod engine_test;
use engine_test::*;

engine_test!(integer_literal, "5", 5);
engine_test!(integer_arithmetic, "1 + 2 * 3", 7);
engine_test!(grouped_arithmetic, "(1 + 2) * 3", 9);
engine_test!(integer_division_truncates, "10 / 3", 3);
engine_test!(mixed_arithmetic, "5 * 2 + 10 / 2 - 3", 12);
engine_test!(negation, "-(5 + 5)", -10);
engine_test!(double_negation, "-(-5)", 5);

engine_test!(
  addition_wraps_on_overflow,
  "9223372036854775807 + 1",
  i64::MIN
);
engine_test!(
  multiplication_wraps_on_overflow,
  "9223372036854775807 * 2",
  -2
);

engine_test!(boolean_literal, "true", true);
engine_test!(not_operator, "!true", false);
engine_test!(double_not, "!!false", false);
engine_test!(not_integer, "!5", false);
engine_test!(not_null, "!(if (false) { 5 })", true);

engine_test!(less_than, "1 < 2", true);
engine_test!(greater_than, "2 > 1", true);
engine_test!(greater_than_false, "1 > 2", false);
engine_test!(integer_equality, "1 == 1", true);
engine_test!(integer_inequality, "1 != 2", true);
engine_test!(boolean_equality, "true == true", true);
engine_test!(comparison_result_equality, "(1 < 2) == true", true);
engine_test!(cross_type_equality, "1 == true", false);

engine_test!(string_literal, "\"hello\"", "hello");
engine_test!(string_concatenation, "\"mon\" + \"key\"", "monkey");
engine_test!(
  repeated_concatenation,
  "\"a\" + \"b\" + \"c\"",
  "abc"
);
engine_test!(string_equality, "\"a\" == \"a\"", true);
engine_test!(string_inequality, "\"a\" != \"b\"", true);
engine_test!(no_escape_processing, r#"len("a\nb")"#, 4);

engine_test!(if_true, "if (true) { 10 }", 10);
engine_test!(if_false_without_else, "if (false) { 10 }", ());
engine_test!(if_else, "if (1 > 2) { 10 } else { 20 }", 20);
engine_test!(if_with_truthy_integer, "if (1) { 10 }", 10);
engine_test!(zero_is_truthy, "if (0) { 10 }", 10);
engine_test!(empty_string_is_truthy, "if (\"\") { 10 }", 10);
engine_test!(if_with_comparison, "if (1 < 2) { 10 } else { 20 }", 10);
engine_test!(
  if_is_an_expression,
  "let x = if (true) { 1 } else { 2 }; x",
  1
);

engine_test!(let_bindings, "let one = 1; let two = one + one; one + two", 3);
engine_test!(last_expression_wins, "1; 2; 3", 3);
engine_test!(top_level_return, "return 10; 5", 10);
engine_test!(bare_top_level_return, "return;", ());
