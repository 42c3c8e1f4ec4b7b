mod engine_test;
use engine_test::*;

engine_test!(array_first_element, "[1, 2, 3][0]", 1);
engine_test!(array_last_element, "[1, 2, 3][2]", 3);
engine_test!(array_out_of_range_is_null, "[1, 2, 3][5]", ());
engine_test!(array_negative_index_is_null, "[1, 2, 3][-1]", ());
engine_test!(
  array_elements_evaluate,
  "let a = [1, 2 * 2, 3 + 3]; a[2]",
  6
);
engine_test!(array_value, "[1, 1 + 1]", vec![Value::from(1), Value::from(2)]);
engine_test!(
  computed_array_index,
  "let a = [1, 2, 3]; a[1 + 1]",
  3
);

engine_test!(hash_integer_keys, "{1: 10, 2: 20}[2]", 20);
engine_test!(hash_string_keys, "{\"name\": \"Anna\"}[\"name\"]", "Anna");
engine_test!(hash_boolean_keys, "{true: 5}[true]", 5);
engine_test!(hash_missing_key_is_null, "{1: 5}[2]", ());
engine_test!(empty_hash_lookup_is_null, "{}[0]", ());
engine_test!(
  hash_keys_compare_by_content,
  "{\"one\": 1, \"two\": 2, \"three\": 3}[\"t\" + \"wo\"]",
  2
);
engine_test!(
  hash_values_evaluate,
  "{1: 2 * 2}[1]",
  4
);

engine_test!(string_length, "len(\"hello world\")", 11);
engine_test!(empty_string_length, "len(\"\")", 0);
engine_test!(array_length, "len([1, 2, 3])", 3);
engine_test!(first_of_array, "first([1, 2])", 1);
engine_test!(first_of_empty_array, "first([])", ());
engine_test!(last_of_array, "last([1, 2])", 2);
engine_test!(last_of_empty_array, "last([])", ());
engine_test!(rest_drops_first, "rest([1, 2, 3])[0]", 2);
engine_test!(rest_shrinks_by_one, "len(rest([1, 2, 3]))", 2);
engine_test!(rest_of_empty_array, "rest([])", ());
engine_test!(push_appends, "push([1], 2)[1]", 2);
engine_test!(
  push_leaves_original_untouched,
  "let a = [1]; push(a, 2); len(a)",
  1
);
engine_test!(puts_returns_null, "puts(1)", ());

engine_test!(
  update_hash_mutates_in_place,
  "let h = {}; updateHash(h, 1, 10); h[1]",
  10
);
engine_test!(
  update_hash_is_visible_through_aliases,
  "let h = {1: 1}; let g = h; updateHash(g, 2, 2); h[2]",
  2
);
engine_test!(
  update_hash_overwrites,
  "let h = {1: 1}; updateHash(h, 1, 99); h[1]",
  99
);

engine_test!(
  map_with_builtins,
  "
  let map = fn(array, f) {
    let iter = fn(remaining, accumulated) {
      if (len(remaining) == 0) {
        return accumulated;
      }
      iter(rest(remaining), push(accumulated, f(first(remaining))))
    };
    iter(array, [])
  };
  last(map([1, 2, 3], fn(x) { x * 2 }))
  ",
  6
);

engine_error_test!(
  len_of_integer,
  "len(1)",
  "argument to 'len' not supported, got=INTEGER"
);
engine_error_test!(
  len_with_two_arguments,
  "len(\"a\", \"b\")",
  "wrong number of arguments: want=1, got=2"
);
engine_error_test!(
  first_of_integer,
  "first(1)",
  "argument to 'first' must be ARRAY, got=INTEGER"
);
engine_error_test!(
  push_into_string,
  "push(\"a\", 1)",
  "argument to 'push' must be ARRAY, got=STRING"
);
