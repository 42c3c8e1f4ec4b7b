mod engine_test;
use engine_test::*;

// The memoized fibonacci program the benchmark driver runs, parameterized
// over its input.
fn memo_fib(n: u32) -> String {
  format!(
    "
    let cache = {{}};
    let memo = fn(f, x) {{
      if (!cache[x]) {{
        let result = f(x);
        updateHash(cache, x, result);
        return result;
      }};
      return cache[x];
    }};
    let fib = fn(x) {{
      if (x == 0) {{
        return 0;
      }};
      if (x == 1) {{
        return 1;
      }};
      memo(fib, x - 1) + memo(fib, x - 2);
    }};
    memo(fib, {n});
    "
  )
}

#[test]
fn vm_computes_memoized_fib_35() {
  assert_eq!(run_vm(&memo_fib(35)), Ok(Value::from(9227465)));
}

#[test]
fn treewalk_computes_memoized_fib_35() {
  assert_eq!(run_eval(&memo_fib(35)), Ok(Value::from(9227465)));
}

#[test]
fn vm_computes_memoized_fib_92() {
  std::thread::Builder::new()
    .stack_size(64 * 1024 * 1024)
    .spawn(|| {
      assert_eq!(
        run_vm(&memo_fib(92)),
        Ok(Value::from(7_540_113_804_746_346_429i64))
      );
    })
    .unwrap()
    .join()
    .unwrap();
}

#[test]
fn treewalk_computes_memoized_fib_92() {
  std::thread::Builder::new()
    .stack_size(64 * 1024 * 1024)
    .spawn(|| {
      assert_eq!(
        run_eval(&memo_fib(92)),
        Ok(Value::from(7_540_113_804_746_346_429i64))
      );
    })
    .unwrap()
    .join()
    .unwrap();
}

#[test]
fn both_engines_agree_on_small_fib_values() {
  for n in 0..15 {
    assert_eq!(run_vm(&memo_fib(n)), run_eval(&memo_fib(n)), "for fib({n})");
  }
}
