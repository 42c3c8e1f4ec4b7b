use ansi_term::Colour::Red;
use clap::{Arg, Command};
use rustyline::error::ReadlineError;
use rustyline::DefaultEditor;
use std::fs;
use std::time::Instant;

use sable::{
  compile, parse, tokenize, Compiler, Diagnostic, Environment, Evaluator, Value, GLOBALS_SIZE, VM,
};

const BENCHMARK_SOURCE: &str = "
let cache = {};
let memo = fn(f, x) {
  if (!cache[x]) {
    let result = f(x);
    updateHash(cache, x, result);
    return result;
  };
  return cache[x];
};
let fib = fn(x) {
  if (x == 0) {
    return 0;
  };
  if (x == 1) {
    return 1;
  };
  memo(fib, x - 1) + memo(fib, x - 2);
};
memo(fib, 92);
";

fn print_diagnostic(location: &str, diagnostic: &Diagnostic) {
  eprintln!(
    "{} {}",
    Red.bold().paint(format!("{}:", diagnostic.title)),
    diagnostic.message
  );

  if let Some(line) = diagnostic.lines.first() {
    eprintln!("  at {location}:{line}");
  }
}

fn read_file(filename: &str) -> Option<String> {
  match fs::read_to_string(filename) {
    Ok(source) => Some(source),
    Err(_) => {
      eprintln!("Problem reading file: {filename}");
      None
    }
  }
}

fn parse_file(location: &str, source: &str) -> Option<sable::ast::Program> {
  match parse(source) {
    Ok(program) => Some(program),
    Err(diagnostics) => {
      for diagnostic in &diagnostics {
        print_diagnostic(location, diagnostic);
      }
      None
    }
  }
}

fn run_file(filename: &str) {
  let Some(source) = read_file(filename) else {
    return;
  };
  let Some(program) = parse_file(filename, &source) else {
    return;
  };

  let bytecode = match compile(&source, &program) {
    Ok(bytecode) => bytecode,
    Err(diagnostic) => return print_diagnostic(filename, &diagnostic),
  };

  let mut vm = VM::new(bytecode);
  if let Err(diagnostic) = vm.run() {
    print_diagnostic(filename, &diagnostic);
  }
}

fn print_tokens(filename: &str) {
  let Some(source) = read_file(filename) else {
    return;
  };

  for token in tokenize(&source) {
    println!(
      "{:>4} │ {:?} '{}'",
      token.line,
      token.ttype,
      token.get_value(source.as_bytes())
    );
  }
}

fn print_ast(filename: &str) {
  let Some(source) = read_file(filename) else {
    return;
  };
  let Some(program) = parse_file(filename, &source) else {
    return;
  };

  for statement in &program.statements {
    println!("{statement}");
  }
}

fn print_bytecode(filename: &str) {
  let Some(source) = read_file(filename) else {
    return;
  };
  let Some(program) = parse_file(filename, &source) else {
    return;
  };

  let bytecode = match compile(&source, &program) {
    Ok(bytecode) => bytecode,
    Err(diagnostic) => return print_diagnostic(filename, &diagnostic),
  };

  println!("== main ==");
  print!("{}", bytecode.function.chunk.code);

  for (index, constant) in bytecode.constants.iter().enumerate() {
    if let Value::CompiledFunction(function) = constant {
      println!("== function {index} ==");
      print!("{}", function.chunk.code);
    }
  }
}

// Time the memoized fibonacci program on the chosen engine.
fn bench(engine: &str) {
  let source = BENCHMARK_SOURCE;
  let Some(program) = parse_file("benchmark", source) else {
    return;
  };

  let (result, duration) = if engine == "vm" {
    let bytecode = match compile(source, &program) {
      Ok(bytecode) => bytecode,
      Err(diagnostic) => return print_diagnostic("benchmark", &diagnostic),
    };

    let mut vm = VM::new(bytecode);
    let start = Instant::now();
    if let Err(diagnostic) = vm.run() {
      return print_diagnostic("benchmark", &diagnostic);
    }
    (vm.last_popped().clone(), start.elapsed())
  } else {
    let evaluator = Evaluator::new(source);
    let env = Environment::new();

    let start = Instant::now();
    match evaluator.eval_program(&program, &env) {
      Ok(value) => (value, start.elapsed()),
      Err(diagnostic) => return print_diagnostic("benchmark", &diagnostic),
    }
  };

  println!("engine={engine}, result={result}, duration={duration:?}");
}

fn repl() {
  println!("Sable v{}", env!("CARGO_PKG_VERSION"));

  let mut editor = match DefaultEditor::new() {
    Ok(editor) => editor,
    Err(error) => return eprintln!("Error: {error}"),
  };

  let mut state = None;
  let mut globals = vec![Value::Null; GLOBALS_SIZE];

  loop {
    match editor.readline(">> ") {
      Ok(line) => {
        let _ = editor.add_history_entry(&line);

        let Some(program) = parse_file("repl", &line) else {
          continue;
        };

        let mut compiler = match state.take() {
          Some((symbols, constants)) => Compiler::with_state(&line, symbols, constants),
          None => Compiler::new(&line),
        };

        let compiled = compiler.compile(&program).map(|()| compiler.bytecode());
        state = Some(compiler.into_state());

        match compiled {
          Ok(bytecode) => {
            let mut vm = VM::with_globals(bytecode, std::mem::take(&mut globals));
            match vm.run() {
              Ok(()) => println!("{}", vm.last_popped()),
              Err(diagnostic) => print_diagnostic("repl", &diagnostic),
            }
            globals = vm.into_globals();
          }
          Err(diagnostic) => print_diagnostic("repl", &diagnostic),
        }
      }
      Err(ReadlineError::Interrupted | ReadlineError::Eof) => break,
      Err(error) => {
        eprintln!("Error: {error:?}");
        break;
      }
    }
  }
}

fn main() {
  let app = Command::new("sable")
    .version(env!("CARGO_PKG_VERSION"))
    .about("The Sable programming language")
    .subcommand(
      Command::new("run")
        .about("Execute a Sable program")
        .arg(Arg::new("file").help("The file to run").required(true)),
    )
    .subcommand(
      Command::new("tokens")
        .about("Display the tokens for a file")
        .arg(Arg::new("file").help("The file to scan").required(true)),
    )
    .subcommand(
      Command::new("ast")
        .about("Display the abstract syntax tree for a file")
        .arg(Arg::new("file").help("The file to parse").required(true)),
    )
    .subcommand(
      Command::new("bytecode")
        .about("Display the compiled bytecode for a file")
        .arg(Arg::new("file").help("The file to compile").required(true)),
    )
    .subcommand(
      Command::new("bench")
        .about("Time the memoized fibonacci program")
        .arg(
          Arg::new("engine")
            .long("engine")
            .help("Which engine to run")
            .value_parser(["vm", "eval"])
            .default_value("vm"),
        ),
    )
    .get_matches();

  match app.subcommand() {
    Some(("run", args)) => run_file(args.get_one::<String>("file").unwrap()),
    Some(("tokens", args)) => print_tokens(args.get_one::<String>("file").unwrap()),
    Some(("ast", args)) => print_ast(args.get_one::<String>("file").unwrap()),
    Some(("bytecode", args)) => print_bytecode(args.get_one::<String>("file").unwrap()),
    Some(("bench", args)) => bench(args.get_one::<String>("engine").unwrap()),
    _ => repl(),
  }
}
