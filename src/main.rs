use rustyline::DefaultEditor;
use rustyline::error::ReadlineError;
use std::env;
use std::process;
use std::thread;
use tinylisp::environment::Environment;
use tinylisp::evaluator;
use tinylisp::value::Value;
use tinylisp::{EvalLimits, MAX_EVAL_DEPTH, run_line};

const DEFAULT_STACK_MB: usize = 64;

fn env_opt_usize(name: &str) -> Result<Option<usize>, String> {
    match env::var(name) {
        Ok(v) => {
            let n = v
                .trim()
                .parse::<usize>()
                .map_err(|_| format!("invalid {name}: {v}"))?;
            Ok(Some(n))
        }
        Err(env::VarError::NotPresent) => Ok(None),
        Err(e) => Err(format!("invalid {name}: {e}")),
    }
}

fn worker_stack_size_bytes() -> Result<usize, String> {
    let mb = env_opt_usize("TINYLISP_STACK_MB")?.unwrap_or(DEFAULT_STACK_MB);
    mb.checked_mul(1024 * 1024)
        .ok_or_else(|| format!("invalid TINYLISP_STACK_MB: {mb}"))
}

fn eval_limits_from_env() -> Result<EvalLimits, String> {
    Ok(EvalLimits {
        max_depth: env_opt_usize("TINYLISP_MAX_DEPTH")?.unwrap_or(MAX_EVAL_DEPTH),
    })
}

fn main() {
    env_logger::init();

    let config = worker_stack_size_bytes().and_then(|stack| Ok((stack, eval_limits_from_env()?)));
    let (stack_size, limits) = match config {
        Ok(v) => v,
        Err(e) => {
            eprintln!("error: {e}");
            process::exit(1);
        }
    };
    log::debug!("worker stack {stack_size} bytes, {limits:?}");

    // Parsing and printing recurse on the native stack with the nesting of
    // the input, so the session runs on a thread sized for deep literals
    let result = thread::Builder::new()
        .name("tinylisp-repl".to_owned())
        .stack_size(stack_size)
        .spawn(move || run_repl(&limits))
        .map_err(|e| format!("failed to start worker thread: {e}"))
        .and_then(|h| {
            h.join()
                .map_err(|_| "The REPL encountered an unexpected error and must exit.".to_owned())?
        });

    if let Err(e) = result {
        eprintln!("error: {e}");
        process::exit(1);
    }
}

fn run_repl(limits: &EvalLimits) -> Result<(), String> {
    let mut rl = DefaultEditor::new().map_err(|e| format!("could not initialize REPL: {e}"))?;
    let env = evaluator::create_global_env();

    loop {
        match rl.readline("=>") {
            Ok(line) => {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }

                if let Err(e) = rl.add_history_entry(line) {
                    log::debug!("history not updated: {e}");
                }

                match line {
                    ":help" => {
                        print_help();
                        continue;
                    }
                    ":env" => {
                        print_environment(&env);
                        continue;
                    }
                    ":quit" | ":exit" => {
                        farewell();
                        break;
                    }
                    _ => {}
                }

                match run_line(line, &env, limits) {
                    // Don't print Unspecified values (e.g., from define)
                    Ok(Value::Unspecified) => {}
                    Ok(result) => println!("{result}"),
                    Err(e) => println!("Error: {e}"),
                }
            }

            Err(ReadlineError::Eof | ReadlineError::Interrupted) => {
                println!();
                farewell();
                break;
            }
            Err(err) => return Err(format!("read error: {err}")),
        }
    }

    Ok(())
}

fn farewell() {
    println!("End of file reached");
    println!("Moriturus te saluto.");
}

fn print_help() {
    println!("tinylisp - one expression per line");
    println!("  :help      - Show this help message");
    println!("  :env       - Show current environment bindings");
    println!("  :quit      - Exit the interpreter");
    println!("  :exit      - Exit the interpreter");
    println!("  Ctrl+D     - Exit the interpreter");
    println!();
    println!("Special forms: quote, define, if, lambda");
    println!("False values: 0, 0.0, (), a failed comparison and the result of define");
    println!();
    println!("Examples:");
    println!("  (+ 1 2 3)");
    println!("  (define square (lambda (x) (* x x)))");
    println!("  (square 12)");
    println!("  (if (< 1 2) (quote yes) (quote no))");
    println!("  (sqrt (fsum (list 1 2 3.5)))");
    println!();
}

fn print_environment(env: &Environment) {
    let bindings = env.get_all_bindings();

    if bindings.is_empty() {
        println!("Environment is empty.");
        return;
    }

    println!("Environment bindings ({} total):", bindings.len());
    println!();

    // Separate built-in functions from user-defined values
    let mut builtins = Vec::new();
    let mut user_defined = Vec::new();

    for (name, value) in bindings {
        match value {
            Value::NativeFunction { .. } => builtins.push(name),
            _ => user_defined.push((name, value)),
        }
    }

    if !builtins.is_empty() {
        println!("Built-in functions ({}):", builtins.len());
        // Print in columns for readability
        for row in builtins.chunks(4) {
            let line: String = row.iter().map(|name| format!("  {name:<15}")).collect();
            println!("{}", line.trim_end());
        }
        println!();
    }

    if !user_defined.is_empty() {
        println!("Values ({}):", user_defined.len());
        for (name, value) in user_defined {
            println!("  {name} = {value}");
        }
    }
}
