use std::{
    io::{self, BufRead, Write},
    process::ExitCode,
};

use pith::{Object, ReplSession, StdPrint, is_input_incomplete};

fn main() -> ExitCode {
    let args: Vec<String> = std::env::args().collect();

    let mut interactive = false;
    let mut filename: Option<&str> = None;
    for arg in &args[1..] {
        if arg == "-i" {
            interactive = true;
        } else {
            filename = Some(arg);
        }
    }

    let Some(path) = filename else {
        // No script: plain REPL (with or without -i).
        let mut session = ReplSession::new();
        return repl(&mut session);
    };

    let source = match std::fs::read_to_string(path) {
        Ok(source) => source,
        Err(err) => {
            eprintln!("Error: Could not read file '{path}': {err}");
            return ExitCode::FAILURE;
        }
    };

    let mut session = ReplSession::new();
    if let Err(err) = session.run_script(&source, &mut StdPrint) {
        if let Some(code) = err.exit_code() {
            return exit_code_from(code);
        }
        eprintln!("{err}");
        return ExitCode::FAILURE;
    }

    if interactive {
        // Drop into the REPL with the script's globals preserved.
        return repl(&mut session);
    }
    ExitCode::SUCCESS
}

fn repl(session: &mut ReplSession) -> ExitCode {
    println!("Pith REPL");
    println!("Type 'exit' to quit.");

    let stdin = io::stdin();
    let mut buffer = String::new();

    loop {
        let prompt = if buffer.is_empty() { "pith > " } else { "... > " };
        print!("{prompt}");
        let _ = io::stdout().flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(err) => {
                eprintln!("Error reading input: {err}");
                break;
            }
        }

        if buffer.is_empty() && line.trim() == "exit" {
            break;
        }

        buffer.push_str(&line);
        if is_input_incomplete(&buffer) {
            continue;
        }

        match session.execute(&buffer, &mut StdPrint) {
            Ok(Object::Void) => {}
            Ok(value) => println!("{value}"),
            Err(err) => {
                if let Some(code) = err.exit_code() {
                    return exit_code_from(code);
                }
                eprintln!("{err}");
            }
        }
        buffer.clear();
    }

    println!("Exiting REPL.");
    ExitCode::SUCCESS
}

fn exit_code_from(code: i32) -> ExitCode {
    ExitCode::from(u8::try_from(code.rem_euclid(256)).unwrap_or(1))
}
