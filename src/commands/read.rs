use std::io::{self, Write};
use std::sync::mpsc;
use std::time::Duration;
use std::{fs, thread};

use clap::Args;

use crate::cli_util::{print_error, render_memory_dump};
use crate::{Error, Evaluator, State, parse};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct ReadArgs {
    /// Print a step-by-step table of executed instructions to stderr
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true)]
    pub code: Vec<String>,

    /// Wall-clock timeout in milliseconds, 0 for none (fallback BF_TIMEOUT_MS; default 2_000)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// After the run, print the pointer and the first N tape cells to stderr
    #[arg(long = "dump", value_name = "N")]
    pub dump: Option<usize>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

/// What the worker thread hands back: the failure, if any, and the final
/// state when the program got far enough to have one.
type Outcome = (Option<Error>, Option<State>);

pub fn run(program: &str, args: ReadArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let ReadArgs {
        debug,
        file,
        code,
        timeout_ms,
        dump,
        ..
    } = args;

    if file.is_none() && code.is_empty() {
        usage_and_exit(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    // Everything after the first code part is code, so a late option would
    // silently become comment text.
    if let Some(option) = code.iter().find(|part| is_read_option(part)) {
        eprintln!("{program}: options must come before the code: {option}");
        usage_and_exit(program, 2);
    }

    let code_str = if let Some(path) = file {
        match fs::read_to_string(&path) {
            Ok(s) => s,
            Err(e) => {
                eprintln!("{program}: failed to read code file as UTF-8: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        }
    } else {
        code.join("")
    };

    // Resolve limits: flag -> env -> default
    let timeout_ms = timeout_ms
        .or_else(|| {
            std::env::var("BF_TIMEOUT_MS")
                .ok()
                .and_then(|s| s.parse::<u64>().ok())
        })
        .unwrap_or(2_000);

    // The interpreter has no cancellation hook; on timeout the process exits
    // and takes the worker thread with it.
    let (tx, rx) = mpsc::channel::<Outcome>();
    let source = code_str.clone();
    thread::spawn(move || {
        let _ = tx.send(execute(&source, debug));
    });

    let outcome = if timeout_ms == 0 {
        rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected)
    } else {
        rx.recv_timeout(Duration::from_millis(timeout_ms))
    };

    let (error, state) = match outcome {
        Ok(outcome) => outcome,
        Err(mpsc::RecvTimeoutError::Timeout) => {
            tracing::debug!(timeout_ms, "wall-clock budget exhausted");
            eprintln!("Execution aborted: wall-clock timeout exceeded ({timeout_ms} ms)");
            let _ = io::stderr().flush();
            return 1;
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => return 1,
    };

    if let Some(state) = &state {
        // For readability, make sure the prompt starts on a fresh line
        if state.outputs().last().is_some_and(|&b| b != b'\n') {
            println!();
            let _ = io::stdout().flush();
        }
        if let Some(cells) = dump {
            eprint!("{}", render_memory_dump(state, cells));
        }
    }

    match error {
        Some(err) => {
            print_error(Some(program), &code_str, &err);
            1
        }
        None => 0,
    }
}

fn is_read_option(part: &str) -> bool {
    const OPTIONS: [&str; 5] = ["--debug", "--file", "--dump", "--timeout", "--help"];
    OPTIONS.iter().any(|option| {
        part.strip_prefix(option)
            .is_some_and(|rest| rest.is_empty() || rest.starts_with('='))
    })
}

fn execute(source: &str, debug: bool) -> Outcome {
    let program = match parse(source) {
        Ok(program) => program,
        Err(err) => return (Some(err.into()), None),
    };

    let mut state = State::new();
    let mut evaluator = Evaluator::stdio();
    if debug {
        evaluator = evaluator.with_trace(io::stderr());
    }
    let error = evaluator.run(&program, &mut state).err().map(Error::from);
    (error, Some(state))
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} read [--debug|-d] [--dump N] [--timeout MS] "<code>"
  {0} read [--debug|-d] [--dump N] [--timeout MS] --file <PATH>

Options:
  --file,  -f <PATH>  Read Brainfuck code from PATH instead of positional "<code>"
  --debug, -d         Print a step-by-step table of executed instructions to stderr
  --dump N            Print the pointer and the first N tape cells to stderr afterwards
  --timeout MS        Abort after MS milliseconds, 0 for no limit (env BF_TIMEOUT_MS; default 2000)
  --help,  -h         Show this help

Notes:
- Options go before the code; every argument after the first code part is code.
- Input (`,`) reads a single byte from stdin; on EOF the current cell is left unchanged.
- Characters outside of Brainfuck's ><+-.,[] are comments and are ignored.
- Set RUST_LOG=bf_tree=debug to see interpreter logs on stderr.

Examples:
- Load Brainfuck code from a file:
    {0} read --file ./program.bf
- Read bytes from a file as stdin (`,` will consume file input):
    {0} read ",[.[-],]" < input.txt
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
