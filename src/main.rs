use std::env;
use std::io::{self, Write};

use bf_tree::commands::{read, repl};
use bf_tree::logging;
use clap::{Parser, Subcommand};

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} read  [--debug|-d] "<code>"      # Run Brainfuck code (args are concatenated)
  {0} read  [--debug|-d] --file <PATH> # Run Brainfuck code loaded from file
  {0} repl  [--bare|--editor]          # Start a Brainfuck REPL (read-eval-print loop)

With no subcommand, starts the REPL (bare mode when stdin is piped).

Run "{0} <subcommand> --help" for more info.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "bf", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Read(read::ReadArgs),
    Repl(repl::ReplArgs),
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bf"));

    logging::init();

    let cli = Cli::parse();

    if cli.help {
        print_top_usage_and_exit(&program, 0);
    }

    let code = match cli.command {
        Some(Command::Read(args)) => read::run(&program, args),
        Some(Command::Repl(args)) => repl::run(&program, args),
        None => repl::run(&program, repl::ReplArgs::default()),
    };

    std::process::exit(code);
}
