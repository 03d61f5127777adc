use bf_engine::commands::dump::{self, DumpArgs};
use bf_engine::commands::run::{self, RunArgs};
use bf_engine::logging;
use clap::{Parser, Subcommand};
use std::env;
use std::io::{self, IsTerminal, Write};

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run  [OPTIONS] "<code>"      # Compile and run Brainfuck code (args are concatenated)
  {0} run  [OPTIONS] --file <PATH> # Compile and run Brainfuck code loaded from file
  {0} dump "<code>"                # Print the compiled operation listing
  {0} < program.bf                 # Run a program piped on stdin with default settings

Global options:
  -v, --verbose   Raise log verbosity (repeatable; RUST_LOG overrides)

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

    /// Raise log verbosity
    #[arg(short = 'v', long = "verbose", action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Dump(DumpArgs),
}

fn main() {
    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("bf"));

    let cli = Cli::parse();
    logging::init(cli.verbose);

    if cli.help {
        print_top_usage_and_exit(&program, 0);
    }

    let code = match cli.command {
        Some(Command::Run(args)) => run::run(&program, args),
        Some(Command::Dump(args)) => dump::run(&program, args),
        // Bare mode: program piped on stdin
        None if !io::stdin().is_terminal() => run::run(&program, RunArgs::default()),
        None => print_top_usage_and_exit(&program, 2),
    };

    std::process::exit(code);
}
