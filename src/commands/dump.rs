use std::io::{self, Write};

use clap::Args;

use crate::cli_util::{load_source, print_compile_error};
use crate::compile;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct DumpArgs {
    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

/// Print the compiled operation listing without executing it.
pub fn run(program: &str, args: DumpArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let code_str = match load_source(program, args.file.as_deref(), &args.code) {
        Ok(s) => s,
        Err(2) => usage_and_exit(program, 2),
        Err(code) => return code,
    };

    match compile(&code_str) {
        Ok(compiled) => {
            print!("{compiled}");
            let _ = io::stdout().flush();
            0
        }
        Err(err) => {
            print_compile_error(Some(program), &code_str, &err);
            1
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} dump "<code>"
  {0} dump --file <PATH>

Options:
  --file, -f <PATH>  Read Brainfuck code from PATH instead of positional "<code>"
  --help, -h         Show this help

Prints one line per compiled operation: <index> <symbol>(<operand>).
Jump operands are the index of the matching bracket.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
