use clap::Args;
use std::io::{self, Write};

use crate::builder;
use crate::cli_util::print_build_error;

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct FoldArgs {
    /// Read program text from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated program parts
    #[arg(value_name = "code", trailing_var_arg = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

/// Build the program and print its folded instruction listing.
pub fn run(program: &str, args: FoldArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let FoldArgs { file, code, .. } = args;

    if file.is_none() && code.is_empty() {
        usage_and_exit(program, 2);
    }

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let code_str = match super::load_source(program, file, code) {
        Ok(s) => s,
        Err(status) => return status,
    };

    match builder::parse(&code_str) {
        Ok(built) => {
            let mut stdout = io::stdout().lock();
            if let Err(e) = write!(stdout, "{built}").and_then(|_| stdout.flush()) {
                eprintln!("{program}: failed to write listing: {e}");
                return 1;
            }
            0
        }
        Err(err) => {
            print_build_error(Some(program), &code_str, &err);
            1
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} fold "<code>"
  {0} fold --file <PATH>

Options:
  --file,  -f <PATH>  Read program text from PATH instead of positional "<code>"
  --help,  -h         Show this help

Description:
  Prints the built instruction listing: one line per instruction with its
  index, symbol, and either its repeat count (x<N>) or its jump target (-> <IP>).
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
