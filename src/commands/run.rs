use clap::Args;
use log::{debug, warn};
use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, mpsc};
use std::thread;
use std::time::Duration;

use crate::builder;
use crate::cli_util::{print_build_error, print_run_error};
use crate::config::{self, Limits, Settings};
use crate::machine::{Machine, RunError, StepControl};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Read program text from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated program parts
    #[arg(value_name = "code", trailing_var_arg = true)]
    pub code: Vec<String>,

    /// Number of tape cells (fallback TAPEBF_TAPE_LEN, then config; default 3000)
    #[arg(long = "tape-len", value_name = "N")]
    pub tape_len: Option<usize>,

    /// Maximum instructions before abort
    /// (fallback TAPEBF_MAX_STEPS, then config; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<usize>,

    /// Wall-clock timeout in milliseconds (fallback TAPEBF_TIMEOUT_MS, then config; default none)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let RunArgs {
        file,
        code,
        tape_len,
        max_steps,
        timeout_ms,
        ..
    } = args;

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

    let flags = Settings {
        tape_len,
        max_steps,
        timeout_ms,
    };
    let limits = Limits::resolve(&flags, &config::load());
    debug!("resolved limits: {limits:?}");

    let built = match builder::parse(&code_str) {
        Ok(p) => Arc::new(p),
        Err(err) => {
            print_build_error(Some(program), &code_str, &err);
            return 1;
        }
    };

    // First ctrl+c asks the machine to stop; a second one exits outright
    // in case the machine is blocked reading stdin.
    let cancel = Arc::new(AtomicBool::new(false));
    let handler_flag = cancel.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        // no stdout flush here: the worker holds the stdout lock while it
        // waits on stdin, and output is already flushed before every read
        if handler_flag.swap(true, Ordering::Relaxed) {
            std::process::exit(130);
        }
    }) {
        warn!("failed to set ctrl+c handler: {e}");
    }

    // Execute on a worker thread with cooperative cancellation
    let (tx, rx) = mpsc::channel::<Result<(), RunError>>();
    let worker_program = Arc::clone(&built);
    let control = StepControl::new(limits.max_steps, cancel.clone());
    let tape_len = limits.tape_len;

    thread::spawn(move || {
        let mut machine = Machine::with_tape_len(tape_len).with_control(control);
        let res = machine.run(&worker_program, io::stdin().lock(), io::stdout().lock());
        let _ = tx.send(res);
    });

    let outcome = match limits.timeout_ms {
        Some(ms) => rx.recv_timeout(Duration::from_millis(ms)),
        None => rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected),
    };

    match outcome {
        Ok(Ok(())) => 0,
        Ok(Err(err)) => {
            print_run_error(Some(program), &code_str, &built, &err);
            1
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            eprintln!(
                "Execution aborted: wall-clock timeout exceeded ({} ms)",
                limits.timeout_ms.unwrap_or_default()
            );
            let _ = io::stderr().flush();
            1
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => 1,
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [OPTIONS] "<code>"
  {0} run [OPTIONS] --file <PATH>

Options:
  --file,  -f <PATH>   Read program text from PATH instead of positional "<code>"
  --tape-len <N>       Number of tape cells (default 3000)
  --max-steps <N>      Abort after N executed instructions
  --timeout <MS>       Abort after MS milliseconds of wall-clock time
  --help,  -h          Show this help

Notes:
- Input (`,`) reads one byte from stdin; running out of input is an error.
- Characters outside of ><+-.,[] are comments and are ignored.
- Program output goes to stdout unchanged; diagnostics go to stderr.
- Code starting with '-' must follow `--`:
    {0} run -- "----[---->+<]>++."

Environment:
  TAPEBF_TAPE_LEN, TAPEBF_MAX_STEPS, TAPEBF_TIMEOUT_MS  fallbacks for the flags
  TAPEBF_CONFIG  config file path (default: <config home>/tapebf.toml)
  RUST_LOG       log verbosity (default: warn)
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
