use clap::Args;
use std::{fs, thread};
use std::io::{self, Write};
use std::sync::{mpsc, Arc};
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tracing::{debug, warn};

use crate::cli_util::print_engine_error;
use crate::compress::compress_with_map;
use crate::config::{self, Settings};
use crate::engine::{Engine, EngineError, StepControl};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct RunArgs {
    /// Print a step-by-step table of operations instead of executing
    #[arg(short = 'd', long = "debug")]
    pub debug: bool,

    /// Read Brainfuck code from PATH instead of positional "<code>"
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Concatenated Brainfuck code parts
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Wall-clock timeout in milliseconds, 0 for none (fallback RLBF_TIMEOUT_MS; default 2_000)
    #[arg(long = "timeout", value_name = "MS")]
    pub timeout_ms: Option<u64>,

    /// Maximum interpreter steps before abort (fallback RLBF_MAX_STEPS; default unlimited)
    #[arg(long = "max-steps", value_name = "N")]
    pub max_steps: Option<usize>,

    /// Number of tape cells (fallback RLBF_TAPE_LEN; default 30_000)
    #[arg(long = "tape-len", value_name = "N", value_parser = parse_tape_len)]
    pub tape_len: Option<usize>,

    /// Maximum loop nesting (fallback RLBF_STACK_CAPACITY; default 1024)
    #[arg(long = "stack-capacity", value_name = "N")]
    pub stack_capacity: Option<usize>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

fn parse_tape_len(raw: &str) -> Result<usize, String> {
    match raw.parse::<usize>() {
        Ok(0) => Err("the tape needs at least one cell".to_string()),
        Ok(n) => Ok(n),
        Err(e) => Err(e.to_string()),
    }
}

/// What the main thread hears back: the worker's result, or ctrl+c.
enum Outcome {
    Finished(Result<(), EngineError>),
    Interrupted,
}

impl RunArgs {
    /// Resolve limits: flags -> env/config file -> defaults
    fn settings(&self, base: &Settings) -> Settings {
        Settings {
            tape_len: self.tape_len.unwrap_or(base.tape_len),
            stack_capacity: self.stack_capacity.unwrap_or(base.stack_capacity),
            timeout_ms: self.timeout_ms.unwrap_or(base.timeout_ms),
            max_steps: self.max_steps.or(base.max_steps),
        }
    }
}

pub fn run(program: &str, args: RunArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    if args.file.is_none() && args.code.is_empty() {
        usage_and_exit(program, 2);
    }

    if args.file.is_some() && !args.code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let settings = args.settings(config::settings());
    debug!(?settings, "resolved run settings");

    let source: Vec<u8> = if let Some(path) = &args.file {
        match fs::read(path) {
            Ok(bytes) => bytes,
            Err(e) => {
                eprintln!("{program}: failed to read code file: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        }
    } else {
        args.code.join("").into_bytes()
    };

    // Errors are reported against the original source via the source map.
    let compressed = compress_with_map(&source);
    let debug = args.debug;

    // Execute on a worker thread with cooperative cancellation
    let cancel = Arc::new(AtomicBool::new(false));
    let (tx, rx) = mpsc::channel::<Outcome>();
    let stream = compressed.stream.clone();
    let ctrl = StepControl::new(settings.max_steps, cancel.clone());
    let engine_config = settings.engine_config();

    // The worker only sees the flag between instructions, so a blocking `,`
    // read is abandoned by answering the main thread directly.
    let ctrlc_flag = cancel.clone();
    let ctrlc_tx = tx.clone();
    if let Err(e) = ctrlc::set_handler(move || {
        ctrlc_flag.store(true, Ordering::Relaxed);
        let _ = ctrlc_tx.send(Outcome::Interrupted);
    }) {
        warn!("failed to set ctrl+c handler: {e}");
    }

    thread::spawn(move || {
        let mut bf = Engine::with_config(&stream, engine_config);
        // Unlocked handles so the main thread can still report on timeout.
        let res = if debug {
            bf.run_debug(io::stdout(), Some(&ctrl))
        } else {
            bf.run_with_control(io::stdin(), io::stdout(), &ctrl)
        };
        let _ = tx.send(Outcome::Finished(res));
    });

    let timeout_ms = settings.timeout_ms;
    let received = if timeout_ms == 0 {
        rx.recv().map_err(|_| mpsc::RecvTimeoutError::Disconnected)
    } else {
        rx.recv_timeout(Duration::from_millis(timeout_ms))
    };

    let exit_code = match received {
        Ok(Outcome::Finished(Ok(()))) => 0,
        Ok(Outcome::Finished(Err(EngineError::StepLimitExceeded { limit }))) => {
            eprintln!("Execution aborted: step limit exceeded ({limit})");
            let _ = io::stderr().flush();
            1
        }
        Ok(Outcome::Finished(Err(EngineError::Canceled))) | Ok(Outcome::Interrupted) => {
            eprintln!("Execution aborted: cancelled");
            let _ = io::stderr().flush();
            1
        }
        Ok(Outcome::Finished(Err(other))) => {
            print_engine_error(Some(program), &source, &compressed, &other);
            1
        }
        Err(mpsc::RecvTimeoutError::Timeout) => {
            cancel.store(true, Ordering::Relaxed);
            eprintln!("Execution aborted: wall-clock timeout exceeded ({timeout_ms} ms)");
            let _ = io::stderr().flush();
            1
        }
        Err(mpsc::RecvTimeoutError::Disconnected) => 1,
    };

    // For readability, ensure output ends with a newline
    println!();
    let _ = io::stdout().flush();
    exit_code
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run [--debug|-d] [OPTIONS] "<code>"
  {0} run [--debug|-d] [OPTIONS] --file <PATH>

Options:
  --file,  -f <PATH>      Read Brainfuck code from PATH instead of positional "<code>"
  --debug, -d             Print a step-by-step table of operations instead of executing
  --timeout <MS>          Wall-clock timeout in milliseconds, 0 for none (default 2000)
  --max-steps <N>         Abort after N instructions (default unlimited)
  --tape-len <N>          Number of tape cells, at least 1 (default 30000)
  --stack-capacity <N>    Maximum loop nesting (default 1024)
  --help,  -h             Show this help

Notes:
- The code is compressed first: anything outside ><+-.,[] is dropped and runs
  like "++++" become "4+". Errors point at the original source.
- Input (`,`) reads a single byte from stdin; on EOF the current cell is set to 0.
- Ctrl+C cancels the program, even while it waits for input.
- Limits fall back to RLBF_* environment variables, then the [engine] section
  of $XDG_CONFIG_HOME/rlbf.toml.

Examples:
- Load Brainfuck code from a file:
    {0} run --file ./program.bf
- Read bytes from a file as stdin (`,` will consume file input):
    {0} run ",[.,]" < input.txt
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
