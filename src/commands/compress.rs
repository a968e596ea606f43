use clap::Args;
use std::fs;
use std::io::{self, Read, Write};
use tracing::debug;

use crate::compress::{compress, expand};

#[derive(Args, Debug)]
#[command(disable_help_flag = true)]
pub struct CompressArgs {
    /// Treat the input as an already compressed stream and expand it
    #[arg(short = 'x', long = "expand")]
    pub expand: bool,

    /// Read input from file at PATH (otherwise reads from CODE or STDIN)
    #[arg(short = 'f', long = "file")]
    pub file: Option<String>,

    /// Positional code. If omitted, reads from STDIN.
    #[arg(value_name = "code", trailing_var_arg = true, allow_hyphen_values = true)]
    pub code: Vec<String>,

    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    pub help: bool,
}

pub fn run(program: &str, args: CompressArgs) -> i32 {
    if args.help {
        usage_and_exit(program, 0);
    }

    let CompressArgs {
        expand: expanding,
        file,
        code,
        ..
    } = args;

    if file.is_some() && !code.is_empty() {
        eprintln!("{program}: cannot use positional code together with --file");
        usage_and_exit(program, 2);
    }

    let input: Vec<u8> = match file {
        Some(path) => match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                eprintln!("{program}: failed to read file: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
        },
        None if !code.is_empty() => code.join("").into_bytes(),
        None => {
            let mut buf = Vec::new();
            if let Err(e) = io::stdin().lock().read_to_end(&mut buf) {
                eprintln!("{program}: failed reading stdin: {e}");
                let _ = io::stderr().flush();
                return 1;
            }
            buf
        }
    };

    let output = if expanding {
        // Trailing newlines from editors or `echo` are not part of the stream.
        let stream = input.trim_ascii_end();
        match expand(stream) {
            Ok(out) => out,
            Err(err) => {
                eprintln!("{program}: Parse error: {err}");
                let _ = io::stderr().flush();
                return 1;
            }
        }
    } else {
        compress(&input)
    };
    debug!(input_len = input.len(), output_len = output.len(), expanding, "compress command");

    let mut stdout = io::stdout().lock();
    let written = stdout
        .write_all(&output)
        .and_then(|()| stdout.write_all(b"\n"))
        .and_then(|()| stdout.flush());
    match written {
        Ok(()) => 0,
        Err(e) => {
            eprintln!("{program}: failed writing output: {e}");
            let _ = io::stderr().flush();
            1
        }
    }
}

fn usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} compress [--expand|-x] [CODE...]       # Compress CODE args, or STDIN if no CODE is given
  {0} compress [--expand|-x] --file <PATH>   # Compress the contents of PATH

Options:
  --file,   -f <PATH>  Read input from file at PATH (otherwise reads from CODE or STDIN)
  --expand, -x         Expand an already compressed stream back into plain Brainfuck
  --help,   -h         Show this help

Description:
  Drops everything that is not one of ><+-.,[] and rewrites runs of the same
  instruction as <count><instruction>, e.g. "++++[-]" becomes "4+[-]".
  Brackets are never counted.

Notes:
  - Output is printed to stdout followed by a newline.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}
