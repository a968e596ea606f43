use clap::{Parser, Subcommand};
use rlbf::commands::compress::CompressArgs;
use rlbf::commands::run::RunArgs;
use std::env;
use std::io::{self, Write};
use tracing_subscriber::EnvFilter;

fn print_top_usage_and_exit(program: &str, code: i32) -> ! {
    eprintln!(
        r#"Usage:
  {0} run      [--debug|-d] "<code>"       # Compress and run Brainfuck code (args are concatenated)
  {0} run      [--debug|-d] --file <PATH>  # Compress and run Brainfuck code loaded from file
  {0} compress [--expand|-x] [CODE...]     # Print the run-length compressed form of CODE/STDIN/file

Run "{0} <subcommand> --help" for more info.
Set RUST_LOG (e.g. RUST_LOG=rlbf=debug) for diagnostic logging on stderr.
"#,
        program
    );
    let _ = io::stderr().flush();
    std::process::exit(code);
}

#[derive(Parser, Debug)]
#[command(name = "rlbf", disable_help_flag = true, disable_help_subcommand = true)]
struct Cli {
    /// Show this help
    #[arg(short = 'h', long = "help", action = clap::ArgAction::SetTrue)]
    help: bool,

    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
    Run(RunArgs),
    Compress(CompressArgs),
}

/// Initialize logging on stderr so program output on stdout stays clean.
///
/// Use `RUST_LOG` to override the default filter (`warn`).
fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(io::stderr)
        .init();
}

fn main() {
    init_logging();

    // We still pull the program name for help rendering consistency
    let program = env::args().next().unwrap_or_else(|| String::from("rlbf"));

    let cli = Cli::parse();

    let Some(command) = cli.command else {
        print_top_usage_and_exit(&program, if cli.help { 0 } else { 2 });
    };
    if cli.help {
        print_top_usage_and_exit(&program, 0);
    }

    let code = match command {
        Command::Run(args) => rlbf::commands::run::run(&program, args),
        Command::Compress(args) => rlbf::commands::compress::run(&program, args),
    };

    std::process::exit(code);
}
