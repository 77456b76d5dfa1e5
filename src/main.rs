use clap::{Arg, ArgAction, Command};
use deskcalc::{repl, runner};
use std::fs;
use std::path::Path;
use std::process::ExitCode;
use tracing_subscriber::EnvFilter;

fn main() -> ExitCode {
    match std::panic::catch_unwind(run_cli) {
        Ok(code) => code,
        // The panic hook has already printed the message.
        Err(_) => ExitCode::from(2),
    }
}

fn run_cli() -> ExitCode {
    let matches = Command::new("deskcalc")
        .about("Desk calculator: evaluates `;`-terminated expressions, `q` quits")
        .arg(
            Arg::new("file")
                .help("Read statements from this file instead of standard input")
                .value_name("FILE")
                .index(1),
        )
        .arg(
            Arg::new("no-prompt")
                .long("no-prompt")
                .help("Do not print the '> ' prompt")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("no-color")
                .long("no-color")
                .help("Print diagnostics without colour")
                .action(ArgAction::SetTrue),
        )
        .arg(
            Arg::new("verbose")
                .short('v')
                .long("verbose")
                .help("Log more (repeat for more detail); RUST_LOG overrides")
                .action(ArgAction::Count),
        )
        .get_matches();

    init_logging(matches.get_count("verbose"));

    let color = !matches.get_flag("no-color") && std::env::var_os("NO_COLOR").is_none();

    let result = if let Some(file_path) = matches.get_one::<String>("file") {
        match read_file(file_path) {
            Ok(source) => runner::run(&source, file_path, color),
            Err(code) => return code,
        }
    } else {
        repl::start(repl::SessionConfig {
            prompt: !matches.get_flag("no-prompt"),
            color,
            ..repl::SessionConfig::default()
        })
    };

    match result {
        Ok(_) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("Error writing output: {}", e);
            ExitCode::FAILURE
        }
    }
}

fn init_logging(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn read_file(path: &str) -> Result<String, ExitCode> {
    let path = Path::new(path);

    if !path.exists() {
        eprintln!("Error: File '{}' not found", path.display());
        return Err(ExitCode::FAILURE);
    }

    fs::read_to_string(path).map_err(|e| {
        eprintln!("Error reading file '{}': {}", path.display(), e);
        ExitCode::FAILURE
    })
}
