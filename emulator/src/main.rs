mod config;
mod session;
mod sink;

use std::error::Error;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;

use clap::Parser;
use crossterm::style::Stylize;

use config::EmulatorConfig;
use session::Session;

/// Interactive EPS board emulator.
#[derive(Parser, Debug)]
#[command(name = "eps-emulator", version)]
struct Cli {
    /// JSON board configuration; defaults are used when omitted
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Write a transcript of the session to this file
    #[arg(long)]
    transcript: Option<PathBuf>,

    /// Log level (trace, debug, info, warn, error); overrides the configuration
    #[arg(long, value_parser = parse_level)]
    log_level: Option<tracing::Level>,
}

fn parse_level(text: &str) -> Result<tracing::Level, String> {
    config::parse_log_level(text).map_err(|err| err.to_string())
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();

    let config = match cli.config.as_deref() {
        Some(path) => EmulatorConfig::load(path)?,
        None => EmulatorConfig::default(),
    };
    let level = match cli.log_level {
        Some(level) => level,
        None => config.log_level()?,
    };
    tracing_subscriber::fmt()
        .with_max_level(level)
        .with_writer(io::stderr)
        .init();

    let mut session = Session::new(&config)?;
    if let Some(path) = cli.transcript.as_deref() {
        session = session.with_transcript(path, "EPS emulator transcript")?;
        tracing::info!(path = %path.display(), "recording transcript");
    }

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "EPS emulator ready. Type `help` for commands or `exit` to quit."
    )?;

    loop {
        line.clear();
        write!(writer, "> ")?;
        writer.flush()?;

        let bytes_read = reader.read_line(&mut line)?;
        if bytes_read == 0 {
            writeln!(writer)?;
            break;
        }

        let trimmed = line.trim();
        if trimmed.is_empty() {
            continue;
        }

        if should_terminate(trimmed) {
            writeln!(writer, "Session closed.")?;
            break;
        }

        for response in session.handle_command(trimmed)? {
            print_response(&mut writer, &response)?;
        }
    }

    Ok(())
}

fn print_response(writer: &mut impl Write, response: &str) -> io::Result<()> {
    if response.starts_with("OK") {
        writeln!(writer, "{}", response.green())
    } else if response.starts_with("ERR") {
        writeln!(writer, "{}", response.red())
    } else {
        writeln!(writer, "{response}")
    }
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}
