use std::fmt::Write as _;
use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::Path;

use eps_core::SimTime;
use eps_core::console::catalog;
use eps_core::console::completion::{CompletionEngine, Replacement};
use eps_core::console::executor::{ConsoleError, ConsoleExecutor, ConsoleOutcome, Exchange};
use eps_core::console::grammar::{SwitchAction, SwitchCommand};
use eps_core::console::status::{StatusFormatter, StatusSnapshot};
use eps_core::eps::{Eps, NUM_SWITCHES};

use crate::config::{ConfigError, EmulatorConfig};
use crate::sink::TracingSink;

#[derive(Debug)]
pub enum CompletionResponse {
    NoMatches,
    Applied { replacement: Replacement },
    Suggestions { options: Vec<&'static str> },
}

/// One console session against a single board.
pub struct Session {
    console: ConsoleExecutor<TracingSink>,
    transcript: Option<TranscriptLogger>,
    completion: CompletionEngine,
}

impl Session {
    /// Builds the board described by `config`.
    pub fn new(config: &EmulatorConfig) -> Result<Self, ConfigError> {
        let mut eps = Eps::with_sink(config.eps_config(), TracingSink);
        config.apply(&mut eps)?;
        tracing::debug!(
            address = eps.address(),
            daughterboard = eps.has_daughterboard(),
            "board configured"
        );

        Ok(Self {
            console: ConsoleExecutor::new(eps).with_tick(config.tick_ms()),
            transcript: None,
            completion: CompletionEngine::new(),
        })
    }

    /// Mirrors every exchange into a transcript file at `path`.
    pub fn with_transcript(mut self, path: &Path, header: &str) -> io::Result<Self> {
        self.transcript = Some(TranscriptLogger::create(path, header)?);
        Ok(self)
    }

    #[must_use]
    pub fn console(&self) -> &ConsoleExecutor<TracingSink> {
        &self.console
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let stamp = self.stamp();
        self.log(stamp, TranscriptRole::Host, trimmed)?;

        let lines = match self.console.execute(trimmed) {
            Ok(outcome) => self.render(outcome),
            Err(err) => vec![describe_error(&err)],
        };

        self.record_output(stamp, &lines)?;
        Ok(lines)
    }

    pub fn handle_completion(
        &mut self,
        buffer: &str,
        cursor: usize,
    ) -> io::Result<CompletionResponse> {
        let cursor = cursor.min(buffer.len());
        let (prefix, suffix) = buffer.split_at(cursor);
        let stamp = self.stamp();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.log_completion_request(stamp, prefix, suffix, cursor)?;
        }

        let result = self.completion.complete(buffer, cursor);
        if result.options.is_empty() {
            self.log(stamp, TranscriptRole::Emulator, "completion: no matches")?;
            return Ok(CompletionResponse::NoMatches);
        }

        if let Some(replacement) = result.replacement {
            let message = format!(
                "completion applied: {} (range={}..{})",
                replacement.value, replacement.start, replacement.end
            );
            self.log(stamp, TranscriptRole::Emulator, &message)?;
            if result.options.len() == 1 {
                return Ok(CompletionResponse::Applied { replacement });
            }
        }

        let options: Vec<&'static str> = result.options.iter().copied().collect();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.log_completion_options(stamp, &options)?;
        }
        Ok(CompletionResponse::Suggestions { options })
    }

    fn stamp(&self) -> SimTime {
        self.console.eps().time()
    }

    fn log(&mut self, stamp: SimTime, role: TranscriptRole, line: &str) -> io::Result<()> {
        match self.transcript.as_mut() {
            Some(transcript) => transcript.append_line(stamp, role, line),
            None => Ok(()),
        }
    }

    fn record_output(&mut self, stamp: SimTime, lines: &[String]) -> io::Result<()> {
        for line in lines {
            self.log(stamp, TranscriptRole::Emulator, line)?;
        }
        Ok(())
    }

    fn render(&self, outcome: ConsoleOutcome<'_>) -> Vec<String> {
        match outcome {
            ConsoleOutcome::Exchange(exchange) => vec![describe_exchange(&exchange)],
            ConsoleOutcome::Advanced { time_ms } | ConsoleOutcome::Time { time_ms } => {
                vec![format!("OK time {time_ms}ms")]
            }
            ConsoleOutcome::TelemetryList => {
                let readings = self.console.eps().telemetry_map();
                let mut lines = Vec::with_capacity(1 + readings.len());
                lines.push(format!("OK {} channels", readings.len()));
                lines.extend(
                    readings
                        .iter()
                        .map(|(code, reading)| format!("  {code} {reading}")),
                );
                lines
            }
            ConsoleOutcome::Telemetry { code, reading } => vec![format!("OK {code} {reading}")],
            ConsoleOutcome::TelemetrySet { code, value } => vec![format!("OK {code} = {value}")],
            ConsoleOutcome::Switch(command) => vec![describe_switch(command)],
            ConsoleOutcome::Status(snapshot) => describe_status(&snapshot),
            ConsoleOutcome::Help(topic) => help_lines(topic),
        }
    }
}

fn describe_exchange(exchange: &Exchange) -> String {
    match exchange.verdict {
        Some(verdict) if !verdict.is_valid() => format!("ERR {exchange} {verdict}"),
        _ => format!("OK {exchange}"),
    }
}

fn describe_switch(command: SwitchCommand) -> String {
    let action = match command.action {
        SwitchAction::On => "on",
        SwitchAction::Off => "off",
        SwitchAction::InitialOn => "initial-on",
        SwitchAction::InitialOff => "initial-off",
    };
    format!("OK switch {} {action}", command.number)
}

fn describe_status(snapshot: &StatusSnapshot) -> Vec<String> {
    let formatter = StatusFormatter::new(snapshot);
    let mut lines = vec!["OK status".to_string()];

    let rendered = [
        render_line(|line| formatter.write_time_line(line)),
        render_line(|line| formatter.write_version_line(line)),
        render_line(|line| formatter.write_status_line(line)),
        render_line(|line| formatter.write_resets_line(line)),
    ];
    lines.extend(rendered.into_iter().flatten());
    lines.extend(
        (0..NUM_SWITCHES)
            .filter_map(|index| render_line(|line| formatter.write_switch_line(line, index))),
    );
    lines
}

fn render_line(write: impl FnOnce(&mut String) -> std::fmt::Result) -> Option<String> {
    let mut line = String::from("  ");
    write(&mut line).ok().map(|()| line)
}

fn describe_error(error: &ConsoleError<'_>) -> String {
    match error {
        ConsoleError::Parse(err) => format!("ERR syntax {err}"),
        other => format!("ERR {other}"),
    }
}

fn help_lines(topic: Option<&str>) -> Vec<String> {
    let mut lines = Vec::new();
    match topic {
        Some(target) => match catalog::find(target) {
            Some(spec) => lines.push(format!("{:<44} - {}", spec.usage, spec.summary)),
            None => {
                lines.push(format!("No help available for `{target}`."));
                lines.push(format!("Available topics: {}", help_topic_list()));
            }
        },
        None => {
            lines.push("Available commands:".to_string());
            for spec in catalog::commands() {
                lines.push(format!("  {:<44} - {}", spec.usage, spec.summary));
            }
            lines.push("Type `help <topic>` for a specific command.".to_string());
        }
    }
    lines
}

fn help_topic_list() -> String {
    let mut buffer = String::new();
    for (index, spec) in catalog::commands().iter().enumerate() {
        if index > 0 {
            buffer.push_str(", ");
        }
        buffer.push_str(spec.name);
    }
    buffer
}

struct TranscriptLogger {
    writer: BufWriter<File>,
}

impl TranscriptLogger {
    fn create(path: &Path, header: &str) -> io::Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = OpenOptions::new()
            .create(true)
            .write(true)
            .truncate(true)
            .open(path)?;

        let mut logger = Self {
            writer: BufWriter::new(file),
        };
        writeln!(logger.writer, "# {header}")?;
        writeln!(logger.writer, "# Timestamps are simulated board time")?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(&mut self, stamp: SimTime, role: TranscriptRole, line: &str) -> io::Result<()> {
        writeln!(self.writer, "[+{stamp:>6} ms] {} {line}", role.prefix())?;
        self.writer.flush()
    }

    fn log_completion_request(
        &mut self,
        stamp: SimTime,
        prefix: &str,
        suffix: &str,
        cursor: usize,
    ) -> io::Result<()> {
        let message = format!("[TAB] prefix={prefix:?} suffix={suffix:?} cursor={cursor}");
        self.append_line(stamp, TranscriptRole::Host, &message)
    }

    fn log_completion_options(&mut self, stamp: SimTime, options: &[&'static str]) -> io::Result<()> {
        let mut summary = format!("completion options ({}):", options.len());
        for option in options {
            let _ = write!(summary, " {option}");
        }
        self.append_line(stamp, TranscriptRole::Emulator, &summary)
    }
}

#[derive(Clone, Copy)]
enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}
