//! Replays scripted console sessions against the default board and stores
//! their transcripts.
//!
//! Usage: `capture-transcripts [output-dir]` (default `transcripts/`).

use std::env;
use std::error::Error;
use std::path::{Path, PathBuf};

#[allow(dead_code)]
#[path = "../config.rs"]
mod config;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;
#[allow(dead_code)]
#[path = "../sink.rs"]
mod sink;

use config::EmulatorConfig;
use session::Session;

#[derive(Clone, Copy, Debug, Eq, PartialEq)]
enum Script {
    Watchdog,
    PcmReset,
    SwitchTimer,
}

impl Script {
    const ALL: [Script; 3] = [Script::Watchdog, Script::PcmReset, Script::SwitchTimer];

    fn file_name(self) -> &'static str {
        match self {
            Script::Watchdog => "watchdog.log",
            Script::PcmReset => "pcm-reset.log",
            Script::SwitchTimer => "switch-timer.log",
        }
    }

    fn header(self) -> &'static str {
        match self {
            Script::Watchdog => "EPS emulator watchdog transcript",
            Script::PcmReset => "EPS emulator PCM reset transcript",
            Script::SwitchTimer => "EPS emulator switch timer transcript",
        }
    }

    fn lines(self) -> &'static [&'static str] {
        match self {
            Script::Watchdog => &[
                "cmd get-wdt-period",
                "cmd set-wdt-period 1",
                "tick 30s",
                "cmd reset-wdt",
                "tick 59s",
                "status",
                "tick 1s",
                "cmd get-version",
                "tick 500ms",
                "cmd get-num-wdt-resets",
                "cmd get-last-error",
                "cmd get-board-status",
            ],
            Script::PcmReset => &[
                "tlm VPCM5V 5.1",
                "tlm VSW3 5.0",
                "switch 3 on",
                "cmd set-pcm-reset 0x02",
                "tlm VPCM5V",
                "tlm VSW3",
                "tick 500ms",
                "tlm VPCM5V",
                "tlm VSW3",
                "cmd set-pcm-reset 0x10",
                "cmd get-board-status",
            ],
            Script::SwitchTimer => &[
                "cmd set-pdm-on 4",
                "cmd set-pdm-timer-limit 0x0404",
                "cmd get-pdm-timer-limit 4",
                "tick 90s",
                "cmd get-pdm-timer-value 4",
                "cmd get-pdm-actual-state 4",
                "tick 30s",
                "cmd get-pdm-actual-state 4",
                "cmd get-pdm-all-actual-state",
                "switch 4 on",
                "status",
            ],
        }
    }

    fn completions(self) -> &'static [&'static str] {
        match self {
            Script::Watchdog => &["cmd get-w", "cmd reset-", "st"],
            Script::PcmReset => &["tlm VPCM", "cmd set-pcm", "t"],
            Script::SwitchTimer => &["cmd set-pdm-t", "switch 4 ", "switch 4 init"],
        }
    }
}

fn main() -> Result<(), Box<dyn Error>> {
    let directory = env::args_os()
        .nth(1)
        .map_or_else(|| PathBuf::from("transcripts"), PathBuf::from);

    for script in Script::ALL {
        record(script, &directory)?;
        println!("wrote {}", directory.join(script.file_name()).display());
    }
    Ok(())
}

fn record(script: Script, directory: &Path) -> Result<(), Box<dyn Error>> {
    let path = directory.join(script.file_name());
    let mut session =
        Session::new(&EmulatorConfig::default())?.with_transcript(&path, script.header())?;

    for buffer in script.completions() {
        session.handle_completion(buffer, buffer.len())?;
    }
    for line in script.lines() {
        session.handle_command(line)?;
    }
    Ok(())
}
