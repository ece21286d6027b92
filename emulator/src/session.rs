use std::fs::{self, OpenOptions};
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant as HostInstant};

use detector_core::record::ResetRecord;
use detector_core::{DetectorConfig, PersistentStore, ResetCycleTracker};

use crate::command::{Command, parse_command};
use crate::store::FileStore;

pub const HELP_TOPICS: &[(&str, &str)] = &[
    (
        "boot",
        "boot | reset          - reset the simulated board and run detection",
    ),
    (
        "wait",
        "wait <duration>       - advance uptime and poll the detection window",
    ),
    (
        "cancel",
        "cancel                - close the window now and clear the record",
    ),
    (
        "status",
        "status                - show tracker state for the current boot",
    ),
    (
        "events",
        "events                - list diagnostics recorded since boot",
    ),
    (
        "raw",
        "raw <hex>             - overwrite the stored word directly",
    ),
    ("erase", "erase                 - delete the store file"),
    ("help", "help [topic]          - show help for a command"),
];

const NO_BOARD: &str = "ERR no board running; use `boot` first";

/// One simulated board powered from a file-backed store.
///
/// Every `boot` drops the previous tracker, so a record that was staged but
/// never committed is lost exactly as it would be across a real reset.
pub struct Session {
    config: DetectorConfig,
    store_path: PathBuf,
    board: Option<Board>,
    boots: u32,
    transcript: Option<TranscriptLogger>,
    started_at: HostInstant,
}

struct Board {
    tracker: ResetCycleTracker<FileStore>,
    uptime: Duration,
    boot: u32,
}

impl Session {
    pub fn new(config: DetectorConfig, store_path: impl Into<PathBuf>) -> Self {
        Self {
            config,
            store_path: store_path.into(),
            board: None,
            boots: 0,
            transcript: None,
            started_at: HostInstant::now(),
        }
    }

    /// Mirrors every command and response into a transcript file.
    pub fn with_transcript(mut self, path: &Path) -> io::Result<Self> {
        self.transcript = Some(TranscriptLogger::new(path, &self.config)?);
        Ok(self)
    }

    pub fn handle_command(&mut self, line: &str) -> io::Result<Vec<String>> {
        let trimmed = line.trim();
        if trimmed.is_empty() {
            return Ok(Vec::new());
        }

        let elapsed = self.started_at.elapsed();
        if let Some(transcript) = self.transcript.as_mut() {
            transcript.append_line(elapsed, TranscriptRole::Host, trimmed)?;
        }

        let lines = match parse_command(trimmed) {
            Ok(command) => self.dispatch(command),
            Err(err) => vec![format!("ERR {err}; type `help` for commands")],
        };

        if let Some(transcript) = self.transcript.as_mut() {
            for line in &lines {
                transcript.append_line(elapsed, TranscriptRole::Emulator, line)?;
            }
        }
        Ok(lines)
    }

    fn dispatch(&mut self, command: Command<'_>) -> Vec<String> {
        match command {
            Command::Boot => self.boot(),
            Command::Wait(duration) => self.wait(duration),
            Command::Cancel => self.cancel(),
            Command::Status => self.status(),
            Command::Events => self.events(),
            Command::Raw(word) => self.overwrite(word),
            Command::Erase => self.erase(),
            Command::Help(topic) => handle_help(topic),
        }
    }

    fn boot(&mut self) -> Vec<String> {
        self.board = None;
        self.boots += 1;

        let mut tracker =
            ResetCycleTracker::from_config(self.config, FileStore::open(&self.store_path));
        let detected = tracker.detect();

        let mut lines: Vec<String> = tracker
            .events()
            .oldest_first()
            .map(|record| format!("  {record}"))
            .collect();

        let boot = self.boots;
        if detected {
            lines.push(format!(
                "boot {boot}: MULTI-RESET DETECTED, entering configuration mode"
            ));
        } else if tracker.is_waiting() {
            lines.push(format!(
                "boot {boot}: normal boot, window open for {} (count={})",
                format_duration(self.config.timeout),
                tracker.record().count
            ));
        } else {
            lines.push(format!(
                "boot {boot}: normal boot, detector inactive (storage={})",
                tracker.persistence()
            ));
        }
        if let Some(fault) = tracker.last_fault().filter(|fault| fault.is_storage_fault()) {
            lines.push(format!(
                "boot {boot}: warning: {fault} (storage={})",
                tracker.persistence()
            ));
        }

        self.board = Some(Board {
            tracker,
            uptime: Duration::ZERO,
            boot,
        });
        lines
    }

    fn wait(&mut self, duration: Duration) -> Vec<String> {
        let Some(board) = self.board.as_mut() else {
            return vec![NO_BOARD.to_string()];
        };

        board.uptime = board.uptime.saturating_add(duration);
        let uptime = board.uptime;
        let stamp = format_duration(uptime);
        let line = match board.tracker.poll(uptime) {
            Ok(true) => format!(
                "t={stamp}: window closed, record cleared to {}",
                board.tracker.record()
            ),
            Ok(false) if board.tracker.is_waiting() => format!(
                "t={stamp}: window open, {} remaining",
                format_duration(self.config.timeout.saturating_sub(uptime))
            ),
            Ok(false) => format!("t={stamp}: window closed"),
            Err(fault) => format!("t={stamp}: window closed, clear failed: {fault}"),
        };
        vec![line]
    }

    fn cancel(&mut self) -> Vec<String> {
        let Some(board) = self.board.as_mut() else {
            return vec![NO_BOARD.to_string()];
        };

        match board.tracker.cancel() {
            Ok(()) => vec![format!(
                "window cancelled, record cleared to {}",
                board.tracker.record()
            )],
            Err(fault) => vec![format!("window cancelled, clear failed: {fault}")],
        }
    }

    fn status(&self) -> Vec<String> {
        let mut lines = Vec::new();
        match self.board.as_ref() {
            Some(board) => lines.push(format!(
                "boot {} uptime={} {}",
                board.boot,
                format_duration(board.uptime),
                board.tracker.status()
            )),
            None => lines.push("no board running".to_string()),
        }

        let mut store = FileStore::open(&self.store_path);
        match store.read() {
            Ok(word) => lines.push(format!(
                "store {}: {}",
                store.path().display(),
                ResetRecord::from_word(word)
            )),
            Err(err) => lines.push(format!("store {}: {err}", store.path().display())),
        }
        lines.push(format!(
            "config threshold={} timeout={}",
            self.config.threshold,
            format_duration(self.config.timeout)
        ));
        lines
    }

    fn events(&self) -> Vec<String> {
        let Some(board) = self.board.as_ref() else {
            return vec![NO_BOARD.to_string()];
        };

        let log = board.tracker.events();
        if log.is_empty() {
            return vec!["no events".to_string()];
        }
        let mut lines = vec![format!("{} event(s), {} retained", log.total(), log.len())];
        lines.extend(log.oldest_first().map(|record| format!("  {record}")));
        lines
    }

    fn overwrite(&self, word: u32) -> Vec<String> {
        match FileStore::overwrite(&self.store_path, word) {
            Ok(()) => vec![format!("stored {}", ResetRecord::from_word(word))],
            Err(err) => vec![format!("ERR write {}: {err}", self.store_path.display())],
        }
    }

    fn erase(&self) -> Vec<String> {
        match FileStore::erase(&self.store_path) {
            Ok(()) => vec![format!("erased {}", self.store_path.display())],
            Err(err) => vec![format!("ERR erase {}: {err}", self.store_path.display())],
        }
    }
}

fn handle_help(topic: Option<&str>) -> Vec<String> {
    match topic {
        None => {
            let mut lines = vec![format!("Available commands: {}", help_topic_list())];
            lines.extend(HELP_TOPICS.iter().map(|(_, text)| format!("  {text}")));
            lines.push("  exit | quit           - leave the emulator".to_string());
            lines
        }
        Some(topic) => match HELP_TOPICS
            .iter()
            .find(|(name, _)| name.eq_ignore_ascii_case(topic))
        {
            Some((_, text)) => vec![(*text).to_string()],
            None => vec![format!(
                "ERR unknown help topic `{topic}`; available: {}",
                help_topic_list()
            )],
        },
    }
}

fn help_topic_list() -> String {
    HELP_TOPICS
        .iter()
        .map(|(name, _)| *name)
        .collect::<Vec<_>>()
        .join(", ")
}

fn format_duration(duration: Duration) -> String {
    if duration.subsec_millis() == 0 {
        format!("{}s", duration.as_secs())
    } else {
        format!("{}ms", duration.as_millis())
    }
}

struct TranscriptLogger {
    writer: BufWriter<std::fs::File>,
}

impl TranscriptLogger {
    fn new(path: &Path, config: &DetectorConfig) -> io::Result<Self> {
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
        writeln!(logger.writer, "# Multi-reset detector emulator transcript")?;
        writeln!(
            logger.writer,
            "# threshold={} timeout={}; timestamps are host milliseconds since start",
            config.threshold,
            format_duration(config.timeout)
        )?;
        writeln!(logger.writer)?;
        logger.writer.flush()?;
        Ok(logger)
    }

    fn append_line(
        &mut self,
        elapsed: Duration,
        role: TranscriptRole,
        line: &str,
    ) -> io::Result<()> {
        writeln!(
            self.writer,
            "[+{:>6} ms] {} {}",
            elapsed.as_millis(),
            role.prefix(),
            line
        )?;
        self.writer.flush()
    }
}

enum TranscriptRole {
    Host,
    Emulator,
}

impl TranscriptRole {
    fn prefix(&self) -> &'static str {
        match self {
            TranscriptRole::Host => "HOST>",
            TranscriptRole::Emulator => "EMU <",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn session(name: &str) -> (Session, PathBuf) {
        let path = std::env::temp_dir().join(format!(
            "detector-session-{}-{name}.dat",
            std::process::id()
        ));
        FileStore::erase(&path).unwrap();
        (Session::new(DetectorConfig::default(), &path), path)
    }

    fn run(session: &mut Session, line: &str) -> String {
        session.handle_command(line).unwrap().join("\n")
    }

    #[test]
    fn rapid_boots_from_garbage_detect_on_the_fourth() {
        let (mut session, path) = session("garbage");
        run(&mut session, "raw deadbeef");

        for _ in 0..3 {
            let output = run(&mut session, "boot");
            assert!(output.contains("normal boot"), "{output}");
        }
        let output = run(&mut session, "boot");
        assert!(output.contains("MULTI-RESET DETECTED"), "{output}");

        let status = run(&mut session, "status");
        assert!(status.contains("0xFFFE0001"), "{status}");
        FileStore::erase(&path).unwrap();
    }

    #[test]
    fn waiting_out_the_window_restarts_the_cycle() {
        let (mut session, path) = session("timeout");
        run(&mut session, "boot");
        run(&mut session, "boot");

        let output = run(&mut session, "wait 5s");
        assert!(output.contains("5s remaining"), "{output}");
        let output = run(&mut session, "wait 5s");
        assert!(output.contains("window closed, record cleared"), "{output}");

        let output = run(&mut session, "boot");
        assert!(output.contains("count=2"), "{output}");
        FileStore::erase(&path).unwrap();
    }

    #[test]
    fn cancel_clears_before_the_timeout() {
        let (mut session, path) = session("cancel");
        run(&mut session, "boot");
        run(&mut session, "boot");
        let output = run(&mut session, "cancel");
        assert!(output.contains("0xFFFE0001"), "{output}");

        let output = run(&mut session, "boot");
        assert!(output.contains("count=2"), "{output}");
        FileStore::erase(&path).unwrap();
    }

    #[test]
    fn fresh_store_boots_without_a_fault() {
        let (mut session, path) = session("fresh");
        let output = run(&mut session, "boot");
        assert!(output.contains("count=1"), "{output}");
        assert!(!output.contains("fault"), "{output}");

        let status = run(&mut session, "status");
        assert!(status.contains("fault=none"), "{status}");
        FileStore::erase(&path).unwrap();
    }

    #[test]
    fn corrupt_word_is_reported_in_events() {
        let (mut session, path) = session("corrupt");
        run(&mut session, "raw 12345678");
        run(&mut session, "boot");

        let events = run(&mut session, "events");
        assert!(events.contains("record-read 0x12345678"), "{events}");
        assert!(events.contains("record-corrupt"), "{events}");
        assert!(events.contains("window-armed count=1"), "{events}");
        FileStore::erase(&path).unwrap();
    }

    #[test]
    fn commands_before_boot_and_junk_are_rejected() {
        let (mut session, _) = session("idle");
        assert_eq!(run(&mut session, "wait 1s"), NO_BOARD);
        assert!(run(&mut session, "jump").starts_with("ERR"));
        assert!(run(&mut session, "help wait").starts_with("wait <duration>"));
        assert!(run(&mut session, "help nope").starts_with("ERR unknown help topic"));
    }
}
