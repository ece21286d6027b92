use std::io;
use std::path::{Path, PathBuf};

#[allow(dead_code)]
#[path = "../command.rs"]
mod command;
#[allow(dead_code)]
#[path = "../session.rs"]
mod session;
#[allow(dead_code)]
#[path = "../store.rs"]
mod store;

use detector_core::DetectorConfig;
use session::Session;
use store::FileStore;

const TRANSCRIPT_DIR: &str = "transcripts";

/// Scripted sessions replayed against a scratch store.
const PROFILES: &[(&str, &[&str])] = &[
    (
        "rapid-resets",
        &["raw deadbeef", "boot", "boot", "boot", "boot", "status"],
    ),
    (
        "window-timeout",
        &[
            "erase", "boot", "boot", "wait 4s", "wait 6s", "boot", "events", "status",
        ],
    ),
    (
        "cancel",
        &["erase", "boot", "boot", "cancel", "wait 20s", "boot", "status"],
    ),
    (
        "corruption",
        &["raw 12345678", "boot", "events", "wait 10s", "status"],
    ),
];

fn main() -> io::Result<()> {
    for (name, script) in PROFILES {
        record_profile(name, script)?;
    }
    Ok(())
}

fn record_profile(name: &str, script: &[&str]) -> io::Result<()> {
    let store = scratch_store(name);
    FileStore::erase(&store)?;

    let transcript = Path::new(TRANSCRIPT_DIR).join(format!("{name}.log"));
    let mut session =
        Session::new(DetectorConfig::default(), &store).with_transcript(&transcript)?;
    for line in script {
        let _ = session.handle_command(line)?;
    }

    FileStore::erase(&store)?;
    println!("wrote {}", transcript.display());
    Ok(())
}

fn scratch_store(name: &str) -> PathBuf {
    std::env::temp_dir().join(format!("detector-transcript-{name}.dat"))
}
