mod command;
mod session;
mod store;

use std::env;
use std::io::{self, BufRead, Write};
use std::path::PathBuf;
use std::process;
use std::time::Duration;

use detector_core::DetectorConfig;
use detector_core::config::{DEFAULT_THRESHOLD, DEFAULT_TIMEOUT};

use session::Session;
use store::DEFAULT_STORE_PATH;

const USAGE: &str = "Usage: detector-emulator [--store <path>] [--threshold <n>] \
                     [--timeout <duration>] [--transcript <path>]";

struct Options {
    store: PathBuf,
    threshold: u16,
    timeout: Duration,
    transcript: Option<PathBuf>,
}

fn main() -> io::Result<()> {
    let options = parse_options(env::args().skip(1)).unwrap_or_else(|err| {
        eprintln!("{err}");
        eprintln!("{USAGE}");
        process::exit(2);
    });

    let config = DetectorConfig::new(options.threshold, options.timeout);
    let mut session = Session::new(config, &options.store);
    if let Some(path) = options.transcript.as_deref() {
        session = session.with_transcript(path)?;
    }

    let stdin = io::stdin();
    let mut reader = stdin.lock();
    let stdout = io::stdout();
    let mut writer = stdout.lock();
    let mut line = String::new();

    writeln!(
        writer,
        "Multi-reset detector emulator ready (store {}, threshold {}, timeout {:?}). \
         Type `help` for commands or `exit` to quit.",
        options.store.display(),
        config.threshold,
        config.timeout
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

        let responses = session.handle_command(trimmed)?;
        for response in responses {
            writeln!(writer, "{response}")?;
        }
    }

    Ok(())
}

fn should_terminate(input: &str) -> bool {
    input.eq_ignore_ascii_case("exit") || input.eq_ignore_ascii_case("quit")
}

fn parse_options(mut args: impl Iterator<Item = String>) -> Result<Options, String> {
    let mut options = Options {
        store: PathBuf::from(DEFAULT_STORE_PATH),
        threshold: DEFAULT_THRESHOLD,
        timeout: DEFAULT_TIMEOUT,
        transcript: None,
    };

    while let Some(arg) = args.next() {
        let (flag, inline) = match arg.split_once('=') {
            Some((flag, value)) => (flag.to_string(), Some(value.to_string())),
            None => (arg, None),
        };
        let mut value = || {
            inline
                .clone()
                .or_else(|| args.next())
                .ok_or_else(|| format!("Expected value after {flag}"))
        };

        match flag.as_str() {
            "--store" => options.store = PathBuf::from(value()?),
            "--threshold" => {
                let raw = value()?;
                options.threshold = raw
                    .parse()
                    .map_err(|_| format!("Invalid threshold `{raw}`"))?;
            }
            "--timeout" => {
                let raw = value()?;
                options.timeout = command::parse_duration(&raw)
                    .map_err(|err| format!("Invalid timeout: {err}"))?;
            }
            "--transcript" => options.transcript = Some(PathBuf::from(value()?)),
            _ => return Err(format!("Unknown argument `{flag}`")),
        }
    }

    Ok(options)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Options, String> {
        parse_options(args.iter().map(ToString::to_string))
    }

    #[test]
    fn defaults_match_the_library() {
        let options = parse(&[]).unwrap();
        assert_eq!(options.store, PathBuf::from("mrd.dat"));
        assert_eq!(options.threshold, 3);
        assert_eq!(options.timeout, Duration::from_secs(10));
        assert!(options.transcript.is_none());
    }

    #[test]
    fn accepts_separate_and_inline_values() {
        let options = parse(&["--store", "/tmp/x.dat", "--threshold=5", "--timeout", "1500ms"])
            .unwrap();
        assert_eq!(options.store, PathBuf::from("/tmp/x.dat"));
        assert_eq!(options.threshold, 5);
        assert_eq!(options.timeout, Duration::from_millis(1500));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(parse(&["--threshold", "many"]).is_err());
        assert!(parse(&["--timeout"]).is_err());
        assert!(parse(&["--verbose"]).is_err());
    }
}
