//! Command grammar for the emulator console.
//!
//! Keywords are case-insensitive. Durations accept `ms`, `s`, or `m`
//! suffixes and default to seconds; raw words are hexadecimal with an
//! optional `0x` prefix.

use std::fmt;
use std::time::Duration;

use winnow::ascii::{Caseless, alpha1, digit1, hex_digit1, space1};
use winnow::combinator::{alt, opt, preceded};
use winnow::error::{ContextError, ErrMode, ModalResult};
use winnow::prelude::*;
use winnow::token::literal;

/// Parsed console command.
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Command<'a> {
    Boot,
    Wait(Duration),
    Cancel,
    Status,
    Events,
    Raw(u32),
    Erase,
    Help(Option<&'a str>),
}

/// Input that did not match the grammar.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct CommandError {
    pub input: String,
    pub offset: usize,
}

impl fmt::Display for CommandError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unexpected input at column {} in `{}`", self.offset + 1, self.input)
    }
}

/// Parses one console line.
pub fn parse_command(line: &str) -> Result<Command<'_>, CommandError> {
    let line = line.trim();
    command.parse(line).map_err(|err| CommandError {
        input: line.to_string(),
        offset: err.offset(),
    })
}

/// Parses a standalone duration literal such as `10s` or `250ms`.
pub fn parse_duration(text: &str) -> Result<Duration, CommandError> {
    let text = text.trim();
    duration.parse(text).map_err(|err| CommandError {
        input: text.to_string(),
        offset: err.offset(),
    })
}

fn command<'a>(input: &mut &'a str) -> ModalResult<Command<'a>> {
    alt((
        keyword("boot").value(Command::Boot),
        keyword("reset").value(Command::Boot),
        preceded((keyword("wait"), space1), duration).map(Command::Wait),
        keyword("cancel").value(Command::Cancel),
        keyword("status").value(Command::Status),
        keyword("events").value(Command::Events),
        preceded((keyword("raw"), space1), hex_word).map(Command::Raw),
        keyword("erase").value(Command::Erase),
        preceded(keyword("help"), opt(preceded(space1, alpha1))).map(Command::Help),
    ))
    .parse_next(input)
}

fn keyword<'a>(word: &'static str) -> impl Parser<&'a str, &'a str, ErrMode<ContextError>> {
    literal(Caseless(word))
}

#[derive(Copy, Clone)]
enum Unit {
    Millis,
    Secs,
    Minutes,
}

fn duration(input: &mut &str) -> ModalResult<Duration> {
    (
        digit1.try_map(|digits: &str| digits.parse::<u64>()),
        opt(alt((
            keyword("ms").value(Unit::Millis),
            keyword("s").value(Unit::Secs),
            keyword("m").value(Unit::Minutes),
        ))),
    )
        .map(|(amount, unit)| match unit.unwrap_or(Unit::Secs) {
            Unit::Millis => Duration::from_millis(amount),
            Unit::Secs => Duration::from_secs(amount),
            Unit::Minutes => Duration::from_secs(amount.saturating_mul(60)),
        })
        .parse_next(input)
}

fn hex_word(input: &mut &str) -> ModalResult<u32> {
    preceded(opt(keyword("0x")), hex_digit1)
        .try_map(|digits: &str| u32::from_str_radix(digits, 16))
        .parse_next(input)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_keywords_case_insensitively() {
        assert_eq!(parse_command("boot"), Ok(Command::Boot));
        assert_eq!(parse_command("  RESET "), Ok(Command::Boot));
        assert_eq!(parse_command("Cancel"), Ok(Command::Cancel));
        assert_eq!(parse_command("status"), Ok(Command::Status));
        assert_eq!(parse_command("events"), Ok(Command::Events));
        assert_eq!(parse_command("erase"), Ok(Command::Erase));
    }

    #[test]
    fn parses_wait_durations() {
        assert_eq!(
            parse_command("wait 11s"),
            Ok(Command::Wait(Duration::from_secs(11)))
        );
        assert_eq!(
            parse_command("wait 250ms"),
            Ok(Command::Wait(Duration::from_millis(250)))
        );
        assert_eq!(
            parse_command("wait 2m"),
            Ok(Command::Wait(Duration::from_secs(120)))
        );
        assert_eq!(parse_duration("7"), Ok(Duration::from_secs(7)));
    }

    #[test]
    fn parses_raw_words_with_or_without_prefix() {
        assert_eq!(parse_command("raw 0xFFFE0001"), Ok(Command::Raw(0xFFFE_0001)));
        assert_eq!(parse_command("raw deadbeef"), Ok(Command::Raw(0xDEAD_BEEF)));
    }

    #[test]
    fn parses_help_topics() {
        assert_eq!(parse_command("help"), Ok(Command::Help(None)));
        assert_eq!(parse_command("help wait"), Ok(Command::Help(Some("wait"))));
    }

    #[test]
    fn rejects_trailing_junk_and_unknown_words() {
        assert!(parse_command("boot now").is_err());
        assert!(parse_command("wait").is_err());
        assert!(parse_command("wait soon").is_err());
        assert!(parse_command("raw 123456789").is_err());
        assert!(parse_command("reboot").is_err());
    }
}
