//! # Command line parsing and validation.
//!
//! Pure functions: no shared state, no I/O, never blocks.
//!
//! ## Grammar
//! ```text
//! Start_Alarm:   <number> [in=<duration> | every=<duration>] <message...>
//! Replace_Alarm: <number> [in=<duration> | every=<duration>] <message...>
//! Cancel_Alarm:  <number>
//!
//! <duration> := <digits> [ms | s | m | h]        (no unit = seconds, at most MAX_DELAY)
//! ```
//!
//! ## Classification
//! - The verb token is the text before the first `:`, or the first word when
//!   there is no `:` (or the text before it contains spaces).
//! - Unknown verb token ─► [`CommandError::BadCommand`]
//! - Known verb, anything else wrong ─► [`CommandError::IncorrectFormat`]

use std::time::Duration;

use crate::alarms::{AlarmRequest, MessageNumber, RequestKind, Schedule};
use crate::error::CommandError;

/// Longest accepted message, in bytes.
pub const MAX_MESSAGE_LEN: usize = 128;

/// Longest accepted `in=` / `every=` duration (100 years).
pub const MAX_DELAY: Duration = Duration::from_secs(100 * 365 * 24 * 60 * 60);

/// Command verbs understood by the dispatcher.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verb {
    Start,
    Replace,
    Cancel,
}

impl Verb {
    /// Keyword as written on the command line (without the trailing `:`).
    pub fn keyword(self) -> &'static str {
        match self {
            Verb::Start => "Start_Alarm",
            Verb::Replace => "Replace_Alarm",
            Verb::Cancel => "Cancel_Alarm",
        }
    }

    fn from_keyword(token: &str) -> Option<Self> {
        [Verb::Start, Verb::Replace, Verb::Cancel]
            .into_iter()
            .find(|v| v.keyword() == token)
    }
}

/// A validated command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Start(AlarmRequest),
    Replace(AlarmRequest),
    Cancel(MessageNumber),
}

impl Command {
    pub fn verb(&self) -> Verb {
        match self {
            Command::Start(_) => Verb::Start,
            Command::Replace(_) => Verb::Replace,
            Command::Cancel(_) => Verb::Cancel,
        }
    }

    pub fn number(&self) -> MessageNumber {
        match self {
            Command::Start(r) | Command::Replace(r) => r.number,
            Command::Cancel(n) => *n,
        }
    }
}

/// Classifies one input line.
///
/// `default_delay` is used for Start/Replace commands without a schedule token.
///
/// # Example
/// ```
/// use std::time::Duration;
/// use alarmvisor::{Command, CommandError, parse_line};
///
/// let cmd = parse_line("Start_Alarm: 1 hello", Duration::from_secs(5)).unwrap();
/// assert!(matches!(cmd, Command::Start(ref r) if r.message == "hello"));
///
/// let err = parse_line("garbage text", Duration::from_secs(5)).unwrap_err();
/// assert_eq!(err.response(), "Bad command");
/// ```
pub fn parse_line(line: &str, default_delay: Duration) -> Result<Command, CommandError> {
    let line = line.trim();
    let (verb_token, rest) = match line.split_once(':') {
        Some((verb, rest)) if !verb.trim().contains(char::is_whitespace) => (verb.trim(), Some(rest)),
        _ => (line.split_whitespace().next().unwrap_or(""), None),
    };

    let verb = Verb::from_keyword(verb_token).ok_or_else(|| CommandError::BadCommand {
        verb: verb_token.to_string(),
    })?;
    let rest = rest.ok_or_else(|| CommandError::format("missing ':' after verb"))?;

    match verb {
        Verb::Start => parse_request(rest, RequestKind::First, default_delay).map(Command::Start),
        Verb::Replace => {
            parse_request(rest, RequestKind::Replacement, default_delay).map(Command::Replace)
        }
        Verb::Cancel => parse_cancel(rest),
    }
}

fn parse_request(
    rest: &str,
    kind: RequestKind,
    default_delay: Duration,
) -> Result<AlarmRequest, CommandError> {
    let (token, rest) = split_token(rest);
    let number = parse_number(token)?;

    let (token, tail) = split_token(rest);
    let (schedule, message) = match token.and_then(parse_schedule) {
        Some(schedule) => (schedule?, tail),
        None => (
            Schedule::Once {
                after: default_delay,
            },
            rest,
        ),
    };

    let message = message.trim();
    if message.is_empty() {
        return Err(CommandError::format("missing message"));
    }
    if message.len() > MAX_MESSAGE_LEN {
        return Err(CommandError::format(format!(
            "message longer than {MAX_MESSAGE_LEN} bytes"
        )));
    }

    Ok(AlarmRequest::new(number, kind, schedule, message))
}

fn parse_cancel(rest: &str) -> Result<Command, CommandError> {
    let (token, tail) = split_token(rest);
    let number = parse_number(token)?;
    if !tail.trim().is_empty() {
        return Err(CommandError::format("unexpected text after message number"));
    }
    Ok(Command::Cancel(number))
}

fn parse_number(token: Option<&str>) -> Result<MessageNumber, CommandError> {
    let token = token.ok_or_else(|| CommandError::format("missing message number"))?;
    let value: u32 = token
        .parse()
        .map_err(|_| CommandError::format(format!("invalid message number {token:?}")))?;
    MessageNumber::new(value).ok_or_else(|| CommandError::format("message number must be positive"))
}

/// `None` when the token is not a schedule at all (it is then part of the message).
fn parse_schedule(token: &str) -> Option<Result<Schedule, CommandError>> {
    if let Some(value) = token.strip_prefix("in=") {
        return Some(parse_duration(value).map(|after| Schedule::Once { after }));
    }
    if let Some(value) = token.strip_prefix("every=") {
        return Some(parse_duration(value).and_then(|period| {
            if period.is_zero() {
                Err(CommandError::format("period must be greater than zero"))
            } else {
                Ok(Schedule::Every { period })
            }
        }));
    }
    None
}

fn parse_duration(text: &str) -> Result<Duration, CommandError> {
    let bad = || CommandError::format(format!("invalid duration {text:?}"));

    let split = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let (digits, unit) = text.split_at(split);
    if digits.is_empty() {
        return Err(bad());
    }
    let value: u64 = digits.parse().map_err(|_| bad())?;

    let duration = match unit {
        "" | "s" => Duration::from_secs(value),
        "ms" => Duration::from_millis(value),
        "m" => value.checked_mul(60).map(Duration::from_secs).ok_or_else(bad)?,
        "h" => value.checked_mul(3600).map(Duration::from_secs).ok_or_else(bad)?,
        _ => return Err(bad()),
    };
    if duration > MAX_DELAY {
        return Err(CommandError::format(format!("duration {text:?} is too long")));
    }
    Ok(duration)
}

/// Splits off the first whitespace-delimited token.
fn split_token(s: &str) -> (Option<&str>, &str) {
    let s = s.trim_start();
    if s.is_empty() {
        return (None, s);
    }
    match s.find(char::is_whitespace) {
        Some(i) => (Some(&s[..i]), &s[i..]),
        None => (Some(s), ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const DEFAULT: Duration = Duration::from_secs(5);

    fn parse(line: &str) -> Result<Command, CommandError> {
        parse_line(line, DEFAULT)
    }

    fn is_format(res: Result<Command, CommandError>) -> bool {
        matches!(res, Err(CommandError::IncorrectFormat { .. }))
    }

    #[test]
    fn test_start_with_default_schedule() {
        let Command::Start(req) = parse("Start_Alarm: 1 hello").unwrap() else {
            panic!("expected start");
        };
        assert_eq!(req.number.get(), 1);
        assert_eq!(req.message, "hello");
        assert_eq!(req.kind, RequestKind::First);
        assert_eq!(req.schedule, Schedule::Once { after: DEFAULT });
    }

    #[test]
    fn test_start_with_explicit_schedules() {
        let Command::Start(req) = parse("Start_Alarm: 7 in=250ms wake up").unwrap() else {
            panic!("expected start");
        };
        assert_eq!(
            req.schedule,
            Schedule::Once {
                after: Duration::from_millis(250)
            }
        );
        assert_eq!(req.message, "wake up");

        let Command::Replace(req) = parse("Replace_Alarm: 7 every=2m still here").unwrap() else {
            panic!("expected replace");
        };
        assert_eq!(
            req.schedule,
            Schedule::Every {
                period: Duration::from_secs(120)
            }
        );
        assert_eq!(req.kind, RequestKind::Replacement);
    }

    #[test]
    fn test_cancel() {
        assert_eq!(
            parse("Cancel_Alarm: 12").unwrap(),
            Command::Cancel(MessageNumber::new(12).unwrap())
        );
        assert_eq!(parse("  Cancel_Alarm:12  ").unwrap().number().get(), 12);
    }

    #[test]
    fn test_unknown_verb_is_bad_command() {
        for line in ["garbage text", "garbage text: 1 x", "Start: 1 hello", "start_alarm: 1 x"] {
            assert!(
                matches!(parse(line), Err(CommandError::BadCommand { .. })),
                "{line:?} should be a bad command"
            );
        }
    }

    #[test]
    fn test_known_verb_with_broken_arguments_is_incorrect_format() {
        for line in [
            "Start_Alarm 1 hello",
            "Start_Alarm:",
            "Start_Alarm: x hello",
            "Start_Alarm: 0 hello",
            "Start_Alarm: -3 hello",
            "Start_Alarm: 1",
            "Start_Alarm: 1 in=5s",
            "Start_Alarm: 1 in=soon hello",
            "Start_Alarm: 1 every=0 hello",
            "Start_Alarm: 1 in=5d hello",
            "Cancel_Alarm:",
            "Cancel_Alarm: 1 now",
            "Cancel_Alarm 1",
        ] {
            assert!(is_format(parse(line)), "{line:?} should be an incorrect format");
        }
    }

    #[test]
    fn test_message_length_limit() {
        let fits = format!("Start_Alarm: 1 {}", "a".repeat(MAX_MESSAGE_LEN));
        let long = format!("Start_Alarm: 1 {}", "a".repeat(MAX_MESSAGE_LEN + 1));
        assert!(parse(&fits).is_ok());
        assert!(is_format(parse(&long)));
    }

    #[test]
    fn test_duration_units() {
        assert_eq!(parse_duration("3").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("3s").unwrap(), Duration::from_secs(3));
        assert_eq!(parse_duration("40ms").unwrap(), Duration::from_millis(40));
        assert_eq!(parse_duration("2h").unwrap(), Duration::from_secs(7200));
        assert!(parse_duration("").is_err());
        assert!(parse_duration("s").is_err());
        assert!(parse_duration(&format!("{}h", u64::MAX)).is_err());
    }

    #[test]
    fn test_duration_upper_bound() {
        let max_secs = MAX_DELAY.as_secs();
        assert_eq!(parse_duration(&max_secs.to_string()).unwrap(), MAX_DELAY);
        assert!(parse_duration(&(max_secs + 1).to_string()).is_err());
        assert!(parse_duration(&u64::MAX.to_string()).is_err());
        assert!(parse_duration("1000000h").is_err());

        assert!(is_format(parse(&format!("Start_Alarm: 1 in={} hello", u64::MAX))));
        assert!(is_format(parse(&format!("Replace_Alarm: 1 every={}ms hello", u64::MAX))));
    }

    #[test]
    fn test_message_may_contain_colons_and_schedule_like_words() {
        let Command::Start(req) = parse("Start_Alarm: 2 meeting: room in=4").unwrap() else {
            panic!("expected start");
        };
        assert_eq!(req.message, "meeting: room in=4");
        assert_eq!(req.schedule, Schedule::Once { after: DEFAULT });
    }
}
