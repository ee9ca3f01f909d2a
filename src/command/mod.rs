//! Command parsing: turns input lines into [`Command`]s or [`CommandError`](crate::CommandError)s.

mod parse;

pub use parse::{Command, MAX_DELAY, MAX_MESSAGE_LEN, Verb, parse_line};
