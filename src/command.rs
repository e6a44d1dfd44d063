//! Inbound line classification
//!
//! A trimmed line starting with `/` is a command, anything else non-empty
//! is chat. The verb is case-insensitive; arguments are split on whitespace
//! into at most three fields so a message body keeps its spaces.

use crate::error::CommandError;

/// Prefix marking a line as a command
pub const COMMAND_PREFIX: char = '/';

/// Parsed client intent for one line
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Plain text for everyone
    Chat(String),
    /// `/nick <newHandle>`, pattern checked at dispatch
    Rename(String),
    /// `/w <handle> <text>`
    DirectMessage { target: String, text: String },
    /// `/list`
    ListUsers,
    /// `/quit`
    Quit,
    /// Any other `/verb`
    Unknown(String),
}

impl Command {
    /// Parse one raw input line
    ///
    /// Returns `Ok(None)` for blank lines and `Err(CommandError::Usage)` when
    /// a known verb is missing its arguments.
    pub fn parse(line: &str) -> Result<Option<Self>, CommandError> {
        let line = line.trim();
        if line.is_empty() {
            return Ok(None);
        }
        if !line.starts_with(COMMAND_PREFIX) {
            return Ok(Some(Self::Chat(line.to_string())));
        }

        let (verb, rest) = split_field(line);
        let (first, rest) = split_field(rest);

        let cmd = match verb.to_lowercase().as_str() {
            "/nick" => {
                if first.is_empty() {
                    return Err(CommandError::Usage("/nick <newNick>"));
                }
                Self::Rename(first.to_string())
            }
            "/w" => {
                if first.is_empty() || rest.is_empty() {
                    return Err(CommandError::Usage("/w <nick> <message>"));
                }
                Self::DirectMessage {
                    target: first.to_string(),
                    text: rest.to_string(),
                }
            }
            "/list" => Self::ListUsers,
            "/quit" => Self::Quit,
            _ => Self::Unknown(verb.to_string()),
        };
        Ok(Some(cmd))
    }
}

/// Split off the first whitespace-delimited field; the remainder has its
/// leading whitespace removed.
fn split_field(s: &str) -> (&str, &str) {
    match s.find(char::is_whitespace) {
        Some(idx) => (&s[..idx], s[idx..].trim_start()),
        None => (s, ""),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_blank_lines_ignored() {
        assert_eq!(Command::parse(""), Ok(None));
        assert_eq!(Command::parse("   \t "), Ok(None));
    }

    #[test]
    fn test_chat_is_trimmed() {
        assert_eq!(
            Command::parse("  hello there  "),
            Ok(Some(Command::Chat("hello there".into())))
        );
    }

    #[test]
    fn test_verb_case_insensitive() {
        assert_eq!(Command::parse("/LIST"), Ok(Some(Command::ListUsers)));
        assert_eq!(Command::parse("/Quit"), Ok(Some(Command::Quit)));
        assert_eq!(
            Command::parse("/NiCk bob"),
            Ok(Some(Command::Rename("bob".into())))
        );
    }

    #[test]
    fn test_nick_takes_second_field_only() {
        assert_eq!(
            Command::parse("/nick   bob   extra words"),
            Ok(Some(Command::Rename("bob".into())))
        );
    }

    #[test]
    fn test_whisper_keeps_body_spaces() {
        assert_eq!(
            Command::parse("/w  bob2   hi there,  friend"),
            Ok(Some(Command::DirectMessage {
                target: "bob2".into(),
                text: "hi there,  friend".into(),
            }))
        );
    }

    #[test]
    fn test_missing_arguments() {
        assert_eq!(
            Command::parse("/nick"),
            Err(CommandError::Usage("/nick <newNick>"))
        );
        assert_eq!(
            Command::parse("/w bob"),
            Err(CommandError::Usage("/w <nick> <message>"))
        );
        assert_eq!(
            Command::parse("/w"),
            Err(CommandError::Usage("/w <nick> <message>"))
        );
    }

    #[test]
    fn test_unknown_verb() {
        assert_eq!(
            Command::parse("/dance now"),
            Ok(Some(Command::Unknown("/dance".into())))
        );
        assert_eq!(Command::parse("/"), Ok(Some(Command::Unknown("/".into()))));
    }
}
