//! Command types for the line protocol

use crate::ProtocolError;

/// Parsed client command
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// get <key>
    Get { key: String },

    /// set <key> <value>...
    Set { key: String, value: String },

    /// ping [message]
    Ping { message: Option<String> },

    /// Anything else, name kept as sent
    Unknown { name: String, args: Vec<String> },
}

impl Command {
    /// Build a command from the words of one line.
    ///
    /// Returns `Ok(None)` for a line with no words.
    pub fn parse(words: Vec<String>) -> Result<Option<Self>, ProtocolError> {
        let mut words = words.into_iter();
        let Some(name) = words.next() else {
            return Ok(None);
        };
        let mut args: Vec<String> = words.collect();

        let cmd = match name.to_lowercase().as_str() {
            "get" => {
                if args.len() != 1 {
                    return Err(ProtocolError::WrongArity("get"));
                }
                Command::Get {
                    key: args.remove(0),
                }
            }
            "set" => {
                if args.len() < 2 {
                    return Err(ProtocolError::WrongArity("set"));
                }
                let key = args.remove(0);
                Command::Set {
                    key,
                    value: args.join(" "),
                }
            }
            "ping" => {
                if args.len() > 1 {
                    return Err(ProtocolError::WrongArity("ping"));
                }
                Command::Ping {
                    message: args.pop(),
                }
            }
            _ => Command::Unknown { name, args },
        };

        Ok(Some(cmd))
    }

    /// Lower-case command name, used for metrics and logs
    pub fn kind(&self) -> &'static str {
        match self {
            Command::Get { .. } => "get",
            Command::Set { .. } => "set",
            Command::Ping { .. } => "ping",
            Command::Unknown { .. } => "unknown",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::tokenize;

    fn parse(line: &str) -> Result<Option<Command>, ProtocolError> {
        Command::parse(tokenize(line).unwrap())
    }

    #[test]
    fn test_parse_get() {
        assert_eq!(
            parse("GET bacon").unwrap(),
            Some(Command::Get {
                key: "bacon".to_string()
            })
        );
        assert_eq!(parse("GET"), Err(ProtocolError::WrongArity("get")));
        assert_eq!(
            parse("GET bacon cabbage"),
            Err(ProtocolError::WrongArity("get"))
        );
    }

    #[test]
    fn test_parse_set() {
        assert_eq!(
            parse("set bacon tasty").unwrap(),
            Some(Command::Set {
                key: "bacon".to_string(),
                value: "tasty".to_string()
            })
        );
        assert_eq!(parse("SET bacon"), Err(ProtocolError::WrongArity("set")));
    }

    #[test]
    fn test_parse_set_joins_value_words() {
        assert_eq!(
            parse(r#"SET greeting hello "big world""#).unwrap(),
            Some(Command::Set {
                key: "greeting".to_string(),
                value: "hello big world".to_string()
            })
        );
    }

    #[test]
    fn test_parse_ping() {
        assert_eq!(
            parse("PING").unwrap(),
            Some(Command::Ping { message: None })
        );
        assert_eq!(
            parse(r#"ping "hello world""#).unwrap(),
            Some(Command::Ping {
                message: Some("hello world".to_string())
            })
        );
        assert_eq!(
            parse("PING hello world"),
            Err(ProtocolError::WrongArity("ping"))
        );
    }

    #[test]
    fn test_parse_unknown_keeps_name() {
        assert_eq!(
            parse("BACON test").unwrap(),
            Some(Command::Unknown {
                name: "BACON".to_string(),
                args: vec!["test".to_string()]
            })
        );
    }

    #[test]
    fn test_parse_empty() {
        assert_eq!(Command::parse(Vec::new()).unwrap(), None);
    }
}
