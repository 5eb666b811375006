//! Shell-style line tokenizer
//!
//! Rules:
//! - unquoted whitespace separates words
//! - `'...'` is taken literally
//! - `"..."` groups words; a backslash inside escapes the next character
//! - a backslash outside quotes escapes the next character
//! - quoted and unquoted pieces with no whitespace between form one word,
//!   so `""` on its own is an empty word
//! - `#` is an ordinary character; there is no comment syntax

use crate::ProtocolError;

#[derive(Clone, Copy, PartialEq, Eq)]
enum State {
    /// Between words
    Start,
    InWord,
    SingleQuoted,
    DoubleQuoted,
}

/// Split a command line into words
pub fn tokenize(line: &str) -> Result<Vec<String>, ProtocolError> {
    let mut words = Vec::new();
    let mut word = String::new();
    let mut state = State::Start;
    let mut chars = line.chars();

    while let Some(c) = chars.next() {
        match state {
            State::Start | State::InWord => match c {
                c if c.is_whitespace() => {
                    if state == State::InWord {
                        words.push(std::mem::take(&mut word));
                        state = State::Start;
                    }
                }
                '\'' => state = State::SingleQuoted,
                '"' => state = State::DoubleQuoted,
                '\\' => {
                    word.push(chars.next().ok_or(ProtocolError::TrailingEscape)?);
                    state = State::InWord;
                }
                c => {
                    word.push(c);
                    state = State::InWord;
                }
            },
            State::SingleQuoted => match c {
                '\'' => state = State::InWord,
                c => word.push(c),
            },
            State::DoubleQuoted => match c {
                '"' => state = State::InWord,
                '\\' => word.push(chars.next().ok_or(ProtocolError::UnterminatedQuote)?),
                c => word.push(c),
            },
        }
    }

    match state {
        State::SingleQuoted | State::DoubleQuoted => Err(ProtocolError::UnterminatedQuote),
        State::InWord => {
            words.push(word);
            Ok(words)
        }
        State::Start => Ok(words),
    }
}
