//! Line-oriented text protocol (GET/SET/PING)

pub mod command;
pub mod response;
pub mod tokenizer;

pub use command::Command;
pub use response::ResponseWriter;
pub use tokenizer::tokenize;
