//! Protocol verbs and their wire codes.

use crate::error::ProtocolError;
use std::fmt;
use std::str::FromStr;

/// Bosswave command verbs.
///
/// Every command is written on the wire as a fixed 4-character code at the
/// start of the frame header.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Command {
    // Messaging
    Publish,
    Persist,
    Subscribe,
    List,
    Query,
    TapSubscribe,
    TapQuery,

    // Entity, DOT and chain management
    PutDot,
    PutEntity,
    PutChain,
    MakeDot,
    MakeEntity,
    MakeChain,
    BuildChain,
    AddPrefDot,
    AddPrefChain,
    DelPrefChain,
    SetEntity,

    // Router to client
    Hello,
    Response,
    Result,
}

impl Command {
    /// All commands, in declaration order.
    pub const ALL: [Command; 21] = [
        Command::Publish,
        Command::Persist,
        Command::Subscribe,
        Command::List,
        Command::Query,
        Command::TapSubscribe,
        Command::TapQuery,
        Command::PutDot,
        Command::PutEntity,
        Command::PutChain,
        Command::MakeDot,
        Command::MakeEntity,
        Command::MakeChain,
        Command::BuildChain,
        Command::AddPrefDot,
        Command::AddPrefChain,
        Command::DelPrefChain,
        Command::SetEntity,
        Command::Hello,
        Command::Response,
        Command::Result,
    ];

    /// Returns the 4-character wire code.
    pub fn code(&self) -> &'static str {
        match self {
            Command::Publish => "publ",
            Command::Persist => "pers",
            Command::Subscribe => "subs",
            Command::List => "list",
            Command::Query => "quer",
            Command::TapSubscribe => "tsub",
            Command::TapQuery => "tque",
            Command::PutDot => "putd",
            Command::PutEntity => "pute",
            Command::PutChain => "putc",
            Command::MakeDot => "makd",
            Command::MakeEntity => "make",
            Command::MakeChain => "makc",
            Command::BuildChain => "bldc",
            Command::AddPrefDot => "adpd",
            Command::AddPrefChain => "adpc",
            Command::DelPrefChain => "dlpc",
            Command::SetEntity => "sete",
            Command::Hello => "helo",
            Command::Response => "resp",
            Command::Result => "rslt",
        }
    }

    /// Looks up a command by its wire code.
    pub fn from_code(code: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.code() == code)
    }
}

impl FromStr for Command {
    type Err = ProtocolError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::from_code(s).ok_or_else(|| ProtocolError::UnknownCommand(s.to_string()))
    }
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}
