//! Message protocol definitions
//!
//! Plain-text line protocol. Every server → client line is a
//! `ServerMessage` whose `Display` output is the exact wire text; the
//! line terminator is added by the codec.

use std::fmt;

/// Server → Client message
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ServerMessage {
    /// First line on every connection, repeated after an invalid nickname
    LoginPrompt,
    /// Nickname is registered, ask for its password
    PasswordPrompt,
    /// Nickname is unknown, ask for a password to register it
    RegisterPrompt,
    /// Password did not match the stored hash
    InvalidPassword,
    /// Sent to a client right after it joins
    Welcome { nickname: String, members: usize },
    /// Chat line from another member
    Chat { from: String, content: String },
    /// Reply to `/quit`, sent before the connection is closed
    Bye,
    /// Reply to `/nick` (renaming is not supported)
    NickChangeRequested,
    /// Session hit a server-side failure and is being closed
    InternalError,
    /// Login was not completed in time
    LoginTimedOut,
}

impl fmt::Display for ServerMessage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerMessage::LoginPrompt => {
                f.write_str("Please login by entering your unique nickname:")
            }
            ServerMessage::PasswordPrompt => f.write_str("Password:"),
            ServerMessage::RegisterPrompt => {
                f.write_str("This is a new nickname, please enter a password to register:")
            }
            ServerMessage::InvalidPassword => f.write_str("Invalid nickname password, try again:"),
            ServerMessage::Welcome { nickname, members } => write!(
                f,
                "Welcome to our chat {}. The current amount of connections is {}",
                nickname, members
            ),
            ServerMessage::Chat { from, content } => write!(f, "{}> {}", from, content),
            ServerMessage::Bye => f.write_str("Bye!"),
            ServerMessage::NickChangeRequested => {
                f.write_str("You want to change your nickname, good idea")
            }
            ServerMessage::InternalError => {
                f.write_str("Something went wrong on our side, closing connection.")
            }
            ServerMessage::LoginTimedOut => f.write_str("Login timed out, closing connection."),
        }
    }
}

/// Client → Server command, recognized from a joined client's line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChatCommand {
    /// `/quit`: say goodbye and close the connection
    Quit,
    /// `/nick`: acknowledged only
    Nick,
}

impl ChatCommand {
    /// Parse a trimmed line as a command
    ///
    /// The first whitespace-delimited token must be exactly `/quit` or
    /// `/nick` (case-sensitive). Anything else, including `/quitting` or
    /// an unknown `/word`, is ordinary chat text.
    pub fn parse(line: &str) -> Option<Self> {
        let token = line.split_whitespace().next()?;
        match token {
            "/quit" => Some(ChatCommand::Quit),
            "/nick" => Some(ChatCommand::Nick),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            ChatCommand::Quit => "QUIT",
            ChatCommand::Nick => "NICK",
        }
    }
}
