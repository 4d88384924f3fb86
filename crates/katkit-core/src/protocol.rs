//! Message types for the device-control protocol.
//!
//! Every unit of communication is a [`Message`] with one of three roles:
//!
//! - **Request** (`?name`): sent by a client, expects exactly one reply
//! - **Reply** (`!name`): the single response correlated with a request
//! - **Inform** (`#name`): an informational message, either tied to a
//!   request (sharing its correlation id) or asynchronous
//!
//! The transport owns the wire encoding. This module only provides the
//! canonical string form used for logging and for message comparisons.
//!
//! # Example
//!
//! ```rust
//! use katkit_core::protocol::{Message, MessageId};
//!
//! let request = Message::request("sensor-value").arg("an.int").with_mid(MessageId::new(7));
//! assert_eq!(request.to_string(), "?sensor-value[7] an.int");
//!
//! let reply = Message::reply_to(&request).arg("ok").arg("1");
//! assert!(reply.reply_ok());
//! assert_eq!(reply.to_string(), "!sensor-value[7] ok 1");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;

/// Status argument of a successful reply.
pub const OK: &str = "ok";
/// Status argument of a reply whose request failed.
pub const FAIL: &str = "fail";
/// Status argument of a reply to a malformed or unknown request.
pub const INVALID: &str = "invalid";

/// The role a message plays in an exchange.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    /// A request, expecting exactly one reply.
    Request,
    /// The reply to a request.
    Reply,
    /// An informational message.
    Inform,
}

impl MessageKind {
    /// The leading character of the canonical form.
    #[must_use]
    pub const fn type_char(self) -> char {
        match self {
            Self::Request => '?',
            Self::Reply => '!',
            Self::Inform => '#',
        }
    }
}

impl fmt::Display for MessageKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Request => "request",
            Self::Reply => "reply",
            Self::Inform => "inform",
        };
        f.write_str(name)
    }
}

/// A correlation id.
///
/// Requests optionally carry one; the reply and any informs produced while
/// handling that request echo it back.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MessageId(u64);

impl MessageId {
    /// Create a correlation id.
    #[must_use]
    pub const fn new(id: u64) -> Self {
        Self(id)
    }

    /// The numeric value.
    #[must_use]
    pub const fn get(self) -> u64 {
        self.0
    }
}

impl From<u64> for MessageId {
    fn from(id: u64) -> Self {
        Self(id)
    }
}

impl fmt::Display for MessageId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A protocol message.
///
/// The [`Display`](fmt::Display) implementation renders the canonical
/// string form, e.g. `!new-command[3] ok param1 param2`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Message {
    /// The message role.
    pub kind: MessageKind,
    /// The message name, e.g. `sensor-value`.
    pub name: String,
    /// Ordered string arguments.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<String>,
    /// The correlation id, if any.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mid: Option<MessageId>,
}

impl Message {
    /// Create a message with no arguments and no correlation id.
    #[must_use]
    pub fn new(kind: MessageKind, name: impl Into<String>) -> Self {
        Self {
            kind,
            name: name.into(),
            arguments: Vec::new(),
            mid: None,
        }
    }

    /// Create a request.
    #[must_use]
    pub fn request(name: impl Into<String>) -> Self {
        Self::new(MessageKind::Request, name)
    }

    /// Create a reply.
    #[must_use]
    pub fn reply(name: impl Into<String>) -> Self {
        Self::new(MessageKind::Reply, name)
    }

    /// Create an inform.
    #[must_use]
    pub fn inform(name: impl Into<String>) -> Self {
        Self::new(MessageKind::Inform, name)
    }

    /// Create a reply to `request`, echoing its name and correlation id.
    #[must_use]
    pub fn reply_to(request: &Self) -> Self {
        Self {
            kind: MessageKind::Reply,
            name: request.name.clone(),
            arguments: Vec::new(),
            mid: request.mid,
        }
    }

    /// Create an inform tied to `request`, echoing its name and correlation id.
    #[must_use]
    pub fn reply_inform(request: &Self) -> Self {
        Self {
            kind: MessageKind::Inform,
            name: request.name.clone(),
            arguments: Vec::new(),
            mid: request.mid,
        }
    }

    /// Append one argument.
    #[must_use]
    pub fn arg(mut self, argument: impl Into<String>) -> Self {
        self.arguments.push(argument.into());
        self
    }

    /// Append several arguments.
    #[must_use]
    pub fn args<I, S>(mut self, arguments: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.arguments.extend(arguments.into_iter().map(Into::into));
        self
    }

    /// Set the correlation id.
    #[must_use]
    pub fn with_mid(mut self, mid: impl Into<MessageId>) -> Self {
        self.mid = Some(mid.into());
        self
    }

    /// Check if this is a request.
    #[must_use]
    pub const fn is_request(&self) -> bool {
        matches!(self.kind, MessageKind::Request)
    }

    /// Check if this is a reply.
    #[must_use]
    pub const fn is_reply(&self) -> bool {
        matches!(self.kind, MessageKind::Reply)
    }

    /// Check if this is an inform.
    #[must_use]
    pub const fn is_inform(&self) -> bool {
        matches!(self.kind, MessageKind::Inform)
    }

    /// Get an argument by position.
    #[must_use]
    pub fn argument(&self, index: usize) -> Option<&str> {
        self.arguments.get(index).map(String::as_str)
    }

    /// Check if this is a reply whose first argument is `ok`.
    #[must_use]
    pub fn reply_ok(&self) -> bool {
        self.is_reply() && self.argument(0) == Some(OK)
    }

    /// The error text a failure reply carries in its second argument.
    #[must_use]
    pub fn error_text(&self) -> Option<&str> {
        self.argument(1)
    }
}

impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", self.kind.type_char(), self.name)?;
        if let Some(mid) = self.mid {
            write!(f, "[{mid}]")?;
        }
        for argument in &self.arguments {
            write!(f, " {}", escape_argument(argument))?;
        }
        Ok(())
    }
}

/// Escape one argument for the canonical form.
///
/// Whitespace and control characters are replaced by backslash escapes so
/// that arguments stay space-separated; an empty argument becomes `\@`.
#[must_use]
pub fn escape_argument(argument: &str) -> String {
    if argument.is_empty() {
        return "\\@".to_string();
    }
    let mut escaped = String::with_capacity(argument.len());
    for c in argument.chars() {
        match c {
            '\\' => escaped.push_str("\\\\"),
            ' ' => escaped.push_str("\\_"),
            '\0' => escaped.push_str("\\0"),
            '\n' => escaped.push_str("\\n"),
            '\r' => escaped.push_str("\\r"),
            '\x1b' => escaped.push_str("\\e"),
            '\t' => escaped.push_str("\\t"),
            other => escaped.push(other),
        }
    }
    escaped
}
