//! Errors detected locally, either before a command is sent or while
//! interpreting a reply.

use std::fmt;

/// An argument to a command was out of range or not recognized.
///
/// This is reported before anything is sent to the controller.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct InvalidArgumentError {
    /// What the argument represents.
    name: &'static str,
    /// The rejected value.
    value: Box<str>,
    /// A description of the accepted values.
    expected: &'static str,
}

impl InvalidArgumentError {
    /// Create a new error.
    pub fn new<V: fmt::Display>(name: &'static str, value: V, expected: &'static str) -> Self {
        InvalidArgumentError {
            name,
            value: value.to_string().into_boxed_str(),
            expected,
        }
    }

    /// What the argument represents, e.g. `"channel index"`.
    pub fn name(&self) -> &'static str {
        self.name
    }

    /// The rejected value.
    pub fn value(&self) -> &str {
        &self.value
    }
}

impl_error_display! {
    InvalidArgumentError,
    self => "invalid {} `{}`: expected {}", self.name, self.value, self.expected
}

/// A command contained a line terminator, which would split it into
/// more than one command on the wire.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ReservedCharacterError(Box<str>);

impl ReservedCharacterError {
    /// Create a new error.
    pub(crate) fn new(command: &str) -> Self {
        ReservedCharacterError(command.into())
    }

    /// The offending command.
    pub fn command(&self) -> &str {
        &self.0
    }
}

impl_error_display! {
    ReservedCharacterError,
    self => "command contains a line terminator: {:?}", self.0
}

error_enum! {
    /// An argument or command was rejected without any communication taking place.
    #[derive(Debug, Clone, PartialEq, Eq)]
    pub enum ValidationError {
        InvalidArgument(InvalidArgumentError),
        ReservedCharacter(ReservedCharacterError),
    }
}

/// A reply from the controller could not be interpreted.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct MalformedReplyError {
    /// The command that elicited the reply.
    command: Box<str>,
    /// The reply, lossily converted to UTF-8 if necessary.
    reply: Box<str>,
    /// A description of what was expected.
    expected: &'static str,
}

impl MalformedReplyError {
    /// Create a new error.
    pub(crate) fn new(command: &str, reply: &str, expected: &'static str) -> Self {
        MalformedReplyError {
            command: command.into(),
            reply: reply.into(),
            expected,
        }
    }

    /// The command that elicited the reply.
    pub fn command(&self) -> &str {
        &self.command
    }

    /// The reply.
    pub fn reply(&self) -> &str {
        &self.reply
    }
}

impl_error_display! {
    MalformedReplyError,
    self => "unexpected reply to `{}`: {:?} (expected {})", self.command, self.reply, self.expected
}

/// A channel reported a sensor code that no axis class exists for.
///
/// The enumeration that encountered it is abandoned and no axes are
/// registered.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct UnknownSensorCodeError {
    /// The zero-based channel index.
    pub channel: u8,
    /// The sensor code the channel reported.
    pub code: Box<str>,
}

impl_error_display! {
    UnknownSensorCodeError,
    self => "failed to create axis {}: there is no axis class for sensor code `{}`", self.channel, self.code
}
