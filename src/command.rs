//! Types and traits for building commands.
//!
//! Any string can be sent as a command, but the typed commands in this module
//! validate their parameters when they are built, so a malformed channel index
//! or an out-of-range argument never reaches the controller:
//!
//! ```
//! # use mcsproto::command::{ChannelCommand, ChannelIndex};
//! # fn wrapper() -> Result<(), mcsproto::error::InvalidArgumentError> {
//! let cmd = ChannelCommand::Move(ChannelIndex::new(2)?, 1500);
//! assert_eq!(cmd.to_string(), ":MOVE2 1500");
//!
//! assert!(ChannelIndex::new(64).is_err());
//! # Ok(())
//! # }
//! ```

use crate::error::InvalidArgumentError;
use std::{borrow::Cow, fmt, str::FromStr};

/// Query the number of records in the controller's error queue.
pub(crate) const ERROR_COUNT: &str = ":SYST:ERR:COUN?";
/// Pop the next record from the controller's error queue.
pub(crate) const NEXT_ERROR: &str = ":SYST:ERR:NEXT?";

/// The command code of trigger index `0`. Trigger indices `0..=255` map to
/// codes `1792..=2047`.
pub const TRIGGER_INDEX_0: u16 = 1792;

/// Anything that can be sent to a controller as a command.
pub trait Command {
    /// The text of the command, excluding the line terminator.
    fn text(&self) -> Cow<'_, str>;
}

impl Command for str {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self)
    }
}

impl Command for String {
    fn text(&self) -> Cow<'_, str> {
        Cow::Borrowed(self.as_str())
    }
}

impl<T: Command + ?Sized> Command for &T {
    fn text(&self) -> Cow<'_, str> {
        (**self).text()
    }
}

/// The zero-based index of a controller channel, in `0..=63`.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ChannelIndex(u8);

impl ChannelIndex {
    /// The largest valid channel index.
    pub const MAX: u8 = 63;

    /// Create a channel index, checking that it is in range.
    pub fn new(index: u8) -> Result<Self, InvalidArgumentError> {
        if index <= Self::MAX {
            Ok(ChannelIndex(index))
        } else {
            Err(InvalidArgumentError::new(
                "channel index",
                index,
                "a value in 0..=63",
            ))
        }
    }

    /// Get the index as an integer.
    pub const fn get(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for ChannelIndex {
    type Error = InvalidArgumentError;
    fn try_from(index: u8) -> Result<Self, Self::Error> {
        ChannelIndex::new(index)
    }
}

impl TryFrom<usize> for ChannelIndex {
    type Error = InvalidArgumentError;
    fn try_from(index: usize) -> Result<Self, Self::Error> {
        u8::try_from(index)
            .map_err(|_| InvalidArgumentError::new("channel index", index, "a value in 0..=63"))
            .and_then(ChannelIndex::new)
    }
}

impl From<ChannelIndex> for u8 {
    fn from(index: ChannelIndex) -> u8 {
        index.0
    }
}

impl fmt::Display for ChannelIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// A baud rate accepted by the controller's RS-232 interface.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub struct BaudRate(u32);

impl BaudRate {
    /// The slowest supported baud rate.
    pub const MIN: u32 = 9_600;
    /// The fastest supported baud rate.
    pub const MAX: u32 = 115_200;

    /// Create a baud rate, checking that it is in range.
    pub fn new(rate: u32) -> Result<Self, InvalidArgumentError> {
        if (Self::MIN..=Self::MAX).contains(&rate) {
            Ok(BaudRate(rate))
        } else {
            Err(InvalidArgumentError::new(
                "baud rate",
                rate,
                "a value in 9600..=115200",
            ))
        }
    }

    /// Get the rate as an integer.
    pub const fn get(self) -> u32 {
        self.0
    }
}

/// Define a closed set of named options that have a numeric code on the wire.
///
/// Names are matched case-insensitively when parsing.
macro_rules! define_symbolic {
    (
        $(#[$attr:meta])*
        pub enum $name:ident ($what:literal) {
            $(
                $(#[$var_attr:meta])*
                $variant:ident = $code:literal => $text:literal
            ),+
            $(,)?
        }
    ) => {
        $(#[$attr])*
        #[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
        pub enum $name {
            $(
                $(#[$var_attr])*
                $variant
            ),+
        }

        impl $name {
            /// The numeric code sent to and received from the controller.
            pub const fn code(self) -> u8 {
                match self {
                    $($name::$variant => $code),+
                }
            }

            /// Look up the option for a numeric code.
            pub const fn from_code(code: u8) -> Option<Self> {
                match code {
                    $($code => Some($name::$variant),)+
                    _ => None,
                }
            }

            /// The symbolic name of the option.
            pub const fn name(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl FromStr for $name {
            type Err = InvalidArgumentError;
            fn from_str(s: &str) -> Result<Self, Self::Err> {
                $(
                    if s.eq_ignore_ascii_case($text) {
                        return Ok($name::$variant);
                    }
                )+
                Err(InvalidArgumentError::new(
                    $what,
                    s,
                    concat!("one of" $(, " `", $text, "`")+),
                ))
            }
        }

        impl TryFrom<&str> for $name {
            type Error = InvalidArgumentError;
            fn try_from(s: &str) -> Result<Self, Self::Error> {
                s.parse()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.name())
            }
        }
    };
}

define_symbolic! {
    /// The direction a positioner moves in to reach safety, e.g. while
    /// searching for its reference mark.
    pub enum Direction ("direction") {
        /// Move forward.
        Forward = 0 => "forward",
        /// Move backward.
        Backward = 1 => "backward",
    }
}

define_symbolic! {
    /// The sensor operation mode of the controller.
    pub enum SensorMode ("sensor mode") {
        /// Sensors are powered off.
        Disabled = 0 => "disabled",
        /// Sensors are always powered.
        Enabled = 1 => "enabled",
        /// Sensors are powered only while needed.
        PowerSave = 2 => "power_save",
    }
}

define_symbolic! {
    /// How a positioner interprets move targets.
    pub enum MoveMode ("move mode") {
        /// Closed-loop move to an absolute position.
        ClosedLoopAbsolute = 0 => "closed_loop_absolute",
        /// Closed-loop move relative to the current position.
        ClosedLoopRelative = 1 => "closed_loop_relative",
        /// Scan to an absolute piezo voltage level.
        ScanAbsolute = 2 => "scan_absolute",
        /// Scan relative to the current piezo voltage level.
        ScanRelative = 3 => "scan_relative",
        /// Open-loop stepping.
        Step = 4 => "step",
    }
}

/// A command addressed to the controller as a whole.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ControllerCommand {
    /// Get the number of channels (`:DEV:NOCH?`).
    ChannelCount,
    /// Get the controller's serial number (`:DEV:SNUM?`).
    SerialNumber,
    /// Reset the controller, equivalent to a power cycle (`*RST`).
    Reset,
    /// Get the number of records in the error queue (`:SYST:ERR:COUN?`).
    ErrorCount,
    /// Pop the next record off the error queue (`:SYST:ERR:NEXT?`).
    NextError,
    /// Get the sensor operation mode (`GSE`).
    GetSensorMode,
    /// Set the sensor operation mode (`SSE<mode>`).
    SetSensorMode(SensorMode),
    /// Execute the commands queued with the given trigger index (`TC<code>`).
    Trigger(u8),
    /// Set the baud rate of the RS-232 interface (`BR<rate>`).
    BaudRate(BaudRate),
    /// Stop all positioners if no command arrives within the given number of
    /// milliseconds. `0` disables the timeout (`K<ms>`).
    KeepAlive(u32),
}

impl fmt::Display for ControllerCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ControllerCommand::ChannelCount => f.write_str(":DEV:NOCH?"),
            ControllerCommand::SerialNumber => f.write_str(":DEV:SNUM?"),
            ControllerCommand::Reset => f.write_str("*RST"),
            ControllerCommand::ErrorCount => f.write_str(ERROR_COUNT),
            ControllerCommand::NextError => f.write_str(NEXT_ERROR),
            ControllerCommand::GetSensorMode => f.write_str("GSE"),
            ControllerCommand::SetSensorMode(mode) => write!(f, "SSE{}", mode.code()),
            ControllerCommand::Trigger(index) => {
                write!(f, "TC{}", TRIGGER_INDEX_0 + u16::from(*index))
            }
            ControllerCommand::BaudRate(rate) => write!(f, "BR{}", rate.get()),
            ControllerCommand::KeepAlive(ms) => write!(f, "K{ms}"),
        }
    }
}

impl Command for ControllerCommand {
    fn text(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

/// A command addressed to a single channel.
///
/// Every command formats to a single line and parses back to the same
/// command:
///
/// ```
/// # use mcsproto::command::{ChannelCommand, ChannelIndex};
/// # fn wrapper() -> Result<(), mcsproto::error::InvalidArgumentError> {
/// let cmd = ChannelCommand::Position(ChannelIndex::new(3)?);
/// assert_eq!(cmd.to_string(), ":CHAN3:POS?");
/// assert_eq!(":CHAN3:POS?".parse::<ChannelCommand>()?, cmd);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum ChannelCommand {
    /// Get the current position (`:CHAN<n>:POS?`).
    Position(ChannelIndex),
    /// Get the name of the attached sensor type (`:CHAN<n>:PTYPE:NAME?`).
    SensorTypeName(ChannelIndex),
    /// Get the movement state (`GS<n>`).
    State(ChannelIndex),
    /// Get the safe direction (`GSD<n>`).
    GetSafeDirection(ChannelIndex),
    /// Set the safe direction (`SSD<n>,<direction>`).
    SetSafeDirection(ChannelIndex, Direction),
    /// Move to a target, interpreted according to the move mode (`:MOVE<n> <target>`).
    Move(ChannelIndex, i64),
    /// Calibrate the sensor (`:CAL<n>`).
    Calibrate(ChannelIndex),
    /// Move to the reference mark (`:REF<n>`).
    FindReferenceMark(ChannelIndex),
    /// Set the move mode (`:CHAN<n>:MMOD <mode>`).
    SetMoveMode(ChannelIndex, MoveMode),
    /// Stop any ongoing motion (`:STOP<n>`).
    Stop(ChannelIndex),
}

impl ChannelCommand {
    /// The channel the command is addressed to.
    pub fn channel(&self) -> ChannelIndex {
        match *self {
            ChannelCommand::Position(channel)
            | ChannelCommand::SensorTypeName(channel)
            | ChannelCommand::State(channel)
            | ChannelCommand::GetSafeDirection(channel)
            | ChannelCommand::SetSafeDirection(channel, _)
            | ChannelCommand::Move(channel, _)
            | ChannelCommand::Calibrate(channel)
            | ChannelCommand::FindReferenceMark(channel)
            | ChannelCommand::SetMoveMode(channel, _)
            | ChannelCommand::Stop(channel) => channel,
        }
    }
}

impl fmt::Display for ChannelCommand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChannelCommand::Position(n) => write!(f, ":CHAN{n}:POS?"),
            ChannelCommand::SensorTypeName(n) => write!(f, ":CHAN{n}:PTYPE:NAME?"),
            ChannelCommand::State(n) => write!(f, "GS{n}"),
            ChannelCommand::GetSafeDirection(n) => write!(f, "GSD{n}"),
            ChannelCommand::SetSafeDirection(n, direction) => {
                write!(f, "SSD{n},{}", direction.code())
            }
            ChannelCommand::Move(n, target) => write!(f, ":MOVE{n} {target}"),
            ChannelCommand::Calibrate(n) => write!(f, ":CAL{n}"),
            ChannelCommand::FindReferenceMark(n) => write!(f, ":REF{n}"),
            ChannelCommand::SetMoveMode(n, mode) => write!(f, ":CHAN{n}:MMOD {}", mode.code()),
            ChannelCommand::Stop(n) => write!(f, ":STOP{n}"),
        }
    }
}

impl Command for ChannelCommand {
    fn text(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }
}

impl FromStr for ChannelCommand {
    type Err = InvalidArgumentError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let unrecognized = || InvalidArgumentError::new("channel command", s, "a channel command");
        let index = |digits: &str| -> Result<ChannelIndex, InvalidArgumentError> {
            if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) {
                return Err(unrecognized());
            }
            digits
                .parse::<u8>()
                .map_err(|_| InvalidArgumentError::new("channel index", digits, "a value in 0..=63"))
                .and_then(ChannelIndex::new)
        };
        let code = |digits: &str| digits.parse::<u8>().map_err(|_| unrecognized());

        if let Some(rest) = s.strip_prefix(":CHAN") {
            let (n, property) = rest.split_once(':').ok_or_else(unrecognized)?;
            let n = index(n)?;
            return match property {
                "POS?" => Ok(ChannelCommand::Position(n)),
                "PTYPE:NAME?" => Ok(ChannelCommand::SensorTypeName(n)),
                _ => {
                    let mode = property.strip_prefix("MMOD ").ok_or_else(unrecognized)?;
                    let mode = MoveMode::from_code(code(mode)?).ok_or_else(|| {
                        InvalidArgumentError::new("move mode", mode, "a code in 0..=4")
                    })?;
                    Ok(ChannelCommand::SetMoveMode(n, mode))
                }
            };
        }
        if let Some(rest) = s.strip_prefix(":MOVE") {
            let (n, target) = rest.split_once(' ').ok_or_else(unrecognized)?;
            let target = target.parse().map_err(|_| unrecognized())?;
            return Ok(ChannelCommand::Move(index(n)?, target));
        }
        if let Some(rest) = s.strip_prefix("SSD") {
            let (n, direction) = rest.split_once(',').ok_or_else(unrecognized)?;
            let direction = Direction::from_code(code(direction)?).ok_or_else(|| {
                InvalidArgumentError::new("direction", direction, "a code in 0..=1")
            })?;
            return Ok(ChannelCommand::SetSafeDirection(index(n)?, direction));
        }
        // `GSD` must be tried before its prefix `GS`.
        let simple: [(&str, fn(ChannelIndex) -> ChannelCommand); 5] = [
            (":CAL", ChannelCommand::Calibrate),
            (":REF", ChannelCommand::FindReferenceMark),
            (":STOP", ChannelCommand::Stop),
            ("GSD", ChannelCommand::GetSafeDirection),
            ("GS", ChannelCommand::State),
        ];
        for (prefix, make) in simple {
            if let Some(n) = s.strip_prefix(prefix) {
                return index(n).map(make);
            }
        }
        Err(unrecognized())
    }
}
