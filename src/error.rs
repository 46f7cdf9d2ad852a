//! Error types.
//!
//! Each error is represented by a unique type that implements [`std::error::Error`].
//! However, most APIs return more than one kind of error and so will return
//! the higher level [`Error`] enum. The error types are convertible to [`Error`],
//! allowing them to be used with `?`:
//!
//! ```
//! use mcsproto::error::{Error, InvalidArgumentError};
//!
//! fn foo() -> Result<(), InvalidArgumentError> {
//!     // ...
//! # unimplemented!();
//! }
//!
//! fn bar() -> Result<(), Error> {
//!     foo()?;
//!     // ...
//! # Ok(())
//! }
//! ```
//!
//! Errors reported by the controller's error queue are surfaced as a
//! [`ControllerError`], which carries the numeric code and the message the
//! controller supplied. Known codes are listed in [`controller_code`].

/// Implement Error and Display traits for the specified type.
///
/// After the type define the format string and any arguments it should
/// reference after `self =>` (to abide by macro hygiene rules).
macro_rules! impl_error_display {
    (
        $name:path,
        $self:ident =>
        $display:literal
        $(,
            $($arg:expr),+
        )?
    ) => {
        impl std::error::Error for $name {}

        impl std::fmt::Display for $name {
            fn fmt(&$self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(
                    f,
                    $display
                    $(,
                        $($arg),+
                    )?
                )
            }
        }
    };
}

macro_rules! impl_is_timeout {
    ($name:ident) => {
        impl $name {
            /// A convenience function for determining if the error is due to the
            /// transport timing out.
            pub fn is_timeout(&self) -> bool {
                matches!(self, $name::Io(e) if e.kind() == std::io::ErrorKind::TimedOut)
            }

            /// A convenience function for determining if the error came from
            /// the underlying transport.
            pub fn is_io(&self) -> bool {
                matches!(self, $name::Io(_) | $name::SerialDeviceInUseOrDisconnected(_))
            }
        }
    };
}

macro_rules! impl_from_serialport_error {
    ($name:ident) => {
        impl From<serialport::Error> for $name {
            fn from(other: serialport::Error) -> Self {
                use std::io;

                match other.kind() {
                    serialport::ErrorKind::NoDevice => $name::SerialDeviceInUseOrDisconnected(
                        SerialDeviceInUseOrDisconnectedError(other.description.into_boxed_str()),
                    ),
                    serialport::ErrorKind::InvalidInput => $name::Io(io::Error::new(
                        io::ErrorKind::InvalidInput,
                        other.description,
                    )),
                    serialport::ErrorKind::Unknown => $name::Io(io::Error::other(other.description)),
                    serialport::ErrorKind::Io(kind) => {
                        $name::Io(io::Error::new(kind, other.description))
                    }
                }
            }
        }
    };
}

/// Define error enums that contain concrete error types (not other error enums).
///
/// From and TryFrom traits will be implemented for the enum and its underlying
/// errors. The enum's Display implementation will defer to the underlying errors'
/// Display implementations.
///
/// Simple implementations of From and TryFrom with other error enums can be
/// added by appending a succinct impl block, which assumes that:
///   * it is being implemented for this error enum,
///   * each variant has a single tuple value, and can be converted to the value
///     in this enum with its own From implementation.
///
/// ```compile_fail
/// # // This fails to compile because the macro is not exported.
/// error_enum!{
///     // This defines the enum and From/TryFrom between ThisError and A and B.
///     #[non_exhaustive]
///     pub enum ThisError {
///         VariantA(A),
///         VariantB(B),
///         // ...
///     }
///
///     // This implements a simple From/TryFrom between ThisError and OtherType.
///     impl From<OtherType> {
///         FromVariantA => VariantA,
///         // ...
///     }
/// }
/// ```
macro_rules! error_enum {
    (
        $(#[$attr:meta])*
        pub enum $name:ident {
            $(
                $variant:ident($inner:path)
            ),+
            $(,)?
        }
        $(
            impl From<$from_t:ident>
            {
                $($from_variant:ident => $to_variant:ident),+
                $(,)?
            }
        )*
    ) => {
        $(
            #[$attr]
        )*
        #[allow(missing_docs)]
        pub enum $name {
            $(
                $variant($inner)
            ),+
        }

        impl std::error::Error for $name {}

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                match self {
                    $(
                        $name::$variant(e) => std::fmt::Display::fmt(e, f)
                    ),+
                }
            }
        }

        impl From<std::convert::Infallible> for $name {
            fn from(never: std::convert::Infallible) -> Self {
                match never {}
            }
        }

        $(
            impl From<$inner> for $name {
                fn from(other: $inner) -> Self {
                    $name::$variant(other)
                }
            }

            impl TryFrom<$name> for $inner {
                type Error = $name;
                fn try_from(other: $name) -> Result<Self, Self::Error> {
                    match other {
                        $name::$variant(value) => Ok(value),
                        value => Err(value)
                    }
                }
            }
        )+

        $(
            impl From<$from_t> for $name {
                fn from(other: $from_t) -> Self {
                    match other {
                        $($from_t::$from_variant(e) => $name::$to_variant(From::from(e))),+
                    }
                }
            }

            impl TryFrom<$name> for $from_t {
                type Error = $name;
                fn try_from(other: $name) -> Result<Self, Self::Error> {
                    match other {
                        $(
                            $name::$to_variant(e) => Ok($from_t::$from_variant(From::from(e)))
                        ),+
                        ,
                        _ => Err(other)
                    }
                }
            }
        )*
    };
}

/// Define the table of error codes reported through the controller's error queue.
///
/// Each entry is `<code>: <words of the name>`. A constant is generated for
/// each code, named after the words in upper snake case, along with a `name`
/// lookup function.
macro_rules! define_error_codes {
    (
        $(
            $num:literal: $($name_word:ident)+
        ),+
        $(,)?
    ) => {
        paste::paste! {
            define_error_codes!{@with_concatenated_name
                $(
                    $num: $($name_word)+, [< $($name_word:camel)+ >]
                 ),+
            }
        }
    };
    (@with_concatenated_name
        $(
            $num:literal: $($name_word:ident)+, $name:ident
        ),+
    ) => {
        paste::paste! {
            pub mod controller_code {
                //! Error codes reported by the controller's error queue.
                //!
                //! The codes in numerical order are:
                #![doc =
                $( "* `" $num "`: [`" $name:snake:upper "`]\n\n" )+
                ]

                $(
                    #[doc = $(" " $name_word " ")+ "(code `" $num "`)." ]
                    pub const [< $name:snake:upper >] : i32 = $num;
                )+

                /// Get the name of an error code.
                ///
                /// If the error code is not recognized, `None` is returned.
                pub const fn name(code: i32) -> Option<&'static str> {
                    match code {
                        $(
                            $num => Some(stringify!($($name_word)+)),
                        )+
                        _ => None,
                    }
                }
            }
        }
    };
}

mod controller;
pub use controller::*;

mod protocol;
pub use protocol::*;

/// The specified device is either disconnected or already in use by another process.
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SerialDeviceInUseOrDisconnectedError(Box<str>);

impl_error_display! {
    SerialDeviceInUseOrDisconnectedError,
    self =>
    "the specified device is either disconnected or already in use by another process: {}", self.0
}

error_enum! {
    /// Any error returned by this library.
    #[derive(Debug)]
    #[non_exhaustive]
    pub enum Error {
        SerialDeviceInUseOrDisconnected(SerialDeviceInUseOrDisconnectedError),
        Io(std::io::Error),
        Controller(ControllerError),
        DrainLimitExceeded(DrainLimitExceededError),
        MalformedReply(MalformedReplyError),
        UnknownSensorCode(UnknownSensorCodeError),
        InvalidArgument(InvalidArgumentError),
        ReservedCharacter(ReservedCharacterError),
    }

    impl From<ValidationError> {
        InvalidArgument => InvalidArgument,
        ReservedCharacter => ReservedCharacter,
    }
}
impl_is_timeout! { Error }
impl_from_serialport_error! { Error }

#[cfg(test)]
mod test {
    use super::controller_code::*;
    use super::*;
    use static_assertions::assert_impl_all;

    assert_impl_all!(Error: Send, Sync, From<std::io::Error>, From<ValidationError>);
    assert_impl_all!(ValidationError: TryFrom<Error>);
    assert_impl_all!(ControllerError: TryFrom<Error>, std::error::Error);

    #[test]
    fn controller_code_names() {
        assert_eq!(name(NO_ERROR), Some("No Error"));
        assert_eq!(name(RANGE_LIMIT_REACHED_ERROR), Some("Range Limit Reached Error"));
        assert_eq!(
            name(COULD_NOT_FIND_REFERENCE_MARK_ERROR),
            Some("Could Not Find Reference Mark Error")
        );
        assert_eq!(RANGE_LIMIT_REACHED_ERROR, 147);
        assert_eq!(SYNTAX_ERROR, 1);
        assert_eq!(POWER_AMPLIFIER_DISABLED_ERROR, 159);
        assert_eq!(name(149), None);
        assert_eq!(name(-1), None);
    }

    #[test]
    fn validation_error_round_trips_through_error() {
        let err: Error = ValidationError::from(InvalidArgumentError::new(
            "direction",
            "sideways",
            "`forward` or `backward`",
        ))
        .into();
        assert!(matches!(err, Error::InvalidArgument(_)));
        assert!(!err.is_io());
        assert!(ValidationError::try_from(err).is_ok());

        let err = Error::from(std::io::Error::new(std::io::ErrorKind::TimedOut, "slow"));
        assert!(err.is_timeout());
        assert!(err.is_io());
        assert!(ValidationError::try_from(err).is_err());
    }
}
