//! Errors reported by the controller through its error queue.

use std::fmt;

define_error_codes! {
    0: No Error,
    1: Syntax Error,
    2: Invalid Command Error,
    3: Overflow Error,
    4: Parse Error,
    5: Too Few Parameters Error,
    6: Too Many Parameters Error,
    7: Invalid Parameter Error,
    8: Wrong Mode Error,
    129: No Sensor Present Error,
    140: Sensor Disabled Error,
    141: Command Overridden Error,
    142: End Stop Reached Error,
    143: Wrong Sensor Type Error,
    144: Could Not Find Reference Mark Error,
    145: Wrong End Effector Type Error,
    146: Movement Locked Error,
    147: Range Limit Reached Error,
    148: Physical Position Unknown Error,
    150: Command Not Processable Error,
    151: Waiting For Trigger Error,
    152: Command Not Triggerable Error,
    153: Command Queue Full Error,
    154: Invalid Component Error,
    155: Invalid Sub Component Error,
    156: Invalid Property Error,
    157: Permission Denied Error,
    159: Power Amplifier Disabled Error,
}

/// A single record read from the controller's error queue.
///
/// A code of [`NO_ERROR`](controller_code::NO_ERROR) marks an informational
/// record. Codes missing from [`controller_code`] are kept as-is.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ErrorRecord {
    code: i32,
    message: Box<str>,
}

impl ErrorRecord {
    /// Create a record from a code and the message the controller supplied.
    pub fn new<M: Into<Box<str>>>(code: i32, message: M) -> Self {
        ErrorRecord {
            code,
            message: message.into(),
        }
    }

    /// Parse the reply to a "next error" query, `<code>,<message>`.
    ///
    /// Quotes around the message are removed. If the controller leaves the
    /// message empty (or omits it), the name from [`controller_code`] is used.
    pub(crate) fn from_reply(reply: &str) -> Option<Self> {
        let (code, message) = reply.split_once(',').unwrap_or((reply, ""));
        let code: i32 = code.trim().parse().ok()?;
        let message = message.trim().trim_matches('"');
        let message = if message.is_empty() {
            controller_code::name(code).unwrap_or_default()
        } else {
            message
        };
        Some(ErrorRecord::new(code, message))
    }

    /// The numeric error code.
    pub fn code(&self) -> i32 {
        self.code
    }

    /// The message, verbatim from the controller.
    pub fn message(&self) -> &str {
        &self.message
    }

    /// The name of the code in the static table, if it is a known code.
    pub fn name(&self) -> Option<&'static str> {
        controller_code::name(self.code)
    }

    /// Whether the record reports an actual error (a nonzero code).
    pub fn is_error(&self) -> bool {
        self.code != controller_code::NO_ERROR
    }
}

impl fmt::Display for ErrorRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.code, self.message)
    }
}

/// The controller reported an error after a command.
///
/// The command may have partially executed on the device; there is no
/// rollback.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ControllerError {
    /// The first nonzero record read from the queue.
    record: ErrorRecord,
    /// Further nonzero records, only populated by a full drain.
    additional: Vec<ErrorRecord>,
}

impl ControllerError {
    /// Create an error from the first nonzero record in the queue.
    pub(crate) fn new(record: ErrorRecord) -> Self {
        ControllerError {
            record,
            additional: Vec::new(),
        }
    }

    /// Create an error from all nonzero records drained from the queue.
    ///
    /// Returns `None` if `records` is empty.
    pub(crate) fn from_records(records: Vec<ErrorRecord>) -> Option<Self> {
        let mut records = records.into_iter();
        let record = records.next()?;
        Some(ControllerError {
            record,
            additional: records.collect(),
        })
    }

    /// The error code of the first error.
    pub fn code(&self) -> i32 {
        self.record.code()
    }

    /// The controller's message for the first error.
    pub fn message(&self) -> &str {
        self.record.message()
    }

    /// The name of the first error's code, if it is a known code.
    pub fn name(&self) -> Option<&'static str> {
        self.record.name()
    }

    /// The first error record.
    pub fn record(&self) -> &ErrorRecord {
        &self.record
    }

    /// Any other error records drained after the first one.
    ///
    /// This is always empty with [`DrainPolicy::FirstError`](crate::DrainPolicy::FirstError).
    pub fn additional(&self) -> &[ErrorRecord] {
        &self.additional
    }

    /// All error records, first error first.
    pub fn records(&self) -> impl Iterator<Item = &ErrorRecord> {
        std::iter::once(&self.record).chain(self.additional.iter())
    }
}

impl std::error::Error for ControllerError {}

impl fmt::Display for ControllerError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "controller error {}", self.record)?;
        if !self.additional.is_empty() {
            write!(f, " (followed by")?;
            for (i, record) in self.additional.iter().enumerate() {
                let sep = if i == 0 { " " } else { "; " };
                write!(f, "{sep}{record}")?;
            }
            write!(f, ")")?;
        }
        Ok(())
    }
}

impl AsRef<ErrorRecord> for ControllerError {
    fn as_ref(&self) -> &ErrorRecord {
        &self.record
    }
}

/// The controller's error queue was still not empty after the configured
/// number of record reads.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DrainLimitExceededError {
    /// The number of records read before giving up.
    pub limit: usize,
}

impl_error_display! {
    DrainLimitExceededError,
    self => "the controller's error queue was not empty after reading {} records", self.limit
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn parse_next_error_reply() {
        let record = ErrorRecord::from_reply("147,Range Limit Reached Error").unwrap();
        assert_eq!(record.code(), 147);
        assert_eq!(record.message(), "Range Limit Reached Error");
        assert!(record.is_error());

        let record = ErrorRecord::from_reply(r#"4,"Parse Error, near ':MOVE'""#).unwrap();
        assert_eq!(record.code(), 4);
        assert_eq!(record.message(), "Parse Error, near ':MOVE'");

        let record = ErrorRecord::from_reply("0,No Error").unwrap();
        assert!(!record.is_error());

        assert_eq!(ErrorRecord::from_reply("garbage"), None);
        assert_eq!(ErrorRecord::from_reply(",Missing code"), None);
    }

    #[test]
    fn missing_message_falls_back_to_table() {
        assert_eq!(
            ErrorRecord::from_reply("1").unwrap().message(),
            "Syntax Error"
        );
        assert_eq!(ErrorRecord::from_reply("142,").unwrap().message(), "End Stop Reached Error");

        // Unmapped codes are kept.
        let record = ErrorRecord::from_reply("999,").unwrap();
        assert_eq!(record.code(), 999);
        assert_eq!(record.message(), "");
        assert_eq!(record.name(), None);
    }

    #[test]
    fn display_contains_code_and_message() {
        let err = ControllerError::new(ErrorRecord::new(147, "Range Limit Reached Error"));
        assert_eq!(
            err.to_string(),
            "controller error 147: Range Limit Reached Error"
        );

        let err = ControllerError::from_records(vec![
            ErrorRecord::new(5, "Too Few Parameters Error"),
            ErrorRecord::new(7, "Invalid Parameter Error"),
        ])
        .unwrap();
        assert_eq!(err.code(), 5);
        assert_eq!(err.additional().len(), 1);
        assert_eq!(
            err.to_string(),
            "controller error 5: Too Few Parameters Error (followed by 7: Invalid Parameter Error)"
        );
        assert_eq!(err.records().count(), 2);
        assert_eq!(ControllerError::from_records(Vec::new()), None);
    }
}
