//! Reading the controller's error queue after each command.

use crate::{
	channel::CommandChannel,
	backend::Backend,
	command::{ERROR_COUNT, NEXT_ERROR},
	error::{ControllerError, DrainLimitExceededError, Error, ErrorRecord, MalformedReplyError},
};

/// How much of the controller's error queue is read when it is not empty.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Hash)]
pub enum DrainPolicy {
	/// Stop at the first record with a nonzero code and report it.
	///
	/// Any records queued behind it remain on the controller and will be
	/// reported after the next command.
	#[default]
	FirstError,
	/// Read records until the queue is empty, then report the first nonzero
	/// record along with every nonzero record after it.
	Full,
}

/// Reads the error queue until it is empty or an error is found.
#[derive(Debug, Default, Copy, Clone, PartialEq, Eq)]
pub(crate) struct ErrorDrain {
	pub policy: DrainPolicy,
	/// The maximum number of records to read, if any.
	pub limit: Option<usize>,
}

impl ErrorDrain {
	/// Drain the error queue behind `channel`.
	///
	/// The loop only ends when the controller reports an empty queue (or a
	/// nonzero record is found under [`DrainPolicy::FirstError`]), never
	/// because some number of records has been read, unless a limit is set.
	pub fn drain<B: Backend>(&self, channel: &mut CommandChannel<B>) -> Result<(), Error> {
		let mut errors = Vec::new();
		let mut reads = 0;
		while error_count(channel)? > 0 {
			if let Some(limit) = self.limit {
				if reads >= limit {
					return Err(DrainLimitExceededError { limit }.into());
				}
			}
			let record = next_error(channel)?;
			reads += 1;
			if !record.is_error() {
				log::debug!("controller reported: {record}");
				continue;
			}
			log::warn!("controller error {record}");
			match self.policy {
				DrainPolicy::FirstError => return Err(ControllerError::new(record).into()),
				DrainPolicy::Full => errors.push(record),
			}
		}
		match ControllerError::from_records(errors) {
			Some(err) => Err(err.into()),
			None => Ok(()),
		}
	}
}

/// Query the number of records in the error queue.
fn error_count<B: Backend>(channel: &mut CommandChannel<B>) -> Result<u32, Error> {
	let reply = channel.send_raw(ERROR_COUNT)?;
	reply
		.trim()
		.parse()
		.map_err(|_| MalformedReplyError::new(ERROR_COUNT, &reply, "a record count").into())
}

/// Pop the next record off the error queue.
fn next_error<B: Backend>(channel: &mut CommandChannel<B>) -> Result<ErrorRecord, Error> {
	let reply = channel.send_raw(NEXT_ERROR)?;
	ErrorRecord::from_reply(&reply).ok_or_else(|| {
		MalformedReplyError::new(NEXT_ERROR, &reply, "`<code>,<message>`").into()
	})
}
