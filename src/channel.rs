//! Framing of single commands and their reply lines.

use crate::{
	backend::{Backend, UNKNOWN_BACKEND_NAME},
	error::{Error, MalformedReplyError, ReservedCharacterError},
};
use std::io::{self, Write as _};

/// The byte terminating every command and reply.
pub(crate) const LINE_FEED: u8 = b'\n';
/// Replies may end with `\r\n` instead of a bare `\n`.
const CARRIAGE_RETURN: u8 = b'\r';

/// The direction a line was sent.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum LineDirection {
	/// The line was transmitted to the controller.
	Tx,
	/// The line was received from the controller.
	Recv,
}

/// A callback that is called after a line is either transmitted or received.
///
/// See [`Session::set_line_handler`](crate::Session::set_line_handler) for more details.
pub type LineHandler = Box<dyn FnMut(&str, LineDirection) + Send>;

/// Writes one command and reads back exactly one reply line.
pub(crate) struct CommandChannel<B> {
	/// The underlying backend
	backend: B,
	/// If populated, the error that has "poisoned" the channel. It MUST be
	/// reported before the channel is used for communication again.
	poison: Option<io::Error>,
	/// User supplied line handler
	handler: Option<LineHandler>,
}

impl<B: Backend> std::fmt::Debug for CommandChannel<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("CommandChannel")
			.field("name", &self.backend.name())
			.field("poisoned", &self.poison.is_some())
			.finish_non_exhaustive()
	}
}

impl<B: Backend> CommandChannel<B> {
	/// Create a channel communicating over `backend`.
	pub(crate) fn new(backend: B) -> Self {
		CommandChannel {
			backend,
			poison: None,
			handler: None,
		}
	}

	/// Check if the channel is poisoned and report the error if it exists.
	pub(crate) fn check_poisoned(&mut self) -> Result<(), io::Error> {
		if let Some(poison) = self.poison.take() {
			Err(poison)
		} else {
			Ok(())
		}
	}

	/// Poison the channel so the next exchange reports `e`.
	pub(crate) fn poison(&mut self, e: io::Error) {
		self.poison = Some(e);
	}

	/// Send `command` and return the controller's reply with its terminator
	/// stripped.
	///
	/// There is exactly one write followed by exactly one line read. Transport
	/// errors are returned as they are.
	pub(crate) fn send_raw(&mut self, command: &str) -> Result<String, Error> {
		if command
			.bytes()
			.any(|b| b == LINE_FEED || b == CARRIAGE_RETURN)
		{
			return Err(ReservedCharacterError::new(command).into());
		}
		self.check_poisoned()?;

		let backend_name = self
			.backend
			.name()
			.unwrap_or_else(|| UNKNOWN_BACKEND_NAME.to_string());

		let mut line = Vec::with_capacity(command.len() + 1);
		line.extend_from_slice(command.as_bytes());
		line.push(LINE_FEED);
		log::debug!("{backend_name} TX:   {command}");
		self.backend.write_all(&line)?;
		self.backend.flush()?;
		if let Some(callback) = self.handler.as_mut() {
			(callback)(command, LineDirection::Tx);
		}

		let reply = self.read_line(command)?;
		log::debug!("{backend_name} RECV: {reply}");
		if let Some(callback) = self.handler.as_mut() {
			(callback)(&reply, LineDirection::Recv);
		}
		Ok(reply)
	}

	/// Read bytes up to and including the next line feed.
	fn read_line(&mut self, command: &str) -> Result<String, Error> {
		let mut buf = Vec::with_capacity(64);
		for byte in io::Read::bytes(&mut self.backend) {
			let byte = byte?;
			if byte == LINE_FEED {
				if buf.last() == Some(&CARRIAGE_RETURN) {
					buf.pop();
				}
				return String::from_utf8(buf).map_err(|e| {
					MalformedReplyError::new(
						command,
						&String::from_utf8_lossy(e.as_bytes()),
						"UTF-8 text",
					)
					.into()
				});
			}
			buf.push(byte);
		}
		Err(io::Error::new(
			io::ErrorKind::UnexpectedEof,
			"the transport closed before a complete reply was received",
		)
		.into())
	}

	/// Replace the line handler, returning the previous one.
	pub(crate) fn set_handler(&mut self, handler: Option<LineHandler>) -> Option<LineHandler> {
		std::mem::replace(&mut self.handler, handler)
	}

	pub(crate) fn backend(&self) -> &B {
		&self.backend
	}

	pub(crate) fn backend_mut(&mut self) -> &mut B {
		&mut self.backend
	}

	pub(crate) fn into_backend(self) -> B {
		self.backend
	}
}
