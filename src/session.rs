//! Types for opening a connection to a controller and exchanging commands.

mod options;
#[cfg(test)]
mod test;

#[cfg(any(test, feature = "mock"))]
use crate::backend::Mock;
use crate::{
	backend::{Backend, Serial},
	channel::{CommandChannel, LineDirection, LineHandler},
	command::Command,
	drain::{DrainPolicy, ErrorDrain},
	error::{Error, MalformedReplyError},
	timeout_guard::TimeoutGuard,
};
pub use options::*;
use std::{
	io,
	net::{TcpStream, ToSocketAddrs},
	str::FromStr,
	time::Duration,
};

/// A connection to a controller.
///
/// Every command is followed by a check of the controller's error queue. A
/// command only succeeds if the queue holds no errors afterwards, so a reply
/// is never returned together with an error the command caused:
///
/// ```
/// # use mcsproto::Session;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = Session::open_serial("/dev/ttyUSB0")?;
/// let count: u8 = session.query(":DEV:NOCH?")?;
/// # Ok(())
/// # }
/// ```
///
/// How much of the queue is read when it is not empty is controlled by the
/// [`DrainPolicy`].
///
/// A session is `Send` so long as its backend is, and so can be shared between
/// threads behind a [`Mutex`](std::sync::Mutex). Commands are never
/// interleaved: each command and its queue check hold `&mut self` throughout.
pub struct Session<B> {
	/// Framing of commands and replies
	channel: CommandChannel<B>,
	/// How the error queue is checked after every command
	drain: ErrorDrain,
}

impl<B: Backend> std::fmt::Debug for Session<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Session")
			.field("channel", &self.channel)
			.field("drain_policy", &self.drain.policy)
			.field("drain_limit", &self.drain.limit)
			.finish()
	}
}

impl Session<Serial> {
	/// Open the serial port at the specified path using the default options.
	///
	/// Alternatively, use [`Session::open_serial_options`] to customize how the port is opened.
	///
	/// ## Example
	///
	/// ```rust
	/// # use mcsproto::Session;
	/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
	/// let mut session = Session::open_serial("/dev/ttyUSB0")?;
	/// // Or equivalently
	/// let mut session = Session::open_serial_options().open("/dev/ttyUSB0")?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn open_serial(path: &str) -> Result<Session<Serial>, Error> {
		OpenSerialOptions::new().open(path)
	}

	/// Get an [`OpenSerialOptions`] to customize how a serial port is opened.
	pub fn open_serial_options() -> OpenSerialOptions {
		OpenSerialOptions::default()
	}
}

impl Session<TcpStream> {
	/// Open a TCP connection to the specified address using the default options.
	///
	/// Alternatively, use [`Session::open_tcp_options`] to customize how the connection is opened.
	///
	/// ## Example
	///
	/// ```rust
	/// # use mcsproto::Session;
	/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
	/// let mut session = Session::open_tcp("192.168.1.200:55551")?;
	/// // Or equivalently
	/// let mut session = Session::open_tcp_options().open("192.168.1.200:55551")?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn open_tcp<A: ToSocketAddrs>(address: A) -> Result<Session<TcpStream>, io::Error> {
		OpenTcpOptions::default().open(address)
	}

	/// Get an [`OpenTcpOptions`] to customize how a TCP connection is opened.
	pub fn open_tcp_options() -> OpenTcpOptions {
		OpenTcpOptions::default()
	}
}

#[cfg(any(test, feature = "mock"))]
#[cfg_attr(all(doc, feature = "doc_cfg"), doc(cfg(feature = "mock")))]
impl Session<Mock> {
	/// Open a session over a [`Mock`] backend, for testing.
	pub fn open_mock() -> Session<Mock> {
		Session::from_backend(Mock::new())
	}
}

impl<B: Backend> Session<B> {
	/// Create a session over an already opened backend.
	///
	/// The drain policy is [`DrainPolicy::FirstError`] with no limit.
	pub fn from_backend(backend: B) -> Self {
		Session {
			channel: CommandChannel::new(backend),
			drain: ErrorDrain::default(),
		}
	}

	/// Create a session with a custom drain configuration.
	pub(crate) fn with_drain(backend: B, policy: DrainPolicy, limit: Option<usize>) -> Self {
		Session {
			channel: CommandChannel::new(backend),
			drain: ErrorDrain { policy, limit },
		}
	}

	/// Send a command, check the controller's error queue, and return the
	/// command's reply.
	///
	/// The reply is returned exactly as received, minus its line terminator.
	/// If the error queue holds an error, it is returned instead of the reply
	/// as an [`Error::Controller`]. Note that the command may still have
	/// (partially) taken effect on the controller.
	///
	/// ## Example
	///
	/// ```rust
	/// # use mcsproto::{Session, command::{ChannelCommand, ChannelIndex}};
	/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
	/// let mut session = Session::open_serial("/dev/ttyUSB0")?;
	/// let reply = session.send_command(ChannelCommand::Position(ChannelIndex::new(0)?))?;
	/// // A plain string works too.
	/// let reply = session.send_command(":CHAN0:POS?")?;
	/// # Ok(())
	/// # }
	/// ```
	pub fn send_command<C: Command>(&mut self, cmd: C) -> Result<String, Error> {
		let text = cmd.text();
		let reply = self.channel.send_raw(&text)?;
		self.drain.drain(&mut self.channel)?;
		Ok(reply)
	}

	/// Send a command and parse its entire reply, ignoring surrounding whitespace.
	pub fn query<C, T>(&mut self, cmd: C) -> Result<T, Error>
	where
		C: Command,
		T: FromStr,
	{
		let text = cmd.text().into_owned();
		let reply = self.send_command(text.as_str())?;
		reply.trim().parse().map_err(|_| {
			MalformedReplyError::new(&text, &reply, std::any::type_name::<T>()).into()
		})
	}

	/// Set the port timeout and return a "scope guard" that will reset the timeout when it goes out of scope.
	///
	/// If no timeout is specified, reads can block indefinitely.
	///
	/// While the guard is in scope, the session can only be accessed through the guard.
	/// However, because the guard implements [`Deref`](std::ops::Deref) and [`DerefMut`](std::ops::DerefMut) callers can treat the guard as the session.
	///
	/// ## Example
	/// ```rust
	/// # use mcsproto::{error::Error, Session, backend::Backend};
	/// # use std::time::Duration;
	/// # fn helper<B: Backend>(mut session: Session<B>) -> Result<String, Error> {
	/// {
	///     let mut guard = session.timeout_guard(Some(Duration::from_secs(30)))?;
	///     // All commands within this scope will use a 30 second timeout
	///     guard.send_command(":REF0")?;
	///
	/// }  // The guard is dropped and the timeout is reset.
	///
	/// // This command uses the original timeout
	/// # Ok(
	/// session.send_command(":CHAN0:POS?")?
	/// # )
	/// # }
	/// ```
	pub fn timeout_guard(
		&mut self,
		timeout: Option<Duration>,
	) -> Result<TimeoutGuard<'_, B, Self>, io::Error> {
		self.channel.check_poisoned()?;

		TimeoutGuard::new(self, timeout)
	}

	/// Report the error that poisoned the session, if any.
	pub(crate) fn check_poisoned(&mut self) -> Result<(), io::Error> {
		self.channel.check_poisoned()
	}

	/// Set how much of the error queue is read after each command.
	///
	/// The previous value is returned.
	pub fn set_drain_policy(&mut self, policy: DrainPolicy) -> DrainPolicy {
		std::mem::replace(&mut self.drain.policy, policy)
	}

	/// Get how much of the error queue is read after each command.
	pub fn drain_policy(&self) -> DrainPolicy {
		self.drain.policy
	}

	/// Set the maximum number of records read from the error queue after a
	/// single command.
	///
	/// If the queue is still not empty after that many records, the command
	/// fails with an [`Error::DrainLimitExceeded`]. `None`, the default, reads
	/// until the queue is empty no matter how long that takes.
	///
	/// The previous value is returned.
	pub fn set_drain_limit(&mut self, limit: Option<usize>) -> Option<usize> {
		std::mem::replace(&mut self.drain.limit, limit)
	}

	/// Get the maximum number of records read from the error queue after a
	/// single command.
	pub fn drain_limit(&self) -> Option<usize> {
		self.drain.limit
	}

	/// Set the read timeout and return the old timeout.
	///
	/// If timeout is `None`, reads will block indefinitely.
	pub fn set_read_timeout(
		&mut self,
		timeout: Option<Duration>,
	) -> Result<Option<Duration>, io::Error> {
		let backend = self.channel.backend_mut();
		let old = backend.read_timeout()?;
		backend.set_read_timeout(timeout)?;
		Ok(old)
	}

	/// Get the read timeout.
	///
	/// If it is `None`, reads will block indefinitely.
	pub fn read_timeout(&self) -> Result<Option<Duration>, io::Error> {
		self.channel.backend().read_timeout()
	}

	/// Get the "name" of the session's backend.
	///
	/// This is often the path passed to [`Session::open_serial`] or the address
	/// of the controller.
	pub fn name(&self) -> Option<String> {
		self.channel.backend().name()
	}

	/// Get a reference to the backend.
	pub fn backend(&self) -> &B {
		self.channel.backend()
	}

	/// Get a mutable reference to the backend.
	///
	/// Anything written to or read from the backend directly bypasses the
	/// error queue check.
	pub fn backend_mut(&mut self) -> &mut B {
		self.channel.backend_mut()
	}

	/// Consume the session and return the underlying backend.
	pub fn into_backend(self) -> B {
		self.channel.into_backend()
	}

	/// Set a callback that will be called immediately after any line is sent
	/// or received, including the error queue queries.
	///
	/// If a previous callback was set, it is returned.
	///
	/// The session already logs every line via the [`log`] crate, so logging is
	/// best handled by a logger such as [`simple_logger`](https://crates.io/crates/simple_logger).
	/// A callback is useful when the lines are needed directly, for instance
	/// to show them in an application.
	///
	/// ## Example
	///
	/// ```
	/// # use mcsproto::Session;
	/// # use std::sync::{Arc, Mutex};
	/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
	/// let lines = Arc::new(Mutex::new(Vec::new()));
	/// let mut session = Session::open_serial("/dev/ttyUSB0")?;
	/// let sink = Arc::clone(&lines);
	/// session.set_line_handler(move |line, dir| {
	///     if let Ok(mut lines) = sink.lock() {
	///         lines.push(format!("{dir:?}: {line}"));
	///     }
	/// });
	/// # Ok(())
	/// # }
	/// ```
	pub fn set_line_handler<F>(&mut self, callback: F) -> Option<LineHandler>
	where
		F: FnMut(&str, LineDirection) + Send + 'static,
	{
		self.channel.set_handler(Some(Box::new(callback)))
	}

	/// Clear any callback registered via [`set_line_handler`](Session::set_line_handler) and return it.
	pub fn clear_line_handler(&mut self) -> Option<LineHandler> {
		self.channel.set_handler(None)
	}
}

impl<B: Backend> crate::timeout_guard::Port<B> for Session<B> {
	fn backend_mut(&mut self) -> &mut B {
		self.channel.backend_mut()
	}
	fn poison(&mut self, e: io::Error) {
		self.channel.poison(e);
	}
}
