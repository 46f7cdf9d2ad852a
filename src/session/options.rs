//! Types defining the different options when opening a session.

use super::Session;
use crate::{
    backend::{Backend, Serial},
    drain::DrainPolicy,
    error::Error,
};
use serialport as sp;
use std::{
    io,
    net::{TcpStream, ToSocketAddrs},
    time::Duration,
};

/// Options for configuring and opening a serial port.
///
/// ## Example
///
/// ```rust
/// # use mcsproto::{OpenSerialOptions, DrainPolicy};
/// # use std::time::Duration;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = OpenSerialOptions::new()
///     .baud_rate(115_200)
///     .timeout(Some(Duration::from_millis(500)))
///     .drain_policy(DrainPolicy::Full)
///     .open("/dev/ttyUSB0")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenSerialOptions {
    /// The custom baud rate
    baud_rate: u32,
    /// The custom timeout
    timeout: Option<Duration>,
    /// How much of the error queue is read after each command.
    drain_policy: DrainPolicy,
    /// The maximum number of error queue records read after each command.
    drain_limit: Option<usize>,
}

impl OpenSerialOptions {
    /// The factory default baud rate of the controller: 9,600.
    pub const DEFAULT_BAUD_RATE: u32 = 9_600;

    /// Create a blank set of options ready for configuration.
    ///
    /// The default baud rate and read timeout are 9,600 and 3 seconds,
    /// respectively. The error queue is read up to its first error with no limit.
    ///
    /// Equivalent to [`default`](OpenSerialOptions::default).
    pub fn new() -> Self {
        OpenSerialOptions {
            baud_rate: OpenSerialOptions::DEFAULT_BAUD_RATE,
            timeout: Some(Duration::from_secs(3)),
            drain_policy: DrainPolicy::default(),
            drain_limit: None,
        }
    }

    /// Set a custom baud rate.
    ///
    /// The default is 9,600.
    pub fn baud_rate(&mut self, baud_rate: u32) -> &mut Self {
        self.baud_rate = baud_rate;
        self
    }

    /// Set a custom read timeout.
    ///
    /// If duration is `None`, reads will block indefinitely. The default is 3 seconds.
    pub fn timeout(&mut self, duration: Option<Duration>) -> &mut Self {
        self.timeout = duration;
        self
    }

    /// Set how much of the error queue is read after each command.
    ///
    /// The default is [`DrainPolicy::FirstError`].
    pub fn drain_policy(&mut self, policy: DrainPolicy) -> &mut Self {
        self.drain_policy = policy;
        self
    }

    /// Set the maximum number of error queue records read after each command.
    ///
    /// The default is `None` (no limit).
    pub fn drain_limit(&mut self, limit: Option<usize>) -> &mut Self {
        self.drain_limit = limit;
        self
    }

    /// Open a [`Serial`] port configured for the controller at the specified path.
    fn open_serial_port(&self, path: &str) -> Result<Serial, Error> {
        // Some serialport versions ignore the rate passed to `new`, so it is
        // also set explicitly with `baud_rate`.
        sp::new(path, OpenSerialOptions::DEFAULT_BAUD_RATE)
            .data_bits(sp::DataBits::Eight)
            .parity(sp::Parity::None)
            .flow_control(sp::FlowControl::None)
            .stop_bits(sp::StopBits::One)
            // serialport has no infinite timeout, `Duration::MAX` is close enough.
            .timeout(self.timeout.unwrap_or(Duration::MAX))
            .baud_rate(self.baud_rate)
            .open_native()
            .map(Serial)
            .map_err(Into::into)
    }

    /// Open the port at the specified path with the custom options.
    pub fn open(&self, path: &str) -> Result<Session<Serial>, Error> {
        Ok(Session::with_drain(
            self.open_serial_port(path)?,
            self.drain_policy,
            self.drain_limit,
        ))
    }

    /// Open the port at the specified path with the custom options.
    ///
    /// The type of the underlying backend is erased via dynamic dispatch,
    /// which does have runtime overhead. [`OpenSerialOptions::open`] should
    /// generally be used instead, except when the type of the underlying
    /// backend may not be known at compile time.
    pub fn open_dyn(&self, path: &str) -> Result<Session<Box<dyn Backend + Send>>, Error> {
        Ok(Session::with_drain(
            Box::new(self.open_serial_port(path)?),
            self.drain_policy,
            self.drain_limit,
        ))
    }
}

impl Default for OpenSerialOptions {
    fn default() -> Self {
        OpenSerialOptions::new()
    }
}

/// Options for configuring and opening a TCP connection.
///
/// ## Example
///
/// ```rust
/// # use mcsproto::OpenTcpOptions;
/// # use std::time::Duration;
/// # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
/// let mut session = OpenTcpOptions::new()
///     .timeout(Some(Duration::from_millis(500)))
///     .drain_limit(Some(32))
///     .open("192.168.1.200:55551")?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug)]
pub struct OpenTcpOptions {
    /// The custom timeout
    timeout: Option<Duration>,
    /// How much of the error queue is read after each command.
    drain_policy: DrainPolicy,
    /// The maximum number of error queue records read after each command.
    drain_limit: Option<usize>,
}

impl OpenTcpOptions {
    /// Create a blank set of options ready for configuration.
    ///
    /// The default read timeout is 3 seconds. The error queue is read up to
    /// its first error with no limit.
    ///
    /// Equivalent to [`default`](OpenTcpOptions::default).
    pub fn new() -> Self {
        OpenTcpOptions {
            timeout: Some(Duration::from_secs(3)),
            drain_policy: DrainPolicy::default(),
            drain_limit: None,
        }
    }

    /// Set a custom read timeout.
    ///
    /// If duration is `None`, reads will block indefinitely. The default is 3 seconds.
    pub fn timeout(&mut self, duration: Option<Duration>) -> &mut Self {
        self.timeout = duration;
        self
    }

    /// Set how much of the error queue is read after each command.
    ///
    /// The default is [`DrainPolicy::FirstError`].
    pub fn drain_policy(&mut self, policy: DrainPolicy) -> &mut Self {
        self.drain_policy = policy;
        self
    }

    /// Set the maximum number of error queue records read after each command.
    ///
    /// The default is `None` (no limit).
    pub fn drain_limit(&mut self, limit: Option<usize>) -> &mut Self {
        self.drain_limit = limit;
        self
    }

    /// Open a [`TcpStream`] configured for the controller at the specified address.
    fn open_tcp_stream<A: ToSocketAddrs>(&self, address: A) -> io::Result<TcpStream> {
        let stream = TcpStream::connect(address)?;
        stream.set_read_timeout(self.timeout)?;
        Ok(stream)
    }

    /// Open a connection to the specified address with the custom options.
    pub fn open<A: ToSocketAddrs>(&self, address: A) -> io::Result<Session<TcpStream>> {
        Ok(Session::with_drain(
            self.open_tcp_stream(address)?,
            self.drain_policy,
            self.drain_limit,
        ))
    }

    /// Open a connection to the specified address with the custom options.
    ///
    /// The type of the underlying backend is erased via dynamic dispatch,
    /// which does have runtime overhead. [`OpenTcpOptions::open`] should
    /// generally be used instead, except when the type of the underlying
    /// backend may not be known at compile time.
    pub fn open_dyn<A: ToSocketAddrs>(
        &self,
        address: A,
    ) -> io::Result<Session<Box<dyn Backend + Send>>> {
        Ok(Session::with_drain(
            Box::new(self.open_tcp_stream(address)?),
            self.drain_policy,
            self.drain_limit,
        ))
    }
}

impl Default for OpenTcpOptions {
    fn default() -> Self {
        OpenTcpOptions::new()
    }
}
