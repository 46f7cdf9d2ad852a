//! A controller and the axes attached to it.
//!
//! A [`Controller`] owns a [`Session`] and discovers its axes when it is
//! created:
//!
//! ```
//! # use mcsproto::{Controller, command::Direction};
//! # fn wrapper() -> Result<(), Box<dyn std::error::Error>> {
//! let mut controller = Controller::open_serial("/dev/ttyUSB0")?;
//! println!("{} axes", controller.len());
//!
//! if let Some(mut axis) = controller.axis(0) {
//!     axis.set_safe_direction(Direction::Backward)?;
//!     axis.find_reference_mark()?;
//!     axis.move_to(1_500_000)?;
//!     println!("at {}", axis.position()?);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! An [`Axis`] borrows its controller, so it cannot outlive it, and no axis
//! can be held across a call to [`Controller::enumerate_axes`].

use crate::{
	backend::{Backend, Serial},
	command::{
		BaudRate, ChannelCommand, ChannelIndex, Command, ControllerCommand, Direction, MoveMode,
		SensorMode,
	},
	error::{Error, MalformedReplyError},
	model::{self, AxisClass, AxisInfo},
	reply,
	timeout_guard::TimeoutGuard,
	Session,
};
use std::{
	io,
	net::{TcpStream, ToSocketAddrs},
	time::Duration,
};

/// A controller and its axes.
pub struct Controller<B> {
	/// The session used for all communication
	session: Session<B>,
	/// The axes found by the last enumeration
	axes: Vec<AxisInfo>,
}

impl<B: Backend> std::fmt::Debug for Controller<B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Controller")
			.field("session", &self.session)
			.field("axes", &self.axes)
			.finish()
	}
}

impl Controller<Serial> {
	/// Open the serial port at the specified path using the default options
	/// and discover the controller's axes.
	///
	/// To customize the port, open a [`Session`] and use [`Controller::new`].
	pub fn open_serial(path: &str) -> Result<Self, Error> {
		Controller::new(Session::open_serial(path)?)
	}
}

impl Controller<TcpStream> {
	/// Open a TCP connection to the specified address using the default
	/// options and discover the controller's axes.
	///
	/// To customize the connection, open a [`Session`] and use [`Controller::new`].
	pub fn open_tcp<A: ToSocketAddrs>(address: A) -> Result<Self, Error> {
		Controller::new(Session::open_tcp(address)?)
	}
}

impl<B: Backend> Controller<B> {
	/// Create a controller over `session` and discover its axes.
	pub fn new(session: Session<B>) -> Result<Self, Error> {
		let mut controller = Controller {
			session,
			axes: Vec::new(),
		};
		controller.enumerate_axes()?;
		Ok(controller)
	}

	/// Discover the controller's axes again, replacing the current ones.
	///
	/// The current axes are forgotten first, so if the enumeration fails the
	/// controller is left with no axes.
	pub fn enumerate_axes(&mut self) -> Result<&[AxisInfo], Error> {
		self.axes.clear();
		self.axes = model::enumerate_axes(&mut self.session)?;
		Ok(&self.axes)
	}

	/// Get the number of axes.
	pub fn len(&self) -> usize {
		self.axes.len()
	}

	/// Get whether the controller has no axes.
	pub fn is_empty(&self) -> bool {
		self.axes.is_empty()
	}

	/// Get what is known about each axis, in channel order.
	pub fn axes(&self) -> &[AxisInfo] {
		&self.axes
	}

	/// Get the [`Axis`] at the specified position (0-based).
	///
	/// Returns `None` if there is no such axis.
	pub fn axis(&mut self, index: usize) -> Option<Axis<'_, B>> {
		let info = self.axes.get(index)?;
		Some(Axis {
			session: &mut self.session,
			info,
		})
	}

	/// Send a command and return its reply.
	///
	/// See [`Session::send_command`].
	pub fn send_command<C: Command>(&mut self, cmd: C) -> Result<String, Error> {
		self.session.send_command(cmd)
	}

	/// Get the number of channels. This is not necessarily the number of
	/// connected positioners.
	pub fn channel_count(&mut self) -> Result<usize, Error> {
		self.session.query(ControllerCommand::ChannelCount)
	}

	/// Get the controller's serial number.
	pub fn serial_number(&mut self) -> Result<String, Error> {
		self.session.send_command(ControllerCommand::SerialNumber)
	}

	/// Reset the controller, equivalent to a power cycle.
	///
	/// The numeric value the controller replies with is returned.
	pub fn reset(&mut self) -> Result<f64, Error> {
		let cmd = ControllerCommand::Reset;
		let reply = self.session.send_command(cmd)?;
		Ok(reply::parse_field(&cmd.text(), &reply, 1, "`<tag>,<number>`")?)
	}

	/// Get the sensor operation mode.
	pub fn sensor_mode(&mut self) -> Result<SensorMode, Error> {
		let cmd = ControllerCommand::GetSensorMode;
		let reply = self.session.send_command(cmd)?;
		let code = reply::last_digit(&cmd.text(), &reply, "a sensor mode code")?;
		SensorMode::from_code(code)
			.ok_or_else(|| MalformedReplyError::new(&cmd.text(), &reply, "a sensor mode code").into())
	}

	/// Set the sensor operation mode.
	pub fn set_sensor_mode(&mut self, mode: SensorMode) -> Result<(), Error> {
		self.session
			.send_command(ControllerCommand::SetSensorMode(mode))
			.map(drop)
	}

	/// Execute the commands that were queued with the specified trigger index.
	pub fn trigger_command(&mut self, index: u8) -> Result<(), Error> {
		self.session
			.send_command(ControllerCommand::Trigger(index))
			.map(drop)
	}

	/// Set the baud rate of the controller's RS-232 interface and return the
	/// rate the controller applied.
	///
	/// Rates outside `9600..=115200` are rejected without sending anything.
	/// This has no effect on a network interface.
	pub fn configure_baud_rate(&mut self, rate: u32) -> Result<u32, Error> {
		let cmd = ControllerCommand::BaudRate(BaudRate::new(rate)?);
		let reply = self.session.send_command(cmd)?;
		Ok(reply::parse_tagged(&cmd.text(), &reply, "BR", "`BR<rate>`")?)
	}

	/// Stop all positioners if no command is received for the specified
	/// interval. An interval of zero disables the keep-alive.
	///
	/// The interval is sent in whole milliseconds, saturating at `u32::MAX`.
	pub fn keep_alive(&mut self, interval: Duration) -> Result<(), Error> {
		let ms = u32::try_from(interval.as_millis()).unwrap_or(u32::MAX);
		self.session
			.send_command(ControllerCommand::KeepAlive(ms))
			.map(drop)
	}

	/// Set the timeout and return a "scope guard" that will reset the timeout when it goes out of scope.
	///
	/// See [`Session::timeout_guard`].
	pub fn timeout_guard(
		&mut self,
		timeout: Option<Duration>,
	) -> Result<TimeoutGuard<'_, B, Self>, io::Error> {
		self.session.check_poisoned()?;

		TimeoutGuard::new(self, timeout)
	}

	/// Get a reference to the session.
	pub fn session(&self) -> &Session<B> {
		&self.session
	}

	/// Get a mutable reference to the session.
	pub fn session_mut(&mut self) -> &mut Session<B> {
		&mut self.session
	}

	/// Consume the controller and return its session.
	pub fn into_session(self) -> Session<B> {
		self.session
	}
}

impl<B: Backend> crate::timeout_guard::Port<B> for Controller<B> {
	fn backend_mut(&mut self) -> &mut B {
		crate::timeout_guard::Port::backend_mut(&mut self.session)
	}
	fn poison(&mut self, e: io::Error) {
		crate::timeout_guard::Port::poison(&mut self.session, e);
	}
}

/// A single axis of a [`Controller`].
///
/// The handle borrows the controller, so only one axis can be used at a time.
pub struct Axis<'c, B> {
	/// The controller's session
	session: &'c mut Session<B>,
	/// Information about the axis
	info: &'c AxisInfo,
}

impl<'c, B: Backend> std::fmt::Debug for Axis<'c, B> {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("Axis")
			.field("name", &self.session.name())
			.field("info", self.info)
			.finish()
	}
}

impl<'c, B: Backend> Axis<'c, B> {
	/// Get the channel the axis is attached to.
	pub fn index(&self) -> ChannelIndex {
		self.info.index()
	}

	/// Get the sensor code the channel reported during enumeration.
	pub fn sensor_code(&self) -> &str {
		self.info.sensor_code()
	}

	/// Get the class of the axis.
	pub fn class(&self) -> AxisClass {
		self.info.class()
	}

	/// Get everything learned about the axis during enumeration.
	pub fn info(&self) -> &AxisInfo {
		self.info
	}

	/// Send a command addressed to this axis and return the reply.
	fn send(&mut self, cmd: ChannelCommand) -> Result<String, Error> {
		self.session.send_command(cmd)
	}

	/// Send a command addressed to this axis and parse the reply with `parse`.
	fn query<T, F>(&mut self, cmd: ChannelCommand, parse: F) -> Result<T, Error>
	where
		F: FnOnce(&str, &str) -> Result<T, MalformedReplyError>,
	{
		let reply = self.send(cmd)?;
		let text = cmd.text();
		Ok(parse(&*text, reply.as_str())?)
	}

	/// Get the direction the positioner moves in to reach safety.
	pub fn safe_direction(&mut self) -> Result<Direction, Error> {
		self.query(ChannelCommand::GetSafeDirection(self.index()), |cmd, reply| {
			let code = reply::last_digit(cmd, reply, "a direction code")?;
			Direction::from_code(code)
				.ok_or_else(|| MalformedReplyError::new(cmd, reply, "a direction code"))
		})
	}

	/// Set the direction the positioner moves in to reach safety.
	///
	/// A [`Direction`] or its name (`"forward"` or `"backward"`) is accepted.
	/// An unrecognized name is rejected without sending anything.
	///
	/// ```
	/// # use mcsproto::{Controller, command::Direction, backend::Backend};
	/// # fn wrapper<B: Backend>(controller: &mut Controller<B>) -> Result<(), mcsproto::error::Error> {
	/// # let mut axis = controller.axis(0).unwrap();
	/// axis.set_safe_direction(Direction::Forward)?;
	/// axis.set_safe_direction("backward")?;
	/// assert!(axis.set_safe_direction("sideways").is_err());
	/// # Ok(())
	/// # }
	/// ```
	pub fn set_safe_direction<D>(&mut self, direction: D) -> Result<(), Error>
	where
		D: TryInto<Direction>,
		Error: From<D::Error>,
	{
		let direction = direction.try_into()?;
		self.send(ChannelCommand::SetSafeDirection(self.index(), direction))
			.map(drop)
	}

	/// Query the sensor code of the positioner currently connected, e.g. `SL`.
	pub fn sensor_type(&mut self) -> Result<String, Error> {
		let reply = self.send(ChannelCommand::SensorTypeName(self.index()))?;
		Ok(reply::sensor_code(&reply))
	}

	/// Get the current position.
	pub fn position(&mut self) -> Result<f64, Error> {
		self.query(ChannelCommand::Position(self.index()), |cmd, reply| {
			reply::parse(cmd, reply, "a position")
		})
	}

	/// Get the movement state code.
	pub fn state(&mut self) -> Result<u32, Error> {
		self.query(ChannelCommand::State(self.index()), |cmd, reply| {
			reply::parse_field(cmd, reply, 1, "`S<channel>,<state>`")
		})
	}

	/// Move to `target`, which is interpreted according to the move mode.
	pub fn move_to(&mut self, target: i64) -> Result<(), Error> {
		self.send(ChannelCommand::Move(self.index(), target))
			.map(drop)
	}

	/// Calibrate the sensor to increase the accuracy of the position.
	pub fn calibrate_sensor(&mut self) -> Result<(), Error> {
		self.send(ChannelCommand::Calibrate(self.index())).map(drop)
	}

	/// Move to the reference mark, a known physical position.
	pub fn find_reference_mark(&mut self) -> Result<(), Error> {
		self.send(ChannelCommand::FindReferenceMark(self.index()))
			.map(drop)
	}

	/// Set how move targets are interpreted.
	pub fn set_move_mode(&mut self, mode: MoveMode) -> Result<(), Error> {
		self.send(ChannelCommand::SetMoveMode(self.index(), mode))
			.map(drop)
	}

	/// Stop any ongoing motion.
	pub fn stop(&mut self) -> Result<(), Error> {
		self.send(ChannelCommand::Stop(self.index())).map(drop)
	}
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::{
		backend::Mock,
		command::{ERROR_COUNT, NEXT_ERROR},
		error::*,
	};
	use static_assertions::assert_impl_all;

	assert_impl_all!(Controller<Mock>: Send);
	assert_impl_all!(Controller<Serial>: Send);

	/// Create a controller over a mock backend with the given sensor type
	/// replies, one channel per reply.
	fn new_mock_controller(sensors: &[&str]) -> Controller<Mock> {
		let mut session = Session::open_mock();
		let count = sensors.len().to_string();
		push(&mut session, &[count.as_str(), "0"]);
		for sensor in sensors {
			push(&mut session, &[*sensor, "0"]);
		}
		let mut controller = Controller::new(session).unwrap();
		controller.session_mut().backend_mut().clear_written();
		controller
	}

	fn push(session: &mut Session<Mock>, lines: &[&str]) {
		for line in lines {
			session.backend_mut().push_line(line);
		}
	}

	fn written(controller: &Controller<Mock>) -> Vec<String> {
		controller.session().backend().written_lines()
	}

	#[test]
	fn new_enumerates_axes() {
		let controller = new_mock_controller(&["SL.012", "\"SR.4\""]);
		assert_eq!(controller.len(), 2);
		assert!(!controller.is_empty());
		assert_eq!(controller.axes()[0].class(), AxisClass::Linear);
		assert_eq!(controller.axes()[1].sensor_code(), "SR");
	}

	#[test]
	fn new_fails_on_unknown_sensor_code() {
		let mut session = Session::open_mock();
		push(&mut session, &["2", "0", "SL", "0", "XX", "0"]);
		let err = Controller::new(session).unwrap_err();
		assert!(matches!(err, Error::UnknownSensorCode(_)), "{err:?}");
	}

	#[test]
	fn failed_reenumeration_leaves_no_axes() {
		let mut controller = new_mock_controller(&["SL"]);
		assert_eq!(controller.len(), 1);

		push(controller.session_mut(), &["2", "0", "SL", "0", "XX", "0"]);
		assert!(controller.enumerate_axes().is_err());
		assert!(controller.is_empty());
		assert!(controller.axis(0).is_none());

		push(controller.session_mut(), &["1", "0", "CUSTOM1.0", "0"]);
		let axes = controller.enumerate_axes().unwrap();
		assert_eq!(axes[0].class(), AxisClass::Custom(1));
	}

	#[test]
	fn controller_queries() {
		let mut controller = new_mock_controller(&[]);
		push(controller.session_mut(), &["6", "0"]);
		assert_eq!(controller.channel_count().unwrap(), 6);

		push(controller.session_mut(), &["MCS-00A1B2", "0"]);
		assert_eq!(controller.serial_number().unwrap(), "MCS-00A1B2");

		push(controller.session_mut(), &["RST,1.5", "0"]);
		assert_eq!(controller.reset().unwrap(), 1.5);

		push(controller.session_mut(), &["SE2", "0"]);
		assert_eq!(controller.sensor_mode().unwrap(), SensorMode::PowerSave);

		push(controller.session_mut(), &["SE7", "0"]);
		let err = controller.sensor_mode().unwrap_err();
		assert!(matches!(err, Error::MalformedReply(_)), "{err:?}");

		push(controller.session_mut(), &["BR115200", "0"]);
		assert_eq!(controller.configure_baud_rate(115_200).unwrap(), 115_200);

		assert_eq!(
			written(&controller),
			[
				":DEV:NOCH?",
				ERROR_COUNT,
				":DEV:SNUM?",
				ERROR_COUNT,
				"*RST",
				ERROR_COUNT,
				"GSE",
				ERROR_COUNT,
				"GSE",
				ERROR_COUNT,
				"BR115200",
				ERROR_COUNT,
			]
		);
	}

	#[test]
	fn controller_commands() {
		let mut controller = new_mock_controller(&[]);
		push(controller.session_mut(), &["", "0", "", "0", "", "0"]);
		controller.set_sensor_mode(SensorMode::Enabled).unwrap();
		controller.trigger_command(3).unwrap();
		controller
			.keep_alive(Duration::from_millis(2500))
			.unwrap();
		assert_eq!(
			written(&controller),
			["SSE1", ERROR_COUNT, "TC1795", ERROR_COUNT, "K2500", ERROR_COUNT]
		);
	}

	#[test]
	fn out_of_range_baud_rate_is_not_sent() {
		let mut controller = new_mock_controller(&[]);
		let err = controller.configure_baud_rate(4_800).unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
		assert!(written(&controller).is_empty());
	}

	#[test]
	fn axis_queries() {
		let mut controller = new_mock_controller(&["SL", "SR"]);
		{
			let session = controller.session_mut();
			push(session, &["SD1,1", "0"]);
			push(session, &["-12500.25", "0"]);
			push(session, &["S1,4", "0"]);
			push(session, &["\"SR.7\"", "0"]);
		}
		let mut axis = controller.axis(1).unwrap();
		assert_eq!(axis.index().get(), 1);
		assert_eq!(axis.class(), AxisClass::Rotary);
		assert_eq!(axis.safe_direction().unwrap(), Direction::Backward);
		assert_eq!(axis.position().unwrap(), -12500.25);
		assert_eq!(axis.state().unwrap(), 4);
		assert_eq!(axis.sensor_type().unwrap(), "SR");

		assert_eq!(
			written(&controller),
			[
				"GSD1",
				ERROR_COUNT,
				":CHAN1:POS?",
				ERROR_COUNT,
				"GS1",
				ERROR_COUNT,
				":CHAN1:PTYPE:NAME?",
				ERROR_COUNT,
			]
		);
	}

	#[test]
	fn axis_commands() {
		let mut controller = new_mock_controller(&["SL"]);
		for _ in 0..7 {
			push(controller.session_mut(), &["", "0"]);
		}
		let mut axis = controller.axis(0).unwrap();
		axis.set_safe_direction(Direction::Forward).unwrap();
		axis.set_safe_direction("BACKWARD").unwrap();
		axis.move_to(-250).unwrap();
		axis.calibrate_sensor().unwrap();
		axis.find_reference_mark().unwrap();
		axis.set_move_mode(MoveMode::ClosedLoopRelative).unwrap();
		axis.stop().unwrap();

		let commands: Vec<_> = written(&controller)
			.into_iter()
			.filter(|line| line != ERROR_COUNT)
			.collect();
		assert_eq!(
			commands,
			[
				"SSD0,0",
				"SSD0,1",
				":MOVE0 -250",
				":CAL0",
				":REF0",
				":CHAN0:MMOD 1",
				":STOP0"
			]
		);
	}

	#[test]
	fn unrecognized_direction_is_not_sent() {
		let mut controller = new_mock_controller(&["SL"]);
		let mut axis = controller.axis(0).unwrap();
		let err = axis.set_safe_direction("sideways").unwrap_err();
		let err = InvalidArgumentError::try_from(err).unwrap();
		assert_eq!(err.value(), "sideways");
		assert!(written(&controller).is_empty());
	}

	#[test]
	fn axis_error_is_raised_after_the_command() {
		let mut controller = new_mock_controller(&["SL"]);
		push(
			controller.session_mut(),
			&["", "1", "147,Range Limit Reached Error"],
		);
		let mut axis = controller.axis(0).unwrap();
		let err = axis.move_to(1_000_000_000).unwrap_err();
		assert_eq!(ControllerError::try_from(err).unwrap().code(), 147);
		assert_eq!(
			written(&controller),
			[":MOVE0 1000000000", ERROR_COUNT, NEXT_ERROR]
		);
	}

	#[test]
	fn timeout_guard_on_controller() {
		let mut controller = new_mock_controller(&["SL"]);
		let original = controller.session().read_timeout().unwrap();
		{
			let mut guard = controller
				.timeout_guard(Some(Duration::from_secs(60)))
				.unwrap();
			push(guard.session_mut(), &["", "0"]);
			guard.axis(0).unwrap().find_reference_mark().unwrap();
			assert_eq!(
				guard.session().read_timeout().unwrap(),
				Some(Duration::from_secs(60))
			);
		}
		assert_eq!(controller.session().read_timeout().unwrap(), original);
	}

	#[test]
	fn axis_class_from_str() {
		assert_eq!("SL".parse::<AxisClass>().unwrap(), AxisClass::Linear);
		assert!("XX".parse::<AxisClass>().is_err());
	}
}
