//! Sensor types and the discovery of a controller's axes.

use crate::{
	backend::Backend,
	command::{ChannelCommand, ChannelIndex, ControllerCommand},
	error::{Error, InvalidArgumentError, UnknownSensorCodeError},
	reply, Session,
};
use std::{fmt, str::FromStr};

/// The broad category of a sensor type.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum SensorKind {
	/// Measures linear displacement.
	Linear,
	/// Measures rotation.
	Rotary,
	/// Neither linear nor rotary, e.g. a goniometer or a micro gripper.
	Other,
}

/// The sensor types the controller knows about, by numeric ID.
#[rustfmt::skip]
const SENSOR_TYPES: [(u8, &str); 35] = [
	(1, "SL"), (2, "SR"), (3, "ML"), (4, "MR"), (5, "SP"), (6, "SC"), (7, "M25"),
	(8, "SR20"), (9, "M"), (10, "GC"), (11, "GD"), (12, "GE"), (13, "RA"),
	(14, "GF"), (15, "RB"), (16, "G605S"), (17, "G775S"), (18, "SC500"),
	(19, "G955S"), (20, "SR77"), (21, "SD"), (22, "R20ME"), (23, "SR2"),
	(24, "SCD"), (25, "SRC"), (26, "SR36M"), (27, "SR36ME"), (28, "SR50M"),
	(29, "SR50ME"), (30, "G1045S"), (31, "G1395S"), (32, "MD"), (33, "G935M"),
	(34, "SHL20"), (35, "SCT"),
];

const LINEAR_SENSORS: [u8; 9] = [1, 5, 6, 9, 18, 21, 24, 32, 35];
const ROTARY_SENSORS: [u8; 11] = [2, 8, 14, 20, 22, 23, 25, 26, 27, 28, 29];

/// Lookups in the table of known sensor types.
pub mod sensor_type {
	use super::{SensorKind, LINEAR_SENSORS, ROTARY_SENSORS, SENSOR_TYPES};

	/// Get the mnemonic of a sensor type ID, e.g. `SL` for `1`.
	pub fn name(id: u8) -> Option<&'static str> {
		SENSOR_TYPES
			.iter()
			.find(|(i, _)| *i == id)
			.map(|(_, name)| *name)
	}

	/// Get the ID of a sensor type mnemonic, ignoring case.
	pub fn id(name: &str) -> Option<u8> {
		SENSOR_TYPES
			.iter()
			.find(|(_, n)| n.eq_ignore_ascii_case(name))
			.map(|(id, _)| *id)
	}

	/// Get the category of a sensor type ID.
	pub fn kind(id: u8) -> Option<SensorKind> {
		name(id)?;
		Some(if LINEAR_SENSORS.contains(&id) {
			SensorKind::Linear
		} else if ROTARY_SENSORS.contains(&id) {
			SensorKind::Rotary
		} else {
			SensorKind::Other
		})
	}
}

/// The kind of axis created for a channel, chosen by its sensor code.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash)]
pub enum AxisClass {
	/// A linear positioner (`SL`).
	Linear,
	/// A rotary positioner (`SR`).
	Rotary,
	/// A positioner with a user defined sensor (`CUSTOM0` to `CUSTOM3`).
	Custom(u8),
}

impl AxisClass {
	/// The largest custom sensor slot.
	pub const MAX_CUSTOM: u8 = 3;

	/// Choose the axis class for a sensor code.
	///
	/// Returns `None` if there is no axis class for the code.
	pub fn from_sensor_code(code: &str) -> Option<Self> {
		match code {
			"SL" => Some(AxisClass::Linear),
			"SR" => Some(AxisClass::Rotary),
			_ => {
				let slot: u8 = code.strip_prefix("CUSTOM")?.parse().ok()?;
				(code.len() == "CUSTOM".len() + 1 && slot <= Self::MAX_CUSTOM)
					.then_some(AxisClass::Custom(slot))
			}
		}
	}
}

impl FromStr for AxisClass {
	type Err = InvalidArgumentError;

	/// Parse the class from a sensor code, e.g. `SL`.
	fn from_str(s: &str) -> Result<Self, Self::Err> {
		AxisClass::from_sensor_code(s).ok_or_else(|| {
			InvalidArgumentError::new(
				"sensor code",
				s,
				"one of `SL` `SR` `CUSTOM0` `CUSTOM1` `CUSTOM2` `CUSTOM3`",
			)
		})
	}
}

impl fmt::Display for AxisClass {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			AxisClass::Linear => f.write_str("linear"),
			AxisClass::Rotary => f.write_str("rotary"),
			AxisClass::Custom(slot) => write!(f, "custom{slot}"),
		}
	}
}

/// What was learned about a channel during enumeration.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct AxisInfo {
	index: ChannelIndex,
	sensor_code: Box<str>,
	class: AxisClass,
}

impl AxisInfo {
	/// The channel the axis is attached to.
	pub fn index(&self) -> ChannelIndex {
		self.index
	}

	/// The sensor code the channel reported, e.g. `SL`.
	pub fn sensor_code(&self) -> &str {
		&self.sensor_code
	}

	/// The class of the axis.
	pub fn class(&self) -> AxisClass {
		self.class
	}
}

/// Discover the axes attached to a controller.
///
/// The number of channels is queried, then the sensor type of each channel
/// in order. If any channel reports a sensor code without an axis class, the
/// whole enumeration fails with an [`UnknownSensorCodeError`] and no axes are
/// returned.
pub fn enumerate_axes<B: Backend>(session: &mut Session<B>) -> Result<Vec<AxisInfo>, Error> {
	let count: usize = session.query(ControllerCommand::ChannelCount)?;
	if count > usize::from(ChannelIndex::MAX) + 1 {
		return Err(InvalidArgumentError::new("channel count", count, "at most 64 channels").into());
	}
	let mut axes = Vec::with_capacity(count);
	for i in 0..count {
		let index = ChannelIndex::try_from(i)?;
		let text = session.send_command(ChannelCommand::SensorTypeName(index))?;
		let code = reply::sensor_code(&text);
		let class = AxisClass::from_sensor_code(&code).ok_or_else(|| UnknownSensorCodeError {
			channel: index.get(),
			code: code.as_str().into(),
		})?;
		log::debug!("channel {index}: sensor `{code}`, {class} axis");
		axes.push(AxisInfo {
			index,
			sensor_code: code.into_boxed_str(),
			class,
		});
	}
	log::info!("found {} axes", axes.len());
	Ok(axes)
}

#[cfg(test)]
mod test {
	use super::*;
	use crate::backend::Mock;

	fn push(session: &mut Session<Mock>, lines: &[&str]) {
		for line in lines {
			session.backend_mut().push_line(line);
		}
	}

	#[test]
	fn sensor_type_table() {
		assert_eq!(sensor_type::name(1), Some("SL"));
		assert_eq!(sensor_type::name(35), Some("SCT"));
		assert_eq!(sensor_type::name(0), None);
		assert_eq!(sensor_type::name(36), None);
		assert_eq!(sensor_type::id("SR36ME"), Some(27));
		assert_eq!(sensor_type::id("sl"), Some(1));
		assert_eq!(sensor_type::id("XX"), None);
		assert_eq!(sensor_type::kind(9), Some(SensorKind::Linear));
		assert_eq!(sensor_type::kind(22), Some(SensorKind::Rotary));
		assert_eq!(sensor_type::kind(10), Some(SensorKind::Other));
		assert_eq!(sensor_type::kind(99), None);
		for (id, name) in SENSOR_TYPES {
			assert_eq!(sensor_type::id(name), Some(id));
		}
	}

	#[test]
	fn axis_class_from_sensor_code() {
		assert_eq!(AxisClass::from_sensor_code("SL"), Some(AxisClass::Linear));
		assert_eq!(AxisClass::from_sensor_code("SR"), Some(AxisClass::Rotary));
		assert_eq!(AxisClass::from_sensor_code("CUSTOM0"), Some(AxisClass::Custom(0)));
		assert_eq!(AxisClass::from_sensor_code("CUSTOM3"), Some(AxisClass::Custom(3)));
		for code in ["CUSTOM4", "CUSTOM", "CUSTOM+1", "CUSTOM01", "sl", "SC", "XX", ""] {
			assert_eq!(AxisClass::from_sensor_code(code), None, "{code}");
		}
		assert_eq!("SR".parse::<AxisClass>().unwrap(), AxisClass::Rotary);
		assert_eq!("XX".parse::<AxisClass>().unwrap_err().value(), "XX");
	}

	#[test]
	fn enumerate_known_codes() {
		let mut session = Session::open_mock();
		push(
			&mut session,
			&["3", "0", "SL.012", "0", "\"SR.4\"", "0", "CUSTOM2", "0"],
		);
		let axes = enumerate_axes(&mut session).unwrap();
		let summary: Vec<_> = axes
			.iter()
			.map(|a| (a.index().get(), a.sensor_code(), a.class()))
			.collect();
		assert_eq!(
			summary,
			[
				(0, "SL", AxisClass::Linear),
				(1, "SR", AxisClass::Rotary),
				(2, "CUSTOM2", AxisClass::Custom(2)),
			]
		);
		assert!(session.backend().is_empty());
	}

	#[test]
	fn unknown_code_fails_the_whole_enumeration() {
		let mut session = Session::open_mock();
		push(&mut session, &["2", "0", "SL.1", "0", "XX.9", "0"]);
		let err = enumerate_axes(&mut session).unwrap_err();
		let err = UnknownSensorCodeError::try_from(err).unwrap();
		assert_eq!(err.channel, 1);
		assert_eq!(&*err.code, "XX");
		assert_eq!(
			err.to_string(),
			"failed to create axis 1: there is no axis class for sensor code `XX`"
		);
	}

	#[test]
	fn no_channels() {
		let mut session = Session::open_mock();
		push(&mut session, &["0", "0"]);
		assert!(enumerate_axes(&mut session).unwrap().is_empty());
	}

	#[test]
	fn too_many_channels() {
		let mut session = Session::open_mock();
		push(&mut session, &["65", "0"]);
		let err = enumerate_axes(&mut session).unwrap_err();
		assert!(matches!(err, Error::InvalidArgument(_)), "{err:?}");
		assert_eq!(session.backend().written_lines().len(), 2);
	}
}
