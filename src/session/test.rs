use crate::{
	backend::{Mock, Serial},
	command::{ChannelCommand, ChannelIndex, ERROR_COUNT, NEXT_ERROR},
	error::*,
	DrainPolicy, LineDirection, Session,
};
use static_assertions::assert_impl_all;
use std::{
	io,
	net::TcpStream,
	sync::{Arc, Mutex},
	thread,
};

/// Generate code to check the outcome of different session methods.
///
/// The syntax is `<session>, <case>...` where multiple `<case>`s are separated
/// by `,` and can be of two flavors:
///
///   * `ok case <reply_lines_to_append>... via <closure_to_run>`
///   * `err case <reply_lines_to_append>... via <closure_to_run> => <expected_error_type>`
macro_rules! check_cases {
    (
        $session:ident, ok case $($line:literal),+ via $method:expr, $($rest:tt)*
    ) => {
        // Make sure there are no other replies left over from other test cases
        $session.backend_mut().clear_buffer();
        $(
            $session.backend_mut().push_line($line);
        )+
        let m: fn(&mut Session<Mock>) -> Result<_, Error> = $method; // Give the compiler the necessary type hints
        if let Err(e) = (m)(&mut $session) {
            panic!("unexpected error for {} via {}:\n\tactual error: {}\n\t{:?}\n",
                stringify!($($line),+),
                stringify!($method),
                e,
                e);
        }
        check_cases!($session, $($rest)*)
    };

    (
        $session:ident, err case $($line:literal),+ via $method:expr => $err_type:ident, $($rest:tt)*
    ) => {
        $session.backend_mut().clear_buffer();
        $(
            $session.backend_mut().push_line($line);
        )+
        let m: fn(&mut Session<Mock>) -> Result<_, Error> = $method; // Give the compiler the necessary type hints
        match (m)(&mut $session) {
            Err(e) => {
                if let Err(e) = $err_type::try_from(e) {
                    panic!("unexpected error for {} via {}:\n\texpected:\t{}\n\tgot:\t\t{}\n\t\t\t{:?}\n",
                        stringify!($($line),+),
                        stringify!($method),
                        stringify!($err_type),
                        e,
                        e);
                }
            }
            Ok(_) => panic!("unexpected Ok for {} via {}", stringify!($($line),+), stringify!($method)),
        };
        check_cases!($session, $($rest)*)
    };

    ($session:ident, ) => {};
}

assert_impl_all!(Session<Mock>: Send);
assert_impl_all!(Session<Serial>: Send);
assert_impl_all!(Session<TcpStream>: Send);

#[test]
fn reply_is_returned_when_queue_is_empty() {
	let mut session = Session::open_mock();
	session.backend_mut().push_line("SL.012");
	session.backend_mut().push_line("0");
	let reply = session.send_command(":CHAN0:PTYPE:NAME?").unwrap();
	assert_eq!(reply, "SL.012");
	assert_eq!(
		session.backend().written_lines(),
		[":CHAN0:PTYPE:NAME?", ERROR_COUNT]
	);
}

#[test]
fn controller_error_replaces_reply() {
	let mut session = Session::open_mock();
	session.backend_mut().push_line("");
	session.backend_mut().push_line("1");
	session.backend_mut().push_line("147,Range Limit Reached Error");
	let err = session
		.send_command(ChannelCommand::Move(ChannelIndex::new(0).unwrap(), 1_000_000_000))
		.unwrap_err();
	let err = ControllerError::try_from(err).unwrap();
	assert_eq!(err.code(), 147);
	assert_eq!(err.message(), "Range Limit Reached Error");
	assert_eq!(err.name(), Some("Range Limit Reached Error"));
}

#[test]
fn first_error_wins() {
	let mut session = Session::open_mock();
	for line in [
		"",
		"2",
		"147,Range Limit Reached Error",
		"1",
		"7,Invalid Parameter Error",
	] {
		session.backend_mut().push_line(line);
	}
	let err = session.send_command(":MOVE0 1").unwrap_err();
	assert_eq!(ControllerError::try_from(err).unwrap().code(), 147);
	assert_eq!(
		session.backend().written_lines(),
		[":MOVE0 1", ERROR_COUNT, NEXT_ERROR]
	);
	// The second error is left on the controller.
	assert!(!session.backend().is_empty());
}

#[test]
fn full_drain_policy() {
	let mut session = Session::open_mock();
	assert_eq!(session.set_drain_policy(DrainPolicy::Full), DrainPolicy::FirstError);
	assert_eq!(session.drain_policy(), DrainPolicy::Full);
	for line in [
		"",
		"2",
		"147,Range Limit Reached Error",
		"1",
		"7,Invalid Parameter Error",
		"0",
	] {
		session.backend_mut().push_line(line);
	}
	let err = session.send_command(":MOVE0 1").unwrap_err();
	let err = ControllerError::try_from(err).unwrap();
	assert_eq!(err.code(), 147);
	assert_eq!(err.additional().len(), 1);
	assert_eq!(err.additional()[0].code(), 7);
	assert!(session.backend().is_empty());
}

#[test]
fn drain_stops_exactly_when_count_reads_zero() {
	let mut session = Session::open_mock();
	for line in ["ok", "3", "0,No Error", "0"] {
		session.backend_mut().push_line(line);
	}
	assert_eq!(session.send_command(":CAL0").unwrap(), "ok");
	assert_eq!(
		session.backend().written_lines(),
		[":CAL0", ERROR_COUNT, NEXT_ERROR, ERROR_COUNT]
	);
}

#[test]
fn drain_limit() {
	let mut session = Session::open_mock();
	assert_eq!(session.set_drain_limit(Some(1)), None);
	assert_eq!(session.drain_limit(), Some(1));
	for line in ["", "5", "0,No Error", "4"] {
		session.backend_mut().push_line(line);
	}
	let err = session.send_command(":CAL0").unwrap_err();
	assert!(matches!(err, Error::DrainLimitExceeded(_)), "{err:?}");
}

#[test]
fn transport_error_skips_the_drain() {
	let mut session = Session::open_mock();
	session
		.backend_mut()
		.read_error(Some(io::Error::new(io::ErrorKind::ConnectionReset, "reset")));
	session.backend_mut().push_line("0");
	let err = session.send_command(":DEV:NOCH?").unwrap_err();
	assert!(err.is_io());
	assert_eq!(session.backend().written_lines(), [":DEV:NOCH?"]);

	// A missing reply is a timeout.
	let mut session = Session::open_mock();
	let err = session.send_command(":DEV:NOCH?").unwrap_err();
	assert!(err.is_timeout());

	// So is a missing error count.
	let mut session = Session::open_mock();
	session.backend_mut().push_line("4");
	let err = session.send_command(":DEV:NOCH?").unwrap_err();
	assert!(err.is_timeout());
}

#[test]
fn reserved_characters_are_rejected_before_sending() {
	let mut session = Session::open_mock();
	let err = session.send_command(":STOP0\n:STOP1").unwrap_err();
	assert!(ValidationError::try_from(err).is_ok());
	assert!(session.backend().written().is_empty());
}

#[test]
fn query_parses_the_whole_reply() {
	let mut session = Session::open_mock();
	check_cases! {
		session,
		ok case "3", "0" via |s| s.query::<_, u8>(":DEV:NOCH?"),
		ok case "-1250.5", "0" via |s| s.query::<_, f64>(":CHAN0:POS?"),
		err case "three", "0" via |s| s.query::<_, u8>(":DEV:NOCH?") => MalformedReplyError,
		err case "3", "1", "2,Invalid Command Error" via |s| s.query::<_, u8>(":DEV:NOCH?") => ControllerError,
		err case "3", "many" via |s| s.query::<_, u8>(":DEV:NOCH?") => MalformedReplyError,
	}

	session.backend_mut().clear_buffer();
	session.backend_mut().push_line(" 3 ");
	session.backend_mut().push_line("0");
	assert_eq!(session.query::<_, u8>(":DEV:NOCH?").unwrap(), 3);
}

#[test]
fn line_handler_sees_every_line() {
	let lines = Arc::new(Mutex::new(Vec::new()));
	let mut session = Session::open_mock();
	let sink = Arc::clone(&lines);
	assert!(session
		.set_line_handler(move |line, dir| sink.lock().unwrap().push(format!("{dir:?} {line}")))
		.is_none());
	session.backend_mut().push_line("2");
	session.backend_mut().push_line("0");
	session.send_command(":DEV:NOCH?").unwrap();
	assert_eq!(
		*lines.lock().unwrap(),
		[
			"Tx :DEV:NOCH?",
			"Recv 2",
			"Tx :SYST:ERR:COUN?",
			"Recv 0"
		]
	);
	assert!(session.clear_line_handler().is_some());
	assert!(session.clear_line_handler().is_none());
	assert_eq!(format!("{:?}", LineDirection::Tx), "Tx");
}

#[test]
fn shared_session_keeps_exchanges_whole() {
	let session = Arc::new(Mutex::new(Session::open_mock()));
	{
		let mut session = session.lock().unwrap();
		for line in ["a", "0", "b", "0"] {
			session.backend_mut().push_line(line);
		}
	}

	let handles: Vec<_> = [":STOP0", ":STOP1"]
		.into_iter()
		.map(|cmd| {
			let session = Arc::clone(&session);
			thread::spawn(move || session.lock().unwrap().send_command(cmd).unwrap())
		})
		.collect();
	let mut replies: Vec<_> = handles.into_iter().map(|h| h.join().unwrap()).collect();
	replies.sort();
	assert_eq!(replies, ["a", "b"]);

	let session = session.lock().unwrap();
	let written = session.backend().written_lines();
	assert_eq!(written.len(), 4);
	assert_eq!(written[1], ERROR_COUNT);
	assert_eq!(written[3], ERROR_COUNT);
}

#[test]
fn set_read_timeout_returns_the_old_timeout() {
	let mut session = Session::open_mock();
	let old = session.read_timeout().unwrap();
	assert_eq!(session.set_read_timeout(None).unwrap(), old);
	assert_eq!(session.read_timeout().unwrap(), None);
	assert!(session.name().unwrap().starts_with("<mock"));
	let _mock: Mock = session.into_backend();
}
