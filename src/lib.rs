//! A library for communicating with SmarAct MCS positioner controllers over
//! their ASCII protocol, via serial or TCP ports.
//!
//! Every command sent through a [`Session`] is followed by a check of the
//! controller's error queue, so a command that the controller rejected is
//! reported as an [`Error::Controller`](error::Error::Controller) rather than
//! silently returning a reply:
//!
//! ```
//! # use mcsproto::{Session, error::Error};
//! # fn wrapper() -> Result<(), Error> {
//! let mut session = Session::open_serial("/dev/ttyUSB0")?;
//! match session.send_command(":MOVE0 1000000000") {
//!     Ok(_) => println!("moving"),
//!     Err(Error::Controller(e)) => println!("rejected with code {}", e.code()),
//!     Err(e) => return Err(e),
//! }
//! # Ok(())
//! # }
//! ```
//!
//! A [`Controller`] builds on a session and discovers the controller's axes,
//! providing typed access to each of them. Commands themselves can be built
//! with the typed constructors in [`command`], which validate their parameters
//! before anything is sent.
//!
//! All communication is logged via the [`log`] crate: every line sent and
//! received at `debug` level and errors reported by the controller at `warn`.

#![deny(missing_docs)]
#![deny(rustdoc::missing_crate_level_docs)]
#![deny(missing_debug_implementations)]
#![cfg_attr(all(doc, feature = "doc_cfg"), feature(doc_cfg))]

pub mod backend;
mod channel;
pub mod command;
mod controller;
mod drain;
pub mod error;
pub mod model;
mod reply;
mod session;
pub mod timeout_guard;

pub use channel::{LineDirection, LineHandler};
pub use controller::{Axis, Controller};
pub use drain::DrainPolicy;
pub use session::{OpenSerialOptions, OpenTcpOptions, Session};
