//! Example: open a serial session to an MCS controller, list its axes, and move axis 0.

use mcsproto::{command::Direction, Controller, Session};
use simple_logger::SimpleLogger;
use std::time::Duration;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Enable logging
    SimpleLogger::new().init().unwrap();

    // Open the port and discover the axes.
    let session = Session::open_serial_options()
        .baud_rate(115_200)
        .open("/dev/ttyUSB0")?;
    let mut controller = Controller::new(session)?;
    println!("serial number: {}", controller.serial_number()?);
    for info in controller.axes() {
        println!(
            "channel {}: {} ({})",
            info.index(),
            info.sensor_code(),
            info.class()
        );
    }

    // Finding the reference mark can take a while, so wait longer for the reply.
    let mut controller = controller.timeout_guard(Some(Duration::from_secs(60)))?;
    if let Some(mut axis) = controller.axis(0) {
        axis.set_safe_direction(Direction::Backward)?;
        axis.find_reference_mark()?;
        axis.move_to(1_500_000)?;
        println!("position: {}", axis.position()?);
    }
    Ok(())
}
