use std::io;
use std::io::{Read, Write};
use std::time::{Duration, Instant};

use log::debug;
use serialport::SerialPort;

use crate::debug::to_hex;
use crate::error::{Result, StageError};

/// Fixed baud rate of the KBD101 USB serial interface.
const BAUD_RATE: u32 = 115_200;
/// Timeout of the port itself. Reply deadlines are enforced by the polling
/// loop in [`read_reply`], not by the port.
const PORT_TIMEOUT_MS: u64 = 10;
const POLL_INTERVAL_MS: u64 = 10;

pub(crate) fn sleep_ms(duration: u64) {
    std::thread::sleep(Duration::from_millis(duration));
}

fn timeout_error(message: &str) -> io::Error {
    io::Error::new(io::ErrorKind::TimedOut, message)
}

pub(crate) fn open_port(port_name: &str) -> Result<Box<dyn SerialPort>> {
    serialport::new(port_name, BAUD_RATE)
        .timeout(Duration::from_millis(PORT_TIMEOUT_MS))
        .open()
        .map_err(|source| StageError::Connection {
            port: port_name.to_string(),
            source,
        })
}

pub(crate) fn bytes_waiting(port: &mut Box<dyn SerialPort>) -> Result<usize> {
    let n_read: u32 = port.bytes_to_read().map_err(io::Error::from)?;
    Ok(n_read as usize)
}

pub(crate) fn send_data(port: &mut Box<dyn SerialPort>, data: &[u8]) -> Result<()> {
    debug!("sending  {}", to_hex(data));
    port.write_all(data)?;
    Ok(())
}

/// Block until `data_size` reply bytes are available, then read exactly
/// those.
///
/// Homing and move completion take device-dependent time, so the caller
/// passes the deadline per exchange.
pub(crate) fn read_reply(
    port: &mut Box<dyn SerialPort>,
    data_size: usize,
    timeout: Duration,
) -> Result<Vec<u8>> {
    assert!(data_size > 0);
    let deadline = Instant::now() + timeout;
    while bytes_waiting(port)? < data_size {
        if Instant::now() >= deadline {
            return Err(timeout_error("timed out waiting for a reply").into());
        }
        sleep_ms(POLL_INTERVAL_MS);
    }
    let mut reply: Vec<u8> = vec![0; data_size];
    let n_read = port.read(reply.as_mut_slice())?;
    if n_read != data_size {
        return Err(StageError::ReplyLength {
            expected: data_size,
            actual: n_read,
        });
    }
    debug!("received {}", to_hex(&reply));
    Ok(reply)
}

/// Fail if unread bytes remain after a reply has been consumed. Leftovers
/// mean request and reply no longer line up.
pub(crate) fn ensure_drained(port: &mut Box<dyn SerialPort>) -> Result<()> {
    let count = bytes_waiting(port)?;
    if count > 0 {
        return Err(StageError::LeftoverBytes { count });
    }
    Ok(())
}
