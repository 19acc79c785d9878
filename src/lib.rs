//! Driver for the Thorlabs DDS100 100 mm direct drive linear stage.
//!
//! The stage ships with a KBD101 K-Cube brushless DC controller that talks
//! the Thorlabs APT protocol over USB serial: binary messages with a
//! six-byte header, positions expressed in encoder counts (2000 counts per
//! millimeter on this stage). This crate implements the subset of the
//! protocol needed to operate the stage: identification, channel enable,
//! homing, position queries and absolute/relative moves.
//!
//! [`Stage::open`] runs the whole startup sequence (validate the controller
//! identity, enable the axis, home, move to 0 mm), so a freshly opened
//! [`Stage`] always sits at a known position.
//!
//! ```no_run
//! use dds100_driver::{MoveMode, Stage};
//!
//! fn main() -> dds100_driver::Result<()> {
//!     let mut stage = Stage::open("/dev/ttyUSB0")?;
//!     stage.move_mm(25.0, MoveMode::Absolute, true)?;
//!     println!("position = {:.4} mm", stage.get_position_mm()?);
//!     stage.close();
//!     Ok(())
//! }
//! ```

mod calibration;
mod debug;
mod device_info;
mod error;
mod message;
mod serial;

pub use calibration::{Calibration, DDS100, SUPPORTED_FIRMWARE, SUPPORTED_MODEL};
pub use device_info::DeviceInfo;
pub use error::{Result, StageError};
pub use message::{ChannelId, MoveMode};

use std::fmt;
use std::time::Duration;

use log::info;
use serialport::SerialPort;

/// Deadline for replies to ordinary queries.
const REPLY_TIMEOUT: Duration = Duration::from_millis(2_000);
/// Deadline for the homed acknowledgment. Homing can sweep the whole
/// travel, so it gets far more slack than a query.
const HOMING_TIMEOUT: Duration = Duration::from_millis(60_000);
/// Deadline for the move-completed message of a blocking or finished move.
const MOVE_TIMEOUT: Duration = Duration::from_millis(30_000);

#[derive(Debug)]
struct MotionState {
    position_mm: f64,
    enabled: bool,
    moving: bool,
}

impl MotionState {
    fn new() -> MotionState {
        MotionState {
            position_mm: 0.0,
            enabled: false,
            moving: false,
        }
    }
}

/// A connected, enabled and homed DDS100 stage.
pub struct Stage {
    port: Box<dyn SerialPort>,
    info: DeviceInfo,
    calibration: Calibration,
    channel: Option<ChannelId>,
    state: MotionState,
}

// manual impl: Box<dyn SerialPort> is not Debug
impl fmt::Debug for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Stage")
            .field("info", &self.info)
            .field("calibration", &self.calibration)
            .field("channel", &self.channel)
            .field("state", &self.state)
            .finish_non_exhaustive()
    }
}

fn fetch_identity(port: &mut Box<dyn SerialPort>) -> Result<DeviceInfo> {
    serial::send_data(port, &message::encode_get_info())?;
    let reply = serial::read_reply(port, message::INFO_REPLY_SIZE, REPLY_TIMEOUT)?;
    serial::ensure_drained(port)?;
    let info = message::decode_info(&reply)?;
    info!(
        "device: model {}, type {}, serial {}, firmware {}, hardware {}",
        info.model_str(),
        info.type_code,
        info.serial_number,
        info.firmware_version,
        info.hardware_version
    );
    if info.model_number != calibration::SUPPORTED_MODEL
        || info.firmware_version != calibration::SUPPORTED_FIRMWARE
    {
        return Err(StageError::UnsupportedDevice {
            model: info.model_str(),
            firmware: info.firmware_version,
        });
    }
    Ok(info)
}

impl Stage {
    /// Open the stage on `port_name` and bring it to a known state: fetch
    /// and validate the controller identity, enable the axis, home, query
    /// the position (which establishes the channel id) and move to 0 mm.
    ///
    /// Blocks until homing and the final move are acknowledged, which can
    /// take tens of seconds depending on where the stage last sat.
    ///
    /// # Arguments
    ///
    /// * `port_name` - Serial port name such as `/dev/ttyUSB0`.
    pub fn open(port_name: &str) -> Result<Stage> {
        info!("opening stage on {}", port_name);
        let mut port = serial::open_port(port_name)?;
        let info = fetch_identity(&mut port)?;
        let mut stage = Stage {
            port,
            info,
            calibration: calibration::DDS100,
            channel: None,
            state: MotionState::new(),
        };
        stage.set_enable(true)?;
        stage.home()?;
        stage.get_position_mm()?;
        stage.move_mm(0.0, MoveMode::Absolute, true)?;
        info!("stage ready at {:.4} mm", stage.state.position_mm);
        Ok(stage)
    }

    /// Identity reported by the controller during startup.
    pub fn device_info(&self) -> &DeviceInfo {
        &self.info
    }

    /// Last known position in millimeters. For a pending non-blocking move
    /// this is already the target of that move.
    pub fn position_mm(&self) -> f64 {
        self.state.position_mm
    }

    /// Whether a non-blocking move has not been finished yet.
    pub fn is_moving(&self) -> bool {
        self.state.moving
    }

    /// Whether the axis drive was enabled at the last enable exchange.
    pub fn is_enabled(&self) -> bool {
        self.state.enabled
    }

    /// Query the enable state from the controller.
    pub fn get_enable(&mut self) -> Result<bool> {
        serial::send_data(&mut self.port, &message::encode_req_enable_state())?;
        let reply = serial::read_reply(&mut self.port, message::ENABLE_REPLY_SIZE, REPLY_TIMEOUT)?;
        serial::ensure_drained(&mut self.port)?;
        let enabled = message::decode_enable_state(&reply)?;
        self.state.enabled = enabled;
        info!("enable = {}", enabled);
        Ok(enabled)
    }

    /// Enable or disable the axis drive.
    ///
    /// The set command is not acknowledged by the device, so the state is
    /// read back afterwards; a readback that disagrees with the request is
    /// fatal.
    pub fn set_enable(&mut self, enable: bool) -> Result<()> {
        info!("setting enable = {}", enable);
        serial::send_data(&mut self.port, &message::encode_set_enable_state(enable))?;
        let actual = self.get_enable()?;
        if actual != enable {
            return Err(StageError::EnableMismatch {
                requested: enable,
                actual,
            });
        }
        Ok(())
    }

    /// Home the stage and block until the controller acknowledges it.
    ///
    /// The acknowledgment is the only completion signal; the controller
    /// reports no progress while the stage sweeps to its reference mark.
    pub fn home(&mut self) -> Result<()> {
        info!("homing stage...");
        serial::send_data(&mut self.port, &message::encode_home())?;
        let reply = serial::read_reply(&mut self.port, message::HOMED_REPLY_SIZE, HOMING_TIMEOUT)?;
        serial::ensure_drained(&mut self.port)?;
        message::check_homed(&reply)?;
        info!("done homing stage");
        Ok(())
    }

    /// Flash the front panel LED of the controller. Fire and forget.
    pub fn identify(&mut self) -> Result<()> {
        info!("flashing front panel LED");
        serial::send_data(&mut self.port, &message::encode_identify())
    }

    /// Query the position counter.
    ///
    /// Also caches the channel id echoed in the reply; the device requires
    /// those bytes verbatim in every move command, so at least one position
    /// query must precede the first move. The returned value has the zero
    /// offset removed, matching the millimeter scale of [`Stage::move_mm`].
    pub fn get_position_mm(&mut self) -> Result<f64> {
        serial::send_data(&mut self.port, &message::encode_req_position())?;
        let reply =
            serial::read_reply(&mut self.port, message::POSITION_REPLY_SIZE, REPLY_TIMEOUT)?;
        serial::ensure_drained(&mut self.port)?;
        let (channel, counts) = message::decode_position(&reply)?;
        self.channel = Some(channel);
        let position_mm = self.calibration.counts_to_mm(counts) - self.calibration.zero_offset_mm;
        self.state.position_mm = position_mm;
        info!("position = {:.4} mm", position_mm);
        Ok(position_mm)
    }

    /// Move the stage and return the legalized absolute target.
    ///
    /// `value_mm` is the absolute target or the signed relative distance,
    /// depending on `mode`. It is first legalized, snapped to the nearest
    /// encoder count, and the resulting absolute target is checked against
    /// the travel range before any byte is sent; a rejected move leaves
    /// the driver and device untouched.
    ///
    /// With `block` the call waits for the controller's move-completed
    /// message. Without it the move stays pending: resolve it with
    /// [`Stage::finish_move`], or let the next `move_mm` resolve it first,
    /// before any other exchange.
    pub fn move_mm(&mut self, value_mm: f64, mode: MoveMode, block: bool) -> Result<f64> {
        if self.state.moving {
            self.finish_move()?;
        }
        let counts = self.calibration.mm_to_counts(value_mm);
        let legal_mm = self.calibration.counts_to_mm(counts);
        let target_mm = match mode {
            MoveMode::Absolute => legal_mm,
            MoveMode::Relative => self.state.position_mm + legal_mm,
        };
        if !value_mm.is_finite() || !self.calibration.within_travel(target_mm) {
            return Err(StageError::OutOfRange {
                target_mm,
                min_mm: self.calibration.position_min_mm,
                max_mm: self.calibration.position_max_mm,
                tol_mm: self.calibration.range_tol_mm,
            });
        }
        let channel = self.channel.ok_or(StageError::ChannelNotEstablished)?;
        // The zero offset applies to absolute addressing only; relative
        // deltas are offset invariant.
        let wire_counts = match mode {
            MoveMode::Absolute => counts + self.calibration.offset_counts(),
            MoveMode::Relative => counts,
        };
        info!("moving to {:.4} mm ({:?}, block = {})", target_mm, mode, block);
        serial::send_data(&mut self.port, &message::encode_move(mode, channel, wire_counts))?;
        self.state.position_mm = target_mm;
        self.state.moving = true;
        if block {
            self.finish_move()?;
        }
        Ok(target_mm)
    }

    /// Wait for the move-completed message of a pending move. A no-op when
    /// nothing is pending.
    pub fn finish_move(&mut self) -> Result<()> {
        if !self.state.moving {
            return Ok(());
        }
        let reply = serial::read_reply(&mut self.port, message::MOVE_COMPLETED_SIZE, MOVE_TIMEOUT)?;
        serial::ensure_drained(&mut self.port)?;
        message::check_move_completed(&reply)?;
        self.state.moving = false;
        info!("done moving");
        Ok(())
    }

    /// Close the session. The port is released when the stage is dropped,
    /// so this only exists to make the hand-back explicit in call sites.
    pub fn close(self) {
        info!("closing stage");
    }
}
