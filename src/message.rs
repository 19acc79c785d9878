//! Byte-exact encoding and decoding of the APT messages the stage needs.
//!
//! Every message starts with a six-byte header
//! `[opcode_lo, opcode_hi, param1, param2, dest, source]`. Commands that
//! carry a payload announce it by setting the top bit of the destination
//! byte; the only such commands here are the moves, whose payload is the
//! two-byte channel id followed by a signed 32-bit count value. Replies
//! have a fixed size per opcode.

use crate::device_info::DeviceInfo;
use crate::error::{Result, StageError};

/// Destination byte of a host-to-device message.
const DEST: u8 = 0x50;
/// Source byte of a host-to-device message.
const SOURCE: u8 = 0x01;
/// Set on the destination byte when a payload follows the header.
const PAYLOAD_FLAG: u8 = 0x80;

const ENABLE_STATE_ON: u8 = 0x01;
const ENABLE_STATE_OFF: u8 = 0x02;

pub const HEADER_SIZE: usize = 6;
pub const MOVE_COMMAND_SIZE: usize = 12;

pub const INFO_REPLY_SIZE: usize = 90;
pub const ENABLE_REPLY_SIZE: usize = 6;
pub const HOMED_REPLY_SIZE: usize = 6;
pub const POSITION_REPLY_SIZE: usize = 12;
pub const MOVE_COMPLETED_SIZE: usize = 20;

// MGMSG opcodes, little-endian on the wire.
pub const HW_REQ_INFO: u16 = 0x0005;
pub const HW_GET_INFO: u16 = 0x0006;
pub const MOD_SET_CHANENABLESTATE: u16 = 0x0210;
pub const MOD_REQ_CHANENABLESTATE: u16 = 0x0211;
pub const MOD_GET_CHANENABLESTATE: u16 = 0x0212;
pub const MOD_IDENTIFY: u16 = 0x0223;
pub const MOT_REQ_POSCOUNTER: u16 = 0x0411;
pub const MOT_GET_POSCOUNTER: u16 = 0x0412;
pub const MOT_MOVE_HOME: u16 = 0x0443;
pub const MOT_MOVE_HOMED: u16 = 0x0444;
pub const MOT_MOVE_RELATIVE: u16 = 0x0448;
pub const MOT_MOVE_ABSOLUTE: u16 = 0x0453;
pub const MOT_MOVE_COMPLETED: u16 = 0x0464;

/// Addressing mode of a move command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveMode {
    Absolute,
    Relative,
}

/// Channel identifier echoed by the device in position replies.
///
/// The device expects these two bytes verbatim in every move command, so
/// the driver can only move after at least one position query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChannelId(pub(crate) [u8; 2]);

impl ChannelId {
    pub fn bytes(&self) -> [u8; 2] {
        self.0
    }
}

fn short_command(opcode: u16, param1: u8, param2: u8) -> [u8; HEADER_SIZE] {
    let [lo, hi] = opcode.to_le_bytes();
    [lo, hi, param1, param2, DEST, SOURCE]
}

pub fn encode_get_info() -> [u8; HEADER_SIZE] {
    short_command(HW_REQ_INFO, 0x00, 0x00)
}

pub fn encode_req_enable_state() -> [u8; HEADER_SIZE] {
    short_command(MOD_REQ_CHANENABLESTATE, 0x00, 0x00)
}

pub fn encode_set_enable_state(enable: bool) -> [u8; HEADER_SIZE] {
    let state = if enable {
        ENABLE_STATE_ON
    } else {
        ENABLE_STATE_OFF
    };
    short_command(MOD_SET_CHANENABLESTATE, 0x00, state)
}

pub fn encode_home() -> [u8; HEADER_SIZE] {
    short_command(MOT_MOVE_HOME, 0x00, 0x00)
}

pub fn encode_identify() -> [u8; HEADER_SIZE] {
    short_command(MOD_IDENTIFY, 0x00, 0x00)
}

pub fn encode_req_position() -> [u8; HEADER_SIZE] {
    short_command(MOT_REQ_POSCOUNTER, 0x00, 0x00)
}

/// Encode a move command. `counts` is the value that goes on the wire:
/// the signed delta for relative moves, the target plus the zero offset
/// for absolute moves. The caller owns that distinction.
pub fn encode_move(mode: MoveMode, channel: ChannelId, counts: i32) -> [u8; MOVE_COMMAND_SIZE] {
    let opcode = match mode {
        MoveMode::Absolute => MOT_MOVE_ABSOLUTE,
        MoveMode::Relative => MOT_MOVE_RELATIVE,
    };
    let [lo, hi] = opcode.to_le_bytes();
    let [ch0, ch1] = channel.bytes();
    let [c0, c1, c2, c3] = counts.to_le_bytes();
    [
        lo,
        hi,
        0x06,
        0x00,
        DEST | PAYLOAD_FLAG,
        SOURCE,
        ch0,
        ch1,
        c0,
        c1,
        c2,
        c3,
    ]
}

fn check_reply(reply: &[u8], expected_len: usize, expected_opcode: u16) -> Result<()> {
    if reply.len() != expected_len {
        return Err(StageError::ReplyLength {
            expected: expected_len,
            actual: reply.len(),
        });
    }
    let opcode = u16::from_le_bytes([reply[0], reply[1]]);
    if opcode != expected_opcode {
        return Err(StageError::UnexpectedReply { opcode });
    }
    Ok(())
}

/// Decode the 90-byte hardware info reply.
pub fn decode_info(reply: &[u8]) -> Result<DeviceInfo> {
    check_reply(reply, INFO_REPLY_SIZE, HW_GET_INFO)?;
    let mut model_number = [0u8; 8];
    model_number.copy_from_slice(&reply[10..18]);
    Ok(DeviceInfo {
        model_number,
        type_code: u16::from_le_bytes([reply[18], reply[19]]),
        serial_number: u32::from_le_bytes([reply[6], reply[7], reply[8], reply[9]]),
        firmware_version: u32::from_le_bytes([reply[20], reply[21], reply[22], reply[23]]),
        hardware_version: u16::from_le_bytes([reply[84], reply[85]]),
    })
}

/// Decode the 6-byte enable state reply into an "is enabled" flag.
pub fn decode_enable_state(reply: &[u8]) -> Result<bool> {
    check_reply(reply, ENABLE_REPLY_SIZE, MOD_GET_CHANENABLESTATE)?;
    match reply[3] {
        ENABLE_STATE_ON => Ok(true),
        ENABLE_STATE_OFF => Ok(false),
        other => Err(StageError::InvalidEnableState(other)),
    }
}

/// Decode the 12-byte position reply into the channel id and raw counts.
pub fn decode_position(reply: &[u8]) -> Result<(ChannelId, i32)> {
    check_reply(reply, POSITION_REPLY_SIZE, MOT_GET_POSCOUNTER)?;
    let channel = ChannelId([reply[6], reply[7]]);
    let counts = i32::from_le_bytes([reply[8], reply[9], reply[10], reply[11]]);
    Ok((channel, counts))
}

/// Validate the homed acknowledgment. Its receipt is the completion signal
/// of the homing routine; it carries no data worth decoding.
pub fn check_homed(reply: &[u8]) -> Result<()> {
    check_reply(reply, HOMED_REPLY_SIZE, MOT_MOVE_HOMED)
}

/// Validate the header of a move-completed message. The status fields in
/// its payload are discarded; receipt alone signals completion.
pub fn check_move_completed(reply: &[u8]) -> Result<()> {
    check_reply(reply, MOVE_COMPLETED_SIZE, MOT_MOVE_COMPLETED)
}
