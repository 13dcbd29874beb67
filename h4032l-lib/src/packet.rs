use crate::constants::{COMMAND_PACKET_MAGIC, STATUS_PACKET_MAGIC, STATUS_READY};
use crate::error::H4032LError;
use crate::transforms::voltage_to_pwm;
use modular_bitfield::prelude::*;
use num_enum::{FromPrimitive, IntoPrimitive, TryFromPrimitive};
use zerocopy::byteorder::little_endian::{U16, U32};
use zerocopy::{FromBytes, FromZeros, Immutable, IntoBytes, KnownLayout, Unaligned};

/// Command opcode selecting which protocol phase the device executes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u16)]
pub enum Opcode {
    /// Push configuration and arm the logic analyzer.
    Configure = 0x2B1A,
    /// Request a status packet.
    Status = 0x4B3A,
    /// Request the captured sample stream.
    Get = 0x6B5A,
}

/// Edge condition encoded in the trigger flag word.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, FromPrimitive)]
#[repr(u8)]
pub enum EdgeType {
    Rise = 0,
    Fall = 1,
    Toggle = 2,
    #[num_enum(default)]
    Disabled = 3,
}

/// Data-range comparison mode of a trigger slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DataRangeType {
    Max = 0,
    MinOrMax = 1,
    OutOfRange = 2,
    WithinRange = 3,
}

/// Time-range comparison mode of a trigger slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum TimeRangeType {
    Max = 0,
    MinOrMax = 1,
    OutOfRange = 2,
    WithinRange = 3,
}

/// Data-selection mode of a trigger slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[repr(u8)]
pub enum DataSelection {
    Next = 0,
    Current = 1,
    Prev = 2,
}

/// Bit-packed flag word of one trigger slot, LSB first.
#[bitfield(bytes = 4)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TriggerFlags {
    pub edge_signal: B5,
    pub edge_type: B2,
    #[skip]
    __: B1,
    pub data_range_type: B2,
    pub time_range_type: B2,
    pub data_range_enabled: bool,
    pub time_range_enabled: bool,
    #[skip]
    __: B2,
    pub data_sel: B2,
    pub combined_enabled: bool,
    #[skip]
    __: B13,
}

/// Trigger-enable flag byte of the command packet.
#[bitfield(bytes = 1)]
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TrigFlags {
    pub enable_trigger1: bool,
    pub enable_trigger2: bool,
    pub trigger_and_logic: bool,
    #[skip]
    __: B5,
}

/// One of the two device-side trigger slots. Only slot 0 is populated
/// today; slot 1 is reserved by the firmware for a second stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct TriggerDescriptor {
    flags: [u8; 4],
    pub data_range_min: U32,
    pub data_range_max: U32,
    pub time_range_min: U32,
    pub time_range_max: U32,
    pub data_range_mask: U32,
    pub combine_mask: U32,
    pub combine_data: U32,
}

impl TriggerDescriptor {
    pub fn flags(&self) -> TriggerFlags {
        TriggerFlags::from_bytes(self.flags)
    }

    pub fn set_flags(&mut self, flags: TriggerFlags) {
        self.flags = flags.into_bytes();
    }
}

/// The host-to-device command packet, sent on the command OUT endpoint
/// for every phase of the handshake. Byte-exact wire layout,
/// little-endian, no padding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct CommandPacket {
    pub magic: U16,
    pub sample_rate: u8,
    trig_flags: u8,
    pub pwm_a: U16,
    pub pwm_b: U16,
    pub reserved: U16,
    pub sample_size: U32,
    pub pre_trigger_size: U32,
    pub trigger: [TriggerDescriptor; 2],
    command: U16,
}

impl CommandPacket {
    /// Create a command packet with the defaults the device context
    /// carries from attach time: 2.5 V thresholds on both channel
    /// groups, 16384 samples, 1024 pre-trigger samples.
    pub fn new() -> Self {
        let mut packet = Self::new_zeroed();
        packet.magic = U16::new(COMMAND_PACKET_MAGIC);
        packet.pwm_a = U16::new(voltage_to_pwm(2.5));
        packet.pwm_b = U16::new(voltage_to_pwm(2.5));
        packet.sample_size = U32::new(16384);
        packet.pre_trigger_size = U32::new(1024);
        packet
    }

    pub fn trig_flags(&self) -> TrigFlags {
        TrigFlags::from_bytes([self.trig_flags])
    }

    pub fn set_trig_flags(&mut self, flags: TrigFlags) {
        self.trig_flags = flags.into_bytes()[0];
    }

    pub fn opcode(&self) -> Option<Opcode> {
        Opcode::try_from(self.command.get()).ok()
    }

    pub fn set_opcode(&mut self, opcode: Opcode) {
        self.command = U16::new(opcode.into());
    }

    /// Encode to the exact wire representation.
    pub fn encode(&self) -> Vec<u8> {
        self.as_bytes().to_vec()
    }
}

impl Default for CommandPacket {
    fn default() -> Self {
        Self::new()
    }
}

/// The device-to-host status packet received during the status-poll
/// phase. Ephemeral: only ever an interpretation of the most recent
/// receive buffer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, FromBytes, IntoBytes, KnownLayout, Immutable, Unaligned)]
#[repr(C)]
pub struct StatusPacket {
    pub magic: U32,
    pub values: U32,
    pub status: U32,
}

impl StatusPacket {
    /// Interpret the leading bytes of a receive buffer as a status packet.
    pub fn read(buffer: &[u8]) -> Result<Self, H4032LError> {
        Self::read_from_prefix(buffer)
            .map(|(packet, _)| packet)
            .map_err(|_| H4032LError::ShortStatusResponse(buffer.len()))
    }

    pub fn magic_valid(&self) -> bool {
        self.magic.get() == STATUS_PACKET_MAGIC
    }

    /// Sample buffer ready; any other status value means retry.
    pub fn is_ready(&self) -> bool {
        self.status.get() == STATUS_READY
    }
}
