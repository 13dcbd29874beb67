// Protocol constants for the Hantek 4032L

use std::time::Duration;

/// USB vendor ID of the 4032L.
pub const VID: u16 = 0x04B5;
/// USB product ID of the 4032L.
pub const PID: u16 = 0x4032;

/// Bulk OUT endpoint carrying command packets (fixed by firmware).
pub const ENDPOINT_COMMAND_OUT: u8 = 0x02;
/// Bulk IN endpoint carrying status and sample data (fixed by firmware).
pub const ENDPOINT_DATA_IN: u8 = 0x86;

/// Magic identifying a command packet (host to device).
pub const COMMAND_PACKET_MAGIC: u16 = 0x017F;
/// Magic identifying a status packet (device to host).
pub const STATUS_PACKET_MAGIC: u32 = 0x2B1A_037F;
/// Magic word prefixing the sample stream.
pub const START_PACKET_MAGIC: u32 = 0x2B1A_027F;
/// Magic word trailing the sample stream.
pub const END_PACKET_MAGIC: u32 = 0x4D3C_037F;

/// Size of an encoded command packet (84 bytes).
pub const COMMAND_PACKET_SIZE: usize = 84;
/// Size of an encoded status packet (12 bytes).
pub const STATUS_PACKET_SIZE: usize = 12;

/// Size of the scratch receive buffer; every IN poll requests this much.
pub const POLL_BUFFER_SIZE: usize = 512;
/// One logic sample: all 32 channels in a single word.
pub const SAMPLE_WORD_SIZE: usize = 4;

/// Sample depth must be a multiple of this, after round-up.
pub const SAMPLE_SIZE_BLOCK: u64 = 512;
/// Smallest accepted sample depth per channel.
pub const SAMPLE_SIZE_MIN: u64 = 2048;
/// Largest accepted sample depth per channel.
pub const SAMPLE_SIZE_MAX: u64 = 64 * 1024 * 1024;

/// Device status value reporting the sample buffer is ready.
pub const STATUS_READY: u32 = 2;

/// Number of logic channels.
pub const NUM_CHANNELS: u8 = 32;

/// Timeout applied to every bulk transfer.
pub const USB_TIMEOUT: Duration = Duration::from_secs(2);
