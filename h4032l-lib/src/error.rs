use crate::scheduler::CompletionStatus;
use nusb::transfer::TransferError;
use thiserror::Error;

/// The primary error type for the `h4032l-lib` library.
#[derive(Error, Debug)]
pub enum H4032LError {
    #[error("USB device not found. Is the Hantek 4032L connected?")]
    DeviceNotFound,

    #[error("device is not open")]
    DeviceNotReady,

    #[error("USB error: {0}")]
    Usb(#[from] nusb::Error),

    #[error("USB transfer error: {0}")]
    Transfer(#[from] TransferError),

    #[error("Timeout during USB operation: {0}")]
    Timeout(#[from] tokio::time::error::Elapsed),

    #[error("transfer did not complete: {0:?}")]
    TransferIncomplete(CompletionStatus),

    #[error("unsupported sample rate: {0} Hz")]
    InvalidSampleRate(u64),

    #[error("sample count out of range 2k...64M: {0}")]
    InvalidSampleSize(u64),

    #[error("capture ratio should be between 0 ... 100, got {0}")]
    InvalidCaptureRatio(u64),

    #[error("only one trigger stage supported")]
    UnsupportedTriggerTopology,

    #[error("only one trigger signal with fall/rising/edge allowed")]
    ConflictingEdgeTrigger,

    #[error("unknown trigger match kind")]
    UnknownTriggerMatch,

    #[error("no such channel: {0}")]
    InvalidChannel(u8),

    #[error("mismatched magic number at start of sample stream: {found:#010x}")]
    StartMagicMismatch { found: u32 },

    #[error("received status response shorter than a status packet: {0} bytes")]
    ShortStatusResponse(usize),
}
