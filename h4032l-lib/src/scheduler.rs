//! Asynchronous bulk-transfer submission, abstracted so the state
//! machine can be driven by a fake scheduler in tests.

use crate::constants::USB_TIMEOUT;
use crate::error::H4032LError;
use nusb::{Interface, transfer::RequestBuffer};
use tokio::time::timeout;
use tracing::debug;

/// Outcome reported for one asynchronous transfer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionStatus {
    Completed,
    Failed,
    Cancelled,
}

/// Submits one bulk transfer at a time on behalf of the state machine.
/// Completion is the resolution of the returned future; dropping the
/// future cancels the in-flight transfer.
pub trait TransferScheduler {
    async fn bulk_out(&mut self, endpoint: u8, data: Vec<u8>) -> Result<usize, H4032LError>;
    async fn bulk_in(&mut self, endpoint: u8, len: usize) -> Result<Vec<u8>, H4032LError>;
}

/// The real scheduler, backed by a claimed USB interface.
pub struct UsbScheduler {
    interface: Interface,
}

impl UsbScheduler {
    pub fn new(interface: Interface) -> Self {
        Self { interface }
    }
}

impl TransferScheduler for UsbScheduler {
    async fn bulk_out(&mut self, endpoint: u8, data: Vec<u8>) -> Result<usize, H4032LError> {
        let transfer = self.interface.bulk_out(endpoint, data);
        let completion = timeout(USB_TIMEOUT, transfer).await?;
        let sent = completion.into_result()?;
        debug!("sent {} bytes", sent.actual_length());
        Ok(sent.actual_length())
    }

    async fn bulk_in(&mut self, endpoint: u8, len: usize) -> Result<Vec<u8>, H4032LError> {
        let transfer = self.interface.bulk_in(endpoint, RequestBuffer::new(len));
        let completion = timeout(USB_TIMEOUT, transfer).await?;
        let data = completion.into_result()?;
        debug!("received {} bytes", data.len());
        Ok(data)
    }
}
