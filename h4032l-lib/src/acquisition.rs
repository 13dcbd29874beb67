//! The acquisition state machine: sequences the multi-phase
//! command/response handshake and reassembles the sample stream.
//!
//! The machine is transport-free. Each completed transfer is fed into
//! [`Acquisition::handle_completion`], which advances the state and
//! returns the next transfer to submit. Transfers for one device are
//! strictly sequential; exactly one submission follows every
//! completion until the machine goes idle.

use crate::constants::{
    END_PACKET_MAGIC, POLL_BUFFER_SIZE, SAMPLE_WORD_SIZE, START_PACKET_MAGIC,
};
use crate::error::H4032LError;
use crate::packet::{CommandPacket, Opcode, StatusPacket};
use crate::scheduler::CompletionStatus;
use crate::transforms;
use tracing::{debug, error, warn};
use zerocopy::byteorder::little_endian::U32;

/// Protocol phase of the command/response handshake, tracked per device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AcquisitionState {
    Idle,
    CommandConfigure,
    CommandStatus,
    ResponseStatus,
    ResponseStatusRetry,
    ResponseStatusContinue,
    CommandGet,
    FirstTransfer,
    Transfer,
}

/// Consumer of the captured sample stream.
pub trait SampleSink {
    /// One batch of logic samples; each word carries all 32 channels.
    fn logic(&mut self, samples: &[u32]);
    /// End of acquisition; exactly one per completed run.
    fn end_of_stream(&mut self);
}

/// The transfer the state machine wants submitted next.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextTransfer {
    /// Submit these bytes on the command OUT endpoint.
    CommandOut(Vec<u8>),
    /// Submit a receive poll of this size on the data IN endpoint.
    PollIn(usize),
    /// Nothing to submit; the run is over.
    Idle,
}

/// Per-device acquisition context. Created once when the device is
/// opened; `start` resets the mutable fields for every run, and the
/// command packet's static fields persist across runs.
#[derive(Debug)]
pub struct Acquisition {
    state: AcquisitionState,
    remaining_samples: u32,
    command_packet: CommandPacket,
    capture_ratio: u64,
}

impl Acquisition {
    pub fn new() -> Self {
        Self {
            state: AcquisitionState::Idle,
            remaining_samples: 0,
            command_packet: CommandPacket::new(),
            capture_ratio: 5,
        }
    }

    pub fn state(&self) -> AcquisitionState {
        self.state
    }

    pub fn remaining_samples(&self) -> u32 {
        self.remaining_samples
    }

    pub fn command_packet(&self) -> &CommandPacket {
        &self.command_packet
    }

    pub fn command_packet_mut(&mut self) -> &mut CommandPacket {
        &mut self.command_packet
    }

    pub fn capture_ratio(&self) -> u64 {
        self.capture_ratio
    }

    pub fn set_capture_ratio(&mut self, ratio: u64) -> Result<(), H4032LError> {
        self.capture_ratio = transforms::validate_capture_ratio(ratio)?;
        Ok(())
    }

    /// Arm the device: compute the pre-trigger depth from the current
    /// sample size and capture ratio, reset the sample counter, and
    /// hand back the CONFIGURE command for submission.
    pub fn start(&mut self) -> NextTransfer {
        let sample_size = self.command_packet.sample_size.get();
        let pre_trigger = transforms::pre_trigger_size(sample_size, self.capture_ratio);
        self.command_packet.pre_trigger_size = U32::new(pre_trigger);
        self.remaining_samples = sample_size;
        debug!(sample_size, pre_trigger, "arming logic analyzer");
        self.command(Opcode::Configure, AcquisitionState::CommandConfigure)
    }

    /// Force the machine back to idle without emitting anything.
    pub fn abort(&mut self) {
        self.state = AcquisitionState::Idle;
    }

    /// Single entry point for transfer completions. Advances the state
    /// and returns the next submission. An error aborts the run to
    /// idle; the device stays usable for a subsequent `start`.
    pub fn handle_completion(
        &mut self,
        status: CompletionStatus,
        buffer: &[u8],
        sink: &mut dyn SampleSink,
    ) -> Result<NextTransfer, H4032LError> {
        if status != CompletionStatus::Completed {
            error!(?status, state = ?self.state, "usb transfer did not complete");
            self.state = AcquisitionState::Idle;
            return Err(H4032LError::TransferIncomplete(status));
        }

        match self.state {
            AcquisitionState::Idle => {
                error!("usb completion delivered while idle");
                Ok(NextTransfer::Idle)
            }
            AcquisitionState::CommandConfigure => {
                // Device is armed; select the status request as next.
                Ok(self.command(Opcode::Status, AcquisitionState::CommandStatus))
            }
            AcquisitionState::CommandStatus => {
                self.state = AcquisitionState::ResponseStatus;
                Ok(self.poll())
            }
            AcquisitionState::ResponseStatus => Ok(self.on_status_response(buffer)),
            AcquisitionState::ResponseStatusRetry => {
                Ok(self.command(Opcode::Status, AcquisitionState::CommandStatus))
            }
            AcquisitionState::ResponseStatusContinue => {
                Ok(self.command(Opcode::Get, AcquisitionState::CommandGet))
            }
            AcquisitionState::CommandGet => {
                self.state = AcquisitionState::FirstTransfer;
                Ok(self.poll())
            }
            AcquisitionState::FirstTransfer => {
                let words = sample_words(buffer);
                let first = words.first().copied().unwrap_or(0);
                if first != START_PACKET_MAGIC {
                    error!("mismatch magic number of start poll: {first:#010x}");
                    self.state = AcquisitionState::Idle;
                    return Err(H4032LError::StartMagicMismatch { found: first });
                }
                self.state = AcquisitionState::Transfer;
                Ok(self.emit(&words[1..], sink))
            }
            AcquisitionState::Transfer => {
                let words = sample_words(buffer);
                Ok(self.emit(&words, sink))
            }
        }
    }

    /// Select the opcode, advance the phase, and encode the command.
    fn command(&mut self, opcode: Opcode, next: AcquisitionState) -> NextTransfer {
        self.command_packet.set_opcode(opcode);
        self.state = next;
        debug!(state = ?self.state, "new command");
        NextTransfer::CommandOut(self.command_packet.encode())
    }

    fn poll(&self) -> NextTransfer {
        debug!(state = ?self.state, "poll");
        NextTransfer::PollIn(POLL_BUFFER_SIZE)
    }

    /// A wrong status magic is a protocol desync: re-issue the status
    /// request rather than aborting. A valid magic with any status
    /// other than "ready" is retried after one more poll.
    fn on_status_response(&mut self, buffer: &[u8]) -> NextTransfer {
        match StatusPacket::read(buffer) {
            Ok(packet) if packet.magic_valid() => {
                if packet.is_ready() {
                    self.state = AcquisitionState::ResponseStatusContinue;
                } else {
                    debug!(status = packet.status.get(), "device not ready yet");
                    self.state = AcquisitionState::ResponseStatusRetry;
                }
                self.poll()
            }
            _ => {
                warn!("mismatch magic number of status poll, re-issuing status request");
                self.command(Opcode::Status, AcquisitionState::CommandStatus)
            }
        }
    }

    /// Deliver up to `remaining_samples` words from the buffer, and
    /// finish the run once the counter reaches zero.
    fn emit(&mut self, words: &[u32], sink: &mut dyn SampleSink) -> NextTransfer {
        let count = (self.remaining_samples as usize).min(words.len());
        if count > 0 {
            sink.logic(&words[..count]);
            self.remaining_samples -= count as u32;
        }
        debug!(count, remaining = self.remaining_samples, "delivered samples");

        if self.remaining_samples > 0 {
            return self.poll();
        }

        sink.end_of_stream();
        self.state = AcquisitionState::Idle;
        // Already-delivered samples are not retracted on a bad trailer.
        match words.get(count) {
            Some(&word) if word == END_PACKET_MAGIC => {}
            found => warn!(?found, "mismatch magic number of end poll"),
        }
        NextTransfer::Idle
    }
}

impl Default for Acquisition {
    fn default() -> Self {
        Self::new()
    }
}

/// Reinterpret a receive buffer as little-endian sample words; a
/// trailing partial word is dropped.
fn sample_words(buffer: &[u8]) -> Vec<u32> {
    buffer
        .chunks_exact(SAMPLE_WORD_SIZE)
        .map(|chunk| u32::from_le_bytes([chunk[0], chunk[1], chunk[2], chunk[3]]))
        .collect()
}
