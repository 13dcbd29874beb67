//! Common test utilities and shared imports

// Allow unused imports and dead code since this is a shared module
// used across multiple test files - not all items are used in every test file
#[allow(unused_imports)]
pub use h4032l_lib::acquisition::{Acquisition, AcquisitionState, NextTransfer, SampleSink};
#[allow(unused_imports)]
pub use h4032l_lib::constants::*;
#[allow(unused_imports)]
pub use h4032l_lib::error::H4032LError;
#[allow(unused_imports)]
pub use h4032l_lib::packet::{
    CommandPacket, DataRangeType, EdgeType, Opcode, StatusPacket, TrigFlags, TriggerFlags,
};
#[allow(unused_imports)]
pub use h4032l_lib::scheduler::CompletionStatus;
#[allow(unused_imports)]
pub use h4032l_lib::transforms::*;
#[allow(unused_imports)]
pub use h4032l_lib::trigger::{
    TRIGGER_MATCHES, TriggerCondition, TriggerMatch, TriggerStage, apply_trigger_stages,
};
#[allow(unused_imports)]
pub use zerocopy::byteorder::little_endian::{U16, U32};

/// Sink recording every delivered batch and end-of-stream marker.
#[derive(Default)]
pub struct RecordingSink {
    pub batches: Vec<Vec<u32>>,
    pub ended: usize,
}

impl RecordingSink {
    pub fn total_samples(&self) -> usize {
        self.batches.iter().map(|batch| batch.len()).sum()
    }
}

impl SampleSink for RecordingSink {
    fn logic(&mut self, samples: &[u32]) {
        self.batches.push(samples.to_vec());
    }

    fn end_of_stream(&mut self) {
        self.ended += 1;
    }
}

/// A full-size status poll buffer with the given magic and status.
#[allow(dead_code)]
pub fn status_buffer(magic: u32, status: u32) -> Vec<u8> {
    let mut buffer = vec![0u8; POLL_BUFFER_SIZE];
    buffer[0..4].copy_from_slice(&magic.to_le_bytes());
    buffer[8..12].copy_from_slice(&status.to_le_bytes());
    buffer
}

/// A data poll buffer holding the given words.
#[allow(dead_code)]
pub fn words_buffer(words: &[u32]) -> Vec<u8> {
    words.iter().flat_map(|word| word.to_le_bytes()).collect()
}

/// The opcode encoded in the trailing two bytes of a command packet.
#[allow(dead_code)]
pub fn opcode_of(packet_bytes: &[u8]) -> u16 {
    let tail: [u8; 2] = packet_bytes[packet_bytes.len() - 2..].try_into().unwrap();
    u16::from_le_bytes(tail)
}
