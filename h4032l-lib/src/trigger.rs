//! Builds the device-side trigger descriptors from a single trigger stage.

use crate::constants::NUM_CHANNELS;
use crate::error::H4032LError;
use crate::packet::{CommandPacket, DataRangeType, EdgeType, TrigFlags, TriggerFlags};
use crate::transforms::compact_bitmask;
use num_enum::{FromPrimitive, IntoPrimitive};
use strum_macros::Display;
use zerocopy::byteorder::little_endian::U32;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Per-channel match kinds accepted in a trigger stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, IntoPrimitive, FromPrimitive)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[repr(u8)]
pub enum TriggerMatch {
    /// Channel's logic value is fixed at 0.
    #[strum(to_string = "zero")]
    Zero = 0,
    /// Channel's logic value is fixed at 1.
    #[strum(to_string = "one")]
    One = 1,
    #[strum(to_string = "rising")]
    Rising = 2,
    #[strum(to_string = "falling")]
    Falling = 3,
    /// Either edge.
    #[strum(to_string = "edge")]
    Edge = 4,

    #[num_enum(catch_all)]
    #[strum(to_string = "unknown")]
    Unknown(u8),
}

/// Match kinds the device supports.
pub const TRIGGER_MATCHES: [TriggerMatch; 5] = [
    TriggerMatch::Zero,
    TriggerMatch::One,
    TriggerMatch::Rising,
    TriggerMatch::Falling,
    TriggerMatch::Edge,
];

/// One (channel, match kind) condition of a trigger stage.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerCondition {
    pub channel: u8,
    pub kind: TriggerMatch,
}

/// An ordered list of per-channel match conditions, combined by the
/// device into one trigger event.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct TriggerStage {
    pub conditions: Vec<TriggerCondition>,
}

/// Populate the command packet's trigger block from at most one stage.
///
/// Level matches accumulate into a sparse mask/value pair and are
/// compacted into the dense comparison value the firmware expects. At
/// most one edge-class condition may appear across the whole stage.
/// Slot 1 stays reserved and zeroed.
pub fn apply_trigger_stages(
    packet: &mut CommandPacket,
    stages: &[TriggerStage],
) -> Result<(), H4032LError> {
    packet.set_trig_flags(TrigFlags::new());

    let Some(stage) = stages.first() else {
        return Ok(());
    };
    if stages.len() > 1 {
        return Err(H4032LError::UnsupportedTriggerTopology);
    }

    packet.set_trig_flags(TrigFlags::new().with_enable_trigger1(true));

    let mut flags = TriggerFlags::new()
        .with_edge_type(EdgeType::Disabled.into())
        .with_data_range_type(DataRangeType::Max.into());
    let mut range_mask = 0u32;
    let mut range_value = 0u32;

    for condition in &stage.conditions {
        if condition.channel >= NUM_CHANNELS {
            return Err(H4032LError::InvalidChannel(condition.channel));
        }
        let channel_bit = 1u32 << condition.channel;
        match condition.kind {
            TriggerMatch::Zero => {
                range_mask |= channel_bit;
            }
            TriggerMatch::One => {
                range_mask |= channel_bit;
                range_value |= channel_bit;
            }
            TriggerMatch::Rising | TriggerMatch::Falling | TriggerMatch::Edge => {
                if EdgeType::from_primitive(flags.edge_type()) != EdgeType::Disabled {
                    return Err(H4032LError::ConflictingEdgeTrigger);
                }
                let edge = match condition.kind {
                    TriggerMatch::Rising => EdgeType::Rise,
                    TriggerMatch::Falling => EdgeType::Fall,
                    _ => EdgeType::Toggle,
                };
                flags.set_edge_type(edge.into());
                flags.set_edge_signal(condition.channel);
            }
            TriggerMatch::Unknown(_) => {
                return Err(H4032LError::UnknownTriggerMatch);
            }
        }
    }

    flags.set_data_range_enabled(range_mask != 0);

    let slot = &mut packet.trigger[0];
    slot.set_flags(flags);
    slot.data_range_min = U32::new(0);
    slot.data_range_mask = U32::new(range_mask);
    slot.data_range_max = U32::new(compact_bitmask(range_mask, range_value));

    Ok(())
}
