//! Binary decoding for avatar pose data

pub mod pose;

pub use pose::{
    decode_compact_update, decode_compact_update_30, decode_compact_update_60,
    decode_full_update_position, is_valid_position, CompactUpdate,
};
