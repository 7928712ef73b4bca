//! Item metadata decoding.
//!
//! Auction listings carry their item data as an opaque payload: base64 over
//! a gzip'd NBT tag tree. The decoder inflates and walks that tree to pull
//! out the handful of attributes the evaluator cares about. Decoding is
//! infallible by contract — any failure yields the sentinel defaults and the
//! auction flows on (an `"Unknown"` attribute id simply matches no price
//! data downstream).

pub mod nbt;

use std::io::Read;

use base64::Engine;
use flate2::read::GzDecoder;
use tracing::debug;

use crate::types::ItemMetadata;

/// Decodes an auction's opaque item payload into [`ItemMetadata`].
pub trait ItemMetadataDecoder: Send + Sync {
    /// Never fails: malformed payloads come back as sentinel metadata.
    fn decode(&self, item_bytes: &str) -> ItemMetadata;
}

/// Why a payload could not be decoded. Internal to the decoder; the public
/// contract maps every variant to sentinel metadata.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("invalid base64 payload: {0}")]
    Base64(#[from] base64::DecodeError),
    #[error("payload decompression failed: {0}")]
    Gunzip(#[from] std::io::Error),
    #[error("tag tree parse failed: {0}")]
    Nbt(#[from] nbt::NbtError),
}

/// The production decoder: base64 → gzip inflate → NBT walk.
#[derive(Debug, Default)]
pub struct NbtItemDecoder;

impl NbtItemDecoder {
    pub fn new() -> Self {
        Self
    }

    fn try_decode(&self, item_bytes: &str) -> Result<ItemMetadata, DecodeError> {
        let compressed = base64::engine::general_purpose::STANDARD.decode(item_bytes.trim())?;

        let mut raw = Vec::new();
        GzDecoder::new(compressed.as_slice()).read_to_end(&mut raw)?;

        let root = nbt::parse(&raw)?;

        // "upgrade_level" superseded "dungeon_item_level"; old items still
        // carry only the latter.
        let upgrade_level = root
            .find_int("upgrade_level")
            .or_else(|| root.find_int("dungeon_item_level"))
            .unwrap_or(-1);

        Ok(ItemMetadata {
            numeric_id: root.find_short("id").map(i32::from).unwrap_or(-1),
            count: root.find_byte("Count").map(i32::from).unwrap_or(-1),
            upgrade_level,
            attribute_id: root
                .find_string("id")
                .unwrap_or("Unknown")
                .to_string(),
        })
    }
}

impl ItemMetadataDecoder for NbtItemDecoder {
    fn decode(&self, item_bytes: &str) -> ItemMetadata {
        match self.try_decode(item_bytes) {
            Ok(meta) => meta,
            Err(e) => {
                debug!(error = %e, "Item payload decode failed, using sentinel metadata");
                ItemMetadata::default()
            }
        }
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
