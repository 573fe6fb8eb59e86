//! URL Codec
//!
//! A configuration is shared as one path segment:
//! `<size>-<height>cm-<layer keys...>-<cover key>`, with exactly as many
//! layer keys as the height activates. Short keys come from the mapping
//! table; ids missing from it are written raw.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, warn};

use crate::catalog::{Height, ItemId, Size, Slot};
use crate::compatibility::layer_slots;
use crate::selection::Selection;

pub const SEPARATOR: char = '-';

/// id → short key tables, used only to keep URLs compact.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UrlMapping {
    #[serde(default)]
    pub layers: HashMap<ItemId, String>,
    #[serde(default)]
    pub covers: HashMap<ItemId, String>,
}

impl UrlMapping {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    fn key_for<'a>(&'a self, slot: Slot, id: &'a str) -> &'a str {
        let table = if slot.is_layer() { &self.layers } else { &self.covers };
        table.get(id).map(String::as_str).unwrap_or(id)
    }

    pub fn reverse(&self) -> ReverseMapping {
        let invert = |table: &HashMap<ItemId, String>| {
            table
                .iter()
                .map(|(id, key)| (key.clone(), id.clone()))
                .collect()
        };
        ReverseMapping {
            layers: invert(&self.layers),
            covers: invert(&self.covers),
        }
    }
}

/// short key → id tables, built once per mapping.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReverseMapping {
    layers: HashMap<String, ItemId>,
    covers: HashMap<String, ItemId>,
}

impl ReverseMapping {
    fn id_for(&self, slot: Slot, key: &str) -> ItemId {
        let table = if slot.is_layer() { &self.layers } else { &self.covers };
        table.get(key).cloned().unwrap_or_else(|| key.to_string())
    }
}

/// Size, height and selection recovered from a path.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DecodedPath {
    pub size: Size,
    pub height: Height,
    /// Holds only the slots active at `height`.
    pub selection: Selection,
}

/// Serialize a configuration into its path segment.
///
/// An empty slot is written as an empty token so the segment keeps its
/// shape; decoding turns it back into an empty slot.
pub fn encode(
    size: Size,
    height: Height,
    selection: &Selection,
    active_slots: &[Slot],
    mapping: &UrlMapping,
) -> String {
    let mut parts: Vec<String> = vec![size.to_string(), height.to_string()];

    let layers = active_slots.iter().filter(|slot| slot.is_layer());
    for &slot in layers.chain(std::iter::once(&Slot::Cover)) {
        let key = selection
            .get(slot)
            .map(|id| mapping.key_for(slot, id))
            .unwrap_or("");
        if key.contains(SEPARATOR) {
            warn!(%slot, key, "url key contains the separator and will not decode");
        }
        parts.push(key.to_string());
    }

    parts.join(&SEPARATOR.to_string())
}

/// Parse the last segment of `path`. Returns `None` on any structural
/// mismatch; ids are not checked against the catalog here.
pub fn decode(path: &str, mapping: &UrlMapping) -> Option<DecodedPath> {
    decode_with(path, &mapping.reverse())
}

pub fn decode_with(path: &str, reverse: &ReverseMapping) -> Option<DecodedPath> {
    let segment = path.rsplit('/').next().unwrap_or("");
    if segment.is_empty() {
        return None;
    }

    let parts: Vec<&str> = segment.split(SEPARATOR).collect();
    if parts.len() < 3 {
        debug!(segment, "too few tokens in path");
        return None;
    }

    let size: Size = match parts[0].parse() {
        Ok(size) => size,
        Err(e) => {
            debug!(segment, error = %e, "path rejected");
            return None;
        }
    };
    let height = match Height::from_token(parts[1]) {
        Ok(height) => height,
        Err(e) => {
            debug!(segment, error = %e, "path rejected");
            return None;
        }
    };

    let slots = layer_slots(height);
    let expected = 2 + slots.len() + 1;
    if parts.len() != expected {
        debug!(segment, expected, found = parts.len(), "token count does not match height");
        return None;
    }

    let mut selection = Selection::new();
    for (&slot, key) in slots
        .iter()
        .chain(std::iter::once(&Slot::Cover))
        .zip(&parts[2..])
    {
        if !key.is_empty() {
            selection.assign(slot, reverse.id_for(slot, key));
        }
    }

    Some(DecodedPath {
        size,
        height,
        selection,
    })
}

/// The location to put in place of `current_path` once the configuration
/// encodes to `encoded`. A trailing configuration segment is replaced,
/// anything else gets the segment appended.
pub fn sync_location(current_path: &str, encoded: &str) -> String {
    let (head, last) = match current_path.rsplit_once('/') {
        Some((head, last)) => (head, last),
        None => ("", current_path),
    };
    let is_config = last.contains('x') && last.contains("cm");

    let base = if is_config {
        if head.is_empty() { "/" } else { head }
    } else {
        current_path
    };

    if base.ends_with('/') {
        format!("{}{}", base, encoded)
    } else {
        format!("{}/{}", base, encoded)
    }
}
