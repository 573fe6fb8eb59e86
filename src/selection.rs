//! Selection - which catalog item sits in which slot

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::catalog::{ItemId, Slot};

/// Slot assignments. A slot with no entry is unresolved.
///
/// Layer slots above the current height keep their assignment, so lowering
/// and raising the height again restores the earlier choice.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Selection {
    slots: BTreeMap<Slot, ItemId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, slot: Slot) -> Option<&str> {
        self.slots.get(&slot).map(String::as_str)
    }

    pub fn assign(&mut self, slot: Slot, id: impl Into<ItemId>) {
        self.slots.insert(slot, id.into());
    }

    pub fn clear(&mut self, slot: Slot) {
        self.slots.remove(&slot);
    }

    pub fn with(mut self, slot: Slot, id: impl Into<ItemId>) -> Self {
        self.assign(slot, id);
        self
    }

    pub fn iter(&self) -> impl Iterator<Item = (Slot, &str)> {
        self.slots.iter().map(|(slot, id)| (*slot, id.as_str()))
    }

    /// Copy of this selection holding only the given slots.
    pub fn restricted_to(&self, slots: &[Slot]) -> Selection {
        Selection {
            slots: self
                .slots
                .iter()
                .filter(|(slot, _)| slots.contains(slot))
                .map(|(slot, id)| (*slot, id.clone()))
                .collect(),
        }
    }
}

impl FromIterator<(Slot, ItemId)> for Selection {
    fn from_iter<I: IntoIterator<Item = (Slot, ItemId)>>(iter: I) -> Self {
        Selection {
            slots: iter.into_iter().collect(),
        }
    }
}
