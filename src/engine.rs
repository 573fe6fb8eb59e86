//! Configuration Engine - Single Entry Point
//!
//! State changes go through `apply`. Price, description and path are pure
//! projections of the resulting state, computed by `view`.
//!
//! CRITICAL: a height change ALWAYS repairs the selection inside the same
//! transition. No caller ever sees a selection that does not fit its height.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, info};

use crate::catalog::{Catalog, Height, ItemId, Size, SizeKind, Slot, LAYER_SLOTS};
use crate::compatibility::{self, active_slots, layer_slots, SelectionChecker, SelectionViolation};
use crate::description::{self, CoverDescription, Description};
use crate::loader::CatalogBundle;
use crate::pricing::{self, PriceLine};
use crate::selection::Selection;
use crate::url_codec::{self, ReverseMapping};

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("Unknown item '{item_id}' for slot {slot}")]
    UnknownItem { slot: Slot, item_id: ItemId },

    #[error("'{item_id}' is not a {expected} item")]
    KindMismatch { slot: Slot, item_id: ItemId, expected: &'static str },

    #[error("Item '{item_id}' is not available at {height}")]
    Unavailable { item_id: ItemId, height: Height },

    #[error("Engine is not ready")]
    NotReady,
}

fn default_slot_label() -> String {
    "Slot".to_string()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineSettings {
    #[serde(default)]
    pub default_size: Size,
    #[serde(default)]
    pub default_height: Height,
    /// Word used in dynamic block titles, e.g. "Slot 1 and 2".
    #[serde(default = "default_slot_label")]
    pub slot_label: String,
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            default_size: Size::default(),
            default_height: Height::default(),
            slot_label: default_slot_label(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConfigState {
    pub size: Size,
    pub height: Height,
    pub selection: Selection,
    /// Active layer slots left empty because no catalog layer fits the height.
    #[serde(default)]
    pub unresolved: Vec<Slot>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    ChangeHeight { height: Height },
    ChangeSize { size: Size },
    ChangeSlotItem { slot: Slot, item_id: ItemId },
}

/// Everything the presentation layer needs for one state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigView {
    pub size: Size,
    pub size_kind: SizeKind,
    pub height: Height,
    pub active_slots: Vec<Slot>,
    pub selection: Selection,
    pub total: Decimal,
    pub breakdown: Vec<PriceLine>,
    pub description: Description,
    /// Rendered between the dynamic and info blocks by the consumer.
    pub cover_description: Option<CoverDescription>,
    pub path: String,
    pub complete: bool,
    pub violations: Vec<SelectionViolation>,
}

/// The configurator - owns the loaded catalogs for one session
pub struct Configurator {
    bundle: CatalogBundle,
    reverse: ReverseMapping,
    settings: EngineSettings,
    checker: SelectionChecker,
}

impl Configurator {
    pub fn new(bundle: CatalogBundle, settings: EngineSettings) -> Self {
        let reverse = bundle.mapping.reverse();
        Self {
            bundle,
            reverse,
            settings,
            checker: SelectionChecker::new(),
        }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.bundle.catalog
    }

    pub fn bundle(&self) -> &CatalogBundle {
        &self.bundle
    }

    pub fn settings(&self) -> &EngineSettings {
        &self.settings
    }

    /// First catalog item in every slot, repaired for the default height.
    pub fn default_state(&self) -> ConfigState {
        let catalog = self.catalog();
        let mut selection = Selection::new();
        if let Some(first) = catalog.layers.first() {
            for slot in LAYER_SLOTS {
                selection.assign(slot, first.id.clone());
            }
        }
        if let Some(cover) = catalog.covers.first() {
            selection.assign(Slot::Cover, cover.id.clone());
        }

        self.settle(self.settings.default_size, self.settings.default_height, selection)
    }

    /// Restore a state from a shared path, falling back to defaults when the
    /// path is malformed or names items the catalog does not have.
    pub fn restore(&self, path: &str) -> ConfigState {
        let Some(decoded) = url_codec::decode_with(path, &self.reverse) else {
            debug!(path, "path did not decode, using defaults");
            return self.default_state();
        };

        if !compatibility::validate(&decoded.selection, self.catalog()) {
            debug!(path, "path names unknown items, using defaults");
            return self.default_state();
        }

        // Hidden layer slots start from the first catalog layer.
        let mut selection = decoded.selection;
        if let Some(first) = self.catalog().layers.first() {
            for slot in LAYER_SLOTS {
                if !layer_slots(decoded.height).contains(&slot) {
                    selection.assign(slot, first.id.clone());
                }
            }
        }

        self.settle(decoded.size, decoded.height, selection)
    }

    /// The reducer.
    pub fn apply(&self, state: &ConfigState, action: Action) -> Result<ConfigState, EngineError> {
        debug!(?action, "applying action");

        match action {
            Action::ChangeHeight { height } => {
                Ok(self.settle(state.size, height, state.selection.clone()))
            }

            // Size affects price only; availability never depends on it.
            Action::ChangeSize { size } => Ok(ConfigState {
                size,
                ..state.clone()
            }),

            Action::ChangeSlotItem { slot, item_id } => {
                let catalog = self.catalog();
                let Some(item) = catalog.resolve(slot, &item_id) else {
                    let other_kind = if slot.is_layer() {
                        catalog.cover(&item_id).is_some()
                    } else {
                        catalog.layer(&item_id).is_some()
                    };
                    if other_kind {
                        let expected = if slot.is_layer() { "layer" } else { "cover" };
                        return Err(EngineError::KindMismatch { slot, item_id, expected });
                    }
                    return Err(EngineError::UnknownItem { slot, item_id });
                };

                if layer_slots(state.height).contains(&slot) && !item.is_available_at(state.height) {
                    return Err(EngineError::Unavailable {
                        item_id,
                        height: state.height,
                    });
                }

                let mut next = state.clone();
                next.selection.assign(slot, item_id);
                next.unresolved.retain(|s| *s != slot);
                Ok(next)
            }
        }
    }

    pub fn view(&self, state: &ConfigState) -> ConfigView {
        let catalog = self.catalog();
        let slots = active_slots(state.height);
        let check = self.checker.check(&state.selection, state.height, catalog);

        ConfigView {
            size: state.size,
            size_kind: state.size.kind(),
            height: state.height,
            selection: state.selection.restricted_to(&slots),
            total: pricing::total(&state.selection, state.size, state.height, catalog),
            breakdown: pricing::breakdown(&state.selection, state.size, state.height, catalog),
            description: description::aggregate(
                &state.selection,
                state.height,
                catalog,
                &self.bundle.descriptions,
                &self.settings.slot_label,
            ),
            cover_description: state
                .selection
                .get(Slot::Cover)
                .and_then(|id| self.bundle.descriptions.cover_description(id))
                .cloned(),
            path: self.path(state),
            complete: check.valid && !check.has_warnings(),
            violations: check.violations,
            active_slots: slots,
        }
    }

    pub fn path(&self, state: &ConfigState) -> String {
        url_codec::encode(
            state.size,
            state.height,
            &state.selection,
            &active_slots(state.height),
            &self.bundle.mapping,
        )
    }

    fn settle(&self, size: Size, height: Height, selection: Selection) -> ConfigState {
        let repair = compatibility::repair(&selection, height, self.catalog());
        if !repair.changes.is_empty() {
            info!(%height, changes = repair.changes.len(), "selection repaired for height");
        }

        ConfigState {
            size,
            height,
            selection: repair.selection,
            unresolved: repair.unresolved,
        }
    }
}
