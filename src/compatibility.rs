//! Compatibility Resolver - Rule Based
//!
//! The height decides which layer slots exist. Items may be restricted to
//! some heights. Rules produce structured violations; `repair` brings a
//! selection back in line after a height change.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::catalog::{Catalog, CatalogItem, Height, ItemId, Slot};
use crate::selection::Selection;

const SLOT_TABLE: [(u8, &[Slot]); 3] = [
    (10, &[Slot::Layer1]),
    (20, &[Slot::Layer1, Slot::Layer2]),
    (30, &[Slot::Layer1, Slot::Layer2, Slot::Layer3]),
];

/// Layer slots active at `height`, in order.
pub fn layer_slots(height: Height) -> &'static [Slot] {
    SLOT_TABLE
        .iter()
        .find(|(cm, _)| *cm == height.cm())
        .map(|(_, slots)| *slots)
        .unwrap_or(&[])
}

/// Active layer slots followed by the cover slot.
pub fn active_slots(height: Height) -> Vec<Slot> {
    let mut slots = layer_slots(height).to_vec();
    slots.push(Slot::Cover);
    slots
}

pub fn is_available(item: &CatalogItem, height: Height) -> bool {
    item.is_available_at(height)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotChange {
    pub slot: Slot,
    /// `None` when the slot was empty.
    pub from: Option<ItemId>,
    pub to: Option<ItemId>,
}

/// Outcome of [`repair`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Repair {
    pub selection: Selection,
    pub changes: Vec<SlotChange>,
    /// Every active layer slot still empty after repair. Non-empty only when
    /// no catalog layer fits the height.
    pub unresolved: Vec<Slot>,
}

/// Fill every active layer slot that is empty or holds an item unavailable
/// at `height` with the first catalog layer that is. Unknown ids are left
/// alone. Running it again on its own output changes nothing.
pub fn repair(selection: &Selection, height: Height, catalog: &Catalog) -> Repair {
    let fallback = catalog.layers_available_at(height).next();
    let mut repaired = selection.clone();
    let mut changes = vec![];
    let mut unresolved = vec![];

    for &slot in layer_slots(height) {
        let current = match selection.get(slot) {
            None => None,
            Some(id) => match catalog.layer(id) {
                None => continue,
                Some(item) if is_available(item, height) => continue,
                Some(item) => Some(item.id.clone()),
            },
        };

        match fallback {
            Some(replacement) => {
                debug!(%slot, from = ?current, to = %replacement.id, %height, "repairing slot");
                repaired.assign(slot, replacement.id.clone());
                changes.push(SlotChange {
                    slot,
                    from: current,
                    to: Some(replacement.id.clone()),
                });
            }
            None => {
                warn!(%slot, item = ?current, %height, "no catalog layer is available at this height");
                unresolved.push(slot);
                if current.is_some() {
                    repaired.clear(slot);
                    changes.push(SlotChange {
                        slot,
                        from: current,
                        to: None,
                    });
                }
            }
        }
    }

    Repair {
        selection: repaired,
        changes,
        unresolved,
    }
}

/// True iff every assigned id exists in the catalog and the cover is set.
/// Height plays no part here.
pub fn validate(selection: &Selection, catalog: &Catalog) -> bool {
    // Known-id rules never look at the height.
    let ctx = SelectionContext {
        catalog,
        height: Height::default(),
    };
    let rules: [&dyn SelectionRule; 2] = [&KnownLayerRule, &KnownCoverRule];
    rules
        .iter()
        .flat_map(|rule| rule.check(selection, &ctx))
        .all(|v| v.severity != ViolationSeverity::Error)
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    Error,
    Warning,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionViolation {
    pub rule: String,
    pub severity: ViolationSeverity,
    #[serde(default)]
    pub slot: Option<Slot>,
    pub message: String,
    pub remediation: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub valid: bool,
    pub violations: Vec<SelectionViolation>,
}

impl CheckResult {
    pub fn has_warnings(&self) -> bool {
        self.violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Warning)
    }
}

pub struct SelectionContext<'a> {
    pub catalog: &'a Catalog,
    pub height: Height,
}

/// Selection rule trait - produces violations
pub trait SelectionRule {
    fn name(&self) -> &'static str;
    fn check(&self, selection: &Selection, ctx: &SelectionContext<'_>) -> Vec<SelectionViolation>;
}

// --- Concrete Rules ---

pub struct KnownLayerRule;

impl SelectionRule for KnownLayerRule {
    fn name(&self) -> &'static str {
        "known_layer"
    }

    fn check(&self, selection: &Selection, ctx: &SelectionContext<'_>) -> Vec<SelectionViolation> {
        selection
            .iter()
            .filter(|(slot, id)| slot.is_layer() && ctx.catalog.layer(id).is_none())
            .map(|(slot, id)| SelectionViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Error,
                slot: Some(slot),
                message: format!("Unknown layer '{}'", id),
                remediation: vec!["Choose a layer from the catalog".to_string()],
            })
            .collect()
    }
}

pub struct KnownCoverRule;

impl SelectionRule for KnownCoverRule {
    fn name(&self) -> &'static str {
        "known_cover"
    }

    fn check(&self, selection: &Selection, ctx: &SelectionContext<'_>) -> Vec<SelectionViolation> {
        let message = match selection.get(Slot::Cover) {
            None => "No cover selected".to_string(),
            Some(id) if ctx.catalog.cover(id).is_none() => format!("Unknown cover '{}'", id),
            Some(_) => return vec![],
        };

        vec![SelectionViolation {
            rule: self.name().to_string(),
            severity: ViolationSeverity::Error,
            slot: Some(Slot::Cover),
            message,
            remediation: vec!["Choose a cover from the catalog".to_string()],
        }]
    }
}

pub struct HeightAvailabilityRule;

impl SelectionRule for HeightAvailabilityRule {
    fn name(&self) -> &'static str {
        "height_availability"
    }

    fn check(&self, selection: &Selection, ctx: &SelectionContext<'_>) -> Vec<SelectionViolation> {
        let mut violations = vec![];

        for &slot in layer_slots(ctx.height) {
            let Some(item) = selection.get(slot).and_then(|id| ctx.catalog.layer(id)) else {
                continue;
            };
            if !is_available(item, ctx.height) {
                violations.push(SelectionViolation {
                    rule: self.name().to_string(),
                    severity: ViolationSeverity::Error,
                    slot: Some(slot),
                    message: format!("'{}' is not offered at {}", item.id, ctx.height),
                    remediation: vec!["Pick another layer or change the height".to_string()],
                });
            }
        }

        violations
    }
}

pub struct CompleteSelectionRule;

impl SelectionRule for CompleteSelectionRule {
    fn name(&self) -> &'static str {
        "complete_selection"
    }

    fn check(&self, selection: &Selection, ctx: &SelectionContext<'_>) -> Vec<SelectionViolation> {
        layer_slots(ctx.height)
            .iter()
            .filter(|slot| selection.get(**slot).is_none())
            .map(|&slot| SelectionViolation {
                rule: self.name().to_string(),
                severity: ViolationSeverity::Warning,
                slot: Some(slot),
                message: "Configuration is incomplete: slot has no material".to_string(),
                remediation: vec![
                    "Pick a layer for this slot".to_string(),
                    "Check the catalog offers a layer at this height".to_string(),
                ],
            })
            .collect()
    }
}

/// Runs every rule over a selection
pub struct SelectionChecker {
    rules: Vec<Box<dyn SelectionRule + Send + Sync>>,
}

impl SelectionChecker {
    pub fn new() -> Self {
        Self {
            rules: vec![
                Box::new(KnownLayerRule),
                Box::new(KnownCoverRule),
                Box::new(HeightAvailabilityRule),
                Box::new(CompleteSelectionRule),
            ],
        }
    }

    pub fn check(&self, selection: &Selection, height: Height, catalog: &Catalog) -> CheckResult {
        let ctx = SelectionContext { catalog, height };
        let violations: Vec<_> = self
            .rules
            .iter()
            .flat_map(|rule| rule.check(selection, &ctx))
            .collect();

        // Warnings never invalidate
        let valid = !violations
            .iter()
            .any(|v| v.severity == ViolationSeverity::Error);

        CheckResult { valid, violations }
    }
}

impl Default for SelectionChecker {
    fn default() -> Self {
        Self::new()
    }
}
