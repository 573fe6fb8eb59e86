//! Cart - configured mattresses waiting for checkout
//!
//! Adding a configuration that is already in the cart bumps its quantity.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use thiserror::Error;
use uuid::Uuid;

use crate::catalog::{Catalog, Slot};
use crate::engine::ConfigView;
use crate::hashing::configuration_fingerprint;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CartError {
    #[error("Quantity must be at least 1, got {0}")]
    InvalidQuantity(u32),

    #[error("No cart line at index {0}")]
    LineNotFound(usize),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CartLine {
    pub id: String,
    pub name: String,
    pub price: Decimal,
    pub quantity: u32,
    pub configuration: BTreeMap<String, String>,
    pub fingerprint: String,
    pub path: String,
    pub added_at: DateTime<Utc>,
}

impl CartLine {
    /// One mattress built from the current view.
    pub fn from_view(view: &ConfigView, catalog: &Catalog) -> Result<Self, serde_json::Error> {
        let name_of = |slot: Slot| {
            view.selection
                .get(slot)
                .and_then(|id| catalog.resolve(slot, id))
                .map(|item| item.name.clone())
                .unwrap_or_default()
        };

        let layers: Vec<Slot> = view.active_slots.iter().copied().filter(Slot::is_layer).collect();
        let layer_names: Vec<String> = layers.iter().map(|&slot| name_of(slot)).collect();
        let cover = name_of(Slot::Cover);

        let name = format!(
            "Mattress {}, {} cm: {} | Cover: {}",
            view.size,
            view.height.cm(),
            layer_names
                .iter()
                .filter(|n| !n.is_empty())
                .cloned()
                .collect::<Vec<_>>()
                .join(" + "),
            cover
        );

        let mut configuration = BTreeMap::new();
        configuration.insert("size".to_string(), view.size.to_string());
        configuration.insert("height".to_string(), format!("{} cm", view.height.cm()));
        configuration.insert("cover".to_string(), cover);
        for (idx, layer_name) in layer_names.into_iter().enumerate() {
            configuration.insert(format!("layer{}", idx + 1), layer_name);
        }

        let fingerprint = configuration_fingerprint(&name, &configuration)?;

        Ok(Self {
            id: Uuid::new_v4().to_string(),
            name,
            price: view.total,
            quantity: 1,
            configuration,
            fingerprint,
            path: view.path.clone(),
            added_at: Utc::now(),
        })
    }

    pub fn line_total(&self) -> Decimal {
        self.price * Decimal::from(self.quantity)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Cart {
    lines: Vec<CartLine>,
}

impl Cart {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn lines(&self) -> &[CartLine] {
        &self.lines
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    /// Add a line, merging it into an identical configuration if present.
    /// Returns the index of the line that now holds it.
    pub fn add(&mut self, line: CartLine) -> usize {
        if let Some(idx) = self.lines.iter().position(|l| l.fingerprint == line.fingerprint) {
            let merged = &mut self.lines[idx];
            merged.quantity = merged.quantity.saturating_add(line.quantity);
            return idx;
        }
        self.lines.push(line);
        self.lines.len() - 1
    }

    pub fn update_quantity(&mut self, index: usize, quantity: u32) -> Result<(), CartError> {
        if quantity < 1 {
            return Err(CartError::InvalidQuantity(quantity));
        }
        let line = self.lines.get_mut(index).ok_or(CartError::LineNotFound(index))?;
        line.quantity = quantity;
        Ok(())
    }

    pub fn remove(&mut self, index: usize) -> Result<CartLine, CartError> {
        if index >= self.lines.len() {
            return Err(CartError::LineNotFound(index));
        }
        Ok(self.lines.remove(index))
    }

    pub fn total(&self) -> Decimal {
        self.lines.iter().map(CartLine::line_total).sum()
    }
}
