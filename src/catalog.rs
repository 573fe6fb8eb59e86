//! Catalog - Sizes, Heights, Slots and the Items Offered for Them
//!
//! Raw catalog JSON carries two pricing shapes and an optional height list.
//! Both are normalized at load time so the rest of the engine sees one shape.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeSet, HashMap};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;
use tracing::warn;

pub type ItemId = String;

const SIZE_TABLE: [(u16, u16); 10] = [
    (80, 190),
    (85, 195),
    (80, 200),
    (90, 200),
    (100, 200),
    (120, 200),
    (140, 200),
    (160, 200),
    (180, 200),
    (200, 200),
];

const DOUBLE_MIN_WIDTH: u16 = 160;

const HEIGHT_TABLE: [u8; 3] = [10, 20, 30];

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DimensionError {
    #[error("Unknown size: {0}")]
    UnknownSize(String),

    #[error("Unknown height: {0}")]
    UnknownHeight(String),

    #[error("Unknown slot: {0}")]
    UnknownSlot(String),
}

// --- Size ---

/// Mattress footprint in centimeters, always one of the offered sizes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Size {
    width: u16,
    length: u16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SizeKind {
    Single,
    Double,
}

impl Size {
    /// All offered sizes in catalog order.
    pub fn all() -> impl Iterator<Item = Size> {
        SIZE_TABLE
            .iter()
            .map(|&(width, length)| Size { width, length })
    }

    pub fn width(&self) -> u16 {
        self.width
    }

    pub fn length(&self) -> u16 {
        self.length
    }

    pub fn kind(&self) -> SizeKind {
        if self.width >= DOUBLE_MIN_WIDTH {
            SizeKind::Double
        } else {
            SizeKind::Single
        }
    }
}

impl Default for Size {
    fn default() -> Self {
        let (width, length) = SIZE_TABLE[0];
        Self { width, length }
    }
}

impl fmt::Display for Size {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.length)
    }
}

impl FromStr for Size {
    type Err = DimensionError;

    // Only the canonical spelling is accepted ("080x190" is not a size).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Size::all()
            .find(|size| size.to_string() == s)
            .ok_or_else(|| DimensionError::UnknownSize(s.to_string()))
    }
}

impl TryFrom<String> for Size {
    type Error = DimensionError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<Size> for String {
    fn from(size: Size) -> Self {
        size.to_string()
    }
}

// --- Height ---

/// Mattress height in centimeters. Displays as the URL token, e.g. `20cm`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Height(u8);

impl Height {
    pub fn all() -> impl Iterator<Item = Height> {
        HEIGHT_TABLE.iter().map(|&cm| Height(cm))
    }

    pub fn cm(&self) -> u8 {
        self.0
    }

    /// Parse the strict URL form `<N>cm`.
    pub fn from_token(token: &str) -> Result<Self, DimensionError> {
        token
            .strip_suffix("cm")
            .and_then(|digits| digits.parse::<u8>().ok())
            .and_then(|cm| Height::try_from(cm).ok())
            .ok_or_else(|| DimensionError::UnknownHeight(token.to_string()))
    }
}

impl Default for Height {
    fn default() -> Self {
        Height(30)
    }
}

impl fmt::Display for Height {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}cm", self.0)
    }
}

impl TryFrom<u8> for Height {
    type Error = DimensionError;

    fn try_from(cm: u8) -> Result<Self, Self::Error> {
        if HEIGHT_TABLE.contains(&cm) {
            Ok(Height(cm))
        } else {
            Err(DimensionError::UnknownHeight(cm.to_string()))
        }
    }
}

impl From<Height> for u8 {
    fn from(height: Height) -> Self {
        height.0
    }
}

impl FromStr for Height {
    type Err = DimensionError;

    /// Accepts both `20` and `20cm`.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let digits = s.strip_suffix("cm").unwrap_or(s);
        digits
            .parse::<u8>()
            .ok()
            .and_then(|cm| Height::try_from(cm).ok())
            .ok_or_else(|| DimensionError::UnknownHeight(s.to_string()))
    }
}

// --- Slots ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Slot {
    #[serde(rename = "layer-1")]
    Layer1,
    #[serde(rename = "layer-2")]
    Layer2,
    #[serde(rename = "layer-3")]
    Layer3,
    #[serde(rename = "cover")]
    Cover,
}

pub const LAYER_SLOTS: [Slot; 3] = [Slot::Layer1, Slot::Layer2, Slot::Layer3];

impl Slot {
    pub fn as_str(&self) -> &'static str {
        match self {
            Slot::Layer1 => "layer-1",
            Slot::Layer2 => "layer-2",
            Slot::Layer3 => "layer-3",
            Slot::Cover => "cover",
        }
    }

    /// 1-based layer position; `None` for the cover.
    pub fn position(&self) -> Option<usize> {
        match self {
            Slot::Layer1 => Some(1),
            Slot::Layer2 => Some(2),
            Slot::Layer3 => Some(3),
            Slot::Cover => None,
        }
    }

    pub fn is_layer(&self) -> bool {
        !matches!(self, Slot::Cover)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Slot {
    type Err = DimensionError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        [Slot::Layer1, Slot::Layer2, Slot::Layer3, Slot::Cover]
            .into_iter()
            .find(|slot| slot.as_str() == s)
            .ok_or_else(|| DimensionError::UnknownSlot(s.to_string()))
    }
}

// --- Items ---

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Pricing {
    /// Legacy single price, identical for every size.
    Flat(Decimal),
    /// Price per size; sizes absent from the table cost nothing.
    PerSize(HashMap<Size, Decimal>),
}

impl Pricing {
    pub fn amount_for(&self, size: Size) -> Decimal {
        match self {
            Pricing::Flat(amount) => *amount,
            Pricing::PerSize(table) => table.get(&size).copied().unwrap_or(Decimal::ZERO),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Availability {
    AllHeights,
    Only(BTreeSet<Height>),
}

impl Availability {
    pub fn contains(&self, height: Height) -> bool {
        match self {
            Availability::AllHeights => true,
            Availability::Only(heights) => heights.contains(&height),
        }
    }
}

/// A layer material or a cover, normalized from its catalog record.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(from = "RawCatalogItem")]
pub struct CatalogItem {
    pub id: ItemId,
    pub name: String,
    pub slug: Option<String>,
    pub icon: Option<String>,
    pub pricing: Pricing,
    pub availability: Availability,
}

impl CatalogItem {
    pub fn price_for(&self, size: Size) -> Decimal {
        self.pricing.amount_for(size)
    }

    pub fn is_available_at(&self, height: Height) -> bool {
        self.availability.contains(height)
    }

    /// Display name split on the manual line-break markers `\n` and `|`.
    pub fn display_lines(&self) -> Vec<&str> {
        self.name.split(['\n', '|']).map(str::trim).collect()
    }
}

/// Catalog record as it appears on disk.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RawCatalogItem {
    id: ItemId,
    #[serde(default)]
    name: String,
    #[serde(default)]
    slug: Option<String>,
    #[serde(default)]
    icon: Option<String>,
    #[serde(default)]
    image: Option<String>,
    #[serde(default)]
    price: Option<Decimal>,
    #[serde(default)]
    prices: Option<HashMap<String, Decimal>>,
    #[serde(default)]
    available_heights: Option<Vec<u16>>,
}

impl From<RawCatalogItem> for CatalogItem {
    fn from(raw: RawCatalogItem) -> Self {
        let pricing = match raw.prices {
            Some(table) => Pricing::PerSize(
                table
                    .into_iter()
                    .filter_map(|(key, amount)| match key.parse::<Size>() {
                        Ok(size) => Some((size, amount)),
                        Err(_) => {
                            warn!(item = %raw.id, size = %key, "dropping price for unknown size");
                            None
                        }
                    })
                    .collect(),
            ),
            None => Pricing::Flat(raw.price.unwrap_or(Decimal::ZERO)),
        };

        let availability = match raw.available_heights {
            None => Availability::AllHeights,
            Some(heights) => Availability::Only(
                heights
                    .into_iter()
                    .filter_map(|cm| {
                        let height = u8::try_from(cm).ok().and_then(|cm| Height::try_from(cm).ok());
                        if height.is_none() {
                            warn!(item = %raw.id, height = cm, "dropping unknown available height");
                        }
                        height
                    })
                    .collect(),
            ),
        };

        Self {
            id: raw.id,
            name: raw.name,
            slug: raw.slug.filter(|s| !s.is_empty()),
            icon: raw.icon.or(raw.image).filter(|s| !s.is_empty()),
            pricing,
            availability,
        }
    }
}

// --- Catalog ---

/// Layer materials and covers, in the order the catalog lists them.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    #[serde(rename = "mattressLayers", default)]
    pub layers: Vec<CatalogItem>,
    #[serde(default)]
    pub covers: Vec<CatalogItem>,
}

impl Catalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    pub fn layer(&self, id: &str) -> Option<&CatalogItem> {
        self.layers.iter().find(|item| item.id == id)
    }

    pub fn cover(&self, id: &str) -> Option<&CatalogItem> {
        self.covers.iter().find(|item| item.id == id)
    }

    /// Look an id up in the list that feeds the given slot.
    pub fn resolve(&self, slot: Slot, id: &str) -> Option<&CatalogItem> {
        if slot.is_layer() {
            self.layer(id)
        } else {
            self.cover(id)
        }
    }

    pub fn layers_available_at(&self, height: Height) -> impl Iterator<Item = &CatalogItem> {
        self.layers
            .iter()
            .filter(move |item| item.is_available_at(height))
    }
}
