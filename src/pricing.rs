//! Pricing Engine
//!
//! Price is a pure function of the selection, size and height. Amounts are
//! summed exactly; rounding and currency belong to presentation.

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::catalog::{Catalog, CatalogItem, Height, ItemId, Size, Slot};
use crate::compatibility::layer_slots;
use crate::selection::Selection;

/// Price of one item at `size`. A missing item costs nothing.
pub fn price(item: Option<&CatalogItem>, size: Size) -> Decimal {
    item.map(|item| item.price_for(size)).unwrap_or(Decimal::ZERO)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PriceLine {
    pub slot: Slot,
    pub item_id: Option<ItemId>,
    pub name: Option<String>,
    pub amount: Decimal,
}

/// One line per active layer slot, then the cover.
pub fn breakdown(selection: &Selection, size: Size, height: Height, catalog: &Catalog) -> Vec<PriceLine> {
    layer_slots(height)
        .iter()
        .chain(std::iter::once(&Slot::Cover))
        .map(|&slot| {
            let item = selection.get(slot).and_then(|id| catalog.resolve(slot, id));
            PriceLine {
                slot,
                item_id: selection.get(slot).map(str::to_string),
                name: item.map(|item| item.name.clone()),
                amount: price(item, size),
            }
        })
        .collect()
}

pub fn total(selection: &Selection, size: Size, height: Height, catalog: &Catalog) -> Decimal {
    breakdown(selection, size, height, catalog)
        .iter()
        .map(|line| line.amount)
        .sum()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "mattressLayers": [
                    {"id": "foam", "name": "Foam", "prices": {"90x200": 3000, "160x200": 5200}},
                    {"id": "coir", "name": "Coir", "price": 1800}
                ],
                "covers": [{"id": "c1", "name": "Cover", "prices": {"90x200": 1200}}]
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn test_price_per_size_and_legacy() {
        let catalog = catalog();
        let foam = catalog.layer("foam");
        assert_eq!(price(foam, "160x200".parse().unwrap()), Decimal::from(5200));
        assert_eq!(price(foam, "80x190".parse().unwrap()), Decimal::ZERO);

        let coir = catalog.layer("coir");
        for size in Size::all() {
            assert_eq!(price(coir, size), Decimal::from(1800));
        }
        assert_eq!(price(None, Size::default()), Decimal::ZERO);
    }

    #[test]
    fn test_total_counts_only_active_slots() {
        let selection = Selection::new()
            .with(Slot::Layer1, "foam")
            .with(Slot::Layer2, "coir")
            .with(Slot::Layer3, "foam")
            .with(Slot::Cover, "c1");
        let size = "90x200".parse().unwrap();

        let low = total(&selection, size, Height::try_from(10u8).unwrap(), &catalog());
        assert_eq!(low, Decimal::from(3000 + 1200));

        let high = total(&selection, size, Height::try_from(30u8).unwrap(), &catalog());
        assert_eq!(high, Decimal::from(3000 + 1800 + 3000 + 1200));
    }

    #[test]
    fn test_empty_selection_totals_zero() {
        let total = total(&Selection::new(), Size::default(), Height::default(), &catalog());
        assert_eq!(total, Decimal::ZERO);
    }

    #[test]
    fn test_unknown_id_contributes_zero() {
        let selection = Selection::new()
            .with(Slot::Layer1, "ghost")
            .with(Slot::Cover, "c1");
        let lines = breakdown(&selection, "90x200".parse().unwrap(), Height::try_from(10u8).unwrap(), &catalog());
        assert_eq!(lines[0].amount, Decimal::ZERO);
        assert_eq!(lines[0].name, None);
        assert_eq!(lines[1].amount, Decimal::from(1200));
    }
}
