//! Description Aggregator
//!
//! Explains the current build with as few blocks as possible: slots holding
//! the same material share one block, and extra content linked from several
//! materials appears once.

use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

use crate::catalog::{Catalog, CatalogItem, Height, ItemId};
use crate::compatibility::layer_slots;
use crate::selection::Selection;

/// Order given to info blocks that do not carry one.
pub const DEFAULT_ORDER: i64 = 1000;

// --- Description catalog ---

/// Content keyed by material slug or name, plus the always-shown blocks
/// and per-cover texts.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DescriptionCatalog {
    #[serde(default)]
    pub static_blocks: Vec<InfoEntry>,
    #[serde(default)]
    pub cover_descriptions: HashMap<ItemId, CoverDescription>,
    #[serde(flatten)]
    pub materials: HashMap<String, MaterialDescription>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MaterialDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub additional_blocks: Vec<InfoEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct InfoEntry {
    pub id: String,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
    #[serde(default)]
    pub order: Option<i64>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CoverDescription {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub image: Option<String>,
}

impl DescriptionCatalog {
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Slug first, then display name.
    pub fn material(&self, slug: Option<&str>, name: &str) -> Option<&MaterialDescription> {
        slug.and_then(|slug| self.materials.get(slug))
            .or_else(|| self.materials.get(name))
    }

    pub fn cover_description(&self, id: &str) -> Option<&CoverDescription> {
        self.cover_descriptions.get(id)
    }
}

// --- Blocks ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BlockKind {
    Dynamic,
    Static,
    Additional,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DescriptionBlock {
    pub kind: BlockKind,
    pub key: String,
    pub title: String,
    pub body: String,
    pub image: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order: Option<i64>,
}

impl DescriptionBlock {
    fn info(kind: BlockKind, prefix: &str, entry: &InfoEntry) -> Self {
        Self {
            kind,
            key: format!("{}-{}", prefix, entry.id),
            title: entry.title.clone().unwrap_or_default(),
            body: entry.description.clone().unwrap_or_default(),
            image: entry.image.clone().unwrap_or_default(),
            order: Some(entry.order.unwrap_or(DEFAULT_ORDER)),
        }
    }
}

/// Dynamic blocks render first, info blocks (static and additional,
/// sorted by order) after them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub dynamic_blocks: Vec<DescriptionBlock>,
    pub info_blocks: Vec<DescriptionBlock>,
}

/// Active layer slots holding the same material.
#[derive(Debug, Clone)]
pub struct MaterialGroup<'a> {
    pub key: String,
    pub item: &'a CatalogItem,
    /// 1-based slot positions, in the order they were met.
    pub positions: Vec<usize>,
}

/// Group active layer slots by slug, then name, then position. Empty and
/// unknown slots are skipped.
pub fn group_layers<'a>(selection: &Selection, height: Height, catalog: &'a Catalog) -> Vec<MaterialGroup<'a>> {
    let mut groups: Vec<MaterialGroup<'a>> = vec![];
    let mut index_by_key: HashMap<String, usize> = HashMap::new();

    for (idx, &slot) in layer_slots(height).iter().enumerate() {
        let Some(item) = selection.get(slot).and_then(|id| catalog.layer(id)) else {
            continue;
        };
        let position = idx + 1;
        let key = match (&item.slug, item.name.is_empty()) {
            (Some(slug), _) => slug.clone(),
            (None, false) => item.name.clone(),
            (None, true) => format!("unknown-{}", position),
        };

        match index_by_key.get(&key) {
            Some(&gi) => groups[gi].positions.push(position),
            None => {
                index_by_key.insert(key.clone(), groups.len());
                groups.push(MaterialGroup {
                    key,
                    item,
                    positions: vec![position],
                });
            }
        }
    }

    groups
}

/// "Slot 1", "Slot 1 and 3", "Slot 1, 2 and 3".
pub fn humanize_positions(label: &str, positions: &[usize]) -> String {
    let numbers: Vec<String> = positions.iter().map(|p| p.to_string()).collect();
    match numbers.as_slice() {
        [] => String::new(),
        [only] => format!("{} {}", label, only),
        [head @ .., last] => format!("{} {} and {}", label, head.join(", "), last),
    }
}

pub fn aggregate(
    selection: &Selection,
    height: Height,
    catalog: &Catalog,
    descriptions: &DescriptionCatalog,
    slot_label: &str,
) -> Description {
    let groups = group_layers(selection, height, catalog);

    let dynamic_blocks = groups
        .iter()
        .map(|group| {
            let item = group.item;
            let desc = descriptions.material(item.slug.as_deref(), &item.name);
            let name = desc
                .and_then(|d| d.name.clone())
                .unwrap_or_else(|| item.name.clone());
            let positions: Vec<String> = group.positions.iter().map(|p| p.to_string()).collect();

            DescriptionBlock {
                kind: BlockKind::Dynamic,
                key: format!("dyn-{}-{}", group.key, positions.join("-")),
                title: format!("{}: {}", humanize_positions(slot_label, &group.positions), name)
                    .trim()
                    .to_string(),
                body: desc.and_then(|d| d.description.clone()).unwrap_or_default(),
                image: desc
                    .and_then(|d| d.image.clone())
                    .or_else(|| item.icon.clone())
                    .unwrap_or_default(),
                order: None,
            }
        })
        .collect();

    let mut info_blocks: Vec<DescriptionBlock> = descriptions
        .static_blocks
        .iter()
        .map(|entry| DescriptionBlock::info(BlockKind::Static, "static", entry))
        .collect();

    // Groups are distinct by key; the same entry may still hang off
    // several materials, so dedupe by entry id.
    let mut seen: HashSet<&str> = HashSet::new();
    for group in &groups {
        let Some(desc) = descriptions.material(group.item.slug.as_deref(), &group.item.name) else {
            continue;
        };
        for entry in &desc.additional_blocks {
            if seen.insert(entry.id.as_str()) {
                info_blocks.push(DescriptionBlock::info(BlockKind::Additional, "add", entry));
            }
        }
    }

    // Stable: ties keep static blocks ahead of additional ones.
    info_blocks.sort_by_key(|block| block.order.unwrap_or(DEFAULT_ORDER));

    Description {
        dynamic_blocks,
        info_blocks,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::Slot;

    fn catalog() -> Catalog {
        Catalog::from_json(
            r#"{
                "mattressLayers": [
                    {"id": "foam-h2", "name": "Foam H2", "slug": "foam", "icon": "foam.png"},
                    {"id": "foam-h3", "name": "Foam H3", "slug": "foam"},
                    {"id": "latex", "name": "Latex", "slug": "latex"},
                    {"id": "coir", "name": "Coir"}
                ],
                "covers": [{"id": "c1", "name": "Cover"}]
            }"#,
        )
        .unwrap()
    }

    fn descriptions() -> DescriptionCatalog {
        DescriptionCatalog::from_json(
            r#"{
                "staticBlocks": [
                    {"id": "warranty", "title": "Warranty", "order": 20},
                    {"id": "shipping", "title": "Shipping"}
                ],
                "coverDescriptions": {"c1": {"name": "Aloe cover"}},
                "foam": {
                    "name": "Cold foam",
                    "description": "Elastic",
                    "additionalBlocks": [{"id": "care", "title": "Care", "order": 10}]
                },
                "latex": {
                    "additionalBlocks": [
                        {"id": "care", "title": "Care again", "order": 10},
                        {"id": "allergy", "title": "Allergy"}
                    ]
                }
            }"#,
        )
        .unwrap()
    }

    fn height(cm: u8) -> Height {
        Height::try_from(cm).unwrap()
    }

    #[test]
    fn test_humanize_positions() {
        assert_eq!(humanize_positions("Slot", &[1]), "Slot 1");
        assert_eq!(humanize_positions("Slot", &[1, 3]), "Slot 1 and 3");
        assert_eq!(humanize_positions("Slot", &[1, 2, 3]), "Slot 1, 2 and 3");
        assert_eq!(humanize_positions("Slot", &[]), "");
    }

    #[test]
    fn test_identical_slugs_share_a_block() {
        let selection = Selection::new()
            .with(Slot::Layer1, "foam-h2")
            .with(Slot::Layer2, "latex")
            .with(Slot::Layer3, "foam-h3");
        let out = aggregate(&selection, height(30), &catalog(), &descriptions(), "Slot");

        assert_eq!(out.dynamic_blocks.len(), 2);
        assert_eq!(out.dynamic_blocks[0].title, "Slot 1 and 3: Cold foam");
        assert_eq!(out.dynamic_blocks[0].key, "dyn-foam-1-3");
        assert_eq!(out.dynamic_blocks[0].body, "Elastic");
        assert_eq!(out.dynamic_blocks[0].image, "foam.png");
        assert_eq!(out.dynamic_blocks[1].title, "Slot 2: Latex");
    }

    #[test]
    fn test_additional_blocks_deduplicated_and_sorted() {
        let selection = Selection::new()
            .with(Slot::Layer1, "foam-h2")
            .with(Slot::Layer2, "latex");
        let out = aggregate(&selection, height(20), &catalog(), &descriptions(), "Slot");

        let keys: Vec<_> = out.info_blocks.iter().map(|b| b.key.as_str()).collect();
        assert_eq!(keys, vec!["add-care", "static-warranty", "static-shipping", "add-allergy"]);
        assert_eq!(out.info_blocks[0].title, "Care");
    }

    #[test]
    fn test_name_fallbacks() {
        let selection = Selection::new().with(Slot::Layer1, "coir");
        let out = aggregate(&selection, height(10), &catalog(), &descriptions(), "Layer");
        assert_eq!(out.dynamic_blocks[0].title, "Layer 1: Coir");
        assert_eq!(out.dynamic_blocks[0].key, "dyn-Coir-1");
        assert_eq!(out.info_blocks.len(), 2);
    }

    #[test]
    fn test_empty_and_inactive_slots_are_omitted() {
        let selection = Selection::new()
            .with(Slot::Layer2, "latex")
            .with(Slot::Layer3, "foam-h2");
        let out = aggregate(&selection, height(20), &catalog(), &descriptions(), "Slot");
        assert_eq!(out.dynamic_blocks.len(), 1);
        assert_eq!(out.dynamic_blocks[0].title, "Slot 2: Latex");
    }
}
