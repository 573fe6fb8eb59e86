//! Contract Invariant Tests
//!
//! These tests verify the non-negotiable guarantees.

use rust_decimal::Decimal;

use mattress_configurator::{
    Action, Catalog, CatalogBundle, Configurator, DescriptionCatalog, EngineSettings, Height,
    Selection, Size, Slot, UrlMapping,
    compatibility::{active_slots, is_available, layer_slots, repair, validate},
    description::aggregate,
    pricing::{price, total},
    url_codec::{decode, encode},
};

fn create_test_catalog() -> Catalog {
    Catalog::from_json(
        r#"{
            "mattressLayers": [
                {"id": "foam-a", "name": "Foam A", "slug": "foam",
                 "prices": {"90x200": 3000, "160x200": 5500}},
                {"id": "latex", "name": "Latex", "slug": "latex",
                 "prices": {"90x200": 4200}, "availableHeights": [20, 30]},
                {"id": "foam-b", "name": "Foam B", "slug": "foam", "price": 2800},
                {"id": "coir", "name": "Coir", "slug": "coir", "price": 1900, "availableHeights": [30]}
            ],
            "covers": [
                {"id": "aloe", "name": "Aloe Vera", "prices": {"90x200": 1500}},
                {"id": "plain", "name": "Plain", "price": 900}
            ]
        }"#,
    )
    .unwrap()
}

fn create_test_mapping() -> UrlMapping {
    UrlMapping::from_json(
        r#"{
            "layers": {"foam-a": "foamKey", "latex": "latexKey", "foam-b": "fb"},
            "covers": {"aloe": "coverKey"}
        }"#,
    )
    .unwrap()
}

fn create_test_descriptions() -> DescriptionCatalog {
    DescriptionCatalog::from_json(
        r#"{
            "staticBlocks": [{"id": "trial", "title": "100 nights", "order": 5}],
            "coverDescriptions": {"aloe": {"name": "Aloe Vera cover"}},
            "foam": {"name": "Cold foam", "additionalBlocks": [{"id": "hygiene", "title": "Hygiene"}]},
            "latex": {"name": "Natural latex", "additionalBlocks": [{"id": "hygiene", "title": "Hygiene"}]}
        }"#,
    )
    .unwrap()
}

fn create_configurator() -> Configurator {
    Configurator::new(
        CatalogBundle {
            catalog: create_test_catalog(),
            mapping: create_test_mapping(),
            descriptions: create_test_descriptions(),
        },
        EngineSettings::default(),
    )
}

fn size(s: &str) -> Size {
    s.parse().unwrap()
}

fn height(cm: u8) -> Height {
    Height::try_from(cm).unwrap()
}

#[test]
fn invariant_path_round_trip_every_height() {
    let catalog = create_test_catalog();
    let mapping = create_test_mapping();

    for h in Height::all() {
        let slots = active_slots(h);
        for sz in Size::all() {
            // Every layer that fits the height, in every active slot.
            for layer in catalog.layers_available_at(h) {
                for cover in &catalog.covers {
                    let mut selection = Selection::new().with(Slot::Cover, cover.id.clone());
                    for &slot in layer_slots(h) {
                        selection.assign(slot, layer.id.clone());
                    }

                    let path = encode(sz, h, &selection, &slots, &mapping);
                    let decoded = decode(&path, &mapping).unwrap();
                    assert_eq!(decoded.size, sz);
                    assert_eq!(decoded.height, h);
                    assert_eq!(decoded.selection, selection);
                }
            }
        }
    }
}

#[test]
fn invariant_price_table_or_zero() {
    let catalog = create_test_catalog();
    let latex = catalog.layer("latex");
    assert_eq!(price(latex, size("90x200")), Decimal::from(4200));
    assert_eq!(price(latex, size("160x200")), Decimal::ZERO);

    let legacy = catalog.layer("foam-b");
    for sz in Size::all() {
        assert_eq!(price(legacy, sz), Decimal::from(2800));
    }
}

#[test]
fn invariant_repair_idempotent_and_available() {
    let catalog = create_test_catalog();
    let selection = Selection::new()
        .with(Slot::Layer1, "coir")
        .with(Slot::Layer2, "latex")
        .with(Slot::Layer3, "coir")
        .with(Slot::Cover, "aloe");

    for h in Height::all() {
        let once = repair(&selection, h, &catalog);
        let twice = repair(&once.selection, h, &catalog);
        assert_eq!(once.selection, twice.selection);

        for &slot in layer_slots(h) {
            if let Some(id) = once.selection.get(slot) {
                assert!(is_available(catalog.layer(id).unwrap(), h));
            }
        }
    }
}

#[test]
fn invariant_total_zero_and_additive() {
    let catalog = create_test_catalog();
    let sz = size("90x200");
    let h = height(20);
    assert_eq!(total(&Selection::new(), sz, h, &catalog), Decimal::ZERO);

    let base = Selection::new()
        .with(Slot::Layer1, "foam-a")
        .with(Slot::Layer2, "latex")
        .with(Slot::Cover, "aloe");
    let swapped = base.clone().with(Slot::Layer2, "foam-b");

    let delta = total(&swapped, sz, h, &catalog) - total(&base, sz, h, &catalog);
    let expected = price(catalog.layer("foam-b"), sz) - price(catalog.layer("latex"), sz);
    assert_eq!(delta, expected);
}

#[test]
fn invariant_same_slug_groups_non_adjacent_slots() {
    let selection = Selection::new()
        .with(Slot::Layer1, "foam-a")
        .with(Slot::Layer2, "latex")
        .with(Slot::Layer3, "foam-b");
    let out = aggregate(
        &selection,
        height(30),
        &create_test_catalog(),
        &create_test_descriptions(),
        "Slot",
    );

    assert_eq!(out.dynamic_blocks.len(), 2);
    assert_eq!(out.dynamic_blocks[0].title, "Slot 1 and 3: Cold foam");
    assert_eq!(out.dynamic_blocks[1].title, "Slot 2: Natural latex");

    // "hygiene" is linked from both foam and latex.
    let hygiene = out.info_blocks.iter().filter(|b| b.key == "add-hygiene").count();
    assert_eq!(hygiene, 1);
    assert_eq!(out.info_blocks[0].key, "static-trial");
}

#[test]
fn scenario_three_identical_layers() {
    let engine = create_configurator();
    let mut state = engine.default_state();
    for slot in [Slot::Layer1, Slot::Layer2, Slot::Layer3] {
        state = engine
            .apply(&state, Action::ChangeSlotItem { slot, item_id: "foam-a".into() })
            .unwrap();
    }
    state = engine.apply(&state, Action::ChangeSize { size: size("90x200") }).unwrap();
    state = engine
        .apply(&state, Action::ChangeSlotItem { slot: Slot::Cover, item_id: "aloe".into() })
        .unwrap();

    let view = engine.view(&state);
    assert_eq!(view.description.dynamic_blocks.len(), 1);
    assert_eq!(view.description.dynamic_blocks[0].title, "Slot 1, 2 and 3: Cold foam");
    assert_eq!(view.total, Decimal::from(3 * 3000 + 1500));
    assert_eq!(view.path, "90x200-30cm-foamKey-foamKey-foamKey-coverKey");
    assert_eq!(view.cover_description.unwrap().name.as_deref(), Some("Aloe Vera cover"));
    assert!(view.complete);
}

#[test]
fn scenario_token_count_must_match_height() {
    let mapping = create_test_mapping();
    let decoded = decode("90x200-20cm-foamKey-latexKey-coverKey", &mapping).unwrap();
    assert_eq!(decoded.height, height(20));
    assert_eq!(decoded.selection.get(Slot::Layer2), Some("latex"));

    assert!(decode("90x200-30cm-foamKey-latexKey-coverKey", &mapping).is_none());
}

#[test]
fn scenario_malformed_path_falls_back_to_defaults() {
    let engine = create_configurator();
    assert!(decode("invalidSize-99cm-x-y", &create_test_mapping()).is_none());
    assert_eq!(engine.restore("/invalidSize-99cm-x-y"), engine.default_state());
}

#[test]
fn invariant_unknown_key_decodes_but_fails_validation() {
    let decoded = decode("90x200-10cm-mystery-coverKey", &create_test_mapping()).unwrap();
    assert_eq!(decoded.selection.get(Slot::Layer1), Some("mystery"));
    assert!(!validate(&decoded.selection, &create_test_catalog()));
}

#[test]
fn invariant_height_change_never_leaves_unavailable_layer() {
    let engine = create_configurator();
    let state = engine
        .apply(&engine.default_state(), Action::ChangeSlotItem { slot: Slot::Layer2, item_id: "coir".into() })
        .unwrap();

    let lowered = engine.apply(&state, Action::ChangeHeight { height: height(20) }).unwrap();
    assert_eq!(lowered.selection.get(Slot::Layer2), Some("foam-a"));
    assert!(engine.view(&lowered).violations.is_empty());

    // Size changes never repair.
    let resized = engine.apply(&state, Action::ChangeSize { size: size("160x200") }).unwrap();
    assert_eq!(resized.selection, state.selection);
}

#[test]
fn invariant_unresolved_slot_is_visible() {
    let catalog = Catalog::from_json(
        r#"{"mattressLayers": [{"id": "coir", "name": "Coir", "price": 1900, "availableHeights": [30]}],
            "covers": [{"id": "plain", "name": "Plain", "price": 900}]}"#,
    )
    .unwrap();
    let engine = Configurator::new(
        CatalogBundle {
            catalog,
            mapping: UrlMapping::default(),
            descriptions: DescriptionCatalog::default(),
        },
        EngineSettings::default(),
    );

    let state = engine
        .apply(&engine.default_state(), Action::ChangeHeight { height: height(10) })
        .unwrap();
    assert_eq!(state.unresolved, vec![Slot::Layer1]);

    let view = engine.view(&state);
    assert!(!view.complete);
    assert_eq!(view.total, Decimal::from(900));
    assert!(view.description.dynamic_blocks.is_empty());
    assert_eq!(view.path, "80x190-10cm--plain");
}
