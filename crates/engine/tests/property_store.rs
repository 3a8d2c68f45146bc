// Property-based tests for filtering, selection, and rendering.
// CI: 256 cases (default). Soak: PROPTEST_CASES=10000 cargo test --release

use std::collections::{BTreeMap, HashSet};

use proptest::prelude::*;
use sheetdesk_engine::columns::ColumnPolicy;
use sheetdesk_engine::render::{CollectingSink, IncrementalRenderer, RenderConfig, RenderOutcome, Renderable};
use sheetdesk_engine::validation::{BarcodeRules, BarcodeStatus, ValidationOverlay};
use sheetdesk_engine::visibility::ColumnVisibility;
use sheetdesk_engine::*;

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

fn config_256() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(256),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

fn config_32() -> ProptestConfig {
    ProptestConfig {
        cases: std::env::var("PROPTEST_CASES")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(32),
        failure_persistence: None,
        ..ProptestConfig::default()
    }
}

// ---------------------------------------------------------------------------
// Generators
// ---------------------------------------------------------------------------

const WIDTH: usize = 3;

fn header() -> Vec<String> {
    vec!["site".to_string(), "lot".to_string(), "qty".to_string()]
}

/// Small alphabet so quick filters and duplicates actually collide.
fn arb_cell() -> impl Strategy<Value = String> {
    prop_oneof![
        3 => r"[ab]{1,2}",
        1 => r"[A-B]{1,2}",
        1 => Just(String::new()),
    ]
}

fn arb_matrix(max_rows: usize) -> impl Strategy<Value = Matrix> {
    proptest::collection::vec(proptest::collection::vec(arb_cell(), WIDTH), 1..=max_rows).prop_map(
        |rows| {
            let mut m = vec![header()];
            m.extend(rows);
            m
        },
    )
}

fn arb_kind() -> impl Strategy<Value = AdvancedKind> {
    prop_oneof![
        Just(AdvancedKind::Equals),
        Just(AdvancedKind::Contains),
        Just(AdvancedKind::StartsWith),
        Just(AdvancedKind::EndsWith),
        Just(AdvancedKind::NotEquals),
        Just(AdvancedKind::NotContains),
        Just(AdvancedKind::IsEmpty),
        Just(AdvancedKind::IsNotEmpty),
    ]
}

fn arb_spec() -> impl Strategy<Value = FilterSpec> {
    prop_oneof![
        proptest::collection::btree_set(arb_cell(), 0..4).prop_map(FilterSpec::quick),
        (arb_kind(), r"[abAB]{0,2}", prop::bool::ANY)
            .prop_map(|(k, v, cs)| FilterSpec::advanced(k, v, cs)),
    ]
}

fn arb_filters() -> impl Strategy<Value = BTreeMap<usize, FilterSpec>> {
    proptest::collection::btree_map(0..WIDTH, arb_spec(), 0..=WIDTH)
}

fn store_with(matrix: Matrix, filters: &BTreeMap<usize, FilterSpec>) -> TabularStore {
    let mut store = TabularStore::new();
    store.load(matrix).unwrap();
    for (&col, spec) in filters {
        store.apply_filter(col, Some(spec.clone())).unwrap();
    }
    store
}

// ---------------------------------------------------------------------------
// Filtering
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn filtered_view_is_exact_ordered_subset(
        matrix in arb_matrix(40),
        filters in arb_filters(),
    ) {
        let table = Table::from_matrix(matrix).unwrap();
        let view = FilterEngine::evaluate(&table, &filters);

        prop_assert!(view.len() <= table.row_count());
        prop_assert!(view.windows(2).all(|w| w[0] < w[1]), "view must keep original order");

        let kept: HashSet<RowId> = view.iter().copied().collect();
        for id in table.row_ids() {
            let passes = filters
                .iter()
                .all(|(&col, spec)| spec.matches(table.cell(id, col).unwrap_or("")));
            prop_assert_eq!(passes, kept.contains(&id), "row {:?} misclassified", id);
        }
    }

    #[test]
    fn reapplying_filters_is_idempotent(
        matrix in arb_matrix(30),
        filters in arb_filters(),
    ) {
        let mut store = store_with(matrix, &filters);
        let first = store.filtered_matrix();
        for (&col, spec) in &filters {
            store.apply_filter(col, Some(spec.clone())).unwrap();
        }
        prop_assert_eq!(first, store.filtered_matrix());
    }

    #[test]
    fn header_survives_any_filter(
        matrix in arb_matrix(30),
        filters in arb_filters(),
    ) {
        let store = store_with(matrix, &filters);
        let view = store.filtered_matrix();
        prop_assert_eq!(&view[0], &header());
        prop_assert_eq!(view.len(), store.view_len());
    }

    #[test]
    fn clearing_filters_restores_original(
        matrix in arb_matrix(30),
        filters in arb_filters(),
    ) {
        let mut store = store_with(matrix.clone(), &filters);
        store.clear_all_filters();
        prop_assert_eq!(store.filtered_matrix(), matrix);
        prop_assert!(!store.is_filtered());
    }

    #[test]
    fn filter_change_clears_selection(
        matrix in arb_matrix(30),
        filters in arb_filters(),
        col in 0..WIDTH,
        spec in arb_spec(),
    ) {
        let mut store = store_with(matrix, &filters);
        store.select_all();
        store.apply_filter(col, Some(spec)).unwrap();
        prop_assert!(store.selection().is_empty());
        prop_assert_eq!(store.check_state(), CheckState::Unchecked);
    }

    #[test]
    fn selection_stays_inside_view(
        matrix in arb_matrix(30),
        filters in arb_filters(),
        toggles in proptest::collection::vec(0usize..40, 0..20),
    ) {
        let mut store = store_with(matrix, &filters);
        for i in toggles {
            store.toggle_row(i);
        }
        let len = store.view_len();
        prop_assert!(store.selection().indices().all(|i| i >= 1 && i < len));
        prop_assert_eq!(store.selected_matrix().len(), store.selection().count() + 1);
    }

    #[test]
    fn edit_through_view_lands_on_original_row(
        matrix in arb_matrix(30),
        filters in arb_filters(),
        pick in any::<prop::sample::Index>(),
        col in 0..WIDTH,
    ) {
        let mut store = store_with(matrix, &filters);
        prop_assume!(store.visible_row_count() > 0);
        let row = pick.index(store.visible_row_count()) + 1;
        let id = store.row_id_at(row).unwrap();

        store.edit_cell(row, col, "edited").unwrap();
        prop_assert_eq!(store.original().cell(id, col), Some("edited"));
        prop_assert!(store.is_dirty());
    }
}

// ---------------------------------------------------------------------------
// Rendering
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_32())]

    #[test]
    fn render_emits_every_row_once_in_order(
        rows in 0usize..1200,
        batch_size in 1usize..120,
        yield_every in 1usize..6,
    ) {
        let mut matrix = vec![header()];
        matrix.extend((0..rows).map(|i| vec![i.to_string(), String::new(), String::new()]));
        // Header-only tables are rejected at load, so pad zero-row cases
        if rows == 0 {
            matrix.push(vec!["0".into(), String::new(), String::new()]);
        }
        let expected = matrix.len() - 1;

        let mut store = TabularStore::new();
        store.load(matrix).unwrap();
        let snapshot = store.render_snapshot(&ColumnVisibility::new(WIDTH), &ColumnPolicy::default());

        let renderer = IncrementalRenderer::new(RenderConfig {
            batch_size,
            yield_every,
            ..RenderConfig::default()
        });
        let mut sink = CollectingSink::default();
        let outcome = renderer.render_blocking(snapshot, &mut sink);

        prop_assert_eq!(outcome, RenderOutcome::Completed { rows: expected });
        prop_assert_eq!(sink.finished, Some(expected));
        prop_assert_eq!(sink.batches, expected.div_ceil(batch_size));
        let indices: Vec<usize> = sink.rows.iter().map(|r| r.index).collect();
        prop_assert_eq!(indices, (1..=expected).collect::<Vec<_>>());
    }
}

// ---------------------------------------------------------------------------
// Validation
// ---------------------------------------------------------------------------

proptest! {
    #![proptest_config(config_256())]

    #[test]
    fn barcode_status_follows_length_and_placeholder(value in r"[A-Z0-9]{0,20}") {
        let rules = BarcodeRules::default();
        let matrix = vec![
            vec!["Barcode".to_string()],
            vec![value.clone()],
        ];
        let table = Table::from_matrix(matrix).unwrap();
        let report = ValidationOverlay::compute(&table, &rules);
        let status = report.get(RowId(0)).map(|r| r.status);

        let len = value.chars().count();
        if value.is_empty() {
            prop_assert_eq!(status, None);
        } else if !(16..=17).contains(&len) {
            prop_assert_eq!(status, Some(BarcodeStatus::Error));
        } else if value.contains('X') {
            prop_assert_eq!(status, Some(BarcodeStatus::Warning));
        } else {
            prop_assert!(matches!(status, None | Some(BarcodeStatus::Valid)));
        }
    }
}
