use std::{sync::Arc, time::Duration};

use serde_json::{Map, Value, json};
use tokio::sync::broadcast;

use gridview::{
    config::GridConfig,
    core::{
        indices::RowInput, order::is_ordered_subsequence, pagination::PaginationMode,
        selection::SelectAllState,
    },
    engine::{events::GridEvent, grid::GridEngine},
    row::{GridRow, RowPatch},
    types::CellValue,
    worker::handle::{WorkerHandle, spawn_worker},
};

type Row = Map<String, Value>;
type Grid = GridEngine<Row, WorkerHandle<Row>>;

fn rows(values: &[i64]) -> Vec<Arc<Row>> {
    values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| {
            let tag = char::from(b'a' + (i % 26) as u8);
            json!({ "v": v, "name": format!("item-{tag}") }).as_object().cloned()
        })
        .map(Arc::new)
        .collect()
}

fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

async fn grid(values: &[i64], config: GridConfig) -> Grid {
    init_tracing();
    let worker = spawn_worker::<Row>(config.worker_queue_bound).expect("spawn worker");
    let mut grid = GridEngine::new(worker, vec!["v".to_string(), "name".to_string()], config);
    grid.set_data(rows(values));
    grid.settle().await;
    grid
}

fn drain<R: Clone>(rx: &mut broadcast::Receiver<GridEvent<R>>) -> Vec<GridEvent<R>> {
    let mut out = Vec::new();
    while let Ok(evt) = rx.try_recv() {
        out.push(evt);
    }
    out
}

#[tokio::test]
async fn sort_then_filter_matches_worked_example() {
    let mut g = grid(&[3, 1, 4, 1, 5], GridConfig::default()).await;
    assert_eq!(g.view_order(), &[0, 1, 2, 3, 4]);

    g.request_sort("v");
    g.settle().await;
    assert_eq!(g.base_order(), Some(&[1, 3, 0, 2, 4][..]));
    assert_eq!(g.view_order(), &[1, 3, 0, 2, 4]);

    g.request_filter("4");
    g.settle().await;
    assert_eq!(g.view_order(), &[2]);

    g.request_filter("item-");
    g.settle().await;
    assert_eq!(g.view_order(), &[1, 3, 0, 2, 4]);

    g.request_filter("");
    assert_eq!(g.view_order(), &[1, 3, 0, 2, 4]);
}

#[tokio::test]
async fn sort_toggle_cycles_back_to_identity() {
    let mut g = grid(&[3, 1, 4, 1, 5], GridConfig::default()).await;
    g.request_sort("v");
    g.request_sort("v");
    g.settle().await;
    assert_eq!(g.view_order(), &[4, 2, 0, 1, 3]);

    g.request_sort("v");
    g.settle().await;
    assert!(g.sort_state().is_none());
    assert_eq!(g.view_order(), &[0, 1, 2, 3, 4]);
}

#[tokio::test]
async fn filtered_view_follows_new_sort() {
    let mut g = grid(&[30, 11, 40, 12, 50], GridConfig::default()).await;
    g.request_filter("1");
    g.settle().await;
    assert_eq!(g.view_order(), &[1, 3]);

    g.request_sort("v");
    g.request_sort("v");
    g.settle().await;
    let base = g.base_order().expect("sorted").to_vec();
    assert_eq!(g.view_order(), &[3, 1]);
    assert!(is_ordered_subsequence(g.view_order(), &base));
}

#[tokio::test]
async fn empty_dataset_clears_and_never_blanks_otherwise() {
    let mut g = grid(&[2, 1], GridConfig::default()).await;
    g.request_sort("v");
    g.settle().await;
    assert_eq!(g.view_order(), &[1, 0]);

    g.set_data(Vec::<Arc<Row>>::new());
    assert!(g.view_order().is_empty());
    assert!(g.base_order().is_none());
    g.settle().await;

    g.set_data(rows(&[9, 8, 7]));
    assert_eq!(g.view_order().len(), 3);
    g.settle().await;
    assert_eq!(g.view_order(), &[2, 1, 0]);
}

#[tokio::test]
async fn selection_survives_reordering() {
    let mut g = grid(&[3, 1, 4, 1, 5], GridConfig::default()).await;
    let mut rx = g.subscribe();

    g.toggle_row(3);
    g.request_sort("v");
    g.settle().await;
    g.request_filter("1");
    g.settle().await;
    assert!(g.is_selected(3));
    assert_eq!(g.selected_indices(), vec![3]);

    let selection_events = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, GridEvent::RowSelectionChanged { .. }))
        .count();
    assert_eq!(selection_events, 1);
}

#[tokio::test]
async fn object_and_index_inputs_normalize() {
    let mut g = grid(&[1, 2, 3], GridConfig::default()).await;
    let third = Arc::clone(&g.rows()[2]);
    let stranger = rows(&[2]).remove(0);

    g.set_selected_rows(&[RowInput::Row(third), RowInput::Index(0), RowInput::Index(99), RowInput::Row(stranger)]);
    assert_eq!(g.selected_indices(), vec![0, 2]);
    assert_eq!(g.selected_rows().len(), 2);

    let second = Arc::clone(&g.rows()[1]);
    g.set_active_row(Some(RowInput::Row(second)));
    assert_eq!(g.active_row(), Some(1));
    g.set_active_row(Some(RowInput::Index(7)));
    assert_eq!(g.active_row(), None);

    g.set_multi_select(false);
    assert_eq!(g.selected_indices(), vec![0]);
    assert!(!g.multi_select());
}

#[tokio::test]
async fn select_all_scopes_and_disabled_rows() {
    let config = GridConfig {
        enable_pagination: true,
        page_size: 2,
        ..GridConfig::default()
    };
    let mut g = grid(&[5, 6, 7, 8, 9], config).await;
    g.set_disabled_rows(&[RowInput::Index(1)]);

    g.toggle_page_all();
    assert_eq!(g.selected_indices(), vec![0]);
    assert_eq!(g.page_select_all_state(), SelectAllState::Checked);
    assert_eq!(g.filtered_select_all_state(), SelectAllState::Indeterminate);

    g.toggle_filtered_all();
    assert_eq!(g.selected_indices(), vec![0, 2, 3, 4]);
    assert_eq!(g.filtered_select_all_state(), SelectAllState::Checked);

    g.toggle_filtered_all();
    assert!(g.selected_indices().is_empty());

    g.request_filter("zzz");
    g.settle().await;
    assert_eq!(g.filtered_select_all_state(), SelectAllState::Disabled);
}

#[tokio::test]
async fn pagination_clamps_and_resets() {
    let config = GridConfig {
        enable_pagination: true,
        page_size: 10,
        ..GridConfig::default()
    };
    let values: Vec<i64> = (0..25).collect();
    let mut g = grid(&values, config).await;
    let mut rx = g.subscribe();

    g.set_page_index(5);
    let w = g.page_window();
    assert_eq!((w.page_count, w.page_index), (3, 2));
    assert_eq!(g.page_rows(), &[20, 21, 22, 23, 24]);
    assert_eq!(g.visible_rows().len(), 5);

    g.request_filter("1");
    g.settle().await;
    assert_eq!(g.view_order().len(), 12);
    assert_eq!(g.pagination_state().page_index, 1);

    g.set_page_size(4);
    assert_eq!(g.pagination_state().page_index, 0);
    assert_eq!(g.page_rows().len(), 4);

    let events = drain(&mut rx);
    assert!(events.iter().any(|e| matches!(e, GridEvent::PageSizeChanged { page_size: 4 })));
    assert!(events.iter().any(|e| matches!(e, GridEvent::PageIndexChanged { page_index: 1 })));
}

#[tokio::test]
async fn controlled_pagination_only_requests() {
    let config = GridConfig {
        enable_pagination: true,
        controlled_pagination: true,
        page_size: 2,
        ..GridConfig::default()
    };
    let mut g = grid(&[1, 2, 3, 4, 5], config).await;
    assert_eq!(g.pagination_mode(), PaginationMode::Controlled);
    let mut rx = g.subscribe();

    g.set_page_index(1);
    assert_eq!(g.pagination_state().page_index, 0);
    let requested = drain(&mut rx).into_iter().find_map(|e| match e {
        GridEvent::PaginationChanged { state } => Some(state),
        _ => None,
    });
    let state = requested.expect("change requested");
    assert_eq!(state.page_index, 1);

    g.sync_pagination(state);
    assert_eq!(g.page_rows(), &[2, 3]);
}

#[tokio::test]
async fn selection_can_be_switched_off() {
    let mut g = grid(&[1, 2, 3], GridConfig::default()).await;
    g.toggle_row(0);
    g.set_selection_enabled(false);
    assert!(!g.selection_enabled());

    g.toggle_row(1);
    g.toggle_filtered_all();
    assert_eq!(g.selected_indices(), vec![0]);

    g.set_selection_enabled(true);
    g.toggle_row(1);
    assert_eq!(g.selected_indices(), vec![0, 1]);
}

#[tokio::test]
async fn edits_flush_resort_and_undo_redo() {
    let mut g = grid(&[3, 1, 4], GridConfig::default()).await;
    let mut rx = g.subscribe();
    g.request_sort("v");
    g.settle().await;
    assert_eq!(g.view_order(), &[1, 0, 2]);

    g.stage_edit(1, RowPatch::new().set("v", 10));
    assert_eq!(g.display_row(1).expect("row").cell("v"), CellValue::from(10));
    assert_eq!(g.rows()[1].cell("v"), CellValue::from(1));
    g.settle().await;

    assert!(!g.has_staged_edits());
    assert_eq!(g.rows()[1].cell("v"), CellValue::from(10));
    assert_eq!(g.view_order(), &[0, 2, 1]);
    assert_eq!(g.cell_version(1, "v"), 1);
    assert!(drain(&mut rx).iter().any(|e| matches!(e, GridEvent::DataChanged { .. })));

    assert!(g.undo());
    g.settle().await;
    assert_eq!(g.rows()[1].cell("v"), CellValue::from(1));
    assert_eq!(g.view_order(), &[1, 0, 2]);
    assert_eq!((g.undo_len(), g.redo_len()), (0, 1));
    assert!(!g.undo());

    assert!(g.redo());
    g.settle().await;
    assert_eq!(g.rows()[1].cell("v"), CellValue::from(10));
    assert_eq!(g.view_order(), &[0, 2, 1]);
    assert_eq!(g.cell_version(1, "v"), 3);
}

#[tokio::test]
async fn edited_text_is_visible_to_filter() {
    let mut g = grid(&[1, 2, 3], GridConfig::default()).await;
    g.stage_edit(2, RowPatch::new().set("name", "needle"));
    g.settle().await;

    g.request_filter("NEEDLE");
    g.settle().await;
    assert_eq!(g.view_order(), &[2]);
}

#[tokio::test]
async fn edit_committed_before_resync_reaches_filter() {
    let mut g = grid(&[1, 2, 3], GridConfig::default()).await;
    g.set_data(rows(&[7, 8]));
    g.stage_edit(1, RowPatch::new().set("name", "needle"));
    assert!(g.commit_edits());
    g.settle().await;
    assert_eq!(g.rows()[1].cell("name"), CellValue::from("needle"));

    g.request_filter("needle");
    g.settle().await;
    assert_eq!(g.view_order(), &[1]);
}

#[tokio::test]
async fn edit_committed_during_undo_resync_reaches_filter() {
    let mut g = grid(&[1, 2], GridConfig::default()).await;
    g.stage_edit(0, RowPatch::new().set("name", "first"));
    g.settle().await;

    assert!(g.undo());
    g.stage_edit(1, RowPatch::new().set("name", "needle"));
    assert!(g.commit_edits());
    g.settle().await;

    g.request_filter("needle");
    g.settle().await;
    assert_eq!(g.view_order(), &[1]);

    g.request_filter("first");
    g.settle().await;
    assert!(g.view_order().is_empty());
}

#[tokio::test]
async fn undo_commits_staged_edits_first() {
    let mut g = grid(&[1, 2], GridConfig::default()).await;
    g.stage_edit(0, RowPatch::new().set("v", 7));
    assert!(g.undo());
    assert_eq!(g.rows()[0].cell("v"), CellValue::from(1));
    assert!(g.redo());
    assert_eq!(g.rows()[0].cell("v"), CellValue::from(7));
    g.settle().await;
}

#[tokio::test(start_paused = true)]
async fn flushes_are_rate_limited_not_dropped() {
    let mut g = grid(&[0, 0, 0], GridConfig::default()).await;
    let interval = g.config().flush_interval();

    let first = tokio::time::Instant::now();
    g.stage_edit(0, RowPatch::new().set("v", 1));
    g.settle().await;
    assert_eq!(g.undo_len(), 1);

    g.stage_edit(1, RowPatch::new().set("v", 2));
    g.stage_edit(2, RowPatch::new().set("v", 3));
    assert!(g.process_next().await);
    g.settle().await;

    assert!(tokio::time::Instant::now() - first >= interval);
    assert_eq!(g.undo_len(), 2);
    assert_eq!(g.rows()[1].cell("v"), CellValue::from(2));
    assert_eq!(g.rows()[2].cell("v"), CellValue::from(3));
    assert!(interval >= Duration::from_millis(50));
}
