//! Single-owner grid engine.
//!
//! Every asynchronous request (ingest, sort, filter, incremental row update,
//! flush timer) runs as a spawned task that posts exactly one [`Completion`]
//! back to the engine. The owner drives those with
//! [`GridEngine::process_next`] or [`GridEngine::settle`]; a completion is
//! applied only if its generation token is still current for its category.

use std::{collections::BTreeMap, future::Future, sync::Arc};

use tokio::{
    sync::{broadcast, mpsc},
    time::Instant,
};

use crate::{
    config::GridConfig,
    core::{
        history::{Commit, EditHistory, FlushOutcome},
        indices::{RowIdentityMap, RowInput},
        order,
        pagination::{
            self, PageWindow, PaginationChange, PaginationMode, PaginationState, PaginationWindow,
        },
        selection::{SelectAllState, SelectionModel},
    },
    row::{GridRow, RowPatch},
    types::{BaseIndex, CellValue, ColumnId, Dataset, SortState, Token},
    worker::traits::{ComputeWorker, WorkerResult},
};

use super::{events::GridEvent, tokens::GenerationTokens};

enum Completion {
    Ingest {
        token: Token,
        signature: String,
        result: WorkerResult<()>,
    },
    IngestSuperseded {
        token: Token,
    },
    RowText {
        token: Token,
        result: WorkerResult<()>,
    },
    Sort {
        token: Token,
        result: WorkerResult<Vec<BaseIndex>>,
    },
    Filter {
        token: Token,
        result: WorkerResult<Vec<BaseIndex>>,
    },
    FlushDue,
}

/// Ordered view over a dataset: sort, filter, pagination, selection and
/// edit history, with ordering work delegated to a [`ComputeWorker`].
///
/// Worker responses are applied only through [`GridEngine::process_next`]
/// or [`GridEngine::settle`].
pub struct GridEngine<R: GridRow, W: ComputeWorker<R>> {
    worker: W,
    config: GridConfig,
    columns: Vec<ColumnId>,
    rows: Dataset<R>,
    identity: RowIdentityMap<R>,
    tokens: GenerationTokens,
    requested_signature: Option<String>,
    synced_signature: Option<String>,
    pending_ingest: Option<bool>,
    sort: Option<SortState>,
    base_order: Option<Vec<BaseIndex>>,
    view_order: Option<Vec<BaseIndex>>,
    last_good: Option<Vec<BaseIndex>>,
    display: Vec<BaseIndex>,
    query: String,
    filter_in_flight: bool,
    pending_query: Option<String>,
    pagination: PaginationWindow,
    selection: SelectionModel,
    active_row: Option<BaseIndex>,
    history: EditHistory<R>,
    flush_scheduled: bool,
    in_flight: usize,
    completion_tx: mpsc::UnboundedSender<Completion>,
    completion_rx: mpsc::UnboundedReceiver<Completion>,
    events_tx: broadcast::Sender<GridEvent<R>>,
}

impl<R: GridRow, W: ComputeWorker<R>> GridEngine<R, W> {
    /// Creates an engine with no rows. Requests spawn tokio tasks, so mutate it
    /// only from inside a runtime.
    pub fn new(worker: W, columns: Vec<ColumnId>, config: GridConfig) -> Self {
        let (completion_tx, completion_rx) = mpsc::unbounded_channel();
        let (events_tx, _) = broadcast::channel(1024);
        let mode = if config.controlled_pagination {
            PaginationMode::Controlled
        } else {
            PaginationMode::Uncontrolled
        };
        let pagination = PaginationWindow::new(
            mode,
            PaginationState::new(config.page_index, config.page_size),
        );
        let selection = SelectionModel::new(config.enable_selection, config.multi_select);
        let history = EditHistory::new(config.undo_limit, config.redo_limit, config.flush_interval());

        Self {
            worker,
            config,
            columns,
            rows: Vec::<Arc<R>>::new().into(),
            identity: RowIdentityMap::new(),
            tokens: GenerationTokens::default(),
            requested_signature: None,
            synced_signature: None,
            pending_ingest: None,
            sort: None,
            base_order: None,
            view_order: None,
            last_good: None,
            display: Vec::new(),
            query: String::new(),
            filter_in_flight: false,
            pending_query: None,
            pagination,
            selection,
            active_row: None,
            history,
            flush_scheduled: false,
            in_flight: 0,
            completion_tx,
            completion_rx,
            events_tx,
        }
    }

    /// New receiver for engine events.
    pub fn subscribe(&self) -> broadcast::Receiver<GridEvent<R>> {
        self.events_tx.subscribe()
    }

    /// Options the engine was built with.
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Committed dataset, without staged edits.
    pub fn rows(&self) -> &Dataset<R> {
        &self.rows
    }

    /// Rows in the dataset, ignoring filters.
    pub fn row_count(&self) -> usize {
        self.rows.len()
    }

    /// Searchable columns.
    pub fn columns(&self) -> &[ColumnId] {
        &self.columns
    }

    /// Active sort column and direction.
    pub fn sort_state(&self) -> Option<&SortState> {
        self.sort.as_ref()
    }

    /// Latest requested query, untrimmed.
    pub fn query(&self) -> &str {
        &self.query
    }

    /// True when the query is not blank.
    pub fn has_query(&self) -> bool {
        !self.query.trim().is_empty()
    }

    /// Post-sort order before filtering; `None` means identity.
    pub fn base_order(&self) -> Option<&[BaseIndex]> {
        self.base_order.as_deref()
    }

    /// Displayed order: post-sort-then-filter, never blank without a query.
    pub fn view_order(&self) -> &[BaseIndex] {
        &self.display
    }

    /// Number of worker requests and timers still outstanding.
    pub fn in_flight(&self) -> usize {
        self.in_flight
    }

    // ---------------------------------------------------------------------
    // Completion pump
    // ---------------------------------------------------------------------

    /// Waits for and applies one completion. Returns false when nothing is
    /// outstanding.
    pub async fn process_next(&mut self) -> bool {
        if self.in_flight == 0 {
            return false;
        }
        let Some(completion) = self.completion_rx.recv().await else {
            return false;
        };
        self.in_flight -= 1;
        self.apply_completion(completion);
        true
    }

    /// Applies completions until no request is outstanding.
    pub async fn settle(&mut self) {
        while self.process_next().await {}
    }

    fn spawn_request(&mut self, fut: impl Future<Output = Completion> + Send + 'static) {
        self.in_flight += 1;
        let tx = self.completion_tx.clone();
        tokio::spawn(async move {
            let _ = tx.send(fut.await);
        });
    }

    fn apply_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Ingest {
                token,
                signature,
                result,
            } => {
                if !self.tokens.ingest.is_current(token) {
                    tracing::debug!(token, "discarding superseded ingest");
                    return;
                }
                self.pending_ingest = None;
                match result {
                    Ok(()) => {
                        self.synced_signature = Some(signature);
                        self.recompute_orders();
                    }
                    Err(err) => tracing::warn!(error = %err, "ingest failed; keeping previous order"),
                }
            }
            Completion::IngestSuperseded { token } => {
                tracing::debug!(token, "scheduled ingest cancelled before dispatch");
            }
            Completion::RowText { token, result } => {
                if !self.tokens.ingest.is_current(token) {
                    tracing::debug!(token, "row text update overtaken by a full ingest");
                    return;
                }
                match result {
                    Ok(()) => self.recompute_orders(),
                    Err(err) => tracing::warn!(error = %err, "incremental row update failed"),
                }
            }
            Completion::Sort { token, result } => {
                if !self.tokens.sort.is_current(token) {
                    tracing::debug!(token, "discarding superseded sort result");
                    return;
                }
                match result {
                    Ok(order) if order.len() == self.rows.len() => {
                        self.base_order = Some(order);
                        self.after_base_change();
                    }
                    Ok(order) => tracing::debug!(
                        len = order.len(),
                        rows = self.rows.len(),
                        "sort result no longer matches dataset"
                    ),
                    Err(err) => tracing::warn!(error = %err, "sort failed; keeping previous order"),
                }
            }
            Completion::Filter { token, result } => {
                self.filter_in_flight = false;
                if self.tokens.filter.is_current(token) {
                    match result {
                        Ok(view) => {
                            self.view_order = Some(view);
                            self.refresh_display();
                        }
                        Err(err) => tracing::warn!(error = %err, "filter failed; keeping previous order"),
                    }
                } else {
                    tracing::debug!(token, "discarding superseded filter result");
                }
                if let Some(next) = self.pending_query.take() {
                    self.dispatch_filter(next);
                }
            }
            Completion::FlushDue => {
                self.flush_scheduled = false;
                match self.history.try_commit(&self.rows, Instant::now()) {
                    FlushOutcome::Idle => {}
                    FlushOutcome::Deferred(delay) => {
                        tracing::debug!(?delay, "edit flush deferred");
                        self.schedule_flush();
                    }
                    FlushOutcome::Committed(commit) => self.publish_commit(commit),
                }
            }
        }
    }

    // ---------------------------------------------------------------------
    // Ingest coordination
    // ---------------------------------------------------------------------

    /// Replaces the dataset. Selection and disabled sets are kept as-is; the
    /// caller re-supplies them if base indices changed meaning.
    pub fn set_data(&mut self, rows: impl Into<Dataset<R>>) {
        self.replace_rows(rows.into());
        self.sync_ingest();
    }

    /// Changes the searchable columns; resyncs the worker when they differ.
    pub fn set_columns(&mut self, columns: Vec<ColumnId>) {
        self.columns = columns;
        self.sync_ingest();
    }

    fn replace_rows(&mut self, rows: Dataset<R>) {
        self.rows = rows;
        self.identity.refresh(&self.rows);
        if self
            .base_order
            .as_ref()
            .is_some_and(|o| o.len() != self.rows.len())
        {
            self.base_order = None;
        }
        self.refresh_display();
    }

    fn signature(&self) -> String {
        format!("{}#{}", self.rows.len(), self.columns.join(","))
    }

    fn sync_ingest(&mut self) {
        let signature = self.signature();
        if self.rows.is_empty() {
            self.tokens.ingest.advance();
            self.tokens.sort.advance();
            self.tokens.filter.advance();
            self.pending_query = None;
            self.pending_ingest = None;
            self.base_order = None;
            self.view_order = None;
            self.last_good = None;
            self.requested_signature = Some(signature.clone());
            self.synced_signature = Some(signature);
            self.refresh_display();
            return;
        }
        let unchanged = self.synced_signature.as_deref() == Some(signature.as_str())
            && self.requested_signature.as_deref() == Some(signature.as_str());
        if unchanged {
            return;
        }
        self.schedule_ingest(signature, false);
    }

    /// Sends the whole dataset to the worker one tick later. A newer schedule
    /// supersedes this one before it reaches the worker. `reset` clears the
    /// mirror first.
    fn schedule_ingest(&mut self, signature: String, reset: bool) {
        let token = self.tokens.ingest.advance();
        self.requested_signature = Some(signature.clone());
        self.pending_ingest = Some(reset);
        let latest = Arc::clone(&self.tokens.ingest);
        let worker = self.worker.clone();
        let rows = Arc::clone(&self.rows);
        let columns = self.columns.clone();
        self.spawn_request(async move {
            tokio::task::yield_now().await;
            if !latest.is_current(token) {
                return Completion::IngestSuperseded { token };
            }
            if reset {
                if let Err(err) = worker.reset().await {
                    return Completion::Ingest {
                        token,
                        signature,
                        result: Err(err),
                    };
                }
            }
            let result = worker.ingest_rows(rows, columns).await;
            Completion::Ingest {
                token,
                signature,
                result,
            }
        });
    }

    /// Reset flag of a full sync that has not landed yet, if any. A failed
    /// sync counts as outstanding until a later one succeeds.
    fn outstanding_full_sync(&self) -> Option<bool> {
        match self.pending_ingest {
            Some(reset) => Some(reset),
            None if self.synced_signature != self.requested_signature => Some(false),
            None => None,
        }
    }

    fn resync_full(&mut self) {
        if self.rows.is_empty() {
            self.sync_ingest();
            return;
        }
        let signature = self.signature();
        self.schedule_ingest(signature, true);
    }

    fn recompute_orders(&mut self) {
        match self.sort.clone() {
            Some(sort) => self.dispatch_sort(&sort),
            None => {
                self.tokens.sort.advance();
                self.base_order = None;
            }
        }
        self.after_base_change();
    }

    // ---------------------------------------------------------------------
    // Ordering
    // ---------------------------------------------------------------------

    /// Three-state sort toggle on `column`, exclusive across columns.
    pub fn request_sort(&mut self, column: &str) {
        self.sort = SortState::toggle(self.sort.as_ref(), column);
        match self.sort.clone() {
            Some(sort) => self.dispatch_sort(&sort),
            None => {
                self.tokens.sort.advance();
                self.base_order = None;
                self.after_base_change();
            }
        }
    }

    fn dispatch_sort(&mut self, sort: &SortState) {
        let token = self.tokens.sort.advance();
        let values: Vec<CellValue> = self.rows.iter().map(|r| r.cell(&sort.column)).collect();
        let desc = sort.direction.is_desc();
        let worker = self.worker.clone();
        self.spawn_request(async move {
            Completion::Sort {
                token,
                result: worker.sort_by_vector(values, desc).await,
            }
        });
    }

    /// Sets the free-text query. A blank query shows the base order at once;
    /// otherwise the filter runs on top of the current base order with at most
    /// one request in flight and one (latest) pending.
    pub fn request_filter(&mut self, query: impl Into<String>) {
        self.query = query.into();
        if !self.has_query() {
            self.tokens.filter.advance();
            self.pending_query = None;
            self.view_order = None;
            self.refresh_display();
            return;
        }
        self.dispatch_filter(self.query.clone());
    }

    /// True while a filter request is at the worker.
    pub fn is_filtering(&self) -> bool {
        self.filter_in_flight
    }

    fn dispatch_filter(&mut self, query: String) {
        if self.filter_in_flight {
            self.pending_query = Some(query);
            return;
        }
        self.filter_in_flight = true;
        let token = self.tokens.filter.advance();
        let base = self.base_order.clone();
        let worker = self.worker.clone();
        self.spawn_request(async move {
            Completion::Filter {
                token,
                result: worker.global_filter(query, base).await,
            }
        });
    }

    /// Re-derives the view after the base order changed. The current filter
    /// membership is re-projected onto the new base order immediately so the
    /// view stays a subsequence of it, then refreshed from the worker.
    fn after_base_change(&mut self) {
        if !self.has_query() {
            self.view_order = None;
            self.refresh_display();
            return;
        }
        if let Some(view) = self.view_order.take() {
            let keep: hashbrown::HashSet<BaseIndex> = view.into_iter().collect();
            self.view_order = Some(order::filter_order(
                self.base_order.as_deref(),
                self.rows.len(),
                |i| keep.contains(&i),
            ));
        }
        self.tokens.filter.advance();
        self.refresh_display();
        self.dispatch_filter(self.query.clone());
    }

    fn refresh_display(&mut self) {
        let row_count = self.rows.len();
        let has_query = self.has_query();
        let identity;
        let candidate = if has_query {
            self.view_order.as_deref()
        } else {
            match &self.base_order {
                Some(base) => Some(base.as_slice()),
                None => {
                    identity = order::identity(row_count);
                    Some(identity.as_slice())
                }
            }
        };
        let mut next = order::ensure_order(candidate, self.last_good.as_deref(), row_count, has_query);
        next.retain(|i| *i < row_count);
        if next.is_empty() && !has_query {
            next = order::identity(row_count);
        }

        if next == self.display {
            return;
        }
        self.display = next;
        if !self.display.is_empty() {
            self.last_good = Some(self.display.clone());
        }
        let _ = self.events_tx.send(GridEvent::OrderChanged {
            len: self.display.len(),
        });
        if self.config.enable_pagination {
            if let Some(change) = self.pagination.clamp(self.display.len()) {
                self.emit_pagination(change);
            }
        }
    }

    // ---------------------------------------------------------------------
    // Pagination
    // ---------------------------------------------------------------------

    /// Whether the owner or the engine holds pagination state.
    pub fn pagination_mode(&self) -> PaginationMode {
        self.pagination.mode()
    }

    /// Current page index and size.
    pub fn pagination_state(&self) -> PaginationState {
        self.pagination.state()
    }

    /// Current page bounds over the view.
    pub fn page_window(&self) -> PageWindow {
        self.pagination
            .window(self.display.len(), self.config.enable_pagination)
    }

    /// Base indices on the current page, in display order.
    pub fn page_rows(&self) -> &[BaseIndex] {
        let w = self.page_window();
        &self.display[w.start..w.end]
    }

    /// Materialized rows on the current page.
    pub fn visible_rows(&self) -> Vec<Arc<R>> {
        self.page_rows()
            .iter()
            .filter_map(|i| self.rows.get(*i).cloned())
            .collect()
    }

    /// Requests a page; indices past the last page land on the last page.
    pub fn set_page_index(&mut self, page_index: usize) {
        let last = pagination::page_count(self.display.len(), self.pagination.state().page_size) - 1;
        if let Some(change) = self.pagination.set_page_index(page_index.min(last)) {
            self.emit_pagination(change);
        }
    }

    /// Also returns to the first page.
    pub fn set_page_size(&mut self, page_size: usize) {
        if let Some(change) = self.pagination.set_page_size(page_size) {
            self.emit_pagination(change);
        }
    }

    /// Feeds the owner's state in controlled mode, then clamps to range.
    pub fn sync_pagination(&mut self, state: PaginationState) {
        self.pagination.sync_controlled(state);
        if self.config.enable_pagination {
            if let Some(change) = self.pagination.clamp(self.display.len()) {
                self.emit_pagination(change);
            }
        }
    }

    fn emit_pagination(&self, change: PaginationChange) {
        let _ = self
            .events_tx
            .send(GridEvent::PaginationChanged { state: change.next });
        if change.index_changed() {
            let _ = self.events_tx.send(GridEvent::PageIndexChanged {
                page_index: change.next.page_index,
            });
        }
        if change.size_changed() {
            let _ = self.events_tx.send(GridEvent::PageSizeChanged {
                page_size: change.next.page_size,
            });
        }
    }

    // ---------------------------------------------------------------------
    // Selection
    // ---------------------------------------------------------------------

    /// Replaces the selection; unresolvable inputs are omitted.
    pub fn set_selected_rows(&mut self, inputs: &[RowInput<R>]) {
        let indices = self.identity.normalize_to_index_set(inputs);
        self.selection.set_selected(indices);
        self.emit_selection();
    }

    /// Replaces the disabled set; unresolvable inputs are omitted.
    pub fn set_disabled_rows(&mut self, inputs: &[RowInput<R>]) {
        let indices = self.identity.normalize_to_index_set(inputs);
        self.selection.set_disabled(indices);
    }

    /// While disabled, toggles are ignored; the current set is kept.
    pub fn set_selection_enabled(&mut self, enabled: bool) {
        self.selection.set_enabled(enabled);
    }

    /// Whether selection toggles are accepted.
    pub fn selection_enabled(&self) -> bool {
        self.selection.is_enabled()
    }

    /// Whether more than one row may be selected.
    pub fn multi_select(&self) -> bool {
        self.selection.is_multi()
    }

    /// Turning multi-select off keeps only the lowest selected row.
    pub fn set_multi_select(&mut self, multi: bool) {
        self.selection.set_multi(multi);
        self.emit_selection();
    }

    /// Out-of-range and disabled rows are ignored.
    pub fn toggle_row(&mut self, idx: BaseIndex) {
        if idx < self.rows.len() && self.selection.toggle_one(idx) {
            self.emit_selection();
        }
    }

    /// Select-all over the whole filtered view.
    pub fn toggle_filtered_all(&mut self) {
        if self.selection.toggle_all(&self.display) {
            self.emit_selection();
        }
    }

    /// Select-all over the current page only.
    pub fn toggle_page_all(&mut self) {
        let w = self.page_window();
        if self.selection.toggle_all(&self.display[w.start..w.end]) {
            self.emit_selection();
        }
    }

    /// Select-all checkbox state over the filtered view.
    pub fn filtered_select_all_state(&self) -> SelectAllState {
        self.selection.select_all_state(&self.display)
    }

    /// Select-all checkbox state over the current page.
    pub fn page_select_all_state(&self) -> SelectAllState {
        self.selection.select_all_state(self.page_rows())
    }

    /// Whether `idx` is selected.
    pub fn is_selected(&self, idx: BaseIndex) -> bool {
        self.selection.is_selected(idx)
    }

    /// Whether `idx` is excluded from selection.
    pub fn is_disabled(&self, idx: BaseIndex) -> bool {
        self.selection.is_disabled(idx)
    }

    /// Ascending.
    pub fn selected_indices(&self) -> Vec<BaseIndex> {
        self.selection.selected().iter().copied().collect()
    }

    /// Selected rows in base order.
    pub fn selected_rows(&self) -> Vec<Arc<R>> {
        self.selection
            .selected()
            .iter()
            .filter_map(|i| self.rows.get(*i).cloned())
            .collect()
    }

    /// Unresolvable inputs clear the active row.
    pub fn set_active_row(&mut self, input: Option<RowInput<R>>) {
        self.active_row = input.and_then(|i| self.identity.resolve(&i));
    }

    /// Base index of the highlighted row.
    pub fn active_row(&self) -> Option<BaseIndex> {
        self.active_row
    }

    fn emit_selection(&mut self) {
        let Some(selected) = self.selection.take_change() else {
            return;
        };
        let selection: BTreeMap<BaseIndex, bool> = selected.iter().map(|i| (*i, true)).collect();
        let rows: Vec<Arc<R>> = selected
            .iter()
            .filter_map(|i| self.rows.get(*i).cloned())
            .collect();
        let _ = self
            .events_tx
            .send(GridEvent::RowSelectionChanged { selection });
        let _ = self.events_tx.send(GridEvent::SelectedRowsChanged { rows });
    }

    // ---------------------------------------------------------------------
    // Edits and history
    // ---------------------------------------------------------------------

    /// Stages a patch and requests a rate-limited flush.
    pub fn stage_edit(&mut self, idx: BaseIndex, patch: RowPatch) {
        if idx >= self.rows.len() {
            tracing::warn!(idx, len = self.rows.len(), "ignoring edit for unknown row");
            return;
        }
        self.history.stage(idx, patch);
        self.schedule_flush();
    }

    /// Row with any staged patch applied on top.
    pub fn display_row(&self, idx: BaseIndex) -> Option<Arc<R>> {
        let row = self.rows.get(idx)?;
        match self.history.staged(idx) {
            Some(patch) => {
                let mut patched = R::clone(row);
                patch.apply_to(&mut patched);
                Some(Arc::new(patched))
            }
            None => Some(Arc::clone(row)),
        }
    }

    /// True while edits wait for a flush.
    pub fn has_staged_edits(&self) -> bool {
        self.history.has_staged()
    }

    /// Flushes staged edits now, ignoring the rate limit.
    pub fn commit_edits(&mut self) -> bool {
        match self.history.commit(&self.rows, Instant::now()) {
            Some(commit) => {
                self.publish_commit(commit);
                true
            }
            None => false,
        }
    }

    /// Restores the newest undo snapshot. Returns false when there is none.
    pub fn undo(&mut self) -> bool {
        self.commit_edits();
        match self.history.undo(&self.rows, &self.columns) {
            Some(restored) => {
                self.publish_restored(restored);
                true
            }
            None => false,
        }
    }

    /// Restores the newest redo snapshot. Returns false when there is none.
    pub fn redo(&mut self) -> bool {
        self.commit_edits();
        match self.history.redo(&self.rows, &self.columns) {
            Some(restored) => {
                self.publish_restored(restored);
                true
            }
            None => false,
        }
    }

    /// Whether an undo snapshot exists.
    pub fn can_undo(&self) -> bool {
        self.history.undo_len() > 0
    }

    /// Whether a redo snapshot exists.
    pub fn can_redo(&self) -> bool {
        self.history.redo_len() > 0
    }

    /// Snapshots available to undo.
    pub fn undo_len(&self) -> usize {
        self.history.undo_len()
    }

    /// Snapshots available to redo.
    pub fn redo_len(&self) -> usize {
        self.history.redo_len()
    }

    /// Render key for a cell; changes whenever its committed value does.
    pub fn cell_version(&self, idx: BaseIndex, column: &str) -> u64 {
        self.history.cell_version(idx, column)
    }

    fn schedule_flush(&mut self) {
        if self.flush_scheduled || !self.history.has_staged() {
            return;
        }
        self.flush_scheduled = true;
        let delay = self.history.flush_delay(Instant::now());
        self.spawn_request(async move {
            tokio::time::sleep(delay).await;
            Completion::FlushDue
        });
    }

    fn publish_commit(&mut self, commit: Commit<R>) {
        self.replace_rows(commit.rows);
        self.emit_data_changed();

        // A pending full sync still carries the pre-edit rows; resend instead.
        if let Some(reset) = self.outstanding_full_sync() {
            tracing::debug!(edited = commit.edited.len(), "full sync outstanding; resending dataset");
            let signature = self.signature();
            self.schedule_ingest(signature, reset);
            return;
        }

        let token = self.tokens.ingest.current();
        let updates: Vec<(BaseIndex, Arc<R>)> = commit
            .edited
            .iter()
            .filter_map(|i| self.rows.get(*i).map(|r| (*i, Arc::clone(r))))
            .collect();
        let worker = self.worker.clone();
        self.spawn_request(async move {
            for (idx, row) in updates {
                if let Err(err) = worker.update_row_text(idx, row).await {
                    return Completion::RowText {
                        token,
                        result: Err(err),
                    };
                }
            }
            Completion::RowText {
                token,
                result: Ok(()),
            }
        });
    }

    fn publish_restored(&mut self, rows: Dataset<R>) {
        self.replace_rows(rows);
        self.emit_data_changed();
        self.resync_full();
    }

    fn emit_data_changed(&self) {
        let _ = self.events_tx.send(GridEvent::DataChanged {
            rows: Arc::clone(&self.rows),
        });
        let _ = self.events_tx.send(GridEvent::HistoryChanged {
            undo_len: self.history.undo_len(),
            redo_len: self.history.redo_len(),
        });
    }
}
