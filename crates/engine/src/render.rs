//! Incremental renderer
//!
//! Materializes the filtered view (minus hidden columns) into rendered rows,
//! handing them to a [`RenderSink`] in fixed-size batches. Large tables yield
//! back to the executor between batches so the host stays responsive.
//!
//! Concurrency contract:
//! - Cooperative, never parallel: one pass runs on the caller's executor
//! - Rows are emitted once each, in ascending view order
//! - A pass works on a [`RenderSnapshot`] taken up front, so the store is
//!   free to change while the pass is suspended
//! - Every pass, and every [`IncrementalRenderer::invalidate`] call, bumps a
//!   shared generation counter. A pass that wakes up to a newer generation
//!   stops without writing anything further to its sink

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crate::columns::{CellKind, ColumnPolicy};
use crate::selection::Selectable;
use crate::store::TabularStore;
use crate::table::RowId;
use crate::visibility::ColumnVisibility;

/// Batch / yield tuning.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderConfig {
    /// Rows per batch.
    pub batch_size: usize,
    /// Yield after this many batches.
    pub yield_every: usize,
    /// Only yield when the pass has more rows than this.
    pub yield_threshold: usize,
    /// Delay per yield; zero yields without a timer.
    pub yield_delay: Duration,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            batch_size: 50,
            yield_every: 4,
            yield_threshold: 500,
            yield_delay: Duration::ZERO,
        }
    }
}

// =============================================================================
// Render data
// =============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderColumn {
    /// Index in the table header.
    pub index: usize,
    pub name: String,
    pub kind: CellKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedCell {
    pub column: usize,
    pub value: String,
    pub kind: CellKind,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedRow {
    /// Position in the filtered view (1-based).
    pub index: usize,
    pub id: RowId,
    pub selected: bool,
    pub cells: Vec<RenderedCell>,
}

#[derive(Debug, Clone)]
struct SnapshotRow {
    index: usize,
    id: RowId,
    selected: bool,
    /// Already projected onto the visible columns.
    cells: Vec<String>,
}

/// Read-only copy of what a pass will draw.
#[derive(Debug, Clone, Default)]
pub struct RenderSnapshot {
    columns: Vec<RenderColumn>,
    rows: Vec<SnapshotRow>,
}

impl RenderSnapshot {
    pub fn columns(&self) -> &[RenderColumn] {
        &self.columns
    }

    pub fn row_count(&self) -> usize {
        self.rows.len()
    }
}

/// Anything that can hand the renderer a snapshot.
pub trait Renderable {
    fn render_snapshot(&self, visibility: &ColumnVisibility, policy: &ColumnPolicy) -> RenderSnapshot;
}

impl Renderable for TabularStore {
    fn render_snapshot(&self, visibility: &ColumnVisibility, policy: &ColumnPolicy) -> RenderSnapshot {
        let header = self.header();
        let columns: Vec<RenderColumn> = (0..self.width())
            .filter(|&c| !visibility.is_hidden(c))
            .map(|c| RenderColumn {
                index: c,
                name: header[c].clone(),
                kind: policy.kind_of(&header[c]),
            })
            .collect();

        let selection = self.selection();
        let rows = self
            .view_ids()
            .iter()
            .enumerate()
            .filter_map(|(i, &id)| {
                let row = self.original().row(id)?;
                Some(SnapshotRow {
                    index: i + 1,
                    id,
                    selected: selection.contains(i + 1),
                    cells: visibility.project(row),
                })
            })
            .collect();

        RenderSnapshot { columns, rows }
    }
}

// =============================================================================
// Sinks
// =============================================================================

/// Receives the output of a render pass.
pub trait RenderSink {
    /// Called once, before any rows.
    fn header(&mut self, columns: &[RenderColumn]);
    /// One batch of rows, in order.
    fn rows(&mut self, batch: Vec<RenderedRow>);
    /// Called once after the last batch of a pass that was not superseded.
    fn finish(&mut self, total: usize);
}

/// Sink that keeps everything in memory.
#[derive(Debug, Default)]
pub struct CollectingSink {
    pub columns: Vec<RenderColumn>,
    pub rows: Vec<RenderedRow>,
    pub batches: usize,
    pub finished: Option<usize>,
}

impl RenderSink for CollectingSink {
    fn header(&mut self, columns: &[RenderColumn]) {
        self.columns = columns.to_vec();
    }

    fn rows(&mut self, batch: Vec<RenderedRow>) {
        self.batches += 1;
        self.rows.extend(batch);
    }

    fn finish(&mut self, total: usize) {
        self.finished = Some(total);
    }
}

// =============================================================================
// Renderer
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RenderOutcome {
    Completed { rows: usize },
    /// A newer pass or an invalidation arrived; `rows` were written before it.
    Superseded { rows: usize },
}

/// Batched renderer with a stale-pass guard. Clones share the guard.
#[derive(Debug, Clone, Default)]
pub struct IncrementalRenderer {
    config: RenderConfig,
    generation: Arc<AtomicU64>,
}

impl IncrementalRenderer {
    pub fn new(config: RenderConfig) -> Self {
        Self {
            config,
            generation: Arc::new(AtomicU64::new(0)),
        }
    }

    pub fn config(&self) -> &RenderConfig {
        &self.config
    }

    /// Mark any pass in flight as stale. Returns the new generation.
    pub fn invalidate(&self) -> u64 {
        self.generation.fetch_add(1, Ordering::SeqCst) + 1
    }

    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::SeqCst)
    }

    fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Run one pass. Starting it supersedes every earlier pass.
    pub async fn render<S>(&self, snapshot: RenderSnapshot, sink: &mut S) -> RenderOutcome
    where
        S: RenderSink + ?Sized,
    {
        let generation = self.invalidate();
        let batch_size = self.config.batch_size.max(1);
        let yield_every = self.config.yield_every.max(1);
        let total = snapshot.rows.len();
        let cooperative = total > self.config.yield_threshold;

        let kinds: Vec<CellKind> = snapshot.columns.iter().map(|c| c.kind).collect();
        let column_ids: Vec<usize> = snapshot.columns.iter().map(|c| c.index).collect();

        sink.header(&snapshot.columns);

        let mut pending = snapshot.rows.into_iter().peekable();
        let mut written = 0usize;
        let mut batches = 0usize;

        while pending.peek().is_some() {
            if !self.is_current(generation) {
                log::debug!("render pass {generation} superseded after {written}/{total} rows");
                return RenderOutcome::Superseded { rows: written };
            }

            let batch: Vec<RenderedRow> = pending
                .by_ref()
                .take(batch_size)
                .map(|row| RenderedRow {
                    index: row.index,
                    id: row.id,
                    selected: row.selected,
                    cells: row
                        .cells
                        .into_iter()
                        .zip(column_ids.iter().zip(kinds.iter()))
                        .map(|(value, (&column, &kind))| RenderedCell { column, value, kind })
                        .collect(),
                })
                .collect();

            written += batch.len();
            batches += 1;
            sink.rows(batch);

            if cooperative && batches % yield_every == 0 && pending.peek().is_some() {
                self.pause().await;
            }
        }

        if !self.is_current(generation) {
            log::debug!("render pass {generation} superseded before finish");
            return RenderOutcome::Superseded { rows: written };
        }

        sink.finish(written);
        RenderOutcome::Completed { rows: written }
    }

    /// Run one pass to completion on the current thread.
    pub fn render_blocking<S>(&self, snapshot: RenderSnapshot, sink: &mut S) -> RenderOutcome
    where
        S: RenderSink + ?Sized,
    {
        smol::block_on(self.render(snapshot, sink))
    }

    async fn pause(&self) {
        if self.config.yield_delay.is_zero() {
            smol::future::yield_now().await;
        } else {
            smol::Timer::after(self.config.yield_delay).await;
        }
    }
}
