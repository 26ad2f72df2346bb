use std::sync::Arc;

use tokio::sync::{mpsc, oneshot};

use crate::{
    row::GridRow,
    types::{BaseIndex, CellValue, ColumnId, Dataset},
};

use super::{
    mirror::TextMirror,
    traits::{ComputeWorker, WorkerError, WorkerResult},
};

enum Command<R> {
    Ingest {
        rows: Dataset<R>,
        columns: Vec<ColumnId>,
        resp: oneshot::Sender<WorkerResult<()>>,
    },
    UpdateRow {
        index: BaseIndex,
        row: Arc<R>,
        resp: oneshot::Sender<WorkerResult<()>>,
    },
    Sort {
        values: Vec<CellValue>,
        desc: bool,
        resp: oneshot::Sender<Vec<BaseIndex>>,
    },
    Filter {
        query: String,
        order: Option<Vec<BaseIndex>>,
        resp: oneshot::Sender<WorkerResult<Vec<BaseIndex>>>,
    },
    Reset {
        resp: oneshot::Sender<()>,
    },
    Shutdown {
        resp: oneshot::Sender<()>,
    },
}

/// Cloneable handle to the worker thread's mailbox.
pub struct WorkerHandle<R> {
    cmd_tx: mpsc::Sender<Command<R>>,
}

impl<R> Clone for WorkerHandle<R> {
    fn clone(&self) -> Self {
        Self {
            cmd_tx: self.cmd_tx.clone(),
        }
    }
}

/// Starts the worker on its own OS thread.
///
/// The thread owns a [`TextMirror`] and answers commands strictly in arrival
/// order. It exits on [`WorkerHandle::shutdown`] or when every handle is
/// dropped.
pub fn spawn_worker<R: GridRow>(queue_bound: usize) -> WorkerResult<WorkerHandle<R>> {
    let (cmd_tx, mut cmd_rx) = mpsc::channel::<Command<R>>(queue_bound.max(1));

    std::thread::Builder::new()
        .name("grid-worker".to_string())
        .spawn(move || {
            tracing::info!("grid worker started");
            let mut mirror = TextMirror::new();
            while let Some(cmd) = cmd_rx.blocking_recv() {
                if handle_command(cmd, &mut mirror) {
                    break;
                }
            }
            tracing::info!("grid worker stopped");
        })
        .map_err(|e| WorkerError::Spawn(e.to_string()))?;

    Ok(WorkerHandle { cmd_tx })
}

fn handle_command<R: GridRow>(cmd: Command<R>, mirror: &mut TextMirror) -> bool {
    match cmd {
        Command::Ingest {
            rows,
            columns,
            resp,
        } => {
            mirror.ingest(&rows, columns);
            let _ = resp.send(Ok(()));
        }
        Command::UpdateRow { index, row, resp } => {
            let _ = resp.send(mirror.update_row(index, row.as_ref()));
        }
        Command::Sort { values, desc, resp } => {
            let _ = resp.send(TextMirror::sort(&values, desc));
        }
        Command::Filter { query, order, resp } => {
            let _ = resp.send(mirror.filter(&query, order.as_deref()));
        }
        Command::Reset { resp } => {
            mirror.reset();
            let _ = resp.send(());
        }
        Command::Shutdown { resp } => {
            let _ = resp.send(());
            return true;
        }
    }
    false
}

impl<R: GridRow> WorkerHandle<R> {
    async fn request<T>(
        &self,
        build: impl FnOnce(oneshot::Sender<T>) -> Command<R>,
    ) -> WorkerResult<T> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(build(tx))
            .await
            .map_err(|_| WorkerError::ChannelClosed)?;
        rx.await.map_err(|_| WorkerError::ChannelClosed)
    }

    /// Stops the worker thread after it drains earlier commands.
    pub async fn shutdown(&self) -> WorkerResult<()> {
        self.request(|resp| Command::Shutdown { resp }).await
    }
}

impl<R: GridRow> ComputeWorker<R> for WorkerHandle<R> {
    async fn ingest_rows(&self, rows: Dataset<R>, columns: Vec<ColumnId>) -> WorkerResult<()> {
        self.request(|resp| Command::Ingest {
            rows,
            columns,
            resp,
        })
        .await?
    }

    async fn update_row_text(&self, index: BaseIndex, row: Arc<R>) -> WorkerResult<()> {
        self.request(|resp| Command::UpdateRow { index, row, resp })
            .await?
    }

    async fn sort_by_vector(&self, values: Vec<CellValue>, desc: bool) -> WorkerResult<Vec<BaseIndex>> {
        self.request(|resp| Command::Sort { values, desc, resp }).await
    }

    async fn global_filter(
        &self,
        query: String,
        order: Option<Vec<BaseIndex>>,
    ) -> WorkerResult<Vec<BaseIndex>> {
        self.request(|resp| Command::Filter { query, order, resp })
            .await?
    }

    async fn reset(&self) -> WorkerResult<()> {
        self.request(|resp| Command::Reset { resp }).await
    }
}
