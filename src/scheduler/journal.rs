use std::io;
use std::path::Path;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::sync::{mpsc, oneshot};

use crate::model::Event;
use crate::observability;
use crate::wal::Wal;

/// The narrow write interface the scheduler persists through.
///
/// `append` returning `Ok` means the event is durable; callers apply it to
/// in-memory state only afterwards.
#[async_trait]
pub trait Journal: Send + Sync {
    async fn append(&self, event: &Event) -> io::Result<()>;

    /// Replace the journal contents with `events`.
    async fn compact(&self, events: Vec<Event>) -> io::Result<()>;

    async fn appends_since_compact(&self) -> u64;
}

// ── WAL-backed journal with group commit ─────────────────

enum WalCommand {
    Append {
        event: Event,
        response: oneshot::Sender<io::Result<()>>,
    },
    Compact {
        events: Vec<Event>,
        response: oneshot::Sender<io::Result<()>>,
    },
    AppendsSinceCompact {
        response: oneshot::Sender<u64>,
    },
}

type PendingAppend = (Event, oneshot::Sender<io::Result<()>>);

pub struct WalJournal {
    tx: mpsc::Sender<WalCommand>,
}

impl WalJournal {
    /// Recover the WAL at `path` and start its writer task. Returns the
    /// journal plus the events to rebuild state from.
    pub fn open(path: &Path) -> io::Result<(Self, Vec<Event>)> {
        let (wal, events) = Wal::recover(path)?;
        tracing::info!("wal {}: replayed {} events", wal.path().display(), events.len());
        Ok((Self::start(wal), events))
    }

    /// Start the writer task over an already opened log.
    pub(crate) fn start(wal: Wal) -> Self {
        let (tx, rx) = mpsc::channel(4096);
        tokio::spawn(wal_writer_loop(wal, rx));
        Self { tx }
    }

    async fn request<T>(
        &self,
        cmd: WalCommand,
        rx: oneshot::Receiver<T>,
    ) -> io::Result<T> {
        self.tx
            .send(cmd)
            .await
            .map_err(|_| io::Error::other("WAL writer shut down"))?;
        rx.await
            .map_err(|_| io::Error::other("WAL writer dropped response"))
    }
}

#[async_trait]
impl Journal for WalJournal {
    async fn append(&self, event: &Event) -> io::Result<()> {
        let (response, rx) = oneshot::channel();
        let cmd = WalCommand::Append {
            event: event.clone(),
            response,
        };
        self.request(cmd, rx).await?
    }

    async fn compact(&self, events: Vec<Event>) -> io::Result<()> {
        let (response, rx) = oneshot::channel();
        self.request(WalCommand::Compact { events, response }, rx).await?
    }

    async fn appends_since_compact(&self) -> u64 {
        let (response, rx) = oneshot::channel();
        self.request(WalCommand::AppendsSinceCompact { response }, rx)
            .await
            .unwrap_or(0)
    }
}

/// Background task that owns the WAL and batches appends for group commit.
/// 1. Block until a command arrives.
/// 2. For an append, drain every append already queued behind it.
/// 3. One fsync for the whole batch, then answer every sender. A failed
///    batch is rolled back by the WAL, so every sender sees the same outcome.
/// 4. A non-append command found while draining runs after the batch flushes.
async fn wal_writer_loop(mut wal: Wal, mut rx: mpsc::Receiver<WalCommand>) {
    while let Some(cmd) = rx.recv().await {
        let (event, response) = match cmd {
            WalCommand::Append { event, response } => (event, response),
            other => {
                handle_non_append(&mut wal, other);
                continue;
            }
        };

        let mut batch = vec![(event, response)];
        let mut deferred = None;
        loop {
            match rx.try_recv() {
                Ok(WalCommand::Append { event, response }) => batch.push((event, response)),
                Ok(other) => {
                    deferred = Some(other);
                    break;
                }
                Err(_) => break,
            }
        }

        metrics::histogram!(observability::WAL_FLUSH_BATCH_SIZE).record(batch.len() as f64);
        let flush_start = std::time::Instant::now();
        let result = wal.append_batch(batch.iter().map(|(event, _)| event));
        metrics::histogram!(observability::WAL_FLUSH_DURATION_SECONDS)
            .record(flush_start.elapsed().as_secs_f64());
        if let Err(e) = &result {
            tracing::error!("wal flush of {} events failed: {e}", batch.len());
        }
        respond_batch(batch, &result);

        if let Some(cmd) = deferred {
            handle_non_append(&mut wal, cmd);
        }
    }
}

fn respond_batch(batch: Vec<PendingAppend>, result: &io::Result<()>) {
    for (_, tx) in batch {
        let r = match result {
            Ok(()) => Ok(()),
            Err(e) => Err(io::Error::new(e.kind(), e.to_string())),
        };
        let _ = tx.send(r);
    }
}

fn handle_non_append(wal: &mut Wal, cmd: WalCommand) {
    match cmd {
        WalCommand::Compact { events, response } => {
            let _ = response.send(wal.compact(&events));
        }
        WalCommand::AppendsSinceCompact { response } => {
            let _ = response.send(wal.appends_since_compact());
        }
        WalCommand::Append { .. } => unreachable!("appends are batched by the writer loop"),
    }
}

// ── In-memory journal ───────────────────────────────────

/// Journal that keeps nothing. State lives only as long as the process.
#[derive(Debug, Default)]
pub struct MemoryJournal {
    appends: AtomicU64,
}

impl MemoryJournal {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }
}

#[async_trait]
impl Journal for MemoryJournal {
    async fn append(&self, _event: &Event) -> io::Result<()> {
        self.appends.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn compact(&self, _events: Vec<Event>) -> io::Result<()> {
        self.appends.store(0, Ordering::Relaxed);
        Ok(())
    }

    async fn appends_since_compact(&self) -> u64 {
        self.appends.load(Ordering::Relaxed)
    }
}
