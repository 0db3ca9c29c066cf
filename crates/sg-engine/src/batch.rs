//! Batch Decomposer - decompose many files concurrently
//!
//! A bounded pool of smol tasks pulls paths from a bounded channel. File reads
//! are async; parsing, hashing and identity resolution run on the blocking
//! pool. A failing document is recorded and skipped, never fatal to the batch.
//!
//! With `ordered_commit`, workers only parse and hash; a single committer
//! applies documents strictly in input order so node ids come out the same on
//! every run.
//!
//! Both channels are bounded, so at most a few documents per worker are in
//! flight or waiting when a cancellation is noticed.

use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use sg_graph::{BuildReport, ContentStore, DocumentSummary, Graph, GraphBuilder, PreparedDocument};
use sg_html::HtmlParser;

use crate::config::Config;
use crate::discovery::document_name;

/// Documents between two progress log lines
pub const PROGRESS_INTERVAL: usize = 1000;

/// Cooperative cancellation flag, checked between documents
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Result of a batch run
#[derive(Debug)]
pub struct BatchOutcome {
    pub graph: Graph,
    pub content: ContentStore,
    pub report: BuildReport,
    /// The run stopped early; the graph holds every document finished so far
    pub cancelled: bool,
}

enum Outcome {
    /// Parsed and hashed, waiting for the ordered committer
    Prepared(PreparedDocument),
    Committed(DocumentSummary),
    Failed(String),
}

struct Done {
    index: usize,
    filename: String,
    outcome: Outcome,
}

/// Called with (settled, total) after each document is committed or recorded
pub type ProgressFn = dyn Fn(usize, usize) + Send + Sync;

/// Concurrent decomposition of a list of files into one graph
#[derive(Clone)]
pub struct BatchDecomposer {
    workers: usize,
    ordered_commit: bool,
    on_progress: Option<Arc<ProgressFn>>,
}

impl fmt::Debug for BatchDecomposer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BatchDecomposer")
            .field("workers", &self.workers)
            .field("ordered_commit", &self.ordered_commit)
            .finish_non_exhaustive()
    }
}

impl BatchDecomposer {
    pub fn new(workers: usize) -> Self {
        Self { workers: workers.max(1), ordered_commit: false, on_progress: None }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.worker_count()).ordered(config.processing.ordered_commit)
    }

    /// Commit documents in input order
    pub fn ordered(mut self, ordered: bool) -> Self {
        self.ordered_commit = ordered;
        self
    }

    /// Observe progress from the collecting task
    pub fn on_progress(mut self, callback: impl Fn(usize, usize) + Send + Sync + 'static) -> Self {
        self.on_progress = Some(Arc::new(callback));
        self
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Decompose `paths`, blocking the current thread
    pub fn run(&self, paths: Vec<PathBuf>, cancel: &CancelToken) -> BatchOutcome {
        smol::block_on(self.run_async(paths, cancel))
    }

    pub async fn run_async(&self, paths: Vec<PathBuf>, cancel: &CancelToken) -> BatchOutcome {
        let total = paths.len();
        tracing::info!("Decomposing {} files with {} workers", total, self.workers);

        let builder = Arc::new(GraphBuilder::new());
        let (job_tx, job_rx) = smol::channel::bounded::<(usize, PathBuf)>(self.workers * 2);
        let (done_tx, done_rx) = smol::channel::bounded::<Done>(self.workers * 2);

        let feeder = {
            let cancel = cancel.clone();
            smol::spawn(async move {
                for job in paths.into_iter().enumerate() {
                    if cancel.is_cancelled() || job_tx.send(job).await.is_err() {
                        break;
                    }
                }
            })
        };

        let commit_in_worker = !self.ordered_commit;
        let workers: Vec<smol::Task<()>> = (0..self.workers)
            .map(|_| {
                let job_rx = job_rx.clone();
                let done_tx = done_tx.clone();
                let builder = Arc::clone(&builder);
                let cancel = cancel.clone();
                smol::spawn(async move {
                    while let Ok((index, path)) = job_rx.recv().await {
                        if cancel.is_cancelled() {
                            break;
                        }
                        let filename = document_name(&path);
                        let outcome = process(path, filename.clone(), &builder, commit_in_worker).await;
                        if done_tx.send(Done { index, filename, outcome }).await.is_err() {
                            break;
                        }
                    }
                })
            })
            .collect();
        drop(job_rx);
        drop(done_tx);

        let mut report = BuildReport::default();
        let mut pending: BTreeMap<usize, Done> = BTreeMap::new();
        let mut next = 0;
        let mut settled = 0;
        while let Ok(done) = done_rx.recv().await {
            if !self.ordered_commit {
                settle(done, &builder, &mut report).await;
                settled += 1;
                self.progress(settled, total);
                continue;
            }
            pending.insert(done.index, done);
            while let Some(done) = pending.remove(&next) {
                next += 1;
                settle(done, &builder, &mut report).await;
                settled += 1;
                self.progress(settled, total);
            }
        }
        // Only a cancelled run leaves gaps in the input order
        for (_, done) in std::mem::take(&mut pending) {
            settle(done, &builder, &mut report).await;
            settled += 1;
            self.progress(settled, total);
        }

        feeder.await;
        for worker in workers {
            worker.await;
        }

        let cancelled = cancel.is_cancelled();
        if cancelled {
            tracing::warn!("Decomposition cancelled after {} of {} files", settled, total);
        }
        let (graph, content) = match Arc::try_unwrap(builder) {
            Ok(builder) => builder.finish(),
            Err(shared) => shared.snapshot(),
        };
        tracing::info!(
            "Decomposed {} documents into {} nodes and {} edges ({} failed)",
            report.documents,
            graph.node_count(),
            graph.edge_count(),
            report.failures.len()
        );
        BatchOutcome { graph, content, report, cancelled }
    }

    fn progress(&self, settled: usize, total: usize) {
        if settled % PROGRESS_INTERVAL == 0 {
            tracing::info!("Processed {}/{} files", settled, total);
        }
        if let Some(callback) = &self.on_progress {
            callback(settled, total);
        }
    }
}

/// Read, parse and hash one file; commit it too unless an ordered committer will
async fn process(path: PathBuf, filename: String, builder: &Arc<GraphBuilder>, commit: bool) -> Outcome {
    let bytes = match smol::fs::read(&path).await {
        Ok(bytes) => bytes,
        Err(e) => return Outcome::Failed(format!("Failed to read {}: {}", path.display(), e)),
    };
    let builder = Arc::clone(builder);
    smol::unblock(move || {
        let tree = match HtmlParser::new().parse_bytes(&bytes) {
            Ok(tree) => tree,
            Err(e) => return Outcome::Failed(e.to_string()),
        };
        match GraphBuilder::prepare(filename, tree) {
            Ok(prepared) if commit => Outcome::Committed(builder.commit(&prepared)),
            Ok(prepared) => Outcome::Prepared(prepared),
            Err(e) => Outcome::Failed(e.to_string()),
        }
    })
    .await
}

async fn settle(done: Done, builder: &Arc<GraphBuilder>, report: &mut BuildReport) {
    match done.outcome {
        Outcome::Committed(summary) => report.record_success(&summary),
        Outcome::Prepared(prepared) => {
            let builder = Arc::clone(builder);
            let summary = smol::unblock(move || builder.commit(&prepared)).await;
            report.record_success(&summary);
        }
        Outcome::Failed(reason) => report.record_failure(done.filename, reason),
    }
}
