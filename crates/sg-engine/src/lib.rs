//! sitegraph Engine
//!
//! Runs the decomposition pipeline over a directory of HTML files.
//!
//! # Example
//! ```rust,ignore
//! use sg_engine::{CancelToken, Config, Pipeline};
//!
//! let config = Config::load(None)?;
//! let summary = Pipeline::new(config).run(&CancelToken::new())?;
//! println!("{} documents", summary.decompose.documents);
//! ```

mod batch;
mod config;
mod discovery;
mod error;
pub mod logging;
mod persist;
mod pipeline;

pub use batch::{BatchDecomposer, BatchOutcome, CancelToken, PROGRESS_INTERVAL, ProgressFn};
pub use config::{
    CondenseConfig, Config, DEFAULT_CONFIG_FILE, ENV_PREFIX, LoggingConfig, PathsConfig, ProcessingConfig,
    UnwrapConfig,
};
pub use discovery::{discover, document_name};
pub use error::{ConfigError, EngineError, Result};
pub use persist::{Snapshot, Stage, VALIDATION_FILE, load_json, save_json};
pub use pipeline::{DecomposeSummary, Pipeline, PipelineSummary, UnwrapSummary};

// Re-export sub-crates for advanced usage
pub use sg_graph as graph;
pub use sg_html as html;

/// Engine version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
