//! Snapshot persistence
//!
//! Graphs and content stores are written as pretty JSON, one file each:
//! `structure.json` holds nodes and edges, `data.json` the content tables.
//! Later stages prefix the names (`condensed_`, `unwrapped_`).

use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

use serde::Serialize;
use serde::de::DeserializeOwned;
use sg_graph::{ContentStore, Graph};

use crate::error::{EngineError, Result};

/// Validation report file name
pub const VALIDATION_FILE: &str = "validation.json";

/// Pipeline stage a snapshot belongs to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Decomposed,
    Condensed,
    Unwrapped,
}

impl Stage {
    fn prefix(self) -> &'static str {
        match self {
            Stage::Decomposed => "",
            Stage::Condensed => "condensed_",
            Stage::Unwrapped => "unwrapped_",
        }
    }

    pub fn structure_file(self) -> String {
        format!("{}structure.json", self.prefix())
    }

    pub fn data_file(self) -> String {
        format!("{}data.json", self.prefix())
    }
}

/// A graph with its content store
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub graph: Graph,
    pub content: ContentStore,
}

impl Snapshot {
    pub fn new(graph: Graph, content: ContentStore) -> Self {
        Self { graph, content }
    }

    /// Write both files of `stage` under `dir`
    pub fn save(&self, dir: &Path, stage: Stage) -> Result<()> {
        std::fs::create_dir_all(dir).map_err(|e| EngineError::io(dir, e))?;
        save_json(&dir.join(stage.structure_file()), &self.graph)?;
        save_json(&dir.join(stage.data_file()), &self.content)?;
        tracing::info!("Saved {} nodes and {} edges to {}", self.graph.node_count(), self.graph.edge_count(), dir.display());
        Ok(())
    }

    /// Read both files of `stage` from `dir`
    pub fn load(dir: &Path, stage: Stage) -> Result<Self> {
        let graph: Graph = load_json(&dir.join(stage.structure_file()))?;
        let content: ContentStore = load_json(&dir.join(stage.data_file()))?;
        tracing::info!("Loaded {} nodes and {} edges from {}", graph.node_count(), graph.edge_count(), dir.display());
        Ok(Self { graph, content })
    }

    /// Paths written by [`Snapshot::save`]
    pub fn files(dir: &Path, stage: Stage) -> [PathBuf; 2] {
        [dir.join(stage.structure_file()), dir.join(stage.data_file())]
    }
}

/// Serialize `value` to `path` as pretty JSON
pub fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    let file = File::create(path).map_err(|e| EngineError::io(path, e))?;
    let mut writer = BufWriter::new(file);
    serde_json::to_writer_pretty(&mut writer, value)
        .map_err(|source| EngineError::Snapshot { path: path.to_path_buf(), source })?;
    writer.flush().map_err(|e| EngineError::io(path, e))
}

/// Deserialize JSON at `path`
pub fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let file = File::open(path).map_err(|e| EngineError::io(path, e))?;
    serde_json::from_reader(BufReader::new(file))
        .map_err(|source| EngineError::Snapshot { path: path.to_path_buf(), source })
}
