//! Processing pipeline
//!
//! discover -> decompose -> integrity check -> save -> condense (optional)
//! -> unwrap -> validate -> save

use serde::Serialize;
use sg_graph::{CondenseReport, Condenser, Unwrapper, ValidationReport};

use crate::batch::{BatchDecomposer, CancelToken};
use crate::config::Config;
use crate::discovery::discover;
use crate::error::Result;
use crate::persist::{Snapshot, Stage, VALIDATION_FILE, save_json};

/// Counts from the decomposition stage
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DecomposeSummary {
    pub files: usize,
    pub documents: usize,
    pub failed: usize,
    pub nodes: usize,
    pub edges: usize,
    pub cancelled: bool,
}

/// Counts from the unwrap stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct UnwrapSummary {
    pub removed_wrappers: usize,
    pub rewired_edges: usize,
    pub removed_attributes: usize,
    pub nodes: usize,
    pub edges: usize,
    pub validation: ValidationReport,
}

/// Outcome of a full run
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PipelineSummary {
    pub decompose: DecomposeSummary,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub condense: Option<CondenseReport>,
    pub unwrap: UnwrapSummary,
}

/// Runs the stages against one configuration
#[derive(Debug, Clone)]
pub struct Pipeline {
    config: Config,
}

impl Pipeline {
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Every stage, saving each snapshot under the output directory
    pub fn run(&self, cancel: &CancelToken) -> Result<PipelineSummary> {
        let (snapshot, decompose) = self.decompose(cancel)?;
        let (input, condense) = match self.condense(&snapshot)? {
            Some((condensed, report)) => (condensed, Some(report)),
            None => (snapshot, None),
        };
        let unwrap = self.unwrap(&input)?;
        Ok(PipelineSummary { decompose, condense, unwrap })
    }

    /// Decompose the input directory and save `structure.json` / `data.json`
    pub fn decompose(&self, cancel: &CancelToken) -> Result<(Snapshot, DecomposeSummary)> {
        let processing = &self.config.processing;
        let files = discover(&self.config.paths.input_dir, &processing.extension, processing.max_files)?;
        let count = files.len();

        let outcome = BatchDecomposer::from_config(&self.config).run(files, cancel);
        outcome.graph.check_references(&outcome.content)?;

        let snapshot = Snapshot::new(outcome.graph, outcome.content);
        snapshot.save(&self.config.paths.output_dir, Stage::Decomposed)?;
        tracing::info!("Decomposed data and structure saved successfully.");

        let summary = DecomposeSummary {
            files: count,
            documents: outcome.report.documents,
            failed: outcome.report.failures.len(),
            nodes: snapshot.graph.node_count(),
            edges: snapshot.graph.edge_count(),
            cancelled: outcome.cancelled,
        };
        Ok((snapshot, summary))
    }

    /// Condense `snapshot` if enabled, saving the `condensed_` files
    pub fn condense(&self, snapshot: &Snapshot) -> Result<Option<(Snapshot, CondenseReport)>> {
        if !self.config.condense.enabled {
            return Ok(None);
        }
        let condenser = Condenser::new(self.config.condense.options.clone());
        let (graph, content, report) = condenser.condense(&snapshot.graph, &snapshot.content);
        let condensed = Snapshot::new(graph, content);
        condensed.save(&self.config.paths.output_dir, Stage::Condensed)?;
        tracing::info!("Condensed data and structure saved successfully.");
        Ok(Some((condensed, report)))
    }

    /// Unwrap `snapshot`, saving the `unwrapped_` files and `validation.json`
    pub fn unwrap(&self, snapshot: &Snapshot) -> Result<UnwrapSummary> {
        let unwrapper = Unwrapper::new(self.config.unwrap.targets.clone());
        let outcome = unwrapper.unwrap(&snapshot.graph, &snapshot.content);
        outcome.graph.check_references(&outcome.content)?;

        let output_dir = &self.config.paths.output_dir;
        let summary = UnwrapSummary {
            removed_wrappers: outcome.removed.len(),
            rewired_edges: outcome.rewired_edges,
            removed_attributes: outcome.removed_attributes,
            nodes: outcome.graph.node_count(),
            edges: outcome.graph.edge_count(),
            validation: outcome.report,
        };
        Snapshot::new(outcome.graph, outcome.content).save(output_dir, Stage::Unwrapped)?;
        save_json(&output_dir.join(VALIDATION_FILE), &summary.validation)?;

        if !summary.validation.is_acyclic {
            tracing::warn!("Unwrapped graph contains a cycle");
        }
        tracing::info!("Unwrapped graph saved successfully.");
        Ok(summary)
    }

    /// Unwrap the latest snapshot saved in the output directory
    pub fn unwrap_saved(&self) -> Result<UnwrapSummary> {
        let stage = if self.config.condense.enabled { Stage::Condensed } else { Stage::Decomposed };
        let snapshot = Snapshot::load(&self.config.paths.output_dir, stage)?;
        self.unwrap(&snapshot)
    }
}
