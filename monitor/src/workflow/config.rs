use crate::generator::scenario::ScenarioConfig;
use anyhow::{ensure, Context};
use serde::{Deserialize, Serialize};
use std::fs;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use trafficcore::prelude::{EstimatorConfig, SamplerConfig};

/// Identity stamped on every record produced by this monitor.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    pub camera_id: String,
    pub location: String,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            camera_id: "mobile_cam_001".into(),
            location: "Mobile Camera - Street View".into(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SinkConfig {
    pub topic: String,
    pub store_path: PathBuf,
    pub bridge_address: SocketAddr,
    pub history_limit: usize,
    /// Deliver on a background worker instead of inline in the capture loop.
    pub background: bool,
    pub queue_depth: usize,
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            topic: "traffic/data".into(),
            store_path: PathBuf::from("tools/data/traffic_records.jsonl"),
            bridge_address: SocketAddr::from(([127, 0, 0, 1], 9000)),
            history_limit: 100,
            background: false,
            queue_depth: 64,
        }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WorkflowConfig {
    pub estimator: EstimatorConfig,
    pub sampler: SamplerConfig,
    pub source: SourceConfig,
    pub sinks: SinkConfig,
    pub scenario: ScenarioConfig,
}

impl WorkflowConfig {
    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path_ref = path.as_ref();
        let contents = fs::read_to_string(path_ref)
            .with_context(|| format!("reading workflow config {}", path_ref.display()))?;
        let config: WorkflowConfig = serde_yaml::from_str(&contents)
            .with_context(|| format!("parsing workflow config {}", path_ref.display()))?;
        Ok(config)
    }

    /// Checks everything that would make the pipeline unusable. Called once
    /// at startup; any error aborts before the first frame is read.
    pub fn validate(&self) -> anyhow::Result<()> {
        self.estimator
            .validate()
            .context("estimator configuration")?;
        self.sampler.validate().context("sampler configuration")?;
        self.scenario.validate().context("scenario configuration")?;
        ensure!(
            !self.source.camera_id.trim().is_empty(),
            "source.camera_id must not be empty"
        );
        ensure!(
            !self.source.location.trim().is_empty(),
            "source.location must not be empty"
        );
        ensure!(
            !self.sinks.topic.trim().is_empty(),
            "sinks.topic must not be empty"
        );
        ensure!(self.sinks.queue_depth > 0, "sinks.queue_depth must be positive");
        Ok(())
    }
}
