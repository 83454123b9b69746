//! Pipeline Stages and Status
//!
//! Stage selection flags and the per-run status record. Every run is
//! identified by a UUID and carries timestamps, the stage reached and the
//! captured command output.

use std::fmt;
use bitflags::bitflags;
use chrono::{DateTime, Utc};
use serde::{Serialize, Deserialize};
use uuid::Uuid;

bitflags! {
    /// Pipeline stages that can be combined for partial runs
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct StageSet: u8 {
        /// Build the plugin
        const BUILD = 0x01;
        /// Run the plugin's registered test cases
        const TEST = 0x02;
        /// Deploy the plugin
        const DEPLOY = 0x04;
    }
}

impl StageSet {
    /// Build and test, without deploying
    pub fn build_and_test() -> Self {
        StageSet::BUILD | StageSet::TEST
    }

    /// The stages in execution order
    pub fn stages(&self) -> Vec<PipelineStage> {
        let mut stages = Vec::new();
        if self.contains(StageSet::BUILD) {
            stages.push(PipelineStage::Build);
        }
        if self.contains(StageSet::TEST) {
            stages.push(PipelineStage::Test);
        }
        if self.contains(StageSet::DEPLOY) {
            stages.push(PipelineStage::Deploy);
        }
        stages
    }
}

/// A single pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum PipelineStage {
    Build,
    Test,
    Deploy,
}

impl fmt::Display for PipelineStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PipelineStage::Build => "build",
            PipelineStage::Test => "test",
            PipelineStage::Deploy => "deploy",
        };
        write!(f, "{}", name)
    }
}

/// Status of one pipeline run
///
/// A fresh run starts in the first requested stage with `in_progress`
/// set; the record is replaced in place as the run advances so observers
/// always see a coherent snapshot. `success` is only meaningful once
/// `in_progress` is false.
#[derive(Debug, Clone, Serialize)]
pub struct PipelineStatus {
    /// Plugin the run targets
    pub plugin_name: String,

    /// Unique id for this run
    pub run_id: Uuid,

    /// Stage the run has reached
    pub stage: PipelineStage,

    /// Whether the run is still executing
    pub in_progress: bool,

    /// Overall outcome once the run has finished
    pub success: bool,

    /// Accumulated stage output
    pub output: String,

    /// Failure detail, empty while none
    pub error: String,

    /// When the run was admitted
    pub started_at: DateTime<Utc>,

    /// When the run finished, if it has
    pub finished_at: Option<DateTime<Utc>>,
}

impl PipelineStatus {
    /// Create the status record for a freshly admitted run
    pub fn started<S: Into<String>>(plugin_name: S, run_id: Uuid, first_stage: PipelineStage) -> Self {
        Self {
            plugin_name: plugin_name.into(),
            run_id,
            stage: first_stage,
            in_progress: true,
            success: false,
            output: String::new(),
            error: String::new(),
            started_at: Utc::now(),
            finished_at: None,
        }
    }

    /// Append a line of stage output
    pub fn push_output(&mut self, line: &str) {
        if !self.output.is_empty() {
            self.output.push('\n');
        }
        self.output.push_str(line);
    }

    /// Mark the run finished successfully
    pub fn finish_success(&mut self) {
        self.in_progress = false;
        self.success = true;
        self.finished_at = Some(Utc::now());
    }

    /// Mark the run failed with the given error detail
    pub fn finish_failure<S: Into<String>>(&mut self, error: S) {
        self.in_progress = false;
        self.success = false;
        self.error = error.into();
        self.finished_at = Some(Utc::now());
    }

    /// Whether the run has finished, successfully or not
    pub fn is_finished(&self) -> bool {
        !self.in_progress
    }

    /// Whether the run finished in failure
    pub fn is_failed(&self) -> bool {
        !self.in_progress && !self.success
    }
}

impl fmt::Display for PipelineStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let outcome = if self.in_progress {
            "running"
        } else if self.success {
            "succeeded"
        } else {
            "failed"
        };
        write!(f, "{} [{}] {}: {}", self.plugin_name, self.run_id, self.stage, outcome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_set_ordering() {
        assert_eq!(
            StageSet::all().stages(),
            vec![PipelineStage::Build, PipelineStage::Test, PipelineStage::Deploy]
        );
        assert_eq!(
            StageSet::build_and_test().stages(),
            vec![PipelineStage::Build, PipelineStage::Test]
        );
        assert_eq!(StageSet::DEPLOY.stages(), vec![PipelineStage::Deploy]);
        assert!(StageSet::empty().stages().is_empty());
    }

    #[test]
    fn test_status_lifecycle() {
        let run_id = Uuid::new_v4();
        let mut status = PipelineStatus::started("metrics", run_id, PipelineStage::Build);
        assert!(status.in_progress);
        assert!(!status.is_finished());
        assert!(!status.is_failed());
        assert_eq!(status.run_id, run_id);

        status.push_output("building");
        status.push_output("done");
        assert_eq!(status.output, "building\ndone");

        status.finish_success();
        assert!(status.is_finished());
        assert!(status.success);
        assert!(status.finished_at.is_some());
    }

    #[test]
    fn test_status_failure() {
        let mut status = PipelineStatus::started("metrics", Uuid::new_v4(), PipelineStage::Build);
        status.stage = PipelineStage::Test;
        status.finish_failure("2 cases failed");

        assert!(status.is_failed());
        assert_eq!(status.error, "2 cases failed");
        assert!(status.to_string().contains("failed"));
    }

    #[test]
    fn test_status_serializes_to_json() {
        let status = PipelineStatus::started("metrics", Uuid::new_v4(), PipelineStage::Build);
        let json = serde_json::to_string(&status).unwrap();
        assert!(json.contains("\"plugin_name\":\"metrics\""));
        assert!(json.contains("\"in_progress\":true"));
    }
}
