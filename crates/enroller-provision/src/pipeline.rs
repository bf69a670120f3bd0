//! Ordered step execution with per-step records.

use crate::fs::FileEntry;
use chrono::{DateTime, Utc};
use enroller_core::{Result, Step, StepPolicy};
use serde::Serialize;
use std::future::Future;
use std::path::PathBuf;
use std::time::Instant;
use tracing::{debug, info, warn};

/// What was provisioned
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvisionKind {
    /// Peer organization
    Org,
    /// Orderer organization
    Orderer,
    /// Additional user of an existing organization
    User,
}

/// How a step ended
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "lowercase")]
pub enum StepOutcome {
    /// Completed
    Done,
    /// Not run because it was disabled
    Skipped,
    /// Failed; only recorded for advisory steps
    Failed {
        /// Error message
        error: String,
    },
}

/// One executed (or skipped) step
#[derive(Debug, Clone, Serialize)]
pub struct StepRecord {
    /// The step
    #[serde(flatten)]
    pub step: Step,
    /// Human-readable step name
    pub title: String,
    /// Failure policy the step ran under
    pub policy: StepPolicy,
    /// Result
    #[serde(flatten)]
    pub outcome: StepOutcome,
    /// Wall-clock duration in milliseconds
    pub elapsed_ms: u64,
}

/// Summary of a successful provisioning run.
#[derive(Debug, Clone, Serialize)]
pub struct ProvisionReport {
    /// What was provisioned
    pub kind: ProvisionKind,
    /// Credential root
    pub root: PathBuf,
    /// Steps in execution order
    pub steps: Vec<StepRecord>,
    /// Messages from failed advisory steps
    pub advisories: Vec<String>,
    /// Primary TLS directory, if the run produced one
    pub tls_dir: Option<PathBuf>,
    /// Listing of `tls_dir`
    pub tls_files: Vec<FileEntry>,
    /// When the run finished
    pub finished_at: DateTime<Utc>,
}

impl ProvisionReport {
    /// Steps that completed
    pub fn completed(&self) -> impl Iterator<Item = &StepRecord> {
        self.steps
            .iter()
            .filter(|r| r.outcome == StepOutcome::Done)
    }
}

/// Runs steps in order, stopping at the first fatal failure.
#[derive(Debug)]
pub struct Pipeline {
    kind: ProvisionKind,
    root: PathBuf,
    steps: Vec<StepRecord>,
    advisories: Vec<String>,
}

impl Pipeline {
    /// Start a run for `root`
    pub fn new(kind: ProvisionKind, root: impl Into<PathBuf>) -> Self {
        Self {
            kind,
            root: root.into(),
            steps: Vec::new(),
            advisories: Vec::new(),
        }
    }

    /// Run a fatal step. Errors come back wrapped with the step.
    pub async fn run<T, F>(&mut self, step: Step, work: F) -> Result<T>
    where
        F: Future<Output = Result<T>>,
    {
        debug!(step = %step, "starting step");
        let started = Instant::now();
        match work.await {
            Ok(value) => {
                info!(step = %step, "step complete");
                self.record(step, StepOutcome::Done, started);
                Ok(value)
            }
            Err(e) => Err(e.in_step(step)),
        }
    }

    /// Run a step whose failure is recorded but does not stop the run.
    pub async fn advisory<T, F>(&mut self, step: Step, work: F) -> Option<T>
    where
        F: Future<Output = Result<T>>,
    {
        let started = Instant::now();
        match work.await {
            Ok(value) => {
                info!(step = %step, "step complete");
                self.record(step, StepOutcome::Done, started);
                Some(value)
            }
            Err(e) => {
                let message = format!("{step}: {e}");
                warn!(step = %step, error = %e, "advisory step failed, continuing");
                self.advisories.push(message);
                self.record(
                    step,
                    StepOutcome::Failed {
                        error: e.to_string(),
                    },
                    started,
                );
                None
            }
        }
    }

    /// Record a disabled step
    pub fn skip(&mut self, step: Step) {
        debug!(step = %step, "step skipped");
        self.record(step, StepOutcome::Skipped, Instant::now());
    }

    fn record(&mut self, step: Step, outcome: StepOutcome, started: Instant) {
        let elapsed_ms = u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX);
        self.steps.push(StepRecord {
            title: step.to_string(),
            policy: step.policy(),
            step,
            outcome,
            elapsed_ms,
        });
    }

    /// Close the run
    pub fn finish(self, tls_dir: Option<PathBuf>, tls_files: Vec<FileEntry>) -> ProvisionReport {
        ProvisionReport {
            kind: self.kind,
            root: self.root,
            steps: self.steps,
            advisories: self.advisories,
            tls_dir,
            tls_files,
            finished_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use enroller_core::EnrollError;

    #[tokio::test]
    async fn test_fatal_step_wraps_error() {
        let mut pipeline = Pipeline::new(ProvisionKind::Org, "/tmp/org1");
        pipeline
            .run(Step::PrepareRoot, async { Ok(()) })
            .await
            .unwrap();

        let err = pipeline
            .run(Step::EnrollCaAdmin, async {
                Err::<(), _>(EnrollError::Config("refused".into()))
            })
            .await
            .unwrap_err();

        assert_eq!(err.step(), Some(&Step::EnrollCaAdmin));
        assert_eq!(err.to_string(), "enroll CA admin: configuration error: refused");
    }

    #[tokio::test]
    async fn test_advisory_failure_continues() {
        let mut pipeline = Pipeline::new(ProvisionKind::Org, "/tmp/org1");
        let out = pipeline
            .advisory(Step::FixOwnership, async {
                Err::<usize, _>(EnrollError::Config("not permitted".into()))
            })
            .await;
        assert!(out.is_none());
        pipeline.skip(Step::CleanRoot);

        let report = pipeline.finish(None, Vec::new());
        assert_eq!(report.advisories.len(), 1);
        assert!(report.advisories[0].starts_with("fix ownership: "));
        assert_eq!(report.steps.len(), 2);
        assert_eq!(report.steps[1].outcome, StepOutcome::Skipped);
        assert_eq!(report.completed().count(), 0);
    }

    #[tokio::test]
    async fn test_report_serializes_flat_records() {
        let mut pipeline = Pipeline::new(ProvisionKind::Orderer, "/tmp/example.com");
        pipeline
            .run(
                Step::EnrollNodeTls {
                    node: "orderer.example.com".into(),
                },
                async { Ok(()) },
            )
            .await
            .unwrap();

        let json = serde_json::to_value(pipeline.finish(None, Vec::new())).unwrap();
        let step = &json["steps"][0];
        assert_eq!(json["kind"], "orderer");
        assert_eq!(step["step"], "enroll_node_tls");
        assert_eq!(step["node"], "orderer.example.com");
        assert_eq!(step["outcome"], "done");
        assert_eq!(step["policy"], "fatal");
    }
}
