//! Execution and resume controller.
//!
//! Drives a [`Pipeline`] against a [`RunStore`]:
//! - [`Controller::start`] runs every step in front of the suspend boundary
//!   and persists the run as suspended
//! - [`Controller::resume`] claims a suspended run, applies the caller's
//!   patch and runs the remaining steps to completion
//!
//! Every status transition is saved, so a failed run keeps the state
//! produced up to the failing step. Steps are never retried.

use std::ops::Range;
use std::sync::Arc;

use tracing::{error, info, instrument, warn};
use url::Url;

use blogwriter_shared::{
    BlogWriterError, PipelineOutput, PipelineState, Result, RunConfig, RunId, RunRecord,
    RunStatus, RunStore, StatePatch, StepName,
};

use crate::pipeline::{Collaborators, Pipeline};
use crate::progress::ProgressReporter;

/// Caller input for a new run.
#[derive(Debug, Clone, Default)]
pub struct RunInput {
    /// Caller-chosen id (e.g. a thread id). Generated when `None`.
    pub run_id: Option<RunId>,
    pub url: String,
    pub user_keywords: Option<Vec<String>>,
    pub config: RunConfig,
}

/// What `start` hands back: enough to show the suggestions and resume later.
#[derive(Debug, Clone)]
pub struct RunHandle {
    pub run_id: RunId,
    pub status: RunStatus,
    pub suggested_keywords: Vec<String>,
}

/// Runs the pipeline and owns the suspend/resume mechanics.
pub struct Controller {
    pipeline: Pipeline,
    deps: Collaborators,
    store: Arc<dyn RunStore>,
}

impl Controller {
    pub fn new(pipeline: Pipeline, deps: Collaborators, store: Arc<dyn RunStore>) -> Self {
        Self {
            pipeline,
            deps,
            store,
        }
    }

    /// Controller for the blog writer pipeline.
    pub fn blog_writer(deps: Collaborators, store: Arc<dyn RunStore>) -> Self {
        Self::new(Pipeline::blog_writer(), deps, store)
    }

    /// Create a run and execute it up to the suspend boundary.
    ///
    /// Fails with `Validation` for a non-http(s) URL, `RunExists` for a
    /// reused run id, or `Step` if one of the early steps fails.
    #[instrument(skip_all, fields(url = %input.url))]
    pub async fn start(&self, input: RunInput, progress: &dyn ProgressReporter) -> Result<RunHandle> {
        validate_url(&input.url)?;

        let run_id = input.run_id.unwrap_or_else(RunId::generate);
        let user_keywords = input
            .user_keywords
            .map(|kws| {
                kws.into_iter()
                    .map(|k| k.trim().to_string())
                    .filter(|k| !k.is_empty())
                    .collect::<Vec<_>>()
            })
            .filter(|kws| !kws.is_empty());

        let state = PipelineState::new(input.url.trim(), user_keywords, input.config);
        let mut record = RunRecord::new(run_id.clone(), state);
        self.store.create(&record).await?;
        info!(%run_id, "run created");

        let boundary = self.pipeline.boundary_index();
        let end = boundary.unwrap_or(self.pipeline.len());
        let last = self.run_steps(&mut record, 0..end, progress).await?;

        match boundary.and_then(|i| self.pipeline.step(i)).map(|s| s.name()) {
            Some(step) => {
                record.transition(RunStatus::SuspendedAt { step });
                self.persist(&mut record, last).await?;
                info!(%run_id, %step, "run suspended");
                progress.suspended(&run_id, step);
            }
            None => self.complete(&mut record, last, progress).await?,
        }

        Ok(RunHandle {
            run_id,
            status: record.status,
            suggested_keywords: record.state.suggested_keywords.unwrap_or_default(),
        })
    }

    /// Resume a suspended run with an optional patch and run it to the end.
    ///
    /// Fails with `RunNotFound` for unknown, completed or failed runs and
    /// `RunBusy` while another resume holds the run. Neither touches state.
    #[instrument(skip_all, fields(run_id = %run_id))]
    pub async fn resume(
        &self,
        run_id: &RunId,
        patch: StatePatch,
        progress: &dyn ProgressReporter,
    ) -> Result<PipelineOutput> {
        let mut record = self.store.claim_suspended(run_id).await?;

        let resume_step = match &record.status {
            RunStatus::Running { step } => *step,
            other => {
                return Err(BlogWriterError::Storage(format!(
                    "claimed run {run_id} has unexpected status {other}"
                )));
            }
        };
        let from = self.pipeline.index_of(resume_step).ok_or_else(|| {
            BlogWriterError::Storage(format!("run {run_id} paused at unknown step {resume_step}"))
        })?;

        if let Err(e) = patch.apply_to(&mut record.state) {
            // Release the claim so the caller can retry with a valid patch.
            record.transition(RunStatus::SuspendedAt { step: resume_step });
            if let Err(save_err) = self.store.save(&record).await {
                warn!(error = %save_err, "could not release claimed run");
            }
            return Err(e);
        }
        info!(%resume_step, selected = ?record.state.selected_keywords, "resuming run");

        let last = self
            .run_steps(&mut record, from..self.pipeline.len(), progress)
            .await?;
        self.complete(&mut record, last, progress).await?;

        PipelineOutput::try_from(&record.state)
    }

    /// Non-interactive mode: start, then resume immediately with `patch`.
    pub async fn run_to_completion(
        &self,
        input: RunInput,
        patch: StatePatch,
        progress: &dyn ProgressReporter,
    ) -> Result<(RunId, PipelineOutput)> {
        let handle = self.start(input, progress).await?;
        if handle.status == RunStatus::Completed {
            let record = self.store.load(&handle.run_id).await?;
            return Ok((handle.run_id, PipelineOutput::try_from(&record.state)?));
        }
        let output = self.resume(&handle.run_id, patch, progress).await?;
        Ok((handle.run_id, output))
    }

    /// The persisted record for `run_id`.
    pub async fn status(&self, run_id: &RunId) -> Result<RunRecord> {
        self.store.load(run_id).await
    }

    /// All persisted runs, most recently updated first.
    pub async fn list_runs(&self) -> Result<Vec<RunRecord>> {
        self.store.list().await
    }

    /// Run the steps in `range`, returning the last one executed.
    async fn run_steps(
        &self,
        record: &mut RunRecord,
        range: Range<usize>,
        progress: &dyn ProgressReporter,
    ) -> Result<Option<StepName>> {
        let mut last = None;
        for index in range {
            let Some(step) = self.pipeline.step(index) else {
                break;
            };
            let name = step.name();

            record.transition(RunStatus::Running { step: name });
            self.persist(record, Some(name)).await?;
            progress.step_started(name);
            info!(step = %name, index, "step started");

            let outcome = step
                .run(&record.state, &self.deps)
                .await
                .and_then(|update| record.state.apply(update));

            if let Err(e) = outcome {
                error!(step = %name, error = %e, "step failed");
                return Err(self.fail(record, name, e).await);
            }

            progress.step_finished(name);
            last = Some(name);
        }
        Ok(last)
    }

    async fn complete(
        &self,
        record: &mut RunRecord,
        last: Option<StepName>,
        progress: &dyn ProgressReporter,
    ) -> Result<()> {
        record.transition(RunStatus::Completed);
        self.persist(record, last).await?;
        info!(run_id = %record.run_id, "run completed");
        progress.done(&record.run_id);
        Ok(())
    }

    /// Save `record`. A failed save is charged to `step`, so the run ends up
    /// `Failed` instead of stuck in its unsaved status.
    async fn persist(&self, record: &mut RunRecord, step: Option<StepName>) -> Result<()> {
        match (self.store.save(record).await, step) {
            (Ok(()), _) => Ok(()),
            (Err(e), Some(step)) => {
                error!(%step, error = %e, "could not persist run");
                Err(self.fail(record, step, e).await)
            }
            (Err(e), None) => Err(e),
        }
    }

    /// Mark the run failed at `step` (best effort) and wrap the cause.
    async fn fail(
        &self,
        record: &mut RunRecord,
        step: StepName,
        cause: BlogWriterError,
    ) -> BlogWriterError {
        record.transition(RunStatus::Failed {
            step,
            error: cause.to_string(),
        });
        if let Err(save_err) = self.store.save(record).await {
            warn!(error = %save_err, "could not persist failed run");
        }
        BlogWriterError::step(step, record.run_id.clone(), cause)
    }
}

fn validate_url(raw: &str) -> Result<()> {
    let url = Url::parse(raw.trim())
        .map_err(|e| BlogWriterError::validation(format!("invalid URL '{raw}': {e}")))?;
    match url.scheme() {
        "http" | "https" if url.has_host() => Ok(()),
        "http" | "https" => Err(BlogWriterError::validation(format!("URL '{raw}' has no host"))),
        other => Err(BlogWriterError::validation(format!(
            "unsupported URL scheme '{other}' (expected http or https)"
        ))),
    }
}
