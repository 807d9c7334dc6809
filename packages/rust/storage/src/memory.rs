//! In-process run store.

use std::collections::HashMap;

use async_trait::async_trait;
use blogwriter_shared::{BlogWriterError, Result, RunId, RunRecord, RunStatus, RunStore};
use tokio::sync::Mutex;

use crate::claimable_step;

/// Run records held in a map behind a mutex. Nothing survives the process.
#[derive(Default)]
pub struct MemoryRunStore {
    runs: Mutex<HashMap<RunId, RunRecord>>,
}

impl MemoryRunStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl RunStore for MemoryRunStore {
    async fn create(&self, record: &RunRecord) -> Result<()> {
        let mut runs = self.runs.lock().await;
        if runs.contains_key(&record.run_id) {
            return Err(BlogWriterError::RunExists {
                run_id: record.run_id.clone(),
            });
        }
        runs.insert(record.run_id.clone(), record.clone());
        Ok(())
    }

    async fn save(&self, record: &RunRecord) -> Result<()> {
        let mut runs = self.runs.lock().await;
        match runs.get_mut(&record.run_id) {
            Some(slot) => {
                *slot = record.clone();
                Ok(())
            }
            None => Err(BlogWriterError::RunNotFound {
                run_id: record.run_id.clone(),
            }),
        }
    }

    async fn load(&self, run_id: &RunId) -> Result<RunRecord> {
        self.runs
            .lock()
            .await
            .get(run_id)
            .cloned()
            .ok_or_else(|| BlogWriterError::RunNotFound {
                run_id: run_id.clone(),
            })
    }

    async fn claim_suspended(&self, run_id: &RunId) -> Result<RunRecord> {
        let mut runs = self.runs.lock().await;
        let record = runs.get_mut(run_id).ok_or_else(|| BlogWriterError::RunNotFound {
            run_id: run_id.clone(),
        })?;
        let step = claimable_step(record)?;
        record.transition(RunStatus::Running { step });
        Ok(record.clone())
    }

    async fn list(&self) -> Result<Vec<RunRecord>> {
        let mut all: Vec<RunRecord> = self.runs.lock().await.values().cloned().collect();
        all.sort_by(|a, b| b.updated_at.cmp(&a.updated_at));
        Ok(all)
    }
}
