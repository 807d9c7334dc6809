//! Run-state persistence.
//!
//! [`SqliteRunStore`] keeps run records in a local libSQL database so a run
//! suspended in one process can be resumed by another. [`MemoryRunStore`]
//! holds them in a map for tests and one-shot runs.
//!
//! Both implement the per-run-id mutual exclusion required for resume:
//! [`RunStore::claim_suspended`] is a compare-and-set from `suspended` to
//! `running`, so at most one resume is in flight for a given run.

mod memory;
mod migrations;

use std::path::Path;

use async_trait::async_trait;
use blogwriter_shared::{
    BlogWriterError, PipelineState, Result, RunId, RunRecord, RunStatus, RunStore, StepName,
};
use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use tracing::instrument;

pub use memory::MemoryRunStore;

/// Decide whether a loaded record may be claimed for resume.
///
/// Returns the step the run is suspended at. Runs already claimed are busy;
/// missing, completed, failed or never-suspended runs are not resumable.
pub(crate) fn claimable_step(record: &RunRecord) -> Result<StepName> {
    match &record.status {
        RunStatus::SuspendedAt { step } => Ok(*step),
        RunStatus::Running { .. } => Err(BlogWriterError::RunBusy {
            run_id: record.run_id.clone(),
        }),
        _ => Err(BlogWriterError::RunNotFound {
            run_id: record.run_id.clone(),
        }),
    }
}

fn storage_err(e: impl std::fmt::Display) -> BlogWriterError {
    BlogWriterError::Storage(e.to_string())
}

fn parse_timestamp(value: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(value)
        .map(|t| t.with_timezone(&Utc))
        .map_err(|e| BlogWriterError::Storage(format!("invalid timestamp '{value}': {e}")))
}

/// libSQL-backed run store.
pub struct SqliteRunStore {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
}

impl SqliteRunStore {
    /// Open or create a database at `path` and apply pending migrations.
    pub async fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| BlogWriterError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(storage_err)?;
        let conn = db.connect().map_err(storage_err)?;

        let store = Self { db, conn };
        store.run_migrations().await?;
        Ok(store)
    }

    /// Persist `record`'s running status only if the stored row is still
    /// suspended. Fails with `RunBusy` when another resume got there first.
    async fn mark_claimed(&self, record: &RunRecord) -> Result<()> {
        let status_json = serde_json::to_string(&record.status).map_err(storage_err)?;
        let claimed = self
            .conn
            .execute(
                "UPDATE runs
                 SET status = 'running', status_json = ?1, updated_at = ?2
                 WHERE id = ?3 AND status = 'suspended'",
                params![
                    status_json,
                    record.updated_at.to_rfc3339(),
                    record.run_id.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;

        if claimed == 0 {
            return Err(BlogWriterError::RunBusy {
                run_id: record.run_id.clone(),
            });
        }
        Ok(())
    }

    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    BlogWriterError::Storage(format!(
                        "migration v{} failed: {e}",
                        migration.version
                    ))
                })?;
            }
        }
        Ok(())
    }

    /// Current schema version, or 0 if no migrations have been applied.
    async fn schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => match rows.next().await {
                Ok(Some(row)) => row.get::<u32>(0).unwrap_or(0),
                _ => 0,
            },
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    fn row_to_record(row: &libsql::Row) -> Result<RunRecord> {
        let id = row.get::<String>(0).map_err(storage_err)?;
        let status_json = row.get::<String>(1).map_err(storage_err)?;
        let state_json = row.get::<String>(2).map_err(storage_err)?;
        let created_at = row.get::<String>(3).map_err(storage_err)?;
        let updated_at = row.get::<String>(4).map_err(storage_err)?;

        let run_id = RunId::new(id).ok_or_else(|| storage_err("empty run id in database"))?;
        let status: RunStatus = serde_json::from_str(&status_json)
            .map_err(|e| BlogWriterError::Storage(format!("corrupt status for {run_id}: {e}")))?;
        let state: PipelineState = serde_json::from_str(&state_json)
            .map_err(|e| BlogWriterError::Storage(format!("corrupt state for {run_id}: {e}")))?;

        Ok(RunRecord {
            run_id,
            status,
            state,
            created_at: parse_timestamp(&created_at)?,
            updated_at: parse_timestamp(&updated_at)?,
        })
    }

    fn encode(record: &RunRecord) -> Result<(String, String)> {
        let status_json = serde_json::to_string(&record.status).map_err(storage_err)?;
        let state_json = serde_json::to_string(&record.state).map_err(storage_err)?;
        Ok((status_json, state_json))
    }
}

const SELECT_COLUMNS: &str = "SELECT id, status_json, state_json, created_at, updated_at FROM runs";

#[async_trait]
impl RunStore for SqliteRunStore {
    #[instrument(skip_all, fields(run_id = %record.run_id))]
    async fn create(&self, record: &RunRecord) -> Result<()> {
        let (status_json, state_json) = Self::encode(record)?;
        let inserted = self
            .conn
            .execute(
                "INSERT OR IGNORE INTO runs
                     (id, status, status_json, state_json, url, created_at, updated_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    record.run_id.as_str(),
                    record.status.label(),
                    status_json,
                    state_json,
                    record.state.url.as_str(),
                    record.created_at.to_rfc3339(),
                    record.updated_at.to_rfc3339()
                ],
            )
            .await
            .map_err(storage_err)?;

        if inserted == 0 {
            return Err(BlogWriterError::RunExists {
                run_id: record.run_id.clone(),
            });
        }
        tracing::debug!("run record created");
        Ok(())
    }

    #[instrument(skip_all, fields(run_id = %record.run_id, status = record.status.label()))]
    async fn save(&self, record: &RunRecord) -> Result<()> {
        let (status_json, state_json) = Self::encode(record)?;
        let updated = self
            .conn
            .execute(
                "UPDATE runs
                 SET status = ?1, status_json = ?2, state_json = ?3, updated_at = ?4
                 WHERE id = ?5",
                params![
                    record.status.label(),
                    status_json,
                    state_json,
                    record.updated_at.to_rfc3339(),
                    record.run_id.as_str()
                ],
            )
            .await
            .map_err(storage_err)?;

        if updated == 0 {
            return Err(BlogWriterError::RunNotFound {
                run_id: record.run_id.clone(),
            });
        }
        Ok(())
    }

    async fn load(&self, run_id: &RunId) -> Result<RunRecord> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} WHERE id = ?1"), params![run_id.as_str()])
            .await
            .map_err(storage_err)?;

        match rows.next().await.map_err(storage_err)? {
            Some(row) => Self::row_to_record(&row),
            None => Err(BlogWriterError::RunNotFound {
                run_id: run_id.clone(),
            }),
        }
    }

    #[instrument(skip_all, fields(run_id = %run_id))]
    async fn claim_suspended(&self, run_id: &RunId) -> Result<RunRecord> {
        let mut record = self.load(run_id).await?;
        let step = claimable_step(&record)?;
        record.transition(RunStatus::Running { step });

        self.mark_claimed(&record).await?;
        tracing::debug!(%step, "claimed suspended run");
        Ok(record)
    }

    async fn list(&self) -> Result<Vec<RunRecord>> {
        let mut rows = self
            .conn
            .query(&format!("{SELECT_COLUMNS} ORDER BY updated_at DESC"), params![])
            .await
            .map_err(storage_err)?;

        let mut results = Vec::new();
        while let Some(row) = rows.next().await.map_err(storage_err)? {
            results.push(Self::row_to_record(&row)?);
        }
        Ok(results)
    }
}
