//! Persistence layer for the segment-chaining orchestrator: one struct
//! wraps one `sqlx::SqlitePool` connection pool, and every operation is
//! a plain async method.

pub mod config;
pub mod error;
mod schema;

pub use config::StoreConfig;
pub use error::{StoreError, StoreResult};

use chrono::{DateTime, SecondsFormat, Utc};
use rand::Rng;
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteRow};
use sqlx::{Row, SqlitePool};
use wanflow_models::lora::{parse_lora_column, serialize_lora_column};
use wanflow_models::{
    ActivityLogEntry, Job, JobStatus, LogLevel, LoraSlot, NewJob, ParameterBag, Segment,
    SegmentStatus, UploadRecord, WorkflowKind,
};

#[derive(Debug, Clone)]
pub struct Store {
    pool: SqlitePool,
}

enum Direction {
    Up,
    Down,
}

impl Store {
    pub async fn connect(config: &StoreConfig) -> StoreResult<Self> {
        let options = SqliteConnectOptions::new()
            .filename(&config.database_path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal);
        let pool = SqlitePoolOptions::new().connect_with(options).await?;
        schema::run_migrations(&pool).await?;
        Ok(Self { pool })
    }

    // ---- Jobs -----------------------------------------------------

    pub async fn create_job(&self, new_job: NewJob) -> StoreResult<Job> {
        let mut tx = self.pool.begin().await?;
        let seed = new_job.seed.unwrap_or_else(random_seed);
        let now = to_iso(Utc::now());
        let parameters_json = serde_json::to_string(&new_job.parameters)
            .map_err(|e| StoreError::Malformed(e.to_string()))?;

        let result = sqlx::query(
            r#"
            INSERT INTO jobs (
                name, status, prompt, negative_prompt, workflow_type, parameters,
                input_image, priority, seed, created_at
            ) VALUES (
                ?, 'pending', ?, ?, ?, ?, ?,
                (SELECT COALESCE(MAX(priority), 0) + 1 FROM jobs), ?, ?
            )
            "#,
        )
        .bind(&new_job.name)
        .bind(&new_job.prompt)
        .bind(&new_job.negative_prompt)
        .bind(new_job.workflow_kind.as_str())
        .bind(&parameters_json)
        .bind(&new_job.input_image)
        .bind(seed as i64)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let id = result.last_insert_rowid();
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_one(&mut *tx)
            .await?;
        let job = row_to_job(&row)?;
        tx.commit().await?;
        Ok(job)
    }

    pub async fn get_job(&self, id: i64) -> StoreResult<Option<Job>> {
        let row = sqlx::query("SELECT * FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_job).transpose()
    }

    pub async fn get_pending_jobs(&self) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query(
            "SELECT * FROM jobs WHERE status = 'pending' ORDER BY priority ASC, created_at ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_job).collect()
    }

    pub async fn get_running_jobs(&self) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE status = 'running' ORDER BY priority ASC")
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_job).collect()
    }

    /// Used by the Startup Reconciler's failed-job/running-segment
    /// synchronization pass.
    pub async fn get_jobs_by_status(&self, status: JobStatus) -> StoreResult<Vec<Job>> {
        let rows = sqlx::query("SELECT * FROM jobs WHERE status = ? ORDER BY priority ASC")
            .bind(status.as_str())
            .fetch_all(&self.pool)
            .await?;
        rows.iter().map(row_to_job).collect()
    }

    pub async fn move_job_up(&self, id: i64) -> StoreResult<bool> {
        self.swap_priority(id, Direction::Up).await
    }

    pub async fn move_job_down(&self, id: i64) -> StoreResult<bool> {
        self.swap_priority(id, Direction::Down).await
    }

    async fn swap_priority(&self, id: i64, direction: Direction) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let pending: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT id, priority FROM jobs WHERE status = 'pending' ORDER BY priority ASC, created_at ASC",
        )
        .fetch_all(&mut *tx)
        .await?;

        let Some(pos) = pending.iter().position(|(job_id, _)| *job_id == id) else {
            return Ok(false);
        };
        let neighbor_pos = match direction {
            Direction::Up if pos > 0 => pos - 1,
            Direction::Down if pos + 1 < pending.len() => pos + 1,
            _ => return Ok(false),
        };

        let (this_id, this_priority) = pending[pos];
        let (neighbor_id, neighbor_priority) = pending[neighbor_pos];

        sqlx::query("UPDATE jobs SET priority = ? WHERE id = ?")
            .bind(neighbor_priority)
            .bind(this_id)
            .execute(&mut *tx)
            .await?;
        sqlx::query("UPDATE jobs SET priority = ? WHERE id = ?")
            .bind(this_priority)
            .bind(neighbor_id)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(true)
    }

    pub async fn move_job_to_bottom(&self, id: i64) -> StoreResult<bool> {
        let mut tx = self.pool.begin().await?;
        let status: Option<String> = sqlx::query_scalar("SELECT status FROM jobs WHERE id = ?")
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;
        let Some(status) = status else {
            return Ok(false);
        };
        if status != "pending" {
            return Ok(false);
        }
        sqlx::query(
            "UPDATE jobs SET priority = (SELECT COALESCE(MAX(priority), 0) + 1 FROM jobs) WHERE id = ?",
        )
        .bind(id)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(true)
    }

    pub async fn update_job_status(
        &self,
        id: i64,
        status: JobStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let now = to_iso(Utc::now());
        let set_started = status == JobStatus::Running;
        let set_completed = status.is_terminal();
        // A job leaving a terminal status (e.g. `failed -> pending` on
        // retry, `completed -> awaiting_prompt` on reopen) must not carry a
        // stale `completed_at` from its previous run forward.
        let clear_completed = !set_completed;
        let (touch_error, error_value) = match error {
            Some("") => (true, None),
            Some(e) => (true, Some(e.to_string())),
            None => (false, None),
        };

        let result = sqlx::query(
            r#"
            UPDATE jobs SET
                status = ?,
                started_at = CASE WHEN ? = 1 AND started_at IS NULL THEN ? ELSE started_at END,
                completed_at = CASE WHEN ? = 1 THEN ? WHEN ? = 1 THEN NULL ELSE completed_at END,
                error_message = CASE WHEN ? = 1 THEN ? ELSE error_message END
            WHERE id = ?
            "#,
        )
        .bind(status.as_str())
        .bind(set_started as i64)
        .bind(&now)
        .bind(set_completed as i64)
        .bind(&now)
        .bind(clear_completed as i64)
        .bind(touch_error as i64)
        .bind(&error_value)
        .bind(id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(id));
        }
        Ok(())
    }

    pub async fn update_job_parameters(&self, id: i64, parameters: &ParameterBag) -> StoreResult<bool> {
        let parameters_json =
            serde_json::to_string(parameters).map_err(|e| StoreError::Malformed(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE jobs SET parameters = ? WHERE id = ? AND status IN ('pending', 'awaiting_prompt')",
        )
        .bind(&parameters_json)
        .bind(id)
        .execute(&self.pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Atomically sets the job to `completed` with its stitched output
    /// media, mirroring `update_segment_completion`'s single-write idiom.
    pub async fn finalize_job(&self, id: i64, output_media: &[String]) -> StoreResult<()> {
        let now = to_iso(Utc::now());
        let output_json =
            serde_json::to_string(output_media).map_err(|e| StoreError::Malformed(e.to_string()))?;
        let result = sqlx::query(
            "UPDATE jobs SET status = 'completed', completed_at = ?, output_images = ?, error_message = NULL WHERE id = ?",
        )
        .bind(&now)
        .bind(&output_json)
        .bind(id)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::JobNotFound(id));
        }
        Ok(())
    }

    /// Retry support: resets every non-completed segment of `job_id` back
    /// to `pending`, clearing errors, so a retried job resumes mid-chain.
    pub async fn reset_segments_for_retry(&self, job_id: i64) -> StoreResult<()> {
        sqlx::query(
            "UPDATE job_segments SET status = 'pending', error_message = NULL, completed_at = NULL \
             WHERE job_id = ? AND status != 'completed'",
        )
        .bind(job_id)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// `true` when the job has at least one segment and all of them are
    /// `completed`, used by the Reconciler's post-recovery sweep.
    pub async fn all_segments_completed(&self, job_id: i64) -> StoreResult<bool> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM job_segments WHERE job_id = ?")
            .bind(job_id)
            .fetch_one(&self.pool)
            .await?;
        if total == 0 {
            return Ok(false);
        }
        let not_completed: i64 = sqlx::query_scalar(
            "SELECT COUNT(*) FROM job_segments WHERE job_id = ? AND status != 'completed'",
        )
        .bind(job_id)
        .fetch_one(&self.pool)
        .await?;
        Ok(not_completed == 0)
    }

    // ---- Segments ---------------------------------------------------

    pub async fn create_first_segment(&self, job_id: i64, prompt: Option<String>) -> StoreResult<Segment> {
        let mut tx = self.pool.begin().await?;
        let input_image: Option<String> =
            sqlx::query_scalar("SELECT input_image FROM jobs WHERE id = ?")
                .bind(job_id)
                .fetch_optional(&mut *tx)
                .await?
                .ok_or(StoreError::JobNotFound(job_id))?;
        let now = to_iso(Utc::now());
        sqlx::query(
            r#"
            INSERT INTO job_segments (job_id, segment_index, status, prompt, start_image_url, created_at)
            VALUES (?, 0, 'pending', ?, ?, ?)
            "#,
        )
        .bind(job_id)
        .bind(&prompt)
        .bind(&input_image)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT * FROM job_segments WHERE job_id = ? AND segment_index = 0")
            .bind(job_id)
            .fetch_one(&mut *tx)
            .await?;
        let segment = row_to_segment(&row)?;
        tx.commit().await?;
        Ok(segment)
    }

    pub async fn create_next_segment(
        &self,
        job_id: i64,
        prompt: Option<String>,
        high_lora: LoraSlot,
        low_lora: LoraSlot,
    ) -> StoreResult<Segment> {
        let mut tx = self.pool.begin().await?;
        let max_index: Option<i32> =
            sqlx::query_scalar("SELECT MAX(segment_index) FROM job_segments WHERE job_id = ?")
                .bind(job_id)
                .fetch_one(&mut *tx)
                .await?;
        let index = max_index.map(|i| i + 1).unwrap_or(0);
        let now = to_iso(Utc::now());
        let high_json = serialize_lora_column(&high_lora);
        let low_json = serialize_lora_column(&low_lora);

        sqlx::query(
            r#"
            INSERT INTO job_segments (job_id, segment_index, status, prompt, high_lora, low_lora, created_at)
            VALUES (?, ?, 'pending', ?, ?, ?, ?)
            "#,
        )
        .bind(job_id)
        .bind(index)
        .bind(&prompt)
        .bind(&high_json)
        .bind(&low_json)
        .bind(&now)
        .execute(&mut *tx)
        .await?;

        let row = sqlx::query("SELECT * FROM job_segments WHERE job_id = ? AND segment_index = ?")
            .bind(job_id)
            .bind(index)
            .fetch_one(&mut *tx)
            .await?;
        let segment = row_to_segment(&row)?;
        tx.commit().await?;
        Ok(segment)
    }

    pub async fn get_segment(&self, job_id: i64, index: i32) -> StoreResult<Option<Segment>> {
        let row = sqlx::query("SELECT * FROM job_segments WHERE job_id = ? AND segment_index = ?")
            .bind(job_id)
            .bind(index)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_segment).transpose()
    }

    pub async fn list_segments(&self, job_id: i64) -> StoreResult<Vec<Segment>> {
        let rows = sqlx::query(
            "SELECT * FROM job_segments WHERE job_id = ? ORDER BY segment_index ASC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_segment).collect()
    }

    pub async fn get_next_pending_segment(&self, job_id: i64) -> StoreResult<Option<Segment>> {
        let row = sqlx::query(
            "SELECT * FROM job_segments WHERE job_id = ? AND status = 'pending' ORDER BY segment_index ASC LIMIT 1",
        )
        .bind(job_id)
        .fetch_optional(&self.pool)
        .await?;
        row.as_ref().map(row_to_segment).transpose()
    }

    pub async fn get_running_segments(&self) -> StoreResult<Vec<Segment>> {
        let rows = sqlx::query(
            "SELECT * FROM job_segments WHERE status = 'running' ORDER BY job_id ASC, segment_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_segment).collect()
    }

    pub async fn get_needs_recovery_segments(&self) -> StoreResult<Vec<Segment>> {
        let rows = sqlx::query(
            "SELECT * FROM job_segments WHERE status = 'needs_recovery' ORDER BY job_id ASC, segment_index ASC",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_segment).collect()
    }

    pub async fn update_segment_status(
        &self,
        job_id: i64,
        index: i32,
        status: SegmentStatus,
        error: Option<&str>,
    ) -> StoreResult<()> {
        let now = to_iso(Utc::now());
        let set_completed = matches!(status, SegmentStatus::Completed | SegmentStatus::Failed);
        let (touch_error, error_value) = match error {
            Some("") => (true, None),
            Some(e) => (true, Some(e.to_string())),
            None => (false, None),
        };
        let result = sqlx::query(
            r#"
            UPDATE job_segments SET
                status = ?,
                completed_at = CASE WHEN ? = 1 THEN ? ELSE completed_at END,
                error_message = CASE WHEN ? = 1 THEN ? ELSE error_message END
            WHERE job_id = ? AND segment_index = ?
            "#,
        )
        .bind(status.as_str())
        .bind(set_completed as i64)
        .bind(&now)
        .bind(touch_error as i64)
        .bind(&error_value)
        .bind(job_id)
        .bind(index)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SegmentNotFound { job_id, index });
        }
        Ok(())
    }

    /// Persists the Renderer's opaque prompt handle once a segment has been
    /// submitted, so a restart can find it again via the Reconciler (§4.6).
    pub async fn update_segment_prompt_handle(
        &self,
        job_id: i64,
        index: i32,
        handle: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE job_segments SET comfyui_prompt_id = ? WHERE job_id = ? AND segment_index = ?",
        )
        .bind(handle)
        .bind(job_id)
        .bind(index)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SegmentNotFound { job_id, index });
        }
        Ok(())
    }

    pub async fn update_segment_prompt(&self, job_id: i64, index: i32, prompt: &str) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE job_segments SET prompt = ? WHERE job_id = ? AND segment_index = ?",
        )
        .bind(prompt)
        .bind(job_id)
        .bind(index)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SegmentNotFound { job_id, index });
        }
        Ok(())
    }

    pub async fn update_segment_start_image(
        &self,
        job_id: i64,
        index: i32,
        start_image: &str,
    ) -> StoreResult<()> {
        let result = sqlx::query(
            "UPDATE job_segments SET start_image_url = ? WHERE job_id = ? AND segment_index = ?",
        )
        .bind(start_image)
        .bind(job_id)
        .bind(index)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SegmentNotFound { job_id, index });
        }
        Ok(())
    }

    pub async fn update_segment_completion(
        &self,
        job_id: i64,
        index: i32,
        video_path: &str,
        end_frame: &str,
        execution_time: Option<f64>,
    ) -> StoreResult<()> {
        let now = to_iso(Utc::now());
        let result = sqlx::query(
            r#"
            UPDATE job_segments SET
                status = 'completed',
                video_path = ?,
                end_frame_url = ?,
                execution_time = ?,
                completed_at = ?,
                error_message = NULL
            WHERE job_id = ? AND segment_index = ?
            "#,
        )
        .bind(video_path)
        .bind(end_frame)
        .bind(execution_time)
        .bind(&now)
        .bind(job_id)
        .bind(index)
        .execute(&self.pool)
        .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SegmentNotFound { job_id, index });
        }
        Ok(())
    }

    pub async fn delete_segment(&self, job_id: i64, index: i32) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM job_segments WHERE job_id = ? AND segment_index = ?")
            .bind(job_id)
            .bind(index)
            .execute(&self.pool)
            .await?;
        if result.rows_affected() == 0 {
            return Err(StoreError::SegmentNotFound { job_id, index });
        }
        Ok(())
    }

    // ---- Uploads ------------------------------------------------------

    pub async fn get_image_by_hash(&self, hash: &str) -> StoreResult<Option<UploadRecord>> {
        let row = sqlx::query("SELECT * FROM uploaded_images WHERE content_hash = ?")
            .bind(hash)
            .fetch_optional(&self.pool)
            .await?;
        row.as_ref().map(row_to_upload).transpose()
    }

    /// `INSERT OR IGNORE` against the `UNIQUE(content_hash)` constraint: a
    /// conflict means another upload already deduplicated this content, not
    /// an error.
    pub async fn store_uploaded_image(&self, record: &UploadRecord) -> StoreResult<()> {
        let now = to_iso(record.uploaded_at);
        sqlx::query(
            "INSERT OR IGNORE INTO uploaded_images (content_hash, comfyui_filename, original_filename, uploaded_at) VALUES (?, ?, ?, ?)",
        )
        .bind(&record.content_hash)
        .bind(&record.renderer_filename)
        .bind(&record.original_filename)
        .bind(&now)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    // ---- Activity log ---------------------------------------------------

    pub async fn append_log(&self, entry: &ActivityLogEntry) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO job_logs (job_id, segment_index, timestamp, level, message, details) VALUES (?, ?, ?, ?, ?, ?)",
        )
        .bind(entry.job_id)
        .bind(entry.segment_index)
        .bind(to_iso(entry.timestamp))
        .bind(entry.level.as_str())
        .bind(&entry.message)
        .bind(&entry.detail)
        .execute(&self.pool)
        .await?;
        Ok(())
    }

    /// Append-only, newest first; cascade-deleted with the job.
    pub async fn get_job_logs(&self, job_id: i64) -> StoreResult<Vec<ActivityLogEntry>> {
        let rows = sqlx::query(
            "SELECT * FROM job_logs WHERE job_id = ? ORDER BY id DESC",
        )
        .bind(job_id)
        .fetch_all(&self.pool)
        .await?;
        rows.iter().map(row_to_log_entry).collect()
    }

    // ---- Settings -----------------------------------------------------

    pub async fn get_setting(&self, key: &str) -> StoreResult<Option<String>> {
        let value: Option<String> = sqlx::query_scalar("SELECT value FROM settings WHERE key = ?")
            .bind(key)
            .fetch_optional(&self.pool)
            .await?;
        Ok(value)
    }

    pub async fn set_setting(&self, key: &str, value: &str) -> StoreResult<()> {
        sqlx::query(
            "INSERT INTO settings (key, value) VALUES (?, ?) ON CONFLICT(key) DO UPDATE SET value = excluded.value",
        )
        .bind(key)
        .bind(value)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

fn random_seed() -> u64 {
    rand::thread_rng().gen_range(0..=i64::MAX as u64)
}

fn to_iso(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

fn from_iso(raw: &str) -> StoreResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| StoreError::Malformed(format!("timestamp {raw}: {e}")))
}

fn optional_iso(raw: Option<String>) -> StoreResult<Option<DateTime<Utc>>> {
    raw.as_deref().map(from_iso).transpose()
}

fn row_to_job(row: &SqliteRow) -> StoreResult<Job> {
    let status_raw: String = row.try_get("status")?;
    let status = JobStatus::from_str_loose(&status_raw)
        .ok_or_else(|| StoreError::Malformed(format!("unknown job status '{status_raw}'")))?;
    let workflow_raw: String = row.try_get("workflow_type")?;
    let workflow_kind = WorkflowKind::from_str_loose(&workflow_raw).unwrap_or(WorkflowKind::ImageToVideo);

    let parameters_raw: Option<String> = row.try_get("parameters")?;
    let parameters = match parameters_raw {
        Some(s) if !s.is_empty() => {
            serde_json::from_str(&s).map_err(|e| StoreError::Malformed(format!("parameters: {e}")))?
        }
        _ => ParameterBag::default(),
    };

    let output_raw: Option<String> = row.try_get("output_images")?;
    let output_media = match output_raw {
        Some(s) if !s.is_empty() => {
            serde_json::from_str(&s).map_err(|e| StoreError::Malformed(format!("output_images: {e}")))?
        }
        _ => Vec::new(),
    };

    let created_at = from_iso(&row.try_get::<String, _>("created_at")?)?;
    let started_at = optional_iso(row.try_get("started_at")?)?;
    let completed_at = optional_iso(row.try_get("completed_at")?)?;
    let seed_raw: i64 = row.try_get("seed")?;

    Ok(Job {
        id: row.try_get("id")?,
        name: row.try_get("name")?,
        status,
        prompt: row.try_get("prompt")?,
        negative_prompt: row.try_get("negative_prompt")?,
        workflow_kind,
        parameters,
        input_image: row.try_get("input_image")?,
        output_media,
        comfyui_prompt_id: row.try_get("comfyui_prompt_id")?,
        priority: row.try_get("priority")?,
        seed: seed_raw as u64,
        created_at,
        started_at,
        completed_at,
        error_message: row.try_get("error_message")?,
    })
}

fn row_to_segment(row: &SqliteRow) -> StoreResult<Segment> {
    let status_raw: String = row.try_get("status")?;
    let status = SegmentStatus::from_str_loose(&status_raw)
        .ok_or_else(|| StoreError::Malformed(format!("unknown segment status '{status_raw}'")))?;

    let high_lora = parse_lora_column(row.try_get::<Option<String>, _>("high_lora")?.as_deref());
    let low_lora = parse_lora_column(row.try_get::<Option<String>, _>("low_lora")?.as_deref());

    let created_at = from_iso(&row.try_get::<String, _>("created_at")?)?;
    let completed_at = optional_iso(row.try_get("completed_at")?)?;

    Ok(Segment {
        job_id: row.try_get("job_id")?,
        index: row.try_get("segment_index")?,
        status,
        prompt: row.try_get("prompt")?,
        start_image: row.try_get("start_image_url")?,
        end_frame: row.try_get("end_frame_url")?,
        video_path: row.try_get("video_path")?,
        comfyui_prompt_id: row.try_get("comfyui_prompt_id")?,
        execution_time_seconds: row.try_get("execution_time")?,
        error_message: row.try_get("error_message")?,
        high_lora,
        low_lora,
        created_at,
        completed_at,
    })
}

fn row_to_upload(row: &SqliteRow) -> StoreResult<UploadRecord> {
    Ok(UploadRecord {
        content_hash: row.try_get("content_hash")?,
        renderer_filename: row.try_get("comfyui_filename")?,
        original_filename: row.try_get("original_filename")?,
        uploaded_at: from_iso(&row.try_get::<String, _>("uploaded_at")?)?,
    })
}

fn row_to_log_entry(row: &SqliteRow) -> StoreResult<ActivityLogEntry> {
    let level_raw: String = row.try_get("level")?;
    let level = LogLevel::from_str_loose(&level_raw)
        .ok_or_else(|| StoreError::Malformed(format!("unknown log level '{level_raw}'")))?;

    Ok(ActivityLogEntry {
        job_id: row.try_get("job_id")?,
        segment_index: row.try_get("segment_index")?,
        timestamp: from_iso(&row.try_get::<String, _>("timestamp")?)?,
        level,
        message: row.try_get("message")?,
        detail: row.try_get("details")?,
    })
}
