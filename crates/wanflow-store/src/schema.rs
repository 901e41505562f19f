//! Schema creation and additive migrations. `priority` and `seed` are
//! non-null from the initial `CREATE TABLE` here (there is no legacy
//! database to migrate into), while the idiom of tolerant `ALTER TABLE
//! ... ADD COLUMN` migration is kept for genuinely optional future
//! columns.

use sqlx::SqlitePool;

const CREATE_JOBS: &str = r#"
CREATE TABLE IF NOT EXISTS jobs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    prompt TEXT,
    negative_prompt TEXT,
    workflow_type TEXT NOT NULL DEFAULT 'image_to_video',
    parameters TEXT,
    input_image TEXT,
    output_images TEXT,
    comfyui_prompt_id TEXT,
    error_message TEXT,
    priority INTEGER NOT NULL DEFAULT 0,
    seed INTEGER NOT NULL,
    created_at TEXT NOT NULL,
    started_at TEXT,
    completed_at TEXT
)
"#;

const CREATE_JOB_SEGMENTS: &str = r#"
CREATE TABLE IF NOT EXISTS job_segments (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    segment_index INTEGER NOT NULL,
    status TEXT NOT NULL DEFAULT 'pending',
    prompt TEXT,
    start_image_url TEXT,
    end_frame_url TEXT,
    video_path TEXT,
    comfyui_prompt_id TEXT,
    execution_time REAL,
    error_message TEXT,
    high_lora TEXT,
    low_lora TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    UNIQUE(job_id, segment_index)
)
"#;

const CREATE_SETTINGS: &str = r#"
CREATE TABLE IF NOT EXISTS settings (key TEXT PRIMARY KEY, value TEXT NOT NULL)
"#;

const CREATE_LORA_LIBRARY: &str = r#"
CREATE TABLE IF NOT EXISTS lora_library (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    base_name TEXT UNIQUE NOT NULL,
    high_file TEXT, low_file TEXT, friendly_name TEXT, url TEXT,
    prompt_text TEXT, trigger_keywords TEXT, rating INTEGER,
    preview_image_url TEXT, notes TEXT,
    default_high_weight REAL NOT NULL DEFAULT 1.0,
    default_low_weight REAL NOT NULL DEFAULT 1.0,
    created_at TEXT, updated_at TEXT
)
"#;

const CREATE_IMAGE_RATINGS: &str = r#"
CREATE TABLE IF NOT EXISTS image_ratings (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    image_path TEXT UNIQUE NOT NULL,
    rating INTEGER,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
)
"#;

const CREATE_HIDDEN_LORAS: &str = r#"
CREATE TABLE IF NOT EXISTS hidden_loras (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    filename TEXT UNIQUE NOT NULL,
    hidden_at TEXT NOT NULL
)
"#;

const CREATE_UPLOADED_IMAGES: &str = r#"
CREATE TABLE IF NOT EXISTS uploaded_images (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    content_hash TEXT UNIQUE NOT NULL,
    comfyui_filename TEXT NOT NULL,
    original_filename TEXT,
    uploaded_at TEXT NOT NULL
)
"#;

const CREATE_JOB_LOGS: &str = r#"
CREATE TABLE IF NOT EXISTS job_logs (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    job_id INTEGER NOT NULL REFERENCES jobs(id) ON DELETE CASCADE,
    segment_index INTEGER,
    timestamp TEXT NOT NULL,
    level TEXT NOT NULL,
    message TEXT NOT NULL,
    details TEXT
)
"#;

const CREATE_JOB_LOGS_INDEX: &str =
    "CREATE INDEX IF NOT EXISTS idx_job_logs_job_id ON job_logs(job_id)";

/// Default settings seeded on first boot, covering both the renderer
/// connection and the orchestrator's runtime-tunable timeouts.
const DEFAULT_SETTINGS: &[(&str, &str)] = &[
    ("comfyui_url", "http://localhost:8188"),
    ("default_checkpoint", "v1-5-pruned.safetensors"),
    ("default_steps", "20"),
    ("default_cfg", "7.0"),
    ("default_sampler", "euler"),
    ("default_scheduler", "normal"),
    ("default_width", "640"),
    ("default_height", "640"),
    ("default_high_noise_model", "wan2.2_i2v_high_noise_14B_fp16.safetensors"),
    ("default_low_noise_model", "wan2.2_i2v_low_noise_14B_fp16.safetensors"),
    ("auto_start_queue", "true"),
    ("image_repo_path", ""),
    ("queue_idle_wait_secs", "1800"),
    ("segment_execution_timeout_secs", "1200"),
    ("reconnect_budget_secs", "600"),
    ("driver_poll_interval_secs", "2"),
    ("status_poll_interval_secs", "1"),
];

pub async fn run_migrations(pool: &SqlitePool) -> sqlx::Result<()> {
    for stmt in [
        CREATE_JOBS,
        CREATE_JOB_SEGMENTS,
        CREATE_SETTINGS,
        CREATE_LORA_LIBRARY,
        CREATE_IMAGE_RATINGS,
        CREATE_HIDDEN_LORAS,
        CREATE_UPLOADED_IMAGES,
        CREATE_JOB_LOGS,
        CREATE_JOB_LOGS_INDEX,
    ] {
        sqlx::query(stmt).execute(pool).await?;
    }

    // Additive, tolerant migrations for future optional columns. None are
    // needed yet since the tables above already carry every column this
    // implementation starts with; the loop is kept so a future column can
    // be added here without touching `CREATE TABLE`. Failures are
    // ignored: sqlite has no `ADD COLUMN IF NOT EXISTS`.
    for stmt in ADDITIVE_MIGRATIONS {
        if let Err(e) = sqlx::query(stmt).execute(pool).await {
            if !is_duplicate_column_error(&e) {
                return Err(e);
            }
        }
    }

    for (key, value) in DEFAULT_SETTINGS {
        sqlx::query("INSERT OR IGNORE INTO settings (key, value) VALUES (?, ?)")
            .bind(key)
            .bind(value)
            .execute(pool)
            .await?;
    }

    Ok(())
}

const ADDITIVE_MIGRATIONS: &[&str] = &[];

fn is_duplicate_column_error(err: &sqlx::Error) -> bool {
    err.as_database_error()
        .map(|e| e.message().contains("duplicate column name"))
        .unwrap_or(false)
}
