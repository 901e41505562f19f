//! Integration tests against a real, file-backed sqlite database.

use chrono::Utc;
use wanflow_models::{
    ActivityLogEntry, JobStatus, LogLevel, LoraSlot, NewJob, ParameterBag, SegmentStatus,
    UploadRecord, WorkflowKind,
};
use wanflow_store::{Store, StoreConfig};

async fn test_store() -> (Store, tempfile::TempDir) {
    let dir = tempfile::tempdir().expect("tempdir");
    let config = StoreConfig {
        database_path: dir.path().join("queue.db"),
    };
    let store = Store::connect(&config).await.expect("connect");
    (store, dir)
}

fn sample_job() -> NewJob {
    NewJob {
        name: "demo job".into(),
        prompt: "a cat runs through a field".into(),
        negative_prompt: None,
        workflow_kind: WorkflowKind::ImageToVideo,
        parameters: ParameterBag::default(),
        input_image: Some("input.jpg".into()),
        seed: None,
    }
}

#[tokio::test]
async fn create_job_assigns_incrementing_priority() {
    let (store, _dir) = test_store().await;
    let first = store.create_job(sample_job()).await.unwrap();
    let second = store.create_job(sample_job()).await.unwrap();
    assert_eq!(first.priority + 1, second.priority);
    assert_eq!(first.status, JobStatus::Pending);
}

#[tokio::test]
async fn move_job_up_swaps_with_neighbor() {
    let (store, _dir) = test_store().await;
    let a = store.create_job(sample_job()).await.unwrap();
    let b = store.create_job(sample_job()).await.unwrap();

    let moved = store.move_job_up(b.id).await.unwrap();
    assert!(moved);

    let pending = store.get_pending_jobs().await.unwrap();
    assert_eq!(pending[0].id, b.id);
    assert_eq!(pending[1].id, a.id);

    // already at the top: no-op, not an error
    assert!(!store.move_job_up(b.id).await.unwrap());
}

#[tokio::test]
async fn move_job_to_bottom_only_affects_pending() {
    let (store, _dir) = test_store().await;
    let job = store.create_job(sample_job()).await.unwrap();
    store
        .update_job_status(job.id, JobStatus::Running, None)
        .await
        .unwrap();
    assert!(!store.move_job_to_bottom(job.id).await.unwrap());
}

#[tokio::test]
async fn update_job_status_sets_started_at_once() {
    let (store, _dir) = test_store().await;
    let job = store.create_job(sample_job()).await.unwrap();

    store
        .update_job_status(job.id, JobStatus::Running, None)
        .await
        .unwrap();
    let running = store.get_job(job.id).await.unwrap().unwrap();
    let started = running.started_at.expect("started_at set");

    store
        .update_job_status(job.id, JobStatus::AwaitingPrompt, None)
        .await
        .unwrap();
    store
        .update_job_status(job.id, JobStatus::Running, None)
        .await
        .unwrap();
    let resumed = store.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(resumed.started_at, Some(started));
}

#[tokio::test]
async fn update_job_parameters_rejects_terminal_jobs() {
    let (store, _dir) = test_store().await;
    let job = store.create_job(sample_job()).await.unwrap();
    store
        .update_job_status(job.id, JobStatus::Failed, Some("boom"))
        .await
        .unwrap();

    let mut params = ParameterBag::default();
    params.width = 1024;
    let applied = store.update_job_parameters(job.id, &params).await.unwrap();
    assert!(!applied);
}

#[tokio::test]
async fn update_job_status_clears_stale_completed_at_on_retry() {
    let (store, _dir) = test_store().await;
    let job = store.create_job(sample_job()).await.unwrap();
    store
        .update_job_status(job.id, JobStatus::Failed, Some("boom"))
        .await
        .unwrap();
    let failed = store.get_job(job.id).await.unwrap().unwrap();
    assert!(failed.completed_at.is_some());

    store
        .update_job_status(job.id, JobStatus::Pending, Some(""))
        .await
        .unwrap();
    let retried = store.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(retried.status, JobStatus::Pending);
    assert!(retried.completed_at.is_none());
}

#[tokio::test]
async fn segment_chain_lifecycle() {
    let (store, _dir) = test_store().await;
    let job = store.create_job(sample_job()).await.unwrap();

    let first = store
        .create_first_segment(job.id, Some("a cat runs".into()))
        .await
        .unwrap();
    assert_eq!(first.index, 0);
    assert_eq!(first.start_image.as_deref(), Some("input.jpg"));

    let second = store
        .create_next_segment(job.id, None, LoraSlot::empty(), LoraSlot::empty())
        .await
        .unwrap();
    assert_eq!(second.index, 1);
    assert!(second.start_image.is_none());

    store
        .update_segment_completion(job.id, 0, "segment_0.mp4", "frame_0.jpg", Some(12.5))
        .await
        .unwrap();
    store
        .update_segment_start_image(job.id, 1, "frame_0.jpg")
        .await
        .unwrap();

    let segments = store.list_segments(job.id).await.unwrap();
    assert_eq!(segments[0].status, SegmentStatus::Completed);
    assert_eq!(segments[1].start_image.as_deref(), Some("frame_0.jpg"));
}

#[tokio::test]
async fn retry_preserves_completed_segments() {
    let (store, _dir) = test_store().await;
    let job = store.create_job(sample_job()).await.unwrap();
    store
        .create_first_segment(job.id, Some("prompt 0".into()))
        .await
        .unwrap();
    store
        .create_next_segment(job.id, Some("prompt 1".into()), LoraSlot::empty(), LoraSlot::empty())
        .await
        .unwrap();

    store
        .update_segment_completion(job.id, 0, "segment_0.mp4", "frame_0.jpg", Some(10.0))
        .await
        .unwrap();
    store
        .update_segment_status(job.id, 1, SegmentStatus::Failed, Some("renderer error"))
        .await
        .unwrap();
    store
        .update_job_status(job.id, JobStatus::Failed, Some("Segment 2 failed: renderer error"))
        .await
        .unwrap();

    store.reset_segments_for_retry(job.id).await.unwrap();
    store.update_job_status(job.id, JobStatus::Pending, Some("")).await.unwrap();
    store.move_job_to_bottom(job.id).await.unwrap();

    let segments = store.list_segments(job.id).await.unwrap();
    assert_eq!(segments[0].status, SegmentStatus::Completed);
    assert_eq!(segments[1].status, SegmentStatus::Pending);
    assert!(segments[1].error_message.is_none());

    let retried = store.get_job(job.id).await.unwrap().unwrap();
    assert_eq!(retried.status, JobStatus::Pending);
    assert!(retried.error_message.is_none());
}

#[tokio::test]
async fn upload_dedup_is_idempotent() {
    let (store, _dir) = test_store().await;
    let record = UploadRecord {
        content_hash: "deadbeef".into(),
        renderer_filename: "clip_1234.png".into(),
        original_filename: Some("start.png".into()),
        uploaded_at: Utc::now(),
    };

    store.store_uploaded_image(&record).await.unwrap();
    // second upload of identical content: ignored, not an error
    let mut duplicate = record.clone();
    duplicate.renderer_filename = "clip_5678.png".into();
    store.store_uploaded_image(&duplicate).await.unwrap();

    let found = store.get_image_by_hash("deadbeef").await.unwrap().unwrap();
    assert_eq!(found.renderer_filename, "clip_1234.png");
}

#[tokio::test]
async fn settings_round_trip_with_seeded_defaults() {
    let (store, _dir) = test_store().await;
    assert_eq!(
        store.get_setting("comfyui_url").await.unwrap().as_deref(),
        Some("http://localhost:8188")
    );

    store.set_setting("comfyui_url", "http://gpu-box:8188").await.unwrap();
    assert_eq!(
        store.get_setting("comfyui_url").await.unwrap().as_deref(),
        Some("http://gpu-box:8188")
    );
}

#[tokio::test]
async fn append_log_is_readable_newest_first() {
    let (store, _dir) = test_store().await;
    let job = store.create_job(sample_job()).await.unwrap();

    store
        .append_log(&ActivityLogEntry {
            job_id: job.id,
            segment_index: Some(0),
            timestamp: Utc::now(),
            level: LogLevel::Error,
            message: "segment 1 failed: renderer timeout".into(),
            detail: Some("HTTP request to http://gpu-box:8188 timed out".into()),
        })
        .await
        .unwrap();
    store
        .append_log(&ActivityLogEntry {
            job_id: job.id,
            segment_index: None,
            timestamp: Utc::now(),
            level: LogLevel::Error,
            message: "job failed: no segments completed".into(),
            detail: None,
        })
        .await
        .unwrap();

    let logs = store.get_job_logs(job.id).await.unwrap();
    assert_eq!(logs.len(), 2);
    assert_eq!(logs[0].message, "job failed: no segments completed");
    assert!(logs[0].detail.is_none());
    assert_eq!(logs[1].segment_index, Some(0));
    assert_eq!(logs[1].level, LogLevel::Error);
    assert!(logs[1].detail.as_deref().unwrap().contains("timed out"));
}

#[tokio::test]
async fn delete_segment_removes_row() {
    let (store, _dir) = test_store().await;
    let job = store.create_job(sample_job()).await.unwrap();
    store.create_first_segment(job.id, None).await.unwrap();
    store.delete_segment(job.id, 0).await.unwrap();
    assert!(store.get_segment(job.id, 0).await.unwrap().is_none());
}
