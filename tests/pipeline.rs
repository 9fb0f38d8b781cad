//! End-to-end conversion pipeline tests against stand-in ffmpeg/ffprobe.
#![cfg(unix)]

mod common;

use std::sync::Arc;
use std::time::Duration;

use axum::body::Bytes;
use futures::stream;
use hls_ingest::job::{JobId, JobOrchestrator, JobState, ProgressStore, StoredUpload};
use hls_ingest::{StorageError, VideoError};

use common::{
    ffmpeg_failing, ffmpeg_succeeding, ffmpeg_waiting, ffprobe_failing, ffprobe_reporting,
    wait_for_progress, Fixture, PROCESS_LOCK,
};

fn orchestrator(fixture: &Fixture) -> (Arc<JobOrchestrator>, ProgressStore) {
    let store = ProgressStore::new();
    let orchestrator = Arc::new(JobOrchestrator::new(fixture.config.clone(), store.clone()));
    (orchestrator, store)
}

async fn upload(orchestrator: &JobOrchestrator, id: &str) -> StoredUpload {
    let job_id = JobId::parse(id).unwrap();
    assert!(orchestrator.begin(&job_id).await);

    let body = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(
        b"not really a video",
    ))]);
    orchestrator
        .store_upload(&job_id, "clip.mp4", body)
        .await
        .unwrap()
}

#[tokio::test]
async fn test_upload_is_stored_under_job_id() {
    let _lock = PROCESS_LOCK.lock().await;
    let fixture = Fixture::new(&ffprobe_reporting("50"), &ffmpeg_succeeding(""));
    let (orchestrator, store) = orchestrator(&fixture);

    let stored = upload(&orchestrator, "job-store").await;

    assert_eq!(stored.size, 18);
    assert_eq!(stored.file_name, "clip.mp4");
    assert_eq!(
        stored.path,
        fixture.config.upload_dir.join("job-store_clip.mp4")
    );
    assert_eq!(std::fs::read(&stored.path).unwrap(), b"not really a video");
    assert_eq!(
        store.snapshot("job-store").await.unwrap().state,
        JobState::Created
    );
}

#[tokio::test]
async fn test_success_forces_progress_to_100() {
    let _lock = PROCESS_LOCK.lock().await;
    // Last marker is 20s of 50s
    let fixture = Fixture::new(
        &ffprobe_reporting("50.000000"),
        &ffmpeg_succeeding(r"out_time_ms=5000000\nprogress=continue\nout_time_ms=20000000\nprogress=end\n"),
    );
    let (orchestrator, store) = orchestrator(&fixture);

    let stored = upload(&orchestrator, "job-ok").await;
    let output = orchestrator.convert(&stored).await.unwrap();

    assert_eq!(store.get_progress("job-ok").await, 100.0);
    assert_eq!(store.snapshot("job-ok").await.unwrap().state, JobState::Done);
    assert_eq!(output.manifest_url, "/hls/job-ok/index.m3u8");
    assert_eq!(output.duration_secs, 50.0);
    assert_eq!(
        output.manifest_path,
        fixture.config.hls_dir.join("job-ok").join("index.m3u8")
    );
    assert!(output.manifest_path.exists());
}

#[tokio::test]
async fn test_progress_is_visible_while_running() {
    let _lock = PROCESS_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let release = dir.path().join("go");
    let fixture = Fixture::new(
        &ffprobe_reporting("50"),
        &ffmpeg_waiting(r"frame=25\nout_time_ms=5000000\nprogress=continue\n", &release),
    );
    let (orchestrator, store) = orchestrator(&fixture);
    let stored = upload(&orchestrator, "job-live").await;

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.convert(&stored).await })
    };

    // 5s of 50s, observed before ffmpeg exits
    wait_for_progress(&store, "job-live", 10.0).await;
    assert_eq!(
        store.snapshot("job-live").await.unwrap().state,
        JobState::Converting
    );

    std::fs::write(&release, b"go").unwrap();
    running.await.unwrap().unwrap();

    assert_eq!(store.get_progress("job-live").await, 100.0);
}

#[tokio::test]
async fn test_zero_duration_falls_back_to_one_second() {
    let _lock = PROCESS_LOCK.lock().await;
    let dir = tempfile::tempdir().unwrap();
    let release = dir.path().join("go");
    let fixture = Fixture::new(
        &ffprobe_reporting("0.000000"),
        &ffmpeg_waiting(r"out_time_ms=250000\n", &release),
    );
    let (orchestrator, store) = orchestrator(&fixture);
    let stored = upload(&orchestrator, "job-zero").await;

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.convert(&stored).await })
    };

    // 0.25s against the 1s fallback
    wait_for_progress(&store, "job-zero", 25.0).await;

    std::fs::write(&release, b"go").unwrap();
    let output = running.await.unwrap().unwrap();
    assert_eq!(output.duration_secs, 1.0);
}

#[tokio::test]
async fn test_transcode_failure_keeps_last_progress() {
    let _lock = PROCESS_LOCK.lock().await;
    let fixture = Fixture::new(
        &ffprobe_reporting("50"),
        &ffmpeg_failing(r"out_time_ms=10000000\nprogress=continue\n"),
    );
    let (orchestrator, store) = orchestrator(&fixture);
    let stored = upload(&orchestrator, "job-bad").await;

    let err = orchestrator.convert(&stored).await.unwrap_err();

    match err {
        VideoError::TranscodeFailed { code, diagnostics } => {
            assert_eq!(code, Some(1));
            assert!(diagnostics.contains("Invalid data found"));
            assert!(!diagnostics.contains("out_time_ms"));
        }
        other => panic!("unexpected error: {:?}", other),
    }
    assert_eq!(store.get_progress("job-bad").await, 20.0);
    assert_eq!(store.snapshot("job-bad").await.unwrap().state, JobState::Failed);
}

#[tokio::test]
async fn test_probe_failure_aborts_before_transcode() {
    let _lock = PROCESS_LOCK.lock().await;
    let fixture = Fixture::new(&ffprobe_failing(), &ffmpeg_succeeding(""));
    let (orchestrator, store) = orchestrator(&fixture);
    let stored = upload(&orchestrator, "job-noprobe").await;

    let err = orchestrator.convert(&stored).await.unwrap_err();

    assert!(matches!(err, VideoError::ProbeFailed(_)));
    assert_eq!(store.get_progress("job-noprobe").await, 0.0);
    assert_eq!(
        store.snapshot("job-noprobe").await.unwrap().state,
        JobState::Failed
    );
    assert!(!fixture.config.hls_dir.join("job-noprobe").exists());
}

#[tokio::test]
async fn test_large_diagnostic_output_is_drained() {
    let _lock = PROCESS_LOCK.lock().await;
    // Several pipe buffers worth of progress blocks
    let ffmpeg = "for last; do :; done\n\
        i=0\n\
        while [ $i -lt 4000 ]; do\n\
          printf 'frame=%d\\nfps=25.0\\nbitrate= 512.0kbits/s\\nout_time_ms=%d000\\nspeed=1.0x\\nprogress=continue\\n' $i $i >&2\n\
          i=$((i + 1))\n\
        done\n\
        printf '#EXTM3U\\n' > \"$last\"\n\
        exit 0";
    let fixture = Fixture::new(&ffprobe_reporting("8"), ffmpeg);
    let (orchestrator, store) = orchestrator(&fixture);
    let stored = upload(&orchestrator, "job-chatty").await;

    tokio::time::timeout(Duration::from_secs(60), orchestrator.convert(&stored))
        .await
        .expect("conversion stalled")
        .unwrap();

    assert_eq!(store.get_progress("job-chatty").await, 100.0);
}

#[tokio::test]
async fn test_concurrent_jobs_are_independent() {
    let _lock = PROCESS_LOCK.lock().await;
    let fixture = Fixture::new(
        &ffprobe_reporting("50"),
        &ffmpeg_succeeding(r"out_time_ms=1000000\n"),
    );
    let (orchestrator, store) = orchestrator(&fixture);

    let a = upload(&orchestrator, "job-a").await;
    let b = upload(&orchestrator, "job-b").await;

    let (ra, rb) = tokio::join!(orchestrator.convert(&a), orchestrator.convert(&b));

    assert_eq!(ra.unwrap().manifest_url, "/hls/job-a/index.m3u8");
    assert_eq!(rb.unwrap().manifest_url, "/hls/job-b/index.m3u8");
    assert_eq!(store.get_progress("job-a").await, 100.0);
    assert_eq!(store.get_progress("job-b").await, 100.0);
    assert_eq!(store.len().await, 2);
}

#[tokio::test]
async fn test_storage_failure_marks_job_failed() {
    let _lock = PROCESS_LOCK.lock().await;
    let fixture = Fixture::new(&ffprobe_reporting("50"), &ffmpeg_succeeding(""));
    let (orchestrator, store) = orchestrator(&fixture);
    let job_id = JobId::parse("job-badname").unwrap();
    assert!(orchestrator.begin(&job_id).await);

    let body = stream::iter(vec![Ok::<_, std::io::Error>(Bytes::from_static(b"x"))]);
    let err = orchestrator
        .store_upload(&job_id, "..", body)
        .await
        .unwrap_err();

    assert!(matches!(err, StorageError::InvalidFileName(_)));
    assert_eq!(
        store.snapshot("job-badname").await.unwrap().state,
        JobState::Failed
    );
    assert_eq!(store.get_progress("job-badname").await, 0.0);
}

#[tokio::test]
async fn test_begin_rejects_id_in_use() {
    let _lock = PROCESS_LOCK.lock().await;
    let fixture = Fixture::new(
        &ffprobe_reporting("50"),
        &ffmpeg_succeeding(r"out_time_ms=5000000\n"),
    );
    let (orchestrator, store) = orchestrator(&fixture);

    let stored = upload(&orchestrator, "job-once").await;
    orchestrator.convert(&stored).await.unwrap();

    assert!(!orchestrator.begin(&JobId::parse("job-once").unwrap()).await);
    let snap = store.snapshot("job-once").await.unwrap();
    assert_eq!(snap.state, JobState::Done);
    assert_eq!(snap.percent, 100.0);
}
