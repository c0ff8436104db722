//! Unit tests for the generation workflow

#[path = "../common/mod.rs"]
mod common;

use common::*;
use gen_image_relay::error::AppError;
use gen_image_relay::orchestrator::prompt::{NEGATIVE_PROMPT, STYLE_DIRECTIVES};
use gen_image_relay::provider::{GenerationJob, GenerationRequest, JobStatus};
use gen_image_relay::storage::IMAGE_CONTENT_TYPE;
use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

fn request() -> GenerationRequest {
    GenerationRequest::new("a lighthouse at dusk", 896, 1192)
}

#[tokio::test]
async fn test_success_publishes_jpeg() {
    let provider = Arc::new(FakeProvider::succeeding());
    let store = Arc::new(FakeStore::default());
    let delay = Arc::new(RecordingDelay::default());
    let orchestrator = orchestrator(provider.clone(), store.clone(), delay.clone());

    let artifact = orchestrator.generate(&request()).await.unwrap();

    let objects = store.objects.lock();
    assert_eq!(objects.len(), 1);
    assert_eq!(objects[0].content_type, IMAGE_CONTENT_TYPE);
    assert_eq!(objects[0].size, IMAGE_BYTES.len());
    assert!(objects[0].key.starts_with("renders/"));
    assert!(objects[0].key.ends_with(".jpg"));
    assert_eq!(artifact.public_url, FakeStore::public_url(&objects[0].key));

    assert_eq!(provider.submit_count(), 1);
    assert_eq!(provider.poll_count(), 1);
    assert_eq!(provider.fetch_count(), 1);
}

#[tokio::test]
async fn test_submission_is_augmented() {
    let provider = Arc::new(FakeProvider::succeeding());
    let orchestrator = orchestrator(
        provider.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(RecordingDelay::default()),
    );

    orchestrator
        .create(&GenerationRequest::new("a lighthouse at dusk", 5000, 4000))
        .await
        .unwrap();

    let submissions = provider.submissions.lock();
    let submission = &submissions[0];
    assert_eq!(
        submission.prompt,
        format!("a lighthouse at dusk, {}", STYLE_DIRECTIVES)
    );
    assert_eq!(submission.negative_prompt, NEGATIVE_PROMPT);
    assert_eq!(submission.width, 900);
    assert_eq!(submission.height, 1536);
    assert_eq!(submission.num_images, 1);
}

#[tokio::test]
async fn test_never_complete_exhausts_ten_attempts() {
    let provider = Arc::new(FakeProvider::new(SubmitBehavior::Job("job-1"), vec![pending()]));
    let store = Arc::new(FakeStore::default());
    let delay = Arc::new(RecordingDelay::default());
    let orchestrator = orchestrator(provider.clone(), store.clone(), delay.clone());

    let err = orchestrator.generate(&request()).await.unwrap_err();

    assert!(matches!(err, AppError::UpstreamGeneration(_)));
    assert_eq!(provider.submit_count(), 1);
    assert_eq!(provider.poll_count(), 10);
    assert_eq!(provider.fetch_count(), 0);
    assert!(store.objects.lock().is_empty());
}

#[tokio::test]
async fn test_poll_waits_fixed_interval_before_every_check() {
    let provider = Arc::new(FakeProvider::new(SubmitBehavior::Job("job-1"), vec![pending()]));
    let delay = Arc::new(RecordingDelay::default());
    let orchestrator = orchestrator(provider, Arc::new(FakeStore::default()), delay.clone());

    let result = orchestrator
        .poll(GenerationJob {
            id: "job-1".to_string(),
        })
        .await;

    assert!(result.is_none());
    let waits = delay.waits.lock();
    assert_eq!(waits.len(), 10);
    assert!(waits.iter().all(|w| *w == Duration::from_secs(10)));
}

#[tokio::test]
async fn test_nsfw_stops_polling_immediately() {
    let provider = Arc::new(FakeProvider::new(
        SubmitBehavior::Job("job-1"),
        vec![
            pending(),
            complete(Some("https://cdn.example/img.jpg"), true),
            complete(Some("https://cdn.example/img.jpg"), false),
        ],
    ));
    let store = Arc::new(FakeStore::default());
    let delay = Arc::new(RecordingDelay::default());
    let orchestrator = orchestrator(provider.clone(), store.clone(), delay.clone());

    let err = orchestrator.generate(&request()).await.unwrap_err();

    assert!(matches!(err, AppError::UpstreamGeneration(_)));
    assert_eq!(provider.poll_count(), 2);
    assert_eq!(provider.fetch_count(), 0);
    assert_eq!(delay.count(), 2);
    assert!(store.objects.lock().is_empty());
}

#[tokio::test]
async fn test_missing_url_aborts() {
    let provider = Arc::new(FakeProvider::new(
        SubmitBehavior::Job("job-1"),
        vec![complete(None, false)],
    ));
    let orchestrator = orchestrator(
        provider.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(RecordingDelay::default()),
    );

    assert!(orchestrator.create(&request()).await.is_none());
    assert_eq!(provider.poll_count(), 1);
    assert_eq!(provider.fetch_count(), 0);
}

#[tokio::test]
async fn test_poll_errors_count_against_budget() {
    let provider = Arc::new(FakeProvider::new(
        SubmitBehavior::Job("job-1"),
        vec![
            Step::Error,
            Step::Error,
            complete(Some("https://cdn.example/img.jpg"), false),
        ],
    ));
    let orchestrator = orchestrator(
        provider.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(RecordingDelay::default()),
    );

    let result = orchestrator.create(&request()).await.unwrap();

    assert_eq!(provider.poll_count(), 3);
    assert_eq!(result.status(), &JobStatus::Complete);
    assert!(!result.nsfw());
    assert_eq!(result.image_url(), "https://cdn.example/img.jpg");
    assert_eq!(result.image_bytes(), IMAGE_BYTES);
}

#[tokio::test]
async fn test_persistent_poll_errors_give_up() {
    let provider = Arc::new(FakeProvider::new(SubmitBehavior::Job("job-1"), vec![Step::Error]));
    let orchestrator = orchestrator(
        provider.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(RecordingDelay::default()),
    );

    assert!(orchestrator.create(&request()).await.is_none());
    assert_eq!(provider.poll_count(), 10);
}

#[tokio::test]
async fn test_failed_fetch_keeps_polling() {
    let provider = Arc::new(FakeProvider::succeeding().failing_fetch());
    let orchestrator = orchestrator(
        provider.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(RecordingDelay::default()),
    );

    assert!(orchestrator.create(&request()).await.is_none());
    assert_eq!(provider.poll_count(), 10);
    assert_eq!(provider.fetch_count(), 10);
}

#[tokio::test]
async fn test_missing_job_id_skips_polling() {
    let provider = Arc::new(FakeProvider::new(SubmitBehavior::NoJob, vec![pending()]));
    let delay = Arc::new(RecordingDelay::default());
    let orchestrator = orchestrator(provider.clone(), Arc::new(FakeStore::default()), delay.clone());

    let err = orchestrator.generate(&request()).await.unwrap_err();

    assert!(matches!(err, AppError::UpstreamGeneration(_)));
    assert_eq!(provider.poll_count(), 0);
    assert_eq!(delay.count(), 0);
}

#[tokio::test]
async fn test_submit_failure_skips_polling() {
    let provider = Arc::new(FakeProvider::new(SubmitBehavior::Fail, vec![pending()]));
    let orchestrator = orchestrator(
        provider.clone(),
        Arc::new(FakeStore::default()),
        Arc::new(RecordingDelay::default()),
    );

    assert!(orchestrator.create(&request()).await.is_none());
    assert_eq!(provider.poll_count(), 0);
}

#[tokio::test]
async fn test_store_failure_is_upload_error() {
    let provider = Arc::new(FakeProvider::succeeding());
    let orchestrator = orchestrator(
        provider,
        Arc::new(FakeStore::failing()),
        Arc::new(RecordingDelay::default()),
    );

    let err = orchestrator.generate(&request()).await.unwrap_err();
    assert!(matches!(err, AppError::UpstreamUpload(_)));
}

#[tokio::test]
async fn test_burst_uploads_do_not_collide() {
    let provider = Arc::new(FakeProvider::succeeding());
    let store = Arc::new(FakeStore::default());
    let orchestrator = Arc::new(orchestrator(
        provider,
        store.clone(),
        Arc::new(RecordingDelay::default()),
    ));

    let runs = (0..50).map(|_| {
        let orchestrator = orchestrator.clone();
        async move { orchestrator.generate(&request()).await }
    });
    let results = futures::future::join_all(runs).await;

    let urls: HashSet<String> = results
        .into_iter()
        .map(|r| r.unwrap().public_url)
        .collect();
    assert_eq!(urls.len(), 50);

    let keys: HashSet<String> = store.objects.lock().iter().map(|o| o.key.clone()).collect();
    assert_eq!(keys.len(), 50);
}
