//! Integration tests that require external services.
//!
//! These need Postgres, Redis and an S3-compatible store to be reachable via
//! the usual environment variables. Run with:
//! `cargo test --test integration -- --ignored`

use uuid::Uuid;

use anpr_queue::{JobQueue, ProcessUploadJob};

#[tokio::test]
#[ignore = "requires Redis"]
async fn queue_round_trip() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("queue client");
    queue.init().await.expect("init consumer group");

    let job = ProcessUploadJob::new(Uuid::new_v4(), Uuid::new_v4(), "videos/integration.mp4");
    queue.enqueue(&job).await.expect("enqueue");

    let consumed = queue
        .consume("integration-test", 2000, 1)
        .await
        .expect("consume");
    assert_eq!(consumed.len(), 1);

    let (message_id, consumed_job) = &consumed[0];
    assert_eq!(consumed_job.upload_id, job.upload_id);

    queue.ack(message_id).await.expect("ack");
    queue.clear_dedup(&job).await.expect("clear dedup");
}

#[tokio::test]
#[ignore = "requires Redis"]
async fn duplicate_enqueue_is_rejected() {
    dotenvy::dotenv().ok();

    let queue = JobQueue::from_env().expect("queue client");
    queue.init().await.expect("init consumer group");

    let job = ProcessUploadJob::new(Uuid::new_v4(), Uuid::new_v4(), "videos/dup.mp4");
    queue.enqueue(&job).await.expect("first enqueue");
    assert!(queue.enqueue(&job).await.is_err(), "duplicate must be rejected");

    // Drain and settle.
    if let Ok(consumed) = queue.consume("integration-test", 2000, 1).await {
        for (message_id, _) in consumed {
            queue.ack(&message_id).await.ok();
        }
    }
    queue.clear_dedup(&job).await.ok();
}

#[tokio::test]
#[ignore = "requires Postgres"]
async fn claim_is_atomic_per_job() {
    use anpr_db::JobRepo;

    dotenvy::dotenv().ok();
    let pool = anpr_db::connect_from_env().await.expect("pool");

    // Seed a queued upload row directly.
    let upload_id = Uuid::new_v4();
    sqlx::query(
        "INSERT INTO uploads (id, camera_id, storage_path, status) \
         VALUES ($1, $2, $3, 'queued')",
    )
    .bind(upload_id)
    .bind(Uuid::new_v4())
    .bind("videos/claim-test.mp4")
    .execute(&pool)
    .await
    .expect("seed upload");

    // First claim wins, second returns nothing.
    let first = JobRepo::claim(&pool, upload_id).await.expect("claim");
    assert!(first.is_some());
    let second = JobRepo::claim(&pool, upload_id).await.expect("claim");
    assert!(second.is_none());

    sqlx::query("DELETE FROM uploads WHERE id = $1")
        .bind(upload_id)
        .execute(&pool)
        .await
        .ok();
}

#[tokio::test]
#[ignore = "requires S3-compatible storage"]
async fn crop_upload_and_head() {
    use anpr_storage::ObjectStorage;

    dotenvy::dotenv().ok();
    let storage = ObjectStorage::from_env().expect("storage client");

    let key = format!("crops/integration/{}.jpg", Uuid::new_v4());
    storage
        .put_crop(vec![0xFF, 0xD8, 0xFF, 0xD9], &key)
        .await
        .expect("upload crop");

    assert!(storage.crop_exists(&key).await.expect("head crop"));
}
