//! Job processing logic.
//!
//! One job at a time: claim, fetch the video, run the detector, validate
//! every detection, persist accepted ones as events, match watch patterns,
//! finalize the job row. Validation rejections are counted and sampled but
//! never fail the job; any detector failure does.

use std::path::{Path, PathBuf};

use chrono::Utc;
use image::RgbImage;
use metrics::counter;
use sqlx::PgPool;
use tracing::{error, info, warn};
use uuid::Uuid;

use anpr_db::{EventRepo, JobRepo, WatchRepo};
use anpr_detector::{DetectorBackend, DetectorConfig, RawDetection};
use anpr_media::encode_jpeg;
use anpr_models::{
    Event, ForensicSample, JobCounters, NewEvent, SkipDetail, SkipReason, UploadJob,
};
use anpr_queue::ProcessUploadJob;
use anpr_storage::ObjectStorage;

use crate::config::WorkerConfig;
use crate::error::WorkerResult;
use crate::notify::send_watch_notification;
use crate::validator::{validate, Validation};
use crate::watchlist::matching_patterns;

/// Context for job processing.
///
/// Construction performs every fail-fast check the worker needs before it
/// may enter its loop — most importantly detector construction, which for
/// the remote backend includes the health probe.
pub struct ProcessingContext {
    pub config: WorkerConfig,
    pub detector_config: DetectorConfig,
    pub detector: DetectorBackend,
    pub storage: ObjectStorage,
    pub pool: PgPool,
    pub http: reqwest::Client,
}

impl ProcessingContext {
    pub async fn new(config: WorkerConfig) -> WorkerResult<Self> {
        let storage = ObjectStorage::from_env()?;
        let pool = anpr_db::connect_from_env().await?;

        let detector_config = DetectorConfig::from_env()?;
        let detector = DetectorBackend::from_config(&detector_config).await?;

        info!(
            backend = detector.kind(),
            "Processing context ready"
        );

        Ok(Self {
            config,
            detector_config,
            detector,
            storage,
            pool,
            http: reqwest::Client::new(),
        })
    }
}

/// What happened to one queue message.
#[derive(Debug, PartialEq, Eq)]
pub enum ProcessOutcome {
    /// The job was claimed and ran to DONE.
    Completed,
    /// Another worker holds (or held) the job; nothing was done.
    AlreadyClaimed,
}

/// Process one upload job end to end.
pub async fn process_upload(
    ctx: &ProcessingContext,
    job: &ProcessUploadJob,
) -> WorkerResult<ProcessOutcome> {
    // The claim is a CAS on job status: it only succeeds while the row is
    // still QUEUED, so two workers can never process the same job.
    let Some(upload) = JobRepo::claim(&ctx.pool, job.upload_id).await? else {
        info!(upload_id = %job.upload_id, "Job missing or already claimed, skipping");
        return Ok(ProcessOutcome::AlreadyClaimed);
    };

    info!(
        upload_id = %upload.id,
        camera_id = %upload.camera_id,
        backend = ctx.detector.kind(),
        "Processing upload"
    );

    let work_dir = PathBuf::from(&ctx.config.work_dir).join(upload.id.to_string());
    let result = run_detection_job(ctx, &upload, job, &work_dir).await;

    if work_dir.exists() {
        tokio::fs::remove_dir_all(&work_dir).await.ok();
    }

    match result {
        Ok((counters, samples)) => {
            JobRepo::mark_done(&ctx.pool, upload.id, &counters).await?;
            counter!("anpr_jobs_processed").increment(1);
            if !samples.is_empty() {
                warn!(
                    upload_id = %upload.id,
                    samples = %serde_json::to_string(&samples).unwrap_or_default(),
                    "Rejection samples for this job"
                );
            }
            info!(
                upload_id = %upload.id,
                detections_total = counters.detections_total,
                events_created = counters.events_created,
                skipped = %counters.skipped_json(),
                "Upload processed"
            );
            Ok(ProcessOutcome::Completed)
        }
        Err(e) => {
            error!(upload_id = %upload.id, error = %e, "Job processing failed");
            if let Err(db_err) = JobRepo::mark_failed(&ctx.pool, upload.id, &e.to_string()).await {
                error!(upload_id = %upload.id, error = %db_err, "Failed to record job failure");
            }
            counter!("anpr_jobs_failed").increment(1);
            Err(e)
        }
    }
}

/// The fallible middle of a job: everything between claim and finalize.
async fn run_detection_job(
    ctx: &ProcessingContext,
    upload: &UploadJob,
    job: &ProcessUploadJob,
    work_dir: &Path,
) -> WorkerResult<(JobCounters, Vec<ForensicSample>)> {
    tokio::fs::create_dir_all(work_dir).await?;
    let video_path = work_dir.join("source.mp4");
    ctx.storage.fetch_video(&job.storage_path, &video_path).await?;

    let run = ctx
        .detector
        .process(
            &video_path,
            &upload.camera_id.to_string(),
            ctx.detector_config.confidence_threshold,
        )
        .await?;

    let limits = ctx.config.validation_limits();
    let mut counters = JobCounters::new();
    let mut samples: Vec<ForensicSample> = Vec::new();

    for detection in &run.detections {
        counters.record_detection();

        match validate(detection, &run.frames, &limits) {
            Validation::Accept(crop) => match store_crop(ctx, upload.id, &crop).await {
                Ok(crop_path) => {
                    let event = EventRepo::insert(
                        &ctx.pool,
                        &NewEvent {
                            upload_id: upload.id,
                            camera_id: upload.camera_id,
                            plate: detection.plate.clone(),
                            normalized_plate: detection.normalized_plate.clone(),
                            confidence: detection.confidence,
                            bbox: detection.bbox,
                            frame_no: detection.frame_no as i64,
                            crop_path,
                            captured_at: detection.captured_at,
                        },
                    )
                    .await?;

                    counters.record_event();
                    counter!("anpr_events_created").increment(1);
                    info!(
                        event_id = %event.id,
                        plate = %event.plate,
                        frame_no = event.frame_no,
                        "Event saved"
                    );

                    check_watchlist(ctx, &event).await?;
                }
                Err(e) => {
                    // Other detections in this job may still succeed, so a
                    // storage failure is a per-detection skip, not a job
                    // failure.
                    record_skip(
                        &ctx.config,
                        &mut counters,
                        &mut samples,
                        detection,
                        SkipReason::WriteFailed,
                        SkipDetail::WriteFailed {
                            error: e.to_string(),
                        },
                    );
                }
            },
            Validation::Reject { reason, detail } => {
                record_skip(&ctx.config, &mut counters, &mut samples, detection, reason, detail);
            }
        }
    }

    Ok((counters, samples))
}

/// Encode and upload one crop under a fresh per-event key.
async fn store_crop(
    ctx: &ProcessingContext,
    upload_id: Uuid,
    crop: &RgbImage,
) -> WorkerResult<String> {
    let bytes = encode_jpeg(crop, ctx.config.crop_jpeg_quality)?;
    let key = format!("crops/{}/{}.jpg", upload_id, Uuid::new_v4());
    ctx.storage.put_crop(bytes, &key).await?;
    Ok(key)
}

/// Match the event against patterns active right now and persist matches.
async fn check_watchlist(ctx: &ProcessingContext, event: &Event) -> WorkerResult<()> {
    let patterns = WatchRepo::active_patterns(&ctx.pool).await?;
    let matches = matching_patterns(&event.normalized_plate, &patterns, Utc::now());

    for pattern in matches {
        WatchRepo::insert_match(&ctx.pool, pattern.id, event.id).await?;
        counter!("anpr_watch_matches").increment(1);
        warn!(
            pattern_id = %pattern.id,
            event_id = %event.id,
            plate = %event.plate,
            "Watch pattern match detected"
        );
        send_watch_notification(&ctx.http, pattern, event).await;
    }

    Ok(())
}

/// Count one skipped detection and keep the first few as forensic samples.
fn record_skip(
    config: &WorkerConfig,
    counters: &mut JobCounters,
    samples: &mut Vec<ForensicSample>,
    detection: &RawDetection,
    reason: SkipReason,
    detail: SkipDetail,
) {
    counters.skipped.record(reason);
    counter!("anpr_detections_skipped", "reason" => reason.as_str()).increment(1);

    let sample = ForensicSample {
        frame_no: detection.frame_no,
        bbox: detection.bbox,
        reason,
        plate: detection.plate.clone(),
        detail,
    };

    warn!(
        frame_no = sample.frame_no,
        reason = %reason,
        plate = %sample.plate,
        detail = ?sample.detail,
        "Detection skipped"
    );

    if samples.len() < config.forensic_sample_limit {
        samples.push(sample);
    }
}
