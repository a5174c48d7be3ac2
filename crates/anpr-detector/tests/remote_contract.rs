//! Wire-contract tests for the remote detector against a mock service.

use std::time::Duration;

use image::{Rgb, RgbImage};
use serde_json::json;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

use anpr_detector::{DetectorConfig, DetectorError, RemoteDetector};
use anpr_media::{Frame, FrameSet};

fn test_config(url: &str) -> DetectorConfig {
    DetectorConfig {
        remote_url: Some(url.to_string()),
        health_timeout: Duration::from_millis(500),
        connect_timeout: Duration::from_secs(1),
        read_timeout: Duration::from_secs(5),
        batch_size: 8,
        ..Default::default()
    }
}

fn frames(count: usize) -> FrameSet {
    let frames = (0..count)
        .map(|i| {
            let image = RgbImage::from_fn(16, 16, |x, y| {
                Rgb([(x * 16) as u8, (y * 16) as u8, (i % 256) as u8])
            });
            Frame::new(i as u64, image)
        })
        .collect();
    FrameSet::new(1, frames)
}

fn detection_json(plate: &str) -> serde_json::Value {
    json!({
        "bbox": {"x1": 100, "y1": 50, "x2": 220, "y2": 110},
        "confidence": 0.88,
        "plate": plate,
        "normalized_plate": plate,
    })
}

async fn mount_health_ok(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"status": "ok"})))
        .mount(server)
        .await;
}

#[tokio::test]
async fn health_probe_timeout_fails_construction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(
            ResponseTemplate::new(200).set_delay(Duration::from_secs(2)),
        )
        .mount(&server)
        .await;

    let err = RemoteDetector::connect(&test_config(&server.uri()))
        .await
        .err()
        .expect("construction must fail");
    assert!(matches!(err, DetectorError::HealthTimeout { .. }));
}

#[tokio::test]
async fn health_probe_non_2xx_fails_construction() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/health"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let err = RemoteDetector::connect(&test_config(&server.uri()))
        .await
        .err()
        .expect("construction must fail");
    assert!(matches!(
        err,
        DetectorError::HealthStatus { status: 503, .. }
    ));
}

#[tokio::test]
async fn health_probe_unreachable_fails_construction() {
    // Nothing listens on this port.
    let err = RemoteDetector::connect(&test_config("http://127.0.0.1:1"))
        .await
        .err()
        .expect("construction must fail");
    assert!(matches!(
        err,
        DetectorError::HealthUnreachable { .. } | DetectorError::HealthTimeout { .. }
    ));
}

#[tokio::test]
async fn batch_local_keys_map_to_global_indices() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;

    // Every batch responds with keys "0".."7"; for the batch at offset 16
    // those must surface as global frames 16..23, never 0..7.
    let mut by_frame = serde_json::Map::new();
    for key in 0..8 {
        by_frame.insert(key.to_string(), json!([detection_json("ABC123")]));
    }
    Mock::given(method("POST"))
        .and(path("/infer/frames"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "detections_by_frame": by_frame,
            "metadata": {},
        })))
        .expect(3)
        .mount(&server)
        .await;

    let detector = RemoteDetector::connect(&test_config(&server.uri()))
        .await
        .unwrap();
    let run = detector.process_frames(frames(24), "cam-1").await.unwrap();

    let frame_nos: Vec<u64> = run.detections.iter().map(|d| d.frame_no).collect();
    assert_eq!(frame_nos, (0..24).collect::<Vec<u64>>());
    // The third batch specifically: offset 16 onward, not batch-local 0..7.
    assert!(frame_nos.contains(&16) && frame_nos.contains(&23));
}

#[tokio::test]
async fn partial_batch_uses_its_own_offset() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;

    Mock::given(method("POST"))
        .and(path("/infer/frames"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "detections_by_frame": {"1": [detection_json("XYZ789")]},
            "metadata": {},
        })))
        .mount(&server)
        .await;

    // 10 frames, batch size 8: batches at offsets 0 and 8.
    let detector = RemoteDetector::connect(&test_config(&server.uri()))
        .await
        .unwrap();
    let run = detector.process_frames(frames(10), "cam-1").await.unwrap();

    let frame_nos: Vec<u64> = run.detections.iter().map(|d| d.frame_no).collect();
    assert_eq!(frame_nos, vec![1, 9]);
}

#[tokio::test]
async fn missing_detections_container_is_a_validation_failure() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;

    Mock::given(method("POST"))
        .and(path("/infer/frames"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"metadata": {}})))
        .mount(&server)
        .await;

    let detector = RemoteDetector::connect(&test_config(&server.uri()))
        .await
        .unwrap();
    let err = detector
        .process_frames(frames(4), "cam-1")
        .await
        .err()
        .expect("missing container must fail the batch");
    assert!(matches!(err, DetectorError::InvalidResponse { .. }));
}

#[tokio::test]
async fn out_of_range_frame_key_is_a_protocol_violation() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;

    // Batch has 8 frames; key "8" cannot belong to it.
    Mock::given(method("POST"))
        .and(path("/infer/frames"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "detections_by_frame": {"8": [detection_json("BAD999")]},
            "metadata": {},
        })))
        .mount(&server)
        .await;

    let detector = RemoteDetector::connect(&test_config(&server.uri()))
        .await
        .unwrap();
    let err = detector
        .process_frames(frames(8), "cam-1")
        .await
        .err()
        .expect("out-of-range key must fail the batch");
    assert!(matches!(err, DetectorError::Protocol { .. }));
}

#[tokio::test]
async fn zero_detections_is_success() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;

    Mock::given(method("POST"))
        .and(path("/infer/frames"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "detections_by_frame": {},
            "metadata": {},
        })))
        .mount(&server)
        .await;

    let detector = RemoteDetector::connect(&test_config(&server.uri()))
        .await
        .unwrap();
    let run = detector.process_frames(frames(8), "cam-1").await.unwrap();
    assert!(run.detections.is_empty());
}

#[tokio::test]
async fn batch_http_error_fails_the_job() {
    let server = MockServer::start().await;
    mount_health_ok(&server).await;

    Mock::given(method("POST"))
        .and(path("/infer/frames"))
        .respond_with(ResponseTemplate::new(500).set_body_string("inference exploded"))
        .mount(&server)
        .await;

    let detector = RemoteDetector::connect(&test_config(&server.uri()))
        .await
        .unwrap();
    let err = detector
        .process_frames(frames(8), "cam-1")
        .await
        .err()
        .expect("HTTP 500 must fail the batch");
    assert!(matches!(
        err,
        DetectorError::BatchHttp { status: 500, .. }
    ));
}
