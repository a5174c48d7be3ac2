//! Detector smoke test.
//!
//! Verifies that the configured detector backend can be constructed before
//! the full pipeline is deployed — for the remote backend this runs the real
//! health probe. Exits 0 on success, 1 on failure.

use std::process::Command;

use anpr_detector::{BackendKind, DetectorBackend, DetectorConfig, StubDetector};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    if let Err(e) = run().await {
        eprintln!("detector-smoketest: FAILED: {e:#}");
        std::process::exit(1);
    }
    println!("detector-smoketest: ok");
}

async fn run() -> anyhow::Result<()> {
    let config = DetectorConfig::from_env()?;

    println!("detector-smoketest: backend={}", config.backend);
    println!("  fps                  = {}", config.fps);
    println!("  confidence_threshold = {}", config.confidence_threshold);
    match config.backend {
        BackendKind::Stub => {
            println!("  stub_seed            = {:?}", config.stub_seed);
        }
        BackendKind::Local => {
            println!("  finder_model_path    = {}", config.finder_model_path);
            println!("  reader_model_path    = {}", config.reader_model_path);
            ensure_ffmpeg()?;
        }
        BackendKind::Remote => {
            println!(
                "  remote_url           = {}",
                config.remote_url.as_deref().unwrap_or("<unset>")
            );
            println!(
                "  auth_configured      = {}",
                config.remote_auth_token.is_some()
            );
            println!("  batch_size           = {}", config.batch_size);
            ensure_ffmpeg()?;
        }
    }

    // Construction runs the fail-fast checks: model loading for the local
    // backend, the bounded health probe for the remote one.
    let backend = DetectorBackend::from_config(&config).await?;
    println!("backend '{}' constructed successfully", backend.kind());

    // A seeded stub pass proves the detection plumbing end to end without
    // touching any external dependency.
    if config.backend == BackendKind::Stub {
        let run = StubDetector::new(Some(42), config.fps).process()?;
        println!(
            "stub run: {} detections over {} frames",
            run.detections.len(),
            run.frames.len()
        );
    }

    Ok(())
}

fn ensure_ffmpeg() -> anyhow::Result<()> {
    let output = Command::new("ffmpeg")
        .arg("-version")
        .output()
        .map_err(|e| anyhow::anyhow!("ffmpeg not available: {}", e))?;

    if !output.status.success() {
        return Err(anyhow::anyhow!(
            "ffmpeg -version failed: {:?}",
            output.status
        ));
    }
    println!("  ffmpeg               = available");
    Ok(())
}
