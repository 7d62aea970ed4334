use motion_watch_common::config::Config;
use motion_watch_detector::archive::JpegArchive;
use motion_watch_detector::capture::HttpSnapshotSource;
use motion_watch_detector::dispatcher::{ActionDispatcher, Detector, Timing};
use motion_watch_detector::filter::HistogramScorer;
use motion_watch_detector::notify::{DisabledNotifier, Notifier, SendmailNotifier};
use motion_watch_detector::storage::{DisabledUploader, S3Uploader, Uploader};
use std::path::PathBuf;
use tracing::{error, info};

#[tokio::main]
async fn main() {
    let config_path = std::env::args()
        .nth(1)
        .map(PathBuf::from)
        .unwrap_or_else(|| PathBuf::from("config.toml"));

    let config = match Config::load(&config_path) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load config from {}: {e}", config_path.display());
            std::process::exit(1);
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| config.logging.level.parse().unwrap_or_default()),
        )
        .init();

    info!(
        camera = config.capture.url,
        threshold = config.detection.threshold,
        window = config.detection.window,
        hue_bins = config.detection.hue_bins,
        saturation_bins = config.detection.saturation_bins,
        archive_dir = config.archive.dir,
        notify = config.notify.enabled,
        upload = config.upload.enabled,
        "starting motion-watch"
    );

    let source = match HttpSnapshotSource::new(&config.capture) {
        Ok(s) => s,
        Err(e) => {
            error!(error = %e, "failed to set up camera capture");
            std::process::exit(1);
        }
    };

    let notifier: Box<dyn Notifier> = if config.notify.enabled {
        Box::new(SendmailNotifier::new(config.notify.clone()))
    } else {
        Box::new(DisabledNotifier)
    };

    let uploader: Box<dyn Uploader> = if config.upload.enabled {
        Box::new(S3Uploader::connect(&config.upload).await)
    } else {
        Box::new(DisabledUploader)
    };

    let detector = Detector::new(
        Box::new(HistogramScorer::new(
            config.detection.hue_bins,
            config.detection.saturation_bins,
        )),
        config.detection.window,
        config.detection.threshold,
    );

    let mut dispatcher = ActionDispatcher::new(
        detector,
        Box::new(source),
        Box::new(JpegArchive::new(&config.archive.dir, config.archive.jpeg_quality)),
        notifier,
        uploader,
        Timing {
            interval: config.detection.interval(),
            capture_backoff: config.capture.backoff(),
        },
    );

    dispatcher.run().await;
}
