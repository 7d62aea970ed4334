use chrono::Local;
use motion_watch_common::frame::Frame;
use std::time::Duration;
use tracing::{debug, error, info, warn};

use crate::archive::{snapshot_file_name, FrameArchive};
use crate::capture::FrameSource;
use crate::decision::should_trigger;
use crate::filter::{ScoreError, SimilarityScorer};
use crate::notify::Notifier;
use crate::reference::ReferenceFrame;
use crate::storage::Uploader;
use crate::window::SmoothingWindow;

/// Everything the side-effect step needs to know about one alert.
#[derive(Debug, Clone)]
pub struct AlertEvent {
    pub frame: Frame,
    pub raw: f64,
    pub smoothed: f64,
    pub file_name: String,
}

/// Result of comparing one frame against the baseline.
#[derive(Debug, Clone, PartialEq)]
pub enum Observation {
    /// No baseline existed; this frame became it.
    ReferenceSet,
    Scored { raw: f64, smoothed: f64, alert: bool },
    /// The frame could not be compared. The window is untouched.
    Rejected(ScoreError),
}

/// Baseline, smoothing and threshold state for one run.
pub struct Detector {
    reference: ReferenceFrame,
    window: SmoothingWindow,
    scorer: Box<dyn SimilarityScorer>,
    threshold: f64,
}

impl Detector {
    pub fn new(scorer: Box<dyn SimilarityScorer>, window: usize, threshold: f64) -> Self {
        Self {
            reference: ReferenceFrame::default(),
            window: SmoothingWindow::new(window),
            scorer,
            threshold,
        }
    }

    pub fn observe(&mut self, frame: &Frame) -> Observation {
        let result = match self.reference.get() {
            Some(reference) => self.scorer.score(reference, frame),
            None => {
                self.reference.set_if_absent(frame.clone());
                info!(
                    seq = frame.seq,
                    width = frame.width(),
                    height = frame.height(),
                    "reference frame set"
                );
                return Observation::ReferenceSet;
            }
        };

        let raw = match result {
            Ok(score) => score,
            Err(e) => {
                warn!(error = %e, seq = frame.seq, scorer = self.scorer.name(), "frame not comparable, skipping");
                return Observation::Rejected(e);
            }
        };

        self.window.push(raw);
        let smoothed = self.window.mean().unwrap_or(raw);
        let alert = should_trigger(smoothed, self.threshold);

        debug!(
            seq = frame.seq,
            raw = format!("{:.4}", raw),
            smoothed = format!("{:.4}", smoothed),
            threshold = format!("{:.4}", self.threshold),
            samples = self.window.len(),
            alert,
            "similarity check"
        );

        Observation::Scored {
            raw,
            smoothed,
            alert,
        }
    }

    pub fn reference(&self) -> &ReferenceFrame {
        &self.reference
    }

    pub fn window(&self) -> &SmoothingWindow {
        &self.window
    }

    pub fn threshold(&self) -> f64 {
        self.threshold
    }
}

/// Loop pacing.
#[derive(Debug, Clone, Copy)]
pub struct Timing {
    /// Sleep after every cycle that got a frame.
    pub interval: Duration,
    /// Sleep after the camera produced nothing.
    pub capture_backoff: Duration,
}

/// Which side effects of an alert succeeded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DispatchReport {
    pub saved: bool,
    pub notified: bool,
    pub uploaded: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum CycleOutcome {
    CaptureUnavailable,
    ReferenceSet,
    Rejected(ScoreError),
    Quiet { raw: f64, smoothed: f64 },
    Alerted { raw: f64, smoothed: f64, report: DispatchReport },
}

impl CycleOutcome {
    /// How long to wait before the next cycle.
    pub fn delay(&self, timing: &Timing) -> Duration {
        match self {
            CycleOutcome::CaptureUnavailable => timing.capture_backoff,
            _ => timing.interval,
        }
    }
}

/// Counters for the periodic summary log.
#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    pub cycles: u64,
    pub capture_failures: u64,
    pub alerts: u64,
}

/// Drives capture, detection and alert side effects, one cycle at a time.
///
/// Everything runs sequentially on the caller's task: while an alert is being
/// archived, mailed and uploaded no frames are captured.
pub struct ActionDispatcher {
    detector: Detector,
    source: Box<dyn FrameSource>,
    archive: Box<dyn FrameArchive>,
    notifier: Box<dyn Notifier>,
    uploader: Box<dyn Uploader>,
    timing: Timing,
    stats: CycleStats,
}

impl ActionDispatcher {
    pub fn new(
        detector: Detector,
        source: Box<dyn FrameSource>,
        archive: Box<dyn FrameArchive>,
        notifier: Box<dyn Notifier>,
        uploader: Box<dyn Uploader>,
        timing: Timing,
    ) -> Self {
        Self {
            detector,
            source,
            archive,
            notifier,
            uploader,
            timing,
            stats: CycleStats::default(),
        }
    }

    /// Run forever. Only process termination stops the loop.
    pub async fn run(&mut self) {
        info!(
            interval_ms = self.timing.interval.as_millis() as u64,
            backoff_ms = self.timing.capture_backoff.as_millis() as u64,
            threshold = self.detector.threshold(),
            window = self.detector.window().capacity(),
            "entering detection loop"
        );
        loop {
            let outcome = self.run_cycle().await;
            tokio::time::sleep(outcome.delay(&self.timing)).await;
        }
    }

    /// One capture/compare/dispatch step, without the trailing sleep.
    pub async fn run_cycle(&mut self) -> CycleOutcome {
        self.stats.cycles += 1;
        if self.stats.cycles % 100 == 0 {
            info!(
                cycles = self.stats.cycles,
                alerts = self.stats.alerts,
                capture_failures = self.stats.capture_failures,
                "detection stats"
            );
        }

        let Some(frame) = self.source.next_frame().await else {
            self.stats.capture_failures += 1;
            warn!(
                backoff_secs = self.timing.capture_backoff.as_secs(),
                "no frame from camera, backing off"
            );
            return CycleOutcome::CaptureUnavailable;
        };

        match self.detector.observe(&frame) {
            Observation::ReferenceSet => CycleOutcome::ReferenceSet,
            Observation::Rejected(e) => CycleOutcome::Rejected(e),
            Observation::Scored {
                raw,
                smoothed,
                alert: false,
            } => CycleOutcome::Quiet { raw, smoothed },
            Observation::Scored {
                raw,
                smoothed,
                alert: true,
            } => {
                self.stats.alerts += 1;
                let event = AlertEvent {
                    file_name: snapshot_file_name(&Local::now()),
                    frame,
                    raw,
                    smoothed,
                };
                let report = self.dispatch(&event).await;
                CycleOutcome::Alerted {
                    raw,
                    smoothed,
                    report,
                }
            }
        }
    }

    /// Save, mail, upload, in that order. A failed step is logged and the
    /// next one still runs.
    async fn dispatch(&self, event: &AlertEvent) -> DispatchReport {
        info!(
            raw = format!("{:.4}", event.raw),
            smoothed = format!("{:.4}", event.smoothed),
            seq = event.frame.seq,
            file = event.file_name,
            "motion detected, dispatching alert"
        );

        let path = self.archive.path_for(&event.file_name);

        let saved = match self.archive.save(&event.frame, &path).await {
            Ok(()) => {
                info!(path = path.display().to_string(), "snapshot saved");
                true
            }
            Err(e) => {
                error!(error = %e, path = path.display().to_string(), "failed to save snapshot");
                false
            }
        };

        let notified = match self.notifier.notify(event).await {
            Ok(()) => {
                info!("alert notification sent");
                true
            }
            Err(e) => {
                error!(error = %e, "failed to send alert notification");
                false
            }
        };

        let uploaded = match self.uploader.upload(&path).await {
            Ok(Some(key)) => {
                info!(key, "snapshot uploaded");
                true
            }
            Ok(None) => {
                debug!(path = path.display().to_string(), "upload skipped");
                false
            }
            Err(e) => {
                error!(error = %e, path = path.display().to_string(), "failed to upload snapshot");
                false
            }
        };

        DispatchReport {
            saved,
            notified,
            uploaded,
        }
    }

    pub fn detector(&self) -> &Detector {
        &self.detector
    }

    pub fn stats(&self) -> CycleStats {
        self.stats
    }
}
