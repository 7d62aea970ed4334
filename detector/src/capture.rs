use async_trait::async_trait;
use chrono::Utc;
use motion_watch_common::config::CaptureConfig;
use motion_watch_common::frame::{Frame, FrameError};
use std::time::Duration;
use tracing::{debug, warn};

/// Source of camera frames. `None` means no frame is available right now.
#[async_trait]
pub trait FrameSource: Send {
    async fn next_frame(&mut self) -> Option<Frame>;
}

#[derive(Debug, thiserror::Error)]
pub enum CaptureError {
    #[error("failed to build HTTP client: {0}")]
    Client(reqwest::Error),
    #[error("HTTP request failed: {0}")]
    Request(reqwest::Error),
    #[error("HTTP status {0}")]
    Status(u16),
    #[error(transparent)]
    Frame(#[from] FrameError),
}

/// Polls a camera snapshot endpoint, one GET per frame.
pub struct HttpSnapshotSource {
    client: reqwest::Client,
    url: String,
    seq: u64,
}

impl HttpSnapshotSource {
    pub fn new(config: &CaptureConfig) -> Result<Self, CaptureError> {
        let client = reqwest::Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .build()
            .map_err(CaptureError::Client)?;
        Ok(Self {
            client,
            url: config.url.clone(),
            seq: 0,
        })
    }

    async fn fetch(&mut self) -> Result<Frame, CaptureError> {
        let resp = self
            .client
            .get(&self.url)
            .send()
            .await
            .map_err(CaptureError::Request)?;

        if !resp.status().is_success() {
            return Err(CaptureError::Status(resp.status().as_u16()));
        }

        let bytes = resp.bytes().await.map_err(CaptureError::Request)?;
        let captured_at_ms = Utc::now().timestamp_millis();
        let frame = Frame::from_jpeg(&bytes, captured_at_ms, self.seq)?;
        self.seq += 1;

        debug!(
            seq = frame.seq,
            bytes = bytes.len(),
            width = frame.width(),
            height = frame.height(),
            "captured frame"
        );
        Ok(frame)
    }
}

#[async_trait]
impl FrameSource for HttpSnapshotSource {
    async fn next_frame(&mut self) -> Option<Frame> {
        match self.fetch().await {
            Ok(frame) => Some(frame),
            Err(e) => {
                warn!(error = %e, url = self.url, "failed to capture frame");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(url: &str) -> CaptureConfig {
        CaptureConfig {
            url: url.into(),
            backoff_secs: 10,
            connect_timeout_secs: 1,
            request_timeout_secs: 1,
        }
    }

    #[tokio::test]
    async fn unreachable_camera_yields_none() {
        // Port 9 (discard) on loopback is closed on test hosts.
        let mut source = HttpSnapshotSource::new(&config("http://127.0.0.1:9/frame")).unwrap();
        assert!(source.next_frame().await.is_none());
        assert_eq!(source.seq, 0);
    }
}
