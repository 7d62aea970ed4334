use async_trait::async_trait;
use motion_watch_common::config::NotifyConfig;
use std::process::Stdio;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;

use crate::dispatcher::AlertEvent;

/// Sends a human-facing notification about an alert.
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError>;
}

#[derive(Debug, thiserror::Error)]
pub enum NotifyError {
    #[error("failed to spawn {0}: {1}")]
    Spawn(String, std::io::Error),
    #[error("failed to write message to sendmail: {0}")]
    Write(std::io::Error),
    #[error("failed to wait for sendmail: {0}")]
    Wait(std::io::Error),
    #[error("sendmail exited with {status}: {stderr}")]
    Failed { status: String, stderr: String },
    #[error("sendmail did not finish within {0}s, killed")]
    Timeout(u64),
}

/// A rendered mail message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AlertMessage {
    pub to: String,
    pub from: String,
    pub subject: String,
    pub body: String,
}

impl AlertMessage {
    /// Fill `{raw}`, `{smoothed}` and `{file}` in the configured body.
    pub fn render(config: &NotifyConfig, event: &AlertEvent) -> Self {
        let body = config
            .body
            .replace("{raw}", &format!("{:.4}", event.raw))
            .replace("{smoothed}", &format!("{:.4}", event.smoothed))
            .replace("{file}", &event.file_name);
        Self {
            to: config.to.clone(),
            from: config.from.clone(),
            subject: config.subject.clone(),
            body,
        }
    }

    /// Message text in the form `sendmail -t` reads from stdin.
    pub fn to_sendmail_input(&self) -> String {
        let mut out = format!(
            "To: {}\nFrom: {}\nSubject: {}\n\n{}",
            self.to, self.from, self.subject, self.body
        );
        if !out.ends_with('\n') {
            out.push('\n');
        }
        out.push_str(".\n");
        out
    }
}

/// Pipes alerts into a local `sendmail -t`.
pub struct SendmailNotifier {
    config: NotifyConfig,
}

impl SendmailNotifier {
    pub fn new(config: NotifyConfig) -> Self {
        Self { config }
    }

    async fn send(&self, message: &AlertMessage) -> Result<(), NotifyError> {
        let mut child = Command::new(&self.config.sendmail_path)
            .arg("-t")
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| NotifyError::Spawn(self.config.sendmail_path.clone(), e))?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin
                .write_all(message.to_sendmail_input().as_bytes())
                .await
                .map_err(NotifyError::Write)?;
            // Closing stdin tells sendmail the message is complete.
            drop(stdin);
        }

        let output = child.wait_with_output().await.map_err(NotifyError::Wait)?;
        if !output.status.success() {
            return Err(NotifyError::Failed {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            });
        }

        debug!(to = message.to, subject = message.subject, "mail handed to sendmail");
        Ok(())
    }
}

#[async_trait]
impl Notifier for SendmailNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        let message = AlertMessage::render(&self.config, event);

        // Dropping the child on timeout kills it (`kill_on_drop`).
        tokio::time::timeout(self.config.timeout(), self.send(&message))
            .await
            .map_err(|_| NotifyError::Timeout(self.config.timeout_secs))?
    }
}

/// Used when `notify.enabled = false`.
pub struct DisabledNotifier;

#[async_trait]
impl Notifier for DisabledNotifier {
    async fn notify(&self, event: &AlertEvent) -> Result<(), NotifyError> {
        debug!(file = event.file_name, "notifications disabled, skipping mail");
        Ok(())
    }
}
