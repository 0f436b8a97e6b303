//! Mail hand-off through the local MTA.

use crate::Result;
use crate::error::AdminError;
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::AsyncWriteExt;

/// A rendered mail ready for hand-off.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MailMessage {
    /// Addresses for the `To:` header or the `mailx` argument list
    pub recipients: Vec<String>,
    /// Single-line subject
    pub subject: String,
    /// Rendered document
    pub body: String,
}

impl MailMessage {
    /// Rejects header values that would break out of their header line.
    ///
    /// # Errors
    /// Returns an error if there are no recipients, or if the subject or a
    /// recipient contains a line break.
    pub fn check_headers(&self) -> Result<()> {
        if self.recipients.is_empty() {
            return Err(AdminError::mail_failed("no recipients"));
        }
        let breaks_line = |value: &str| value.contains(['\r', '\n']);
        if breaks_line(&self.subject) {
            return Err(AdminError::mail_failed("subject contains a line break"));
        }
        if let Some(recipient) = self.recipients.iter().find(|r| breaks_line(r.as_str())) {
            return Err(AdminError::mail_failed(format!(
                "recipient {:?} contains a line break",
                recipient
            )));
        }
        Ok(())
    }

    /// `mailx` arguments. Recipients follow `--` so none is read as an
    /// option.
    pub fn mailx_args(&self) -> Vec<String> {
        let mut args = vec!["-s".to_string(), self.subject.clone(), "--".to_string()];
        args.extend(self.recipients.iter().cloned());
        args
    }

    /// Message with headers, as piped to `sendmail -t`.
    pub fn to_rfc822(&self) -> String {
        format!(
            "To: {}\nSubject: {}\n\n{}\n",
            self.recipients.join(", "),
            self.subject,
            self.body
        )
    }
}

/// Sends mail on behalf of the result funnel.
#[async_trait]
pub trait MailTransport: Send + Sync {
    /// Hands `message` to the transport. `use_mailx` selects the alternate
    /// program.
    async fn send(&self, message: &MailMessage, use_mailx: bool) -> Result<()>;
}

/// Pipes messages into `sendmail -t` or `mailx -s <subject> <rcpt>...`.
#[derive(Debug, Clone)]
pub struct CommandMailer {
    sendmail: PathBuf,
    mailx: PathBuf,
}

impl Default for CommandMailer {
    fn default() -> Self {
        Self {
            sendmail: PathBuf::from("sendmail"),
            mailx: PathBuf::from("mailx"),
        }
    }
}

impl CommandMailer {
    /// Uses the given program paths instead of looking them up on `PATH`.
    pub fn new(sendmail: impl Into<PathBuf>, mailx: impl Into<PathBuf>) -> Self {
        Self {
            sendmail: sendmail.into(),
            mailx: mailx.into(),
        }
    }

    async fn pipe(&self, program: &Path, args: &[String], input: &str) -> Result<()> {
        let mut child = tokio::process::Command::new(program)
            .args(args)
            .stdin(Stdio::piped())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                AdminError::mail_failed(format!("Cannot start {}: {}", program.display(), e))
            })?;

        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(input.as_bytes()).await.map_err(|e| {
                AdminError::mail_failed(format!("Cannot write to {}: {}", program.display(), e))
            })?;
        }

        let output = child.wait_with_output().await.map_err(|e| {
            AdminError::mail_failed(format!("{} did not finish: {}", program.display(), e))
        })?;

        if !output.status.success() {
            return Err(AdminError::mail_failed(format!(
                "{} exited with {}: {}",
                program.display(),
                output.status,
                String::from_utf8_lossy(&output.stderr).trim()
            )));
        }
        Ok(())
    }
}

#[async_trait]
impl MailTransport for CommandMailer {
    async fn send(&self, message: &MailMessage, use_mailx: bool) -> Result<()> {
        message.check_headers()?;

        if use_mailx {
            tracing::debug!("Sending mail via {}", self.mailx.display());
            self.pipe(&self.mailx, &message.mailx_args(), &message.body)
                .await
        } else {
            tracing::debug!("Sending mail via {} -t", self.sendmail.display());
            self.pipe(&self.sendmail, &["-t".to_string()], &message.to_rfc822())
                .await
        }
    }
}
