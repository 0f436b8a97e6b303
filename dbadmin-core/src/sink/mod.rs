//! Multi-destination result funnel.
//!
//! One document goes to every configured destination in a fixed order:
//! email, file, console, document store. Each step is gated only by its own
//! setting in [`SinkConfig`], and a failure in one step never blocks the
//! steps after it.
//!
//! # Outcome
//! The returned [`DeliveryOutcome`] reflects the document store step only.
//! Mail and file failures are logged at `warn` level; console output is
//! best effort.

mod mail;
mod store;

pub use mail::{CommandMailer, MailMessage, MailTransport};
pub use store::DocumentStore;

use crate::Result;
use crate::config::{FileTarget, MailSettings, SinkConfig, WriteMode};
use crate::error::AdminError;
use crate::models::DeliveryOutcome;
use serde::Serialize;
use serde_json::Value;
use std::io::Write;
use std::sync::Mutex;
use tokio::io::AsyncWriteExt;

/// Renders `document` as compact JSON, or pretty-printed with `indent`
/// spaces per level when `expand` is set.
pub fn render(document: &Value, expand: bool, indent: usize) -> Result<String> {
    if !expand {
        return serde_json::to_string(document)
            .map_err(|e| AdminError::serialization("Failed to render document", e));
    }

    let spaces = " ".repeat(indent);
    let formatter = serde_json::ser::PrettyFormatter::with_indent(spaces.as_bytes());
    let mut buffer = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buffer, formatter);
    document
        .serialize(&mut serializer)
        .map_err(|e| AdminError::serialization("Failed to render document", e))?;
    String::from_utf8(buffer)
        .map_err(|e| AdminError::configuration(format!("Rendered document is not UTF-8: {}", e)))
}

/// Default subject line: `"<Server>: <Type>"`.
fn default_subject(document: &serde_json::Map<String, Value>) -> String {
    let field = |key: &str| {
        document
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    };
    format!("{}: {}", field("Server"), field("Type"))
}

/// Delivers result documents to mail, file, console and document store.
///
/// Owns the mail transport, the console writer and the optional document
/// store handle; the store is released with [`ResultSink::close`] after the
/// last delivery.
pub struct ResultSink {
    mailer: Box<dyn MailTransport>,
    console: Mutex<Box<dyn Write + Send>>,
    store: Option<Box<dyn DocumentStore>>,
}

impl ResultSink {
    /// Creates a sink that mails through `mailer` and prints to stdout.
    pub fn new(mailer: Box<dyn MailTransport>) -> Self {
        Self {
            mailer,
            console: Mutex::new(Box::new(std::io::stdout())),
            store: None,
        }
    }

    /// Attaches the document store used when a target is configured.
    pub fn with_store(mut self, store: Box<dyn DocumentStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Replaces stdout as the console destination.
    pub fn with_console(mut self, console: Box<dyn Write + Send>) -> Self {
        self.console = Mutex::new(console);
        self
    }

    /// True until [`ResultSink::close`] releases the store.
    pub fn has_store(&self) -> bool {
        self.store.is_some()
    }

    /// Delivers one document to every configured destination.
    ///
    /// A document that is not a JSON object is rejected before any
    /// destination is touched.
    pub async fn deliver(&self, document: &Value, config: &SinkConfig) -> DeliveryOutcome {
        let Some(object) = document.as_object() else {
            tracing::warn!("Refusing to deliver a non-object document");
            return DeliveryOutcome::failed(format!("Error: Is not a dictionary: {}", document));
        };

        let rendered = match render(document, config.expand, config.indent) {
            Ok(text) => text,
            Err(e) => return DeliveryOutcome::failed(e.to_string()),
        };

        if let Some(mail) = &config.mail
            && let Err(e) = self.send_mail(object, &rendered, mail).await
        {
            tracing::warn!("{}", e);
        }

        if let Some(file) = &config.file
            && let Err(e) = write_file(file, &rendered).await
        {
            tracing::warn!("{}", e);
        }

        if !config.suppress
            && let Err(e) = self.print(&rendered)
        {
            tracing::warn!("Console output failed: {}", e);
        }

        match (&self.store, &config.store_target) {
            (Some(store), Some(target)) => match store.insert(target, document).await {
                Ok(()) => {
                    tracing::debug!("Stored document in {}", target);
                    DeliveryOutcome::ok()
                }
                Err(e) => {
                    tracing::error!("{}", e);
                    DeliveryOutcome::failed(e.to_string())
                }
            },
            (None, Some(target)) => {
                tracing::debug!("No document store configured; skipping {}", target);
                DeliveryOutcome::ok()
            }
            _ => DeliveryOutcome::ok(),
        }
    }

    async fn send_mail(
        &self,
        document: &serde_json::Map<String, Value>,
        body: &str,
        settings: &MailSettings,
    ) -> Result<()> {
        let message = MailMessage {
            recipients: settings.recipients.clone(),
            subject: settings
                .subject
                .clone()
                .unwrap_or_else(|| default_subject(document)),
            body: body.to_string(),
        };
        self.mailer.send(&message, settings.use_mailx).await
    }

    fn print(&self, rendered: &str) -> std::io::Result<()> {
        let mut console = self
            .console
            .lock()
            .map_err(|_| std::io::Error::other("console writer poisoned"))?;
        writeln!(console, "{}", rendered)?;
        console.flush()
    }

    /// Closes the document store, if any. Safe to call more than once.
    pub async fn close(&mut self) {
        if let Some(store) = self.store.take() {
            store.close().await;
        }
    }
}

async fn write_file(target: &FileTarget, rendered: &str) -> Result<()> {
    let mut options = tokio::fs::OpenOptions::new();
    match target.mode {
        WriteMode::Truncate => options.write(true).create(true).truncate(true),
        WriteMode::Append => options.append(true).create(true),
    };

    let context = || format!("Failed to write {}", target.path.display());
    let mut file = options
        .open(&target.path)
        .await
        .map_err(|e| AdminError::io(context(), e))?;
    file.write_all(rendered.as_bytes())
        .await
        .map_err(|e| AdminError::io(context(), e))?;
    file.write_all(b"\n")
        .await
        .map_err(|e| AdminError::io(context(), e))?;
    file.flush().await.map_err(|e| AdminError::io(context(), e))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::config::StoreTarget;
    use crate::test_support::{RecordingMailer, RecordingStore};
    use serde_json::json;
    use std::sync::Arc;

    /// Console writer whose bytes the test can read back.
    #[derive(Clone, Default)]
    struct SharedBuffer(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    /// Console writer behaving like stdout redirected to a full device.
    struct FullDevice;

    impl Write for FullDevice {
        fn write(&mut self, _buf: &[u8]) -> std::io::Result<usize> {
            Err(std::io::Error::from_raw_os_error(28))
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Err(std::io::Error::from_raw_os_error(28))
        }
    }

    fn document() -> Value {
        json!({"Server": "db01", "AsOf": "2026-01-01 00:00:00", "Type": "check", "Results": []})
    }

    fn target() -> StoreTarget {
        StoreTarget {
            database: "sysmon".to_string(),
            collection: "mysql_db_status".to_string(),
        }
    }

    #[test]
    fn test_render_compact_and_expanded() {
        let value = json!({"a": {"b": 1}});
        assert_eq!(render(&value, false, 4).unwrap(), r#"{"a":{"b":1}}"#);
        assert_eq!(
            render(&value, true, 2).unwrap(),
            "{\n  \"a\": {\n    \"b\": 1\n  }\n}"
        );
        // Indent is ignored without expand.
        assert_eq!(render(&value, false, 8).unwrap(), r#"{"a":{"b":1}}"#);
    }

    #[tokio::test]
    async fn test_non_object_is_rejected_without_delivery() {
        let mailer = RecordingMailer::default();
        let store = RecordingStore::default();
        let sink = ResultSink::new(Box::new(mailer.clone())).with_store(Box::new(store.clone()));
        let config = SinkConfig::default()
            .with_store_target(target())
            .with_mail(MailSettings {
                recipients: vec!["dba@example.com".to_string()],
                subject: None,
                use_mailx: false,
            })
            .suppressed();

        let outcome = sink.deliver(&json!("abc"), &config).await;

        assert!(!outcome.succeeded);
        assert_eq!(
            outcome.message.as_deref(),
            Some(r#"Error: Is not a dictionary: "abc""#)
        );
        assert!(mailer.sent().is_empty());
        assert!(store.inserted().is_empty());
    }

    #[tokio::test]
    async fn test_store_requires_handle_and_target() {
        let store = RecordingStore::default();

        let sink = ResultSink::new(Box::new(RecordingMailer::default()))
            .with_store(Box::new(store.clone()));
        let outcome = sink.deliver(&document(), &SinkConfig::default().suppressed()).await;
        assert!(outcome.succeeded);
        assert!(store.inserted().is_empty());

        let sink = ResultSink::new(Box::new(RecordingMailer::default()));
        let config = SinkConfig::default().with_store_target(target()).suppressed();
        assert!(sink.deliver(&document(), &config).await.succeeded);

        let sink = ResultSink::new(Box::new(RecordingMailer::default()))
            .with_store(Box::new(store.clone()));
        assert!(sink.deliver(&document(), &config).await.succeeded);
        assert_eq!(store.inserted(), vec![(target(), document())]);
    }

    #[tokio::test]
    async fn test_store_failure_flips_outcome_but_other_sinks_fire() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let mailer = RecordingMailer::default();
        let sink = ResultSink::new(Box::new(mailer.clone()))
            .with_store(Box::new(RecordingStore::failing()));
        let config = SinkConfig::default()
            .with_store_target(target())
            .with_file(&path, WriteMode::Truncate)
            .with_mail(MailSettings {
                recipients: vec!["dba@example.com".to_string()],
                subject: None,
                use_mailx: true,
            })
            .suppressed();

        let outcome = sink.deliver(&document(), &config).await;

        assert!(!outcome.succeeded);
        assert!(outcome.message.is_some());
        assert_eq!(mailer.sent().len(), 1);
        assert!(std::fs::read_to_string(&path).unwrap().contains("db01"));
    }

    #[tokio::test]
    async fn test_mail_failure_does_not_flip_outcome() {
        let sink = ResultSink::new(Box::new(RecordingMailer::failing()));
        let config = SinkConfig::default()
            .with_mail(MailSettings {
                recipients: vec!["dba@example.com".to_string()],
                subject: Some("nightly".to_string()),
                use_mailx: false,
            })
            .suppressed();

        assert!(sink.deliver(&document(), &config).await.succeeded);
    }

    #[tokio::test]
    async fn test_default_and_explicit_subject() {
        let mailer = RecordingMailer::default();
        let sink = ResultSink::new(Box::new(mailer.clone()));
        let mut settings = MailSettings {
            recipients: vec!["dba@example.com".to_string()],
            subject: None,
            use_mailx: true,
        };

        let config = SinkConfig::default().with_mail(settings.clone()).suppressed();
        sink.deliver(&document(), &config).await;
        settings.subject = Some("nightly".to_string());
        let config = SinkConfig::default().with_mail(settings).suppressed();
        sink.deliver(&document(), &config).await;

        let sent = mailer.sent();
        assert_eq!(sent[0].0.subject, "db01: check");
        assert!(sent[0].1);
        assert_eq!(sent[1].0.subject, "nightly");
        assert_eq!(sent[1].0.body, serde_json::to_string(&document()).unwrap());
    }

    #[tokio::test]
    async fn test_file_truncate_and_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("report.json");
        let sink = ResultSink::new(Box::new(RecordingMailer::default()));

        let append = SinkConfig::default()
            .with_file(&path, WriteMode::Append)
            .suppressed();
        sink.deliver(&document(), &append).await;
        sink.deliver(&document(), &append).await;
        let text = std::fs::read_to_string(&path).unwrap();
        assert_eq!(text.lines().count(), 2);

        let truncate = SinkConfig::default()
            .with_file(&path, WriteMode::Truncate)
            .expanded(2)
            .suppressed();
        sink.deliver(&document(), &truncate).await;
        let text = std::fs::read_to_string(&path).unwrap();
        assert!(text.starts_with("{\n  \"Server\""));
        assert_eq!(text.matches("\"Server\"").count(), 1);
    }

    #[tokio::test]
    async fn test_unwritable_file_is_not_fatal() {
        let sink = ResultSink::new(Box::new(RecordingMailer::default()));
        let config = SinkConfig::default()
            .with_file("/nonexistent/dir/report.json", WriteMode::Truncate)
            .suppressed();
        assert!(sink.deliver(&document(), &config).await.succeeded);
    }

    #[tokio::test]
    async fn test_console_receives_rendered_document() {
        let console = SharedBuffer::default();
        let sink = ResultSink::new(Box::new(RecordingMailer::default()))
            .with_console(Box::new(console.clone()));

        sink.deliver(&document(), &SinkConfig::default()).await;
        sink.deliver(&document(), &SinkConfig::default().suppressed()).await;

        let printed = String::from_utf8(console.0.lock().unwrap().clone()).unwrap();
        assert_eq!(printed, format!("{}\n", serde_json::to_string(&document()).unwrap()));
    }

    #[tokio::test]
    async fn test_console_failure_still_reaches_store() {
        let store = RecordingStore::default();
        let sink = ResultSink::new(Box::new(RecordingMailer::default()))
            .with_console(Box::new(FullDevice))
            .with_store(Box::new(store.clone()));
        let config = SinkConfig::default().with_store_target(target());

        let outcome = sink.deliver(&document(), &config).await;

        assert!(outcome.succeeded);
        assert_eq!(store.inserted(), vec![(target(), document())]);
    }

    #[tokio::test]
    async fn test_close_releases_store_once() {
        let store = RecordingStore::default();
        let mut sink = ResultSink::new(Box::new(RecordingMailer::default()))
            .with_store(Box::new(store.clone()));
        sink.close().await;
        sink.close().await;
        assert_eq!(store.close_calls(), 1);
        assert!(!sink.has_store());
    }
}
