//! Console notification sender for LeaveCheck Monitor.
//!
//! Writes every reminder as one JSON line to a writer (stdout for the CLI)
//! and keeps a delivery count so a replay can wait for in-flight reminders
//! before exiting.
//!
//! # Example
//!
//! ```no_run
//! use std::time::Duration;
//! use leavecheck_monitor::sender::ConsoleSender;
//!
//! # async fn example() {
//! let sender = ConsoleSender::stdout();
//! // ... hand `sender` to a coordinator, replay events ...
//! let all_delivered = sender.wait_for(3, Duration::from_secs(5)).await;
//! # }
//! ```

use std::io::Write;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;

use async_trait::async_trait;
use leavecheck_core::{NotificationAction, NotificationSender, NotifyError, ReminderRequest};
use serde::Serialize;
use tokio::sync::Notify;
use tracing::{debug, error, info};

/// One reminder as printed on the console.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct ReminderLine<'a> {
    #[serde(flatten)]
    request: &'a ReminderRequest,
    actions: Vec<&'static str>,
}

/// Notification sender printing reminders as JSON lines.
pub struct ConsoleSender {
    out: Mutex<Box<dyn Write + Send>>,
    categories: Mutex<Vec<String>>,
    grant_authorization: bool,
    delivered: AtomicUsize,
    delivered_signal: Notify,
}

impl ConsoleSender {
    /// Creates a sender writing to `out`.
    #[must_use]
    pub fn new(out: Box<dyn Write + Send>) -> Self {
        Self {
            out: Mutex::new(out),
            categories: Mutex::new(Vec::new()),
            grant_authorization: true,
            delivered: AtomicUsize::new(0),
            delivered_signal: Notify::new(),
        }
    }

    /// Creates a sender writing to stdout.
    #[must_use]
    pub fn stdout() -> Self {
        Self::new(Box::new(std::io::stdout()))
    }

    /// Sets whether notification permission requests are granted.
    #[must_use]
    pub fn with_authorization(mut self, granted: bool) -> Self {
        self.grant_authorization = granted;
        self
    }

    /// Categories registered so far, in registration order.
    #[must_use]
    pub fn categories(&self) -> Vec<String> {
        self.categories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    /// Number of reminders written so far.
    #[must_use]
    pub fn delivered(&self) -> usize {
        self.delivered.load(Ordering::SeqCst)
    }

    /// Waits until at least `expected` reminders have been written.
    ///
    /// # Returns
    ///
    /// `true` if the count was reached before `timeout` elapsed.
    pub async fn wait_for(&self, expected: usize, timeout: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.delivered_signal.notified();
                if self.delivered() >= expected {
                    return;
                }
                notified.await;
            }
        };

        match tokio::time::timeout(timeout, wait).await {
            Ok(()) => true,
            Err(_) => {
                error!(
                    expected,
                    delivered = self.delivered(),
                    "Timeout while waiting for reminder delivery"
                );
                false
            }
        }
    }

    fn write_line(&self, request: &ReminderRequest) -> Result<(), NotifyError> {
        let line = ReminderLine {
            request,
            actions: request.actions().iter().map(|a| a.identifier).collect(),
        };
        let json = serde_json::to_string(&line).map_err(|e| NotifyError::Delivery(e.to_string()))?;

        let mut out = self.out.lock().unwrap_or_else(PoisonError::into_inner);
        writeln!(out, "{json}").map_err(|e| NotifyError::Delivery(e.to_string()))?;
        out.flush().map_err(|e| NotifyError::Delivery(e.to_string()))
    }
}

#[async_trait]
impl NotificationSender for ConsoleSender {
    async fn configure_categories(
        &self,
        category: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError> {
        let identifiers: Vec<_> = actions.iter().map(|a| a.identifier).collect();
        info!(category, actions = ?identifiers, "Notification category registered");
        self.categories
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(category.to_string());
        Ok(())
    }

    async fn request_authorization(&self) -> Result<bool, NotifyError> {
        debug!(granted = self.grant_authorization, "Notification authorization requested");
        Ok(self.grant_authorization)
    }

    async fn send(&self, request: ReminderRequest) -> Result<(), NotifyError> {
        if !self.grant_authorization {
            return Err(NotifyError::NotAuthorized);
        }

        self.write_line(&request)?;
        self.delivered.fetch_add(1, Ordering::SeqCst);
        self.delivered_signal.notify_waiters();

        info!(request_id = %request.id, items = request.items.len(), "Reminder delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use leavecheck_core::CheckItem;
    use std::sync::Arc;

    /// Writer that appends into a shared buffer.
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

    impl SharedBuffer {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    #[tokio::test]
    async fn send_writes_json_line_with_actions() {
        let buffer = SharedBuffer::default();
        let sender = ConsoleSender::new(Box::new(buffer.clone()));
        let request = ReminderRequest::new([CheckItem::Keys].into(), Utc::now());

        sender.send(request.clone()).await.unwrap();

        let line = buffer.contents();
        let json: serde_json::Value = serde_json::from_str(line.trim()).unwrap();
        assert_eq!(json["id"], request.id.to_string());
        assert_eq!(json["items"], serde_json::json!(["keys"]));
        assert_eq!(json["actions"], serde_json::json!(["CHECK_KEYS", "SNOOZE"]));
        assert_eq!(sender.delivered(), 1);
    }

    #[tokio::test]
    async fn configure_records_category_without_printing() {
        let buffer = SharedBuffer::default();
        let sender = ConsoleSender::new(Box::new(buffer.clone()));

        let actions = leavecheck_core::notification::action_catalog();
        sender
            .configure_categories("CHECK_ITEMS", &actions)
            .await
            .unwrap();

        assert_eq!(sender.categories(), vec!["CHECK_ITEMS".to_string()]);
        assert!(buffer.contents().is_empty());
    }

    #[tokio::test]
    async fn denied_sender_rejects_reminders() {
        let buffer = SharedBuffer::default();
        let sender = ConsoleSender::new(Box::new(buffer.clone())).with_authorization(false);

        assert_eq!(sender.request_authorization().await, Ok(false));
        let result = sender
            .send(ReminderRequest::new(CheckItem::ALL.into(), Utc::now()))
            .await;

        assert_eq!(result, Err(NotifyError::NotAuthorized));
        assert!(buffer.contents().is_empty());
        assert_eq!(sender.delivered(), 0);
    }

    #[tokio::test]
    async fn wait_for_returns_once_count_reached() {
        let sender = Arc::new(ConsoleSender::new(Box::new(SharedBuffer::default())));

        let background = Arc::clone(&sender);
        tokio::spawn(async move {
            for _ in 0..2 {
                background
                    .send(ReminderRequest::new(CheckItem::ALL.into(), Utc::now()))
                    .await
                    .unwrap();
            }
        });

        assert!(sender.wait_for(2, Duration::from_secs(2)).await);
    }

    #[tokio::test]
    async fn wait_for_times_out() {
        let sender = ConsoleSender::new(Box::new(SharedBuffer::default()));
        assert!(!sender.wait_for(1, Duration::from_millis(20)).await);
    }
}
