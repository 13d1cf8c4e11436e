//! Notification boundary.
//!
//! The coordinator never talks to the platform notification center directly.
//! It builds a [`ReminderRequest`] and hands it to a [`NotificationSender`],
//! which owns delivery, wording and any retry it cares to do.

use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::NotifyError;
use crate::types::CheckItem;

/// Category under which reminder notifications are registered.
pub const CATEGORY_IDENTIFIER: &str = "CHECK_ITEMS";

/// Action letting the user postpone a reminder.
pub const SNOOZE_ACTION: NotificationAction = NotificationAction {
    identifier: "SNOOZE",
    title: "後で",
};

/// A button shown on a reminder notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct NotificationAction {
    pub identifier: &'static str,
    pub title: &'static str,
}

impl From<CheckItem> for NotificationAction {
    fn from(item: CheckItem) -> Self {
        Self {
            identifier: item.action_identifier(),
            title: item.label(),
        }
    }
}

/// The full action catalog registered with the platform category.
#[must_use]
pub fn action_catalog() -> Vec<NotificationAction> {
    CheckItem::ALL
        .into_iter()
        .map(NotificationAction::from)
        .chain(std::iter::once(SNOOZE_ACTION))
        .collect()
}

/// A request to post one reminder.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReminderRequest {
    pub id: Uuid,
    pub category: String,
    pub items: BTreeSet<CheckItem>,
    pub created_at: DateTime<Utc>,
}

impl ReminderRequest {
    #[must_use]
    pub fn new(items: BTreeSet<CheckItem>, created_at: DateTime<Utc>) -> Self {
        Self {
            id: Uuid::new_v4(),
            category: CATEGORY_IDENTIFIER.to_string(),
            items,
            created_at,
        }
    }

    /// Actions for this reminder: one per enabled item, then snooze.
    #[must_use]
    pub fn actions(&self) -> Vec<NotificationAction> {
        self.items
            .iter()
            .copied()
            .map(NotificationAction::from)
            .chain(std::iter::once(SNOOZE_ACTION))
            .collect()
    }
}

/// Delivers reminders to the user.
///
/// Every call is best-effort. The coordinator spawns them and only logs the
/// outcome; nothing it does depends on the result.
#[async_trait]
pub trait NotificationSender: Send + Sync {
    /// Registers the reminder category and its action buttons.
    ///
    /// Called once, when the coordinator starts, before permission is asked.
    async fn configure_categories(
        &self,
        category: &str,
        actions: &[NotificationAction],
    ) -> Result<(), NotifyError>;

    /// Asks the user for permission to post notifications.
    async fn request_authorization(&self) -> Result<bool, NotifyError>;

    /// Posts a reminder.
    async fn send(&self, request: ReminderRequest) -> Result<(), NotifyError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn catalog_lists_items_then_snooze() {
        let ids: Vec<_> = action_catalog().iter().map(|a| a.identifier).collect();
        assert_eq!(
            ids,
            vec![
                "CHECK_PHONE",
                "CHECK_WALLET",
                "CHECK_KEYS",
                "CHECK_GLASSES",
                "SNOOZE"
            ]
        );
    }

    #[test]
    fn request_actions_follow_enabled_items() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let request = ReminderRequest::new([CheckItem::Keys, CheckItem::Phone].into(), at);

        let ids: Vec<_> = request.actions().iter().map(|a| a.identifier).collect();
        assert_eq!(ids, vec!["CHECK_PHONE", "CHECK_KEYS", "SNOOZE"]);
        assert_eq!(request.category, CATEGORY_IDENTIFIER);
    }

    #[test]
    fn request_ids_are_unique() {
        let at = Utc::now();
        let a = ReminderRequest::new(BTreeSet::new(), at);
        let b = ReminderRequest::new(BTreeSet::new(), at);
        assert_ne!(a.id, b.id);
    }

    #[test]
    fn request_serializes_camel_case() {
        let at = Utc.with_ymd_and_hms(2026, 1, 1, 0, 0, 0).unwrap();
        let request = ReminderRequest::new([CheckItem::Wallet].into(), at);
        let json = serde_json::to_value(&request).unwrap();

        assert_eq!(json["category"], "CHECK_ITEMS");
        assert_eq!(json["items"], serde_json::json!(["wallet"]));
        assert!(json.get("createdAt").is_some());
    }
}
