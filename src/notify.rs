//! Fire-and-forget side channel for admin notifications and outbound mail.
//!
//! Messages are published to NATS subjects and consumed out-of-band. A
//! publish failure is logged and swallowed: nothing on this channel may fail
//! an order that already exists.

use serde::Serialize;
use uuid::Uuid;

const NOTIFICATION_SUBJECT: &str = "printworks.notifications";
const MAIL_SUBJECT: &str = "printworks.mail";

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Notification {
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub order_id: Uuid,
    pub order_number: String,
    pub is_read: bool,
}

#[derive(Clone, Copy, Debug, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOrder,
    CustomizedOrder,
}

#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailMessage {
    pub to: MailRecipient,
    pub template: &'static str,
    pub order_number: String,
    pub total: i64,
}

/// The mail worker resolves `Admin` to the configured back-office address.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum MailRecipient {
    Customer(String),
    Admin,
}

/// Unconfigured (no NATS URL) means every publish is silently skipped.
#[derive(Clone)]
pub struct Notifier {
    client: Option<async_nats::Client>,
}

impl Notifier {
    pub fn new(client: Option<async_nats::Client>) -> Self {
        Self { client }
    }

    pub fn disabled() -> Self {
        Self { client: None }
    }

    pub async fn notify(&self, notification: Notification) {
        self.publish(NOTIFICATION_SUBJECT, &notification).await;
    }

    pub async fn mail(&self, message: MailMessage) {
        self.publish(MAIL_SUBJECT, &message).await;
    }

    async fn publish<T: Serialize>(&self, subject: &'static str, message: &T) {
        let Some(client) = &self.client else {
            return;
        };
        let payload = match serde_json::to_vec(message) {
            Ok(p) => p,
            Err(e) => {
                tracing::warn!(subject, error = %e, "notification serialization failed");
                return;
            }
        };
        if let Err(e) = client.publish(subject, payload.into()).await {
            tracing::warn!(subject, error = %e, "notification publish failed");
        }
    }
}
