//! Ledger notifications
//!
//! Services publish [`LedgerEvent`]s to the [`NotificationOutbox`] after
//! their transaction commits. A background [`NotificationDispatcher`] drains
//! the queue, resolves recipients and hands each notice to a [`Notifier`].
//! Nothing on this path can fail a ledger operation: a full queue or a
//! failed delivery is logged and dropped.

use std::sync::Arc;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use sqlx::PgPool;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{AppError, AppResult};
use crate::store::postgres::map_db_error;
use crate::store::RecipientDirectory;

/// Something that happened in the ledger that people should hear about
#[derive(Debug, Clone, PartialEq)]
pub enum LedgerEvent {
    RequestCreated {
        request_id: Uuid,
        request_code: String,
        work_order_id: i64,
        requested_by: String,
    },
    RequestApproved {
        request_id: Uuid,
        request_code: String,
        requested_by: String,
        approved_by: String,
    },
    RequestRejected {
        request_id: Uuid,
        request_code: String,
        requested_by: String,
        rejected_by: String,
        reason: String,
    },
    RequestFulfilled {
        request_id: Uuid,
        request_code: String,
        requested_by: String,
        quantity: Decimal,
    },
    LowStock {
        item_id: Uuid,
        sku: String,
        item_name: String,
        warehouse_id: i64,
        available: Decimal,
        reorder_point: Decimal,
    },
}

/// Who a notice goes to
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Audience {
    /// Everyone holding a warehouse-manager role
    Managers,
    /// The named user (username or email)
    User(String),
}

impl LedgerEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            LedgerEvent::RequestCreated { .. } => "stock_request_new",
            LedgerEvent::RequestApproved { .. } => "stock_request_approved",
            LedgerEvent::RequestRejected { .. } => "stock_request_rejected",
            LedgerEvent::RequestFulfilled { .. } => "stock_request_fulfilled",
            LedgerEvent::LowStock { .. } => "low_stock",
        }
    }

    pub fn title(&self) -> String {
        match self {
            LedgerEvent::RequestCreated { .. } => "Stock Request Baru",
            LedgerEvent::RequestApproved { .. } => "Stock Request Disetujui",
            LedgerEvent::RequestRejected { .. } => "Stock Request Ditolak",
            LedgerEvent::RequestFulfilled { .. } => "Stock Request Dipenuhi",
            LedgerEvent::LowStock { .. } => "Stok Menipis",
        }
        .to_string()
    }

    pub fn message(&self) -> String {
        match self {
            LedgerEvent::RequestCreated { work_order_id, .. } => {
                format!("Stock request baru untuk work order #{}", work_order_id)
            }
            LedgerEvent::RequestApproved {
                request_code,
                approved_by,
                ..
            } => format!("Stock request {} disetujui oleh {}", request_code, approved_by),
            LedgerEvent::RequestRejected {
                request_code,
                rejected_by,
                reason,
                ..
            } => format!(
                "Stock request {} ditolak oleh {}: {}",
                request_code, rejected_by, reason
            ),
            LedgerEvent::RequestFulfilled {
                request_code,
                quantity,
                ..
            } => format!("Stock request {} telah dipenuhi ({})", request_code, quantity),
            LedgerEvent::LowStock {
                sku,
                item_name,
                warehouse_id,
                available,
                reorder_point,
                ..
            } => format!(
                "Stok {} ({}) di gudang #{} tersisa {} (titik pemesanan ulang {})",
                item_name, sku, warehouse_id, available, reorder_point
            ),
        }
    }

    pub fn link(&self) -> String {
        match self {
            LedgerEvent::RequestCreated { request_id, .. }
            | LedgerEvent::RequestApproved { request_id, .. }
            | LedgerEvent::RequestRejected { request_id, .. }
            | LedgerEvent::RequestFulfilled { request_id, .. } => {
                format!("/inventory/stock-requests/{}", request_id)
            }
            LedgerEvent::LowStock { item_id, .. } => format!("/inventory/items/{}", item_id),
        }
    }

    pub fn audience(&self) -> Audience {
        match self {
            LedgerEvent::RequestCreated { .. } | LedgerEvent::LowStock { .. } => Audience::Managers,
            LedgerEvent::RequestApproved { requested_by, .. }
            | LedgerEvent::RequestRejected { requested_by, .. }
            | LedgerEvent::RequestFulfilled { requested_by, .. } => {
                Audience::User(requested_by.clone())
            }
        }
    }
}

// ============================================================================
// Outbox
// ============================================================================

/// Sending half of the notification queue
#[derive(Clone, Debug)]
pub struct NotificationOutbox {
    sender: Option<mpsc::Sender<LedgerEvent>>,
}

impl NotificationOutbox {
    /// Bounded queue; the receiver goes to a [`NotificationDispatcher`]
    pub fn channel(capacity: usize) -> (Self, mpsc::Receiver<LedgerEvent>) {
        let (sender, receiver) = mpsc::channel(capacity.max(1));
        (
            Self {
                sender: Some(sender),
            },
            receiver,
        )
    }

    /// Outbox that discards every event
    pub fn disabled() -> Self {
        Self { sender: None }
    }

    /// Queue an event without waiting
    pub fn publish(&self, event: LedgerEvent) {
        let Some(sender) = &self.sender else {
            return;
        };
        match sender.try_send(event) {
            Ok(()) => {}
            Err(mpsc::error::TrySendError::Full(event)) => {
                tracing::warn!(
                    event_type = event.event_type(),
                    "Notification queue full, dropping event"
                );
            }
            Err(mpsc::error::TrySendError::Closed(event)) => {
                tracing::warn!(
                    event_type = event.event_type(),
                    "Notification dispatcher stopped, dropping event"
                );
            }
        }
    }
}

// ============================================================================
// Delivery
// ============================================================================

/// Delivers a single notice to a single user
#[async_trait]
pub trait Notifier: Send + Sync {
    async fn notify(
        &self,
        target_user_id: i64,
        event_type: &str,
        title: &str,
        message: &str,
        link: &str,
    ) -> AppResult<()>;
}

/// Drains the outbox and fans events out to their recipients
#[derive(Clone)]
pub struct NotificationDispatcher {
    notifier: Arc<dyn Notifier>,
    recipients: Arc<dyn RecipientDirectory>,
    manager_roles: Vec<String>,
}

impl NotificationDispatcher {
    pub fn new(
        notifier: Arc<dyn Notifier>,
        recipients: Arc<dyn RecipientDirectory>,
        manager_roles: Vec<String>,
    ) -> Self {
        Self {
            notifier,
            recipients,
            manager_roles,
        }
    }

    /// Deliver one event; returns how many users were notified
    pub async fn deliver(&self, event: &LedgerEvent) -> AppResult<usize> {
        let targets = match event.audience() {
            Audience::Managers => self.recipients.users_with_roles(&self.manager_roles).await?,
            Audience::User(name) => match self.recipients.user_id_by_name(&name).await? {
                Some(id) => vec![id],
                None => {
                    tracing::debug!(user = %name, "No user account for notification recipient");
                    Vec::new()
                }
            },
        };

        let title = event.title();
        let message = event.message();
        let link = event.link();
        let mut delivered = 0;
        for user_id in targets {
            match self
                .notifier
                .notify(user_id, event.event_type(), &title, &message, &link)
                .await
            {
                Ok(()) => delivered += 1,
                Err(err) => tracing::warn!(
                    user_id,
                    event_type = event.event_type(),
                    "Failed to deliver notification: {}",
                    err
                ),
            }
        }
        Ok(delivered)
    }

    /// Run until every outbox sender is dropped
    pub async fn run(self, mut receiver: mpsc::Receiver<LedgerEvent>) {
        tracing::info!("Notification dispatcher started");
        while let Some(event) = receiver.recv().await {
            if let Err(err) = self.deliver(&event).await {
                tracing::warn!(
                    event_type = event.event_type(),
                    "Failed to resolve notification recipients: {}",
                    err
                );
            }
        }
        tracing::info!("Notification dispatcher stopped");
    }
}

/// Push gateway payload
#[derive(Debug, Serialize)]
struct PushPayload<'a> {
    user_id: i64,
    #[serde(rename = "type")]
    event_type: &'a str,
    title: &'a str,
    message: &'a str,
    link: &'a str,
}

/// Writes in-app notifications and optionally mirrors them to a push gateway
#[derive(Clone)]
pub struct PgNotifier {
    db: PgPool,
    push_gateway_url: Option<String>,
    http_client: reqwest::Client,
}

impl PgNotifier {
    pub fn new(db: PgPool, push_gateway_url: Option<String>) -> Self {
        Self {
            db,
            push_gateway_url,
            http_client: reqwest::Client::new(),
        }
    }

    async fn push(&self, url: &str, payload: &PushPayload<'_>) -> AppResult<()> {
        let response = self
            .http_client
            .post(url)
            .json(payload)
            .send()
            .await
            .map_err(|e| AppError::Internal(format!("Failed to reach push gateway: {}", e)))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(AppError::Internal(format!(
                "Push gateway returned {}",
                response.status()
            )))
        }
    }
}

#[async_trait]
impl Notifier for PgNotifier {
    async fn notify(
        &self,
        target_user_id: i64,
        event_type: &str,
        title: &str,
        message: &str,
        link: &str,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO notifications (user_id, type, title, message, link, read, created_at)
            VALUES ($1, $2, $3, $4, $5, FALSE, CURRENT_TIMESTAMP)
            "#,
        )
        .bind(target_user_id)
        .bind(event_type)
        .bind(title)
        .bind(message)
        .bind(link)
        .execute(&self.db)
        .await
        .map_err(map_db_error)?;

        if let Some(url) = &self.push_gateway_url {
            let payload = PushPayload {
                user_id: target_user_id,
                event_type,
                title,
                message,
                link,
            };
            // The in-app row is already stored; push is best-effort
            if let Err(err) = self.push(url, &payload).await {
                tracing::warn!(user_id = target_user_id, "Push delivery failed: {}", err);
            }
        }
        Ok(())
    }
}
