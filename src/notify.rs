// Copyright (c) 2025 - Cowboy AI, Inc.
//! Notification Port
//!
//! Outcome notifications to requesters. Delivery is best-effort and never
//! participates in command handling: a failed notification is logged, the
//! decision events are already persisted.

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

use crate::domain::{VmName, VmRequestId};

/// Notification delivery error
#[derive(Debug, Clone, Error)]
#[error("notification failed: {0}")]
pub struct NotifyError(pub String);

/// Approval outcome notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApprovalNotice {
    pub request_id: VmRequestId,
    pub vm_name: VmName,
    pub recipient: String,

    /// Rule name when policy approved, None for a human decision
    pub auto_approved_by_rule: Option<String>,
}

/// Rejection outcome notice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RejectionNotice {
    pub request_id: VmRequestId,
    pub vm_name: VmName,
    pub recipient: String,
    pub reason: String,
}

/// Port for delivering outcome notifications
#[async_trait]
pub trait NotificationPort: Send + Sync {
    async fn send_approved(&self, notice: ApprovalNotice) -> Result<(), NotifyError>;

    async fn send_rejected(&self, notice: RejectionNotice) -> Result<(), NotifyError>;
}

/// Notifier that writes to the structured log instead of a mail gateway
#[derive(Debug, Default)]
pub struct LoggingNotifier;

#[async_trait]
impl NotificationPort for LoggingNotifier {
    async fn send_approved(&self, notice: ApprovalNotice) -> Result<(), NotifyError> {
        info!(
            request_id = %notice.request_id,
            vm_name = %notice.vm_name,
            recipient = %notice.recipient,
            rule = notice.auto_approved_by_rule.as_deref(),
            "request approved"
        );
        Ok(())
    }

    async fn send_rejected(&self, notice: RejectionNotice) -> Result<(), NotifyError> {
        info!(
            request_id = %notice.request_id,
            vm_name = %notice.vm_name,
            recipient = %notice.recipient,
            reason = %notice.reason,
            "request rejected"
        );
        Ok(())
    }
}
