//! Stock request workflow models
//!
//! A stock request is a demand claim raised by a work order. It moves
//! `pending -> approved -> fulfilled` or `pending -> rejected`; `rejected`
//! and `fulfilled` are terminal.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// A demand claim against inventory
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct StockRequest {
    pub id: Uuid,
    /// Human-readable request identifier (e.g., "REQ-1718000000-A1B2C3")
    pub request_code: String,
    pub work_order_id: i64,
    pub item_id: Uuid,
    pub quantity: Decimal,
    pub warehouse_id: Option<i64>,
    pub status: RequestStatus,
    pub requested_by: String,
    pub approved_by: Option<String>,
    pub approved_at: Option<DateTime<Utc>>,
    pub rejected_by: Option<String>,
    pub rejected_at: Option<DateTime<Utc>>,
    pub rejection_reason: Option<String>,
    pub fulfilled_at: Option<DateTime<Utc>>,
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StockRequest {
    /// Move to `approved`, recording the approver
    pub fn approve(
        &mut self,
        approver: &str,
        notes: Option<String>,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.status = self.status.next(WorkflowAction::Approve)?;
        self.approved_by = Some(approver.to_string());
        self.approved_at = Some(now);
        if notes.is_some() {
            self.notes = notes;
        }
        self.updated_at = now;
        Ok(())
    }

    /// Move to `rejected`, recording who rejected it and why
    pub fn reject(
        &mut self,
        rejecter: &str,
        reason: &str,
        now: DateTime<Utc>,
    ) -> Result<(), TransitionError> {
        self.status = self.status.next(WorkflowAction::Reject)?;
        self.rejected_by = Some(rejecter.to_string());
        self.rejected_at = Some(now);
        self.rejection_reason = Some(reason.to_string());
        self.updated_at = now;
        Ok(())
    }

    /// Move to `fulfilled`
    pub fn fulfill(&mut self, now: DateTime<Utc>) -> Result<(), TransitionError> {
        self.status = self.status.next(WorkflowAction::Fulfill)?;
        self.fulfilled_at = Some(now);
        self.updated_at = now;
        Ok(())
    }
}

/// Request workflow status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum RequestStatus {
    #[default]
    Pending,
    Approved,
    Rejected,
    Fulfilled,
}

/// Actions that drive the request state machine
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkflowAction {
    Approve,
    Reject,
    Fulfill,
}

impl WorkflowAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            WorkflowAction::Approve => "approve",
            WorkflowAction::Reject => "reject",
            WorkflowAction::Fulfill => "fulfill",
        }
    }

    /// The only status this action may start from
    pub fn source_status(&self) -> RequestStatus {
        match self {
            WorkflowAction::Approve | WorkflowAction::Reject => RequestStatus::Pending,
            WorkflowAction::Fulfill => RequestStatus::Approved,
        }
    }

    pub fn target_status(&self) -> RequestStatus {
        match self {
            WorkflowAction::Approve => RequestStatus::Approved,
            WorkflowAction::Reject => RequestStatus::Rejected,
            WorkflowAction::Fulfill => RequestStatus::Fulfilled,
        }
    }
}

/// A workflow action attempted from the wrong state
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransitionError {
    pub action: WorkflowAction,
    pub from: RequestStatus,
    pub required: RequestStatus,
}

impl std::fmt::Display for TransitionError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Only {} stock requests can be {} (current status: {})",
            self.required,
            self.action.target_status(),
            self.from
        )
    }
}

impl std::error::Error for TransitionError {}

impl RequestStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RequestStatus::Pending => "pending",
            RequestStatus::Approved => "approved",
            RequestStatus::Rejected => "rejected",
            RequestStatus::Fulfilled => "fulfilled",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "pending" => Some(RequestStatus::Pending),
            "approved" => Some(RequestStatus::Approved),
            "rejected" => Some(RequestStatus::Rejected),
            "fulfilled" => Some(RequestStatus::Fulfilled),
            _ => None,
        }
    }

    /// Status reached by applying `action`, if legal from here
    pub fn next(self, action: WorkflowAction) -> Result<RequestStatus, TransitionError> {
        let required = action.source_status();
        if self == required {
            Ok(action.target_status())
        } else {
            Err(TransitionError {
                action,
                from: self,
                required,
            })
        }
    }
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
