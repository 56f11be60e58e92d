use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{GatePassError, Result};

// --- Identity ---

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

// --- Workflow enums ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum RequestStatus {
    Pending,
    Approved,
    Rejected,
}

impl std::fmt::Display for RequestStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequestStatus::Pending => write!(f, "Pending"),
            RequestStatus::Approved => write!(f, "Approved"),
            RequestStatus::Rejected => write!(f, "Rejected"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Decision {
    Approved,
    Rejected,
}

impl std::fmt::Display for Decision {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Decision::Approved => write!(f, "Approved"),
            Decision::Rejected => write!(f, "Rejected"),
        }
    }
}

// --- Pass payload enums (field sets from the plant gate-pass forms) ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Purpose {
    Refilling,
    Sample,
    Returned,
    Sold,
    Transferred,
    Rejected,
    Repair,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
pub enum Priority {
    Medium,
    High,
    Critical,
}

// --- Pass payload ---

/// The domain record attached 1:1 to a request, resolved to its variant once
/// at creation time and carried explicitly from then on.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum PassPayload {
    Outward(OutwardPass),
    Inward(InwardPass),
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct OutwardPass {
    pub recipient_name: String,
    pub date: DateTime<Utc>,
    pub purpose: Purpose,
    pub serial_no: Option<i32>,
    pub account_code: Option<String>,
    pub description: Option<String>,
    pub unit: String,
    pub quantity: i32,
    pub department: String,
    pub priority: Priority,
    pub comment: Option<String>,
    pub attachment_path: Option<String>,
    #[serde(default)]
    pub to_be_returned: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, sqlx::FromRow)]
pub struct InwardPass {
    /// Back-link to the outward pass this material is returning against.
    pub outward_pass_id: Option<Uuid>,
    pub date: DateTime<Utc>,
    pub received_by: String,
    pub serial_no: Option<i32>,
    pub account_code: Option<String>,
    pub description: Option<String>,
    pub unit: String,
    pub quantity: i32,
    pub department: String,
    pub priority: Priority,
    pub comment: Option<String>,
    pub attachment_path: Option<String>,
    #[serde(default)]
    pub returned: bool,
}

impl PassPayload {
    /// The request-type name this payload shape belongs to.
    pub fn kind(&self) -> &'static str {
        match self {
            PassPayload::Outward(_) => "outward",
            PassPayload::Inward(_) => "inward",
        }
    }

    /// Field-level validation beyond what deserialization enforces.
    pub fn validate(&self) -> Result<()> {
        match self {
            PassPayload::Outward(p) => {
                require_text("recipient_name", &p.recipient_name)?;
                require_text("unit", &p.unit)?;
                require_text("department", &p.department)?;
                require_positive("quantity", p.quantity)?;
            }
            PassPayload::Inward(p) => {
                require_text("received_by", &p.received_by)?;
                require_text("unit", &p.unit)?;
                require_text("department", &p.department)?;
                require_positive("quantity", p.quantity)?;
            }
        }
        Ok(())
    }
}

fn require_text(field: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(GatePassError::Validation(format!("{field} is required")));
    }
    Ok(())
}

fn require_positive(field: &str, value: i32) -> Result<()> {
    if value <= 0 {
        return Err(GatePassError::Validation(format!(
            "{field} must be positive"
        )));
    }
    Ok(())
}

// --- Projection views ---

#[derive(Debug, Clone, Serialize)]
pub struct RequestTypeView {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct ChainEntryView {
    pub approver_id: Uuid,
    pub approver_name: String,
    pub approver_email: String,
    pub sequence_number: i32,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestView {
    pub request_id: Uuid,
    pub request_type: String,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    pub payload: PassPayload,
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct DecisionView {
    pub approver_name: String,
    pub sequence_number: i32,
    pub decision: Decision,
    pub action_at: DateTime<Utc>,
    pub comments: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct RequestDetail {
    pub request_id: Uuid,
    pub request_type: String,
    pub status: RequestStatus,
    pub submitted_at: DateTime<Utc>,
    pub initiator_name: String,
    pub payload: PassPayload,
    pub decisions: Vec<DecisionView>,
}

#[derive(Debug, Clone, Copy, Default, Serialize, sqlx::FromRow)]
pub struct RequestCounts {
    pub total: i64,
    pub approved: i64,
    pub pending: i64,
    pub rejected: i64,
}

/// Result of creating a request: the workflow row and its payload row.
#[derive(Debug, Clone, Copy, Serialize)]
pub struct CreatedRequest {
    pub request_id: Uuid,
    pub record_id: Uuid,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn outward() -> PassPayload {
        PassPayload::Outward(OutwardPass {
            recipient_name: "Acme Forwarding".to_string(),
            date: Utc::now(),
            purpose: Purpose::Sample,
            serial_no: Some(42),
            account_code: None,
            description: Some("Two crates of test fittings".to_string()),
            unit: "crate".to_string(),
            quantity: 2,
            department: "Stores".to_string(),
            priority: Priority::Medium,
            comment: None,
            attachment_path: None,
            to_be_returned: true,
        })
    }

    #[test]
    fn valid_outward_passes() {
        assert!(outward().validate().is_ok());
    }

    #[test]
    fn rejects_zero_quantity() {
        let PassPayload::Outward(mut p) = outward() else {
            unreachable!()
        };
        p.quantity = 0;
        let err = PassPayload::Outward(p).validate().unwrap_err();
        assert!(matches!(err, GatePassError::Validation(_)));
    }

    #[test]
    fn rejects_blank_recipient() {
        let PassPayload::Outward(mut p) = outward() else {
            unreachable!()
        };
        p.recipient_name = "   ".to_string();
        assert!(PassPayload::Outward(p).validate().is_err());
    }

    #[test]
    fn kind_matches_variant() {
        assert_eq!(outward().kind(), "outward");
    }

    #[test]
    fn payload_round_trips_with_tag() {
        let json = serde_json::to_value(outward()).unwrap();
        assert_eq!(json["kind"], "outward");
        let back: PassPayload = serde_json::from_value(json).unwrap();
        assert_eq!(back.kind(), "outward");
    }

    #[test]
    fn unknown_purpose_is_rejected() {
        let mut json = serde_json::to_value(outward()).unwrap();
        json["purpose"] = serde_json::json!("Borrowed");
        assert!(serde_json::from_value::<PassPayload>(json).is_err());
    }
}
