//! Read-only projections over the workflow state. No invariants of their
//! own; reads are not linearized against in-flight decisions.

use chrono::{DateTime, Utc};
use uuid::Uuid;

use gatepass_common::{
    DecisionView, GatePassError, InwardPass, OutwardPass, PassPayload, RequestCounts,
    RequestDetail, RequestStatus, RequestTypeView, RequestView, Result, User,
};

use crate::{store, ApprovalEngine};

#[derive(Debug, Clone, sqlx::FromRow)]
struct RequestListRow {
    request_id: Uuid,
    request_type: String,
    status: RequestStatus,
    submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
struct DetailRow {
    request_id: Uuid,
    request_type: String,
    status: RequestStatus,
    submitted_at: DateTime<Utc>,
    initiator_name: String,
}

impl ApprovalEngine {
    pub async fn list_request_types(&self) -> Result<Vec<RequestTypeView>> {
        let rows = sqlx::query_as::<_, store::RequestTypeRow>(
            "SELECT id, name FROM request_types ORDER BY name ASC",
        )
        .fetch_all(self.pool())
        .await?;

        Ok(rows
            .into_iter()
            .map(|r| RequestTypeView {
                id: r.id,
                name: r.name,
            })
            .collect())
    }

    pub async fn is_admin(&self, user_id: Uuid) -> Result<bool> {
        let mut conn = self.pool().acquire().await?;
        store::is_admin(&mut conn, user_id).await
    }

    pub async fn upsert_user(&self, name: &str, email: &str) -> Result<User> {
        let mut conn = self.pool().acquire().await?;
        store::upsert_user(&mut conn, name, email).await
    }

    pub async fn user_by_email(&self, email: &str) -> Result<Option<User>> {
        let mut conn = self.pool().acquire().await?;
        store::user_by_email(&mut conn, email).await
    }

    /// Everything this user has submitted, newest first.
    pub async fn list_my_requests(&self, user_id: Uuid) -> Result<Vec<RequestView>> {
        let rows = sqlx::query_as::<_, RequestListRow>(
            r#"
            SELECT r.id AS request_id, t.name AS request_type, r.status, r.submitted_at
            FROM requests r
            JOIN request_types t ON t.id = r.request_type_id
            WHERE r.initiator_id = $1
            ORDER BY r.submitted_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        self.enrich(rows).await
    }

    /// Dashboard counters over this user's submissions.
    pub async fn my_request_counts(&self, user_id: Uuid) -> Result<RequestCounts> {
        let counts = sqlx::query_as::<_, RequestCounts>(
            r#"
            SELECT COUNT(*) AS total,
                   COUNT(*) FILTER (WHERE status = 'Approved') AS approved,
                   COUNT(*) FILTER (WHERE status = 'Pending') AS pending,
                   COUNT(*) FILTER (WHERE status = 'Rejected') AS rejected
            FROM requests
            WHERE initiator_id = $1
            "#,
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(counts)
    }

    /// Requests this user could decide on right now: still pending, the user
    /// holds a chain position for the type, and that position has not acted.
    pub async fn list_pending_approvals(&self, user_id: Uuid) -> Result<Vec<RequestView>> {
        let rows = sqlx::query_as::<_, RequestListRow>(
            r#"
            SELECT DISTINCT r.id AS request_id, t.name AS request_type,
                   r.status, r.submitted_at
            FROM requests r
            JOIN request_types t ON t.id = r.request_type_id
            JOIN approval_chains c
                ON c.request_type_id = r.request_type_id AND c.approver_id = $1
            WHERE r.status = 'Pending'
              AND NOT EXISTS (
                  SELECT 1 FROM request_approvals a
                  WHERE a.request_id = r.id
                    AND a.sequence_number = c.sequence_number
              )
            ORDER BY r.submitted_at DESC
            "#,
        )
        .bind(user_id)
        .fetch_all(self.pool())
        .await?;

        self.enrich(rows).await
    }

    /// One request with payload, initiator name, and its decision history.
    pub async fn request_detail(&self, request_id: Uuid) -> Result<RequestDetail> {
        let head = sqlx::query_as::<_, DetailRow>(
            r#"
            SELECT r.id AS request_id, t.name AS request_type, r.status,
                   r.submitted_at, u.name AS initiator_name
            FROM requests r
            JOIN request_types t ON t.id = r.request_type_id
            JOIN users u ON u.id = r.initiator_id
            WHERE r.id = $1
            "#,
        )
        .bind(request_id)
        .fetch_optional(self.pool())
        .await?
        .ok_or_else(|| GatePassError::NotFound(format!("request {request_id}")))?;

        let decisions = sqlx::query_as::<_, DecisionView>(
            r#"
            SELECT u.name AS approver_name, a.sequence_number, a.decision,
                   a.action_at, a.comments
            FROM request_approvals a
            JOIN users u ON u.id = a.approver_id
            WHERE a.request_id = $1
            ORDER BY a.sequence_number ASC
            "#,
        )
        .bind(request_id)
        .fetch_all(self.pool())
        .await?;

        let payload = self.load_payload(head.request_id, &head.request_type).await?;

        Ok(RequestDetail {
            request_id: head.request_id,
            request_type: head.request_type,
            status: head.status,
            submitted_at: head.submitted_at,
            initiator_name: head.initiator_name,
            payload,
            decisions,
        })
    }

    async fn enrich(&self, rows: Vec<RequestListRow>) -> Result<Vec<RequestView>> {
        let mut out = Vec::with_capacity(rows.len());
        for row in rows {
            let payload = self.load_payload(row.request_id, &row.request_type).await?;
            out.push(RequestView {
                request_id: row.request_id,
                request_type: row.request_type,
                status: row.status,
                submitted_at: row.submitted_at,
                payload,
            });
        }
        Ok(out)
    }

    async fn load_payload(&self, request_id: Uuid, type_name: &str) -> Result<PassPayload> {
        match type_name {
            "outward" => {
                let record = sqlx::query_as::<_, OutwardPass>(
                    r#"
                    SELECT recipient_name, date, purpose, serial_no, account_code,
                           description, unit, quantity, department, priority,
                           comment, attachment_path, to_be_returned
                    FROM outward_pass_records
                    WHERE request_id = $1
                    "#,
                )
                .bind(request_id)
                .fetch_optional(self.pool())
                .await?
                .ok_or_else(|| {
                    GatePassError::Internal(format!(
                        "outward record missing for request {request_id}"
                    ))
                })?;
                Ok(PassPayload::Outward(record))
            }
            "inward" => {
                let record = sqlx::query_as::<_, InwardPass>(
                    r#"
                    SELECT outward_pass_id, date, received_by, serial_no, account_code,
                           description, unit, quantity, department, priority,
                           comment, attachment_path, returned
                    FROM inward_pass_records
                    WHERE request_id = $1
                    "#,
                )
                .bind(request_id)
                .fetch_optional(self.pool())
                .await?
                .ok_or_else(|| {
                    GatePassError::Internal(format!(
                        "inward record missing for request {request_id}"
                    ))
                })?;
                Ok(PassPayload::Inward(record))
            }
            other => Err(GatePassError::Internal(format!(
                "no payload table for request type {other}"
            ))),
        }
    }
}
