// Postgres persistence for the workflow entities. Internal to the engine crate.

use chrono::{DateTime, Utc};
use sqlx::PgConnection;
use uuid::Uuid;

use gatepass_common::{
    Decision, GatePassError, InwardPass, OutwardPass, RequestStatus, Result, User,
};

/// A row from the requests table.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestRow {
    pub id: Uuid,
    pub request_type_id: Uuid,
    pub initiator_id: Uuid,
    pub submitted_at: DateTime<Utc>,
    pub status: RequestStatus,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct RequestTypeRow {
    pub id: Uuid,
    pub name: String,
}

/// One position of a request type's approval chain, joined with the approver.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ChainEntryRow {
    pub approver_id: Uuid,
    pub approver_name: String,
    pub approver_email: String,
    pub sequence_number: i32,
}

/// An immutable decision record.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ApprovalRow {
    pub approver_id: Uuid,
    pub sequence_number: i32,
    pub decision: Decision,
    pub action_at: DateTime<Utc>,
    pub comments: Option<String>,
}

pub async fn request_type_by_name(
    conn: &mut PgConnection,
    name: &str,
) -> Result<Option<RequestTypeRow>> {
    let row = sqlx::query_as::<_, RequestTypeRow>(
        "SELECT id, name FROM request_types WHERE name = $1",
    )
    .bind(name)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

pub async fn request_type_by_id(
    conn: &mut PgConnection,
    id: Uuid,
) -> Result<Option<RequestTypeRow>> {
    let row =
        sqlx::query_as::<_, RequestTypeRow>("SELECT id, name FROM request_types WHERE id = $1")
            .bind(id)
            .fetch_optional(conn)
            .await?;

    Ok(row)
}

/// Lock the request row for the rest of the transaction. Serializes
/// concurrent decisions against the same request.
pub async fn lock_request(conn: &mut PgConnection, id: Uuid) -> Result<Option<RequestRow>> {
    let row = sqlx::query_as::<_, RequestRow>(
        r#"
        SELECT id, request_type_id, initiator_id, submitted_at, status
        FROM requests
        WHERE id = $1
        FOR UPDATE
        "#,
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

pub async fn insert_request(
    conn: &mut PgConnection,
    request_type_id: Uuid,
    initiator_id: Uuid,
) -> Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO requests (request_type_id, initiator_id)
        VALUES ($1, $2)
        RETURNING id
        "#,
    )
    .bind(request_type_id)
    .bind(initiator_id)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn insert_outward(
    conn: &mut PgConnection,
    request_id: Uuid,
    p: &OutwardPass,
) -> Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO outward_pass_records
            (request_id, recipient_name, date, purpose, serial_no, account_code,
             description, unit, quantity, department, priority, comment,
             attachment_path, to_be_returned)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING id
        "#,
    )
    .bind(request_id)
    .bind(&p.recipient_name)
    .bind(p.date)
    .bind(p.purpose)
    .bind(p.serial_no)
    .bind(&p.account_code)
    .bind(&p.description)
    .bind(&p.unit)
    .bind(p.quantity)
    .bind(&p.department)
    .bind(p.priority)
    .bind(&p.comment)
    .bind(&p.attachment_path)
    .bind(p.to_be_returned)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

pub async fn insert_inward(
    conn: &mut PgConnection,
    request_id: Uuid,
    p: &InwardPass,
) -> Result<Uuid> {
    let id = sqlx::query_scalar::<_, Uuid>(
        r#"
        INSERT INTO inward_pass_records
            (request_id, outward_pass_id, date, received_by, serial_no, account_code,
             description, unit, quantity, department, priority, comment,
             attachment_path, returned)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        RETURNING id
        "#,
    )
    .bind(request_id)
    .bind(p.outward_pass_id)
    .bind(p.date)
    .bind(&p.received_by)
    .bind(p.serial_no)
    .bind(&p.account_code)
    .bind(&p.description)
    .bind(&p.unit)
    .bind(p.quantity)
    .bind(&p.department)
    .bind(p.priority)
    .bind(&p.comment)
    .bind(&p.attachment_path)
    .bind(p.returned)
    .fetch_one(conn)
    .await?;

    Ok(id)
}

/// The full chain for a request type, ordered by position.
pub async fn chain_for_type(
    conn: &mut PgConnection,
    request_type_id: Uuid,
) -> Result<Vec<ChainEntryRow>> {
    let rows = sqlx::query_as::<_, ChainEntryRow>(
        r#"
        SELECT c.approver_id, u.name AS approver_name, u.email AS approver_email,
               c.sequence_number
        FROM approval_chains c
        JOIN users u ON u.id = c.approver_id
        WHERE c.request_type_id = $1
        ORDER BY c.sequence_number ASC
        "#,
    )
    .bind(request_type_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

pub async fn approvals_for(conn: &mut PgConnection, request_id: Uuid) -> Result<Vec<ApprovalRow>> {
    let rows = sqlx::query_as::<_, ApprovalRow>(
        r#"
        SELECT approver_id, sequence_number, decision, action_at, comments
        FROM request_approvals
        WHERE request_id = $1
        ORDER BY sequence_number ASC
        "#,
    )
    .bind(request_id)
    .fetch_all(conn)
    .await?;

    Ok(rows)
}

/// Append the decision record. The unique constraint on
/// (request_id, sequence_number) is the authoritative duplicate guard;
/// a violation surfaces as Conflict, not as an internal error.
pub async fn insert_approval(
    conn: &mut PgConnection,
    request_id: Uuid,
    approver_id: Uuid,
    sequence_number: i32,
    decision: Decision,
    comments: Option<&str>,
) -> Result<()> {
    let result = sqlx::query(
        r#"
        INSERT INTO request_approvals
            (request_id, approver_id, sequence_number, decision, comments)
        VALUES ($1, $2, $3, $4, $5)
        "#,
    )
    .bind(request_id)
    .bind(approver_id)
    .bind(sequence_number)
    .bind(decision)
    .bind(comments)
    .execute(conn)
    .await;

    match result {
        Ok(_) => Ok(()),
        Err(sqlx::Error::Database(db)) if db.is_unique_violation() => Err(
            GatePassError::Conflict("a decision already exists for this chain position".into()),
        ),
        Err(e) => Err(e.into()),
    }
}

pub async fn set_status(
    conn: &mut PgConnection,
    request_id: Uuid,
    status: RequestStatus,
) -> Result<()> {
    sqlx::query("UPDATE requests SET status = $2 WHERE id = $1")
        .bind(request_id)
        .bind(status)
        .execute(conn)
        .await?;

    Ok(())
}

pub async fn user_by_id(conn: &mut PgConnection, id: Uuid) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id, name, email, created_at FROM users WHERE id = $1",
    )
    .bind(id)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

pub async fn user_by_email(conn: &mut PgConnection, email: &str) -> Result<Option<User>> {
    let row = sqlx::query_as::<_, User>(
        "SELECT id, name, email, created_at FROM users WHERE email = $1",
    )
    .bind(email)
    .fetch_optional(conn)
    .await?;

    Ok(row)
}

/// Upsert by email: each successful login refreshes the display name.
pub async fn upsert_user(conn: &mut PgConnection, name: &str, email: &str) -> Result<User> {
    let row = sqlx::query_as::<_, User>(
        r#"
        INSERT INTO users (name, email)
        VALUES ($1, $2)
        ON CONFLICT (email) DO UPDATE SET name = EXCLUDED.name
        RETURNING id, name, email, created_at
        "#,
    )
    .bind(name)
    .bind(email)
    .fetch_one(conn)
    .await?;

    Ok(row)
}

pub async fn is_admin(conn: &mut PgConnection, user_id: Uuid) -> Result<bool> {
    let found = sqlx::query_scalar::<_, i32>("SELECT 1 FROM admins WHERE user_id = $1 LIMIT 1")
        .bind(user_id)
        .fetch_optional(conn)
        .await?;

    Ok(found.is_some())
}

pub async fn delete_chain(conn: &mut PgConnection, request_type_id: Uuid) -> Result<u64> {
    let result = sqlx::query("DELETE FROM approval_chains WHERE request_type_id = $1")
        .bind(request_type_id)
        .execute(conn)
        .await?;

    Ok(result.rows_affected())
}

pub async fn insert_chain_entry(
    conn: &mut PgConnection,
    request_type_id: Uuid,
    approver_id: Uuid,
    sequence_number: i32,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO approval_chains (request_type_id, approver_id, sequence_number)
        VALUES ($1, $2, $3)
        "#,
    )
    .bind(request_type_id)
    .bind(approver_id)
    .bind(sequence_number)
    .execute(conn)
    .await?;

    Ok(())
}

/// True when every id in the slice names an existing user.
pub async fn users_exist(conn: &mut PgConnection, ids: &[Uuid]) -> Result<bool> {
    let mut distinct: Vec<Uuid> = ids.to_vec();
    distinct.sort_unstable();
    distinct.dedup();

    let count = sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE id = ANY($1)")
        .bind(&distinct)
        .fetch_one(conn)
        .await?;

    Ok(count == distinct.len() as i64)
}
