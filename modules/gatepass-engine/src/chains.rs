//! Approval-chain administration. Chains are replaced wholesale, never
//! patched: the old rows go, the new list comes in at positions 1..=N.

use tracing::info;
use uuid::Uuid;

use gatepass_common::{ChainEntryView, GatePassError, Result, User};

use crate::{store, ApprovalEngine};

impl ApprovalEngine {
    /// Replace the chain for a request type with the given ordered approver
    /// list. Position in the list becomes the sequence number; repeating a
    /// user gives them two positions, which is allowed.
    pub async fn set_chain(
        &self,
        actor: &User,
        request_type_id: Uuid,
        approver_ids: &[Uuid],
    ) -> Result<()> {
        let mut tx = self.pool().begin().await?;

        if !store::is_admin(&mut tx, actor.id).await? {
            return Err(GatePassError::Forbidden(
                "chain configuration requires admin access".into(),
            ));
        }

        if approver_ids.is_empty() {
            return Err(GatePassError::Validation(
                "approver list must not be empty".into(),
            ));
        }

        store::request_type_by_id(&mut tx, request_type_id)
            .await?
            .ok_or_else(|| GatePassError::NotFound(format!("request type {request_type_id}")))?;

        if !store::users_exist(&mut tx, approver_ids).await? {
            return Err(GatePassError::Validation(
                "approver list references unknown users".into(),
            ));
        }

        store::delete_chain(&mut tx, request_type_id).await?;
        for (index, approver_id) in approver_ids.iter().enumerate() {
            store::insert_chain_entry(&mut tx, request_type_id, *approver_id, index as i32 + 1)
                .await?;
        }

        tx.commit().await?;

        info!(
            request_type_id = %request_type_id,
            positions = approver_ids.len(),
            "Approval chain replaced"
        );
        Ok(())
    }

    /// The configured chain for a request type, in order, with approver names.
    pub async fn chain_for_type(&self, request_type_id: Uuid) -> Result<Vec<ChainEntryView>> {
        let mut conn = self.pool().acquire().await?;

        store::request_type_by_id(&mut conn, request_type_id)
            .await?
            .ok_or_else(|| GatePassError::NotFound(format!("request type {request_type_id}")))?;

        let rows = store::chain_for_type(&mut conn, request_type_id).await?;
        Ok(rows
            .into_iter()
            .map(|r| ChainEntryView {
                approver_id: r.approver_id,
                approver_name: r.approver_name,
                approver_email: r.approver_email,
                sequence_number: r.sequence_number,
            })
            .collect())
    }
}
