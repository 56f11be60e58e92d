//! Request creation and the decision transition. Both run as a single
//! explicit transaction; mail goes out only after commit.

use tracing::info;
use uuid::Uuid;

use gatepass_common::{
    CreatedRequest, Decision, GatePassError, PassPayload, RequestStatus, Result, User,
};
use gatepass_notify::OutboundMail;

use crate::planner::{self, DecisionPlan};
use crate::{store, templates, ApprovalEngine};

impl ApprovalEngine {
    /// Create a request with its payload row and notify the chain's first
    /// position. A type with no configured chain still accepts the request;
    /// it just sits unapprovable until a chain exists.
    pub async fn create_request(
        &self,
        initiator: &User,
        type_name: &str,
        payload: PassPayload,
    ) -> Result<CreatedRequest> {
        if payload.kind() != type_name {
            return Err(GatePassError::Validation(format!(
                "payload shape does not match request type {type_name}"
            )));
        }
        payload.validate()?;

        let mut tx = self.pool().begin().await?;

        let request_type = store::request_type_by_name(&mut tx, type_name)
            .await?
            .ok_or_else(|| GatePassError::NotFound(format!("request type {type_name}")))?;

        let request_id = store::insert_request(&mut tx, request_type.id, initiator.id).await?;
        let record_id = match &payload {
            PassPayload::Outward(p) => store::insert_outward(&mut tx, request_id, p).await?,
            PassPayload::Inward(p) => store::insert_inward(&mut tx, request_id, p).await?,
        };

        let chain = store::chain_for_type(&mut tx, request_type.id).await?;
        let mut mails = Vec::new();
        if let Some(first) = chain.iter().find(|c| c.sequence_number == 1) {
            mails.push(templates::approval_requested(
                first,
                &initiator.name,
                type_name,
                request_id,
                self.base_url(),
            ));
        }

        tx.commit().await?;
        self.dispatch(mails);

        info!(request_id = %request_id, request_type = type_name, "Request created");
        Ok(CreatedRequest {
            request_id,
            record_id,
        })
    }

    /// Record one approver's decision and advance or terminate the workflow.
    ///
    /// The request row is locked first; everything that follows — the status
    /// gate, position resolution, the duplicate-decision check and insert —
    /// happens under that lock. Any error path drops the transaction, which
    /// rolls it back.
    pub async fn decide(
        &self,
        actor: &User,
        request_id: Uuid,
        decision: Decision,
        comments: Option<String>,
    ) -> Result<RequestStatus> {
        let mut tx = self.pool().begin().await?;

        let request = store::lock_request(&mut tx, request_id)
            .await?
            .ok_or_else(|| GatePassError::NotFound(format!("request {request_id}")))?;

        if request.status != RequestStatus::Pending {
            return Err(GatePassError::Conflict("request already processed".into()));
        }

        let request_type = store::request_type_by_id(&mut tx, request.request_type_id)
            .await?
            .ok_or_else(|| GatePassError::Internal("request type row missing".into()))?;
        let chain = store::chain_for_type(&mut tx, request.request_type_id).await?;
        let prior = store::approvals_for(&mut tx, request_id).await?;

        let sequence_number = planner::resolve_position(&chain, &prior, actor.id)?;
        let plan = planner::plan_decision(&chain, sequence_number, decision);

        store::insert_approval(
            &mut tx,
            request_id,
            actor.id,
            sequence_number,
            decision,
            comments.as_deref(),
        )
        .await?;

        if plan.new_status != RequestStatus::Pending {
            store::set_status(&mut tx, request_id, plan.new_status).await?;
        }

        let initiator = store::user_by_id(&mut tx, request.initiator_id)
            .await?
            .ok_or_else(|| GatePassError::Internal("request initiator row missing".into()))?;

        let mails = self.decision_mails(
            &plan,
            decision,
            &initiator,
            &actor.name,
            &request_type.name,
            request_id,
            comments.as_deref(),
        );

        tx.commit().await?;
        self.dispatch(mails);

        info!(
            request_id = %request_id,
            position = sequence_number,
            decision = %decision,
            status = %plan.new_status,
            "Decision recorded"
        );
        Ok(plan.new_status)
    }

    /// The initiator hears about every decision; approvals also alert the
    /// next position, rejections the preceding one.
    #[allow(clippy::too_many_arguments)]
    fn decision_mails(
        &self,
        plan: &DecisionPlan,
        decision: Decision,
        initiator: &User,
        actor_name: &str,
        type_name: &str,
        request_id: Uuid,
        comments: Option<&str>,
    ) -> Vec<OutboundMail> {
        let mut mails = Vec::new();
        match decision {
            Decision::Approved => {
                if let Some(next) = &plan.notify_next {
                    mails.push(templates::approval_requested(
                        next,
                        &initiator.name,
                        type_name,
                        request_id,
                        self.base_url(),
                    ));
                }
                mails.push(if plan.new_status == RequestStatus::Approved {
                    templates::request_approved(initiator, type_name, request_id, self.base_url())
                } else {
                    templates::approval_progress(
                        initiator,
                        actor_name,
                        type_name,
                        request_id,
                        self.base_url(),
                    )
                });
            }
            Decision::Rejected => {
                mails.push(templates::request_rejected(
                    initiator,
                    actor_name,
                    type_name,
                    request_id,
                    comments,
                    self.base_url(),
                ));
                if let Some(previous) = &plan.notify_previous {
                    mails.push(templates::downstream_rejection(
                        previous,
                        actor_name,
                        type_name,
                        request_id,
                        comments,
                        self.base_url(),
                    ));
                }
            }
        }
        mails
    }
}
