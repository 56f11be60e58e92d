//! The decision state machine, free of I/O. The lifecycle module loads the
//! chain and prior decisions under the request row lock, asks this module
//! what the transition means, then applies it.

use uuid::Uuid;

use gatepass_common::{Decision, GatePassError, RequestStatus, Result};

use crate::store::{ApprovalRow, ChainEntryRow};

/// The computed effect of one decision: which position acted, the resulting
/// request status, and who gets told about it.
#[derive(Debug, Clone)]
pub struct DecisionPlan {
    pub sequence_number: i32,
    pub new_status: RequestStatus,
    /// On approval: the occupant of the next position, if the chain has one.
    pub notify_next: Option<ChainEntryRow>,
    /// On rejection: the occupant of the preceding position, if any, told
    /// that a downstream rejection occurred.
    pub notify_previous: Option<ChainEntryRow>,
}

/// Resolve the chain position this actor is deciding for.
///
/// An actor may occupy several positions (chain configuration permits
/// duplicates); the decision lands on their lowest position that has not yet
/// recorded one. No position at all is Forbidden; all positions already
/// decided is Conflict.
pub fn resolve_position(
    chain: &[ChainEntryRow],
    prior: &[ApprovalRow],
    actor_id: Uuid,
) -> Result<i32> {
    let mut positions: Vec<i32> = chain
        .iter()
        .filter(|c| c.approver_id == actor_id)
        .map(|c| c.sequence_number)
        .collect();
    positions.sort_unstable();

    if positions.is_empty() {
        return Err(GatePassError::Forbidden(
            "not an approver for this request type".into(),
        ));
    }

    positions
        .into_iter()
        .find(|seq| !prior.iter().any(|a| a.sequence_number == *seq))
        .ok_or_else(|| GatePassError::Conflict("already acted on this request".into()))
}

/// Compute the transition for a decision at the given position.
///
/// Approval at the chain's last position completes the request; anywhere
/// else it stays Pending and the next position is notified. Rejection is
/// terminal from any position.
pub fn plan_decision(chain: &[ChainEntryRow], sequence_number: i32, decision: Decision) -> DecisionPlan {
    let last = chain.iter().map(|c| c.sequence_number).max().unwrap_or(0);

    match decision {
        Decision::Approved => DecisionPlan {
            sequence_number,
            new_status: if sequence_number == last {
                RequestStatus::Approved
            } else {
                RequestStatus::Pending
            },
            notify_next: slot_at(chain, sequence_number + 1),
            notify_previous: None,
        },
        Decision::Rejected => DecisionPlan {
            sequence_number,
            new_status: RequestStatus::Rejected,
            notify_next: None,
            notify_previous: slot_at(chain, sequence_number - 1),
        },
    }
}

fn slot_at(chain: &[ChainEntryRow], sequence_number: i32) -> Option<ChainEntryRow> {
    chain
        .iter()
        .find(|c| c.sequence_number == sequence_number)
        .cloned()
}

#[cfg(test)]
mod tests {
    use chrono::Utc;

    use super::*;

    fn slot(name: &str, seq: i32) -> ChainEntryRow {
        slot_for(Uuid::new_v4(), name, seq)
    }

    fn slot_for(id: Uuid, name: &str, seq: i32) -> ChainEntryRow {
        ChainEntryRow {
            approver_id: id,
            approver_name: name.to_string(),
            approver_email: format!("{}@plant.example", name.to_lowercase()),
            sequence_number: seq,
        }
    }

    fn approval_at(seq: i32, decision: Decision) -> ApprovalRow {
        ApprovalRow {
            approver_id: Uuid::new_v4(),
            sequence_number: seq,
            decision,
            action_at: Utc::now(),
            comments: None,
        }
    }

    // --- resolve_position ---

    #[test]
    fn stranger_is_forbidden() {
        let chain = vec![slot("Alice", 1), slot("Bob", 2)];
        let err = resolve_position(&chain, &[], Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, GatePassError::Forbidden(_)));
    }

    #[test]
    fn member_resolves_to_own_position() {
        let bob = Uuid::new_v4();
        let chain = vec![slot("Alice", 1), slot_for(bob, "Bob", 2)];
        assert_eq!(resolve_position(&chain, &[], bob).unwrap(), 2);
    }

    #[test]
    fn second_decision_from_same_position_conflicts() {
        let alice = Uuid::new_v4();
        let chain = vec![slot_for(alice, "Alice", 1), slot("Bob", 2)];
        let prior = vec![approval_at(1, Decision::Approved)];
        let err = resolve_position(&chain, &prior, alice).unwrap_err();
        assert!(matches!(err, GatePassError::Conflict(_)));
    }

    #[test]
    fn duplicate_approver_advances_to_next_open_position() {
        let alice = Uuid::new_v4();
        let chain = vec![
            slot_for(alice, "Alice", 1),
            slot("Bob", 2),
            slot_for(alice, "Alice", 3),
        ];
        assert_eq!(resolve_position(&chain, &[], alice).unwrap(), 1);

        let prior = vec![approval_at(1, Decision::Approved)];
        assert_eq!(resolve_position(&chain, &prior, alice).unwrap(), 3);

        let prior = vec![
            approval_at(1, Decision::Approved),
            approval_at(3, Decision::Approved),
        ];
        assert!(matches!(
            resolve_position(&chain, &prior, alice).unwrap_err(),
            GatePassError::Conflict(_)
        ));
    }

    // --- plan_decision: approvals ---

    #[test]
    fn mid_chain_approval_stays_pending_and_notifies_next() {
        let chain = vec![slot("Alice", 1), slot("Bob", 2)];
        let plan = plan_decision(&chain, 1, Decision::Approved);
        assert_eq!(plan.new_status, RequestStatus::Pending);
        assert_eq!(
            plan.notify_next.as_ref().map(|s| s.sequence_number),
            Some(2)
        );
        assert!(plan.notify_previous.is_none());
    }

    #[test]
    fn last_position_approval_completes_the_request() {
        let chain = vec![slot("Alice", 1), slot("Bob", 2)];
        let plan = plan_decision(&chain, 2, Decision::Approved);
        assert_eq!(plan.new_status, RequestStatus::Approved);
        assert!(plan.notify_next.is_none());
    }

    #[test]
    fn chain_of_three_requires_three_approvals() {
        let chain = vec![slot("Alice", 1), slot("Bob", 2), slot("Cara", 3)];
        for seq in 1..=2 {
            let plan = plan_decision(&chain, seq, Decision::Approved);
            assert_eq!(plan.new_status, RequestStatus::Pending, "position {seq}");
            assert_eq!(
                plan.notify_next.as_ref().map(|s| s.sequence_number),
                Some(seq + 1)
            );
        }
        let plan = plan_decision(&chain, 3, Decision::Approved);
        assert_eq!(plan.new_status, RequestStatus::Approved);
    }

    #[test]
    fn single_approver_chain_completes_immediately() {
        let chain = vec![slot("Alice", 1)];
        let plan = plan_decision(&chain, 1, Decision::Approved);
        assert_eq!(plan.new_status, RequestStatus::Approved);
        assert!(plan.notify_next.is_none());
    }

    #[test]
    fn approval_after_chain_was_replaced_finds_no_next() {
        // The chain shrank to one position while the request was in flight;
        // a decision recorded at position 1 of the old three-step chain now
        // sees nobody at position 2 and simply notifies no next approver.
        let chain = vec![slot("Alice", 1)];
        let plan = plan_decision(&chain, 1, Decision::Approved);
        assert!(plan.notify_next.is_none());
    }

    // --- plan_decision: rejections ---

    #[test]
    fn rejection_is_terminal_from_any_position() {
        let chain = vec![slot("Alice", 1), slot("Bob", 2), slot("Cara", 3)];
        for seq in 1..=3 {
            let plan = plan_decision(&chain, seq, Decision::Rejected);
            assert_eq!(plan.new_status, RequestStatus::Rejected, "position {seq}");
            assert!(plan.notify_next.is_none());
        }
    }

    #[test]
    fn rejection_notifies_the_preceding_position() {
        let chain = vec![slot("Alice", 1), slot("Bob", 2)];
        let plan = plan_decision(&chain, 2, Decision::Rejected);
        assert_eq!(
            plan.notify_previous.as_ref().map(|s| s.sequence_number),
            Some(1)
        );
    }

    #[test]
    fn first_position_rejection_has_nobody_upstream() {
        let chain = vec![slot("Alice", 1), slot("Bob", 2)];
        let plan = plan_decision(&chain, 1, Decision::Rejected);
        assert!(plan.notify_previous.is_none());
    }
}
