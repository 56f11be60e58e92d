//! Mail synthesis for workflow events. The relay only transports; everything
//! a recipient reads is rendered here.

use uuid::Uuid;

use gatepass_common::User;
use gatepass_notify::OutboundMail;

use crate::store::ChainEntryRow;

/// Tell a chain position it is their turn to act.
pub fn approval_requested(
    approver: &ChainEntryRow,
    initiator_name: &str,
    type_name: &str,
    request_id: Uuid,
    base_url: &str,
) -> OutboundMail {
    OutboundMail {
        to: approver.approver_email.clone(),
        subject: format!("A {type_name} pass request is awaiting your approval"),
        body: body(
            &approver.approver_name,
            &format!("{initiator_name} submitted a {type_name} pass request that is now at your position in the approval chain."),
            request_id,
            None,
            base_url,
        ),
    }
}

/// Tell the initiator their request moved one step forward.
pub fn approval_progress(
    initiator: &User,
    approver_name: &str,
    type_name: &str,
    request_id: Uuid,
    base_url: &str,
) -> OutboundMail {
    OutboundMail {
        to: initiator.email.clone(),
        subject: format!("Your {type_name} pass request moved forward"),
        body: body(
            &initiator.name,
            &format!("{approver_name} approved your {type_name} pass request. It is now with the next approver."),
            request_id,
            None,
            base_url,
        ),
    }
}

/// Tell the initiator the chain is satisfied.
pub fn request_approved(
    initiator: &User,
    type_name: &str,
    request_id: Uuid,
    base_url: &str,
) -> OutboundMail {
    OutboundMail {
        to: initiator.email.clone(),
        subject: format!("Your {type_name} pass request was approved"),
        body: body(
            &initiator.name,
            &format!("Your {type_name} pass request has been approved by everyone in the chain."),
            request_id,
            None,
            base_url,
        ),
    }
}

/// Tell the initiator their request was rejected.
pub fn request_rejected(
    initiator: &User,
    approver_name: &str,
    type_name: &str,
    request_id: Uuid,
    comments: Option<&str>,
    base_url: &str,
) -> OutboundMail {
    OutboundMail {
        to: initiator.email.clone(),
        subject: format!("Your {type_name} pass request was rejected"),
        body: body(
            &initiator.name,
            &format!("{approver_name} rejected your {type_name} pass request."),
            request_id,
            comments,
            base_url,
        ),
    }
}

/// Tell the preceding approver that a request they passed on was rejected
/// further down the chain.
pub fn downstream_rejection(
    previous: &ChainEntryRow,
    approver_name: &str,
    type_name: &str,
    request_id: Uuid,
    comments: Option<&str>,
    base_url: &str,
) -> OutboundMail {
    OutboundMail {
        to: previous.approver_email.clone(),
        subject: format!("A {type_name} pass request you approved was rejected"),
        body: body(
            &previous.approver_name,
            &format!("{approver_name} rejected a {type_name} pass request after your approval."),
            request_id,
            comments,
            base_url,
        ),
    }
}

fn body(
    greeting_name: &str,
    message: &str,
    request_id: Uuid,
    comments: Option<&str>,
    base_url: &str,
) -> String {
    let mut body = format!("Hi {greeting_name},\n\n{message}\n\nRequest ID: {request_id}\n");
    if let Some(comments) = comments.filter(|c| !c.trim().is_empty()) {
        body.push_str(&format!("Comments: {comments}\n"));
    }
    body.push_str(&format!(
        "\nView the request: {base_url}/requests/{request_id}\n"
    ));
    body
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use super::*;

    fn approver() -> ChainEntryRow {
        ChainEntryRow {
            approver_id: Uuid::new_v4(),
            approver_name: "Alice".to_string(),
            approver_email: "alice@plant.example".to_string(),
            sequence_number: 1,
        }
    }

    fn initiator() -> User {
        User {
            id: Uuid::new_v4(),
            name: "Carol".to_string(),
            email: "carol@plant.example".to_string(),
            created_at: Utc::now(),
        }
    }

    #[test]
    fn approval_request_goes_to_the_approver() {
        let id = Uuid::new_v4();
        let mail = approval_requested(&approver(), "Carol", "outward", id, "https://gate.example");
        assert_eq!(mail.to, "alice@plant.example");
        assert!(mail.body.starts_with("Hi Alice,"));
        assert!(mail.body.contains(&id.to_string()));
        assert!(mail.body.contains("Carol"));
    }

    #[test]
    fn rejection_mail_carries_comments() {
        let id = Uuid::new_v4();
        let mail = request_rejected(
            &initiator(),
            "Bob",
            "outward",
            id,
            Some("damaged"),
            "https://gate.example",
        );
        assert_eq!(mail.to, "carol@plant.example");
        assert!(mail.body.contains("Comments: damaged"));
    }

    #[test]
    fn blank_comments_are_omitted() {
        let mail = request_rejected(
            &initiator(),
            "Bob",
            "outward",
            Uuid::new_v4(),
            Some("   "),
            "https://gate.example",
        );
        assert!(!mail.body.contains("Comments:"));
    }

    #[test]
    fn body_links_back_to_the_request() {
        let id = Uuid::new_v4();
        let mail = request_approved(&initiator(), "inward", id, "https://gate.example");
        assert!(mail
            .body
            .contains(&format!("https://gate.example/requests/{id}")));
    }
}
