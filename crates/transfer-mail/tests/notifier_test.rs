//! Notifier delivery behavior against the recording mailer.

use std::sync::Arc;

use chrono::Utc;
use transfer_core::User;
use transfer_mail::mock::MockMailer;
use transfer_mail::{Notifier, ReceiptView, RECEIPT_SUBJECT, VERIFY_SUBJECT};

fn user() -> User {
    User {
        id: 7,
        first_name: "Grace".into(),
        last_name: "Hopper".into(),
        title: "Records Manager".into(),
        affiliation: "Provost".into(),
        email: "grace@example.edu".into(),
        phone: "4345550111".into(),
        verified: true,
        verify_token: "v3rify".into(),
        admin: false,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    }
}

fn receipt() -> ReceiptView {
    ReceiptView {
        accession_id: 3,
        identifier: "0190a1b2c3".into(),
        submitted_at: Utc::now(),
        summary: "Board minutes".into(),
        activities: "Governance".into(),
        creator: "Board of Visitors".into(),
        genres: "Administrative records".into(),
        digital: None,
        physical: None,
    }
}

#[tokio::test]
async fn test_receipt_goes_to_submitter_with_admin_bcc() {
    let mailer = MockMailer::new();
    let notifier = Notifier::new(Arc::new(mailer.clone()), "transfer.example.edu");

    let admins = vec!["archivist@example.edu".to_string()];
    assert!(notifier.send_receipt(&user(), &receipt(), &admins).await);

    let sent = mailer.sent();
    assert_eq!(sent.len(), 1);
    assert_eq!(sent[0].subject, RECEIPT_SUBJECT);
    assert_eq!(sent[0].to, vec!["grace@example.edu"]);
    assert_eq!(sent[0].bcc, admins);
    assert!(sent[0].html_body.contains("0190a1b2c3"));
}

#[tokio::test]
async fn test_verification_contains_link() {
    let mailer = MockMailer::new();
    let notifier = Notifier::new(Arc::new(mailer.clone()), "transfer.example.edu");

    assert!(notifier.send_verification(&user()).await);
    let sent = mailer.sent();
    assert_eq!(sent[0].subject, VERIFY_SUBJECT);
    assert!(sent[0]
        .html_body
        .contains("https://transfer.example.edu/verify/v3rify"));
}

#[tokio::test]
async fn test_transport_failure_is_reported_not_raised() {
    let mailer = MockMailer::failing();
    let notifier = Notifier::new(Arc::new(mailer.clone()), "transfer.example.edu");

    assert!(!notifier.send_receipt(&user(), &receipt(), &[]).await);
    assert!(!notifier.send_verification(&user()).await);
    assert!(mailer.sent().is_empty());
}
