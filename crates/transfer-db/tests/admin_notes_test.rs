//! Integration tests for the admin accession listing and staff notes.

use transfer_db::test_fixtures::{digital_payload, physical_payload, sample_profile, TestDatabase};
use transfer_db::{
    AccessionListRequest, AccessionRepository, Error, NewNote, NoteRepository,
    SubmissionRepository, UserRepository, PAGE_SIZE,
};

#[tokio::test]
async fn test_list_filters_by_query_and_genre() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;

    let digital = digital_payload("tok-list-1", "one@example.edu", &["a.pdf"])
        .validate()
        .unwrap();
    let physical = physical_payload("two@example.edu").validate().unwrap();
    test_db.db.submissions.commit(&digital).await.unwrap();
    let physical_committed = test_db.db.submissions.commit(&physical).await.unwrap();

    let accessions = &test_db.db.accessions;

    let page = accessions
        .list_accessions(AccessionListRequest::default())
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.filtered_total, 2);
    assert_eq!(page.page, 1);
    assert_eq!(page.page_size, PAGE_SIZE);
    // Newest first
    assert_eq!(page.accessions[0].id, physical_committed.accession_id);

    let page = accessions
        .list_accessions(AccessionListRequest {
            page: 1,
            query: Some("floppy".to_string()),
            genre: None,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 2);
    assert_eq!(page.filtered_total, 1);
    assert!(page.accessions[0].physical);
    assert!(!page.accessions[0].digital);

    let page = accessions
        .list_accessions(AccessionListRequest {
            page: 1,
            query: None,
            genre: Some("Administrative records".to_string()),
        })
        .await
        .unwrap();
    assert_eq!(page.filtered_total, 1);
    // All genres of the matching accession are still listed.
    assert_eq!(page.accessions[0].genres, "Administrative records, Publications");

    let page = accessions
        .list_accessions(AccessionListRequest {
            page: 2,
            query: None,
            genre: None,
        })
        .await
        .unwrap();
    assert!(page.accessions.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_page_beyond_offset_range_is_empty() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;

    let digital = digital_payload("tok-far-page", "far@example.edu", &["far.pdf"])
        .validate()
        .unwrap();
    test_db.db.submissions.commit(&digital).await.unwrap();

    let page = test_db
        .db
        .accessions
        .list_accessions(AccessionListRequest {
            page: i64::MAX,
            query: None,
            genre: None,
        })
        .await
        .unwrap();
    assert_eq!(page.total, 1);
    assert_eq!(page.page, i64::MAX);
    assert!(page.accessions.is_empty());

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_detail_of_missing_accession_is_not_found() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;

    let err = test_db
        .db
        .accessions
        .get_accession_detail(123456)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::NotFound(_)));

    test_db.cleanup().await;
}

#[tokio::test]
async fn test_notes_are_appended_in_order() {
    dotenvy::dotenv().ok();
    let test_db = TestDatabase::new().await;

    let submission = physical_payload("notes@example.edu").validate().unwrap();
    let committed = test_db.db.submissions.commit(&submission).await.unwrap();
    let staff = test_db
        .db
        .users
        .create(&sample_profile("archivist@example.edu"))
        .await
        .unwrap();

    let notes = &test_db.db.notes;
    let first = notes
        .add_note(
            committed.accession_id,
            staff.id,
            &NewNote {
                title: "Received".to_string(),
                note: "Boxes arrived on the loading dock".to_string(),
            },
        )
        .await
        .unwrap();
    assert_eq!(first.user_name, "Ada Byron");

    notes
        .add_note(
            committed.accession_id,
            staff.id,
            &NewNote {
                title: String::new(),
                note: "Shelved in stack 4".to_string(),
            },
        )
        .await
        .unwrap();

    let listed = notes.list_notes(committed.accession_id).await.unwrap();
    assert_eq!(listed.len(), 2);
    assert_eq!(listed[0].id, first.id);
    assert_eq!(listed[1].note, "Shelved in stack 4");

    let blank = notes
        .add_note(committed.accession_id, staff.id, &NewNote::default())
        .await;
    assert!(matches!(blank, Err(Error::Validation(_))));

    let missing = notes
        .add_note(
            987654,
            staff.id,
            &NewNote {
                title: String::new(),
                note: "orphan".to_string(),
            },
        )
        .await;
    assert!(matches!(missing, Err(Error::NotFound(_))));

    test_db.cleanup().await;
}
