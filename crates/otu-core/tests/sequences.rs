//! Sequence mutations

use otu_core::{ConflictField, OtuError, OtuPatch, Resource, SequencePatch};
use otu_model::{HistoryMethod, IsolateId, OtuId, Segment, SequenceId};
use otu_test_utils::{add_isolate, create_tmv, ctx, sample_sequence, service};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn create_sequence_cleans_text() {
    let (service, _) = service();
    let otu = create_tmv(&service).await;
    let isolate = add_isolate(&service, &otu, "A", false).await;

    let created = service
        .create_sequence(&ctx(), &otu.id, &isolate.id, sample_sequence("NC_001367"))
        .await
        .unwrap();

    assert_eq!(created.id, SequenceId::new("NC_001367"));
    assert!(!created.sequence.contains('\n'));
    assert_eq!(created.host, "tobacco");

    let view = service.get(&otu.id).await.unwrap();
    assert_eq!(view.version, 2);
    assert!(view.verified);
    assert_eq!(
        view.most_recent_change.unwrap().description,
        "Created new sequence NC_001367 in Isolate A"
    );
}

#[tokio::test]
async fn accession_is_unique_across_otus() {
    let (service, store) = service();
    let tmv = create_tmv(&service).await;
    let isolate = add_isolate(&service, &tmv, "A", false).await;
    service
        .create_sequence(&ctx(), &tmv.id, &isolate.id, sample_sequence("NC_001367"))
        .await
        .unwrap();

    let other = service
        .create(&ctx(), &otu_test_utils::reference_id(), "Tomato mosaic virus", "", Vec::new())
        .await
        .unwrap();
    let other_isolate = add_isolate(&service, &other, "B", false).await;
    let before = store.history_len();

    let err = service
        .create_sequence(&ctx(), &other.id, &other_isolate.id, sample_sequence("NC_001367"))
        .await
        .unwrap_err();

    assert!(matches!(err, OtuError::Conflict(ConflictField::Accession)));
    assert_eq!(err.http_status(), 409);
    assert_eq!(store.history_len(), before);
}

#[tokio::test]
async fn undeclared_segment_changes_nothing() {
    let (service, store) = service();
    let otu = create_tmv(&service).await;
    service
        .edit(&ctx(), &otu.id, OtuPatch::default().schema(vec![Segment::new("RNA1")]))
        .await
        .unwrap();
    let isolate = add_isolate(&service, &otu, "A", false).await;
    let before = service.get(&otu.id).await.unwrap();

    let err = service
        .create_sequence(
            &ctx(),
            &otu.id,
            &isolate.id,
            sample_sequence("NC_001367").with_segment("RNA9"),
        )
        .await
        .unwrap_err();

    assert!(matches!(&err, OtuError::InvalidSegment(segment) if segment == "RNA9"));
    assert_eq!(service.get(&otu.id).await.unwrap(), before);
    assert_eq!(store.history_len(), 3);
}

#[tokio::test]
async fn required_segments_drive_verification() {
    let (service, _) = service();
    let otu = create_tmv(&service).await;
    service
        .edit(
            &ctx(),
            &otu.id,
            OtuPatch::default().schema(vec![Segment::new("RNA1"), Segment::new("RNA2")]),
        )
        .await
        .unwrap();
    let isolate = add_isolate(&service, &otu, "A", false).await;
    service
        .create_sequence(&ctx(), &otu.id, &isolate.id, sample_sequence("A1").with_segment("RNA1"))
        .await
        .unwrap();

    let view = service.get(&otu.id).await.unwrap();
    assert!(!view.verified);
    let missing = view.issues.unwrap().missing_segments;
    assert_eq!(missing.len(), 1);
    assert_eq!(missing[0].segment, "RNA2");

    service
        .create_sequence(&ctx(), &otu.id, &isolate.id, sample_sequence("A2").with_segment("RNA2"))
        .await
        .unwrap();
    assert!(service.get(&otu.id).await.unwrap().verified);
}

#[tokio::test]
async fn empty_patch_is_checked_before_lookup() {
    let (service, _) = service();
    let err = service
        .edit_sequence(
            &ctx(),
            &OtuId::new("missing"),
            &IsolateId::new("missing"),
            &SequenceId::new("missing"),
            SequencePatch::default(),
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OtuError::EmptyInput));
    assert_eq!(err.http_status(), 400);
}

#[tokio::test]
async fn edit_sequence_updates_fields() {
    let (service, _) = service();
    let otu = create_tmv(&service).await;
    service
        .edit(&ctx(), &otu.id, OtuPatch::default().schema(vec![Segment::new("RNA1")]))
        .await
        .unwrap();
    let isolate = add_isolate(&service, &otu, "A", false).await;
    let id = SequenceId::new("NC_001367");
    service
        .create_sequence(&ctx(), &otu.id, &isolate.id, sample_sequence("NC_001367").with_segment("RNA1"))
        .await
        .unwrap();

    let edited = service
        .edit_sequence(
            &ctx(),
            &otu.id,
            &isolate.id,
            &id,
            SequencePatch {
                host: Some("tomato".to_string()),
                segment: Some(String::new()),
                ..SequencePatch::default()
            },
        )
        .await
        .unwrap();

    assert_eq!(edited.host, "tomato");
    assert_eq!(edited.segment, None);
    assert_eq!(service.get_sequence(&otu.id, &isolate.id, &id).await.unwrap(), edited);

    let history = service.list_history(&otu.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.method_name, HistoryMethod::EditSequence);
    assert_eq!(last.description, "Edited sequence NC_001367 in Isolate A");
}

#[tokio::test]
async fn sequence_of_other_isolate_is_not_found() {
    let (service, _) = service();
    let otu = create_tmv(&service).await;
    let a = add_isolate(&service, &otu, "A", false).await;
    let b = add_isolate(&service, &otu, "B", false).await;
    let id = SequenceId::new("NC_001367");
    service
        .create_sequence(&ctx(), &otu.id, &a.id, sample_sequence("NC_001367"))
        .await
        .unwrap();

    let err = service
        .edit_sequence(
            &ctx(),
            &otu.id,
            &b.id,
            &id,
            SequencePatch {
                host: Some("tomato".to_string()),
                ..SequencePatch::default()
            },
        )
        .await
        .unwrap_err();
    assert!(matches!(err, OtuError::NotFound(Resource::Sequence(_))));

    let err = service.remove_sequence(&ctx(), &otu.id, &b.id, &id).await.unwrap_err();
    assert!(err.is_not_found());
    assert!(service.get_sequence(&otu.id, &b.id, &id).await.is_err());
}

#[tokio::test]
async fn remove_sequence_and_isolate_cascade() {
    let (service, _) = service();
    let otu = create_tmv(&service).await;
    let a = add_isolate(&service, &otu, "A", false).await;
    for accession in ["S1", "S2"] {
        service
            .create_sequence(&ctx(), &otu.id, &a.id, sample_sequence(accession))
            .await
            .unwrap();
    }

    service
        .remove_sequence(&ctx(), &otu.id, &a.id, &SequenceId::new("S1"))
        .await
        .unwrap();
    let remaining = service.list_sequences(&otu.id, &a.id).await.unwrap();
    assert_eq!(remaining.len(), 1);
    assert_eq!(remaining[0].id, SequenceId::new("S2"));
    assert_eq!(
        service.get(&otu.id).await.unwrap().most_recent_change.unwrap().description,
        "Removed sequence S1 from Isolate A"
    );

    service.remove_isolate(&ctx(), &otu.id, &a.id).await.unwrap();
    let view = service.get(&otu.id).await.unwrap();
    assert_eq!(view.to_joined().sequence_count(), 0);

    // accession is free again once its isolate is gone
    let b = add_isolate(&service, &otu, "B", false).await;
    service
        .create_sequence(&ctx(), &otu.id, &b.id, sample_sequence("S2"))
        .await
        .unwrap();
}

#[tokio::test]
async fn blank_sequence_text_is_invalid() {
    let (service, _) = service();
    let otu = create_tmv(&service).await;
    let a = add_isolate(&service, &otu, "A", false).await;

    let mut input = sample_sequence("S1");
    input.sequence = " \n ".to_string();
    let err = service
        .create_sequence(&ctx(), &otu.id, &a.id, input)
        .await
        .unwrap_err();
    assert!(matches!(err, OtuError::InvalidInput(_)));
}
