//! OTU create / edit / remove through the service

use otu_core::{ConflictField, FindQuery, FindResult, NotificationData, OtuError, OtuPatch, Verb};
use otu_model::{HistoryDiff, HistoryMethod, Molecule, OtuId, Segment};
use otu_store::{OtuStore, SequenceFilter};
use otu_test_utils::{
    add_isolate, create_tmv, ctx, reference_id, sample_sequence, service, service_with_notifications,
};
use pretty_assertions::assert_eq;

#[tokio::test]
async fn create_records_history() {
    let (service, _) = service();

    let otu = service
        .create(&ctx(), &reference_id(), "  Prunus virus F ", "PVF", Vec::new())
        .await
        .unwrap();

    assert_eq!(otu.name, "Prunus virus F");
    assert_eq!(otu.version, 0);
    assert!(!otu.verified);
    assert!(otu.issues.as_ref().unwrap().empty_otu);

    let change = otu.most_recent_change.unwrap();
    assert_eq!(change.id.as_str(), format!("{}.0", otu.id));
    assert_eq!(change.method_name, HistoryMethod::Create);
    assert_eq!(change.description, "Created Prunus virus F (PVF)");

    let record = service.get_history(&change.id).await.unwrap();
    assert!(matches!(record.diff, HistoryDiff::Snapshot(_)));
    assert!(record.index.is_unbuilt());
}

#[tokio::test]
async fn empty_name_rejected() {
    let (service, _) = service();
    let err = service
        .create(&ctx(), &reference_id(), "   ", "", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, OtuError::InvalidInput(_)));
}

#[tokio::test]
async fn create_conflicts() {
    let (service, _) = service();
    service
        .create(&ctx(), &reference_id(), "Tobacco mosaic virus", "TMV", Vec::new())
        .await
        .unwrap();

    let cases = [
        ("tobacco MOSAIC virus", "", ConflictField::Name),
        ("Tomato mosaic virus", "TMV", ConflictField::Abbreviation),
        ("Tobacco mosaic virus", "TMV", ConflictField::NameAndAbbreviation),
    ];
    for (name, abbreviation, expected) in cases {
        let err = service
            .create(&ctx(), &reference_id(), name, abbreviation, Vec::new())
            .await
            .unwrap_err();
        assert!(matches!(err, OtuError::Conflict(field) if field == expected), "{name}");
    }

    service
        .create(&ctx(), &reference_id(), "Tomato mosaic virus", "", Vec::new())
        .await
        .unwrap();
}

#[tokio::test]
async fn adding_abbreviation_bumps_version() {
    let (service, _) = service();
    let otu = create_tmv(&service).await;

    let edited = service
        .edit(
            &ctx(),
            &otu.id,
            OtuPatch::default().name("Tobacco mosaic virus").abbreviation("TMV"),
        )
        .await
        .unwrap();

    assert_eq!(edited.version, 1);
    assert_eq!(edited.abbreviation, "TMV");
    let change = edited.most_recent_change.unwrap();
    assert_eq!(change.description, "Added abbreviation TMV");
    assert_eq!(change.id.as_str(), format!("{}.1", otu.id));
}

#[tokio::test]
async fn edit_with_identical_values_is_a_no_op() {
    let (service, store) = service();
    let otu = create_tmv(&service).await;

    let same = service
        .edit(&ctx(), &otu.id, OtuPatch::default().name("Tobacco mosaic virus").abbreviation(""))
        .await
        .unwrap();

    assert_eq!(same.version, 0);
    assert_eq!(store.history_len(), 1);
}

#[tokio::test]
async fn rename_and_remove_abbreviation() {
    let (service, _) = service();
    let otu = service
        .create(&ctx(), &reference_id(), "Tobacco mosaic virus", "TMV", Vec::new())
        .await
        .unwrap();

    let edited = service
        .edit(
            &ctx(),
            &otu.id,
            OtuPatch::default().name("Tobacco Mosaic Virus").abbreviation(""),
        )
        .await
        .unwrap();

    assert_eq!(
        edited.most_recent_change.unwrap().description,
        "Changed name to Tobacco Mosaic Virus and removed abbreviation TMV"
    );

    let history = service.list_history(&otu.id).await.unwrap();
    let HistoryDiff::Changes(ops) = &history[1].diff else {
        panic!("expected change list");
    };
    let encoded = serde_json::to_value(ops).unwrap();
    assert!(encoded
        .as_array()
        .unwrap()
        .contains(&serde_json::json!(["change", "abbreviation", ["TMV", ""]])));
}

#[tokio::test]
async fn edit_conflict_excludes_self() {
    let (service, _) = service();
    let tmv = create_tmv(&service).await;
    service
        .create(&ctx(), &reference_id(), "Tomato mosaic virus", "ToMV", Vec::new())
        .await
        .unwrap();

    let err = service
        .edit(&ctx(), &tmv.id, OtuPatch::default().abbreviation("ToMV"))
        .await
        .unwrap_err();
    assert!(matches!(err, OtuError::Conflict(ConflictField::Abbreviation)));

    let err = service
        .edit(&ctx(), &tmv.id, OtuPatch::default().name("TOMATO mosaic virus"))
        .await
        .unwrap_err();
    assert!(matches!(err, OtuError::Conflict(ConflictField::Name)));
}

#[tokio::test]
async fn schema_only_edit_has_empty_description_and_unsets_segments() {
    let (service, store) = service();
    let otu = create_tmv(&service).await;
    service
        .edit(
            &ctx(),
            &otu.id,
            OtuPatch::default().schema(vec![Segment::new("RNA1").with_molecule(Molecule::SsRnaPositive)]),
        )
        .await
        .unwrap();

    let isolate = add_isolate(&service, &otu, "A", true).await;
    service
        .create_sequence(&ctx(), &otu.id, &isolate.id, sample_sequence("NC_001367").with_segment("RNA1"))
        .await
        .unwrap();

    let edited = service
        .edit(&ctx(), &otu.id, OtuPatch::default().schema(vec![Segment::new("RNA2")]))
        .await
        .unwrap();

    assert_eq!(edited.most_recent_change.unwrap().description, "");
    assert_eq!(edited.isolates[0].sequences[0].segment, None);

    let stored = store
        .find_sequences(&SequenceFilter::for_otu(otu.id.clone()))
        .await
        .unwrap();
    assert_eq!(stored[0].segment, None);
}

#[tokio::test]
async fn remove_cascades_and_keeps_history() {
    let (service, store) = service();
    let otu = create_tmv(&service).await;
    let isolate = add_isolate(&service, &otu, "A", true).await;
    service
        .create_sequence(&ctx(), &otu.id, &isolate.id, sample_sequence("NC_001367"))
        .await
        .unwrap();

    service.remove(&ctx(), &otu.id).await.unwrap();

    assert!(service.get(&otu.id).await.unwrap_err().is_not_found());
    assert_eq!(
        store
            .count_sequences(&SequenceFilter::for_otu(otu.id.clone()))
            .await
            .unwrap(),
        0
    );

    let history = service.list_history(&otu.id).await.unwrap();
    let last = history.last().unwrap();
    assert_eq!(last.id.as_str(), format!("{}.3", otu.id));
    assert_eq!(last.method_name, HistoryMethod::Remove);
    assert_eq!(last.description, "Removed Tobacco mosaic virus");

    let err = service.remove(&ctx(), &otu.id).await.unwrap_err();
    assert!(err.is_not_found());
}

#[tokio::test]
async fn missing_otu_is_not_found() {
    let (service, _) = service();
    let err = service
        .edit(&ctx(), &OtuId::new("missing"), OtuPatch::default().name("X"))
        .await
        .unwrap_err();
    assert_eq!(err.http_status(), 404);
}

#[tokio::test]
async fn notifications_follow_commits() {
    let (service, mut rx) = service_with_notifications();
    let otu = create_tmv(&service).await;
    service
        .edit(&ctx(), &otu.id, OtuPatch::default().abbreviation("TMV"))
        .await
        .unwrap();
    service.remove(&ctx(), &otu.id).await.unwrap();

    let insert = rx.recv().await.unwrap();
    assert_eq!(insert.verb, Verb::Insert);

    let update = rx.recv().await.unwrap();
    assert_eq!(update.verb, Verb::Update);
    let NotificationData::Otu(summary) = update.data else {
        panic!("expected summary");
    };
    assert_eq!((summary.abbreviation.as_str(), summary.version), ("TMV", 1));

    let removal = rx.recv().await.unwrap();
    assert_eq!(removal.data, NotificationData::Removed(vec![otu.id.clone()]));
}

#[tokio::test]
async fn find_pages_and_names() {
    let (service, _) = service();
    for (name, abbreviation) in [
        ("Tobacco mosaic virus", "TMV"),
        ("Tomato mosaic virus", "ToMV"),
        ("Prunus virus F", "PVF"),
        ("Cucumber mosaic virus", "CMV"),
    ] {
        service
            .create(&ctx(), &reference_id(), name, abbreviation, Vec::new())
            .await
            .unwrap();
    }

    let FindResult::Page(page) = service
        .find(&FindQuery::new().with_term("MOSAIC").with_page(1, 2))
        .await
        .unwrap()
    else {
        panic!("expected page");
    };
    assert_eq!(page.found_count, 3);
    assert_eq!(page.total_count, 4);
    assert_eq!(page.page_count, 2);
    let names: Vec<_> = page.documents.iter().map(|otu| otu.name.as_str()).collect();
    assert_eq!(names, ["Cucumber mosaic virus", "Tobacco mosaic virus"]);

    let FindResult::Names(names) = service
        .find(&FindQuery::new().with_term("pvf").names_only())
        .await
        .unwrap()
    else {
        panic!("expected names");
    };
    assert_eq!(names.len(), 1);
    assert_eq!(names[0].name, "Prunus virus F");

    let FindResult::Page(page) = service
        .find(&FindQuery::new().with_verified(true))
        .await
        .unwrap()
    else {
        panic!("expected page");
    };
    assert_eq!(page.found_count, 0);
}

#[tokio::test]
async fn term_is_matched_literally() {
    let (service, _) = service();
    service
        .create(&ctx(), &reference_id(), "Virus (strain 1)", "", Vec::new())
        .await
        .unwrap();

    let FindResult::Names(names) = service
        .find(&FindQuery::new().with_term("(strain").names_only())
        .await
        .unwrap()
    else {
        panic!("expected names");
    };
    assert_eq!(names.len(), 1);
}

#[tokio::test]
async fn formatted_view_round_trips() {
    let (service, store) = service();
    let otu = create_tmv(&service).await;
    let isolate = add_isolate(&service, &otu, "A", true).await;
    service
        .create_sequence(&ctx(), &otu.id, &isolate.id, sample_sequence("NC_001367"))
        .await
        .unwrap();

    let view = service.get(&otu.id).await.unwrap();
    let stored = store.get_otu(&otu.id).await.unwrap().unwrap();
    let sequences = store
        .find_sequences(&SequenceFilter::for_otu(otu.id.clone()))
        .await
        .unwrap();

    assert_eq!(view.to_joined(), otu_model::JoinedOtu::join(&stored, &sequences));
    assert!(view.verified);
    assert_eq!(view.issues, None);
}
