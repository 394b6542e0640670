use super::*;
use crate::terms::{Term, TermColumn};
use crate::types::DownloadStatus;
use std::sync::Arc;

fn slugs_and_counts(terms: &[Term]) -> Vec<(&str, u64)> {
    terms.iter().map(|t| (t.slug.as_str(), t.count)).collect()
}

#[tokio::test]
async fn test_registered_term_on_empty_table() {
    let (_temp_file, db) = open_db().await;

    assert!(db.register_term(TermColumn::Categories, "New Cat").await.unwrap());

    let terms = db.aggregate_terms(TermColumn::Categories, None).await.unwrap();
    assert_eq!(
        terms,
        vec![Term {
            slug: "new-cat".to_string(),
            name: "New Cat".to_string(),
            count: 0,
        }]
    );

    // Registries are per column
    assert!(db.aggregate_terms(TermColumn::Tags, None).await.unwrap().is_empty());

    db.close().await;
}

#[tokio::test]
async fn test_register_rejects_empty_and_is_idempotent() {
    let (_temp_file, db) = open_db().await;

    assert!(!db.register_term(TermColumn::Tags, "  !! ").await.unwrap());
    assert!(db.register_term(TermColumn::Tags, "pdf").await.unwrap());
    assert!(db.register_term(TermColumn::Tags, "PDF").await.unwrap());

    let terms = db.aggregate_terms(TermColumn::Tags, None).await.unwrap();
    assert_eq!(slugs_and_counts(&terms), vec![("pdf", 0)]);

    db.close().await;
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_registrations_keep_every_slug() {
    let (_temp_file, db) = open_db().await;
    let db = Arc::new(db);

    let handles: Vec<_> = (0..16)
        .map(|n| {
            let db = db.clone();
            tokio::spawn(async move {
                db.register_term(TermColumn::Categories, &format!("cat-{n}")).await
            })
        })
        .collect();
    for handle in handles {
        assert!(handle.await.unwrap().unwrap());
    }

    let terms = db.aggregate_terms(TermColumn::Categories, None).await.unwrap();
    assert_eq!(terms.len(), 16);
    assert!(terms.iter().all(|t| t.count == 0));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn test_concurrent_rename_and_register() {
    let (_temp_file, db) = open_db().await;
    db.save_download(&direct_input("A", "pdf", "")).await.unwrap();
    let db = Arc::new(db);

    let renamer = {
        let db = db.clone();
        tokio::spawn(async move { db.rename_term(TermColumn::Categories, "pdf", "documents").await })
    };
    let registrars: Vec<_> = (0..8)
        .map(|n| {
            let db = db.clone();
            tokio::spawn(async move {
                db.register_term(TermColumn::Categories, &format!("extra-{n}")).await
            })
        })
        .collect();

    assert!(renamer.await.unwrap().unwrap());
    for handle in registrars {
        assert!(handle.await.unwrap().unwrap());
    }

    let terms = db.aggregate_terms(TermColumn::Categories, None).await.unwrap();
    let slugs: Vec<&str> = terms.iter().map(|t| t.slug.as_str()).collect();
    assert!(slugs.contains(&"documents"));
    assert!(!slugs.contains(&"pdf"));
    assert_eq!(slugs.iter().filter(|s| s.starts_with("extra-")).count(), 8);
}

#[tokio::test]
async fn test_aggregate_counts_and_sorting() {
    let (_temp_file, db) = open_db().await;

    insert(&db, "One", "video,docs", "").await;
    insert(&db, "Two", "docs", "").await;
    insert(&db, "Three", "", "").await;
    db.save_download(&DownloadInput {
        status: DownloadStatus::Draft,
        ..direct_input("Draft", "docs,archive", "")
    })
    .await
    .unwrap();
    db.register_term(TermColumn::Categories, "empty").await.unwrap();
    db.register_term(TermColumn::Categories, "docs").await.unwrap();

    let any = db.aggregate_terms(TermColumn::Categories, None).await.unwrap();
    assert_eq!(
        slugs_and_counts(&any),
        vec![("archive", 1), ("docs", 3), ("empty", 0), ("video", 1)]
    );

    let published = db
        .aggregate_terms(TermColumn::Categories, Some(DownloadStatus::Publish))
        .await
        .unwrap();
    assert_eq!(
        slugs_and_counts(&published),
        vec![("docs", 2), ("empty", 0), ("video", 1)]
    );

    db.close().await;
}

#[tokio::test]
async fn test_rename_merges_into_existing_term() {
    let (_temp_file, db) = open_db().await;

    let a = insert(&db, "A", "old,misc", "").await;
    let b = insert(&db, "B", "new", "").await;
    let c = insert(&db, "C", "new,old", "").await;
    let d = insert(&db, "D", "misc", "").await;
    db.register_term(TermColumn::Categories, "old").await.unwrap();

    assert!(db.rename_term(TermColumn::Categories, "old", "new").await.unwrap());

    let terms = db.aggregate_terms(TermColumn::Categories, None).await.unwrap();
    assert_eq!(slugs_and_counts(&terms), vec![("misc", 2), ("new", 3)]);

    for (id, expected) in [(a, "new,misc"), (b, "new"), (c, "new"), (d, "misc")] {
        let record = db.find_download(id).await.unwrap().unwrap();
        assert_eq!(record.categories.to_csv(), expected);
    }

    db.close().await;
}

#[tokio::test]
async fn test_rename_moves_registry_entry() {
    let (_temp_file, db) = open_db().await;

    db.register_term(TermColumn::Tags, "draft-notes").await.unwrap();
    assert!(
        db.rename_term(TermColumn::Tags, "draft-notes", "Release Notes")
            .await
            .unwrap()
    );

    let terms = db.aggregate_terms(TermColumn::Tags, None).await.unwrap();
    assert_eq!(slugs_and_counts(&terms), vec![("release-notes", 0)]);

    db.close().await;
}

#[tokio::test]
async fn test_rename_edge_cases() {
    let (_temp_file, db) = open_db().await;

    assert!(!db.rename_term(TermColumn::Tags, "", "new").await.unwrap());
    assert!(!db.rename_term(TermColumn::Tags, "old", "!!").await.unwrap());
    assert!(db.rename_term(TermColumn::Tags, "Same", "same").await.unwrap());

    db.close().await;
}

#[tokio::test]
async fn test_rename_only_touches_target_column() {
    let (_temp_file, db) = open_db().await;

    let id = insert(&db, "Both", "pdf", "pdf").await;
    db.rename_term(TermColumn::Tags, "pdf", "document").await.unwrap();

    let record = db.find_download(id).await.unwrap().unwrap();
    assert_eq!(record.categories.to_csv(), "pdf");
    assert_eq!(record.tags.to_csv(), "document");

    db.close().await;
}

#[tokio::test]
async fn test_remove_term() {
    let (_temp_file, db) = open_db().await;

    let a = insert(&db, "A", "", "pdf,guide").await;
    let b = insert(&db, "B", "", "pdfx").await;
    db.register_term(TermColumn::Tags, "pdf").await.unwrap();

    assert!(db.remove_term(TermColumn::Tags, "PDF").await.unwrap());
    assert!(!db.remove_term(TermColumn::Tags, "").await.unwrap());

    assert_eq!(
        db.find_download(a).await.unwrap().unwrap().tags.to_csv(),
        "guide"
    );
    assert_eq!(db.find_download(b).await.unwrap().unwrap().tags.to_csv(), "pdfx");

    let terms = db.aggregate_terms(TermColumn::Tags, None).await.unwrap();
    assert_eq!(slugs_and_counts(&terms), vec![("guide", 1), ("pdfx", 1)]);

    db.close().await;
}

#[tokio::test]
async fn test_suggest_terms() {
    let (_temp_file, db) = open_db().await;

    insert(&db, "A", "user-guides,video", "").await;
    insert(&db, "B", "guide", "").await;
    db.register_term(TermColumn::Categories, "api-reference").await.unwrap();

    let all = db.suggest_terms(TermColumn::Categories, "", 10).await.unwrap();
    assert_eq!(all.len(), 4);

    let guides = db
        .suggest_terms(TermColumn::Categories, "Guide", 10)
        .await
        .unwrap();
    let slugs: Vec<&str> = guides.iter().map(|t| t.slug.as_str()).collect();
    assert_eq!(slugs, vec!["guide", "user-guides"]);

    let spaced = db
        .suggest_terms(TermColumn::Categories, "api ref", 10)
        .await
        .unwrap();
    assert_eq!(spaced.len(), 1);
    assert_eq!(spaced[0].name, "Api Reference");

    let limited = db.suggest_terms(TermColumn::Categories, "", 0).await.unwrap();
    assert_eq!(limited.len(), 1);

    db.close().await;
}

#[tokio::test]
async fn test_malformed_registry_is_ignored() {
    let (_temp_file, db) = open_db().await;

    sqlx::query("INSERT INTO runtime_state (key, value, updated_at) VALUES ('terms:tags', 'not json', 0)")
        .execute(db.pool())
        .await
        .unwrap();
    insert(&db, "A", "", "live").await;

    let terms = db.aggregate_terms(TermColumn::Tags, None).await.unwrap();
    assert_eq!(slugs_and_counts(&terms), vec![("live", 1)]);

    // Registering repairs the entry
    db.register_term(TermColumn::Tags, "kept").await.unwrap();
    let terms = db.aggregate_terms(TermColumn::Tags, None).await.unwrap();
    assert_eq!(slugs_and_counts(&terms), vec![("kept", 0), ("live", 1)]);

    db.close().await;
}
