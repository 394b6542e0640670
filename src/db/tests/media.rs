use super::*;

#[tokio::test]
async fn test_media_urls() {
    let (_temp_file, db) = open_db().await;

    let file = db
        .add_media("https://cdn.example.com/manual.pdf", None)
        .await
        .unwrap();
    let image = db
        .add_media(
            "https://cdn.example.com/cover.png",
            Some("https://cdn.example.com/cover-300x200.png"),
        )
        .await
        .unwrap();

    assert_eq!(
        db.media_url(file).await.unwrap().as_deref(),
        Some("https://cdn.example.com/manual.pdf")
    );
    // No rendition: image URL falls back to the attachment URL
    assert_eq!(
        db.media_image_url(file).await.unwrap().as_deref(),
        Some("https://cdn.example.com/manual.pdf")
    );
    assert_eq!(
        db.media_image_url(image).await.unwrap().as_deref(),
        Some("https://cdn.example.com/cover-300x200.png")
    );

    assert!(db.media_url(999).await.unwrap().is_none());

    db.close().await;
}

#[tokio::test]
async fn test_blank_rendition_is_stored_as_none() {
    let (_temp_file, db) = open_db().await;

    let id = db
        .add_media("https://cdn.example.com/a.png", Some("   "))
        .await
        .unwrap();
    let row = db.get_media(id).await.unwrap().unwrap();
    assert!(row.image_url.is_none());

    db.close().await;
}

#[tokio::test]
async fn test_delete_media() {
    let (_temp_file, db) = open_db().await;

    let id = db.add_media("https://cdn.example.com/a.zip", None).await.unwrap();
    assert!(db.delete_media(id).await.unwrap());
    assert!(db.media_url(id).await.unwrap().is_none());
    assert!(!db.delete_media(id).await.unwrap());

    db.close().await;
}
