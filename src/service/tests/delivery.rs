use super::*;

#[tokio::test]
async fn test_direct_destination_is_returned_verbatim() {
    let f = fixture().await;
    let id = f.db.save_download(&direct("Guide")).await.unwrap();

    assert_eq!(
        f.service.resolve_destination(id).await.unwrap().as_deref(),
        Some("https://x.example/y.pdf")
    );
}

#[tokio::test]
async fn test_media_destination_goes_through_assets() {
    let f = fixture().await;
    let known = f.db.save_download(&media("Known", 10)).await.unwrap();
    let unknown = f.db.save_download(&media("Unknown", 99)).await.unwrap();
    let missing_file = f.db.save_download(&media("No File", 0)).await.unwrap();

    assert_eq!(
        f.service.resolve_destination(known).await.unwrap().as_deref(),
        Some("https://cdn.example.com/manual.pdf")
    );
    assert!(f.service.resolve_destination(unknown).await.unwrap().is_none());
    assert!(f.service.resolve_destination(missing_file).await.unwrap().is_none());
}

#[tokio::test]
async fn test_draft_never_resolves() {
    let f = fixture().await;
    let id = f
        .db
        .save_download(&DownloadInput {
            status: DownloadStatus::Draft,
            ..direct("Hidden")
        })
        .await
        .unwrap();

    // direct_url is populated but the record is not published
    let record = f.db.find_download(id).await.unwrap().unwrap();
    assert!(!record.direct_url.is_empty());

    assert!(f.service.resolve_destination(id).await.unwrap().is_none());
    assert!(f.service.resolve_record(&record).await.unwrap().is_none());
    assert!(f.service.find_published(id).await.unwrap().is_none());
}

#[tokio::test]
async fn test_absent_record_never_resolves() {
    let f = fixture().await;
    assert!(
        f.service
            .resolve_destination(DownloadId(404))
            .await
            .unwrap()
            .is_none()
    );
}

#[tokio::test]
async fn test_download_url_uses_delivery_route() {
    let f = fixture().await;
    assert_eq!(
        f.service.download_url(DownloadId(7)),
        "http://127.0.0.1:6789/download/7"
    );

    let mut config = Config::default();
    config.delivery.public_url = "https://files.example.com/".to_string();
    config.delivery.route = "/get/".to_string();
    let f = fixture_with(config).await;
    assert_eq!(
        f.service.download_url(DownloadId(7)),
        "https://files.example.com/get/7"
    );
}
