//! エラーケーステスト
//!
//! 各種エラー条件でのエラーハンドリングを検証

use bodyshop_gallery::error::GalleryError;
use bodyshop_gallery::gallery::{FileGalleryClient, GalleryService};
use bodyshop_gallery::scanner;
use bodyshop_gallery_common::{Error as CommonError, PathNormalizer};
use std::path::Path;
use tempfile::tempdir;

/// 存在しないフォルダをスキャンした場合
#[test]
fn test_scan_nonexistent_folder() {
    let result = scanner::scan_folder(Path::new("/nonexistent/path/12345"), false);
    assert!(result.is_err());

    let err = result.unwrap_err();
    assert!(matches!(err, GalleryError::FolderNotFound(_)));
}

/// 画像のないフォルダをスキャンした場合
#[test]
fn test_scan_folder_no_images() {
    let dir = tempdir().expect("Failed to create temp dir");

    // テキストファイルのみ作成
    std::fs::write(dir.path().join("test.txt"), "hello").unwrap();
    std::fs::write(dir.path().join("data.json"), "{}").unwrap();

    let result = scanner::scan_folder(dir.path(), true);
    assert!(result.is_ok());
    assert!(result.unwrap().is_empty());
}

/// GalleryErrorのDisplay実装確認
#[test]
fn test_error_display() {
    let errors = vec![
        GalleryError::persistence("connection refused"),
        GalleryError::NotFound("item-1".to_string()),
        GalleryError::Config("テスト設定エラー".to_string()),
        GalleryError::FileNotFound("test.jpg".to_string()),
        GalleryError::FolderNotFound("/path/to/folder".to_string()),
        GalleryError::ImageLoad("broken.png".to_string()),
        GalleryError::Common(CommonError::SaveInProgress),
    ];

    for err in errors {
        let display = format!("{}", err);
        assert!(!display.is_empty());
    }
}

/// 永続化エラーはメッセージを保持する
#[test]
fn test_persistence_message() {
    let err = GalleryError::persistence("HTTP 500: boom");
    match &err {
        GalleryError::Persistence { message } => assert_eq!(message, "HTTP 500: boom"),
        other => panic!("unexpected: {:?}", other),
    }
    assert!(err.to_string().contains("HTTP 500: boom"));
}

/// 共通ライブラリのエラーは透過的に表示される
#[test]
fn test_common_error_transparent() {
    let err: GalleryError = CommonError::GeometryConversion("no size".into()).into();
    assert_eq!(err.to_string(), CommonError::GeometryConversion("no size".into()).to_string());
}

/// 存在しない項目の取得
#[tokio::test]
async fn test_get_missing_item() {
    let dir = tempdir().expect("Failed to create temp dir");
    let client = FileGalleryClient::open(dir.path().join("gallery.json")).unwrap();
    let service = GalleryService::new(client, PathNormalizer::default());

    let err = service.get("missing").await.unwrap_err();
    assert!(matches!(err, GalleryError::NotFound(_)));

    let err = service
        .save_zones("missing", "/images/a.jpg", Vec::new())
        .await
        .unwrap_err();
    assert!(matches!(err, GalleryError::NotFound(_)));
}

/// ストアのディレクトリに書き込めない場合
#[tokio::test]
async fn test_unwritable_store_is_persistence_error() {
    let dir = tempdir().expect("Failed to create temp dir");
    // ファイルの下にストアを置こうとする
    let blocker = dir.path().join("blocker");
    std::fs::write(&blocker, "x").unwrap();

    let client = FileGalleryClient::open(blocker.join("gallery.json")).unwrap();
    let service = GalleryService::new(client, PathNormalizer::default());

    let err = service
        .create(bodyshop_gallery_common::GalleryItem::new("x"))
        .await
        .unwrap_err();
    assert!(matches!(err, GalleryError::Persistence { .. }));
    assert!(service.list().await.unwrap().is_empty());
}
