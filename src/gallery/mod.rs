//! ギャラリー項目のCRUD
//!
//! - `GalleryClient`: 永続化先の抽象（HTTP API / JSONファイル）
//! - `GalleryService`: 部分更新のマージ、保存ガード、ブラー領域の保存

mod file;
mod http;
mod service;

pub use file::FileGalleryClient;
pub use http::HttpGalleryClient;
pub use service::GalleryService;

use crate::error::Result;
use bodyshop_gallery_common::GalleryItem;
use std::future::Future;

/// ギャラリー項目の永続化先
///
/// エラーはすべて `GalleryError::Persistence` にまとめて返す（リトライしない）。
pub trait GalleryClient: Send + Sync {
    /// 全件取得
    fn list(&self) -> impl Future<Output = Result<Vec<GalleryItem>>> + Send;

    /// 1件取得（存在しなければ None）
    fn get(&self, id: &str) -> impl Future<Output = Result<Option<GalleryItem>>> + Send;

    /// 新規作成。採番済みの項目を返す
    fn create(&self, item: &GalleryItem) -> impl Future<Output = Result<GalleryItem>> + Send;

    /// 全体を置き換え（blurAreas を含む）
    fn update(&self, item: &GalleryItem) -> impl Future<Output = Result<GalleryItem>> + Send;

    fn delete(&self, id: &str) -> impl Future<Output = Result<()>> + Send;
}

/// 一覧の並び（作成日時の新しい順、同時刻はID順）
pub(crate) fn sort_items(items: &mut [GalleryItem]) {
    items.sort_by(|a, b| {
        b.created_at
            .cmp(&a.created_at)
            .then_with(|| a.id.cmp(&b.id))
    });
}

/// 現在時刻（RFC3339、UTC）
pub fn now_timestamp() -> String {
    chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
}
