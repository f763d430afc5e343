//! ギャラリー項目の操作
//!
//! 読み込んだ項目に部分更新をマージしてから全体を保存する（後勝ち）。
//! 同じ項目への保存が進行中なら次の保存は拒否する。

use super::{now_timestamp, GalleryClient};
use crate::error::{GalleryError, Result};
use bodyshop_gallery_common::{
    BlurZone, CommitRequest, Error as CommonError, GalleryItem, GalleryItemPatch, PathNormalizer,
    Resolution, SaveContext,
};
use std::collections::HashSet;
use std::sync::{Arc, Mutex};
use tracing::{debug, info, warn};

pub struct GalleryService<C> {
    client: C,
    normalizer: PathNormalizer,
    saving: Arc<Mutex<HashSet<String>>>,
}

/// 保存中フラグ（drop で解除）
struct SaveGuard {
    id: String,
    saving: Arc<Mutex<HashSet<String>>>,
}

impl SaveGuard {
    fn acquire(saving: &Arc<Mutex<HashSet<String>>>, id: &str) -> Result<Self> {
        let mut set = saving
            .lock()
            .map_err(|e| GalleryError::persistence(format!("Lock error: {}", e)))?;
        if !set.insert(id.to_string()) {
            return Err(CommonError::SaveInProgress.into());
        }
        Ok(Self {
            id: id.to_string(),
            saving: Arc::clone(saving),
        })
    }
}

impl Drop for SaveGuard {
    fn drop(&mut self) {
        if let Ok(mut set) = self.saving.lock() {
            set.remove(&self.id);
        }
    }
}

impl<C: GalleryClient> GalleryService<C> {
    pub fn new(client: C, normalizer: PathNormalizer) -> Self {
        Self {
            client,
            normalizer,
            saving: Arc::new(Mutex::new(HashSet::new())),
        }
    }

    pub fn client(&self) -> &C {
        &self.client
    }

    pub fn normalizer(&self) -> &PathNormalizer {
        &self.normalizer
    }

    /// 指定IDの保存が進行中か
    pub fn is_saving(&self, id: &str) -> bool {
        self.saving.lock().map(|s| s.contains(id)).unwrap_or(false)
    }

    pub async fn list(&self) -> Result<Vec<GalleryItem>> {
        self.client.list().await
    }

    pub async fn get(&self, id: &str) -> Result<GalleryItem> {
        self.client
            .get(id)
            .await?
            .ok_or_else(|| GalleryError::NotFound(id.to_string()))
    }

    /// 新規作成（createdAt / updatedAt を付与）
    pub async fn create(&self, mut item: GalleryItem) -> Result<GalleryItem> {
        let now = now_timestamp();
        item.created_at = Some(now.clone());
        item.updated_at = Some(now);

        let created = self.client.create(&item).await?;
        info!(id = %created.id, title = %created.title, "gallery item created");
        Ok(created)
    }

    /// 部分更新をマージして保存
    pub async fn update(&self, id: &str, patch: GalleryItemPatch) -> Result<GalleryItem> {
        let _guard = SaveGuard::acquire(&self.saving, id)?;

        let mut item = self.get(id).await?;
        let previous = item.clone();
        item.merge(patch);
        let dropped = item.drop_removed_image_zones(&previous, &self.normalizer);
        if dropped > 0 {
            info!(id = %id, keys = dropped, "blur zones of removed images deleted");
        }
        self.persist(item).await
    }

    /// 項目全体を保存（後勝ち）
    pub async fn replace(&self, item: GalleryItem) -> Result<GalleryItem> {
        let _guard = SaveGuard::acquire(&self.saving, &item.id)?;
        self.persist(item).await
    }

    async fn persist(&self, mut item: GalleryItem) -> Result<GalleryItem> {
        item.updated_at = Some(now_timestamp());
        let saved = self.client.update(&item).await?;
        debug!(id = %saved.id, zones = saved.blur_areas.total_zones(), "gallery item saved");
        Ok(saved)
    }

    pub async fn delete(&self, id: &str) -> Result<()> {
        let _guard = SaveGuard::acquire(&self.saving, id)?;
        self.client.delete(id).await?;
        info!(id = %id, "gallery item deleted");
        Ok(())
    }

    /// 画像に対応するブラー領域を引く
    pub async fn resolve_zones(&self, id: &str, image_path: &str) -> Result<Resolution> {
        let item = self.get(id).await?;
        let resolution = item.blur_areas.resolve(&self.normalizer, image_path);
        if resolution.ambiguous {
            warn!(
                image = %image_path,
                key = resolution.matched_key.as_deref().unwrap_or(""),
                "file name matched several blur keys; using the first"
            );
        }
        Ok(resolution)
    }

    /// 画像のブラー領域を置き換えて保存。書き込んだキーを返す
    ///
    /// 空のリストを渡すと対応するキーを削除する。
    pub async fn save_zones(
        &self,
        id: &str,
        image_path: &str,
        zones: Vec<BlurZone>,
    ) -> Result<Option<String>> {
        let _guard = SaveGuard::acquire(&self.saving, id)?;

        let mut item = self.get(id).await?;
        let matched_key = item.blur_areas.resolve(&self.normalizer, image_path).matched_key;
        let ctx = SaveContext::new(now_timestamp())
            .with_role(item.role_of(&self.normalizer, image_path));

        let mut blur_areas = item.blur_areas.clone();
        let key = blur_areas.save(&self.normalizer, image_path, matched_key.as_deref(), zones, &ctx)?;

        item.merge(GalleryItemPatch {
            blur_areas: Some(blur_areas),
            ..Default::default()
        });
        self.persist(item).await?;
        Ok(key)
    }

    /// エディタの保存要求を反映
    pub async fn commit(&self, id: &str, request: CommitRequest) -> Result<Option<String>> {
        let _guard = SaveGuard::acquire(&self.saving, id)?;

        let mut item = self.get(id).await?;
        let ctx = SaveContext::new(now_timestamp())
            .with_role(item.role_of(&self.normalizer, &request.image_path));
        let key = request.apply(&mut item.blur_areas, &self.normalizer, &ctx)?;
        self.persist(item).await?;
        Ok(key)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_save_guard_rejects_second_acquire() {
        let saving = Arc::new(Mutex::new(HashSet::new()));
        let guard = SaveGuard::acquire(&saving, "a").unwrap();
        assert!(matches!(
            SaveGuard::acquire(&saving, "a"),
            Err(GalleryError::Common(CommonError::SaveInProgress))
        ));
        // 別の項目は保存できる
        let other = SaveGuard::acquire(&saving, "b").unwrap();
        drop(guard);
        drop(other);
        assert!(SaveGuard::acquire(&saving, "a").is_ok());
    }
}
