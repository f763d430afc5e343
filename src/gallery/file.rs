//! JSONファイルのギャラリーストア（オフライン作業・テスト用）

use super::{sort_items, GalleryClient};
use crate::error::{GalleryError, Result};
use bodyshop_gallery_common::GalleryItem;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;
use tracing::debug;
use uuid::Uuid;

#[derive(Debug, Clone, Serialize, Deserialize)]
struct StoredGallery {
    version: u32,
    items: BTreeMap<String, GalleryItem>,
}

impl Default for StoredGallery {
    fn default() -> Self {
        Self {
            version: FileGalleryClient::CURRENT_VERSION,
            items: BTreeMap::new(),
        }
    }
}

pub struct FileGalleryClient {
    path: PathBuf,
    cache: RwLock<BTreeMap<String, GalleryItem>>,
}

impl FileGalleryClient {
    const CURRENT_VERSION: u32 = 1;

    /// ストアを開く（ファイルがなければ空で作る）
    pub fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();

        let items = if path.exists() {
            let content = std::fs::read_to_string(&path)
                .map_err(|e| GalleryError::persistence(format!("{}: {}", path.display(), e)))?;
            let stored: StoredGallery = serde_json::from_str(&content)
                .map_err(|e| GalleryError::persistence(format!("{}: {}", path.display(), e)))?;
            stored.items
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            path,
            cache: RwLock::new(items),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn len(&self) -> usize {
        self.cache.read().map(|c| c.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// 変更を適用してファイルへ書き出す
    ///
    /// 書き出しに失敗した場合はメモリ上の変更も捨てる。
    fn mutate<T>(&self, f: impl FnOnce(&mut BTreeMap<String, GalleryItem>) -> Result<T>) -> Result<T> {
        let mut cache = self
            .cache
            .write()
            .map_err(|e| GalleryError::persistence(format!("Lock error: {}", e)))?;

        let mut next = cache.clone();
        let value = f(&mut next)?;
        self.write_file(&next)?;
        *cache = next;
        Ok(value)
    }

    /// 一時ファイルに書いてから置き換える
    fn write_file(&self, items: &BTreeMap<String, GalleryItem>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent).map_err(persistence)?;
            }
        }

        let stored = StoredGallery {
            version: Self::CURRENT_VERSION,
            items: items.clone(),
        };
        let json = serde_json::to_string_pretty(&stored)
            .map_err(|e| GalleryError::persistence(e.to_string()))?;

        let tmp = self.path.with_extension("json.tmp");
        std::fs::write(&tmp, json).map_err(persistence)?;
        std::fs::rename(&tmp, &self.path).map_err(persistence)?;
        debug!(path = %self.path.display(), items = items.len(), "gallery store written");
        Ok(())
    }
}

fn persistence(e: std::io::Error) -> GalleryError {
    GalleryError::persistence(e.to_string())
}

fn not_found(id: &str) -> GalleryError {
    GalleryError::persistence(format!("gallery item not found: {}", id))
}

impl GalleryClient for FileGalleryClient {
    async fn list(&self) -> Result<Vec<GalleryItem>> {
        let cache = self
            .cache
            .read()
            .map_err(|e| GalleryError::persistence(format!("Lock error: {}", e)))?;
        let mut items: Vec<GalleryItem> = cache.values().cloned().collect();
        sort_items(&mut items);
        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Option<GalleryItem>> {
        let cache = self
            .cache
            .read()
            .map_err(|e| GalleryError::persistence(format!("Lock error: {}", e)))?;
        Ok(cache.get(id).cloned())
    }

    async fn create(&self, item: &GalleryItem) -> Result<GalleryItem> {
        let mut item = item.clone();
        if item.id.trim().is_empty() {
            item.id = Uuid::new_v4().to_string();
        }

        self.mutate(|items| {
            if items.contains_key(&item.id) {
                return Err(GalleryError::persistence(format!("id already exists: {}", item.id)));
            }
            items.insert(item.id.clone(), item.clone());
            Ok(item)
        })
    }

    async fn update(&self, item: &GalleryItem) -> Result<GalleryItem> {
        self.mutate(|items| match items.get_mut(&item.id) {
            Some(existing) => {
                *existing = item.clone();
                Ok(item.clone())
            }
            None => Err(not_found(&item.id)),
        })
    }

    async fn delete(&self, id: &str) -> Result<()> {
        self.mutate(|items| {
            items
                .remove(id)
                .map(|_| ())
                .ok_or_else(|| not_found(id))
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_id_and_persists() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");

        let store = FileGalleryClient::open(&path).unwrap();
        let created = store.create(&GalleryItem::new("Blue Alfa")).await.unwrap();
        assert!(!created.id.is_empty());
        assert!(path.exists());

        let reopened = FileGalleryClient::open(&path).unwrap();
        let loaded = reopened.get(&created.id).await.unwrap().unwrap();
        assert_eq!(loaded.title, "Blue Alfa");
    }

    #[tokio::test]
    async fn test_update_missing_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGalleryClient::open(dir.path().join("gallery.json")).unwrap();

        let mut item = GalleryItem::new("x");
        item.id = "missing".into();
        assert!(matches!(store.update(&item).await, Err(GalleryError::Persistence { .. })));
        assert!(matches!(store.delete("missing").await, Err(GalleryError::Persistence { .. })));
    }

    #[tokio::test]
    async fn test_duplicate_id_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileGalleryClient::open(dir.path().join("gallery.json")).unwrap();

        let mut item = GalleryItem::new("x");
        item.id = "fixed".into();
        store.create(&item).await.unwrap();
        assert!(matches!(
            store.create(&item).await,
            Err(GalleryError::Persistence { .. })
        ));
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_broken_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("gallery.json");
        std::fs::write(&path, "{not json").unwrap();
        assert!(matches!(
            FileGalleryClient::open(&path),
            Err(GalleryError::Persistence { .. })
        ));
    }

    #[test]
    fn test_unreadable_file_is_persistence_error() {
        let dir = tempfile::tempdir().unwrap();
        // ディレクトリはファイルとして読めない
        assert!(matches!(
            FileGalleryClient::open(dir.path()),
            Err(GalleryError::Persistence { .. })
        ));
    }
}
