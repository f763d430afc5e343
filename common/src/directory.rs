//! ギャラリーディレクトリ表
//!
//! ファイル名に含まれる車種トークン（小文字の部分文字列）から
//! `/images/gallery-page/<slug>/` のディレクトリを引く表。
//! パス正規化とパス候補の提示の両方がこの表を参照する。

use crate::error::Result;
use serde::{Deserialize, Serialize};

/// ギャラリー画像のルートディレクトリ
pub const GALLERY_PAGE_ROOT: &str = "/images/gallery-page";

/// 表の1エントリ
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DirectoryEntry {
    /// ファイル名に含まれる小文字トークン（例: "bluealfa"）
    pub token: String,
    /// ディレクトリ名（例: "blue-alfa-repair"）
    pub slug: String,
}

/// 車種トークン → ディレクトリ表
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GalleryDirectoryTable {
    #[serde(default)]
    entries: Vec<DirectoryEntry>,
}

impl GalleryDirectoryTable {
    /// 組み込みの表
    pub fn builtin() -> Self {
        let mut table = Self::default();

        table.insert("thunderbird", "thunderbird-restoration");
        table.insert("cadillac", "cadillac-repair");
        table.insert("porsche", "porsche-repair");
        table.insert("mustangrebuild", "mustang-rebuild");
        table.insert("bluemustang", "blue-mustang-repair");
        table.insert("mercedessl550", "mercedes-sl550-repair");
        table.insert("greenmercedes", "green-mercedes-repair");
        table.insert("jaguar", "jaguar-repair");
        table.insert("hondaaccord", "honda-accord-repair");
        table.insert("blueaccord", "blue-accord-repair");
        table.insert("bluealfa", "blue-alfa-repair");
        table.insert("bmw", "bmw-e90-repair");

        table
    }

    /// JSONファイルから読み込み（非WASM環境のみ）
    #[cfg(not(target_arch = "wasm32"))]
    pub fn from_file(path: &std::path::Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_json(&content)
    }

    /// JSON文字列から読み込み
    ///
    /// `{"entries": [{"token": "...", "slug": "..."}]}` 形式。
    /// トークンは小文字に揃える。
    pub fn from_json(json: &str) -> Result<Self> {
        let parsed: Self = serde_json::from_str(json)?;
        let mut table = Self::default();
        for entry in parsed.entries {
            table.insert(&entry.token, &entry.slug);
        }
        Ok(table)
    }

    /// エントリを追加（同じトークンは上書き）
    pub fn insert(&mut self, token: &str, slug: &str) {
        let token = token.trim().to_lowercase();
        let slug = slug.trim().trim_matches('/').to_string();
        if token.is_empty() || slug.is_empty() {
            return;
        }
        if let Some(existing) = self.entries.iter_mut().find(|e| e.token == token) {
            existing.slug = slug;
        } else {
            self.entries.push(DirectoryEntry { token, slug });
        }
    }

    /// 表をマージ（後から追加した方が優先）
    pub fn merge(&mut self, other: &GalleryDirectoryTable) {
        for entry in &other.entries {
            self.insert(&entry.token, &entry.slug);
        }
    }

    /// ファイル名からディレクトリを引く（部分一致で最長マッチ）
    pub fn slug_for(&self, file_name: &str) -> Option<&str> {
        if file_name.is_empty() {
            return None;
        }
        let lower = file_name.to_lowercase();

        let mut best: Option<&DirectoryEntry> = None;
        for entry in &self.entries {
            if lower.contains(entry.token.as_str())
                && best.map_or(true, |b| entry.token.len() > b.token.len())
            {
                best = Some(entry);
            }
        }
        best.map(|e| e.slug.as_str())
    }

    /// ファイル名からギャラリー内の推奨パスを作る
    pub fn suggest_path(&self, file_name: &str) -> Option<String> {
        self.slug_for(file_name)
            .map(|slug| format!("{}/{}/{}", GALLERY_PAGE_ROOT, slug, file_name))
    }

    pub fn entries(&self) -> &[DirectoryEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
