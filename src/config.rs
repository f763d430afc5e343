use crate::error::{GalleryError, Result};
use bodyshop_gallery_common::{GalleryDirectoryTable, PathNormalizer, DEFAULT_BLUR_AMOUNT};
use bodyshop_gallery_common::path::DEFAULT_LOCAL_HOSTS;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Config {
    pub api_base_url: String,
    pub api_token: Option<String>,
    pub timeout_seconds: u64,
    /// ローカル扱いするホスト（URLからパスだけ取り出す）
    pub local_hosts: Vec<String>,
    pub default_blur_amount: f64,
    /// ディレクトリ表の追加分（JSON）
    pub directory_table: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            api_base_url: "http://localhost:3000".into(),
            api_token: None,
            timeout_seconds: 30,
            local_hosts: DEFAULT_LOCAL_HOSTS.iter().map(|h| h.to_string()).collect(),
            default_blur_amount: DEFAULT_BLUR_AMOUNT,
            directory_table: None,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = std::fs::read_to_string(path)?;
            let config: Config = serde_json::from_str(&content)
                .map_err(|e| GalleryError::Config(format!("{}: {}", path.display(), e)))?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save(&self) -> Result<()> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let content = serde_json::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn config_path() -> Result<PathBuf> {
        let home = dirs::home_dir()
            .ok_or_else(|| GalleryError::Config("ホームディレクトリが見つかりません".into()))?;
        Ok(home.join(".config").join("bodyshop-gallery").join("config.json"))
    }

    /// APIのベースURL（環境変数を優先）
    pub fn api_base_url(&self) -> String {
        std::env::var("GALLERY_API_URL")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .unwrap_or_else(|| self.api_base_url.clone())
    }

    /// APIトークン（環境変数を優先）
    pub fn api_token(&self) -> Option<String> {
        std::env::var("GALLERY_API_TOKEN")
            .ok()
            .filter(|v| !v.trim().is_empty())
            .or_else(|| self.api_token.clone())
    }

    pub fn set_api_url(&mut self, url: String) -> Result<()> {
        self.api_base_url = url.trim_end_matches('/').to_string();
        self.save()
    }

    pub fn set_api_token(&mut self, token: String) -> Result<()> {
        self.api_token = Some(token);
        self.save()
    }

    /// 組み込み表に設定ファイルの追加分をマージ
    pub fn directory_table(&self) -> Result<GalleryDirectoryTable> {
        let mut table = GalleryDirectoryTable::builtin();
        if let Some(path) = &self.directory_table {
            if !path.exists() {
                return Err(GalleryError::FileNotFound(path.display().to_string()));
            }
            table.merge(&GalleryDirectoryTable::from_file(path)?);
        }
        Ok(table)
    }

    pub fn normalizer(&self) -> Result<PathNormalizer> {
        Ok(PathNormalizer::new(self.directory_table()?).with_local_hosts(self.local_hosts.iter()))
    }
}
