//! ローカル画像フォルダのスキャン
//!
//! 撮影フォルダを走査し、ディレクトリ表からギャラリー内の配置先を提案する。

use crate::error::{GalleryError, Result};
use bodyshop_gallery_common::path::is_before_after_name;
use bodyshop_gallery_common::GalleryDirectoryTable;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[derive(Debug, Clone)]
pub struct ImageInfo {
    pub path: PathBuf,
    pub file_name: String,
}

/// 配置先の提案
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub file_name: String,
    /// ギャラリー内のパス（表にない場合は None）
    pub gallery_path: Option<String>,
    /// before-/after- 命名か
    pub before_after: bool,
}

const IMAGE_EXTENSIONS: &[&str] = &["jpg", "jpeg", "png", "webp"];

pub fn scan_folder(folder: &Path, recursive: bool) -> Result<Vec<ImageInfo>> {
    if !folder.exists() {
        return Err(GalleryError::FolderNotFound(folder.display().to_string()));
    }

    let max_depth = if recursive { usize::MAX } else { 1 };
    let mut images = Vec::new();

    for entry in WalkDir::new(folder)
        .max_depth(max_depth)
        .into_iter()
        .filter_map(|e| e.ok())
    {
        let path = entry.path();

        if !path.is_file() || !is_image_file(path) {
            continue;
        }

        let file_name = path
            .file_name()
            .map(|n| n.to_string_lossy().to_string())
            .unwrap_or_default();

        images.push(ImageInfo {
            path: path.to_path_buf(),
            file_name,
        });
    }

    // ファイル名でソート
    images.sort_by(|a, b| a.file_name.cmp(&b.file_name));

    Ok(images)
}

fn is_image_file(path: &Path) -> bool {
    path.extension()
        .map(|ext| {
            let ext = ext.to_string_lossy().to_lowercase();
            IMAGE_EXTENSIONS.contains(&ext.as_str())
        })
        .unwrap_or(false)
}

/// ファイル名ごとの配置先を提案
pub fn suggest_paths(images: &[ImageInfo], table: &GalleryDirectoryTable) -> Vec<Suggestion> {
    images
        .iter()
        .map(|img| Suggestion {
            file_name: img.file_name.clone(),
            gallery_path: table.suggest_path(&img.file_name),
            before_after: is_before_after_name(&img.file_name),
        })
        .collect()
}
