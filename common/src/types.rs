//! ギャラリーの型定義
//!
//! CLIとWeb(WASM)で共有される型:
//! - GalleryItem: ビフォー/アフター施工事例の1レコード
//! - BlurZone: ナンバープレート等を隠すブラー矩形（画像サイズに対する%）
//! - GalleryItemPatch: 部分更新（編集フォームの差分）

use crate::blur_map::BlurMap;
use crate::path::PathNormalizer;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// 新規ブラー領域のデフォルト半径(px)
pub const DEFAULT_BLUR_AMOUNT: f64 = 8.0;

fn default_blur_amount() -> f64 {
    DEFAULT_BLUR_AMOUNT
}

/// 画像の役割
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageRole {
    Main,
    Before,
    After,
}

impl ImageRole {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageRole::Main => "main",
            ImageRole::Before => "before",
            ImageRole::After => "after",
        }
    }
}

impl std::fmt::Display for ImageRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for ImageRole {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "main" => Ok(ImageRole::Main),
            "before" => Ok(ImageRole::Before),
            "after" => Ok(ImageRole::After),
            _ => Err(format!("Unknown image role: {}. Use main, before, or after", s)),
        }
    }
}

/// 保存時に付与するデバッグ用の出所情報（他のコンポーネントは解釈しない）
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ZoneProvenance {
    pub source_path: String,
    pub normalized_path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image_role: Option<ImageRole>,
}

/// ブラー矩形
///
/// x/y/width/height は画像の実寸に対するパーセント(0-100)。
/// rotation は中心回りの角度(度)、blur_amount はブラー半径(px)。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BlurZone {
    pub x: f64,
    pub y: f64,
    pub width: f64,
    pub height: f64,

    #[serde(default)]
    pub rotation: f64,

    #[serde(default = "default_blur_amount")]
    pub blur_amount: f64,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saved_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provenance: Option<ZoneProvenance>,
}

impl BlurZone {
    pub fn new(x: f64, y: f64, width: f64, height: f64) -> Self {
        Self {
            x,
            y,
            width,
            height,
            rotation: 0.0,
            blur_amount: DEFAULT_BLUR_AMOUNT,
            saved_at: None,
            provenance: None,
        }
    }

    pub fn with_rotation(mut self, rotation: f64) -> Self {
        self.rotation = rotation;
        self
    }

    pub fn with_blur_amount(mut self, blur_amount: f64) -> Self {
        self.blur_amount = blur_amount;
        self
    }

    /// 矩形が [0,100] の範囲に収まっているか
    pub fn is_within_bounds(&self) -> bool {
        let finite = [self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite());
        finite
            && self.x >= 0.0
            && self.y >= 0.0
            && self.width > 0.0
            && self.height > 0.0
            && self.x + self.width <= 100.0
            && self.y + self.height <= 100.0
    }

    /// [0,100] にクランプした矩形を返す
    ///
    /// 非有限値を含む、またはクランプ後に面積が0になる場合は None。
    /// 範囲外にはみ出した分は幅・高さから削る。
    pub fn clamped(&self) -> Option<BlurZone> {
        if ![self.x, self.y, self.width, self.height]
            .iter()
            .all(|v| v.is_finite())
        {
            return None;
        }

        let (x, width) = clamp_span(self.x, self.width)?;
        let (y, height) = clamp_span(self.y, self.height)?;

        let rotation = if self.rotation.is_finite() { self.rotation } else { 0.0 };
        let blur_amount = if self.blur_amount.is_finite() && self.blur_amount >= 0.0 {
            self.blur_amount
        } else {
            DEFAULT_BLUR_AMOUNT
        };

        Some(BlurZone {
            x,
            y,
            width,
            height,
            rotation,
            blur_amount,
            saved_at: self.saved_at.clone(),
            provenance: self.provenance.clone(),
        })
    }

    /// メタデータを無視して形状だけ比較
    pub fn same_geometry(&self, other: &BlurZone) -> bool {
        const EPS: f64 = 1e-6;
        (self.x - other.x).abs() < EPS
            && (self.y - other.y).abs() < EPS
            && (self.width - other.width).abs() < EPS
            && (self.height - other.height).abs() < EPS
            && (self.rotation - other.rotation).abs() < EPS
            && (self.blur_amount - other.blur_amount).abs() < EPS
    }
}

fn clamp_span(start: f64, len: f64) -> Option<(f64, f64)> {
    let begin = start.clamp(0.0, 100.0);
    let end = (start + len).clamp(0.0, 100.0);
    if end - begin > 0.0 {
        Some((begin, end - begin))
    } else {
        None
    }
}

/// ギャラリーアイテム（施工事例）
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItem {
    #[serde(default)]
    pub id: String,

    #[serde(default)]
    pub title: String,

    #[serde(default)]
    pub description: String,

    #[serde(default)]
    pub categories: BTreeSet<String>,

    #[serde(default)]
    pub tags: Vec<String>,

    #[serde(default)]
    pub main_image: String,

    #[serde(default)]
    pub before_images: Vec<String>,

    #[serde(default)]
    pub after_images: Vec<String>,

    /// 正規化パス → ブラー矩形リスト
    #[serde(default)]
    pub blur_areas: BlurMap,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<String>,
}

impl GalleryItem {
    pub fn new(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..Default::default()
        }
    }

    /// 全画像パスを役割付きで列挙（メイン → ビフォー → アフター）
    pub fn image_paths(&self) -> Vec<(ImageRole, &str)> {
        let mut paths = Vec::new();
        if !self.main_image.is_empty() {
            paths.push((ImageRole::Main, self.main_image.as_str()));
        }
        paths.extend(self.before_images.iter().map(|p| (ImageRole::Before, p.as_str())));
        paths.extend(self.after_images.iter().map(|p| (ImageRole::After, p.as_str())));
        paths
    }

    /// 画像パスの役割を判定（正規化後のパスで比較）
    pub fn role_of(&self, normalizer: &PathNormalizer, raw: &str) -> Option<ImageRole> {
        let target = normalizer.normalize(raw);
        if target.is_empty() {
            return None;
        }
        self.image_paths()
            .into_iter()
            .find(|(_, path)| normalizer.normalize(path) == target)
            .map(|(role, _)| role)
    }

    /// 画像リストから外れた画像のブラー領域を消す。削除したキー数を返す
    ///
    /// ほかの役割で残っている画像や、ファイル名だけが一致するキーは消さない。
    pub fn drop_removed_image_zones(&mut self, previous: &GalleryItem, normalizer: &PathNormalizer) -> usize {
        let current: BTreeSet<String> = self
            .image_paths()
            .into_iter()
            .map(|(_, p)| normalizer.normalize(p))
            .collect();
        let removed: Vec<String> = previous
            .image_paths()
            .into_iter()
            .filter(|(_, p)| !current.contains(&normalizer.normalize(p)))
            .map(|(_, p)| p.to_string())
            .collect();
        removed
            .iter()
            .map(|p| self.blur_areas.remove_image(normalizer, p))
            .sum()
    }

    /// 部分更新をマージ（指定されたフィールドのみ上書き）
    pub fn merge(&mut self, patch: GalleryItemPatch) {
        if let Some(title) = patch.title {
            self.title = title;
        }
        if let Some(description) = patch.description {
            self.description = description;
        }
        if let Some(categories) = patch.categories {
            self.categories = categories;
        }
        if let Some(tags) = patch.tags {
            self.tags = tags;
        }
        if let Some(main_image) = patch.main_image {
            self.main_image = main_image;
        }
        if let Some(before_images) = patch.before_images {
            self.before_images = before_images;
        }
        if let Some(after_images) = patch.after_images {
            self.after_images = after_images;
        }
        if let Some(blur_areas) = patch.blur_areas {
            self.blur_areas = blur_areas;
        }
    }
}

/// ギャラリーアイテムの部分更新
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GalleryItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub categories: Option<BTreeSet<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tags: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub main_image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub before_images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub after_images: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blur_areas: Option<BlurMap>,
}

impl GalleryItemPatch {
    pub fn is_empty(&self) -> bool {
        self == &GalleryItemPatch::default()
    }
}
