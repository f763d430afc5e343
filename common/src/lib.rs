//! Bodyshop Gallery Common Library
//!
//! CLIとWeb(WASM)で共有される型とロジック
//! - 画像パスの正規化（ブラー領域の結合キー）
//! - ブラー領域マップの照合・保存
//! - ブラー領域エディタの状態機械
//! - ブラーオーバーレイの描画計画

pub mod types;
pub mod error;
pub mod directory;
pub mod path;
pub mod blur_map;
pub mod geometry;
pub mod editor;
pub mod overlay;

pub use types::{BlurZone, GalleryItem, GalleryItemPatch, ImageRole, ZoneProvenance, DEFAULT_BLUR_AMOUNT};
pub use error::{Error, Result};
pub use directory::{DirectoryEntry, GalleryDirectoryTable};
pub use path::{normalize_image_path, NormalizationWarning, Normalized, PathNormalizer};
pub use blur_map::{BlurMap, MatchStrategy, Resolution, SaveContext};
pub use geometry::{ImageSize, PixelRect, Point};
pub use editor::{BlurEditor, CommitRequest, EditorSession, EditorState, Handle, Hit};
pub use overlay::{plan_overlays, ImageLoadState, OverlayBox, OverlayPlan};
