//! Bodyshop Gallery
//!
//! 板金塗装の施工事例ギャラリーの管理ツール（CLI・ネイティブライブラリ）
//! - ギャラリーAPI / JSONファイルストアへのCRUD
//! - ブラー領域マップの監査・修復
//! - ブラー領域の画像への焼き込み

pub mod audit;
pub mod cli;
pub mod config;
pub mod error;
pub mod gallery;
pub mod redact;
pub mod scanner;

pub use bodyshop_gallery_common as common;
