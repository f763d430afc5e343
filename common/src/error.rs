//! エラー型定義

use thiserror::Error;

/// 共通エラー型
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Config error: {0}")]
    Config(String),

    /// 画像の実寸が取れないなど、ピクセル↔パーセント変換ができない
    #[error("Geometry conversion error: {0}")]
    GeometryConversion(String),

    #[error("Image path is empty")]
    EmptyImagePath,

    #[error("A save is already in progress")]
    SaveInProgress,

    #[error("Zone index out of range: {0}")]
    InvalidZoneIndex(usize),

    #[error("Blur editor is not open")]
    EditorClosed,
}

/// Result型エイリアス
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_malformed_directory_table_is_json_error() {
        let error = crate::GalleryDirectoryTable::from_json("{ not a table").unwrap_err();
        assert!(matches!(error, Error::Json(_)));
        assert!(error.to_string().starts_with("JSON error"));
    }

    #[test]
    fn test_error_display_geometry() {
        let error = Error::GeometryConversion("natural size unavailable".to_string());
        assert_eq!(
            format!("{}", error),
            "Geometry conversion error: natural size unavailable"
        );
    }

    #[test]
    fn test_save_in_progress_display() {
        assert_eq!(Error::SaveInProgress.to_string(), "A save is already in progress");
    }

    #[test]
    fn test_error_invalid_zone_index() {
        let error = Error::InvalidZoneIndex(3);
        assert!(format!("{}", error).contains('3'));
    }
}
