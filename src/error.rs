use thiserror::Error;

#[derive(Error, Debug)]
pub enum GalleryError {
    /// 永続化の失敗（API・ファイルストアのエラーはすべてここに集約）
    #[error("保存に失敗しました: {message}")]
    Persistence { message: String },

    #[error("ギャラリー項目が見つかりません: {0}")]
    NotFound(String),

    #[error("設定エラー: {0}")]
    Config(String),

    #[error("ファイルが見つかりません: {0}")]
    FileNotFound(String),

    #[error("フォルダが見つかりません: {0}")]
    FolderNotFound(String),

    #[error("画像読み込みエラー: {0}")]
    ImageLoad(String),

    #[error("JSON解析エラー: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IOエラー: {0}")]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Common(#[from] bodyshop_gallery_common::Error),
}

impl GalleryError {
    pub fn persistence(message: impl Into<String>) -> Self {
        GalleryError::Persistence {
            message: message.into(),
        }
    }
}

impl From<reqwest::Error> for GalleryError {
    fn from(e: reqwest::Error) -> Self {
        GalleryError::persistence(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, GalleryError>;
