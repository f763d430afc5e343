//! プレビュー用のオブジェクトURL
//!
//! 選択したファイルを `blob:` URL で表示する。
//! 差し替え・破棄のたびに revoke してブラウザのメモリを解放する。

use web_sys::{Blob, Url};

/// drop 時に revoke されるオブジェクトURL
#[derive(Debug)]
pub struct ObjectUrl(String);

impl ObjectUrl {
    pub fn from_blob(blob: &Blob) -> Result<Self, String> {
        Url::create_object_url_with_blob(blob)
            .map(ObjectUrl)
            .map_err(|e| format!("プレビューを作成できません: {:?}", e))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Drop for ObjectUrl {
    fn drop(&mut self) {
        let _ = Url::revoke_object_url(&self.0);
    }
}
