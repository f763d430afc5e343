//! ギャラリーAPI連携（fetch）
//!
//! GET /api/gallery, GET /api/gallery?id=, POST, PUT（blurAreas を含む全体）, DELETE ?id=

use bodyshop_gallery_common::GalleryItem;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, RequestMode, Response};

const GALLERY_ENDPOINT: &str = "/api/gallery";

/// 一覧レスポンス（配列そのまま、または items に包まれた形）
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Items(Vec<GalleryItem>),
    Wrapped { items: Vec<GalleryItem> },
}

#[derive(Clone, Debug, Default)]
pub struct GalleryApi {
    base_url: String,
}

impl GalleryApi {
    /// 同一オリジンのAPI
    pub fn same_origin() -> Self {
        Self::default()
    }

    pub fn with_base_url(base_url: &str) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn endpoint(&self) -> String {
        format!("{}{}", self.base_url, GALLERY_ENDPOINT)
    }

    fn item_url(&self, id: &str) -> String {
        format!("{}?id={}", self.endpoint(), js_sys::encode_uri_component(id))
    }

    pub async fn list(&self) -> Result<Vec<GalleryItem>, String> {
        let value = fetch_json(&self.endpoint(), "GET", None).await?;
        match parse::<ListResponse>(value)? {
            ListResponse::Items(items) | ListResponse::Wrapped { items } => Ok(items),
        }
    }

    pub async fn get(&self, id: &str) -> Result<GalleryItem, String> {
        parse(fetch_json(&self.item_url(id), "GET", None).await?)
    }

    pub async fn create(&self, item: &GalleryItem) -> Result<GalleryItem, String> {
        let body = serde_json::to_string(item).map_err(|e| e.to_string())?;
        parse(fetch_json(&self.endpoint(), "POST", Some(body)).await?)
    }

    pub async fn update(&self, item: &GalleryItem) -> Result<GalleryItem, String> {
        let body = serde_json::to_string(item).map_err(|e| e.to_string())?;
        parse(fetch_json(&self.endpoint(), "PUT", Some(body)).await?)
    }

    pub async fn delete(&self, id: &str) -> Result<(), String> {
        fetch_json(&self.item_url(id), "DELETE", None).await.map(|_| ())
    }
}

fn parse<T: DeserializeOwned>(value: JsValue) -> Result<T, String> {
    serde_wasm_bindgen::from_value(value).map_err(|e| format!("レスポンスの解析に失敗: {}", e))
}

fn js_error(e: JsValue) -> String {
    e.as_string().unwrap_or_else(|| format!("{:?}", e))
}

/// fetch呼び出し（共通処理）。失敗はすべて文字列のエラーにまとめる
async fn fetch_json(url: &str, method: &str, body: Option<String>) -> Result<JsValue, String> {
    let opts = RequestInit::new();
    opts.set_method(method);
    opts.set_mode(RequestMode::SameOrigin);
    if let Some(body) = &body {
        opts.set_body(&JsValue::from_str(body));
    }

    let request = Request::new_with_str_and_init(url, &opts).map_err(js_error)?;
    request
        .headers()
        .set("Content-Type", "application/json")
        .map_err(js_error)?;

    let window = web_sys::window().ok_or_else(|| "window が取得できません".to_string())?;
    let resp_value = JsFuture::from(window.fetch_with_request(&request))
        .await
        .map_err(js_error)?;
    let resp: Response = resp_value.dyn_into().map_err(js_error)?;

    if !resp.ok() {
        return Err(format!("API error: {} {}", resp.status(), resp.status_text()));
    }

    // 204 No Content など本文がない場合
    if resp.status() == 204 {
        return Ok(JsValue::NULL);
    }

    JsFuture::from(resp.json().map_err(js_error)?)
        .await
        .map_err(js_error)
}

#[cfg(test)]
mod tests {
    use super::*;
    use wasm_bindgen_test::*;

    wasm_bindgen_test_configure!(run_in_browser);

    #[test]
    fn test_endpoint() {
        assert_eq!(GalleryApi::same_origin().endpoint(), "/api/gallery");
        assert_eq!(
            GalleryApi::with_base_url("http://localhost:3000/").endpoint(),
            "http://localhost:3000/api/gallery"
        );
    }

    #[wasm_bindgen_test]
    fn test_item_url_encodes_id() {
        let api = GalleryApi::same_origin();
        assert_eq!(api.item_url("a b/c"), "/api/gallery?id=a%20b%2Fc");
    }
}
