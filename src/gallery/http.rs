//! ギャラリーAPIクライアント（reqwest）

use super::{sort_items, GalleryClient};
use crate::config::Config;
use crate::error::{GalleryError, Result};
use bodyshop_gallery_common::GalleryItem;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use std::time::Duration;
use tracing::debug;

const GALLERY_ENDPOINT: &str = "/api/gallery";

/// 一覧レスポンス（配列そのまま、または items に包まれた形）
#[derive(Deserialize)]
#[serde(untagged)]
enum ListResponse {
    Items(Vec<GalleryItem>),
    Wrapped { items: Vec<GalleryItem> },
}

pub struct HttpGalleryClient {
    client: Client,
    endpoint: String,
    token: Option<String>,
}

impl HttpGalleryClient {
    pub fn new(base_url: &str, token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| GalleryError::Config(format!("HTTPクライアントの初期化に失敗: {}", e)))?;

        Ok(Self {
            client,
            endpoint: format!("{}{}", base_url.trim_end_matches('/'), GALLERY_ENDPOINT),
            token,
        })
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(
            &config.api_base_url(),
            config.api_token(),
            Duration::from_secs(config.timeout_seconds),
        )
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = self.authorize(request).send().await?;
        debug!(status = %response.status(), url = %response.url(), "gallery api response");
        Ok(response)
    }
}

/// 2xx 以外を Persistence エラーに変換
async fn check(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(GalleryError::persistence(format!("HTTP {}: {}", status, body.trim())))
}

async fn parse<T: serde::de::DeserializeOwned>(response: Response) -> Result<T> {
    let text = response.text().await?;
    serde_json::from_str(&text)
        .map_err(|e| GalleryError::persistence(format!("レスポンスの解析に失敗: {}", e)))
}

impl GalleryClient for HttpGalleryClient {
    async fn list(&self) -> Result<Vec<GalleryItem>> {
        let response = check(self.send(self.client.get(&self.endpoint)).await?).await?;
        let mut items = match parse::<ListResponse>(response).await? {
            ListResponse::Items(items) | ListResponse::Wrapped { items } => items,
        };
        sort_items(&mut items);
        Ok(items)
    }

    async fn get(&self, id: &str) -> Result<Option<GalleryItem>> {
        let request = self.client.get(&self.endpoint).query(&[("id", id)]);
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = check(response).await?;
        parse(response).await.map(Some)
    }

    async fn create(&self, item: &GalleryItem) -> Result<GalleryItem> {
        let response = check(self.send(self.client.post(&self.endpoint).json(item)).await?).await?;
        parse(response).await
    }

    async fn update(&self, item: &GalleryItem) -> Result<GalleryItem> {
        let response = self.send(self.client.put(&self.endpoint).json(item)).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GalleryError::persistence(format!("gallery item not found: {}", item.id)));
        }
        parse(check(response).await?).await
    }

    async fn delete(&self, id: &str) -> Result<()> {
        let request = self.client.delete(&self.endpoint).query(&[("id", id)]);
        let response = self.send(request).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Err(GalleryError::persistence(format!("gallery item not found: {}", id)));
        }
        check(response).await?;
        Ok(())
    }
}
