//! HTTP implementation of [`JellyfinApi`]

use anyhow::Context;
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::debug;
use url::Url;

use super::schema::{AddVirtualFolderDto, CreateUserByName, PluginInfo, UserDto, VirtualFolderInfo};
use super::{ApiError, ApiResult, JellyfinApi};
use crate::config::CollectionType;

const AUTHORIZATION: &str = concat!(
    "MediaBrowser Client=\"jellarr\", Device=\"cli\", Version=\"",
    env!("CARGO_PKG_VERSION"),
    "\""
);

/// Authenticated client for a single server
#[derive(Debug, Clone)]
pub struct JellyfinClient {
    http: reqwest::Client,
    base_url: Url,
}

impl JellyfinClient {
    pub fn new(base_url: &Url, api_key: &str) -> anyhow::Result<Self> {
        if base_url.cannot_be_a_base() {
            anyhow::bail!("Base URL cannot carry a path: {}", base_url);
        }

        let mut token =
            HeaderValue::from_str(api_key).context("API key contains invalid header characters")?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static("x-emby-token"), token);
        headers.insert(
            HeaderName::from_static("x-emby-authorization"),
            HeaderValue::from_static(AUTHORIZATION),
        );

        let http = reqwest::Client::builder()
            .user_agent(concat!("jellarr/", env!("CARGO_PKG_VERSION")))
            .default_headers(headers)
            .build()
            .context("Failed to build HTTP client")?;

        let mut base_url = base_url.clone();
        if let Ok(mut segments) = base_url.path_segments_mut() {
            segments.pop_if_empty();
        }

        Ok(Self { http, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Absolute URL for `segments` below the base URL; segments are escaped.
    pub fn url(&self, segments: &[&str]) -> Url {
        let mut url = self.base_url.clone();
        if let Ok(mut path) = url.path_segments_mut() {
            path.pop_if_empty().extend(segments);
        }
        url
    }

    async fn get_json<T: DeserializeOwned>(&self, segments: &[&str]) -> ApiResult<T> {
        let endpoint = endpoint(segments);
        let request = self.http.get(self.url(segments));
        let response = self.execute("GET", &endpoint, request).await?;
        response.json::<T>().await.map_err(|e| ApiError::Decode {
            method: "GET",
            endpoint,
            message: e.to_string(),
        })
    }

    async fn post_json<B: Serialize + ?Sized>(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
        body: &B,
    ) -> ApiResult<()> {
        let endpoint = endpoint(segments);
        let request = self.http.post(self.url(segments)).query(query).json(body);
        self.execute("POST", &endpoint, request).await?;
        Ok(())
    }

    async fn post_empty(&self, segments: &[&str]) -> ApiResult<()> {
        let endpoint = endpoint(segments);
        let request = self.http.post(self.url(segments));
        self.execute("POST", &endpoint, request).await?;
        Ok(())
    }

    async fn execute(
        &self,
        method: &'static str,
        endpoint: &str,
        request: reqwest::RequestBuilder,
    ) -> ApiResult<reqwest::Response> {
        debug!("{} {}", method, endpoint);

        let response = request.send().await.map_err(|source| ApiError::Transport {
            method,
            endpoint: endpoint.to_string(),
            source,
        })?;

        let status = response.status();
        if !status.is_success() {
            return Err(ApiError::Status {
                method,
                endpoint: endpoint.to_string(),
                status: status.as_u16(),
            });
        }

        Ok(response)
    }
}

fn endpoint(segments: &[&str]) -> String {
    format!("/{}", segments.join("/"))
}

#[async_trait]
impl JellyfinApi for JellyfinClient {
    async fn get_system_configuration(&self) -> ApiResult<Value> {
        self.get_json(&["System", "Configuration"]).await
    }

    async fn update_system_configuration(&self, body: &Value) -> ApiResult<()> {
        self.post_json(&["System", "Configuration"], &[], body).await
    }

    async fn get_encoding_configuration(&self) -> ApiResult<Value> {
        self.get_json(&["System", "Configuration", "encoding"]).await
    }

    async fn update_encoding_configuration(&self, body: &Value) -> ApiResult<()> {
        self.post_json(&["System", "Configuration", "encoding"], &[], body)
            .await
    }

    async fn get_virtual_folders(&self) -> ApiResult<Vec<VirtualFolderInfo>> {
        self.get_json(&["Library", "VirtualFolders"]).await
    }

    async fn add_virtual_folder(
        &self,
        name: &str,
        collection_type: CollectionType,
        body: &AddVirtualFolderDto,
    ) -> ApiResult<()> {
        let query = [
            ("name", name),
            ("collectionType", collection_type.as_str()),
            ("refreshLibrary", "true"),
        ];
        self.post_json(&["Library", "VirtualFolders"], &query, body)
            .await
    }

    async fn get_branding_configuration(&self) -> ApiResult<Value> {
        self.get_json(&["System", "Configuration", "Branding"]).await
    }

    async fn update_branding_configuration(&self, body: &Value) -> ApiResult<()> {
        self.post_json(&["System", "Configuration", "Branding"], &[], body)
            .await
    }

    async fn get_users(&self) -> ApiResult<Vec<UserDto>> {
        self.get_json(&["Users"]).await
    }

    async fn create_user(&self, body: &CreateUserByName) -> ApiResult<()> {
        self.post_json(&["Users", "New"], &[], body).await
    }

    async fn update_user_policy(&self, user_id: &str, body: &Value) -> ApiResult<()> {
        self.post_json(&["Users", user_id, "Policy"], &[], body).await
    }

    async fn get_plugins(&self) -> ApiResult<Vec<PluginInfo>> {
        self.get_json(&["Plugins"]).await
    }

    async fn install_package(&self, name: &str) -> ApiResult<()> {
        self.post_empty(&["Packages", "Installed", name]).await
    }

    async fn get_plugin_configuration(&self, plugin_id: &str) -> ApiResult<Value> {
        self.get_json(&["Plugins", plugin_id, "Configuration"]).await
    }

    async fn update_plugin_configuration(&self, plugin_id: &str, body: &Value) -> ApiResult<()> {
        self.post_json(&["Plugins", plugin_id, "Configuration"], &[], body)
            .await
    }

    async fn complete_startup_wizard(&self) -> ApiResult<()> {
        self.post_empty(&["Startup", "Complete"]).await
    }
}
