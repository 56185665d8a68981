//! Server API boundary
//!
//! [`JellyfinApi`] is the seam between reconciliation and the network. The
//! production implementation is [`JellyfinClient`]; tests substitute an
//! in-memory fake.

pub mod client;
pub mod schema;

use async_trait::async_trait;
use serde_json::Value;

pub use client::JellyfinClient;
pub use schema::{
    AddVirtualFolderDto, CreateUserByName, LibraryOptions, MediaPathInfo, PluginInfo, UserDto,
    VirtualFolderInfo,
};

use crate::config::CollectionType;

/// A failed call to the server
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("{method} {endpoint} failed: {status}")]
    Status {
        method: &'static str,
        endpoint: String,
        status: u16,
    },

    #[error("{method} {endpoint} failed: {source}")]
    Transport {
        method: &'static str,
        endpoint: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("{method} {endpoint} returned an unreadable body: {message}")]
    Decode {
        method: &'static str,
        endpoint: String,
        message: String,
    },
}

impl ApiError {
    /// HTTP status, when the server answered at all
    pub fn status(&self) -> Option<u16> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            ApiError::Transport { source, .. } => source.status().map(|s| s.as_u16()),
            ApiError::Decode { .. } => None,
        }
    }

    pub fn endpoint(&self) -> &str {
        match self {
            ApiError::Status { endpoint, .. }
            | ApiError::Transport { endpoint, .. }
            | ApiError::Decode { endpoint, .. } => endpoint,
        }
    }
}

pub type ApiResult<T> = Result<T, ApiError>;

/// Read and write calls used by reconciliation and dump
#[async_trait]
pub trait JellyfinApi: Send + Sync {
    async fn get_system_configuration(&self) -> ApiResult<Value>;

    async fn update_system_configuration(&self, body: &Value) -> ApiResult<()>;

    async fn get_encoding_configuration(&self) -> ApiResult<Value>;

    async fn update_encoding_configuration(&self, body: &Value) -> ApiResult<()>;

    async fn get_virtual_folders(&self) -> ApiResult<Vec<VirtualFolderInfo>>;

    async fn add_virtual_folder(
        &self,
        name: &str,
        collection_type: CollectionType,
        body: &AddVirtualFolderDto,
    ) -> ApiResult<()>;

    async fn get_branding_configuration(&self) -> ApiResult<Value>;

    async fn update_branding_configuration(&self, body: &Value) -> ApiResult<()>;

    async fn get_users(&self) -> ApiResult<Vec<UserDto>>;

    async fn create_user(&self, body: &CreateUserByName) -> ApiResult<()>;

    /// Replace a user's whole policy object
    async fn update_user_policy(&self, user_id: &str, body: &Value) -> ApiResult<()>;

    async fn get_plugins(&self) -> ApiResult<Vec<PluginInfo>>;

    async fn install_package(&self, name: &str) -> ApiResult<()>;

    async fn get_plugin_configuration(&self, plugin_id: &str) -> ApiResult<Value>;

    async fn update_plugin_configuration(&self, plugin_id: &str, body: &Value) -> ApiResult<()>;

    async fn complete_startup_wizard(&self) -> ApiResult<()>;
}
