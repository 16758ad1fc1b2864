//! Google Drive API client for the calls an ownership sweep needs.

use std::num::NonZeroU32;

use governor::{DefaultDirectRateLimiter, Quota, RateLimiter};
use reqwest::{Client, Response};
use tracing::{debug, warn};

use crate::auth::Authenticator;
use crate::error::{DriveError, Result};
use crate::models::{ApiErrorResponse, FileListResponse, Permission, PermissionUpdate, UserInfo};

/// Base URL for Google Drive API v3.
const DRIVE_API_BASE: &str = "https://www.googleapis.com/drive/v3";

/// OAuth2 userinfo endpoint.
const USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

/// Largest page the files.list endpoint will return.
pub const PAGE_SIZE: u32 = 1000;

/// Fields requested for every listed entry.
const LIST_FIELDS: &str = "nextPageToken, files(id, name, permissions, mimeType, kind)";

/// Default request budget per second.
pub const DEFAULT_REQUESTS_PER_SECOND: u32 = 10;

/// Remote endpoints the client talks to.
#[derive(Debug, Clone)]
pub struct Endpoints {
    pub drive_api_base: String,
    pub userinfo_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            drive_api_base: DRIVE_API_BASE.to_string(),
            userinfo_url: USERINFO_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// Point both endpoints at a single base URL, as a mock server would serve them.
    pub fn with_base(base: &str) -> Self {
        let base = base.trim_end_matches('/');
        Self {
            drive_api_base: base.to_string(),
            userinfo_url: format!("{}/oauth2/v2/userinfo", base),
        }
    }
}

/// Client for listing folders and updating permissions on Google Drive.
///
/// Every request waits on a shared token bucket before it is sent.
pub struct DriveClient {
    auth: Authenticator,
    http: Client,
    endpoints: Endpoints,
    limiter: DefaultDirectRateLimiter,
}

impl DriveClient {
    /// Create a client against the public Google endpoints.
    pub fn new(auth: Authenticator, requests_per_second: NonZeroU32) -> Self {
        Self::with_endpoints(auth, Endpoints::default(), requests_per_second)
    }

    pub fn with_endpoints(
        auth: Authenticator,
        endpoints: Endpoints,
        requests_per_second: NonZeroU32,
    ) -> Self {
        Self {
            auth,
            http: Client::new(),
            endpoints,
            limiter: RateLimiter::direct(Quota::per_second(requests_per_second)),
        }
    }

    /// Wait for a request slot and a valid access token.
    async fn ready(&self) -> Result<String> {
        self.limiter.until_ready().await;
        self.auth.get_access_token().await
    }

    /// Fetch the authenticated user's profile.
    pub async fn current_user(&self) -> Result<UserInfo> {
        let token = self.ready().await?;

        let response = self
            .http
            .get(&self.endpoints.userinfo_url)
            .bearer_auth(&token)
            .send()
            .await?;

        let user: UserInfo = check_status(response).await?.json().await?;
        Ok(user)
    }

    /// List the direct children of a folder.
    ///
    /// Only the first page (up to [`PAGE_SIZE`] entries) is fetched; a
    /// truncated listing is reported but not followed.
    pub async fn list_children(&self, folder_id: &str) -> Result<FileListResponse> {
        let token = self.ready().await?;
        let query = format!("'{}' in parents", folder_id);
        let page_size = PAGE_SIZE.to_string();

        debug!("Listing children of {}", folder_id);

        let response = self
            .http
            .get(format!("{}/files", self.endpoints.drive_api_base))
            .bearer_auth(&token)
            .query(&[
                ("q", query.as_str()),
                ("pageSize", page_size.as_str()),
                ("fields", LIST_FIELDS),
            ])
            .send()
            .await?;

        let listing: FileListResponse = check_status(response).await?.json().await?;

        if listing.next_page_token.is_some() {
            warn!(
                "Folder {} has more than {} children; only the first page is processed",
                folder_id, PAGE_SIZE
            );
        }

        Ok(listing)
    }

    /// Update a single permission on a file.
    pub async fn update_permission(
        &self,
        file_id: &str,
        permission_id: &str,
        update: &PermissionUpdate,
    ) -> Result<Permission> {
        let token = self.ready().await?;

        debug!("Updating permission {} on {}", permission_id, file_id);

        let response = self
            .http
            .patch(format!(
                "{}/files/{}/permissions/{}",
                self.endpoints.drive_api_base, file_id, permission_id
            ))
            .bearer_auth(&token)
            .json(update)
            .send()
            .await?;

        let permission: Permission = check_status(response).await?.json().await?;
        Ok(permission)
    }
}

/// Turn a non-success response into [`DriveError::ApiError`], preferring
/// Google's error envelope when the body carries one.
async fn check_status(response: Response) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let error_body = response.text().await.unwrap_or_default();
    if let Ok(api_error) = serde_json::from_str::<ApiErrorResponse>(&error_body) {
        return Err(DriveError::ApiError {
            status: api_error.error.code,
            message: api_error.error.message,
        });
    }

    Err(DriveError::ApiError {
        status: status.as_u16(),
        message: error_body,
    })
}
