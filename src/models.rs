//! Data models for Google OAuth and Drive API payloads.

use serde::{Deserialize, Serialize};

/// Mime type Drive uses for folders.
pub const FOLDER_MIME_TYPE: &str = "application/vnd.google-apps.folder";

/// Resource kind tag carried by genuine file and folder entries.
pub const FILE_KIND: &str = "drive#file";

/// A file or folder returned by a Drive listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DriveEntry {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub mime_type: Option<String>,
    #[serde(default)]
    pub kind: Option<String>,
    #[serde(default)]
    pub permissions: Vec<Permission>,
}

impl DriveEntry {
    /// Whether the listing tagged this entry as a first-class Drive item.
    pub fn is_drive_file(&self) -> bool {
        self.kind.as_deref() == Some(FILE_KIND)
    }

    pub fn is_folder(&self) -> bool {
        self.mime_type.as_deref() == Some(FOLDER_MIME_TYPE)
    }

    /// Find the permission granted to `email`, if any.
    pub fn permission_for(&self, email: &str) -> Option<&Permission> {
        self.permissions
            .iter()
            .find(|p| p.email_address.as_deref() == Some(email))
    }

    /// Whether `email` holds the owner role on this entry.
    pub fn is_owned_by(&self, email: &str) -> bool {
        self.permissions
            .iter()
            .any(|p| p.email_address.as_deref() == Some(email) && p.role == Role::Owner)
    }
}

impl std::fmt::Display for DriveEntry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.name, self.id)
    }
}

/// Access roles a Drive permission can carry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Role {
    Owner,
    Organizer,
    FileOrganizer,
    Writer,
    Commenter,
    Reader,
    #[serde(other)]
    Unknown,
}

/// A permission entry attached to a Drive file.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Permission {
    pub id: String,
    #[serde(default)]
    pub email_address: Option<String>,
    pub role: Role,
    #[serde(default)]
    pub pending_owner: bool,
}

/// Body of a permissions.update call.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PermissionUpdate {
    pub role: Role,
    pub pending_owner: bool,
}

impl PermissionUpdate {
    /// Writer access flagged as pending owner, which starts Drive's
    /// ownership transfer handshake.
    pub fn pending_owner() -> Self {
        Self {
            role: Role::Writer,
            pending_owner: true,
        }
    }
}

/// Response from the files.list API endpoint.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileListResponse {
    #[serde(default)]
    pub files: Vec<DriveEntry>,
    #[serde(default)]
    pub next_page_token: Option<String>,
}

/// Authenticated user from the OAuth2 userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct UserInfo {
    pub email: String,
    #[serde(default)]
    pub name: Option<String>,
}

/// Google API error response.
#[derive(Debug, Deserialize)]
pub struct ApiErrorResponse {
    pub error: ApiErrorDetail,
}

#[derive(Debug, Deserialize)]
pub struct ApiErrorDetail {
    pub code: u16,
    pub message: String,
}

/// Client secrets file as downloaded from the Google Cloud console.
#[derive(Debug, Deserialize)]
pub struct CredentialsFile {
    #[serde(default)]
    pub installed: Option<ClientSecrets>,
    #[serde(default)]
    pub web: Option<ClientSecrets>,
}

/// OAuth2 client registration for an installed application.
#[derive(Debug, Clone, Deserialize)]
pub struct ClientSecrets {
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub redirect_uris: Vec<String>,
    #[serde(default)]
    pub auth_uri: Option<String>,
    #[serde(default)]
    pub token_uri: Option<String>,
}

/// Token cache persisted between runs.
///
/// The layout matches what the googleapis Node client writes, so an
/// existing `token.json` keeps working.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub access_token: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub scope: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub token_type: Option<String>,
    /// Expiry as milliseconds since the Unix epoch.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<u64>,
}

/// OAuth2 token endpoint response.
#[derive(Debug, Deserialize)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub scope: Option<String>,
    #[serde(default)]
    pub token_type: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
}
