//! OAuth2 installed-app authorization with a local token cache.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;
use std::sync::Arc;
use std::time::{SystemTime, UNIX_EPOCH};

use reqwest::{Client, Url};
use tokio::io::{AsyncBufRead, AsyncBufReadExt, BufReader};
use tokio::sync::RwLock;
use tracing::{debug, error, info, warn};

use crate::error::{DriveError, Result};
use crate::models::{ClientSecrets, CredentialsFile, StoredToken, TokenResponse};

/// Google OAuth2 authorization endpoint.
const AUTH_URI: &str = "https://accounts.google.com/o/oauth2/v2/auth";

/// Google OAuth2 token endpoint.
const TOKEN_URI: &str = "https://oauth2.googleapis.com/token";

/// Redirect used when the credentials file lists none.
const OOB_REDIRECT_URI: &str = "urn:ietf:wg:oauth:2.0:oob";

/// Drive read/write plus the profile scopes needed to look up the caller's email.
pub const SCOPES: &[&str] = &[
    "https://www.googleapis.com/auth/drive",
    "https://www.googleapis.com/auth/userinfo.profile",
    "https://www.googleapis.com/auth/userinfo.email",
];

/// Access tokens this close to expiry are refreshed before use.
const EXPIRY_SKEW_MS: u64 = 60_000;

/// Read the client secrets from a Google "installed app" credentials file.
pub fn load_client_secrets<P: AsRef<Path>>(path: P) -> Result<ClientSecrets> {
    let content = fs::read_to_string(path)?;
    let file: CredentialsFile = serde_json::from_str(&content)?;
    file.installed.or(file.web).ok_or_else(|| {
        DriveError::InvalidCredentials(
            "expected an \"installed\" or \"web\" client block".to_string(),
        )
    })
}

/// Read a cached token, returning `None` when no cache exists yet.
pub fn read_token<P: AsRef<Path>>(path: P) -> Result<Option<StoredToken>> {
    match fs::read_to_string(path) {
        Ok(content) => Ok(Some(serde_json::from_str(&content)?)),
        Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e.into()),
    }
}

/// Persist a token, overwriting any previous cache.
pub fn store_token<P: AsRef<Path>>(path: P, token: &StoredToken) -> Result<()> {
    let path = path.as_ref();
    let json = serde_json::to_string(token)?;
    fs::write(path, json).map_err(|source| DriveError::TokenStoreError {
        path: path.display().to_string(),
        source,
    })
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or_default()
}

/// Whether the access token must be refreshed before use at `now_ms`.
///
/// Tokens without a recorded expiry are used as-is.
fn needs_refresh(token: &StoredToken, now_ms: u64) -> bool {
    token
        .expiry_date
        .is_some_and(|expiry| expiry <= now_ms + EXPIRY_SKEW_MS)
}

/// Authenticator holding the user's OAuth2 token for Google APIs.
#[derive(Clone)]
pub struct Authenticator {
    secrets: Arc<ClientSecrets>,
    client: Client,
    token: Arc<RwLock<StoredToken>>,
}

impl Authenticator {
    /// Create an authenticator from client secrets and an already obtained token.
    pub fn new(secrets: ClientSecrets, token: StoredToken) -> Self {
        Self {
            secrets: Arc::new(secrets),
            client: Client::new(),
            token: Arc::new(RwLock::new(token)),
        }
    }

    /// Load credentials and the cached token, falling back to the interactive
    /// console flow when no token has been cached yet.
    pub async fn load_or_authorize<P, Q>(credentials_path: P, token_path: Q) -> Result<Self>
    where
        P: AsRef<Path>,
        Q: AsRef<Path>,
    {
        let secrets = load_client_secrets(credentials_path)?;
        let stdin = BufReader::new(tokio::io::stdin());
        Self::load_or_authorize_with(secrets, token_path, stdin).await
    }

    /// Same as [`Authenticator::load_or_authorize`], reading the authorization
    /// code from `input`.
    pub async fn load_or_authorize_with<Q, R>(
        secrets: ClientSecrets,
        token_path: Q,
        input: R,
    ) -> Result<Self>
    where
        Q: AsRef<Path>,
        R: AsyncBufRead + Unpin,
    {
        let token_path = token_path.as_ref();

        match read_token(token_path) {
            Ok(Some(token)) => {
                debug!("Using cached token from {}", token_path.display());
                return Ok(Self::new(secrets, token));
            }
            Ok(None) => {}
            Err(e) => warn!("Ignoring unreadable token cache {}: {}", token_path.display(), e),
        }

        let token = authorize_interactively(&secrets, input).await?;
        match store_token(token_path, &token) {
            Ok(()) => info!("Token stored to {}", token_path.display()),
            // The exchange succeeded, so the run continues without a cache.
            Err(e) => error!("{}", e),
        }

        Ok(Self::new(secrets, token))
    }

    /// Get a valid access token, refreshing it if it has expired.
    pub async fn get_access_token(&self) -> Result<String> {
        {
            let token = self.token.read().await;
            if !needs_refresh(&token, now_millis()) {
                return Ok(token.access_token.clone());
            }
        }

        let mut token = self.token.write().await;

        // Another caller may have refreshed while we waited for the lock.
        if !needs_refresh(&token, now_millis()) {
            return Ok(token.access_token.clone());
        }

        let refresh_token = token.refresh_token.clone().ok_or_else(|| {
            DriveError::TokenRefreshError(
                "access token expired and no refresh token is cached".to_string(),
            )
        })?;

        debug!("Refreshing expired access token");
        let response = request_token(
            &self.client,
            &self.secrets,
            &[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token.as_str()),
            ],
        )
        .await
        .map_err(|e| DriveError::TokenRefreshError(e.to_string()))?;

        let mut refreshed = stored_token(response, now_millis());
        if refreshed.refresh_token.is_none() {
            refreshed.refresh_token = Some(refresh_token);
        }
        *token = refreshed;

        Ok(token.access_token.clone())
    }
}

fn redirect_uri(secrets: &ClientSecrets) -> &str {
    secrets
        .redirect_uris
        .first()
        .map(String::as_str)
        .unwrap_or(OOB_REDIRECT_URI)
}

/// Build the consent URL the operator has to open in a browser.
pub fn authorization_url(secrets: &ClientSecrets) -> Result<String> {
    let scope = SCOPES.join(" ");
    let base = secrets.auth_uri.as_deref().unwrap_or(AUTH_URI);

    let url = Url::parse_with_params(
        base,
        &[
            ("access_type", "offline"),
            ("scope", scope.as_str()),
            ("response_type", "code"),
            ("client_id", secrets.client_id.as_str()),
            ("redirect_uri", redirect_uri(secrets)),
        ],
    )
    .map_err(|e| DriveError::InvalidCredentials(format!("invalid auth_uri {}: {}", base, e)))?;

    Ok(url.to_string())
}

/// Print the consent URL, read one line with the code, and exchange it.
async fn authorize_interactively<R>(
    secrets: &ClientSecrets,
    mut input: R,
) -> Result<StoredToken>
where
    R: AsyncBufRead + Unpin,
{
    let url = authorization_url(secrets)?;
    println!("Authorize this app by visiting this url: {}", url);
    println!("Enter the code from that page here: ");

    let mut code = String::new();
    input.read_line(&mut code).await?;
    let code = code.trim();

    if code.is_empty() {
        return Err(DriveError::AuthenticationError(
            "no authorization code entered".to_string(),
        ));
    }

    exchange_code(&Client::new(), secrets, code).await
}

/// Exchange an authorization code for a token.
pub async fn exchange_code(
    client: &Client,
    secrets: &ClientSecrets,
    code: &str,
) -> Result<StoredToken> {
    let response = request_token(
        client,
        secrets,
        &[
            ("grant_type", "authorization_code"),
            ("code", code),
            ("redirect_uri", redirect_uri(secrets)),
        ],
    )
    .await
    .map_err(|e| {
        DriveError::AuthenticationError(format!("Error retrieving access token: {}", e))
    })?;

    Ok(stored_token(response, now_millis()))
}

/// POST a grant to the token endpoint, adding the client credentials.
async fn request_token(
    client: &Client,
    secrets: &ClientSecrets,
    grant: &[(&str, &str)],
) -> Result<TokenResponse> {
    let token_uri = secrets.token_uri.as_deref().unwrap_or(TOKEN_URI);

    let mut params: Vec<(&str, &str)> = vec![
        ("client_id", secrets.client_id.as_str()),
        ("client_secret", secrets.client_secret.as_str()),
    ];
    params.extend_from_slice(grant);

    let response = client.post(token_uri).form(&params).send().await?;

    if !response.status().is_success() {
        let status = response.status();
        let body = response.text().await.unwrap_or_default();
        return Err(DriveError::ApiError {
            status: status.as_u16(),
            message: body,
        });
    }

    Ok(response.json().await?)
}

fn stored_token(response: TokenResponse, now_ms: u64) -> StoredToken {
    StoredToken {
        access_token: response.access_token,
        refresh_token: response.refresh_token,
        scope: response.scope,
        token_type: response.token_type,
        expiry_date: response.expires_in.map(|secs| now_ms + secs * 1000),
    }
}
