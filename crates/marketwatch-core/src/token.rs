//! Token store: owns the session tokens, the device id, and the
//! logged-in user snapshot.
//!
//! Tokens and the device id persist across sessions until logout. The
//! store reads through an in-memory cache backed by [`ScopedStorage`]
//! and broadcasts identity transitions on explicit channels consumed by
//! the pipeline's unauthorized handler and by navigation code outside
//! this crate.

use std::sync::Mutex;

use base64::Engine;
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;
use tokio::sync::broadcast;
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::ApiError;
use crate::executor::RequestExecutor;
use crate::storage::ScopedStorage;

const ACCESS_TOKEN_KEY: &str = "access-token";
const REFRESH_TOKEN_KEY: &str = "refresh-token";
const DEVICE_ID_KEY: &str = "device-id";
const USER_KEY: &str = "user";

/// User snapshot returned by the auth endpoints.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: i64,
    pub user_name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    pub email: String,
    #[serde(default)]
    pub created: Option<String>,
    #[serde(default)]
    pub roles: Vec<String>,
    #[serde(default)]
    pub linked_accounts: Vec<LinkedAccount>,
}

/// External identity linked to a user account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LinkedAccount {
    pub id: String,
    pub linked_account_type: String,
    pub user_id: i64,
}

/// Registration payload supplied by the caller; the device id is
/// attached by the store.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterUserRequest {
    pub username: String,
    pub password: String,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LoginResponse {
    pub token: String,
    pub refresh_token: String,
    pub user: AuthUser,
}

/// Registration returns the same shape as login.
pub type RegisterResponse = LoginResponse;

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshTokenResponse {
    pub token: String,
    pub refresh_token: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct LoginRequest<'a> {
    username: &'a str,
    password: &'a str,
    device_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload<'a> {
    #[serde(flatten)]
    request: &'a RegisterUserRequest,
    device_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct RefreshTokenRequest {
    token: Option<String>,
    refresh_token: String,
    device_id: String,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ConfirmEmailRequest<'a> {
    email: &'a str,
    token: &'a str,
}

#[derive(Debug, Default)]
struct CachedIdentity {
    access_token: Option<String>,
    refresh_token: Option<String>,
    device_id: Option<String>,
    user: Option<AuthUser>,
}

/// Process-wide owner of access/refresh tokens and the user snapshot.
pub struct TokenStore {
    executor: RequestExecutor,
    storage: ScopedStorage,
    expiry_skew_secs: i64,
    cached: Mutex<CachedIdentity>,
    auth_changed: broadcast::Sender<bool>,
    unauthorized_attempted: broadcast::Sender<u16>,
}

impl TokenStore {
    /// `executor` must be the unauthenticated pipeline; the auth
    /// endpoints cannot depend on the token they produce. Concurrent
    /// refreshes coalesce in that executor's in-flight map.
    pub fn new(executor: RequestExecutor, storage: ScopedStorage) -> Self {
        let expiry_skew_secs = executor.config().token_expiry_skew_secs;
        let (auth_changed, _) = broadcast::channel(16);
        let (unauthorized_attempted, _) = broadcast::channel(16);

        Self {
            executor,
            storage,
            expiry_skew_secs,
            cached: Mutex::new(CachedIdentity::default()),
            auth_changed,
            unauthorized_attempted,
        }
    }

    /// Identity-changed transitions: `true` after login/register, `false`
    /// after logout.
    pub fn subscribe_auth_changed(&self) -> broadcast::Receiver<bool> {
        self.auth_changed.subscribe()
    }

    /// Escalated 401/403 statuses the pipeline could not resolve with a
    /// refresh. External code decides whether to force logout.
    pub fn subscribe_unauthorized(&self) -> broadcast::Receiver<u16> {
        self.unauthorized_attempted.subscribe()
    }

    pub(crate) fn notify_unauthorized(&self, status: u16) {
        let _ = self.unauthorized_attempted.send(status);
    }

    pub fn is_user_logged_in(&self) -> bool {
        self.logged_in_user().is_some()
    }

    pub fn logged_in_user(&self) -> Option<AuthUser> {
        let mut cached = self.lock_cached();
        if cached.user.is_none() {
            cached.user = self.storage.get_json(USER_KEY);
        }
        cached.user.clone()
    }

    fn access_token(&self) -> Option<String> {
        let mut cached = self.lock_cached();
        if cached.access_token.is_none() {
            cached.access_token = self.storage.get_item(ACCESS_TOKEN_KEY);
        }
        cached.access_token.clone()
    }

    fn refresh_token(&self) -> Option<String> {
        let mut cached = self.lock_cached();
        if cached.refresh_token.is_none() {
            cached.refresh_token = self.storage.get_item(REFRESH_TOKEN_KEY);
        }
        cached.refresh_token.clone()
    }

    /// Stable random identifier scoping refresh tokens to this profile;
    /// generated once and persisted.
    pub fn device_id(&self) -> String {
        let mut cached = self.lock_cached();
        if cached.device_id.is_none() {
            match self.storage.get_item(DEVICE_ID_KEY) {
                Some(existing) => cached.device_id = Some(existing),
                None => {
                    let generated = Uuid::new_v4().to_string();
                    self.storage.set_item(DEVICE_ID_KEY, generated.clone());
                    cached.device_id = Some(generated);
                }
            }
        }

        cached
            .device_id
            .clone()
            .unwrap_or_default()
    }

    pub async fn login(&self, username: &str, password: &str) -> Result<LoginResponse, ApiError> {
        debug!(username, "logging the user in");

        let response: LoginResponse = self
            .executor
            .post_json(
                "auth/login",
                &LoginRequest {
                    username,
                    password,
                    device_id: self.device_id(),
                },
            )
            .await?;

        self.store_session(&response);
        info!(username, "user login complete");

        Ok(response)
    }

    pub async fn register(&self, request: &RegisterUserRequest) -> Result<RegisterResponse, ApiError> {
        debug!(username = %request.username, "registering user");

        let response: RegisterResponse = self
            .executor
            .post_json(
                "auth/register",
                &RegisterPayload {
                    request,
                    device_id: self.device_id(),
                },
            )
            .await?;

        self.store_session(&response);
        info!(username = %request.username, "user registration complete");

        Ok(response)
    }

    pub async fn confirm_email(&self, email: &str, token: &str) -> Result<(), ApiError> {
        self.executor
            .post_no_content("auth/confirmEmail", &ConfirmEmailRequest { email, token })
            .await
    }

    /// Clear all persisted and cached identity state.
    pub fn logout(&self) {
        debug!("logging the user out");

        self.storage.clear();
        {
            let mut cached = self.lock_cached();
            *cached = CachedIdentity::default();
        }
        let _ = self.auth_changed.send(false);

        info!("user has been logged out");
    }

    /// Current access token, refreshing first when it is within the
    /// expiry skew. `Ok(None)` when no session exists.
    pub async fn get_access_token(&self) -> Result<Option<String>, ApiError> {
        let Some(token) = self.access_token() else {
            debug!("access token is absent");
            return Ok(None);
        };

        if self.is_token_expired(&token, self.expiry_skew_secs)? {
            debug!("access token is expired, refreshing");
            self.refresh_access_token().await?;
        }

        Ok(self.access_token())
    }

    /// Exchange the current token pair for a fresh one. Fails with
    /// [`ApiError::NotAuthenticated`] when no refresh token exists; any
    /// failure of the refresh call itself is fatal for the current
    /// operation and surfaces as [`ApiError::RefreshFailed`].
    pub async fn refresh_access_token(&self) -> Result<RefreshTokenResponse, ApiError> {
        debug!("refreshing access token");

        let refresh_token = self.refresh_token().ok_or(ApiError::NotAuthenticated)?;
        let payload = RefreshTokenRequest {
            token: self.access_token(),
            refresh_token,
            device_id: self.device_id(),
        };

        let response: RefreshTokenResponse = self
            .executor
            .post_json("auth/refreshToken", &payload)
            .await
            .map_err(|e| match e {
                ApiError::NotAuthenticated => ApiError::NotAuthenticated,
                other => ApiError::RefreshFailed(other.to_string()),
            })?;

        {
            let mut cached = self.lock_cached();
            cached.access_token = Some(response.token.clone());
            cached.refresh_token = Some(response.refresh_token.clone());
        }
        self.storage.set_item(ACCESS_TOKEN_KEY, response.token.clone());
        self.storage
            .set_item(REFRESH_TOKEN_KEY, response.refresh_token.clone());

        info!("access token refreshed");

        Ok(response)
    }

    /// Whether `token`'s `exp` claim is within `skew_secs` of now.
    pub fn is_token_expired(&self, token: &str, skew_secs: i64) -> Result<bool, ApiError> {
        let exp = decode_exp_claim(token)?;
        let now = OffsetDateTime::now_utc().unix_timestamp();
        Ok(now >= exp - skew_secs)
    }

    fn store_session(&self, response: &LoginResponse) {
        {
            let mut cached = self.lock_cached();
            cached.access_token = Some(response.token.clone());
            cached.refresh_token = Some(response.refresh_token.clone());
            cached.user = Some(response.user.clone());
        }

        self.storage.set_item(ACCESS_TOKEN_KEY, response.token.clone());
        self.storage
            .set_item(REFRESH_TOKEN_KEY, response.refresh_token.clone());
        if let Err(e) = self.storage.set_json(USER_KEY, &response.user) {
            debug!(error = %e, "failed to persist user snapshot");
        }

        let _ = self.auth_changed.send(true);
    }

    fn lock_cached(&self) -> std::sync::MutexGuard<'_, CachedIdentity> {
        match self.cached.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

#[derive(Deserialize)]
struct ExpClaim {
    exp: Option<i64>,
}

/// Unverified read of the JWT `exp` claim. Signature verification is the
/// server's job; the client only needs the expiry to schedule refreshes.
fn decode_exp_claim(token: &str) -> Result<i64, ApiError> {
    let payload = token
        .split('.')
        .nth(1)
        .ok_or_else(|| ApiError::InvalidToken(String::from("token is not a JWT")))?;

    let bytes = base64::engine::general_purpose::URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|e| ApiError::InvalidToken(format!("payload is not base64url: {e}")))?;

    let claims: ExpClaim = serde_json::from_slice(&bytes)
        .map_err(|e| ApiError::InvalidToken(format!("payload is not a claims object: {e}")))?;

    claims
        .exp
        .ok_or_else(|| ApiError::InvalidToken(String::from("token is missing exp claim")))
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::config::ClientConfig;
    use crate::http::{HttpRequest, HttpResponse, HttpTransport, TransportError};
    use crate::storage::MemoryStorage;

    /// Transport that never reaches the network.
    struct RefusingTransport;

    impl HttpTransport for RefusingTransport {
        fn execute<'a>(
            &'a self,
            _request: HttpRequest,
        ) -> std::pin::Pin<
            Box<
                dyn std::future::Future<Output = Result<HttpResponse, TransportError>> + Send + 'a,
            >,
        > {
            Box::pin(async { Err(TransportError::new("no network in unit tests")) })
        }
    }

    fn store() -> TokenStore {
        let config = ClientConfig::new("https://example.test/api/v1")
            .with_retry(crate::config::RetryOptions::disabled());
        let executor = RequestExecutor::new(Arc::new(RefusingTransport), config);
        let storage = ScopedStorage::new(Arc::new(MemoryStorage::new()), "mw-test");
        TokenStore::new(executor, storage)
    }

    /// Unsigned JWT with the given exp claim; the store never checks
    /// signatures.
    fn token_with_exp(exp: i64) -> String {
        let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header = engine.encode(br#"{"alg":"none","typ":"JWT"}"#);
        let payload = engine.encode(format!(r#"{{"exp":{exp}}}"#));
        format!("{header}.{payload}.")
    }

    #[test]
    fn exp_claim_round_trips() {
        assert_eq!(decode_exp_claim(&token_with_exp(1_700_000_000)), Ok(1_700_000_000));
    }

    #[test]
    fn garbage_tokens_are_invalid() {
        assert!(matches!(
            decode_exp_claim("not-a-jwt"),
            Err(ApiError::InvalidToken(_))
        ));
        assert!(matches!(
            decode_exp_claim("a.!!!.c"),
            Err(ApiError::InvalidToken(_))
        ));
    }

    #[test]
    fn missing_exp_claim_is_invalid() {
        let engine = &base64::engine::general_purpose::URL_SAFE_NO_PAD;
        let header = engine.encode(br#"{"alg":"none"}"#);
        let payload = engine.encode(br#"{"sub":"5"}"#);
        let token = format!("{header}.{payload}.");

        assert!(matches!(
            decode_exp_claim(&token),
            Err(ApiError::InvalidToken(_))
        ));
    }

    #[test]
    fn expiry_applies_the_skew_window() {
        let store = store();
        let now = OffsetDateTime::now_utc().unix_timestamp();

        // Expires in one hour: fine under a 300s skew.
        assert_eq!(
            store.is_token_expired(&token_with_exp(now + 3_600), 300),
            Ok(false)
        );
        // Expires in two minutes: already expired under a 300s skew.
        assert_eq!(
            store.is_token_expired(&token_with_exp(now + 120), 300),
            Ok(true)
        );
    }

    #[test]
    fn device_id_is_generated_once_and_persisted() {
        let store = store();
        let first = store.device_id();
        let second = store.device_id();

        assert!(!first.is_empty());
        assert_eq!(first, second);
        assert_eq!(store.storage.get_item(DEVICE_ID_KEY), Some(first));
    }

    #[tokio::test]
    async fn get_access_token_without_session_is_none() {
        let store = store();
        assert_eq!(store.get_access_token().await, Ok(None));
    }

    #[tokio::test]
    async fn refresh_without_refresh_token_is_not_authenticated() {
        let store = store();
        assert_eq!(
            store.refresh_access_token().await,
            Err(ApiError::NotAuthenticated)
        );
    }

    #[test]
    fn logout_clears_identity_and_broadcasts() {
        let store = store();
        store.storage.set_item(ACCESS_TOKEN_KEY, "tok");
        store.storage.set_item(REFRESH_TOKEN_KEY, "ref");
        let mut auth_changes = store.subscribe_auth_changed();

        store.logout();

        assert_eq!(store.access_token(), None);
        assert_eq!(store.refresh_token(), None);
        assert!(!store.is_user_logged_in());
        assert_eq!(auth_changes.try_recv(), Ok(false));
    }
}
