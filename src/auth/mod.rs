//! Authentication for the Syncthing REST API.

use crate::errors::{SyncthingError, SyncthingResult};
use crate::http::Request;
use async_trait::async_trait;
use reqwest::header::HeaderValue;
use secrecy::{ExposeSecret, SecretString};
use std::sync::{Arc, OnceLock, RwLock};

/// Header carrying the API key. The sole authentication mechanism the API
/// recognizes.
pub const API_KEY_HEADER: &str = "x-api-key";

/// Authentication protocols supported by the Syncthing API.
///
/// This set is deliberately closed; adding a kind means extending the enum
/// and the dispatch in [`Authenticator::apply`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthenticationType {
    /// No credentials provided.
    Anonymous,
    /// API key.
    ApiKey,
}

/// Credentials used to authenticate against a Syncthing instance.
#[derive(Clone)]
pub struct Credentials {
    auth_type: AuthenticationType,
    login: Option<String>,
    secret: Option<SecretString>,
}

static ANONYMOUS: OnceLock<Credentials> = OnceLock::new();

impl Credentials {
    /// The anonymous credentials sentinel. Never carries a secret.
    pub fn anonymous() -> Self {
        ANONYMOUS
            .get_or_init(|| Self {
                auth_type: AuthenticationType::Anonymous,
                login: None,
                secret: None,
            })
            .clone()
    }

    /// Creates API-key credentials. The key is sent verbatim in the
    /// `X-API-Key` header.
    pub fn api_key(key: impl Into<String>) -> SyncthingResult<Self> {
        let key = key.into();
        if key.is_empty() {
            return Err(SyncthingError::invalid_argument(
                "the API key must not be empty",
            ));
        }
        Ok(Self {
            auth_type: AuthenticationType::ApiKey,
            login: None,
            secret: Some(SecretString::new(key)),
        })
    }

    /// Gets the authentication type.
    pub fn auth_type(&self) -> AuthenticationType {
        self.auth_type
    }

    /// Gets the login, if one is attached. Key-based credentials never carry
    /// a login.
    pub fn login(&self) -> Option<&str> {
        self.login.as_deref()
    }

    pub(crate) fn secret(&self) -> Option<&SecretString> {
        self.secret.as_ref()
    }

    #[cfg(test)]
    pub(crate) fn api_key_with_login(key: &str, login: &str) -> Self {
        Self {
            auth_type: AuthenticationType::ApiKey,
            login: Some(login.to_string()),
            secret: Some(SecretString::new(key.to_string())),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("auth_type", &self.auth_type)
            .field("login", &self.login)
            .field("secret", &self.secret.as_ref().map(|_| "***"))
            .finish()
    }
}

/// Abstraction for supplying credentials to the connection.
///
/// A `None` result is treated as anonymous. Implementations may resolve
/// credentials asynchronously, so they can be rotated without rebuilding the
/// connection.
#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Retrieves the current credentials from the underlying store.
    async fn get_credentials(&self) -> SyncthingResult<Option<Credentials>>;
}

/// Credential store wrapping a single fixed credentials value.
pub struct InMemoryCredentialStore {
    credentials: Credentials,
}

impl InMemoryCredentialStore {
    /// Creates a store holding the given credentials.
    pub fn new(credentials: Credentials) -> Self {
        Self { credentials }
    }
}

#[async_trait]
impl CredentialStore for InMemoryCredentialStore {
    async fn get_credentials(&self) -> SyncthingResult<Option<Credentials>> {
        Ok(Some(self.credentials.clone()))
    }
}

/// Applies the authentication strategy selected by the credential kind to an
/// outgoing request. Mutates headers only, never the body.
pub struct Authenticator {
    credential_store: RwLock<Arc<dyn CredentialStore>>,
}

impl Authenticator {
    /// Creates an authenticator backed by the given credential store.
    pub fn new(credential_store: Arc<dyn CredentialStore>) -> Self {
        Self {
            credential_store: RwLock::new(credential_store),
        }
    }

    /// Fetches the current credentials and applies them to the request.
    pub async fn apply(&self, request: &mut Request) -> SyncthingResult<()> {
        let store = self
            .credential_store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone();

        let credentials = store
            .get_credentials()
            .await?
            .unwrap_or_else(Credentials::anonymous);

        match credentials.auth_type() {
            AuthenticationType::Anonymous => {
                // A reused request must not retain a key from a prior pass.
                request.headers.remove(API_KEY_HEADER);
                Ok(())
            }
            AuthenticationType::ApiKey => apply_api_key(request, &credentials),
        }
    }

    /// Gets the current credential store.
    pub fn credential_store(&self) -> Arc<dyn CredentialStore> {
        self.credential_store
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Replaces the credential store wholesale.
    ///
    /// In-flight requests may observe either the old or the new store; this
    /// is a convenience path, not a transactional update.
    pub fn set_credential_store(&self, store: Arc<dyn CredentialStore>) {
        *self
            .credential_store
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = store;
    }
}

fn apply_api_key(request: &mut Request, credentials: &Credentials) -> SyncthingResult<()> {
    if credentials.login().is_some() {
        return Err(SyncthingError::invalid_argument(
            "the login is not null for a key authentication request; \
             key auth and login auth are mutually exclusive",
        ));
    }

    let secret = credentials.secret().ok_or_else(|| {
        SyncthingError::invalid_argument("key authentication requires a secret")
    })?;

    let value = HeaderValue::from_str(secret.expose_secret())
        .map_err(|_| SyncthingError::invalid_argument("the API key is not a valid header value"))?;
    request.headers.insert(API_KEY_HEADER, value);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use reqwest::Method;
    use url::Url;

    fn request() -> Request {
        Request::new(
            Method::GET,
            Url::parse("https://localhost:8384/").unwrap(),
            "rest/config",
        )
    }

    fn authenticator(credentials: Credentials) -> Authenticator {
        Authenticator::new(Arc::new(InMemoryCredentialStore::new(credentials)))
    }

    #[tokio::test]
    async fn test_api_key_sets_header_verbatim() {
        let auth = authenticator(Credentials::api_key("abc123==").unwrap());
        let mut req = request();
        auth.apply(&mut req).await.unwrap();

        assert_eq!(req.headers.get(API_KEY_HEADER).unwrap(), "abc123==");
        assert_eq!(req.headers.len(), 1);
    }

    #[tokio::test]
    async fn test_anonymous_sets_no_headers() {
        let auth = authenticator(Credentials::anonymous());
        let mut req = request();
        auth.apply(&mut req).await.unwrap();

        assert!(req.headers.is_empty());
    }

    #[tokio::test]
    async fn test_anonymous_removes_stale_key() {
        let auth = authenticator(Credentials::anonymous());
        let mut req = request();
        req.headers
            .insert(API_KEY_HEADER, HeaderValue::from_static("stale"));

        auth.apply(&mut req).await.unwrap();
        assert!(req.headers.get(API_KEY_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_api_key_with_login_is_rejected() {
        let auth = authenticator(Credentials::api_key_with_login("key", "someone"));
        let mut req = request();

        let error = auth.apply(&mut req).await.unwrap_err();
        assert_eq!(
            *error.kind(),
            crate::errors::SyncthingErrorKind::InvalidArgument
        );
    }

    #[tokio::test]
    async fn test_missing_credentials_are_anonymous() {
        struct EmptyStore;

        #[async_trait]
        impl CredentialStore for EmptyStore {
            async fn get_credentials(&self) -> SyncthingResult<Option<Credentials>> {
                Ok(None)
            }
        }

        let auth = Authenticator::new(Arc::new(EmptyStore));
        let mut req = request();
        auth.apply(&mut req).await.unwrap();
        assert!(req.headers.is_empty());
    }

    #[tokio::test]
    async fn test_store_swap() {
        let auth = authenticator(Credentials::anonymous());
        auth.set_credential_store(Arc::new(InMemoryCredentialStore::new(
            Credentials::api_key("rotated").unwrap(),
        )));

        let mut req = request();
        auth.apply(&mut req).await.unwrap();
        assert_eq!(req.headers.get(API_KEY_HEADER).unwrap(), "rotated");
    }

    #[test]
    fn test_empty_api_key_rejected() {
        assert!(Credentials::api_key("").is_err());
    }

    #[test]
    fn test_debug_redacts_secret() {
        let credentials = Credentials::api_key("super-secret").unwrap();
        let debug = format!("{:?}", credentials);
        assert!(!debug.contains("super-secret"));
    }
}
