pub mod policy;

use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use base64::{engine::general_purpose, Engine as _};
use std::convert::Infallible;
use std::sync::Arc;

use crate::config::{Account, AuthConfig};

pub use policy::{AuthPolicy, Operation};

/// Аутентифицированный пользователь
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Principal {
    pub username: String,
    pub capabilities: Vec<String>,
}

impl Principal {
    pub fn can(&self, capability: &str) -> bool {
        self.capabilities.iter().any(|c| c == capability)
    }
}

impl From<&Account> for Principal {
    fn from(account: &Account) -> Self {
        Principal {
            username: account.username.clone(),
            capabilities: account.capabilities.clone(),
        }
    }
}

/// Who is calling. Extraction never rejects: the decision belongs to the
/// policy, which runs after argument validation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Caller {
    Anonymous,
    BadCredentials,
    Authenticated(Principal),
}

/// Decodes `Authorization: Basic base64(user:password)`.
pub fn parse_basic(header_value: &str) -> Option<(String, String)> {
    let encoded = header_value.strip_prefix("Basic ")?;
    let decoded = general_purpose::STANDARD.decode(encoded.trim()).ok()?;
    let credentials = String::from_utf8(decoded).ok()?;

    // Разделяем user:password
    let (user, password) = credentials.split_once(':')?;
    Some((user.to_string(), password.to_string()))
}

/// Checks the credentials against the configured accounts.
pub async fn authenticate(auth: &AuthConfig, username: &str, password: &str) -> Caller {
    let Some(account) = auth.find(username) else {
        return Caller::BadCredentials;
    };

    // bcrypt медленный намеренно, не блокируем рантайм
    let hash = account.password_hash.clone();
    let password = password.to_string();
    let verified = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .ok()
        .and_then(|r| r.ok())
        .unwrap_or(false);

    if verified {
        Caller::Authenticated(Principal::from(account))
    } else {
        tracing::debug!(username, "rejected basic credentials");
        Caller::BadCredentials
    }
}

// Basic Auth extractor
impl FromRequestParts<Arc<crate::AppState>> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let Some(auth_header) = parts
            .headers
            .get(header::AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
        else {
            return Ok(Caller::Anonymous);
        };

        let Some((username, password)) = parse_basic(auth_header) else {
            return Ok(Caller::BadCredentials);
        };

        Ok(authenticate(&state.auth, &username, &password).await)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn auth_config() -> AuthConfig {
        AuthConfig {
            accounts: vec![Account {
                username: "admin".into(),
                password_hash: bcrypt::hash("secret", 4).unwrap(),
                capabilities: vec!["manage_options".into()],
            }],
        }
    }

    #[test]
    fn parses_basic_header() {
        let header = format!("Basic {}", general_purpose::STANDARD.encode("admin:pa:ss"));
        assert_eq!(parse_basic(&header), Some(("admin".into(), "pa:ss".into())));
        assert_eq!(parse_basic("Bearer abc"), None);
        assert_eq!(parse_basic("Basic !!!"), None);
        let no_colon = format!("Basic {}", general_purpose::STANDARD.encode("admin"));
        assert_eq!(parse_basic(&no_colon), None);
    }

    #[tokio::test]
    async fn authenticates_configured_account() {
        let auth = auth_config();

        match authenticate(&auth, "admin", "secret").await {
            Caller::Authenticated(p) => assert!(p.can("manage_options")),
            other => panic!("expected authenticated caller, got {other:?}"),
        }
        assert_eq!(authenticate(&auth, "admin", "wrong").await, Caller::BadCredentials);
        assert_eq!(authenticate(&auth, "nobody", "secret").await, Caller::BadCredentials);
    }
}
