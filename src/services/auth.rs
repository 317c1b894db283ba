//! Auth provider: anonymous or custom-token sign-in yielding a stable user id.

use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};

use super::BoxFuture;
use crate::errors::AppError;
use crate::models::UserId;

const IDENTITY_TOOLKIT_BASE: &str = "https://identitytoolkit.googleapis.com/v1";

pub trait AuthProvider: Send + Sync {
    fn sign_in_anonymously(&self) -> BoxFuture<'_, Result<UserId, AppError>>;

    fn sign_in_with_custom_token<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<UserId, AppError>>;
}

/// Establish the session identity once per launch.
///
/// Uses the pre-supplied token when present, otherwise signs in anonymously.
/// A failure is logged and leaves the identity unset.
pub async fn establish_identity(
    provider: &dyn AuthProvider,
    initial_token: Option<&str>,
) -> Option<UserId> {
    let result = match initial_token {
        Some(token) => provider.sign_in_with_custom_token(token).await,
        None => provider.sign_in_anonymously().await,
    };

    match result {
        Ok(user) => {
            tracing::info!("Signed in as {}", user);
            Some(user)
        }
        Err(e) => {
            tracing::error!("Sign-in failed, reports cannot be published: {}", e);
            None
        }
    }
}

/// Firebase Identity Toolkit REST client.
pub struct FirebaseAuth {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct CustomTokenResponse {
    id_token: String,
}

#[derive(Deserialize)]
struct LookupResponse {
    #[serde(default)]
    users: Vec<LookupUser>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct LookupUser {
    local_id: String,
}

#[derive(Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Deserialize)]
struct ErrorBody {
    message: String,
}

impl FirebaseAuth {
    pub fn new(http: reqwest::Client, api_key: impl Into<String>) -> Self {
        Self {
            http,
            api_key: api_key.into(),
        }
    }

    async fn call<T: DeserializeOwned>(&self, method: &str, body: Value) -> Result<T, AppError> {
        let url = format!("{}/accounts:{}", IDENTITY_TOOLKIT_BASE, method);
        let resp = self
            .http
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&body)
            .send()
            .await?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp.json::<T>().await?);
        }

        let message = resp
            .json::<ErrorEnvelope>()
            .await
            .map(|e| e.error.message)
            .unwrap_or_else(|_| status.to_string());

        if status.is_client_error() {
            Err(AppError::Unauthorized(format!("accounts:{}: {}", method, message)))
        } else {
            Err(AppError::Upstream(format!("accounts:{}: {}", method, message)))
        }
    }
}

impl AuthProvider for FirebaseAuth {
    fn sign_in_anonymously(&self) -> BoxFuture<'_, Result<UserId, AppError>> {
        Box::pin(async move {
            let resp: SignUpResponse = self
                .call("signUp", json!({ "returnSecureToken": true }))
                .await?;
            Ok(UserId::new(resp.local_id))
        })
    }

    fn sign_in_with_custom_token<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<UserId, AppError>> {
        Box::pin(async move {
            let signed_in: CustomTokenResponse = self
                .call(
                    "signInWithCustomToken",
                    json!({ "token": token, "returnSecureToken": true }),
                )
                .await?;

            // The custom-token response carries no user id; resolve it from the id token.
            let lookup: LookupResponse = self
                .call("lookup", json!({ "idToken": signed_in.id_token }))
                .await?;

            lookup
                .users
                .into_iter()
                .next()
                .map(|u| UserId::new(u.local_id))
                .ok_or_else(|| AppError::Upstream("accounts:lookup returned no user".to_string()))
        })
    }
}

/// Offline provider for development: anonymous ids are random, a custom
/// token is taken as the user id itself.
#[derive(Debug, Default, Clone)]
pub struct LocalAuth;

impl AuthProvider for LocalAuth {
    fn sign_in_anonymously(&self) -> BoxFuture<'_, Result<UserId, AppError>> {
        Box::pin(async move {
            Ok(UserId::new(format!(
                "anon-{}",
                uuid::Uuid::new_v4().simple()
            )))
        })
    }

    fn sign_in_with_custom_token<'a>(
        &'a self,
        token: &'a str,
    ) -> BoxFuture<'a, Result<UserId, AppError>> {
        Box::pin(async move {
            let token = token.trim();
            if token.is_empty() {
                return Err(AppError::Unauthorized("Empty custom token".to_string()));
            }
            Ok(UserId::new(token))
        })
    }
}
