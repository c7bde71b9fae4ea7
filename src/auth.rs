use reqwest::Method;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::ApiClient;
use crate::error::ApiError;
use crate::session::{Role, SessionError, User};

#[derive(Error, Debug)]
pub enum AuthError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Session(#[from] SessionError),
    #[error("self-service signup is not available for {0}")]
    SignupRole(Role),
}

#[derive(Deserialize, Debug)]
pub struct TokenResponse {
    pub access_token: String,
    #[serde(default)]
    pub token_type: Option<String>,
}

#[serde_with::skip_serializing_none]
#[derive(Serialize, Debug, Clone, Default, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SignupRequest {
    pub full_name: String,
    pub email: String,
    pub password: String,
    pub tenant_id: Option<String>,
    /// Admin signup creates the tenant.
    pub organization_name: Option<String>,
}

/// Login and signup. Neither call carries a bearer token.
#[derive(Debug, Clone)]
pub struct AuthClient {
    api: ApiClient,
}

impl AuthClient {
    pub fn new(api: ApiClient) -> Self {
        AuthClient { api }
    }

    /// Exchanges credentials for a token and installs it in the session.
    pub async fn login(&self, email: &str, password: &str) -> Result<User, AuthError> {
        let form = [("username", email), ("password", password), ("grant_type", "password")];
        let req = self.api.anonymous(Method::POST, &["auth", "token"]).form(&form);
        let token: TokenResponse = self.api.send_json(req).await?;
        let user = self.api.session().establish(token.access_token)?;
        tracing::info!(user_id=%user.id, role=%user.role, "signed in");
        Ok(user)
    }

    pub async fn signup(&self, role: Role, request: &SignupRequest) -> Result<(), AuthError> {
        let path = match role {
            Role::Student => "student",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
            Role::SuperAdmin => return Err(AuthError::SignupRole(role)),
        };
        let req = self.api.anonymous(Method::POST, &["auth", path, "signup"]).json(request);
        self.api.send_unit(req).await?;
        tracing::info!(%role, email=%request.email, "signed up");
        Ok(())
    }

    pub fn logout(&self) {
        self.api.session().clear();
        tracing::info!("signed out");
    }
}
