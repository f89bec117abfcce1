use tracing::{info, warn};

use super::models::{AuthGrant, Credentials, Registration, UserEnvelope};
use crate::client::{ApiClient, ApiError, ClientEvent, PendingRequest, TokenPair};
use crate::session::User;

/// `/auth/*`. Login and register store the returned token pair; logout
/// always clears the local session, even when the server call fails.
pub struct AuthApi<'a> {
    pub(super) client: &'a ApiClient,
}

impl AuthApi<'_> {
    pub async fn login(&self, email: &str, password: &str) -> Result<User, ApiError> {
        let req = self
            .client
            .surface(PendingRequest::post("/auth/login").with_json(&Credentials { email, password }))?;
        let grant: AuthGrant = self.client.request(req).await?;
        self.start_session(grant)
    }

    pub async fn register(&self, registration: &Registration) -> Result<User, ApiError> {
        let req = self
            .client
            .surface(PendingRequest::post("/auth/register").with_json(registration))?;
        let grant: AuthGrant = self.client.request(req).await?;
        self.start_session(grant)
    }

    pub async fn logout(&self) -> Result<(), ApiError> {
        let result = self.client.request_ack(PendingRequest::post("/auth/logout")).await;
        if let Err(e) = &result {
            warn!(error = %e, "server logout failed; clearing local session anyway");
        }
        self.client.surface(self.client.session().clear().map_err(ApiError::from))?;
        self.client.emit(ClientEvent::SignedOut);
        info!("signed out");
        Ok(())
    }

    /// Explicit refresh. The interceptor does this on its own; this is for
    /// callers that want to rotate tokens ahead of expiry.
    pub async fn refresh(&self) -> Result<(), ApiError> {
        let Some(refresh_token) = self.client.session().refresh_token() else {
            return Err(ApiError::AuthRequired);
        };
        let req = self.client.surface(
            PendingRequest::post("/auth/refresh")
                .with_json(&serde_json::json!({ "refreshToken": refresh_token })),
        )?;
        let pair: TokenPair = self.client.request(req).await?;
        self.client.surface(
            self.client
                .session()
                .set_tokens(&pair.token, &pair.refresh_token)
                .map_err(ApiError::from),
        )?;
        self.client.emit(ClientEvent::TokensRefreshed);
        Ok(())
    }

    /// Current user according to the server (`GET /auth/me`).
    pub async fn me(&self) -> Result<User, ApiError> {
        let data: UserEnvelope = self.client.get("/auth/me").await?;
        Ok(data.user)
    }

    fn start_session(&self, grant: AuthGrant) -> Result<User, ApiError> {
        let session = self.client.session();
        self.client
            .surface(session.set_tokens(&grant.token, &grant.refresh_token).map_err(ApiError::from))?;
        session.set_user(grant.user.clone());
        info!(user_id = grant.user.id, "signed in");
        self.client.emit(ClientEvent::SignedIn(grant.user.clone()));
        Ok(grant.user)
    }
}
