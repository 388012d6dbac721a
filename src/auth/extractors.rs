use std::convert::Infallible;

use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use tracing::{debug, warn};

use super::dto::AuthenticatedUser;
use crate::{error::ApiError, state::AppState};

/// Requires a valid bearer token; rejects with 401 otherwise.
pub struct CurrentUser(pub AuthenticatedUser);

/// Resolves the caller when a valid token is present, `None` otherwise.
pub struct MaybeUser(pub Option<AuthenticatedUser>);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthFailure {
    MissingHeader,
    MalformedHeader,
    Rejected,
}

/// Outcome of token validation, stored in the request extensions so the
/// provider is asked at most once per request.
#[derive(Clone)]
struct ResolvedAuth(Result<AuthenticatedUser, AuthFailure>);

fn bearer_token(headers: &HeaderMap) -> Result<&str, AuthFailure> {
    let value = headers
        .get(header::AUTHORIZATION)
        .ok_or(AuthFailure::MissingHeader)?
        .to_str()
        .map_err(|_| AuthFailure::MalformedHeader)?;
    let (scheme, token) = value.split_once(' ').ok_or(AuthFailure::MalformedHeader)?;
    let token = token.trim();
    if !scheme.eq_ignore_ascii_case("bearer") || token.is_empty() {
        return Err(AuthFailure::MalformedHeader);
    }
    Ok(token)
}

async fn resolve(parts: &mut Parts, state: &AppState) -> Result<AuthenticatedUser, AuthFailure> {
    if let Some(ResolvedAuth(outcome)) = parts.extensions.get::<ResolvedAuth>() {
        return outcome.clone();
    }

    let outcome = match bearer_token(&parts.headers).map(str::to_owned) {
        Ok(token) => match state.identity.user_for_token(&token).await {
            Ok(Some(user)) => {
                debug!(user_id = %user.user_id, email = user.email.as_deref().unwrap_or("-"), "token resolved");
                Ok(user)
            }
            Ok(None) => {
                warn!("identity provider rejected token");
                Err(AuthFailure::Rejected)
            }
            Err(e) => {
                warn!(error = %e, "identity provider unavailable");
                Err(AuthFailure::Rejected)
            }
        },
        Err(failure) => Err(failure),
    };

    parts.extensions.insert(ResolvedAuth(outcome.clone()));
    outcome
}

#[async_trait]
impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        resolve(parts, state).await.map(CurrentUser).map_err(|failure| {
            let message = match failure {
                AuthFailure::MissingHeader => "Not authenticated",
                AuthFailure::MalformedHeader | AuthFailure::Rejected => "Invalid authentication token",
            };
            ApiError::Unauthorized(message.into())
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        Ok(MaybeUser(resolve(parts, state).await.ok()))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use axum::{
        body::Body,
        http::{HeaderValue, Request, StatusCode},
        routing::get,
        Json, Router,
    };
    use tower::ServiceExt;

    use super::*;
    use crate::{
        auth::services::fake::{FakeIdentity, ALICE, ALICE_TOKEN, OUTAGE_TOKEN},
        db::memory::MemoryStore,
    };

    fn headers(value: &str) -> HeaderMap {
        let mut h = HeaderMap::new();
        h.insert(header::AUTHORIZATION, HeaderValue::from_str(value).unwrap());
        h
    }

    #[test]
    fn parses_bearer_header() {
        assert_eq!(bearer_token(&headers("Bearer abc")), Ok("abc"));
        assert_eq!(bearer_token(&headers("bearer  abc ")), Ok("abc"));
        assert_eq!(bearer_token(&HeaderMap::new()), Err(AuthFailure::MissingHeader));
        assert_eq!(bearer_token(&headers("Basic abc")), Err(AuthFailure::MalformedHeader));
        assert_eq!(bearer_token(&headers("Bearer ")), Err(AuthFailure::MalformedHeader));
        assert_eq!(bearer_token(&headers("abc")), Err(AuthFailure::MalformedHeader));
    }

    async fn both(CurrentUser(a): CurrentUser, MaybeUser(b): MaybeUser) -> Json<bool> {
        Json(b.as_ref() == Some(&a) && a.user_id == ALICE)
    }

    async fn optional(MaybeUser(u): MaybeUser) -> Json<Option<String>> {
        Json(u.map(|u| u.user_id.to_string()))
    }

    fn setup() -> (Arc<FakeIdentity>, Router) {
        let identity = Arc::new(FakeIdentity::standard());
        let state = AppState::fake_with(Arc::new(MemoryStore::new()), identity.clone());
        let app = Router::new()
            .route("/both", get(both))
            .route("/optional", get(optional))
            .with_state(state);
        (identity, app)
    }

    fn request(uri: &str, token: Option<&str>) -> Request<Body> {
        let mut builder = Request::builder().uri(uri);
        if let Some(t) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {t}"));
        }
        builder.body(Body::empty()).unwrap()
    }

    #[tokio::test]
    async fn provider_is_consulted_once_per_request() {
        let (identity, app) = setup();
        let res = app.oneshot(request("/both", Some(ALICE_TOKEN))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"true");
        assert_eq!(identity.calls(), 1);
    }

    #[tokio::test]
    async fn required_user_rejects_unknown_token() {
        let (_, app) = setup();
        let res = app.oneshot(request("/both", Some("forged"))).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn required_user_rejects_missing_header() {
        let (identity, app) = setup();
        let res = app.oneshot(request("/both", None)).await.unwrap();
        assert_eq!(res.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(identity.calls(), 0);
    }

    #[tokio::test]
    async fn optional_user_degrades_on_provider_outage() {
        let (_, app) = setup();
        let res = app.oneshot(request("/optional", Some(OUTAGE_TOKEN))).await.unwrap();
        assert_eq!(res.status(), StatusCode::OK);
        let body = axum::body::to_bytes(res.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&body[..], b"null");
    }
}
