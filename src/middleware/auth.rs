use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{header, request::Parts},
    middleware::Next,
    response::Response,
};

use crate::auth::{bearer_token, verify_token};
use crate::database::models::{Role, User};
use crate::error::{ApiError, AppError};
use crate::server::AppState;

/// The authenticated account, inserted by `protect`
#[derive(Clone, Debug)]
pub struct CurrentUser(pub User);

#[async_trait]
impl<S: Send + Sync> FromRequestParts<S> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CurrentUser>()
            .cloned()
            .ok_or_else(|| ApiError::unauthorized("You are not logged in!").into())
    }
}

/// Bearer token -> verified claims -> live user -> token newer than the last
/// password change. Each failure ends the request.
pub async fn protect(State(state): State<AppState>, mut request: Request, next: Next) -> Result<Response, AppError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(bearer_token)
        .ok_or_else(|| ApiError::unauthorized("You are not logged in!"))?;

    let claims = verify_token(token)?;

    let user = state
        .users
        .find_by_id(claims.id)
        .await?
        .ok_or_else(|| ApiError::unauthorized("The user belonging to this token no longer exists."))?;

    if user.changed_password_after(claims.issued_at_millis()) {
        return Err(ApiError::unauthorized("User recently changed password! Please log in again.").into());
    }

    tracing::debug!("Authenticated user {} ({})", user.id, user.role.as_str());
    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Let the request through only for the listed roles. Must run after `protect`.
pub async fn restrict_to(allowed: &'static [Role], request: Request, next: Next) -> Result<Response, AppError> {
    let role = request
        .extensions()
        .get::<CurrentUser>()
        .map(|user| user.0.role)
        .ok_or_else(|| ApiError::unauthorized("You are not logged in!"))?;

    if !allowed.contains(&role) {
        return Err(ApiError::forbidden("You do not have permission to perform this action").into());
    }
    Ok(next.run(request).await)
}

pub async fn admin_only(request: Request, next: Next) -> Result<Response, AppError> {
    restrict_to(&[Role::Admin], request, next).await
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::StatusCode, middleware, routing::get, Router};
    use chrono::Utc;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn user(role: Role) -> User {
        User {
            id: Uuid::new_v4(),
            name: "Ada".into(),
            email: "ada@example.com".into(),
            photo: None,
            role,
            password_hash: String::new(),
            active: true,
            password_changed_at: None,
            password_reset_token: None,
            password_reset_token_expires: None,
            created_at: Utc::now(),
        }
    }

    // Stands in for `protect` so role checks can be tested without a database
    fn router_as(current: Option<User>) -> Router {
        Router::new()
            .route("/", get(|CurrentUser(u): CurrentUser| async move { u.name }))
            .route_layer(middleware::from_fn(admin_only))
            .layer(middleware::from_fn(move |mut request: Request, next: Next| {
                let current = current.clone();
                async move {
                    if let Some(u) = current {
                        request.extensions_mut().insert(CurrentUser(u));
                    }
                    next.run(request).await
                }
            }))
    }

    async fn status_for(current: Option<User>) -> StatusCode {
        let request = axum::http::Request::builder().uri("/").body(Body::empty()).unwrap();
        router_as(current).oneshot(request).await.unwrap().status()
    }

    #[tokio::test]
    async fn admins_pass() {
        assert_eq!(status_for(Some(user(Role::Admin))).await, StatusCode::OK);
    }

    #[tokio::test]
    async fn other_roles_are_forbidden() {
        assert_eq!(status_for(Some(user(Role::User))).await, StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn missing_user_is_unauthorized() {
        assert_eq!(status_for(None).await, StatusCode::UNAUTHORIZED);
    }
}
