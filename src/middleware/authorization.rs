use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use tracing::{debug, warn};

use crate::authorization::decode_token;
use crate::errors::problem::Problem;
use crate::models::User;
use crate::AppState;

/// The account behind the request's `Authorization: Bearer` token.
#[derive(Debug, Clone)]
pub struct AuthUser(pub User);

fn bearer_token(parts: &Parts) -> Result<&str, Problem> {
        let header = parts
                .headers
                .get(AUTHORIZATION)
                .ok_or(Problem::Unauthorized("Access token required".to_string()))?;

        header.to_str()
                .ok()
                .and_then(|value| value.strip_prefix("Bearer "))
                .map(str::trim)
                .filter(|token| !token.is_empty())
                .ok_or(Problem::Unauthorized("Authorization header must be a bearer token".to_string()))
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
        type Rejection = Problem;

        async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
                let token = bearer_token(parts)?;
                let claims = decode_token(token, &state.config.jwt_secret)?;

                let user_id = claims.sub.parse::<i64>().map_err(|_| {
                        warn!("token subject {} is not a user id", claims.sub);
                        Problem::Unauthorized("invalid token".to_string())
                })?;

                let user = state
                        .user_repository
                        .find_by_id(user_id)?
                        .ok_or(Problem::Unauthorized("User not found".to_string()))?;

                if !user.is_active {
                        debug!("rejecting inactive user {user_id}");
                        return Err(Problem::Unauthorized("Account is deactivated".to_string()));
                }

                Ok(AuthUser(user))
        }
}

#[cfg(test)]
mod tests {
        use axum::http::Request;

        use super::*;

        fn parts(header: Option<&str>) -> Parts {
                let mut builder = Request::builder().uri("/api/user");
                if let Some(value) = header {
                        builder = builder.header(AUTHORIZATION, value);
                }
                builder.body(()).unwrap().into_parts().0
        }

        #[test]
        fn extracts_bearer_token() {
                assert_eq!(bearer_token(&parts(Some("Bearer abc.def"))).unwrap(), "abc.def");
        }

        #[test]
        fn rejects_missing_or_foreign_schemes() {
                assert!(matches!(bearer_token(&parts(None)), Err(Problem::Unauthorized(_))));
                assert!(matches!(bearer_token(&parts(Some("Basic Zm9v"))), Err(Problem::Unauthorized(_))));
                assert!(matches!(bearer_token(&parts(Some("Bearer "))), Err(Problem::Unauthorized(_))));
        }
}
