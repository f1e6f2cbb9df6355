use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::Utc;
use jsonwebtoken::{decode, encode, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use rand_core::OsRng;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use crate::errors::problem::Problem;
use crate::models::{Role, User};

pub const MIN_PASSWORD_LENGTH: usize = 6;

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct Claims {
        pub sub: String,
        pub email: String,
        pub role: Role,
        pub exp: usize,
}

pub fn hash_password(password: &str) -> Result<String, Problem> {
        let salt = SaltString::generate(&mut OsRng);

        Argon2::default()
                .hash_password(password.as_bytes(), &salt)
                .map(|hash| hash.to_string())
                .map_err(|err| {
                        error!("failed to hash password: {err}");
                        Problem::InternalServerError("failed to hash password".to_string())
                })
}

pub fn verify_password(password: &str, password_hash: &str) -> Result<bool, Problem> {
        let parsed = PasswordHash::new(password_hash).map_err(|err| {
                error!("stored password hash is invalid: {err}");
                Problem::InternalServerError("Server error: invalid stored password".to_string())
        })?;

        Ok(Argon2::default().verify_password(password.as_bytes(), &parsed).is_ok())
}

pub fn issue_token(user: &User, secret: &str, ttl_seconds: i64) -> Result<String, Problem> {
        let role = user.role.parse::<Role>().unwrap_or(Role::User);
        let claims = Claims {
                sub: user.id.to_string(),
                email: user.email.clone(),
                role,
                exp: (Utc::now().timestamp() + ttl_seconds).max(0) as usize,
        };

        encode(&Header::new(Algorithm::HS256), &claims, &EncodingKey::from_secret(secret.as_bytes())).map_err(|err| {
                error!("failed to sign token: {err}");
                Problem::InternalServerError("failed to sign token".to_string())
        })
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, Problem> {
        decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &Validation::new(Algorithm::HS256))
                .map(|data| data.claims)
                .map_err(|err| {
                        debug!("invalid token: {err}");
                        Problem::Unauthorized("invalid token".to_string())
                })
}

#[cfg(test)]
mod tests {
        use super::*;

        fn user() -> User {
                User {
                        id: 42,
                        created_at: Utc::now().naive_utc(),
                        updated_at: Utc::now().naive_utc(),
                        email: "admin@example.com".to_string(),
                        password_hash: String::new(),
                        role: "admin".to_string(),
                        is_active: true,
                        last_login: None,
                        profile_id: None,
                }
        }

        #[test]
        fn password_round_trip() {
                let hash = hash_password("hunter22").unwrap();

                assert!(verify_password("hunter22", &hash).unwrap());
                assert!(!verify_password("hunter23", &hash).unwrap());
        }

        #[test]
        fn garbage_hash_is_server_error() {
                let err = verify_password("hunter22", "not-a-phc-string").unwrap_err();

                assert!(matches!(err, Problem::InternalServerError(_)));
        }

        #[test]
        fn token_round_trip() {
                let token = issue_token(&user(), "secret", 60).unwrap();

                let claims = decode_token(&token, "secret").unwrap();

                assert_eq!(claims.sub, "42");
                assert_eq!(claims.role, Role::Admin);
        }

        #[test]
        fn token_with_wrong_secret_is_unauthorized() {
                let token = issue_token(&user(), "secret", 60).unwrap();

                let err = decode_token(&token, "other").unwrap_err();

                assert!(matches!(err, Problem::Unauthorized(_)));
        }

        #[test]
        fn expired_token_is_unauthorized() {
                let token = issue_token(&user(), "secret", -3600).unwrap();

                assert!(decode_token(&token, "secret").is_err());
        }
}
