use std::sync::Arc;

use argon2::password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use chrono::{Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crate::domain::customer::{AuthUser, Customer, Role};
use crate::error::AppError;
use crate::repository::{CustomerStore, UserStore};

// ============================================================================
// Authentication - Registration, Login, JWT
// ============================================================================
//
// Passwords are stored as argon2 PHC strings. Tokens are HS256 JWTs carrying
// the user id, the linked customer id, and the role; route guards trust the
// claims after signature and expiry checks.
//
// ============================================================================

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: Uuid,
    pub customer_id: Option<Uuid>,
    pub role: Role,
    pub iat: i64,
    pub exp: i64,
}

#[derive(Clone)]
pub struct JwtKeys {
    encoding: EncodingKey,
    decoding: DecodingKey,
    ttl_hours: i64,
}

impl JwtKeys {
    pub fn new(secret: &str, ttl_hours: i64) -> Self {
        Self {
            encoding: EncodingKey::from_secret(secret.as_bytes()),
            decoding: DecodingKey::from_secret(secret.as_bytes()),
            ttl_hours,
        }
    }

    pub fn issue(&self, user: &AuthUser, customer_id: Option<Uuid>) -> Result<String, AppError> {
        let now = Utc::now();
        let claims = Claims {
            sub: user.id,
            customer_id,
            role: user.role,
            iat: now.timestamp(),
            exp: (now + Duration::hours(self.ttl_hours)).timestamp(),
        };
        jsonwebtoken::encode(&Header::default(), &claims, &self.encoding)
            .map_err(|e| AppError::Internal(format!("token encoding failed: {e}")))
    }

    pub fn verify(&self, token: &str) -> Result<Claims, AppError> {
        jsonwebtoken::decode::<Claims>(token, &self.decoding, &Validation::default())
            .map(|data| data.claims)
            .map_err(|_| AppError::Unauthorized)
    }
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct RegisterInput {
    #[validate(length(min = 3, max = 64))]
    pub username: String,
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    #[validate(length(min = 1, max = 32))]
    pub identity_card: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoginInput {
    pub username: String,
    pub password: String,
}

/// Token plus the identity it was minted for.
#[derive(Debug, Clone, Serialize)]
pub struct AuthToken {
    pub token: String,
    pub user_id: Uuid,
    pub customer_id: Option<Uuid>,
    pub role: Role,
}

pub struct AuthService {
    users: Arc<dyn UserStore>,
    customers: Arc<dyn CustomerStore>,
    keys: JwtKeys,
}

impl AuthService {
    pub fn new(users: Arc<dyn UserStore>, customers: Arc<dyn CustomerStore>, keys: JwtKeys) -> Self {
        Self {
            users,
            customers,
            keys,
        }
    }

    pub fn keys(&self) -> &JwtKeys {
        &self.keys
    }

    /// Creates the login identity and its customer record in one unit of
    /// work, then signs the caller in.
    pub async fn register(&self, input: RegisterInput) -> Result<AuthToken, AppError> {
        input.validate()?;
        let username = input.username.trim().to_string();
        if self.users.get_by_username(&username).await?.is_some() {
            return Err(AppError::Conflict("username is already taken".into()));
        }

        let password_hash = hash_password(&input.password)?;
        let user = AuthUser::new(username, input.email, password_hash, Role::Customer);
        let customer = Customer::new(user.id, input.identity_card.trim().to_string());
        let customer_id = customer.id;

        self.users
            .create_with_customer(user.clone(), customer)
            .await?;
        tracing::info!(user_id = %user.id, customer_id = %customer_id, "user registered");

        let token = self.keys.issue(&user, Some(customer_id))?;
        Ok(AuthToken {
            token,
            user_id: user.id,
            customer_id: Some(customer_id),
            role: user.role,
        })
    }

    /// A missing user and a wrong password produce the same 401.
    pub async fn login(&self, input: LoginInput) -> Result<AuthToken, AppError> {
        let user = self
            .users
            .get_by_username(input.username.trim())
            .await?
            .ok_or(AppError::Unauthorized)?;
        verify_password(&input.password, &user.password_hash)?;

        let customer_id = self
            .customers
            .get_by_user(user.id)
            .await?
            .map(|c| c.id);

        tracing::info!(user_id = %user.id, "user logged in");
        let token = self.keys.issue(&user, customer_id)?;
        Ok(AuthToken {
            token,
            user_id: user.id,
            customer_id,
            role: user.role,
        })
    }
}

fn hash_password(password: &str) -> Result<String, AppError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AppError::Internal(format!("password hashing failed: {e}")))
}

fn verify_password(password: &str, stored: &str) -> Result<(), AppError> {
    let parsed = PasswordHash::new(stored)
        .map_err(|e| AppError::Internal(format!("stored hash is malformed: {e}")))?;
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .map_err(|_| AppError::Unauthorized)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::repository::memory::MemoryStore;

    fn service() -> AuthService {
        let store = Arc::new(MemoryStore::new());
        AuthService::new(
            store.clone(),
            store,
            JwtKeys::new("test-secret", 1),
        )
    }

    fn register_input(username: &str) -> RegisterInput {
        RegisterInput {
            username: username.into(),
            email: format!("{username}@example.com"),
            password: "quarry-gate-9".into(),
            identity_card: "G999000".into(),
        }
    }

    #[tokio::test]
    async fn register_then_login_round_trips_the_claims() {
        let svc = service();
        let registered = svc.register(register_input("meryem")).await.unwrap();
        assert_eq!(registered.role, Role::Customer);
        assert!(registered.customer_id.is_some());

        let logged_in = svc
            .login(LoginInput {
                username: "meryem".into(),
                password: "quarry-gate-9".into(),
            })
            .await
            .unwrap();
        assert_eq!(logged_in.user_id, registered.user_id);

        let claims = svc.keys().verify(&logged_in.token).unwrap();
        assert_eq!(claims.sub, registered.user_id);
        assert_eq!(claims.customer_id, registered.customer_id);
        assert_eq!(claims.role, Role::Customer);
        assert!(claims.exp > claims.iat);
    }

    #[tokio::test]
    async fn duplicate_username_is_a_conflict() {
        let svc = service();
        svc.register(register_input("selim")).await.unwrap();
        assert!(matches!(
            svc.register(register_input("selim")).await,
            Err(AppError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn register_validates_the_input_shape() {
        let svc = service();
        let mut input = register_input("ab");
        assert!(matches!(
            svc.register(input.clone()).await,
            Err(AppError::Validation(_))
        ));

        input.username = "valid-name".into();
        input.email = "not-an-email".into();
        assert!(matches!(
            svc.register(input.clone()).await,
            Err(AppError::Validation(_))
        ));

        input.email = "valid@example.com".into();
        input.password = "short".into();
        assert!(matches!(
            svc.register(input).await,
            Err(AppError::Validation(_))
        ));
    }

    #[tokio::test]
    async fn wrong_password_and_unknown_user_look_identical() {
        let svc = service();
        svc.register(register_input("zeynep")).await.unwrap();

        let wrong_password = svc
            .login(LoginInput {
                username: "zeynep".into(),
                password: "not-the-password".into(),
            })
            .await;
        let unknown_user = svc
            .login(LoginInput {
                username: "nobody".into(),
                password: "quarry-gate-9".into(),
            })
            .await;
        assert!(matches!(wrong_password, Err(AppError::Unauthorized)));
        assert!(matches!(unknown_user, Err(AppError::Unauthorized)));
    }

    #[test]
    fn tampered_tokens_are_rejected() {
        let keys = JwtKeys::new("secret-a", 1);
        let user = AuthUser::new(
            "emre".into(),
            "emre@example.com".into(),
            "hash".into(),
            Role::Admin,
        );
        let token = keys.issue(&user, None).unwrap();
        assert!(keys.verify(&token).is_ok());

        let other = JwtKeys::new("secret-b", 1);
        assert!(matches!(
            other.verify(&token),
            Err(AppError::Unauthorized)
        ));
        assert!(matches!(
            keys.verify("garbage.token.here"),
            Err(AppError::Unauthorized)
        ));
    }
}
