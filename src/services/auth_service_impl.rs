//! `SeaORM` implementation of the `AuthService` trait.

use std::sync::Arc;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;

use crate::config::Config;
use crate::db::{Store, User};
use crate::domain::UserId;
use crate::services::auth_service::{AuthError, AuthService, LoginResult, UserInfo};

pub struct SeaOrmAuthService {
    store: Store,
    config: Arc<RwLock<Config>>,
}

impl SeaOrmAuthService {
    #[must_use]
    pub const fn new(store: Store, config: Arc<RwLock<Config>>) -> Self {
        Self { store, config }
    }
}

#[async_trait]
impl AuthService for SeaOrmAuthService {
    async fn register(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let security = self.config.read().await.security.clone();

        let email = email.trim();
        let Some((local, domain)) = email.split_once('@') else {
            return Err(AuthError::Validation("כתובת אימייל לא תקינה".to_string()));
        };
        if local.is_empty() || !domain.contains('.') {
            return Err(AuthError::Validation("כתובת אימייל לא תקינה".to_string()));
        }

        if password.chars().count() < security.min_password_length {
            return Err(AuthError::Validation(format!(
                "הסיסמה חייבת להכיל לפחות {} תווים",
                security.min_password_length
            )));
        }

        if self.store.get_user_by_email(email).await?.is_some() {
            return Err(AuthError::EmailTaken);
        }

        let user = self
            .store
            .create_user(email, password, false, &security)
            .await?;
        info!(user_id = %user.id, "Registered user");

        Ok(LoginResult {
            user_id: user.id,
            email: user.email,
            api_key: user.api_key,
        })
    }

    async fn login(&self, email: &str, password: &str) -> Result<LoginResult, AuthError> {
        let user = self
            .store
            .verify_user_password(email, password)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        Ok(LoginResult {
            user_id: user.id,
            email: user.email,
            api_key: user.api_key,
        })
    }

    async fn verify_api_key(&self, api_key: &str) -> Result<Option<User>, AuthError> {
        Ok(self.store.verify_api_key(api_key).await?)
    }

    async fn get_user_info(&self, id: UserId) -> Result<UserInfo, AuthError> {
        let user = self
            .store
            .get_user(id)
            .await?
            .ok_or(AuthError::UserNotFound)?;

        Ok(UserInfo::from(&user))
    }

    async fn regenerate_api_key(&self, id: UserId) -> Result<String, AuthError> {
        Ok(self.store.regenerate_api_key(id).await?)
    }
}
