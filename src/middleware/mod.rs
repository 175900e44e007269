use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde::{Deserialize, Serialize};
use std::sync::Arc;

use crate::error::AppError;
use crate::models::CinemaScope;

/// Роль пользователя. Приходит в токене, а не из состояния фронтенда.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Owner,
    Manager,
    User,
}

/// Claims JWT. Токены выпускает сервис авторизации, здесь только проверка.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: i64,
    pub email: String,
    pub role: Role,
    /// Кинотеатр, к которому привязан менеджер.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cinema_id: Option<i64>,
    pub exp: usize,
}

/// Аутентифицированная сессия, передаётся в каждый обработчик явно.
#[derive(Debug, Clone)]
pub struct Session {
    pub user_id: i64,
    pub email: String,
    pub role: Role,
    pub cinema_id: Option<i64>,
}

impl From<Claims> for Session {
    fn from(claims: Claims) -> Self {
        Session {
            user_id: claims.sub,
            email: claims.email,
            role: claims.role,
            cinema_id: claims.cinema_id,
        }
    }
}

impl Session {
    pub fn require_role(&self, allowed: &[Role]) -> Result<(), AppError> {
        if allowed.contains(&self.role) {
            Ok(())
        } else {
            Err(AppError::Forbidden("Insufficient role".to_string()))
        }
    }

    /// Может ли сессия управлять кинотеатром: админ, его владелец или его менеджер.
    pub fn can_manage(&self, scope: &CinemaScope) -> bool {
        match self.role {
            Role::Admin => true,
            Role::Owner => scope.owner_id == self.user_id,
            Role::Manager => self.cinema_id == Some(scope.cinema_id),
            Role::User => false,
        }
    }
}

pub fn decode_token(token: &str, secret: &str) -> Result<Claims, AppError> {
    let validation = Validation::new(Algorithm::HS256);
    decode::<Claims>(token, &DecodingKey::from_secret(secret.as_bytes()), &validation)
        .map(|data| data.claims)
        .map_err(|e| {
            tracing::debug!("rejected token: {}", e);
            AppError::Unauthorized
        })
}

fn bearer_token(parts: &Parts) -> Option<&str> {
    parts
        .headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
}

// Bearer JWT extractor
impl FromRequestParts<Arc<crate::AppState>> for Session {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<crate::AppState>,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts).ok_or(AppError::Unauthorized)?;
        let claims = decode_token(token, &state.config.jwt.secret)?;
        Ok(claims.into())
    }
}
