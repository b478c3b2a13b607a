//! Authentication middleware
//!
//! Bearer token verification and role guards. Token issuance lives
//! outside this service; only the signature and expiry are checked here.

use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};

use crate::error::AppError;
use crate::AppState;

pub const ADMINISTRATOR: &str = "administrator";
pub const MANAGER: &str = "manager";
pub const SALES_REP: &str = "sales_rep";

/// Roles allowed to mutate inventory and purchase orders
pub const STOCK_MANAGERS: &[&str] = &[ADMINISTRATOR, MANAGER];

/// Roles allowed to create and move sales orders
pub const SALES_STAFF: &[&str] = &[ADMINISTRATOR, MANAGER, SALES_REP];

/// Authenticated user information extracted from the token
#[derive(Clone, Debug)]
pub struct AuthUser {
    pub user_id: i64,
    pub role: String,
}

impl AuthUser {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }

    pub fn has_any_role(&self, roles: &[&str]) -> bool {
        roles.iter().any(|r| self.has_role(r))
    }
}

/// Validates the bearer token and stores the caller in request extensions
pub async fn auth_middleware(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok());

    let token = match auth_header.and_then(|h| h.strip_prefix("Bearer ")) {
        Some(token) => token,
        None => {
            return AppError::Unauthorized("Missing or invalid Authorization header".into())
                .into_response();
        }
    };

    let claims = match decode_jwt(token, &state.config.jwt.secret) {
        Ok(claims) => claims,
        Err(msg) => return AppError::Unauthorized(msg).into_response(),
    };

    let user_id = match claims.sub.parse::<i64>() {
        Ok(id) => id,
        Err(_) => {
            return AppError::Unauthorized("Invalid user ID in token".into()).into_response();
        }
    };

    request.extensions_mut().insert(AuthUser {
        user_id,
        role: claims.role,
    });

    next.run(request).await
}

/// JWT claims structure
#[derive(Debug, serde::Serialize, serde::Deserialize)]
pub struct Claims {
    pub sub: String,
    pub role: String,
    pub exp: i64,
    pub iat: i64,
}

fn decode_jwt(token: &str, secret: &str) -> Result<Claims, String> {
    use jsonwebtoken::{decode, DecodingKey, Validation};

    decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {}", e))
}

/// Extractor for the authenticated user
#[derive(Clone, Debug)]
pub struct CurrentUser(pub AuthUser);

#[axum::async_trait]
impl<S> axum::extract::FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut axum::http::request::Parts,
        _state: &S,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .map(CurrentUser)
            .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))
    }
}

/// Role guard for use in handlers
pub fn require_role(user: &AuthUser, roles: &[&str]) -> Result<(), AppError> {
    if user.has_any_role(roles) {
        Ok(())
    } else {
        tracing::debug!(
            "User {} with role '{}' denied; requires one of {:?}",
            user.user_id,
            user.role,
            roles
        );
        Err(AppError::InsufficientPermissions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn user(role: &str) -> AuthUser {
        AuthUser {
            user_id: 1,
            role: role.to_string(),
        }
    }

    #[test]
    fn test_require_role() {
        assert!(require_role(&user(MANAGER), STOCK_MANAGERS).is_ok());
        assert!(require_role(&user(SALES_REP), SALES_STAFF).is_ok());
        assert!(matches!(
            require_role(&user(SALES_REP), STOCK_MANAGERS),
            Err(AppError::InsufficientPermissions)
        ));
    }

    #[test]
    fn test_decode_rejects_wrong_secret() {
        use jsonwebtoken::{encode, EncodingKey, Header};

        let claims = Claims {
            sub: "7".into(),
            role: MANAGER.into(),
            exp: chrono::Utc::now().timestamp() + 600,
            iat: chrono::Utc::now().timestamp(),
        };
        let token = encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(b"right-secret"),
        )
        .unwrap();

        assert_eq!(decode_jwt(&token, "right-secret").unwrap().sub, "7");
        assert!(decode_jwt(&token, "wrong-secret").is_err());
    }
}
