use crate::config::Config;
use crate::engine::error::AttendanceError;
use crate::model::role::Role;
use crate::models::{Claims, TokenType};
use actix_web::{FromRequest, HttpRequest, dev::Payload, error::ErrorUnauthorized, web::Data};
use futures::future::{Ready, ready};
use jsonwebtoken::decode;
use jsonwebtoken::{DecodingKey, Validation};
use sqlx::MySqlPool;

pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
}

impl FromRequest for AuthUser {
    type Error = actix_web::Error;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        let token = match req
            .headers()
            .get("Authorization")
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
        {
            Some(t) => t,
            None => return ready(Err(ErrorUnauthorized("Missing token"))),
        };

        let config = match req.app_data::<Data<Config>>() {
            Some(c) => c,
            None => {
                return ready(Err(actix_web::error::ErrorInternalServerError(
                    "Config missing",
                )));
            }
        };

        let data = match decode::<Claims>(
            token,
            &DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            &Validation::default(),
        ) {
            Ok(d) => d,
            Err(_) => return ready(Err(ErrorUnauthorized("Invalid token"))),
        };

        if data.claims.token_type != TokenType::Access {
            return ready(Err(ErrorUnauthorized("Not an access token")));
        }

        ready(Ok(AuthUser {
            user_id: data.claims.user_id,
            email: data.claims.sub,
        }))
    }
}

impl AuthUser {
    /// Resolve this user's role in `company_id` and require it to be one of
    /// `allowed`. No membership row means the caller has no verified
    /// identity within this tenant.
    pub async fn require_role(
        &self,
        pool: &MySqlPool,
        company_id: u64,
        allowed: &[Role],
    ) -> actix_web::Result<Role> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT role FROM user_roles WHERE user_id = ? AND company_id = ?")
                .bind(self.user_id)
                .bind(company_id)
                .fetch_optional(pool)
                .await
                .map_err(AttendanceError::from)?;

        let role = row
            .and_then(|(r,)| Role::from_str(&r))
            .ok_or(AttendanceError::Unauthenticated)?;

        if allowed.contains(&role) {
            Ok(role)
        } else {
            Err(actix_web::error::ErrorForbidden(
                "Insufficient role for this operation",
            ))
        }
    }

    /// Any role suffices, only membership matters.
    pub async fn require_member(
        &self,
        pool: &MySqlPool,
        company_id: u64,
    ) -> actix_web::Result<Role> {
        self.require_role(pool, company_id, &[Role::Admin, Role::Hr, Role::Employee])
            .await
    }
}
