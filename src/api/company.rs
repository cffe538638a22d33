use crate::auth::auth::AuthUser;
use crate::engine::error::AttendanceError;
use crate::engine::face::validate_photo;
use crate::model::company::{Company, InviteCode};
use crate::model::role::Role;
use actix_web::{HttpResponse, Responder, error::ErrorInternalServerError, web};
use argon2::password_hash::rand_core::{OsRng, RngCore};
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use serde_json::json;
use sqlx::MySqlPool;
use tracing::{error, info, warn};
use utoipa::ToSchema;

const CODE_ALPHABET: &[u8] = b"ABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
const CODE_LEN: usize = 8;

fn generate_code() -> String {
    let mut bytes = [0u8; CODE_LEN];
    OsRng.fill_bytes(&mut bytes);
    bytes
        .iter()
        .map(|b| CODE_ALPHABET[*b as usize % CODE_ALPHABET.len()] as char)
        .collect()
}

async fn enroll_reference_photo(pool: &MySqlPool, user_id: u64, company_id: u64, photo: &str) {
    // Best effort: membership stands even if the photo insert fails; the
    // next check-in will enroll one instead.
    let result = sqlx::query(
        r#"
        INSERT INTO attendance_photos (user_id, company_id, photo, is_primary)
        VALUES (?, ?, ?, 1)
        "#,
    )
    .bind(user_id)
    .bind(company_id)
    .bind(photo)
    .execute(pool)
    .await;

    match result {
        Ok(_) => info!(user_id, company_id, "Reference photo enrolled"),
        Err(e) => warn!(error = %e, user_id, company_id, "Reference photo was not saved"),
    }
}

#[derive(Deserialize, ToSchema)]
pub struct CreateCompany {
    #[schema(example = "Acme Corp")]
    pub name: String,
    /// Creator's face photo, enrolled for attendance verification.
    pub face_photo: String,
}

/// Create a company; the creator becomes its admin.
#[utoipa::path(
    post,
    path = "/api/v1/company",
    request_body = CreateCompany,
    responses(
        (status = 200, description = "Company created", body = Company),
        (status = 400, description = "Missing name or face photo"),
        (status = 401)
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn create_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<CreateCompany>,
) -> actix_web::Result<impl Responder> {
    let name = payload.name.trim();
    if name.is_empty() {
        return Err(AttendanceError::InvalidInput("Company name is required".into()).into());
    }
    validate_photo(&payload.face_photo)?;

    let mut tx = pool.begin().await.map_err(|e| {
        error!(error = %e, "Failed to open transaction");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let inserted = sqlx::query("INSERT INTO companies (name, admin_id) VALUES (?, ?)")
        .bind(name)
        .bind(auth.user_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to create company");
            ErrorInternalServerError("Internal Server Error")
        })?;
    let company_id = inserted.last_insert_id();

    sqlx::query("INSERT INTO user_roles (user_id, company_id, role) VALUES (?, ?, 'admin')")
        .bind(auth.user_id)
        .bind(company_id)
        .execute(&mut *tx)
        .await
        .map_err(|e| {
            error!(error = %e, "Failed to assign admin role");
            ErrorInternalServerError("Internal Server Error")
        })?;

    tx.commit().await.map_err(|e| {
        error!(error = %e, "Failed to commit company creation");
        ErrorInternalServerError("Internal Server Error")
    })?;

    enroll_reference_photo(pool.get_ref(), auth.user_id, company_id, &payload.face_photo).await;

    info!(company_id, admin_id = auth.user_id, "Company created");

    Ok(HttpResponse::Ok().json(Company {
        id: company_id,
        name: name.to_string(),
        admin_id: auth.user_id,
        created_at: Some(Utc::now()),
    }))
}

#[derive(Serialize, sqlx::FromRow, ToSchema)]
pub struct Member {
    pub user_id: u64,
    pub full_name: String,
    pub email: String,
    #[schema(example = "employee")]
    pub role: String,
}

/// List company members (admin/HR)
#[utoipa::path(
    get,
    path = "/api/v1/company/{company_id}/members",
    params(("company_id", Path, description = "Company ID")),
    responses(
        (status = 200, description = "Members", body = [Member]),
        (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn list_members(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
) -> actix_web::Result<impl Responder> {
    let company_id = path.into_inner();
    auth.require_role(pool.get_ref(), company_id, &[Role::Admin, Role::Hr])
        .await?;

    let members = sqlx::query_as::<_, Member>(
        r#"
        SELECT u.id AS user_id, u.full_name, u.email, r.role
        FROM user_roles r
        JOIN users u ON u.id = r.user_id
        WHERE r.company_id = ?
        ORDER BY u.full_name
        "#,
    )
    .bind(company_id)
    .fetch_all(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, company_id, "Failed to fetch members");
        ErrorInternalServerError("Internal Server Error")
    })?;

    Ok(HttpResponse::Ok().json(members))
}

#[derive(Deserialize, ToSchema)]
pub struct GenerateInvite {
    /// Role granted on join; defaults to employee.
    #[schema(example = "employee")]
    pub role: Option<String>,
    #[schema(example = 5)]
    pub max_uses: Option<u32>,
    #[schema(example = 7)]
    pub expires_in_days: Option<i64>,
}

/// Generate an invite code (admin only)
#[utoipa::path(
    post,
    path = "/api/v1/company/{company_id}/invites",
    params(("company_id", Path, description = "Company ID")),
    request_body = GenerateInvite,
    responses(
        (status = 200, description = "Invite code created"),
        (status = 400), (status = 401), (status = 403)
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn generate_invite(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    path: web::Path<u64>,
    payload: web::Json<GenerateInvite>,
) -> actix_web::Result<impl Responder> {
    let company_id = path.into_inner();
    auth.require_role(pool.get_ref(), company_id, &[Role::Admin])
        .await?;

    let role = match payload.role.as_deref() {
        None => Role::Employee,
        Some(r) => Role::from_str(r)
            .ok_or_else(|| AttendanceError::InvalidInput(format!("unknown role: {r}")))?,
    };

    let code = generate_code();
    let max_uses = payload.max_uses.unwrap_or(1).max(1);
    let expires_at: Option<DateTime<Utc>> = payload
        .expires_in_days
        .map(|days| Utc::now() + Duration::days(days));

    let inserted = sqlx::query(
        r#"
        INSERT INTO invite_codes (company_id, code, role, max_uses, created_by, expires_at)
        VALUES (?, ?, ?, ?, ?, ?)
        "#,
    )
    .bind(company_id)
    .bind(&code)
    .bind(role.as_str())
    .bind(max_uses)
    .bind(auth.user_id)
    .bind(expires_at)
    .execute(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, company_id, "Failed to create invite code");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!(company_id, code = %code, "Invite code created");

    Ok(HttpResponse::Ok().json(json!({
        "invite_code": InviteCode {
            id: inserted.last_insert_id(),
            company_id,
            code,
            role: role.as_str().to_string(),
            max_uses,
            current_uses: 0,
            created_by: auth.user_id,
            expires_at,
        }
    })))
}

#[derive(Deserialize, ToSchema)]
pub struct JoinCompany {
    #[schema(example = "K7Q2M9BD")]
    pub code: String,
    /// Joiner's face photo, enrolled for attendance verification.
    pub face_photo: String,
}

/// Join a company with an invite code
#[utoipa::path(
    post,
    path = "/api/v1/company/join",
    request_body = JoinCompany,
    responses(
        (status = 200, description = "Joined", body = Company),
        (status = 400, description = "Invalid, expired, or exhausted code; already a member"),
        (status = 401)
    ),
    security(("bearer_auth" = [])),
    tag = "Company"
)]
pub async fn join_company(
    auth: AuthUser,
    pool: web::Data<MySqlPool>,
    payload: web::Json<JoinCompany>,
) -> actix_web::Result<impl Responder> {
    validate_photo(&payload.face_photo)?;

    let invite = sqlx::query_as::<_, InviteCode>(
        r#"
        SELECT id, company_id, code, role, max_uses, current_uses, created_by, expires_at
        FROM invite_codes
        WHERE code = ?
        "#,
    )
    .bind(payload.code.trim().to_uppercase())
    .fetch_optional(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to look up invite code");
        ErrorInternalServerError("Internal Server Error")
    })?;

    let Some(invite) = invite else {
        return Ok(HttpResponse::BadRequest().json(json!({ "error": "Invalid invite code" })));
    };

    if let Some(expires_at) = invite.expires_at {
        if expires_at < Utc::now() {
            return Ok(
                HttpResponse::BadRequest().json(json!({ "error": "Invite code has expired" }))
            );
        }
    }

    if invite.current_uses >= invite.max_uses {
        return Ok(HttpResponse::BadRequest()
            .json(json!({ "error": "Invite code has reached maximum uses" })));
    }

    let membership =
        sqlx::query("INSERT INTO user_roles (user_id, company_id, role) VALUES (?, ?, ?)")
            .bind(auth.user_id)
            .bind(invite.company_id)
            .bind(&invite.role)
            .execute(pool.get_ref())
            .await;

    if let Err(e) = membership {
        if let sqlx::Error::Database(db_err) = &e {
            // Unique (user, company): second join attempt.
            if db_err.code().as_deref() == Some("23000") {
                return Ok(HttpResponse::BadRequest()
                    .json(json!({ "error": "You are already a member of this company" })));
            }
        }
        error!(error = %e, "Failed to add member");
        return Err(ErrorInternalServerError("Internal Server Error"));
    }

    enroll_reference_photo(
        pool.get_ref(),
        auth.user_id,
        invite.company_id,
        &payload.face_photo,
    )
    .await;

    // Best effort, same as the photo: the join already happened.
    if let Err(e) = sqlx::query("UPDATE invite_codes SET current_uses = current_uses + 1 WHERE id = ?")
        .bind(invite.id)
        .execute(pool.get_ref())
        .await
    {
        warn!(error = %e, invite_id = invite.id, "Failed to bump invite code uses");
    }

    let company = sqlx::query_as::<_, Company>(
        "SELECT id, name, admin_id, created_at FROM companies WHERE id = ?",
    )
    .bind(invite.company_id)
    .fetch_one(pool.get_ref())
    .await
    .map_err(|e| {
        error!(error = %e, "Failed to fetch joined company");
        ErrorInternalServerError("Internal Server Error")
    })?;

    info!(user_id = auth.user_id, company_id = company.id, "User joined company");

    Ok(HttpResponse::Ok().json(company))
}
