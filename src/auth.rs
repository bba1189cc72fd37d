// Authentication: password hashing, JWT tokens, and the register/login
// handlers.
//
// Gameplay responses carry a `status` field: 0 = error, 1 = success,
// 2 = game over.

use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use axum::{
    extract::{FromRequestParts, State},
    http::{request::Parts, StatusCode},
    response::IntoResponse,
    Json,
};
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::db::Database;
use crate::metrics;

// ── JWT ──────────────────────────────────────────────────────────────

/// JWT secret – in production this should come from an env var.
fn jwt_secret() -> Vec<u8> {
    std::env::var("JWT_SECRET")
        .unwrap_or_else(|_| "pokehunt-dev-secret-change-in-production".to_string())
        .into_bytes()
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub sub: i64, // team id
    pub teamname: String,
    pub role: String,
    pub exp: usize, // expiry (unix timestamp)
}

pub fn create_token(team_id: i64, teamname: &str, role: &str) -> Result<String, String> {
    let expiration = chrono::Utc::now()
        .checked_add_signed(chrono::Duration::hours(24))
        .expect("valid timestamp")
        .timestamp() as usize;

    let claims = Claims {
        sub: team_id,
        teamname: teamname.to_string(),
        role: role.to_string(),
        exp: expiration,
    };

    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(&jwt_secret()),
    )
    .map_err(|e| format!("Failed to create token: {e}"))
}

pub fn verify_token(token: &str) -> Result<Claims, String> {
    decode::<Claims>(
        token,
        &DecodingKey::from_secret(&jwt_secret()),
        &Validation::default(),
    )
    .map(|data| data.claims)
    .map_err(|e| format!("Invalid token: {e}"))
}

// ── Password hashing ─────────────────────────────────────────────────

pub fn hash_password(password: &str) -> Result<String, String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| format!("Failed to hash password: {e}"))
}

pub fn verify_password(password: &str, hash: &str) -> Result<bool, String> {
    let parsed_hash = PasswordHash::new(hash).map_err(|e| format!("Invalid password hash: {e}"))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

// ── Axum extractors ──────────────────────────────────────────────────

/// Extracts the authenticated team from the Authorization header.
/// Usage: `AuthUser(claims)` in handler parameters.
#[derive(Debug, Clone)]
pub struct AuthUser(pub Claims);

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let auth_header = parts
            .headers
            .get("Authorization")
            .and_then(|v| v.to_str().ok())
            .ok_or_else(|| {
                (
                    StatusCode::UNAUTHORIZED,
                    Json(json!({"status": 0, "error_message": "Missing Authorization header"})),
                )
            })?;

        let token = auth_header.strip_prefix("Bearer ").ok_or_else(|| {
            (
                StatusCode::UNAUTHORIZED,
                Json(json!({"status": 0, "error_message": "Invalid Authorization header format"})),
            )
        })?;

        match verify_token(token) {
            Ok(claims) => Ok(AuthUser(claims)),
            Err(_) => Err((
                StatusCode::UNAUTHORIZED,
                Json(json!({"status": 0, "error_message": "Invalid token"})),
            )),
        }
    }
}

/// Extractor that additionally requires the admin role. Gates the
/// administrative snapshot and game-control endpoints.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Claims);

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = (StatusCode, Json<serde_json::Value>);

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let AuthUser(claims) = AuthUser::from_request_parts(parts, state).await?;
        if claims.role != "admin" {
            return Err((
                StatusCode::FORBIDDEN,
                Json(json!({"status": 0, "error_message": "Admin access required"})),
            ));
        }
        Ok(AdminUser(claims))
    }
}

// ── Registration validation ──────────────────────────────────────────

fn valid_teamname(name: &str) -> bool {
    (3..=30).contains(&name.len())
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn valid_phone(phone: &str) -> bool {
    phone.len() == 10 && phone.chars().all(|c| c.is_ascii_digit())
}

fn valid_email(email: &str) -> bool {
    let Some((local, domain)) = email.split_once('@') else {
        return false;
    };
    !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
}

/// Field-format checks for the registration form.
fn validate_registration(req: &RegisterRequest) -> Result<(), String> {
    if !valid_teamname(&req.teamname) {
        return Err("teamname must be 3-30 alphanumeric characters".to_string());
    }
    if req.password.len() < 8 {
        return Err("password must be at least 8 characters".to_string());
    }
    if req.name1.trim().is_empty() || req.name2.trim().is_empty() {
        return Err("both member names are required".to_string());
    }
    if !valid_phone(&req.phone1) || !valid_phone(&req.phone2) {
        return Err("phone numbers must be 10 digits".to_string());
    }
    if !valid_email(&req.email1) || !valid_email(&req.email2) {
        return Err("email addresses are not valid".to_string());
    }
    if req.idno1.trim().is_empty() || req.idno2.trim().is_empty() {
        return Err("both member id numbers are required".to_string());
    }
    Ok(())
}

// ── Handlers ─────────────────────────────────────────────────────────

#[derive(Deserialize)]
pub struct RegisterRequest {
    pub teamname: String,
    pub password: String,
    pub name1: String,
    pub name2: String,
    pub phone1: String,
    pub phone2: String,
    pub email1: String,
    pub email2: String,
    pub idno1: String,
    pub idno2: String,
}

#[derive(Deserialize)]
pub struct LoginRequest {
    pub teamname: String,
    pub password: String,
}

pub async fn register(
    State(db): State<Arc<Database>>,
    Json(req): Json<RegisterRequest>,
) -> impl IntoResponse {
    if let Err(message) = validate_registration(&req) {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": 0, "message": message})),
        )
            .into_response();
    }

    let password_hash = match hash_password(&req.password) {
        Ok(h) => h,
        Err(e) => {
            tracing::error!("Password hash error: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": 0, "message": "Internal error"})),
            )
                .into_response();
        }
    };

    let question_count = match db.count_questions().await {
        Ok(n) => n as usize,
        Err(e) => {
            tracing::error!("DB error in register: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": 0, "message": "Internal error"})),
            )
                .into_response();
        }
    };

    match db
        .create_team(
            &req.teamname,
            &password_hash,
            &req.name1,
            &req.name2,
            &req.phone1,
            &req.phone2,
            &req.email1,
            &req.email2,
            &req.idno1,
            &req.idno2,
            question_count,
        )
        .await
    {
        Ok(team) => {
            let token = match create_token(team.id, &team.teamname, &team.role) {
                Ok(t) => t,
                Err(e) => {
                    tracing::error!("Token creation error: {e}");
                    return (
                        StatusCode::INTERNAL_SERVER_ERROR,
                        Json(json!({"status": 0, "message": "Internal error"})),
                    )
                        .into_response();
                }
            };
            metrics::REGISTRATIONS_TOTAL.inc();
            tracing::info!("Registered team {}", team.teamname);
            (
                StatusCode::CREATED,
                Json(json!({
                    "status": 1,
                    "message": "Successfully Registered",
                    "teamname": team.teamname,
                    "token": token,
                })),
            )
                .into_response()
        }
        Err(e) => {
            let msg = e.to_string();
            if msg.contains("UNIQUE") {
                (
                    StatusCode::CONFLICT,
                    Json(json!({"status": 0, "message": "Team name already registered"})),
                )
                    .into_response()
            } else {
                tracing::error!("DB error in register: {e}");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"status": 0, "message": "Internal error"})),
                )
                    .into_response()
            }
        }
    }
}

pub async fn login(
    State(db): State<Arc<Database>>,
    Json(req): Json<LoginRequest>,
) -> impl IntoResponse {
    let team = match db.get_team_by_name(&req.teamname).await {
        Ok(Some(t)) => t,
        Ok(None) => {
            metrics::LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"status": 0, "error_message": "Username or password is incorrect"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("DB error in login: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": 0, "error_message": "Internal error"})),
            )
                .into_response();
        }
    };

    match verify_password(&req.password, &team.password_hash) {
        Ok(true) => {}
        Ok(false) => {
            metrics::LOGINS_TOTAL.with_label_values(&["failure"]).inc();
            return (
                StatusCode::UNAUTHORIZED,
                Json(json!({"status": 0, "error_message": "Username or password is incorrect"})),
            )
                .into_response();
        }
        Err(e) => {
            tracing::error!("Password verify error: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": 0, "error_message": "Internal error"})),
            )
                .into_response();
        }
    }

    if team.is_active == 0 {
        metrics::LOGINS_TOTAL.with_label_values(&["failure"]).inc();
        return (
            StatusCode::UNAUTHORIZED,
            Json(json!({
                "status": 0,
                "error_message": "Your account is not active, please contact the site admin."
            })),
        )
            .into_response();
    }

    if team.submitted == 1 {
        metrics::LOGINS_TOTAL.with_label_values(&["game_over"]).inc();
        return (
            StatusCode::OK,
            Json(json!({"status": 2, "error_message": "Time's up"})),
        )
            .into_response();
    }

    // Admins may log in before the game opens; teams may not.
    if team.role == "team" {
        match db.game_open().await {
            Ok(true) => {}
            Ok(false) => {
                metrics::LOGINS_TOTAL.with_label_values(&["failure"]).inc();
                return (
                    StatusCode::OK,
                    Json(json!({
                        "status": 0,
                        "error_message": "The Game has not started yet! Stay tuned"
                    })),
                )
                    .into_response();
            }
            Err(e) => {
                tracing::error!("DB error in login: {e}");
                return (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({"status": 0, "error_message": "Internal error"})),
                )
                    .into_response();
            }
        }
    }

    let token = match create_token(team.id, &team.teamname, &team.role) {
        Ok(t) => t,
        Err(e) => {
            tracing::error!("Token creation error: {e}");
            return (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"status": 0, "error_message": "Internal error"})),
            )
                .into_response();
        }
    };

    metrics::LOGINS_TOTAL.with_label_values(&["success"]).inc();
    (
        StatusCode::OK,
        Json(json!({
            "status": 1,
            "message": "Successfully Logged In",
            "teamname": team.teamname,
            "token": token,
        })),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hash_and_verify() {
        let password = "testpassword123";
        let hash = hash_password(password).unwrap();
        assert!(verify_password(password, &hash).unwrap());
        assert!(!verify_password("wrongpassword", &hash).unwrap());
    }

    #[test]
    fn test_jwt_create_and_verify() {
        let token = create_token(1, "rockets", "team").unwrap();
        let claims = verify_token(&token).unwrap();
        assert_eq!(claims.sub, 1);
        assert_eq!(claims.teamname, "rockets");
        assert_eq!(claims.role, "team");
    }

    #[test]
    fn test_jwt_invalid_token() {
        assert!(verify_token("invalid.token.here").is_err());
    }

    #[test]
    fn test_valid_teamname() {
        assert!(valid_teamname("team_rocket"));
        assert!(valid_teamname("abc"));
        assert!(!valid_teamname("ab"));
        assert!(!valid_teamname("has spaces"));
        assert!(!valid_teamname(&"x".repeat(31)));
    }

    #[test]
    fn test_valid_phone() {
        assert!(valid_phone("9876543210"));
        assert!(!valid_phone("98765"));
        assert!(!valid_phone("98765432x0"));
        assert!(!valid_phone("98765432101"));
    }

    #[test]
    fn test_valid_email() {
        assert!(valid_email("ash@pallet.town"));
        assert!(!valid_email("ash.pallet.town"));
        assert!(!valid_email("@pallet.town"));
        assert!(!valid_email("ash@pallettown"));
        assert!(!valid_email("ash@.town"));
    }

    fn request() -> RegisterRequest {
        RegisterRequest {
            teamname: "rockets".into(),
            password: "password123".into(),
            name1: "Jessie".into(),
            name2: "James".into(),
            phone1: "9876543210".into(),
            phone2: "9876543211".into(),
            email1: "jessie@rocket.hq".into(),
            email2: "james@rocket.hq".into(),
            idno1: "R001".into(),
            idno2: "R002".into(),
        }
    }

    #[test]
    fn test_validate_registration_accepts_well_formed() {
        assert!(validate_registration(&request()).is_ok());
    }

    #[test]
    fn test_validate_registration_rejects_short_password() {
        let mut req = request();
        req.password = "short".into();
        assert!(validate_registration(&req).is_err());
    }

    #[test]
    fn test_validate_registration_rejects_bad_phone() {
        let mut req = request();
        req.phone2 = "12".into();
        assert!(validate_registration(&req).is_err());
    }

    #[test]
    fn test_validate_registration_rejects_empty_id() {
        let mut req = request();
        req.idno1 = "  ".into();
        assert!(validate_registration(&req).is_err());
    }
}
