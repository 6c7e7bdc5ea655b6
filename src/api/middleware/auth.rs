use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::Response,
};

use crate::{api::state::AppState, auth, error::AppError};

/// Claims of the caller, inserted into request extensions by the auth
/// middleware.
#[derive(Clone)]
pub struct CurrentUser {
    pub claims: auth::Claims,
}

fn bearer_token(request: &Request) -> Result<&str, AppError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or_else(|| AppError::Unauthorized("Token não fornecido".to_string()))?;

    header
        .strip_prefix("Bearer ")
        .ok_or_else(|| AppError::Unauthorized("Token não fornecido".to_string()))
}

pub async fn require_staff(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(&request)?;
    let claims = state.service_context.auth_service.verify_token(token)?;

    if claims.role != auth::ROLE_STAFF {
        return Err(AppError::Forbidden);
    }

    request.extensions_mut().insert(CurrentUser { claims });

    Ok(next.run(request).await)
}
