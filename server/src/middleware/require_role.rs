use axum::{
    extract::{Request, State},
    middleware::Next,
    response::Response,
};

use crate::error::AppError;
use crate::middleware::auth::AuthStaff;
use crate::models::staff::Role;
use crate::AppState;

/// Middleware: staff management is admin-only. Re-reads the role from the
/// directory so a demotion takes effect before the token expires.
pub async fn require_admin(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AppError> {
    let staff = req
        .extensions()
        .get::<AuthStaff>()
        .cloned()
        .ok_or_else(|| AppError::Unauthorized("Authentication required".into()))?;

    let role: Option<Role> =
        sqlx::query_scalar("SELECT role FROM staff WHERE id = $1 AND is_active = true")
            .bind(staff.id)
            .fetch_optional(&state.db)
            .await?;

    match role {
        Some(Role::Admin) => {
            req.extensions_mut().insert(AuthStaff {
                id: staff.id,
                role: Role::Admin,
            });
            Ok(next.run(req).await)
        }
        _ => Err(AppError::RoleForbidden("Requires admin role".into())),
    }
}
