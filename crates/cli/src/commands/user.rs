//! `loomi-cli user create`: create an account without going through the API.

use loomi_api::services::auth::{RegisterInput, create_user};
use loomi_core::UserRole;

use super::{CommandError, connect};

/// Create an account with the given role.
///
/// The same field rules as `POST /api/register` apply.
pub async fn create(
    email: &str,
    first_name: &str,
    last_name: &str,
    password: String,
    role: &str,
) -> Result<(), CommandError> {
    let role: UserRole = role
        .parse()
        .map_err(|_| CommandError::InvalidRole(role.to_owned()))?;

    let pool = connect().await?;
    tracing::info!("Creating user: {email} ({role})");

    let input = RegisterInput {
        first_name: Some(first_name.to_owned()),
        last_name: Some(last_name.to_owned()),
        email: Some(email.to_owned()),
        password: Some(password),
    };
    let user = create_user(&pool, &input, role).await?;

    tracing::info!(
        "User created successfully! ID: {}, Email: {}, Role: {}",
        user.id,
        user.email,
        user.role
    );
    Ok(())
}
