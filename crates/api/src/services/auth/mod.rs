//! Authentication service.
//!
//! Provides password registration and login, bearer token issue and refresh,
//! and profile updates.

mod error;
mod jwt;

pub use error::AuthError;
pub use jwt::{Claims, IssuedToken, JwtKeys};

use argon2::{
    Argon2,
    password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString, rand_core::OsRng},
};
use serde::Deserialize;
use sqlx::PgPool;

use loomi_core::{Email, UserId, UserRole};

use crate::db::RepositoryError;
use crate::db::users::{NewUser, ProfileUpdate, UserRepository};
use crate::models::User;
use crate::validation::ValidationErrors;

/// Minimum password length.
const MIN_PASSWORD_LENGTH: usize = 8;

/// Longest accepted name, address or city.
const MAX_FIELD_LENGTH: usize = 255;

/// Longest accepted zipcode.
const MAX_ZIPCODE_LENGTH: usize = 20;

/// Registration form.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RegisterInput {
    #[serde(rename = "firstName")]
    pub first_name: Option<String>,
    #[serde(rename = "lastName")]
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub password: Option<String>,
}

/// Profile form; absent fields are left unchanged.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProfileInput {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub address: Option<String>,
    pub city: Option<String>,
    pub zipcode: Option<String>,
}

/// Authentication service.
///
/// Handles user registration, login, token refresh and profile changes.
pub struct AuthService<'a> {
    users: UserRepository<'a>,
    jwt: &'a JwtKeys,
}

impl<'a> AuthService<'a> {
    /// Create a new authentication service.
    #[must_use]
    pub const fn new(pool: &'a PgPool, jwt: &'a JwtKeys) -> Self {
        Self {
            users: UserRepository::new(pool),
            jwt,
        }
    }

    /// Register a new customer account and sign them in.
    ///
    /// The email uniqueness check only runs once every other field is valid.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for missing or invalid fields, including
    /// an email that is already registered.
    pub async fn register(&self, input: &RegisterInput) -> Result<(User, IssuedToken), AuthError> {
        let (first_name, last_name, email, password) = validate_registration(input)?;

        if self.users.email_exists(&email).await? {
            return Err(email_taken().into());
        }

        let password_hash = hash_password(password)?;
        let user = self
            .users
            .create(&NewUser {
                first_name,
                last_name,
                email: &email,
                password_hash: &password_hash,
                role: UserRole::User,
            })
            .await
            .map_err(|e| match e {
                RepositoryError::Conflict(_) => AuthError::Validation(email_taken()),
                other => AuthError::Repository(other),
            })?;

        tracing::info!(user_id = %user.id, "User registered");
        let token = self.jwt.issue(&user)?;
        Ok((user, token))
    }

    /// Login with email and password.
    ///
    /// Missing or malformed fields are treated like wrong credentials.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidCredentials` if the email/password is wrong.
    pub async fn login(
        &self,
        email: Option<&str>,
        password: Option<&str>,
    ) -> Result<(User, IssuedToken), AuthError> {
        let (Some(email), Some(password)) = (email, password) else {
            return Err(AuthError::InvalidCredentials);
        };
        let email = Email::parse(email).map_err(|_| AuthError::InvalidCredentials)?;

        let (user, password_hash) = self
            .users
            .get_password_hash(&email)
            .await?
            .ok_or(AuthError::InvalidCredentials)?;

        verify_password(password, &password_hash)?;

        let token = self.jwt.issue(&user)?;
        Ok((user, token))
    }

    /// Issue a fresh token for the holder of a valid one.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the user no longer exists.
    pub async fn refresh(&self, user_id: UserId) -> Result<IssuedToken, AuthError> {
        let user = self.get_user(user_id).await?;
        self.jwt.issue(&user)
    }

    /// Get the user a token belongs to.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::InvalidToken` if the user doesn't exist.
    pub async fn get_user(&self, user_id: UserId) -> Result<User, AuthError> {
        self.users
            .get_by_id(user_id)
            .await?
            .ok_or(AuthError::InvalidToken)
    }

    /// Validate and apply a profile update.
    ///
    /// # Errors
    ///
    /// Returns `AuthError::Validation` for over-long or empty names.
    pub async fn update_profile(
        &self,
        user_id: UserId,
        input: &ProfileInput,
    ) -> Result<User, AuthError> {
        let update = validate_profile(input)?;
        self.users
            .update_profile(user_id, &update)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => AuthError::InvalidToken,
                other => AuthError::Repository(other),
            })
    }

}

/// Create an account with a given role, without signing a token.
///
/// Used by `loomi-cli user create`.
///
/// # Errors
///
/// Returns `AuthError::Validation` for invalid fields or a taken email.
pub async fn create_user(
    pool: &PgPool,
    input: &RegisterInput,
    role: UserRole,
) -> Result<User, AuthError> {
    let (first_name, last_name, email, password) = validate_registration(input)?;
    let password_hash = hash_password(password)?;
    UserRepository::new(pool)
        .create(&NewUser {
            first_name,
            last_name,
            email: &email,
            password_hash: &password_hash,
            role,
        })
        .await
        .map_err(|e| match e {
            RepositoryError::Conflict(_) => AuthError::Validation(email_taken()),
            other => AuthError::Repository(other),
        })
}

fn email_taken() -> ValidationErrors {
    ValidationErrors::single("email", "The email has already been taken.")
}

/// Validate a registration form, returning trimmed names, the parsed email
/// and the password.
fn validate_registration(
    input: &RegisterInput,
) -> Result<(&str, &str, Email, &str), ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let first_name = errors.required("firstName", input.first_name.as_deref(), MAX_FIELD_LENGTH);
    let last_name = errors.required("lastName", input.last_name.as_deref(), MAX_FIELD_LENGTH);

    let email = match errors.required("email", input.email.as_deref(), Email::MAX_LENGTH) {
        Some(raw) => match Email::parse(raw) {
            Ok(email) => Some(email),
            Err(_) => {
                errors.add("email", "The email field must be a valid email address.");
                None
            }
        },
        None => None,
    };

    let password = match input.password.as_deref() {
        None | Some("") => {
            errors.add("password", "The password field is required.");
            None
        }
        Some(p) => match validate_password(p) {
            Ok(()) => Some(p),
            Err(msg) => {
                errors.add("password", msg);
                None
            }
        },
    };

    match (first_name, last_name, email, password) {
        (Some(f), Some(l), Some(e), Some(p)) if errors.is_empty() => Ok((f, l, e, p)),
        _ => Err(errors),
    }
}

fn validate_profile(input: &ProfileInput) -> Result<ProfileUpdate, ValidationErrors> {
    let mut errors = ValidationErrors::new();

    let mut name = |field: &str, value: Option<&str>| -> Option<String> {
        let value = value?;
        if value.trim().is_empty() {
            errors.add(field, format!("The {} field must not be empty.", field.replace('_', " ")));
            return None;
        }
        errors
            .optional(field, Some(value.trim()), MAX_FIELD_LENGTH)
            .map(String::from)
    };
    let first_name = name("first_name", input.first_name.as_deref());
    let last_name = name("last_name", input.last_name.as_deref());

    let address = errors
        .optional("address", input.address.as_deref(), MAX_FIELD_LENGTH)
        .map(String::from);
    let city = errors
        .optional("city", input.city.as_deref(), MAX_FIELD_LENGTH)
        .map(String::from);
    let zipcode = errors
        .optional("zipcode", input.zipcode.as_deref(), MAX_ZIPCODE_LENGTH)
        .map(String::from);

    errors.into_result()?;
    Ok(ProfileUpdate {
        first_name,
        last_name,
        address,
        city,
        zipcode,
    })
}

/// Validate password meets requirements.
fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!(
            "The password field must be at least {MIN_PASSWORD_LENGTH} characters."
        ));
    }
    Ok(())
}

/// Hash a password using Argon2id.
fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();

    argon2
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|_| AuthError::PasswordHash)
}

/// Verify a password against a hash.
fn verify_password(password: &str, hash: &str) -> Result<(), AuthError> {
    let parsed_hash = PasswordHash::new(hash).map_err(|_| AuthError::InvalidCredentials)?;
    let argon2 = Argon2::default();

    argon2
        .verify_password(password.as_bytes(), &parsed_hash)
        .map_err(|_| AuthError::InvalidCredentials)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    fn form(first: &str, last: &str, email: &str, password: &str) -> RegisterInput {
        RegisterInput {
            first_name: Some(first.to_owned()),
            last_name: Some(last.to_owned()),
            email: Some(email.to_owned()),
            password: Some(password.to_owned()),
        }
    }

    #[test]
    fn test_validate_registration_ok() {
        let input = form(" Jane ", "Doe", "Jane@Loomi.fr", "hunter2hunter2");
        let (first, last, email, _) = validate_registration(&input).unwrap();
        assert_eq!(first, "Jane");
        assert_eq!(last, "Doe");
        assert_eq!(email.as_str(), "jane@loomi.fr");
    }

    #[test]
    fn test_validate_registration_reports_each_field() {
        let errors = validate_registration(&RegisterInput::default()).unwrap_err();
        for field in ["firstName", "lastName", "email", "password"] {
            assert!(errors.get(field).is_some(), "missing error for {field}");
        }

        let errors = validate_registration(&form("A", "B", "invalid-email", "short")).unwrap_err();
        assert_eq!(
            errors.get("email").unwrap(),
            ["The email field must be a valid email address."]
        );
        assert_eq!(
            errors.get("password").unwrap(),
            ["The password field must be at least 8 characters."]
        );
    }

    #[test]
    fn test_validate_profile() {
        let update = validate_profile(&ProfileInput {
            city: Some("Lyon".to_owned()),
            ..ProfileInput::default()
        })
        .unwrap();
        assert_eq!(update.city.as_deref(), Some("Lyon"));
        assert!(update.first_name.is_none());

        let errors = validate_profile(&ProfileInput {
            first_name: Some("  ".to_owned()),
            zipcode: Some("1".repeat(21)),
            ..ProfileInput::default()
        })
        .unwrap_err();
        assert!(errors.get("first_name").is_some());
        assert!(errors.get("zipcode").is_some());
    }

    #[test]
    fn test_password_hash_roundtrip() {
        let hash = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &hash).is_ok());
        assert!(matches!(
            verify_password("wrong", &hash),
            Err(AuthError::InvalidCredentials)
        ));
    }
}
