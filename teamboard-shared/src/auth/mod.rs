/// Authentication primitives
///
/// This module provides secure authentication building blocks for Teamboard:
///
/// # Modules
///
/// - [`password`]: Argon2id password hashing and validation
/// - [`jwt`]: JWT token generation and validation
///
/// # Security Features
///
/// - **Password Hashing**: Argon2id with 64 MB memory, 3 iterations
/// - **JWT Tokens**: HS256 signing with access/refresh token split
/// - **Constant-time Comparison**: Verification uses constant-time operations
///
/// Authorization (who may do what) is NOT here; that lives in the
/// [`crate::policy`] module, which route handlers call with a freshly loaded
/// principal.
///
/// # Example
///
/// ```no_run
/// use teamboard_shared::auth::password::{hash_password, verify_password};
/// use teamboard_shared::auth::jwt::{create_token, Claims, TokenType};
/// use uuid::Uuid;
///
/// # fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let hash = hash_password("user_password")?;
/// assert!(verify_password("user_password", &hash)?);
///
/// let claims = Claims::new(Uuid::new_v4(), TokenType::Access);
/// let token = create_token(&claims, "secret-key-at-least-32-bytes-long!")?;
/// # Ok(())
/// # }
/// ```

pub mod jwt;
pub mod password;
