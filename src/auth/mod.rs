/// Authentication module
///
/// Password hashing, JWT issuance/verification, refresh-token sessions and
/// the flow controller tying them together.

mod claims;
mod jwt;
mod password;
mod refresh_token;
mod service;

pub use claims::Claims;
pub use jwt::JwtMaker;
pub use password::{hash_password, validate_password_strength, verify_password, HASH_COST};
pub use refresh_token::hash_token;
pub use service::{AuthService, LoginOutcome, Registration};
