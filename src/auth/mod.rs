pub mod current_user;
pub mod jwt;

pub use current_user::{
    AuthDecision, AuthenticatedUser, Authenticator, ClearSession, CurrentUser,
};
pub use jwt::{generate_jwt, generate_jwt_with_ttl, verify_jwt, Claims, TOKEN_TTL_MINUTES};
