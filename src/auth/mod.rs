pub mod jwt;
pub mod password;

pub use jwt::{Claims, TokenService, TokenType};
pub use password::{hash_password, verify_password};
