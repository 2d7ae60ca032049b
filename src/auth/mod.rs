pub mod middleware;
pub mod password;
pub mod principal;
pub mod resolver;

pub use principal::{Principal, Role};
pub use resolver::{AuthError, IdentityResolver};
