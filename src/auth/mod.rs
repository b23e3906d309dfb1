pub mod jwt;
pub mod middleware;

pub use jwt::{Claims, JwtAuth};
pub use middleware::{jwt_auth_middleware, AuthContext};

/// Workspace role required to pay bounties from the budget.
pub const ROLE_PAY_BOUNTY: &str = "PAY BOUNTY";

/// Workspace role required to withdraw from the budget.
pub const ROLE_WITHDRAW_BUDGET: &str = "WITHDRAW BUDGET";
