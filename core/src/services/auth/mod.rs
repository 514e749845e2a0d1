//! Authentication guards for the login path.

pub mod lockout;

#[cfg(test)]
mod tests;

pub use lockout::{AccountLockoutConfig, AccountLockoutGuard};
