//! Sessions
//!
//! The identity an operation acts for is always passed in explicitly.

use std::fmt;

/// What a session may do
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    /// Owner of one pool address
    User,
    /// Operator acting for the treasury
    Admin,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::User => write!(f, "user"),
            Self::Admin => write!(f, "admin"),
        }
    }
}

/// An authenticated identity
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    address: String,
    role: Role,
}

impl Session {
    /// Session for the owner of `address`
    pub fn user(address: &str) -> Self {
        Self {
            address: address.to_lowercase(),
            role: Role::User,
        }
    }

    /// Operator session bound to the treasury address
    pub fn admin(treasury_address: &str) -> Self {
        Self {
            address: treasury_address.to_lowercase(),
            role: Role::Admin,
        }
    }

    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn role(&self) -> Role {
        self.role
    }

    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}
