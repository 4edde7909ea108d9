#![forbid(unsafe_code)]

use crate::{ContractViolation, Validate};

/// Who is looking at the sheet. Only used for advisory permission checks.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct UserIdentity {
    pub login: String,
    pub is_settlement_admin: bool,
}

impl UserIdentity {
    pub fn v1(login: impl Into<String>, is_settlement_admin: bool) -> Self {
        Self {
            login: login.into(),
            is_settlement_admin,
        }
    }
}

impl Validate for UserIdentity {
    fn validate(&self) -> Result<(), ContractViolation> {
        if self.login.trim().is_empty() {
            return Err(ContractViolation::InvalidValue {
                field: "user_identity.login",
                reason: "must not be empty",
            });
        }
        if self.login.len() > 254 {
            return Err(ContractViolation::InvalidValue {
                field: "user_identity.login",
                reason: "must be <= 254 chars",
            });
        }
        Ok(())
    }
}
