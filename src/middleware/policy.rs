use std::collections::HashMap;
use std::fmt;

use super::Caller;
use crate::error::ApiError;

pub const MANAGE_OPTIONS: &str = "manage_options";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Show,
    List,
    Create,
    Update,
    Delete,
}

impl Operation {
    pub const ALL: [Operation; 5] = [
        Operation::Show,
        Operation::List,
        Operation::Create,
        Operation::Update,
        Operation::Delete,
    ];
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Operation::Show => "show",
            Operation::List => "list",
            Operation::Create => "create",
            Operation::Update => "update",
            Operation::Delete => "delete",
        };
        f.write_str(name)
    }
}

/// Single permission gate for every Event operation.
///
/// Each operation is mapped to the capability it requires. Today all of them
/// require `manage_options`; [`AuthPolicy::require`] overrides one operation.
#[derive(Debug, Clone)]
pub struct AuthPolicy {
    required: HashMap<Operation, String>,
}

impl Default for AuthPolicy {
    fn default() -> Self {
        Self::uniform(MANAGE_OPTIONS)
    }
}

impl AuthPolicy {
    pub fn uniform(capability: &str) -> Self {
        Self {
            required: Operation::ALL
                .iter()
                .map(|op| (*op, capability.to_string()))
                .collect(),
        }
    }

    pub fn require(mut self, operation: Operation, capability: &str) -> Self {
        self.required.insert(operation, capability.to_string());
        self
    }

    pub fn capability_for(&self, operation: Operation) -> &str {
        self.required
            .get(&operation)
            .map(String::as_str)
            .unwrap_or(MANAGE_OPTIONS)
    }

    pub fn authorize(&self, caller: &Caller, operation: Operation) -> Result<(), ApiError> {
        match caller {
            Caller::Anonymous => Err(ApiError::NotLoggedIn),
            Caller::BadCredentials => Err(ApiError::InvalidCredentials),
            Caller::Authenticated(principal) => {
                let capability = self.capability_for(operation);
                if principal.can(capability) {
                    Ok(())
                } else {
                    tracing::info!(
                        username = %principal.username,
                        %operation,
                        capability,
                        "operation denied"
                    );
                    Err(ApiError::Forbidden)
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::middleware::Principal;

    fn caller(capabilities: &[&str]) -> Caller {
        Caller::Authenticated(Principal {
            username: "someone".into(),
            capabilities: capabilities.iter().map(|c| c.to_string()).collect(),
        })
    }

    #[test]
    fn default_policy_requires_manage_options_everywhere() {
        let policy = AuthPolicy::default();
        let admin = caller(&["manage_options"]);
        let editor = caller(&["edit_posts"]);

        for op in Operation::ALL {
            assert_eq!(policy.capability_for(op), "manage_options");
            assert!(policy.authorize(&admin, op).is_ok());
            assert!(matches!(policy.authorize(&editor, op), Err(ApiError::Forbidden)));
        }
    }

    #[test]
    fn anonymous_and_bad_credentials_are_unauthorized() {
        let policy = AuthPolicy::default();
        assert!(matches!(
            policy.authorize(&Caller::Anonymous, Operation::Show),
            Err(ApiError::NotLoggedIn)
        ));
        assert!(matches!(
            policy.authorize(&Caller::BadCredentials, Operation::Delete),
            Err(ApiError::InvalidCredentials)
        ));
    }

    #[test]
    fn single_operation_can_be_relaxed() {
        let policy = AuthPolicy::default().require(Operation::Show, "read");
        let reader = caller(&["read"]);

        assert!(policy.authorize(&reader, Operation::Show).is_ok());
        assert!(policy.authorize(&reader, Operation::List).is_err());
    }
}
