use serde::{Deserialize, Serialize};

// ============================================================================
// Domain Models
// ============================================================================

/// A customer as accepted by `POST /customers` and carried on the log.
///
/// The pipeline treats it as an opaque payload: no uniqueness or format
/// rules are enforced here.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct Customer {
    pub id: String,
    pub email: String,
}

impl Customer {
    pub fn new(id: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: email.into(),
        }
    }
}
