use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Caller identity as confirmed by the identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct AuthenticatedUser {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Subset of the provider's user object we rely on.
#[derive(Debug, Deserialize)]
pub(crate) struct ProviderUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

impl From<ProviderUser> for AuthenticatedUser {
    fn from(u: ProviderUser) -> Self {
        Self {
            user_id: u.id,
            email: u.email,
        }
    }
}
