mod dto;
pub(crate) mod extractors;
pub mod services;

pub use extractors::{CurrentUser, MaybeUser};
pub use services::{IdentityProvider, SupabaseAuth};
