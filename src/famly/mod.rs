// Famly API access
//
// Login is a GraphQL mutation returning an access token; everything else is
// REST with the token in the `x-famly-accesstoken` header. The API is
// undocumented, so response shapes are read leniently.

mod client;
mod error;
mod session;
mod sidebar;

pub use client::{DEFAULT_BASE_URL, DEFAULT_DEVICE_ID, FamlyClient, validate_base_url};
pub use error::FamlyError;
pub use session::{Credentials, Session};
pub use sidebar::Child;
