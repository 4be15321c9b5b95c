//! Value types shared by every Loomi crate: row IDs, emails and the
//! enumerations stored as `PostgreSQL` enum types.

pub mod email;
pub mod id;
pub mod status;

pub use email::{Email, EmailError};
pub use id::*;
pub use status::*;
