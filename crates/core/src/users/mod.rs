//! Users, principals and privileged user administration.
//!
//! Identity is verified upstream. The core only consumes the resulting
//! principal and re-checks its flags before every mutating operation.

mod directory;
mod service;
mod types;

pub use directory::UserDirectory;
pub use service::UserAdminService;
pub use types::{
    NewUser, Principal, User, UserFilter, UserFlagsUpdate, UserProfileUpdate, MAX_NAME_LEN,
    MAX_USERNAME_LEN,
};
