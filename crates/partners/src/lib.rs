//! Partner domain module: partner agencies, their profiles and portal users.
//!
//! Pure domain logic; the invitation workflow that talks to an identity
//! provider lives in `essentials-infra`.

pub mod partner;
pub mod user;

pub use partner::{Partner, PartnerId, PartnerStatus, Profile, ProfileId};
pub use user::PartnerUser;
