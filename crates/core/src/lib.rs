//! `essentials-core` — domain foundation building blocks.
//!
//! This crate contains **pure domain** primitives (no infrastructure concerns).

pub mod entity;
pub mod error;
pub mod id;
pub mod money;
pub mod value_object;

pub use entity::{Entity, OrganizationScoped};
pub use error::{DomainError, DomainResult};
pub use id::{EntityId, OrganizationId, UserId};
pub use money::Cents;
pub use value_object::ValueObject;
