//! Infrastructure layer: configuration, stores, identity provider and the
//! application services built on top of them.

pub mod config;
pub mod identity;
pub mod services;
pub mod store;
