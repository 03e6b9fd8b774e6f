//! Inventory domain module.
//!
//! This crate contains business rules for items, kits and item categories,
//! implemented purely as deterministic domain logic (no IO, no HTTP, no storage).

pub mod base_item;
pub mod category;
pub mod item;
pub mod kit;

pub use base_item::BaseItem;
pub use category::{ItemCategory, ItemCategoryId};
pub use item::{CentsInput, Item, ItemAttributes, ItemId, ItemStatus, ItemUpdate};
pub use kit::{Kit, KitId};
