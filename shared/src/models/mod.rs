//! Domain models for the inventory stock ledger

mod item;
mod lot;
mod movement;
mod request;
mod stats;
mod warehouse;

pub use item::*;
pub use lot::*;
pub use movement::*;
pub use request::*;
pub use stats::*;
pub use warehouse::*;
