//! Card sorting challenge: arrange abacus cards in ascending order.

pub mod generator;
pub mod plugin;
pub mod scoring;
pub mod slots;
pub mod types;
