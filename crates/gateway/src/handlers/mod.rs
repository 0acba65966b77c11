//! API handlers module

pub mod footprint_categories;
pub mod footprints;
pub mod health;
