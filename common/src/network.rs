//! Address-space types shared by the discovery crates.

pub mod range;
