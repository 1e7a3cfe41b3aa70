//! End-to-end tests across the scout crates.

#[cfg(test)]
mod discovery;
