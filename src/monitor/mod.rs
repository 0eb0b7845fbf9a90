//! Turns balance rows into the shop-floor view of a phase.

pub mod grouping;
pub mod pipeline;
pub mod sequencing;
pub mod status;
pub mod window;

#[cfg(test)]
pub(crate) mod fixtures;
