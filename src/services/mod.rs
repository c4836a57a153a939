//! Game services: the round engine, the per-channel registry, and the
//! announcement wording.

pub mod announce;
pub mod engine;
pub mod registry;

#[cfg(test)]
pub(crate) mod testkit;
