//! Domain failover state machine.
//!
//! A search source has one canonical (default) domain plus a set of mirror
//! aliases believed to serve the same content. This module keeps a live
//! health model of those aliases and decides which hostname the source
//! should address next, without any external coordinator.

mod alias;
mod manager;
mod probe;

pub use alias::{DomainAlias, DomainAliasState};
pub use manager::DomainAliasManager;
pub use probe::{DomainProbe, HttpProbe};
