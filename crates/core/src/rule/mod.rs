//! Pluggable per-source extraction rules.
//!
//! A rule tells a performer how to talk to one source: how to build a
//! listing URL, which pattern pulls preliminary entries out of a listing
//! page, which pattern enriches a detail page, and the paging/crawl
//! limits. Rules are plain configuration; the compiled form validates
//! them once up front so a malformed rule fails fast instead of mid-run.

mod compiled;
mod types;

pub use compiled::{parse_size, CompiledRule, RuleError};
pub use types::SearchRule;
