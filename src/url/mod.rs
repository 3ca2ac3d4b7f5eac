//! URL handling module
//!
//! This module provides the URL pieces of the politeness rules: host
//! extraction for same-domain checks, link resolution and normalization,
//! and the extension skip-list.

mod domain;
mod extension;
mod normalize;

// Re-export main functions
pub use domain::{extract_domain, same_domain};
pub use extension::{has_skipped_extension, SKIP_EXTENSIONS};
pub use normalize::{normalize_url, resolve_link};
