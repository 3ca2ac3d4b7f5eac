//! Multi-criteria page search
//!
//! Every caller-supplied value is checked four ways on each page: as text,
//! as an element id, as a CSS class and as an attribute. Only text matches
//! mark a value as found.

mod criteria;
mod matcher;

pub use criteria::{expand_criteria, result_key, AttrQuery, SearchCriterion, SearchKind};
pub use matcher::{hidden_reason, search_html, search_page, MatchedNode};
