use serde::{Deserialize, Serialize};
use std::fmt;

/// How a search value is probed on a page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SearchKind {
    /// Text content, form input values and hidden-field values
    Text,
    /// Element id attribute (case-insensitive substring)
    Id,
    /// Element class list (exact token)
    Class,
    /// Tag selector, attribute pair, attribute name, or any attribute value
    Attr,
}

impl SearchKind {
    /// Every kind, in the order results are reported
    pub const ALL: [SearchKind; 4] = [Self::Text, Self::Id, Self::Class, Self::Attr];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Text => "text",
            Self::Id => "id",
            Self::Class => "class",
            Self::Attr => "attr",
        }
    }
}

impl fmt::Display for SearchKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One (kind, value) probe applied to every page
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SearchCriterion {
    pub kind: SearchKind,
    pub value: String,
}

impl SearchCriterion {
    pub fn new(kind: SearchKind, value: impl Into<String>) -> Self {
        Self {
            kind,
            value: value.into(),
        }
    }

    /// The `"<kind>:<value>"` key results are stored under
    pub fn key(&self) -> String {
        result_key(self.kind, &self.value)
    }
}

impl fmt::Display for SearchCriterion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.value)
    }
}

/// Builds a result key without allocating a criterion
pub fn result_key(kind: SearchKind, value: &str) -> String {
    format!("{}:{}", kind, value)
}

/// Expands every search value into one criterion per kind
///
/// Criteria are grouped by value in caller order, then by kind in
/// [`SearchKind::ALL`] order.
///
/// # Example
///
/// ```
/// use wheres_my_value::search::{expand_criteria, SearchKind};
///
/// let criteria = expand_criteria(&["form".to_string()]);
/// assert_eq!(criteria.len(), 4);
/// assert_eq!(criteria[0].kind, SearchKind::Text);
/// assert_eq!(criteria[3].key(), "attr:form");
/// ```
pub fn expand_criteria(values: &[String]) -> Vec<SearchCriterion> {
    values
        .iter()
        .flat_map(|value| {
            SearchKind::ALL
                .iter()
                .map(move |kind| SearchCriterion::new(*kind, value.clone()))
        })
        .collect()
}

/// The three shapes an `attr` search value can take
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AttrQuery {
    /// `<tag-name>`: every element with that tag
    Tag(String),
    /// `name=value`: elements whose attribute equals the value exactly
    Pair { name: String, value: String },
    /// `name`: elements that carry the attribute at all
    Name(String),
}

impl AttrQuery {
    pub fn parse(raw: &str) -> Self {
        let raw = raw.trim();

        if raw.len() > 2 && raw.starts_with('<') && raw.ends_with('>') {
            return Self::Tag(raw[1..raw.len() - 1].trim().to_lowercase());
        }

        if let Some((name, value)) = raw.split_once('=') {
            return Self::Pair {
                name: name.trim().to_lowercase(),
                value: value.trim().trim_matches(|c| c == '"' || c == '\'').to_string(),
            };
        }

        Self::Name(raw.to_lowercase())
    }
}
