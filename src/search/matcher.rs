//! Page searcher
//!
//! Runs search criteria against one parsed document. Matches are reported as
//! owned [`MatchedNode`] descriptors so they can leave the (non-`Send`)
//! document and be merged into shared crawl results.

use crate::search::criteria::{AttrQuery, SearchCriterion, SearchKind};
use ego_tree::{NodeId, NodeRef};
use scraper::{ElementRef, Html, Node};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};

/// A node that satisfied a search criterion
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "node", rename_all = "snake_case")]
pub enum MatchedNode {
    /// A text node whose content contains the value
    Text {
        content: String,
        parent: Option<String>,
        hidden: Option<String>,
    },
    /// An element matched by tag, id, class, attribute or form value
    Element {
        tag: String,
        attributes: Vec<(String, String)>,
        text: String,
        hidden: Option<String>,
    },
}

impl MatchedNode {
    /// Text used to describe and de-duplicate a match in listings
    pub fn display_text(&self) -> &str {
        match self {
            Self::Text { content, .. } => content,
            Self::Element { text, .. } => text,
        }
    }

    /// Why the node is hidden from visitors, if it is
    pub fn hidden_reason(&self) -> Option<&str> {
        match self {
            Self::Text { hidden, .. } | Self::Element { hidden, .. } => hidden.as_deref(),
        }
    }
}

/// Runs every criterion against the document
///
/// The returned map has an entry for every criterion key, empty when the
/// criterion found nothing.
pub fn search_page(document: &Html, criteria: &[SearchCriterion]) -> HashMap<String, Vec<MatchedNode>> {
    criteria
        .iter()
        .map(|criterion| {
            (
                criterion.key(),
                search_html(document, criterion.kind, &criterion.value),
            )
        })
        .collect()
}

/// Finds the nodes matching one (kind, value) probe
///
/// Each node is reported at most once, in the order it was first matched.
pub fn search_html(document: &Html, kind: SearchKind, value: &str) -> Vec<MatchedNode> {
    let needle = value.to_lowercase();
    let mut found = Collector::default();

    match kind {
        SearchKind::Text => {
            for node in document.tree.nodes() {
                if let Node::Text(text) = node.value() {
                    if text.to_lowercase().contains(&needle) {
                        found.push_text(node, text);
                    }
                }
            }

            // Form values are invisible to text nodes, hidden fields included
            for element in elements(document) {
                match element.value().name() {
                    "input" => {
                        if contains_ci(element.value().attr("value"), &needle) {
                            found.push_element(element);
                        }
                    }
                    "textarea" => {
                        if element.text().collect::<String>().to_lowercase().contains(&needle) {
                            found.push_element(element);
                        }
                    }
                    _ => {}
                }
            }
        }

        SearchKind::Id => {
            for element in elements(document) {
                if contains_ci(element.value().id(), &needle) {
                    found.push_element(element);
                }
            }
        }

        SearchKind::Class => {
            for element in elements(document) {
                if element.value().classes().any(|class| class == value) {
                    found.push_element(element);
                }
            }
        }

        SearchKind::Attr => {
            let query = AttrQuery::parse(value);
            for element in elements(document) {
                let el = element.value();
                let matched = match &query {
                    AttrQuery::Tag(tag) => el.name() == tag.as_str(),
                    AttrQuery::Pair { name, value } => el.attr(name) == Some(value.as_str()),
                    AttrQuery::Name(name) => el.attr(name).is_some(),
                };
                if matched {
                    found.push_element(element);
                }
            }

            // Fallback: any attribute value containing the raw search string
            for element in elements(document) {
                if element.value().attrs().any(|(_, v)| v.to_lowercase().contains(&needle)) {
                    found.push_element(element);
                }
            }
        }
    }

    found.into_matches()
}

fn elements(document: &Html) -> impl Iterator<Item = ElementRef<'_>> {
    document.tree.nodes().filter_map(ElementRef::wrap)
}

fn contains_ci(haystack: Option<&str>, needle: &str) -> bool {
    haystack.map_or(false, |h| h.to_lowercase().contains(needle))
}

/// Order-preserving, node-identity de-duplicating match list
#[derive(Default)]
struct Collector {
    seen: HashSet<NodeId>,
    matches: Vec<MatchedNode>,
}

impl Collector {
    fn push_text(&mut self, node: NodeRef<'_, Node>, content: &str) {
        if !self.seen.insert(node.id()) {
            return;
        }
        let parent = node.parent().and_then(ElementRef::wrap);
        self.matches.push(MatchedNode::Text {
            content: content.trim().to_string(),
            parent: parent.map(|p| p.value().name().to_string()),
            hidden: parent.and_then(hidden_reason),
        });
    }

    fn push_element(&mut self, element: ElementRef<'_>) {
        if !self.seen.insert(element.id()) {
            return;
        }
        let el = element.value();
        self.matches.push(MatchedNode::Element {
            tag: el.name().to_string(),
            attributes: el
                .attrs()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            text: collapse_whitespace(&element.text().collect::<String>()),
            hidden: hidden_reason(element),
        });
    }

    fn into_matches(self) -> Vec<MatchedNode> {
        self.matches
    }
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Describes why an element is hidden, joining every applicable reason
pub fn hidden_reason(element: ElementRef<'_>) -> Option<String> {
    let el = element.value();
    let style: String = el
        .attr("style")
        .unwrap_or("")
        .to_lowercase()
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect();

    let mut reasons = Vec::new();
    if el.attr("type").map_or(false, |t| t.eq_ignore_ascii_case("hidden")) {
        reasons.push("Hidden input field");
    }
    if style.contains("display:none") {
        reasons.push("CSS display:none");
    }
    if style.contains("visibility:hidden") {
        reasons.push("CSS visibility:hidden");
    }
    if el.classes().any(|c| c == "hidden") {
        reasons.push("Hidden class");
    }
    if el.attr("aria-hidden") == Some("true") {
        reasons.push("ARIA hidden");
    }

    (!reasons.is_empty()).then(|| reasons.join(" and "))
}
