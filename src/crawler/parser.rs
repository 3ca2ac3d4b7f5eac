//! Page analysis: searching a fetched page and extracting links to follow
//!
//! `scraper::Html` is not `Send`, so everything that touches the parsed
//! document happens inside [`analyze_page`], which hands back owned data
//! only. Workers call it between awaits and never hold a document across one.

use crate::crawler::fetcher::Page;
use crate::crawler::filter::PolitenessFilter;
use crate::crawler::frontier::FrontierEntry;
use crate::search::{search_page, MatchedNode, SearchCriterion};
use crate::url::resolve_link;
use crate::ParseError;
use scraper::{Html, Selector};
use std::collections::{HashMap, HashSet};
use url::Url;

/// Maximum number of links taken from a single page
pub const MAX_LINKS_PER_PAGE: usize = 50;

/// Everything a worker needs from one page
#[derive(Debug, Default)]
pub struct PageAnalysis {
    /// Matches per criterion key; every key is present
    pub matches: HashMap<String, Vec<MatchedNode>>,
    /// Links to enqueue, already filtered and depth-tagged
    pub links: Vec<FrontierEntry>,
}

/// Link extraction limits for one page
#[derive(Debug, Clone, Copy)]
pub struct LinkScope {
    pub depth: u32,
    pub max_depth: u32,
}

/// Parses the page, runs the search criteria and, when `links` is given,
/// extracts the links to follow
///
/// # Errors
///
/// Returns [`ParseError::NotHtml`] when the server declared a content type
/// that is not markup. Such a page contributes no matches and no links.
pub fn analyze_page(
    page: &Page,
    criteria: &[SearchCriterion],
    filter: &PolitenessFilter,
    links: Option<LinkScope>,
) -> Result<PageAnalysis, ParseError> {
    if !page.is_html() {
        return Err(ParseError::NotHtml {
            url: page.url.to_string(),
            content_type: page.content_type.clone().unwrap_or_default(),
        });
    }

    let document = Html::parse_document(&page.body);
    let matches = search_page(&document, criteria);
    let links = links
        .map(|scope| extract_links(&document, &page.final_url, scope, filter))
        .unwrap_or_default();

    Ok(PageAnalysis { matches, links })
}

/// Extracts the links worth following from a document
///
/// # Link Extraction Rules
///
/// **Include:**
/// - `<a href="...">` tags that resolve to an http(s) URL passing the
///   politeness filter
///
/// **Exclude:**
/// - `<a href="..." download>`
/// - `javascript:`, `mailto:`, `tel:` links and data URIs
/// - Fragment-only links; fragments are stripped from the rest
///
/// Nothing is returned once `depth` has reached `max_depth`. Links are
/// tagged with `depth + 1` and capped at [`MAX_LINKS_PER_PAGE`] distinct URLs.
///
/// # Example
///
/// ```
/// use scraper::Html;
/// use url::Url;
/// use wheres_my_value::crawler::{extract_links, LinkScope, PolitenessFilter};
///
/// let base = Url::parse("https://example.com/").unwrap();
/// let filter = PolitenessFilter::new(&base, "TestBot", false).unwrap();
/// let doc = Html::parse_document(r#"<a href="/page1">one</a><a href="https://other.com/">x</a>"#);
///
/// let links = extract_links(&doc, &base, LinkScope { depth: 0, max_depth: 5 }, &filter);
/// assert_eq!(links.len(), 1);
/// assert_eq!(links[0].url.as_str(), "https://example.com/page1");
/// assert_eq!(links[0].depth, 1);
/// ```
pub fn extract_links(
    document: &Html,
    page_url: &Url,
    scope: LinkScope,
    filter: &PolitenessFilter,
) -> Vec<FrontierEntry> {
    if scope.depth >= scope.max_depth {
        return Vec::new();
    }

    let Ok(a_selector) = Selector::parse("a[href]") else {
        return Vec::new();
    };

    let mut seen = HashSet::new();
    let mut links = Vec::new();

    for element in document.select(&a_selector) {
        if links.len() >= MAX_LINKS_PER_PAGE {
            break;
        }

        if element.value().attr("download").is_some() {
            continue;
        }

        let Some(url) = element
            .value()
            .attr("href")
            .and_then(|href| resolve_link(href, page_url))
        else {
            continue;
        };

        if seen.contains(url.as_str()) || !filter.is_fetchable(&url) {
            continue;
        }

        seen.insert(url.as_str().to_string());
        links.push(FrontierEntry {
            url,
            depth: scope.depth + 1,
        });
    }

    links
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::search::expand_criteria;

    fn base_url() -> Url {
        Url::parse("https://example.com/").unwrap()
    }

    fn filter() -> PolitenessFilter {
        PolitenessFilter::new(&base_url(), "TestBot", false).unwrap()
    }

    fn links_of(html: &str, depth: u32, max_depth: u32) -> Vec<FrontierEntry> {
        let document = Html::parse_document(html);
        extract_links(&document, &base_url(), LinkScope { depth, max_depth }, &filter())
    }

    fn page(body: &str, content_type: Option<&str>) -> Page {
        Page {
            url: base_url(),
            final_url: base_url(),
            status: 200,
            content_type: content_type.map(str::to_string),
            body: body.to_string(),
        }
    }

    #[test]
    fn test_links_scenario() {
        let html = r#"
            <html>
            <body>
                <a href="/page1">Link 1</a>
                <a href="https://example.com/page2">Link 2</a>
                <a href="https://other.com/page3">Link 3</a>
                <a href="/file.pdf">PDF</a>
            </body>
            </html>
        "#;
        let links: HashMap<String, u32> = links_of(html, 0, 5)
            .into_iter()
            .map(|e| (e.url.to_string(), e.depth))
            .collect();

        assert_eq!(
            links,
            HashMap::from([
                ("https://example.com/page1".to_string(), 1),
                ("https://example.com/page2".to_string(), 1),
            ])
        );
    }

    #[test]
    fn test_depth_cutoff() {
        let html = r#"<a href="/deeper">Deeper</a>"#;
        assert!(links_of(html, 2, 2).is_empty());
        assert_eq!(links_of(html, 1, 2)[0].depth, 2);
    }

    #[test]
    fn test_skip_special_links() {
        let html = r##"
            <a href="javascript:void(0)">js</a>
            <a href="mailto:test@example.com">mail</a>
            <a href="tel:+1234567890">call</a>
            <a href="data:text/html,<h1>x</h1>">data</a>
            <a href="#section">jump</a>
            <a href="/report" download>download</a>
        "##;
        assert!(links_of(html, 0, 5).is_empty());
    }

    #[test]
    fn test_fragments_collapse_to_one_link() {
        let html = r#"<a href="/doc#a">A</a><a href="/doc#b">B</a><a href="/doc">C</a>"#;
        let links = links_of(html, 0, 5);
        assert_eq!(links.len(), 1);
        assert_eq!(links[0].url.as_str(), "https://example.com/doc");
    }

    #[test]
    fn test_link_cap() {
        let html: String = (0..120)
            .map(|i| format!(r#"<a href="/p{}">p</a>"#, i))
            .collect();
        let links = links_of(&html, 0, 5);
        assert_eq!(links.len(), MAX_LINKS_PER_PAGE);
        assert_eq!(links[0].url.path(), "/p0");
    }

    #[test]
    fn test_analyze_page_collects_matches_and_links() {
        let criteria = expand_criteria(&["match".to_string()]);
        let analysis = analyze_page(
            &page(r#"<p>a match</p><a href="/next">next</a>"#, Some("text/html")),
            &criteria,
            &filter(),
            Some(LinkScope {
                depth: 0,
                max_depth: 5,
            }),
        )
        .unwrap();

        assert_eq!(analysis.matches["text:match"].len(), 1);
        assert_eq!(analysis.links.len(), 1);
    }

    #[test]
    fn test_analyze_page_without_links() {
        let criteria = expand_criteria(&["x".to_string()]);
        let analysis = analyze_page(
            &page(r#"<a href="/next">next</a>"#, None),
            &criteria,
            &filter(),
            None,
        )
        .unwrap();
        assert!(analysis.links.is_empty());
    }

    #[test]
    fn test_non_html_is_parse_error() {
        let criteria = expand_criteria(&["x".to_string()]);
        let err = analyze_page(
            &page("%PDF-1.4", Some("application/pdf")),
            &criteria,
            &filter(),
            None,
        )
        .unwrap_err();
        assert!(matches!(err, ParseError::NotHtml { .. }));
    }
}
