//! robots.txt rule evaluation
//!
//! Permission checks are delegated to the `robotstxt` crate; only the
//! `Crawl-delay` extension is read by hand since the matcher ignores it.

use robotstxt::DefaultMatcher;

/// The robots.txt rules loaded for the crawl's start host
#[derive(Debug, Clone, Default)]
pub struct RobotsRules {
    /// Raw robots.txt body; empty means everything is allowed
    content: String,
}

impl RobotsRules {
    /// Wraps a robots.txt body for later permission checks
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
        }
    }

    /// Rules that allow everything (missing robots.txt)
    pub fn allow_all() -> Self {
        Self::default()
    }

    /// Checks if a URL may be fetched by the given user agent token
    ///
    /// `url` may be a full URL or just a path; the matcher only looks at
    /// the path, parameters and query.
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.content.trim().is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the `Crawl-delay` in seconds that applies to the user agent
    ///
    /// A group naming the agent wins over the `*` group. Agent names match
    /// case-insensitively as substrings of the given token, the way most
    /// crawlers treat them.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        let agent = user_agent.to_lowercase();
        let mut group: Vec<String> = Vec::new();
        let mut in_rules = false;
        let mut specific = None;
        let mut wildcard = None;

        for line in self.content.lines() {
            let line = line.split('#').next().unwrap_or("").trim();
            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let value = value.trim();

            match key.trim().to_lowercase().as_str() {
                "user-agent" => {
                    // A user-agent line after rules starts a new group
                    if in_rules {
                        group.clear();
                        in_rules = false;
                    }
                    group.push(value.to_lowercase());
                }
                "crawl-delay" => {
                    in_rules = true;
                    let Ok(delay) = value.parse::<f64>() else {
                        continue;
                    };
                    if group
                        .iter()
                        .any(|ua| ua != "*" && !ua.is_empty() && agent.contains(ua.as_str()))
                    {
                        specific = Some(delay);
                    } else if group.iter().any(|ua| ua == "*") {
                        wildcard = Some(delay);
                    }
                }
                _ => in_rules = true,
            }
        }

        specific.or(wildcard)
    }
}
