//! Robots.txt parser implementation
//!
//! Allow/disallow matching is delegated to the robotstxt crate (a port of
//! Google's matcher). The crate ignores `Crawl-delay`, so that directive is
//! parsed here.

use crate::robots::RobotsDecision;
use robotstxt::DefaultMatcher;

/// Parsed robots.txt data
#[derive(Debug, Clone)]
pub struct ParsedRobots {
    /// Raw robots.txt content (empty string means allow all)
    content: String,
    /// Whether to allow all (true = allow all, false = parse content)
    allow_all: bool,
}

impl ParsedRobots {
    /// Creates a new ParsedRobots from raw robots.txt content
    pub fn from_content(content: &str) -> Self {
        Self {
            content: content.to_string(),
            allow_all: false,
        }
    }

    /// Creates a permissive ParsedRobots that allows everything
    ///
    /// Used when a site publishes no robots.txt (HTTP 4xx).
    pub fn allow_all() -> Self {
        Self {
            content: String::new(),
            allow_all: true,
        }
    }

    /// Returns the raw robots.txt content
    pub fn content(&self) -> &str {
        &self.content
    }

    /// Checks if a URL is allowed for the given user agent product token
    ///
    /// # Arguments
    ///
    /// * `url` - The full URL or path to check
    /// * `user_agent` - The product token (e.g. `LightCrawl`)
    pub fn is_allowed(&self, url: &str, user_agent: &str) -> bool {
        if self.allow_all || self.content.is_empty() {
            return true;
        }

        let mut matcher = DefaultMatcher::default();
        matcher.one_agent_allowed_by_robots(&self.content, user_agent, url)
    }

    /// Gets the crawl delay in seconds for a specific user agent
    ///
    /// A delay declared in a group naming the agent wins over one declared
    /// for `*`. Consecutive `User-agent` lines share one group.
    pub fn crawl_delay(&self, user_agent: &str) -> Option<f64> {
        if self.allow_all || self.content.is_empty() {
            return None;
        }

        let normalized_agent = user_agent.to_lowercase();
        let mut group_agents: Vec<String> = Vec::new();
        let mut in_agent_lines = false;
        let mut wildcard_delay: Option<f64> = None;
        let mut agent_delay: Option<f64> = None;

        for line in self.content.lines() {
            // Strip trailing comments
            let line = line.split('#').next().unwrap_or("").trim();
            if line.is_empty() {
                continue;
            }

            let Some((key, value)) = line.split_once(':') else {
                continue;
            };
            let key = key.trim().to_lowercase();
            let value = value.trim();

            if key == "user-agent" {
                if !in_agent_lines {
                    group_agents.clear();
                }
                group_agents.push(value.to_lowercase());
                in_agent_lines = true;
                continue;
            }

            in_agent_lines = false;

            if key != "crawl-delay" {
                continue;
            }

            let Ok(delay) = value.parse::<f64>() else {
                continue;
            };
            if !delay.is_finite() || delay < 0.0 {
                continue;
            }

            let names_agent = group_agents
                .iter()
                .any(|ua| !ua.is_empty() && ua != "*" && normalized_agent.contains(ua.as_str()));

            if names_agent {
                agent_delay.get_or_insert(delay);
            } else if group_agents.iter().any(|ua| ua == "*") {
                wildcard_delay.get_or_insert(delay);
            }
        }

        agent_delay.or(wildcard_delay)
    }

    /// Evaluates the full access decision for a URL
    pub fn decision(&self, url: &str, user_agent: &str) -> RobotsDecision {
        let crawl_delay_ms = self
            .crawl_delay(user_agent)
            .map(|secs| (secs * 1000.0).round() as u64)
            .unwrap_or(0);

        RobotsDecision {
            allowed: self.is_allowed(url, user_agent),
            crawl_delay_ms,
        }
    }
}
