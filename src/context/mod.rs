//! Active-window context: hashed identity and work-category classification.
//!
//! Raw window titles never leave this module. The tracker hashes each title
//! before storing anything and classifies it against a configuration-driven
//! ordered rule list, so the aggregator only ever sees `(hash, category)`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// Category assigned when no rule matches.
pub const FALLBACK_CATEGORY: &str = "other";

/// Hash reported when no window information is available.
pub const UNKNOWN_WINDOW: &str = "unknown";

/// One ordered classification rule: first matching keyword wins.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CategoryRule {
    pub category: String,
    pub keywords: Vec<String>,
}

impl CategoryRule {
    pub fn new(category: &str, keywords: &[&str]) -> Self {
        Self {
            category: category.to_string(),
            keywords: keywords.iter().map(|k| k.to_string()).collect(),
        }
    }
}

/// Built-in rule table, ordered by priority.
pub fn default_rules() -> Vec<CategoryRule> {
    vec![
        CategoryRule::new(
            "development",
            &[
                "visual studio code",
                "pycharm",
                "intellij",
                "xcode",
                "terminal",
                "iterm",
                "code",
                "sublime",
                "vim",
                "emacs",
                "eclipse",
            ],
        ),
        CategoryRule::new(
            "communication",
            &[
                "slack", "discord", "teams", "zoom", "mail", "messages", "skype", "line",
                "telegram", "whatsapp",
            ],
        ),
        CategoryRule::new(
            "browsing",
            &["chrome", "firefox", "safari", "edge", "brave", "opera"],
        ),
        CategoryRule::new(
            "document",
            &[
                "word", "excel", "powerpoint", "pages", "numbers", "keynote", "google docs",
                "google sheets",
            ],
        ),
    ]
}

/// Classify a window title. Pure function; first match wins.
pub fn classify<'a>(rules: &'a [CategoryRule], title: &str) -> &'a str {
    let lowered = title.to_lowercase();
    for rule in rules {
        if rule
            .keywords
            .iter()
            .any(|keyword| lowered.contains(&keyword.to_lowercase()))
        {
            return &rule.category;
        }
    }
    FALLBACK_CATEGORY
}

/// One-way hash of a window title (truncated SHA-256, 16 hex chars).
pub fn hash_title(title: &str) -> String {
    let digest = Sha256::digest(title.as_bytes());
    hex::encode(&digest[..8])
}

/// Provider of the active window title. The OS-specific query lives outside
/// the crate; the title it returns is consumed inside this module only.
pub trait ActiveWindowSource {
    fn active_window_title(&mut self) -> Option<String>;
}

/// Source for platforms or sessions without window access.
#[derive(Debug, Default)]
pub struct NoWindowSource;

impl ActiveWindowSource for NoWindowSource {
    fn active_window_title(&mut self) -> Option<String> {
        None
    }
}

/// Context stats for one aggregation cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WindowStats {
    pub window_hash: String,
    pub work_category: String,
    pub switch_count: u32,
    pub timestamp: DateTime<Utc>,
}

/// Tracks the active window over time, counting switches between reads.
pub struct WindowTracker<S> {
    source: S,
    rules: Vec<CategoryRule>,
    last_hash: Option<String>,
    last_category: Option<String>,
    switches: u32,
}

impl<S: ActiveWindowSource> WindowTracker<S> {
    pub fn new(source: S, rules: Vec<CategoryRule>) -> Self {
        Self {
            source,
            rules,
            last_hash: None,
            last_category: None,
            switches: 0,
        }
    }

    /// Poll the source once. Safe to call on any cadence; switch counting
    /// resolution equals the polling cadence.
    pub fn observe(&mut self) {
        let Some(title) = self.source.active_window_title() else {
            return;
        };
        let hash = hash_title(&title);
        let category = classify(&self.rules, &title).to_string();

        if self.last_hash.as_deref() != Some(hash.as_str()) {
            if self.last_hash.is_some() {
                self.switches += 1;
            }
            self.last_hash = Some(hash);
        }
        self.last_category = Some(category);
    }

    /// Current stats; resets the switch counter.
    pub fn drain_stats(&mut self, now: DateTime<Utc>) -> WindowStats {
        self.observe();
        let stats = WindowStats {
            window_hash: self
                .last_hash
                .clone()
                .unwrap_or_else(|| UNKNOWN_WINDOW.to_string()),
            work_category: self
                .last_category
                .clone()
                .unwrap_or_else(|| FALLBACK_CATEGORY.to_string()),
            switch_count: self.switches,
            timestamp: now,
        };
        self.switches = 0;
        stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedSource(Vec<Option<String>>);

    impl ActiveWindowSource for FixedSource {
        fn active_window_title(&mut self) -> Option<String> {
            if self.0.is_empty() {
                None
            } else {
                self.0.remove(0)
            }
        }
    }

    #[test]
    fn test_classify_first_match_wins() {
        let rules = default_rules();
        assert_eq!(classify(&rules, "main.rs - Visual Studio Code"), "development");
        assert_eq!(classify(&rules, "#general - Slack"), "communication");
        assert_eq!(classify(&rules, "Some Random App"), FALLBACK_CATEGORY);
    }

    #[test]
    fn test_classify_is_case_insensitive() {
        let rules = default_rules();
        assert_eq!(classify(&rules, "FIREFOX - Mozilla"), "browsing");
    }

    #[test]
    fn test_hash_is_stable_and_short() {
        let a = hash_title("Inbox - Mail");
        let b = hash_title("Inbox - Mail");
        assert_eq!(a, b);
        assert_eq!(a.len(), 16);
        assert_ne!(a, hash_title("Inbox - Mail "));
    }

    #[test]
    fn test_tracker_counts_switches_and_drains() {
        let source = FixedSource(vec![
            Some("Editor - Code".to_string()),
            Some("#random - Slack".to_string()),
            Some("#random - Slack".to_string()),
        ]);
        let mut tracker = WindowTracker::new(source, default_rules());
        tracker.observe();
        tracker.observe();

        let stats = tracker.drain_stats(Utc::now());
        assert_eq!(stats.switch_count, 1);
        assert_eq!(stats.work_category, "communication");

        // Counter was reset by the drain.
        let source = &mut tracker;
        let stats = source.drain_stats(Utc::now());
        assert_eq!(stats.switch_count, 0);
    }

    #[test]
    fn test_tracker_without_source_reports_unknown() {
        let mut tracker = WindowTracker::new(NoWindowSource, default_rules());
        let stats = tracker.drain_stats(Utc::now());
        assert_eq!(stats.window_hash, UNKNOWN_WINDOW);
        assert_eq!(stats.work_category, FALLBACK_CATEGORY);
    }
}
