// SPDX-FileCopyrightText: 2026 Tiller Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Ordered keyword-signal task classification.
//!
//! Classifies turn text into a configured category using an ordered rule
//! table: the first rule with any case-insensitive substring match wins. No
//! LLM pre-call, no network, no latency. An optional semantic classifier is
//! consulted only when no rule matched and the text is long enough.

use std::sync::Arc;
use std::time::Duration;

use tiller_config::model::{RoutingConfig, SemanticConfig};
use tiller_core::{Category, SemanticClassifier};
use tracing::{debug, warn};

/// How a category was chosen.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClassificationSource {
    /// A keyword rule matched the given signal.
    Signal(String),
    /// The semantic classifier returned a valid category.
    Semantic,
    /// Nothing matched (or the slow path failed); the `simple` fallback applies.
    Default,
}

/// Result of classifying a turn's text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClassificationResult {
    /// The chosen category.
    pub category: Category,
    /// Why it was chosen.
    pub source: ClassificationSource,
}

impl ClassificationResult {
    fn simple() -> Self {
        Self {
            category: Category::simple(),
            source: ClassificationSource::Default,
        }
    }
}

struct Rule {
    category: Category,
    signals: Vec<String>,
}

/// Keyword classifier with an optional semantic slow path.
pub struct Classifier {
    rules: Vec<Rule>,
    categories: Vec<Category>,
    semantic: Option<Arc<dyn SemanticClassifier>>,
    min_chars: usize,
    timeout: Duration,
}

impl Classifier {
    /// Builds the rule table from the routing catalog, preserving its order.
    pub fn new(routing: &RoutingConfig) -> Self {
        let rules: Vec<Rule> = routing
            .categories
            .iter()
            .map(|rule| Rule {
                category: Category::new(rule.name.clone()),
                signals: rule
                    .signals
                    .iter()
                    .map(|s| s.to_lowercase())
                    .filter(|s| !s.is_empty())
                    .collect(),
            })
            .collect();

        let mut categories: Vec<Category> = rules.iter().map(|r| r.category.clone()).collect();
        categories.push(Category::simple());

        let defaults = SemanticConfig::default();
        Self {
            rules,
            categories,
            semantic: None,
            min_chars: defaults.min_chars,
            timeout: Duration::from_millis(defaults.timeout_ms),
        }
    }

    /// Enables the semantic slow path.
    pub fn with_semantic(
        mut self,
        semantic: Arc<dyn SemanticClassifier>,
        config: &SemanticConfig,
    ) -> Self {
        self.semantic = Some(semantic);
        self.min_chars = config.min_chars;
        self.timeout = Duration::from_millis(config.timeout_ms);
        self
    }

    /// The closed category set, `simple` last.
    pub fn categories(&self) -> &[Category] {
        &self.categories
    }

    /// Classifies `text` using keyword rules only.
    pub fn classify(&self, text: &str) -> ClassificationResult {
        let lower = text.to_lowercase();
        for rule in &self.rules {
            if let Some(signal) = rule.signals.iter().find(|s| lower.contains(s.as_str())) {
                return ClassificationResult {
                    category: rule.category.clone(),
                    source: ClassificationSource::Signal(signal.clone()),
                };
            }
        }
        ClassificationResult::simple()
    }

    /// Classifies `text`, consulting the semantic classifier when no rule matched.
    ///
    /// Never fails: an unavailable, slow, or nonsensical slow path yields `simple`.
    pub async fn classify_turn(&self, text: &str) -> ClassificationResult {
        let keyword = self.classify(text);
        if keyword.source != ClassificationSource::Default {
            return keyword;
        }

        let Some(semantic) = &self.semantic else {
            return keyword;
        };
        if text.trim().chars().count() < self.min_chars {
            return keyword;
        }

        let label = match tokio::time::timeout(
            self.timeout,
            semantic.classify(text, &self.categories),
        )
        .await
        {
            Ok(Ok(label)) => label,
            Ok(Err(e)) => {
                warn!(error = %e, "semantic classifier failed, treating turn as simple");
                return ClassificationResult::simple();
            }
            Err(_) => {
                warn!(
                    timeout_ms = self.timeout.as_millis() as u64,
                    "semantic classifier timed out, treating turn as simple"
                );
                return ClassificationResult::simple();
            }
        };

        match self.validate_label(&label) {
            Some(category) => {
                debug!(category = %category, "semantic classifier chose category");
                ClassificationResult {
                    category,
                    source: ClassificationSource::Semantic,
                }
            }
            None => {
                warn!(label = label.as_str(), "semantic classifier returned unknown category");
                ClassificationResult::simple()
            }
        }
    }

    /// Maps a raw label onto the closed category set.
    fn validate_label(&self, label: &str) -> Option<Category> {
        let cleaned = label
            .trim()
            .trim_matches(|c: char| c == '"' || c == '\'' || c == '`' || c == '.')
            .to_lowercase();
        self.categories
            .iter()
            .find(|c| c.as_str().eq_ignore_ascii_case(&cleaned))
            .cloned()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use proptest::prelude::*;
    use tiller_core::TillerError;

    fn classifier() -> Classifier {
        Classifier::new(&RoutingConfig::default())
    }

    struct FixedLabel(&'static str);

    #[async_trait]
    impl SemanticClassifier for FixedLabel {
        async fn classify(&self, _text: &str, _c: &[Category]) -> Result<String, TillerError> {
            Ok(self.0.to_string())
        }
    }

    struct Broken;

    #[async_trait]
    impl SemanticClassifier for Broken {
        async fn classify(&self, _text: &str, _c: &[Category]) -> Result<String, TillerError> {
            Err(TillerError::Classifier {
                message: "503".into(),
                source: None,
            })
        }
    }

    struct Stalled;

    #[async_trait]
    impl SemanticClassifier for Stalled {
        async fn classify(&self, _text: &str, _c: &[Category]) -> Result<String, TillerError> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok("coding".to_string())
        }
    }

    fn with_semantic(semantic: Arc<dyn SemanticClassifier>) -> Classifier {
        let config = SemanticConfig {
            enabled: true,
            min_chars: 10,
            timeout_ms: 50,
            ..SemanticConfig::default()
        };
        classifier().with_semantic(semantic, &config)
    }

    const UNMATCHED: &str = "please look into the weather station readings for me";

    #[test]
    fn code_fence_classifies_as_coding() {
        let result = classifier().classify("please refactor this function ```fn a() {}```");
        assert_eq!(result.category, Category::new("coding"));
    }

    #[test]
    fn security_outranks_coding() {
        let result = classifier().classify("refactor the login function to fix the sql injection");
        assert_eq!(result.category, Category::new("security-audit"));
    }

    #[test]
    fn coding_outranks_complex_and_moderate() {
        let result = classifier().classify("compare two architecture options and implement one");
        assert_eq!(result.category, Category::new("coding"));
    }

    #[test]
    fn matching_is_case_insensitive() {
        let result = classifier().classify("ARCHITECTURE review please");
        assert_eq!(result.category, Category::new("complex"));
        assert_eq!(
            result.source,
            ClassificationSource::Signal("architecture".to_string())
        );
    }

    #[test]
    fn no_signal_falls_back_to_simple() {
        let result = classifier().classify("hi there");
        assert!(result.category.is_simple());
        assert_eq!(result.source, ClassificationSource::Default);
    }

    #[test]
    fn categories_end_with_simple() {
        let c = classifier();
        assert_eq!(c.categories().last(), Some(&Category::simple()));
        assert_eq!(c.categories().len(), 5);
    }

    #[tokio::test]
    async fn semantic_path_used_only_without_keyword_match() {
        let c = with_semantic(Arc::new(FixedLabel("moderate")));
        assert_eq!(c.classify_turn(UNMATCHED).await.category, Category::new("moderate"));
        // A keyword match never reaches the slow path.
        let keyword = c.classify_turn("debug this for me please, it is long enough").await;
        assert_eq!(keyword.category, Category::new("coding"));
    }

    #[tokio::test]
    async fn short_text_skips_semantic_path() {
        let c = with_semantic(Arc::new(FixedLabel("complex")));
        assert!(c.classify_turn("hmm ok").await.category.is_simple());
    }

    #[tokio::test]
    async fn semantic_label_is_normalized() {
        let c = with_semantic(Arc::new(FixedLabel(" \"Security-Audit\". ")));
        let result = c.classify_turn(UNMATCHED).await;
        assert_eq!(result.category, Category::new("security-audit"));
        assert_eq!(result.source, ClassificationSource::Semantic);
    }

    #[tokio::test]
    async fn invalid_semantic_label_degrades_to_simple() {
        let c = with_semantic(Arc::new(FixedLabel("poetry")));
        assert!(c.classify_turn(UNMATCHED).await.category.is_simple());
    }

    #[tokio::test]
    async fn semantic_failure_degrades_to_simple() {
        let c = with_semantic(Arc::new(Broken));
        assert!(c.classify_turn(UNMATCHED).await.category.is_simple());
    }

    #[tokio::test(start_paused = true)]
    async fn semantic_timeout_degrades_to_simple() {
        let c = with_semantic(Arc::new(Stalled));
        assert!(c.classify_turn(UNMATCHED).await.category.is_simple());
    }

    proptest! {
        #[test]
        fn classify_is_idempotent(text in ".{0,200}") {
            let c = classifier();
            prop_assert_eq!(c.classify(&text), c.classify(&text));
        }

        #[test]
        fn coding_signal_without_security_signal_is_coding(
            prefix in "[a-z ]{0,30}",
            suffix in "[a-z ]{0,30}",
            idx in 0usize..12,
        ) {
            let routing = RoutingConfig::default();
            let coding = &routing.categories[1];
            let security = &routing.categories[0];
            let signal = &coding.signals[idx % coding.signals.len()];
            let text = format!("{prefix} {signal} {suffix}");
            let lower = text.to_lowercase();
            prop_assume!(!security.signals.iter().any(|s| lower.contains(s.as_str())));

            prop_assert_eq!(Classifier::new(&routing).classify(&text).category, Category::new("coding"));
        }
    }
}
