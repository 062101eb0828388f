/// Audience classification: decides whether a query is about software development.
///
/// Matching is a case-insensitive substring test, so a term also fires inside a longer
/// word ("app" in "happy"). Search results are only ever narrowed for positive matches,
/// which keeps the cost of a false positive low.

const DEV_TERMS: &[&str] = &[
    "code", "programming", "developer", "software", "app", "application", "framework",
    "library", "api", "server", "client", "database", "sql", "nosql", "frontend", "backend",
    "fullstack", "web", "mobile", "algorithm", "function", "class", "object", "variable",
    "python", "javascript", "java", "c++", "c#", "ruby", "php", "html", "css", "react",
    "angular", "vue", "node", "express", "django", "flask", "spring", "bootstrap", "jquery",
    "typescript", "git", "github", "gitlab", "aws", "azure", "cloud", "docker", "kubernetes",
    "devops", "selenium", "testing", "debug", "compile", "build", "deploy", "development",
    "programmer",
];

pub struct AudienceClassifier {
    terms: &'static [&'static str],
}

impl AudienceClassifier {
    pub fn new() -> Self {
        Self { terms: DEV_TERMS }
    }

    /// The first matching developer term, if any.
    pub fn matched_term(&self, query: &str) -> Option<&'static str> {
        let lowered = query.to_lowercase();
        self.terms
            .iter()
            .copied()
            .find(|term| lowered.contains(term))
    }

    pub fn is_dev_related(&self, query: &str) -> bool {
        self.matched_term(query).is_some()
    }
}

impl Default for AudienceClassifier {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_detects_dev_queries() {
        let classifier = AudienceClassifier::new();
        assert!(classifier.is_dev_related("how do I use docker with python"));
        assert!(classifier.is_dev_related("Explain KUBERNETES pods"));
        assert!(classifier.is_dev_related("best practices for C++ templates"));
        assert!(classifier.is_dev_related("c# async await"));
    }

    #[test]
    fn test_general_queries() {
        let classifier = AudienceClassifier::new();
        assert!(!classifier.is_dev_related("write me a poem about autumn"));
        assert!(!classifier.is_dev_related("plan a trip to Lisbon"));
        assert!(!classifier.is_dev_related(""));
    }

    #[test]
    fn test_substring_matches_inside_words() {
        let classifier = AudienceClassifier::new();
        assert_eq!(classifier.matched_term("a happy birthday song"), Some("app"));
        assert_eq!(classifier.matched_term("my JavaScript bundle"), Some("javascript"));
    }

    #[test]
    fn test_is_deterministic() {
        let classifier = AudienceClassifier::new();
        for query in ["deploy to aws", "bake bread", "debugging tips", "yoga"] {
            let first = classifier.is_dev_related(query);
            for _ in 0..5 {
                assert_eq!(classifier.is_dev_related(query), first);
            }
        }
    }

    #[test]
    fn test_term_list_size() {
        assert_eq!(DEV_TERMS.len(), 61);
    }
}
