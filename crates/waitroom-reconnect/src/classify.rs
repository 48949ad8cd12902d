//! Policy classification of connect failures.

use waitroom_queue::IssueKind;

/// Vocabulary that marks a connect failure as a policy issue.
///
/// Matching is a case-insensitive substring search. Ban terms are checked
/// before whitelist terms.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct ClassifierTerms {
    /// Terms that indicate a ban.
    pub ban: Vec<String>,
    /// Terms that indicate a missing whitelist entry.
    pub whitelist: Vec<String>,
}

impl Default for ClassifierTerms {
    fn default() -> Self {
        Self {
            ban: vec!["ban".to_string(), "banned".to_string()],
            whitelist: vec!["whitelist".to_string(), "not whitelisted".to_string()],
        }
    }
}

impl ClassifierTerms {
    /// Returns the first empty term, if any. An empty term would match every
    /// failure.
    pub(crate) fn find_empty(&self) -> Option<&'static str> {
        if self.ban.iter().any(|t| t.trim().is_empty()) {
            Some("ban_terms")
        } else if self.whitelist.iter().any(|t| t.trim().is_empty()) {
            Some("whitelist_terms")
        } else {
            None
        }
    }
}

/// Classifies a failed connect from its failure detail and the destination's
/// rejection text.
///
/// Returns `None` when neither text carries policy vocabulary.
///
/// # Example
///
/// ```rust
/// use waitroom_queue::IssueKind;
/// use waitroom_reconnect::{classify_failure, ClassifierTerms};
///
/// let terms = ClassifierTerms::default();
/// assert_eq!(
///     classify_failure(&terms, "", "You are banned from this server"),
///     Some(IssueKind::Banned)
/// );
/// assert_eq!(classify_failure(&terms, "connection reset", ""), None);
/// ```
pub fn classify_failure(terms: &ClassifierTerms, detail: &str, rejection: &str) -> Option<IssueKind> {
    let combined = format!("{detail} {rejection}").to_lowercase();
    let mentions = |vocabulary: &[String]| {
        vocabulary
            .iter()
            .any(|term| combined.contains(&term.to_lowercase()))
    };

    if mentions(&terms.ban) {
        Some(IssueKind::Banned)
    } else if mentions(&terms.whitelist) {
        Some(IssueKind::NotWhitelisted)
    } else {
        None
    }
}
