//! Automatic hiding of visible comments that contain sensitive terms.

use cms_db::comments;
use cms_db::DbPool;
use serde::Serialize;
use tracing::{debug, info};

use crate::error::ModerationError;

/// Case-insensitive term list. Blank terms are dropped so they cannot match
/// every comment.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SensitiveTerms {
    terms: Vec<String>,
}

impl SensitiveTerms {
    pub fn new<I, S>(terms: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let terms = terms
            .into_iter()
            .map(|t| t.as_ref().trim().to_lowercase())
            .filter(|t| !t.is_empty())
            .collect();
        Self { terms }
    }

    pub fn len(&self) -> usize {
        self.terms.len()
    }

    pub fn is_empty(&self) -> bool {
        self.terms.is_empty()
    }

    /// First configured term contained in `text`.
    pub fn first_match(&self, text: &str) -> Option<&str> {
        let text = text.to_lowercase();
        self.terms
            .iter()
            .find(|term| text.contains(term.as_str()))
            .map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct ModerationReport {
    /// Visible comments examined.
    pub reviewed: usize,
    /// Comments hidden by this sweep.
    pub flagged: usize,
}

#[derive(Debug, Clone)]
pub struct ModerationSweeper {
    pool: DbPool,
    terms: SensitiveTerms,
}

impl ModerationSweeper {
    pub fn new(pool: DbPool, terms: SensitiveTerms) -> Self {
        Self { pool, terms }
    }

    pub fn terms(&self) -> &SensitiveTerms {
        &self.terms
    }

    /// Scans comments with `passed = 1` and sets `passed = 0` on those that
    /// contain a sensitive term. Hidden comments are never re-examined.
    ///
    /// All changes of one sweep commit together; a sweep that flags nothing
    /// writes nothing.
    pub async fn sweep(&self) -> Result<ModerationReport, ModerationError> {
        let mut tx = self.pool.begin().await?;
        let visible = comments::list_visible(&mut *tx).await?;

        let mut report = ModerationReport {
            reviewed: visible.len(),
            flagged: 0,
        };
        for row in &visible {
            if let Some(term) = self.terms.first_match(&row.comment) {
                debug!(comment_id = row.id, term, "hiding comment");
                comments::hide(&mut *tx, row.id).await?;
                report.flagged += 1;
            }
        }

        if report.flagged > 0 {
            tx.commit().await?;
            info!(reviewed = report.reviewed, flagged = report.flagged, "comments hidden");
        } else {
            tx.rollback().await?;
            debug!(reviewed = report.reviewed, "no comments flagged");
        }
        Ok(report)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_ignores_case_and_blank_terms() {
        let terms = SensitiveTerms::new(["  ", "Spam", "", "scam"]);
        assert_eq!(terms.len(), 2);
        assert_eq!(terms.first_match("Buy SPAM now"), Some("spam"));
        assert_eq!(terms.first_match("totally a Scam and spam"), Some("spam"));
        assert_eq!(terms.first_match("lovely vase"), None);
    }

    #[test]
    fn empty_list_matches_nothing() {
        let terms = SensitiveTerms::new(Vec::<String>::new());
        assert!(terms.is_empty());
        assert_eq!(terms.first_match("anything"), None);
    }

    #[test]
    fn non_ascii_terms_match_as_substrings() {
        let terms = SensitiveTerms::new(["傻逼"]);
        assert!(terms.first_match("你是傻逼吗").is_some());
    }
}
