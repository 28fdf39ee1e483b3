//! Guided-search mode selection.
//!
//! Precedence over exemplar presence:
//!   1. positive + negative  -> Discovery
//!   2. positive only        -> Recommend, average-vector, the id alone
//!   3. negative only        -> Recommend, best-score, query embedding as
//!                              the sole positive
//!   4. neither              -> Plain nearest-neighbor
//!
//! Total and deterministic: every presence combination maps to exactly one
//! branch. Empty strings count as absent.

/// The store call a guided query resolves to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuidedPlan {
    Discover { positive: String, negative: String },
    RecommendPositive { positive: String },
    RecommendNegative { negative: String },
    Plain,
}

impl GuidedPlan {
    pub fn choose(positive: Option<&str>, negative: Option<&str>) -> Self {
        let positive = positive.filter(|s| !s.is_empty());
        let negative = negative.filter(|s| !s.is_empty());
        match (positive, negative) {
            (Some(p), Some(n)) => GuidedPlan::Discover {
                positive: p.to_string(),
                negative: n.to_string(),
            },
            (Some(p), None) => GuidedPlan::RecommendPositive {
                positive: p.to_string(),
            },
            (None, Some(n)) => GuidedPlan::RecommendNegative {
                negative: n.to_string(),
            },
            (None, None) => GuidedPlan::Plain,
        }
    }

    /// Name of the branch taken, reported in responses.
    pub fn method(&self) -> &'static str {
        match self {
            GuidedPlan::Discover { .. } => "discovery_api",
            GuidedPlan::RecommendPositive { .. } | GuidedPlan::RecommendNegative { .. } => {
                "recommend_api"
            }
            GuidedPlan::Plain => "basic_query",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_precedence_is_total() {
        assert_eq!(
            GuidedPlan::choose(Some("p"), Some("n")),
            GuidedPlan::Discover {
                positive: "p".into(),
                negative: "n".into()
            }
        );
        assert_eq!(
            GuidedPlan::choose(Some("p"), None),
            GuidedPlan::RecommendPositive {
                positive: "p".into()
            }
        );
        assert_eq!(
            GuidedPlan::choose(None, Some("n")),
            GuidedPlan::RecommendNegative {
                negative: "n".into()
            }
        );
        assert_eq!(GuidedPlan::choose(None, None), GuidedPlan::Plain);
    }

    #[test]
    fn test_empty_strings_count_as_absent() {
        assert_eq!(GuidedPlan::choose(Some(""), Some("")), GuidedPlan::Plain);
        assert_eq!(
            GuidedPlan::choose(Some(""), Some("n")),
            GuidedPlan::RecommendNegative {
                negative: "n".into()
            }
        );
    }

    #[test]
    fn test_deterministic() {
        assert_eq!(
            GuidedPlan::choose(Some("a"), Some("b")),
            GuidedPlan::choose(Some("a"), Some("b"))
        );
    }

    #[test]
    fn test_method_names() {
        assert_eq!(
            GuidedPlan::choose(Some("p"), Some("n")).method(),
            "discovery_api"
        );
        assert_eq!(GuidedPlan::choose(Some("p"), None).method(), "recommend_api");
        assert_eq!(GuidedPlan::choose(None, Some("n")).method(), "recommend_api");
        assert_eq!(GuidedPlan::choose(None, None).method(), "basic_query");
    }
}
