use serde::{Deserialize, Serialize};

use newspulse_common::Category;

/// Category selector for a list view. `All` passes everything.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CategoryFilter {
    #[default]
    All,
    Only(Category),
}

/// Per-view filter: free-text query plus a category selector. Owned by the
/// presentation layer and handed in on every projection call; the stores
/// never retain one.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FilterState {
    pub query: String,
    pub category: CategoryFilter,
}

impl FilterState {
    pub fn with_query(query: impl Into<String>) -> Self {
        Self {
            query: query.into(),
            category: CategoryFilter::All,
        }
    }

    pub fn with_category(category: Category) -> Self {
        Self {
            query: String::new(),
            category: CategoryFilter::Only(category),
        }
    }
}

/// Shared match rule for feed articles and alert records: the category
/// selector must pass, and a non-empty query must appear case-insensitively
/// in the title or the description. Records with no description only match
/// on title.
pub(crate) fn matches(
    filter: &FilterState,
    category: Category,
    title: &str,
    description: Option<&str>,
) -> bool {
    let category_ok = match filter.category {
        CategoryFilter::All => true,
        CategoryFilter::Only(wanted) => category == wanted,
    };
    if !category_ok {
        return false;
    }
    if filter.query.is_empty() {
        return true;
    }
    let query = filter.query.to_lowercase();
    title.to_lowercase().contains(&query)
        || description
            .map(|d| d.to_lowercase().contains(&query))
            .unwrap_or(false)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn all_filter_passes_every_category() {
        let filter = FilterState::default();
        assert!(matches(&filter, Category::Sports, "Match report", None));
        assert!(matches(&filter, Category::Science, "Lab notes", None));
    }

    #[test]
    fn category_filter_excludes_other_categories() {
        let filter = FilterState::with_category(Category::Business);
        assert!(matches(&filter, Category::Business, "Earnings", None));
        assert!(!matches(&filter, Category::Sports, "Earnings", None));
    }

    #[test]
    fn query_matches_title_case_insensitively() {
        let filter = FilterState::with_query("AI");
        assert!(matches(&filter, Category::Technology, "The ai race", None));
        assert!(matches(&filter, Category::Technology, "AI breakthrough", None));
        assert!(!matches(&filter, Category::Technology, "Chip shortage", None));
    }

    #[test]
    fn query_falls_back_to_description() {
        let filter = FilterState::with_query("fusion");
        assert!(matches(
            &filter,
            Category::Science,
            "Energy milestone",
            Some("First net-gain FUSION shot"),
        ));
    }

    #[test]
    fn missing_description_never_matches_nonempty_query() {
        let filter = FilterState::with_query("fusion");
        assert!(!matches(&filter, Category::Science, "Energy milestone", None));
    }

    #[test]
    fn empty_query_matches_even_without_description() {
        let filter = FilterState::default();
        assert!(matches(&filter, Category::General, "Anything", None));
    }

    #[test]
    fn category_and_query_compose() {
        let filter = FilterState {
            query: "rate".to_string(),
            category: CategoryFilter::Only(Category::Business),
        };
        assert!(matches(&filter, Category::Business, "Rate decision", None));
        assert!(!matches(&filter, Category::Business, "Merger talk", None));
        assert!(!matches(&filter, Category::General, "Rate decision", None));
    }
}
