use serde::Deserialize;

/// Query filters of the offer listing. Every filter is a case-insensitive
/// substring match; absent or blank filters match everything.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct OfferFilter {
    /// Product category name.
    pub category: Option<String>,
    /// City of the rental point's address.
    pub city: Option<String>,
    /// Name of the company owning the rental point.
    pub company: Option<String>,
}

/// Names an offer is matched against.
#[derive(Debug, Clone, Copy, Default)]
pub struct OfferLabels<'a> {
    pub category: Option<&'a str>,
    pub city: Option<&'a str>,
    pub company: Option<&'a str>,
}

impl OfferFilter {
    pub fn is_empty(&self) -> bool {
        active(&self.category).is_none() && active(&self.city).is_none() && active(&self.company).is_none()
    }

    pub fn matches(&self, labels: &OfferLabels<'_>) -> bool {
        contains(&self.category, labels.category)
            && contains(&self.city, labels.city)
            && contains(&self.company, labels.company)
    }

    /// `ILIKE` patterns for the SQL backend, `None` for inactive filters.
    pub fn like_patterns(&self) -> [Option<String>; 3] {
        [
            active(&self.category).map(like_pattern),
            active(&self.city).map(like_pattern),
            active(&self.company).map(like_pattern),
        ]
    }
}

fn active(filter: &Option<String>) -> Option<&str> {
    filter.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

fn contains(filter: &Option<String>, value: Option<&str>) -> bool {
    match active(filter) {
        None => true,
        Some(needle) => value
            .map(|v| v.to_lowercase().contains(&needle.to_lowercase()))
            .unwrap_or(false),
    }
}

fn like_pattern(needle: &str) -> String {
    let escaped = needle
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{}%", escaped)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn filter(category: Option<&str>, city: Option<&str>, company: Option<&str>) -> OfferFilter {
        OfferFilter {
            category: category.map(String::from),
            city: city.map(String::from),
            company: company.map(String::from),
        }
    }

    #[test]
    fn test_case_insensitive_substring() {
        let labels = OfferLabels {
            category: Some("Winter Sports"),
            city: Some("Kazan"),
            company: Some("Snow Rent LLC"),
        };

        assert!(filter(Some("winter"), None, None).matches(&labels));
        assert!(filter(None, Some("KAZ"), Some("rent")).matches(&labels));
        assert!(!filter(None, Some("Moscow"), None).matches(&labels));
    }

    #[test]
    fn test_missing_label_fails_active_filter() {
        let labels = OfferLabels::default();
        assert!(!filter(Some("bikes"), None, None).matches(&labels));
        assert!(filter(Some("  "), None, None).matches(&labels));
    }

    #[test]
    fn test_like_patterns_escape_wildcards() {
        let patterns = filter(Some("50%_off"), None, Some("")).like_patterns();
        assert_eq!(patterns[0].as_deref(), Some("%50\\%\\_off%"));
        assert!(patterns[1].is_none());
        assert!(patterns[2].is_none());
    }
}
