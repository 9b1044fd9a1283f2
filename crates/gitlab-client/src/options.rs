//! Shared request options and URL helpers
//!
//! GitLab supports offset pagination (`page` / `per_page`) and keyset
//! pagination (`pagination=keyset` with `order_by` / `sort`).

use gitlab_auth::COMPONENT;
use percent_encoding::utf8_percent_encode;
use serde::Serialize;

/// Default page size GitLab applies when `per_page` is omitted
pub const DEFAULT_PER_PAGE: u32 = 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Sort {
    Asc,
    Desc,
}

/// Pagination parameters accepted by list endpoints.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ListOptions {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    /// Results per page, at most 100
    #[serde(skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub order_by: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sort: Option<Sort>,
}

impl ListOptions {
    /// Offset pagination. Page numbers start at 1; a zero `per_page` falls
    /// back to the default.
    pub fn page(page: u32, per_page: Option<u32>) -> Self {
        Self {
            page: Some(page.max(1)),
            per_page: Some(per_page.filter(|n| *n > 0).unwrap_or(DEFAULT_PER_PAGE)),
            ..Self::default()
        }
    }

    /// Keyset pagination ordered by `order_by`.
    pub fn keyset(order_by: impl Into<String>, sort: Sort, per_page: Option<u32>) -> Self {
        Self {
            pagination: Some("keyset".to_owned()),
            order_by: Some(order_by.into()),
            sort: Some(sort),
            per_page: per_page.filter(|n| *n > 0),
            ..Self::default()
        }
    }
}

/// Percent-encode one path segment, e.g. a `namespace/project` path used
/// in place of a numeric project ID.
pub fn path_escape(segment: &str) -> String {
    utf8_percent_encode(segment, COMPONENT).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn page_normalizes_inputs() {
        let opts = ListOptions::page(0, None);
        assert_eq!(opts.page, Some(1));
        assert_eq!(opts.per_page, Some(DEFAULT_PER_PAGE));

        let opts = ListOptions::page(3, Some(50));
        assert_eq!(opts.page, Some(3));
        assert_eq!(opts.per_page, Some(50));
    }

    #[test]
    fn keyset_serializes_only_set_fields() {
        let opts = ListOptions::keyset("id", Sort::Desc, None);
        assert_eq!(
            serde_json::to_value(&opts).unwrap(),
            json!({"pagination": "keyset", "order_by": "id", "sort": "desc"})
        );
    }

    #[test]
    fn path_escape_encodes_namespaces() {
        assert_eq!(path_escape("42"), "42");
        assert_eq!(path_escape("group/sub group/project"), "group%2Fsub%20group%2Fproject");
    }
}
