use serde::{Deserialize, Serialize};
use thiserror::Error;
use url::Url;

use super::record::Record;

/// One bounded list request, as sent to `GET <collection>`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRequest {
    pub collection: String,
    pub skip: u64,
    pub limit: u32,
    pub search: Option<String>,
    /// Repeated `key=value` pairs, in order.
    pub filters: Vec<(String, String)>,
    pub sort: Option<String>,
}

impl PageRequest {
    /// `skip=..&limit=..&search=..&k=v&k=v2&sort=..`. Multi-valued filters are
    /// repeated pairs, never bracket or array notation.
    #[must_use]
    pub fn to_query_string(&self) -> String {
        let mut query = url::form_urlencoded::Serializer::new(String::new());
        self.append_pairs(&mut query);
        query.finish()
    }

    /// Joins the collection path onto `base` and appends the query string.
    pub fn to_url(&self, base: &Url) -> Result<Url, url::ParseError> {
        let mut url = base.join(&self.collection)?;
        {
            let mut query = url.query_pairs_mut();
            query.clear();
            self.append_pairs(&mut query);
        }
        Ok(url)
    }

    fn append_pairs<T: url::form_urlencoded::Target>(
        &self,
        query: &mut url::form_urlencoded::Serializer<'_, T>,
    ) {
        query.append_pair("skip", &self.skip.to_string());
        query.append_pair("limit", &self.limit.to_string());
        if let Some(search) = self.search.as_deref().filter(|s| !s.is_empty()) {
            query.append_pair("search", search);
        }
        for (key, value) in &self.filters {
            query.append_pair(key, value);
        }
        if let Some(sort) = &self.sort {
            query.append_pair("sort", sort);
        }
    }
}

/// Backend reply to a [`PageRequest`].
///
/// `total` may be exact or approximate; it is only trusted as exact when
/// `total_exact` is set. Otherwise exactness is inferred from page shape.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct PageResponse {
    pub items: Vec<Record>,
    #[serde(default)]
    pub total: Option<u64>,
    #[serde(default)]
    pub has_more: Option<bool>,
    #[serde(default)]
    pub total_exact: bool,
}

impl PageResponse {
    pub fn new(items: Vec<Record>) -> Self {
        Self {
            items,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
pub enum FetchError {
    #[error("network error: {message}")]
    Network { message: String },

    #[error("request timed out")]
    Timeout,

    #[error("server returned {status}: {message}")]
    Status { status: u16, message: String },

    #[error("could not decode response: {message}")]
    Decode { message: String },
}

impl FetchError {
    #[must_use]
    pub fn network(message: impl Into<String>) -> Self {
        Self::Network {
            message: message.into(),
        }
    }
}

pub type FetchResult = Result<PageResponse, FetchError>;

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn request() -> PageRequest {
        PageRequest {
            collection: "calls".into(),
            skip: 20,
            limit: 10,
            search: Some("jane doe".into()),
            filters: vec![
                ("status".into(), "open".into()),
                ("status".into(), "pending".into()),
                ("agent".into(), "a&b".into()),
            ],
            sort: None,
        }
    }

    #[test]
    fn query_string_repeats_multi_valued_filters() {
        assert_eq!(
            request().to_query_string(),
            "skip=20&limit=10&search=jane+doe&status=open&status=pending&agent=a%26b"
        );
    }

    #[test]
    fn empty_search_is_omitted_and_sort_is_last() {
        let req = PageRequest {
            search: Some(String::new()),
            filters: vec![],
            sort: Some("-created_at".into()),
            ..request()
        };
        assert_eq!(req.to_query_string(), "skip=20&limit=10&sort=-created_at");
    }

    #[test]
    fn to_url_joins_collection() {
        let base = Url::parse("https://api.example.com/v1/").unwrap();
        let url = request().to_url(&base).unwrap();
        assert_eq!(url.path(), "/v1/calls");
        assert!(url.query().unwrap().starts_with("skip=20&limit=10"));
    }

    #[test]
    fn response_tolerates_missing_optional_fields() {
        let resp: PageResponse =
            serde_json::from_value(json!({"items": [{"id": 1}], "extra": "ignored"})).unwrap();
        assert_eq!(resp.items.len(), 1);
        assert_eq!(resp.total, None);
        assert!(!resp.total_exact);
    }
}
