use axum::http::Uri;
use serde::{Deserialize, Serialize};

pub const DEFAULT_LIMIT: usize = 30;
pub const MAX_LIMIT: usize = 200;

#[derive(Debug, Clone, Copy, Default, Deserialize)]
pub struct PageQuery {
    pub limit: Option<usize>,
    pub offset: Option<usize>,
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl PageQuery {
    fn limit(&self) -> usize {
        self.limit
            .filter(|&limit| limit > 0)
            .unwrap_or(DEFAULT_LIMIT)
            .min(MAX_LIMIT)
    }

    /// Slices `items` and links the neighbouring pages relative to `uri`,
    /// keeping any other query parameters.
    pub fn paginate<T>(&self, items: Vec<T>, uri: &Uri) -> Page<T> {
        let count = items.len();
        let limit = self.limit();
        let offset = self.offset.unwrap_or(0);

        let end = offset.saturating_add(limit);
        let next = (end < count).then(|| link(uri, limit, Some(end)));
        let previous = (offset > 0).then(|| {
            let previous = offset.saturating_sub(limit);
            link(uri, limit, (previous > 0).then_some(previous))
        });

        let results = items.into_iter().skip(offset).take(limit).collect();

        Page {
            count,
            next,
            previous,
            results,
        }
    }
}

fn link(uri: &Uri, limit: usize, offset: Option<usize>) -> String {
    let mut params = uri
        .query()
        .unwrap_or_default()
        .split('&')
        .filter(|pair| {
            let key = pair.split('=').next().unwrap_or_default();
            !pair.is_empty() && key != "limit" && key != "offset"
        })
        .map(str::to_string)
        .collect::<Vec<_>>();

    params.push(format!("limit={limit}"));
    if let Some(offset) = offset {
        params.push(format!("offset={offset}"));
    }

    format!("{}?{}", uri.path(), params.join("&"))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn query(limit: Option<usize>, offset: Option<usize>) -> PageQuery {
        PageQuery { limit, offset }
    }

    #[test]
    fn first_page_links_forward_only() {
        let uri: Uri = "/api/posts?display_only=1".parse().unwrap();
        let page = query(Some(2), None).paginate((1..=5).collect(), &uri);

        assert_eq!(page.count, 5);
        assert_eq!(page.results, [1, 2]);
        assert_eq!(page.next.as_deref(), Some("/api/posts?display_only=1&limit=2&offset=2"));
        assert_eq!(page.previous, None);
    }

    #[test]
    fn middle_and_last_pages() {
        let uri: Uri = "/api/posts?limit=2&offset=2".parse().unwrap();
        let page = query(Some(2), Some(2)).paginate((1..=5).collect(), &uri);
        assert_eq!(page.results, [3, 4]);
        assert_eq!(page.previous.as_deref(), Some("/api/posts?limit=2"));

        let page = query(Some(2), Some(4)).paginate((1..=5).collect(), &uri);
        assert_eq!(page.results, [5]);
        assert_eq!(page.next, None);
        assert_eq!(page.previous.as_deref(), Some("/api/posts?limit=2&offset=2"));
    }

    #[test]
    fn limit_is_clamped() {
        let uri: Uri = "/api/users".parse().unwrap();
        let items = (0..500).collect::<Vec<_>>();

        assert_eq!(query(None, None).paginate(items.clone(), &uri).results.len(), DEFAULT_LIMIT);
        assert_eq!(query(Some(0), None).paginate(items.clone(), &uri).results.len(), DEFAULT_LIMIT);
        assert_eq!(query(Some(1000), None).paginate(items, &uri).results.len(), MAX_LIMIT);
    }

    #[test]
    fn huge_offsets_give_an_empty_last_page() {
        let uri: Uri = "/api/posts".parse().unwrap();
        let page = query(Some(2), Some(usize::MAX)).paginate((1..=5).collect::<Vec<i32>>(), &uri);

        assert_eq!(page.count, 5);
        assert!(page.results.is_empty());
        assert_eq!(page.next, None);
        assert_eq!(
            page.previous,
            Some(format!("/api/posts?limit=2&offset={}", usize::MAX - 2))
        );
    }
}
