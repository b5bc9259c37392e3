use serde::Serialize;

use super::query::ListParams;
use crate::config::MAX_PAGE_SIZE;

/// 1-based page selection, already clamped to sane bounds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: usize,
    pub page_size: usize,
}

impl PageRequest {
    /// Unparseable page numbers are rejected like pages past the end; an
    /// unparseable page size falls back to the default.
    pub fn from_params(params: &ListParams, default_page_size: usize) -> Result<Self, InvalidPage> {
        let page = match params.page.as_deref().map(str::trim) {
            None | Some("") => 1,
            Some("last") => usize::MAX,
            Some(raw) => match raw.parse::<usize>() {
                Ok(page) if page >= 1 => page,
                _ => return Err(InvalidPage),
            },
        };

        let page_size = params
            .page_size
            .as_deref()
            .and_then(|raw| raw.trim().parse::<usize>().ok())
            .unwrap_or(default_page_size)
            .clamp(1, MAX_PAGE_SIZE);

        Ok(Self { page, page_size })
    }
}

/// The page asked for lies past the last page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("Invalid page.")]
pub struct InvalidPage;

/// Envelope returned by paginated list requests.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Page<T> {
    pub count: usize,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Page<T> {
    /// Slice `items` for `request`. `base_path` and `params` build the
    /// relative `next`/`previous` links.
    pub fn paginate(
        items: Vec<T>,
        request: PageRequest,
        base_path: &str,
        params: &ListParams,
    ) -> Result<Self, InvalidPage> {
        let count = items.len();
        let last_page = count.div_ceil(request.page_size).max(1);
        let page = if request.page == usize::MAX {
            last_page
        } else {
            request.page
        };
        if page > last_page {
            return Err(InvalidPage);
        }

        let start = (page - 1) * request.page_size;
        let results: Vec<T> = items
            .into_iter()
            .skip(start)
            .take(request.page_size)
            .collect();

        let link = |target: usize| page_link(base_path, params, target);
        let next = (page < last_page).then(|| link(page + 1));
        let previous = (page > 1).then(|| link(page - 1));

        Ok(Self {
            count,
            next,
            previous,
            results,
        })
    }
}

fn page_link(base_path: &str, params: &ListParams, page: usize) -> String {
    let mut query = url::form_urlencoded::Serializer::new(String::new());
    for (name, value) in params.filter_pairs() {
        query.append_pair(name, value);
    }
    if page > 1 {
        query.append_pair("page", &page.to_string());
    }
    let query = query.finish();
    if query.is_empty() {
        base_path.to_string()
    } else {
        format!("{base_path}?{query}")
    }
}
