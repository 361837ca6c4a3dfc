use axum::http::{HeaderMap, HeaderValue, header::CONTENT_RANGE};
use serde::Serialize;
use utoipa::ToSchema;

/// Page produced by a list query before it is shaped for the wire
#[derive(Debug, Clone, PartialEq)]
pub struct PageFetchResult<T> {
    pub data: Vec<T>,
    /// Matching rows before pagination
    pub total: u64,
    pub page: u64,
    pub page_size: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
    pub total: u64,
    pub per_page: u64,
    pub current_page: u64,
    pub last_page: u64,
}

/// Public list envelope: `{data, meta: {total, perPage, currentPage, lastPage}}`
#[derive(Debug, Clone, PartialEq, Serialize, ToSchema)]
pub struct ServerResponse<T> {
    pub data: Vec<T>,
    pub meta: PageMeta,
}

/// Shape a fetched page into the public envelope.
///
/// A zero page or page size on the result falls back to the requested one;
/// `last_page` is never below 1.
#[must_use]
pub fn shape<T>(
    result: PageFetchResult<T>,
    requested_page: u64,
    requested_page_size: u64,
) -> ServerResponse<T> {
    let per_page = match result.page_size {
        0 => requested_page_size.max(1),
        size => size,
    };
    let current_page = match result.page {
        0 => requested_page.max(1),
        page => page,
    };
    let last_page = result.total.div_ceil(per_page).max(1);

    ServerResponse {
        data: result.data,
        meta: PageMeta {
            total: result.total,
            per_page,
            current_page,
            last_page,
        },
    }
}

/// Remove characters that cannot appear in a header value
fn sanitize_resource_name(name: &str) -> String {
    name.chars()
        .filter(|c| c.is_ascii() && !c.is_ascii_control())
        .collect()
}

/// `Content-Range: <resource> <first>-<last>/<total>` for a returned page,
/// or `<resource> */<total>` when the page is empty.
#[must_use]
pub fn calculate_content_range(offset: u64, returned: u64, total: u64, resource_name: &str) -> HeaderMap {
    let safe_name = sanitize_resource_name(resource_name);
    let range = if returned == 0 || offset >= total {
        format!("{safe_name} */{total}")
    } else {
        let last = offset.saturating_add(returned - 1).min(total - 1);
        format!("{safe_name} {offset}-{last}/{total}")
    };

    let mut headers = HeaderMap::new();
    let value = HeaderValue::from_str(&range).unwrap_or_else(|_| HeaderValue::from_static("items */0"));
    headers.insert(CONTENT_RANGE, value);
    headers
}
