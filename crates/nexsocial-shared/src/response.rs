//! Standardized API response types (RFC 7807 compliant for errors).

use serde::{Deserialize, Serialize};

/// Standard successful API response wrapper.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn ok(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
        }
    }

    pub fn ok_with_message(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: Some(message.into()),
        }
    }
}

impl ApiResponse<()> {
    /// Acknowledgement without a payload.
    pub fn message(message: impl Into<String>) -> Self {
        Self {
            success: true,
            data: None,
            message: Some(message.into()),
        }
    }
}

/// Page-number pagination envelope used by every listing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Paginated<T> {
    pub count: u64,
    pub total_pages: u64,
    pub current_page: u64,
    pub page_size: u64,
    pub next: Option<String>,
    pub previous: Option<String>,
    pub results: Vec<T>,
}

impl<T> Paginated<T> {
    /// Envelope for one page; `next`/`previous` stay empty until
    /// [`Paginated::with_links`] is called.
    pub fn new(results: Vec<T>, count: u64, current_page: u64, page_size: u64) -> Self {
        let page_size = page_size.max(1);
        Self {
            count,
            total_pages: count.div_ceil(page_size).max(1),
            current_page,
            page_size,
            next: None,
            previous: None,
            results,
        }
    }

    /// Fill `next`/`previous` with links relative to `path`.
    pub fn with_links(mut self, path: &str) -> Self {
        let size = self.page_size;
        let link = |page: u64| format!("{path}?page={page}&page_size={size}");
        self.next = (self.current_page < self.total_pages).then(|| link(self.current_page + 1));
        self.previous = (self.current_page > 1)
            .then(|| link((self.current_page - 1).min(self.total_pages)));
        self
    }
}

/// RFC 7807 Problem Details for HTTP APIs.
///
/// See: https://datatracker.ietf.org/doc/html/rfc7807
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// A URI reference that identifies the problem type.
    #[serde(rename = "type")]
    pub error_type: String,

    /// A short, human-readable summary of the problem type.
    pub title: String,

    /// The HTTP status code.
    pub status: u16,

    /// A human-readable explanation specific to this occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,

    /// A URI reference that identifies the specific occurrence.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub instance: Option<String>,

    /// Request ID for debugging purposes.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ErrorResponse {
    pub fn new(status: u16, title: impl Into<String>) -> Self {
        Self {
            error_type: "about:blank".to_string(),
            title: title.into(),
            status,
            detail: None,
            instance: None,
            request_id: None,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    pub fn with_instance(mut self, instance: impl Into<String>) -> Self {
        self.instance = Some(instance.into());
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    // Common error constructors
    pub fn bad_request(detail: impl Into<String>) -> Self {
        Self::new(400, "Bad Request").with_detail(detail)
    }

    pub fn unauthorized() -> Self {
        Self::new(401, "Unauthorized")
    }

    pub fn forbidden(detail: impl Into<String>) -> Self {
        Self::new(403, "Forbidden").with_detail(detail)
    }

    pub fn not_found(detail: impl Into<String>) -> Self {
        Self::new(404, "Not Found").with_detail(detail)
    }

    pub fn conflict(detail: impl Into<String>) -> Self {
        Self::new(409, "Conflict").with_detail(detail)
    }

    pub fn payload_too_large(limit: u64) -> Self {
        Self::new(413, "Payload Too Large")
            .with_detail(format!("Uploads are limited to {limit} bytes"))
    }

    pub fn unsupported_media_type(detail: impl Into<String>) -> Self {
        Self::new(415, "Unsupported Media Type").with_detail(detail)
    }

    pub fn too_many_requests(retry_after_secs: u64) -> Self {
        Self::new(429, "Too Many Requests").with_detail(format!(
            "Rate limit exceeded. Try again in {retry_after_secs} seconds."
        ))
    }

    pub fn internal_error() -> Self {
        Self::new(500, "Internal Server Error")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_problem_details_shape() {
        let body = serde_json::to_value(
            ErrorResponse::conflict("already following").with_request_id("req-1"),
        )
        .unwrap();

        assert_eq!(body["type"], "about:blank");
        assert_eq!(body["status"], 409);
        assert_eq!(body["detail"], "already following");
        assert_eq!(body["request_id"], "req-1");
        assert!(body.get("instance").is_none());
    }

    #[test]
    fn test_pagination_links() {
        let page = Paginated::new(vec![1, 2], 25, 2, 10).with_links("/api/posts/");

        assert_eq!(page.total_pages, 3);
        assert_eq!(page.next.as_deref(), Some("/api/posts/?page=3&page_size=10"));
        assert_eq!(page.previous.as_deref(), Some("/api/posts/?page=1&page_size=10"));
    }

    #[test]
    fn test_single_page_has_no_links() {
        let page = Paginated::<u8>::new(Vec::new(), 0, 1, 10).with_links("/api/users/");

        assert_eq!(page.total_pages, 1);
        assert!(page.next.is_none());
        assert!(page.previous.is_none());
    }
}
