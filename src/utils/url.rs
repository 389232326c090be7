//! URL utilities for consistent URL handling
//!
//! Base URLs come from flags, the environment, or the config file, so they may
//! or may not carry a trailing slash. These helpers keep joined URLs free of
//! double slashes.

/// Normalize a base URL by removing trailing slashes
///
/// # Examples
///
/// ```
/// use logchat::utils::url::normalize_base_url;
///
/// assert_eq!(normalize_base_url("http://localhost:8000"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000/"), "http://localhost:8000");
/// assert_eq!(normalize_base_url("http://localhost:8000///"), "http://localhost:8000");
/// ```
pub fn normalize_base_url(base_url: &str) -> String {
    base_url.trim().trim_end_matches('/').to_string()
}

/// Construct a complete URL from a base URL and a path
///
/// # Examples
///
/// ```
/// use logchat::utils::url::construct_api_url;
///
/// assert_eq!(
///     construct_api_url("http://localhost:8000", "/?chat=abc"),
///     "http://localhost:8000/?chat=abc"
/// );
/// assert_eq!(
///     construct_api_url("http://localhost:8000/", "history"),
///     "http://localhost:8000/history"
/// );
/// ```
pub fn construct_api_url(base_url: &str, endpoint: &str) -> String {
    let normalized_base = normalize_base_url(base_url);
    let endpoint = endpoint.trim_start_matches('/');
    format!("{}/{}", normalized_base, endpoint)
}
