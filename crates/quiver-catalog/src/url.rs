//! Object-storage URL normalisation

/// Scheme accepted in place of an HTTPS URL for catalogs and archives
pub const OBJECT_STORAGE_SCHEME: &str = "gs://";

/// Public HTTPS endpoint serving object-storage buckets
pub const OBJECT_STORAGE_HTTPS_BASE: &str = "https://storage.googleapis.com";

/// Rewrite `gs://bucket/path` to its public HTTPS equivalent. Any other URL
/// is returned verbatim.
pub fn normalize_url(url: &str) -> String {
    match url.strip_prefix(OBJECT_STORAGE_SCHEME) {
        Some(rest) => format!("{}/{}", OBJECT_STORAGE_HTTPS_BASE, rest),
        None => url.to_string(),
    }
}
