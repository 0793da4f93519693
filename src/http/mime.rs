//! Content-Type lookup by file extension.
//!
//! Only the common web types are mapped explicitly; anything else is served
//! as `text/html`, which is what the file helpers default to for
//! extension-less templates.

/// Get the Content-Type for a file extension.
///
/// # Examples
/// ```
/// use wicket::http::mime::content_type_for;
/// assert_eq!(content_type_for(Some("json")), "application/json");
/// assert_eq!(content_type_for(Some("weird")), "text/html");
/// assert_eq!(content_type_for(None), "text/html");
/// ```
#[must_use]
pub fn content_type_for(extension: Option<&str>) -> &'static str {
    match extension {
        Some("html" | "htm") => "text/html",
        Some("css") => "text/css",
        Some("js") => "text/javascript",
        Some("json") => "application/json",
        Some("png") => "image/png",
        Some("jpg" | "jpeg") => "image/jpeg",
        Some("gif") => "image/gif",
        Some("pdf") => "application/pdf",
        Some("ico") => "image/vnd.microsoft.icon",
        Some("svg") => "image/svg+xml",
        Some("txt") => "text/plain",
        _ => "text/html",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn common_types() {
        assert_eq!(content_type_for(Some("html")), "text/html");
        assert_eq!(content_type_for(Some("css")), "text/css");
        assert_eq!(content_type_for(Some("js")), "text/javascript");
        assert_eq!(content_type_for(Some("png")), "image/png");
        assert_eq!(content_type_for(Some("svg")), "image/svg+xml");
        assert_eq!(content_type_for(Some("txt")), "text/plain");
    }

    #[test]
    fn unknown_extension_defaults_to_html() {
        assert_eq!(content_type_for(Some("xyz")), "text/html");
        assert_eq!(content_type_for(None), "text/html");
    }
}
