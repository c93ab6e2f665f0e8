//! Minimal HTML rendering helpers for the web pages.

use std::fmt::Write;

/// Escapes text for use in HTML element content and double-quoted attributes.
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&#x27;"),
            c => escaped.push(c),
        }
    }
    escaped
}

/// Percent-encodes a query parameter value.
pub fn encode_query(value: &str) -> String {
    url::form_urlencoded::byte_serialize(value.as_bytes()).collect()
}

/// Wraps `body` in the page layout.
///
/// `user` is the logged-in username; it switches the header between login and logout links.
pub fn layout(title: &str, user: Option<&str>, body: &str) -> String {
    let mut page = String::new();
    let _ = write!(
        page,
        "<!DOCTYPE html>\n<html lang=\"en\">\n<head>\n<meta charset=\"UTF-8\">\n\
         <title>{title} | Garden</title>\n</head>\n<body>\n<header>\n<a href=\"/\">Garden</a>\n",
        title = escape(title),
    );
    match user {
        Some(user) => {
            let _ = write!(
                page,
                "<span class=\"user\">{}</span> <a href=\"/api-auth/logout/\">Log out</a>\n",
                escape(user)
            );
        }
        None => page.push_str("<a href=\"/api-auth/login/\">Log in</a>\n"),
    }
    let _ = write!(
        page,
        "</header>\n<main>\n<h1>{}</h1>\n{}\n</main>\n</body>\n</html>\n",
        escape(title),
        body
    );
    page
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn escapes_markup() {
        assert_eq!(
            escape("<b>\"Quercus\" & 'robur'</b>"),
            "&lt;b&gt;&quot;Quercus&quot; &amp; &#x27;robur&#x27;&lt;/b&gt;"
        );
    }

    #[test]
    fn encodes_query_values() {
        assert_eq!(encode_query("/floras/?page=2"), "%2Ffloras%2F%3Fpage%3D2");
    }

    #[test]
    fn layout_shows_user() {
        let page = layout("Flora", Some("botanist"), "<p>x</p>");
        assert!(page.contains("<title>Flora | Garden</title>"));
        assert!(page.contains("botanist"));
        assert!(page.contains("/api-auth/logout/"));
        let page = layout("Flora", None, "");
        assert!(page.contains("/api-auth/login/"));
    }
}
