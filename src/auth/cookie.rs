//! Cookie header parsing.

use axum::http::{HeaderMap, header};

/// Value of the named cookie, searching every `Cookie` header on the request.
pub fn get_cookie<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|line| line.split(';'))
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| key.trim() == name)
        .map(|(_, value)| value.trim().trim_matches('"'))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    fn headers(values: &[&'static str]) -> HeaderMap {
        let mut headers = HeaderMap::new();
        for value in values {
            headers.append(header::COOKIE, HeaderValue::from_static(value));
        }
        headers
    }

    #[test]
    fn test_finds_session_cookie_among_others() {
        let headers = headers(&["theme=dark; mountify.csrf.sid=abc.def ; lang=id"]);
        assert_eq!(get_cookie(&headers, "mountify.csrf.sid"), Some("abc.def"));
        assert_eq!(get_cookie(&headers, "lang"), Some("id"));
    }

    #[test]
    fn test_searches_repeated_headers() {
        let headers = headers(&["theme=dark", "mountify.csrf.sid=\"quoted\""]);
        assert_eq!(get_cookie(&headers, "mountify.csrf.sid"), Some("quoted"));
    }

    #[test]
    fn test_missing_cookie() {
        assert_eq!(get_cookie(&headers(&["theme=dark"]), "sid"), None);
        assert_eq!(get_cookie(&HeaderMap::new(), "sid"), None);
        // Prefix of another name does not match.
        assert_eq!(get_cookie(&headers(&["sid2=x"]), "sid"), None);
    }
}
