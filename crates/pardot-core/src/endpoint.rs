//! Request URL construction.
//!
//! `<base>/<object>/version/<N>/<key>/<value>/...`, with every path component
//! form-url-encoded and segment pairs kept in the order given.

use url::form_urlencoded::byte_serialize;

use crate::config::{DEFAULT_API_VERSION, DEFAULT_BASE_URL};

/// Object name of the login endpoint
pub const LOGIN_OBJECT: &str = "login";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UrlBuilder {
    base_url: String,
    version: u32,
}

impl Default for UrlBuilder {
    fn default() -> Self {
        Self::new(DEFAULT_BASE_URL, DEFAULT_API_VERSION)
    }
}

impl UrlBuilder {
    pub fn new(base_url: impl Into<String>, version: u32) -> Self {
        let mut base_url = base_url.into();
        if !base_url.ends_with('/') {
            base_url.push('/');
        }
        Self { base_url, version }
    }

    pub fn build(&self, object: &str, segments: &[(&str, &str)]) -> String {
        let mut url = format!("{}{}/version/{}/", self.base_url, object, self.version);
        for (key, value) in segments {
            url.extend(byte_serialize(key.as_bytes()));
            url.push('/');
            url.extend(byte_serialize(value.as_bytes()));
            url.push('/');
        }
        url
    }

    pub fn login(&self) -> String {
        self.build(LOGIN_OBJECT, &[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_url() {
        assert_eq!(
            UrlBuilder::default().login(),
            "https://pi.pardot.com/api/login/version/3/"
        );
    }

    #[test]
    fn test_segments_keep_order() {
        let urls = UrlBuilder::default();
        assert_eq!(
            urls.build("prospect", &[("do", "read"), ("id", "63045632")]),
            "https://pi.pardot.com/api/prospect/version/3/do/read/id/63045632/"
        );
        assert_eq!(
            urls.build("prospect", &[("do", "update"), ("email", "a+b@example.com")]),
            "https://pi.pardot.com/api/prospect/version/3/do/update/email/a%2Bb%40example.com/"
        );
    }

    #[test]
    fn test_base_url_without_trailing_slash() {
        let urls = UrlBuilder::new("http://127.0.0.1:8080/api", 4);
        assert_eq!(
            urls.build("list", &[("do", "query")]),
            "http://127.0.0.1:8080/api/list/version/4/do/query/"
        );
    }
}
