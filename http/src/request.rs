use crate::HttpRequest;
use http::Method;
use http::header::CONTENT_TYPE;
use std::borrow::Cow;

/// Read-only accessors guards and transforms use on a buffered request.
pub trait RequestExt {
    fn path(&self) -> &str;
    fn method_is(&self, method: &Method) -> bool;
    /// First value of `name`, if present and valid UTF-8.
    fn header_str(&self, name: &str) -> Option<&str>;
    fn content_type(&self) -> Option<&str>;
    fn body_bytes(&self) -> &[u8];
    /// Body decoded as UTF-8, invalid sequences replaced.
    fn body_text(&self) -> Cow<'_, str>;
}

impl RequestExt for HttpRequest {
    fn path(&self) -> &str {
        self.uri().path()
    }

    fn method_is(&self, method: &Method) -> bool {
        self.method() == method
    }

    fn header_str(&self, name: &str) -> Option<&str> {
        self.headers().get(name)?.to_str().ok()
    }

    fn content_type(&self) -> Option<&str> {
        self.headers().get(CONTENT_TYPE)?.to_str().ok()
    }

    fn body_bytes(&self) -> &[u8] {
        self.body()
    }

    fn body_text(&self) -> Cow<'_, str> {
        String::from_utf8_lossy(self.body())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    #[test]
    fn test_accessors() {
        let request = http::Request::builder()
            .method(Method::POST)
            .uri("http://svc.local/orders?id=3")
            .header("content-type", "text/xml")
            .header("x-trace", "abc")
            .body(Bytes::from_static(b"<order/>"))
            .unwrap();

        assert_eq!(request.path(), "/orders");
        assert!(request.method_is(&Method::POST));
        assert_eq!(request.header_str("X-Trace"), Some("abc"));
        assert_eq!(request.header_str("missing"), None);
        assert_eq!(request.content_type(), Some("text/xml"));
        assert_eq!(request.body_text(), "<order/>");
        assert_eq!(request.body_bytes().len(), 8);
    }
}
