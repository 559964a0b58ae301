//! Request descriptors consumed by the gateway.
//!
//! A descriptor is plain data so the gateway can replay it after a
//! credential renewal.

use reqwest::Method;
use serde_json::Value;

/// Header name the gateway injects on every authenticated request.
pub const AUTHORIZATION: &str = "Authorization";

/// Content type set by the JSON convenience helpers.
pub const CONTENT_TYPE: &str = "Content-Type";

/// One part of a multipart form body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FormPart {
    Text {
        name: String,
        value: String,
    },
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: Option<String>,
    },
}

/// Multipart form payload (attachments, uploads).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultipartForm {
    parts: Vec<FormPart>,
}

impl MultipartForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn text(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.parts.push(FormPart::Text {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    pub fn file(
        mut self,
        name: impl Into<String>,
        file_name: impl Into<String>,
        bytes: Vec<u8>,
        mime: Option<&str>,
    ) -> Self {
        self.parts.push(FormPart::File {
            name: name.into(),
            file_name: file_name.into(),
            bytes,
            mime: mime.map(str::to_owned),
        });
        self
    }

    pub fn parts(&self) -> &[FormPart] {
        &self.parts
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum RequestBody {
    Text(String),
    Json(Value),
    Form(MultipartForm),
}

/// Target, method, headers and optional body of one outbound request.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestDescriptor {
    method: Method,
    url: String,
    headers: Vec<(String, String)>,
    body: Option<RequestBody>,
}

impl RequestDescriptor {
    pub fn new(method: Method, url: impl Into<String>) -> Self {
        Self {
            method,
            url: url.into(),
            headers: Vec::new(),
            body: None,
        }
    }

    pub fn get(url: impl Into<String>) -> Self {
        Self::new(Method::GET, url)
    }

    pub fn post(url: impl Into<String>) -> Self {
        Self::new(Method::POST, url)
    }

    pub fn put(url: impl Into<String>) -> Self {
        Self::new(Method::PUT, url)
    }

    pub fn delete(url: impl Into<String>) -> Self {
        Self::new(Method::DELETE, url)
    }

    /// Set a header, replacing any existing value with the same
    /// (case-insensitive) name.
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set_header(name.into(), value.into());
        self
    }

    pub fn json(mut self, body: Value) -> Self {
        self.body = Some(RequestBody::Json(body));
        self
    }

    pub fn text(mut self, body: impl Into<String>) -> Self {
        self.body = Some(RequestBody::Text(body.into()));
        self
    }

    pub fn form(mut self, form: MultipartForm) -> Self {
        self.body = Some(RequestBody::Form(form));
        self
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> Option<&RequestBody> {
        self.body.as_ref()
    }

    pub fn header_value(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    /// Copy of this descriptor carrying `Authorization: Bearer <token>`.
    /// Caller headers are kept; only a caller-supplied Authorization is replaced.
    pub(crate) fn with_bearer(&self, token: &str) -> Self {
        let mut authorized = self.clone();
        authorized.set_header(AUTHORIZATION.to_string(), format!("Bearer {}", token));
        authorized
    }

    fn set_header(&mut self, name: String, value: String) {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(&name))
        {
            Some(existing) => existing.1 = value,
            None => self.headers.push((name, value)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_bearer_merges_with_caller_headers() {
        let request = RequestDescriptor::get("https://api.example.test/emails/")
            .header("Content-Type", "application/json")
            .header("X-Trace", "abc");

        let authorized = request.with_bearer("tok-1");

        assert_eq!(authorized.header_value("authorization"), Some("Bearer tok-1"));
        assert_eq!(authorized.header_value("content-type"), Some("application/json"));
        assert_eq!(authorized.header_value("X-Trace"), Some("abc"));
        assert_eq!(authorized.headers().len(), 3);

        // The original is left untouched so it can be replayed
        assert_eq!(request.header_value(AUTHORIZATION), None);
    }

    #[test]
    fn test_bearer_replaces_caller_authorization() {
        let request = RequestDescriptor::get("https://api.example.test/")
            .header("authorization", "Basic xyz");
        let authorized = request.with_bearer("tok-2");

        assert_eq!(authorized.headers().len(), 1);
        assert_eq!(authorized.header_value(AUTHORIZATION), Some("Bearer tok-2"));
    }

    #[test]
    fn test_builders() {
        let request = RequestDescriptor::post("https://api.example.test/user/emails/")
            .json(json!({"subject": "", "category": "Work"}));
        assert_eq!(request.method(), &Method::POST);
        assert!(matches!(request.body(), Some(RequestBody::Json(v)) if v["category"] == "Work"));

        let form = MultipartForm::new()
            .text("subject", "Hello")
            .file("attachment", "a.txt", b"hi".to_vec(), Some("text/plain"));
        let upload = RequestDescriptor::post("https://api.example.test/send/").form(form);
        match upload.body() {
            Some(RequestBody::Form(f)) => assert_eq!(f.parts().len(), 2),
            other => panic!("unexpected body: {:?}", other),
        }
    }
}
