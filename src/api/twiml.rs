//! Messaging reply document for the SMS gateway

use axum::{
    http::header,
    response::{IntoResponse, Response},
};

/// A `<Response>` document holding at most one `<Message>`
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MessagingResponse {
    message: Option<String>,
}

impl MessagingResponse {
    pub fn message(text: impl Into<String>) -> Self {
        Self {
            message: Some(text.into()),
        }
    }

    /// Acknowledge without replying
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
        match &self.message {
            Some(text) => {
                xml.push_str("<Response><Message>");
                xml.push_str(&escape_xml(text));
                xml.push_str("</Message></Response>");
            }
            None => xml.push_str("<Response />"),
        }
        xml
    }
}

impl IntoResponse for MessagingResponse {
    fn into_response(self) -> Response {
        ([(header::CONTENT_TYPE, "application/xml")], self.to_xml()).into_response()
    }
}

fn escape_xml(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&apos;"),
            _ => out.push(c),
        }
    }
    out
}
