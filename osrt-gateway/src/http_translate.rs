//! Translates between the host's native HTTP request/response shapes and
//! the JSON wire format a plugin's `handle_route` speaks.

use crate::error::DispatchError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Serialize)]
pub struct OsaurusUrls {
    pub base_url: String,
    pub plugin_url: String,
}

/// The JSON object written to the plugin for `handle_route`. Field order is
/// irrelevant; `headers` keys are always lower-cased before this is built,
/// resolving the open question on header casing in favour of the host
/// normalising rather than trusting the transport.
#[derive(Debug, Clone, Serialize)]
pub struct PluginHttpRequest {
    pub route_id: String,
    pub method: String,
    pub path: String,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: String,
    pub body_encoding: &'static str,
    pub remote_addr: String,
    pub plugin_id: String,
    pub osaurus: OsaurusUrls,
}

pub struct BuildRequestArgs<'a> {
    pub route_id: &'a str,
    pub method: &'a str,
    pub path: &'a str,
    pub query: HashMap<String, String>,
    pub headers: HashMap<String, String>,
    pub body: &'a [u8],
    pub remote_addr: &'a str,
    pub plugin_id: &'a str,
    pub osaurus: OsaurusUrls,
}

/// Builds the request JSON, lower-casing every header key and choosing
/// `body_encoding` based on whether `body` is valid UTF-8.
pub fn build_request(args: BuildRequestArgs<'_>) -> PluginHttpRequest {
    let headers = args
        .headers
        .into_iter()
        .map(|(k, v)| (k.to_ascii_lowercase(), v))
        .collect();

    let (body, body_encoding) = match std::str::from_utf8(args.body) {
        Ok(s) => (s.to_string(), "utf8"),
        Err(_) => (
            base64::Engine::encode(&base64::engine::general_purpose::STANDARD, args.body),
            "base64",
        ),
    };

    PluginHttpRequest {
        route_id: args.route_id.to_string(),
        method: args.method.to_ascii_uppercase(),
        path: args.path.to_string(),
        query: args.query,
        headers,
        body,
        body_encoding,
        remote_addr: args.remote_addr.to_string(),
        plugin_id: args.plugin_id.to_string(),
        osaurus: args.osaurus,
    }
}

/// The JSON object a plugin's `handle_route` hands back.
#[derive(Debug, Clone, Deserialize)]
pub struct PluginHttpResponse {
    pub status: u16,
    #[serde(default)]
    pub headers: HashMap<String, String>,
    #[serde(default)]
    pub body: Option<String>,
    #[serde(default)]
    pub body_encoding: Option<String>,
}

/// A fully decoded response, ready to write to the socket.
pub struct DecodedResponse {
    pub status: u16,
    pub headers: HashMap<String, String>,
    pub body: Vec<u8>,
}

/// Parses the plugin's response JSON and decodes its body. A `null` return
/// from the ABI call is handled upstream (`DispatchError::PluginReturnedNull`);
/// this only deals with malformed JSON *content*.
pub fn parse_response(raw: &str) -> Result<DecodedResponse, DispatchError> {
    let response: PluginHttpResponse =
        serde_json::from_str(raw).map_err(|_| DispatchError::RouteHandlerNotAvailable)?;

    let body = match (&response.body, response.body_encoding.as_deref()) {
        (None, _) => Vec::new(),
        (Some(body), Some("base64")) => {
            base64::Engine::decode(&base64::engine::general_purpose::STANDARD, body)
                .map_err(|_| DispatchError::RouteHandlerNotAvailable)?
        }
        (Some(body), _) => body.as_bytes().to_vec(),
    };

    Ok(DecodedResponse {
        status: response.status,
        headers: response.headers,
        body,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn build_request_lowercases_header_keys() {
        let mut headers = HashMap::new();
        headers.insert("X-Request-Id".to_string(), "abc".to_string());
        let request = build_request(BuildRequestArgs {
            route_id: "r1",
            method: "get",
            path: "/callback",
            query: HashMap::new(),
            headers,
            body: b"",
            remote_addr: "127.0.0.1",
            plugin_id: "com.example.echo",
            osaurus: OsaurusUrls {
                base_url: "http://127.0.0.1:8080".to_string(),
                plugin_url: "http://127.0.0.1:8080/plugins/com.example.echo".to_string(),
            },
        });
        assert_eq!(request.method, "GET");
        assert!(request.headers.contains_key("x-request-id"));
        assert!(!request.headers.contains_key("X-Request-Id"));
    }

    #[test]
    fn build_request_picks_utf8_for_text_body() {
        let request = build_request(BuildRequestArgs {
            route_id: "r1",
            method: "POST",
            path: "/callback",
            query: HashMap::new(),
            headers: HashMap::new(),
            body: b"hello",
            remote_addr: "127.0.0.1",
            plugin_id: "p",
            osaurus: OsaurusUrls {
                base_url: "http://x".to_string(),
                plugin_url: "http://x/plugins/p".to_string(),
            },
        });
        assert_eq!(request.body_encoding, "utf8");
        assert_eq!(request.body, "hello");
    }

    #[test]
    fn build_request_picks_base64_for_non_utf8_body() {
        let request = build_request(BuildRequestArgs {
            route_id: "r1",
            method: "POST",
            path: "/callback",
            query: HashMap::new(),
            headers: HashMap::new(),
            body: &[0xff, 0xfe, 0x00],
            remote_addr: "127.0.0.1",
            plugin_id: "p",
            osaurus: OsaurusUrls {
                base_url: "http://x".to_string(),
                plugin_url: "http://x/plugins/p".to_string(),
            },
        });
        assert_eq!(request.body_encoding, "base64");
    }

    #[test]
    fn parse_response_defaults_missing_encoding_to_utf8() {
        let decoded = parse_response(r#"{"status":200,"body":"hi"}"#).unwrap();
        assert_eq!(decoded.status, 200);
        assert_eq!(decoded.body, b"hi");
    }

    #[test]
    fn parse_response_decodes_base64_body() {
        let decoded =
            parse_response(r#"{"status":200,"body":"aGVsbG8=","body_encoding":"base64"}"#).unwrap();
        assert_eq!(decoded.body, b"hello");
    }

    #[test]
    fn parse_response_with_no_body_is_empty() {
        let decoded = parse_response(r#"{"status":204}"#).unwrap();
        assert!(decoded.body.is_empty());
    }

    #[test]
    fn parse_response_rejects_malformed_json() {
        assert!(parse_response("not json").is_err());
    }
}
