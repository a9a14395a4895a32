//! XML-RPC `weblogUpdates.ping` codec and transport
//!
//! Requests are built by hand (two string params, fully escaped). Responses
//! are read with `quick-xml`, which copes with arbitrary whitespace, CDATA
//! sections, numeric/predefined entities and untagged `<value>` strings.
//!
//! A `<fault>` element anywhere in the response is a failure, whatever
//! `flerror` says. A response with neither a fault nor an `flerror` member
//! is treated as a failure too.

use async_trait::async_trait;
use quick_xml::Reader;
use quick_xml::escape::escape;
use quick_xml::events::Event;
use reqwest::header::{CONTENT_TYPE, USER_AGENT};
use std::time::Duration;

use super::http::{self, check_status};
use super::traits::PingTransport;
use crate::error::DeliveryError;
use crate::types::{PingAck, PingMethod, PingTarget};

/// XML-RPC method invoked on every endpoint
pub const PING_METHOD: &str = "weblogUpdates.ping";

/// Message reported when a response has no recognizable structure
pub const UNPARSEABLE_MESSAGE: &str = "Could not parse XML-RPC response";

/// Maximum nesting depth accepted while scanning a response
const MAX_DEPTH: usize = 32;

/// Build the `weblogUpdates.ping` method call body
pub fn build_request(site_name: &str, site_url: &str) -> String {
    format!(
        "<?xml version=\"1.0\"?>\n\
         <methodCall>\n\
         \x20 <methodName>{PING_METHOD}</methodName>\n\
         \x20 <params>\n\
         \x20   <param><value><string>{}</string></value></param>\n\
         \x20   <param><value><string>{}</string></value></param>\n\
         \x20 </params>\n\
         </methodCall>\n",
        escape(site_name),
        escape(site_url),
    )
}

/// Decoded `weblogUpdates.ping` response
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlRpcResponse {
    /// True for `<fault>`, `flerror` true, or an unparseable body
    pub is_fault: bool,
    /// Service message, fault string, or [`UNPARSEABLE_MESSAGE`]
    pub message: String,
}

impl XmlRpcResponse {
    fn unparseable() -> Self {
        Self {
            is_fault: true,
            message: UNPARSEABLE_MESSAGE.to_string(),
        }
    }
}

/// Decode a method response body
pub fn parse_response(body: &str) -> XmlRpcResponse {
    match scan(body) {
        Ok(scanned) => scanned.into_response(),
        Err(e) => {
            tracing::debug!(error = %e, "malformed XML-RPC response");
            XmlRpcResponse::unparseable()
        }
    }
}

/// A `<member>` being read
#[derive(Default)]
struct OpenMember {
    name: String,
    value: String,
    in_name: bool,
    value_depth: usize,
}

/// Everything the scanner found
#[derive(Default)]
struct Scanned {
    fault: bool,
    members: Vec<(String, String)>,
}

impl Scanned {
    fn member(&self, name: &str) -> Option<&str> {
        self.members
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    fn into_response(self) -> XmlRpcResponse {
        if self.fault {
            let fault_string = self.member("faultString").filter(|s| !s.is_empty());
            let fault_code = self.member("faultCode").filter(|s| !s.is_empty());
            let message = match (fault_string, fault_code) {
                (Some(text), Some(code)) => format!("{text} (fault {code})"),
                (Some(text), None) => text.to_string(),
                (None, Some(code)) => format!("XML-RPC fault {code}"),
                (None, None) => "XML-RPC fault".to_string(),
            };
            return XmlRpcResponse {
                is_fault: true,
                message,
            };
        }

        let Some(flerror) = self.member("flerror") else {
            return XmlRpcResponse::unparseable();
        };
        let is_fault = !matches!(flerror.to_ascii_lowercase().as_str(), "0" | "false");
        let message = match self.member("message").filter(|m| !m.is_empty()) {
            Some(message) => message.to_string(),
            None if is_fault => "Service reported an error".to_string(),
            None => "Ping accepted".to_string(),
        };

        XmlRpcResponse { is_fault, message }
    }
}

fn scan(body: &str) -> Result<Scanned, String> {
    let mut reader = Reader::from_str(body);
    reader.config_mut().trim_text(true);

    let mut scanned = Scanned::default();
    let mut open: Vec<OpenMember> = Vec::new();
    let mut depth = 0usize;

    loop {
        match reader.read_event().map_err(|e| e.to_string())? {
            Event::Start(e) => {
                depth += 1;
                if depth > MAX_DEPTH {
                    return Err(format!("nesting deeper than {MAX_DEPTH} levels"));
                }
                let name = e.local_name().as_ref().to_ascii_lowercase();
                match name.as_slice() {
                    b"fault" => scanned.fault = true,
                    b"member" => open.push(OpenMember::default()),
                    b"name" => {
                        if let Some(member) = open.last_mut() {
                            member.in_name = true;
                        }
                    }
                    b"value" => {
                        if let Some(member) = open.last_mut() {
                            member.value_depth += 1;
                        }
                    }
                    _ => {}
                }
            }
            Event::End(e) => {
                depth = depth.saturating_sub(1);
                let name = e.local_name().as_ref().to_ascii_lowercase();
                match name.as_slice() {
                    b"member" => {
                        if let Some(member) = open.pop() {
                            scanned.members.push((
                                member.name.trim().to_string(),
                                member.value.trim().to_string(),
                            ));
                        }
                    }
                    b"name" => {
                        if let Some(member) = open.last_mut() {
                            member.in_name = false;
                        }
                    }
                    b"value" => {
                        if let Some(member) = open.last_mut() {
                            member.value_depth = member.value_depth.saturating_sub(1);
                        }
                    }
                    _ => {}
                }
            }
            Event::Empty(e) => {
                if e.local_name().as_ref().eq_ignore_ascii_case(b"fault") {
                    scanned.fault = true;
                }
            }
            Event::Text(text) => {
                let decoded = match text.unescape() {
                    Ok(decoded) => decoded.into_owned(),
                    Err(_) => String::from_utf8_lossy(&text).into_owned(),
                };
                append_text(&mut open, &decoded);
            }
            Event::CData(cdata) => {
                append_text(&mut open, &String::from_utf8_lossy(&cdata));
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(scanned)
}

fn append_text(open: &mut [OpenMember], text: &str) {
    let Some(member) = open.last_mut() else {
        return;
    };
    if member.in_name {
        member.name.push_str(text);
    } else if member.value_depth > 0 {
        member.value.push_str(text);
    }
}

/// Transport for one XML-RPC ping endpoint
#[derive(Clone)]
pub struct XmlRpcClient {
    client: reqwest::Client,
    endpoint: String,
}

impl XmlRpcClient {
    /// Create a client posting to `endpoint`
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
        }
    }
}

#[async_trait]
impl PingTransport for XmlRpcClient {
    async fn ping(&self, target: &PingTarget, timeout: Duration) -> Result<PingAck, DeliveryError> {
        let body = build_request(&target.site_name, &target.site_url);

        let response = self
            .client
            .post(&self.endpoint)
            .header(CONTENT_TYPE, "text/xml; charset=utf-8")
            .header(USER_AGENT, http::USER_AGENT)
            .timeout(timeout)
            .body(body)
            .send()
            .await
            .map_err(|e| DeliveryError::from_transport(&e, timeout))?;

        let response = check_status(response).await?;
        let status = response.status().as_u16();
        let text = response
            .text()
            .await
            .map_err(|e| DeliveryError::from_transport(&e, timeout))?;

        let parsed = parse_response(&text);
        if parsed.is_fault {
            return Err(DeliveryError::Protocol {
                message: parsed.message,
            });
        }

        Ok(PingAck {
            message: parsed.message,
            status: Some(status),
        })
    }

    fn method(&self) -> PingMethod {
        PingMethod::XmlRpc
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_string_contains, header, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const THANKS: &str = "Thanks for the ping!";

    fn success_body(message_value: &str) -> String {
        format!(
            "<?xml version=\"1.0\"?><methodResponse><params><param><value><struct>\
             <member><name>flerror</name><value><boolean>0</boolean></value></member>\
             <member><name>message</name><value>{message_value}</value></member>\
             </struct></value></param></params></methodResponse>"
        )
    }

    #[test]
    fn request_names_method_and_escapes_params() {
        let body = build_request("Tom & Jerry's <\"blog\">", "https://example.com/?a=1&b=2");

        assert!(body.contains("<methodName>weblogUpdates.ping</methodName>"));
        assert!(body.contains(
            "<string>Tom &amp; Jerry&apos;s &lt;&quot;blog&quot;&gt;</string>"
        ));
        assert!(body.contains("<string>https://example.com/?a=1&amp;b=2</string>"));
        assert!(!body.contains("Jerry's"));
    }

    #[test]
    fn escaped_request_round_trips_through_an_xml_reader() {
        let body = build_request("</string></value><evil>", "https://example.com/");
        let mut reader = Reader::from_str(&body);
        let mut strings = Vec::new();
        let mut in_string = false;
        loop {
            match reader.read_event().unwrap() {
                Event::Start(e) if e.local_name().as_ref() == b"string" => in_string = true,
                Event::End(e) if e.local_name().as_ref() == b"string" => in_string = false,
                Event::Text(t) if in_string => strings.push(t.unescape().unwrap().into_owned()),
                Event::Start(e) => assert_ne!(e.local_name().as_ref(), b"evil"),
                Event::Eof => break,
                _ => {}
            }
        }
        assert_eq!(strings, vec!["</string></value><evil>", "https://example.com/"]);
    }

    #[test]
    fn parses_plain_string_message() {
        let parsed = parse_response(&success_body(&format!("<string>{THANKS}</string>")));
        assert_eq!(
            parsed,
            XmlRpcResponse {
                is_fault: false,
                message: THANKS.to_string()
            }
        );
    }

    #[test]
    fn parses_cdata_message() {
        let parsed = parse_response(&success_body(&format!(
            "<string><![CDATA[{THANKS}]]></string>"
        )));
        assert!(!parsed.is_fault);
        assert_eq!(parsed.message, THANKS);
    }

    #[test]
    fn parses_entity_encoded_message() {
        let parsed = parse_response(&success_body(
            "<string>Thanks for the ping&#33;</string>",
        ));
        assert_eq!(parsed.message, THANKS);

        let parsed = parse_response(&success_body(
            "<string>Thanks for the ping&#x21;</string>",
        ));
        assert_eq!(parsed.message, THANKS);

        let parsed = parse_response(&success_body("<string>Tom &amp; Jerry</string>"));
        assert_eq!(parsed.message, "Tom & Jerry");
    }

    #[test]
    fn parses_bare_untagged_value() {
        let parsed = parse_response(&success_body(THANKS));
        assert!(!parsed.is_fault);
        assert_eq!(parsed.message, THANKS);
    }

    #[test]
    fn tolerates_whitespace_between_tags() {
        let body = format!(
            "<?xml version=\"1.0\"?>\n<methodResponse>\n  <params>\n    <param>\n      <value>\n        <struct>\n\
             \t<member>\n\t  <name> flerror </name>\n\t  <value>\n\t    <boolean> 0 </boolean>\n\t  </value>\n\t</member>\n\
             \t<member>\n\t  <name>message</name>\n\t  <value>\n\t    <string>\n   {THANKS}\n   </string>\n\t  </value>\n\t</member>\n\
             \x20       </struct>\n      </value>\n    </param>\n  </params>\n</methodResponse>\n"
        );
        let parsed = parse_response(&body);
        assert_eq!(
            parsed,
            XmlRpcResponse {
                is_fault: false,
                message: THANKS.to_string()
            }
        );
    }

    #[test]
    fn flerror_true_is_a_fault() {
        let body = "<methodResponse><params><param><value><struct>\
             <member><name>flerror</name><value><boolean>1</boolean></value></member>\
             <member><name>message</name><value><string>Blog not found</string></value></member>\
             </struct></value></param></params></methodResponse>";
        let parsed = parse_response(body);
        assert!(parsed.is_fault);
        assert_eq!(parsed.message, "Blog not found");
    }

    #[test]
    fn fault_block_wins_over_stray_flerror() {
        let body = "<methodResponse><fault><value><struct>\
             <member><name>faultCode</name><value><int>4</int></value></member>\
             <member><name>faultString</name><value><string>Too many pings</string></value></member>\
             <member><name>flerror</name><value><boolean>0</boolean></value></member>\
             </struct></value></fault></methodResponse>";
        let parsed = parse_response(body);
        assert!(parsed.is_fault);
        assert_eq!(parsed.message, "Too many pings (fault 4)");
    }

    #[test]
    fn fault_without_members_still_fails() {
        let parsed = parse_response("<methodResponse><fault/></methodResponse>");
        assert!(parsed.is_fault);
        assert_eq!(parsed.message, "XML-RPC fault");
    }

    #[test]
    fn unrecognized_structure_fails_closed() {
        for body in [
            "",
            "Thanks for the ping!",
            "<html><body>502 Bad Gateway</body></html>",
            "<methodResponse><params><param><value><string>ok</string></value></param></params></methodResponse>",
            "<methodResponse><params><param><value><struct>",
        ] {
            let parsed = parse_response(body);
            assert!(parsed.is_fault, "{body:?} must not be treated as success");
            assert_eq!(parsed.message, UNPARSEABLE_MESSAGE);
        }
    }

    #[test]
    fn missing_message_gets_a_default() {
        let body = "<methodResponse><params><param><value><struct>\
             <member><name>flerror</name><value><boolean>0</boolean></value></member>\
             </struct></value></param></params></methodResponse>";
        let parsed = parse_response(body);
        assert!(!parsed.is_fault);
        assert_eq!(parsed.message, "Ping accepted");
    }

    #[tokio::test]
    async fn client_posts_xml_and_reads_acknowledgement() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header("content-type", "text/xml; charset=utf-8"))
            .and(body_string_contains("<string>example.com</string>"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_string(success_body(&format!("<string>{THANKS}</string>"))),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = XmlRpcClient::new(reqwest::Client::new(), server.uri());
        let target = PingTarget::new("https://www.example.com/post", "https://feed.example.com/");
        let ack = client.ping(&target, Duration::from_secs(5)).await.unwrap();

        assert_eq!(ack.message, THANKS);
        assert_eq!(ack.status, Some(200));
    }

    #[tokio::test]
    async fn client_reports_fault_as_protocol_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string(
                "<methodResponse><fault><value><struct>\
                 <member><name>faultString</name><value>Slow down</value></member>\
                 </struct></value></fault></methodResponse>",
            ))
            .mount(&server)
            .await;

        let client = XmlRpcClient::new(reqwest::Client::new(), server.uri());
        let target = PingTarget::new("https://example.com/", "https://feed.example.com/");
        let err = client.ping(&target, Duration::from_secs(5)).await.unwrap_err();

        assert_eq!(
            err,
            DeliveryError::Protocol {
                message: "Slow down".to_string()
            }
        );
    }

    #[tokio::test]
    async fn client_maps_server_errors() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(502))
            .mount(&server)
            .await;

        let client = XmlRpcClient::new(reqwest::Client::new(), server.uri());
        let target = PingTarget::new("https://example.com/", "https://feed.example.com/");
        let err = client.ping(&target, Duration::from_secs(5)).await.unwrap_err();

        assert_eq!(
            err,
            DeliveryError::Server {
                status: 502,
                message: "HTTP 502: Bad Gateway".to_string()
            }
        );
    }
}
