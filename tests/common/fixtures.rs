//! Canned XML-RPC responses and mock-server helpers

use wiremock::matchers::method;
use wiremock::{Mock, MockServer, ResponseTemplate};

/// Typical acknowledgement from a ping service
pub const THANKS: &str = "Thanks for the ping!";

/// `flerror=0` method response carrying `message`
pub fn xmlrpc_success(message: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<methodResponse>
  <params>
    <param>
      <value>
        <struct>
          <member><name>flerror</name><value><boolean>0</boolean></value></member>
          <member><name>message</name><value><string>{message}</string></value></member>
        </struct>
      </value>
    </param>
  </params>
</methodResponse>"#
    )
}

/// `<fault>` method response
pub fn xmlrpc_fault(code: i32, message: &str) -> String {
    format!(
        r#"<?xml version="1.0"?>
<methodResponse>
  <fault>
    <value>
      <struct>
        <member><name>faultCode</name><value><int>{code}</int></value></member>
        <member><name>faultString</name><value><string>{message}</string></value></member>
      </struct>
    </value>
  </fault>
</methodResponse>"#
    )
}

/// Mock server answering every POST with `template`
pub async fn mock_responding(template: ResponseTemplate) -> MockServer {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .respond_with(template)
        .mount(&server)
        .await;
    server
}

/// Mock XML-RPC endpoint that acknowledges every ping
pub async fn accepting_rpc() -> MockServer {
    mock_responding(ResponseTemplate::new(200).set_body_string(xmlrpc_success(THANKS))).await
}

/// Mock WebSub hub that accepts every publish
pub async fn accepting_hub() -> MockServer {
    mock_responding(ResponseTemplate::new(202)).await
}

/// Number of requests a mock server has received
pub async fn request_count(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .map(|requests| requests.len())
        .unwrap_or(0)
}
