//! Transport seam between the delivery unit and the wire protocols

use async_trait::async_trait;
use std::time::Duration;

use crate::error::DeliveryError;
use crate::types::{PingAck, PingMethod, PingTarget};

/// One downstream service able to receive a ping
///
/// Implementations perform a single attempt and never retry on their own;
/// retries, backoff and the hard per-attempt deadline belong to
/// [`crate::delivery::deliver`]. Every failure is reported as a
/// [`DeliveryError`] variant so callers can classify it without inspecting
/// strings.
///
/// # Examples
///
/// ```no_run
/// use pingcast::ping::{PingTransport, XmlRpcClient};
/// use pingcast::types::PingTarget;
/// use std::time::Duration;
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let client = XmlRpcClient::new(reqwest::Client::new(), "http://rpc.pingomatic.com/");
/// let target = PingTarget::new("https://www.example.com/post", "https://example.com/feed");
///
/// match client.ping(&target, Duration::from_secs(10)).await {
///     Ok(ack) => println!("accepted: {}", ack.message),
///     Err(e) => println!("failed ({}): {}", e.reason(), e),
/// }
/// # Ok(())
/// # }
/// ```
#[async_trait]
pub trait PingTransport: Send + Sync {
    /// Send one ping for `target`
    ///
    /// `timeout` is the per-attempt budget; implementations pass it to the
    /// HTTP client so a slow service surfaces as [`DeliveryError::Timeout`].
    async fn ping(&self, target: &PingTarget, timeout: Duration) -> Result<PingAck, DeliveryError>;

    /// Protocol spoken by this transport
    fn method(&self) -> PingMethod;
}
