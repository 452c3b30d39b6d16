use std::time::Duration;

use crate::error::RelayError;

/// Outbound HTTP seam for status updates.
///
/// Returns the HTTP status code of the response, or a `TransportFault` when no
/// response was received.
pub trait StatusTransport: Send {
    fn put(&self, url: &str, content_type: &str, body: &str) -> Result<u16, RelayError>;
}

/// Blocking `ureq` transport with a per-request timeout.
pub struct UreqTransport {
    agent: ureq::Agent,
}

impl UreqTransport {
    pub fn new(timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout(timeout)
            .build();
        Self { agent }
    }
}

impl StatusTransport for UreqTransport {
    fn put(&self, url: &str, content_type: &str, body: &str) -> Result<u16, RelayError> {
        match self
            .agent
            .put(url)
            .set("Content-Type", content_type)
            .send_string(body)
        {
            Ok(response) => Ok(response.status()),
            Err(ureq::Error::Status(code, _)) => Ok(code),
            Err(ureq::Error::Transport(err)) => Err(RelayError::TransportFault(err.to_string())),
        }
    }
}
