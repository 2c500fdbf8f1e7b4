use std::io::Read;
use std::time::Duration;

use crate::error::{KintsugiError, Result};

/// Thin HTTP layer over a configured [`ureq::Agent`].
///
/// Every request is made exactly once; transport and status failures map to
/// [`KintsugiError::Http`] and the caller decides whether that is fatal.
pub struct Fetcher {
    agent: ureq::Agent,
}

impl Fetcher {
    pub fn new(user_agent: &str, connect_timeout: Duration, read_timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .user_agent(user_agent)
            .timeout_connect(connect_timeout)
            .timeout_read(read_timeout)
            .build();
        Self { agent }
    }

    /// GET a page body as text.
    pub fn text(&self, url: &str) -> Result<String> {
        let resp = self
            .agent
            .get(url)
            .call()
            .map_err(|e| KintsugiError::Http(format!("GET {url}: {e}")))?;
        resp.into_string().map_err(KintsugiError::Io)
    }

    /// GET a page body as text, mapping HTTP 404 to `Ok(None)`. Listing
    /// pagination uses the 404 as its end marker.
    pub fn text_opt(&self, url: &str) -> Result<Option<String>> {
        match self.agent.get(url).call() {
            Ok(resp) => Ok(Some(resp.into_string().map_err(KintsugiError::Io)?)),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(e) => Err(KintsugiError::Http(format!("GET {url}: {e}"))),
        }
    }

    /// GET a binary body.
    pub fn bytes(&self, url: &str) -> Result<Vec<u8>> {
        let resp = self
            .agent
            .get(url)
            .call()
            .map_err(|e| KintsugiError::Http(format!("GET {url}: {e}")))?;
        let mut buf = Vec::new();
        resp.into_reader()
            .read_to_end(&mut buf)
            .map_err(KintsugiError::Io)?;
        Ok(buf)
    }
}
