//! Request engine: bounded retries with a fixed delay.

use std::time::Duration;

use tracing::{info, warn};

use crate::error::{Error, Result};
use crate::transport::{ApiRequest, RawResponse, Transport};

const STATUS_OK: u16 = 200;
/// Status the API answers with when the caller is being throttled
const STATUS_RATE_LIMITED: u16 = 412;
pub(crate) const RATE_LIMIT_FACTOR: u32 = 3;

/// Issues requests through a transport, retrying up to `max_retries` times.
///
/// The delay between attempts is constant. A rate-limited answer waits an
/// extra `3 × delay` on top of it; there is no exponential growth.
pub struct RequestEngine<T> {
    transport: T,
    delay: Duration,
    max_retries: u32,
}

impl<T: Transport> RequestEngine<T> {
    pub fn new(transport: T, delay: Duration, max_retries: u32) -> Self {
        Self {
            transport,
            delay,
            max_retries,
        }
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// Send `request` until it answers 200 or the attempt budget is spent.
    pub async fn execute(&self, request: &ApiRequest) -> Result<RawResponse> {
        for attempt in 0..=self.max_retries {
            match self.transport.send(request).await {
                Ok(response) if response.status == STATUS_OK => return Ok(response),
                Ok(response) if response.status == STATUS_RATE_LIMITED => {
                    warn!(url = %request.url, "Rate limited, backing off");
                    tokio::time::sleep(self.delay.saturating_mul(RATE_LIMIT_FACTOR)).await;
                }
                Ok(response) => {
                    warn!(url = %request.url, status = response.status, "Request failed");
                }
                Err(e) => {
                    warn!(url = %request.url, error = %e, "Request error");
                }
            }

            if attempt < self.max_retries {
                info!("Retrying ({}/{})...", attempt + 1, self.max_retries);
                tokio::time::sleep(self.delay).await;
            }
        }

        Err(Error::RequestExhausted {
            retries: self.max_retries,
        })
    }
}
