use std::time::Duration;

use once_cell::sync::OnceCell;
use reqwest::blocking::Client;

use crate::error::LlmError;

// Generation calls routinely take tens of seconds.
const REQUEST_TIMEOUT_SECS: u64 = 90;
const CONNECT_TIMEOUT_SECS: u64 = 10;
const USER_AGENT: &str = concat!("moneyball_scout/", env!("CARGO_PKG_VERSION"));

static CLIENT: OnceCell<Client> = OnceCell::new();

pub fn http_client() -> Result<&'static Client, LlmError> {
    CLIENT.get_or_try_init(|| {
        Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .user_agent(USER_AGENT)
            .build()
            .map_err(|e| LlmError::Connection(format!("failed to build http client: {e}")))
    })
}

pub(crate) fn classify_send_error(err: reqwest::Error) -> LlmError {
    if err.is_timeout() {
        LlmError::Timeout
    } else {
        LlmError::Connection(err.to_string())
    }
}
