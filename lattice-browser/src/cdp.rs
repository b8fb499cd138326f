//! Chromedriver CDP passthrough.
//!
//! WebDriver classic has no network-interception surface, but chromedriver
//! exposes raw DevTools commands on a vendor endpoint. This wraps that
//! endpoint as a [`WebDriverCompatibleCommand`] so it can be issued through
//! the regular `fantoccini` client.

use fantoccini::wd::WebDriverCompatibleCommand;
use serde_json::json;

/// One DevTools command (`cmd` + `params`) sent to
/// `session/{id}/goog/cdp/execute`.
#[derive(Debug, Clone)]
pub(crate) struct CdpCommand {
    cmd: &'static str,
    params: serde_json::Value,
}

impl CdpCommand {
    pub(crate) fn new(cmd: &'static str, params: serde_json::Value) -> Self {
        Self { cmd, params }
    }
}

impl WebDriverCompatibleCommand for CdpCommand {
    fn endpoint(
        &self,
        base_url: &url::Url,
        session_id: Option<&str>,
    ) -> Result<url::Url, url::ParseError> {
        let session = session_id.unwrap_or_default();
        base_url.join(&format!("session/{session}/goog/cdp/execute"))
    }

    fn method_and_body(&self, _request_url: &url::Url) -> (http::Method, Option<String>) {
        let body = json!({ "cmd": self.cmd, "params": self.params }).to_string();
        (http::Method::POST, Some(body))
    }

    fn is_new_session(&self) -> bool {
        false
    }

    fn is_legacy(&self) -> bool {
        false
    }
}
