use std::time::Duration;

use curl::easy::{Easy, List};
use serde::de::DeserializeOwned;
use serde_derive::Deserialize;
use serde_json::Value;

use super::{Portal, Session};
use crate::{
    config::PortalConfig,
    data_types::{
        rules::{PaceRules, UploadResult},
        run::RunPayload,
    },
    error::{Error, Result},
    logvbln,
};

const DEFAULT_TIMEOUT_SECS: u64 = 15;

#[derive(Deserialize, Debug)]
struct Envelope {
    code: i64,

    #[serde(default)]
    data: Option<Value>,

    #[serde(default, alias = "msg")]
    message: Option<String>,
}

#[derive(Deserialize, Debug)]
struct LoginData {
    #[serde(alias = "access_token")]
    token: String,
}

enum Method<'a> {
    Get,
    PostForm(&'a str),
    PostJson(&'a str),
}

/// Blocking HTTP implementation of [`Portal`] over libcurl.
pub struct PortalApi {
    config: PortalConfig,
}

impl PortalApi {
    const CC: &'static str = "PortalApi";

    pub fn new(config: PortalConfig) -> Self {
        Self { config }
    }

    fn timeout(&self) -> Duration {
        Duration::from_secs(self.config.timeout.unwrap_or(DEFAULT_TIMEOUT_SECS))
    }

    // Transport and decoding failures come back as a plain message; callers pick the error kind
    fn request(&self, url: &str, bearer: Option<&str>, method: Method) -> std::result::Result<Value, String> {
        if url.is_empty() {
            return Err("endpoint URL is not configured".to_string());
        }

        let mut handle = Easy::new();
        let mut list = List::new();

        handle.url(url).map_err(|e| e.to_string())?;
        handle.timeout(self.timeout()).map_err(|e| e.to_string())?;

        if let Some(bearer) = bearer {
            list.append(&format!("Authorization: {bearer}"))
                .map_err(|e| e.to_string())?;
        }

        match method {
            Method::Get => {
                handle.get(true).map_err(|e| e.to_string())?;
            }
            Method::PostForm(body) => {
                handle.post(true).map_err(|e| e.to_string())?;
                handle.post_fields_copy(body.as_bytes()).map_err(|e| e.to_string())?;
            }
            Method::PostJson(body) => {
                list.append("Content-Type: application/json")
                    .map_err(|e| e.to_string())?;
                handle.post(true).map_err(|e| e.to_string())?;
                handle.post_fields_copy(body.as_bytes()).map_err(|e| e.to_string())?;
            }
        }

        handle.http_headers(list).map_err(|e| e.to_string())?;

        let mut buffer_response = Vec::new();
        {
            let mut transfer = handle.transfer();

            transfer
                .write_function(|data| {
                    buffer_response.extend_from_slice(data);
                    Ok(data.len())
                })
                .map_err(|e| e.to_string())?;

            transfer.perform().map_err(|e| e.to_string())?;
        }

        let status = handle.response_code().map_err(|e| e.to_string())?;
        let body = std::str::from_utf8(&buffer_response).map_err(|e| e.to_string())?;
        logvbln!("{} -> HTTP {} ({} bytes)", url, status, body.len());

        if !(200..300).contains(&status) {
            return Err(format!("HTTP {status} from {url}"));
        }

        serde_json::from_str(body).map_err(|e| format!("invalid JSON from {url}: {e}"))
    }

    fn envelope(value: Value) -> std::result::Result<Envelope, String> {
        serde_json::from_value(value).map_err(|e| format!("unexpected response shape: {e}"))
    }

    fn decode<T: DeserializeOwned>(value: Value) -> std::result::Result<T, String> {
        serde_json::from_value(value).map_err(|e| format!("unexpected response shape: {e}"))
    }

    // Rules arrive either bare, under `rules`, or wrapped in `data`
    fn extract_rules(envelope: Envelope) -> std::result::Result<PaceRules, String> {
        if envelope.code != 0 {
            return Err(format!(
                "portal answered code {}: {}",
                envelope.code,
                envelope.message.unwrap_or_default()
            ));
        }

        let data = envelope.data.ok_or("no rules in response")?;
        let rules = data.get("rules").cloned().unwrap_or(data);

        PortalApi::decode(rules)
    }
}

impl Portal for PortalApi {
    fn login(&self, username: &str, password: &str) -> Result<Session> {
        let mut encoder = Easy::new();
        let form = format!(
            "username={}&password={}",
            encoder.url_encode(username.as_bytes()),
            encoder.url_encode(password.as_bytes())
        );

        let envelope = self
            .request(&self.config.login_url, None, Method::PostForm(&form))
            .and_then(PortalApi::envelope)
            .map_err(Error::Auth)?;

        if envelope.code != 0 {
            return Err(Error::Auth(
                envelope
                    .message
                    .unwrap_or_else(|| format!("login refused with code {}", envelope.code)),
            ));
        }

        let data: LoginData = envelope
            .data
            .ok_or_else(|| "login response carried no token".to_string())
            .and_then(PortalApi::decode)
            .map_err(Error::Auth)?;

        Ok(Session::new(data.token))
    }

    fn fetch_rules(&self, session: &Session) -> Result<PaceRules> {
        self.request(&self.config.rules_url, Some(session.token()), Method::Get)
            .and_then(PortalApi::envelope)
            .and_then(PortalApi::extract_rules)
            .map_err(Error::RuleFetch)
    }

    fn upload(&self, session: &Session, payload: &RunPayload) -> Result<UploadResult> {
        let body = serde_json::to_string(&[payload])
            .map_err(|e| Error::Upload(format!("failed to serialize payload: {e}")))?;

        self.request(&self.config.upload_url, Some(session.token()), Method::PostJson(&body))
            .and_then(PortalApi::decode)
            .map_err(Error::Upload)
    }
}

#[cfg(test)]
mod test {
    use serde_json::json;

    use super::*;

    #[test]
    fn rules_nested_under_data() {
        let envelope = PortalApi::envelope(json!({
            "code": 0,
            "data": {"rules": {"spmin": 200, "spmax": 500, "id": 6}}
        }))
        .unwrap();

        let rules = PortalApi::extract_rules(envelope).unwrap();
        assert_eq!(rules.min_pace_sec_per_km, 200.0);
        assert_eq!(rules.activity_type_id, 6);
    }

    #[test]
    fn rules_directly_in_data() {
        let envelope = PortalApi::envelope(json!({"code": 0, "data": {"spmax": 420}})).unwrap();

        let rules = PortalApi::extract_rules(envelope).unwrap();
        assert_eq!(rules.max_pace_sec_per_km, 420.0);
        assert_eq!(rules.min_pace_sec_per_km, 180.0);
    }

    #[test]
    fn rules_refused() {
        let envelope = PortalApi::envelope(json!({"code": 401, "msg": "expired"})).unwrap();

        let err = PortalApi::extract_rules(envelope).unwrap_err();
        assert_eq!(err, "portal answered code 401: expired");
    }

    #[test]
    fn unconfigured_endpoints_fail_without_network() {
        let api = PortalApi::new(PortalConfig::default());

        let err = api.login("runner", "secret").unwrap_err();
        assert_eq!(err, Error::Auth("endpoint URL is not configured".to_string()));

        let err = api.fetch_rules(&Session::new("t")).unwrap_err();
        assert_eq!(err.code(), "rule_fetch_error");
    }
}
