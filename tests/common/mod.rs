use bili_relations_rs::{ClientConfig, CredentialBundle};
use serde_json::{Value, json};

pub fn config(api_base: &str) -> ClientConfig {
    let creds = CredentialBundle::from_cookie_header("SESSDATA=s; bili_jct=c; DedeUserID=42");
    let mut config = ClientConfig::from_credentials(creds);
    config.settings.api_base = api_base.to_string();
    config.settings.delay_secs = 0.0;
    config.settings.max_retries = 1;
    config
}

pub fn record(mid: u64) -> Value {
    json!({"mid": mid, "uname": format!("up{mid}"), "sign": "", "mtime": 1_700_000_000u64})
}
