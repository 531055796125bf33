//! In-memory transports for unit tests.

use std::collections::{HashSet, VecDeque};
use std::sync::Mutex;

use serde_json::{Value, json};

use crate::config::ClientConfig;
use crate::credential::CredentialBundle;
use crate::error::{Error, Result};
use crate::transport::{ApiRequest, RawResponse, Transport};

pub(crate) fn test_config() -> ClientConfig {
    let creds = CredentialBundle::from_cookie_header("SESSDATA=sess; bili_jct=csrf-token; DedeUserID=1000");
    let mut config = ClientConfig::from_credentials(creds);
    config.settings.api_base = "https://api.test".to_string();
    config.settings.delay_secs = 1.0;
    config.settings.max_retries = 2;
    config.settings.batch_size = 50;
    config
}

pub(crate) fn ok_json(value: Value) -> Result<RawResponse> {
    Ok(RawResponse::new(200, value.to_string()))
}

pub(crate) fn records(count: u64) -> Vec<Value> {
    (1..=count)
        .map(|mid| {
            json!({
                "mid": mid,
                "uname": format!("user{mid}"),
                "sign": "hello",
                "mtime": 1_700_000_000 + mid,
                "face": format!("https://i0.hdslb.com/{mid}.jpg"),
            })
        })
        .collect()
}

/// Replays a fixed list of outcomes, one per call.
pub(crate) struct ScriptedTransport {
    script: Mutex<VecDeque<Result<RawResponse>>>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl ScriptedTransport {
    pub(crate) fn new(script: Vec<Result<RawResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn calls(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

impl Transport for ScriptedTransport {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(Error::Transport("script exhausted".into())))
    }
}

/// Serves the three endpoints from an in-memory following list.
pub(crate) struct FakeRemote {
    following: Vec<Value>,
    rejected: HashSet<u64>,
    broken_pages: HashSet<u32>,
    requests: Mutex<Vec<ApiRequest>>,
}

impl FakeRemote {
    pub(crate) fn new(following: Vec<Value>) -> Self {
        Self {
            following,
            rejected: HashSet::new(),
            broken_pages: HashSet::new(),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Mutations of these ids answer with a non-zero code.
    pub(crate) fn reject(mut self, ids: &[u64]) -> Self {
        self.rejected.extend(ids);
        self
    }

    /// These page numbers fail at the transport level.
    pub(crate) fn break_page(mut self, page: u32) -> Self {
        self.broken_pages.insert(page);
        self
    }

    pub(crate) fn requests_to(&self, path: &str) -> Vec<ApiRequest> {
        self.requests
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.url.ends_with(path))
            .cloned()
            .collect()
    }

    fn page(&self, request: &ApiRequest) -> Result<RawResponse> {
        let pn: usize = request.param("pn").and_then(|v| v.parse().ok()).unwrap_or(1);
        let ps: usize = request.param("ps").and_then(|v| v.parse().ok()).unwrap_or(50);
        if self.broken_pages.contains(&(pn as u32)) {
            return Err(Error::Transport("connection reset".into()));
        }
        let list: Vec<Value> = self
            .following
            .iter()
            .skip((pn - 1) * ps)
            .take(ps)
            .cloned()
            .collect();
        ok_json(json!({
            "code": 0,
            "message": "0",
            "data": {"list": list, "total": self.following.len()}
        }))
    }

    fn modify(&self, request: &ApiRequest) -> Result<RawResponse> {
        let fid: u64 = request.param("fid").and_then(|v| v.parse().ok()).unwrap_or(0);
        if self.rejected.contains(&fid) {
            ok_json(json!({"code": 22014, "message": "already unfollowed"}))
        } else {
            ok_json(json!({"code": 0, "message": "0", "ttl": 1}))
        }
    }
}

impl Transport for FakeRemote {
    async fn send(&self, request: &ApiRequest) -> Result<RawResponse> {
        self.requests.lock().unwrap().push(request.clone());
        if request.url.ends_with("/x/relation/followings") {
            self.page(request)
        } else if request.url.ends_with("/x/relation/modify") {
            self.modify(request)
        } else if request.url.ends_with("/x/web-interface/nav") {
            ok_json(json!({
                "code": 0,
                "message": "0",
                "data": {"isLogin": true, "mid": 1000, "uname": "tester", "money": 12.5,
                         "level_info": {"current_level": 5}}
            }))
        } else {
            Ok(RawResponse::new(404, "not found"))
        }
    }
}
