use std::path::Path;
use std::time::Duration;

use tracing::{error, info};

use crate::bulk::BulkOperation;
use crate::config::ClientConfig;
use crate::error::Result;
use crate::request::RequestEngine;
use crate::session::WreqTransport;
use crate::transport::{ApiRequest, Transport};
use crate::types::{Envelope, FollowingPage, RelationAction, RelationRecord, UserInfo};

const FOLLOWINGS_PATH: &str = "/x/relation/followings";
const MODIFY_PATH: &str = "/x/relation/modify";
const NAV_PATH: &str = "/x/web-interface/nav";
/// Simulated latency of a dry-run mutation
const DRY_RUN_LATENCY: Duration = Duration::from_millis(100);

/// Client for the relation API of one account.
///
/// Holds its configuration for its whole lifetime; build a new client to
/// change any setting. All calls are issued sequentially.
pub struct RelationClient<T = WreqTransport> {
    config: ClientConfig,
    engine: RequestEngine<T>,
}

impl RelationClient<WreqTransport> {
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let transport = WreqTransport::new(&config)?;
        Self::with_transport(config, transport)
    }

    /// Load the config file and build a client from it.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        Self::new(ClientConfig::load(path)?)
    }
}

impl<T: Transport> RelationClient<T> {
    pub fn with_transport(config: ClientConfig, transport: T) -> Result<Self> {
        config.validate()?;
        let engine = RequestEngine::new(
            transport,
            config.settings.delay(),
            config.settings.max_retries,
        );
        Ok(Self { config, engine })
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    pub fn is_dry_run(&self) -> bool {
        self.config.settings.dry_run
    }

    pub(crate) fn delay(&self) -> Duration {
        self.engine.delay()
    }

    pub fn transport(&self) -> &T {
        self.engine.transport()
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.settings.api_base.trim_end_matches('/'), path)
    }

    /// Information about the logged-in account.
    pub async fn user_info(&self) -> Result<UserInfo> {
        let response = self.engine.execute(&ApiRequest::get(self.url(NAV_PATH))).await?;
        Envelope::parse(&response.body)?.into_data()
    }

    /// Fetch one page of the account's followings, newest first.
    pub async fn list_page(&self, page_number: u32, page_size: u32) -> Result<FollowingPage> {
        let request = ApiRequest::get(self.url(FOLLOWINGS_PATH))
            .query("vmid", &self.config.credentials.dede_user_id)
            .query("pn", page_number)
            .query("ps", page_size)
            .query("order", "desc");
        let response = self.engine.execute(&request).await?;
        Envelope::parse(&response.body)?.into_data()
    }

    /// Collect every followed account.
    ///
    /// Stops at the first empty or short page. A failing page ends the walk
    /// and whatever was collected so far is returned.
    pub async fn list_all(&self) -> Vec<RelationRecord> {
        let page_size = self.config.settings.batch_size;
        let mut all = Vec::new();
        let mut page_number = 1;

        info!("Fetching following list...");
        loop {
            let list = match self.list_page(page_number, page_size).await {
                Ok(page) => page.into_list(),
                Err(e) => {
                    error!(page = page_number, error = %e, "Failed to fetch following list");
                    break;
                }
            };
            if list.is_empty() {
                break;
            }

            let returned = list.len();
            all.extend(list);
            info!("Fetched {} followings", all.len());

            if returned < page_size as usize {
                break;
            }
            page_number += 1;
            tokio::time::sleep(self.delay()).await;
        }

        info!("Total followings: {}", all.len());
        all
    }

    /// Apply `action` to one account. Never fails: every problem is logged
    /// and reported as `false`.
    pub async fn mutate(&self, id: u64, action: RelationAction) -> bool {
        if self.is_dry_run() {
            tokio::time::sleep(DRY_RUN_LATENCY).await;
            return true;
        }

        let request = ApiRequest::post(self.url(MODIFY_PATH))
            .form("fid", id)
            .form("act", action.code())
            .form("csrf", &self.config.credentials.bili_jct);

        let result = match self.engine.execute(&request).await {
            Ok(response) => Envelope::parse(&response.body).and_then(Envelope::check),
            Err(e) => Err(e),
        };
        match result {
            Ok(_) => true,
            Err(e) => {
                error!(id, %action, error = %e, "Relation change failed");
                false
            }
        }
    }

    pub async fn follow(&self, id: u64) -> bool {
        self.mutate(id, RelationAction::Follow).await
    }

    pub async fn unfollow(&self, id: u64) -> bool {
        self.mutate(id, RelationAction::Unfollow).await
    }

    /// Start configuring a bulk unfollow of every followed account.
    pub fn unfollow_all(&self) -> BulkOperation<'_, T> {
        BulkOperation::new(self, RelationAction::Unfollow, None)
    }

    /// Start configuring `action` over a given candidate list, in order.
    pub fn bulk(
        &self,
        action: RelationAction,
        candidates: Vec<RelationRecord>,
    ) -> BulkOperation<'_, T> {
        BulkOperation::new(self, action, Some(candidates))
    }
}

#[cfg(test)]
mod tests {
    use tokio::time::Instant;

    use super::*;
    use crate::error::Error;
    use crate::test_support::{FakeRemote, ScriptedTransport, ok_json, records, test_config};
    use crate::transport::{Method, RawResponse};

    fn client_with<T: Transport>(transport: T, page_size: u32) -> RelationClient<T> {
        let mut config = test_config();
        config.settings.batch_size = page_size;
        RelationClient::with_transport(config, transport).unwrap()
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_all_stops_on_short_page() {
        for page_size in [1u32, 3, 7, 10, 50] {
            let client = client_with(FakeRemote::new(records(10)), page_size);
            let all = client.list_all().await;

            let ids: Vec<u64> = all.iter().map(|r| r.mid).collect();
            assert_eq!(ids, (1..=10).collect::<Vec<_>>(), "page size {page_size}");

            // A full last page needs one more (empty) request to confirm the end
            let expected_pages = 10 / page_size as usize + 1;
            let pages = client.transport().requests_to(FOLLOWINGS_PATH);
            assert_eq!(pages.len(), expected_pages, "page size {page_size}");
            for (i, request) in pages.iter().enumerate() {
                assert_eq!(request.param("pn"), Some((i + 1).to_string().as_str()));
                assert_eq!(request.param("vmid"), Some("1000"));
                assert_eq!(request.param("order"), Some("desc"));
            }
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_all_sleeps_between_full_pages() {
        let client = client_with(FakeRemote::new(records(5)), 2);
        let start = Instant::now();
        assert_eq!(client.list_all().await.len(), 5);
        // pages 1 and 2 are full, page 3 is short
        assert_eq!(start.elapsed(), Duration::from_secs(2));
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_all_keeps_partial_results_on_failure() {
        let mut config = test_config();
        config.settings.batch_size = 2;
        config.settings.max_retries = 0;
        let remote = FakeRemote::new(records(6)).break_page(2);
        let client = RelationClient::with_transport(config, remote).unwrap();

        let all = client.list_all().await;
        assert_eq!(all.iter().map(|r| r.mid).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_list_all_stops_on_rejected_page() {
        let client = client_with(
            ScriptedTransport::new(vec![ok_json(serde_json::json!({
                "code": -101, "message": "account not logged in"
            }))]),
            50,
        );
        assert!(client.list_all().await.is_empty());
        assert_eq!(client.transport().calls(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutate_sends_form_and_interprets_code() {
        let client = client_with(FakeRemote::new(records(3)).reject(&[2]), 50);
        assert!(client.unfollow(1).await);
        assert!(!client.unfollow(2).await);
        assert!(client.follow(3).await);

        let calls = client.transport().requests_to(MODIFY_PATH);
        assert_eq!(calls.len(), 3);
        assert_eq!(calls[0].method, Method::Post);
        assert_eq!(calls[0].param("fid"), Some("1"));
        assert_eq!(calls[0].param("act"), Some("2"));
        assert_eq!(calls[0].param("csrf"), Some("csrf-token"));
        assert_eq!(calls[2].param("act"), Some("1"));
    }

    #[tokio::test(start_paused = true)]
    async fn test_mutate_converts_exhaustion_to_false() {
        let client = client_with(
            ScriptedTransport::new(vec![
                Ok(RawResponse::new(502, "")),
                Ok(RawResponse::new(502, "")),
                Ok(RawResponse::new(502, "")),
            ]),
            50,
        );
        assert!(!client.unfollow(9).await);
        assert_eq!(client.transport().calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_dry_run_mutate_skips_network() {
        let mut config = test_config();
        config.settings.dry_run = true;
        let client = RelationClient::with_transport(config, ScriptedTransport::new(vec![])).unwrap();

        let start = Instant::now();
        assert!(client.unfollow(1).await);
        assert_eq!(start.elapsed(), DRY_RUN_LATENCY);
        assert_eq!(client.transport().calls(), 0);
    }

    #[tokio::test]
    async fn test_user_info() {
        let client = client_with(FakeRemote::new(vec![]), 50);
        let user = client.user_info().await.unwrap();
        assert_eq!(user.mid, 1000);
        assert_eq!(user.uname, "tester");
        assert_eq!(user.level(), 5);
        assert_eq!(user.extra.get("isLogin"), Some(&serde_json::Value::Bool(true)));
    }

    #[test]
    fn test_construction_rejects_incomplete_credentials() {
        let mut config = test_config();
        config.credentials.bili_jct.clear();
        let err = RelationClient::with_transport(config, ScriptedTransport::new(vec![]))
            .err()
            .unwrap();
        assert!(matches!(err, Error::ConfigMalformed(_)));
    }
}
