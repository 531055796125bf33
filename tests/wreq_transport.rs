mod common;

use bili_relations_rs::{Error, RelationClient};
use serde_json::json;
use wiremock::matchers::{body_string_contains, header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(ids: std::ops::RangeInclusive<u64>) -> serde_json::Value {
    let list: Vec<_> = ids.map(common::record).collect();
    json!({"code": 0, "message": "0", "data": {"list": list, "total": 5}})
}

async fn client_for(server: &MockServer) -> RelationClient {
    let mut config = common::config(&server.uri());
    config.settings.batch_size = 3;
    RelationClient::new(config).unwrap()
}

#[tokio::test]
async fn list_all_walks_pages_with_session_cookie() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/relation/followings"))
        .and(query_param("vmid", "42"))
        .and(query_param("pn", "1"))
        .and(query_param("ps", "3"))
        .and(header("cookie", "SESSDATA=s; bili_jct=c; DedeUserID=42"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(1..=3)))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x/relation/followings"))
        .and(query_param("pn", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(page(4..=5)))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let all = client.list_all().await;
    assert_eq!(all.iter().map(|r| r.mid).collect::<Vec<_>>(), vec![1, 2, 3, 4, 5]);
    assert_eq!(all[3].uname, "up4");
    assert_eq!(all[0].extra.get("mtime"), Some(&json!(1_700_000_000u64)));
}

#[tokio::test]
async fn mutate_posts_urlencoded_form() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x/relation/modify"))
        .and(header("content-type", "application/x-www-form-urlencoded"))
        .and(body_string_contains("fid=7"))
        .and(body_string_contains("act=2"))
        .and(body_string_contains("csrf=c"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"code": 0, "message": "0"})))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(client.unfollow(7).await);
}

#[tokio::test]
async fn rate_limited_request_is_retried() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/web-interface/nav"))
        .respond_with(ResponseTemplate::new(412))
        .up_to_n_times(1)
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/x/web-interface/nav"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "code": 0,
            "message": "0",
            "data": {"mid": 42, "uname": "me", "money": 3.0, "level_info": {"current_level": 2}}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let user = client.user_info().await.unwrap();
    assert_eq!(user.uname, "me");
    assert_eq!(user.level(), 2);
}

#[tokio::test]
async fn server_errors_exhaust_the_retry_budget() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/x/web-interface/nav"))
        .respond_with(ResponseTemplate::new(500))
        .expect(2)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.user_info().await.err().unwrap();
    assert!(matches!(err, Error::RequestExhausted { retries: 1 }));
}

#[tokio::test]
async fn rejected_mutation_reports_false() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/x/relation/modify"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(json!({"code": 22014, "message": "not following"})),
        )
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    assert!(!client.unfollow(8).await);
}
