//! End-to-end tests for `TreeHoleClient` against a mock HTTP server.

use treehole_api::{ClientConfig, ErrorKind, ReplyTarget, TreeHoleClient};
use wiremock::matchers::{body_string_contains, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

const TOKEN: &str = "0123456789abcdef0123456789abcdef";

async fn client_for(server: &MockServer) -> TreeHoleClient {
    TreeHoleClient::with_config(TOKEN, ClientConfig::builder().without_retry().build())
        .unwrap()
        .with_base_url(format!("{}/services/pkuhole/api.php", server.uri()))
        .with_image_url(format!("{}/services/pkuhole/images/", server.uri()))
        .unwrap()
}

fn hole_json(pid: u64) -> serde_json::Value {
    serde_json::json!({
        "pid": pid.to_string(),
        "timestamp": "1600000000",
        "type": "text",
        "text": "hello hole",
        "url": "",
        "reply": "2",
        "likenum": "5",
        "tag": null,
        "extra": 0
    })
}

#[tokio::test]
async fn get_hole_decodes_envelope() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/services/pkuhole/api.php"))
        .and(query_param("action", "getone"))
        .and(query_param("pid", "123456"))
        .and(query_param("user_token", TOKEN))
        .and(query_param("PKUHelperAPI", "3.0"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": hole_json(123456),
            "timestamp": 1_600_000_100
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let (hole, timestamp) = client.get_hole(123456).await.unwrap();

    assert_eq!(hole.pid, 123456);
    assert_eq!(hole.text, "hello hole");
    assert_eq!(timestamp, 1_600_000_100);
}

#[tokio::test]
async fn get_hole_resolves_image_url() {
    let server = MockServer::start().await;

    let mut body = hole_json(7);
    body["type"] = serde_json::json!("image");
    body["url"] = serde_json::json!("abc123.jpg");

    Mock::given(method("GET"))
        .and(query_param("action", "getone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": body
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let (hole, _) = client.get_hole(7).await.unwrap();

    assert!(hole.is_image());
    assert_eq!(
        hole.url.as_deref(),
        Some(format!("{}/services/pkuhole/images/abc123.jpg", server.uri()).as_str())
    );
}

#[tokio::test]
async fn get_hole_image_downloads_bytes() {
    let server = MockServer::start().await;

    let mut body = hole_json(7);
    body["type"] = serde_json::json!("image");
    body["url"] = serde_json::json!("abc123.jpg");

    Mock::given(method("GET"))
        .and(query_param("action", "getone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": body
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/services/pkuhole/images/abc123.jpg"))
        .respond_with(
            ResponseTemplate::new(200)
                .insert_header("Content-Type", "image/jpeg")
                .set_body_bytes(vec![0xFF, 0xD8, 0xFF]),
        )
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let (hole, _) = client.get_hole(7).await.unwrap();
    let (bytes, content_type) = client.get_hole_image(&hole).await.unwrap().unwrap();

    assert_eq!(&bytes[..], &[0xFF, 0xD8, 0xFF]);
    assert_eq!(content_type, "image/jpeg");
}

#[tokio::test]
async fn get_hole_image_skips_text_posts() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let hole: treehole_api::models::Hole = serde_json::from_value(hole_json(1)).unwrap();
    assert!(client.get_hole_image(&hole).await.unwrap().is_none());
}

#[tokio::test]
async fn get_comments_reports_attention() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "getcomment"))
        .and(query_param("pid", "10"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "attention": "1",
            "data": [
                {
                    "cid": "900",
                    "pid": "10",
                    "timestamp": "1600000002",
                    "name": "Angry Alice",
                    "text": "first",
                    "islz": 0,
                    "tag": null
                },
                {
                    "cid": 901,
                    "pid": 10,
                    "timestamp": 1_600_000_003,
                    "name": "洞主",
                    "text": "Re Angry Alice: thanks",
                    "islz": 1
                }
            ]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let page = client.get_comments(10).await.unwrap();

    assert!(page.attention);
    assert_eq!(page.comments.len(), 2);
    assert_eq!(page.comments[0].name, "Angry Alice");
    assert!(page.comments[1].islz);
}

#[tokio::test]
async fn get_holes_pages_the_listing() {
    let server = MockServer::start().await;

    let mut listed = hole_json(20);
    listed["hidden"] = serde_json::json!("0");
    listed["hot"] = serde_json::json!("1600000001");

    Mock::given(method("GET"))
        .and(query_param("action", "getlist"))
        .and(query_param("p", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": [listed],
            "timestamp": 1_600_000_200
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let (holes, timestamp) = client.get_holes(2).await.unwrap();

    assert_eq!(holes.len(), 1);
    assert_eq!(holes[0].hole.pid, 20);
    assert!(!holes[0].hidden);
    assert_eq!(timestamp, 1_600_000_200);
}

#[tokio::test]
async fn search_passes_keywords_and_paging() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "search"))
        .and(query_param("keywords", "lost card"))
        .and(query_param("page", "1"))
        .and(query_param("pagesize", "50"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": [hole_json(30)]
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let holes = client.search("lost card", 1, 50).await.unwrap();

    assert_eq!(holes.len(), 1);
    assert_eq!(holes[0].pid, 30);
}

#[tokio::test]
async fn post_hole_returns_new_pid() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("action", "dopost"))
        .and(body_string_contains("text=brand+new+hole"))
        .and(body_string_contains("type=text"))
        .and(body_string_contains(format!("user_token={TOKEN}")))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": "424242"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let pid = client.post_hole("brand new hole", None).await.unwrap();
    assert_eq!(pid, 424242);
}

#[tokio::test]
async fn post_hole_with_image_sends_base64() {
    let server = MockServer::start().await;

    // base64 of [1, 2, 3]
    Mock::given(method("POST"))
        .and(query_param("action", "dopost"))
        .and(body_string_contains("type=image"))
        .and(body_string_contains("image=AQID"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": 424243
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let pid = client.post_hole("", Some(&[1, 2, 3])).await.unwrap();
    assert_eq!(pid, 424243);
}

#[tokio::test]
async fn post_hole_rejects_empty() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let err = client.post_hole("", None).await.unwrap_err();
    assert!(matches!(err.kind, ErrorKind::EmptyPost));
}

#[tokio::test]
async fn post_comment_prefixes_reply_target() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("action", "docomment"))
        .and(body_string_contains("pid=10"))
        .and(body_string_contains("text=Re+Angry+Alice%3A+hi"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": "10"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let pid = client
        .post_comment(10, "hi", Some(ReplyTarget::from("angry alice")))
        .await
        .unwrap();
    assert_eq!(pid, 10);
}

#[tokio::test]
async fn post_comment_rejects_unknown_reply_name() {
    let server = MockServer::start().await;
    let client = client_for(&server).await;

    let err = client
        .post_comment(10, "hi", Some(ReplyTarget::from("a_lice")))
        .await
        .unwrap_err();
    assert!(err.is_invalid_name());
}

#[tokio::test]
async fn attention_switch_is_sent() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("action", "attention"))
        .and(body_string_contains("switch=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": []
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.set_attention(55).await.unwrap();
}

#[tokio::test]
async fn toggle_attention_flips_state() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "getcomment"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "attention": 0,
            "data": []
        })))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(query_param("action", "attention"))
        .and(body_string_contains("switch=1"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "data": []
        })))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let now_following = client.toggle_attention(55).await.unwrap();
    assert!(now_following);
}

#[tokio::test]
async fn report_posts_reason() {
    let server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(query_param("action", "report"))
        .and(body_string_contains("reason=spam"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    client.report(99, "spam").await.unwrap();
}

#[tokio::test]
async fn nonzero_code_becomes_api_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "getone"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 1,
            "msg": "账号不存在"
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_hole(1).await.unwrap_err();

    match err.kind {
        ErrorKind::Api { code, message } => {
            assert_eq!(code, 1);
            assert_eq!(message, "账号不存在");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
}

#[tokio::test]
async fn captcha_flag_becomes_captcha_error() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(query_param("action", "getlist"))
        .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
            "code": 0,
            "captcha": 1,
            "data": []
        })))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_holes(1).await.unwrap_err();
    assert!(err.is_captcha());
}

#[tokio::test]
async fn http_429_becomes_rate_limited() {
    let server = MockServer::start().await;

    Mock::given(method("GET"))
        .respond_with(ResponseTemplate::new(429).insert_header("Retry-After", "15"))
        .mount(&server)
        .await;

    let client = client_for(&server).await;
    let err = client.get_hole(1).await.unwrap_err();

    assert!(err.is_rate_limited());
    assert_eq!(err.retry_after(), Some(std::time::Duration::from_secs(15)));
}
