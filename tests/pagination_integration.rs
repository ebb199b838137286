//! Integration tests for paged list calls against a mock Linode API
//!
//! Covers: page walking, explicit pages, X-Filter header, custom query
//! params, partial results on failure and endpoint resolution errors.

use async_trait::async_trait;
use linode_api::linode_client::EndpointId;
use linode_api::linode_instances::InstancesPagedResponse;
use linode_api::linode_pagination::decode_page;
use linode_api::linode_volumes::{INSTANCE_VOLUMES, Volume};
use linode_api::{ApiRequest, Client, ClientConfig, Error, ListOptions, PagedResponse};
use serde::Serialize;
use serde_json::{Value, json};
use wiremock::matchers::{header, method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};

// ============================================================================
// Helpers
// ============================================================================

fn client_for(server: &MockServer) -> Client {
    Client::new(ClientConfig::new(server.uri()).with_token("test-token")).unwrap()
}

fn instance(id: u64) -> Value {
    json!({
        "id": id,
        "label": format!("linode{id}"),
        "region": "us-east",
        "type": "g6-nanode-1",
        "status": "running"
    })
}

fn instances_page(page: u32, pages: u32, results: u32, ids: &[u64]) -> Value {
    json!({
        "data": ids.iter().map(|id| instance(*id)).collect::<Vec<_>>(),
        "page": page,
        "pages": pages,
        "results": results
    })
}

/// Three pages of two instances each; the first page is requested without `page`.
async fn mount_three_pages(server: &MockServer) {
    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(1, 3, 6, &[1, 2])))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(2, 3, 6, &[3, 4])))
        .expect(1)
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(3, 3, 6, &[5, 6])))
        .expect(1)
        .mount(server)
        .await;
}

// ============================================================================
// Page walking
// ============================================================================

#[tokio::test]
async fn test_list_all_pages_in_order() {
    let mock_server = MockServer::start().await;
    mount_three_pages(&mock_server).await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::new(0, "");
    let instances = client.list_instances(Some(&mut opts)).await.unwrap();

    let ids: Vec<u64> = instances.iter().map(|i| i.id).collect();
    assert_eq!(ids, vec![1, 2, 3, 4, 5, 6]);
    assert_eq!(opts.pages(), 3);
    assert_eq!(opts.results(), 6);
    assert_eq!(opts.page(), 3);
}

#[tokio::test]
async fn test_list_without_options_fetches_every_page() {
    let mock_server = MockServer::start().await;
    mount_three_pages(&mock_server).await;

    let client = client_for(&mock_server);
    let instances = client.list_instances(None).await.unwrap();

    assert_eq!(instances.len(), 6);
}

#[tokio::test]
async fn test_results_come_from_last_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(1, 2, 3, &[1, 2])))
        .mount(&mock_server)
        .await;

    // An instance was created between the two requests.
    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(2, 2, 4, &[3, 4])))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::default();
    let instances = client.list_instances(Some(&mut opts)).await.unwrap();

    assert_eq!(instances.len(), 4);
    assert_eq!(opts.results(), 4);
}

#[tokio::test]
async fn test_single_page_response_issues_one_request() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(1, 1, 1, &[9])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::new(0, "");
    let instances = client.list_instances(Some(&mut opts)).await.unwrap();

    assert_eq!(instances.len(), 1);
    assert_eq!(opts.pages(), 1);
    assert_eq!(opts.results(), 1);
}

#[tokio::test]
async fn test_empty_collection() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/volumes"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "data": [],
            "page": 1,
            "pages": 0,
            "results": 0
        })))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::new(0, "");
    let volumes = client.list_volumes(Some(&mut opts)).await.unwrap();

    assert!(volumes.is_empty());
    assert_eq!(opts.pages(), 0);
    assert_eq!(opts.results(), 0);
}

#[tokio::test]
async fn test_explicit_page_fetches_only_that_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(2, 3, 6, &[3, 4])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::new(2, "");
    let instances = client.list_instances(Some(&mut opts)).await.unwrap();

    assert_eq!(instances.len(), 2);
    assert_eq!(instances[0].id, 3);
    assert_eq!(opts.page(), 2);
    assert_eq!(opts.pages(), 3);
    assert_eq!(opts.results(), 6);
}

// ============================================================================
// Request shaping
// ============================================================================

#[tokio::test]
async fn test_filter_sent_as_header_not_query() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(header("X-Filter", r#"{"label":"myserver"}"#))
        .and(header("Authorization", "Bearer test-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(1, 1, 1, &[1])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::new(0, r#"{"label":"myserver"}"#);
    let instances = client.list_instances(Some(&mut opts)).await.unwrap();
    assert_eq!(instances.len(), 1);

    let requests = mock_server.received_requests().await.unwrap();
    assert_eq!(requests.len(), 1);
    assert!(requests[0].url.query().is_none());
}

#[derive(Debug, Serialize)]
struct TagQuery {
    tag: String,
    #[serde(rename = "with_disks")]
    disks: bool,
    offset: u32,
}

#[tokio::test]
async fn test_page_size_and_query_params_sent_on_every_page() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param_is_missing("page"))
        .and(query_param("page_size", "2"))
        .and(query_param("tag", "prod"))
        .and(query_param("with_disks", "true"))
        .and(query_param_is_missing("offset"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(1, 2, 4, &[1, 2])))
        .expect(1)
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param("page", "2"))
        .and(query_param("page_size", "2"))
        .and(query_param("tag", "prod"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(2, 2, 4, &[3, 4])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::new(0, "")
        .with_page_size(2)
        .with_query_params(TagQuery {
            tag: "prod".into(),
            disks: true,
            offset: 0,
        });
    let instances = client.list_instances(Some(&mut opts)).await.unwrap();

    assert_eq!(instances.len(), 4);
}

#[derive(Debug, Serialize)]
struct RatioQuery {
    ratio: f64,
}

#[tokio::test]
async fn test_unsupported_query_param_fails_before_any_request() {
    let mock_server = MockServer::start().await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::new(0, "").with_query_params(RatioQuery { ratio: 0.5 });
    let err = client.list_instances(Some(&mut opts)).await.unwrap_err();

    assert!(matches!(err, Error::ListOptions(_)));
    assert!(matches!(err.root(), Error::UnsupportedType { field: "ratio", .. }));
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_zero_valued_unsupported_field_is_left_out() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param_is_missing("ratio"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(1, 1, 1, &[1])))
        .expect(1)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut opts = ListOptions::new(0, "").with_query_params(RatioQuery { ratio: 0.0 });
    let instances = client.list_instances(Some(&mut opts)).await.unwrap();

    assert_eq!(instances.len(), 1);
}

// ============================================================================
// Failures
// ============================================================================

#[tokio::test]
async fn test_failed_page_keeps_earlier_results() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param_is_missing("page"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(1, 3, 6, &[1, 2])))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(500).set_body_string("upstream exploded"))
        .mount(&mock_server)
        .await;

    Mock::given(method("GET"))
        .and(path("/v4/linode/instances"))
        .and(query_param("page", "3"))
        .respond_with(ResponseTemplate::new(200).set_body_json(instances_page(3, 3, 6, &[5, 6])))
        .expect(0)
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let mut pager = InstancesPagedResponse::default();
    let mut opts = ListOptions::new(0, "");
    let err = client.paginate(&mut pager, Some(&mut opts), &[]).await.unwrap_err();

    match err {
        Error::Api { status, body } => {
            assert_eq!(status.as_u16(), 500);
            assert_eq!(body, "upstream exploded");
        }
        other => panic!("expected Api error, got {other:?}"),
    }
    assert_eq!(pager.data.len(), 2);
    assert_eq!(opts.pages(), 3);
}

#[tokio::test]
async fn test_malformed_page_is_a_json_error() {
    let mock_server = MockServer::start().await;

    Mock::given(method("GET"))
        .and(path("/v4/volumes"))
        .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
        .mount(&mock_server)
        .await;

    let client = client_for(&mock_server);
    let err = client.list_volumes(None).await.unwrap_err();

    assert!(matches!(err, Error::Json { ref body, .. } if body == "not json"));
}

/// Pager for instance volumes that forgets to pass the instance id.
#[derive(Debug, Default)]
struct MisconfiguredPager {
    data: Vec<Volume>,
}

#[async_trait]
impl PagedResponse for MisconfiguredPager {
    fn endpoint(&self, _ids: &[EndpointId<'_>]) -> linode_api::Result<String> {
        INSTANCE_VOLUMES.endpoint(&[])
    }

    async fn cast_result(&mut self, request: ApiRequest<'_>, endpoint: &str) -> linode_api::Result<(u32, u32)> {
        decode_page(request, endpoint, &mut self.data).await
    }
}

#[tokio::test]
async fn test_endpoint_mismatch_sends_nothing() {
    let mock_server = MockServer::start().await;

    let client = client_for(&mock_server);
    let mut pager = MisconfiguredPager::default();
    let err = client.paginate(&mut pager, None, &[]).await.unwrap_err();

    assert!(matches!(err, Error::InvalidEndpoint { .. }));
    assert!(pager.data.is_empty());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
