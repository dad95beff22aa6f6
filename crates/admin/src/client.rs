//! Admin API client implementation
//!
//! This module provides the AdminClient that implements the gp-core admin
//! traits over HTTP, authenticating every request with the bearer token.

use async_trait::async_trait;
use gp_core::admin::{
    AdminApi, AliasTarget, BucketDirectory, BucketInfo, CreateBucketRequest, KeyInfo,
    MutationGateway, UpdateBucketRequest, UpdateKeyRequest,
};
use gp_core::{Endpoint, Error, PermissionSet, Result};
use reqwest::header::{AUTHORIZATION, HeaderMap, HeaderValue, USER_AGENT};
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use url::Url;

/// Largest error body read back from the server
const MAX_ERROR_BODY: usize = 64 << 10;

/// Admin API client for Garage v2
pub struct AdminClient {
    http_client: Client,
    base_url: Url,
}

impl AdminClient {
    /// Create a new AdminClient from a resolved endpoint
    pub fn new(endpoint: &Endpoint) -> Result<Self> {
        let mut token =
            HeaderValue::from_str(&format!("Bearer {}", endpoint.token)).map_err(|_| {
                Error::Config("token contains characters not allowed in a header".into())
            })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, token);
        headers.insert(
            USER_AGENT,
            HeaderValue::from_static(concat!("garage-provider/", env!("CARGO_PKG_VERSION"))),
        );

        let http_client = Client::builder()
            .default_headers(headers)
            .timeout(endpoint.timeout)
            .build()
            .map_err(|e| Error::Network(format!("Failed to create HTTP client: {e}")))?;

        Ok(Self {
            http_client,
            base_url: endpoint.base_url.clone(),
        })
    }

    /// Build the URL of an admin API operation
    fn admin_url(&self, operation: &str, id: Option<&str>) -> Result<Url> {
        let mut url = self.base_url.join(&format!("v2/{operation}"))?;
        if let Some(id) = id {
            url.set_query(Some(&format!("id={}", urlencoding::encode(id))));
        }
        Ok(url)
    }

    fn request(&self, method: Method, operation: &str, id: Option<&str>) -> Result<RequestBuilder> {
        let url = self.admin_url(operation, id)?;
        tracing::debug!(%method, path = url.path(), "admin api request");
        Ok(self.http_client.request(method, url))
    }

    /// Send a request and turn any non-success status into an error
    async fn execute(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().await.map_err(|e| {
            if e.is_timeout() {
                Error::Network(format!("Request timed out: {e}"))
            } else {
                Error::Network(format!("Request failed: {e}"))
            }
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = read_capped(response, MAX_ERROR_BODY).await;
        Err(map_error(status, &body))
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let bytes = response
            .bytes()
            .await
            .map_err(|e| Error::Network(format!("Failed to read response: {e}")))?;
        serde_json::from_slice(&bytes).map_err(Error::Json)
    }

    async fn get<T: DeserializeOwned>(&self, operation: &str, id: &str) -> Result<T> {
        let request = self.request(Method::GET, operation, Some(id))?;
        Self::decode(self.execute(request).await?).await
    }

    async fn post<B, T>(&self, operation: &str, id: Option<&str>, body: &B) -> Result<T>
    where
        B: Serialize + ?Sized + Sync,
        T: DeserializeOwned,
    {
        let request = self.request(Method::POST, operation, id)?.json(body);
        Self::decode(self.execute(request).await?).await
    }

    /// POST whose response body is not needed
    async fn post_no_response<B>(
        &self,
        operation: &str,
        id: Option<&str>,
        body: Option<&B>,
    ) -> Result<()>
    where
        B: Serialize + ?Sized + Sync,
    {
        let mut request = self.request(Method::POST, operation, id)?;
        if let Some(body) = body {
            request = request.json(body);
        }
        self.execute(request).await?;
        Ok(())
    }
}

/// Read at most `limit` bytes of a response body
///
/// A body that fails mid-read keeps what arrived; the status is still reported.
async fn read_capped(mut response: Response, limit: usize) -> Vec<u8> {
    let mut body = Vec::new();
    while body.len() < limit {
        match response.chunk().await {
            Ok(Some(chunk)) => {
                let take = chunk.len().min(limit - body.len());
                body.extend_from_slice(&chunk[..take]);
            }
            Ok(None) => break,
            Err(e) => {
                tracing::debug!(error = %e, "error body read failed");
                break;
            }
        }
    }
    body
}

/// Map a non-success response to an error
fn map_error(status: StatusCode, body: &[u8]) -> Error {
    let detail = extract_detail(body);
    if status == StatusCode::NOT_FOUND {
        return Error::NotFound(detail);
    }

    let summary = match status.canonical_reason() {
        Some(reason) => format!("Garage API error ({} {reason})", status.as_u16()),
        None => format!("Garage API error ({})", status.as_u16()),
    };
    Error::Api {
        status: status.as_u16(),
        summary,
        detail,
    }
}

#[derive(Debug, Default, Deserialize)]
struct ApiErrorBody {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    detail: Option<String>,
}

/// Best human-readable message in an error body
///
/// Prefers the JSON `message`, `error` and `detail` fields in that order,
/// then the raw body text.
fn extract_detail(body: &[u8]) -> String {
    if let Ok(parsed) = serde_json::from_slice::<ApiErrorBody>(body) {
        let first = [parsed.message, parsed.error, parsed.detail]
            .into_iter()
            .flatten()
            .map(|v| v.trim().to_string())
            .find(|v| !v.is_empty());
        if let Some(message) = first {
            return message;
        }
    }

    let raw = String::from_utf8_lossy(body);
    let raw = raw.trim();
    if raw.is_empty() {
        "empty response body".to_string()
    } else {
        raw.to_string()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct AliasRequest<'a> {
    bucket_id: &'a str,

    #[serde(skip_serializing_if = "Option::is_none")]
    global_alias: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    access_key_id: Option<&'a str>,

    #[serde(skip_serializing_if = "Option::is_none")]
    local_alias: Option<&'a str>,
}

impl<'a> AliasRequest<'a> {
    fn new(bucket_id: &'a str, target: &'a AliasTarget) -> Self {
        match target {
            AliasTarget::Global { alias } => Self {
                bucket_id,
                global_alias: Some(alias),
                access_key_id: None,
                local_alias: None,
            },
            AliasTarget::Local {
                access_key_id,
                alias,
            } => Self {
                bucket_id,
                global_alias: None,
                access_key_id: Some(access_key_id),
                local_alias: Some(alias),
            },
        }
    }
}

/// Only the flags being changed; absent flags are left untouched
#[derive(Debug, Serialize)]
struct ChangedFlags {
    #[serde(skip_serializing_if = "Option::is_none")]
    read: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    write: Option<bool>,

    #[serde(skip_serializing_if = "Option::is_none")]
    owner: Option<bool>,
}

impl From<PermissionSet> for ChangedFlags {
    fn from(flags: PermissionSet) -> Self {
        Self {
            read: flags.read.then_some(true),
            write: flags.write.then_some(true),
            owner: flags.owner.then_some(true),
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct BucketKeyPermRequest<'a> {
    bucket_id: &'a str,
    access_key_id: &'a str,
    permissions: ChangedFlags,
}

#[async_trait]
impl BucketDirectory for AdminClient {
    async fn get_bucket_info(&self, bucket_id: &str) -> Result<BucketInfo> {
        self.get("GetBucketInfo", bucket_id).await
    }
}

#[async_trait]
impl MutationGateway for AdminClient {
    async fn add_bucket_alias(&self, bucket_id: &str, target: &AliasTarget) -> Result<()> {
        let body = AliasRequest::new(bucket_id, target);
        self.post_no_response("AddBucketAlias", None, Some(&body))
            .await
    }

    async fn remove_bucket_alias(&self, bucket_id: &str, target: &AliasTarget) -> Result<()> {
        let body = AliasRequest::new(bucket_id, target);
        self.post_no_response("RemoveBucketAlias", None, Some(&body))
            .await
    }

    async fn allow_bucket_key(
        &self,
        bucket_id: &str,
        access_key_id: &str,
        permissions: PermissionSet,
    ) -> Result<()> {
        let body = BucketKeyPermRequest {
            bucket_id,
            access_key_id,
            permissions: permissions.into(),
        };
        self.post_no_response("AllowBucketKey", None, Some(&body))
            .await
    }

    async fn deny_bucket_key(
        &self,
        bucket_id: &str,
        access_key_id: &str,
        permissions: PermissionSet,
    ) -> Result<()> {
        let body = BucketKeyPermRequest {
            bucket_id,
            access_key_id,
            permissions: permissions.into(),
        };
        self.post_no_response("DenyBucketKey", None, Some(&body))
            .await
    }
}

#[async_trait]
impl AdminApi for AdminClient {
    async fn create_bucket(&self, request: CreateBucketRequest) -> Result<BucketInfo> {
        self.post("CreateBucket", None, &request).await
    }

    async fn update_bucket(
        &self,
        bucket_id: &str,
        request: UpdateBucketRequest,
    ) -> Result<BucketInfo> {
        self.post("UpdateBucket", Some(bucket_id), &request).await
    }

    async fn delete_bucket(&self, bucket_id: &str) -> Result<()> {
        self.post_no_response::<()>("DeleteBucket", Some(bucket_id), None)
            .await
    }

    async fn create_key(&self, request: UpdateKeyRequest) -> Result<KeyInfo> {
        self.post("CreateKey", None, &request).await
    }

    async fn get_key_info(&self, access_key_id: &str) -> Result<KeyInfo> {
        self.get("GetKeyInfo", access_key_id).await
    }

    async fn update_key(&self, access_key_id: &str, request: UpdateKeyRequest) -> Result<KeyInfo> {
        self.post("UpdateKey", Some(access_key_id), &request).await
    }

    async fn delete_key(&self, access_key_id: &str) -> Result<()> {
        self.post_no_response::<()>("DeleteKey", Some(access_key_id), None)
            .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gp_core::admin::UpdateWebsiteAccess;
    use httpmock::prelude::*;
    use serde_json::json;

    fn client_for(server: &MockServer) -> AdminClient {
        let host = server.address().to_string();
        let endpoint = Endpoint::resolve(None, Some(&host), Some("http"), Some("t0ken")).unwrap();
        AdminClient::new(&endpoint).unwrap()
    }

    #[test]
    fn test_admin_url_construction() {
        let endpoint =
            Endpoint::resolve(None, Some("garage.local:3903"), None, Some("t")).unwrap();
        let client = AdminClient::new(&endpoint).unwrap();

        assert_eq!(
            client.admin_url("GetBucketInfo", Some("b 1")).unwrap().as_str(),
            "https://garage.local:3903/v2/GetBucketInfo?id=b%201"
        );
        assert_eq!(
            client.admin_url("CreateKey", None).unwrap().as_str(),
            "https://garage.local:3903/v2/CreateKey"
        );
    }

    #[test]
    fn test_extract_detail_prefers_json_fields() {
        assert_eq!(extract_detail(br#"{"message":"bucket busy"}"#), "bucket busy");
        assert_eq!(
            extract_detail(br#"{"message":"  ","error":"bad key","detail":"x"}"#),
            "bad key"
        );
        assert_eq!(extract_detail(br#"{"detail":"only detail"}"#), "only detail");
    }

    #[test]
    fn test_extract_detail_falls_back_to_raw_body() {
        assert_eq!(extract_detail(b"  upstream exploded \n"), "upstream exploded");
        assert_eq!(extract_detail(br#"{"code":"Nope"}"#), r#"{"code":"Nope"}"#);
        assert_eq!(extract_detail(b""), "empty response body");
        assert_eq!(extract_detail(b"   "), "empty response body");
    }

    #[test]
    fn test_map_error_statuses() {
        assert!(matches!(
            map_error(StatusCode::NOT_FOUND, br#"{"message":"no such bucket"}"#),
            Error::NotFound(detail) if detail == "no such bucket"
        ));

        let err = map_error(StatusCode::CONFLICT, b"alias taken");
        assert_eq!(err.to_string(), "Garage API error (409 Conflict): alias taken");
        assert_eq!(err.exit_code(), 6);

        let err = map_error(StatusCode::FORBIDDEN, b"");
        assert!(matches!(
            err,
            Error::Api { status: 403, ref detail, .. } if detail == "empty response body"
        ));
        assert_eq!(err.exit_code(), 4);
    }

    #[test]
    fn test_changed_flags_only_carries_set_flags() {
        let value = serde_json::to_value(ChangedFlags::from(PermissionSet::new(true, false, true)))
            .unwrap();
        assert_eq!(value, json!({"read": true, "owner": true}));
    }

    #[tokio::test]
    async fn test_get_bucket_info_sends_bearer_token() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(GET)
                    .path("/v2/GetBucketInfo")
                    .query_param("id", "b1")
                    .header("authorization", "Bearer t0ken");
                then.status(200).json_body(json!({
                    "id": "b1",
                    "globalAliases": ["main-data"],
                    "keys": [{
                        "accessKeyId": "GK1",
                        "name": "app",
                        "permissions": {"read": true, "write": false, "owner": false},
                        "bucketLocalAliases": []
                    }],
                    "objects": 3,
                    "bytes": 1024
                }));
            })
            .await;

        let info = client_for(&server).get_bucket_info("b1").await.unwrap();

        mock.assert_async().await;
        assert!(info.has_global_alias("main-data"));
        assert_eq!(info.key("GK1").unwrap().permissions, PermissionSet::READ);
        assert_eq!(info.bytes, 1024);
    }

    #[tokio::test]
    async fn test_missing_bucket_is_not_found() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/GetBucketInfo");
                then.status(404)
                    .json_body(json!({"code": "NoSuchBucket", "message": "Bucket not found: b9"}));
            })
            .await;

        let err = client_for(&server).get_bucket_info("b9").await.unwrap_err();
        assert!(err.is_not_found());
        assert!(err.to_string().contains("Bucket not found: b9"));
    }

    #[tokio::test]
    async fn test_add_global_alias_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/AddBucketAlias")
                    .json_body(json!({"bucketId": "b1", "globalAlias": "main-data"}));
                then.status(200).json_body(json!({"id": "b1"}));
            })
            .await;

        client_for(&server)
            .add_bucket_alias("b1", &AliasTarget::global("main-data"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_remove_local_alias_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/RemoveBucketAlias").json_body(json!({
                    "bucketId": "b1",
                    "accessKeyId": "GK1",
                    "localAlias": "photos"
                }));
                then.status(200).json_body(json!({"id": "b1"}));
            })
            .await;

        client_for(&server)
            .remove_bucket_alias("b1", &AliasTarget::local("GK1", "photos"))
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_allow_bucket_key_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/AllowBucketKey").json_body(json!({
                    "bucketId": "b1",
                    "accessKeyId": "GK1",
                    "permissions": {"write": true}
                }));
                then.status(200).json_body(json!({"id": "b1"}));
            })
            .await;

        client_for(&server)
            .allow_bucket_key("b1", "GK1", PermissionSet::WRITE)
            .await
            .unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_deny_failure_carries_detail() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/DenyBucketKey");
                then.status(500).body("database is locked");
            })
            .await;

        let err = client_for(&server)
            .deny_bucket_key("b1", "GK1", PermissionSet::READ)
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Garage API error (500 Internal Server Error): database is locked"
        );
    }

    #[tokio::test]
    async fn test_error_body_is_read_up_to_cap() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/DenyBucketKey");
                then.status(502).body("x".repeat(MAX_ERROR_BODY * 3));
            })
            .await;

        let err = client_for(&server)
            .deny_bucket_key("b1", "GK1", PermissionSet::READ)
            .await
            .unwrap_err();
        match err {
            Error::Api { status, detail, .. } => {
                assert_eq!(status, 502);
                assert_eq!(detail.len(), MAX_ERROR_BODY);
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_update_bucket_sends_id_and_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/UpdateBucket")
                    .query_param("id", "b1")
                    .json_body(json!({
                        "websiteAccess": {"enabled": true, "indexDocument": "index.html"}
                    }));
                then.status(200).json_body(json!({
                    "id": "b1",
                    "websiteAccess": true,
                    "websiteConfig": {"indexDocument": "index.html"}
                }));
            })
            .await;

        let request = UpdateBucketRequest {
            website_access: Some(UpdateWebsiteAccess {
                enabled: true,
                index_document: Some("index.html".into()),
                error_document: None,
            }),
            quotas: None,
        };
        let info = client_for(&server).update_bucket("b1", request).await.unwrap();

        mock.assert_async().await;
        assert!(info.website_access);
    }

    #[tokio::test]
    async fn test_create_key_returns_secret() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v2/CreateKey")
                    .json_body(json!({"name": "app"}));
                then.status(200).json_body(json!({
                    "accessKeyId": "GK31c2f218a2e44f485b94239e",
                    "name": "app",
                    "created": "2025-01-02T03:04:05Z",
                    "expired": false,
                    "secretAccessKey": "b892c0665f0ada8a4755dae98baa3b133590e11dae3bcc1f9d769d67f16c3835",
                    "permissions": {"createBucket": false}
                }));
            })
            .await;

        let request = UpdateKeyRequest {
            name: Some("app".into()),
            ..Default::default()
        };
        let key = client_for(&server).create_key(request).await.unwrap();

        assert_eq!(key.access_key_id, "GK31c2f218a2e44f485b94239e");
        assert!(key.secret_access_key.is_some());
        assert_eq!(
            key.created,
            Some("2025-01-02T03:04:05Z".parse::<jiff::Timestamp>().unwrap())
        );
    }

    #[tokio::test]
    async fn test_delete_key_ignores_empty_body() {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/v2/DeleteKey").query_param("id", "GK1");
                then.status(200);
            })
            .await;

        client_for(&server).delete_key("GK1").await.unwrap();
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_undecodable_success_body_is_json_error() {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(GET).path("/v2/GetKeyInfo");
                then.status(200).body("<html>proxy login</html>");
            })
            .await;

        let err = client_for(&server).get_key_info("GK1").await.unwrap_err();
        assert!(matches!(err, Error::Json(_)));
    }

    #[tokio::test]
    async fn test_connection_refused_is_network_error() {
        let endpoint =
            Endpoint::resolve(None, Some("127.0.0.1:9"), Some("http"), Some("t")).unwrap();
        let client = AdminClient::new(&endpoint).unwrap();

        let err = client.get_bucket_info("b1").await.unwrap_err();
        assert!(matches!(err, Error::Network(_)));
        assert_eq!(err.exit_code(), 3);
    }
}
