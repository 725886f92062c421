//! S3 client for listing pass prefixes and fetching images.
//!
//! Speaks the two S3 REST calls the server needs (ListObjectsV2 with a
//! delimiter, and GetObject) using path-style addressing, so it works against
//! AWS as well as S3-compatible stores that do not support virtual hosts.

use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use chrono::Utc;
use reqwest::{header::AUTHORIZATION, Client, Response, StatusCode, Url};
use serde::Deserialize;
use tracing::debug;

use crate::signing::{canonical_query, uri_encode, CanonicalRequest, Credentials};
use crate::{ObjectStore, ObjectStoreError};

/// Configuration for the S3 client.
#[derive(Debug, Clone)]
pub struct S3Config {
    /// Endpoint URL (e.g., "https://s3.eu-central-1.amazonaws.com").
    /// A bare hostname is treated as https.
    pub endpoint: String,
    /// Bucket holding one prefix per pass.
    pub bucket: String,
    /// Region used in the signature scope.
    pub region: String,
    /// Access key pair.
    pub credentials: Credentials,
    /// Timeout for a single HTTP request, body included.
    pub request_timeout: Duration,
    /// Largest object `get_object` will buffer.
    pub max_object_bytes: u64,
}

impl S3Config {
    pub fn new(
        endpoint: impl Into<String>,
        bucket: impl Into<String>,
        region: impl Into<String>,
        credentials: Credentials,
    ) -> Self {
        Self {
            endpoint: endpoint.into(),
            bucket: bucket.into(),
            region: region.into(),
            credentials,
            request_timeout: Duration::from_secs(60),
            max_object_bytes: 64 * 1024 * 1024, // 64 MiB
        }
    }
}

/// ListObjectsV2 response body; only the fields we read.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct ListBucketResult {
    #[serde(default)]
    common_prefixes: Vec<CommonPrefix>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "PascalCase")]
struct CommonPrefix {
    prefix: String,
}

/// S3 object store client.
pub struct S3Client {
    config: S3Config,
    client: Client,
    /// `scheme://host[:port]`.
    origin: String,
    /// `host[:port]` as reqwest will send it.
    host: String,
}

impl S3Client {
    /// Create a new S3 client.
    pub fn new(config: S3Config) -> Result<Self, ObjectStoreError> {
        let endpoint = if config.endpoint.starts_with("http://")
            || config.endpoint.starts_with("https://")
        {
            config.endpoint.clone()
        } else {
            format!("https://{}", config.endpoint)
        };

        let url = Url::parse(&endpoint)
            .map_err(|_| ObjectStoreError::InvalidEndpoint(config.endpoint.clone()))?;
        let host = match (url.host_str(), url.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            (None, _) => return Err(ObjectStoreError::InvalidEndpoint(config.endpoint.clone())),
        };
        let origin = url.origin().ascii_serialization();

        let client = Client::builder().timeout(config.request_timeout).build()?;

        Ok(Self {
            config,
            client,
            origin,
            host,
        })
    }

    fn bucket_uri(&self) -> String {
        format!("/{}", uri_encode(&self.config.bucket, false))
    }

    fn object_uri(&self, key: &str) -> String {
        format!("{}/{}", self.bucket_uri(), uri_encode(key, true))
    }

    async fn signed_get(&self, uri: &str, query: &str) -> Result<Response, ObjectStoreError> {
        let signed = CanonicalRequest {
            method: "GET",
            host: &self.host,
            uri,
            query,
        }
        .sign(&self.config.credentials, &self.config.region, Utc::now())?;

        let url = if query.is_empty() {
            format!("{}{uri}", self.origin)
        } else {
            format!("{}{uri}?{query}", self.origin)
        };

        debug!(url = %url, "S3 request");

        let response = self
            .client
            .get(url)
            .header("x-amz-date", signed.amz_date)
            .header("x-amz-content-sha256", signed.content_sha256)
            .header(AUTHORIZATION, signed.authorization)
            .send()
            .await?;

        Ok(response)
    }
}

async fn status_error(response: Response) -> ObjectStoreError {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    ObjectStoreError::Status { status, body }
}

#[async_trait]
impl ObjectStore for S3Client {
    async fn list_common_prefixes(
        &self,
        start_after: Option<&str>,
        delimiter: &str,
    ) -> Result<Vec<String>, ObjectStoreError> {
        let mut params = vec![("list-type", "2"), ("delimiter", delimiter)];
        if let Some(start_after) = start_after {
            params.push(("start-after", start_after));
        }
        let query = canonical_query(&params);

        let response = self.signed_get(&self.bucket_uri(), &query).await?;

        match response.status() {
            StatusCode::OK => {
                let body = response.text().await?;
                let result: ListBucketResult = quick_xml::de::from_str(&body)?;
                Ok(result
                    .common_prefixes
                    .into_iter()
                    .map(|p| p.prefix)
                    .collect())
            }
            _ => Err(status_error(response).await),
        }
    }

    async fn get_object(&self, key: &str) -> Result<Bytes, ObjectStoreError> {
        let response = self.signed_get(&self.object_uri(key), "").await?;
        let limit = self.config.max_object_bytes;

        match response.status() {
            StatusCode::OK => {
                if let Some(size) = response.content_length() {
                    if size > limit {
                        return Err(ObjectStoreError::TooLarge { size, limit });
                    }
                }

                let body = response.bytes().await?;
                if body.len() as u64 > limit {
                    return Err(ObjectStoreError::TooLarge {
                        size: body.len() as u64,
                        limit,
                    });
                }

                debug!(key = %key, size = body.len(), "Object downloaded");
                Ok(body)
            }
            StatusCode::NOT_FOUND => Err(ObjectStoreError::NotFound(key.to_string())),
            _ => Err(status_error(response).await),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::signing::EMPTY_PAYLOAD_SHA256;
    use wiremock::matchers::{header, header_exists, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const LIST_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>passes</Name>
  <Prefix></Prefix>
  <KeyCount>2</KeyCount>
  <MaxKeys>1000</MaxKeys>
  <Delimiter>/</Delimiter>
  <IsTruncated>false</IsTruncated>
  <CommonPrefixes><Prefix>20230101000000-20230101001500-NOAA19/</Prefix></CommonPrefixes>
  <CommonPrefixes><Prefix>20230101010000-20230101011500-NOAA18/</Prefix></CommonPrefixes>
</ListBucketResult>"#;

    const EMPTY_PAGE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<ListBucketResult xmlns="http://s3.amazonaws.com/doc/2006-03-01/">
  <Name>passes</Name>
  <KeyCount>0</KeyCount>
  <IsTruncated>false</IsTruncated>
</ListBucketResult>"#;

    fn client_for(server: &MockServer) -> S3Client {
        let credentials = Credentials {
            access_key_id: "AKIDEXAMPLE".to_string(),
            secret_access_key: "secret".to_string(),
        };
        let mut config = S3Config::new(server.uri(), "passes", "eu-central-1", credentials);
        config.max_object_bytes = 1024;
        S3Client::new(config).unwrap()
    }

    #[test]
    fn test_bare_endpoint_defaults_to_https() {
        let credentials = Credentials {
            access_key_id: "a".to_string(),
            secret_access_key: "b".to_string(),
        };
        let client =
            S3Client::new(S3Config::new("s3.example.com:9000", "bucket", "us-east-1", credentials))
                .unwrap();
        assert_eq!(client.origin, "https://s3.example.com:9000");
        assert_eq!(client.host, "s3.example.com:9000");
        assert_eq!(client.object_uri("a b/c.webp"), "/bucket/a%20b/c.webp");
    }

    #[tokio::test]
    async fn test_list_common_prefixes_signed_request() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/passes"))
            .and(query_param("list-type", "2"))
            .and(query_param("delimiter", "/"))
            .and(header_exists("authorization"))
            .and(header_exists("x-amz-date"))
            .and(header("x-amz-content-sha256", EMPTY_PAYLOAD_SHA256))
            .respond_with(ResponseTemplate::new(200).set_body_string(LIST_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let prefixes = client.list_common_prefixes(None, "/").await.unwrap();
        assert_eq!(
            prefixes,
            vec![
                "20230101000000-20230101001500-NOAA19/",
                "20230101010000-20230101011500-NOAA18/",
            ]
        );
    }

    #[tokio::test]
    async fn test_list_passes_start_after() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/passes"))
            .and(query_param("start-after", "20230101010000-20230101011500-NOAA18/"))
            .respond_with(ResponseTemplate::new(200).set_body_string(EMPTY_PAGE))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_for(&server);
        let prefixes = client
            .list_common_prefixes(Some("20230101010000-20230101011500-NOAA18/"), "/")
            .await
            .unwrap();
        assert!(prefixes.is_empty());
    }

    #[tokio::test]
    async fn test_list_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/passes"))
            .respond_with(ResponseTemplate::new(403).set_body_string("AccessDenied"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.list_common_prefixes(None, "/").await.unwrap_err();
        assert!(matches!(
            err,
            ObjectStoreError::Status { status, ref body } if status == StatusCode::FORBIDDEN && body == "AccessDenied"
        ));
    }

    #[tokio::test]
    async fn test_get_object() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(
                "/passes/20230101000000-20230101001500-NOAA19/20230101000000-20230101001500-NOAA19-mcir.webp",
            ))
            .and(header_exists("authorization"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"RIFFwebp".to_vec()))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let body = client
            .get_object(
                "20230101000000-20230101001500-NOAA19/20230101000000-20230101001500-NOAA19-mcir.webp",
            )
            .await
            .unwrap();
        assert_eq!(&body[..], b"RIFFwebp");
    }

    #[tokio::test]
    async fn test_get_object_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404).set_body_string("NoSuchKey"))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_object("missing/missing-mcir.webp").await.unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_get_object_too_large() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(vec![0u8; 2048]))
            .mount(&server)
            .await;

        let client = client_for(&server);
        let err = client.get_object("big/big-mcir.webp").await.unwrap_err();
        assert!(matches!(
            err,
            ObjectStoreError::TooLarge {
                size: 2048,
                limit: 1024
            }
        ));
    }
}
