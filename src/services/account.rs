//! Object-storage account client.

use super::{encode_query, insert_metadata_headers, ApiResponse};
use crate::error::ConformanceError;
use crate::rest::RestClient;
use crate::types::{CreateAccountRequest, Format, Metadata, QueryParams, ResponseBody};
use bytes::Bytes;
use std::collections::HashMap;
use tracing::debug;

/// Query flag that switches a DELETE into a bulk delete.
const BULK_DELETE: &str = "bulk-delete";

/// Client for the account resource of the object-storage service.
///
/// All paths are relative to the account URL returned by the auth provider.
#[derive(Debug, Clone)]
pub struct AccountClient {
    rest: RestClient,
}

impl AccountClient {
    /// Create an account client. Listings default to JSON.
    pub fn new(rest: RestClient) -> Self {
        Self {
            rest: rest.with_format(Format::Json),
        }
    }

    /// Underlying REST client.
    pub fn rest(&self) -> &RestClient {
        &self.rest
    }

    /// PUT on the account URL.
    pub async fn create_account(
        &self,
        request: CreateAccountRequest,
    ) -> Result<ApiResponse, ConformanceError> {
        let path = if request.params.is_empty() {
            String::new()
        } else {
            format!("?{}", encode_query(&request.params))
        };

        let mut headers = HashMap::new();
        insert_metadata_headers(&mut headers, &request.metadata, &request.metadata_prefix)?;
        insert_metadata_headers(
            &mut headers,
            &request.remove_metadata,
            &request.remove_metadata_prefix,
        )?;

        let response = self.rest.put(&path, request.data, headers).await?;
        Ok(ApiResponse::new(&response, ResponseBody::raw(&response)))
    }

    /// DELETE on the account URL.
    ///
    /// A `bulk-delete` key in `params` is sent as a bare flag in front of the
    /// remaining encoded parameters. Its value is dropped and the pair is not
    /// repeated after the flag.
    pub async fn delete_account(
        &self,
        data: Option<Bytes>,
        params: &QueryParams,
    ) -> Result<ApiResponse, ConformanceError> {
        let path = delete_path(params);
        let response = self.rest.delete(&path, HashMap::new(), data).await?;
        Ok(ApiResponse::new(&response, ResponseBody::raw(&response)))
    }

    /// HEAD on the account URL; metadata comes back as headers.
    pub async fn list_account_metadata(&self) -> Result<ApiResponse, ConformanceError> {
        let response = self.rest.head("", HashMap::new()).await?;
        Ok(ApiResponse::new(&response, ResponseBody::Empty))
    }

    /// POST one `prefix + key` header per entry.
    pub async fn create_account_metadata(
        &self,
        metadata: &Metadata,
        prefix: &str,
    ) -> Result<ApiResponse, ConformanceError> {
        let mut headers = HashMap::new();
        insert_metadata_headers(&mut headers, metadata, prefix)?;

        let response = self.rest.post("", None, headers).await?;
        Ok(ApiResponse::new(&response, ResponseBody::raw(&response)))
    }

    /// POST one `prefix + key: x` header per key to remove metadata.
    pub async fn delete_account_metadata<I, S>(
        &self,
        keys: I,
        prefix: &str,
    ) -> Result<ApiResponse, ConformanceError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let removals: Metadata = keys
            .into_iter()
            .map(|key| (key.as_ref().to_string(), "x".to_string()))
            .collect();

        let mut headers = HashMap::new();
        insert_metadata_headers(&mut headers, &removals, prefix)?;

        let response = self.rest.post("", None, headers).await?;
        Ok(ApiResponse::new(&response, ResponseBody::raw(&response)))
    }

    /// GET on the account URL, listing its containers.
    ///
    /// `format` is added to `params` when absent. JSON listings are parsed;
    /// any other format is returned raw.
    pub async fn list_account_containers(
        &self,
        params: &QueryParams,
    ) -> Result<ApiResponse, ConformanceError> {
        self.list_account_containers_with_headers(params, HashMap::new())
            .await
    }

    /// Container listing with extra request headers.
    pub async fn list_account_containers_with_headers(
        &self,
        params: &QueryParams,
        headers: HashMap<String, String>,
    ) -> Result<ApiResponse, ConformanceError> {
        let mut params = params.clone();
        params
            .entry("format".to_string())
            .or_insert_with(|| self.rest.format().as_str().to_string());

        let path = format!("?{}", encode_query(&params));
        debug!(path = %path, "Listing account containers");
        let response = self.rest.get(&path, headers).await?;

        let body = if params.get("format").map(String::as_str) == Some(Format::Json.as_str()) {
            ResponseBody::json(&response)?
        } else {
            ResponseBody::raw(&response)
        };
        Ok(ApiResponse::new(&response, body))
    }

    /// GET `info` at the service root: the cluster capability document.
    pub async fn list_extensions(&self) -> Result<ApiResponse, ConformanceError> {
        let unscoped = self.rest.unscoped();
        let response = unscoped.get("info", HashMap::new()).await?;
        let body = ResponseBody::json(&response)?;
        Ok(ApiResponse::new(&response, body))
    }
}

fn delete_path(params: &QueryParams) -> String {
    if params.is_empty() {
        return String::new();
    }

    if params.contains_key(BULK_DELETE) {
        let mut rest = params.clone();
        rest.remove(BULK_DELETE);
        if rest.is_empty() {
            format!("?{}", BULK_DELETE)
        } else {
            format!("?{}&{}", BULK_DELETE, encode_query(&rest))
        }
    } else {
        format!("?{}", encode_query(params))
    }
}
