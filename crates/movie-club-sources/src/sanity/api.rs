use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use tracing::{debug, trace};
use crate::error::SourceError;
use crate::traits::ImageUpload;

const SERVICE: &str = "sanity";

#[derive(Debug, Deserialize)]
struct QueryResponse<T> {
    result: T,
}

#[derive(Debug, Deserialize)]
pub struct MutateResponse {
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    #[serde(default)]
    pub results: Vec<MutateResult>,
}

#[derive(Debug, Deserialize)]
pub struct MutateResult {
    pub id: String,
    #[serde(default)]
    pub operation: Option<String>,
    #[serde(default)]
    pub document: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct AssetResponse {
    document: AssetDocument,
}

#[derive(Debug, Deserialize)]
struct AssetDocument {
    #[serde(rename = "_id")]
    id: String,
}

/// Turn a non-2xx response into a SourceError, mapping revision conflicts
async fn check_response(response: Response, document_id: Option<&str>, revision: Option<&str>) -> Result<Response, SourceError> {
    if response.status().is_success() {
        return Ok(response);
    }

    let status = response.status().as_u16();
    let body = response.text().await.unwrap_or_default();

    if status == 409 {
        if let (Some(id), Some(revision)) = (document_id, revision) {
            if body.contains("revision") {
                return Err(SourceError::RevisionMismatch {
                    id: id.to_string(),
                    revision: revision.to_string(),
                });
            }
        }
    }
    if status == 404 {
        if let Some(id) = document_id {
            return Err(SourceError::DocumentNotFound(id.to_string()));
        }
    }

    Err(SourceError::Http { service: SERVICE, status, body })
}

/// Build a query URL; params are JSON-encoded and passed as `$name`
pub fn query_url(base: &str, dataset: &str, query: &str, params: &[(&str, Value)]) -> String {
    let mut url = format!(
        "{}/data/query/{}?query={}",
        base,
        dataset,
        urlencoding::encode(query)
    );
    for (name, value) in params {
        url.push_str(&format!(
            "&{}={}",
            urlencoding::encode(&format!("${}", name)),
            urlencoding::encode(&value.to_string())
        ));
    }
    url
}

/// Run a GROQ query and decode its `result`
pub async fn query<T: DeserializeOwned>(
    client: &Client,
    base: &str,
    dataset: &str,
    token: Option<&str>,
    groq: &str,
    params: &[(&str, Value)],
) -> Result<T, SourceError> {
    let url = query_url(base, dataset, groq, params);
    trace!("GROQ query: {}", groq);

    let mut request = client.get(&url).header("Accept", "application/json");
    if let Some(token) = token {
        request = request.bearer_auth(token);
    }

    let response = check_response(request.send().await?, None, None).await?;
    let body = response.text().await?;
    let parsed: QueryResponse<T> = serde_json::from_str(&body)?;
    Ok(parsed.result)
}

/// Submit a transaction and return the affected documents
pub async fn mutate(
    client: &Client,
    base: &str,
    dataset: &str,
    token: &str,
    mutations: Vec<Value>,
    document_id: Option<&str>,
    revision: Option<&str>,
) -> Result<MutateResponse, SourceError> {
    let url = format!(
        "{}/data/mutate/{}?returnDocuments=true&visibility=sync",
        base, dataset
    );
    debug!("Submitting {} mutation(s) to {}", mutations.len(), dataset);

    let response = client
        .post(&url)
        .bearer_auth(token)
        .header("Content-Type", "application/json")
        .json(&json!({ "mutations": mutations }))
        .send()
        .await?;

    let response = check_response(response, document_id, revision).await?;
    let body = response.text().await?;
    let parsed: MutateResponse = serde_json::from_str(&body)?;
    debug!("Transaction {} committed", parsed.transaction_id);
    Ok(parsed)
}

/// Upload an image asset and return its document id
pub async fn upload_image(
    client: &Client,
    base: &str,
    dataset: &str,
    token: &str,
    image: ImageUpload,
) -> Result<String, SourceError> {
    let mut url = format!("{}/assets/images/{}", base, dataset);
    if let Some(filename) = &image.filename {
        url.push_str(&format!("?filename={}", urlencoding::encode(filename)));
    }

    let size = image.bytes.len();
    let response = client
        .post(&url)
        .bearer_auth(token)
        .header("Content-Type", image.content_type)
        .body(image.bytes)
        .send()
        .await?;

    let response = check_response(response, None, None).await?;
    let body = response.text().await?;
    let parsed: AssetResponse = serde_json::from_str(&body)?;
    debug!("Uploaded image asset {} ({} bytes)", parsed.document.id, size);
    Ok(parsed.document.id)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_query_url_encodes_params() {
        let url = query_url(
            "https://abc.apicdn.sanity.io/v2021-10-21",
            "production",
            "*[_id == $id][0]",
            &[("id", json!("movie-1"))],
        );
        assert!(url.starts_with("https://abc.apicdn.sanity.io/v2021-10-21/data/query/production?query="));
        assert!(url.contains("%2A%5B_id%20%3D%3D%20%24id%5D%5B0%5D"));
        assert!(url.ends_with("&%24id=%22movie-1%22"));
    }

    #[test]
    fn test_mutate_response_decodes() {
        let body = r#"{
            "transactionId": "tx1",
            "results": [{"id": "movie-1", "operation": "update", "document": {"_id": "movie-1", "title": "Heat"}}]
        }"#;
        let parsed: MutateResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.transaction_id, "tx1");
        assert_eq!(parsed.results[0].id, "movie-1");
        assert_eq!(parsed.results[0].document.as_ref().unwrap()["title"], "Heat");
    }
}
