use async_trait::async_trait;
use reqwest::{Client, StatusCode, Url};
use serde::de::DeserializeOwned;
use studionavi_common::{ApiEnvelope, AvailabilityData, SearchWindow, Studio, StudioAvailability, StudioId};
use tracing::{debug, error};

use crate::aggregator::AvailabilitySource;
use crate::config::ClientConfig;
use crate::error::{ConfigError, FetchError};

/// Client for the studio API.
#[derive(Debug, Clone)]
pub struct HttpStudioApi {
    client: Client,
    base_url: Url,
}

impl HttpStudioApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ConfigError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| ConfigError::HttpClient(e.to_string()))?;
        Ok(HttpStudioApi {
            client,
            base_url: config.base_url.clone(),
        })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn endpoint(&self, path: &str) -> Result<Url, FetchError> {
        self.base_url
            .join(path)
            .map_err(|e| FetchError::Unknown(format!("bad endpoint {}: {}", path, e)))
    }

    async fn get_bytes(&self, url: Url, query: &[(&str, String)]) -> Result<(StatusCode, Vec<u8>), FetchError> {
        debug!("GET {}", url);
        let resp = self
            .client
            .get(url)
            .query(query)
            .send()
            .await
            .map_err(FetchError::from_reqwest)?;
        let status = resp.status();
        let body = resp.bytes().await.map_err(FetchError::from_reqwest)?;
        Ok((status, body.to_vec()))
    }

    /// `GET /studios/search?q=`
    pub async fn search_studios(&self, query: &str) -> Result<Vec<Studio>, FetchError> {
        let url = self.endpoint("studios/search")?;
        let (status, body) = self.get_bytes(url, &[("q", query.to_string())]).await?;
        decode_plain(status, &body)
    }

    /// `GET /studios/{id}`
    pub async fn get_studio(&self, id: StudioId) -> Result<Studio, FetchError> {
        let url = self.endpoint(&format!("studios/{}", id))?;
        let (status, body) = self.get_bytes(url, &[]).await?;
        decode_plain(status, &body)
    }

    /// `GET /studios/{id}/availability?date&start&end&duration`
    pub async fn availability(&self, id: StudioId, window: &SearchWindow) -> Result<AvailabilityData, FetchError> {
        let url = self.endpoint(&format!("studios/{}/availability", id))?;
        let (status, body) = self.get_bytes(url, &window.query_pairs()).await?;
        decode_envelope(status, &body)
    }
}

#[async_trait]
impl AvailabilitySource for HttpStudioApi {
    async fn fetch_availability(
        &self,
        studio: &Studio,
        window: &SearchWindow,
    ) -> Result<StudioAvailability, FetchError> {
        let data = self.availability(studio.id, window).await?;
        let studio_name = if data.studio_name.is_empty() {
            studio.name.clone()
        } else {
            data.studio_name
        };
        Ok(StudioAvailability {
            studio_id: studio.id,
            studio_name,
            available_ranges: data.available_ranges,
        })
    }
}

/// Classify an enveloped response body.
///
/// An error envelope is a server error whatever the HTTP status. A success
/// envelope only counts on a 2xx status. Anything else is unknown.
fn decode_envelope<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, FetchError> {
    match serde_json::from_slice::<ApiEnvelope<T>>(body) {
        Ok(ApiEnvelope::Success { data }) if status.is_success() => Ok(data),
        Ok(ApiEnvelope::Success { .. }) => Err(FetchError::Unknown(format!("success envelope with HTTP {}", status))),
        Ok(ApiEnvelope::Error { error: reported }) => {
            if status.is_server_error() {
                error!(code = %reported.code, %status, "server reported failure: {}", reported.message);
            }
            Err(FetchError::Server {
                code: reported.code,
                message: reported.message,
                details: reported.details,
            })
        }
        Err(e) => Err(FetchError::Unknown(format!("HTTP {}: {}", status, e))),
    }
}

/// Classify a bare JSON response, falling back to the error envelope on non-2xx.
fn decode_plain<T: DeserializeOwned>(status: StatusCode, body: &[u8]) -> Result<T, FetchError> {
    if status.is_success() {
        return serde_json::from_slice(body).map_err(|e| FetchError::Unknown(format!("HTTP {}: {}", status, e)));
    }
    match serde_json::from_slice::<ApiEnvelope<serde_json::Value>>(body) {
        Ok(ApiEnvelope::Error { error }) => Err(FetchError::Server {
            code: error.code,
            message: error.message,
            details: error.details,
        }),
        _ => Err(FetchError::Unknown(format!("HTTP {}", status))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_envelope_wins_over_status() {
        let body = br#"{"status":"error","error":{"code":"STUDIO_NOT_CONFIGURED","message":"nope"}}"#;
        for status in [StatusCode::OK, StatusCode::NOT_FOUND, StatusCode::SERVICE_UNAVAILABLE] {
            let err = decode_envelope::<AvailabilityData>(status, body).unwrap_err();
            assert_eq!(err.code(), "STUDIO_NOT_CONFIGURED");
            assert_eq!(err.user_message(), "nope");
        }
    }

    #[test]
    fn malformed_bodies_are_unknown() {
        let err = decode_envelope::<AvailabilityData>(StatusCode::OK, b"<html>").unwrap_err();
        assert!(matches!(err, FetchError::Unknown(_)));

        let err = decode_envelope::<AvailabilityData>(StatusCode::OK, br#"{"status":"success","data":{}}"#).unwrap_err();
        assert!(matches!(err, FetchError::Unknown(_)));

        let body = br#"{"status":"success","data":{"studioId":"1","studioName":"A","date":"2025-01-28","availableRanges":[]}}"#;
        let err = decode_envelope::<AvailabilityData>(StatusCode::BAD_GATEWAY, body).unwrap_err();
        assert!(matches!(err, FetchError::Unknown(_)));
    }

    #[test]
    fn plain_not_found_uses_envelope() {
        let body = r#"{"status":"error","error":{"code":"STUDIO_NOT_FOUND","message":"スタジオが見つかりません"}}"#;
        let err = decode_plain::<Studio>(StatusCode::NOT_FOUND, body.as_bytes()).unwrap_err();
        assert_eq!(err.code(), "STUDIO_NOT_FOUND");

        let err = decode_plain::<Studio>(StatusCode::INTERNAL_SERVER_ERROR, b"boom").unwrap_err();
        assert!(matches!(err, FetchError::Unknown(_)));
    }
}
