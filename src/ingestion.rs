//! reqwest-backed [`EventSink`] for the ingestion service's stream API.

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use reqwest::{Client, StatusCode};
use serde::Serialize;
use tracing::debug;

use crate::contract::EventSink;
use crate::error::DispatchError;
use crate::model::{NormalizedEvent, StreamTarget};

#[derive(Debug, Clone)]
pub struct IngestionClient {
    http: Client,
    base_url: String,
}

impl IngestionClient {
    pub fn new(base_url: impl Into<String>) -> Result<Self, DispatchError> {
        let http = Client::builder().build()?;
        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    fn events_url(&self, stream_id: &str) -> String {
        format!("{}/v1/streams/{}/events", self.base_url, stream_id)
    }

    async fn post<B: Serialize + ?Sized>(
        &self,
        url: &str,
        target: &StreamTarget,
        body: &B,
    ) -> Result<(), DispatchError> {
        let resp = self
            .http
            .post(url)
            .header(AUTHORIZATION, target.write_token.as_str())
            .json(body)
            .send()
            .await?;
        debug!(url = %url, status = %resp.status(), "Ingestion service responded");
        check_status(resp.status(), &target.stream_id)
    }
}

/// 2xx is success, 404 means the stream is gone, anything else is a rejection.
pub fn check_status(status: StatusCode, stream_id: &str) -> Result<(), DispatchError> {
    if status.is_success() {
        Ok(())
    } else if status == StatusCode::NOT_FOUND {
        Err(DispatchError::StreamNotFound {
            stream_id: stream_id.to_string(),
        })
    } else {
        Err(DispatchError::Rejected {
            status: status.as_u16(),
        })
    }
}

#[async_trait]
impl EventSink for IngestionClient {
    async fn send_event(
        &self,
        target: &StreamTarget,
        event: &NormalizedEvent,
    ) -> Result<(), DispatchError> {
        let url = self.events_url(&target.stream_id);
        self.post(&url, target, event).await
    }

    async fn send_batch(
        &self,
        target: &StreamTarget,
        events: &[NormalizedEvent],
    ) -> Result<(), DispatchError> {
        let url = format!("{}/batch", self.events_url(&target.stream_id));
        self.post(&url, target, events).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn not_found_maps_to_stream_not_found() {
        let err = check_status(StatusCode::NOT_FOUND, "s-1").unwrap_err();
        assert!(matches!(err, DispatchError::StreamNotFound { stream_id } if stream_id == "s-1"));
    }

    #[test]
    fn any_2xx_is_success() {
        assert!(check_status(StatusCode::OK, "s").is_ok());
        assert!(check_status(StatusCode::ACCEPTED, "s").is_ok());
    }

    #[test]
    fn other_errors_are_rejections() {
        let err = check_status(StatusCode::BAD_GATEWAY, "s").unwrap_err();
        assert!(matches!(err, DispatchError::Rejected { status: 502 }));
    }
}
