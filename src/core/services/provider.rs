use async_trait::async_trait;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::core::models::ProviderSongDetail;
use crate::error::ProviderError;

/// Source of song details for a (group, song) pair
#[async_trait]
pub trait LyricsProvider: Send + Sync {
    async fn fetch(&self, group: &str, song: &str) -> Result<ProviderSongDetail, ProviderError>;
}

/// Lyrics provider reached over HTTP: `GET <endpoint>?group=..&song=..`
#[derive(Clone)]
pub struct HttpLyricsProvider {
    client: reqwest::Client,
    endpoint: Url,
}

impl HttpLyricsProvider {
    pub fn new(endpoint: &str, request_timeout: Duration) -> Result<Self, ProviderError> {
        let version = env!("CARGO_PKG_VERSION");
        let user_agent = format!("musiclab v{}", version);

        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .user_agent(user_agent)
            .build()?;

        Ok(Self {
            client,
            endpoint: Url::parse(endpoint)?,
        })
    }

    pub fn build_url(&self, group: &str, song: &str) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("group", group)
            .append_pair("song", song);
        url
    }
}

#[async_trait]
impl LyricsProvider for HttpLyricsProvider {
    async fn fetch(&self, group: &str, song: &str) -> Result<ProviderSongDetail, ProviderError> {
        let url = self.build_url(group, song);
        debug!("Requesting song details from {}", url);

        let response = self.client.get(url).send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ProviderError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = response.text().await?;
        serde_json::from_str::<ProviderSongDetail>(&body).map_err(|e| ProviderError::InvalidResponse {
            reason: e.to_string(),
        })
    }
}
