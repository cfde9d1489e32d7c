use super::types::HealthProbe;
use crate::Result;
use std::time::Duration;
use tracing::debug;

/// 基于 reqwest 的 HTTP 健康探测
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
}

impl HttpProbe {
    pub fn new(request_timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(request_timeout)
            .connect_timeout(request_timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl HealthProbe for HttpProbe {
    async fn probe(&self, url: &str) -> bool {
        match self.client.get(url).send().await {
            Ok(response) => {
                debug!("GET {} -> {}", url, response.status());
                response.status().is_success()
            }
            Err(e) => {
                debug!("GET {} 失败: {}", url, e);
                false
            }
        }
    }
}
