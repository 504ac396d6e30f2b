
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use chrono::Utc;
use cores::settings::MetricsSettings;
use reqwest::{self, Client};
use serde::Serialize;
use tracing::debug;

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct MetricsRequestBody {
    solution: String,
    #[serde(rename = "UUID")]
    uuid: String,
    time_stamp: String,
    data: MetricsData,
}

#[derive(Serialize, Debug)]
#[serde(rename_all = "PascalCase")]
struct MetricsData {
    version: String,
    method: String,
    status_code: u16,
    response_time: f64,
}

#[derive(Debug, Clone)]
pub struct UsageRecord {
    pub method: String,
    pub status_code: u16,
    pub elapsed: Duration,
}

/// Anonymous usage reporting. Sends are best effort and never retried.
pub struct MetricsClient {
    client: Client,
    settings: MetricsSettings,
}

impl MetricsClient {
    pub fn new(settings: &MetricsSettings) -> Result<Arc<Self>> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(5))
            .build()?;
        let this = Self {
            client,
            settings: settings.clone(),
        };
        Ok(Arc::new(this))
    }

    pub async fn send(&self, record: UsageRecord) -> Result<()> {
        let request_body = self.request_body(record);
        debug!("sending anonymous metrics {:?}", request_body);
        let response = self
            .client
            .post(&self.settings.endpoint)
            .header("Content-type", "application/json")
            .json(&request_body)
            .send()
            .await?;
        debug!("anonymous metrics response {}", response.status());
        Ok(())
    }

    fn request_body(&self, record: UsageRecord) -> MetricsRequestBody {
        MetricsRequestBody {
            solution: self.settings.solution_id.clone(),
            uuid: self.settings.uuid.clone(),
            time_stamp: Utc::now().format("%Y-%m-%dT%H:%M:%S%.6f").to_string(),
            data: MetricsData {
                version: self.settings.version.clone(),
                method: record.method,
                status_code: record.status_code,
                response_time: record.elapsed.as_secs_f64(),
            },
        }
    }
}
