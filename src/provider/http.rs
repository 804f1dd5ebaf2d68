use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::header::{HeaderMap, HeaderValue, USER_AGENT};
use reqwest::StatusCode;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::time::Duration;
use tracing::debug;

use super::{InterfaceProvider, ProviderError};
use crate::domain::{ExternalId, InterfaceSeries, Scenario, TimeSeries};

/// Fetches interface series from a transmission grid results service
#[derive(Clone)]
pub struct HttpInterfaceProvider {
    base_url: String,
    client: reqwest::Client,
}

impl HttpInterfaceProvider {
    pub fn new(base_url: String, timeout: Duration) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static("grid-batch/0.1"));
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| ProviderError::Unavailable(format!("http client: {e}")))?;
        Ok(Self { base_url, client })
    }

    fn url_for(&self, bus_id: ExternalId, scenario: Scenario) -> String {
        format!(
            "{}/interface/{}/{}",
            self.base_url.trim_end_matches('/'),
            scenario_slug(scenario),
            bus_id
        )
    }
}

fn scenario_slug(scenario: Scenario) -> &'static str {
    match scenario {
        Scenario::StatusQuo => "status-quo",
        Scenario::Nep2035 => "nep2035",
        Scenario::EGo100 => "ego100",
    }
}

#[async_trait]
impl InterfaceProvider for HttpInterfaceProvider {
    async fn get_interface_series(
        &self,
        bus_id: ExternalId,
        scenario: Scenario,
    ) -> Result<InterfaceSeries, ProviderError> {
        let url = self.url_for(bus_id, scenario);
        debug!(%url, "requesting interface series");

        let resp = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("GET {url}: {e}")))?;

        let status = resp.status();
        if status == StatusCode::NOT_FOUND {
            return Err(ProviderError::NotFound { bus_id, scenario });
        }
        let body = resp
            .text()
            .await
            .map_err(|e| ProviderError::Unavailable(format!("reading {url}: {e}")))?;
        if status.is_server_error() {
            return Err(ProviderError::Unavailable(format!("HTTP {status}: {body}")));
        }
        if !status.is_success() {
            return Err(ProviderError::Malformed {
                bus_id,
                reason: format!("HTTP {status}: {body}"),
            });
        }

        let raw: RawInterface = serde_json::from_str(&body).map_err(|e| ProviderError::Malformed {
            bus_id,
            reason: format!("JSON parse failed: {e}"),
        })?;
        let series = raw.into_series();
        series
            .validate()
            .map_err(|reason| ProviderError::Malformed { bus_id, reason })?;
        Ok(series)
    }
}

#[derive(Debug, Deserialize)]
struct RawInterface {
    snapshots: Vec<DateTime<Utc>>,
    potential: BTreeMap<String, Vec<f64>>,
    conv_dispatch: BTreeMap<String, Vec<f64>>,
    #[serde(default)]
    curtailment_abs: BTreeMap<String, Vec<f64>>,
}

impl RawInterface {
    fn into_series(self) -> InterfaceSeries {
        let table = |columns: BTreeMap<String, Vec<f64>>| TimeSeries {
            index: self.snapshots.clone(),
            columns,
        };
        InterfaceSeries {
            potential: table(self.potential),
            conv_dispatch: table(self.conv_dispatch),
            curtailment_abs: table(self.curtailment_abs),
        }
    }
}
