use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, warn};

use crate::config::PlannerConfig;
use crate::estimate::{CompletionTimes, RateContext};
use crate::{ProductRates, TrainingPlan};

#[derive(Clone)]
pub struct RatesClient {
    endpoint: String,
    api_prefix: String,
    client: reqwest::Client,
}

/// Body of the backend's `effective-rates` endpoint.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct EffectiveRatesResponse {
    #[serde(default)]
    pub is_advanced: bool,
    #[serde(default)]
    pub rates: ProductRates,
    #[serde(default)]
    pub completion_times: Option<CompletionTimes>,
    #[serde(default)]
    pub fallback_single_rate: Option<f64>,
}

impl EffectiveRatesResponse {
    pub fn rate_context(&self, tier_default: f64) -> RateContext {
        let single_rate = self
            .fallback_single_rate
            .filter(|rate| rate.is_finite())
            .unwrap_or(tier_default);
        RateContext {
            advanced: self.is_advanced,
            single_rate,
            rates: self.rates,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RateSource {
    Backend,
    Local,
}

#[derive(Debug, Clone, Serialize)]
pub struct ResolvedRates {
    pub context: RateContext,
    pub completion_times: Option<CompletionTimes>,
    pub source: RateSource,
}

impl RatesClient {
    pub fn from_config(config: &PlannerConfig) -> Result<Self, String> {
        let timeout = Duration::from_millis(config.backend.timeout_ms);
        RatesClient::new(
            config.backend.endpoint.clone(),
            config.backend.api_prefix.clone(),
            timeout,
        )
    }

    pub fn new(endpoint: String, api_prefix: String, timeout: Duration) -> Result<Self, String> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|err| format!("failed to build rates client: {}", err))?;
        Ok(Self {
            endpoint,
            api_prefix,
            client,
        })
    }

    pub fn project_url(&self, project_id: &str, resource: &str) -> String {
        let prefix = self.api_prefix.trim_matches('/');
        let base = self.endpoint.trim_end_matches('/');
        let project = urlencoding::encode(project_id);
        if prefix.is_empty() {
            format!("{}/projects/{}/{}", base, project, resource)
        } else {
            format!("{}/{}/projects/{}/{}", base, prefix, project, resource)
        }
    }

    pub async fn effective_rates(
        &self,
        project_id: &str,
        section_index: Option<usize>,
        lesson_index: Option<usize>,
    ) -> Result<EffectiveRatesResponse, String> {
        let url = self.project_url(project_id, "effective-rates");
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(index) = section_index {
            query.push(("section_index", index.to_string()));
        }
        if let Some(index) = lesson_index {
            query.push(("lesson_index", index.to_string()));
        }

        let response = self
            .client
            .get(url)
            .query(&query)
            .send()
            .await
            .map_err(|err| format!("effective-rates request failed: {}", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("effective-rates error {}: {}", status, body));
        }

        response
            .json::<EffectiveRatesResponse>()
            .await
            .map_err(|err| format!("effective-rates response parse failed: {}", err))
    }

    pub async fn save_plan(&self, project_id: &str, plan: &TrainingPlan) -> Result<(), String> {
        let url = self.project_url(project_id, "training-plan");
        let response = self
            .client
            .put(url)
            .json(plan)
            .send()
            .await
            .map_err(|err| format!("plan save request failed: {}", err))?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            return Err(format!("plan save error {}: {}", status, body));
        }
        debug!(project_id, "training plan saved");
        Ok(())
    }
}

/// Asks the backend for effective rates and falls back to the locally
/// resolved context when the client is missing or the call fails.
pub async fn effective_rates_or_local(
    client: Option<&RatesClient>,
    project_id: &str,
    section_index: Option<usize>,
    lesson_index: Option<usize>,
    local: RateContext,
    tier_default: f64,
) -> ResolvedRates {
    let local_rates = ResolvedRates {
        context: local,
        completion_times: None,
        source: RateSource::Local,
    };
    let client = match client {
        Some(client) => client,
        None => return local_rates,
    };

    match client
        .effective_rates(project_id, section_index, lesson_index)
        .await
    {
        Ok(response) => ResolvedRates {
            context: response.rate_context(tier_default),
            completion_times: response.completion_times,
            source: RateSource::Backend,
        },
        Err(err) => {
            warn!(error = %err, project_id, "using locally resolved rates");
            local_rates
        }
    }
}
