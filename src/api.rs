// Client for the rental site's JSON endpoints (availability and car search)

use crate::format::input_value;
use crate::models::{AvailabilityQuery, AvailabilityResponse, CarSearchResponse, SearchResult};
use async_trait::async_trait;
use reqwest::Url;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("API error: {status_code} - {message}")]
    ApiResponseError { status_code: u16, message: String },

    #[error("Decode error: {0}")]
    DecodeError(String),

    #[error("Invalid URL: {0}")]
    InvalidUrl(String),
}

#[derive(Error, Debug)]
pub enum ClientError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Initialization error: {0}")]
    InitError(String),
}

#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    // No timeout unless configured; a hung request only blocks its own flow
    pub timeout_ms: Option<u64>,
    pub user_agent: String,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:8000/".to_string(),
            timeout_ms: None,
            user_agent: concat!("rentacar-client/", env!("CARGO_PKG_VERSION")).to_string(),
        }
    }
}

#[async_trait]
pub trait RentalApi: Send + Sync + 'static {
    // GET /api/cars/{car_id}/availability/
    async fn availability(&self, query: AvailabilityQuery)
        -> Result<AvailabilityResponse, ApiError>;

    // GET /api/cars/?search=..&limit=..
    async fn search_cars(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ApiError>;
}

// Availability as a plain yes/no. Every transport or decoding failure is
// reported as unavailable, so a booking is never offered on an error.
pub async fn check_car_availability(api: &dyn RentalApi, query: AvailabilityQuery) -> bool {
    match api.availability(query).await {
        Ok(response) => response.available,
        Err(e) => {
            error!(car_id = query.car_id, error = %e, "Error checking availability");
            false
        }
    }
}

// Page path of a car's detail view.
pub fn car_detail_path(car_id: u64) -> String {
    format!("/cars/{}/", car_id)
}

pub fn availability_url(base: &Url, query: &AvailabilityQuery) -> Result<Url, ApiError> {
    let mut url = base
        .join(&format!("api/cars/{}/availability/", query.car_id))
        .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

    url.query_pairs_mut()
        .append_pair("pickup_date", &input_value(query.pickup))
        .append_pair("return_date", &input_value(query.return_at));

    Ok(url)
}

pub fn search_url(base: &Url, query: &str, limit: usize) -> Result<Url, ApiError> {
    let mut url = base
        .join("api/cars/")
        .map_err(|e| ApiError::InvalidUrl(e.to_string()))?;

    url.query_pairs_mut()
        .append_pair("search", query)
        .append_pair("limit", &limit.to_string());

    Ok(url)
}

pub struct HttpRentalApi {
    client: reqwest::Client,
    base_url: Url,
}

impl HttpRentalApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ClientError> {
        let base_url = parse_base_url(&config.base_url)?;

        let mut builder = reqwest::Client::builder().user_agent(config.user_agent.clone());
        if let Some(timeout_ms) = config.timeout_ms {
            builder = builder.timeout(Duration::from_millis(timeout_ms));
        }
        let client = builder
            .build()
            .map_err(|e| ClientError::InitError(e.to_string()))?;

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    async fn get_json<T: DeserializeOwned>(&self, url: Url) -> Result<T, ApiError> {
        debug!(%url, "GET");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        let status = response.status();
        let body = response
            .text()
            .await
            .map_err(|e| ApiError::NetworkError(e.to_string()))?;

        if !status.is_success() {
            return Err(ApiError::ApiResponseError {
                status_code: status.as_u16(),
                message: body,
            });
        }

        serde_json::from_str(&body).map_err(|e| ApiError::DecodeError(e.to_string()))
    }
}

// Relative joins need the base path to end with a slash
fn parse_base_url(raw: &str) -> Result<Url, ClientError> {
    let mut url = Url::parse(raw.trim()).map_err(|e| ClientError::ConfigError(e.to_string()))?;
    if url.cannot_be_a_base() {
        return Err(ClientError::ConfigError(format!(
            "base URL cannot have relative paths: {}",
            raw
        )));
    }
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    Ok(url)
}

#[async_trait]
impl RentalApi for HttpRentalApi {
    async fn availability(
        &self,
        query: AvailabilityQuery,
    ) -> Result<AvailabilityResponse, ApiError> {
        let url = availability_url(&self.base_url, &query)?;
        self.get_json(url).await
    }

    async fn search_cars(&self, query: &str, limit: usize) -> Result<Vec<SearchResult>, ApiError> {
        let url = search_url(&self.base_url, query, limit)?;
        let response: CarSearchResponse = self.get_json(url).await?;
        Ok(response.results.into_iter().map(Into::into).collect())
    }
}
