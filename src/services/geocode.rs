use crate::models::{Coordinate, PlacePrediction};
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;

/// Shortest input worth sending to autocomplete
pub const MIN_AUTOCOMPLETE_INPUT: usize = 3;

/// Errors that can occur when interacting with the geocoding provider
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Provider returned status {status}: {message}")]
    ProviderError { status: String, message: String },

    #[error("No results for '{0}'")]
    ZeroResults(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),
}

#[derive(Debug, Deserialize)]
struct GeocodeResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    results: Vec<GeocodeResult>,
}

#[derive(Debug, Deserialize)]
struct GeocodeResult {
    #[serde(default)]
    formatted_address: String,
    geometry: Geometry,
}

#[derive(Debug, Deserialize)]
struct Geometry {
    location: LatLng,
}

#[derive(Debug, Deserialize)]
struct LatLng {
    lat: f64,
    lng: f64,
}

#[derive(Debug, Deserialize)]
struct AutocompleteApiResponse {
    status: String,
    #[serde(default)]
    error_message: Option<String>,
    #[serde(default)]
    predictions: Vec<ApiPrediction>,
}

#[derive(Debug, Deserialize)]
struct ApiPrediction {
    description: String,
    place_id: String,
}

/// Geocoding and places client
pub struct GeocodeClient {
    base_url: String,
    api_key: String,
    country: Option<String>,
    client: Client,
}

impl GeocodeClient {
    /// Create a new geocoding client
    ///
    /// `country` restricts autocomplete predictions (e.g. `uk`).
    pub fn new(base_url: String, api_key: String, country: Option<String>) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(Duration::from_secs(10)).build()?;

        Ok(Self {
            base_url,
            api_key,
            country,
            client,
        })
    }

    fn url(&self, path: &str, params: &[(&str, String)]) -> String {
        let query = params
            .iter()
            .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
            .chain(std::iter::once(format!("key={}", urlencoding::encode(&self.api_key))))
            .collect::<Vec<_>>()
            .join("&");
        format!("{}/{}?{}", self.base_url.trim_end_matches('/'), path, query)
    }

    fn check_status(status: &str, error_message: Option<String>, subject: &str) -> Result<(), GeocodeError> {
        match status {
            "OK" => Ok(()),
            "ZERO_RESULTS" => Err(GeocodeError::ZeroResults(subject.to_string())),
            other => {
                if other == "REQUEST_DENIED" {
                    tracing::error!("Geocoding request denied; check the API key and billing");
                }
                Err(GeocodeError::ProviderError {
                    status: other.to_string(),
                    message: error_message.unwrap_or_default(),
                })
            }
        }
    }

    async fn geocode_request(&self, params: &[(&str, String)], subject: &str) -> Result<GeocodeResult, GeocodeError> {
        let url = self.url("geocode/json", params);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(GeocodeError::ProviderError {
                status: response.status().to_string(),
                message: "HTTP error".to_string(),
            });
        }

        let body: GeocodeResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;
        Self::check_status(&body.status, body.error_message, subject)?;

        body.results
            .into_iter()
            .next()
            .ok_or_else(|| GeocodeError::ZeroResults(subject.to_string()))
    }

    /// Resolve a free-text address to a coordinate
    pub async fn geocode(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        tracing::debug!("Geocoding address: {}", address);
        let result = self
            .geocode_request(&[("address", address.to_string())], address)
            .await?;
        Ok(Coordinate::new(result.geometry.location.lat, result.geometry.location.lng))
    }

    /// Resolve a coordinate to a human-readable address
    pub async fn reverse_geocode(&self, coord: Coordinate) -> Result<String, GeocodeError> {
        let latlng = format!("{},{}", coord.latitude, coord.longitude);
        let result = self.geocode_request(&[("latlng", latlng.clone())], &latlng).await?;
        Ok(result.formatted_address)
    }

    /// Place predictions for partial input
    pub async fn autocomplete(&self, input: &str) -> Result<Vec<PlacePrediction>, GeocodeError> {
        let input = input.trim();
        if input.chars().count() < MIN_AUTOCOMPLETE_INPUT {
            return Ok(Vec::new());
        }

        let mut params = vec![("input", input.to_string())];
        if let Some(country) = &self.country {
            params.push(("components", format!("country:{}", country)));
        }
        let url = self.url("place/autocomplete/json", &params);

        let response = self.client.get(&url).send().await?;
        let body: AutocompleteApiResponse = response
            .json()
            .await
            .map_err(|e| GeocodeError::InvalidResponse(e.to_string()))?;

        match Self::check_status(&body.status, body.error_message, input) {
            Ok(()) => {}
            Err(GeocodeError::ZeroResults(_)) => return Ok(Vec::new()),
            Err(e) => return Err(e),
        }

        Ok(body
            .predictions
            .into_iter()
            .map(|p| PlacePrediction {
                place_id: p.place_id,
                description: p.description,
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_url_encodes_params_and_key() {
        let client = GeocodeClient::new(
            "https://maps.test/api/".to_string(),
            "k&y".to_string(),
            None,
        )
        .unwrap();

        let url = client.url("geocode/json", &[("address", "Leeds Station, UK".to_string())]);
        assert_eq!(
            url,
            "https://maps.test/api/geocode/json?address=Leeds%20Station%2C%20UK&key=k%26y"
        );
    }

    #[test]
    fn test_status_mapping() {
        assert!(GeocodeClient::check_status("OK", None, "x").is_ok());
        assert!(matches!(
            GeocodeClient::check_status("ZERO_RESULTS", None, "x"),
            Err(GeocodeError::ZeroResults(_))
        ));
        assert!(matches!(
            GeocodeClient::check_status("REQUEST_DENIED", Some("bad key".into()), "x"),
            Err(GeocodeError::ProviderError { .. })
        ));
    }

    #[tokio::test]
    async fn test_short_input_skips_request() {
        // Unroutable base URL: a request would fail
        let client = GeocodeClient::new("http://127.0.0.1:9".to_string(), "key".to_string(), None).unwrap();
        let predictions = client.autocomplete("le").await.unwrap();
        assert!(predictions.is_empty());
    }
}
