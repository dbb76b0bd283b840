use actix_web::{web, HttpResponse, Responder};
use validator::Validate;

use crate::core::Debouncer;
use crate::models::{
    AutocompleteQuery, AutocompleteResponse, Coordinate, ErrorResponse, ReverseGeocodeQuery,
    ReverseGeocodeResponse,
};
use crate::routes::events::AppState;
use crate::services::GeocodeError;

/// Configure place lookup routes
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg
        .route("/places/autocomplete", web::get().to(autocomplete))
        .route("/places/reverse", web::get().to(reverse_geocode));
}

fn geocode_error_response(e: &GeocodeError, error: &str) -> HttpResponse {
    let status = match e {
        GeocodeError::ZeroResults(_) => actix_web::http::StatusCode::NOT_FOUND,
        GeocodeError::RequestError(_) => actix_web::http::StatusCode::SERVICE_UNAVAILABLE,
        _ => actix_web::http::StatusCode::BAD_GATEWAY,
    };
    HttpResponse::build(status).json(ErrorResponse {
        error: error.to_string(),
        message: e.to_string(),
        status_code: status.as_u16(),
    })
}

/// Address suggestions for a partially typed query
///
/// GET /api/v1/places/autocomplete?input=leed&session=abc
///
/// Requests sharing a `session` are debounced: only the last keystroke
/// within the delay reaches the provider, earlier ones come back with
/// `superseded: true`.
async fn autocomplete(
    state: web::Data<AppState>,
    query: web::Query<AutocompleteQuery>,
) -> impl Responder {
    let AutocompleteQuery { input, session } = query.into_inner();

    let input = match session {
        Some(session) => {
            let delay = state.debounce_delay;
            let debouncer = state
                .debouncers
                .get_with(session, async move { Debouncer::new(delay) })
                .await;

            match debouncer.debounce(input).await {
                Some(input) => input,
                None => {
                    return HttpResponse::Ok().json(AutocompleteResponse {
                        predictions: Vec::new(),
                        superseded: true,
                    })
                }
            }
        }
        None => input,
    };

    match state.geocoder.autocomplete(input.trim()).await {
        Ok(predictions) => HttpResponse::Ok().json(AutocompleteResponse {
            predictions,
            superseded: false,
        }),
        Err(e) => {
            tracing::warn!("Autocomplete failed for '{}': {}", input, e);
            geocode_error_response(&e, "Failed to fetch suggestions")
        }
    }
}

/// Formatted address for a point
///
/// GET /api/v1/places/reverse?lat=53.8008&lon=-1.5491
async fn reverse_geocode(
    state: web::Data<AppState>,
    query: web::Query<ReverseGeocodeQuery>,
) -> impl Responder {
    if let Err(errors) = query.validate() {
        return HttpResponse::BadRequest().json(ErrorResponse {
            error: "Validation failed".to_string(),
            message: errors.to_string(),
            status_code: 400,
        });
    }

    let point = Coordinate::new(query.lat, query.lon);
    match state.geocoder.reverse_geocode(point).await {
        Ok(address) => HttpResponse::Ok().json(ReverseGeocodeResponse { address }),
        Err(e) => {
            tracing::warn!("Reverse geocoding failed for ({}, {}): {}", query.lat, query.lon, e);
            geocode_error_response(&e, "Failed to resolve location")
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_geocode_error_status_mapping() {
        let missing = geocode_error_response(&GeocodeError::ZeroResults("nowhere".into()), "Failed");
        assert_eq!(missing.status(), actix_web::http::StatusCode::NOT_FOUND);

        let denied = geocode_error_response(
            &GeocodeError::ProviderError {
                status: "REQUEST_DENIED".into(),
                message: "bad key".into(),
            },
            "Failed",
        );
        assert_eq!(denied.status(), actix_web::http::StatusCode::BAD_GATEWAY);
    }
}
