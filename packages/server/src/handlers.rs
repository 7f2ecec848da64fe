//! HTTP handler functions for the displacement dashboard API.

use std::str::FromStr as _;

use actix_web::{HttpResponse, web};
use displacement_analytics::{AnalyticsError, crosstab::crosstab};
use displacement_analytics_models::CrossTabRequest;
use displacement_charts::{choropleth_figure, stacked_bar_figure};
use displacement_geography_models::GeoFactor;
use displacement_server_models::{ApiError, ApiHealth, ChartQueryParams};
use displacement_survey_models::Variable;

use crate::AppState;
use crate::controls::{self, BarChart};

/// `GET /api/health`
pub async fn health() -> HttpResponse {
    HttpResponse::Ok().json(ApiHealth {
        healthy: true,
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// `GET /api/controls`
///
/// Returns the dropdowns in page order with their options and defaults.
pub async fn controls(state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok().json(controls::controls(&state.dataset))
}

/// `GET /api/charts/damage`
pub async fn damage_chart(
    state: web::Data<AppState>,
    params: web::Query<ChartQueryParams>,
) -> HttpResponse {
    bar_chart(&state, BarChart::Damage, params.factor.as_deref())
}

/// `GET /api/charts/duration`
pub async fn duration_chart(
    state: web::Data<AppState>,
    params: web::Query<ChartQueryParams>,
) -> HttpResponse {
    bar_chart(&state, BarChart::Duration, params.factor.as_deref())
}

/// `GET /api/charts/geo`
///
/// Returns the state choropleth for the selected geo factor.
pub async fn geo_chart(
    state: web::Data<AppState>,
    params: web::Query<ChartQueryParams>,
) -> HttpResponse {
    let factor = match params.factor.as_deref() {
        None => GeoFactor::default(),
        Some(code) => match GeoFactor::from_str(code) {
            Ok(factor) => factor,
            Err(_) => return bad_request(format!("Unknown geo factor '{code}'")),
        },
    };

    HttpResponse::Ok().json(choropleth_figure(
        &state.dataset.geo,
        factor,
        factor.description(),
    ))
}

/// Cross-tabulates the chart's outcome against the selected factor and
/// returns the stacked bar figure.
fn bar_chart(state: &AppState, chart: BarChart, factor: Option<&str>) -> HttpResponse {
    let factor = match factor {
        None => chart.default_factor(),
        Some(code) => match Variable::from_code(code) {
            Ok(variable)
                if controls::selectable_factors(&state.dataset, chart).contains(&variable) =>
            {
                variable
            }
            Ok(_) => {
                return bad_request(format!(
                    "'{code}' cannot be charted against {}",
                    chart.outcome()
                ));
            }
            Err(e) => return bad_request(e.to_string()),
        },
    };

    let request = CrossTabRequest::new(chart.outcome(), factor).with_samples(true);
    match crosstab(&state.dataset.table, &state.dataset.dictionary, &request) {
        Ok(table) => HttpResponse::Ok().json(stacked_bar_figure(&table, chart.colorway())),
        Err(e) => analytics_error(chart, &e),
    }
}

fn bad_request(message: String) -> HttpResponse {
    log::debug!("Rejecting chart request: {message}");
    HttpResponse::BadRequest().json(ApiError::new(message))
}

fn analytics_error(chart: BarChart, e: &AnalyticsError) -> HttpResponse {
    match e {
        AnalyticsError::MissingDescriptor(_) | AnalyticsError::MissingColumn { .. } => {
            log::warn!("Cannot build {} chart: {e}", chart.id());
            HttpResponse::NotFound().json(ApiError::new(e.to_string()))
        }
        _ => {
            log::error!("Failed to build {} chart: {e}", chart.id());
            HttpResponse::InternalServerError().json(ApiError::new(format!(
                "Failed to build {} chart",
                chart.id()
            )))
        }
    }
}
