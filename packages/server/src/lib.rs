#![cfg_attr(feature = "fail-on-warnings", deny(warnings))]
#![warn(clippy::all, clippy::pedantic, clippy::nursery, clippy::cargo)]
#![allow(clippy::multiple_crate_versions, clippy::cargo_common_metadata)]

//! Actix-Web API server for the displacement dashboard.
//!
//! Serves the dropdown controls, the stacked bar and choropleth figures
//! computed from the in-memory [`Dataset`], and the static frontend from
//! `app/dist`. The dataset is loaded before the server starts and shared
//! read-only between workers.

pub mod controls;
pub mod dataset;
mod handlers;

use std::sync::Arc;

use actix_cors::Cors;
use actix_files::Files;
use actix_web::{App, HttpServer, middleware, web};

pub use dataset::{DataPaths, Dataset, DatasetError, load_dataset};

/// Directory holding the built frontend.
pub const STATIC_DIR: &str = "app/dist";

/// Shared application state.
pub struct AppState {
    /// Respondents, dictionary, and state summary loaded at startup.
    pub dataset: Arc<Dataset>,
}

/// Where the server listens.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub bind_addr: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1".to_string(),
            port: 8080,
        }
    }
}

/// Registers the `/api` routes.
pub fn configure_api(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(handlers::health))
            .route("/controls", web::get().to(handlers::controls))
            .route("/charts/damage", web::get().to(handlers::damage_chart))
            .route("/charts/duration", web::get().to(handlers::duration_chart))
            .route("/charts/geo", web::get().to(handlers::geo_chart)),
    );
}

/// Starts the dashboard server over an already loaded dataset.
///
/// The caller provides the async runtime (e.g. via `#[actix_web::main]`).
///
/// # Errors
///
/// Returns an `std::io::Result` error if the HTTP server fails to bind or
/// encounters a runtime error.
#[allow(clippy::future_not_send)]
pub async fn run_server(config: ServerConfig, dataset: Dataset) -> std::io::Result<()> {
    let state = web::Data::new(AppState {
        dataset: Arc::new(dataset),
    });

    log::info!("Starting server on {}:{}", config.bind_addr, config.port);

    HttpServer::new(move || {
        let cors = Cors::permissive();

        App::new()
            .wrap(cors)
            .wrap(middleware::Logger::default())
            .app_data(state.clone())
            .configure(configure_api)
            // Serve frontend static files (production)
            .service(Files::new("/", STATIC_DIR).index_file("index.html"))
    })
    .bind((config.bind_addr, config.port))?
    .run()
    .await
}

#[cfg(test)]
mod tests {
    use actix_web::{http::StatusCode, test};
    use displacement_geography::summary::read_geo_summary;
    use displacement_survey::{
        dictionary::read_dictionary, preprocess::preprocess, respondents::read_respondents,
    };

    use super::*;

    const DICTIONARY: &str = "\
Variable,Name,Type,Conversion
ND_DAMAGE,Property damage,Ordinal,1=No damage;2=Minor damage;3=Major damage
ND_HOWLONG,Displacement duration,Ordinal,1=Never returned;2=Less than a week
TENURE,Housing tenure,Nominal,1=Owned;2=Rented
MS,Marital status,Nominal,1=Married;2=Never married
TBIRTH_YEAR,Year of birth,Numeric,
";

    const RESPONDENTS: &str = "\
SCRAM,HWEIGHT,ND_DAMAGE,ND_HOWLONG,TENURE,TBIRTH_YEAR
A,10,1,2,1,1980
B,5,2,2,1,1990
C,5,3,1,2,-99
D,1,-99,1,2,1970
";

    const GEO: &str = "\
state,code,displaced_rate,never_returned
Texas,TX,0.04,0.2
Florida,12,0.06,
";

    fn dataset_from(respondents: &str) -> Dataset {
        let dictionary = read_dictionary(DICTIONARY.as_bytes()).unwrap();
        let table = read_respondents(respondents.as_bytes()).unwrap();
        let (table, dictionary) = preprocess(table, &dictionary, 2022).unwrap();
        let geo = read_geo_summary(GEO.as_bytes()).unwrap();
        Dataset {
            table,
            dictionary,
            geo,
        }
    }

    async fn get_from(dataset: Dataset, uri: &str) -> (StatusCode, serde_json::Value) {
        let state = web::Data::new(AppState {
            dataset: Arc::new(dataset),
        });
        let app = test::init_service(App::new().app_data(state).configure(configure_api)).await;
        let response =
            test::call_service(&app, test::TestRequest::get().uri(uri).to_request()).await;
        let status = response.status();
        let body: serde_json::Value = test::read_body_json(response).await;
        (status, body)
    }

    async fn get(uri: &str) -> (StatusCode, serde_json::Value) {
        get_from(dataset_from(RESPONDENTS), uri).await
    }

    #[actix_web::test]
    async fn health() {
        let (status, body) = get("/api/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["healthy"], true);
    }

    #[actix_web::test]
    async fn controls_list_three_dropdowns() {
        let (status, body) = get("/api/controls").await;
        assert_eq!(status, StatusCode::OK);

        let controls = body.as_array().unwrap();
        assert_eq!(controls.len(), 3);
        assert_eq!(controls[0]["id"], "damage");
        assert_eq!(controls[0]["defaultValue"], "ND_HOWLONG");
        let damage_options: Vec<&str> = controls[0]["options"]
            .as_array()
            .unwrap()
            .iter()
            .filter_map(|o| o["value"].as_str())
            .collect();
        assert!(!damage_options.contains(&"ND_DAMAGE"));
        assert!(damage_options.contains(&"AGE_BIN"));
        assert!(!damage_options.contains(&"MS"));
        assert_eq!(controls[2]["defaultValue"], "displaced_rate");
    }

    #[actix_web::test]
    async fn damage_chart_defaults_to_duration() {
        let (status, body) = get("/api/charts/damage").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["layout"]["barmode"], "stack");
        assert_eq!(body["layout"]["xaxis"]["title"]["text"], "Displacement duration");
        assert_eq!(body["layout"]["legend"]["title"]["text"], "Property damage");
        assert_eq!(body["data"].as_array().unwrap().len(), 3);
        assert_eq!(body["data"][0]["x"][1], "Less than a week\n(n=2)");
        assert_eq!(body["data"][0]["y"][1], 10.0 / 15.0);
    }

    #[actix_web::test]
    async fn duration_chart_by_tenure() {
        let (status, body) = get("/api/charts/duration?factor=TENURE").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["name"], "Never returned");
        assert_eq!(body["data"][0]["x"][0], "Owned\n(n=2)");
        assert_eq!(body["data"][0]["x"][1], "Rented\n(n=2)");
        assert_eq!(body["layout"]["colorway"].as_array().unwrap().len(), 5);
    }

    #[actix_web::test]
    async fn derived_bins_can_be_charted() {
        let (status, body) = get("/api/charts/damage?factor=AGE_BIN").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["layout"]["xaxis"]["title"]["text"], "Age");
    }

    #[actix_web::test]
    async fn unknown_factor_is_bad_request() {
        let (status, body) = get("/api/charts/damage?factor=NOPE").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].is_string());

        let (status, _) = get("/api/charts/damage?factor=ND_DAMAGE").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = get("/api/charts/geo?factor=flooded").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[actix_web::test]
    async fn factor_without_column_is_not_offered() {
        let (status, body) = get("/api/charts/damage?factor=MS").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["error"].as_str().unwrap().contains("MS"));
    }

    #[actix_web::test]
    async fn default_factor_without_column_is_not_found() {
        let respondents = "SCRAM,HWEIGHT,ND_DAMAGE,TENURE\nA,1,1,1\n";
        let (status, body) = get_from(dataset_from(respondents), "/api/charts/damage").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["error"].as_str().unwrap().contains("ND_HOWLONG"));
    }

    #[actix_web::test]
    async fn geo_chart() {
        let (status, body) = get("/api/charts/geo?factor=never_returned").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["type"], "choropleth");
        assert_eq!(body["data"][0]["locations"], serde_json::json!(["TX"]));
        assert_eq!(body["layout"]["geo"]["scope"], "usa");

        let (_, body) = get("/api/charts/geo").await;
        assert_eq!(body["data"][0]["locations"], serde_json::json!(["FL", "TX"]));
    }
}
