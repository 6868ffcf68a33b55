use crate::{api, prelude::*};
use heron_core::prelude::{markers::*, names::*, routes::*, *};
use heron_jobs::prelude::*;
use axum::{
    Router,
    extract::DefaultBodyLimit,
    routing::{get, post},
};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// The builder for the Heron Server.
#[derive(Clone, Debug, Default)]
pub struct HeronServer {
    config: HeronServerConfig,
}

impl HeronServer {
    pub fn new(config: HeronServerConfig) -> Self {
        Self { config }
    }
}

#[derive(Clone, Debug)]
pub struct HeronServerConfig {
    /// The header the shared secret is expected in.
    ///
    /// Defaults to `API_AUTH_SECRET`.
    pub auth_header: String,
    /// Experiment every run is grouped under.
    pub experiment_name: String,
    /// Driver log marker of a payload that is not a zip archive.
    ///
    /// Defaults to `zipfile.BadZipFile`.
    pub invalid_archive_marker: String,
    pub submit: SubmitConfig,
    pub classifier: ClassifierConfig,
}

impl Default for HeronServerConfig {
    fn default() -> Self {
        Self {
            auth_header: DEFAULT_AUTH_HEADER.to_string(),
            experiment_name: DEFAULT_EXPERIMENT.to_string(),
            invalid_archive_marker: BAD_ZIP_FILE.to_string(),
            submit: SubmitConfig::default(),
            classifier: ClassifierConfig::default(),
        }
    }
}

impl HeronServer {
    pub fn build<S: HeronServices>(self, services: S) -> Router {
        let config = self.config;

        let submitter = Submitter::new(
            services.storage().clone(),
            services.compute().clone(),
            services.registry().clone(),
            config.submit.clone(),
        );

        let classifier = StatusClassifier::new(config.classifier.clone())
            .with_rule(SubstringRule::invalid_archive(&config.invalid_archive_marker));
        let fetcher = ResultFetcher::new(services.compute().clone(), classifier);

        let state = AppState {
            services,
            submitter: Arc::new(submitter),
            fetcher: Arc::new(fetcher),
            config: Arc::new(config),
        };

        Router::new()
            .route(ROOT, get(|| async { "OK" }))
            .route(HEALTH, get(|| async { "OK" }))
            .route(PING, get(api::ping))
            .route(MODEL_START, post(api::start_model))
            .route(MODEL_RESULTS, get(api::model_results))
            .layer(DefaultBodyLimit::disable())
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }
}
