//! # Mock Server Example
//!
//! Showcases a [`HeronServer`] staging to the local filesystem and running jobs on the
//! in-memory [`MockComputeBackend`], which scores with a pass-through model.
//!
//! ## Usage
//!
//! ```sh
//! HERON_API_AUTH_SECRET=my-secret cargo run --example mock_server --features "server fs mock"
//! ```

use heron::prelude::*;
use std::collections::HashMap;
use std::env;
use std::time::Duration;

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt::init();

    // Providers & Services
    let storage = FileSystemStorage::new("./heron_staging");

    // Don't use this in production! Runs are simulated in-process.
    let compute = MockComputeBackend::new(storage.clone()).with_delay(Duration::from_secs(2));

    let registry = StaticModelRegistry::new([Model {
        id: "PassThroughModel:1729".to_string(),
        tags: HashMap::from([(
            names::ENVIRONMENT_TAG.to_string(),
            "heron/passthrough:1".to_string(),
        )]),
    }]);

    let secret = env::var("HERON_API_AUTH_SECRET").unwrap_or_else(|_| "my-secret".to_string());
    let auth = SharedSecretAuth::new(secret);

    let services = CoreServices {
        storage,
        compute,
        registry,
        auth,
    };

    // Build
    let app = HeronServer::default().build(services);

    // Serve
    let port = env::var("PORT").unwrap_or_else(|_| "5000".to_string());
    let addr = format!("0.0.0.0:{port}");
    println!("Server listening on http://{addr}");

    let listener = tokio::net::TcpListener::bind(addr).await.unwrap();
    axum::serve(listener, app).await.unwrap();
}
