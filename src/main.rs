use std::sync::Arc;

use portal_session::{BackendConfig, HttpBackend, SessionConfig, SessionProvider, use_session};

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt::init();

    let session_config = SessionConfig::from_env().expect("invalid session config");
    let backend_config = BackendConfig::from_env().expect("backend config required");
    let backend = Arc::new(HttpBackend::new(&backend_config).expect("backend client init failed"));

    // Adopt a token handed over by the login flow, if any.
    if let Ok(token) = std::env::var("PORTAL_ACCESS_TOKEN") {
        let expires_at = std::env::var("PORTAL_ACCESS_TOKEN_EXPIRES_AT")
            .ok()
            .and_then(|v| v.parse::<i64>().ok());
        if let Err(e) = backend.restore_session(token, expires_at).await {
            tracing::warn!(error = %e, "could not restore session from PORTAL_ACCESS_TOKEN");
        }
    }

    let provider = SessionProvider::mount(backend, session_config);

    let state = provider
        .scope(async {
            let mut handle = portal_session::session_handle().expect("inside provider scope");
            handle.settled().await;
            use_session().expect("inside provider scope")
        })
        .await;

    tracing::info!(authenticated = state.is_authenticated(), "session settled");
    println!("{}", serde_json::to_string_pretty(&state).expect("state serializes"));

    for diagnostic in provider.handle().diagnostics() {
        println!("{:?} {}: {}", diagnostic.severity, diagnostic.code, diagnostic.message);
    }
    provider.unmount();
}
