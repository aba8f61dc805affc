use crate::config::Config;
use axum::http::{header, HeaderValue, Method};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// Fixed CORS policy for the browser client; answers `OPTIONS /query`
/// preflights without touching the handler.
pub fn cors_layer(config: &Config) -> CorsLayer {
    let origin = match config.allowed_origin.as_str() {
        "*" => AllowOrigin::any(),
        configured => match configured.parse::<HeaderValue>() {
            Ok(value) => AllowOrigin::exact(value),
            Err(_) => {
                tracing::warn!(origin = configured, "Invalid ALLOWED_ORIGIN, allowing any");
                AllowOrigin::any()
            }
        },
    };

    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE])
}
