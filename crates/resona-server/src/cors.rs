use http::Method;
use http::header::HeaderName;
use resona_config::{AnyOrArray, CorsConfig};
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// Build a Tower CORS layer from configuration
///
/// Entries that fail to parse are dropped rather than rejected.
pub fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let mut layer = CorsLayer::new();

    // Origins
    layer = match &config.origins {
        AnyOrArray::Any => layer.allow_origin(AllowOrigin::any()),
        AnyOrArray::List(origins) => {
            let origins: Vec<_> = origins.iter().filter_map(|o| o.parse().ok()).collect();
            layer.allow_origin(origins)
        }
    };

    // Methods
    layer = match &config.methods {
        AnyOrArray::Any => layer.allow_methods(AllowMethods::any()),
        AnyOrArray::List(methods) => {
            let methods: Vec<Method> = methods.iter().filter_map(|m| m.parse().ok()).collect();
            layer.allow_methods(methods)
        }
    };

    // Headers
    layer = match &config.headers {
        AnyOrArray::Any => layer.allow_headers(AllowHeaders::any()),
        AnyOrArray::List(headers) => {
            let headers: Vec<HeaderName> = headers.iter().filter_map(|h| h.parse().ok()).collect();
            layer.allow_headers(headers)
        }
    };

    // Expose headers
    if !config.expose_headers.is_empty() {
        let headers: Vec<HeaderName> = config.expose_headers.iter().filter_map(|h| h.parse().ok()).collect();
        layer = layer.expose_headers(headers);
    }

    // Credentials
    if config.credentials {
        layer = layer.allow_credentials(true);
    }

    // Max age
    if let Some(duration) = config.max_age_duration() {
        layer = layer.max_age(duration);
    }

    layer
}

#[cfg(test)]
mod tests {
    use http::{HeaderValue, Request, header};
    use tower::{ServiceBuilder, ServiceExt};

    use super::*;

    fn config(toml_origins: AnyOrArray) -> CorsConfig {
        CorsConfig {
            origins: toml_origins,
            methods: AnyOrArray::List(vec!["GET".to_string(), "POST".to_string(), "DELETE".to_string()]),
            headers: AnyOrArray::Any,
            expose_headers: vec!["content-disposition".to_string()],
            credentials: false,
            max_age: Some(600),
        }
    }

    async fn preflight(layer: CorsLayer, origin: &'static str) -> http::HeaderMap {
        let service = ServiceBuilder::new()
            .layer(layer)
            .service_fn(|_: Request<axum::body::Body>| async {
                Ok::<_, std::convert::Infallible>(http::Response::new(axum::body::Body::empty()))
            });

        let request = Request::options("/music/generate")
            .header(header::ORIGIN, origin)
            .header(header::ACCESS_CONTROL_REQUEST_METHOD, "POST")
            .body(axum::body::Body::empty())
            .unwrap();

        service.oneshot(request).await.unwrap().headers().clone()
    }

    #[tokio::test]
    async fn explicit_origin_is_echoed() {
        let layer = cors_layer(&config(AnyOrArray::List(vec!["https://studio.example".to_string()])));
        let headers = preflight(layer, "https://studio.example").await;

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("https://studio.example"))
        );
        assert_eq!(
            headers.get(header::ACCESS_CONTROL_MAX_AGE),
            Some(&HeaderValue::from_static("600"))
        );
    }

    #[tokio::test]
    async fn unlisted_origin_gets_no_grant() {
        let layer = cors_layer(&config(AnyOrArray::List(vec!["https://studio.example".to_string()])));
        let headers = preflight(layer, "https://evil.example").await;

        assert!(headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN).is_none());
    }

    #[tokio::test]
    async fn wildcard_allows_any_origin() {
        let headers = preflight(cors_layer(&config(AnyOrArray::Any)), "https://anywhere.example").await;

        assert_eq!(
            headers.get(header::ACCESS_CONTROL_ALLOW_ORIGIN),
            Some(&HeaderValue::from_static("*"))
        );
    }
}
