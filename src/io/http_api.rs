//! JSON and CSV HTTP endpoint
//!
//! Serves the four strata views under /api and a CSV export of any of them.
//! Uses hyper for the HTTP server. Request failures become a JSON
//! `{"error": ...}` body with a status derived from the error kind.

use crate::domain::types::ViewType;
use crate::infra::error::StrataError;
use crate::io::csv_export::{export_filename, render};
use crate::io::strata_hub::DataSource;
use crate::services::pipeline::StrataService;
use bytes::Bytes;
use http_body_util::Full;
use hyper::header::{HeaderValue, ACCESS_CONTROL_ALLOW_ORIGIN, CONTENT_DISPOSITION, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::Serialize;
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

const JSON: &str = "application/json";
const CSV: &str = "text/csv; charset=utf-8";

/// Decoded query-string parameters
#[derive(Debug, Default)]
pub struct Query {
    pairs: Vec<(String, String)>,
}

impl Query {
    /// Parse `a=1&b=two+words`. Undecodable values are kept verbatim.
    pub fn parse(raw: Option<&str>) -> Self {
        let pairs = raw
            .unwrap_or("")
            .split('&')
            .filter(|part| !part.is_empty())
            .map(|part| {
                let (key, value) = part.split_once('=').unwrap_or((part, ""));
                (decode(key), decode(value))
            })
            .collect();
        Self { pairs }
    }

    /// First value for `key`
    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }
}

fn decode(component: &str) -> String {
    let spaced = component.replace('+', " ");
    match urlencoding::decode(&spaced) {
        Ok(decoded) => decoded.into_owned(),
        Err(_) => spaced,
    }
}

fn response(
    status: StatusCode,
    content_type: &'static str,
    body: impl Into<Bytes>,
) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(body.into()));
    *response.status_mut() = status;
    let headers = response.headers_mut();
    headers.insert(CONTENT_TYPE, HeaderValue::from_static(content_type));
    headers.insert(ACCESS_CONTROL_ALLOW_ORIGIN, HeaderValue::from_static("*"));
    response
}

fn json_response<T: Serialize>(value: &T) -> Response<Full<Bytes>> {
    match serde_json::to_vec(value) {
        Ok(body) => response(StatusCode::OK, JSON, body),
        Err(e) => {
            error!(error = %e, "api_serialize_error");
            internal_error()
        }
    }
}

fn error_response(err: &StrataError) -> Response<Full<Bytes>> {
    let status = StatusCode::from_u16(err.http_status()).unwrap_or(StatusCode::BAD_REQUEST);
    let body = serde_json::json!({ "error": err.to_string() }).to_string();
    response(status, JSON, body)
}

fn internal_error() -> Response<Full<Bytes>> {
    response(StatusCode::INTERNAL_SERVER_ERROR, JSON, r#"{"error":"Internal server error"}"#)
}

/// Route a request to the service; independent of the transport for testing
pub async fn route<D: DataSource>(
    method: &Method,
    path: &str,
    query: &Query,
    service: &StrataService<D>,
) -> Response<Full<Bytes>> {
    if *method != Method::GET {
        return response(StatusCode::NOT_FOUND, "text/plain", "Not Found");
    }

    let suburb = query.get("suburb");
    let result = match path {
        "/health" => return response(StatusCode::OK, "text/plain", "ok"),
        "/api/search" => service.buildings(suburb).await.map(|rows| json_response(&rows)),
        "/api/search_buildings_ge20_lots" => {
            service.buildings_min_lots(suburb).await.map(|rows| json_response(&rows))
        }
        "/api/search_street_level" => {
            service.streets(suburb).await.map(|rows| json_response(&rows))
        }
        "/api/search_street_level_ge20_lots" => {
            service.streets_min_lots(suburb).await.map(|rows| json_response(&rows))
        }
        "/api/export" => export(query, service).await,
        _ => return response(StatusCode::NOT_FOUND, "text/plain", "Not Found"),
    };

    result.unwrap_or_else(|e| {
        if e.is_upstream() {
            error!(path = %path, suburb = ?suburb, kind = %e.kind(), error = %e, "api_upstream_error");
        } else {
            warn!(path = %path, suburb = ?suburb, kind = %e.kind(), error = %e, "api_bad_request");
        }
        error_response(&e)
    })
}

async fn export<D: DataSource>(
    query: &Query,
    service: &StrataService<D>,
) -> Result<Response<Full<Bytes>>, StrataError> {
    let view: ViewType = query.get("view").unwrap_or("building").parse()?;
    let suburb = query.get("suburb");
    let rows = service.view(suburb, view).await?;

    let body = match render(&rows) {
        Ok(body) => body,
        Err(e) => {
            error!(error = %e, "csv_render_error");
            return Ok(internal_error());
        }
    };

    let filename = export_filename(view, suburb.unwrap_or(""));
    // Control characters in the suburb cannot go in a header value
    let disposition = HeaderValue::from_str(&format!("attachment; filename=\"{filename}\""))
        .unwrap_or_else(|_| HeaderValue::from_static("attachment"));
    let mut resp = response(StatusCode::OK, CSV, body);
    resp.headers_mut().insert(CONTENT_DISPOSITION, disposition);
    info!(view = %view, rows = %rows.len(), filename = %filename, "csv_export_completed");
    Ok(resp)
}

/// Handle HTTP requests
async fn handle_request<D: DataSource>(
    req: Request<hyper::body::Incoming>,
    service: Arc<StrataService<D>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let started = Instant::now();
    let method = req.method().clone();
    let path = req.uri().path().to_string();
    let query = Query::parse(req.uri().query());
    let response = route(&method, &path, &query, &service).await;
    debug!(
        method = %method,
        path = %path,
        status = %response.status().as_u16(),
        elapsed_ms = %started.elapsed().as_millis(),
        "api_request"
    );
    Ok(response)
}

/// Start the API server on `addr`
pub async fn start_api_server<D: DataSource + 'static>(
    addr: SocketAddr,
    service: Arc<StrataService<D>>,
    shutdown: watch::Receiver<bool>,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>> {
    let listener = TcpListener::bind(addr).await?;
    info!(addr = %addr, "api_server_started");
    serve(listener, service, shutdown).await;
    Ok(())
}

/// Accept connections until shutdown is signalled
pub async fn serve<D: DataSource + 'static>(
    listener: TcpListener,
    service: Arc<StrataService<D>>,
    mut shutdown: watch::Receiver<bool>,
) {
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _addr)) => {
                        let io = TokioIo::new(stream);
                        let service = service.clone();

                        tokio::spawn(async move {
                            let svc = service_fn(move |req| {
                                let service = service.clone();
                                async move { handle_request(req, service).await }
                            });

                            if let Err(e) = http1::Builder::new()
                                .serve_connection(io, svc)
                                .await
                            {
                                error!(error = %e, "api_http_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "api_accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("api_server_shutdown");
                    return;
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::types::BuildingRecord;
    use crate::infra::config::Config;
    use crate::infra::error::Result;
    use crate::infra::gazetteer::SuburbReferenceSet;
    use crate::services::suburb_resolver::QueryFilter;
    use async_trait::async_trait;
    use http_body_util::BodyExt;
    use hyper::HeaderMap;

    struct FixedSource(Vec<BuildingRecord>);

    #[async_trait]
    impl DataSource for FixedSource {
        async fn fetch(&self, filter: &QueryFilter) -> Result<Vec<BuildingRecord>> {
            match filter {
                QueryFilter::SuburbContains(_) => Ok(self.0.clone()),
                QueryFilter::PostcodeEquals(_) => Err(StrataError::UpstreamTimeout),
            }
        }
    }

    fn service() -> StrataService<FixedSource> {
        let record = |label: &str, address: &str, lots: u64| BuildingRecord {
            plan_label: Some(label.to_string()),
            address: Some(address.to_string()),
            suburb: Some("ULTIMO".to_string()),
            postcode: Some("2037".to_string()),
            lga: Some("INNER WEST".to_string()),
            lot_total: Some(lots),
        };
        let source = FixedSource(vec![
            record("SP1", "1 MAIN RD, ULTIMO", 30),
            record("SP2", "2 MAIN RD, ULTIMO", 5),
        ]);
        let reference = Arc::new(SuburbReferenceSet::from_names(["ULTIMO", "MANLY"]));
        StrataService::new(&Config::default(), reference, source)
    }

    async fn get(path_and_query: &str) -> (StatusCode, String, HeaderMap) {
        let (path, raw) = match path_and_query.split_once('?') {
            Some((p, q)) => (p, Some(q)),
            None => (path_and_query, None),
        };
        let response = route(&Method::GET, path, &Query::parse(raw), &service()).await;
        let (parts, body) = response.into_parts();
        let body = body.collect().await.unwrap().to_bytes();
        (parts.status, String::from_utf8(body.to_vec()).unwrap(), parts.headers)
    }

    #[test]
    fn test_query_parse_decodes() {
        let q = Query::parse(Some("suburb=Neutral+Bay&view=street%5Fge20_lots&flag"));
        assert_eq!(q.get("suburb"), Some("Neutral Bay"));
        assert_eq!(q.get("view"), Some("street_ge20_lots"));
        assert_eq!(q.get("flag"), Some(""));
        assert_eq!(q.get("missing"), None);
        assert_eq!(Query::parse(None).get("suburb"), None);
    }

    #[tokio::test]
    async fn test_health() {
        let (status, body, _) = get("/health").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, "ok");
    }

    #[tokio::test]
    async fn test_search_returns_records() {
        let (status, body, headers) = get("/api/search?suburb=ultimo").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], JSON);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
        assert_eq!(value[0]["planlabel"], "SP1");
    }

    #[tokio::test]
    async fn test_street_level() {
        let (status, body, _) = get("/api/search_street_level?suburb=Ultimo").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value[0]["street_name"], "MAIN RD");
        assert_eq!(value[0]["total_lots_on_street"], 35);
        assert_eq!(value[0]["suburb"], "ULTIMO");
    }

    #[tokio::test]
    async fn test_buildings_min_lots_flattens_record() {
        let (_, body, _) = get("/api/search_buildings_ge20_lots?suburb=Ultimo").await;
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
        assert_eq!(value[0]["planlabel"], "SP1");
        assert_eq!(value[0]["street_address_display"], "1 MAIN RD");
        assert_eq!(value[0]["sum_of_lots_per_street"], 30);
    }

    #[tokio::test]
    async fn test_missing_suburb_is_bad_request() {
        let (status, body, _) = get("/api/search_street_level_ge20_lots").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value["error"], "Please provide a suburb name.");
    }

    #[tokio::test]
    async fn test_invalid_suburb_is_bad_request() {
        let (status, body, _) = get("/api/search?suburb=Atlantis").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body.contains("Invalid NSW Suburb"));
    }

    #[tokio::test]
    async fn test_partial_failure_still_ok() {
        // MANLY postcode search times out, suburb search succeeds
        let (status, body, _) = get("/api/search?suburb=Manly").await;
        assert_eq!(status, StatusCode::OK);
        let value: serde_json::Value = serde_json::from_str(&body).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn test_export_csv() {
        let (status, body, headers) = get("/api/export?suburb=Ultimo&view=street").await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(headers[CONTENT_TYPE], CSV);
        assert_eq!(
            headers[CONTENT_DISPOSITION],
            "attachment; filename=\"strata_export_street_Ultimo.csv\""
        );
        let lines: Vec<&str> = body.lines().collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1], "1,MAIN RD,2,35,35");
    }

    #[tokio::test]
    async fn test_export_defaults_to_building_view() {
        let (_, body, headers) = get("/api/export?suburb=Ultimo").await;
        assert!(headers[CONTENT_DISPOSITION]
            .to_str()
            .unwrap()
            .contains("strata_export_building_Ultimo.csv"));
        assert!(body.starts_with("record_number,planlabel,street_address_display"));
        assert_eq!(body.lines().count(), 3);
    }

    #[tokio::test]
    async fn test_export_invalid_view() {
        let (status, body, _) = get("/api/export?suburb=Ultimo&view=suburb").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body, r#"{"error":"Invalid view type"}"#);
    }

    #[tokio::test]
    async fn test_unknown_route() {
        let (status, _, _) = get("/api/nope").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }
}
