//! Prometheus metrics
//!
//! HTTP counters are recorded by [`metrics_middleware`]; business counters
//! are read from the services' [`DomainCounters`] at export time.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use axum::extract::State;
use axum::http::StatusCode;
use axum::middleware::Next;
use axum::response::Response;
use tracing::{debug, info_span, Instrument};

use camp_services::DomainCounters;

pub struct Metrics {
    pub http_requests_total: AtomicU64,
    pub http_requests_2xx: AtomicU64,
    pub http_requests_4xx: AtomicU64,
    pub http_requests_5xx: AtomicU64,
    pub http_request_duration_ms_total: AtomicU64,
    pub active_requests: AtomicU64,
    domain: Arc<DomainCounters>,
    start_time: Instant,
}

impl Metrics {
    pub fn new(domain: Arc<DomainCounters>) -> Self {
        Self {
            http_requests_total: AtomicU64::new(0),
            http_requests_2xx: AtomicU64::new(0),
            http_requests_4xx: AtomicU64::new(0),
            http_requests_5xx: AtomicU64::new(0),
            http_request_duration_ms_total: AtomicU64::new(0),
            active_requests: AtomicU64::new(0),
            domain,
            start_time: Instant::now(),
        }
    }

    pub fn record_request(&self, status: StatusCode, duration_ms: u64) {
        self.http_requests_total.fetch_add(1, Ordering::Relaxed);
        self.http_request_duration_ms_total
            .fetch_add(duration_ms, Ordering::Relaxed);

        let code = status.as_u16();
        if (200..300).contains(&code) {
            self.http_requests_2xx.fetch_add(1, Ordering::Relaxed);
        } else if (400..500).contains(&code) {
            self.http_requests_4xx.fetch_add(1, Ordering::Relaxed);
        } else if code >= 500 {
            self.http_requests_5xx.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    fn domain_counters(&self) -> [(&'static str, &'static str, u64); 5] {
        let d = &self.domain;
        [
            ("camp_checkouts_total", "Completed checkouts", DomainCounters::get(&d.checkouts)),
            (
                "camp_registrations_created_total",
                "Registrations created by checkout",
                DomainCounters::get(&d.registrations_created),
            ),
            ("camp_check_ins_total", "Campers checked in", DomainCounters::get(&d.check_ins)),
            (
                "camp_waitlist_promotions_total",
                "Waitlisted registrations promoted",
                DomainCounters::get(&d.waitlist_promotions),
            ),
            ("camp_refunds_total", "Refunds issued", DomainCounters::get(&d.refunds)),
        ]
    }

    pub fn export_prometheus(&self) -> String {
        let mut output = String::new();

        output.push_str("# HELP http_requests_total Total number of HTTP requests\n");
        output.push_str("# TYPE http_requests_total counter\n");
        output.push_str(&format!(
            "http_requests_total {}\n",
            self.http_requests_total.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP http_requests_by_status HTTP requests by status code range\n");
        output.push_str("# TYPE http_requests_by_status counter\n");
        for (class, counter) in [
            ("2xx", &self.http_requests_2xx),
            ("4xx", &self.http_requests_4xx),
            ("5xx", &self.http_requests_5xx),
        ] {
            output.push_str(&format!(
                "http_requests_by_status{{status=\"{}\"}} {}\n",
                class,
                counter.load(Ordering::Relaxed)
            ));
        }

        output.push_str(
            "# HELP http_request_duration_ms_total Total HTTP request duration in milliseconds\n",
        );
        output.push_str("# TYPE http_request_duration_ms_total counter\n");
        output.push_str(&format!(
            "http_request_duration_ms_total {}\n",
            self.http_request_duration_ms_total.load(Ordering::Relaxed)
        ));

        output.push_str("# HELP active_requests Requests currently in flight\n");
        output.push_str("# TYPE active_requests gauge\n");
        output.push_str(&format!(
            "active_requests {}\n",
            self.active_requests.load(Ordering::Relaxed)
        ));

        for (name, help, value) in self.domain_counters() {
            output.push_str(&format!("# HELP {} {}\n", name, help));
            output.push_str(&format!("# TYPE {} counter\n", name));
            output.push_str(&format!("{} {}\n", name, value));
        }

        output.push_str("# HELP uptime_seconds Server uptime in seconds\n");
        output.push_str("# TYPE uptime_seconds gauge\n");
        output.push_str(&format!("uptime_seconds {}\n", self.uptime_seconds()));

        output
    }

    pub fn export_json(&self) -> serde_json::Value {
        let domain: serde_json::Map<String, serde_json::Value> = self
            .domain_counters()
            .into_iter()
            .map(|(name, _, value)| (name.to_string(), value.into()))
            .collect();

        serde_json::json!({
            "http": {
                "requests_total": self.http_requests_total.load(Ordering::Relaxed),
                "requests_2xx": self.http_requests_2xx.load(Ordering::Relaxed),
                "requests_4xx": self.http_requests_4xx.load(Ordering::Relaxed),
                "requests_5xx": self.http_requests_5xx.load(Ordering::Relaxed),
                "request_duration_ms_total": self.http_request_duration_ms_total.load(Ordering::Relaxed),
                "active_requests": self.active_requests.load(Ordering::Relaxed),
            },
            "domain": domain,
            "uptime_seconds": self.uptime_seconds(),
        })
    }
}

pub async fn metrics_middleware(
    State(metrics): State<Arc<Metrics>>,
    request: axum::http::Request<axum::body::Body>,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let uri = request.uri().path().to_string();

    metrics.active_requests.fetch_add(1, Ordering::Relaxed);

    let response = next
        .run(request)
        .instrument(info_span!("http_request", %method, %uri))
        .await;

    let duration = start.elapsed();
    let status = response.status();

    debug!(
        method = %method,
        uri = %uri,
        status = %status,
        duration_ms = %duration.as_millis(),
        "Request completed"
    );

    metrics.record_request(status, duration.as_millis() as u64);
    metrics.active_requests.fetch_sub(1, Ordering::Relaxed);

    response
}

/// GET /metrics
pub async fn prometheus_metrics(State(metrics): State<Arc<Metrics>>) -> String {
    metrics.export_prometheus()
}

/// GET /metrics.json
pub async fn json_metrics(State(metrics): State<Arc<Metrics>>) -> axum::Json<serde_json::Value> {
    axum::Json(metrics.export_json())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_record_request() {
        let metrics = Metrics::new(Arc::new(DomainCounters::default()));

        metrics.record_request(StatusCode::CREATED, 40);
        metrics.record_request(StatusCode::FORBIDDEN, 5);
        metrics.record_request(StatusCode::SERVICE_UNAVAILABLE, 15);

        assert_eq!(metrics.http_requests_total.load(Ordering::Relaxed), 3);
        assert_eq!(metrics.http_requests_2xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_4xx.load(Ordering::Relaxed), 1);
        assert_eq!(metrics.http_requests_5xx.load(Ordering::Relaxed), 1);
        assert_eq!(
            metrics.http_request_duration_ms_total.load(Ordering::Relaxed),
            60
        );
    }

    #[test]
    fn test_domain_counters_are_exported() {
        let counters = Arc::new(DomainCounters::default());
        let metrics = Metrics::new(counters.clone());

        DomainCounters::incr(&counters.checkouts, 2);
        DomainCounters::incr(&counters.check_ins, 7);

        let output = metrics.export_prometheus();
        assert!(output.contains("camp_checkouts_total 2\n"));
        assert!(output.contains("camp_check_ins_total 7\n"));
        assert!(output.contains("camp_refunds_total 0\n"));

        let json = metrics.export_json();
        assert_eq!(json["domain"]["camp_check_ins_total"], 7);
    }
}
