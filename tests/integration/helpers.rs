//! Helper functions for integration tests

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use pulsewatch::{
    CreateMonitorRequest,
    actors::{HubHandle, JobContext, JobRegistry, ResultSink},
    config::MonitoringConfig,
    monitors::{ConcurrencyLimiter, ProbeExecutor},
    service::MonitorService,
    storage::{MemoryBackend, StorageBackend},
};
use tokio_util::sync::CancellationToken;

/// A fully wired scheduler without the HTTP surface
#[allow(dead_code)]
pub struct TestPipeline {
    pub storage: Arc<dyn StorageBackend>,
    pub hub: HubHandle,
    pub registry: JobRegistry,
    pub service: MonitorService,
    pub shutdown: CancellationToken,
}

pub fn create_pipeline(storage: Arc<dyn StorageBackend>, max_concurrent: usize) -> TestPipeline {
    let shutdown = CancellationToken::new();
    let hub = HubHandle::spawn(64, shutdown.child_token());
    let config = MonitoringConfig {
        max_concurrent_checks: max_concurrent,
        ..MonitoringConfig::default()
    };

    let ctx = JobContext {
        executor: ProbeExecutor::new().unwrap(),
        limiter: ConcurrencyLimiter::new(config.max_concurrent_checks),
        sink: ResultSink::new(Arc::clone(&storage), hub.clone(), config.uptime_window()),
    };
    let registry = JobRegistry::new(ctx);
    let service = MonitorService::new(Arc::clone(&storage), registry.clone(), config);

    TestPipeline {
        storage,
        hub,
        registry,
        service,
        shutdown,
    }
}

pub fn create_memory_pipeline() -> TestPipeline {
    create_pipeline(Arc::new(MemoryBackend::new()), 10)
}

pub fn create_monitor_request(url: &str, interval: u64) -> CreateMonitorRequest {
    CreateMonitorRequest {
        name: Some(format!("Test {url}")),
        url: url.to_string(),
        interval: Some(interval),
        timeout: Some(1),
        ..Default::default()
    }
}

/// Poll `check` until it holds or `limit` elapses
pub async fn eventually<F, Fut>(limit: Duration, mut check: F) -> bool
where
    F: FnMut() -> Fut,
    Fut: Future<Output = bool>,
{
    let deadline = tokio::time::Instant::now() + limit;
    loop {
        if check().await {
            return true;
        }
        if tokio::time::Instant::now() >= deadline {
            return false;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
}

/// An address nothing is listening on
pub fn unused_local_url() -> String {
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);
    format!("http://127.0.0.1:{port}/")
}

#[cfg(feature = "api")]
pub mod api {
    use std::net::SocketAddr;

    use pulsewatch::{
        api::{ApiState, spawn_api_server},
        config::{ServerConfig, WebSocketConfig},
    };

    use super::{TestPipeline, create_memory_pipeline};

    #[allow(dead_code)]
    pub struct TestApp {
        pub addr: SocketAddr,
        pub pipeline: TestPipeline,
        pub client: reqwest::Client,
    }

    impl TestApp {
        pub fn url(&self, path: &str) -> String {
            format!("http://{}{}", self.addr, path)
        }
    }

    pub async fn spawn_test_app(auth_token: Option<&str>) -> TestApp {
        let pipeline = create_memory_pipeline();

        let config = ServerConfig {
            bind_addr: "127.0.0.1:0".parse().unwrap(),
            auth_token: auth_token.map(str::to_string),
            enable_cors: true,
        };
        let state = ApiState::new(
            pipeline.service.clone(),
            pipeline.hub.clone(),
            WebSocketConfig::default(),
        );

        let (addr, _handle) = spawn_api_server(&config, state, pipeline.shutdown.child_token())
            .await
            .unwrap();

        TestApp {
            addr,
            pipeline,
            client: reqwest::Client::new(),
        }
    }
}
