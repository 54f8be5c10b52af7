//! Background workers refreshing metrics on a fixed interval.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::info;

use crate::domain::MetricKind;

use super::service::ExporterService;

/// Configuration for the refresh workers
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Pause between the end of one refresh and the start of the next
    pub refresh_interval: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            refresh_interval: Duration::from_secs(5),
        }
    }
}

/// Worker refreshing a single metric until shutdown
pub struct MetricRefreshWorker {
    service: Arc<ExporterService>,
    kind: MetricKind,
    config: WorkerConfig,
    shutdown_rx: watch::Receiver<bool>,
}

impl MetricRefreshWorker {
    /// Create a new worker instance
    pub fn new(
        service: Arc<ExporterService>,
        kind: MetricKind,
        config: WorkerConfig,
        shutdown_rx: watch::Receiver<bool>,
    ) -> Self {
        Self {
            service,
            kind,
            config,
            shutdown_rx,
        }
    }

    /// Run the worker loop.
    ///
    /// Refreshes immediately, then once per interval. Shutdown is observed
    /// both while a refresh is in flight and while sleeping.
    pub async fn run(mut self) {
        info!(
            metric = %self.kind,
            refresh_interval = ?self.config.refresh_interval,
            "Starting metric refresh worker"
        );

        loop {
            if self.is_shutdown() {
                break;
            }

            tokio::select! {
                _ = self.service.refresh(self.kind) => {}
                _ = wait_for_shutdown(&mut self.shutdown_rx) => break,
            }

            tokio::select! {
                _ = tokio::time::sleep(self.config.refresh_interval) => {}
                _ = wait_for_shutdown(&mut self.shutdown_rx) => break,
            }
        }

        info!(metric = %self.kind, "Metric refresh worker shutting down");
    }

    fn is_shutdown(&self) -> bool {
        *self.shutdown_rx.borrow()
    }
}

/// Resolves once shutdown is signalled or the sender is gone.
async fn wait_for_shutdown(shutdown_rx: &mut watch::Receiver<bool>) {
    // Err means the sender was dropped, which also ends the worker
    let _ = shutdown_rx.wait_for(|stop| *stop).await;
}

/// Spawn one refresh worker per enabled metric as tokio tasks
pub fn spawn_workers(
    service: Arc<ExporterService>,
    config: WorkerConfig,
) -> (Vec<JoinHandle<()>>, watch::Sender<bool>) {
    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let handles = service
        .enabled_metrics()
        .into_iter()
        .map(|kind| {
            let worker = MetricRefreshWorker::new(
                Arc::clone(&service),
                kind,
                config.clone(),
                shutdown_rx.clone(),
            );
            tokio::spawn(worker.run())
        })
        .collect();
    (handles, shutdown_tx)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{MockNodeApiClient, test_service, test_service_with_node_api};

    #[test]
    fn test_worker_config_default() {
        let config = WorkerConfig::default();
        assert_eq!(config.refresh_interval, Duration::from_secs(5));
    }

    #[tokio::test]
    async fn test_worker_refreshes_before_first_sleep() {
        let service = Arc::new(test_service());
        let config = WorkerConfig {
            refresh_interval: Duration::from_secs(60),
        };
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker =
            MetricRefreshWorker::new(Arc::clone(&service), MetricKind::BlockHeight, config, shutdown_rx);

        let handle = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_millis(50)).await;

        assert_eq!(service.metrics().block_height(), 12345.0);

        shutdown_tx.send(true).unwrap();
        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok(), "Worker should shutdown within 2 seconds");
    }

    #[tokio::test]
    async fn test_worker_keeps_polling_on_interval() {
        let node_api = Arc::new(MockNodeApiClient::new("1", "2024-01-01T00:00:00Z"));
        let service = Arc::new(test_service_with_node_api(node_api.clone()));
        let config = WorkerConfig {
            refresh_interval: Duration::from_millis(10),
        };

        let (handles, shutdown_tx) = spawn_workers(Arc::clone(&service), config);
        tokio::time::sleep(Duration::from_millis(30)).await;
        node_api.set_status("2", "2024-01-01T00:00:00Z");
        tokio::time::sleep(Duration::from_millis(100)).await;

        assert_eq!(service.metrics().block_height(), 2.0);

        shutdown_tx.send(true).unwrap();
        for handle in handles {
            let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
            assert!(result.is_ok());
        }
    }

    #[tokio::test]
    async fn test_shutdown_interrupts_in_flight_refresh() {
        let node_api = Arc::new(MockNodeApiClient::new("1", "2024-01-01T00:00:00Z"));
        node_api.set_latency(Duration::from_secs(60));
        let service = Arc::new(test_service_with_node_api(node_api));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = MetricRefreshWorker::new(
            service,
            MetricKind::BlockHeight,
            WorkerConfig::default(),
            shutdown_rx,
        );

        let handle = tokio::spawn(worker.run());
        tokio::time::sleep(Duration::from_millis(50)).await;
        shutdown_tx.send(true).unwrap();

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok(), "Shutdown should not wait for the refresh");
    }

    #[tokio::test]
    async fn test_worker_exits_when_sender_dropped() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let worker = MetricRefreshWorker::new(
            Arc::new(test_service()),
            MetricKind::Peers,
            WorkerConfig {
                refresh_interval: Duration::from_secs(60),
            },
            shutdown_rx,
        );

        let handle = tokio::spawn(worker.run());
        drop(shutdown_tx);

        let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn test_spawn_workers_one_per_enabled_metric() {
        let service = Arc::new(test_service());
        let (handles, shutdown_tx) = spawn_workers(service, WorkerConfig::default());

        assert_eq!(handles.len(), 3);

        shutdown_tx.send(true).unwrap();
        for handle in handles {
            let result = tokio::time::timeout(Duration::from_secs(2), handle).await;
            assert!(result.is_ok());
        }
    }

    #[tokio::test]
    async fn test_worker_already_shut_down_returns_immediately() {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        shutdown_tx.send(true).unwrap();
        let service = Arc::new(test_service());
        let worker = MetricRefreshWorker::new(
            Arc::clone(&service),
            MetricKind::BlockHeight,
            WorkerConfig::default(),
            shutdown_rx,
        );

        worker.run().await;
        assert_eq!(service.metrics().block_height(), 0.0);
    }
}
