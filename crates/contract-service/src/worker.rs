//! Background workers
//!
//! Each long-running pipeline call gets its own named OS thread. The caller
//! keeps a [`WorkerHandle`] with two channels: progress events as they
//! happen, and the final result exactly once. Both are `tokio::sync`
//! channels, so an async front end can `.await` them while a plain thread
//! uses the blocking helpers.
//!
//! Nothing here stops two workers of the same kind from running at once;
//! front ends keep to one in flight by disabling their triggers.

use std::sync::Arc;
use std::thread::JoinHandle;

use tokio::sync::{mpsc, oneshot};

use crate::context::ContractService;
use crate::error::ServiceError;
use crate::generate::GeneratedContract;
use crate::progress::Progress;
use crate::recommend::RecommendationOutcome;

pub struct WorkerHandle<T> {
    pub progress: mpsc::UnboundedReceiver<Progress>,
    pub completion: oneshot::Receiver<Result<T, ServiceError>>,
    thread: JoinHandle<()>,
}

impl<T> WorkerHandle<T> {
    pub fn thread_name(&self) -> Option<&str> {
        self.thread.thread().name()
    }

    /// Block until the worker reports its result
    ///
    /// Must not be called from inside an async runtime.
    pub fn wait(self) -> Result<T, ServiceError> {
        let result = self
            .completion
            .blocking_recv()
            .map_err(|_| ServiceError::WorkerLost)?;
        if self.thread.join().is_err() {
            tracing::error!("Worker thread panicked after reporting");
        }
        result
    }

    /// Block until the worker finishes, passing every progress event to
    /// `on_progress` as it arrives
    pub fn wait_with_progress(mut self, mut on_progress: impl FnMut(Progress)) -> Result<T, ServiceError> {
        // the sender is dropped when the worker closure returns
        while let Some(event) = self.progress.blocking_recv() {
            on_progress(event);
        }
        self.wait()
    }
}

fn spawn_worker<T, F>(name: &str, job: F) -> Result<WorkerHandle<T>, ServiceError>
where
    T: Send + 'static,
    F: FnOnce(&(dyn Fn(Progress) + Send + Sync)) -> Result<T, ServiceError> + Send + 'static,
{
    let (progress_tx, progress_rx) = mpsc::unbounded_channel();
    let (done_tx, done_rx) = oneshot::channel();

    let thread = std::thread::Builder::new()
        .name(name.to_string())
        .spawn(move || {
            let report = move |event: Progress| {
                // receiver gone means nobody is watching
                let _ = progress_tx.send(event);
            };
            let result = job(&report);
            if let Err(e) = &result {
                tracing::error!("Worker failed: {}", e);
            }
            if done_tx.send(result).is_err() {
                tracing::debug!("Worker result dropped: handle no longer held");
            }
        })
        .map_err(ServiceError::Spawn)?;

    Ok(WorkerHandle {
        progress: progress_rx,
        completion: done_rx,
        thread,
    })
}

pub fn spawn_recommendation(
    service: Arc<ContractService>,
    input: String,
    contract_type: String,
) -> Result<WorkerHandle<RecommendationOutcome>, ServiceError> {
    spawn_worker("recommendation-worker", move |progress| {
        service.recommend(&input, &contract_type, progress)
    })
}

pub fn spawn_generation(
    service: Arc<ContractService>,
    input: String,
    contract_type: String,
    template_name: String,
) -> Result<WorkerHandle<GeneratedContract>, ServiceError> {
    spawn_worker("generation-worker", move |progress| {
        service.generate(&input, &contract_type, &template_name, progress)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_worker_reports_progress_then_result() {
        let handle = spawn_worker("test-worker", |progress| {
            progress(Progress::new("half", 50));
            progress(Progress::new("done", 100));
            Ok(42)
        })
        .unwrap();
        assert_eq!(handle.thread_name(), Some("test-worker"));

        let mut events = Vec::new();
        let result = handle.wait_with_progress(|event| events.push(event.percent));
        assert_eq!(result.unwrap(), 42);
        assert_eq!(events, vec![50, 100]);
    }

    #[test]
    fn test_worker_error_is_delivered() {
        let handle = spawn_worker::<(), _>("test-worker", |_| Err(ServiceError::EmptyTemplateName)).unwrap();
        assert!(matches!(handle.wait(), Err(ServiceError::EmptyTemplateName)));
    }

    #[test]
    fn test_panicking_worker_is_lost() {
        let handle = spawn_worker::<(), _>("test-worker", |_| panic!("boom")).unwrap();
        assert!(matches!(handle.wait(), Err(ServiceError::WorkerLost)));
    }
}
