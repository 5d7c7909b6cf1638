//! Background loops that keep a [`WorkflowController`] in sync with the
//! backend and keep redrawing its connectors.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

use crate::api::{ApiClient, ApiError};
use crate::config::SyncConfig;
use crate::controller::{Rebuild, WorkflowController};
use crate::model::{Datastore, StateRecord, TaskDefinition};
use crate::render::{Canvas, NodeHost};

pub type SharedController = Arc<Mutex<WorkflowController>>;
pub type SharedCanvas = Arc<Mutex<dyn Canvas + Send>>;

/// Where the live loops fetch workflow data from.
#[async_trait]
pub trait WorkflowSource: Send + Sync {
    async fn tasks(&self) -> Result<Vec<TaskDefinition>, ApiError>;
    async fn states(&self) -> Result<Vec<StateRecord>, ApiError>;
    async fn datastore(&self) -> Result<Datastore, ApiError>;
}

#[async_trait]
impl WorkflowSource for ApiClient {
    async fn tasks(&self) -> Result<Vec<TaskDefinition>, ApiError> {
        ApiClient::tasks(self).await
    }

    async fn states(&self) -> Result<Vec<StateRecord>, ApiError> {
        ApiClient::states(self).await
    }

    async fn datastore(&self) -> Result<Datastore, ApiError> {
        ApiClient::datastore(self).await
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Tasks,
    States,
    Datastore,
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Resource::Tasks => "tasks",
            Resource::States => "states",
            Resource::Datastore => "datastore",
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncEvent {
    /// The task list changed shape and every node was placed again.
    Relaid,
    StatesChanged(Vec<String>),
    FetchFailed { resource: Resource, message: String },
    /// The backend refused our credentials. All loops have stopped.
    Unauthorized,
}

#[derive(Debug, Clone, Copy)]
enum Job {
    Render,
    Tasks,
    States,
    Datastore,
}

impl Job {
    fn name(self) -> &'static str {
        match self {
            Job::Render => "render",
            Job::Tasks => "tasks",
            Job::States => "states",
            Job::Datastore => "datastore",
        }
    }
}

struct SyncContext {
    controller: SharedController,
    source: Arc<dyn WorkflowSource>,
    host: Arc<dyn NodeHost + Send + Sync>,
    canvas: SharedCanvas,
    events: mpsc::UnboundedSender<SyncEvent>,
    cancel: CancellationToken,
    unauthorized: AtomicBool,
}

impl SyncContext {
    async fn run(&self, job: Job) {
        match job {
            Job::Render => {
                let mut controller = self.controller.lock().await;
                let mut canvas = self.canvas.lock().await;
                controller.tick(self.host.as_ref(), &mut *canvas);
            }
            Job::Tasks => match self.source.tasks().await {
                Ok(tasks) => {
                    let mut controller = self.controller.lock().await;
                    match controller.apply_tasks(tasks) {
                        Ok(Rebuild::Relaid) => {
                            // Fresh placement gets its first frame now, not on the next render tick.
                            let mut canvas = self.canvas.lock().await;
                            controller.tick(self.host.as_ref(), &mut *canvas);
                            drop(canvas);
                            drop(controller);
                            self.emit(SyncEvent::Relaid);
                        }
                        Ok(Rebuild::Refreshed) => {}
                        Err(err) => self.emit(SyncEvent::FetchFailed {
                            resource: Resource::Tasks,
                            message: err.to_string(),
                        }),
                    }
                }
                Err(err) => self.fetch_failed(Resource::Tasks, err),
            },
            Job::States => match self.source.states().await {
                Ok(states) => {
                    let changed = self.controller.lock().await.apply_states(states);
                    if !changed.is_empty() {
                        self.emit(SyncEvent::StatesChanged(changed));
                    }
                }
                Err(err) => self.fetch_failed(Resource::States, err),
            },
            Job::Datastore => match self.source.datastore().await {
                Ok(datastore) => self.controller.lock().await.apply_environment(datastore),
                Err(err) => self.fetch_failed(Resource::Datastore, err),
            },
        }
    }

    fn fetch_failed(&self, resource: Resource, err: ApiError) {
        if let ApiError::Unauthorized = err {
            if !self.unauthorized.swap(true, Ordering::SeqCst) {
                tracing::warn!(%resource, "backend rejected credentials; stopping sync");
                self.emit(SyncEvent::Unauthorized);
            }
            self.cancel.cancel();
            return;
        }
        tracing::warn!(%resource, error = %err, "fetch failed");
        self.emit(SyncEvent::FetchFailed {
            resource,
            message: err.to_string(),
        });
    }

    fn emit(&self, event: SyncEvent) {
        let _ = self.events.send(event);
    }
}

/// Running sync loops. Dropping the handle cancels them.
pub struct SyncHandle {
    cancel: CancellationToken,
    loops: Vec<JoinHandle<()>>,
    events: mpsc::UnboundedReceiver<SyncEvent>,
}

impl SyncHandle {
    /// Next event; `None` once every loop has stopped.
    pub async fn next_event(&mut self) -> Option<SyncEvent> {
        self.events.recv().await
    }

    pub fn is_stopped(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Cancel every loop and wait for them to finish.
    pub async fn stop(mut self) {
        self.cancel.cancel();
        for handle in self.loops.drain(..) {
            if let Err(err) = handle.await {
                tracing::warn!(error = %err, "sync loop panicked");
            }
        }
    }
}

impl Drop for SyncHandle {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

/// Start the render, state, task and datastore loops. Must be called from
/// within a tokio runtime.
pub fn start(
    controller: SharedController,
    source: Arc<dyn WorkflowSource>,
    host: Arc<dyn NodeHost + Send + Sync>,
    canvas: SharedCanvas,
    config: SyncConfig,
) -> SyncHandle {
    let cancel = CancellationToken::new();
    let (events, receiver) = mpsc::unbounded_channel();
    let ctx = Arc::new(SyncContext {
        controller,
        source,
        host,
        canvas,
        events,
        cancel: cancel.clone(),
        unauthorized: AtomicBool::new(false),
    });

    let loops = [
        (Job::Render, config.render_interval_ms),
        (Job::Tasks, config.task_interval_ms),
        (Job::States, config.state_interval_ms),
        (Job::Datastore, config.datastore_interval_ms),
    ]
    .into_iter()
    .map(|(job, millis)| spawn_loop(ctx.clone(), job, Duration::from_millis(millis.max(1))))
    .collect();
    tracing::debug!(?config, "sync loops started");

    SyncHandle {
        cancel,
        loops,
        events: receiver,
    }
}

fn spawn_loop(ctx: Arc<SyncContext>, job: Job, period: Duration) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            tokio::select! {
                () = ctx.cancel.cancelled() => break,
                _ = ticker.tick() => {}
            }
            tokio::select! {
                () = ctx.cancel.cancelled() => break,
                () = ctx.run(job) => {}
            }
        }
        tracing::debug!(job = job.name(), "sync loop stopped");
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use crate::layout::{FixedMeasure, NodeSize};
    use crate::model::{Outcome, TaskStatus};
    use crate::render::StaticHost;
    use crate::svg::SvgCanvas;
    use std::sync::Mutex as StdMutex;
    use tokio::time::timeout;

    #[derive(Default)]
    struct FakeSource {
        states: StdMutex<Vec<StateRecord>>,
        unauthorized: AtomicBool,
    }

    #[async_trait]
    impl WorkflowSource for FakeSource {
        async fn tasks(&self) -> Result<Vec<TaskDefinition>, ApiError> {
            Ok(vec![
                TaskDefinition::new("A"),
                TaskDefinition::new("B").after(Outcome::Success, "A"),
            ])
        }

        async fn states(&self) -> Result<Vec<StateRecord>, ApiError> {
            if self.unauthorized.load(Ordering::SeqCst) {
                return Err(ApiError::Unauthorized);
            }
            Ok(self.states.lock().unwrap().clone())
        }

        async fn datastore(&self) -> Result<Datastore, ApiError> {
            Ok(Datastore {
                name: "etl".to_string(),
                ..Default::default()
            })
        }
    }

    fn fast() -> SyncConfig {
        SyncConfig {
            render_interval_ms: 5,
            state_interval_ms: 10,
            task_interval_ms: 10,
            datastore_interval_ms: 10,
        }
    }

    fn controller() -> SharedController {
        Arc::new(Mutex::new(WorkflowController::new(
            Config::default(),
            FixedMeasure(NodeSize {
                width: 200.0,
                height: 100.0,
                header_height: 40.0,
            }),
        )))
    }

    async fn wait_for(handle: &mut SyncHandle, wanted: impl Fn(&SyncEvent) -> bool) -> SyncEvent {
        timeout(Duration::from_secs(5), async {
            loop {
                match handle.next_event().await {
                    Some(event) if wanted(&event) => return event,
                    Some(_) => continue,
                    None => panic!("sync stopped before the expected event"),
                }
            }
        })
        .await
        .expect("timed out waiting for sync event")
    }

    #[tokio::test]
    async fn loads_tasks_then_reports_state_changes() {
        let controller = controller();
        let source = Arc::new(FakeSource::default());
        let canvas = Arc::new(Mutex::new(SvgCanvas::new()));
        let mut handle = start(
            controller.clone(),
            source.clone(),
            Arc::new(StaticHost::new()),
            canvas.clone(),
            fast(),
        );

        wait_for(&mut handle, |e| *e == SyncEvent::Relaid).await;
        *source.states.lock().unwrap() = vec![StateRecord::new("A", TaskStatus::Running)];
        let event = wait_for(&mut handle, |e| matches!(e, SyncEvent::StatesChanged(_))).await;
        assert_eq!(event, SyncEvent::StatesChanged(vec!["A".to_string()]));

        // Give the render loop a frame after the layout exists.
        tokio::time::sleep(Duration::from_millis(50)).await;
        handle.stop().await;

        assert_eq!(canvas.lock().await.elements().len(), 3);
        let controller = controller.lock().await;
        assert_eq!(controller.status_of("A"), Some(TaskStatus::Running));
        assert_eq!(controller.environment().map(|d| d.name.as_str()), Some("etl"));
    }

    #[tokio::test]
    async fn first_frame_is_drawn_right_after_placement() {
        let canvas = Arc::new(Mutex::new(SvgCanvas::new()));
        let mut handle = start(
            controller(),
            Arc::new(FakeSource::default()),
            Arc::new(StaticHost::new()),
            canvas.clone(),
            SyncConfig {
                render_interval_ms: 60_000,
                ..fast()
            },
        );

        // The interval's immediate first tick may render an empty frame before
        // the task list arrives; the relayout must draw again on its own.
        wait_for(&mut handle, |e| *e == SyncEvent::Relaid).await;
        assert_eq!(canvas.lock().await.elements().len(), 3);
        handle.stop().await;
    }

    #[tokio::test]
    async fn unauthorized_stops_everything_once() {
        let source = Arc::new(FakeSource::default());
        source.unauthorized.store(true, Ordering::SeqCst);
        let mut handle = start(
            controller(),
            source,
            Arc::new(StaticHost::new()),
            Arc::new(Mutex::new(SvgCanvas::new())),
            fast(),
        );

        let mut unauthorized = 0;
        timeout(Duration::from_secs(5), async {
            while let Some(event) = handle.next_event().await {
                if event == SyncEvent::Unauthorized {
                    unauthorized += 1;
                }
            }
        })
        .await
        .expect("loops should stop after a 401");
        assert_eq!(unauthorized, 1);
        assert!(handle.is_stopped());
    }

    #[tokio::test]
    async fn dropping_the_handle_cancels_loops() {
        let handle = start(
            controller(),
            Arc::new(FakeSource::default()),
            Arc::new(StaticHost::new()),
            Arc::new(Mutex::new(SvgCanvas::new())),
            fast(),
        );
        let token = handle.cancel.clone();
        drop(handle);
        assert!(token.is_cancelled());
    }
}
