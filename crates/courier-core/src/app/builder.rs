//! AppBuilder - アプリケーションの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - `expect_tasks()` で期待されるタスクパスを宣言
//! - `build()` 時に「期待集合 ⊆ 登録済み集合」をチェック
//! - 不足があれば `BuildError` を返す（webhook が届いてから気付くのでは遅い）
//!
//! 差し替えなかった port には既定の実装を使います。
//! - ResultStore: `store_results = true` なら in-memory、false なら記録しない
//! - ScheduleStore: in-memory
//! - DeliveryService: HTTP クライアント
//! - Clock: `SystemClock`

use std::sync::Arc;

use super::dispatch::DispatchClient;
use super::recorder::Recorder;
use super::resolver::Resolver;
use super::schedules::ScheduleManager;
use super::signature::SignatureVerifier;
use super::sweeper::ResultSweeper;
use super::webhook::WebhookOrchestrator;
use crate::config::Settings;
use crate::domain::TaskOptions;
use crate::impls::{HttpDeliveryService, InMemoryResultStore, InMemoryScheduleStore};
use crate::ports::{
    Clock, DeliveryError, DeliveryService, IdGenerator, ResultStore, ScheduleStore, SystemClock,
    UlidGenerator,
};
use crate::typed::{Handler, RegistryError, Task, TaskRegistry};

/// # 使用例
/// ```ignore
/// let app = AppBuilder::new(settings)
///     .register::<Add, _>(AddHandler, TaskOptions::named("Math adder"))?
///     .expect_tasks(&["app.tasks.add"])
///     .build()?;
/// ```
pub struct AppBuilder {
    settings: Settings,
    registry: TaskRegistry,
    expected_tasks: Option<Vec<String>>,
    result_store: Option<Arc<dyn ResultStore>>,
    schedule_store: Option<Arc<dyn ScheduleStore>>,
    delivery: Option<Arc<dyn DeliveryService>>,
    clock: Option<Arc<dyn Clock>>,
}

#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("Missing tasks: {0:?}. These tasks were expected but not registered.")]
    MissingTaskTypes(Vec<String>),

    #[error("could not set up delivery client: {0}")]
    Delivery(#[from] DeliveryError),
}

impl AppBuilder {
    pub fn new(settings: Settings) -> Self {
        Self {
            settings,
            registry: TaskRegistry::new(),
            expected_tasks: None,
            result_store: None,
            schedule_store: None,
            delivery: None,
            clock: None,
        }
    }

    /// Replaces the registry with one built elsewhere (keeps its handles valid).
    pub fn registry(mut self, registry: TaskRegistry) -> Self {
        self.registry = registry;
        self
    }

    pub fn register<T: Task, H: Handler<T> + 'static>(
        mut self,
        handler: H,
        options: TaskOptions,
    ) -> Result<Self, RegistryError> {
        self.registry.register::<T, H>(handler, options)?;
        Ok(self)
    }

    pub fn expect_tasks(mut self, paths: &[&str]) -> Self {
        self.expected_tasks = Some(paths.iter().map(|p| p.to_string()).collect());
        self
    }

    pub fn result_store(mut self, store: Arc<dyn ResultStore>) -> Self {
        self.result_store = Some(store);
        self
    }

    pub fn schedule_store(mut self, store: Arc<dyn ScheduleStore>) -> Self {
        self.schedule_store = Some(store);
        self
    }

    pub fn delivery(mut self, delivery: Arc<dyn DeliveryService>) -> Self {
        self.delivery = Some(delivery);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn build(self) -> Result<App, BuildError> {
        if let Some(expected_tasks) = &self.expected_tasks {
            let missing_tasks: Vec<String> = expected_tasks
                .iter()
                .filter(|path| !self.registry.contains(path))
                .cloned()
                .collect();
            if !missing_tasks.is_empty() {
                return Err(BuildError::MissingTaskTypes(missing_tasks));
            }
        }

        let settings = Arc::new(self.settings);
        let registry = Arc::new(self.registry);
        let clock: Arc<dyn Clock> = self.clock.unwrap_or_else(|| Arc::new(SystemClock));
        let ids: Arc<dyn IdGenerator> = Arc::new(UlidGenerator::new(Arc::clone(&clock)));
        let delivery: Arc<dyn DeliveryService> = match self.delivery {
            Some(delivery) => delivery,
            None => Arc::new(HttpDeliveryService::new(&settings)?),
        };

        let result_store: Option<Arc<dyn ResultStore>> = if settings.store_results() {
            let store: Arc<dyn ResultStore> = match self.result_store {
                Some(store) => store,
                None => Arc::new(InMemoryResultStore::new()),
            };
            Some(store)
        } else {
            None
        };
        let schedule_store: Arc<dyn ScheduleStore> = match self.schedule_store {
            Some(store) => store,
            None => Arc::new(InMemoryScheduleStore::new()),
        };

        let recorder = Arc::new(Recorder::new(
            result_store.clone(),
            Arc::clone(&clock),
            ids,
        ));
        let webhook = WebhookOrchestrator::new(
            SignatureVerifier::new(&settings),
            Resolver::new(Arc::clone(&registry)),
            Arc::clone(&recorder),
        );
        let dispatch = DispatchClient::new(&settings, Arc::clone(&delivery))
            .with_registry(Arc::clone(&registry));
        let schedules = ScheduleManager::new(
            &settings,
            delivery,
            schedule_store,
            Arc::clone(&registry),
            Arc::clone(&clock),
        );
        let sweeper = result_store
            .map(|store| ResultSweeper::new(store, clock, settings.result_ttl()));

        Ok(App {
            settings,
            registry,
            recorder,
            webhook: Arc::new(webhook),
            dispatch: Arc::new(dispatch),
            schedules: Arc::new(schedules),
            sweeper: sweeper.map(Arc::new),
        })
    }
}

/// Wired application. Cheap to share behind an `Arc`.
pub struct App {
    settings: Arc<Settings>,
    registry: Arc<TaskRegistry>,
    recorder: Arc<Recorder>,
    webhook: Arc<WebhookOrchestrator>,
    dispatch: Arc<DispatchClient>,
    schedules: Arc<ScheduleManager>,
    sweeper: Option<Arc<ResultSweeper>>,
}

impl App {
    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn registry(&self) -> &TaskRegistry {
        &self.registry
    }

    pub fn recorder(&self) -> &Recorder {
        &self.recorder
    }

    pub fn webhook(&self) -> &WebhookOrchestrator {
        &self.webhook
    }

    pub fn dispatch(&self) -> &DispatchClient {
        &self.dispatch
    }

    pub fn schedules(&self) -> &ScheduleManager {
        &self.schedules
    }

    /// `None` when results are not stored.
    pub fn sweeper(&self) -> Option<Arc<ResultSweeper>> {
        self.sweeper.clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::settings;
    use crate::impls::RecordingDeliveryService;
    use crate::typed::task::fixtures::{Add, AddHandler, Boom, BoomHandler};

    fn builder() -> AppBuilder {
        AppBuilder::new(settings()).delivery(Arc::new(RecordingDeliveryService::new()))
    }

    #[test]
    fn build_success() {
        let app = builder()
            .register::<Add, _>(AddHandler, TaskOptions::default())
            .unwrap()
            .expect_tasks(&["app.tasks.add"])
            .build()
            .unwrap();
        assert_eq!(app.registry().len(), 1);
        assert!(app.recorder().is_enabled());
        assert!(app.sweeper().is_some());
        assert_eq!(app.dispatch().callback_url(), "https://example.com/qstash/webhook/");
    }

    #[test]
    fn build_missing_task_types() {
        let app = builder()
            .register::<Add, _>(AddHandler, TaskOptions::default())
            .unwrap()
            .expect_tasks(&["app.tasks.add", "app.tasks.boom"])
            .build();
        assert!(matches!(
            app,
            Err(BuildError::MissingTaskTypes(missing)) if missing == vec!["app.tasks.boom".to_string()]
        ));
    }

    #[test]
    fn prebuilt_registry_is_used() {
        let mut registry = TaskRegistry::new();
        registry.register::<Boom, _>(BoomHandler, TaskOptions::default()).unwrap();
        let app = builder()
            .registry(registry)
            .expect_tasks(&["app.tasks.boom"])
            .build();
        assert!(app.is_ok());
    }

    #[test]
    fn results_can_be_switched_off() {
        let settings = Settings::builder()
            .token("t")
            .signing_keys("a", "b")
            .domain("example.com")
            .store_results(false)
            .build()
            .unwrap();
        let app = AppBuilder::new(settings)
            .delivery(Arc::new(RecordingDeliveryService::new()))
            .build()
            .unwrap();
        assert!(!app.recorder().is_enabled());
        assert!(app.sweeper().is_none());
    }

    #[test]
    fn default_delivery_is_http() {
        assert!(AppBuilder::new(settings()).build().is_ok());
    }
}
