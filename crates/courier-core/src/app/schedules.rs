//! ScheduleManager - 定期実行ルールを外部スケジューラと同期
//!
//! 正本は外部スケジューラ側。ここでは
//! 1. 入力を検証（cron / timeout / retries / 登録済みタスクか）
//! 2. 配送サービスへ反映
//! 3. 成功したらローカルミラーに保存
//!
//! の順で処理します。2 が失敗した場合ミラーは変更しません。

use std::sync::Arc;

use tracing::info;

use crate::config::Settings;
use crate::domain::{
    ScheduleError, ScheduleId, ScheduleSpec, TaskInvocation, TaskSchedule, split_path,
};
use crate::ports::{Clock, DeliveryError, DeliveryService, ScheduleRequest, ScheduleStore, StoreError};
use crate::typed::TaskRegistry;

impl From<DeliveryError> for ScheduleError {
    fn from(e: DeliveryError) -> Self {
        ScheduleError::Sync(e.to_string())
    }
}

impl From<StoreError> for ScheduleError {
    fn from(e: StoreError) -> Self {
        ScheduleError::Store(e.to_string())
    }
}

pub struct ScheduleManager {
    delivery: Arc<dyn DeliveryService>,
    store: Arc<dyn ScheduleStore>,
    registry: Arc<TaskRegistry>,
    clock: Arc<dyn Clock>,
    callback_url: String,
}

impl ScheduleManager {
    pub fn new(
        settings: &Settings,
        delivery: Arc<dyn DeliveryService>,
        store: Arc<dyn ScheduleStore>,
        registry: Arc<TaskRegistry>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            delivery,
            store,
            registry,
            clock,
            callback_url: settings.callback_url(),
        }
    }

    pub async fn create(&self, spec: ScheduleSpec) -> Result<TaskSchedule, ScheduleError> {
        let request = self.request_for(&spec, None)?;
        let schedule_id = self.delivery.upsert_schedule(request).await?;

        let schedule = TaskSchedule {
            schedule_id,
            name: spec.name,
            task_name: spec.task_name,
            args: spec.args,
            kwargs: spec.kwargs,
            cron: spec.cron,
            retries: spec.retries,
            timeout: spec.timeout,
            is_active: true,
            is_paused: false,
            active_at: Some(self.clock.now()),
            paused_at: None,
            resumed_at: None,
        };
        self.store.save(schedule.clone()).await?;
        info!(schedule_id = %schedule.schedule_id, name = %schedule.name, "schedule created");
        Ok(schedule)
    }

    /// Replaces the definition; pause state is kept.
    pub async fn update(
        &self,
        schedule_id: &ScheduleId,
        spec: ScheduleSpec,
    ) -> Result<TaskSchedule, ScheduleError> {
        let mut schedule = self.require(schedule_id).await?;
        let request = self.request_for(&spec, Some(schedule_id.clone()))?;
        self.delivery.upsert_schedule(request).await?;

        schedule.name = spec.name;
        schedule.task_name = spec.task_name;
        schedule.args = spec.args;
        schedule.kwargs = spec.kwargs;
        schedule.cron = spec.cron;
        schedule.retries = spec.retries;
        schedule.timeout = spec.timeout;
        self.store.save(schedule.clone()).await?;
        info!(%schedule_id, "schedule updated");
        Ok(schedule)
    }

    pub async fn pause(&self, schedule_id: &ScheduleId) -> Result<TaskSchedule, ScheduleError> {
        let mut schedule = self.require(schedule_id).await?;
        if schedule.is_paused {
            return Ok(schedule);
        }
        self.delivery.pause_schedule(schedule_id).await?;

        schedule.is_paused = true;
        schedule.is_active = false;
        schedule.paused_at = Some(self.clock.now());
        self.store.save(schedule.clone()).await?;
        info!(%schedule_id, "schedule paused");
        Ok(schedule)
    }

    pub async fn resume(&self, schedule_id: &ScheduleId) -> Result<TaskSchedule, ScheduleError> {
        let mut schedule = self.require(schedule_id).await?;
        if !schedule.is_paused {
            return Ok(schedule);
        }
        self.delivery.resume_schedule(schedule_id).await?;

        let now = self.clock.now();
        schedule.is_paused = false;
        schedule.is_active = true;
        schedule.resumed_at = Some(now);
        schedule.active_at = Some(now);
        self.store.save(schedule.clone()).await?;
        info!(%schedule_id, "schedule resumed");
        Ok(schedule)
    }

    pub async fn delete(&self, schedule_id: &ScheduleId) -> Result<(), ScheduleError> {
        self.require(schedule_id).await?;
        self.delivery.delete_schedule(schedule_id).await?;
        self.store.delete(schedule_id).await?;
        info!(%schedule_id, "schedule deleted");
        Ok(())
    }

    pub async fn get(&self, schedule_id: &ScheduleId) -> Result<Option<TaskSchedule>, ScheduleError> {
        Ok(self.store.get(schedule_id).await?)
    }

    pub async fn list(&self) -> Result<Vec<TaskSchedule>, ScheduleError> {
        Ok(self.store.list().await?)
    }

    async fn require(&self, schedule_id: &ScheduleId) -> Result<TaskSchedule, ScheduleError> {
        self.store
            .get(schedule_id)
            .await?
            .ok_or_else(|| ScheduleError::NotFound(schedule_id.clone()))
    }

    fn request_for(
        &self,
        spec: &ScheduleSpec,
        schedule_id: Option<ScheduleId>,
    ) -> Result<ScheduleRequest, ScheduleError> {
        spec.validate()?;
        let unknown = || ScheduleError::UnknownTask {
            name: spec.task_name.clone(),
            available: self.registry.registered_paths(),
        };
        let (module, function) = split_path(&spec.task_name).ok_or_else(unknown)?;
        let task = self.registry.get(&spec.task_name).ok_or_else(unknown)?;

        let invocation = TaskInvocation::new(module, function)
            .with_args(spec.args.clone())
            .with_kwargs(spec.kwargs.clone())
            .with_task_name(task.label().to_string());
        let body = serde_json::to_value(&invocation)
            .map_err(|e| ScheduleError::Sync(format!("could not encode schedule body: {e}")))?;

        Ok(ScheduleRequest {
            schedule_id,
            destination: self.callback_url.clone(),
            body,
            cron: spec.cron.clone(),
            retries: spec.retries,
            timeout: spec.timeout.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::test_support::settings;
    use crate::domain::TaskOptions;
    use crate::impls::{InMemoryScheduleStore, RecordingDeliveryService, ScheduleCall};
    use crate::ports::FixedClock;
    use crate::typed::task::fixtures::{Add, AddHandler};
    use chrono::{TimeZone, Utc};
    use serde_json::json;

    struct Fixture {
        manager: ScheduleManager,
        delivery: Arc<RecordingDeliveryService>,
    }

    fn fixture() -> Fixture {
        let mut registry = TaskRegistry::new();
        registry.register::<Add, _>(AddHandler, TaskOptions::named("Math adder")).unwrap();
        let delivery = Arc::new(RecordingDeliveryService::new());
        let clock = Arc::new(FixedClock::new(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap()));
        let manager = ScheduleManager::new(
            &settings(),
            Arc::clone(&delivery) as Arc<dyn DeliveryService>,
            Arc::new(InMemoryScheduleStore::new()),
            Arc::new(registry),
            clock,
        );
        Fixture { manager, delivery }
    }

    fn nightly() -> ScheduleSpec {
        ScheduleSpec::new("nightly add", "app.tasks.add", "0 3 * * *").with_args(vec![json!(2), json!(3)])
    }

    #[tokio::test]
    async fn create_syncs_then_mirrors() {
        let f = fixture();
        let schedule = f.manager.create(nightly()).await.unwrap();

        assert!(schedule.is_active);
        assert!(!schedule.is_paused);
        assert!(schedule.active_at.is_some());

        let calls = f.delivery.schedule_calls().await;
        let ScheduleCall::Upsert(request) = &calls[0] else {
            panic!("expected upsert, got {calls:?}");
        };
        assert_eq!(request.schedule_id, None);
        assert_eq!(request.cron, "0 3 * * *");
        assert_eq!(request.destination, "https://example.com/qstash/webhook/");
        assert_eq!(request.body["function"], "add");
        assert_eq!(request.body["task_name"], "Math adder");

        assert_eq!(f.manager.list().await.unwrap(), vec![schedule]);
    }

    #[tokio::test]
    async fn unknown_task_lists_available() {
        let f = fixture();
        let err = f
            .manager
            .create(ScheduleSpec::new("x", "app.tasks.nope", "* * * * *"))
            .await
            .unwrap_err();
        assert_eq!(
            err.to_string(),
            "Task 'app.tasks.nope' not found. Available tasks: app.tasks.add"
        );
        assert!(f.delivery.schedule_calls().await.is_empty());
    }

    #[tokio::test]
    async fn invalid_spec_is_not_synced() {
        let f = fixture();
        let err = f.manager.create(nightly().with_retries(9)).await.unwrap_err();
        assert_eq!(err, ScheduleError::InvalidRetries(9));
        assert!(f.delivery.schedule_calls().await.is_empty());
    }

    #[tokio::test]
    async fn pause_and_resume_stamp_times() {
        let f = fixture();
        let created = f.manager.create(nightly()).await.unwrap();
        let id = created.schedule_id.clone();

        let paused = f.manager.pause(&id).await.unwrap();
        assert!(paused.is_paused);
        assert!(!paused.is_active);
        assert!(paused.paused_at.is_some());

        // pausing twice does not call the scheduler again
        f.manager.pause(&id).await.unwrap();

        let resumed = f.manager.resume(&id).await.unwrap();
        assert!(!resumed.is_paused);
        assert!(resumed.is_active);
        assert!(resumed.resumed_at.is_some());

        let calls = f.delivery.schedule_calls().await;
        assert_eq!(
            calls[1..],
            [ScheduleCall::Pause(id.clone()), ScheduleCall::Resume(id)]
        );
    }

    #[tokio::test]
    async fn update_keeps_id_and_sends_it() {
        let f = fixture();
        let created = f.manager.create(nightly()).await.unwrap();
        let id = created.schedule_id.clone();

        let updated = f
            .manager
            .update(&id, nightly().with_timeout("5m"))
            .await
            .unwrap();
        assert_eq!(updated.schedule_id, id);
        assert_eq!(updated.timeout, "5m");

        let calls = f.delivery.schedule_calls().await;
        let ScheduleCall::Upsert(request) = &calls[1] else {
            panic!("expected upsert");
        };
        assert_eq!(request.schedule_id.as_ref(), Some(&id));
    }

    #[tokio::test]
    async fn delete_removes_mirror() {
        let f = fixture();
        let created = f.manager.create(nightly()).await.unwrap();
        let id = created.schedule_id.clone();

        f.manager.delete(&id).await.unwrap();
        assert!(f.manager.get(&id).await.unwrap().is_none());
        assert_eq!(
            f.manager.delete(&id).await.unwrap_err(),
            ScheduleError::NotFound(id)
        );
    }
}
