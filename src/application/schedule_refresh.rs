use crate::application::DateProvider;
use crate::application::WorkResult;
use crate::application::failures::PlannerFailure;
use crate::application::schedule_work::{ScheduleAction, ScheduleEffect, ScheduleSink};
use crate::domain::models::Schedule;
use crate::domain::status::TimeTaskStatusController;
use crate::infrastructure::schedule_repository::ScheduleRepository;
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::sleep;

pub struct ScheduleRefreshLoop<R>
where
    R: ScheduleRepository,
{
    repository: Arc<R>,
    status_controller: TimeTaskStatusController,
    date_provider: DateProvider,
    interval: Duration,
}

impl<R> ScheduleRefreshLoop<R>
where
    R: ScheduleRepository,
{
    pub fn new(repository: Arc<R>, interval: Duration) -> Self {
        Self {
            repository,
            status_controller: TimeTaskStatusController,
            date_provider: Arc::new(Utc::now),
            interval,
        }
    }

    pub fn with_date_provider(mut self, date_provider: DateProvider) -> Self {
        self.date_provider = date_provider;
        self
    }

    pub async fn run(&self, schedule: Schedule, sink: &ScheduleSink) {
        let mut current = schedule;
        let mut first_tick = true;
        let mut persist_pending = false;

        loop {
            let now = (self.date_provider)();
            let updated = Schedule {
                date: current.date,
                time_tasks: self.status_controller.update_all(&current.time_tasks, now),
            };

            if first_tick || updated.time_tasks != current.time_tasks {
                first_tick = false;
                let action = ScheduleAction::UpdateSchedule(updated.clone());
                if sink.send(WorkResult::Action(action)).is_err() {
                    tracing::debug!(date = %updated.date, "schedule view closed, stopping refresh");
                    return;
                }
                persist_pending = updated.has_incomplete_tasks();
            }

            if persist_pending {
                match self.repository.update(&updated) {
                    Ok(()) => persist_pending = false,
                    Err(error) => {
                        tracing::warn!(date = %updated.date, %error, "failed to persist refreshed schedule");
                        let effect = ScheduleEffect::ShowError(PlannerFailure::Persistence(error));
                        if sink.send(WorkResult::Effect(effect)).is_err() {
                            return;
                        }
                    }
                }
            }

            current = updated;
            if !current.has_incomplete_tasks() {
                tracing::debug!(date = %current.date, "schedule completed, refresh finished");
                return;
            }
            sleep(self.interval).await;
        }
    }
}

#[derive(Debug)]
pub struct RefreshHandle {
    handle: JoinHandle<()>,
}

impl RefreshHandle {
    pub fn spawn<F>(work: F) -> Self
    where
        F: Future<Output = ()> + Send + 'static,
    {
        Self {
            handle: tokio::spawn(work),
        }
    }

    /// Aborts the task and waits until it has stopped.
    pub async fn cancel(mut self) {
        self.handle.abort();
        match (&mut self.handle).await {
            Err(error) if !error.is_cancelled() => {
                tracing::warn!(%error, "schedule refresh task failed");
            }
            _ => {}
        }
    }
}

impl Drop for RefreshHandle {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
