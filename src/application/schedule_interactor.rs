use crate::application::DateProvider;
use crate::application::failures::PlannerFailure;
use crate::domain::models::{Schedule, Template, TimeTask};
use crate::domain::status::TimeTaskStatusController;
use crate::domain::templates::{instantiate, template_from_task};
use crate::infrastructure::notification::NotificationScheduler;
use crate::infrastructure::schedule_repository::ScheduleRepository;
use crate::infrastructure::templates_repository::TemplatesRepository;
use chrono::{Datelike, NaiveDate, Utc};
use chrono_tz::Tz;
use serde::Serialize;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum ScheduleLookup {
    Found(Schedule),
    /// No schedule stored yet; offers the templates that repeat on that weekday.
    Empty {
        date: NaiveDate,
        repeat_templates: Vec<Template>,
    },
}

pub struct ScheduleInteractor<S, T>
where
    S: ScheduleRepository,
    T: TemplatesRepository,
{
    schedule_repository: Arc<S>,
    templates_repository: Arc<T>,
    notification_scheduler: Arc<dyn NotificationScheduler>,
    status_controller: TimeTaskStatusController,
    date_provider: DateProvider,
    time_zone: Tz,
}

impl<S, T> ScheduleInteractor<S, T>
where
    S: ScheduleRepository,
    T: TemplatesRepository,
{
    pub fn new(
        schedule_repository: Arc<S>,
        templates_repository: Arc<T>,
        notification_scheduler: Arc<dyn NotificationScheduler>,
        time_zone: Tz,
    ) -> Self {
        Self {
            schedule_repository,
            templates_repository,
            notification_scheduler,
            status_controller: TimeTaskStatusController,
            date_provider: Arc::new(Utc::now),
            time_zone,
        }
    }

    pub fn with_date_provider(mut self, date_provider: DateProvider) -> Self {
        self.date_provider = date_provider;
        self
    }

    pub fn fetch_schedule_by_date(&self, date: NaiveDate) -> Result<ScheduleLookup, PlannerFailure> {
        if let Some(schedule) = self.schedule_repository.fetch_by_date(date)? {
            return Ok(ScheduleLookup::Found(schedule));
        }
        let weekday = date.weekday();
        let repeat_templates = self
            .templates_repository
            .fetch_all()?
            .into_iter()
            .filter(|template| template.repeats_on(weekday))
            .collect();
        Ok(ScheduleLookup::Empty {
            date,
            repeat_templates,
        })
    }

    pub async fn create_schedule(
        &self,
        date: NaiveDate,
        templates: &[Template],
    ) -> Result<Schedule, PlannerFailure> {
        let time_tasks = templates
            .iter()
            .map(|template| instantiate(template, date, self.time_zone))
            .collect::<Result<Vec<_>, _>>()
            .map_err(PlannerFailure::Validation)?;

        let now = (self.date_provider)();
        let schedule = Schedule::new(date, self.status_controller.update_all(&time_tasks, now));
        schedule.validate().map_err(PlannerFailure::Validation)?;
        self.schedule_repository.create(date, &schedule.time_tasks)?;

        for task in schedule
            .time_tasks
            .iter()
            .filter(|task| task.is_enable_notification && task.time_range.from > now)
        {
            self.notification_scheduler.schedule_alarm(task).await;
        }
        Ok(schedule)
    }

    pub fn change_task_done_state(&self, date: NaiveDate, key: &str) -> Result<Schedule, PlannerFailure> {
        let mut schedule = self
            .schedule_repository
            .fetch_by_date(date)?
            .ok_or_else(|| PlannerFailure::NotFound(format!("schedule {date}")))?;
        let task = schedule
            .time_tasks
            .iter_mut()
            .find(|task| task.key == key)
            .ok_or_else(|| PlannerFailure::NotFound(format!("time task {key}")))?;
        task.is_completed = !task.is_completed;

        let now = (self.date_provider)();
        schedule.time_tasks = self.status_controller.update_all(&schedule.time_tasks, now);
        self.schedule_repository.update(&schedule)?;
        Ok(schedule)
    }

    /// Creates the schedule when the day has none yet.
    pub async fn add_time_task(&self, task: TimeTask) -> Result<Schedule, PlannerFailure> {
        let date = task.date;
        let stored = self.schedule_repository.fetch_by_date(date)?;
        let exists = stored.is_some();
        let mut time_tasks = stored.map(|schedule| schedule.time_tasks).unwrap_or_default();
        time_tasks.push(task.clone());

        let schedule = self.rebuild(date, time_tasks)?;
        if exists {
            self.schedule_repository.update(&schedule)?;
        } else {
            self.schedule_repository.create(date, &schedule.time_tasks)?;
        }
        self.queue_alarm(&task).await;
        Ok(schedule)
    }

    pub async fn update_time_task(&self, task: TimeTask) -> Result<Schedule, PlannerFailure> {
        let date = task.date;
        let mut schedule = self.stored_schedule(date)?;
        let stored = schedule
            .time_tasks
            .iter_mut()
            .find(|stored| stored.key == task.key)
            .ok_or_else(|| PlannerFailure::NotFound(format!("time task {}", task.key)))?;
        let edited = TimeTask {
            is_completed: stored.is_completed,
            ..task
        };
        *stored = edited.clone();

        let schedule = self.rebuild(date, schedule.time_tasks)?;
        self.schedule_repository.update(&schedule)?;
        self.queue_alarm(&edited).await;
        Ok(schedule)
    }

    pub fn delete_time_task(&self, date: NaiveDate, key: &str) -> Result<Schedule, PlannerFailure> {
        let mut schedule = self.stored_schedule(date)?;
        let position = schedule
            .time_tasks
            .iter()
            .position(|task| task.key == key)
            .ok_or_else(|| PlannerFailure::NotFound(format!("time task {key}")))?;
        schedule.time_tasks.remove(position);

        let schedule = self.rebuild(date, schedule.time_tasks)?;
        self.schedule_repository.update(&schedule)?;
        Ok(schedule)
    }

    pub fn save_task_as_template(&self, date: NaiveDate, key: &str) -> Result<Template, PlannerFailure> {
        let schedule = self.stored_schedule(date)?;
        let task = schedule
            .task(key)
            .ok_or_else(|| PlannerFailure::NotFound(format!("time task {key}")))?;
        let mut template = template_from_task(task, self.time_zone).map_err(PlannerFailure::Validation)?;
        template.id = self.templates_repository.add_template(&template)?;
        Ok(template)
    }

    fn stored_schedule(&self, date: NaiveDate) -> Result<Schedule, PlannerFailure> {
        self.schedule_repository
            .fetch_by_date(date)?
            .ok_or_else(|| PlannerFailure::NotFound(format!("schedule {date}")))
    }

    fn rebuild(&self, date: NaiveDate, time_tasks: Vec<TimeTask>) -> Result<Schedule, PlannerFailure> {
        let now = (self.date_provider)();
        let schedule = Schedule::new(date, self.status_controller.update_all(&time_tasks, now));
        schedule.validate().map_err(PlannerFailure::Validation)?;
        Ok(schedule)
    }

    async fn queue_alarm(&self, task: &TimeTask) {
        if task.is_enable_notification && task.time_range.from > (self.date_provider)() {
            self.notification_scheduler.schedule_alarm(task).await;
        }
    }
}
