use crate::application::DateProvider;
use crate::application::failures::PlannerFailure;
use crate::domain::models::{Schedule, TimeTask, day_bounds, sort_by_start};
use crate::domain::status::TimeTaskStatusController;
use crate::infrastructure::schedule_repository::ScheduleRepository;
use chrono::{DateTime, Duration, Utc};
use chrono_tz::Tz;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShiftDirection {
    Up,
    Down,
}

/// Moves `key` and every neighbour it pushes into. Nothing changes when any
/// moved task would leave `[day_start, day_end]`.
pub fn shift_time_tasks(
    time_tasks: &[TimeTask],
    key: &str,
    direction: ShiftDirection,
    minutes: u32,
    day_start: DateTime<Utc>,
    day_end: DateTime<Utc>,
) -> Result<Vec<TimeTask>, PlannerFailure> {
    if minutes == 0 {
        return Err(PlannerFailure::Validation(
            "shift minutes must be > 0".to_string(),
        ));
    }

    let mut shifted = time_tasks.to_vec();
    sort_by_start(&mut shifted);
    let index = shifted
        .iter()
        .position(|task| task.key == key)
        .ok_or_else(|| PlannerFailure::NotFound(format!("time task {key}")))?;

    let delta = match direction {
        ShiftDirection::Up => Duration::minutes(i64::from(minutes)),
        ShiftDirection::Down => -Duration::minutes(i64::from(minutes)),
    };

    let mut moved = vec![index];
    match direction {
        ShiftDirection::Up => {
            let mut boundary = shifted[index].time_range.to + delta;
            for next in index + 1..shifted.len() {
                if shifted[next].time_range.from >= boundary {
                    break;
                }
                boundary = shifted[next].time_range.to + delta;
                moved.push(next);
            }
        }
        ShiftDirection::Down => {
            let mut boundary = shifted[index].time_range.from + delta;
            for previous in (0..index).rev() {
                if shifted[previous].time_range.to <= boundary {
                    break;
                }
                boundary = shifted[previous].time_range.from + delta;
                moved.push(previous);
            }
        }
    }

    for position in moved {
        let task = &mut shifted[position];
        let range = task.time_range.shifted(delta);
        if range.from < day_start || range.to > day_end {
            return Err(PlannerFailure::ShiftOutOfBounds(format!(
                "time task {} would move to {}..{}",
                task.key, range.from, range.to
            )));
        }
        task.time_range = range;
    }

    sort_by_start(&mut shifted);
    Ok(shifted)
}

pub struct TimeShiftInteractor<R>
where
    R: ScheduleRepository,
{
    repository: Arc<R>,
    time_zone: Tz,
    status_controller: TimeTaskStatusController,
    date_provider: DateProvider,
}

impl<R> TimeShiftInteractor<R>
where
    R: ScheduleRepository,
{
    pub fn new(repository: Arc<R>, time_zone: Tz) -> Self {
        Self {
            repository,
            time_zone,
            status_controller: TimeTaskStatusController,
            date_provider: Arc::new(Utc::now),
        }
    }

    pub fn with_date_provider(mut self, date_provider: DateProvider) -> Self {
        self.date_provider = date_provider;
        self
    }

    pub fn shift_up_time_task(&self, task: &TimeTask, minutes: u32) -> Result<Schedule, PlannerFailure> {
        self.shift(task, ShiftDirection::Up, minutes)
    }

    pub fn shift_down_time_task(&self, task: &TimeTask, minutes: u32) -> Result<Schedule, PlannerFailure> {
        self.shift(task, ShiftDirection::Down, minutes)
    }

    fn shift(
        &self,
        task: &TimeTask,
        direction: ShiftDirection,
        minutes: u32,
    ) -> Result<Schedule, PlannerFailure> {
        let schedule = self
            .repository
            .fetch_by_date(task.date)?
            .ok_or_else(|| PlannerFailure::NotFound(format!("schedule {}", task.date)))?;
        let (day_start, day_end) = day_bounds(task.date, self.time_zone).ok_or_else(|| {
            PlannerFailure::Validation(format!("cannot resolve day bounds for {}", task.date))
        })?;

        let shifted = shift_time_tasks(
            &schedule.time_tasks,
            &task.key,
            direction,
            minutes,
            day_start,
            day_end,
        )
        .inspect_err(|failure| {
            tracing::info!(task_key = %task.key, ?direction, minutes, %failure, "time shift rejected");
        })?;

        let now = (self.date_provider)();
        let updated = Schedule::new(schedule.date, self.status_controller.update_all(&shifted, now));
        updated.validate().map_err(PlannerFailure::Validation)?;
        self.repository.update(&updated)?;

        tracing::debug!(task_key = %task.key, ?direction, minutes, "time shift persisted");
        Ok(updated)
    }
}
