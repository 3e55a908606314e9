use crate::domain::models::{ExecutionStatus, TimeTask};
use chrono::{DateTime, Utc};

#[derive(Debug, Clone, Copy, Default)]
pub struct TimeTaskStatusController;

impl TimeTaskStatusController {
    pub fn status_at(&self, task: &TimeTask, now: DateTime<Utc>) -> ExecutionStatus {
        if task.is_completed || now >= task.time_range.to {
            ExecutionStatus::Completed
        } else if task.time_range.contains(now) {
            ExecutionStatus::Running
        } else {
            ExecutionStatus::Planned
        }
    }

    pub fn update_status(&self, task: &TimeTask, now: DateTime<Utc>) -> TimeTask {
        TimeTask {
            execution_status: self.status_at(task, now),
            ..task.clone()
        }
    }

    pub fn update_all(&self, tasks: &[TimeTask], now: DateTime<Utc>) -> Vec<TimeTask> {
        tasks
            .iter()
            .map(|task| self.update_status(task, now))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::TimeRange;
    use chrono::{Duration, NaiveDate};
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_task(is_completed: bool) -> TimeTask {
        TimeTask {
            key: "tsk-1".to_string(),
            date: NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date"),
            time_range: TimeRange {
                from: fixed_time("2026-02-16T09:00:00Z"),
                to: fixed_time("2026-02-16T10:00:00Z"),
            },
            main_category_id: 1,
            sub_category_id: None,
            is_completed,
            is_enable_notification: false,
            execution_status: ExecutionStatus::Planned,
        }
    }

    #[test]
    fn running_inside_range_and_completed_at_end() {
        let controller = TimeTaskStatusController;
        let task = sample_task(false);

        let running = controller.update_status(&task, fixed_time("2026-02-16T09:30:00Z"));
        assert_eq!(running.execution_status, ExecutionStatus::Running);

        let completed = controller.update_status(&task, fixed_time("2026-02-16T10:00:00Z"));
        assert_eq!(completed.execution_status, ExecutionStatus::Completed);

        let planned = controller.update_status(&task, fixed_time("2026-02-16T08:59:59Z"));
        assert_eq!(planned.execution_status, ExecutionStatus::Planned);
    }

    #[test]
    fn user_completed_task_stays_completed_before_start() {
        let controller = TimeTaskStatusController;
        let task = sample_task(true);
        let updated = controller.update_status(&task, fixed_time("2026-02-16T06:00:00Z"));
        assert_eq!(updated.execution_status, ExecutionStatus::Completed);
    }

    #[test]
    fn update_status_leaves_other_fields_untouched() {
        let controller = TimeTaskStatusController;
        let task = sample_task(false);
        let mut updated = controller.update_status(&task, fixed_time("2026-02-16T09:30:00Z"));
        updated.execution_status = task.execution_status;
        assert_eq!(updated, task);
    }

    proptest! {
        #[test]
        fn status_follows_position_of_now(offset_minutes in -180i64..180i64) {
            let controller = TimeTaskStatusController;
            let task = sample_task(false);
            let now = task.time_range.from + Duration::minutes(offset_minutes);
            let expected = if now < task.time_range.from {
                ExecutionStatus::Planned
            } else if now < task.time_range.to {
                ExecutionStatus::Running
            } else {
                ExecutionStatus::Completed
            };
            prop_assert_eq!(controller.status_at(&task, now), expected);
        }

        #[test]
        fn update_status_is_idempotent(offset_minutes in -180i64..180i64, is_completed in any::<bool>()) {
            let controller = TimeTaskStatusController;
            let task = sample_task(is_completed);
            let now = task.time_range.from + Duration::minutes(offset_minutes);
            let once = controller.update_status(&task, now);
            let twice = controller.update_status(&once, now);
            prop_assert_eq!(once, twice);
        }
    }
}
