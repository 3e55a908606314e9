use chrono::{DateTime, Duration, NaiveDate, NaiveTime, TimeZone, Utc, Weekday};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub struct TimeRange {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl TimeRange {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, String> {
        let range = Self { from, to };
        range.validate()?;
        Ok(range)
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.to <= self.from {
            return Err("time_range.to must be after time_range.from".to_string());
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.to - self.from
    }

    /// Half-open: `from` is inside, `to` is not.
    pub fn contains(&self, instant: DateTime<Utc>) -> bool {
        instant >= self.from && instant < self.to
    }

    pub fn overlaps(&self, other: &TimeRange) -> bool {
        self.from < other.to && other.from < self.to
    }

    pub fn shifted(&self, delta: Duration) -> TimeRange {
        TimeRange {
            from: self.from + delta,
            to: self.to + delta,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Planned,
    Running,
    Completed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Planned => "planned",
            Self::Running => "running",
            Self::Completed => "completed",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "planned" => Some(Self::Planned),
            "running" => Some(Self::Running),
            "completed" => Some(Self::Completed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TimeTask {
    pub key: String,
    pub date: NaiveDate,
    pub time_range: TimeRange,
    pub main_category_id: i64,
    pub sub_category_id: Option<i64>,
    pub is_completed: bool,
    pub is_enable_notification: bool,
    pub execution_status: ExecutionStatus,
}

impl TimeTask {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.key, "time_task.key")?;
        self.time_range.validate()
    }

    pub fn duration(&self) -> Duration {
        self.time_range.duration()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Schedule {
    pub date: NaiveDate,
    pub time_tasks: Vec<TimeTask>,
}

impl Schedule {
    pub fn new(date: NaiveDate, mut time_tasks: Vec<TimeTask>) -> Self {
        sort_by_start(&mut time_tasks);
        Self { date, time_tasks }
    }

    pub fn validate(&self) -> Result<(), String> {
        let mut keys = HashSet::new();
        for task in &self.time_tasks {
            task.validate()?;
            if task.date != self.date {
                return Err(format!(
                    "time_task {} belongs to {} but schedule is {}",
                    task.key, task.date, self.date
                ));
            }
            if !keys.insert(task.key.as_str()) {
                return Err(format!("duplicate time_task key {}", task.key));
            }
        }
        for pair in self.time_tasks.windows(2) {
            if pair[0].time_range.from > pair[1].time_range.from {
                return Err("schedule.time_tasks must be ordered by start".to_string());
            }
            if pair[0].time_range.overlaps(&pair[1].time_range) {
                return Err(format!(
                    "time_task {} overlaps time_task {}",
                    pair[0].key, pair[1].key
                ));
            }
        }
        Ok(())
    }

    pub fn task(&self, key: &str) -> Option<&TimeTask> {
        self.time_tasks.iter().find(|task| task.key == key)
    }

    pub fn has_incomplete_tasks(&self) -> bool {
        self.time_tasks
            .iter()
            .any(|task| task.execution_status != ExecutionStatus::Completed)
    }

    pub fn is_completed(&self) -> bool {
        !self.time_tasks.is_empty() && !self.has_incomplete_tasks()
    }
}

pub(crate) fn sort_by_start(time_tasks: &mut [TimeTask]) {
    time_tasks.sort_by(|left, right| left.time_range.from.cmp(&right.time_range.from));
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Template {
    pub id: i64,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
    pub main_category_id: i64,
    pub sub_category_id: Option<i64>,
    pub is_enable_notification: bool,
    pub repeat_enabled: bool,
    pub repeat_days: Vec<Weekday>,
}

impl Template {
    pub fn validate(&self) -> Result<(), String> {
        if self.end_time <= self.start_time {
            return Err("template.end_time must be after template.start_time".to_string());
        }
        if self.repeat_enabled && self.repeat_days.is_empty() {
            return Err("template.repeat_days must not be empty when repeat is enabled".to_string());
        }
        Ok(())
    }

    pub fn duration(&self) -> Duration {
        self.end_time - self.start_time
    }

    pub fn repeats_on(&self, weekday: Weekday) -> bool {
        self.repeat_enabled && self.repeat_days.contains(&weekday)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MainCategory {
    pub id: i64,
    pub name: String,
    pub is_default: bool,
}

impl MainCategory {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "main_category.name")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct SubCategory {
    pub id: i64,
    pub main_category_id: i64,
    pub name: String,
}

impl SubCategory {
    pub fn validate(&self) -> Result<(), String> {
        validate_non_empty(&self.name, "sub_category.name")
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Categories {
    pub main_category: MainCategory,
    pub sub_categories: Vec<SubCategory>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum LanguageType {
    #[default]
    Default,
    En,
    Ru,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum ThemeColorsType {
    #[default]
    Default,
    Light,
    Dark,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ThemeSettings {
    pub language: LanguageType,
    pub theme_colors: ThemeColorsType,
    pub is_dynamic_color_enable: bool,
}

/// Start and end (exclusive) of a calendar day in `time_zone`, as UTC instants.
pub fn day_bounds(date: NaiveDate, time_zone: Tz) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
    let next = date.succ_opt()?;
    let start = local_midnight(date, time_zone)?;
    let end = local_midnight(next, time_zone)?;
    Some((start, end))
}

fn local_midnight(date: NaiveDate, time_zone: Tz) -> Option<DateTime<Utc>> {
    time_zone
        .from_local_datetime(&date.and_hms_opt(0, 0, 0)?)
        .earliest()
        .map(|value| value.with_timezone(&Utc))
}

fn validate_non_empty(value: &str, field_name: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err(format!("{field_name} must not be empty"));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn fixed_time(value: &str) -> DateTime<Utc> {
        DateTime::parse_from_rfc3339(value)
            .expect("valid datetime")
            .with_timezone(&Utc)
    }

    fn sample_date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2026, 2, 16).expect("valid date")
    }

    fn sample_task(key: &str, from: &str, to: &str) -> TimeTask {
        TimeTask {
            key: key.to_string(),
            date: sample_date(),
            time_range: TimeRange {
                from: fixed_time(from),
                to: fixed_time(to),
            },
            main_category_id: 1,
            sub_category_id: None,
            is_completed: false,
            is_enable_notification: false,
            execution_status: ExecutionStatus::Planned,
        }
    }

    fn sample_template() -> Template {
        Template {
            id: 1,
            start_time: NaiveTime::from_hms_opt(9, 0, 0).expect("valid time"),
            end_time: NaiveTime::from_hms_opt(10, 30, 0).expect("valid time"),
            main_category_id: 2,
            sub_category_id: Some(5),
            is_enable_notification: true,
            repeat_enabled: true,
            repeat_days: vec![Weekday::Mon, Weekday::Wed],
        }
    }

    #[test]
    fn time_range_rejects_reverse_bounds() {
        let at = fixed_time("2026-02-16T09:00:00Z");
        assert!(TimeRange::new(at, at).is_err());
        assert!(TimeRange::new(at, at + Duration::minutes(1)).is_ok());
    }

    #[test]
    fn time_range_contains_is_half_open() {
        let task = sample_task("a", "2026-02-16T09:00:00Z", "2026-02-16T10:00:00Z");
        assert!(task.time_range.contains(fixed_time("2026-02-16T09:00:00Z")));
        assert!(!task.time_range.contains(fixed_time("2026-02-16T10:00:00Z")));
    }

    #[test]
    fn touching_ranges_do_not_overlap() {
        let first = sample_task("a", "2026-02-16T09:00:00Z", "2026-02-16T10:00:00Z");
        let second = sample_task("b", "2026-02-16T10:00:00Z", "2026-02-16T11:00:00Z");
        assert!(!first.time_range.overlaps(&second.time_range));
    }

    #[test]
    fn schedule_new_orders_tasks_by_start() {
        let schedule = Schedule::new(
            sample_date(),
            vec![
                sample_task("late", "2026-02-16T12:00:00Z", "2026-02-16T13:00:00Z"),
                sample_task("early", "2026-02-16T08:00:00Z", "2026-02-16T09:00:00Z"),
            ],
        );
        assert_eq!(schedule.time_tasks[0].key, "early");
        assert!(schedule.validate().is_ok());
    }

    #[test]
    fn schedule_validate_rejects_overlap_and_duplicate_keys() {
        let overlapping = Schedule::new(
            sample_date(),
            vec![
                sample_task("a", "2026-02-16T09:00:00Z", "2026-02-16T10:00:00Z"),
                sample_task("b", "2026-02-16T09:30:00Z", "2026-02-16T11:00:00Z"),
            ],
        );
        assert!(overlapping.validate().is_err());

        let duplicated = Schedule::new(
            sample_date(),
            vec![
                sample_task("a", "2026-02-16T09:00:00Z", "2026-02-16T10:00:00Z"),
                sample_task("a", "2026-02-16T11:00:00Z", "2026-02-16T12:00:00Z"),
            ],
        );
        assert!(duplicated.validate().is_err());
    }

    #[test]
    fn schedule_completion_is_derived_from_all_tasks() {
        let mut schedule = Schedule::new(
            sample_date(),
            vec![
                sample_task("a", "2026-02-16T09:00:00Z", "2026-02-16T10:00:00Z"),
                sample_task("b", "2026-02-16T10:00:00Z", "2026-02-16T11:00:00Z"),
            ],
        );
        assert!(!schedule.is_completed());
        schedule.time_tasks[0].execution_status = ExecutionStatus::Completed;
        assert!(!schedule.is_completed());
        schedule.time_tasks[1].execution_status = ExecutionStatus::Completed;
        assert!(schedule.is_completed());
        assert!(!Schedule::new(sample_date(), Vec::new()).is_completed());
    }

    #[test]
    fn template_validate_and_repeat_days() {
        let template = sample_template();
        assert!(template.validate().is_ok());
        assert_eq!(template.duration(), Duration::minutes(90));
        assert!(template.repeats_on(Weekday::Mon));
        assert!(!template.repeats_on(Weekday::Tue));

        let mut invalid = sample_template();
        invalid.repeat_days.clear();
        assert!(invalid.validate().is_err());
        invalid.repeat_enabled = false;
        invalid.end_time = invalid.start_time;
        assert!(invalid.validate().is_err());
    }

    #[test]
    fn day_bounds_follow_time_zone() {
        let (start, end) = day_bounds(sample_date(), Tz::UTC).expect("bounds");
        assert_eq!(start, fixed_time("2026-02-16T00:00:00Z"));
        assert_eq!(end, fixed_time("2026-02-17T00:00:00Z"));

        let (start, _) = day_bounds(sample_date(), chrono_tz::Europe::Moscow).expect("bounds");
        assert_eq!(start, fixed_time("2026-02-15T21:00:00Z"));
    }

    #[test]
    fn models_support_serde_roundtrip() {
        let schedule = Schedule::new(
            sample_date(),
            vec![sample_task("a", "2026-02-16T09:00:00Z", "2026-02-16T10:00:00Z")],
        );
        let template = sample_template();

        let schedule_roundtrip: Schedule =
            serde_json::from_str(&serde_json::to_string(&schedule).expect("serialize schedule"))
                .expect("deserialize schedule");
        let template_roundtrip: Template =
            serde_json::from_str(&serde_json::to_string(&template).expect("serialize template"))
                .expect("deserialize template");

        assert_eq!(schedule_roundtrip, schedule);
        assert_eq!(template_roundtrip, template);
    }

    proptest! {
        #[test]
        fn overlap_is_symmetric(
            a_start in 0i64..1_440,
            a_len in 1i64..240,
            b_start in 0i64..1_440,
            b_len in 1i64..240
        ) {
            let base = fixed_time("2026-02-16T00:00:00Z");
            let a = TimeRange {
                from: base + Duration::minutes(a_start),
                to: base + Duration::minutes(a_start + a_len),
            };
            let b = TimeRange {
                from: base + Duration::minutes(b_start),
                to: base + Duration::minutes(b_start + b_len),
            };
            prop_assert_eq!(a.overlaps(&b), b.overlaps(&a));
            prop_assert_eq!(a.shifted(Duration::minutes(15)).duration(), a.duration());
        }
    }
}
