use crate::domain::models::{ExecutionStatus, Template, TimeRange, TimeTask};
use chrono::{DateTime, NaiveDate, NaiveTime, TimeZone, Utc};
use chrono_tz::Tz;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_KEY: AtomicU64 = AtomicU64::new(1);

pub fn next_task_key() -> String {
    let sequence = NEXT_KEY.fetch_add(1, Ordering::Relaxed);
    format!("tsk-{}-{sequence}", Utc::now().timestamp_micros())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum TemplateSortOrder {
    #[default]
    Date,
    Category,
    Duration,
}

impl TemplateSortOrder {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "date" | "time" => Some(Self::Date),
            "category" | "categories" => Some(Self::Category),
            "duration" => Some(Self::Duration),
            _ => None,
        }
    }
}

/// Stable ordering of templates for display; ties keep their input order.
pub fn sort_templates(mut templates: Vec<Template>, order: TemplateSortOrder) -> Vec<Template> {
    match order {
        TemplateSortOrder::Date => templates.sort_by_key(|template| template.start_time),
        TemplateSortOrder::Category => templates.sort_by_key(|template| template.main_category_id),
        TemplateSortOrder::Duration => templates.sort_by_key(Template::duration),
    }
    templates
}

pub fn instantiate(template: &Template, date: NaiveDate, time_zone: Tz) -> Result<TimeTask, String> {
    template.validate()?;
    let from = local_instant(date, template.start_time, time_zone)?;
    let to = local_instant(date, template.end_time, time_zone)?;
    Ok(TimeTask {
        key: next_task_key(),
        date,
        time_range: TimeRange::new(from, to)?,
        main_category_id: template.main_category_id,
        sub_category_id: template.sub_category_id,
        is_completed: false,
        is_enable_notification: template.is_enable_notification,
        execution_status: ExecutionStatus::Planned,
    })
}

pub fn template_from_task(task: &TimeTask, time_zone: Tz) -> Result<Template, String> {
    let template = Template {
        id: 0,
        start_time: task.time_range.from.with_timezone(&time_zone).time(),
        end_time: task.time_range.to.with_timezone(&time_zone).time(),
        main_category_id: task.main_category_id,
        sub_category_id: task.sub_category_id,
        is_enable_notification: task.is_enable_notification,
        repeat_enabled: false,
        repeat_days: Vec::new(),
    };
    template.validate()?;
    Ok(template)
}

fn local_instant(date: NaiveDate, time: NaiveTime, time_zone: Tz) -> Result<DateTime<Utc>, String> {
    time_zone
        .from_local_datetime(&date.and_time(time))
        .earliest()
        .map(|value| value.with_timezone(&Utc))
        .ok_or_else(|| format!("{date} {time} does not exist in {}", time_zone.name()))
}
