use crate::domain::models::TimeTask;
use crate::infrastructure::error::InfraError;
use async_trait::async_trait;
use chrono::Utc;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

#[async_trait]
pub trait NotificationScheduler: Send + Sync {
    async fn schedule_alarm(&self, task: &TimeTask);
}

#[derive(Debug)]
pub struct JsonLinesAlarmQueue {
    path: PathBuf,
    write_guard: Mutex<()>,
}

impl JsonLinesAlarmQueue {
    pub fn new(path: impl AsRef<Path>) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, task: &TimeTask) -> Result<(), InfraError> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|error| InfraError::poisoned("alarm queue", error))?;
        let payload = serde_json::json!({
            "queuedAt": Utc::now().to_rfc3339(),
            "taskKey": task.key,
            "date": task.date.to_string(),
            "fireAt": task.time_range.from.to_rfc3339(),
            "endsAt": task.time_range.to.to_rfc3339(),
            "mainCategoryId": task.main_category_id,
            "subCategoryId": task.sub_category_id,
        });
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        writeln!(file, "{payload}")?;
        Ok(())
    }
}

#[async_trait]
impl NotificationScheduler for JsonLinesAlarmQueue {
    async fn schedule_alarm(&self, task: &TimeTask) {
        match self.append(task) {
            Ok(()) => tracing::debug!(task_key = %task.key, fire_at = %task.time_range.from, "alarm queued"),
            Err(error) => tracing::warn!(task_key = %task.key, %error, "failed to queue alarm"),
        }
    }
}
