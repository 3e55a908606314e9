use crate::domain::models::{ExecutionStatus, Schedule, TimeRange, TimeTask, sort_by_start};
use crate::infrastructure::error::InfraError;
use chrono::{DateTime, NaiveDate, Utc};
use rusqlite::{Connection, OptionalExtension, Transaction, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;

pub trait ScheduleRepository: Send + Sync {
    fn fetch_by_date(&self, date: NaiveDate) -> Result<Option<Schedule>, InfraError>;
    fn create(&self, date: NaiveDate, time_tasks: &[TimeTask]) -> Result<(), InfraError>;
    fn update(&self, schedule: &Schedule) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteScheduleRepository {
    db_path: PathBuf,
}

impl SqliteScheduleRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }

    fn schedule_exists(connection: &Connection, date: NaiveDate) -> Result<bool, InfraError> {
        let found: Option<String> = connection
            .query_row(
                "SELECT date FROM schedules WHERE date = ?1",
                params![date.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(found.is_some())
    }

    fn insert_tasks(
        transaction: &Transaction<'_>,
        date: NaiveDate,
        time_tasks: &[TimeTask],
    ) -> Result<(), InfraError> {
        let mut statement = transaction.prepare(
            "INSERT INTO time_tasks (
                key, date, start_at, end_at, main_category_id, sub_category_id,
                is_completed, is_enable_notification, execution_status
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
        )?;
        for task in time_tasks {
            statement.execute(params![
                task.key,
                date.to_string(),
                task.time_range.from.to_rfc3339(),
                task.time_range.to.to_rfc3339(),
                task.main_category_id,
                task.sub_category_id,
                task.is_completed,
                task.is_enable_notification,
                task.execution_status.as_str(),
            ])?;
        }
        Ok(())
    }
}

type TaskRow = (String, String, String, i64, Option<i64>, bool, bool, String);

impl ScheduleRepository for SqliteScheduleRepository {
    fn fetch_by_date(&self, date: NaiveDate) -> Result<Option<Schedule>, InfraError> {
        let connection = self.connect()?;
        if !Self::schedule_exists(&connection, date)? {
            return Ok(None);
        }

        let mut statement = connection.prepare(
            "SELECT key, start_at, end_at, main_category_id, sub_category_id,
                    is_completed, is_enable_notification, execution_status
             FROM time_tasks WHERE date = ?1 ORDER BY start_at",
        )?;
        let rows = statement
            .query_map(params![date.to_string()], |row| {
                Ok((
                    row.get(0)?,
                    row.get(1)?,
                    row.get(2)?,
                    row.get(3)?,
                    row.get(4)?,
                    row.get(5)?,
                    row.get(6)?,
                    row.get(7)?,
                ))
            })?
            .collect::<Result<Vec<TaskRow>, _>>()?;

        let time_tasks = rows
            .into_iter()
            .map(|row| task_from_row(date, row))
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Some(Schedule::new(date, time_tasks)))
    }

    fn create(&self, date: NaiveDate, time_tasks: &[TimeTask]) -> Result<(), InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        if Self::schedule_exists(&transaction, date)? {
            return Err(InfraError::Conflict(format!("schedule already exists: {date}")));
        }
        transaction.execute(
            "INSERT INTO schedules (date) VALUES (?1)",
            params![date.to_string()],
        )?;
        Self::insert_tasks(&transaction, date, time_tasks)?;
        transaction.commit()?;
        Ok(())
    }

    fn update(&self, schedule: &Schedule) -> Result<(), InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        if !Self::schedule_exists(&transaction, schedule.date)? {
            return Err(InfraError::NotFound(format!("schedule {}", schedule.date)));
        }
        transaction.execute(
            "DELETE FROM time_tasks WHERE date = ?1",
            params![schedule.date.to_string()],
        )?;
        Self::insert_tasks(&transaction, schedule.date, &schedule.time_tasks)?;
        transaction.commit()?;
        Ok(())
    }
}

fn task_from_row(date: NaiveDate, row: TaskRow) -> Result<TimeTask, InfraError> {
    let (key, start_raw, end_raw, main_category_id, sub_category_id, is_completed, is_enable_notification, status_raw) =
        row;
    let execution_status = ExecutionStatus::parse(&status_raw).ok_or_else(|| {
        InfraError::CorruptRecord(format!("invalid time_tasks.execution_status '{status_raw}'"))
    })?;
    Ok(TimeTask {
        key,
        date,
        time_range: TimeRange {
            from: parse_stored_instant(&start_raw, "time_tasks.start_at")?,
            to: parse_stored_instant(&end_raw, "time_tasks.end_at")?,
        },
        main_category_id,
        sub_category_id,
        is_completed,
        is_enable_notification,
        execution_status,
    })
}

fn parse_stored_instant(value: &str, column: &str) -> Result<DateTime<Utc>, InfraError> {
    DateTime::parse_from_rfc3339(value)
        .map(|parsed| parsed.with_timezone(&Utc))
        .map_err(|error| InfraError::CorruptRecord(format!("invalid {column} '{value}': {error}")))
}

#[derive(Debug, Default)]
pub struct InMemoryScheduleRepository {
    schedules: Mutex<BTreeMap<NaiveDate, Schedule>>,
}

impl InMemoryScheduleRepository {
    fn lock(&self) -> Result<std::sync::MutexGuard<'_, BTreeMap<NaiveDate, Schedule>>, InfraError> {
        self.schedules
            .lock()
            .map_err(|error| InfraError::poisoned("schedule store", error))
    }
}

impl ScheduleRepository for InMemoryScheduleRepository {
    fn fetch_by_date(&self, date: NaiveDate) -> Result<Option<Schedule>, InfraError> {
        Ok(self.lock()?.get(&date).cloned())
    }

    fn create(&self, date: NaiveDate, time_tasks: &[TimeTask]) -> Result<(), InfraError> {
        let mut schedules = self.lock()?;
        if schedules.contains_key(&date) {
            return Err(InfraError::Conflict(format!("schedule already exists: {date}")));
        }
        schedules.insert(date, Schedule::new(date, time_tasks.to_vec()));
        Ok(())
    }

    fn update(&self, schedule: &Schedule) -> Result<(), InfraError> {
        let mut schedules = self.lock()?;
        let Some(stored) = schedules.get_mut(&schedule.date) else {
            return Err(InfraError::NotFound(format!("schedule {}", schedule.date)));
        };
        let mut time_tasks = schedule.time_tasks.clone();
        sort_by_start(&mut time_tasks);
        stored.time_tasks = time_tasks;
        Ok(())
    }
}
