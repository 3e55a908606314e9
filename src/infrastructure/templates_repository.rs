use crate::domain::models::Template;
use crate::infrastructure::error::InfraError;
use chrono::{NaiveTime, Weekday};
use rusqlite::{Connection, OptionalExtension, Row, params};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};

const TIME_FORMAT: &str = "%H:%M";

pub trait TemplatesRepository: Send + Sync {
    fn add_template(&self, template: &Template) -> Result<i64, InfraError>;
    fn add_templates(&self, templates: &[Template]) -> Result<Vec<i64>, InfraError> {
        templates
            .iter()
            .map(|template| self.add_template(template))
            .collect()
    }
    fn fetch_by_id(&self, template_id: i64) -> Result<Option<Template>, InfraError>;
    fn fetch_all(&self) -> Result<Vec<Template>, InfraError>;
    fn update_template(&self, template: &Template) -> Result<(), InfraError>;
    fn delete_by_id(&self, template_id: i64) -> Result<(), InfraError>;
    fn delete_all(&self) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteTemplatesRepository {
    db_path: PathBuf,
}

impl SqliteTemplatesRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

struct TemplateRow {
    id: i64,
    start_time: String,
    end_time: String,
    main_category_id: i64,
    sub_category_id: Option<i64>,
    is_enable_notification: bool,
    repeat_enabled: bool,
    repeat_days: String,
}

impl TemplateRow {
    fn read(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            start_time: row.get(1)?,
            end_time: row.get(2)?,
            main_category_id: row.get(3)?,
            sub_category_id: row.get(4)?,
            is_enable_notification: row.get(5)?,
            repeat_enabled: row.get(6)?,
            repeat_days: row.get(7)?,
        })
    }

    fn into_template(self) -> Result<Template, InfraError> {
        let repeat_days: Vec<Weekday> = serde_json::from_str(&self.repeat_days)?;
        Ok(Template {
            id: self.id,
            start_time: parse_stored_time(&self.start_time, "templates.start_time")?,
            end_time: parse_stored_time(&self.end_time, "templates.end_time")?,
            main_category_id: self.main_category_id,
            sub_category_id: self.sub_category_id,
            is_enable_notification: self.is_enable_notification,
            repeat_enabled: self.repeat_enabled,
            repeat_days,
        })
    }
}

const SELECT_TEMPLATE: &str = "SELECT id, start_time, end_time, main_category_id, sub_category_id,
        is_enable_notification, repeat_enabled, repeat_days
 FROM templates";

impl TemplatesRepository for SqliteTemplatesRepository {
    fn add_template(&self, template: &Template) -> Result<i64, InfraError> {
        let connection = self.connect()?;
        connection.execute(
            "INSERT INTO templates (
                start_time, end_time, main_category_id, sub_category_id,
                is_enable_notification, repeat_enabled, repeat_days
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                template.start_time.format(TIME_FORMAT).to_string(),
                template.end_time.format(TIME_FORMAT).to_string(),
                template.main_category_id,
                template.sub_category_id,
                template.is_enable_notification,
                template.repeat_enabled,
                serde_json::to_string(&template.repeat_days)?,
            ],
        )?;
        Ok(connection.last_insert_rowid())
    }

    fn fetch_by_id(&self, template_id: i64) -> Result<Option<Template>, InfraError> {
        let connection = self.connect()?;
        let row = connection
            .query_row(
                &format!("{SELECT_TEMPLATE} WHERE id = ?1"),
                params![template_id],
                TemplateRow::read,
            )
            .optional()?;
        row.map(TemplateRow::into_template).transpose()
    }

    fn fetch_all(&self) -> Result<Vec<Template>, InfraError> {
        let connection = self.connect()?;
        let mut statement = connection.prepare(&format!("{SELECT_TEMPLATE} ORDER BY id"))?;
        let rows = statement
            .query_map([], TemplateRow::read)?
            .collect::<Result<Vec<_>, _>>()?;
        rows.into_iter().map(TemplateRow::into_template).collect()
    }

    fn update_template(&self, template: &Template) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let changed = connection.execute(
            "UPDATE templates SET
                start_time = ?2, end_time = ?3, main_category_id = ?4, sub_category_id = ?5,
                is_enable_notification = ?6, repeat_enabled = ?7, repeat_days = ?8
             WHERE id = ?1",
            params![
                template.id,
                template.start_time.format(TIME_FORMAT).to_string(),
                template.end_time.format(TIME_FORMAT).to_string(),
                template.main_category_id,
                template.sub_category_id,
                template.is_enable_notification,
                template.repeat_enabled,
                serde_json::to_string(&template.repeat_days)?,
            ],
        )?;
        if changed == 0 {
            return Err(InfraError::NotFound(format!("template {}", template.id)));
        }
        Ok(())
    }

    fn delete_by_id(&self, template_id: i64) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let changed = connection.execute("DELETE FROM templates WHERE id = ?1", params![template_id])?;
        if changed == 0 {
            return Err(InfraError::NotFound(format!("template {template_id}")));
        }
        Ok(())
    }

    fn delete_all(&self) -> Result<(), InfraError> {
        let connection = self.connect()?;
        connection.execute("DELETE FROM templates", [])?;
        Ok(())
    }
}

fn parse_stored_time(value: &str, column: &str) -> Result<NaiveTime, InfraError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .map_err(|error| InfraError::CorruptRecord(format!("invalid {column} '{value}': {error}")))
}

#[derive(Debug, Default)]
pub struct InMemoryTemplatesRepository {
    state: Mutex<InMemoryTemplates>,
}

#[derive(Debug, Default)]
struct InMemoryTemplates {
    next_id: i64,
    templates: BTreeMap<i64, Template>,
}

impl InMemoryTemplatesRepository {
    fn lock(&self) -> Result<MutexGuard<'_, InMemoryTemplates>, InfraError> {
        self.state
            .lock()
            .map_err(|error| InfraError::poisoned("template store", error))
    }
}

impl TemplatesRepository for InMemoryTemplatesRepository {
    fn add_template(&self, template: &Template) -> Result<i64, InfraError> {
        let mut state = self.lock()?;
        state.next_id += 1;
        let id = state.next_id;
        let mut stored = template.clone();
        stored.id = id;
        state.templates.insert(id, stored);
        Ok(id)
    }

    fn fetch_by_id(&self, template_id: i64) -> Result<Option<Template>, InfraError> {
        Ok(self.lock()?.templates.get(&template_id).cloned())
    }

    fn fetch_all(&self) -> Result<Vec<Template>, InfraError> {
        Ok(self.lock()?.templates.values().cloned().collect())
    }

    fn update_template(&self, template: &Template) -> Result<(), InfraError> {
        let mut state = self.lock()?;
        let Some(stored) = state.templates.get_mut(&template.id) else {
            return Err(InfraError::NotFound(format!("template {}", template.id)));
        };
        *stored = template.clone();
        Ok(())
    }

    fn delete_by_id(&self, template_id: i64) -> Result<(), InfraError> {
        match self.lock()?.templates.remove(&template_id) {
            Some(_) => Ok(()),
            None => Err(InfraError::NotFound(format!("template {template_id}"))),
        }
    }

    fn delete_all(&self) -> Result<(), InfraError> {
        self.lock()?.templates.clear();
        Ok(())
    }
}
