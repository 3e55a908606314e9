use crate::domain::models::{Categories, MainCategory, SubCategory};
use crate::infrastructure::error::InfraError;
use rusqlite::{Connection, OptionalExtension, params};
use std::path::{Path, PathBuf};

pub const DEFAULT_MAIN_CATEGORY_ID: i64 = 1;

pub trait CategoriesRepository: Send + Sync {
    fn fetch_categories(&self) -> Result<Vec<Categories>, InfraError>;
    fn add_main_categories(&self, categories: &[MainCategory]) -> Result<Vec<i64>, InfraError>;
    fn update_main_category(&self, category: &MainCategory) -> Result<(), InfraError>;
    /// Removes the category with its sub-categories and moves templates and
    /// tasks that used it to the default category.
    fn delete_main_category(&self, category_id: i64) -> Result<(), InfraError>;
    fn add_sub_category(&self, category: &SubCategory) -> Result<i64, InfraError>;
    fn delete_sub_category(&self, category_id: i64) -> Result<(), InfraError>;
}

#[derive(Debug, Clone)]
pub struct SqliteCategoriesRepository {
    db_path: PathBuf,
}

impl SqliteCategoriesRepository {
    pub fn new(db_path: impl AsRef<Path>) -> Self {
        Self {
            db_path: db_path.as_ref().to_path_buf(),
        }
    }

    fn connect(&self) -> Result<Connection, InfraError> {
        Connection::open(&self.db_path).map_err(InfraError::from)
    }
}

impl CategoriesRepository for SqliteCategoriesRepository {
    fn fetch_categories(&self) -> Result<Vec<Categories>, InfraError> {
        let connection = self.connect()?;
        let mut main_statement =
            connection.prepare("SELECT id, name, is_default FROM main_categories ORDER BY id")?;
        let main_categories = main_statement
            .query_map([], |row| {
                Ok(MainCategory {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    is_default: row.get(2)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        let mut sub_statement = connection.prepare(
            "SELECT id, main_category_id, name FROM sub_categories
             WHERE main_category_id = ?1 ORDER BY id",
        )?;
        let mut categories = Vec::with_capacity(main_categories.len());
        for main_category in main_categories {
            let sub_categories = sub_statement
                .query_map(params![main_category.id], |row| {
                    Ok(SubCategory {
                        id: row.get(0)?,
                        main_category_id: row.get(1)?,
                        name: row.get(2)?,
                    })
                })?
                .collect::<Result<Vec<_>, _>>()?;
            categories.push(Categories {
                main_category,
                sub_categories,
            });
        }
        Ok(categories)
    }

    fn add_main_categories(&self, categories: &[MainCategory]) -> Result<Vec<i64>, InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        let mut ids = Vec::with_capacity(categories.len());
        for category in categories {
            transaction.execute(
                "INSERT INTO main_categories (name, is_default) VALUES (?1, 0)",
                params![category.name.trim()],
            )?;
            ids.push(transaction.last_insert_rowid());
        }
        transaction.commit()?;
        Ok(ids)
    }

    fn update_main_category(&self, category: &MainCategory) -> Result<(), InfraError> {
        let connection = self.connect()?;
        let changed = connection.execute(
            "UPDATE main_categories SET name = ?2 WHERE id = ?1",
            params![category.id, category.name.trim()],
        )?;
        if changed == 0 {
            return Err(InfraError::NotFound(format!("main category {}", category.id)));
        }
        Ok(())
    }

    fn delete_main_category(&self, category_id: i64) -> Result<(), InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        let is_default: Option<bool> = transaction
            .query_row(
                "SELECT is_default FROM main_categories WHERE id = ?1",
                params![category_id],
                |row| row.get(0),
            )
            .optional()?;
        match is_default {
            None => return Err(InfraError::NotFound(format!("main category {category_id}"))),
            Some(true) => {
                return Err(InfraError::Conflict(format!(
                    "main category {category_id} is the default category"
                )));
            }
            Some(false) => {}
        }
        for table in ["templates", "time_tasks"] {
            transaction.execute(
                &format!(
                    "UPDATE {table} SET main_category_id = ?2, sub_category_id = NULL
                     WHERE main_category_id = ?1"
                ),
                params![category_id, DEFAULT_MAIN_CATEGORY_ID],
            )?;
        }
        transaction.execute(
            "DELETE FROM sub_categories WHERE main_category_id = ?1",
            params![category_id],
        )?;
        transaction.execute("DELETE FROM main_categories WHERE id = ?1", params![category_id])?;
        transaction.commit()?;
        Ok(())
    }

    fn add_sub_category(&self, category: &SubCategory) -> Result<i64, InfraError> {
        let connection = self.connect()?;
        let parent: Option<i64> = connection
            .query_row(
                "SELECT id FROM main_categories WHERE id = ?1",
                params![category.main_category_id],
                |row| row.get(0),
            )
            .optional()?;
        if parent.is_none() {
            return Err(InfraError::NotFound(format!(
                "main category {}",
                category.main_category_id
            )));
        }
        connection.execute(
            "INSERT INTO sub_categories (main_category_id, name) VALUES (?1, ?2)",
            params![category.main_category_id, category.name.trim()],
        )?;
        Ok(connection.last_insert_rowid())
    }

    fn delete_sub_category(&self, category_id: i64) -> Result<(), InfraError> {
        let mut connection = self.connect()?;
        let transaction = connection.transaction()?;
        let changed =
            transaction.execute("DELETE FROM sub_categories WHERE id = ?1", params![category_id])?;
        if changed == 0 {
            return Err(InfraError::NotFound(format!("sub category {category_id}")));
        }
        for table in ["templates", "time_tasks"] {
            transaction.execute(
                &format!("UPDATE {table} SET sub_category_id = NULL WHERE sub_category_id = ?1"),
                params![category_id],
            )?;
        }
        transaction.commit()?;
        Ok(())
    }
}
