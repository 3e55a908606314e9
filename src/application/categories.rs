use crate::application::failures::PlannerFailure;
use crate::domain::models::{Categories, MainCategory, SubCategory};
use crate::infrastructure::categories_repository::CategoriesRepository;
use std::sync::Arc;

pub struct CategoriesInteractor<C>
where
    C: CategoriesRepository,
{
    repository: Arc<C>,
}

impl<C> CategoriesInteractor<C>
where
    C: CategoriesRepository,
{
    pub fn new(repository: Arc<C>) -> Self {
        Self { repository }
    }

    pub fn fetch_categories(&self) -> Result<Vec<Categories>, PlannerFailure> {
        Ok(self.repository.fetch_categories()?)
    }

    pub fn add_main_category(&self, name: &str) -> Result<MainCategory, PlannerFailure> {
        let mut category = MainCategory {
            id: 0,
            name: name.trim().to_string(),
            is_default: false,
        };
        category.validate().map_err(PlannerFailure::Validation)?;
        let ids = self
            .repository
            .add_main_categories(std::slice::from_ref(&category))?;
        category.id = ids.first().copied().ok_or_else(|| {
            PlannerFailure::Validation("main category insert returned no id".to_string())
        })?;
        Ok(category)
    }

    pub fn rename_main_category(&self, id: i64, name: &str) -> Result<(), PlannerFailure> {
        let category = MainCategory {
            id,
            name: name.trim().to_string(),
            is_default: false,
        };
        category.validate().map_err(PlannerFailure::Validation)?;
        Ok(self.repository.update_main_category(&category)?)
    }

    pub fn delete_main_category(&self, id: i64) -> Result<(), PlannerFailure> {
        Ok(self.repository.delete_main_category(id)?)
    }

    pub fn add_sub_category(&self, main_category_id: i64, name: &str) -> Result<SubCategory, PlannerFailure> {
        let mut category = SubCategory {
            id: 0,
            main_category_id,
            name: name.trim().to_string(),
        };
        category.validate().map_err(PlannerFailure::Validation)?;
        category.id = self.repository.add_sub_category(&category)?;
        Ok(category)
    }

    pub fn delete_sub_category(&self, id: i64) -> Result<(), PlannerFailure> {
        Ok(self.repository.delete_sub_category(id)?)
    }

    pub fn ensure_assignable(
        &self,
        main_category_id: i64,
        sub_category_id: Option<i64>,
    ) -> Result<(), PlannerFailure> {
        let categories = self.repository.fetch_categories()?;
        let main = categories
            .iter()
            .find(|entry| entry.main_category.id == main_category_id)
            .ok_or_else(|| PlannerFailure::NotFound(format!("main category {main_category_id}")))?;
        if let Some(sub_category_id) = sub_category_id {
            if !main.sub_categories.iter().any(|sub| sub.id == sub_category_id) {
                return Err(PlannerFailure::NotFound(format!(
                    "sub category {sub_category_id} of main category {main_category_id}"
                )));
            }
        }
        Ok(())
    }
}
