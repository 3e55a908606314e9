use crate::application::WorkResult;
use crate::application::failures::PlannerFailure;
use crate::domain::models::Template;
use crate::domain::templates::{TemplateSortOrder, sort_templates};
use crate::infrastructure::templates_repository::TemplatesRepository;
use std::sync::Arc;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplatesWorkCommand {
    LoadTemplates(TemplateSortOrder),
    DeleteTemplate { id: i64, order: TemplateSortOrder },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TemplatesAction {
    UpdateTemplates(Vec<Template>),
}

#[derive(Debug)]
pub enum TemplatesEffect {
    ShowError(PlannerFailure),
}

pub struct TemplatesWorkProcessor<T>
where
    T: TemplatesRepository,
{
    repository: Arc<T>,
}

impl<T> TemplatesWorkProcessor<T>
where
    T: TemplatesRepository,
{
    pub fn new(repository: Arc<T>) -> Self {
        Self { repository }
    }

    pub fn work(&self, command: TemplatesWorkCommand) -> WorkResult<TemplatesAction, TemplatesEffect> {
        let outcome = match command {
            TemplatesWorkCommand::LoadTemplates(order) => self.load(order),
            TemplatesWorkCommand::DeleteTemplate { id, order } => self
                .repository
                .delete_by_id(id)
                .map_err(PlannerFailure::from)
                .and_then(|()| self.load(order)),
        };
        match outcome {
            Ok(templates) => WorkResult::Action(TemplatesAction::UpdateTemplates(templates)),
            Err(failure) => WorkResult::Effect(TemplatesEffect::ShowError(failure)),
        }
    }

    fn load(&self, order: TemplateSortOrder) -> Result<Vec<Template>, PlannerFailure> {
        Ok(sort_templates(self.repository.fetch_all()?, order))
    }
}
