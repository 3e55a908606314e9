pub mod application;
pub mod domain;
pub mod infrastructure;

pub use application::commands::{AppState, ScheduleUpdates, TemplateInput, TimeTaskInput};
pub use application::failures::PlannerFailure;
pub use application::schedule_interactor::ScheduleLookup;
pub use application::schedule_work::{ScheduleAction, ScheduleEffect};
pub use application::{DateProvider, WorkResult};
pub use domain::models::{
    Categories, ExecutionStatus, MainCategory, Schedule, SubCategory, Template, ThemeSettings,
    TimeRange, TimeTask,
};
pub use domain::status::TimeTaskStatusController;
pub use domain::templates::TemplateSortOrder;
pub use infrastructure::error::InfraError;
