pub mod bootstrap;
pub mod categories;
pub mod commands;
pub mod failures;
pub mod schedule_interactor;
pub mod schedule_refresh;
pub mod schedule_work;
pub mod templates_work;
pub mod time_shift;

use chrono::{DateTime, Utc};
use std::sync::Arc;

pub type DateProvider = Arc<dyn Fn() -> DateTime<Utc> + Send + Sync>;

#[derive(Debug)]
pub enum WorkResult<A, E> {
    Action(A),
    Effect(E),
}
