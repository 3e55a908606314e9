use crate::application::bootstrap::bootstrap_workspace;
use crate::application::categories::CategoriesInteractor;
use crate::application::failures::PlannerFailure;
use crate::application::schedule_interactor::{ScheduleInteractor, ScheduleLookup};
use crate::application::schedule_refresh::{RefreshHandle, ScheduleRefreshLoop};
use crate::application::schedule_work::{
    ScheduleAction, ScheduleEffect, ScheduleSink, ScheduleWorkCommand, ScheduleWorkProcessor,
};
use crate::application::templates_work::{
    TemplatesAction, TemplatesEffect, TemplatesWorkCommand, TemplatesWorkProcessor,
};
use crate::application::time_shift::TimeShiftInteractor;
use crate::application::{DateProvider, WorkResult};
use crate::domain::models::{
    Categories, MainCategory, Schedule, SubCategory, Template, ThemeSettings, TimeTask,
};
use crate::domain::status::TimeTaskStatusController;
use crate::domain::templates::{TemplateSortOrder, instantiate};
use crate::infrastructure::categories_repository::{DEFAULT_MAIN_CATEGORY_ID, SqliteCategoriesRepository};
use crate::infrastructure::config::PlannerConfig;
use crate::infrastructure::error::InfraError;
use crate::infrastructure::notification::{JsonLinesAlarmQueue, NotificationScheduler};
use crate::infrastructure::schedule_repository::{ScheduleRepository, SqliteScheduleRepository};
use crate::infrastructure::settings_repository::{
    SettingsRepository, SqliteSettingsRepository, parse_language, parse_theme_colors,
};
use crate::infrastructure::templates_repository::{SqliteTemplatesRepository, TemplatesRepository};
use chrono::{NaiveDate, NaiveTime, Utc, Weekday};
use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};
use tokio::sync::mpsc::{self, UnboundedReceiver};

type SchedulePipeline = ScheduleWorkProcessor<SqliteScheduleRepository, SqliteTemplatesRepository>;

pub type ScheduleUpdates = UnboundedReceiver<WorkResult<ScheduleAction, ScheduleEffect>>;

pub struct AppState {
    config_dir: PathBuf,
    database_path: PathBuf,
    logs_dir: PathBuf,
    config: PlannerConfig,
    date_provider: DateProvider,
    schedule_repository: Arc<SqliteScheduleRepository>,
    templates_repository: Arc<SqliteTemplatesRepository>,
    settings_repository: SqliteSettingsRepository,
    schedule_interactor: Arc<ScheduleInteractor<SqliteScheduleRepository, SqliteTemplatesRepository>>,
    schedule_processor: Arc<SchedulePipeline>,
    templates_processor: TemplatesWorkProcessor<SqliteTemplatesRepository>,
    categories: CategoriesInteractor<SqliteCategoriesRepository>,
    active_schedule: Mutex<Option<ActiveSchedule>>,
    log_guard: Mutex<()>,
}

struct ActiveSchedule {
    date: NaiveDate,
    sink: ScheduleSink,
    refresh: RefreshHandle,
}

impl AppState {
    pub fn new(workspace_root: PathBuf) -> Result<Self, InfraError> {
        Self::with_date_provider(workspace_root, Arc::new(Utc::now))
    }

    pub fn with_date_provider(
        workspace_root: PathBuf,
        date_provider: DateProvider,
    ) -> Result<Self, InfraError> {
        let bootstrap = bootstrap_workspace(&workspace_root)?;
        let config = bootstrap.config.clone();
        let database_path = bootstrap.database_path;

        let schedule_repository = Arc::new(SqliteScheduleRepository::new(&database_path));
        let templates_repository = Arc::new(SqliteTemplatesRepository::new(&database_path));
        let notification_scheduler: Arc<dyn NotificationScheduler> =
            Arc::new(JsonLinesAlarmQueue::new(&bootstrap.alarm_queue_path));

        let schedule_interactor = Arc::new(
            ScheduleInteractor::new(
                Arc::clone(&schedule_repository),
                Arc::clone(&templates_repository),
                notification_scheduler,
                config.time_zone,
            )
            .with_date_provider(Arc::clone(&date_provider)),
        );
        let time_shift = TimeShiftInteractor::new(Arc::clone(&schedule_repository), config.time_zone)
            .with_date_provider(Arc::clone(&date_provider));
        let refresh_loop =
            ScheduleRefreshLoop::new(Arc::clone(&schedule_repository), config.status_check_interval)
                .with_date_provider(Arc::clone(&date_provider));
        let schedule_processor = Arc::new(ScheduleWorkProcessor::new(
            Arc::clone(&schedule_interactor),
            time_shift,
            refresh_loop,
            config.shift_minute_value,
        ));

        Ok(Self {
            config_dir: bootstrap.config_dir,
            logs_dir: bootstrap.logs_dir,
            settings_repository: SqliteSettingsRepository::new(&database_path),
            templates_processor: TemplatesWorkProcessor::new(Arc::clone(&templates_repository)),
            categories: CategoriesInteractor::new(Arc::new(SqliteCategoriesRepository::new(
                &database_path,
            ))),
            database_path,
            config,
            date_provider,
            schedule_repository,
            templates_repository,
            schedule_interactor,
            schedule_processor,
            active_schedule: Mutex::new(None),
            log_guard: Mutex::new(()),
        })
    }

    pub fn config_dir(&self) -> &Path {
        &self.config_dir
    }

    pub fn database_path(&self) -> &Path {
        &self.database_path
    }

    pub fn config(&self) -> &PlannerConfig {
        &self.config
    }

    pub fn command_error(&self, command: &str, error: &PlannerFailure) -> String {
        self.log_error(command, &error.to_string());
        error.to_string()
    }

    pub fn log_info(&self, command: &str, message: &str) {
        self.append_log("info", command, message);
    }

    pub fn log_error(&self, command: &str, message: &str) {
        self.append_log("error", command, message);
    }

    fn append_log(&self, level: &str, command: &str, message: &str) {
        let Ok(_guard) = self.log_guard.lock() else {
            return;
        };
        let path = self.logs_dir.join("commands.log");
        let payload = serde_json::json!({
            "timestamp": Utc::now().to_rfc3339(),
            "level": level,
            "command": command,
            "message": message,
        });

        if let Ok(mut file) = OpenOptions::new().create(true).append(true).open(path) {
            let _ = writeln!(file, "{}", payload);
        }
    }

    fn spawn_view(&self, date: NaiveDate, sink: ScheduleSink) -> ActiveSchedule {
        let processor = Arc::clone(&self.schedule_processor);
        let view_sink = sink.clone();
        let refresh = RefreshHandle::spawn(async move {
            processor
                .work(ScheduleWorkCommand::LoadScheduleByDate(date), &view_sink)
                .await;
        });
        ActiveSchedule { date, sink, refresh }
    }

    async fn suspend_view(&self, date: NaiveDate) -> Result<Option<ScheduleSink>, PlannerFailure> {
        let suspended = {
            let mut active = lock_active(self)?;
            let is_open = active.as_ref().is_some_and(|current| current.date == date);
            if is_open { active.take() } else { None }
        };
        let Some(suspended) = suspended else {
            return Ok(None);
        };
        suspended.refresh.cancel().await;
        Ok(Some(suspended.sink))
    }

    fn resume_view(&self, date: NaiveDate, sink: Option<ScheduleSink>) -> Result<(), PlannerFailure> {
        let Some(sink) = sink else {
            return Ok(());
        };
        let mut active = lock_active(self)?;
        if active.is_none() && !sink.is_closed() {
            *active = Some(self.spawn_view(date, sink));
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Default)]
pub struct TemplateInput {
    pub start_time: String,
    pub end_time: String,
    pub main_category_id: Option<i64>,
    pub sub_category_id: Option<i64>,
    pub is_enable_notification: bool,
    pub repeat_days: Vec<String>,
}

#[derive(Debug, Clone, Default)]
pub struct TimeTaskInput {
    pub start_time: String,
    pub end_time: String,
    pub main_category_id: Option<i64>,
    pub sub_category_id: Option<i64>,
    pub is_enable_notification: bool,
}

/// Opens the schedule view for `date`, replacing any view already open. The
/// stream stays open until the view is closed or replaced.
pub async fn open_schedule_impl(state: &AppState, date: String) -> Result<ScheduleUpdates, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let (sink, updates) = mpsc::unbounded_channel();

    let previous = lock_active(state)?.take();
    if let Some(previous) = previous {
        previous.refresh.cancel().await;
    }
    {
        let mut active = lock_active(state)?;
        *active = Some(state.spawn_view(date, sink));
    }

    state.log_info("open_schedule", &format!("opened schedule date={date}"));
    Ok(updates)
}

pub fn close_schedule_impl(state: &AppState) -> Result<bool, PlannerFailure> {
    let closed = lock_active(state)?.take();
    let Some(closed) = closed else {
        return Ok(false);
    };
    state.log_info("close_schedule", &format!("closed schedule date={}", closed.date));
    Ok(true)
}

pub fn get_schedule_impl(state: &AppState, date: String) -> Result<ScheduleLookup, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let lookup = match state.schedule_interactor.fetch_schedule_by_date(date)? {
        ScheduleLookup::Found(schedule) => {
            let now = (state.date_provider)();
            let time_tasks = TimeTaskStatusController.update_all(&schedule.time_tasks, now);
            ScheduleLookup::Found(Schedule { time_tasks, ..schedule })
        }
        empty => empty,
    };
    Ok(lookup)
}

pub async fn create_schedule_impl(
    state: &AppState,
    date: String,
    template_ids: Vec<i64>,
) -> Result<Schedule, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let templates = if template_ids.is_empty() {
        match state.schedule_interactor.fetch_schedule_by_date(date)? {
            ScheduleLookup::Found(_) => {
                return Err(PlannerFailure::Persistence(InfraError::Conflict(format!(
                    "schedule already exists: {date}"
                ))));
            }
            ScheduleLookup::Empty { repeat_templates, .. } => repeat_templates,
        }
    } else {
        template_ids
            .iter()
            .map(|id| {
                state
                    .templates_repository
                    .fetch_by_id(*id)?
                    .ok_or_else(|| PlannerFailure::NotFound(format!("template {id}")))
            })
            .collect::<Result<Vec<_>, PlannerFailure>>()?
    };

    let schedule = while_view_suspended(
        state,
        date,
        dispatch(state, ScheduleWorkCommand::CreateSchedule { date, templates }),
    )
    .await?;
    state.log_info(
        "create_schedule",
        &format!("created schedule date={date} tasks={}", schedule.time_tasks.len()),
    );
    Ok(schedule)
}

pub async fn toggle_task_done_impl(
    state: &AppState,
    date: String,
    key: String,
) -> Result<Schedule, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let key = required_text(&key, "key")?;
    let command = ScheduleWorkCommand::ChangeTaskDoneState {
        date,
        key: key.to_string(),
    };
    let schedule = while_view_suspended(state, date, dispatch(state, command)).await?;
    state.log_info("toggle_task_done", &format!("toggled task key={key} date={date}"));
    Ok(schedule)
}

pub async fn shift_task_up_impl(state: &AppState, date: String, key: String) -> Result<Schedule, PlannerFailure> {
    shift_task(state, "shift_task_up", date, key, ScheduleWorkCommand::TimeTaskShiftUp).await
}

pub async fn shift_task_down_impl(state: &AppState, date: String, key: String) -> Result<Schedule, PlannerFailure> {
    shift_task(state, "shift_task_down", date, key, ScheduleWorkCommand::TimeTaskShiftDown).await
}

pub async fn add_time_task_impl(
    state: &AppState,
    date: String,
    input: TimeTaskInput,
) -> Result<Schedule, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let task = build_time_task(state, date, &input)?;
    let key = task.key.clone();
    let schedule = while_view_suspended(state, date, state.schedule_interactor.add_time_task(task)).await?;
    state.log_info("add_time_task", &format!("added task key={key} date={date}"));
    Ok(schedule)
}

pub async fn update_time_task_impl(
    state: &AppState,
    date: String,
    key: String,
    input: TimeTaskInput,
) -> Result<Schedule, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let key = required_text(&key, "key")?;
    let mut task = build_time_task(state, date, &input)?;
    task.key = key.to_string();
    let schedule =
        while_view_suspended(state, date, state.schedule_interactor.update_time_task(task)).await?;
    state.log_info("update_time_task", &format!("updated task key={key} date={date}"));
    Ok(schedule)
}

pub async fn delete_time_task_impl(
    state: &AppState,
    date: String,
    key: String,
) -> Result<Schedule, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let key = required_text(&key, "key")?;
    let schedule = while_view_suspended(state, date, async {
        state.schedule_interactor.delete_time_task(date, key)
    })
    .await?;
    state.log_info("delete_time_task", &format!("deleted task key={key} date={date}"));
    Ok(schedule)
}

pub fn save_task_as_template_impl(state: &AppState, date: String, key: String) -> Result<Template, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let key = required_text(&key, "key")?;
    let template = state.schedule_interactor.save_task_as_template(date, key)?;
    state.log_info(
        "save_task_as_template",
        &format!("saved task key={key} as template id={}", template.id),
    );
    Ok(template)
}

pub fn list_templates_impl(state: &AppState, order: Option<String>) -> Result<Vec<Template>, PlannerFailure> {
    let order = parse_sort_order(order.as_deref())?;
    templates_result(
        state
            .templates_processor
            .work(TemplatesWorkCommand::LoadTemplates(order)),
    )
}

pub fn add_template_impl(state: &AppState, input: TemplateInput) -> Result<Template, PlannerFailure> {
    let mut template = build_template(state, 0, &input)?;
    template.id = state.templates_repository.add_template(&template)?;
    state.log_info("add_template", &format!("created template id={}", template.id));
    Ok(template)
}

pub fn update_template_impl(
    state: &AppState,
    template_id: i64,
    input: TemplateInput,
) -> Result<Template, PlannerFailure> {
    let template = build_template(state, template_id, &input)?;
    state.templates_repository.update_template(&template)?;
    state.log_info("update_template", &format!("updated template id={template_id}"));
    Ok(template)
}

pub fn delete_template_impl(
    state: &AppState,
    template_id: i64,
    order: Option<String>,
) -> Result<Vec<Template>, PlannerFailure> {
    let order = parse_sort_order(order.as_deref())?;
    let remaining = templates_result(state.templates_processor.work(TemplatesWorkCommand::DeleteTemplate {
        id: template_id,
        order,
    }))?;
    state.log_info("delete_template", &format!("deleted template id={template_id}"));
    Ok(remaining)
}

pub fn list_categories_impl(state: &AppState) -> Result<Vec<Categories>, PlannerFailure> {
    state.categories.fetch_categories()
}

pub fn add_main_category_impl(state: &AppState, name: String) -> Result<MainCategory, PlannerFailure> {
    let category = state.categories.add_main_category(&name)?;
    state.log_info("add_main_category", &format!("created main category id={}", category.id));
    Ok(category)
}

pub fn rename_main_category_impl(state: &AppState, category_id: i64, name: String) -> Result<(), PlannerFailure> {
    state.categories.rename_main_category(category_id, &name)?;
    state.log_info("rename_main_category", &format!("renamed main category id={category_id}"));
    Ok(())
}

pub fn delete_main_category_impl(state: &AppState, category_id: i64) -> Result<(), PlannerFailure> {
    state.categories.delete_main_category(category_id)?;
    state.log_info("delete_main_category", &format!("deleted main category id={category_id}"));
    Ok(())
}

pub fn add_sub_category_impl(
    state: &AppState,
    main_category_id: i64,
    name: String,
) -> Result<SubCategory, PlannerFailure> {
    let category = state.categories.add_sub_category(main_category_id, &name)?;
    state.log_info("add_sub_category", &format!("created sub category id={}", category.id));
    Ok(category)
}

pub fn delete_sub_category_impl(state: &AppState, category_id: i64) -> Result<(), PlannerFailure> {
    state.categories.delete_sub_category(category_id)?;
    state.log_info("delete_sub_category", &format!("deleted sub category id={category_id}"));
    Ok(())
}

pub fn get_theme_settings_impl(state: &AppState) -> Result<ThemeSettings, PlannerFailure> {
    Ok(state.settings_repository.fetch()?)
}

pub fn update_theme_settings_impl(
    state: &AppState,
    language: Option<String>,
    theme_colors: Option<String>,
    is_dynamic_color_enable: Option<bool>,
) -> Result<ThemeSettings, PlannerFailure> {
    let mut settings = state.settings_repository.fetch()?;
    if let Some(language) = language.as_deref() {
        settings.language = parse_language(language).map_err(invalid_input)?;
    }
    if let Some(theme_colors) = theme_colors.as_deref() {
        settings.theme_colors = parse_theme_colors(theme_colors).map_err(invalid_input)?;
    }
    if let Some(enabled) = is_dynamic_color_enable {
        settings.is_dynamic_color_enable = enabled;
    }
    state.settings_repository.update(&settings)?;
    state.log_info("update_theme_settings", &format!("updated settings {settings:?}"));
    Ok(settings)
}

async fn shift_task(
    state: &AppState,
    command_name: &str,
    date: String,
    key: String,
    command: fn(TimeTask) -> ScheduleWorkCommand,
) -> Result<Schedule, PlannerFailure> {
    let date = parse_date_input(state, &date)?;
    let key = required_text(&key, "key")?;
    let task = state
        .schedule_repository
        .fetch_by_date(date)?
        .ok_or_else(|| PlannerFailure::NotFound(format!("schedule {date}")))?
        .task(key)
        .cloned()
        .ok_or_else(|| PlannerFailure::NotFound(format!("time task {key}")))?;

    let schedule = while_view_suspended(state, date, dispatch(state, command(task))).await?;
    state.log_info(
        command_name,
        &format!(
            "shifted task key={key} by {} minutes",
            state.config.shift_minute_value
        ),
    );
    Ok(schedule)
}

async fn while_view_suspended<T>(
    state: &AppState,
    date: NaiveDate,
    change: impl Future<Output = Result<T, PlannerFailure>>,
) -> Result<T, PlannerFailure> {
    let sink = state.suspend_view(date).await?;
    let result = change.await;
    let resumed = state.resume_view(date, sink);
    let value = result?;
    resumed?;
    Ok(value)
}

async fn dispatch(state: &AppState, command: ScheduleWorkCommand) -> Result<Schedule, PlannerFailure> {
    let (sink, mut results) = mpsc::unbounded_channel();
    state.schedule_processor.work(command, &sink).await;
    drop(sink);
    match results.recv().await {
        Some(WorkResult::Action(ScheduleAction::UpdateSchedule(schedule))) => Ok(schedule),
        Some(WorkResult::Effect(ScheduleEffect::ShowError(failure))) => Err(failure),
        Some(WorkResult::Action(ScheduleAction::SetEmptySchedule { date, .. })) => {
            Err(PlannerFailure::NotFound(format!("schedule {date}")))
        }
        None => Err(PlannerFailure::Validation(
            "schedule command produced no result".to_string(),
        )),
    }
}

fn templates_result(result: WorkResult<TemplatesAction, TemplatesEffect>) -> Result<Vec<Template>, PlannerFailure> {
    match result {
        WorkResult::Action(TemplatesAction::UpdateTemplates(templates)) => Ok(templates),
        WorkResult::Effect(TemplatesEffect::ShowError(failure)) => Err(failure),
    }
}

fn lock_active(state: &AppState) -> Result<MutexGuard<'_, Option<ActiveSchedule>>, PlannerFailure> {
    state
        .active_schedule
        .lock()
        .map_err(|error| PlannerFailure::Persistence(InfraError::poisoned("schedule view", error)))
}

fn build_template(state: &AppState, id: i64, input: &TemplateInput) -> Result<Template, PlannerFailure> {
    let repeat_days = input
        .repeat_days
        .iter()
        .map(|value| {
            parse_weekday(value)
                .ok_or_else(|| PlannerFailure::Validation(format!("unknown weekday '{value}'")))
        })
        .collect::<Result<Vec<_>, _>>()?;
    let template = Template {
        id,
        start_time: parse_time_input(&input.start_time, "start_time")?,
        end_time: parse_time_input(&input.end_time, "end_time")?,
        main_category_id: input.main_category_id.unwrap_or(DEFAULT_MAIN_CATEGORY_ID),
        sub_category_id: input.sub_category_id,
        is_enable_notification: input.is_enable_notification,
        repeat_enabled: !repeat_days.is_empty(),
        repeat_days,
    };
    template.validate().map_err(PlannerFailure::Validation)?;
    state
        .categories
        .ensure_assignable(template.main_category_id, template.sub_category_id)?;
    Ok(template)
}

fn build_time_task(state: &AppState, date: NaiveDate, input: &TimeTaskInput) -> Result<TimeTask, PlannerFailure> {
    let shape = Template {
        id: 0,
        start_time: parse_time_input(&input.start_time, "start_time")?,
        end_time: parse_time_input(&input.end_time, "end_time")?,
        main_category_id: input.main_category_id.unwrap_or(DEFAULT_MAIN_CATEGORY_ID),
        sub_category_id: input.sub_category_id,
        is_enable_notification: input.is_enable_notification,
        repeat_enabled: false,
        repeat_days: Vec::new(),
    };
    state
        .categories
        .ensure_assignable(shape.main_category_id, shape.sub_category_id)?;
    instantiate(&shape, date, state.config.time_zone).map_err(PlannerFailure::Validation)
}

fn parse_date_input(state: &AppState, value: &str) -> Result<NaiveDate, PlannerFailure> {
    let value = value.trim();
    if value.eq_ignore_ascii_case("today") {
        let now = (state.date_provider)();
        return Ok(now.with_timezone(&state.config.time_zone).date_naive());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .map_err(|_| PlannerFailure::Validation(format!("date must be YYYY-MM-DD or today, got '{value}'")))
}

fn parse_time_input(value: &str, field_name: &str) -> Result<NaiveTime, PlannerFailure> {
    NaiveTime::parse_from_str(value.trim(), "%H:%M")
        .map_err(|_| PlannerFailure::Validation(format!("{field_name} must be HH:MM")))
}

fn parse_sort_order(value: Option<&str>) -> Result<TemplateSortOrder, PlannerFailure> {
    match value.map(str::trim).filter(|value| !value.is_empty()) {
        None => Ok(TemplateSortOrder::default()),
        Some(raw) => TemplateSortOrder::parse(raw)
            .ok_or_else(|| PlannerFailure::Validation(format!("unknown sort order '{raw}'"))),
    }
}

fn parse_weekday(value: &str) -> Option<Weekday> {
    match value.trim().to_ascii_lowercase().as_str() {
        "monday" | "mon" => Some(Weekday::Mon),
        "tuesday" | "tue" => Some(Weekday::Tue),
        "wednesday" | "wed" => Some(Weekday::Wed),
        "thursday" | "thu" => Some(Weekday::Thu),
        "friday" | "fri" => Some(Weekday::Fri),
        "saturday" | "sat" => Some(Weekday::Sat),
        "sunday" | "sun" => Some(Weekday::Sun),
        _ => None,
    }
}

fn required_text<'a>(value: &'a str, field_name: &str) -> Result<&'a str, PlannerFailure> {
    let value = value.trim();
    if value.is_empty() {
        return Err(PlannerFailure::Validation(format!("{field_name} must not be empty")));
    }
    Ok(value)
}

fn invalid_input(error: InfraError) -> PlannerFailure {
    PlannerFailure::Validation(error.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::models::{ExecutionStatus, LanguageType, ThemeColorsType};
    use chrono::{DateTime, TimeZone};
    use std::fs;
    use std::sync::atomic::{AtomicUsize, Ordering};

    static NEXT_TEMP_WORKSPACE: AtomicUsize = AtomicUsize::new(0);

    struct TempWorkspace {
        path: PathBuf,
    }

    impl TempWorkspace {
        fn new() -> Self {
            let sequence = NEXT_TEMP_WORKSPACE.fetch_add(1, Ordering::Relaxed);
            let path = std::env::temp_dir().join(format!(
                "timeplanner-command-tests-{}-{}",
                std::process::id(),
                sequence
            ));
            fs::create_dir_all(&path).expect("create temp workspace");
            Self { path }
        }

        fn app_state(&self) -> AppState {
            let now = fixed_now();
            AppState::with_date_provider(self.path.clone(), Arc::new(move || now))
                .expect("initialize app state")
        }
    }

    impl Drop for TempWorkspace {
        fn drop(&mut self) {
            let _ = fs::remove_dir_all(&self.path);
        }
    }

    const SAMPLE_DATE: &str = "2026-02-16";

    fn fixed_now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 2, 16, 8, 0, 0)
            .single()
            .expect("valid instant")
    }

    fn template_input(start: &str, end: &str) -> TemplateInput {
        TemplateInput {
            start_time: start.to_string(),
            end_time: end.to_string(),
            ..TemplateInput::default()
        }
    }

    fn task_input(start: &str, end: &str) -> TimeTaskInput {
        TimeTaskInput {
            start_time: start.to_string(),
            end_time: end.to_string(),
            ..TimeTaskInput::default()
        }
    }

    async fn next_update(updates: &mut ScheduleUpdates) -> Option<WorkResult<ScheduleAction, ScheduleEffect>> {
        tokio::time::timeout(std::time::Duration::from_secs(2), updates.recv())
            .await
            .expect("view update in time")
    }

    fn updated_schedule(result: Option<WorkResult<ScheduleAction, ScheduleEffect>>) -> Schedule {
        match result {
            Some(WorkResult::Action(ScheduleAction::UpdateSchedule(schedule))) => schedule,
            other => panic!("expected schedule update, got {other:?}"),
        }
    }

    async fn seeded_schedule(state: &AppState) -> Schedule {
        let first = add_template_impl(state, template_input("09:00", "10:00")).expect("first template");
        let second = add_template_impl(state, template_input("10:05", "11:00")).expect("second template");
        create_schedule_impl(state, SAMPLE_DATE.to_string(), vec![first.id, second.id])
            .await
            .expect("create schedule")
    }

    #[tokio::test]
    async fn create_and_get_schedule_roundtrip() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let created = seeded_schedule(&state).await;
        assert_eq!(created.time_tasks.len(), 2);
        assert!(
            created
                .time_tasks
                .iter()
                .all(|task| task.execution_status == ExecutionStatus::Planned)
        );

        let lookup = get_schedule_impl(&state, SAMPLE_DATE.to_string()).expect("get schedule");
        assert_eq!(lookup, ScheduleLookup::Found(created));

        let again = create_schedule_impl(&state, SAMPLE_DATE.to_string(), Vec::new()).await;
        assert!(matches!(
            again,
            Err(PlannerFailure::Persistence(InfraError::Conflict(_)))
        ));
    }

    #[tokio::test]
    async fn create_without_ids_uses_repeat_templates() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let mut repeating = template_input("07:00", "07:30");
        repeating.repeat_days = vec!["mon".to_string()];
        add_template_impl(&state, repeating).expect("repeating template");
        add_template_impl(&state, template_input("12:00", "13:00")).expect("plain template");

        let lookup = get_schedule_impl(&state, SAMPLE_DATE.to_string()).expect("lookup");
        let ScheduleLookup::Empty { repeat_templates, .. } = lookup else {
            panic!("expected empty schedule");
        };
        assert_eq!(repeat_templates.len(), 1);

        let created = create_schedule_impl(&state, SAMPLE_DATE.to_string(), Vec::new())
            .await
            .expect("create from repeat templates");
        assert_eq!(created.time_tasks.len(), 1);
        assert_eq!(
            created.time_tasks[0].execution_status,
            ExecutionStatus::Completed
        );
    }

    #[tokio::test]
    async fn open_view_restarts_after_shift_and_stops_on_close() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let created = seeded_schedule(&state).await;

        let mut updates = open_schedule_impl(&state, SAMPLE_DATE.to_string())
            .await
            .expect("open schedule");
        let first = updated_schedule(updates.recv().await);
        assert_eq!(first, created);

        let shifted = shift_task_up_impl(
            &state,
            SAMPLE_DATE.to_string(),
            created.time_tasks[0].key.clone(),
        )
        .await
        .expect("shift up");
        assert_eq!(
            shifted.time_tasks[1].time_range.from.to_rfc3339(),
            "2026-02-16T10:20:00+00:00"
        );

        let refreshed = updated_schedule(updates.recv().await);
        assert_eq!(refreshed, shifted);

        assert!(close_schedule_impl(&state).expect("close"));
        assert!(updates.recv().await.is_none());
        assert!(!close_schedule_impl(&state).expect("close again"));
    }

    #[tokio::test]
    async fn open_view_follows_create_edit_and_toggle() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let mut updates = open_schedule_impl(&state, SAMPLE_DATE.to_string())
            .await
            .expect("open schedule");
        let Some(WorkResult::Action(ScheduleAction::SetEmptySchedule { date, .. })) = updates.recv().await
        else {
            panic!("expected empty schedule");
        };
        assert_eq!(date.to_string(), SAMPLE_DATE);

        let template = add_template_impl(&state, template_input("09:00", "10:00")).expect("template");
        let created = create_schedule_impl(&state, SAMPLE_DATE.to_string(), vec![template.id])
            .await
            .expect("create schedule");
        assert_eq!(updated_schedule(next_update(&mut updates).await), created);

        let extended = add_time_task_impl(&state, SAMPLE_DATE.to_string(), task_input("06:00", "07:00"))
            .await
            .expect("add task");
        assert_eq!(updated_schedule(next_update(&mut updates).await), extended);

        let key = created.time_tasks[0].key.clone();
        let finished = toggle_task_done_impl(&state, SAMPLE_DATE.to_string(), key.clone())
            .await
            .expect("finish last task");
        assert!(finished.is_completed());
        assert_eq!(updated_schedule(next_update(&mut updates).await), finished);

        let reopened = toggle_task_done_impl(&state, SAMPLE_DATE.to_string(), key)
            .await
            .expect("reopen task");
        assert_eq!(updated_schedule(next_update(&mut updates).await), reopened);

        assert!(close_schedule_impl(&state).expect("close"));
        assert!(updates.recv().await.is_none());
    }

    #[tokio::test]
    async fn task_edit_commands_keep_schedule_consistent() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        seeded_schedule(&state).await;

        let added = add_time_task_impl(&state, SAMPLE_DATE.to_string(), task_input("13:00", "14:00"))
            .await
            .expect("add task");
        assert_eq!(added.time_tasks.len(), 3);
        let key = added.time_tasks[2].key.clone();

        let overlapping = add_time_task_impl(&state, SAMPLE_DATE.to_string(), task_input("09:30", "10:30")).await;
        assert!(matches!(overlapping, Err(PlannerFailure::Validation(_))));
        let clash = update_time_task_impl(
            &state,
            SAMPLE_DATE.to_string(),
            key.clone(),
            task_input("10:30", "12:00"),
        )
        .await;
        assert!(matches!(clash, Err(PlannerFailure::Validation(_))));

        let mut unknown_category = task_input("15:00", "16:00");
        unknown_category.main_category_id = Some(999);
        assert!(matches!(
            add_time_task_impl(&state, SAMPLE_DATE.to_string(), unknown_category).await,
            Err(PlannerFailure::NotFound(_))
        ));

        let moved = update_time_task_impl(
            &state,
            SAMPLE_DATE.to_string(),
            key.clone(),
            task_input("12:00", "12:30"),
        )
        .await
        .expect("move task");
        assert_eq!(
            moved.task(&key).expect("moved task").time_range.from.to_rfc3339(),
            "2026-02-16T12:00:00+00:00"
        );

        let template = save_task_as_template_impl(&state, SAMPLE_DATE.to_string(), key.clone())
            .expect("save as template");
        assert_eq!(template.start_time, NaiveTime::from_hms_opt(12, 0, 0).expect("valid time"));
        assert!(list_templates_impl(&state, None).expect("list").contains(&template));

        let remaining = delete_time_task_impl(&state, SAMPLE_DATE.to_string(), key.clone())
            .await
            .expect("delete task");
        assert_eq!(remaining.time_tasks.len(), 2);
        assert!(matches!(
            delete_time_task_impl(&state, SAMPLE_DATE.to_string(), key).await,
            Err(PlannerFailure::NotFound(_))
        ));
    }

    #[test]
    fn templates_need_existing_categories_and_fall_back_to_default() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let study = add_main_category_impl(&state, "Study".to_string()).expect("add");
        let rust = add_sub_category_impl(&state, study.id, "Rust".to_string()).expect("add sub");

        let mut missing_main = template_input("09:00", "10:00");
        missing_main.main_category_id = Some(999);
        assert!(matches!(
            add_template_impl(&state, missing_main),
            Err(PlannerFailure::NotFound(_))
        ));
        let mut foreign_sub = template_input("09:00", "10:00");
        foreign_sub.sub_category_id = Some(rust.id);
        assert!(matches!(
            add_template_impl(&state, foreign_sub),
            Err(PlannerFailure::NotFound(_))
        ));

        let mut input = template_input("09:00", "10:00");
        input.main_category_id = Some(study.id);
        input.sub_category_id = Some(rust.id);
        let template = add_template_impl(&state, input).expect("template");
        assert!(matches!(
            update_template_impl(
                &state,
                template.id,
                TemplateInput {
                    main_category_id: Some(999),
                    ..template_input("09:00", "10:00")
                }
            ),
            Err(PlannerFailure::NotFound(_))
        ));

        delete_main_category_impl(&state, study.id).expect("delete category");
        let stored = list_templates_impl(&state, None).expect("list");
        assert_eq!(stored[0].main_category_id, DEFAULT_MAIN_CATEGORY_ID);
        assert_eq!(stored[0].sub_category_id, None);
    }

    #[tokio::test]
    async fn shift_past_midnight_is_rejected_and_logged() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let template = add_template_impl(&state, template_input("00:10", "01:00")).expect("template");
        let created = create_schedule_impl(&state, SAMPLE_DATE.to_string(), vec![template.id])
            .await
            .expect("create");

        let result = shift_task_down_impl(
            &state,
            SAMPLE_DATE.to_string(),
            created.time_tasks[0].key.clone(),
        )
        .await;
        let Err(failure) = result else {
            panic!("expected shift rejection");
        };
        assert!(matches!(failure, PlannerFailure::ShiftOutOfBounds(_)));

        state.command_error("shift_task_down", &failure);
        let log = fs::read_to_string(workspace.path.join("logs").join("commands.log")).expect("read log");
        assert!(log.lines().any(|line| line.contains("\"level\":\"error\"")));
    }

    #[tokio::test]
    async fn toggle_marks_task_done_and_rejects_unknown_key() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        let created = seeded_schedule(&state).await;

        let toggled = toggle_task_done_impl(
            &state,
            SAMPLE_DATE.to_string(),
            created.time_tasks[0].key.clone(),
        )
        .await
        .expect("toggle");
        assert!(toggled.time_tasks[0].is_completed);

        let missing = toggle_task_done_impl(&state, SAMPLE_DATE.to_string(), "missing".to_string()).await;
        assert!(matches!(missing, Err(PlannerFailure::NotFound(_))));
    }

    #[test]
    fn template_commands_validate_sort_and_delete() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        assert!(matches!(
            add_template_impl(&state, template_input("9am", "10:00")),
            Err(PlannerFailure::Validation(_))
        ));
        assert!(matches!(
            add_template_impl(&state, template_input("10:00", "09:00")),
            Err(PlannerFailure::Validation(_))
        ));

        let long = add_template_impl(&state, template_input("08:00", "10:00")).expect("long");
        let short = add_template_impl(&state, template_input("12:00", "12:30")).expect("short");

        let by_duration = list_templates_impl(&state, Some("duration".to_string())).expect("list");
        assert_eq!(by_duration[0].id, short.id);

        let mut edited = template_input("13:00", "13:15");
        edited.repeat_days = vec!["fri".to_string()];
        let updated = update_template_impl(&state, long.id, edited).expect("update");
        assert!(updated.repeat_enabled);
        assert_eq!(updated.repeat_days, vec![Weekday::Fri]);

        let remaining = delete_template_impl(&state, short.id, None).expect("delete");
        assert_eq!(remaining, vec![updated]);
        assert!(matches!(
            list_templates_impl(&state, Some("size".to_string())),
            Err(PlannerFailure::Validation(_))
        ));
    }

    #[test]
    fn category_commands_keep_default_category() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();

        let categories = list_categories_impl(&state).expect("list");
        assert_eq!(categories.len(), 1);
        assert!(categories[0].main_category.is_default);

        let study = add_main_category_impl(&state, "Study".to_string()).expect("add");
        add_sub_category_impl(&state, study.id, "Rust".to_string()).expect("add sub");
        rename_main_category_impl(&state, study.id, "Learning".to_string()).expect("rename");
        assert!(delete_main_category_impl(&state, 1).is_err());
        delete_main_category_impl(&state, study.id).expect("delete");
        assert_eq!(list_categories_impl(&state).expect("list").len(), 1);
    }

    #[test]
    fn theme_settings_update_is_partial() {
        let workspace = TempWorkspace::new();
        let state = workspace.app_state();
        assert_eq!(get_theme_settings_impl(&state).expect("get"), ThemeSettings::default());

        update_theme_settings_impl(&state, Some("ru".to_string()), None, Some(true)).expect("update");
        let settings =
            update_theme_settings_impl(&state, None, Some("dark".to_string()), None).expect("update");
        assert_eq!(settings.language, LanguageType::Ru);
        assert_eq!(settings.theme_colors, ThemeColorsType::Dark);
        assert!(settings.is_dynamic_color_enable);

        assert!(matches!(
            update_theme_settings_impl(&state, Some("klingon".to_string()), None, None),
            Err(PlannerFailure::Validation(_))
        ));
    }
}
