use clap::{Parser, Subcommand};
use serde::Serialize;
use std::path::PathBuf;
use timeplanner::application::commands::{
    TimeTaskInput, add_main_category_impl, add_sub_category_impl, add_template_impl,
    add_time_task_impl, close_schedule_impl, create_schedule_impl, delete_main_category_impl,
    delete_sub_category_impl, delete_template_impl, delete_time_task_impl, get_schedule_impl,
    get_theme_settings_impl, list_categories_impl, list_templates_impl, open_schedule_impl,
    rename_main_category_impl, save_task_as_template_impl, shift_task_down_impl, shift_task_up_impl,
    toggle_task_done_impl, update_template_impl, update_theme_settings_impl, update_time_task_impl,
};
use timeplanner::{AppState, ScheduleAction, ScheduleEffect, TemplateInput, WorkResult};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "timeplanner", version, about = "Day planner with live task status")]
struct Cli {
    /// Workspace holding config/, state/ and logs/ (defaults to the current directory)
    #[arg(long, global = true)]
    root: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create the workspace layout and print its paths
    Bootstrap,
    /// Day schedules
    Schedule {
        #[command(subcommand)]
        action: ScheduleCommand,
    },
    /// Tasks of a schedule
    Task {
        #[command(subcommand)]
        action: TaskCommand,
    },
    /// Reusable task templates
    Template {
        #[command(subcommand)]
        action: TemplateCommand,
    },
    /// Main and sub categories
    Category {
        #[command(subcommand)]
        action: CategoryCommand,
    },
    /// Theme settings
    Settings {
        #[command(subcommand)]
        action: SettingsCommand,
    },
}

#[derive(Subcommand)]
enum ScheduleCommand {
    /// Print the schedule of a day, or the repeat templates when it does not exist
    Show {
        /// YYYY-MM-DD or "today"
        #[arg(default_value = "today")]
        date: String,
    },
    /// Create a schedule from templates (repeat templates of that weekday when none given)
    Create {
        #[arg(default_value = "today")]
        date: String,
        #[arg(long = "template", value_name = "ID")]
        template_ids: Vec<i64>,
    },
    /// Stream status updates until every task is completed
    Watch {
        #[arg(default_value = "today")]
        date: String,
    },
}

#[derive(Subcommand)]
enum TaskCommand {
    /// Toggle the done flag of a task
    Toggle { date: String, key: String },
    /// Move a task later by the configured step, pushing following tasks
    ShiftUp { date: String, key: String },
    /// Move a task earlier by the configured step, pushing preceding tasks
    ShiftDown { date: String, key: String },
    /// Add a task to a day, creating its schedule when needed
    Add {
        date: String,
        #[command(flatten)]
        task: TaskArgs,
    },
    /// Change the time, categories or notification of a task
    Edit {
        date: String,
        key: String,
        #[command(flatten)]
        task: TaskArgs,
    },
    Delete { date: String, key: String },
    /// Store a task as a new template
    SaveTemplate { date: String, key: String },
}

#[derive(clap::Args)]
struct TaskArgs {
    /// Start time, HH:MM
    start: String,
    /// End time, HH:MM
    end: String,
    #[arg(long)]
    category: Option<i64>,
    #[arg(long)]
    sub_category: Option<i64>,
    #[arg(long)]
    notify: bool,
}

impl From<TaskArgs> for TimeTaskInput {
    fn from(args: TaskArgs) -> Self {
        Self {
            start_time: args.start,
            end_time: args.end,
            main_category_id: args.category,
            sub_category_id: args.sub_category,
            is_enable_notification: args.notify,
        }
    }
}

#[derive(clap::Args)]
struct TemplateArgs {
    /// Start time, HH:MM
    start: String,
    /// End time, HH:MM
    end: String,
    #[arg(long)]
    category: Option<i64>,
    #[arg(long)]
    sub_category: Option<i64>,
    #[arg(long)]
    notify: bool,
    /// Weekday to repeat on (mon..sun), may be given several times
    #[arg(long = "repeat", value_name = "DAY")]
    repeat_days: Vec<String>,
}

impl From<TemplateArgs> for TemplateInput {
    fn from(args: TemplateArgs) -> Self {
        Self {
            start_time: args.start,
            end_time: args.end,
            main_category_id: args.category,
            sub_category_id: args.sub_category,
            is_enable_notification: args.notify,
            repeat_days: args.repeat_days,
        }
    }
}

#[derive(Subcommand)]
enum TemplateCommand {
    /// List templates sorted by date, category or duration
    List {
        #[arg(long)]
        sort: Option<String>,
    },
    Add(TemplateArgs),
    Update {
        id: i64,
        #[command(flatten)]
        template: TemplateArgs,
    },
    Delete {
        id: i64,
        #[arg(long)]
        sort: Option<String>,
    },
}

#[derive(Subcommand)]
enum CategoryCommand {
    List,
    Add { name: String },
    Rename { id: i64, name: String },
    Delete { id: i64 },
    AddSub { main_category_id: i64, name: String },
    DeleteSub { id: i64 },
}

#[derive(Subcommand)]
enum SettingsCommand {
    Show,
    Set {
        /// default, en or ru
        #[arg(long)]
        language: Option<String>,
        /// default, light or dark
        #[arg(long)]
        theme: Option<String>,
        #[arg(long)]
        dynamic_color: Option<bool>,
    },
}

#[tokio::main]
async fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    if let Err(message) = run(cli).await {
        eprintln!("error: {message}");
        std::process::exit(1);
    }
}

async fn run(cli: Cli) -> Result<(), String> {
    let workspace_root = match cli.root {
        Some(path) => path,
        None => std::env::current_dir().map_err(|error| error.to_string())?,
    };
    let state = AppState::new(workspace_root).map_err(|error| error.to_string())?;

    match cli.command {
        Commands::Bootstrap => print_json(&serde_json::json!({
            "configDir": state.config_dir().display().to_string(),
            "databasePath": state.database_path().display().to_string(),
            "timezone": state.config().time_zone.name(),
            "statusCheckSeconds": state.config().status_check_interval.as_secs(),
            "shiftMinuteValue": state.config().shift_minute_value,
        })),
        Commands::Schedule { action } => run_schedule(&state, action).await,
        Commands::Task { action } => run_task(&state, action).await,
        Commands::Template { action } => run_template(&state, action),
        Commands::Category { action } => run_category(&state, action),
        Commands::Settings { action } => run_settings(&state, action),
    }
}

async fn run_schedule(state: &AppState, action: ScheduleCommand) -> Result<(), String> {
    match action {
        ScheduleCommand::Show { date } => print_json(
            &get_schedule_impl(state, date).map_err(|error| state.command_error("get_schedule", &error))?,
        ),
        ScheduleCommand::Create { date, template_ids } => print_json(
            &create_schedule_impl(state, date, template_ids)
                .await
                .map_err(|error| state.command_error("create_schedule", &error))?,
        ),
        ScheduleCommand::Watch { date } => {
            let mut updates = open_schedule_impl(state, date)
                .await
                .map_err(|error| state.command_error("open_schedule", &error))?;
            while let Some(update) = updates.recv().await {
                let finished = match &update {
                    WorkResult::Action(ScheduleAction::UpdateSchedule(schedule)) => {
                        !schedule.has_incomplete_tasks()
                    }
                    WorkResult::Action(ScheduleAction::SetEmptySchedule { .. }) => true,
                    WorkResult::Effect(_) => false,
                };
                print_json(&update_event(update))?;
                if finished {
                    break;
                }
            }
            close_schedule_impl(state).map_err(|error| state.command_error("close_schedule", &error))?;
            Ok(())
        }
    }
}

async fn run_task(state: &AppState, action: TaskCommand) -> Result<(), String> {
    let schedule = match action {
        TaskCommand::SaveTemplate { date, key } => {
            return print_json(
                &save_task_as_template_impl(state, date, key)
                    .map_err(|error| state.command_error("save_task_as_template", &error))?,
            );
        }
        TaskCommand::Add { date, task } => add_time_task_impl(state, date, task.into())
            .await
            .map_err(|error| state.command_error("add_time_task", &error))?,
        TaskCommand::Edit { date, key, task } => update_time_task_impl(state, date, key, task.into())
            .await
            .map_err(|error| state.command_error("update_time_task", &error))?,
        TaskCommand::Delete { date, key } => delete_time_task_impl(state, date, key)
            .await
            .map_err(|error| state.command_error("delete_time_task", &error))?,
        TaskCommand::Toggle { date, key } => toggle_task_done_impl(state, date, key)
            .await
            .map_err(|error| state.command_error("toggle_task_done", &error))?,
        TaskCommand::ShiftUp { date, key } => shift_task_up_impl(state, date, key)
            .await
            .map_err(|error| state.command_error("shift_task_up", &error))?,
        TaskCommand::ShiftDown { date, key } => shift_task_down_impl(state, date, key)
            .await
            .map_err(|error| state.command_error("shift_task_down", &error))?,
    };
    print_json(&schedule)
}

fn run_template(state: &AppState, action: TemplateCommand) -> Result<(), String> {
    match action {
        TemplateCommand::List { sort } => print_json(
            &list_templates_impl(state, sort).map_err(|error| state.command_error("list_templates", &error))?,
        ),
        TemplateCommand::Add(args) => print_json(
            &add_template_impl(state, args.into())
                .map_err(|error| state.command_error("add_template", &error))?,
        ),
        TemplateCommand::Update { id, template } => print_json(
            &update_template_impl(state, id, template.into())
                .map_err(|error| state.command_error("update_template", &error))?,
        ),
        TemplateCommand::Delete { id, sort } => print_json(
            &delete_template_impl(state, id, sort)
                .map_err(|error| state.command_error("delete_template", &error))?,
        ),
    }
}

fn run_category(state: &AppState, action: CategoryCommand) -> Result<(), String> {
    match action {
        CategoryCommand::List => print_json(
            &list_categories_impl(state).map_err(|error| state.command_error("list_categories", &error))?,
        ),
        CategoryCommand::Add { name } => print_json(
            &add_main_category_impl(state, name)
                .map_err(|error| state.command_error("add_main_category", &error))?,
        ),
        CategoryCommand::Rename { id, name } => {
            rename_main_category_impl(state, id, name)
                .map_err(|error| state.command_error("rename_main_category", &error))?;
            print_json(&serde_json::json!({ "renamed": id }))
        }
        CategoryCommand::Delete { id } => {
            delete_main_category_impl(state, id)
                .map_err(|error| state.command_error("delete_main_category", &error))?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
        CategoryCommand::AddSub {
            main_category_id,
            name,
        } => print_json(
            &add_sub_category_impl(state, main_category_id, name)
                .map_err(|error| state.command_error("add_sub_category", &error))?,
        ),
        CategoryCommand::DeleteSub { id } => {
            delete_sub_category_impl(state, id)
                .map_err(|error| state.command_error("delete_sub_category", &error))?;
            print_json(&serde_json::json!({ "deleted": id }))
        }
    }
}

fn run_settings(state: &AppState, action: SettingsCommand) -> Result<(), String> {
    let settings = match action {
        SettingsCommand::Show => get_theme_settings_impl(state)
            .map_err(|error| state.command_error("get_theme_settings", &error))?,
        SettingsCommand::Set {
            language,
            theme,
            dynamic_color,
        } => update_theme_settings_impl(state, language, theme, dynamic_color)
            .map_err(|error| state.command_error("update_theme_settings", &error))?,
    };
    print_json(&settings)
}

fn update_event(update: WorkResult<ScheduleAction, ScheduleEffect>) -> serde_json::Value {
    match update {
        WorkResult::Action(ScheduleAction::UpdateSchedule(schedule)) => serde_json::json!({
            "event": "update_schedule",
            "schedule": schedule,
        }),
        WorkResult::Action(ScheduleAction::SetEmptySchedule {
            date,
            repeat_templates,
        }) => serde_json::json!({
            "event": "empty_schedule",
            "date": date,
            "repeatTemplates": repeat_templates,
        }),
        WorkResult::Effect(ScheduleEffect::ShowError(failure)) => serde_json::json!({
            "event": "error",
            "message": failure.to_string(),
        }),
    }
}

fn print_json<T: Serialize>(value: &T) -> Result<(), String> {
    let rendered = serde_json::to_string_pretty(value).map_err(|error| error.to_string())?;
    println!("{rendered}");
    Ok(())
}
