use crate::application::WorkResult;
use crate::application::failures::PlannerFailure;
use crate::application::schedule_interactor::{ScheduleInteractor, ScheduleLookup};
use crate::application::schedule_refresh::ScheduleRefreshLoop;
use crate::application::time_shift::TimeShiftInteractor;
use crate::domain::models::{Schedule, Template, TimeTask};
use crate::infrastructure::schedule_repository::ScheduleRepository;
use crate::infrastructure::templates_repository::TemplatesRepository;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio::sync::mpsc::UnboundedSender;

#[derive(Debug, Clone)]
pub enum ScheduleWorkCommand {
    LoadScheduleByDate(NaiveDate),
    CreateSchedule {
        date: NaiveDate,
        templates: Vec<Template>,
    },
    ChangeTaskDoneState {
        date: NaiveDate,
        key: String,
    },
    TimeTaskShiftUp(TimeTask),
    TimeTaskShiftDown(TimeTask),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ScheduleAction {
    UpdateSchedule(Schedule),
    SetEmptySchedule {
        date: NaiveDate,
        repeat_templates: Vec<Template>,
    },
}

#[derive(Debug)]
pub enum ScheduleEffect {
    ShowError(PlannerFailure),
}

pub type ScheduleSink = UnboundedSender<WorkResult<ScheduleAction, ScheduleEffect>>;

pub struct ScheduleWorkProcessor<S, T>
where
    S: ScheduleRepository,
    T: TemplatesRepository,
{
    schedule_interactor: Arc<ScheduleInteractor<S, T>>,
    time_shift_interactor: TimeShiftInteractor<S>,
    refresh_loop: ScheduleRefreshLoop<S>,
    shift_minutes: u32,
}

impl<S, T> ScheduleWorkProcessor<S, T>
where
    S: ScheduleRepository,
    T: TemplatesRepository,
{
    pub fn new(
        schedule_interactor: Arc<ScheduleInteractor<S, T>>,
        time_shift_interactor: TimeShiftInteractor<S>,
        refresh_loop: ScheduleRefreshLoop<S>,
        shift_minutes: u32,
    ) -> Self {
        Self {
            schedule_interactor,
            time_shift_interactor,
            refresh_loop,
            shift_minutes,
        }
    }

    pub async fn work(&self, command: ScheduleWorkCommand, sink: &ScheduleSink) {
        let result = match command {
            ScheduleWorkCommand::LoadScheduleByDate(date) => {
                match self.schedule_interactor.fetch_schedule_by_date(date) {
                    Ok(ScheduleLookup::Found(schedule)) => {
                        self.refresh_loop.run(schedule, sink).await;
                        return;
                    }
                    Ok(ScheduleLookup::Empty {
                        date,
                        repeat_templates,
                    }) => WorkResult::Action(ScheduleAction::SetEmptySchedule {
                        date,
                        repeat_templates,
                    }),
                    Err(failure) => WorkResult::Effect(ScheduleEffect::ShowError(failure)),
                }
            }
            ScheduleWorkCommand::CreateSchedule { date, templates } => self.respond(
                self.schedule_interactor
                    .create_schedule(date, &templates)
                    .await,
            ),
            ScheduleWorkCommand::ChangeTaskDoneState { date, key } => {
                self.respond(self.schedule_interactor.change_task_done_state(date, &key))
            }
            ScheduleWorkCommand::TimeTaskShiftUp(task) => self.respond(
                self.time_shift_interactor
                    .shift_up_time_task(&task, self.shift_minutes),
            ),
            ScheduleWorkCommand::TimeTaskShiftDown(task) => self.respond(
                self.time_shift_interactor
                    .shift_down_time_task(&task, self.shift_minutes),
            ),
        };

        if sink.send(result).is_err() {
            tracing::debug!("schedule view closed before result was delivered");
        }
    }

    fn respond(
        &self,
        outcome: Result<Schedule, PlannerFailure>,
    ) -> WorkResult<ScheduleAction, ScheduleEffect> {
        match outcome {
            Ok(schedule) => WorkResult::Action(ScheduleAction::UpdateSchedule(schedule)),
            Err(failure) => {
                tracing::info!(%failure, "schedule command failed");
                WorkResult::Effect(ScheduleEffect::ShowError(failure))
            }
        }
    }
}
