use crate::api::IncomeApi;
use crate::error::{ApiError, ApiResult};
use crate::models::{Goal, GoalInput, GoalProgress, Income, IncomeInput, RecordId};
use crate::stats::{self, BucketTotals};
use std::cell::{Cell, RefCell};
use std::rc::Rc;
use yew::functional::{Reducible, UseReducerDispatcher};

pub const FETCH_GOALS_FAILED: &str = "获取目标失败";
pub const ADD_GOAL_FAILED: &str = "添加目标失败";
pub const UPDATE_GOAL_FAILED: &str = "更新目标失败";
pub const DELETE_GOAL_FAILED: &str = "删除目标失败";

/// Client-side copy of the user's incomes and goals.
///
/// Only [`IncomeState::apply`] changes it, one [`StoreMsg`] at a time; the
/// network side lives in [`Actions`].
#[derive(Debug, Clone, PartialEq, Default)]
pub struct IncomeState {
    pub incomes: Vec<Income>,
    pub goals: Vec<Goal>,
    pub goals_progress: Vec<GoalProgress>,
    pub loading: bool,
    pub error: Option<String>,
    in_flight: usize,
    incomes_ticket: u64,
    goals_ticket: u64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum StoreMsg {
    Started,
    Settled,
    IncomesLoaded {
        ticket: u64,
        incomes: Vec<Income>,
    },
    IncomeAdded(Income),
    IncomeUpdated {
        id: RecordId,
        income: Income,
    },
    IncomeDeleted(RecordId),
    GoalsLoaded {
        ticket: u64,
        goals: Vec<Goal>,
        progress: Vec<GoalProgress>,
    },
    GoalAdded(Goal),
    GoalUpdated {
        id: RecordId,
        goal: Goal,
    },
    GoalDeleted(RecordId),
    Failed(String),
}

impl IncomeState {
    pub fn apply(&mut self, msg: StoreMsg) {
        match msg {
            StoreMsg::Started => {
                self.in_flight += 1;
                self.loading = true;
            }
            StoreMsg::Settled => {
                self.in_flight = self.in_flight.saturating_sub(1);
                self.loading = self.in_flight > 0;
            }
            StoreMsg::IncomesLoaded { ticket, incomes } => {
                if ticket >= self.incomes_ticket {
                    self.incomes_ticket = ticket;
                    self.incomes = incomes;
                    self.error = None;
                } else {
                    tracing::debug!(ticket, newest = self.incomes_ticket, "dropping stale income snapshot");
                }
            }
            StoreMsg::IncomeAdded(income) => {
                self.incomes.push(income);
                self.error = None;
            }
            StoreMsg::IncomeUpdated { id, income } => {
                match self.incomes.iter_mut().find(|i| i.id == id) {
                    Some(slot) => *slot = income,
                    None => tracing::warn!(%id, "updated income is not in the local list"),
                }
                self.error = None;
            }
            StoreMsg::IncomeDeleted(id) => {
                self.incomes.retain(|i| i.id != id);
                self.error = None;
            }
            StoreMsg::GoalsLoaded {
                ticket,
                goals,
                progress,
            } => {
                if ticket >= self.goals_ticket {
                    self.goals_ticket = ticket;
                    self.goals = goals;
                    self.goals_progress = progress;
                    self.error = None;
                } else {
                    tracing::debug!(ticket, newest = self.goals_ticket, "dropping stale goal snapshot");
                }
            }
            StoreMsg::GoalAdded(goal) => {
                self.goals.push(goal);
                self.error = None;
            }
            StoreMsg::GoalUpdated { id, goal } => {
                match self.goals.iter_mut().find(|g| g.id == id) {
                    Some(slot) => *slot = goal,
                    None => tracing::warn!(%id, "updated goal is not in the local list"),
                }
                self.error = None;
            }
            StoreMsg::GoalDeleted(id) => {
                self.goals.retain(|g| g.id != id);
                self.error = None;
            }
            StoreMsg::Failed(message) => self.error = Some(message),
        }
    }

    pub fn total_income(&self) -> f64 {
        stats::total_income(&self.incomes)
    }

    pub fn income_by_type(&self, kind: &str) -> Vec<&Income> {
        stats::income_by_type(&self.incomes, kind)
    }

    pub fn weekly_stats(&self) -> BucketTotals {
        stats::weekly_stats(&self.incomes)
    }

    pub fn monthly_stats(&self) -> BucketTotals {
        stats::monthly_stats(&self.incomes)
    }

    pub fn current_goal(&self) -> Option<&GoalProgress> {
        stats::current_goal(&self.goals, &self.goals_progress)
    }
}

impl Reducible for IncomeState {
    type Action = StoreMsg;

    fn reduce(self: Rc<Self>, action: Self::Action) -> Rc<Self> {
        let mut next = (*self).clone();
        next.apply(action);
        next.into()
    }
}

/// Sink for state transitions. The app hands [`Actions`] a Yew reducer
/// dispatcher; tests and non-UI callers use [`LocalStore`].
pub trait Dispatch {
    fn dispatch(&self, msg: StoreMsg);
}

impl Dispatch for UseReducerDispatcher<IncomeState> {
    fn dispatch(&self, msg: StoreMsg) {
        UseReducerDispatcher::dispatch(self, msg)
    }
}

#[derive(Debug, Clone, Default)]
pub struct LocalStore {
    state: Rc<RefCell<IncomeState>>,
}

impl LocalStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> IncomeState {
        self.state.borrow().clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&IncomeState) -> R) -> R {
        f(&self.state.borrow())
    }
}

impl Dispatch for LocalStore {
    fn dispatch(&self, msg: StoreMsg) {
        self.state.borrow_mut().apply(msg);
    }
}

/// Marks the store busy for as long as it lives.
struct Loading<'a, D: Dispatch> {
    dispatch: &'a D,
}

impl<'a, D: Dispatch> Loading<'a, D> {
    fn start(dispatch: &'a D) -> Self {
        dispatch.dispatch(StoreMsg::Started);
        Self { dispatch }
    }
}

impl<D: Dispatch> Drop for Loading<'_, D> {
    fn drop(&mut self) {
        self.dispatch.dispatch(StoreMsg::Settled);
    }
}

/// Runs the store's actions: calls the API, then dispatches what happened.
pub struct Actions<A, D> {
    api: A,
    dispatch: D,
    tickets: Cell<u64>,
}

impl<A: IncomeApi, D: Dispatch> Actions<A, D> {
    pub fn new(api: A, dispatch: D) -> Self {
        Self {
            api,
            dispatch,
            tickets: Cell::new(0),
        }
    }

    fn next_ticket(&self) -> u64 {
        let ticket = self.tickets.get() + 1;
        self.tickets.set(ticket);
        ticket
    }

    fn fail(&self, context: &'static str, error: ApiError, fallback: Option<&str>) -> ApiError {
        tracing::error!(error = %error, "{context}");
        let message = match fallback {
            Some(fallback) => error.message_or(fallback),
            None => error.to_string(),
        };
        self.dispatch.dispatch(StoreMsg::Failed(message));
        error
    }

    /// Replaces the income list. Failures are recorded in the state only.
    pub async fn fetch_incomes(&self) {
        let _loading = Loading::start(&self.dispatch);
        let ticket = self.next_ticket();
        match self.api.list_incomes().await {
            Ok(incomes) => self.dispatch.dispatch(StoreMsg::IncomesLoaded { ticket, incomes }),
            Err(error) => {
                self.fail("Failed to fetch incomes", error, None);
            }
        }
    }

    pub async fn add_income(&self, income: &IncomeInput) -> ApiResult<Income> {
        let _loading = Loading::start(&self.dispatch);
        match self.api.create_income(income).await {
            Ok(created) => {
                self.dispatch.dispatch(StoreMsg::IncomeAdded(created.clone()));
                Ok(created)
            }
            Err(error) => Err(self.fail("Failed to add income", error, None)),
        }
    }

    pub async fn update_income(&self, id: &RecordId, income: &IncomeInput) -> ApiResult<Income> {
        let _loading = Loading::start(&self.dispatch);
        match self.api.update_income(id, income).await {
            Ok(updated) => {
                self.dispatch.dispatch(StoreMsg::IncomeUpdated {
                    id: id.clone(),
                    income: updated.clone(),
                });
                Ok(updated)
            }
            Err(error) => Err(self.fail("Failed to update income", error, None)),
        }
    }

    pub async fn delete_income(&self, id: &RecordId) -> ApiResult<()> {
        let _loading = Loading::start(&self.dispatch);
        match self.api.delete_income(id).await {
            Ok(()) => {
                self.dispatch.dispatch(StoreMsg::IncomeDeleted(id.clone()));
                Ok(())
            }
            Err(error) => Err(self.fail("Failed to delete income", error, None)),
        }
    }

    /// Reloads goals and their server-side progress together.
    pub async fn fetch_goals(&self) -> ApiResult<()> {
        let _loading = Loading::start(&self.dispatch);
        let ticket = self.next_ticket();
        match self.load_goals().await {
            Ok((goals, progress)) => {
                self.dispatch.dispatch(StoreMsg::GoalsLoaded {
                    ticket,
                    goals,
                    progress,
                });
                Ok(())
            }
            Err(error) => Err(self.fail("Failed to fetch goals", error, Some(FETCH_GOALS_FAILED))),
        }
    }

    async fn load_goals(&self) -> ApiResult<(Vec<Goal>, Vec<GoalProgress>)> {
        let goals = self.api.list_goals().await?;
        let progress = self.api.list_goal_progress().await?;
        Ok((goals, progress))
    }

    pub async fn add_goal(&self, goal: &GoalInput) -> ApiResult<Goal> {
        let _loading = Loading::start(&self.dispatch);
        let created = match self.api.create_goal(goal).await {
            Ok(created) => created,
            Err(error) => return Err(self.fail("Failed to add goal", error, Some(ADD_GOAL_FAILED))),
        };
        self.dispatch.dispatch(StoreMsg::GoalAdded(created.clone()));
        self.resync_goals("Failed to add goal", ADD_GOAL_FAILED).await?;
        Ok(created)
    }

    pub async fn update_goal(&self, id: &RecordId, goal: &GoalInput) -> ApiResult<Goal> {
        let _loading = Loading::start(&self.dispatch);
        let updated = match self.api.update_goal(id, goal).await {
            Ok(updated) => updated,
            Err(error) => {
                return Err(self.fail("Failed to update goal", error, Some(UPDATE_GOAL_FAILED)))
            }
        };
        self.dispatch.dispatch(StoreMsg::GoalUpdated {
            id: id.clone(),
            goal: updated.clone(),
        });
        self.resync_goals("Failed to update goal", UPDATE_GOAL_FAILED).await?;
        Ok(updated)
    }

    pub async fn delete_goal(&self, id: &RecordId) -> ApiResult<()> {
        let _loading = Loading::start(&self.dispatch);
        if let Err(error) = self.api.delete_goal(id).await {
            return Err(self.fail("Failed to delete goal", error, Some(DELETE_GOAL_FAILED)));
        }
        self.dispatch.dispatch(StoreMsg::GoalDeleted(id.clone()));
        self.resync_goals("Failed to delete goal", DELETE_GOAL_FAILED).await
    }

    /// Progress is only ever computed server-side, so every goal mutation
    /// ends with a full reload.
    async fn resync_goals(&self, context: &'static str, fallback: &str) -> ApiResult<()> {
        self.fetch_goals()
            .await
            .map_err(|error| self.fail(context, error, Some(fallback)))
    }
}
