use income_tracker_frontend::models::timestamp;
use income_tracker_frontend::{
    Actions, ApiError, ApiResult, Goal, GoalInput, GoalProgress, IncomeApi, Income, IncomeInput,
    LocalStore, RecordId,
};
use serde_json::{json, Map, Value};
use std::cell::{Cell, RefCell};
use std::collections::{HashSet, VecDeque};
use std::rc::Rc;
use tokio::sync::oneshot;

/// In-memory stand-in for the income API. Remembers every call and what the
/// store's `loading` flag was while the call was outstanding.
#[derive(Default)]
struct Server {
    store: LocalStore,
    incomes: RefCell<Vec<Income>>,
    goals: RefCell<Vec<Goal>>,
    next_id: Cell<u32>,
    failing: RefCell<HashSet<&'static str>>,
    failure: RefCell<Option<ApiError>>,
    calls: RefCell<Vec<&'static str>>,
    loading_during_calls: RefCell<Vec<bool>>,
}

#[derive(Clone)]
struct MockApi(Rc<Server>);

impl MockApi {
    fn call(&self, name: &'static str) -> ApiResult<()> {
        let server = &self.0;
        server.calls.borrow_mut().push(name);
        let loading = server.store.with(|s| s.loading);
        server.loading_during_calls.borrow_mut().push(loading);
        if server.failing.borrow().contains(name) {
            let error = server
                .failure
                .borrow()
                .clone()
                .unwrap_or_else(|| ApiError::Status {
                    status: 500,
                    body: String::new(),
                });
            return Err(error);
        }
        Ok(())
    }

    fn fresh_id(&self, prefix: &str) -> RecordId {
        let n = self.0.next_id.get() + 1;
        self.0.next_id.set(n);
        RecordId::new(format!("{prefix}-{n}"))
    }

    fn to_income(id: RecordId, input: &IncomeInput) -> Income {
        Income {
            id,
            date: input.date,
            r#type: input.r#type.clone(),
            amount: input.amount,
            description: input.description.clone(),
        }
    }

    fn to_goal(id: &RecordId, input: &GoalInput) -> Goal {
        let mut body = input.as_object().cloned().unwrap_or_default();
        body.insert("id".to_string(), Value::String(id.to_string()));
        serde_json::from_value(Value::Object(body)).unwrap()
    }
}

impl IncomeApi for MockApi {
    async fn list_incomes(&self) -> ApiResult<Vec<Income>> {
        self.call("list_incomes")?;
        Ok(self.0.incomes.borrow().clone())
    }

    async fn create_income(&self, income: &IncomeInput) -> ApiResult<Income> {
        self.call("create_income")?;
        let created = Self::to_income(self.fresh_id("inc"), income);
        self.0.incomes.borrow_mut().push(created.clone());
        Ok(created)
    }

    async fn update_income(&self, id: &RecordId, income: &IncomeInput) -> ApiResult<Income> {
        self.call("update_income")?;
        Ok(Self::to_income(id.clone(), income))
    }

    async fn delete_income(&self, id: &RecordId) -> ApiResult<()> {
        self.call("delete_income")?;
        self.0.incomes.borrow_mut().retain(|i| &i.id != id);
        Ok(())
    }

    async fn list_goals(&self) -> ApiResult<Vec<Goal>> {
        self.call("list_goals")?;
        Ok(self.0.goals.borrow().clone())
    }

    async fn list_goal_progress(&self) -> ApiResult<Vec<GoalProgress>> {
        self.call("list_goal_progress")?;
        Ok(self
            .0
            .goals
            .borrow()
            .iter()
            .map(|goal| {
                let mut metrics = Map::new();
                metrics.insert("progress".to_string(), json!(0.5));
                GoalProgress {
                    goal: goal.clone(),
                    metrics,
                }
            })
            .collect())
    }

    async fn create_goal(&self, goal: &GoalInput) -> ApiResult<Goal> {
        self.call("create_goal")?;
        let created = Self::to_goal(&self.fresh_id("goal"), goal);
        self.0.goals.borrow_mut().push(created.clone());
        Ok(created)
    }

    async fn update_goal(&self, id: &RecordId, goal: &GoalInput) -> ApiResult<Goal> {
        self.call("update_goal")?;
        let updated = Self::to_goal(id, goal);
        if let Some(slot) = self.0.goals.borrow_mut().iter_mut().find(|g| &g.id == id) {
            *slot = updated.clone();
        }
        Ok(updated)
    }

    async fn delete_goal(&self, id: &RecordId) -> ApiResult<()> {
        self.call("delete_goal")?;
        self.0.goals.borrow_mut().retain(|g| &g.id != id);
        Ok(())
    }
}

fn setup() -> (Rc<Server>, Actions<MockApi, LocalStore>) {
    let server = Rc::new(Server::default());
    let actions = Actions::new(MockApi(server.clone()), server.store.clone());
    (server, actions)
}

fn input(kind: &str, amount: f64, date: &str) -> IncomeInput {
    IncomeInput {
        date: timestamp::parse(date).unwrap(),
        r#type: kind.to_string(),
        amount,
        description: String::new(),
    }
}

fn record(id: &str, amount: f64) -> Income {
    Income {
        id: RecordId::new(id),
        date: timestamp::parse("2024-03-15").unwrap(),
        r#type: "salary".to_string(),
        amount,
        description: String::new(),
    }
}

fn seed_income(server: &Server, id: &str, amount: f64) {
    server.incomes.borrow_mut().push(record(id, amount));
}

fn fail(server: &Server, call: &'static str, error: Option<ApiError>) {
    server.failing.borrow_mut().insert(call);
    *server.failure.borrow_mut() = error;
}

#[tokio::test]
async fn fetch_incomes_replaces_the_list() {
    let (server, actions) = setup();
    seed_income(&server, "a", 10.0);
    seed_income(&server, "b", 5.0);

    actions.fetch_incomes().await;

    let state = server.store.snapshot();
    assert_eq!(state.incomes.len(), 2);
    assert_eq!(state.total_income(), 15.0);
    assert_eq!(state.error, None);
    assert!(!state.loading);
    assert_eq!(*server.loading_during_calls.borrow(), vec![true]);
}

#[tokio::test]
async fn fetch_incomes_failure_is_recorded_not_raised() {
    let (server, actions) = setup();
    fail(&server, "list_incomes", None);

    actions.fetch_incomes().await;

    let state = server.store.snapshot();
    assert_eq!(
        state.error.as_deref(),
        Some("Request failed with status code 500")
    );
    assert!(!state.loading);
    assert!(state.incomes.is_empty());
}

#[tokio::test]
async fn add_income_appends_returned_record() {
    let (server, actions) = setup();
    seed_income(&server, "a", 10.0);
    actions.fetch_incomes().await;

    let created = actions
        .add_income(&input("thesis", 300.0, "2024-04-02"))
        .await
        .unwrap();

    let state = server.store.snapshot();
    assert_eq!(state.incomes.last(), Some(&created));
    assert_eq!(state.incomes.len(), 2);
    assert_eq!(state.monthly_stats()["2024-04"], 300.0);
    assert!(!state.loading);
}

#[tokio::test]
async fn add_income_failure_leaves_list_and_propagates() {
    let (server, actions) = setup();
    seed_income(&server, "a", 10.0);
    actions.fetch_incomes().await;
    fail(
        &server,
        "create_income",
        Some(ApiError::Transport("connection refused".to_string())),
    );

    let result = actions.add_income(&input("salary", 1.0, "2024-04-02")).await;

    assert_eq!(
        result,
        Err(ApiError::Transport("connection refused".to_string()))
    );
    let state = server.store.snapshot();
    assert_eq!(state.incomes.len(), 1);
    assert_eq!(
        state.error.as_deref(),
        Some("Network Error: connection refused")
    );
    assert!(!state.loading);
}

#[tokio::test]
async fn update_income_with_unknown_id_still_calls_server() {
    let (server, actions) = setup();
    seed_income(&server, "a", 10.0);
    seed_income(&server, "b", 20.0);
    actions.fetch_incomes().await;
    let before = server.store.snapshot().incomes;

    let updated = actions
        .update_income(&RecordId::new("ghost"), &input("other", 99.0, "2024-05-01"))
        .await
        .unwrap();

    assert_eq!(updated.id.as_str(), "ghost");
    assert_eq!(server.store.snapshot().incomes, before);
    assert!(server.calls.borrow().contains(&"update_income"));
}

#[tokio::test]
async fn update_income_patches_matching_record() {
    let (server, actions) = setup();
    seed_income(&server, "a", 10.0);
    seed_income(&server, "b", 20.0);
    actions.fetch_incomes().await;

    actions
        .update_income(&RecordId::new("a"), &input("subsidy", 11.0, "2024-03-15"))
        .await
        .unwrap();

    let state = server.store.snapshot();
    assert_eq!(state.incomes[0].r#type, "subsidy");
    assert_eq!(state.incomes[0].amount, 11.0);
    assert_eq!(state.incomes[1].id.as_str(), "b");
    assert_eq!(state.income_by_type("subsidy").len(), 1);
}

#[tokio::test]
async fn update_income_failure_leaves_list_and_propagates() {
    let (server, actions) = setup();
    seed_income(&server, "a", 10.0);
    actions.fetch_incomes().await;
    let before = server.store.snapshot().incomes;
    fail(&server, "update_income", None);

    let result = actions
        .update_income(&RecordId::new("a"), &input("subsidy", 11.0, "2024-03-15"))
        .await;

    assert_eq!(result.unwrap_err().status(), Some(500));
    let state = server.store.snapshot();
    assert_eq!(state.incomes, before);
    assert_eq!(
        state.error.as_deref(),
        Some("Request failed with status code 500")
    );
    assert!(!state.loading);
}

#[tokio::test]
async fn delete_income_removes_locally() {
    let (server, actions) = setup();
    seed_income(&server, "a", 10.0);
    seed_income(&server, "b", 20.0);
    actions.fetch_incomes().await;

    actions.delete_income(&RecordId::new("a")).await.unwrap();

    let state = server.store.snapshot();
    assert_eq!(state.incomes.len(), 1);
    assert_eq!(state.incomes[0].id.as_str(), "b");
}

#[tokio::test]
async fn delete_income_failure_propagates() {
    let (server, actions) = setup();
    seed_income(&server, "a", 10.0);
    actions.fetch_incomes().await;
    fail(
        &server,
        "delete_income",
        Some(ApiError::Status {
            status: 404,
            body: "{\"detail\":\"Income not found\"}".to_string(),
        }),
    );

    let result = actions.delete_income(&RecordId::new("a")).await;

    assert_eq!(result.unwrap_err().status(), Some(404));
    let state = server.store.snapshot();
    assert_eq!(state.incomes.len(), 1);
    assert_eq!(
        state.error.as_deref(),
        Some("Request failed with status code 404")
    );
    assert!(!state.loading);
}

#[tokio::test]
async fn add_goal_resyncs_goals_and_progress() {
    let (server, actions) = setup();

    let first = actions
        .add_goal(&json!({ "title": "laptop", "end_date": "2024-01-01" }))
        .await
        .unwrap();
    let second = actions
        .add_goal(&json!({ "title": "trip", "end_date": "2024-06-01" }))
        .await
        .unwrap();

    assert_eq!(
        *server.calls.borrow(),
        vec![
            "create_goal",
            "list_goals",
            "list_goal_progress",
            "create_goal",
            "list_goals",
            "list_goal_progress",
        ]
    );
    let state = server.store.snapshot();
    assert_eq!(state.goals, vec![first, second.clone()]);
    assert_eq!(state.goals_progress.len(), 2);
    assert_eq!(state.current_goal().map(|p| &p.goal), Some(&second));
    assert!(!state.loading);
    assert!(server.loading_during_calls.borrow().iter().all(|l| *l));
}

#[tokio::test]
async fn update_and_delete_goal_resync() {
    let (server, actions) = setup();
    let goal = actions
        .add_goal(&json!({ "title": "laptop", "end_date": "2024-01-01" }))
        .await
        .unwrap();

    let updated = actions
        .update_goal(&goal.id, &json!({ "title": "desktop", "end_date": "2024-02-01" }))
        .await
        .unwrap();
    let state = server.store.snapshot();
    assert_eq!(state.goals, vec![updated.clone()]);
    assert_eq!(state.goals[0].field("title"), Some(&json!("desktop")));

    actions.delete_goal(&goal.id).await.unwrap();
    let state = server.store.snapshot();
    assert!(state.goals.is_empty());
    assert!(state.goals_progress.is_empty());
    assert!(state.current_goal().is_none());
    assert_eq!(server.calls.borrow().last(), Some(&"list_goal_progress"));
}

#[tokio::test]
async fn goal_failure_without_detail_uses_fixed_message() {
    let (server, actions) = setup();
    fail(&server, "create_goal", Some(ApiError::Transport(String::new())));

    let result = actions.add_goal(&json!({ "end_date": "2024-01-01" })).await;

    assert!(result.is_err());
    let state = server.store.snapshot();
    assert_eq!(state.error.as_deref(), Some("添加目标失败"));
    assert!(state.goals.is_empty());
    assert!(!state.loading);
    assert!(!server.calls.borrow().contains(&"list_goals"));
}

#[tokio::test]
async fn update_goal_failure_skips_resync() {
    let (server, actions) = setup();
    let goal = actions
        .add_goal(&json!({ "title": "laptop", "end_date": "2024-01-01" }))
        .await
        .unwrap();
    server.calls.borrow_mut().clear();
    fail(&server, "update_goal", Some(ApiError::Transport(String::new())));

    let result = actions
        .update_goal(&goal.id, &json!({ "title": "desktop", "end_date": "2024-02-01" }))
        .await;

    assert_eq!(result, Err(ApiError::Transport(String::new())));
    let state = server.store.snapshot();
    assert_eq!(state.error.as_deref(), Some("更新目标失败"));
    assert_eq!(state.goals, vec![goal]);
    assert!(!state.loading);
    assert_eq!(*server.calls.borrow(), vec!["update_goal"]);
}

#[tokio::test]
async fn delete_goal_failure_keeps_goal() {
    let (server, actions) = setup();
    let goal = actions
        .add_goal(&json!({ "title": "laptop", "end_date": "2024-01-01" }))
        .await
        .unwrap();
    fail(&server, "delete_goal", Some(ApiError::Transport(String::new())));

    let result = actions.delete_goal(&goal.id).await;

    assert!(result.is_err());
    let state = server.store.snapshot();
    assert_eq!(state.error.as_deref(), Some("删除目标失败"));
    assert_eq!(state.goals, vec![goal]);
    assert_eq!(state.goals_progress.len(), 1);
    assert!(!state.loading);
}

#[tokio::test]
async fn failed_resync_after_goal_mutation_propagates() {
    let (server, actions) = setup();
    fail(&server, "list_goal_progress", None);

    let result = actions.add_goal(&json!({ "end_date": "2024-01-01" })).await;

    assert_eq!(result.unwrap_err().status(), Some(500));
    let state = server.store.snapshot();
    // the optimistic append survives; only the resync failed
    assert_eq!(state.goals.len(), 1);
    assert_eq!(
        state.error.as_deref(),
        Some("Request failed with status code 500")
    );
    assert!(!state.loading);
}

#[tokio::test]
async fn fetch_goals_failure_propagates() {
    let (server, actions) = setup();
    fail(&server, "list_goals", Some(ApiError::Decode(String::new())));

    let result = actions.fetch_goals().await;

    assert_eq!(result, Err(ApiError::Decode(String::new())));
    assert_eq!(
        server.store.snapshot().error.as_deref(),
        Some("获取目标失败")
    );
    assert!(!server.calls.borrow().contains(&"list_goal_progress"));
}

#[tokio::test]
async fn success_after_failure_clears_error() {
    let (server, actions) = setup();
    fail(&server, "list_incomes", None);
    actions.fetch_incomes().await;
    assert!(server.store.snapshot().error.is_some());

    server.failing.borrow_mut().clear();
    actions.fetch_incomes().await;
    assert_eq!(server.store.snapshot().error, None);
}

/// Income API whose list calls wait until the test releases them, so
/// overlapping fetches can be finished in any order.
#[derive(Default)]
struct Gates {
    store: LocalStore,
    incomes: RefCell<VecDeque<oneshot::Receiver<Vec<Income>>>>,
    goals: RefCell<VecDeque<oneshot::Receiver<Vec<Goal>>>>,
}

#[derive(Clone)]
struct GatedApi(Rc<Gates>);

impl GatedApi {
    async fn wait<T>(queue: &RefCell<VecDeque<oneshot::Receiver<T>>>) -> ApiResult<T> {
        let gate = queue
            .borrow_mut()
            .pop_front()
            .ok_or_else(|| ApiError::Transport("no gate left".to_string()))?;
        gate.await.map_err(|err| ApiError::Transport(err.to_string()))
    }

    fn unused<T>() -> ApiResult<T> {
        Err(ApiError::Transport("not served here".to_string()))
    }
}

impl IncomeApi for GatedApi {
    async fn list_incomes(&self) -> ApiResult<Vec<Income>> {
        Self::wait(&self.0.incomes).await
    }

    async fn create_income(&self, _income: &IncomeInput) -> ApiResult<Income> {
        Self::unused()
    }

    async fn update_income(&self, _id: &RecordId, _income: &IncomeInput) -> ApiResult<Income> {
        Self::unused()
    }

    async fn delete_income(&self, _id: &RecordId) -> ApiResult<()> {
        Self::unused()
    }

    async fn list_goals(&self) -> ApiResult<Vec<Goal>> {
        Self::wait(&self.0.goals).await
    }

    async fn list_goal_progress(&self) -> ApiResult<Vec<GoalProgress>> {
        Ok(Vec::new())
    }

    async fn create_goal(&self, _goal: &GoalInput) -> ApiResult<Goal> {
        Self::unused()
    }

    async fn update_goal(&self, _id: &RecordId, _goal: &GoalInput) -> ApiResult<Goal> {
        Self::unused()
    }

    async fn delete_goal(&self, _id: &RecordId) -> ApiResult<()> {
        Self::unused()
    }
}

fn gated_setup() -> (Rc<Gates>, Actions<GatedApi, LocalStore>) {
    let gates = Rc::new(Gates::default());
    let actions = Actions::new(GatedApi(gates.clone()), gates.store.clone());
    (gates, actions)
}

fn goal_record(id: &str) -> Goal {
    serde_json::from_value(json!({ "id": id, "end_date": "2024-06-01" })).unwrap()
}

#[tokio::test]
async fn later_income_fetch_wins_when_earlier_one_finishes_last() {
    let (gates, actions) = gated_setup();
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();
    gates.incomes.borrow_mut().extend([first_rx, second_rx]);
    let first = vec![record("old", 1.0)];
    let second = vec![record("new", 2.0), record("newer", 3.0)];

    tokio::join!(actions.fetch_incomes(), actions.fetch_incomes(), async {
        second_tx.send(second.clone()).unwrap();
        while gates.store.with(|s| s.incomes != second) {
            tokio::task::yield_now().await;
        }
        assert!(gates.store.with(|s| s.loading));

        first_tx.send(first.clone()).unwrap();
    });

    let state = gates.store.snapshot();
    assert_eq!(state.incomes, second);
    assert_eq!(state.error, None);
    assert!(!state.loading);
}

#[tokio::test]
async fn later_goal_fetch_wins_when_earlier_one_finishes_last() {
    let (gates, actions) = gated_setup();
    let (first_tx, first_rx) = oneshot::channel();
    let (second_tx, second_rx) = oneshot::channel();
    gates.goals.borrow_mut().extend([first_rx, second_rx]);
    let second = vec![goal_record("fresh")];

    let (first_result, second_result, ()) =
        tokio::join!(actions.fetch_goals(), actions.fetch_goals(), async {
            second_tx.send(second.clone()).unwrap();
            while gates.store.with(|s| s.goals != second) {
                tokio::task::yield_now().await;
            }
            assert!(gates.store.with(|s| s.loading));

            first_tx.send(vec![goal_record("stale")]).unwrap();
        });

    assert_eq!(first_result, Ok(()));
    assert_eq!(second_result, Ok(()));
    let state = gates.store.snapshot();
    assert_eq!(state.goals, second);
    assert!(!state.loading);
}
