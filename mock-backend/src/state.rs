// mock-backend/src/state.rs

use common::{Query, QueryDetails, QueryStatus, Task, TaskMetadata, TimeBound};
use serde_json::{json, Value};
use std::sync::{Arc, Mutex};

#[derive(Clone)]
pub struct AppState {
    // listing order is insertion order
    pub queries: Arc<Mutex<Vec<MockQuery>>>,
    pub requests: Arc<Mutex<Vec<RecordedRequest>>>,
    pub next_id: Arc<Mutex<u64>>,
    // what /search answers, whatever the text
    pub interpretation: Arc<Mutex<QueryDetails>>,
    // tasks given to a query when it is started
    pub task_plan: Arc<Mutex<Vec<TaskPlan>>>,
}

impl AppState {
    pub fn new() -> Self {
        Self {
            queries: Arc::new(Mutex::new(Vec::new())),
            requests: Arc::new(Mutex::new(Vec::new())),
            next_id: Arc::new(Mutex::new(1)),
            interpretation: Arc::new(Mutex::new(default_interpretation())),
            task_plan: Arc::new(Mutex::new(default_task_plan())),
        }
    }

    /// Seeds the backend; new ids continue after the largest numeric one.
    pub fn with_queries(queries: Vec<Query>) -> Self {
        let state = Self::new();
        let next = queries
            .iter()
            .filter_map(|q| q.id.parse::<u64>().ok())
            .max()
            .map_or(1, |max| max + 1);
        *state.next_id.lock().unwrap() = next;
        *state.queries.lock().unwrap() = queries.into_iter().map(MockQuery::seeded).collect();
        state
    }

    pub fn set_interpretation(&self, details: QueryDetails) {
        *self.interpretation.lock().unwrap() = details;
    }

    pub fn set_task_plan(&self, plan: Vec<TaskPlan>) {
        *self.task_plan.lock().unwrap() = plan;
    }

    pub fn requests(&self) -> Vec<RecordedRequest> {
        self.requests.lock().unwrap().clone()
    }

    pub fn query(&self, id: &str) -> Option<Query> {
        self.queries
            .lock()
            .unwrap()
            .iter()
            .find(|q| q.query.id == id)
            .map(|q| q.query.clone())
    }

    pub(crate) fn record(&self, method: &str, path: String, body: Option<Value>) {
        self.requests.lock().unwrap().push(RecordedRequest {
            method: method.to_string(),
            path,
            body,
        });
    }

    pub(crate) fn allocate_id(&self) -> String {
        let mut next = self.next_id.lock().unwrap();
        let id = *next;
        *next += 1;
        id.to_string()
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub method: String,
    pub path: String,
    pub body: Option<Value>,
}

/// Scripted progress of one task: the value shown at each listing step.
#[derive(Debug, Clone)]
pub struct TaskPlan {
    pub kind: String,
    pub progress: Vec<i64>,
    pub metadata: TaskMetadata,
}

impl TaskPlan {
    pub fn new(kind: &str, progress: &[i64]) -> Self {
        Self {
            kind: kind.to_string(),
            progress: progress.to_vec(),
            metadata: TaskMetadata::default(),
        }
    }

    fn at(&self, step: usize) -> i64 {
        self.progress
            .get(step)
            .or_else(|| self.progress.last())
            .copied()
            .unwrap_or(100)
    }
}

/// Returned by /search until a test installs its own.
pub fn default_interpretation() -> QueryDetails {
    QueryDetails {
        place: Some("France".to_string()),
        event: Some("incendie".to_string()),
        from: Some(TimeBound::Year(2003)),
        to: Some(TimeBound::Year(2009)),
    }
}

pub fn default_task_plan() -> Vec<TaskPlan> {
    let mut download = TaskPlan::new("Image downloading", &[5, 15, 100]);
    if let Value::Object(map) =
        json!({ "images": [{ "name": "example01.png" }, { "name": "example02.png" }] })
    {
        download.metadata = TaskMetadata(map);
    }

    vec![download, TaskPlan::new("Superposition", &[0, 50, 100])]
}

#[derive(Debug, Clone)]
pub struct MockQuery {
    pub query: Query,
    pub step: usize,
    pub plan: Vec<TaskPlan>,
}

impl MockQuery {
    pub fn pending(query: Query) -> Self {
        Self {
            query,
            step: 0,
            plan: Vec::new(),
        }
    }

    /// Seeded queries keep their tasks frozen, there is no plan to replay.
    fn seeded(query: Query) -> Self {
        Self::pending(query)
    }

    pub fn start(&mut self, plan: &[TaskPlan]) {
        self.plan = plan.to_vec();
        self.step = 0;
        self.query.status = QueryStatus::Running;
        self.query.tasks = plan
            .iter()
            .enumerate()
            .map(|(i, p)| Task {
                id: (i + 1).to_string(),
                kind: p.kind.clone(),
                progress: p.at(0),
                metadata: p.metadata.clone(),
            })
            .collect();
    }

    /// One listing step: tasks move to the next scripted value and the query
    /// completes in the step where every task reaches its last value.
    pub fn advance(&mut self) {
        if self.query.status != QueryStatus::Running || self.plan.is_empty() {
            return;
        }

        for (task, plan) in self.query.tasks.iter_mut().zip(&self.plan) {
            task.progress = plan.at(self.step);
        }

        let steps = self.plan.iter().map(|p| p.progress.len()).max().unwrap_or(0);
        if self.step + 1 >= steps {
            self.query.status = QueryStatus::Completed;
        }
        self.step += 1;
    }
}
