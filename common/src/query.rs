use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::task::Task;

pub type QueryId = String;
pub type AuthorId = String;

/* --------- Query lifecycle as reported by the backend --------- */

/// Status of a query. The backend owns the vocabulary, so anything we do not
/// know is kept verbatim in `Other` and written back unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum QueryStatus {
    Pending,
    Running,
    Completed,
    Killed,
    Other(String),
}

impl QueryStatus {
    pub fn as_str(&self) -> &str {
        match self {
            QueryStatus::Pending => "pending",
            QueryStatus::Running => "running",
            QueryStatus::Completed => "completed",
            QueryStatus::Killed => "killed",
            QueryStatus::Other(s) => s,
        }
    }

    /// Completed or killed: the backend will not touch the query again.
    pub fn is_final(&self) -> bool {
        matches!(self, QueryStatus::Completed | QueryStatus::Killed)
    }
}

impl From<String> for QueryStatus {
    fn from(s: String) -> Self {
        match s.as_str() {
            "pending" => QueryStatus::Pending,
            "running" => QueryStatus::Running,
            "completed" => QueryStatus::Completed,
            "killed" => QueryStatus::Killed,
            _ => QueryStatus::Other(s),
        }
    }
}

impl From<QueryStatus> for String {
    fn from(status: QueryStatus) -> Self {
        match status {
            QueryStatus::Other(s) => s,
            known => known.as_str().to_string(),
        }
    }
}

impl fmt::Display for QueryStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/* --------- Interpretation of the free text --------- */

/// One end of the interpreted time range.
///
/// The backend is loose about this field: it may send a bare year (`2003`),
/// an ISO date (`"2003-06-01"`), arbitrary text or any other JSON value.
/// Variant order matters for decoding, dates are tried before falling back to
/// text, and whatever is left is kept raw in `Other`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TimeBound {
    Year(i32),
    Date(NaiveDate),
    Text(String),
    Other(serde_json::Value),
}

impl fmt::Display for TimeBound {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TimeBound::Year(y) => write!(f, "{}", y),
            TimeBound::Date(d) => write!(f, "{}", d.format("%Y-%m-%d")),
            TimeBound::Text(t) => f.write_str(t),
            TimeBound::Other(v) => write!(f, "{}", v),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub place: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<TimeBound>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub to: Option<TimeBound>,
}

/* --------- Query --------- */

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Query {
    pub id: QueryId,
    pub name: String,
    pub author: AuthorId,
    pub status: QueryStatus,

    /// Filled in by the interpretation step, absent on some listings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<QueryDetails>,

    /// Processing steps, in backend order. Empty until the query is started.
    #[serde(default)]
    pub tasks: Vec<Task>,
}

impl Query {
    pub fn task(&self, task_id: &str) -> Option<&Task> {
        self.tasks.iter().find(|t| t.id == task_id)
    }
}

/// Keeps only the queries submitted by `author`, preserving order.
pub fn filter_by_author<'a>(queries: &'a [Query], author: &str) -> Vec<&'a Query> {
    queries.iter().filter(|q| q.author == author).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn query(id: &str, author: &str) -> Query {
        Query {
            id: id.to_string(),
            name: format!("query {id}"),
            author: author.to_string(),
            status: QueryStatus::Running,
            details: None,
            tasks: vec![],
        }
    }

    #[test]
    fn decodes_listing_entry_with_tasks() {
        let raw = json!({
            "id": "1",
            "name": "Tous les incendies entre 2003 et 2009",
            "author": "asedhafe654678ehh3526",
            "status": "running",
            "tasks": [
                {
                    "id": "1",
                    "type": "Image downloading",
                    "progress": 5,
                    "metadata": { "images": [{ "name": "example01.png" }, { "name": "example02.png" }] }
                },
                { "id": "2", "type": "Superposition", "progress": 15, "metadata": {} }
            ]
        });

        let q: Query = serde_json::from_value(raw).unwrap();
        assert_eq!(q.status, QueryStatus::Running);
        assert!(q.details.is_none());
        assert_eq!(q.tasks.len(), 2);
        assert_eq!(q.task("2").unwrap().kind, "Superposition");
        assert_eq!(
            q.tasks[0].metadata.images(),
            vec!["example01.png", "example02.png"]
        );
    }

    #[test]
    fn interpreted_query_without_tasks() {
        let raw = json!({
            "id": "7",
            "name": "Tous les incendies entre 2003 et 2009",
            "author": "4242",
            "status": "pending",
            "details": { "place": "France", "event": "incendie", "from": 2003, "to": "2009-12-31" }
        });

        let q: Query = serde_json::from_value(raw).unwrap();
        let details = q.details.unwrap();
        assert_eq!(details.place.as_deref(), Some("France"));
        assert_eq!(details.from, Some(TimeBound::Year(2003)));
        assert_eq!(
            details.to,
            Some(TimeBound::Date(NaiveDate::from_ymd_opt(2009, 12, 31).unwrap()))
        );
        assert!(q.tasks.is_empty());
    }

    #[test]
    fn time_bound_falls_back_to_text() {
        let b: TimeBound = serde_json::from_value(json!("summer 2010")).unwrap();
        assert_eq!(b, TimeBound::Text("summer 2010".into()));
        assert_eq!(serde_json::to_value(&b).unwrap(), json!("summer 2010"));
        assert_eq!(TimeBound::Year(2003).to_string(), "2003");
    }

    #[test]
    fn odd_time_bound_does_not_reject_the_listing() {
        let raw = json!([
            { "id": "1", "name": "a", "author": "x", "status": "running" },
            {
                "id": "2", "name": "b", "author": "y", "status": "pending",
                "details": { "from": 2003.5, "to": { "year": 2009 } }
            }
        ]);

        let list: Vec<Query> = serde_json::from_value(raw).unwrap();
        assert_eq!(list.len(), 2);
        let details = list[1].details.as_ref().unwrap();
        assert_eq!(details.from, Some(TimeBound::Other(json!(2003.5))));

        let to = details.to.clone().unwrap();
        assert_eq!(to.to_string(), r#"{"year":2009}"#);
        assert_eq!(serde_json::to_value(&to).unwrap(), json!({ "year": 2009 }));
    }

    #[test]
    fn unknown_status_is_preserved() {
        let s: QueryStatus = serde_json::from_value(json!("queued-for-gpu")).unwrap();
        assert_eq!(s, QueryStatus::Other("queued-for-gpu".into()));
        assert!(!s.is_final());
        assert_eq!(serde_json::to_value(&s).unwrap(), json!("queued-for-gpu"));
        assert_eq!(
            serde_json::to_value(QueryStatus::Killed).unwrap(),
            json!("killed")
        );
        assert!(QueryStatus::Completed.is_final());
    }

    #[test]
    fn filter_by_author_keeps_order() {
        let all = vec![query("1", "a"), query("2", "b"), query("3", "a")];
        let mine: Vec<&str> = filter_by_author(&all, "a")
            .into_iter()
            .map(|q| q.id.as_str())
            .collect();
        assert_eq!(mine, vec!["1", "3"]);
        assert!(filter_by_author(&all, "nobody").is_empty());
    }
}
