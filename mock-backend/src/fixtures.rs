use common::{Query, QueryStatus, Task, TaskMetadata};
use serde_json::{json, Value};

fn images(names: &[&str]) -> TaskMetadata {
    let list: Vec<Value> = names.iter().map(|n| json!({ "name": n })).collect();
    let mut map = serde_json::Map::new();
    map.insert("images".to_string(), Value::Array(list));
    TaskMetadata(map)
}

fn task(id: &str, kind: &str, progress: i64, metadata: TaskMetadata) -> Task {
    Task {
        id: id.to_string(),
        kind: kind.to_string(),
        progress,
        metadata,
    }
}

/// Queries the demo backend starts with, two authors, all running.
pub fn demo_queries() -> Vec<Query> {
    vec![
        Query {
            id: "1".into(),
            name: "Tous les incendies entre 2003 et 2009".into(),
            author: "asedhafe654678ehh3526".into(),
            status: QueryStatus::Running,
            details: None,
            tasks: vec![
                task("1", "Image downloading", 5, images(&["example01.png", "example02.png"])),
                task("2", "Superposition", 15, TaskMetadata::default()),
            ],
        },
        Query {
            id: "2".into(),
            name: "Déforestation en Amazonie en 2011".into(),
            author: "wedsdfe654678ehhe3526".into(),
            status: QueryStatus::Running,
            details: None,
            tasks: vec![
                task("3", "Image downloading", 100, images(&["example09.png"])),
                task("4", "Region partitionning", 50, TaskMetadata::default()),
            ],
        },
        Query {
            id: "3".into(),
            name: "Toutes les innondations en France en 2010".into(),
            author: "asedhafe654678ehh3526".into(),
            status: QueryStatus::Running,
            details: None,
            tasks: vec![task("5", "Image downloading", 2, images(&["example19.png"]))],
        },
    ]
}
