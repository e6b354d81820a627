use common::{Query, QueryStatus};

pub fn query(id: &str, author: &str, status: QueryStatus) -> Query {
    Query {
        id: id.to_string(),
        name: format!("query {id}"),
        author: author.to_string(),
        status,
        details: None,
        tasks: vec![],
    }
}
