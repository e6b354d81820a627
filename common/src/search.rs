use serde::{Deserialize, Serialize};

use crate::query::AuthorId;

/// Body of `POST /search`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SearchRequest {
    /// Raw natural language text typed by the user.
    pub query: String,
    pub author: AuthorId,
}
