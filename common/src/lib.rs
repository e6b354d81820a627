pub mod query;
pub mod search;
pub mod task;

pub use query::*;
pub use search::*;
pub use task::*;
