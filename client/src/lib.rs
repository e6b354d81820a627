pub mod api;
pub mod cli;
pub mod config;
pub mod error;
pub mod identity;
pub mod monitor;
pub mod notify;
pub mod render;
pub mod result;
pub mod search;

#[cfg(test)]
mod testing;

pub use api::{HttpBackend, QueryBackend};
pub use config::ClientConfig;
pub use error::{ClientError, ClientResult};
pub use identity::{IdentityStore, LocalStorage};
pub use monitor::{MonitoringState, MonitoringView, Poller};
pub use notify::{Component, Notice};
pub use result::{ResultState, ResultView};
pub use search::{Decision, Interpretation, Phase, QuerySender, SearchBar, SearchBarState};
