//! Transient user-facing notices, the CLI's equivalent of a toast.

use std::fmt;
use tracing::{error, info};

use crate::error::ClientError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Component {
    QuerySender,
    Monitoring,
    Results,
}

impl Component {
    pub fn tag(&self) -> &'static str {
        match self {
            Component::QuerySender => "QUERY SENDER SERVICE",
            Component::Monitoring => "MONITORING SERVICE",
            Component::Results => "RESULTS SERVICE",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Info,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub component: Component,
    pub detail: String,
}

impl Notice {
    pub fn is_error(&self) -> bool {
        self.level == Level::Error
    }
}

/// Renders as `[ERROR] [<COMPONENT>] <detail>` or `[INFO] <detail>`.
impl fmt::Display for Notice {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.level {
            Level::Error => write!(f, "[ERROR] [{}] {}", self.component.tag(), self.detail),
            Level::Info => write!(f, "[INFO] {}", self.detail),
        }
    }
}

/// Logs a failed call and returns the notice to show.
pub fn report(component: Component, err: &ClientError) -> Notice {
    let notice = Notice {
        level: Level::Error,
        component,
        detail: err.to_string(),
    };
    error!("{}", notice);
    notice
}

pub fn inform(component: Component, detail: impl Into<String>) -> Notice {
    let notice = Notice {
        level: Level::Info,
        component,
        detail: detail.into(),
    };
    info!("{}", notice);
    notice
}
