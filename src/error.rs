use std::{error::Error, fmt, rc::Rc};

use parse_display::Display;

use crate::{ActionCall, MiddlewareId};

/// Error returned by updaters, actions and middleware.
pub type BoxError = Box<dyn Error>;

/// Invalid setup, reported synchronously to the caller.
#[non_exhaustive]
#[derive(Display, Debug, Clone, PartialEq)]
pub enum ConfigurationError {
    #[display("selector must be a field name, a list of field names, a function or null, got {0}")]
    InvalidSelector(String),
    #[display("an asynchronous update cannot be applied synchronously")]
    AsyncUpdateInSync,
}

impl Error for ConfigurationError {}

/// Error surfaced through a store's exception channel.
#[non_exhaustive]
#[derive(Display, Debug)]
pub enum StoreError {
    #[display("{0}")]
    Configuration(ConfigurationError),
    #[display("update queue overflow: more than {limit} updates in one flush chain")]
    QueueOverflow { limit: usize },
    #[display("updater failed: {0}")]
    Updater(BoxError),
    #[display("failed to schedule flush: {0}")]
    Spawn(futures::task::SpawnError),
    #[display("unknown action `{0}`")]
    UnknownAction(Rc<str>),
}

impl Error for StoreError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            StoreError::Configuration(e) => Some(e),
            StoreError::Updater(e) => Some(&**e),
            StoreError::Spawn(e) => Some(e),
            _ => None,
        }
    }
}

impl From<ConfigurationError> for StoreError {
    fn from(e: ConfigurationError) -> Self {
        StoreError::Configuration(e)
    }
}

/// Report of a middleware that failed while dispatching an action.
#[derive(Debug)]
pub struct MiddlewareFailure {
    pub error: BoxError,
    pub middleware: MiddlewareId,
    pub call: ActionCall,
}

impl fmt::Display for MiddlewareFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "middleware {} failed during action `{}`: {}",
            self.middleware, self.call.name, self.error
        )
    }
}

impl Error for MiddlewareFailure {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        Some(&*self.error)
    }
}
