mod config;
mod equality;
mod error;
mod event;
mod middleware;
mod registry;
mod runtime;
mod scheduler;
mod selector;
mod setters;
mod store;
mod subscriber;
mod subscription;
mod utils;
mod value;

pub use config::*;
pub use equality::*;
pub use error::*;
pub use event::*;
pub use middleware::*;
pub use registry::*;
pub use runtime::*;
pub use scheduler::*;
pub use selector::*;
pub use setters::*;
pub use store::*;
pub use subscriber::*;
pub use subscription::*;
pub use value::*;
