//! servo-runtime
//!
//! One activity task at a time: value → cache → last-value file → handler.
//! The task-polling loop that feeds `ActivityDispatcher::dispatch` lives
//! outside this workspace.

mod activity;
mod dispatcher;
mod wiring;

pub use activity::{ActivitySpec, ActivityTable};
pub use dispatcher::{ActivityDispatcher, Dispatch, HandlerFactory};
pub use wiring::{
    config_file_handler, dispatcher_from_config, mapping_settings, redis_factory,
    redis_settings,
};
