//! servo-schemas
//!
//! Shared vocabulary for the load-balancer servo:
//! - the reconciled data model (policies, load balancers, listeners)
//! - the wire snapshot shape and its classification into policy-only or
//!   load-balancer updates
//! - the error taxonomy every crate reports through
//! - the `Handler` capability trait implemented by every sink
//!
//! Pure types and pure conversion. No IO.

mod error;
mod handler;
mod snapshot;
mod types;

pub use error::{ErrorKind, ServoError};
pub use handler::{Handler, HandlerKind};
pub use snapshot::{
    classify, decode_descriptions, decode_snapshot, RawBackendInstance, RawBackendServer,
    RawConnectionSettings, RawDescriptions, RawEnabled, RawHealthCheck, RawListener,
    RawListenerDescription, RawLoadBalancer, RawLoadBalancerAttributes, RawPolicy,
    RawPolicyAttribute, Snapshot,
};
pub use types::*;
