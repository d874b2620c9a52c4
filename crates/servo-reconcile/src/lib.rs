//! servo-reconcile
//!
//! Policy registry and the reconciliation engine.
//!
//! Decisions:
//! - A load-balancer update that references an unregistered policy fails
//!   closed: no synthesis, no emission, no registry change
//! - Retain-only GC runs only after the synthesized config was emitted
//! - Resolve, synthesize, emit and GC run under one registry lock, so two
//!   engines sharing a registry never interleave a load-balancer update

mod engine;
mod registry;

pub use engine::{Outcome, ReconcileReport, ReconciliationEngine, SET_LOADBALANCER, SET_POLICY};
pub use registry::{PolicyRegistry, RegistryGuard, Resolution};
