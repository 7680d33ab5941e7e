//! scan-operator library target.
//!
//! Exposes the kube-backed store, controller wiring, probe router and
//! manifest generators for the binary and for integration tests.

pub mod controller;
pub mod kube_store;
pub mod manifests;
pub mod probes;
pub mod state;
