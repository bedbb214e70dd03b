//! etcd Backup Kubernetes Operator
//!
//! This operator drives one-shot etcd backups in Kubernetes. Each
//! `EtcdBackup` resource gets exactly one backup Pod, and the resource's
//! phase records the Pod's outcome.

pub mod adapters;
pub mod config;
pub mod controllers;
pub mod crd;
pub mod error;
pub mod metrics;
pub mod reconcilers;

pub use error::{Error, Result};
