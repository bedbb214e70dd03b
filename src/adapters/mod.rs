//! Adapters between EtcdBackup resources and the Kubernetes API

mod control_plane;
mod pod_template;

pub use control_plane::*;
pub use pod_template::*;
