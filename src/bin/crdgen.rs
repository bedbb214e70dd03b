//! CRD YAML Generator
//!
//! This binary generates the Kubernetes CRD manifest for the EtcdBackup
//! resource managed by the etcd-backup-operator.
//!
//! Usage: cargo run --bin crdgen > deploy/crds/etcdbackup.yaml

use etcd_backup_operator::crd::generate_crds;

fn main() -> anyhow::Result<()> {
    for crd in generate_crds()? {
        println!("---");
        print!("{}", crd);
    }
    Ok(())
}
