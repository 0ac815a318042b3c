//! Prints the CRD manifests for every static IP controller resource.
//!
//! Usage: `cargo run --bin crdgen > config/crds.yaml`

use kube::CustomResourceExt;

fn main() {
    let crds = [
        crds::Machine::crd(),
        crds::MachineTemplate::crd(),
        crds::ControlPlane::crd(),
        crds::LoadBalancer::crd(),
        crds::IPPool::crd(),
        crds::IPClaim::crd(),
        crds::IPAddress::crd(),
    ];

    for crd in crds {
        match serde_yaml::to_string(&crd) {
            Ok(yaml) => {
                println!("---");
                print!("{yaml}");
            }
            Err(e) => {
                eprintln!("failed to serialize CRD: {e}");
                std::process::exit(1);
            }
        }
    }
}
