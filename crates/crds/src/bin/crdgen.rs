//! Prints every CRD manifest as multi-document YAML.
//!
//! ```text
//! cargo run -p crds --bin crdgen > config/crds.yaml
//! ```

use crds::{CheckIn, ConfigDeployment, LongLivingPod};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let manifests = [CheckIn::crd(), LongLivingPod::crd(), ConfigDeployment::crd()];

    for crd in &manifests {
        println!("---");
        print!("{}", serde_yaml::to_string(crd)?);
    }

    Ok(())
}
