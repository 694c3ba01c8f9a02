use compound_types::{DNSEntry, DNSProvider};
use kube::CustomResourceExt;
use std::fs;

fn main() {
    let _ = fs::create_dir("../crds");
    fs::write(
        "../crds/dns.compound.io_dnsproviders.yaml",
        serde_yaml::to_string(&DNSProvider::crd()).unwrap(),
    )
    .unwrap();
    fs::write(
        "../crds/dns.compound.io_dnsentries.yaml",
        serde_yaml::to_string(&DNSEntry::crd()).unwrap(),
    )
    .unwrap();
}
