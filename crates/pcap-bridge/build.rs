//! Build script for pcap-bridge
//!
//! Links the system libpcap. Set `PCAP_LIBDIR` to point at a non-standard
//! install location (for example a locally built libpcap).

use std::env;
use std::path::PathBuf;

fn main() {
    println!("cargo:rerun-if-env-changed=PCAP_LIBDIR");

    if let Ok(dir) = env::var("PCAP_LIBDIR") {
        let path = PathBuf::from(&dir);
        if path.is_dir() {
            println!("cargo:rustc-link-search=native={}", path.display());
        } else {
            println!(
                "cargo:warning=PCAP_LIBDIR={} is not a directory, using system search paths",
                dir
            );
        }
    }

    println!("cargo:rustc-link-lib=pcap");
}
