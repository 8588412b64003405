// Links Intel Embree 4 when the `embree` feature is enabled.
//
// Windows: install via `vcpkg install embree[geometry-triangle,geometry-instance]:x64-windows`
// Linux/macOS: the library must be on the default linker search path or in EMBREE_DIR/lib.

fn main() {
    println!("cargo:rerun-if-changed=build.rs");
    println!("cargo:rerun-if-env-changed=EMBREE_DIR");

    if std::env::var_os("CARGO_FEATURE_EMBREE").is_none() {
        return;
    }

    println!("cargo:rustc-link-lib=embree4");

    if let Ok(dir) = std::env::var("EMBREE_DIR") {
        println!("cargo:rustc-link-search=native={}/lib", dir);
    } else if let Ok(vcpkg_root) = std::env::var("VCPKG_ROOT") {
        println!(
            "cargo:rustc-link-search=native={}\\installed\\x64-windows\\lib",
            vcpkg_root
        );
    }
}
