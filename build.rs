fn main() {
    println!("cargo:rerun-if-env-changed=NB_SDK_LIB_DIR");

    // The vendor NBDevices library ships as a prebuilt static archive.
    // Only link it when the FFI-backed sensor driver is compiled in.
    if std::env::var_os("CARGO_FEATURE_NB_SDK").is_none() {
        return;
    }

    match std::env::var("NB_SDK_LIB_DIR") {
        Ok(dir) => {
            println!("cargo:rustc-link-search=native={dir}");
            println!("cargo:rustc-link-lib=static=NBDevices");
        }
        Err(_) => {
            println!("cargo:warning=nb-sdk enabled but NB_SDK_LIB_DIR is not set; link will fail");
        }
    }
}
