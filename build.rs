fn main() {
    // Keep `check-cfg` happy even when we skip `tauri_build::build()` (core-only unit tests).
    println!("cargo:rustc-check-cfg=cfg(desktop)");
    println!("cargo:rustc-check-cfg=cfg(mobile)");

    // `tauri_build` is only pulled in with the `app` feature. Core-only builds
    // (the default, and every test run) never touch the Tauri runtime stack.
    #[cfg(feature = "app")]
    tauri_build::build()
}
