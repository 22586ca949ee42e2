use std::{env, error::Error, fs, path::PathBuf};

// The package inherits the workspace version, so cargo hands it over directly.
fn main() -> Result<(), Box<dyn Error>> {
    let version = env::var("CARGO_PKG_VERSION")?;
    let out = PathBuf::from(env::var_os("OUT_DIR").ok_or("OUT_DIR not set")?).join("version.rs");
    fs::write(out, format!("pub const VERSION: &str = {version:?};\n"))?;

    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
