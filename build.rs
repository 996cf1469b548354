// build.rs

use chrono::Utc;
use std::env;
use std::fs;
use std::path::Path;

/// Writes `BUILD_DATE` into `$OUT_DIR/build_info.rs` for the start-up banner.
fn main() -> Result<(), Box<dyn std::error::Error>> {
    let out_dir = env::var("OUT_DIR")?;
    let dest_path = Path::new(&out_dir).join("build_info.rs");

    let build_date = Utc::now().format("%Y-%m-%d %H:%M:%S UTC");
    fs::write(&dest_path, format!("pub const BUILD_DATE: &str = \"{build_date}\";\n"))?;

    // only rerun when this script changes, the date is refreshed on real rebuilds
    println!("cargo:rerun-if-changed=build.rs");
    Ok(())
}
