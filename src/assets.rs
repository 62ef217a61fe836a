//! Resources appended to processed documents for browser display.
//!
//! The stylesheet is inlined into a `<style>` tag. The interaction script is
//! referenced by `src` and can be materialized with
//! [`Runner::write_resources`](crate::Runner::write_resources); jQuery is
//! referenced by name only and is expected next to the interaction script.

use std::fs;
use std::io;
use std::path::Path;

pub(crate) const STYLESHEET: &str = include_str!("assets/embedded.css");
pub(crate) const INTERACTION_JS: &str = include_str!("assets/main.js");

pub(crate) const JQUERY_FILE: &str = "jquery-3.7.1.min.js";
pub(crate) const INTERACTION_FILE: &str = "main.js";
pub(crate) const STYLESHEET_FILE: &str = "embedded.css";

/// Write the bundled stylesheet and interaction script under `dir`
/// (`dir/css/embedded.css`, `dir/js/main.js`).
pub(crate) fn write_resources(dir: &Path) -> io::Result<()> {
    let css = dir.join("css");
    fs::create_dir_all(&css)?;
    fs::write(css.join(STYLESHEET_FILE), STYLESHEET)?;

    let js = dir.join("js");
    fs::create_dir_all(&js)?;
    fs::write(js.join(INTERACTION_FILE), INTERACTION_JS)?;
    Ok(())
}
