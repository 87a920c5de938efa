// src/server/browser.rs

use std::process::Stdio;

use tokio::process::Command;
use tracing::{debug, warn};

fn opener(url: &str) -> Command {
    if cfg!(windows) {
        let mut c = Command::new("cmd");
        c.args(["/C", "start", "", url]);
        c
    } else if cfg!(target_os = "macos") {
        let mut c = Command::new("open");
        c.arg(url);
        c
    } else {
        let mut c = Command::new("xdg-open");
        c.arg(url);
        c
    }
}

/// Open `url` in the default browser. Failure is logged, never fatal.
pub fn open(url: &str) {
    let spawned = opener(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn();
    match spawned {
        Ok(_) => debug!(url = %url, "opened browser"),
        Err(e) => warn!(url = %url, error = %e, "could not open browser"),
    }
}
