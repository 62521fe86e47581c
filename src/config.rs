//! Configuration file handling
//!
//! A `.moonspec` file names the scripts to discover, one entry per line.
//! Entries resolve relative to the configuration file itself and may
//! point at another configuration file, a directory, or a single script.
//! This module only turns configuration into a script list; reading and
//! running the scripts is the runner's job.

use std::fs;
use std::path::{Path, PathBuf};

use tracing::trace;

/// Name of the configuration file, both at the search root and nested
/// inside listed directories.
pub const CONFIG_FILE_NAME: &str = ".moonspec";

/// Extension identifying the scripts a directory scan picks up.
pub(crate) const SCRIPT_EXTENSION: &str = "lua";

/// Resolve a configuration file into the list of script files it selects,
/// in listing order. Unreadable files are reported through `sink`;
/// entries pointing at nothing are skipped silently.
pub fn collect_script_files(
    configuration_file: &Path,
    sink: &mut dyn FnMut(&str),
) -> Vec<PathBuf> {
    let mut scripts = Vec::new();
    collect_into(configuration_file, sink, &mut scripts);
    scripts
}

fn collect_into(configuration_file: &Path, sink: &mut dyn FnMut(&str), out: &mut Vec<PathBuf>) {
    let contents = match fs::read_to_string(configuration_file) {
        Ok(contents) => contents,
        Err(e) => {
            sink(&format!(
                "ERROR: Unable to read configuration file '{}': {}",
                configuration_file.display(),
                e
            ));
            return;
        }
    };
    let base = configuration_file.parent().unwrap_or_else(|| Path::new("."));

    for line in contents.lines() {
        let entry = line.trim();
        if entry.is_empty() {
            continue;
        }
        let path = if Path::new(entry).is_absolute() {
            PathBuf::from(entry)
        } else {
            base.join(entry)
        };
        if !path.exists() {
            trace!(entry = %path.display(), "configuration entry does not exist");
            continue;
        }
        if path.is_dir() {
            let nested = path.join(CONFIG_FILE_NAME);
            if nested.is_file() {
                // A nested configuration takes over; the directory itself
                // is not scanned.
                collect_into(&nested, sink, out);
            } else {
                scan_directory(&path, sink, out);
            }
        } else {
            out.push(path);
        }
    }
}

/// Pick up every script directly inside `dir`. The scan does not recurse.
fn scan_directory(dir: &Path, sink: &mut dyn FnMut(&str), out: &mut Vec<PathBuf>) {
    match fs::read_dir(dir) {
        Ok(entries) => {
            let mut found: Vec<PathBuf> = entries
                .filter_map(|entry| entry.ok())
                .map(|entry| entry.path())
                .filter(|path| {
                    path.is_file()
                        && path
                            .extension()
                            .is_some_and(|ext| ext == SCRIPT_EXTENSION)
                })
                .collect();
            found.sort();
            out.extend(found);
        }
        Err(e) => sink(&format!(
            "ERROR: Unable to list directory '{}': {}",
            dir.display(),
            e
        )),
    }
}
