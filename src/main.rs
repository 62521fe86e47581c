//! Moonspec CLI
//!
//! Command-line front-end for the moonspec test engine. Output format and
//! the `--gtest_*` flags follow Google Test closely enough that IDE
//! test-explorer integrations built for Google Test can drive moonspec
//! unchanged.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::Context;
use clap::Parser;
use rustc_hash::{FxHashMap, FxHashSet};

use moonspec::{config, Runner};

#[derive(Parser)]
#[command(name = "moonspec", version)]
#[command(about = "Discovers and runs unit tests written in Lua")]
#[command(long_about = "\
Discovers and runs unit tests written in Lua.

Place a '.moonspec' file in the root folder of your project listing paths \
(one per line, relative to the file) to individual Lua test scripts, to \
directories containing Lua test scripts, or to further '.moonspec' files. \
Moonspec walks up from the search path, loads every configuration file it \
finds, discovers the tests the scripts register, and runs each one in its \
own fresh Lua interpreter.

The console output and the supported --gtest_* options mimic Google Test, \
so test-explorer tooling built against Google Test can list, filter, and \
run Lua tests through moonspec without modification.")]
struct Cli {
    /// Folder to start searching from; it, or one of its ancestors, should
    /// contain a '.moonspec' configuration file
    #[arg(long, default_value = ".")]
    path: PathBuf,

    /// List the names of all discovered tests instead of running them
    #[arg(long = "gtest_list_tests")]
    gtest_list_tests: bool,

    /// Colon-separated list of Suite.Test names; only the named tests run
    #[arg(long = "gtest_filter", value_name = "FILTER")]
    gtest_filter: Option<String>,

    /// 'xml:PATH' writes a Google Test compatible XML report to PATH
    #[arg(long = "gtest_output", value_name = "REPORT")]
    gtest_output: Option<String>,

    /// Accepted for Google Test tooling compatibility; ignored
    #[arg(long = "gtest_color", value_name = "WHEN")]
    gtest_color: Option<String>,

    /// Accepted for Google Test tooling compatibility; ignored
    #[arg(long = "gtest_also_run_disabled_tests")]
    gtest_also_run_disabled_tests: bool,

    /// Verbose logging (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    std::process::exit(app());
}

fn app() -> i32 {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    // Walk from the filesystem root down to the search path, loading every
    // configuration file found along the way.
    let mut runner = Runner::new();
    let search_root = cli.path.canonicalize().unwrap_or_else(|_| cli.path.clone());
    let ancestors: Vec<_> = search_root.ancestors().collect();
    for dir in ancestors.into_iter().rev() {
        let candidate = dir.join(config::CONFIG_FILE_NAME);
        if candidate.is_file() {
            runner.configure(&candidate, &mut |message: &str| eprintln!("{}", message));
        }
    }

    // Work out what is selected and how much of it there is.
    let mut selected: FxHashMap<String, FxHashSet<String>> = FxHashMap::default();
    let mut total_tests = 0;
    let mut total_suites = 0;
    match &cli.gtest_filter {
        None => {
            for suite_name in runner.suite_names() {
                total_suites += 1;
                total_tests += runner.test_names(suite_name).len();
            }
        }
        Some(filter) => {
            println!("Note: Google Test filter = {}", filter);
            for entry in filter.split(':') {
                total_suites += 1;
                if let Some((suite_name, test_name)) = entry.split_once('.') {
                    if selected
                        .entry(suite_name.to_owned())
                        .or_default()
                        .insert(test_name.to_owned())
                    {
                        total_tests += 1;
                    }
                }
            }
        }
    }

    if !cli.gtest_list_tests {
        println!(
            "[==========] Running {} test{} from {} test suite{}.",
            total_tests,
            plural(total_tests),
            total_suites,
            plural(total_suites)
        );
        println!("[----------] Global test environment set-up.");
    }

    let mut success = true;
    let mut passed = 0;
    let mut failed: Vec<String> = Vec::new();
    let run_start = Instant::now();
    let suite_names: Vec<String> = runner.suite_names().map(String::from).collect();
    for suite_name in &suite_names {
        let selected_for_suite = selected.get(suite_name);
        if !selected.is_empty() && selected_for_suite.is_none() {
            continue;
        }
        if cli.gtest_list_tests {
            println!("{}.", suite_name);
        } else if let Some(tests) = selected_for_suite {
            println!(
                "[----------] {} test{} from {}",
                tests.len(),
                plural(tests.len()),
                suite_name
            );
        }
        let suite_start = Instant::now();
        let test_names: Vec<String> = runner
            .test_names(suite_name)
            .into_iter()
            .map(String::from)
            .collect();
        for test_name in &test_names {
            if let Some(tests) = selected_for_suite {
                if !tests.contains(test_name) {
                    continue;
                }
            }
            if cli.gtest_list_tests {
                println!("  {}", test_name);
                continue;
            }

            println!("[ RUN      ] {}.{}", suite_name, test_name);
            let mut messages: Vec<String> = Vec::new();
            let test_start = Instant::now();
            let result = runner.execute(suite_name, test_name, &mut |message: &str| {
                messages.push(message.to_string())
            });
            let elapsed = test_start.elapsed().as_millis();
            if result.passed {
                passed += 1;
                println!("[       OK ] {}.{} ({} ms)", suite_name, test_name, elapsed);
            } else {
                failed.push(format!("{}.{}", suite_name, test_name));
                for line in &messages {
                    println!("{}", line);
                }
                println!("[  FAILED  ] {}.{} ({} ms)", suite_name, test_name, elapsed);
                success = false;
            }
        }
        if !cli.gtest_list_tests {
            if let Some(tests) = selected_for_suite {
                println!(
                    "[----------] {} test{} from {} ({} ms total)\n",
                    tests.len(),
                    plural(tests.len()),
                    suite_name,
                    suite_start.elapsed().as_millis()
                );
            }
        }
    }

    if !cli.gtest_list_tests {
        println!("[----------] Global test environment tear-down");
        println!(
            "[==========] {} test{} from {} test suite{} ran. ({} ms total)",
            total_tests,
            plural(total_tests),
            total_suites,
            plural(total_suites),
            run_start.elapsed().as_millis()
        );
        println!("[  PASSED  ] {} test{}.", passed, plural(passed));
    }
    if !failed.is_empty() {
        println!(
            "[  FAILED  ] {} test{}, listed below:",
            failed.len(),
            plural(failed.len())
        );
        for name in &failed {
            println!("[  FAILED  ] {}", name);
        }
        println!();
        println!(
            " {} FAILED TEST{}",
            failed.len(),
            if failed.len() == 1 { "" } else { "S" }
        );
    }

    if let Some(output) = &cli.gtest_output {
        if let Some(report_path) = output.strip_prefix("xml:") {
            if let Err(e) = write_report(&runner, report_path) {
                eprintln!("ERROR: {:#}", e);
            }
        }
    }

    if success {
        0
    } else {
        1
    }
}

fn write_report(runner: &Runner, report_path: &str) -> anyhow::Result<()> {
    let xml = runner
        .report()
        .to_xml()
        .context("rendering the XML report")?;
    std::fs::write(report_path, xml)
        .with_context(|| format!("writing the XML report to '{}'", report_path))?;
    Ok(())
}

fn plural(count: usize) -> &'static str {
    if count == 1 {
        ""
    } else {
        "s"
    }
}

fn setup_logging(verbosity: u8) {
    let default = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
