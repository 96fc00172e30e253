pub mod config;
pub mod generator;
pub mod plugin;
pub mod scanner;
pub mod selector;
pub mod variant;

pub use plugin::{SelectorTransform, UiStatePlugin, VariantFamily, VariantHost};
pub use selector::{build, escape_class_name, Selector};
pub use variant::{parse, ParseFailure, Relation, VariantDescriptor};

use globset::GlobSet;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::mpsc::channel;
use std::time::{Duration, Instant};
use tracing::{error, info};

const DEFAULT_POLL_INTERVAL_MS: u64 = 500;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Scan {
        inputs: Vec<String>,
        ignore: Vec<String>,
    },
    Build {
        inputs: Vec<String>,
        out: Option<String>,
        minify: bool,
        config: Option<String>,
        ignore: Vec<String>,
    },
    Watch {
        inputs: Vec<String>,
        out: Option<String>,
        minify: bool,
        config: Option<String>,
        ignore: Vec<String>,
        poll: bool,
        poll_interval_ms: u64,
    },
    Help,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CliError {
    pub message: String,
}

impl From<scanner::ScanError> for CliError {
    fn from(err: scanner::ScanError) -> Self {
        Self {
            message: err.message,
        }
    }
}

impl From<config::ConfigError> for CliError {
    fn from(err: config::ConfigError) -> Self {
        Self {
            message: err.message,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct BuildOptions {
    inputs: Vec<String>,
    out: Option<String>,
    minify: bool,
    config: Option<String>,
    ignore: Vec<String>,
}

pub fn run(command: Command) -> Result<(), CliError> {
    match command {
        Command::Scan { inputs, ignore } => run_scan(inputs, ignore),
        Command::Build {
            inputs,
            out,
            minify,
            config,
            ignore,
        } => run_build(&BuildOptions {
            inputs,
            out,
            minify,
            config,
            ignore,
        })
        .map(|_| ()),
        Command::Watch {
            inputs,
            out,
            minify,
            config,
            ignore,
            poll,
            poll_interval_ms,
        } => run_watch(
            BuildOptions {
                inputs,
                out,
                minify,
                config,
                ignore,
            },
            poll,
            poll_interval_ms,
        ),
        Command::Help => {
            print_help();
            Ok(())
        }
    }
}

pub fn run_from_env() -> Result<(), CliError> {
    let command = parse_args(env::args().skip(1))?;
    run(command)
}

pub fn parse_args<I>(args: I) -> Result<Command, CliError>
where
    I: IntoIterator<Item = String>,
{
    let mut iter = args.into_iter();
    let Some(cmd) = iter.next() else {
        return Ok(Command::Help);
    };

    match cmd.as_str() {
        "scan" => parse_scan_args(iter.collect()),
        "build" => parse_build_args(iter.collect()),
        "watch" => parse_watch_args(iter.collect()),
        "-h" | "--help" | "help" => Ok(Command::Help),
        _ => Err(CliError {
            message: format!("unknown command: {}", cmd),
        }),
    }
}

fn parse_scan_args(args: Vec<String>) -> Result<Command, CliError> {
    let mut inputs = Vec::new();
    let mut ignore = Vec::new();
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--ignore" | "-I" => {
                ignore.push(flag_value(&args, &mut idx, "scan", "--ignore")?);
            }
            value if value.starts_with('-') => {
                return Err(CliError {
                    message: format!("unknown scan flag: {}", value),
                });
            }
            value => inputs.push(value.to_string()),
        }
        idx += 1;
    }

    if inputs.is_empty() {
        return Err(CliError {
            message: "scan requires at least one input glob".to_string(),
        });
    }

    Ok(Command::Scan { inputs, ignore })
}

fn parse_build_args(args: Vec<String>) -> Result<Command, CliError> {
    let (options, rest) = parse_build_flags(args, "build")?;
    if let Some(flag) = rest.first() {
        return Err(CliError {
            message: format!("unknown build flag: {}", flag),
        });
    }

    Ok(Command::Build {
        inputs: options.inputs,
        out: options.out,
        minify: options.minify,
        config: options.config,
        ignore: options.ignore,
    })
}

fn parse_watch_args(args: Vec<String>) -> Result<Command, CliError> {
    let (options, rest) = parse_build_flags(args, "watch")?;
    let mut poll = false;
    let mut poll_interval_ms = DEFAULT_POLL_INTERVAL_MS;
    let mut idx = 0;

    while idx < rest.len() {
        match rest[idx].as_str() {
            "--poll" => poll = true,
            "--poll-interval" => {
                let value = flag_value(&rest, &mut idx, "watch", "--poll-interval")?;
                poll_interval_ms = parse_u64_arg(&value, "--poll-interval")?;
            }
            value => {
                return Err(CliError {
                    message: format!("unknown watch flag: {}", value),
                });
            }
        }
        idx += 1;
    }

    Ok(Command::Watch {
        inputs: options.inputs,
        out: options.out,
        minify: options.minify,
        config: options.config,
        ignore: options.ignore,
        poll,
        poll_interval_ms,
    })
}

/// Parses flags shared by `build` and `watch`; unrecognized flags (with
/// their values) are handed back in order.
fn parse_build_flags(
    args: Vec<String>,
    command: &str,
) -> Result<(BuildOptions, Vec<String>), CliError> {
    let mut options = BuildOptions {
        inputs: Vec::new(),
        out: None,
        minify: false,
        config: None,
        ignore: Vec::new(),
    };
    let mut rest = Vec::new();
    let mut idx = 0;

    while idx < args.len() {
        match args[idx].as_str() {
            "--out" | "--output" | "-o" => {
                options.out = Some(flag_value(&args, &mut idx, command, "--output")?);
            }
            "--config" | "-c" => {
                options.config = Some(flag_value(&args, &mut idx, command, "--config")?);
            }
            "--ignore" | "-I" => {
                options
                    .ignore
                    .push(flag_value(&args, &mut idx, command, "--ignore")?);
            }
            "--minify" | "-m" => options.minify = true,
            "--poll-interval" => {
                rest.push(args[idx].clone());
                if idx + 1 < args.len() {
                    idx += 1;
                    rest.push(args[idx].clone());
                }
            }
            value if value.starts_with('-') => rest.push(value.to_string()),
            value => options.inputs.push(value.to_string()),
        }
        idx += 1;
    }

    if options.inputs.is_empty() {
        return Err(CliError {
            message: format!("{} requires at least one input glob", command),
        });
    }

    Ok((options, rest))
}

fn flag_value(
    args: &[String],
    idx: &mut usize,
    command: &str,
    flag: &str,
) -> Result<String, CliError> {
    *idx += 1;
    args.get(*idx).cloned().ok_or_else(|| CliError {
        message: format!("{} requires a value for {}", command, flag),
    })
}

fn parse_u64_arg(value: &str, flag: &str) -> Result<u64, CliError> {
    value.parse::<u64>().map_err(|_| CliError {
        message: format!("{} requires a positive integer, got '{}'", flag, value),
    })
}

fn run_scan(inputs: Vec<String>, ignore: Vec<String>) -> Result<(), CliError> {
    let result = scanner::scan_patterns(&inputs, &ignore)?;
    let plugin = UiStatePlugin::default();
    let mut matched = result
        .classes
        .iter()
        .filter_map(|class| plugin.selector_for(class).map(|selector| (class, selector)))
        .collect::<Vec<_>>();
    matched.sort_by(|(left, _), (right, _)| left.cmp(right));

    for (class, selector) in &matched {
        println!("{}\t{}", class, selector);
    }

    info!(
        "scanned {} files, found {} ui- classes",
        result.files_scanned,
        matched.len()
    );

    Ok(())
}

fn run_build(options: &BuildOptions) -> Result<String, CliError> {
    let mut ignore = options.ignore.clone();
    if let Some(out_path) = options.out.as_ref() {
        ignore.push(out_path.clone());
    }

    let config = match options.config.as_deref() {
        Some(path) => config::load(Path::new(path))?,
        None => config::Config::default(),
    };
    let mut generator_config = generator::GeneratorConfig::from(&config);
    generator_config.minify |= options.minify;

    let scan_result = scanner::scan_patterns(&options.inputs, &ignore)?;
    let generation = generator::generate(&scan_result.classes, &generator_config);
    let utility_css = generator::emit_css(&generation);

    let header = build_header();
    let css = if utility_css.is_empty() {
        format!("{}\n", header)
    } else if generator_config.minify {
        format!("{}{}", header, utility_css)
    } else {
        format!("{}\n{}\n", header, utility_css)
    };

    if let Some(out_path) = options.out.as_ref() {
        fs::write(out_path, &css).map_err(|err| CliError {
            message: format!("failed to write output {}: {}", out_path, err),
        })?;
    } else {
        print!("{}", css);
    }

    info!(
        "scanned {} files, generated {} rules, skipped {} classes",
        scan_result.files_scanned, generation.class_count, generation.skipped
    );

    Ok(css)
}

fn print_help() {
    println!("stateframe");
    println!();
    println!("USAGE:");
    println!("  stateframe scan [--ignore <glob>] <glob...>");
    println!(
        "  stateframe build [--output <path>] [--minify] [--config <path>] [--ignore <glob>] <glob...>"
    );
    println!(
        "  stateframe watch [--output <path>] [--minify] [--config <path>] [--ignore <glob>] [--poll] [--poll-interval <ms>] <glob...>"
    );
    println!();
    println!("EXAMPLES:");
    println!("  stateframe scan \"src/**/*.{{html,tsx}}\"");
    println!("  stateframe build --output dist/state.css \"src/**/*.{{html,tsx}}\"");
    println!("  stateframe build -c stateframe.toml --minify \"src/**/*.{{html,tsx}}\"");
    println!("  stateframe watch --poll --poll-interval 250 \"src/**/*.{{html,tsx}}\"");
}

fn build_header() -> String {
    "/*! stateframe | MIT License */".to_string()
}

fn run_watch(options: BuildOptions, poll: bool, poll_interval_ms: u64) -> Result<(), CliError> {
    run_build(&options)?;

    let (tx, rx) = channel();
    let mut ignore = options.ignore.clone();
    if let Some(out_path) = options.out.as_ref() {
        ignore.push(out_path.clone());
    }
    let ignore_set = scanner::build_globset(&ignore).ok();
    let cwd = env::current_dir().ok();
    let mut watcher: Box<dyn notify::Watcher> = if poll {
        Box::new(
            notify::PollWatcher::new(
                tx,
                notify::Config::default()
                    .with_poll_interval(Duration::from_millis(poll_interval_ms)),
            )
            .map_err(|err| CliError {
                message: format!("failed to start poll watcher: {}", err),
            })?,
        )
    } else {
        Box::new(notify::recommended_watcher(tx).map_err(|err| CliError {
            message: format!("failed to start watcher: {}", err),
        })?)
    };

    for root in watch_roots(&options.inputs, options.config.as_deref()) {
        watcher
            .watch(&root, notify::RecursiveMode::Recursive)
            .map_err(|err| CliError {
                message: format!("failed to watch {}: {}", root.display(), err),
            })?;
    }

    if poll {
        info!("watching for changes (polling every {}ms, press Ctrl+C to stop)", poll_interval_ms);
    } else {
        info!("watching for changes (press Ctrl+C to stop)");
    }

    let mut last_event = Instant::now();
    loop {
        match rx.recv_timeout(Duration::from_millis(200)) {
            Ok(event_result) => {
                let event = match event_result {
                    Ok(event) => event,
                    Err(err) => {
                        error!("watch error: {}", err);
                        continue;
                    }
                };
                if should_ignore_event(&event, ignore_set.as_ref(), cwd.as_deref()) {
                    continue;
                }
                if last_event.elapsed() < Duration::from_millis(200) {
                    continue;
                }
                last_event = Instant::now();
                info!("change detected, rebuilding");
                if let Err(err) = run_build(&options) {
                    error!("build failed: {}", err.message);
                }
            }
            Err(std::sync::mpsc::RecvTimeoutError::Timeout) => continue,
            Err(_) => break,
        }
    }

    Ok(())
}

fn watch_roots(patterns: &[String], config: Option<&str>) -> Vec<PathBuf> {
    let mut roots = Vec::new();
    let mut seen = std::collections::HashSet::new();

    for pattern in patterns.iter().map(String::as_str).chain(config) {
        let root = scanner::glob_root(pattern);
        if seen.insert(root.clone()) {
            roots.push(root);
        }
    }

    roots
}

/// Watchers report absolute paths while ignore globs are usually relative,
/// so each path is matched both as reported and relative to `cwd`.
fn should_ignore_event(
    event: &notify::Event,
    ignore_set: Option<&GlobSet>,
    cwd: Option<&Path>,
) -> bool {
    let Some(ignore_set) = ignore_set else {
        return false;
    };
    if event.paths.is_empty() {
        return false;
    }
    event.paths.iter().all(|path| {
        ignore_set.is_match(path)
            || cwd
                .and_then(|cwd| path.strip_prefix(cwd).ok())
                .is_some_and(|relative| ignore_set.is_match(relative))
    })
}

#[cfg(test)]
mod tests {
    use super::{parse_args, run_build, should_ignore_event, watch_roots, BuildOptions, Command};
    use std::fs;
    use std::path::PathBuf;
    use std::time::{SystemTime, UNIX_EPOCH};

    fn args(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn no_arguments_prints_help() {
        assert_eq!(parse_args(Vec::new()).expect("empty args"), Command::Help);
        assert_eq!(parse_args(args(&["--help"])).expect("help"), Command::Help);
    }

    #[test]
    fn parse_scan_collects_inputs_and_ignores() {
        let command = parse_args(args(&["scan", "-I", "dist/**", "src/**/*.html"]))
            .expect("scan args should parse");
        assert_eq!(
            command,
            Command::Scan {
                inputs: vec!["src/**/*.html".to_string()],
                ignore: vec!["dist/**".to_string()],
            }
        );
    }

    #[test]
    fn parse_build_supports_output_config_and_minify() {
        let command = parse_args(args(&[
            "build",
            "--output",
            "dist/state.css",
            "-c",
            "stateframe.toml",
            "--minify",
            "src/**/*.html",
        ]))
        .expect("build args should parse");

        assert_eq!(
            command,
            Command::Build {
                inputs: vec!["src/**/*.html".to_string()],
                out: Some("dist/state.css".to_string()),
                minify: true,
                config: Some("stateframe.toml".to_string()),
                ignore: vec![],
            }
        );
    }

    #[test]
    fn parse_watch_supports_poll_flags() {
        let command = parse_args(args(&[
            "watch",
            "-o",
            "dist/state.css",
            "--poll",
            "--poll-interval",
            "250",
            "src/**/*.html",
        ]))
        .expect("watch args should parse");

        assert_eq!(
            command,
            Command::Watch {
                inputs: vec!["src/**/*.html".to_string()],
                out: Some("dist/state.css".to_string()),
                minify: false,
                config: None,
                ignore: vec![],
                poll: true,
                poll_interval_ms: 250,
            }
        );
    }

    #[test]
    fn parse_watch_defaults_poll_interval() {
        let command = parse_args(args(&["watch", "src/**/*.html"])).expect("watch args");
        assert!(matches!(
            command,
            Command::Watch {
                poll: false,
                poll_interval_ms: 500,
                ..
            }
        ));
    }

    #[test]
    fn rejects_bad_arguments() {
        let err = parse_args(args(&["compile"])).expect_err("unknown command");
        assert_eq!(err.message, "unknown command: compile");

        let err = parse_args(args(&["build", "--output"])).expect_err("missing value");
        assert_eq!(err.message, "build requires a value for --output");

        let err = parse_args(args(&["build", "--poll", "src/**"])).expect_err("watch-only flag");
        assert_eq!(err.message, "unknown build flag: --poll");

        let err = parse_args(args(&["watch", "--poll-interval", "soon", "src/**"]))
            .expect_err("non-numeric interval");
        assert_eq!(
            err.message,
            "--poll-interval requires a positive integer, got 'soon'"
        );

        let err = parse_args(args(&["scan"])).expect_err("no inputs");
        assert_eq!(err.message, "scan requires at least one input glob");
    }

    #[test]
    fn watch_roots_include_config_path() {
        let roots = watch_roots(
            &["src/**/*.html".to_string(), "src/**/*.tsx".to_string()],
            Some("config/stateframe.toml"),
        );
        assert_eq!(roots, vec![PathBuf::from("src/"), PathBuf::from("config")]);
    }

    #[test]
    fn ignores_events_only_touching_ignored_paths() {
        let ignore_set =
            crate::scanner::build_globset(&["dist/**".to_string()]).expect("valid globs");
        let mut event = notify::Event::new(notify::EventKind::Any);
        event.paths.push(PathBuf::from("dist/state.css"));
        assert!(should_ignore_event(&event, Some(&ignore_set), None));

        event.paths.push(PathBuf::from("src/index.html"));
        assert!(!should_ignore_event(&event, Some(&ignore_set), None));
        assert!(!should_ignore_event(&event, None, None));
    }

    #[test]
    fn ignores_absolute_event_paths_under_the_working_directory() {
        let ignore_set =
            crate::scanner::build_globset(&["dist/**".to_string()]).expect("valid globs");
        let cwd = PathBuf::from("/work");
        let mut event = notify::Event::new(notify::EventKind::Any);
        event.paths.push(PathBuf::from("/work/dist/state.css"));
        assert!(should_ignore_event(&event, Some(&ignore_set), Some(&cwd)));

        let mut outside = notify::Event::new(notify::EventKind::Any);
        outside.paths.push(PathBuf::from("/elsewhere/dist/state.css"));
        assert!(!should_ignore_event(&outside, Some(&ignore_set), Some(&cwd)));

        let mut source = notify::Event::new(notify::EventKind::Any);
        source.paths.push(PathBuf::from("/work/src/index.html"));
        assert!(!should_ignore_event(&source, Some(&ignore_set), Some(&cwd)));
    }

    #[test]
    fn build_writes_stylesheet_for_ui_classes() {
        let base = temp_dir("stateframe_build");
        let _ = fs::create_dir_all(&base);
        let _ = fs::write(
            base.join("index.html"),
            r#"<div class="group"><p class="ui-group-open:block ui-not-open:hidden">x</p></div>"#,
        );
        let config_path = base.join("stateframe.toml");
        let _ = fs::write(&config_path, "minify = true\n");
        let out_path = base.join("state.css");

        let css = run_build(&BuildOptions {
            inputs: vec![format!("{}/*.html", base.display())],
            out: Some(out_path.display().to_string()),
            minify: false,
            config: Some(config_path.display().to_string()),
            ignore: vec![],
        })
        .expect("build should succeed");

        let written = fs::read_to_string(&out_path).expect("output should be written");
        assert_eq!(css, written);
        assert!(written.starts_with("/*! stateframe"));
        assert!(written.contains(".group[data-state=\"open\"] .ui-group-open\\:block{display:block}"));
        assert!(written.contains(".ui-not-open\\:hidden:not([data-state=\"open\"]){display:none}"));

        let _ = fs::remove_dir_all(&base);
    }

    #[test]
    fn build_reports_missing_config() {
        let err = run_build(&BuildOptions {
            inputs: vec!["**/*.html".to_string()],
            out: None,
            minify: false,
            config: Some("definitely-missing-stateframe.toml".to_string()),
            ignore: vec![],
        })
        .expect_err("missing config should fail");
        assert!(err.message.starts_with("failed to read config"));
    }

    fn temp_dir(prefix: &str) -> PathBuf {
        let nanos = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        std::env::temp_dir().join(format!("{}_{}", prefix, nanos))
    }
}
