//! Terminal logging via simplelog.
//!
//! The level comes from `RUST_LOG`; default is `info`. Run with
//! `RUST_LOG=debug` to watch actions move through the middleware chain.

use simplelog::{ColorChoice, Config, LevelFilter, TermLogger, TerminalMode};

pub fn init() {
    let level = std::env::var("RUST_LOG")
        .map(|v| match v.to_lowercase().as_str() {
            "error" => LevelFilter::Error,
            "warn" => LevelFilter::Warn,
            "info" => LevelFilter::Info,
            "debug" => LevelFilter::Debug,
            "trace" => LevelFilter::Trace,
            _ => LevelFilter::Info,
        })
        .unwrap_or(LevelFilter::Info);

    TermLogger::init(
        level,
        Config::default(),
        TerminalMode::Mixed,
        ColorChoice::Auto,
    )
    .expect("failed to initialize logger");
}
