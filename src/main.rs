mod admin;
mod cli;
mod commands;
mod config;
mod contacts;
mod content;
mod image;
mod inquiry;
mod ops_log;
mod paths;
mod recaptcha;
mod resolver;
mod submit;
mod terminal;
mod wizard;

use anyhow::Result;
use clap::Parser;
use cli::{Command, RootArgs};
use std::process::ExitCode;
use tracing_subscriber::{fmt, EnvFilter};

/// Log filter directives, e.g. `STUDIO_LOG=debug`.
const LOG_ENV: &str = "STUDIO_LOG";

fn init_logging() {
    let filter = EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<ExitCode> {
    init_logging();
    let args = RootArgs::parse();
    let root = args.site_root();

    match args.command {
        Command::Init(init) => commands::run_init(&root, init).map(|()| ExitCode::SUCCESS),
        Command::Inquire(inquire) => commands::run_inquire(&root, inquire),
        Command::Submit(submit) => commands::run_submit(&root, submit),
        Command::Gallery(gallery) => commands::run_gallery(&root, gallery),
        Command::About(about) => commands::run_about(&root, about),
        Command::Image(image) => commands::run_image(&root, image),
        Command::Admin(admin) => commands::run_admin(&root, admin),
        Command::Resolve(resolve) => {
            commands::run_resolve(&root, resolve).map(|()| ExitCode::SUCCESS)
        }
    }
}
