#![deny(rust_2018_idioms)]

use crate::cli::{repos, Command, GlobalArgs};
use anyhow::{bail, Context, Result};
use ghrm::{
    app::App,
    clone::CloneDepth,
    config::{CloneSettings, ConfigFile, Overrides, Settings},
    git::GitCloner,
    github::{client::Authentication, BearerToken, GhClient},
};
use tracing::debug;
use tracing_subscriber::EnvFilter;

mod cli;

fn init_tracing(debug: bool) {
    let filter = if debug {
        EnvFilter::new(concat!(env!("CARGO_CRATE_NAME"), "=debug"))
    } else {
        EnvFilter::from_default_env()
    };
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn load_settings(global: GlobalArgs) -> Result<Settings> {
    let GlobalArgs { owner, token, api_url, workspace, config, .. } = global;
    let file = ConfigFile::load(config.as_deref())?;
    let settings = Settings::resolve(Overrides { owner, token, workspace, api_url }, file)?;
    debug!(?settings, "resolved settings");
    Ok(settings)
}

async fn run_repos(
    app: App<'_, GitCloner>,
    defaults: CloneSettings,
    cmd: repos::Command,
) -> Result<()> {
    use repos::Command::*;
    match cmd {
        Ls { filter } => app.list_repositories(filter.unwrap_or(defaults.filter)).await?,
        CloneAll { filter, method, depth, on_conflict } => {
            let options = CloneSettings {
                method: method.unwrap_or(defaults.method),
                filter: filter.unwrap_or(defaults.filter),
                depth: depth.map(CloneDepth::from_depth).unwrap_or(defaults.depth),
                on_conflict: on_conflict.unwrap_or(defaults.on_conflict),
            };
            let summary = app.clone_all(options).await?;
            if summary.failed > 0 {
                bail!("{} of {} repositories failed to clone.", summary.failed, summary.total);
            }
        }
        Create { name, private, description } => {
            app.create_repository(&name, private, description).await?
        }
        Delete { repo, yes } => app.delete_repository(repo, yes).await?,
    }
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();
    let cmd = cli::cmd();
    init_tracing(cmd.global.debug);
    debug!(?cmd, "launched");

    // create app
    let settings = load_settings(cmd.global)?;
    let token = settings.token.as_ref().map(|x| BearerToken::new(&x.0));
    let client = GhClient::new(
        settings.api_url.clone(),
        token.as_ref().map(|x| x as &dyn Authentication),
    )
    .context("Failed to create GitHub client.")?;
    let cloner = GitCloner::new(settings.token.clone());
    let app = App::new(&settings, client, cloner);

    // process command
    match cmd.cmd {
        Command::Repos { cmd } | Command::R { cmd } => run_repos(app, settings.clone, cmd).await?,
    }

    debug!("exiting");
    Ok(())
}
