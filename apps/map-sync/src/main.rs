use anyhow::{Context, Result};
use clap::Parser;
use map_sync::cli;
use map_sync::client::StoreClient;
use map_sync::config::Config;
use map_sync::controller::MapSyncController;
use map_sync::input::{self, Action};
use map_sync::session::Session;
use map_sync::surface::TerminalSurface;
use map_sync::view::HeadlessView;
use tokio::io::{AsyncBufReadExt, BufReader};

fn init_tracing() -> Result<()> {
    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| "info,map_sync=info".into());
    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .with_target(true)
        .with_writer(std::io::stderr)
        .try_init()
        .map_err(|err| anyhow::anyhow!(err.to_string()))?;
    Ok(())
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = cli::Args::parse();
    let config = Config::from_env()?.apply_args(&args)?;
    init_tracing()?;

    let client = StoreClient::new(&config.store_url, config.request_timeout)
        .context("failed to create store client")?;
    let controller = MapSyncController::new(
        HeadlessView::new(config.primary_view()),
        HeadlessView::new(config.secondary_view()),
    );
    let mut session = Session::new(controller, client, TerminalSurface::stdout());

    if config.skip_initial_load {
        tracing::info!("skipping initial load");
    } else if let Err(err) = session.load_initial().await {
        tracing::error!(error=%err, store=%config.store_url, "failed to fetch locations");
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                tracing::info!("shutdown signal received");
                break;
            }
            line = lines.next_line() => {
                let Some(line) = line.context("failed to read stdin")? else {
                    break;
                };
                match input::parse_line(&line) {
                    Ok(None) => {}
                    Ok(Some(Action::Dispatch(event))) => session.handle(event),
                    Ok(Some(Action::Pan { side, center, zoom })) => session.pan(side, center, zoom),
                    Ok(Some(Action::Show)) => session.show(),
                    Ok(Some(Action::Help)) => println!("{}", input::HELP),
                    Ok(Some(Action::Quit)) => break,
                    Err(err) => eprintln!("{err}"),
                }
            }
        }
    }

    session.flush().await;
    Ok(())
}
