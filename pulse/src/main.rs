use clap::Parser;
use tracing::{error, info};

use pulse::app_state::AppState;
use pulse::http::{setup_http_server, setup_scrape_server};
use pulse::settings::config::Settings;
use pulse::{init_telemetry, stop_flag};

#[derive(Parser)]
#[command(name = "pulse")]
#[command(about = "HTTP service with per-request metrics")]
#[clap(version)]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Parser)]
enum Commands {
    /// Show current configuration and exit
    Config,
    /// Start the pulse server (default)
    Run,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let settings = Settings::new()?;

    match cli.command.as_ref().unwrap_or(&Commands::Run) {
        Commands::Config => {
            println!("{:#?}", &settings);
            return Ok(());
        }
        Commands::Run => {}
    }

    init_telemetry::init_tracing(settings.debug)?;

    let app_state = AppState::new(settings)?;
    stop_flag::register_signal_handler(&app_state.stop_flag);

    let mut handles = vec![];

    {
        let handle =
            setup_http_server(app_state.clone(), &app_state.settings.api.bind_address).await?;
        handles.push(handle);
    }

    if let Some(handle) = setup_scrape_server(app_state.clone()).await? {
        handles.push(handle);
    }

    for handle in handles {
        match handle.await {
            Ok(Ok(())) => {}
            Ok(Err(e)) => {
                error!("{:#}", e);
                app_state.stop_flag.stop();
            }
            Err(e) => {
                error!("Server task failed: {}", e);
                app_state.stop_flag.stop();
            }
        }
    }
    info!("All servers are down");

    app_state.shutdown();

    Ok(())
}
