use anyhow::Context;
use clap::Parser;
use tracing::{error, info};

use cloudrelay_cli::{Cli, Mode, run};
use cloudrelay_infra::PubSubTransport;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    cloudrelay_observability::init_with(cli.log_format());

    let config = cli.pubsub_config().context("invalid Pub/Sub configuration")?;
    info!(?config, mode = ?cli.mode, "starting");
    let transport = PubSubTransport::new(config).context("failed to create Pub/Sub client")?;

    match cli.mode {
        Mode::Subscribe => {
            let stats = run::subscribe(transport, run::ctrl_c()).await;
            info!(
                received = stats.received,
                dispatched = stats.dispatched,
                failed = stats.failed,
                "subscriber stopped"
            );
        }
        Mode::Publish => {
            if let Err(err) = run::publish(&transport, &cli.message).await {
                error!(error = %err, "failed to publish message");
                std::process::exit(1);
            }
        }
    }

    Ok(())
}
