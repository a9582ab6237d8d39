use anyhow::Result;
use clap::Parser;
use sensor_monitor::{
    config::Config,
    externals::{reporting::task::task_report_readouts, sensor::services::Provider},
    tasks::aggregator::Aggregator,
};
use tokio::signal;
use tokio_util::{sync::CancellationToken, task::TaskTracker};

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::parse();

    let subscriber = tracing_subscriber::fmt()
        .compact()
        .with_file(true)
        .with_line_number(true)
        .with_thread_ids(true)
        .with_target(false)
        .with_max_level(config.log_level)
        .finish();

    tracing::subscriber::set_global_default(subscriber)?;
    tracing::debug!("Configuration: {:?}", config);

    // NOTE: A configured port that fails to open is fatal, there is no
    // fallback to simulated readouts.
    let provider = Provider::from_config(&config)?;
    let reading_ended = provider.reading_ended();
    let aggregator = Aggregator::spawn(provider, config.aggregator_settings());

    let tracker = TaskTracker::new();
    let token = CancellationToken::new();

    let token_clone = token.clone();
    let reader = aggregator.reader();
    let report_interval = config.report_interval();
    tracker.spawn(async move {
        task_report_readouts(token_clone, reader, report_interval, reading_ended).await
    });

    let token_clone = token.clone();

    tokio::select! {
        _ = token_clone.cancelled() => {}
        res = signal::ctrl_c() => {
            match res {
                Ok(_) => {
                    token.cancel();
                },
                Err(e)=>{
                    tracing::error!("Failed to listen for ctrl_c. Error: {}", e);
                    token.cancel();
                }
            };
        },
    }

    tracker.close();
    tracker.wait().await;

    let provider = aggregator.shutdown().await?;
    if let Err(e) = provider.shutdown().await {
        tracing::error!("Sensor reading had stopped. Error: {}", e);
    }

    Ok(())
}
