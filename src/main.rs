use anyhow::Result;
use clap::Parser;
use console::style;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use stream_digest::cli::{Cli, Commands, ProcessOverrides};
use stream_digest::{utils, Config, Dispatcher, StreamPipeline};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    init_tracing(cli.verbose, cli.json_logs);

    if let Err(e) = run(cli).await {
        eprintln!("{} {:#}", style("Error:").red().bold(), e);
        std::process::exit(1);
    }
}

fn init_tracing(verbose: bool, json_logs: bool) {
    let default_filter = if verbose {
        "stream_digest=debug"
    } else {
        "stream_digest=info"
    };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_filter));

    let registry = tracing_subscriber::registry().with(filter);
    if json_logs {
        registry
            .with(tracing_subscriber::fmt::layer().json().with_writer(std::io::stderr))
            .init();
    } else {
        registry
            .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
            .init();
    }
}

async fn run(cli: Cli) -> Result<()> {
    match cli.command {
        Commands::Process {
            locator,
            output_dir,
            model,
            target_language,
            enrich,
            rich_summary,
        } => {
            let mut config = Config::load().await?;
            ProcessOverrides {
                output_dir,
                model,
                target_language,
                enrich,
                rich_summary,
            }
            .apply(&mut config);

            // Missing tools are reported but not fatal; text sources need none of them
            let missing_deps = utils::check_dependencies(
                &config.transcription.yt_dlp_path,
                &config.transcription.whisper_path,
            )
            .await;
            if !missing_deps.is_empty() {
                eprintln!("⚠️  Dependency check warnings:");
                for dep in missing_deps {
                    eprintln!("   • {}", dep);
                }
                eprintln!("   (Continuing anyway - tools may be available)");
            }

            let pipeline = StreamPipeline::builder(config)
                .show_progress(!cli.quiet)
                .build()?;

            tracing::info!("Starting run for: {}", locator);
            let outcome = pipeline.run(&locator).await?;

            println!(
                "{} Report saved to: {}",
                style("✓").green().bold(),
                outcome.report_path.display()
            );
        }
        Commands::Config { show } => {
            let config = Config::load().await?;
            if show {
                config.display();
            } else {
                println!("Configuration file: {}", Config::config_path()?.display());
                println!("Credentials are read from the environment; use --show to see which are set.");
            }
        }
        Commands::Sources => {
            let dispatcher = Dispatcher::new(&Config::default());
            println!("Supported sources:");
            for platform in dispatcher.list_platforms() {
                println!("  • {}", platform);
            }
        }
    }

    Ok(())
}
