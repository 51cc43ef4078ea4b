use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use favorites::User;
use foundation::LatLng;
use ingest::{ANCHOR_LAT, ANCHOR_LNG, Point, PointKind, attr};
use runtime::CancelToken;
use tools::config::EngineConfig;
use tools::run::{SourceChoice, ViewRequest, run};
use tools::toggle::{remote_from_config, toggle_repeatedly};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Clustered bike-parking markers with synced favorites")]
struct Args {
    /// JSON config file; MARKERS_* environment variables override it
    #[arg(long)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Load points in chunks and print the clusters for one view
    Run {
        /// JSON array of point records; generated points are used when absent
        #[arg(long)]
        input: Option<PathBuf>,

        /// Number of generated points (default from config)
        #[arg(long)]
        points: Option<u64>,

        /// Generator seed (default from config)
        #[arg(long)]
        seed: Option<u64>,

        #[arg(long, default_value_t = ANCHOR_LAT)]
        lat: f64,

        #[arg(long, default_value_t = ANCHOR_LNG)]
        lng: f64,

        #[arg(long, default_value_t = 12.0)]
        zoom: f64,

        #[arg(long, default_value_t = 1280.0)]
        width: f64,

        #[arg(long, default_value_t = 800.0)]
        height: f64,
    },

    /// Toggle one point's favorite flag and print each result
    Toggle {
        point_id: String,

        /// Signed-in user id; omit to toggle anonymously
        #[arg(long)]
        user: Option<String>,

        #[arg(long, default_value = "guest")]
        username: String,

        #[arg(long, default_value_t = 2)]
        times: u32,

        #[arg(long, default_value_t = ANCHOR_LAT)]
        lat: f64,

        #[arg(long, default_value_t = ANCHOR_LNG)]
        lng: f64,

        #[arg(long, default_value = "")]
        address: String,
    },
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .init();

    let args = Args::parse();
    let config = EngineConfig::load(args.config.as_deref())?;

    match args.command {
        Command::Run {
            input,
            points,
            seed,
            lat,
            lng,
            zoom,
            width,
            height,
        } => {
            let source = match input {
                Some(path) => SourceChoice::JsonFile(path),
                None => SourceChoice::Generated {
                    count: points.unwrap_or(config.generated_points),
                    seed: seed.unwrap_or(config.seed),
                },
            };
            let view = ViewRequest {
                center: LatLng::new(lat, lng),
                zoom,
                width_px: width,
                height_px: height,
            };

            let cancel = CancelToken::new();
            let on_interrupt = cancel.clone();
            tokio::spawn(async move {
                if tokio::signal::ctrl_c().await.is_ok() {
                    info!("interrupted; stopping after the current chunk");
                    on_interrupt.cancel();
                }
            });

            let summary = run(&config, &source, view, cancel).await?;
            println!(
                "{}",
                serde_json::to_string_pretty(&summary).context("encoding summary")?
            );
        }
        Command::Toggle {
            point_id,
            user,
            username,
            times,
            lat,
            lng,
            address,
        } => {
            let mut point = Point::new(point_id, LatLng::new(lat, lng), PointKind::Rack);
            if !address.is_empty() {
                point = point.with_attribute(attr::ADDRESS, address);
            }
            let user = user.map(|id| User::new(id, username));
            let remote = remote_from_config(&config);

            for (i, result) in toggle_repeatedly(remote, user, &point, times)
                .await
                .into_iter()
                .enumerate()
            {
                match result {
                    Ok(state) => println!(
                        "{}",
                        serde_json::to_string(&state).context("encoding favorite state")?
                    ),
                    Err(e) => {
                        error!(attempt = i + 1, error = %e, "toggle failed");
                        println!("error: {e}");
                    }
                }
            }
        }
    }

    Ok(())
}
