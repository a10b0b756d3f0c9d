//! Hubkit CLI - exercise the event hub toolbox against an in-process hub.
//!
//! Every command hosts its own [`InMemoryHub`], so no external broker is
//! needed to publish events or watch a processor consume them.

use bytes::Bytes;
use clap::{Parser, Subcommand};
use hubkit_client::{EventReceiver, InMemoryHub, ProcessorOptions, Toolbox};
use hubkit_core::{DeviceTelemetry, StorageConfig, StreamConfig};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "hubkit")]
#[command(about = "Hubkit - a client toolbox for partitioned event hub streams")]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Send one event and show where it landed
    Send {
        /// Event payload
        message: String,

        /// Stream name
        #[arg(short, long, default_value = "events")]
        stream: String,

        /// Number of partitions
        #[arg(short, long, default_value = "4")]
        partitions: usize,
    },

    /// Generate a batch of random device telemetry events
    Generate {
        /// Number of telemetry events
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Stream name
        #[arg(short, long, default_value = "events")]
        stream: String,

        /// Number of partitions
        #[arg(short, long, default_value = "4")]
        partitions: usize,
    },

    /// Run a live pipeline: seed telemetry, subscribe, and watch it flow
    Process {
        /// Telemetry events seeded before processing starts
        #[arg(short, long, default_value = "10")]
        count: usize,

        /// Stream name
        #[arg(short, long, default_value = "events")]
        stream: String,

        /// Number of partitions
        #[arg(short, long, default_value = "4")]
        partitions: usize,

        /// Host name owning the subscription
        #[arg(long, default_value = "console-host")]
        host: String,

        /// Consumer group
        #[arg(short, long, default_value = "default")]
        group: String,

        /// Seconds between checkpoints per partition
        #[arg(long, default_value = "30")]
        checkpoint_secs: u64,

        /// Maximum events per delivery batch
        #[arg(short, long, default_value = "10")]
        batch: usize,

        /// Milliseconds between generated live events
        #[arg(long, default_value = "1000")]
        rate_ms: u64,
    },
}

fn telemetry_batch(count: usize) -> Result<Vec<String>, serde_json::Error> {
    (0..count)
        .map(|_| serde_json::to_string(&DeviceTelemetry::random()))
        .collect()
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Initialize tracing
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Send {
            message,
            stream,
            partitions,
        } => {
            let hub = InMemoryHub::new(stream.clone(), partitions);
            let toolbox = Toolbox::new(Arc::new(hub.clone()));
            toolbox.connect_with(hub.connection()).await;

            toolbox.send(message).await?;
            toolbox.disconnect().await?;

            println!("✓ Sent 1 event to stream '{}'", stream);
            for index in 0..hub.partition_count() {
                if let Some(events) = hub.partition_events(index).await {
                    for event in events {
                        println!(
                            "  [partition={} offset={}] {}",
                            index,
                            event.offset,
                            String::from_utf8_lossy(&event.payload)
                        );
                    }
                }
            }
        }

        Commands::Generate {
            count,
            stream,
            partitions,
        } => {
            let hub = InMemoryHub::new(stream.clone(), partitions);
            let toolbox = Toolbox::new(Arc::new(hub.clone()));
            toolbox.connect_with(hub.connection()).await;

            toolbox.send_batch(telemetry_batch(count)?).await?;
            toolbox.disconnect().await?;

            println!(
                "✓ Generated {} telemetry events into stream '{}'",
                count, stream
            );
            for index in 0..hub.partition_count() {
                let len = hub.partition_len(index).await.unwrap_or(0);
                println!("  • partition {}: {} events", index, len);
            }
        }

        Commands::Process {
            count,
            stream,
            partitions,
            host,
            group,
            checkpoint_secs,
            batch,
            rate_ms,
        } => {
            let hub = InMemoryHub::new(stream.clone(), partitions);
            let toolbox = Toolbox::new(Arc::new(hub.clone()));
            toolbox.connect_with(hub.connection()).await;

            if count > 0 {
                toolbox.send_batch(telemetry_batch(count)?).await?;
                println!("✓ Seeded {} telemetry events", count);
            }

            let receiver = Arc::new(EventReceiver::new(Duration::from_secs(checkpoint_secs)));
            let mut events = receiver.events();
            let mut notifications = receiver.notifications();
            tokio::spawn(async move {
                loop {
                    tokio::select! {
                        event = events.recv() => match event {
                            Ok(event) => {
                                println!("[partition={}] {}", event.partition_id, event.body)
                            }
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                        note = notifications.recv() => match note {
                            Ok(note) => println!("  • {}", note.message),
                            Err(broadcast::error::RecvError::Lagged(_)) => continue,
                            Err(broadcast::error::RecvError::Closed) => break,
                        },
                    }
                }
            });

            let stream_config = StreamConfig::new()
                .with_stream_name(stream.clone())
                .with_consumer_group(group.clone());
            let options = ProcessorOptions::new().with_max_batch_size(batch);
            toolbox
                .subscribe(
                    &host,
                    &stream_config,
                    &StorageConfig::default(),
                    receiver,
                    options,
                )
                .await?;
            println!(
                "Processing stream '{}' as host '{}' (Ctrl+C to stop)...",
                stream, host
            );

            // Setup graceful shutdown
            let running = Arc::new(AtomicBool::new(true));
            let r = running.clone();

            ctrlc::set_handler(move || {
                println!("\nShutting down...");
                r.store(false, Ordering::SeqCst);
            })?;

            let generator = {
                let publisher = hub.connection();
                let running = running.clone();
                tokio::spawn(async move {
                    while running.load(Ordering::SeqCst) {
                        tokio::time::sleep(Duration::from_millis(rate_ms)).await;
                        let payload = match serde_json::to_string(&DeviceTelemetry::random()) {
                            Ok(payload) => payload,
                            Err(_) => continue,
                        };
                        if publisher.send(Bytes::from(payload)).await.is_err() {
                            break;
                        }
                    }
                })
            };

            while running.load(Ordering::SeqCst) {
                tokio::time::sleep(Duration::from_millis(100)).await;
            }

            let _ = generator.await;
            toolbox.unsubscribe_all().await?;
            toolbox.disconnect().await?;

            println!("✓ Stopped");
            for index in 0..hub.partition_count() {
                let len = hub.partition_len(index).await.unwrap_or(0);
                let checkpoint = hub
                    .checkpointed_offset(&group, &index.to_string())
                    .await
                    .map(|offset| offset.to_string())
                    .unwrap_or_else(|| "none".to_string());
                println!(
                    "  • partition {}: {} events, checkpoint {}",
                    index, len, checkpoint
                );
            }
        }
    }

    Ok(())
}
