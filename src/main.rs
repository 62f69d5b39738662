use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use signbook::capture::{Point, SignaturePad};
use signbook::gallery::{Gallery, Submission, SubmitOutcome};
use signbook::service::http::{serve, ServerHandle};
use signbook::store::{JournalOptions, JournalStore, MemoryStore, SignatureStore};
use signbook::{AsyncClient, ClientConfig, RecordId, ServerConfig};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "signbook", version, about = "Hand-drawn signature guestbook")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the signature API until Ctrl-C
    Serve {
        #[arg(long)]
        port: Option<u16>,
        #[arg(long)]
        bind: Option<String>,
        /// Journal file (defaults to SIGNBOOK_DATA or ./signatures.journal)
        #[arg(long)]
        data: Option<PathBuf>,
        /// Skip fsync after each append
        #[arg(long)]
        no_sync: bool,
        #[arg(long)]
        workers: Option<usize>,
        /// Keep records in memory only
        #[arg(long)]
        memory: bool,
    },
    /// Print every signature held by a running service
    List {
        #[arg(long, default_value = "http://localhost:5000")]
        url: String,
        /// Print the raw JSON array
        #[arg(long)]
        json: bool,
    },
    /// Draw strokes on a signature pad and submit them
    Sign {
        #[arg(long, default_value = "")]
        name: String,
        /// Space-separated `x,y` points; repeat for several strokes
        #[arg(long = "stroke")]
        strokes: Vec<String>,
        #[arg(long, default_value = "http://localhost:5000")]
        url: String,
    },
    /// Delete a signature by id
    Delete {
        id: String,
        #[arg(long, default_value = "http://localhost:5000")]
        url: String,
    },
    /// Rewrite a journal so it only holds live records
    Compact {
        #[arg(long)]
        data: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn parse_stroke(points: &str) -> anyhow::Result<Vec<Point>> {
    points
        .split_whitespace()
        .map(|pair| {
            let (x, y) = pair
                .split_once(',')
                .with_context(|| format!("point {:?} is not x,y", pair))?;
            Ok(Point::new(
                x.trim().parse().with_context(|| format!("bad x in {:?}", pair))?,
                y.trim().parse().with_context(|| format!("bad y in {:?}", pair))?,
            ))
        })
        .collect()
}

async fn run_server<S: SignatureStore + 'static>(
    config: &ServerConfig,
    store: S,
) -> anyhow::Result<()> {
    let handle: ServerHandle<S> = serve(config, store).context("failed to start server")?;
    println!("signbook listening on {}", handle.base_url());

    tokio::signal::ctrl_c()
        .await
        .context("failed to wait for Ctrl-C")?;
    log::info!("shutting down");
    tokio::task::spawn_blocking(move || handle.shutdown())
        .await
        .context("shutdown task failed")??;
    Ok(())
}

fn client_config(url: String) -> ClientConfig {
    ClientConfig {
        base_url: url,
        ..Default::default()
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    match cli.command {
        Command::Serve {
            port,
            bind,
            data,
            no_sync,
            workers,
            memory,
        } => {
            let mut config = ServerConfig::from_env()?;
            if let Some(port) = port {
                config.port = port;
            }
            if let Some(bind) = bind {
                config.bind = bind;
            }
            if let Some(data) = data {
                config.data_path = data;
            }
            if no_sync {
                config.sync = false;
            }
            if let Some(workers) = workers {
                config.workers = workers;
            }

            if memory {
                run_server(&config, MemoryStore::new()).await
            } else {
                let store = JournalStore::open(
                    &config.data_path,
                    JournalOptions {
                        sync: config.sync,
                        ..Default::default()
                    },
                )
                .with_context(|| format!("failed to open {}", config.data_path.display()))?;
                run_server(&config, store).await
            }
        }

        Command::List { url, json } => {
            let client = AsyncClient::new(client_config(url)).await?;
            let records = client.list().await?;
            if json {
                println!("{}", serde_json::to_string_pretty(&records)?);
            } else if records.is_empty() {
                println!("No signatures yet.");
            } else {
                for r in &records {
                    println!("{}  {:<24}  {} bytes", r.id, r.name, r.signature.len());
                }
            }
            client.close().await?;
            Ok(())
        }

        Command::Sign { name, strokes, url } => {
            let mut pad = SignaturePad::new();
            for points in &strokes {
                pad.draw_stroke(parse_stroke(points)?);
            }

            let mut gallery = Gallery::new();
            gallery.on_prompt(|message| eprintln!("{}", message));
            gallery.set_name(name);

            let client = AsyncClient::new(client_config(url)).await?;
            let ticket = gallery.begin_mount();
            let listed = client.list().await;
            gallery.finish_mount(ticket, listed);

            let outcome = match gallery.begin_submit(&pad) {
                Submission::Done(outcome) => outcome,
                Submission::Ready { ticket, payload } => {
                    let created = client.create(payload).await;
                    gallery.finish_submit(ticket, created, &mut pad)
                }
            };
            client.close().await?;

            match outcome {
                SubmitOutcome::Saved(record) => {
                    println!(
                        "Saved signature {} ({} in the gallery)",
                        record.id,
                        gallery.records().len()
                    );
                    Ok(())
                }
                SubmitOutcome::EmptyCanvas => bail!("nothing drawn; pass at least one --stroke"),
                SubmitOutcome::Failed | SubmitOutcome::Stale => bail!("signature was not saved"),
            }
        }

        Command::Delete { id, url } => {
            let id = RecordId::parse(&id)?;
            let client = AsyncClient::new(client_config(url)).await?;
            let result = client.delete(&id).await;
            client.close().await?;
            match result {
                Ok(record) => {
                    println!("Deleted {} ({})", record.id, record.name);
                    Ok(())
                }
                Err(e) if e.is_not_found() => bail!("no signature with id {}", id),
                Err(e) => Err(e.into()),
            }
        }

        Command::Compact { data } => {
            let path = match data {
                Some(p) => p,
                None => ServerConfig::from_env()?.data_path,
            };
            let store = JournalStore::open(
                &path,
                JournalOptions {
                    create: false,
                    ..Default::default()
                },
            )
            .with_context(|| format!("failed to open {}", path.display()))?;
            let dead = store.dead_entries()?;
            store.compact()?;
            store.close()?;
            println!("Compacted {} ({} dead entries removed)", path.display(), dead);
            Ok(())
        }
    }
}
