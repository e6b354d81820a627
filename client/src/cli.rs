use anyhow::Result;
use clap::{Parser, Subcommand};
use std::{sync::Arc, time::Duration};
use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::api::{HttpBackend, QueryBackend};
use crate::config::ClientConfig;
use crate::identity::IdentityStore;
use crate::monitor::MonitoringView;
use crate::render;
use crate::result::ResultView;
use crate::search::{Decision, QuerySender, SearchBar};

#[derive(Parser)]
#[command(name = "geoquery")]
#[command(about = "Natural language geospatial queries: submit, monitor, fetch results")]
struct Cli {
    /// Backend base URL (overrides GEOQUERY_BACKEND_URL)
    #[arg(long, global = true)]
    backend: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Sends free text for interpretation, then starts or cancels it
    Search {
        #[arg(value_name = "TEXT", required = true)]
        text: Vec<String>,

        /// Start without asking
        #[arg(long, conflicts_with = "cancel")]
        yes: bool,

        /// Cancel without asking
        #[arg(long)]
        cancel: bool,
    },
    /// Follows the queries in flight until Ctrl-C
    Monitor {
        /// Only queries submitted from this profile
        #[arg(long)]
        mine: bool,

        /// Render the first update and exit
        #[arg(long)]
        once: bool,

        /// Poll period in milliseconds (overrides GEOQUERY_POLL_INTERVAL_MS)
        #[arg(long, value_name = "MS")]
        interval_ms: Option<u64>,
    },
    /// Shows the result of one query
    Result {
        #[arg(value_name = "QUERY_ID")]
        id: String,
    },
    /// Prints the author identity of this profile
    Whoami,
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("client=info,reqwest=warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

pub async fn run() -> Result<()> {
    init_tracing();

    let cli = Cli::parse();
    let mut config = ClientConfig::from_env();
    if let Some(backend) = cli.backend {
        config.base_url = backend;
    }

    let identity = Arc::new(IdentityStore::from_dir(config.state_dir.clone()));
    let backend: Arc<dyn QueryBackend> = Arc::new(HttpBackend::new(config.base_url.clone())?);
    info!("using backend {}", config.base_url);

    match cli.command {
        Commands::Search { text, yes, cancel } => {
            let decision = if yes {
                Some(Decision::Confirm)
            } else if cancel {
                Some(Decision::Cancel)
            } else {
                None
            };
            search(backend, identity, &text.join(" "), decision).await?;
        }

        Commands::Monitor {
            mine,
            once,
            interval_ms,
        } => {
            let interval = interval_ms
                .filter(|ms| *ms > 0)
                .map(Duration::from_millis)
                .unwrap_or(config.poll_interval);
            monitor(MonitoringView::new(backend, identity, interval), mine, once).await?;
        }

        Commands::Result { id } => {
            let mut view = ResultView::new(backend);
            match view.open(&id).await {
                Some(query) => print!("{}", render::query(query)),
                None => fail(view.state().notice.as_ref()),
            }
        }

        Commands::Whoami => {
            println!("{}", identity.get_or_create_author_id());
        }
    }

    Ok(())
}

async fn search(
    backend: Arc<dyn QueryBackend>,
    identity: Arc<IdentityStore>,
    text: &str,
    decision: Option<Decision>,
) -> Result<()> {
    let mut bar = SearchBar::new(QuerySender::new(backend, identity));

    match bar.submit(text).await {
        Some(interpretation) => {
            println!("Interpretation:");
            print!("{}", render::query(interpretation.query()));
        }
        None => fail(bar.state().notice.as_ref()),
    }

    let decision = match decision {
        Some(d) => d,
        None => ask_confirmation().await?,
    };

    let ok = bar.decide(decision).await;
    if let Some(notice) = &bar.state().notice {
        if ok {
            println!("{}", notice);
        } else {
            eprintln!("{}", notice);
        }
    }
    if !ok {
        std::process::exit(1);
    }
    Ok(())
}

/// Anything but an explicit yes cancels, as closing the dialog would.
async fn ask_confirmation() -> Result<Decision> {
    let mut stdout = tokio::io::stdout();
    stdout.write_all(b"Start processing? [y/N] ").await?;
    stdout.flush().await?;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let answer = lines.next_line().await?.unwrap_or_default();
    Ok(match answer.trim().to_lowercase().as_str() {
        "y" | "yes" | "o" | "oui" => Decision::Confirm,
        _ => Decision::Cancel,
    })
}

async fn monitor(view: MonitoringView, mine: bool, once: bool) -> Result<()> {
    let mut updates = view.subscribe();
    let poller = view.activate();

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            changed = updates.changed() => {
                if changed.is_err() {
                    break;
                }
                print!("{}", render::monitoring(&view.snapshot(), mine));
                if once {
                    break;
                }
            }
        }
    }

    poller.deactivate().await;
    Ok(())
}

fn fail(notice: Option<&crate::notify::Notice>) -> ! {
    if let Some(notice) = notice {
        eprintln!("{}", notice);
    } else {
        eprintln!("nothing to do");
    }
    std::process::exit(1);
}
