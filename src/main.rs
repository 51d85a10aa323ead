use clap::{Parser, Subcommand};
use coursepay::application::Services;
use coursepay::config::{OrderArgs, ServeArgs, StorageArgs};
use coursepay::domain::signature::SignatureVerifier;
use coursepay::infrastructure::Ledger;
use coursepay::infrastructure::in_memory::InMemoryCatalog;
use coursepay::infrastructure::sandbox_gateway::SandboxGateway;
use coursepay::interfaces::csv::catalog_reader::CatalogReader;
use coursepay::interfaces::csv::enrollment_writer::EnrollmentWriter;
use coursepay::interfaces::http::{AppState, router};
use miette::{IntoDiagnostic, Result, WrapErr};
use std::fs::File;
use std::io;
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Serve the order, capture and progress API over HTTP
    Serve(ServeArgs),
    /// Expire every unpaid order that has outlived its TTL
    Sweep {
        #[command(flatten)]
        storage: StorageArgs,
        #[command(flatten)]
        orders: OrderArgs,
    },
    /// Write all enrollments as CSV to stdout
    Enrollments {
        #[command(flatten)]
        storage: StorageArgs,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    match cli.command {
        Command::Serve(args) => serve(args).await,
        Command::Sweep { storage, orders } => {
            let ledger = storage.open_ledger().into_diagnostic()?;
            let services = offline_services(ledger, orders.order_ttl());
            let expired = services.orders.sweep_expired().await.into_diagnostic()?;
            println!("expired {} orders", expired);
            Ok(())
        }
        Command::Enrollments { storage } => {
            let ledger = storage.open_ledger().into_diagnostic()?;
            let services = offline_services(ledger, OrderArgs::default().order_ttl());
            let enrollments = services.enrollments.all().await.into_diagnostic()?;

            let stdout = io::stdout();
            let mut writer = EnrollmentWriter::new(stdout.lock());
            writer.write_enrollments(enrollments).into_diagnostic()?;
            Ok(())
        }
    }
}

async fn serve(args: ServeArgs) -> Result<()> {
    let catalog = load_catalog(&args.catalog)?;
    if args.storage.db_path.is_none() {
        warn!("no --db-path given, orders and enrollments are kept in memory only");
    }
    let ledger = args.storage.open_ledger().into_diagnostic()?;

    let verifier = SignatureVerifier::new(&args.gateway_secret);
    let gateway = SandboxGateway::new(verifier.clone());
    let services = Services::new(
        ledger,
        Arc::new(gateway.clone()),
        verifier,
        args.orders.order_ttl(),
    );
    if args.sandbox {
        warn!("sandbox payments enabled, any order can be paid through /sandbox/pay");
    }
    let courses = catalog.len();
    let state = AppState {
        services,
        catalog: Arc::new(catalog),
        sandbox: args.sandbox.then_some(gateway),
    };

    let listener = tokio::net::TcpListener::bind(args.bind)
        .await
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to bind {}", args.bind))?;
    info!(addr = %args.bind, courses, "listening");
    axum::serve(listener, router(state)).await.into_diagnostic()?;
    Ok(())
}

fn load_catalog(path: &Path) -> Result<InMemoryCatalog> {
    let file = File::open(path)
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to open catalog {}", path.display()))?;
    let listings = CatalogReader::new(file)
        .read_all()
        .into_diagnostic()
        .wrap_err_with(|| format!("failed to read catalog {}", path.display()))?;
    Ok(InMemoryCatalog::new(listings))
}

/// Services for maintenance commands, which never talk to the gateway.
fn offline_services(ledger: Ledger, order_ttl: chrono::Duration) -> Services {
    let verifier = SignatureVerifier::new("");
    let gateway = SandboxGateway::new(verifier.clone());
    Services::new(ledger, Arc::new(gateway), verifier, order_ttl)
}
