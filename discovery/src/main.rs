//! Headless driver for discovery sessions.
//!
//! Loads a session from the experiences API and reads commands from stdin,
//! one per line:
//!
//! ```bash
//! EXPERIENCES_USER_ID=u-1 cargo run -p discovery -- --session s-42
//! ```

mod headless;

use tracing_subscriber::{layer::SubscriberExt as _, util::SubscriberInitExt as _, EnvFilter};

const DEFAULT_LOG_FILTER: &str = "discovery=info,discovery_core=info";

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    let args: Vec<String> = std::env::args().collect();

    if args.iter().any(|a| a == "--help" || a == "-h") {
        print_help();
        return Ok(());
    }

    init_tracing();

    if std::env::var("EXPERIENCES_USER_ID").is_err() {
        eprintln!("Error: EXPERIENCES_USER_ID environment variable not set.");
        eprintln!("Please set it in .env file or with: export EXPERIENCES_USER_ID=your_user_id");
        std::process::exit(1);
    }

    let options = headless::parse_options_from_args(&args);
    headless::run_headless(options).await.map_err(|e| e.into())
}

/// Logs go to stderr so stdout carries only protocol lines.
fn init_tracing() {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));

    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(filter)
        .init();
}

fn print_help() {
    println!("Discovery - headless driver for number-pattern discovery sessions");
    println!();
    println!("USAGE:");
    println!("  discovery [OPTIONS]");
    println!();
    println!("OPTIONS:");
    println!("  -h, --help              Show this help message");
    println!("  --session <ID>          Session id (default: $EXPERIENCES_SESSION_ID or 'headless')");
    println!("  --experience <SLUG>     Experience slug (default: $EXPERIENCES_SLUG or 'discovery-path')");
    println!("  --strict                Refuse unknown action types locally");
    println!("  --lenient               Forward unknown action types to the server");
    println!();
    println!("ENVIRONMENT:");
    println!("  EXPERIENCES_USER_ID       Learner id sent with every request (required)");
    println!("  EXPERIENCES_API_URL       Backend base URL (default: http://localhost:5000)");
    println!("  EXPERIENCES_TIMEOUT_SECS  Request timeout in seconds (default: 30)");
    println!("  RUST_LOG                  Log filter (default: {DEFAULT_LOG_FILTER})");
    println!();
    println!("EXAMPLES:");
    println!("  discovery --session s-42");
    println!("  echo 'pattern 5 10 15' | discovery --session s-42 --lenient");
}
