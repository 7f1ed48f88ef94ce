use scout_search::core::types::{ErrorResponse, ExtractionResult, SearchRequest, SearchResponse};
use scout_search::mcp::{stdio, OutputQueue};
use scout_search::{search, AppState, SearchError};
use tokio::io::AsyncWrite;
use tracing::{info, warn};

const USAGE: &str = "scout-search (MCP stdio server)
usage:
  scout-search                      serve the web_search tool over stdio
  scout-search --query <text> [--limit N] [--truncate N] [--exclude DOMAIN]... [--show] [--proxy URL]
  scout-search --version | --help";

/// Parse one-shot `--query` mode arguments. `Ok(None)` means no `--query` was given.
fn parse_query_args(args: &[String]) -> anyhow::Result<Option<SearchRequest>> {
    let mut request: Option<SearchRequest> = None;
    let mut limit = None;
    let mut truncate = None;
    let mut excluded = Vec::new();
    let mut show = false;
    let mut proxy = None;

    let mut it = args.iter().skip(1);
    while let Some(arg) = it.next() {
        let mut value = |name: &str| {
            it.next()
                .cloned()
                .ok_or_else(|| anyhow::anyhow!("{} needs a value", name))
        };
        match arg.as_str() {
            "--query" | "-q" => request = Some(SearchRequest::new(value("--query")?)),
            "--limit" => limit = Some(value("--limit")?.parse::<usize>()?),
            "--truncate" => truncate = Some(value("--truncate")?.parse::<usize>()?),
            "--exclude" => excluded.push(value("--exclude")?),
            "--proxy" => proxy = Some(value("--proxy")?),
            "--show" => show = true,
            other => anyhow::bail!("unknown argument '{}'\n{}", other, USAGE),
        }
    }

    let Some(mut request) = request else {
        return Ok(None);
    };
    if let Some(limit) = limit {
        request = request.with_result_limit(limit);
    }
    if let Some(truncate) = truncate {
        request = request.with_truncate_length(truncate);
    }
    for domain in excluded {
        request = request.with_excluded_domain(domain);
    }
    request.show_ui = show;
    request.proxy_address = proxy;
    Ok(Some(request))
}

/// Write the one-shot outcome as JSON. A failed search is reported in the
/// payload, not through the exit status.
async fn write_outcome<W>(
    output: &OutputQueue<W>,
    outcome: Result<Vec<ExtractionResult>, SearchError>,
) -> anyhow::Result<()>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    let payload = match outcome {
        Ok(results) => serde_json::to_string_pretty(&SearchResponse { results })?,
        Err(e) => {
            warn!("one-shot search failed: {}", e);
            serde_json::to_string_pretty(&ErrorResponse {
                error: e.to_string(),
            })?
        }
    };
    output.write_line(&payload).await?;
    Ok(())
}

async fn run_once(state: AppState, request: SearchRequest) -> anyhow::Result<()> {
    let output = OutputQueue::stdout();
    let outcome = search(&request, &state.config).await;
    write_outcome(&output, outcome).await?;
    output.shutdown().await?;
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // stdout carries the MCP transport; logs go to stderr.
    let _ = tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .try_init();

    // MCP hosts may call stdio servers with `--version`/`--help` before
    // starting a session.
    let args: Vec<String> = std::env::args().collect();
    if args.iter().any(|a| a == "--version" || a == "-V") {
        println!("scout-search {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }
    if args.iter().any(|a| a == "--help" || a == "-h") {
        println!("{}", USAGE);
        return Ok(());
    }

    let state = AppState::from_environment();
    match parse_query_args(&args)? {
        Some(request) => {
            info!("one-shot search: {}", request.query);
            run_once(state, request).await
        }
        None => stdio::run(state).await,
    }
}
