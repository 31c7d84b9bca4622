use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::{debug, warn};

use kdlogs_core::{FilterConfig, LogDocument, LogSession, Markup, Request};
use kdlogs_types::RequestError;

mod config;
mod filter_store;
mod snapshot;
mod status;

use config::Config;
use filter_store::FilterStore;
use snapshot::SnapshotParser;
use status::status_message;

/// kdlogs - Reformat and filter JSON log lines captured from log viewer pages
#[derive(Parser, Debug)]
#[command(name = "kdlogs")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Config file (defaults to ~/.kdlogs/config.toml when present)
    #[arg(long, global = true, value_name = "PATH")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Filter and reformat the log lines of a page snapshot
    Parse(ParseArgs),

    /// Answer parse requests read from stdin, one JSON message per line
    Listen(ListenArgs),
}

#[derive(clap::Args, Debug)]
struct ParseArgs {
    /// Page snapshot: an HTML page or one JSON log line per line
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,

    /// Output template, e.g. "[{Timestamp:HH:mm:ss} {Level:u3}] {Message}"
    #[arg(long)]
    format: Option<String>,

    /// Only show messages containing this text
    #[arg(long)]
    message: Option<String>,

    /// Only show levels containing, or contained in, this text
    #[arg(long)]
    level: Option<String>,

    /// Earliest local time of day to show
    #[arg(long = "from", value_name = "HH:mm")]
    timestamp_from: Option<String>,

    /// Latest local time of day to show
    #[arg(long = "to", value_name = "HH:mm")]
    timestamp_to: Option<String>,

    /// Clear the saved filter and show everything
    #[arg(long, conflicts_with_all = ["message", "level", "timestamp_from", "timestamp_to"])]
    reset_filters: bool,

    /// Marker style: html, ansi or plain
    #[arg(long)]
    markup: Option<String>,
}

impl ParseArgs {
    /// Filter given on the command line, if any filter flag was used
    fn filter(&self) -> Option<FilterConfig> {
        let filter = FilterConfig {
            message: self.message.clone(),
            level: self.level.clone(),
            timestamp_from: self.timestamp_from.clone(),
            timestamp_to: self.timestamp_to.clone(),
        };
        (filter != FilterConfig::default()).then_some(filter)
    }
}

#[derive(clap::Args, Debug)]
struct ListenArgs {
    /// Page snapshot: an HTML page or one JSON log line per line
    #[arg(value_name = "SNAPSHOT")]
    snapshot: PathBuf,

    /// Marker style: html, ansi or plain
    #[arg(long)]
    markup: Option<String>,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let args = Args::parse();

    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive(tracing::Level::WARN.into()),
        )
        .with_writer(std::io::stderr)
        .init();

    let result = run_app(args).await;

    if let Err(e) = &result {
        eprintln!("Error: {:#}", e);
    }

    result
}

async fn run_app(args: Args) -> Result<()> {
    let config = Config::load(args.config.as_deref()).context("Failed to load config")?;

    match args.command {
        Command::Parse(parse) => run_parse(&config, parse),
        Command::Listen(listen) => run_listen(&config, listen).await,
    }
}

fn run_parse(config: &Config, args: ParseArgs) -> Result<()> {
    let markup = config.markup(args.markup.as_deref())?;
    let parser = SnapshotParser::new(config.container_class())?;
    let filter = resolve_filter(config, &args);
    let format = args.format.clone().or_else(|| config.format.clone());

    let mut document = parser.load(&args.snapshot)?;
    let mut session = LogSession::new(markup);
    let response = session.handle(
        &mut document,
        Request::ParseLogs {
            format,
            filter: Some(filter),
        },
    );

    let mut stdout = io::stdout().lock();
    write_document(&mut stdout, &document, markup, config.container_class())
        .context("Failed to write output")?;
    stdout.flush()?;

    if let Some(message) = status_message(Ok(response)) {
        eprintln!("{}", message);
    }
    Ok(())
}

/// Pick the filter for this run the way the popup does: flags are saved for
/// next time, no flags reuse the saved filter, a reset saves an empty one
fn resolve_filter(config: &Config, args: &ParseArgs) -> FilterConfig {
    let path = config
        .storage_path
        .clone()
        .or_else(FilterStore::default_path);
    let Some(path) = path else {
        warn!("No home directory; filters will not be saved");
        return args.filter().unwrap_or_default();
    };
    let mut store = FilterStore::open(path);
    debug!(path = %store.path().display(), "Opened filter store");

    let filter = if args.reset_filters {
        FilterConfig::default()
    } else if let Some(filter) = args.filter() {
        filter
    } else {
        let saved = store.load_filter();
        debug!(?saved, "Using saved filter");
        return saved;
    };

    if let Err(e) = store.save_filter(&filter) {
        warn!(error = %e, "Failed to save filter");
    }
    filter
}

fn write_document(
    out: &mut impl Write,
    document: &LogDocument,
    markup: Markup,
    container_class: &str,
) -> io::Result<()> {
    if markup == Markup::Html {
        if let Some(style) = document.style() {
            writeln!(out, "<style id='{}'>\n{}</style>", style.id, style.css)?;
        }
        for (_, element) in document.visible() {
            writeln!(
                out,
                "<div class='{}'><span>{}</span></div>",
                container_class,
                element.content()
            )?;
        }
        return Ok(());
    }

    for (_, element) in document.visible() {
        let content = element.content();
        if content.ends_with('\n') {
            write!(out, "{}", content)?;
        } else {
            writeln!(out, "{}", content)?;
        }
    }
    Ok(())
}

async fn run_listen(config: &Config, args: ListenArgs) -> Result<()> {
    let markup = config.markup(args.markup.as_deref())?;
    let parser = SnapshotParser::new(config.container_class())?;
    let mut document = parser.load(&args.snapshot)?;
    let mut session = LogSession::new(markup);

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await.context("Failed to read request")? {
        handle_line(
            &mut session,
            &mut document,
            &line,
            &mut io::stdout().lock(),
            &mut io::stderr().lock(),
        )?;
    }

    Ok(())
}

/// Answer one request line: the response goes to `out`, status lines to
/// `err`. Blank lines and unknown actions produce nothing.
fn handle_line(
    session: &mut LogSession,
    document: &mut LogDocument,
    line: &str,
    out: &mut impl Write,
    err: &mut impl Write,
) -> Result<()> {
    let line = line.trim();
    if line.is_empty() {
        return Ok(());
    }

    match Request::from_json(line) {
        Ok(request) => {
            let response = session.handle(document, request);
            writeln!(out, "{}", serde_json::to_string(&response)?)?;
            out.flush()?;
            if let Some(message) = status_message(Ok(response)) {
                writeln!(err, "{}", message)?;
            }
        }
        Err(RequestError::UnknownAction(action)) => {
            debug!(%action, "Ignoring request with unknown action");
        }
        Err(e) => {
            if let Some(message) = status_message(Err(&e)) {
                writeln!(err, "{}", message)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_args(extra: &[&str]) -> ParseArgs {
        let mut argv = vec!["kdlogs", "parse", "page.html"];
        argv.extend_from_slice(extra);
        match Args::parse_from(argv).command {
            Command::Parse(args) => args,
            Command::Listen(_) => panic!("expected parse command"),
        }
    }

    fn storage_config(dir: &tempfile::TempDir) -> Config {
        Config {
            storage_path: Some(dir.path().join("storage.json")),
            ..Default::default()
        }
    }

    #[test]
    fn test_filter_flags_are_saved_and_reused() {
        let dir = tempfile::tempdir().unwrap();
        let config = storage_config(&dir);

        let first = resolve_filter(&config, &parse_args(&["--level", "err", "--from", "10:00"]));
        assert_eq!(first.level(), Some("err"));

        let second = resolve_filter(&config, &parse_args(&[]));
        assert_eq!(second, first);

        let reset = resolve_filter(&config, &parse_args(&["--reset-filters"]));
        assert!(reset.is_empty());
        assert!(resolve_filter(&config, &parse_args(&[])).is_empty());
    }

    #[test]
    fn test_reset_conflicts_with_filter_flags() {
        let result = Args::try_parse_from(["kdlogs", "parse", "p.html", "--reset-filters", "--level", "x"]);
        assert!(result.is_err());
    }

    #[test]
    fn test_write_plain_document() {
        let mut document = LogDocument::from_texts([
            r#"{"Level":"Error","RenderedMessage":"Failed","Exception":"boom"}"#,
            r#"{"Level":"Information","RenderedMessage":"Started"}"#,
        ]);
        let mut session = LogSession::new(Markup::Plain);
        let filter = FilterConfig {
            level: Some("err".to_string()),
            ..Default::default()
        };
        session.apply(&mut document, Some("{Level:u3} {Message}{NewLine}{Exception}"), &filter);

        let mut out = Vec::new();
        write_document(&mut out, &document, Markup::Plain, "kd-logs-element").unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "ERR Failed\nboom\n");
    }

    struct Listener {
        session: LogSession,
        document: LogDocument,
    }

    impl Listener {
        fn new() -> Self {
            Self {
                session: LogSession::new(Markup::Plain),
                document: LogDocument::from_texts([
                    r#"{"Level":"Error","RenderedMessage":"Failed"}"#,
                    r#"{"Level":"Information","RenderedMessage":"Started"}"#,
                ]),
            }
        }

        /// Feed one line; returns what was written to out and err
        fn feed(&mut self, line: &str) -> (String, String) {
            let mut out = Vec::new();
            let mut err = Vec::new();
            handle_line(&mut self.session, &mut self.document, line, &mut out, &mut err).unwrap();
            (String::from_utf8(out).unwrap(), String::from_utf8(err).unwrap())
        }
    }

    #[test]
    fn test_listener_answers_requests() {
        let mut listener = Listener::new();
        let (out, err) = listener.feed(r#"{"action":"parseKDLogsMessages","format":"{Message}"}"#);
        assert_eq!(out, "2\n");
        assert_eq!(err, "");

        let (out, err) = listener.feed(
            r#"  {"action":"parseKDLogsMessages","filter":{"message":"nothing like it"}}  "#,
        );
        assert_eq!(out, "0\n");
        assert_eq!(err, "No logs found\n");
    }

    #[test]
    fn test_listener_skips_blank_lines() {
        let mut listener = Listener::new();
        assert_eq!(listener.feed(""), (String::new(), String::new()));
        assert_eq!(listener.feed("   \t"), (String::new(), String::new()));
        assert!(listener.document.style().is_none());
    }

    #[test]
    fn test_listener_reports_malformed_requests() {
        let mut listener = Listener::new();
        let (out, err) = listener.feed("{");
        assert_eq!(out, "");
        assert!(err.starts_with("Error: "), "unexpected status: {err}");
        assert!(listener.document.style().is_none());

        // the listener keeps going after a bad line
        let (out, _) = listener.feed(r#"{"action":"parseKDLogsMessages"}"#);
        assert_eq!(out, "2\n");
    }

    #[test]
    fn test_listener_ignores_unknown_actions() {
        let mut listener = Listener::new();
        let (out, err) = listener.feed(r#"{"action":"somethingElse","filter":{}}"#);
        assert_eq!(out, "");
        assert_eq!(err, "");
        assert!(listener.document.style().is_none());
        assert!(listener.document.elements().all(|(_, e)| !e.is_hidden()));
    }

    #[test]
    fn test_write_html_document() {
        let mut document = LogDocument::from_texts([r#"{"RenderedMessage":"hi"}"#]);
        LogSession::new(Markup::Html).apply(&mut document, Some("{Message}"), &FilterConfig::default());

        let mut out = Vec::new();
        write_document(&mut out, &document, Markup::Html, "kd-logs-element").unwrap();
        let html = String::from_utf8(out).unwrap();
        assert!(html.starts_with("<style id='kd-log-style'>"));
        assert!(html.ends_with(
            "<div class='kd-logs-element'><span><span class='kd-log-message'>hi</span></span></div>\n"
        ));
    }
}
