use std::sync::Arc;

use clap::Parser;
use tokio::io::{AsyncBufReadExt, BufReader};

use file_session::cli::{Cli, Commands};
use file_session::command::{Command, Outcome};
use file_session::config::Config;
use file_session::controller::{SessionController, ViewModel};
use file_session::error::{BrowserError, Result};
use file_session::gateway::{Gateway, SearchEvent, SearchRequest};
use file_session::local_gateway::LocalGateway;
use file_session::test_runner::TestRunner;

const LOG_ENV_VAR: &str = "FILE_SESSION_LOG";

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose)?;

    let config = match &cli.config {
        Some(path) => Config::load_from_file(path)?,
        None => Config::load()?,
    };

    match cli.command.unwrap_or(Commands::Shell) {
        Commands::Shell => run_shell(&config).await,
        Commands::List { path, fresh } => run_list(&config, &path, fresh).await,
        Commands::Search {
            query,
            path,
            max_results,
        } => run_search(&config, &query, path, max_results).await,
        Commands::Test {
            script,
            settle_timeout,
        } => run_headless_test(&config, &script, settle_timeout).await,
    }
}

/// Log to the file named by `FILE_SESSION_LOG`, or to stderr with `--verbose`
fn init_logging(verbose: bool) -> Result<()> {
    if let Ok(log_file) = std::env::var(LOG_ENV_VAR) {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&log_file)?;
        env_logger::Builder::new()
            .target(env_logger::Target::Pipe(Box::new(file)))
            .filter_level(log::LevelFilter::Debug)
            .init();
        log::info!("file-session starting up");
    } else if verbose {
        env_logger::Builder::new()
            .filter_level(log::LevelFilter::Debug)
            .init();
    }
    Ok(())
}

async fn run_list(config: &Config, path: &str, fresh: bool) -> Result<()> {
    let gateway = LocalGateway::from_config(config);
    let view = if fresh {
        gateway.list_directory_fresh(path).await?
    } else {
        gateway.list_directory(path).await?
    };

    println!("{}", view.current_path);
    for entry in &view.entries {
        if !config.show_hidden && entry.is_hidden() {
            continue;
        }
        let detail = match (entry.is_directory, entry.item_count, entry.size) {
            (true, Some(count), _) => format!("{} items", count),
            (false, _, Some(size)) => format!("{} bytes", size),
            _ => String::new(),
        };
        let marker = if entry.is_directory { "/" } else { "" };
        println!("  {}{:<40} {}", entry.name, marker, detail);
    }
    Ok(())
}

async fn run_search(
    config: &Config,
    query: &str,
    path: Option<String>,
    max_results: Option<usize>,
) -> Result<()> {
    let gateway = LocalGateway::from_config(config);
    let scope_path = match path {
        Some(path) => path,
        None => gateway.home_directory().await?,
    };

    let mut stream = gateway
        .search_stream(SearchRequest {
            scope_path,
            query: query.to_string(),
            max_depth: config.search.max_depth,
            max_results: max_results.or(config.search.max_results),
        })
        .await?;

    let mut found = 0usize;
    while let Some(event) = stream.recv().await {
        match event {
            SearchEvent::Started => log::debug!("search started"),
            SearchEvent::Result(entry) => {
                found += 1;
                println!("{}", entry.path);
            }
            SearchEvent::Completed => {
                eprintln!("{} results", found);
                return Ok(());
            }
        }
    }
    Err(BrowserError::io("search stream closed before completion"))
}

async fn run_shell(config: &Config) -> Result<()> {
    let gateway: Arc<dyn Gateway> = Arc::new(LocalGateway::from_config(config));
    let mut controller = SessionController::new(gateway, config);
    controller.start();
    settle(&mut controller, config).await;
    print_view(&controller.view_model());

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        if line == "quit" || line == "q" {
            break;
        }

        let command = match Command::from_string(line) {
            Ok(command) => command,
            Err(e) => {
                eprintln!("{}", e);
                continue;
            }
        };
        match command.apply(&mut controller).await {
            Ok(Outcome::Created(path)) => println!("created {}", path),
            Ok(Outcome::Ignored) => eprintln!("nothing to do"),
            Ok(_) => {}
            Err(e) => eprintln!("error: {}", e),
        }

        settle(&mut controller, config).await;
        print_view(&controller.view_model());
    }

    controller.shutdown();
    Ok(())
}

async fn settle(controller: &mut SessionController, config: &Config) {
    if tokio::time::timeout(config.settle_timeout(), controller.settle())
        .await
        .is_err()
    {
        log::warn!("session did not settle within {:?}", config.settle_timeout());
    }
}

fn print_view(view: &ViewModel) {
    match &view.search_query {
        Some(query) => println!("[search '{}' in {}]", query, view.current_path.as_deref().unwrap_or("?")),
        None => println!("[{}]", view.current_path.as_deref().unwrap_or("no directory")),
    }
    if let Some(error) = &view.error {
        println!("  ! {}", error);
    }
    for entry in &view.displayed_entries {
        let marker = if view.selection.contains(&entry.path) { "*" } else { " " };
        let suffix = if entry.is_directory { "/" } else { "" };
        println!(" {} {}{}", marker, entry.name, suffix);
    }
}

async fn run_headless_test(config: &Config, script_path: &str, settle_timeout: u64) -> Result<()> {
    log::info!("Starting headless test run");
    log::info!("Script: {}", script_path);

    let mut test_runner = TestRunner::from_file(script_path)
        .map_err(|e| BrowserError::invalid_input(e.to_string()))?;
    test_runner.max_settle_time = std::time::Duration::from_secs(settle_timeout);

    let gateway: Arc<dyn Gateway> = Arc::new(LocalGateway::from_config(config));
    let mut controller = SessionController::new(gateway, config);
    controller.start();

    let test_result = test_runner.run(&mut controller).await;
    controller.shutdown();
    test_result.print_summary();

    if test_result.success {
        log::info!("Test completed successfully");
        Ok(())
    } else {
        log::error!("Test failed");
        Err(BrowserError::io("test failed"))
    }
}
