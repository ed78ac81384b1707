use std::io::Write;
use std::path::{Path, PathBuf};
use std::process;

use clap::{Parser, Subcommand};
use shopsearch_core::browse::BrowseFeed;
use shopsearch_core::config::{Config, SearchConfig};
use shopsearch_core::orchestrator::SearchError;
use shopsearch_core::preview::PreviewRegistry;
use shopsearch_core::render::CardRenderer;
use shopsearch_core::session::SearchSession;
use shopsearch_core::transport::{HttpTransport, Transport};
use shopsearch_core::types::SelectedFile;
use tokio::io::{AsyncBufReadExt, BufReader};

mod page;

use page::ShellCommand;

#[derive(Parser)]
#[command(name = "shopsearch", about = "Search products by text or by image")]
struct Cli {
    /// Path to the config file
    #[arg(long, default_value = "shopsearch.toml")]
    config: PathBuf,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Search by name, category or description
    Text {
        /// Search terms
        #[arg(required = true, num_args = 1..)]
        query: Vec<String>,
    },
    /// Search for products that look like an image
    Image {
        /// Image file to upload (png, jpg, jpeg, gif, webp, bmp)
        path: PathBuf,
        /// Number of ranked results to request
        #[arg(long)]
        top_k: Option<usize>,
    },
    /// Show a random selection of products
    Random {
        #[arg(long)]
        count: Option<usize>,
    },
    /// List product categories
    Categories,
    /// Interactive search page
    Shell,
    /// Inspect configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Print the effective config as TOML
    Show,
    /// Validate the config file
    Validate,
}

#[tokio::main]
async fn main() {
    env_logger::init();
    let cli = Cli::parse();

    let result = match Config::load_or_default(&cli.config) {
        Ok(config) => run(cli.command, &cli.config, &config).await,
        Err(e) => Err(format!("Config error: {e}")),
    };

    match result {
        Ok(output) => print!("{output}"),
        Err(msg) => {
            eprintln!("{msg}");
            process::exit(1);
        }
    }
}

async fn run(command: Command, config_path: &Path, config: &Config) -> Result<String, String> {
    let transport = HttpTransport::new(&config.backend)?;
    let renderer = CardRenderer::from_config(config);

    match command {
        Command::Text { query } => {
            text_search(transport, config, &renderer, &query.join(" ")).await
        }
        Command::Image { path, top_k } => {
            let top_k = top_k.unwrap_or(config.search.top_k);
            image_search(transport, &renderer, &path, top_k).await
        }
        Command::Random { count } => {
            let mut feed = BrowseFeed::new();
            feed.refresh(&transport, count.unwrap_or(config.browse.count))
                .await
                .map_err(|e| format!("Error loading products: {}", e.message()))?;
            Ok(page::render_feed(&feed, &renderer))
        }
        Command::Categories => {
            let categories = transport
                .categories()
                .await
                .map_err(|e| format!("Error loading categories: {}", e.message()))?;
            Ok(categories.iter().map(|c| format!("{c}\n")).collect())
        }
        Command::Shell => shell(transport, config, &renderer).await.map(|()| String::new()),
        Command::Config { action } => match action {
            ConfigAction::Show => Ok(config.to_toml_string()),
            ConfigAction::Validate => validate_config(config_path),
        },
    }
}

fn validate_config(path: &Path) -> Result<String, String> {
    Config::from_file(path).map_err(|e| format!("Config error: {e}"))?;
    Ok("Configuration is valid.\n".to_string())
}

async fn text_search(
    transport: HttpTransport,
    config: &Config,
    renderer: &CardRenderer,
    query: &str,
) -> Result<String, String> {
    let session = SearchSession::new(transport, &config.search, PreviewRegistry::new());
    session.submit_text(query).await.map_err(|e| e.to_string())?;
    Ok(page::render_search(&session.state(), renderer, None))
}

async fn image_search(
    transport: HttpTransport,
    renderer: &CardRenderer,
    path: &Path,
    top_k: usize,
) -> Result<String, String> {
    let file = SelectedFile::from_path(path)?;
    let search_config = SearchConfig {
        top_k,
        auto_search: false,
    };
    let session = SearchSession::new(transport, &search_config, PreviewRegistry::new());
    session.select_file(Some(file)).await.map_err(|e| e.to_string())?;
    session.submit_image().await.map_err(|e| e.to_string())?;
    Ok(page::render_search(&session.state(), renderer, None))
}

async fn shell(
    transport: HttpTransport,
    config: &Config,
    renderer: &CardRenderer,
) -> Result<(), String> {
    let session = SearchSession::new(transport, &config.search, PreviewRegistry::new());
    let mut feed = BrowseFeed::new();

    // A failed feed load is shown on the page; the search still works.
    let _ = feed.refresh(session.transport(), config.browse.count).await;
    println!("Search products by name, category or image. Type :help for commands.\n");
    print!("{}", page::render_feed(&feed, renderer));

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    loop {
        print!("\n> ");
        std::io::stdout().flush().map_err(|e| e.to_string())?;

        let Some(line) = lines.next_line().await.map_err(|e| e.to_string())? else {
            break;
        };

        let outcome = match ShellCommand::parse(&line) {
            ShellCommand::Blank => continue,
            ShellCommand::Quit => break,
            ShellCommand::Help => {
                print!("{}", page::SHELL_HELP);
                continue;
            }
            ShellCommand::Unknown(input) => {
                println!("Unknown command '{input}'. Type :help for commands.");
                continue;
            }
            ShellCommand::Random => {
                let _ = feed.refresh(session.transport(), config.browse.count).await;
                print!("{}", page::render_feed(&feed, renderer));
                continue;
            }
            ShellCommand::Clear => {
                session.clear();
                println!("Cleared.");
                continue;
            }
            ShellCommand::Search(query) => session.submit_text(&query).await.map(|_| ()),
            ShellCommand::SelectImage(path) => match SelectedFile::from_path(&path) {
                Ok(file) => session.select_file(Some(file)).await.map(|_| ()),
                Err(e) => {
                    println!("{e}");
                    continue;
                }
            },
            ShellCommand::SubmitImage => session.submit_image().await.map(|_| ()),
        };

        if let Err(e) = outcome {
            log::debug!("search failed: {e}");
            // Transport failures are already part of the state shown below.
            if matches!(e, SearchError::Validation(_)) {
                println!("{}", e.user_message());
                continue;
            }
        }

        let name = session.selected_file_name();
        let preview = session.preview_url();
        let selected = name.as_deref().zip(preview.as_deref());
        print!("{}", page::render_search(&session.state(), renderer, selected));
    }
    session.clear();
    Ok(())
}
