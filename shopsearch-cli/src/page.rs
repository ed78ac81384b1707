//! Text layout for the terminal page and parsing of shell input.

use std::fmt::Write;
use std::path::PathBuf;

use shopsearch_core::browse::BrowseFeed;
use shopsearch_core::render::{self, CardRenderer};
use shopsearch_core::types::{ProductResult, SearchState};

pub const SHELL_HELP: &str = "\
Commands:
  <text>          search products by name, category or description
  :image <path>   select an image (searches immediately when auto_search is on)
  :search         search with the selected image
  :clear          start a new search
  :random         refresh the discover feed
  :help           show this help
  :quit           leave
";

/// One line of shell input.
#[derive(Debug, PartialEq)]
pub enum ShellCommand {
    Search(String),
    SelectImage(PathBuf),
    SubmitImage,
    Clear,
    Random,
    Help,
    Quit,
    Blank,
    Unknown(String),
}

impl ShellCommand {
    pub fn parse(line: &str) -> Self {
        let line = line.trim();
        if line.is_empty() {
            return Self::Blank;
        }
        let Some(command) = line.strip_prefix(':') else {
            return Self::Search(line.to_string());
        };
        let (name, arg) = match command.split_once(char::is_whitespace) {
            Some((name, arg)) => (name, arg.trim()),
            None => (command, ""),
        };
        match name {
            "image" | "i" if !arg.is_empty() => Self::SelectImage(PathBuf::from(arg)),
            "search" | "s" => Self::SubmitImage,
            "clear" | "c" => Self::Clear,
            "random" | "r" => Self::Random,
            "help" | "h" => Self::Help,
            "quit" | "q" | "exit" => Self::Quit,
            _ => Self::Unknown(line.to_string()),
        }
    }
}

fn push_cards(out: &mut String, renderer: &CardRenderer, products: &[ProductResult]) {
    for (i, card) in renderer.render_all(products).iter().enumerate() {
        let _ = writeln!(out, "{:>3}. {card}", i + 1);
    }
}

/// The search area: selected image, then results or a status line.
pub fn render_search(
    state: &SearchState,
    renderer: &CardRenderer,
    selected: Option<(&str, &str)>,
) -> String {
    let mut out = String::new();
    if let Some((name, preview)) = selected {
        let _ = writeln!(out, "Selected image: {name} ({preview})");
    }
    if let Some(heading) = render::results_heading(state) {
        let _ = writeln!(out, "{heading}");
        push_cards(&mut out, renderer, &state.results);
    } else if let Some(status) = render::status_line(state) {
        let _ = writeln!(out, "{status}");
    }
    out
}

/// The discover section under the search area.
pub fn render_feed(feed: &BrowseFeed, renderer: &CardRenderer) -> String {
    let mut out = String::from("Discover our products\n");
    if let Some(error) = feed.error() {
        let _ = writeln!(out, "Error loading products: {error}");
    }
    if feed.products().is_empty() {
        out.push_str("  (nothing to show)\n");
    } else {
        push_cards(&mut out, renderer, feed.products());
    }
    out
}
