use std::error::Error;
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use atty::Stream;
use clap::{Parser, Subcommand, ValueEnum};
use serde_json::json;
use termimad::{FmtText, MadSkin, terminal_size};
use tracing_subscriber::EnvFilter;
use wordie_rs::collapse::ToggleSet;
use wordie_rs::host::SnapshotHost;
use wordie_rs::placement::place_popup_with;
use wordie_rs::render::audio_token;
use wordie_rs::tree::{DisplayChild, DisplayNode, NodeClass};
use wordie_rs::{
    AnchorRect, AudioLocation, LookupQuery, MemoryBookmarkStore, PopupConfig, PopupController,
    PopupPhase, Selection, Viewport, XmlFixtures,
};

const RESOURCE_BASE: &str = "moz-extension://wordie";

#[derive(Parser, Debug)]
#[command(name = "wordie-rs", about = "Preview dictionary popups", version)]
pub struct Cli {
    /// Emit JSON instead of human-readable tables.
    #[arg(long, global = true)]
    json: bool,

    /// Popup configuration file (JSON).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render the popup for a selection against a saved dictionary response.
    Preview {
        /// Dictionary XML response to serve for the selection.
        xml: PathBuf,
        /// Selected text.
        #[arg(required = true)]
        selection: Vec<String>,
        #[arg(short, long, value_enum, default_value_t = PreviewFormat::Text)]
        format: PreviewFormat,
    },
    /// Compute popup geometry for a selection rectangle.
    Place {
        #[arg(long)]
        top: f64,
        #[arg(long)]
        bottom: f64,
        #[arg(long)]
        left: f64,
        #[arg(long)]
        right: f64,
        #[arg(long, default_value_t = 0.0)]
        scroll_x: f64,
        #[arg(long, default_value_t = 0.0)]
        scroll_y: f64,
        #[arg(long, default_value_t = 1280.0)]
        client_width: f64,
        #[arg(long, default_value_t = 0.0)]
        scroll_height: f64,
    },
    /// Resolve pronunciation file names to media URLs.
    Audio {
        #[arg(required = true)]
        files: Vec<String>,
    },
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
enum PreviewFormat {
    Html,
    Json,
    Text,
}

pub fn run() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing();
    let config = match &cli.config {
        Some(path) => PopupConfig::load(path)?,
        None => PopupConfig::default(),
    };
    match cli.command {
        Command::Preview {
            xml,
            selection,
            format,
        } => handle_preview(&config, xml, selection.join(" "), format),
        Command::Place {
            top,
            bottom,
            left,
            right,
            scroll_x,
            scroll_y,
            client_width,
            scroll_height,
        } => {
            let anchor = AnchorRect::new(top, bottom, left, right);
            let viewport = Viewport {
                scroll_x,
                scroll_y,
                scroll_height,
                client_width,
            };
            handle_place(&config, anchor, viewport, cli.json)
        }
        Command::Audio { files } => handle_audio(&config, files, cli.json),
    }
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

fn handle_preview(
    config: &PopupConfig,
    xml: PathBuf,
    text: String,
    format: PreviewFormat,
) -> Result<(), Box<dyn Error>> {
    let query = LookupQuery::from_selection(&text).ok_or("Selection cannot be empty")?;
    let document = fs::read_to_string(&xml)
        .map_err(|err| format!("Failed to read {}: {err}", xml.display()))?;
    let source = XmlFixtures::new().with(query.as_str(), document);

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;
    let store = Arc::new(MemoryBookmarkStore::new());
    let mut controller =
        PopupController::new(config.clone(), store, SnapshotHost::new(RESOURCE_BASE));
    let selection = Selection::new(
        query.as_str(),
        AnchorRect::new(500.0, 520.0, 400.0, 480.0),
        Viewport {
            scroll_x: 0.0,
            scroll_y: 0.0,
            scroll_height: 2000.0,
            client_width: 1280.0,
        },
    );
    let id = runtime
        .block_on(controller.open(&selection, &source))
        .ok_or("Selection did not open a popup")?;
    let phase = controller.phase(id).unwrap_or(PopupPhase::Dismissed);

    match format {
        PreviewFormat::Html => {
            let html = controller
                .host()
                .popup(id)
                .map(|popup| popup.html.clone())
                .unwrap_or_default();
            println!("{html}");
        }
        PreviewFormat::Json => {
            let content = controller.content(id);
            let payload = json!({
                "query": query.as_str(),
                "request_url": config.entry_request_url(&query),
                "phase": phase,
                "geometry": controller.geometry(id),
                "bookmark_icon": controller.host().popup(id).and_then(|popup| popup.bookmark_icon.clone()),
                "hidden_runs": content.map(|content| content.toggles.len()).unwrap_or(0),
                "tree": content.map(|content| &content.root),
            });
            println!("{}", serde_json::to_string_pretty(&payload)?);
        }
        PreviewFormat::Text => match controller.content(id) {
            Some(content) => {
                let markdown = entry_markdown(&content.root, &content.toggles);
                render_markdown_block(&format!("Entry for \"{query}\""), &markdown);
            }
            None => println!("No results found for \"{query}\"."),
        },
    }
    Ok(())
}

fn handle_place(
    config: &PopupConfig,
    anchor: AnchorRect,
    viewport: Viewport,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let geometry = place_popup_with(&anchor, &viewport, &config.placement_rules());
    let buttons = geometry.buttons();
    if as_json {
        let payload = json!({ "geometry": geometry, "buttons": buttons });
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        println!("{:<10}  {:>10}  {:>10}", "ELEMENT", "TOP", "LEFT");
        println!("{:-<10}  {:->10}  {:->10}", "", "", "");
        println!("{:<10}  {:>10.1}  {:>10.1}", "popup", geometry.top, geometry.left);
        println!(
            "{:<10}  {:>10.1}  {:>10.1}",
            "logo", buttons.logo.top, buttons.logo.left
        );
        println!(
            "{:<10}  {:>10.1}  {:>10.1}",
            "bookmark", buttons.bookmark.top, buttons.bookmark.left
        );
    }
    Ok(())
}

fn handle_audio(
    config: &PopupConfig,
    files: Vec<String>,
    as_json: bool,
) -> Result<(), Box<dyn Error>> {
    let rows: Vec<(AudioLocation, String)> = files
        .iter()
        .map(|file| {
            let location = AudioLocation::resolve(file);
            let url = location.url(&config.audio_base_url);
            (location, url)
        })
        .collect();

    if as_json {
        let payload: Vec<_> = rows
            .iter()
            .map(|(location, url)| {
                json!({ "file": location.file, "directory": location.directory, "url": url })
            })
            .collect();
        println!("{}", serde_json::to_string_pretty(&payload)?);
    } else {
        let width = rows
            .iter()
            .map(|(location, _)| location.file.len())
            .max()
            .unwrap_or(4)
            .max("FILE".len());
        println!("{:<width$}  {}", "FILE", "URL", width = width);
        println!("{:-<width$}  {}", "", "---", width = width);
        for (location, url) in &rows {
            println!("{:<width$}  {}", location.file, url, width = width);
        }
    }
    Ok(())
}

/// Terminal rendering of an entry; hidden examples follow their toggle state.
fn entry_markdown(root: &DisplayNode, toggles: &ToggleSet) -> String {
    let mut out = String::new();
    push_markdown(&mut out, root, toggles, 0);
    out
}

fn push_markdown(out: &mut String, node: &DisplayNode, toggles: &ToggleSet, depth: usize) {
    if !toggles.is_visible(node) {
        return;
    }
    let indent = "  ".repeat(depth.saturating_sub(1));
    match &node.class {
        NodeClass::Entry => {
            out.push_str("\n---\n");
            push_children(out, node, toggles, depth);
        }
        NodeClass::Headword => out.push_str(&format!("\n## {}\n", inline_text(node))),
        NodeClass::FunctionalLabel => out.push_str(&format!("*{}*\n", inline_text(node))),
        NodeClass::Heading => out.push_str(&format!("\n**{}**\n", inline_text(node))),
        NodeClass::PronunciationAudio => {
            if let Some(file) = audio_token(node) {
                out.push_str(&format!("pronunciation: `{file}`\n"));
            }
        }
        NodeClass::SenseGroup => {
            let mut elements = node.element_children();
            let label = elements.next().map(inline_text).unwrap_or_default();
            out.push_str(&format!("\n{indent}* **{label}**"));
            for child in elements {
                push_markdown(out, child, toggles, depth + 1);
            }
        }
        NodeClass::SenseContent => push_children(out, node, toggles, depth),
        NodeClass::DefiningText => {
            let own: String = node
                .children
                .iter()
                .filter_map(|child| match child {
                    DisplayChild::Text(text) => Some(text.as_str()),
                    DisplayChild::Node(_) => None,
                })
                .collect();
            let own = own.trim();
            if !own.is_empty() {
                out.push_str(&format!(" {own}"));
            }
            for child in node.element_children() {
                push_markdown(out, child, toggles, depth);
            }
        }
        NodeClass::UsageExample => {
            out.push_str(&format!("\n{indent}  > {}", inline_text(node)));
        }
        NodeClass::ExampleToggle { run } => {
            let label = toggles
                .get(*run)
                .map(|toggle| toggle.label())
                .unwrap_or_default();
            out.push_str(&format!("\n{indent}  `{label}`"));
        }
        NodeClass::Suggestion => out.push_str(&format!("* {}\n", inline_text(node))),
        _ => push_children(out, node, toggles, depth),
    }
}

fn push_children(out: &mut String, node: &DisplayNode, toggles: &ToggleSet, depth: usize) {
    for child in node.element_children() {
        push_markdown(out, child, toggles, depth);
    }
}

fn inline_text(node: &DisplayNode) -> String {
    node.text_content().split_whitespace().collect::<Vec<_>>().join(" ")
}

fn stdout_is_tty() -> bool {
    atty::is(Stream::Stdout)
}

fn markdown_width() -> usize {
    let (width, _) = terminal_size();
    width.max(60) as usize
}

fn render_markdown_block(title: &str, body: &str) {
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return;
    }
    println!("{title}:");
    if stdout_is_tty() {
        let skin = MadSkin::default();
        let formatted = FmtText::from(&skin, trimmed, Some(markdown_width()));
        println!("{formatted}");
    } else {
        println!("{trimmed}");
    }
}
