mod api;
mod app;
mod config;
mod constants;
mod display;
mod feed;
mod graphics;
mod grid;
mod input;
mod lazy;
mod paginator;
mod scroll;
mod search;
mod theme;
mod ui;

use anyhow::{Context, Result, bail};
use clap::{CommandFactory, Parser, Subcommand};
use clap_complete::Shell;
use image::DynamicImage;
use ratatui::{
  DefaultTerminal,
  crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyEventKind},
    execute,
  },
  layout::Rect,
};
use std::io::Write;
use std::time::Duration;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use api::{Endpoint, HttpSource};
use app::App;
use config::Config;
use display::{CliDisplayMode, DisplayMode};
use feed::FetchOutcome;
use graphics::{kitty_delete_all, kitty_place_all};
use grid::{Grid, Layout};

// --- CLI ---

#[derive(Parser, Debug)]
#[command(author, version = env!("CARGO_PKG_VERSION"), about = "Browse a poster feed in the terminal", long_about = None)]
struct Args {
  /// Content host serving data/page{N}.json and images/ (overrides prefs)
  #[arg(long, global = true)]
  base_url: Option<String>,

  #[command(subcommand)]
  command: Option<Command>,
}

#[derive(Subcommand, Debug)]
enum Command {
  /// Open the poster grid (default)
  Browse(BrowseArgs),
  /// Fetch the feed and print matching items
  List(ListArgs),
  /// Print shell completions
  Completions {
    #[arg(value_enum)]
    shell: Shell,
  },
}

#[derive(clap::Args, Debug, Default)]
struct BrowseArgs {
  /// Grid layout: 'scroll' (infinite) or 'paged' (pages of 12)
  #[arg(short, long, value_enum)]
  layout: Option<Layout>,

  /// Display mode: 'auto', 'kitty', 'direct', or 'ascii' (default: auto-detect)
  #[arg(short, long, value_enum)]
  display_mode: Option<CliDisplayMode>,
}

#[derive(clap::Args, Debug)]
struct ListArgs {
  /// Only items whose name contains this text (case-insensitive)
  #[arg(short, long)]
  search: Option<String>,

  /// Print one display page of 12 instead of every match
  #[arg(short, long)]
  page: Option<usize>,

  /// Stop after fetching this many feed pages
  #[arg(long)]
  max_pages: Option<u32>,

  /// Emit JSON lines instead of tab-separated text
  #[arg(long)]
  json: bool,
}

// --- Logging ---

fn env_filter(default: &str) -> EnvFilter {
  EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default))
}

/// The TUI owns the terminal, so logs go to a daily file.
fn init_file_logging() -> Option<WorkerGuard> {
  let dir = config::log_dir()?;
  std::fs::create_dir_all(&dir).ok()?;
  let (writer, guard) = tracing_appender::non_blocking(tracing_appender::rolling::daily(dir, "posters.log"));
  tracing_subscriber::fmt().with_env_filter(env_filter("info")).with_writer(writer).with_ansi(false).init();
  Some(guard)
}

fn init_stderr_logging() {
  tracing_subscriber::fmt().with_env_filter(env_filter("warn")).with_writer(std::io::stderr).init();
}

// --- Main ---

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let config = Config::load();
  let base_url = args.base_url.clone().or_else(|| config.base_url.clone());
  let endpoint = base_url.as_deref().map(Endpoint::new).unwrap_or_default();

  match args.command {
    Some(Command::Completions { shell }) => {
      clap_complete::generate(shell, &mut Args::command(), "posters", &mut std::io::stdout());
      Ok(())
    }
    Some(Command::List(list_args)) => {
      init_stderr_logging();
      list(list_args, endpoint).await
    }
    Some(Command::Browse(browse_args)) => browse(browse_args, config, endpoint).await,
    None => browse(BrowseArgs::default(), config, endpoint).await,
  }
}

async fn list(args: ListArgs, endpoint: Endpoint) -> Result<()> {
  let source = HttpSource::new(endpoint.clone())?;
  let layout = if args.page.is_some() { Layout::Paged } else { Layout::Scroll };
  let mut grid = Grid::new(endpoint, layout);

  let mut fetched = 0;
  while grid.feed().has_more() && args.max_pages.is_none_or(|max| fetched < max) {
    let page = grid.feed().cursor();
    match grid.fetch_next_page(&source).await {
      FetchOutcome::Appended(_) => fetched += 1,
      FetchOutcome::Failed(msg) => bail!("Failed to fetch page {}: {}", page, msg),
      _ => {}
    }
  }
  info!(pages = fetched, items = grid.feed().items().len(), "list: feed fetched");

  grid.set_search(args.search.as_deref().unwrap_or(""));
  if let Some(page) = args.page {
    grid.set_page(page);
  }

  let mut out = std::io::stdout().lock();
  for item in grid.displayed_items() {
    if args.json {
      let line = serde_json::to_string(item).context("Failed to serialize item")?;
      writeln!(out, "{}", line).context("Failed to write to stdout")?;
    } else {
      let url = grid.endpoint().poster_url(item);
      writeln!(out, "{}\t{}\t{}", item.id, item.display_name(), url).context("Failed to write to stdout")?;
    }
  }
  Ok(())
}

async fn browse(args: BrowseArgs, config: Config, endpoint: Endpoint) -> Result<()> {
  let _log_guard = init_file_logging();

  let layout = args.layout.or(config.layout).unwrap_or_default();
  let cli_mode = args.display_mode.or(config.display_mode).unwrap_or_default();
  let display_mode = display::resolve_display_mode(cli_mode);
  let theme_index = config.theme_name.as_deref().map_or(0, theme::index_of);
  let source = HttpSource::new(endpoint)?;
  info!(base = %source.endpoint().base(), layout = layout.label(), display = display_mode.label(), "starting");

  let default_hook = std::panic::take_hook();
  std::panic::set_hook(Box::new(move |info| {
    let _ = execute!(std::io::stdout(), DisableMouseCapture);
    ratatui::restore();
    default_hook(info);
  }));

  let mut terminal = ratatui::init();
  execute!(std::io::stdout(), EnableMouseCapture).context("Failed to enable mouse capture")?;
  let app = App::new(source, layout, display_mode, theme_index);
  let result = run(&mut terminal, app).await;
  let _ = execute!(std::io::stdout(), DisableMouseCapture);
  ratatui::restore();
  result
}

/// Re-place Kitty posters when the set on screen changed.
fn sync_kitty(app: &mut App) -> Result<()> {
  if app.gfx.frame == app.gfx.last_sent {
    return Ok(());
  }
  let mut out = std::io::stdout();
  kitty_delete_all(&mut out)?;
  let placements: Vec<(&DynamicImage, Rect)> =
    app.gfx.frame.iter().filter_map(|(url, area)| app.posters.image(url).map(|img| (img, *area))).collect();
  kitty_place_all(&mut out, &placements)?;
  app.gfx.last_sent = app.gfx.frame.clone();
  Ok(())
}

async fn run(terminal: &mut DefaultTerminal, mut app: App) -> Result<()> {
  let placeholder = app.grid.placeholder().to_string();
  app.load_posters(vec![placeholder]);
  app.trigger_fetch();

  loop {
    app.check_pending()?;
    app.expire_error();

    terminal.draw(|frame| ui::ui(frame, &mut app))?;
    if app.display_mode == DisplayMode::Kitty {
      sync_kitty(&mut app)?;
    }
    app.after_draw();

    if event::poll(Duration::from_millis(50))? {
      match event::read()? {
        Event::Key(key) if key.kind == KeyEventKind::Press => input::handle_key_event(&mut app, key),
        Event::Mouse(mouse) => input::handle_mouse_event(&mut app, mouse),
        Event::Resize(..) => app.resized(),
        _ => {}
      }
    }

    if app.should_quit {
      break;
    }
  }

  if app.display_mode == DisplayMode::Kitty {
    kitty_delete_all(&mut std::io::stdout())?;
  }
  Ok(())
}
