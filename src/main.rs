use anyhow::Context;
use chrono::Local;
use clap::{Args, Parser, Subcommand};
use crossterm::tty::IsTty;
use std::io;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::EnvFilter;

use sleep_journal::entry::{self, PerformanceEntry, SleepEntry};
use sleep_journal::menu::Menu;
use sleep_journal::stats::{self, DateRange, SearchCriteria, ThemeFilter};
use sleep_journal::{Config, FileStore, Journal, Recorded, Theme, report, themes};

#[derive(Parser)]
#[command(name = "Sleep Journal")]
#[command(version)]
#[command(about = "Terminal journal for sleep, dreams and daily performance")]
struct Cli {
    /// Configuration file (defaults to ./config.json when present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Overrides the configured data directory
    #[arg(long, global = true)]
    data_dir: Option<PathBuf>,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Interactive menu (default)
    Menu,
    /// Record last night's sleep
    Sleep(SleepArgs),
    /// Record today's performance
    Perf(PerfArgs),
    /// Recent sleep and performance entries
    History {
        #[arg(short, long)]
        count: Option<usize>,
    },
    /// Full analysis report
    Report {
        /// Also write the report under the data directory
        #[arg(short, long)]
        save: bool,
    },
    /// Sleep and performance correlations
    Correlate,
    /// Averages and trend direction over a date range
    Trend(RangeArgs),
    /// Dream theme catalog, or details for one theme
    Themes { theme: Option<String> },
    /// Recurring themes and emotion patterns
    Patterns(RangeArgs),
    /// Find dreams by theme, emotion, keyword or quality
    Search(SearchArgs),
    /// Dream statistics
    Stats,
    /// Copy data files into a timestamped backup directory
    Backup {
        /// List existing backups instead
        #[arg(short, long)]
        list: bool,
    },
}

#[derive(Args)]
struct SleepArgs {
    /// YYYY-MM-DD, defaults to today
    #[arg(short, long)]
    date: Option<String>,
    /// HH:MM
    #[arg(short, long)]
    bedtime: String,
    /// HH:MM
    #[arg(short, long)]
    wake: String,
    /// 1-10
    #[arg(short, long)]
    quality: String,
    #[arg(long)]
    dream: Option<String>,
    /// Comma separated
    #[arg(short, long, default_value = "")]
    emotions: String,
}

#[derive(Args)]
struct PerfArgs {
    #[arg(short, long)]
    date: Option<String>,
    #[arg(short, long)]
    mood: String,
    #[arg(short, long)]
    energy: String,
    #[arg(short, long)]
    productivity: String,
    #[arg(short, long)]
    stress: String,
    #[arg(short, long, default_value = "")]
    activities: String,
    #[arg(short, long, default_value = "")]
    notes: String,
}

#[derive(Args)]
struct RangeArgs {
    #[arg(long)]
    from: Option<String>,
    #[arg(long)]
    to: Option<String>,
}

impl RangeArgs {
    fn range(&self) -> anyhow::Result<DateRange> {
        let from = self.from.as_deref().map(entry::parse_date).transpose()?;
        let to = self.to.as_deref().map(entry::parse_date).transpose()?;
        Ok(DateRange::new(from, to))
    }
}

#[derive(Args)]
struct SearchArgs {
    #[arg(short, long)]
    theme: Option<String>,
    #[arg(short, long)]
    emotion: Option<String>,
    #[arg(short, long)]
    keyword: Option<String>,
    #[arg(long)]
    min_quality: Option<String>,
    #[arg(long)]
    max_quality: Option<String>,
    #[command(flatten)]
    range: RangeArgs,
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .init();
}

fn date_or_today(date: Option<&str>) -> anyhow::Result<chrono::NaiveDate> {
    match date {
        Some(d) => Ok(entry::parse_date(d)?),
        None => Ok(Local::now().date_naive()),
    }
}

fn print_recorded(what: &str, date: chrono::NaiveDate, recorded: Recorded) {
    match recorded {
        Recorded::New => println!("{} for {} recorded.", what, date),
        Recorded::Superseded => println!("{} for {} updated; the earlier entry was replaced.", what, date),
    }
}

fn record_sleep(journal: &mut Journal<FileStore>, args: SleepArgs) -> anyhow::Result<()> {
    let date = date_or_today(args.date.as_deref())?;
    let mut night = SleepEntry::new(
        date,
        entry::parse_time(&args.bedtime)?,
        entry::parse_time(&args.wake)?,
        entry::parse_rating(&args.quality)?,
    );
    if let Some(dream) = &args.dream {
        night = night.with_dream(dream, entry::parse_emotions(&args.emotions));
    }

    let recorded = journal.record_sleep(night.clone()).context("could not save sleep entry")?;
    print_recorded("Sleep entry", date, recorded);
    println!("Slept {}", report::format_duration(night.sleep_duration()));
    if night.had_dream() {
        println!("\n{}", report::render_dream_analysis(&night));
    }
    Ok(())
}

fn record_performance(journal: &mut Journal<FileStore>, args: PerfArgs) -> anyhow::Result<()> {
    let date = date_or_today(args.date.as_deref())?;
    let mut day = PerformanceEntry::new(
        date,
        entry::parse_rating(&args.mood)?,
        entry::parse_rating(&args.energy)?,
        entry::parse_rating(&args.productivity)?,
        entry::parse_rating(&args.stress)?,
    );
    day.activities = args.activities;
    day.notes = args.notes;

    let score = day.overall_score();
    let recorded = journal.record_performance(day).context("could not save performance entry")?;
    print_recorded("Performance entry", date, recorded);
    println!("Overall score: {:.1}/10", score);
    Ok(())
}

fn show_theme(journal: &Journal<FileStore>, name: Option<&str>) -> anyhow::Result<()> {
    let frequency = stats::theme_frequency(journal.sleep_entries()?, &ThemeFilter::default());
    match name {
        Some(name) => {
            let theme: Theme = name.parse()?;
            println!("{}", report::render_theme_detail(theme, &frequency));
        }
        None => {
            println!("{}", report::render_theme_catalog(&frequency));
            if let Some((theme, tip)) = themes::random_tip(&mut rand::thread_rng()) {
                println!("\nTip ({}): {}", theme, tip);
            }
        }
    }
    Ok(())
}

fn search(journal: &Journal<FileStore>, args: SearchArgs) -> anyhow::Result<()> {
    let quality = |s: Option<String>| -> anyhow::Result<Option<u8>> {
        Ok(s.as_deref().map(entry::parse_rating).transpose()?.map(|r| r.value()))
    };
    let criteria = SearchCriteria {
        theme: args.theme.as_deref().map(str::parse::<Theme>).transpose()?,
        emotion: args.emotion,
        keyword: args.keyword,
        min_quality: quality(args.min_quality)?,
        max_quality: quality(args.max_quality)?,
        range: args.range.range()?,
    };
    let results = stats::search(journal.sleep_entries()?, &criteria);
    println!("{}", report::render_search_results(&results, &criteria));
    Ok(())
}

fn main() -> anyhow::Result<()> {
    init_logging();
    let cli = Cli::parse();

    let mut config = Config::load(cli.config.as_deref()).context("could not load configuration")?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    info!(data_dir = %config.data_dir.display(), "starting");

    let store = FileStore::open(&config.data_dir)
        .with_context(|| format!("could not open data directory {}", config.data_dir.display()))?;
    let mut journal = Journal::open(store);

    match cli.command.unwrap_or(Commands::Menu) {
        Commands::Menu => {
            let interactive = io::stdin().is_tty();
            let mut menu = Menu::new(journal, config, io::stdin().lock(), io::stdout()).interactive(interactive);
            menu.run()?;
        }
        Commands::Sleep(args) => record_sleep(&mut journal, args)?,
        Commands::Perf(args) => record_performance(&mut journal, args)?,
        Commands::History { count } => {
            let count = count.unwrap_or(config.recent_count);
            println!("{}", report::render_sleep_history(journal.recent_sleep(count)?));
            println!();
            println!("{}", report::render_performance_history(journal.recent_performance(count)?));
        }
        Commands::Report { save } => {
            let analysis = journal.analysis(config.recurring_threshold)?;
            let text = report::render_report(&analysis, Local::now().naive_local(), config.chart_width);
            println!("{}", text);
            if save {
                let path = journal.store().save_report(&text).context("could not save report")?;
                println!("\nReport saved to {}", path.display());
            }
        }
        Commands::Correlate => {
            let sleep = journal.sleep_entries()?;
            let performance = journal.performance_entries()?;
            let results = stats::correlate_all(sleep, performance);
            let by_sleep = stats::performance_by_sleep(sleep, performance);
            println!("{}", report::render_correlations(&results, &by_sleep));
        }
        Commands::Trend(args) => {
            let trend = stats::trend_window(
                journal.sleep_entries()?,
                journal.performance_entries()?,
                args.range()?,
                config.trend_window,
            );
            println!("{}", report::render_trend(&trend));
        }
        Commands::Themes { theme } => show_theme(&journal, theme.as_deref())?,
        Commands::Patterns(args) => {
            let entries = journal.sleep_entries()?;
            let range = args.range()?;
            let patterns = stats::dream_patterns(entries, range, config.recurring_threshold);
            let insights = stats::dream_insights(entries, range);
            let recommendations = themes::recommendations(patterns.frequency.top(3));
            println!("{}", report::render_dream_patterns(&patterns, &insights, &recommendations));
        }
        Commands::Search(args) => search(&journal, args)?,
        Commands::Stats => {
            let entries = journal.sleep_entries()?;
            let dreams = stats::dream_statistics(entries);
            let frequency = stats::theme_frequency(entries, &ThemeFilter::default());
            println!("{}", report::render_dream_statistics(&dreams, &frequency, config.chart_width));
        }
        Commands::Backup { list } => {
            if list {
                let backups = journal.store().list_backups()?;
                if backups.is_empty() {
                    println!("No backups yet.");
                }
                for id in backups {
                    println!("{}", id);
                }
            } else {
                let backup = journal.backup().context("backup failed")?;
                println!("Backup created: {} ({})", backup, backup.path.display());
            }
        }
    }

    Ok(())
}
