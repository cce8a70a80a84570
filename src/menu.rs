//! Interactive text menu. Reads answers line by line from any `BufRead` and
//! writes to any `Write`, so a session can be scripted.

use anyhow::Context;
use chrono::{Days, Local, NaiveDate};
use crossterm::cursor::MoveTo;
use crossterm::event::{self, Event, KeyCode};
use crossterm::execute;
use crossterm::terminal::{Clear, ClearType};
use std::io::{BufRead, Write};
use tracing::{debug, warn};

use crate::config::Config;
use crate::entry::{self, PerformanceEntry, SleepEntry};
use crate::error::JournalError;
use crate::journal::Journal;
use crate::report;
use crate::stats::{self, DateRange, SearchCriteria, ThemeFilter};
use crate::storage::{FileStore, Recorded};
use crate::themes::{self, Theme};

const OPTIONS: [&str; 12] = [
    "Record sleep",
    "Record performance",
    "View sleep history",
    "View performance history",
    "Generate analysis report",
    "Correlations & trends",
    "Advanced dream analysis",
    "Dream theme explorer",
    "Search dreams",
    "Dream statistics",
    "Backup data",
    "Exit",
];

/// Input ended before the session did.
#[derive(Debug, thiserror::Error)]
#[error("input closed")]
struct InputClosed;

pub struct Menu<R, W> {
    journal: Journal<FileStore>,
    config: Config,
    input: R,
    output: W,
    interactive: bool,
}

impl<R: BufRead, W: Write> Menu<R, W> {
    pub fn new(journal: Journal<FileStore>, config: Config, input: R, output: W) -> Self {
        Menu {
            journal,
            config,
            input,
            output,
            interactive: false,
        }
    }

    /// Clear the screen and wait for a key between screens.
    pub fn interactive(mut self, interactive: bool) -> Self {
        self.interactive = interactive;
        self
    }

    /// Runs until the user picks exit or input ends. Failures inside an
    /// option are reported and the menu is shown again.
    pub fn run(&mut self) -> anyhow::Result<()> {
        for problem in self.journal.unavailable() {
            writeln!(self.output, "Warning: {}. Options that need this data will report it.", problem)?;
        }
        loop {
            self.clear_screen()?;
            self.show_menu()?;
            let choice = match self.ask("Choose an option (1-12): ") {
                Ok(choice) => choice,
                Err(e) if e.is::<InputClosed>() => break,
                Err(e) => return Err(e),
            };

            let result = match choice.as_str() {
                "1" => self.record_sleep(),
                "2" => self.record_performance(),
                "3" => self.sleep_history(),
                "4" => self.performance_history(),
                "5" => self.analysis_report(),
                "6" => self.correlations(),
                "7" => self.dream_analysis(),
                "8" => self.theme_explorer(),
                "9" => self.search_dreams(),
                "10" => self.dream_statistics(),
                "11" => self.backup(),
                "12" => {
                    writeln!(self.output, "Sweet dreams!")?;
                    break;
                }
                other => {
                    debug!(choice = other, "unknown menu choice");
                    writeln!(self.output, "Invalid choice. Please enter a number from 1 to 12.")?;
                    Ok(())
                }
            };

            match result {
                Ok(()) => {}
                Err(e) if e.is::<InputClosed>() => break,
                Err(e) => {
                    warn!(error = %e, "menu action failed");
                    writeln!(self.output, "Error: {:#}", e)?;
                }
            }
            self.pause()?;
        }
        Ok(())
    }

    fn show_menu(&mut self) -> anyhow::Result<()> {
        self.title("SLEEP & DREAM JOURNAL")?;
        for (i, option) in OPTIONS.iter().enumerate() {
            writeln!(self.output, "{:>2}. {}", i + 1, option)?;
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Prompts
    // -----------------------------------------------------------------------

    fn ask(&mut self, label: &str) -> anyhow::Result<String> {
        write!(self.output, "{}", label)?;
        self.output.flush()?;
        let mut line = String::new();
        if self.input.read_line(&mut line)? == 0 {
            return Err(InputClosed.into());
        }
        Ok(line.trim().to_string())
    }

    /// Re-asks until `parse` accepts the answer. Only invalid input is retried.
    fn ask_until<T>(
        &mut self,
        label: &str,
        parse: impl Fn(&str) -> crate::error::Result<T>,
    ) -> anyhow::Result<T> {
        loop {
            let answer = self.ask(label)?;
            match parse(&answer) {
                Ok(value) => return Ok(value),
                Err(e) if e.is_invalid_input() => writeln!(self.output, "{}. Please try again.", e)?,
                Err(e) => return Err(e.into()),
            }
        }
    }

    fn ask_optional<T>(
        &mut self,
        label: &str,
        parse: impl Fn(&str) -> crate::error::Result<T>,
    ) -> anyhow::Result<Option<T>> {
        self.ask_until(label, |s| if s.is_empty() { Ok(None) } else { parse(s).map(Some) })
    }

    fn ask_date(&mut self, label: &str) -> anyhow::Result<NaiveDate> {
        let today = Local::now().date_naive();
        self.ask_until(label, |s| if s.is_empty() { Ok(today) } else { entry::parse_date(s) })
    }

    fn ask_yes(&mut self, label: &str) -> anyhow::Result<bool> {
        Ok(self.ask(label)?.eq_ignore_ascii_case("y"))
    }

    fn ask_range(&mut self) -> anyhow::Result<DateRange> {
        let from = self.ask_optional("Start date (YYYY-MM-DD, Enter for none): ", entry::parse_date)?;
        let to = self.ask_optional("End date (YYYY-MM-DD, Enter for none): ", entry::parse_date)?;
        Ok(DateRange::new(from, to))
    }

    // -----------------------------------------------------------------------
    // Screen handling
    // -----------------------------------------------------------------------

    fn title(&mut self, text: &str) -> anyhow::Result<()> {
        if self.interactive {
            writeln!(self.output, "\n\x1b[1;34m{}\x1b[0m", text)?;
        } else {
            writeln!(self.output, "\n{}", text)?;
        }
        Ok(())
    }

    fn clear_screen(&mut self) -> anyhow::Result<()> {
        if self.interactive {
            execute!(self.output, Clear(ClearType::All), MoveTo(0, 0))?;
        }
        Ok(())
    }

    fn pause(&mut self) -> anyhow::Result<()> {
        if !self.interactive {
            return Ok(());
        }
        writeln!(self.output, "\nPress any key to continue...")?;
        self.output.flush()?;
        loop {
            if let Event::Key(event) = event::read()? {
                if event.code != KeyCode::Null {
                    break;
                }
            }
        }
        Ok(())
    }

    fn recorded(&mut self, what: &str, date: NaiveDate, recorded: Recorded) -> anyhow::Result<()> {
        match recorded {
            Recorded::New => writeln!(self.output, "{} for {} recorded.", what, date)?,
            Recorded::Superseded => writeln!(self.output, "{} for {} updated; the earlier entry was replaced.", what, date)?,
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Options
    // -----------------------------------------------------------------------

    fn record_sleep(&mut self) -> anyhow::Result<()> {
        self.title("RECORD SLEEP")?;
        self.journal.sleep_entries()?;
        let date = self.ask_date("Date (YYYY-MM-DD, Enter for today): ")?;
        let bedtime = self.ask_until("Bedtime (HH:MM): ", entry::parse_time)?;
        let wake_time = self.ask_until("Wake time (HH:MM): ", entry::parse_time)?;
        let quality = self.ask_until("Sleep quality (1-10): ", entry::parse_rating)?;

        let mut night = SleepEntry::new(date, bedtime, wake_time, quality);
        if self.ask_yes("Did you have any dreams? (y/n): ")? {
            let text = self.ask("Describe your dream: ")?;
            let emotions = entry::parse_emotions(&self.ask("Emotions felt (comma separated): ")?);
            night = night.with_dream(&text, emotions);
        }

        let recorded = self
            .journal
            .record_sleep(night.clone())
            .context("could not save sleep entry")?;
        self.recorded("Sleep entry", date, recorded)?;
        writeln!(
            self.output,
            "Slept {}",
            report::format_duration(night.sleep_duration())
        )?;
        if night.had_dream() {
            writeln!(self.output, "\n{}", report::render_dream_analysis(&night))?;
        }
        Ok(())
    }

    fn record_performance(&mut self) -> anyhow::Result<()> {
        self.title("RECORD PERFORMANCE")?;
        self.journal.performance_entries()?;
        let date = self.ask_date("Date (YYYY-MM-DD, Enter for today): ")?;
        let productivity = self.ask_until("Productivity (1-10): ", entry::parse_rating)?;
        let mood = self.ask_until("Mood (1-10): ", entry::parse_rating)?;
        let energy = self.ask_until("Energy (1-10): ", entry::parse_rating)?;
        let stress = self.ask_until("Stress (1-10): ", entry::parse_rating)?;

        let mut day = PerformanceEntry::new(date, mood, energy, productivity, stress);
        day.activities = self.ask("Activities (optional): ")?;
        day.notes = self.ask("Notes (optional): ")?;

        let score = day.overall_score();
        let recorded = self
            .journal
            .record_performance(day)
            .context("could not save performance entry")?;
        self.recorded("Performance entry", date, recorded)?;
        writeln!(self.output, "Overall score: {:.1}/10", score)?;
        Ok(())
    }

    fn sleep_history(&mut self) -> anyhow::Result<()> {
        let recent = self.journal.recent_sleep(self.config.recent_count)?;
        let text = report::render_sleep_history(recent);
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn performance_history(&mut self) -> anyhow::Result<()> {
        let recent = self.journal.recent_performance(self.config.recent_count)?;
        let text = report::render_performance_history(recent);
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn analysis_report(&mut self) -> anyhow::Result<()> {
        let analysis = self.journal.analysis(self.config.recurring_threshold)?;
        let text = report::render_report(&analysis, Local::now().naive_local(), self.config.chart_width);
        writeln!(self.output, "{}", text)?;

        if self.ask_yes("\nSave report to file? (y/n): ")? {
            let path = self
                .journal
                .store()
                .save_report(&text)
                .context("could not save report")?;
            writeln!(self.output, "Report saved to {}", path.display())?;
        }
        Ok(())
    }

    fn correlations(&mut self) -> anyhow::Result<()> {
        let sleep = self.journal.sleep_entries()?;
        let performance = self.journal.performance_entries()?;
        let results = stats::correlate_all(sleep, performance);
        let by_sleep = stats::performance_by_sleep(sleep, performance);
        let mut text = report::render_correlations(&results, &by_sleep);

        let latest = sleep
            .last()
            .map(|e| e.date())
            .into_iter()
            .chain(performance.last().map(|e| e.date))
            .max();
        if let Some(latest) = latest {
            let days = self.config.trend_window.saturating_sub(1) as u64;
            let range = DateRange::new(latest.checked_sub_days(Days::new(days)), Some(latest));
            let trend = stats::trend_window(sleep, performance, range, self.config.trend_window);
            text.push_str("\n\n");
            text.push_str(&report::render_trend(&trend));
        }
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn dream_analysis(&mut self) -> anyhow::Result<()> {
        self.title("ADVANCED DREAM ANALYSIS")?;
        self.journal.sleep_entries()?;
        let range = self.ask_range()?;
        let entries = self.journal.sleep_entries()?;
        let patterns = stats::dream_patterns(entries, range, self.config.recurring_threshold);
        let insights = stats::dream_insights(entries, range);
        let recommendations = themes::recommendations(patterns.frequency.top(3));
        let text = report::render_dream_patterns(&patterns, &insights, &recommendations);
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn theme_explorer(&mut self) -> anyhow::Result<()> {
        let frequency = stats::theme_frequency(self.journal.sleep_entries()?, &ThemeFilter::default());
        writeln!(self.output, "{}", report::render_theme_catalog(&frequency))?;

        let theme = self.ask_optional("\nTheme to explore (name or number, Enter for a random tip): ", |s| {
            match s.parse::<usize>() {
                Ok(n) if (1..=Theme::ALL.len()).contains(&n) => Ok(Theme::ALL[n - 1]),
                Ok(n) => Err(JournalError::invalid(format!("pick a theme from 1 to {}, not {}", Theme::ALL.len(), n))),
                Err(_) => s.parse::<Theme>(),
            }
        })?;

        match theme {
            Some(theme) => writeln!(self.output, "\n{}", report::render_theme_detail(theme, &frequency))?,
            None => {
                if let Some((theme, tip)) = themes::random_tip(&mut rand::thread_rng()) {
                    writeln!(self.output, "\nTip ({}): {}", theme, tip)?;
                }
            }
        }
        Ok(())
    }

    fn search_dreams(&mut self) -> anyhow::Result<()> {
        self.title("SEARCH DREAMS")?;
        self.journal.sleep_entries()?;
        let theme = self.ask_optional("Theme (Enter to skip): ", |s| s.parse::<Theme>())?;
        let emotion = Some(self.ask("Emotion (Enter to skip): ")?).filter(|s| !s.is_empty());
        let keyword = Some(self.ask("Keyword (Enter to skip): ")?).filter(|s| !s.is_empty());
        let min_quality = self.ask_optional("Minimum quality (1-10, Enter to skip): ", |s| {
            entry::parse_rating(s).map(|r| r.value())
        })?;
        let max_quality = self.ask_optional("Maximum quality (1-10, Enter to skip): ", |s| {
            entry::parse_rating(s).map(|r| r.value())
        })?;
        let range = self.ask_range()?;

        let criteria = SearchCriteria {
            theme,
            emotion,
            keyword,
            min_quality,
            max_quality,
            range,
        };
        let results = stats::search(self.journal.sleep_entries()?, &criteria);
        writeln!(self.output, "{}", report::render_search_results(&results, &criteria))?;
        Ok(())
    }

    fn dream_statistics(&mut self) -> anyhow::Result<()> {
        let entries = self.journal.sleep_entries()?;
        let dreams = stats::dream_statistics(entries);
        let frequency = stats::theme_frequency(entries, &ThemeFilter::default());
        let text = report::render_dream_statistics(&dreams, &frequency, self.config.chart_width);
        writeln!(self.output, "{}", text)?;
        Ok(())
    }

    fn backup(&mut self) -> anyhow::Result<()> {
        let backup = self.journal.backup().context("backup failed")?;
        writeln!(self.output, "Backup created: {} ({})", backup, backup.path.display())?;
        Ok(())
    }
}
