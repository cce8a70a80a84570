use chrono::NaiveDate;
use std::path::PathBuf;
use tracing::{info, warn};

use crate::entry::{PerformanceEntry, Rating, SleepEntry};
use crate::error::{JournalError, Result};
use crate::stats::{
    self, CorrelationResult, DateRange, DreamPatterns, DreamStatistics, PerformanceBySleep, Summary,
};
use crate::storage::{BackupId, Dated, JournalStore, Recorded};
use crate::themes::{self, Recommendation};

/// One collection as last read from the store. An unreadable collection
/// fails the operations that need it and leaves the other one usable.
#[derive(Debug)]
enum Loaded<T> {
    Entries(Vec<T>),
    Unavailable { path: PathBuf, reason: String },
}

impl<T> Loaded<T> {
    fn from_load(result: Result<Vec<T>>) -> Self {
        match result {
            Ok(entries) => Loaded::Entries(entries),
            Err(JournalError::DataUnavailable { path, reason }) => {
                warn!(path = %path.display(), %reason, "collection unavailable");
                Loaded::Unavailable { path, reason }
            }
            Err(e) => {
                warn!(error = %e, "collection unavailable");
                Loaded::Unavailable {
                    path: PathBuf::new(),
                    reason: e.to_string(),
                }
            }
        }
    }

    fn entries(&self) -> Result<&[T]> {
        match self {
            Loaded::Entries(entries) => Ok(entries),
            Loaded::Unavailable { path, reason } => Err(JournalError::DataUnavailable {
                path: path.clone(),
                reason: reason.clone(),
            }),
        }
    }
}

/// In-memory view of both collections, kept in step with the store.
pub struct Journal<S: JournalStore> {
    store: S,
    sleep: Loaded<SleepEntry>,
    performance: Loaded<PerformanceEntry>,
}

impl<S: JournalStore> Journal<S> {
    /// Never fails: a collection that cannot be read is reported by the
    /// operations that use it.
    pub fn open(store: S) -> Self {
        let sleep = Loaded::from_load(store.load_sleep_entries());
        let performance = Loaded::from_load(store.load_performance_entries());
        info!("journal opened");
        Journal {
            store,
            sleep,
            performance,
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Load errors for the collections that could not be read.
    pub fn unavailable(&self) -> Vec<JournalError> {
        [self.sleep.entries().err(), self.performance.entries().err()]
            .into_iter()
            .flatten()
            .collect()
    }

    pub fn sleep_entries(&self) -> Result<&[SleepEntry]> {
        self.sleep.entries()
    }

    pub fn performance_entries(&self) -> Result<&[PerformanceEntry]> {
        self.performance.entries()
    }

    pub fn recent_sleep(&self, count: usize) -> Result<&[SleepEntry]> {
        let entries = self.sleep.entries()?;
        Ok(&entries[entries.len().saturating_sub(count)..])
    }

    pub fn recent_performance(&self, count: usize) -> Result<&[PerformanceEntry]> {
        let entries = self.performance.entries()?;
        Ok(&entries[entries.len().saturating_sub(count)..])
    }

    pub fn sleep_on(&self, date: NaiveDate) -> Result<Option<&SleepEntry>> {
        Ok(self.sleep.entries()?.iter().find(|e| e.date() == date))
    }

    /// Persist first, then mirror into memory, so a failed write leaves the
    /// in-memory view matching what is on disk.
    pub fn record_sleep(&mut self, entry: SleepEntry) -> Result<Recorded> {
        let recorded = self.store.append_sleep_entry(entry.clone())?;
        match &mut self.sleep {
            Loaded::Entries(entries) => upsert(entries, entry),
            Loaded::Unavailable { .. } => self.sleep = Loaded::from_load(self.store.load_sleep_entries()),
        }
        Ok(recorded)
    }

    pub fn record_performance(&mut self, entry: PerformanceEntry) -> Result<Recorded> {
        let recorded = self.store.append_performance_entry(entry.clone())?;
        match &mut self.performance {
            Loaded::Entries(entries) => upsert(entries, entry),
            Loaded::Unavailable { .. } => {
                self.performance = Loaded::from_load(self.store.load_performance_entries())
            }
        }
        Ok(recorded)
    }

    /// Copies whatever is on disk, readable or not.
    pub fn backup(&self) -> Result<BackupId> {
        self.store.backup()
    }

    pub fn analysis(&self, recurring_threshold: f64) -> Result<Analysis> {
        Ok(Analysis::compute(
            self.sleep.entries()?,
            self.performance.entries()?,
            recurring_threshold,
        ))
    }
}

fn upsert<T: Dated>(entries: &mut Vec<T>, entry: T) {
    let date = entry.date();
    entries.retain(|e| e.date() != date);
    let at = entries.partition_point(|e| e.date() < date);
    entries.insert(at, entry);
}

/// Everything the full report shows, computed in one pass over the journal.
#[derive(Debug, Clone)]
pub struct Analysis {
    pub sleep_count: usize,
    pub performance_count: usize,
    pub period: Option<(NaiveDate, NaiveDate)>,
    pub quality: Summary,
    pub duration: Summary,
    pub quality_distribution: Vec<(&'static str, usize)>,
    pub duration_distribution: Vec<(&'static str, usize)>,
    pub best_sleep: Option<(NaiveDate, Rating)>,
    pub worst_sleep: Option<(NaiveDate, Rating)>,
    pub mood: Summary,
    pub energy: Summary,
    pub productivity: Summary,
    pub stress: Summary,
    pub overall: Summary,
    pub performance_distribution: Vec<(&'static str, usize)>,
    pub best_performance: Option<(NaiveDate, f64)>,
    pub worst_performance: Option<(NaiveDate, f64)>,
    pub dreams: DreamStatistics,
    pub patterns: DreamPatterns,
    pub recent_dreams: Vec<(NaiveDate, String)>,
    pub correlations: Vec<CorrelationResult>,
    pub by_sleep: PerformanceBySleep,
    pub recommendations: Vec<Recommendation>,
    pub advice: Vec<&'static str>,
}

impl Analysis {
    pub fn compute(sleep: &[SleepEntry], performance: &[PerformanceEntry], recurring_threshold: f64) -> Self {
        use stats::{PerformanceMetric as P, SleepMetric as S};

        let sleep_values = |m: S| -> Vec<f64> { sleep.iter().map(|e| m.value(e)).collect() };
        let perf_summary = |m: P| -> Summary {
            let values: Vec<f64> = performance.iter().map(|e| m.value(e)).collect();
            stats::summarize(&values)
        };

        let period = match (sleep.iter().map(|e| e.date()).min(), sleep.iter().map(|e| e.date()).max()) {
            (Some(first), Some(last)) => Some((first, last)),
            _ => None,
        };

        let best_sleep = stats::best_sleep_days(sleep, 1).first().map(|e| (e.date(), e.quality()));
        // Lowest quality, earliest date among equals.
        let worst_sleep = sleep
            .iter()
            .min_by_key(|e| (e.quality(), e.date()))
            .map(|e| (e.date(), e.quality()));
        let best_performance = stats::best_performance_days(performance, 1)
            .first()
            .map(|e| (e.date, e.overall_score()));
        let worst_performance = performance
            .iter()
            .min_by(|a, b| {
                a.overall_score()
                    .total_cmp(&b.overall_score())
                    .then_with(|| a.date.cmp(&b.date))
            })
            .map(|e| (e.date, e.overall_score()));

        let recent_dreams = sleep
            .iter()
            .rev()
            .take(10)
            .filter_map(|e| e.dream_text().map(|t| (e.date(), t.to_string())))
            .take(3)
            .collect::<Vec<_>>()
            .into_iter()
            .rev()
            .collect();

        let patterns = stats::dream_patterns(sleep, DateRange::all(), recurring_threshold);
        let recommendations = themes::recommendations(patterns.frequency.top(3));

        let mut analysis = Analysis {
            sleep_count: sleep.len(),
            performance_count: performance.len(),
            period,
            quality: stats::summarize(&sleep_values(S::Quality)),
            duration: stats::summarize(&sleep_values(S::Duration)),
            quality_distribution: stats::quality_distribution(sleep),
            duration_distribution: stats::duration_distribution(sleep),
            best_sleep,
            worst_sleep,
            mood: perf_summary(P::Mood),
            energy: perf_summary(P::Energy),
            productivity: perf_summary(P::Productivity),
            stress: perf_summary(P::Stress),
            overall: perf_summary(P::Overall),
            performance_distribution: stats::performance_distribution(performance),
            best_performance,
            worst_performance,
            dreams: stats::dream_statistics(sleep),
            patterns,
            recent_dreams,
            correlations: stats::correlate_all(sleep, performance),
            by_sleep: stats::performance_by_sleep(sleep, performance),
            recommendations,
            advice: Vec::new(),
        };
        analysis.advice = lifestyle_advice(&analysis);
        analysis
    }

    pub fn data_quality(&self) -> &'static str {
        match self.sleep_count {
            n if n >= 7 => "Good",
            n if n >= 3 => "Limited",
            _ => "Insufficient",
        }
    }
}

fn lifestyle_advice(a: &Analysis) -> Vec<&'static str> {
    let mut advice = Vec::new();

    if !a.quality.is_empty() {
        if a.quality.mean < 6.0 {
            advice.push("Focus on improving sleep quality - consider sleep hygiene practices");
        }
        if a.duration.mean < 7.0 {
            advice.push("Aim for 7-9 hours of sleep per night for optimal performance");
        } else if a.duration.mean > 9.0 {
            advice.push("Consider if you're oversleeping - 7-9 hours is typically optimal");
        }
        if a.dreams.dream_frequency > 80.0 {
            advice.push("High dream recall - consider keeping a detailed dream journal");
        } else if a.dreams.dream_frequency < 20.0 {
            advice.push("Low dream recall - try meditation or stress reduction techniques");
        }
    }

    if !a.stress.is_empty() {
        if a.stress.mean > 7.0 {
            advice.push("High stress levels detected - consider stress management techniques");
        }
        if a.energy.mean < 5.0 {
            advice.push("Low energy levels - review sleep schedule and consider exercise");
        }
        if a.productivity.mean < 6.0 {
            advice.push("Focus on productivity optimization - analyze your peak performance times");
        }
    }

    if a.sleep_count < 14 {
        advice.push("Continue logging data for at least 2 weeks for meaningful insights");
    }
    if a.performance_count < a.sleep_count {
        advice.push("Log performance data consistently with sleep data for better correlations");
    }

    if advice.is_empty() {
        advice.push("Great job maintaining consistent sleep and performance tracking!");
        advice.push("Continue monitoring patterns for long-term insights");
    }
    advice
}
