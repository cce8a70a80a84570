//! Aggregations over journal entries. Every function here is total: empty
//! input produces an empty or "insufficient data" value, never an error.

use chrono::{Datelike, NaiveDate, Weekday};
use itertools::Itertools;
use std::cmp::Reverse;
use std::collections::{BTreeMap, HashMap};
use std::fmt;

use crate::entry::{PerformanceEntry, SleepEntry};
use crate::themes::Theme;

/// Fewest date-matched days for the good/poor sleep comparison.
pub const MIN_COMPARISON_DAYS: usize = 3;
/// Below this absolute coefficient a correlation has no direction.
pub const NO_CORRELATION_BELOW: f64 = 0.1;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn new(from: Option<NaiveDate>, to: Option<NaiveDate>) -> Self {
        DateRange { from, to }
    }

    pub fn all() -> Self {
        DateRange::default()
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    pub fn is_unbounded(&self) -> bool {
        self.from.is_none() && self.to.is_none()
    }
}

fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        None
    } else {
        Some(values.iter().sum::<f64>() / values.len() as f64)
    }
}

// ---------------------------------------------------------------------------
// Theme frequency
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default)]
pub struct ThemeFilter {
    pub range: DateRange,
    pub theme: Option<Theme>,
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ThemeFrequency {
    /// Nights in range that have dream text.
    pub dream_nights: usize,
    /// Most frequent first; equal counts in catalog order.
    pub counts: Vec<(Theme, usize)>,
}

impl ThemeFrequency {
    pub fn most_common(&self) -> Option<(Theme, usize)> {
        self.counts.first().copied()
    }

    pub fn top(&self, n: usize) -> &[(Theme, usize)] {
        &self.counts[..n.min(self.counts.len())]
    }

    pub fn count(&self, theme: Theme) -> usize {
        self.counts
            .iter()
            .find(|(t, _)| *t == theme)
            .map_or(0, |(_, c)| *c)
    }

    /// Themes present in at least `threshold` (0-1) of dream nights, with
    /// their share as a percentage.
    pub fn recurring(&self, threshold: f64) -> Vec<(Theme, usize, f64)> {
        if self.dream_nights == 0 {
            return Vec::new();
        }
        self.counts
            .iter()
            .map(|&(theme, count)| (theme, count, count as f64 / self.dream_nights as f64))
            .filter(|&(_, _, share)| share >= threshold)
            .map(|(theme, count, share)| (theme, count, share * 100.0))
            .collect()
    }
}

/// Count, per theme, the dream nights on which it was detected.
pub fn theme_frequency(entries: &[SleepEntry], filter: &ThemeFilter) -> ThemeFrequency {
    let nights: Vec<&SleepEntry> = entries
        .iter()
        .filter(|e| e.had_dream() && filter.range.contains(e.date()))
        .collect();

    let counts = nights
        .iter()
        .flat_map(|e| e.themes().iter().map(|m| m.theme))
        .filter(|theme| filter.theme.is_none_or(|wanted| wanted == *theme))
        .counts()
        .into_iter()
        .sorted_by_key(|&(theme, count)| (Reverse(count), theme))
        .collect();

    ThemeFrequency {
        dream_nights: nights.len(),
        counts,
    }
}

// ---------------------------------------------------------------------------
// Search
// ---------------------------------------------------------------------------

/// All set fields must hold for an entry to match.
#[derive(Debug, Clone, Default)]
pub struct SearchCriteria {
    pub theme: Option<Theme>,
    pub emotion: Option<String>,
    pub keyword: Option<String>,
    pub min_quality: Option<u8>,
    pub max_quality: Option<u8>,
    pub range: DateRange,
}

impl SearchCriteria {
    pub fn is_empty(&self) -> bool {
        self.theme.is_none()
            && self.emotion.is_none()
            && self.keyword.is_none()
            && self.min_quality.is_none()
            && self.max_quality.is_none()
            && self.range.is_unbounded()
    }

    pub fn matches(&self, entry: &SleepEntry) -> bool {
        if !self.range.contains(entry.date()) {
            return false;
        }
        let quality = entry.quality().value();
        if self.min_quality.is_some_and(|min| quality < min) {
            return false;
        }
        if self.max_quality.is_some_and(|max| quality > max) {
            return false;
        }
        if let Some(theme) = self.theme {
            if !entry.themes().iter().any(|m| m.theme == theme) {
                return false;
            }
        }
        if let Some(emotion) = &self.emotion {
            let emotion = emotion.trim().to_lowercase();
            if !entry.dream_emotions().iter().any(|e| e.to_lowercase() == emotion) {
                return false;
            }
        }
        if let Some(keyword) = &self.keyword {
            let keyword = keyword.trim().to_lowercase();
            let found = entry
                .dream_text()
                .is_some_and(|text| text.to_lowercase().contains(&keyword));
            if !found {
                return false;
            }
        }
        true
    }
}

pub fn search<'a>(entries: &'a [SleepEntry], criteria: &SearchCriteria) -> Vec<&'a SleepEntry> {
    entries
        .iter()
        .filter(|e| criteria.matches(e))
        .sorted_by_key(|e| e.date())
        .collect()
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SleepMetric {
    Quality,
    Duration,
}

impl SleepMetric {
    pub const ALL: [SleepMetric; 2] = [SleepMetric::Quality, SleepMetric::Duration];

    pub fn value(self, entry: &SleepEntry) -> f64 {
        match self {
            SleepMetric::Quality => f64::from(entry.quality().value()),
            SleepMetric::Duration => entry.sleep_duration(),
        }
    }
}

impl fmt::Display for SleepMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            SleepMetric::Quality => "sleep quality",
            SleepMetric::Duration => "sleep duration",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PerformanceMetric {
    Mood,
    Energy,
    Productivity,
    Stress,
    Overall,
}

impl PerformanceMetric {
    pub const ALL: [PerformanceMetric; 5] = [
        PerformanceMetric::Mood,
        PerformanceMetric::Energy,
        PerformanceMetric::Productivity,
        PerformanceMetric::Stress,
        PerformanceMetric::Overall,
    ];

    pub fn value(self, entry: &PerformanceEntry) -> f64 {
        match self {
            PerformanceMetric::Mood => f64::from(entry.mood.value()),
            PerformanceMetric::Energy => f64::from(entry.energy.value()),
            PerformanceMetric::Productivity => f64::from(entry.productivity.value()),
            PerformanceMetric::Stress => f64::from(entry.stress.value()),
            PerformanceMetric::Overall => entry.overall_score(),
        }
    }
}

impl fmt::Display for PerformanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            PerformanceMetric::Mood => "mood",
            PerformanceMetric::Energy => "energy",
            PerformanceMetric::Productivity => "productivity",
            PerformanceMetric::Stress => "stress",
            PerformanceMetric::Overall => "overall performance",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Positive,
    Negative,
    None,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Direction::Positive => "positive",
            Direction::Negative => "negative",
            Direction::None => "none",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Correlation {
    InsufficientData {
        paired: usize,
    },
    Indicator {
        direction: Direction,
        /// |r|, 0.0 to 1.0
        strength: f64,
        coefficient: f64,
        sample_size: usize,
    },
}

impl Correlation {
    pub fn direction(&self) -> Option<Direction> {
        match self {
            Correlation::Indicator { direction, .. } => Some(*direction),
            Correlation::InsufficientData { .. } => None,
        }
    }

    pub fn strength_label(&self) -> &'static str {
        match self {
            Correlation::InsufficientData { .. } => "insufficient data",
            Correlation::Indicator { strength, .. } if *strength >= 0.7 => "strong",
            Correlation::Indicator { strength, .. } if *strength >= 0.4 => "moderate",
            Correlation::Indicator { strength, .. } if *strength >= NO_CORRELATION_BELOW => "weak",
            Correlation::Indicator { .. } => "negligible",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CorrelationResult {
    pub sleep_metric: SleepMetric,
    pub performance_metric: PerformanceMetric,
    pub correlation: Correlation,
}

/// Pearson coefficient. `None` when either series has no variance.
pub fn pearson(xs: &[f64], ys: &[f64]) -> Option<f64> {
    let n = xs.len().min(ys.len());
    if n < 2 {
        return None;
    }
    let nf = n as f64;
    let mx = xs[..n].iter().sum::<f64>() / nf;
    let my = ys[..n].iter().sum::<f64>() / nf;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in xs.iter().zip(ys) {
        let dx = x - mx;
        let dy = y - my;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    let denom = (var_x * var_y).sqrt();
    if denom < 1e-12 {
        None
    } else {
        Some((cov / denom).clamp(-1.0, 1.0))
    }
}

/// Correlation indicator over already-paired points.
pub fn correlate_pairs(pairs: &[(f64, f64)]) -> Correlation {
    if pairs.len() < 2 {
        return Correlation::InsufficientData { paired: pairs.len() };
    }
    let (xs, ys): (Vec<f64>, Vec<f64>) = pairs.iter().copied().unzip();

    // Identical series are perfectly associated even when flat.
    let coefficient = if xs == ys {
        1.0
    } else {
        pearson(&xs, &ys).unwrap_or(0.0)
    };
    let direction = if coefficient.abs() < NO_CORRELATION_BELOW {
        Direction::None
    } else if coefficient > 0.0 {
        Direction::Positive
    } else {
        Direction::Negative
    };

    Correlation::Indicator {
        direction,
        strength: coefficient.abs(),
        coefficient,
        sample_size: pairs.len(),
    }
}

/// Values of both metrics for every date present in both collections, in
/// date order. A date recorded twice uses its latest entry.
pub fn pair_by_date(
    sleep: &[SleepEntry],
    performance: &[PerformanceEntry],
    sleep_metric: SleepMetric,
    performance_metric: PerformanceMetric,
) -> Vec<(f64, f64)> {
    let by_date: HashMap<NaiveDate, &PerformanceEntry> =
        performance.iter().map(|p| (p.date, p)).collect();
    let sleep_by_date: BTreeMap<NaiveDate, &SleepEntry> = sleep.iter().map(|s| (s.date(), s)).collect();

    sleep_by_date
        .into_iter()
        .filter_map(|(date, s)| {
            by_date
                .get(&date)
                .map(|p| (sleep_metric.value(s), performance_metric.value(p)))
        })
        .collect()
}

pub fn correlate(
    sleep: &[SleepEntry],
    performance: &[PerformanceEntry],
    sleep_metric: SleepMetric,
    performance_metric: PerformanceMetric,
) -> CorrelationResult {
    let pairs = pair_by_date(sleep, performance, sleep_metric, performance_metric);
    CorrelationResult {
        sleep_metric,
        performance_metric,
        correlation: correlate_pairs(&pairs),
    }
}

/// Every sleep metric against every performance metric.
pub fn correlate_all(sleep: &[SleepEntry], performance: &[PerformanceEntry]) -> Vec<CorrelationResult> {
    SleepMetric::ALL
        .iter()
        .cartesian_product(PerformanceMetric::ALL.iter())
        .map(|(&s, &p)| correlate(sleep, performance, s, p))
        .collect()
}

/// Mean overall performance split by how the night before went.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PerformanceBySleep {
    pub matched_days: usize,
    /// Sleep quality 7 or better.
    pub good_sleep: Option<f64>,
    /// Sleep quality 4 or worse.
    pub poor_sleep: Option<f64>,
    pub with_dreams: Option<f64>,
    pub without_dreams: Option<f64>,
}

impl PerformanceBySleep {
    pub fn is_sufficient(&self) -> bool {
        self.matched_days >= MIN_COMPARISON_DAYS
    }
}

fn scores_where(matched: &[(&SleepEntry, f64)], pred: impl Fn(&SleepEntry) -> bool) -> Vec<f64> {
    matched
        .iter()
        .filter(|(entry, _)| pred(*entry))
        .map(|(_, score)| *score)
        .collect()
}

pub fn performance_by_sleep(sleep: &[SleepEntry], performance: &[PerformanceEntry]) -> PerformanceBySleep {
    let by_date: HashMap<NaiveDate, &PerformanceEntry> =
        performance.iter().map(|p| (p.date, p)).collect();
    let matched: Vec<(&SleepEntry, f64)> = sleep
        .iter()
        .filter_map(|s| by_date.get(&s.date()).map(|p| (s, p.overall_score())))
        .collect();

    let mut result = PerformanceBySleep {
        matched_days: matched.len(),
        ..Default::default()
    };
    if !result.is_sufficient() {
        return result;
    }

    result.good_sleep = mean(&scores_where(&matched, |s| s.quality().value() >= 7));
    result.poor_sleep = mean(&scores_where(&matched, |s| s.quality().value() <= 4));

    let with = scores_where(&matched, |s| s.had_dream());
    let without = scores_where(&matched, |s| !s.had_dream());
    // Only meaningful as a comparison.
    if !with.is_empty() && !without.is_empty() {
        result.with_dreams = mean(&with);
        result.without_dreams = mean(&without);
    }
    result
}

// ---------------------------------------------------------------------------
// Trends
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrendDirection {
    Improving,
    Declining,
    Stable,
    InsufficientData,
}

impl fmt::Display for TrendDirection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            TrendDirection::Improving => "Improving",
            TrendDirection::Declining => "Declining",
            TrendDirection::Stable => "Stable",
            TrendDirection::InsufficientData => "Insufficient data",
        })
    }
}

/// Compares each value with the one before it; more rises than falls is
/// improving, more falls is declining.
pub fn trend_direction(values: &[f64]) -> TrendDirection {
    if values.len() < 2 {
        return TrendDirection::InsufficientData;
    }
    let (ups, downs) = values
        .iter()
        .tuple_windows()
        .fold((0, 0), |(ups, downs), (a, b)| {
            if b > a {
                (ups + 1, downs)
            } else if b < a {
                (ups, downs + 1)
            } else {
                (ups, downs)
            }
        });
    match ups.cmp(&downs) {
        std::cmp::Ordering::Greater => TrendDirection::Improving,
        std::cmp::Ordering::Less => TrendDirection::Declining,
        std::cmp::Ordering::Equal => TrendDirection::Stable,
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Summary {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub trend: TrendDirection,
}

impl Summary {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }
}

/// Zeros and `InsufficientData` for an empty series.
pub fn summarize(values: &[f64]) -> Summary {
    match values.iter().copied().minmax().into_option() {
        None => Summary {
            count: 0,
            min: 0.0,
            max: 0.0,
            mean: 0.0,
            trend: TrendDirection::InsufficientData,
        },
        Some((min, max)) => Summary {
            count: values.len(),
            min,
            max,
            mean: mean(values).unwrap_or(0.0),
            trend: trend_direction(values),
        },
    }
}

/// Means of each full window, oldest first. Empty when the series is shorter
/// than the window.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if window == 0 {
        return Vec::new();
    }
    values
        .windows(window)
        .map(|w| w.iter().sum::<f64>() / window as f64)
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct TrendWindow {
    pub range: DateRange,
    pub sleep_quality: Summary,
    pub sleep_duration: Summary,
    pub mood: Summary,
    pub energy: Summary,
    pub productivity: Summary,
    pub overall: Summary,
    pub quality_moving_average: Vec<f64>,
}

pub fn trend_window(
    sleep: &[SleepEntry],
    performance: &[PerformanceEntry],
    range: DateRange,
    window: usize,
) -> TrendWindow {
    let sleep: Vec<&SleepEntry> = sleep
        .iter()
        .filter(|e| range.contains(e.date()))
        .sorted_by_key(|e| e.date())
        .collect();
    let performance: Vec<&PerformanceEntry> = performance
        .iter()
        .filter(|e| range.contains(e.date))
        .sorted_by_key(|e| e.date)
        .collect();

    let quality: Vec<f64> = sleep.iter().map(|e| SleepMetric::Quality.value(e)).collect();
    let duration: Vec<f64> = sleep.iter().map(|e| SleepMetric::Duration.value(e)).collect();
    let perf = |metric: PerformanceMetric| -> Summary {
        let values: Vec<f64> = performance.iter().map(|e| metric.value(e)).collect();
        summarize(&values)
    };

    TrendWindow {
        range,
        sleep_quality: summarize(&quality),
        sleep_duration: summarize(&duration),
        mood: perf(PerformanceMetric::Mood),
        energy: perf(PerformanceMetric::Energy),
        productivity: perf(PerformanceMetric::Productivity),
        overall: perf(PerformanceMetric::Overall),
        quality_moving_average: moving_average(&quality, window),
    }
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

pub fn quality_distribution(entries: &[SleepEntry]) -> Vec<(&'static str, usize)> {
    const BUCKETS: [&str; 5] = ["1-2", "3-4", "5-6", "7-8", "9-10"];
    let mut counts = [0usize; 5];
    for e in entries {
        counts[(usize::from(e.quality().value()) - 1) / 2] += 1;
    }
    BUCKETS.into_iter().zip(counts).collect()
}

pub fn duration_distribution(entries: &[SleepEntry]) -> Vec<(&'static str, usize)> {
    const BUCKETS: [&str; 5] = ["<6h", "6-7h", "7-8h", "8-9h", ">9h"];
    let mut counts = [0usize; 5];
    for e in entries {
        let hours = e.sleep_duration();
        let idx = if hours < 6.0 {
            0
        } else if hours < 7.0 {
            1
        } else if hours < 8.0 {
            2
        } else if hours < 9.0 {
            3
        } else {
            4
        };
        counts[idx] += 1;
    }
    BUCKETS.into_iter().zip(counts).collect()
}

pub fn performance_distribution(entries: &[PerformanceEntry]) -> Vec<(&'static str, usize)> {
    const BUCKETS: [&str; 3] = ["Low (1-3)", "Medium (4-6)", "High (7-10)"];
    let mut counts = [0usize; 3];
    for e in entries {
        let score = e.overall_score();
        let idx = if score <= 3.0 {
            0
        } else if score <= 6.0 {
            1
        } else {
            2
        };
        counts[idx] += 1;
    }
    BUCKETS.into_iter().zip(counts).collect()
}

// ---------------------------------------------------------------------------
// Dreams
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DreamStatistics {
    pub total_nights: usize,
    pub dream_nights: usize,
    /// Percentage of nights with a recorded dream.
    pub dream_frequency: f64,
    pub quality_with_dreams: Option<f64>,
    pub quality_without_dreams: Option<f64>,
    /// Five most frequent, most frequent first.
    pub top_emotions: Vec<(String, usize)>,
    pub mean_dream_words: f64,
    pub total_emotions: usize,
    pub unique_emotions: usize,
}

pub fn dream_statistics(entries: &[SleepEntry]) -> DreamStatistics {
    let total_nights = entries.len();
    let (dreams, no_dreams): (Vec<&SleepEntry>, Vec<&SleepEntry>) =
        entries.iter().partition(|e| e.had_dream());
    if total_nights == 0 {
        return DreamStatistics::default();
    }

    let qualities =
        |set: &[&SleepEntry]| -> Vec<f64> { set.iter().map(|e| f64::from(e.quality().value())).collect() };
    let emotions: Vec<String> = dreams
        .iter()
        .flat_map(|e| e.dream_emotions().iter().map(|s| s.to_lowercase()))
        .collect();
    let emotion_counts = emotions.iter().cloned().counts();
    let top_emotions = emotion_counts
        .iter()
        .map(|(e, c)| (e.clone(), *c))
        .sorted_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)))
        .take(5)
        .collect();
    let words: Vec<f64> = dreams.iter().map(|e| e.dream_word_count() as f64).collect();

    DreamStatistics {
        total_nights,
        dream_nights: dreams.len(),
        dream_frequency: dreams.len() as f64 / total_nights as f64 * 100.0,
        quality_with_dreams: mean(&qualities(&dreams)),
        quality_without_dreams: mean(&qualities(&no_dreams)),
        top_emotions,
        mean_dream_words: mean(&words).unwrap_or(0.0),
        total_emotions: emotions.len(),
        unique_emotions: emotion_counts.len(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct EmotionThemePattern {
    pub emotion: String,
    pub theme: Theme,
    pub frequency: usize,
    pub total_occurrences: usize,
}

/// For each emotion, the theme it most often accompanies, looking at the two
/// strongest themes of each dream. Emotions seen with fewer than two theme
/// occurrences are left out.
pub fn emotion_theme_correlation(entries: &[SleepEntry]) -> Vec<EmotionThemePattern> {
    let mut by_emotion: BTreeMap<String, Vec<Theme>> = BTreeMap::new();
    for entry in entries.iter().filter(|e| e.had_dream()) {
        let top: Vec<Theme> = entry.themes().iter().take(2).map(|m| m.theme).collect();
        if top.is_empty() {
            continue;
        }
        for emotion in entry.dream_emotions() {
            by_emotion
                .entry(emotion.trim().to_lowercase())
                .or_default()
                .extend(top.iter().copied());
        }
    }

    by_emotion
        .into_iter()
        .filter(|(_, themes)| themes.len() >= 2)
        .filter_map(|(emotion, themes)| {
            let total = themes.len();
            themes
                .into_iter()
                .counts()
                .into_iter()
                .max_by_key(|&(theme, count)| (count, Reverse(theme)))
                .map(|(theme, frequency)| EmotionThemePattern {
                    emotion,
                    theme,
                    frequency,
                    total_occurrences: total,
                })
        })
        .collect()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DreamPatterns {
    pub frequency: ThemeFrequency,
    pub recurring: Vec<(Theme, usize, f64)>,
    pub by_date: Vec<(NaiveDate, Vec<Theme>)>,
    pub period: Option<(NaiveDate, NaiveDate)>,
    pub emotions: Vec<EmotionThemePattern>,
}

pub fn dream_patterns(entries: &[SleepEntry], range: DateRange, recurring_threshold: f64) -> DreamPatterns {
    let in_range: Vec<SleepEntry> = entries
        .iter()
        .filter(|e| e.had_dream() && range.contains(e.date()))
        .sorted_by_key(|e| e.date())
        .cloned()
        .collect();

    let frequency = theme_frequency(
        &in_range,
        &ThemeFilter {
            range: DateRange::all(),
            theme: None,
        },
    );
    let recurring = frequency.recurring(recurring_threshold);
    let by_date = in_range
        .iter()
        .map(|e| (e.date(), e.themes().iter().map(|m| m.theme).collect()))
        .collect();
    let period = match (in_range.first(), in_range.last()) {
        (Some(first), Some(last)) => Some((first.date(), last.date())),
        _ => None,
    };

    DreamPatterns {
        frequency,
        recurring,
        by_date,
        period,
        emotions: emotion_theme_correlation(&in_range),
    }
}

/// Nights counted as recent activity.
pub const RECENT_NIGHTS: usize = 30;
/// Dream nights needed before high and low quality counts are reported.
pub const MIN_QUALITY_SPLIT_DREAMS: usize = 5;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DreamInsights {
    pub dream_nights: usize,
    /// Dream nights among the last [`RECENT_NIGHTS`] entries.
    pub recent_dreams: usize,
    pub recent_quality: Option<f64>,
    pub top_weekday: Option<Weekday>,
    pub top_emotion: Option<(String, usize)>,
    /// Dream nights rated 8 or more, and 5 or less.
    pub quality_split: Option<(usize, usize)>,
    pub mean_words: f64,
    pub total_words: usize,
    pub advice: Vec<&'static str>,
}

pub fn dream_insights(entries: &[SleepEntry], range: DateRange) -> DreamInsights {
    let in_range: Vec<&SleepEntry> = entries
        .iter()
        .filter(|e| range.contains(e.date()))
        .sorted_by_key(|e| e.date())
        .collect();
    let dreams: Vec<&SleepEntry> = in_range.iter().copied().filter(|e| e.had_dream()).collect();
    if dreams.is_empty() {
        return DreamInsights::default();
    }

    let recent: Vec<f64> = in_range
        .iter()
        .rev()
        .take(RECENT_NIGHTS)
        .filter(|e| e.had_dream())
        .map(|e| f64::from(e.quality().value()))
        .collect();
    let top_weekday = dreams
        .iter()
        .map(|e| e.date().weekday())
        .counts()
        .into_iter()
        .max_by_key(|&(day, count)| (count, Reverse(day.num_days_from_monday())))
        .map(|(day, _)| day);
    let emotion_counts = dreams
        .iter()
        .flat_map(|e| e.dream_emotions().iter().map(|s| s.trim().to_lowercase()))
        .filter(|s| !s.is_empty())
        .counts();
    let unique_emotions = emotion_counts.len();
    let top_emotion = emotion_counts
        .into_iter()
        .max_by(|a, b| a.1.cmp(&b.1).then_with(|| b.0.cmp(&a.0)));
    let quality_split = (dreams.len() >= MIN_QUALITY_SPLIT_DREAMS).then(|| {
        let high = dreams.iter().filter(|e| e.quality().value() >= 8).count();
        let low = dreams.iter().filter(|e| e.quality().value() <= 5).count();
        (high, low)
    });
    let words: Vec<usize> = dreams.iter().map(|e| e.dream_word_count()).collect();
    let total_words: usize = words.iter().sum();
    let mean_words = total_words as f64 / words.len() as f64;
    let recent_quality = mean(&recent);

    let mut advice = Vec::new();
    match recent_quality {
        Some(q) if q < 6.0 => advice.push("Consider improving sleep hygiene for better dream recall"),
        Some(q) if q > 8.0 => advice.push("Great sleep quality! Your dreams are well-remembered"),
        _ => {}
    }
    if unique_emotions > 5 {
        advice.push("You experience diverse emotions in dreams, a sign of active subconscious processing");
    }
    if mean_words > 50.0 {
        advice.push("You provide detailed dream descriptions, excellent for pattern analysis!");
    }

    DreamInsights {
        dream_nights: dreams.len(),
        recent_dreams: recent.len(),
        recent_quality,
        top_weekday,
        top_emotion,
        quality_split,
        mean_words,
        total_words,
        advice,
    }
}

/// Up to `n` entries with the highest quality; ties keep date order.
pub fn best_sleep_days(entries: &[SleepEntry], n: usize) -> Vec<&SleepEntry> {
    entries
        .iter()
        .sorted_by_key(|e| (Reverse(e.quality()), e.date()))
        .take(n)
        .collect()
}

pub fn best_performance_days(entries: &[PerformanceEntry], n: usize) -> Vec<&PerformanceEntry> {
    entries
        .iter()
        .sorted_by(|a, b| {
            b.overall_score()
                .total_cmp(&a.overall_score())
                .then_with(|| a.date.cmp(&b.date))
        })
        .take(n)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entry::{Rating, parse_date, parse_time};
    use approx::assert_relative_eq;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn sleep(d: &str, quality: u8, dream: &str, emotions: &[&str]) -> SleepEntry {
        SleepEntry::new(
            date(d),
            parse_time("23:00").unwrap(),
            parse_time("07:00").unwrap(),
            Rating::new(quality).unwrap(),
        )
        .with_dream(dream, emotions.iter().map(|s| s.to_string()).collect())
    }

    fn perf(d: &str, productivity: u8) -> PerformanceEntry {
        let r = |v| Rating::new(v).unwrap();
        PerformanceEntry::new(date(d), r(5), r(5), r(productivity), r(5))
    }

    fn journal() -> Vec<SleepEntry> {
        vec![
            sleep("2024-01-03", 4, "chased by a dog through the house", &["scared"]),
            sleep("2024-01-01", 8, "flying over the ocean", &["happy", "free"]),
            sleep("2024-01-02", 6, "", &[]),
            sleep("2024-01-04", 7, "swimming in a lake, then flying", &["happy"]),
            sleep("2024-01-05", 3, "running from a wolf", &["scared", "tired"]),
        ]
    }

    #[test]
    fn test_theme_frequency_counts_dream_nights() {
        let freq = theme_frequency(&journal(), &ThemeFilter::default());
        assert_eq!(freq.dream_nights, 4);
        assert_eq!(freq.count(Theme::Flying), 2);
        assert_eq!(freq.count(Theme::Water), 2);
        assert_eq!(freq.count(Theme::Chased), 2);
        assert_eq!(freq.count(Theme::Animals), 2);
        assert_eq!(freq.count(Theme::Fire), 0);
        // Four-way tie broken by catalog order.
        assert_eq!(freq.most_common(), Some((Theme::Flying, 2)));
    }

    #[test]
    fn test_theme_frequency_filters() {
        let filter = ThemeFilter {
            range: DateRange::new(Some(date("2024-01-03")), None),
            theme: Some(Theme::Animals),
        };
        let freq = theme_frequency(&journal(), &filter);
        assert_eq!(freq.dream_nights, 3);
        assert_eq!(freq.counts, vec![(Theme::Animals, 2)]);
    }

    #[test]
    fn test_theme_frequency_empty() {
        let freq = theme_frequency(&[], &ThemeFilter::default());
        assert_eq!(freq.dream_nights, 0);
        assert!(freq.most_common().is_none());
        assert!(freq.recurring(0.2).is_empty());
    }

    #[test]
    fn test_recurring_threshold() {
        let freq = theme_frequency(&journal(), &ThemeFilter::default());
        let recurring = freq.recurring(0.5);
        assert!(recurring.iter().all(|(_, count, share)| *count == 2 && *share == 50.0));
        assert!(freq.recurring(0.75).is_empty());
    }

    #[test]
    fn test_search_empty_criteria_returns_all_chronologically() {
        let entries = journal();
        let criteria = SearchCriteria::default();
        assert!(criteria.is_empty());
        let found = search(&entries, &criteria);
        let dates: Vec<String> = found.iter().map(|e| e.date().to_string()).collect();
        assert_eq!(
            dates,
            vec!["2024-01-01", "2024-01-02", "2024-01-03", "2024-01-04", "2024-01-05"]
        );
    }

    #[test]
    fn test_search_combines_criteria() {
        let entries = journal();
        let criteria = SearchCriteria {
            emotion: Some("Scared".into()),
            max_quality: Some(3),
            ..Default::default()
        };
        let found = search(&entries, &criteria);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date(), date("2024-01-05"));

        let criteria = SearchCriteria {
            theme: Some(Theme::Water),
            keyword: Some("LAKE".into()),
            ..Default::default()
        };
        let found = search(&entries, &criteria);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].date(), date("2024-01-04"));
    }

    #[test]
    fn test_search_contradictory_criteria_is_empty() {
        let criteria = SearchCriteria {
            min_quality: Some(9),
            max_quality: Some(2),
            ..Default::default()
        };
        assert!(search(&journal(), &criteria).is_empty());
    }

    #[test]
    fn test_correlation_positive_scenario() {
        let sleep = vec![sleep("2024-01-01", 8, "", &[]), sleep("2024-01-02", 3, "", &[])];
        let perf = vec![perf("2024-01-01", 9), perf("2024-01-02", 4)];
        let result = correlate(&sleep, &perf, SleepMetric::Quality, PerformanceMetric::Productivity);
        assert_eq!(result.correlation.direction(), Some(Direction::Positive));
    }

    #[test]
    fn test_correlation_needs_two_pairs() {
        let sleep = vec![sleep("2024-01-01", 8, "", &[]), sleep("2024-01-02", 3, "", &[])];
        let perf = vec![perf("2024-01-01", 9), perf("2024-01-09", 4)];
        let result = correlate(&sleep, &perf, SleepMetric::Quality, PerformanceMetric::Productivity);
        assert_eq!(result.correlation, Correlation::InsufficientData { paired: 1 });
        assert_eq!(correlate_pairs(&[]), Correlation::InsufficientData { paired: 0 });
    }

    #[test]
    fn test_identical_series_are_max_positive() {
        let pairs = [(1.0, 1.0), (4.0, 4.0), (2.0, 2.0)];
        match correlate_pairs(&pairs) {
            Correlation::Indicator { direction, strength, .. } => {
                assert_eq!(direction, Direction::Positive);
                assert_relative_eq!(strength, 1.0, epsilon = 1e-9);
            }
            other => panic!("unexpected {:?}", other),
        }

        let flat = [(5.0, 5.0), (5.0, 5.0)];
        assert_eq!(correlate_pairs(&flat).direction(), Some(Direction::Positive));
    }

    #[test]
    fn test_negative_and_flat_correlation() {
        let pairs = [(1.0, 9.0), (5.0, 5.0), (9.0, 1.0)];
        assert_eq!(correlate_pairs(&pairs).direction(), Some(Direction::Negative));

        let flat = [(1.0, 5.0), (9.0, 5.0)];
        assert_eq!(correlate_pairs(&flat).direction(), Some(Direction::None));
    }

    #[test]
    fn test_correlate_all_covers_every_pair() {
        let results = correlate_all(&[], &[]);
        assert_eq!(results.len(), 10);
        assert!(results
            .iter()
            .all(|r| matches!(r.correlation, Correlation::InsufficientData { paired: 0 })));
    }

    #[test]
    fn test_performance_by_sleep() {
        let sleep = vec![
            sleep("2024-01-01", 8, "flying", &[]),
            sleep("2024-01-02", 3, "", &[]),
            sleep("2024-01-03", 9, "", &[]),
        ];
        let perf = vec![perf("2024-01-01", 9), perf("2024-01-02", 1), perf("2024-01-03", 9)];
        let result = performance_by_sleep(&sleep, &perf);
        assert!(result.is_sufficient());
        // overall = (9 + 5 + 5 + 6) / 4 = 6.25 -> 6.3, and (1 + 5 + 5 + 6) / 4 = 4.25 -> 4.3
        assert_relative_eq!(result.good_sleep.unwrap(), 6.3, epsilon = 1e-9);
        assert_relative_eq!(result.poor_sleep.unwrap(), 4.3, epsilon = 1e-9);
        assert_relative_eq!(result.with_dreams.unwrap(), 6.3, epsilon = 1e-9);
        assert_relative_eq!(result.without_dreams.unwrap(), 5.3, epsilon = 1e-9);

        let short = performance_by_sleep(&sleep[..2], &perf);
        assert!(!short.is_sufficient());
        assert!(short.good_sleep.is_none());
    }

    #[test]
    fn test_trend_direction() {
        assert_eq!(trend_direction(&[]), TrendDirection::InsufficientData);
        assert_eq!(trend_direction(&[5.0]), TrendDirection::InsufficientData);
        assert_eq!(trend_direction(&[3.0, 5.0, 4.0, 8.0]), TrendDirection::Improving);
        assert_eq!(trend_direction(&[8.0, 5.0, 6.0, 2.0]), TrendDirection::Declining);
        assert_eq!(trend_direction(&[5.0, 6.0, 5.0]), TrendDirection::Stable);
    }

    #[test]
    fn test_summarize() {
        let empty = summarize(&[]);
        assert!(empty.is_empty());
        assert_eq!(empty.trend, TrendDirection::InsufficientData);

        let s = summarize(&[4.0, 8.0, 6.0]);
        assert_eq!(s.count, 3);
        assert_eq!(s.min, 4.0);
        assert_eq!(s.max, 8.0);
        assert_relative_eq!(s.mean, 6.0);
    }

    #[test]
    fn test_moving_average() {
        assert_eq!(moving_average(&[2.0, 4.0, 6.0, 8.0], 2), vec![3.0, 5.0, 7.0]);
        assert!(moving_average(&[1.0], 3).is_empty());
        assert!(moving_average(&[1.0, 2.0], 0).is_empty());
    }

    #[test]
    fn test_trend_window_respects_range() {
        let range = DateRange::new(Some(date("2024-01-02")), Some(date("2024-01-04")));
        let window = trend_window(&journal(), &[], range, 2);
        assert_eq!(window.sleep_quality.count, 3);
        // 6, 4, 7 in date order
        assert_eq!(window.quality_moving_average, vec![5.0, 5.5]);
        assert!(window.mood.is_empty());
    }

    #[test]
    fn test_distributions() {
        let q = quality_distribution(&journal());
        assert_eq!(q, vec![("1-2", 0), ("3-4", 2), ("5-6", 1), ("7-8", 2), ("9-10", 0)]);
        let d = duration_distribution(&journal());
        assert_eq!(d.iter().find(|(b, _)| *b == "8-9h").unwrap().1, 5);
    }

    #[test]
    fn test_dream_statistics() {
        let stats = dream_statistics(&journal());
        assert_eq!(stats.total_nights, 5);
        assert_eq!(stats.dream_nights, 4);
        assert_relative_eq!(stats.dream_frequency, 80.0);
        assert_relative_eq!(stats.quality_with_dreams.unwrap(), 5.5);
        assert_relative_eq!(stats.quality_without_dreams.unwrap(), 6.0);
        assert_eq!(stats.top_emotions[0], ("happy".to_string(), 2));
        assert_eq!(stats.top_emotions[1], ("scared".to_string(), 2));
        assert_eq!(stats.unique_emotions, 4);
        assert_eq!(stats.total_emotions, 6);

        assert_eq!(dream_statistics(&[]), DreamStatistics::default());
    }

    #[test]
    fn test_emotion_theme_correlation() {
        let patterns = emotion_theme_correlation(&journal());
        let scared = patterns.iter().find(|p| p.emotion == "scared").unwrap();
        assert_eq!(scared.theme, Theme::Chased);
        assert_eq!(scared.frequency, 2);
        // "free" appears once but brings two themes.
        assert!(patterns.iter().any(|p| p.emotion == "free"));
        assert!(emotion_theme_correlation(&[]).is_empty());
    }

    #[test]
    fn test_dream_patterns_period() {
        let patterns = dream_patterns(&journal(), DateRange::all(), 0.2);
        assert_eq!(patterns.period, Some((date("2024-01-01"), date("2024-01-05"))));
        assert_eq!(patterns.by_date.len(), 4);
        assert_eq!(dream_patterns(&[], DateRange::all(), 0.2), DreamPatterns::default());
    }

    #[test]
    fn test_dream_insights() {
        let insights = dream_insights(&journal(), DateRange::all());
        assert_eq!(insights.dream_nights, 4);
        assert_eq!(insights.recent_dreams, 4);
        assert_relative_eq!(insights.recent_quality.unwrap(), 5.5);
        // 2024-01-01 is a Monday; each dream falls on a different day.
        assert_eq!(insights.top_weekday, Some(Weekday::Mon));
        assert_eq!(insights.top_emotion, Some(("happy".to_string(), 2)));
        assert_eq!(insights.quality_split, None);
        assert_eq!(insights.total_words, 21);
        assert_relative_eq!(insights.mean_words, 5.25);
        assert_eq!(
            insights.advice,
            vec!["Consider improving sleep hygiene for better dream recall"]
        );
    }

    #[test]
    fn test_dream_insights_quality_split_and_advice() {
        let long = "flying ".repeat(60);
        let emotions = ["joy", "awe", "calm", "fear", "hope", "love"];
        let entries: Vec<SleepEntry> = (1..=6)
            .map(|day| {
                let quality = if day <= 4 { 9 } else { 5 };
                sleep(&format!("2024-02-0{}", day), quality, &long, &emotions[day - 1..day])
            })
            .collect();
        let insights = dream_insights(&entries, DateRange::all());
        assert_eq!(insights.quality_split, Some((4, 2)));
        assert_relative_eq!(insights.recent_quality.unwrap(), 46.0 / 6.0);
        assert_eq!(insights.advice.len(), 2);
        assert!(insights.advice[0].starts_with("You experience diverse emotions"));
        assert!(insights.advice[1].starts_with("You provide detailed dream descriptions"));

        let ranged = dream_insights(&entries, DateRange::new(Some(date("2024-02-05")), None));
        assert_eq!(ranged.dream_nights, 2);
        assert_eq!(ranged.quality_split, None);
        assert_eq!(dream_insights(&[], DateRange::all()), DreamInsights::default());
    }

    #[test]
    fn test_best_days() {
        let entries = journal();
        let best = best_sleep_days(&entries, 2);
        assert_eq!(best[0].quality().value(), 8);
        assert_eq!(best[1].quality().value(), 7);
    }
}
