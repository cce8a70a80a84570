//! Plain-text rendering of journal data and statistics.
//!
//! Nothing here reads the clock or storage: the same inputs always render
//! the same text, which is what gets printed and saved.

use chrono::{NaiveDateTime, Weekday};
use itertools::Itertools;
use std::fmt::Display;

use crate::entry::{PerformanceEntry, SleepEntry, TIME_FORMAT};
use crate::journal::Analysis;
use crate::stats::{
    Correlation, CorrelationResult, DreamInsights, DreamPatterns, DreamStatistics, MIN_COMPARISON_DAYS,
    PerformanceBySleep, RECENT_NIGHTS, SearchCriteria, Summary, ThemeFrequency, TrendWindow,
};
use crate::themes::{self, Interpretation, Recommendation, Theme};

const RULE: usize = 50;

fn heading(title: &str) -> String {
    format!("{}\n{}", title, "=".repeat(RULE))
}

fn or_dash(value: Option<f64>) -> String {
    value.map_or_else(|| "-".to_string(), |v| format!("{:.1}/10", v))
}

pub fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let cut: String = text.chars().take(max_chars.saturating_sub(3)).collect();
    format!("{}...", cut.trim_end())
}

pub fn format_duration(hours: f64) -> String {
    if hours <= 0.0 {
        return "0 hours".to_string();
    }
    let total_minutes = (hours * 60.0).round() as u64;
    let (h, m) = (total_minutes / 60, total_minutes % 60);
    match (h, m) {
        (0, m) => format!("{} minutes", m),
        (1, 0) => "1 hour".to_string(),
        (h, 0) => format!("{} hours", h),
        (h, m) => format!("{}h {}m", h, m),
    }
}

/// Horizontal bars scaled to the largest value.
pub fn bar_chart<L: Display>(data: &[(L, usize)], width: usize) -> String {
    if data.is_empty() {
        return "No data to display".to_string();
    }
    let max = data.iter().map(|(_, v)| *v).max().unwrap_or(0);
    data.iter()
        .map(|(label, value)| {
            let bar = if max > 0 { value * width / max } else { 0 };
            format!("{:<15} | {} {}", label.to_string(), "▇".repeat(bar), value)
        })
        .join("\n")
}

fn summary_line(label: &str, s: &Summary) -> String {
    if s.is_empty() {
        format!("- {}: no data", label)
    } else {
        format!(
            "- {}: {:.1}/10 (min {}, max {}, trend: {})",
            label, s.mean, s.min, s.max, s.trend
        )
    }
}

// ---------------------------------------------------------------------------
// Entries
// ---------------------------------------------------------------------------

pub fn render_sleep_entry(entry: &SleepEntry) -> String {
    let mut lines = vec![
        format!("Date: {}", entry.date()),
        format!(
            "  Sleep: {} - {} ({})",
            entry.bedtime().format(TIME_FORMAT),
            entry.wake_time().format(TIME_FORMAT),
            format_duration(entry.sleep_duration())
        ),
        format!("  Quality: {}", entry.quality()),
    ];
    if let Some(text) = entry.dream_text() {
        lines.push(format!("  Dream: {}", truncate(text, 60)));
        if !entry.dream_emotions().is_empty() {
            lines.push(format!("  Emotions: {}", entry.dream_emotions().join(", ")));
        }
        if !entry.themes().is_empty() {
            let themes = entry
                .themes()
                .iter()
                .map(|m| format!("{} ({:.0}%)", m.theme, m.percent()))
                .join(", ");
            lines.push(format!("  Themes: {}", themes));
        }
    }
    lines.join("\n")
}

pub fn render_performance_entry(entry: &PerformanceEntry) -> String {
    let mut lines = vec![
        format!("Date: {}", entry.date),
        format!("  Productivity: {}", entry.productivity),
        format!("  Mood: {}", entry.mood),
        format!("  Energy: {}", entry.energy),
        format!("  Stress: {}", entry.stress),
        format!("  Overall Score: {:.1}/10", entry.overall_score()),
    ];
    if !entry.activities.is_empty() {
        lines.push(format!("  Activities: {}", entry.activities));
    }
    if !entry.notes.is_empty() {
        lines.push(format!("  Notes: {}", entry.notes));
    }
    lines.join("\n")
}

pub fn render_sleep_history(entries: &[SleepEntry]) -> String {
    if entries.is_empty() {
        return "No sleep entries recorded yet.".to_string();
    }
    let body = entries.iter().map(render_sleep_entry).join("\n\n");
    format!("{}\n{}", heading(&format!("SLEEP HISTORY ({} entries)", entries.len())), body)
}

pub fn render_performance_history(entries: &[PerformanceEntry]) -> String {
    if entries.is_empty() {
        return "No performance entries recorded yet.".to_string();
    }
    let body = entries.iter().map(render_performance_entry).join("\n\n");
    format!(
        "{}\n{}",
        heading(&format!("PERFORMANCE HISTORY ({} entries)", entries.len())),
        body
    )
}

// ---------------------------------------------------------------------------
// Themes
// ---------------------------------------------------------------------------

pub fn render_interpretations(interpretations: &[Interpretation]) -> String {
    if interpretations.is_empty() {
        return "No recognizable dream themes detected.".to_string();
    }
    interpretations
        .iter()
        .map(|i| {
            let mut lines = vec![
                format!("{} (confidence {:.0}%)", i.theme, i.confidence * 100.0),
                format!("  Keywords found: {}", i.keywords.join(", ")),
                format!("  {}", i.interpretation),
            ];
            lines.extend(i.tips.iter().map(|tip| format!("  - {}", tip)));
            lines.join("\n")
        })
        .join("\n\n")
}

/// Shown right after a dream is recorded.
pub fn render_dream_analysis(entry: &SleepEntry) -> String {
    match entry.dream_text() {
        None => "No dream recorded for this night.".to_string(),
        Some(_) => format!(
            "{}\n{}",
            heading("DREAM THEMES"),
            render_interpretations(&themes::interpret(entry.themes()))
        ),
    }
}

pub fn render_theme_catalog(frequency: &ThemeFrequency) -> String {
    let rows = Theme::ALL
        .iter()
        .enumerate()
        .map(|(i, theme)| {
            format!(
                "{:>2}. {:<16} seen on {} dream night(s)",
                i + 1,
                theme.name(),
                frequency.count(*theme)
            )
        })
        .join("\n");
    format!("{}\n{}", heading("DREAM THEME CATALOG"), rows)
}

pub fn render_theme_detail(theme: Theme, frequency: &ThemeFrequency) -> String {
    let info = theme.info();
    let mut lines = vec![
        heading(&theme.name().to_uppercase()),
        format!("Keywords: {}", info.keywords.join(", ")),
        format!("Meaning: {}", info.interpretation),
        "Tips:".to_string(),
    ];
    lines.extend(info.tips.iter().map(|tip| format!("  - {}", tip)));
    let count = frequency.count(theme);
    if frequency.dream_nights > 0 {
        lines.push(format!(
            "Appears in {} of your {} dream nights ({:.1}%)",
            count,
            frequency.dream_nights,
            count as f64 / frequency.dream_nights as f64 * 100.0
        ));
    }
    lines.join("\n")
}

pub fn render_recommendations(recommendations: &[Recommendation]) -> String {
    if recommendations.is_empty() {
        return "Record a few dreams to get personalized recommendations.".to_string();
    }
    recommendations
        .iter()
        .enumerate()
        .map(|(i, r)| format!("{}. {}\n   {}", i + 1, r.advice, r.insight))
        .join("\n")
}

fn weekday_name(day: Weekday) -> &'static str {
    match day {
        Weekday::Mon => "Monday",
        Weekday::Tue => "Tuesday",
        Weekday::Wed => "Wednesday",
        Weekday::Thu => "Thursday",
        Weekday::Fri => "Friday",
        Weekday::Sat => "Saturday",
        Weekday::Sun => "Sunday",
    }
}

/// Timeline entries shown under the dream analysis.
const TIMELINE_NIGHTS: usize = 5;

pub fn render_dream_patterns(
    patterns: &DreamPatterns,
    insights: &DreamInsights,
    recommendations: &[Recommendation],
) -> String {
    let mut lines = vec![heading("ADVANCED DREAM ANALYSIS")];
    let Some((from, to)) = patterns.period else {
        lines.push("No dreams recorded for analysis.".to_string());
        return lines.join("\n");
    };

    lines.push(format!("Analysis period: {} to {}", from, to));
    lines.push(format!("Dream nights: {}", patterns.frequency.dream_nights));

    lines.push(String::new());
    lines.push("Most common themes:".to_string());
    if patterns.frequency.counts.is_empty() {
        lines.push("  none detected".to_string());
    }
    for (theme, count) in patterns.frequency.top(5) {
        lines.push(format!("  - {}: {} night(s)", theme, count));
    }

    if !patterns.recurring.is_empty() {
        lines.push(String::new());
        lines.push("Recurring themes:".to_string());
        for (theme, count, share) in &patterns.recurring {
            lines.push(format!("  - {}: {} times ({:.1}% of dreams)", theme, count, share));
        }
    }

    if !patterns.emotions.is_empty() {
        lines.push(String::new());
        lines.push("Emotion and theme patterns:".to_string());
        for p in &patterns.emotions {
            lines.push(format!(
                "  - {}: most often {} ({} of {})",
                p.emotion, p.theme, p.frequency, p.total_occurrences
            ));
        }
    }

    lines.push(String::new());
    lines.push("Dream insights:".to_string());
    lines.push(format!(
        "  Recent activity: {} dream(s) in the last {} nights, average quality {}",
        insights.recent_dreams,
        RECENT_NIGHTS,
        or_dash(insights.recent_quality)
    ));
    if let Some(day) = insights.top_weekday {
        lines.push(format!("  Most dreams on: {}", weekday_name(day)));
    }
    if let Some((emotion, count)) = &insights.top_emotion {
        lines.push(format!("  Most common emotion: {} ({} times)", emotion, count));
    }
    if let Some((high, low)) = insights.quality_split {
        lines.push(format!("  High quality nights (8+): {} dream(s)", high));
        lines.push(format!("  Low quality nights (5 or less): {} dream(s)", low));
    }
    lines.push(format!(
        "  Dream length: {:.1} words on average, {} in total",
        insights.mean_words, insights.total_words
    ));
    for advice in &insights.advice {
        lines.push(format!("  * {}", advice));
    }

    lines.push(String::new());
    lines.push(format!("RECENT DREAM TIMELINE ({} to {})", from, to));
    let skip = patterns.by_date.len().saturating_sub(TIMELINE_NIGHTS);
    for (date, themes) in patterns.by_date.iter().skip(skip) {
        let shown = if themes.is_empty() {
            "No themes detected".to_string()
        } else {
            themes.iter().take(2).join(", ")
        };
        lines.push(format!("  {}: {}", date, shown));
    }

    lines.push(String::new());
    lines.push("Recommendations:".to_string());
    lines.push(render_recommendations(recommendations));
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Search and statistics views
// ---------------------------------------------------------------------------

pub fn describe_criteria(criteria: &SearchCriteria) -> String {
    if criteria.is_empty() {
        return "all entries".to_string();
    }
    let mut parts = Vec::new();
    if let Some(theme) = criteria.theme {
        parts.push(format!("theme {}", theme));
    }
    if let Some(emotion) = &criteria.emotion {
        parts.push(format!("emotion '{}'", emotion));
    }
    if let Some(keyword) = &criteria.keyword {
        parts.push(format!("keyword '{}'", keyword));
    }
    match (criteria.min_quality, criteria.max_quality) {
        (Some(min), Some(max)) => parts.push(format!("quality {}-{}", min, max)),
        (Some(min), None) => parts.push(format!("quality >= {}", min)),
        (None, Some(max)) => parts.push(format!("quality <= {}", max)),
        (None, None) => {}
    }
    match (criteria.range.from, criteria.range.to) {
        (Some(from), Some(to)) => parts.push(format!("from {} to {}", from, to)),
        (Some(from), None) => parts.push(format!("from {}", from)),
        (None, Some(to)) => parts.push(format!("until {}", to)),
        (None, None) => {}
    }
    parts.join(", ")
}

pub fn render_search_results(results: &[&SleepEntry], criteria: &SearchCriteria) -> String {
    let title = format!("SEARCH: {}", describe_criteria(criteria));
    if results.is_empty() {
        return format!("{}\nNo matching entries found.", heading(&title));
    }
    let body = results.iter().map(|e| render_sleep_entry(e)).join("\n\n");
    format!("{}\n{} match(es)\n\n{}", heading(&title), results.len(), body)
}

pub fn render_dream_statistics(stats: &DreamStatistics, frequency: &ThemeFrequency, width: usize) -> String {
    let mut lines = vec![heading("DREAM STATISTICS")];
    if stats.total_nights == 0 {
        lines.push("No sleep data recorded yet.".to_string());
        return lines.join("\n");
    }
    lines.push(format!("Total nights: {}", stats.total_nights));
    lines.push(format!(
        "Dream nights: {} ({:.1}%)",
        stats.dream_nights, stats.dream_frequency
    ));
    lines.push(format!("Average dream length: {:.1} words", stats.mean_dream_words));
    lines.push(format!("Sleep quality with dreams: {}", or_dash(stats.quality_with_dreams)));
    lines.push(format!(
        "Sleep quality without dreams: {}",
        or_dash(stats.quality_without_dreams)
    ));
    lines.push(format!(
        "Emotions recorded: {} ({} unique)",
        stats.total_emotions, stats.unique_emotions
    ));

    if !stats.top_emotions.is_empty() {
        lines.push(String::new());
        lines.push("Most common emotions:".to_string());
        lines.push(bar_chart(&stats.top_emotions, width));
    }
    if !frequency.counts.is_empty() {
        lines.push(String::new());
        lines.push("Theme frequency:".to_string());
        lines.push(bar_chart(&frequency.counts, width));
    }
    lines.join("\n")
}

pub fn render_correlation(result: &CorrelationResult) -> String {
    match result.correlation {
        Correlation::InsufficientData { paired } => format!(
            "{} vs {}: insufficient data ({} paired day(s))",
            result.sleep_metric, result.performance_metric, paired
        ),
        Correlation::Indicator {
            direction,
            coefficient,
            sample_size,
            ..
        } => format!(
            "{} vs {}: {} {} (r = {:+.2}, n = {})",
            result.sleep_metric,
            result.performance_metric,
            result.correlation.strength_label(),
            direction,
            coefficient,
            sample_size
        ),
    }
}

pub fn render_correlations(results: &[CorrelationResult], by_sleep: &PerformanceBySleep) -> String {
    let mut lines = vec![heading("CORRELATION ANALYSIS")];
    lines.extend(results.iter().map(|r| format!("- {}", render_correlation(r))));

    lines.push(String::new());
    if !by_sleep.is_sufficient() {
        lines.push(format!(
            "Need at least {} matching sleep and performance dates for comparisons ({} so far).",
            MIN_COMPARISON_DAYS, by_sleep.matched_days
        ));
        return lines.join("\n");
    }
    if let Some(score) = by_sleep.good_sleep {
        lines.push(format!("Average performance on good sleep days (7+): {:.1}/10", score));
    }
    if let Some(score) = by_sleep.poor_sleep {
        lines.push(format!("Average performance on poor sleep days (<=4): {:.1}/10", score));
    }
    if let (Some(with), Some(without)) = (by_sleep.with_dreams, by_sleep.without_dreams) {
        lines.push(format!("Average performance with dreams: {:.1}/10", with));
        lines.push(format!("Average performance without dreams: {:.1}/10", without));
    }
    lines.join("\n")
}

pub fn render_trend(trend: &TrendWindow) -> String {
    let period = match (trend.range.from, trend.range.to) {
        (Some(from), Some(to)) => format!("{} to {}", from, to),
        (Some(from), None) => format!("since {}", from),
        (None, Some(to)) => format!("until {}", to),
        (None, None) => "all time".to_string(),
    };
    let mut lines = vec![
        heading(&format!("TRENDS ({})", period)),
        summary_line("Sleep quality", &trend.sleep_quality),
    ];
    if trend.sleep_duration.is_empty() {
        lines.push("- Sleep duration: no data".to_string());
    } else {
        lines.push(format!(
            "- Sleep duration: {} average (trend: {})",
            format_duration(trend.sleep_duration.mean),
            trend.sleep_duration.trend
        ));
    }
    lines.push(summary_line("Mood", &trend.mood));
    lines.push(summary_line("Energy", &trend.energy));
    lines.push(summary_line("Productivity", &trend.productivity));
    lines.push(summary_line("Overall performance", &trend.overall));
    if !trend.quality_moving_average.is_empty() {
        let avg = trend
            .quality_moving_average
            .iter()
            .map(|v| format!("{:.1}", v))
            .join(" -> ");
        lines.push(format!("Sleep quality moving average: {}", avg));
    }
    lines.join("\n")
}

// ---------------------------------------------------------------------------
// Full report
// ---------------------------------------------------------------------------

pub fn render_report(a: &Analysis, generated_at: NaiveDateTime, width: usize) -> String {
    let banner = "=".repeat(80);
    let sections = [
        format!(
            "{}\nSLEEP ANALYTICS & PERFORMANCE REPORT\nGenerated: {}\n{}",
            banner,
            generated_at.format("%Y-%m-%d %H:%M:%S"),
            banner
        ),
        overview_section(a),
        sleep_section(a, width),
        performance_section(a, width),
        dream_section(a, width),
        render_correlations(&a.correlations, &a.by_sleep),
        advice_section(a),
        format!("{}\nConsistency in logging leads to better insights.\n{}", banner, banner),
    ];
    sections.join("\n\n")
}

fn overview_section(a: &Analysis) -> String {
    let range = a
        .period
        .map_or_else(|| "No data".to_string(), |(from, to)| format!("{} to {}", from, to));
    [
        heading("DATA OVERVIEW"),
        format!("Total Sleep Entries: {}", a.sleep_count),
        format!("Total Performance Entries: {}", a.performance_count),
        format!("Date Range: {}", range),
        format!("Data Quality: {}", a.data_quality()),
    ]
    .join("\n")
}

fn sleep_section(a: &Analysis, width: usize) -> String {
    let mut lines = vec![heading("SLEEP ANALYSIS")];
    if a.quality.is_empty() {
        lines.push("No sleep data available for analysis.".to_string());
        return lines.join("\n");
    }
    lines.push(format!("Average Sleep Quality: {:.1}/10", a.quality.mean));
    lines.push(format!("Average Sleep Duration: {}", format_duration(a.duration.mean)));
    lines.push(String::new());
    lines.push("Sleep Quality Distribution:".to_string());
    lines.push(bar_chart(&a.quality_distribution, width));
    lines.push(String::new());
    lines.push("Sleep Duration Distribution:".to_string());
    lines.push(bar_chart(&a.duration_distribution, width));
    lines.push(String::new());
    lines.push(format!("Quality range: {} to {}/10, trend: {}", a.quality.min, a.quality.max, a.quality.trend));
    if let Some((date, quality)) = a.best_sleep {
        lines.push(format!("Best Sleep Day: {} (Quality: {})", date, quality));
    }
    if let Some((date, quality)) = a.worst_sleep {
        lines.push(format!("Worst Sleep Day: {} (Quality: {})", date, quality));
    }
    lines.join("\n")
}

fn performance_section(a: &Analysis, width: usize) -> String {
    let mut lines = vec![heading("PERFORMANCE ANALYSIS")];
    if a.overall.is_empty() {
        lines.push("No performance data available for analysis.".to_string());
        return lines.join("\n");
    }
    lines.push("Average Performance Metrics:".to_string());
    lines.push(summary_line("Productivity", &a.productivity));
    lines.push(summary_line("Mood", &a.mood));
    lines.push(summary_line("Energy", &a.energy));
    lines.push(summary_line("Stress", &a.stress));
    lines.push(summary_line("Overall Score", &a.overall));
    lines.push(String::new());
    lines.push("Performance Distribution:".to_string());
    lines.push(bar_chart(&a.performance_distribution, width));
    if let Some((date, score)) = a.best_performance {
        lines.push(format!("Best Performance Day: {} (Score: {:.1}/10)", date, score));
    }
    if let Some((date, score)) = a.worst_performance {
        lines.push(format!("Worst Performance Day: {} (Score: {:.1}/10)", date, score));
    }
    lines.join("\n")
}

fn dream_section(a: &Analysis, width: usize) -> String {
    let mut lines = vec![heading("DREAM ANALYSIS")];
    let d = &a.dreams;
    if d.dream_nights == 0 {
        lines.push("No dreams recorded for analysis.".to_string());
        return lines.join("\n");
    }
    lines.push(format!(
        "Dream Frequency: {:.1}% ({}/{} nights)",
        d.dream_frequency, d.dream_nights, d.total_nights
    ));
    lines.push(format!("Average Dream Length: {:.1} words", d.mean_dream_words));
    lines.push(format!("Emotional Diversity: {} unique emotions recorded", d.unique_emotions));
    lines.push(format!("Sleep quality with dreams: {}", or_dash(d.quality_with_dreams)));
    lines.push(format!("Sleep quality without dreams: {}", or_dash(d.quality_without_dreams)));
    if let (Some(with), Some(without)) = (d.quality_with_dreams, d.quality_without_dreams) {
        let diff = with - without;
        if diff.abs() > 0.5 {
            let when = if diff > 0.0 { "remember" } else { "don't remember" };
            lines.push(format!(
                "Insight: you sleep {:.1} points better on nights when you {} dreams",
                diff.abs(),
                when
            ));
        }
    }

    if !a.patterns.frequency.counts.is_empty() {
        lines.push(String::new());
        lines.push("Dominant Dream Themes:".to_string());
        for (i, (theme, count)) in a.patterns.frequency.top(5).iter().enumerate() {
            let share = *count as f64 / a.patterns.frequency.dream_nights as f64 * 100.0;
            lines.push(format!("- {}: {} occurrences ({:.1}% of dreams)", theme, count, share));
            if i < 3 {
                lines.push(format!("  {}", truncate(theme.info().interpretation, 100)));
            }
        }
    }

    if !d.top_emotions.is_empty() {
        lines.push(String::new());
        lines.push("Most Common Dream Emotions:".to_string());
        lines.push(bar_chart(&d.top_emotions, width));
    }

    if !a.recent_dreams.is_empty() {
        lines.push(String::new());
        lines.push("Recent Dreams:".to_string());
        for (date, text) in &a.recent_dreams {
            lines.push(format!("- {}: {}", date, truncate(text, 60)));
        }
    }

    lines.push(String::new());
    lines.push("Personalized Dream Insights:".to_string());
    lines.push(render_recommendations(&a.recommendations));
    lines.join("\n")
}

fn advice_section(a: &Analysis) -> String {
    let mut lines = vec![heading("PERSONALIZED RECOMMENDATIONS")];
    lines.extend(a.advice.iter().enumerate().map(|(i, tip)| format!("{}. {}", i + 1, tip)));
    lines.join("\n")
}
