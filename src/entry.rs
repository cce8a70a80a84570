use chrono::{NaiveDate, NaiveTime};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::{JournalError, Result};
use crate::themes::{self, ThemeMatch};

pub const DATE_FORMAT: &str = "%Y-%m-%d";
pub const TIME_FORMAT: &str = "%H:%M";

/// A score on the 1-10 scale used for sleep quality and every performance metric.
#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[serde(try_from = "u8", into = "u8")]
pub struct Rating(u8);

impl Rating {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(value: u8) -> Result<Self> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Rating(value))
        } else {
            Err(JournalError::invalid(format!(
                "rating must be between {} and {}, got {}",
                Self::MIN,
                Self::MAX,
                value
            )))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl TryFrom<u8> for Rating {
    type Error = JournalError;

    fn try_from(value: u8) -> Result<Self> {
        Rating::new(value)
    }
}

impl From<Rating> for u8 {
    fn from(rating: Rating) -> u8 {
        rating.0
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/10", self.0)
    }
}

pub fn parse_rating(input: &str) -> Result<Rating> {
    let value = input
        .trim()
        .parse::<u8>()
        .map_err(|_| JournalError::invalid(format!("'{}' is not a number between 1 and 10", input.trim())))?;
    Rating::new(value)
}

pub fn parse_date(input: &str) -> Result<NaiveDate> {
    NaiveDate::parse_from_str(input.trim(), DATE_FORMAT)
        .map_err(|_| JournalError::invalid(format!("'{}' is not a date in YYYY-MM-DD form", input.trim())))
}

pub fn parse_time(input: &str) -> Result<NaiveTime> {
    NaiveTime::parse_from_str(input.trim(), TIME_FORMAT)
        .map_err(|_| JournalError::invalid(format!("'{}' is not a time in HH:MM form", input.trim())))
}

/// Comma separated emotions, trimmed and lowercased, blanks dropped.
pub fn parse_emotions(input: &str) -> Vec<String> {
    input
        .split(',')
        .map(|s| s.trim().to_lowercase())
        .filter(|s| !s.is_empty())
        .collect()
}

pub(crate) fn round1(value: f64) -> f64 {
    (value * 10.0).round() / 10.0
}

mod hhmm {
    use chrono::NaiveTime;
    use serde::{Deserialize, Deserializer, Serializer};

    use super::TIME_FORMAT;

    pub fn serialize<S: Serializer>(time: &NaiveTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&time.format(TIME_FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveTime, D::Error> {
        let raw = String::deserialize(d)?;
        NaiveTime::parse_from_str(&raw, TIME_FORMAT).map_err(serde::de::Error::custom)
    }
}

/// One night of sleep. Themes are always derived from the dream text at
/// construction and again when read back from storage.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(from = "StoredSleepEntry", into = "StoredSleepEntry")]
pub struct SleepEntry {
    date: NaiveDate,
    bedtime: NaiveTime,
    wake_time: NaiveTime,
    quality: Rating,
    dream_text: Option<String>,
    dream_emotions: Vec<String>,
    themes: Vec<ThemeMatch>,
}

impl SleepEntry {
    pub fn new(date: NaiveDate, bedtime: NaiveTime, wake_time: NaiveTime, quality: Rating) -> Self {
        SleepEntry {
            date,
            bedtime,
            wake_time,
            quality,
            dream_text: None,
            dream_emotions: Vec::new(),
            themes: Vec::new(),
        }
    }

    /// Attach a dream and run theme detection on it. Blank text counts as no dream.
    pub fn with_dream(mut self, text: &str, emotions: Vec<String>) -> Self {
        let text = text.trim();
        if text.is_empty() {
            self.dream_text = None;
            self.themes = Vec::new();
        } else {
            self.themes = themes::detect_themes(text);
            self.dream_text = Some(text.to_string());
        }
        self.dream_emotions = emotions;
        self
    }

    pub fn date(&self) -> NaiveDate {
        self.date
    }

    pub fn bedtime(&self) -> NaiveTime {
        self.bedtime
    }

    pub fn wake_time(&self) -> NaiveTime {
        self.wake_time
    }

    pub fn quality(&self) -> Rating {
        self.quality
    }

    pub fn dream_text(&self) -> Option<&str> {
        self.dream_text.as_deref()
    }

    pub fn dream_emotions(&self) -> &[String] {
        &self.dream_emotions
    }

    pub fn themes(&self) -> &[ThemeMatch] {
        &self.themes
    }

    pub fn had_dream(&self) -> bool {
        self.dream_text.is_some()
    }

    /// Hours slept, rounded to one decimal. A wake time earlier than the
    /// bedtime is taken to be on the following day.
    pub fn sleep_duration(&self) -> f64 {
        let mut minutes = (self.wake_time - self.bedtime).num_minutes();
        if minutes < 0 {
            minutes += 24 * 60;
        }
        round1(minutes as f64 / 60.0)
    }

    pub fn dream_word_count(&self) -> usize {
        self.dream_text.as_deref().map_or(0, |t| t.split_whitespace().count())
    }
}

#[derive(Serialize, Deserialize)]
struct StoredSleepEntry {
    date: NaiveDate,
    #[serde(with = "hhmm")]
    bedtime: NaiveTime,
    #[serde(with = "hhmm")]
    wake_time: NaiveTime,
    quality: Rating,
    #[serde(default)]
    dream_text: Option<String>,
    #[serde(default)]
    dream_emotions: Vec<String>,
    #[serde(default)]
    themes: Vec<ThemeMatch>,
}

impl From<StoredSleepEntry> for SleepEntry {
    fn from(stored: StoredSleepEntry) -> Self {
        let entry = SleepEntry::new(stored.date, stored.bedtime, stored.wake_time, stored.quality);
        entry.with_dream(stored.dream_text.as_deref().unwrap_or(""), stored.dream_emotions)
    }
}

impl From<SleepEntry> for StoredSleepEntry {
    fn from(entry: SleepEntry) -> Self {
        StoredSleepEntry {
            date: entry.date,
            bedtime: entry.bedtime,
            wake_time: entry.wake_time,
            quality: entry.quality,
            dream_text: entry.dream_text,
            dream_emotions: entry.dream_emotions,
            themes: entry.themes,
        }
    }
}

/// Daily performance self-assessment.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct PerformanceEntry {
    pub date: NaiveDate,
    pub mood: Rating,
    pub energy: Rating,
    pub productivity: Rating,
    pub stress: Rating,
    #[serde(default)]
    pub activities: String,
    #[serde(default)]
    pub notes: String,
}

impl PerformanceEntry {
    pub fn new(date: NaiveDate, mood: Rating, energy: Rating, productivity: Rating, stress: Rating) -> Self {
        PerformanceEntry {
            date,
            mood,
            energy,
            productivity,
            stress,
            activities: String::new(),
            notes: String::new(),
        }
    }

    /// Mean of productivity, mood, energy and inverted stress, one decimal.
    pub fn overall_score(&self) -> f64 {
        let inverted_stress = 11 - self.stress.value();
        let total = self.productivity.value() as f64
            + self.mood.value() as f64
            + self.energy.value() as f64
            + inverted_stress as f64;
        round1(total / 4.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(s: &str) -> NaiveDate {
        parse_date(s).unwrap()
    }

    fn time(s: &str) -> NaiveTime {
        parse_time(s).unwrap()
    }

    fn rating(v: u8) -> Rating {
        Rating::new(v).unwrap()
    }

    #[test]
    fn test_rating_bounds() {
        assert!(Rating::new(0).is_err());
        assert!(Rating::new(11).is_err());
        assert_eq!(Rating::new(1).unwrap().value(), 1);
        assert_eq!(Rating::new(10).unwrap().value(), 10);
    }

    #[test]
    fn test_parse_rating_rejects_garbage() {
        assert!(parse_rating("seven").unwrap_err().is_invalid_input());
        assert!(parse_rating("-3").is_err());
        assert_eq!(parse_rating(" 7 \n").unwrap().value(), 7);
    }

    #[test]
    fn test_parse_date_and_time() {
        assert!(parse_date("2024-13-01").is_err());
        assert!(parse_date("01/02/2024").is_err());
        assert!(parse_time("25:00").is_err());
        assert_eq!(time("07:30").format(TIME_FORMAT).to_string(), "07:30");
    }

    #[test]
    fn test_sleep_duration_wraps_midnight() {
        let entry = SleepEntry::new(date("2024-01-01"), time("23:00"), time("07:00"), rating(8));
        assert_eq!(entry.sleep_duration(), 8.0);

        let nap = SleepEntry::new(date("2024-01-01"), time("13:00"), time("14:30"), rating(5));
        assert_eq!(nap.sleep_duration(), 1.5);
    }

    #[test]
    fn test_with_dream_derives_themes() {
        let entry = SleepEntry::new(date("2024-01-01"), time("23:00"), time("07:00"), rating(8))
            .with_dream("I was swimming in the ocean", vec!["calm".into()]);
        assert!(entry.had_dream());
        assert!(!entry.themes().is_empty());
        assert_eq!(entry.dream_word_count(), 6);
    }

    #[test]
    fn test_blank_dream_is_no_dream() {
        let entry = SleepEntry::new(date("2024-01-01"), time("23:00"), time("07:00"), rating(8))
            .with_dream("   ", Vec::new());
        assert!(!entry.had_dream());
        assert!(entry.themes().is_empty());
    }

    #[test]
    fn test_stored_entry_rederives_themes() {
        let json = r#"{
            "date": "2024-01-01",
            "bedtime": "23:00",
            "wake_time": "07:00",
            "quality": 8,
            "dream_text": "a fire in the house",
            "themes": []
        }"#;
        let entry: SleepEntry = serde_json::from_str(json).unwrap();
        assert!(!entry.themes().is_empty());
    }

    #[test]
    fn test_stored_entry_rejects_bad_rating() {
        let json = r#"{"date":"2024-01-01","bedtime":"23:00","wake_time":"07:00","quality":12}"#;
        assert!(serde_json::from_str::<SleepEntry>(json).is_err());
    }

    #[test]
    fn test_overall_score_inverts_stress() {
        let entry = PerformanceEntry::new(date("2024-01-01"), rating(8), rating(6), rating(9), rating(3));
        // (9 + 8 + 6 + 8) / 4 = 7.75
        assert_eq!(entry.overall_score(), 7.8);
    }

    #[test]
    fn test_parse_emotions() {
        assert_eq!(parse_emotions(" Scared, ,happy "), vec!["scared", "happy"]);
        assert!(parse_emotions("").is_empty());
    }
}
