//! Dream theme catalog and keyword-based detection.
//!
//! The catalog is a fixed table keyed by [`Theme`]. Detection lowercases the
//! dream text and looks for whole-word keyword hits; a theme's confidence
//! grows with the share of its keywords that appear.

use rand::Rng;
use rand::seq::SliceRandom;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;
use tracing::debug;

use crate::error::JournalError;

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Theme {
    Flying,
    Falling,
    Chased,
    Water,
    Animals,
    Death,
    #[serde(rename = "School/Exam")]
    SchoolExam,
    #[serde(rename = "House/Home")]
    HouseHome,
    Vehicles,
    Money,
    #[serde(rename = "Pregnancy/Birth")]
    PregnancyBirth,
    Nakedness,
    Food,
    Lost,
    Fire,
}

impl Theme {
    /// Catalog order. Used to break confidence ties.
    pub const ALL: [Theme; 15] = [
        Theme::Flying,
        Theme::Falling,
        Theme::Chased,
        Theme::Water,
        Theme::Animals,
        Theme::Death,
        Theme::SchoolExam,
        Theme::HouseHome,
        Theme::Vehicles,
        Theme::Money,
        Theme::PregnancyBirth,
        Theme::Nakedness,
        Theme::Food,
        Theme::Lost,
        Theme::Fire,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Theme::Flying => "Flying",
            Theme::Falling => "Falling",
            Theme::Chased => "Chased",
            Theme::Water => "Water",
            Theme::Animals => "Animals",
            Theme::Death => "Death",
            Theme::SchoolExam => "School/Exam",
            Theme::HouseHome => "House/Home",
            Theme::Vehicles => "Vehicles",
            Theme::Money => "Money",
            Theme::PregnancyBirth => "Pregnancy/Birth",
            Theme::Nakedness => "Nakedness",
            Theme::Food => "Food",
            Theme::Lost => "Lost",
            Theme::Fire => "Fire",
        }
    }

    pub fn info(self) -> &'static ThemeInfo {
        &CATALOG[self as usize]
    }
}

impl fmt::Display for Theme {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Theme {
    type Err = JournalError;

    /// Accepts the full name or either half of a compound name, any case.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_lowercase();
        Theme::ALL
            .iter()
            .copied()
            .find(|theme| {
                let name = theme.name().to_lowercase();
                name == wanted || name.split('/').any(|part| part == wanted)
            })
            .or(match wanted.as_str() {
                "chase" => Some(Theme::Chased),
                "school" | "work" => Some(Theme::SchoolExam),
                "house" | "houses" => Some(Theme::HouseHome),
                "vehicle" => Some(Theme::Vehicles),
                _ => None,
            })
            .ok_or_else(|| JournalError::invalid(format!("unknown dream theme '{}'", s.trim())))
    }
}

pub struct ThemeInfo {
    pub theme: Theme,
    pub keywords: &'static [&'static str],
    pub interpretation: &'static str,
    pub tips: &'static [&'static str],
}

static CATALOG: [ThemeInfo; 15] = [
    ThemeInfo {
        theme: Theme::Flying,
        keywords: &["fly", "flying", "soar", "wings", "air", "floating", "levitate", "hover"],
        interpretation: "Flying dreams often represent freedom, ambition, and desire to rise above limitations.",
        tips: &[
            "Consider what areas of your life you want more freedom in",
            "Flying dreams may indicate you're ready to overcome obstacles",
            "Notice if you're in control while flying - this reflects confidence levels",
        ],
    },
    ThemeInfo {
        theme: Theme::Falling,
        keywords: &["fall", "falling", "drop", "tumble", "plunge", "crash", "cliff"],
        interpretation: "Falling dreams typically symbolize feelings of losing control or anxiety about failure.",
        tips: &[
            "Examine areas where you feel out of control in waking life",
            "Practice stress-reduction techniques before bed",
            "Consider what fears you might need to address",
        ],
    },
    ThemeInfo {
        theme: Theme::Chased,
        keywords: &["chase", "chased", "chasing", "pursue", "run", "running", "escape", "hunt", "follow"],
        interpretation: "Being chased often represents avoiding something in your waking life.",
        tips: &[
            "Think about what you might be avoiding or running from",
            "Consider facing challenges directly rather than avoiding them",
            "Identify the source of stress or anxiety in your life",
        ],
    },
    ThemeInfo {
        theme: Theme::Water,
        keywords: &["water", "ocean", "sea", "river", "lake", "swimming", "drowning", "waves", "flood"],
        interpretation: "Water dreams relate to emotions, subconscious thoughts, and life transitions.",
        tips: &[
            "Pay attention to the water's condition - calm or turbulent",
            "Consider your current emotional state and relationships",
            "Water dreams may signal need for emotional cleansing",
        ],
    },
    ThemeInfo {
        theme: Theme::Animals,
        keywords: &["dog", "cat", "horse", "bird", "snake", "lion", "tiger", "bear", "wolf", "animal"],
        interpretation: "Animals in dreams often represent instincts, desires, or aspects of personality.",
        tips: &[
            "Consider what the specific animal represents to you",
            "Think about your relationship with your instincts",
            "Animals may represent people or traits in your life",
        ],
    },
    ThemeInfo {
        theme: Theme::Death,
        keywords: &["death", "dying", "dead", "funeral", "grave", "cemetery", "corpse"],
        interpretation: "Death dreams usually symbolize endings, transformations, or new beginnings.",
        tips: &[
            "Consider what in your life is ending or changing",
            "Death dreams often represent personal growth",
            "Think about what new phase you're entering",
        ],
    },
    ThemeInfo {
        theme: Theme::SchoolExam,
        keywords: &["school", "exam", "test", "classroom", "teacher", "student", "homework", "study"],
        interpretation: "School dreams often reflect feelings of being judged or tested in life.",
        tips: &[
            "Consider areas where you feel evaluated or judged",
            "Think about skills or knowledge you want to develop",
            "May indicate imposter syndrome or performance anxiety",
        ],
    },
    ThemeInfo {
        theme: Theme::HouseHome,
        keywords: &["house", "home", "room", "door", "window", "stairs", "basement", "attic"],
        interpretation: "Houses represent the self, with different rooms symbolizing different aspects of personality.",
        tips: &[
            "Pay attention to which rooms appear in your dreams",
            "Consider the condition of the house - reflects self-perception",
            "Unknown rooms may represent undiscovered aspects of yourself",
        ],
    },
    ThemeInfo {
        theme: Theme::Vehicles,
        keywords: &["car", "train", "plane", "bus", "driving", "crash", "accident", "travel"],
        interpretation: "Vehicles represent your journey through life and sense of control over your direction.",
        tips: &[
            "Notice if you're driving or a passenger - reflects control in life",
            "Consider where you're going in the dream",
            "Vehicle problems may indicate obstacles in your path",
        ],
    },
    ThemeInfo {
        theme: Theme::Money,
        keywords: &["money", "cash", "rich", "poor", "wealthy", "coins", "bills", "treasure"],
        interpretation: "Money dreams relate to self-worth, values, and material concerns.",
        tips: &[
            "Consider your relationship with material security",
            "Think about what you truly value in life",
            "Money dreams may reflect confidence or insecurity",
        ],
    },
    ThemeInfo {
        theme: Theme::PregnancyBirth,
        keywords: &["pregnant", "pregnancy", "baby", "birth", "newborn", "labor"],
        interpretation: "Pregnancy dreams often symbolize new projects, ideas, or phases of life being born.",
        tips: &[
            "Consider what new project or idea you're developing",
            "Think about creative potential waiting to be expressed",
            "May indicate readiness for new responsibilities",
        ],
    },
    ThemeInfo {
        theme: Theme::Nakedness,
        keywords: &["naked", "nude", "undressed", "clothes", "embarrassed", "exposed"],
        interpretation: "Nakedness dreams often reflect vulnerability or fear of being exposed.",
        tips: &[
            "Consider areas where you feel vulnerable or exposed",
            "Think about authenticity and being true to yourself",
            "May indicate fear of judgment from others",
        ],
    },
    ThemeInfo {
        theme: Theme::Food,
        keywords: &["food", "eating", "hungry", "feast", "cooking", "restaurant", "meal"],
        interpretation: "Food dreams relate to nourishment, satisfaction, and fulfillment in life.",
        tips: &[
            "Consider what kind of fulfillment you're seeking",
            "Think about emotional or spiritual nourishment needs",
            "Pay attention to whether you're satisfied or still hungry",
        ],
    },
    ThemeInfo {
        theme: Theme::Lost,
        keywords: &["lost", "missing", "can't find", "searching", "maze", "confused", "direction"],
        interpretation: "Being lost represents uncertainty about life direction or feeling confused about choices.",
        tips: &[
            "Consider areas of life where you feel uncertain",
            "Think about what guidance or clarity you need",
            "May indicate need to reconnect with your goals",
        ],
    },
    ThemeInfo {
        theme: Theme::Fire,
        keywords: &["fire", "flames", "burn", "burning", "smoke", "heat", "explosion"],
        interpretation: "Fire represents passion, transformation, destruction, or purification.",
        tips: &[
            "Consider what needs to be transformed in your life",
            "Think about your passionate feelings or anger",
            "Fire may indicate need for purification or fresh start",
        ],
    },
];

pub fn catalog() -> &'static [ThemeInfo] {
    &CATALOG
}

// One whole-word pattern per keyword, indexed like CATALOG.
static KEYWORD_PATTERNS: LazyLock<Vec<Vec<Regex>>> = LazyLock::new(|| {
    CATALOG
        .iter()
        .map(|info| {
            info.keywords
                .iter()
                .map(|kw| {
                    let pattern = format!(r"\b{}\b", regex::escape(kw));
                    Regex::new(&pattern).expect("catalog keyword patterns are valid")
                })
                .collect()
        })
        .collect()
});

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct ThemeMatch {
    pub theme: Theme,
    /// 0.0 to 1.0
    pub confidence: f64,
    pub keywords: Vec<String>,
}

impl ThemeMatch {
    pub fn percent(&self) -> f64 {
        self.confidence * 100.0
    }
}

/// Share of a theme's keywords found, square-rooted so a single hit on a
/// long keyword list still registers clearly. Zero hits is zero.
pub fn confidence(matched: usize, total: usize) -> f64 {
    if matched == 0 || total == 0 {
        return 0.0;
    }
    (matched.min(total) as f64 / total as f64).sqrt()
}

pub fn detect_themes(text: &str) -> Vec<ThemeMatch> {
    // Typographic apostrophes from phone keyboards match the ASCII keywords.
    let text = text.trim().to_lowercase().replace('\u{2019}', "'");
    if text.is_empty() {
        return Vec::new();
    }

    let mut matches: Vec<ThemeMatch> = CATALOG
        .iter()
        .zip(KEYWORD_PATTERNS.iter())
        .filter_map(|(info, patterns)| {
            let hits: Vec<String> = info
                .keywords
                .iter()
                .zip(patterns)
                .filter(|(_, re)| re.is_match(&text))
                .map(|(kw, _)| kw.to_string())
                .collect();
            if hits.is_empty() {
                return None;
            }
            Some(ThemeMatch {
                theme: info.theme,
                confidence: confidence(hits.len(), info.keywords.len()),
                keywords: hits,
            })
        })
        .collect();

    // Stable sort keeps catalog order among equal confidences.
    matches.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));
    debug!(themes = matches.len(), "detected dream themes");
    matches
}

pub struct Interpretation {
    pub theme: Theme,
    pub confidence: f64,
    pub keywords: Vec<String>,
    pub interpretation: &'static str,
    pub tips: &'static [&'static str],
}

pub fn interpret(matches: &[ThemeMatch]) -> Vec<Interpretation> {
    matches
        .iter()
        .map(|m| {
            let info = m.theme.info();
            Interpretation {
                theme: m.theme,
                confidence: m.confidence,
                keywords: m.keywords.clone(),
                interpretation: info.interpretation,
                tips: info.tips,
            }
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq)]
pub struct Recommendation {
    pub theme: Theme,
    pub frequency: usize,
    pub advice: String,
    pub insight: &'static str,
}

/// Advice for the three most frequent themes, most frequent first.
pub fn recommendations(most_common: &[(Theme, usize)]) -> Vec<Recommendation> {
    most_common
        .iter()
        .take(3)
        .map(|&(theme, frequency)| {
            let info = theme.info();
            let tip = info.tips.first().copied().unwrap_or("keep exploring this theme");
            Recommendation {
                theme,
                frequency,
                advice: format!(
                    "Since '{}' appears frequently in your dreams, {}",
                    theme,
                    lowercase_first(tip)
                ),
                insight: info.interpretation,
            }
        })
        .collect()
}

pub fn random_tip<R: Rng + ?Sized>(rng: &mut R) -> Option<(Theme, &'static str)> {
    let info = CATALOG.choose(rng)?;
    let tip = info.tips.choose(rng)?;
    Some((info.theme, *tip))
}

fn lowercase_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn themes_of(text: &str) -> Vec<Theme> {
        detect_themes(text).into_iter().map(|m| m.theme).collect()
    }

    #[test]
    fn test_catalog_is_indexed_by_theme() {
        for (i, theme) in Theme::ALL.iter().enumerate() {
            assert_eq!(CATALOG[i].theme, *theme);
            assert_eq!(theme.info().theme, *theme);
            assert!(!CATALOG[i].keywords.is_empty());
            assert!(!CATALOG[i].tips.is_empty());
        }
    }

    #[test]
    fn test_flying_school_falling_scenario() {
        let found = themes_of("I was flying over my old school, then falling suddenly");
        assert!(found.contains(&Theme::Flying));
        assert!(found.contains(&Theme::Falling));
        assert!(found.contains(&Theme::SchoolExam));
        assert!(!found.contains(&Theme::Chased));
        assert!(!found.contains(&Theme::Water));

        for m in detect_themes("I was flying over my old school, then falling suddenly") {
            assert!(m.confidence > 0.0);
        }
    }

    #[test]
    fn test_every_keyword_triggers_its_theme() {
        for info in catalog() {
            for kw in info.keywords {
                let text = format!("Last night there was {} everywhere", kw.to_uppercase());
                let found = detect_themes(&text);
                let hit = found.iter().find(|m| m.theme == info.theme);
                assert!(hit.is_some(), "keyword '{}' should trigger {}", kw, info.theme);
                assert!(hit.unwrap().confidence > 0.0);
            }
        }
    }

    #[test]
    fn test_no_keywords_no_themes() {
        assert!(detect_themes("").is_empty());
        assert!(detect_themes("   ").is_empty());
        assert!(detect_themes("I sat quietly and read a novel").is_empty());
    }

    #[test]
    fn test_whole_word_matching() {
        // "airport" must not count as "air", "category" must not count as "cat"
        assert!(themes_of("the category of airport lounges").is_empty());
        assert_eq!(themes_of("I can't find my keys"), vec![Theme::Lost]);
    }

    #[test]
    fn test_curly_apostrophe_matches_keyword() {
        assert_eq!(themes_of("I can\u{2019}t find my keys"), vec![Theme::Lost]);
        assert_eq!(themes_of("I CAN\u{2019}T FIND the exit"), vec![Theme::Lost]);
    }

    #[test]
    fn test_confidence_is_monotonic_and_bounded() {
        let mut previous = 0.0;
        for matched in 0..=10 {
            let c = confidence(matched, 8);
            assert!(c >= previous);
            assert!((0.0..=1.0).contains(&c));
            previous = c;
        }
        assert_eq!(confidence(8, 8), 1.0);

        let one = detect_themes("a snake");
        let two = detect_themes("a snake and a wolf");
        assert!(two[0].confidence > one[0].confidence);
    }

    #[test]
    fn test_ordered_by_confidence_then_catalog() {
        // Two water keywords against one animal keyword.
        let found = detect_themes("a dog by the river and the sea");
        assert_eq!(found[0].theme, Theme::Water);
        assert_eq!(found[1].theme, Theme::Animals);

        // Equal single hits on equally sized keyword lists fall back to catalog order.
        let found = themes_of("some cash behind the door");
        assert_eq!(found, vec![Theme::HouseHome, Theme::Money]);
    }

    #[test]
    fn test_theme_from_str() {
        assert_eq!("school".parse::<Theme>().unwrap(), Theme::SchoolExam);
        assert_eq!("FLYING".parse::<Theme>().unwrap(), Theme::Flying);
        assert_eq!("Pregnancy/Birth".parse::<Theme>().unwrap(), Theme::PregnancyBirth);
        assert_eq!("chase".parse::<Theme>().unwrap(), Theme::Chased);
        assert!("unicorns".parse::<Theme>().is_err());
    }

    #[test]
    fn test_recommendations_take_top_three() {
        let recs = recommendations(&[
            (Theme::Water, 5),
            (Theme::Fire, 3),
            (Theme::Lost, 2),
            (Theme::Money, 1),
        ]);
        assert_eq!(recs.len(), 3);
        assert_eq!(recs[0].theme, Theme::Water);
        assert!(recs[0].advice.starts_with("Since 'Water' appears frequently in your dreams, pay attention"));
    }

    #[test]
    fn test_random_tip_comes_from_catalog() {
        let mut rng = rand::thread_rng();
        let (theme, tip) = random_tip(&mut rng).unwrap();
        assert!(theme.info().tips.contains(&tip));
    }
}
