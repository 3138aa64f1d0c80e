//! Keyword extraction for query construction and lexical recall
//!
//! Splits text on a fixed punctuation/whitespace class, drops stop-words and
//! short segments, and weights the remaining terms by frequency with a boost
//! for importance markers. Pure and deterministic: no I/O, stable ordering
//! on ties.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Frequency multiplier applied when a term contains an importance marker
const IMPORTANCE_MULTIPLIER: f32 = 1.5;

/// Delimiters treated as segment boundaries, in addition to whitespace.
/// Covers ASCII and CJK punctuation so mixed-language chat text segments
/// into phrases rather than one long run.
const DELIMITERS: &[char] = &[
    ',', '.', '!', '?', ';', ':', '"', '\'', '(', ')', '[', ']', '<', '>',
    '，', '。', '！', '？', '；', '：', '、', '“', '”', '‘', '’', '（', '）',
    '【', '】', '《', '》', '…', '—', '·', '~', '-', '*', '#',
];

/// Segments carrying no retrieval signal, skipped during extraction
const STOP_WORDS: &[&str] = &[
    // English function words
    "the", "a", "an", "and", "or", "but", "of", "to", "in", "on", "at",
    "is", "are", "was", "were", "be", "been", "it", "this", "that", "with",
    "for", "as", "by", "from", "you", "your", "i", "my", "me", "we", "they",
    "he", "she", "his", "her", "them", "then", "than", "so", "not", "no",
    "do", "does", "did", "have", "has", "had", "will", "would", "can",
    "could", "should", "what", "when", "where", "who", "how", "why",
    // Chinese particles and fillers
    "的", "了", "是", "在", "我", "你", "他", "她", "它", "们", "这", "那",
    "有", "和", "就", "都", "也", "不", "很", "吗", "吧", "呢", "啊", "着",
    "一个", "什么", "这个", "那个", "但是", "因为", "所以", "如果", "然后",
];

/// Substrings that mark a term as narratively important
const IMPORTANCE_MARKERS: &[&str] = &[
    "重要", "关键", "突然", "秘密", "必须", "注意", "危险", "死", "杀",
    "important", "critical", "suddenly", "secret", "must", "never",
    "danger", "death",
];

/// Heuristic category of an extracted keyword
///
/// Used for optional downstream weighting; classification accuracy is not
/// required for pipeline correctness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KeywordKind {
    Person,
    Location,
    Event,
    Emotion,
    Object,
    Default,
}

/// Marker substrings used to classify keywords by kind
const PERSON_MARKERS: &[&str] = &[
    "先生", "小姐", "大人", "队长", "老师", "陛下", "mr", "mrs", "dr",
    "captain", "lord", "lady",
];
const LOCATION_MARKERS: &[&str] = &[
    "森林", "城", "村", "山", "河", "岛", "镇", "殿", "塔", "洞",
    "forest", "city", "village", "mountain", "castle", "tower", "cave",
];
const EVENT_MARKERS: &[&str] = &[
    "战", "婚", "祭", "宴", "袭击", "逃", "death", "battle", "wedding",
    "attack", "escape", "festival",
];
const EMOTION_MARKERS: &[&str] = &[
    "爱", "恨", "怒", "哭", "笑", "怕", "喜", "悲", "love", "hate",
    "anger", "fear", "joy", "sad",
];
const OBJECT_MARKERS: &[&str] = &[
    "剑", "刀", "书", "信", "钥匙", "药", "宝", "戒指", "sword", "book",
    "letter", "key", "ring", "potion",
];

/// An extracted keyword with its weighted score
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Keyword {
    /// The keyword text
    pub text: String,
    /// Frequency multiplied by the importance factor
    pub weight: f32,
    /// Heuristic classification
    pub kind: KeywordKind,
}

/// Deterministic keyword extractor
#[derive(Debug, Clone, Default)]
pub struct KeywordExtractor;

impl KeywordExtractor {
    /// Create a new extractor
    pub fn new() -> Self {
        Self
    }

    /// Extract up to `max_keywords` keyword strings from `text`
    ///
    /// Segments shorter than `min_length` characters or present in the
    /// stop-word set are discarded. Output is ordered by weighted score
    /// descending, first-seen order on ties. Empty input yields an empty
    /// list.
    pub fn extract(&self, text: &str, max_keywords: usize, min_length: usize) -> Vec<String> {
        self.extract_weighted(text, max_keywords, min_length)
            .into_iter()
            .map(|kw| kw.text)
            .collect()
    }

    /// Extract keywords with their weights and heuristic kinds
    pub fn extract_weighted(
        &self,
        text: &str,
        max_keywords: usize,
        min_length: usize,
    ) -> Vec<Keyword> {
        let segments = segment(text);

        // Term frequency in first-seen order
        let mut counts: HashMap<&str, usize> = HashMap::new();
        let mut order: Vec<&str> = Vec::new();
        for seg in &segments {
            if seg.chars().count() < min_length || STOP_WORDS.contains(&seg.as_str()) {
                continue;
            }
            let entry = counts.entry(seg.as_str()).or_insert(0);
            if *entry == 0 {
                order.push(seg.as_str());
            }
            *entry += 1;
        }

        let mut keywords: Vec<Keyword> = order
            .into_iter()
            .map(|term| {
                let frequency = counts[term] as f32;
                let multiplier = if contains_marker(term, IMPORTANCE_MARKERS) {
                    IMPORTANCE_MULTIPLIER
                } else {
                    1.0
                };
                Keyword {
                    text: term.to_string(),
                    weight: frequency * multiplier,
                    kind: classify(term),
                }
            })
            .collect();

        // Stable sort keeps first-seen order on equal weights
        keywords.sort_by(|a, b| {
            b.weight
                .partial_cmp(&a.weight)
                .unwrap_or(std::cmp::Ordering::Equal)
        });
        keywords.truncate(max_keywords);
        keywords
    }
}

/// Split text into segments on whitespace and the fixed delimiter class
fn segment(text: &str) -> Vec<String> {
    text.split(|c: char| c.is_whitespace() || DELIMITERS.contains(&c))
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
        .collect()
}

fn contains_marker(term: &str, markers: &[&str]) -> bool {
    let lower = term.to_lowercase();
    markers.iter().any(|m| lower.contains(m))
}

/// Classify a term by the first marker family it matches
fn classify(term: &str) -> KeywordKind {
    if contains_marker(term, PERSON_MARKERS) {
        KeywordKind::Person
    } else if contains_marker(term, LOCATION_MARKERS) {
        KeywordKind::Location
    } else if contains_marker(term, EVENT_MARKERS) {
        KeywordKind::Event
    } else if contains_marker(term, EMOTION_MARKERS) {
        KeywordKind::Emotion
    } else if contains_marker(term, OBJECT_MARKERS) {
        KeywordKind::Object
    } else {
        KeywordKind::Default
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_input_yields_empty_list() {
        let extractor = KeywordExtractor::new();
        assert!(extractor.extract("", 5, 2).is_empty());
        assert!(extractor.extract("   \n\t ", 5, 2).is_empty());
    }

    #[test]
    fn test_stop_words_removed() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract("the dragon and the forest", 10, 2);
        assert!(keywords.contains(&"dragon".to_string()));
        assert!(keywords.contains(&"forest".to_string()));
        assert!(!keywords.contains(&"the".to_string()));
        assert!(!keywords.contains(&"and".to_string()));
    }

    #[test]
    fn test_min_length_counts_characters_not_bytes() {
        let extractor = KeywordExtractor::new();
        // "龙" is one character but three bytes
        let keywords = extractor.extract("龙 dragon", 10, 2);
        assert!(!keywords.contains(&"龙".to_string()));
        assert!(keywords.contains(&"dragon".to_string()));

        let keywords = extractor.extract("巨龙 dragon", 10, 2);
        assert!(keywords.contains(&"巨龙".to_string()));
    }

    #[test]
    fn test_frequency_ordering() {
        let extractor = KeywordExtractor::new();
        let keywords =
            extractor.extract("dragon cave dragon treasure dragon cave", 10, 2);
        assert_eq!(keywords[0], "dragon");
        assert_eq!(keywords[1], "cave");
    }

    #[test]
    fn test_importance_marker_boost() {
        let extractor = KeywordExtractor::new();
        // "secret-passage" appears once but carries a marker; "treasure"
        // appears once without one, so the marked term must rank first.
        let keywords = extractor.extract_weighted("treasure secretpassage", 10, 2);
        assert_eq!(keywords[0].text, "secretpassage");
        assert!((keywords[0].weight - IMPORTANCE_MULTIPLIER).abs() < f32::EPSILON);
        assert!((keywords[1].weight - 1.0).abs() < f32::EPSILON);
    }

    #[test]
    fn test_ties_preserve_first_seen_order() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract("zebra yak wolf", 10, 2);
        assert_eq!(keywords, vec!["zebra", "yak", "wolf"]);
    }

    #[test]
    fn test_max_keywords_truncation() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract("alpha beta gamma delta epsilon", 3, 2);
        assert_eq!(keywords.len(), 3);
    }

    #[test]
    fn test_cjk_punctuation_segments() {
        let extractor = KeywordExtractor::new();
        let keywords = extractor.extract("巨龙出现，森林着火！村民逃跑。", 10, 2);
        assert!(keywords.contains(&"巨龙出现".to_string()));
        assert!(keywords.contains(&"森林着火".to_string()));
        assert!(keywords.contains(&"村民逃跑".to_string()));
    }

    #[test]
    fn test_classification_heuristics() {
        assert_eq!(classify("黑暗森林"), KeywordKind::Location);
        assert_eq!(classify("王队长"), KeywordKind::Person);
        assert_eq!(classify("怒火"), KeywordKind::Emotion);
        assert_eq!(classify("古剑"), KeywordKind::Object);
        assert_eq!(classify("偷袭击退"), KeywordKind::Event);
        assert_eq!(classify("随便"), KeywordKind::Default);
    }

    #[test]
    fn test_extraction_is_deterministic() {
        let extractor = KeywordExtractor::new();
        let text = "dragon forest dragon cave treasure secret cave";
        let first = extractor.extract(text, 5, 2);
        let second = extractor.extract(text, 5, 2);
        assert_eq!(first, second);
    }
}
