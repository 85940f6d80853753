//! Script-based language routing for partitioned views.
//!
//! Documents are routed to a single language bucket by majority script:
//! a document counts as Arabic only when Arabic-script codepoints make up
//! more than [`ARABIC_MAJORITY_FRACTION`] of its alphabetic codepoints.
//! A letter-free document (empty text, digits-only scans) routes to English.

/// Fraction of alphabetic codepoints that must be Arabic-script for a
/// document to route into the Arabic partition.
pub const ARABIC_MAJORITY_FRACTION: f64 = 0.5;

/// Detected document language. Doubles as the partition key for the
/// per-language CSV views.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Language {
    English,
    Arabic,
}

impl Language {
    pub fn as_str(&self) -> &'static str {
        match self {
            Language::English => "english",
            Language::Arabic => "arabic",
        }
    }
}

/// Arabic script blocks: base, Supplement, Extended-A, and the two
/// Presentation Forms blocks.
fn is_arabic_script(c: char) -> bool {
    matches!(c,
        '\u{0600}'..='\u{06FF}'
        | '\u{0750}'..='\u{077F}'
        | '\u{08A0}'..='\u{08FF}'
        | '\u{FB50}'..='\u{FDFF}'
        | '\u{FE70}'..='\u{FEFF}')
}

/// Classify text by majority script fraction.
pub fn detect_language(text: &str) -> Language {
    let mut alphabetic = 0u64;
    let mut arabic = 0u64;
    for c in text.chars() {
        if c.is_alphabetic() {
            alphabetic += 1;
            if is_arabic_script(c) {
                arabic += 1;
            }
        }
    }
    if alphabetic == 0 {
        return Language::English;
    }
    if arabic as f64 / alphabetic as f64 > ARABIC_MAJORITY_FRACTION {
        Language::Arabic
    } else {
        Language::English
    }
}
