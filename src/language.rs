//! Preferred-language resolution and container-tag matching.
//!
//! Media containers tag streams with ISO 639 codes: Matroska conventionally
//! uses the bibliographic ISO 639-2 form (`fre`), other muxers emit the
//! terminology form (`fra`), and some write BCP 47 tags (`fr-FR`). Users, on
//! the other hand, type whatever they remember — `fr`, `fra`, `French`.
//! [`Language`] bridges the two sides: [`Language::resolve`] turns user input
//! into a known language, and [`Language::matches_tag`] decides whether a
//! stream tag denotes it.
//!
//! # Example
//!
//! ```
//! use audiograft::Language;
//!
//! let french = Language::resolve("French").unwrap();
//! assert_eq!(french.code(), "fre");
//! assert!(french.matches_tag("fra"));
//! assert!(french.matches_tag("fr-CA"));
//! assert!(!french.matches_tag("eng"));
//! ```

use std::fmt::{Display, Formatter, Result as FmtResult};

/// One row of the static language table.
#[derive(Debug, PartialEq, Eq)]
struct Entry {
    /// Bibliographic ISO 639-2 code (what Matroska typically stores).
    code: &'static str,
    /// Terminology ISO 639-2 code. Empty when identical to `code`.
    term: &'static str,
    /// ISO 639-1 two-letter code. Empty when the language has none.
    short: &'static str,
    /// English name.
    name: &'static str,
}

/// The languages this crate can resolve and match.
///
/// Covers the languages that appear in practice as audio/subtitle tags.
/// Bibliographic and terminology ISO 639-2 variants are both listed where
/// they differ.
static LANGUAGES: &[Entry] = &[
    Entry { code: "ara", term: "", short: "ar", name: "Arabic" },
    Entry { code: "bul", term: "", short: "bg", name: "Bulgarian" },
    Entry { code: "cat", term: "", short: "ca", name: "Catalan" },
    Entry { code: "chi", term: "zho", short: "zh", name: "Chinese" },
    Entry { code: "cze", term: "ces", short: "cs", name: "Czech" },
    Entry { code: "dan", term: "", short: "da", name: "Danish" },
    Entry { code: "dut", term: "nld", short: "nl", name: "Dutch" },
    Entry { code: "eng", term: "", short: "en", name: "English" },
    Entry { code: "est", term: "", short: "et", name: "Estonian" },
    Entry { code: "fin", term: "", short: "fi", name: "Finnish" },
    Entry { code: "fre", term: "fra", short: "fr", name: "French" },
    Entry { code: "ger", term: "deu", short: "de", name: "German" },
    Entry { code: "gre", term: "ell", short: "el", name: "Greek" },
    Entry { code: "heb", term: "", short: "he", name: "Hebrew" },
    Entry { code: "hin", term: "", short: "hi", name: "Hindi" },
    Entry { code: "hrv", term: "", short: "hr", name: "Croatian" },
    Entry { code: "hun", term: "", short: "hu", name: "Hungarian" },
    Entry { code: "ice", term: "isl", short: "is", name: "Icelandic" },
    Entry { code: "ind", term: "", short: "id", name: "Indonesian" },
    Entry { code: "ita", term: "", short: "it", name: "Italian" },
    Entry { code: "jpn", term: "", short: "ja", name: "Japanese" },
    Entry { code: "kor", term: "", short: "ko", name: "Korean" },
    Entry { code: "lav", term: "", short: "lv", name: "Latvian" },
    Entry { code: "lit", term: "", short: "lt", name: "Lithuanian" },
    Entry { code: "may", term: "msa", short: "ms", name: "Malay" },
    Entry { code: "nor", term: "", short: "no", name: "Norwegian" },
    Entry { code: "per", term: "fas", short: "fa", name: "Persian" },
    Entry { code: "pol", term: "", short: "pl", name: "Polish" },
    Entry { code: "por", term: "", short: "pt", name: "Portuguese" },
    Entry { code: "rum", term: "ron", short: "ro", name: "Romanian" },
    Entry { code: "rus", term: "", short: "ru", name: "Russian" },
    Entry { code: "slo", term: "slk", short: "sk", name: "Slovak" },
    Entry { code: "slv", term: "", short: "sl", name: "Slovenian" },
    Entry { code: "spa", term: "", short: "es", name: "Spanish" },
    Entry { code: "srp", term: "", short: "sr", name: "Serbian" },
    Entry { code: "swe", term: "", short: "sv", name: "Swedish" },
    Entry { code: "tha", term: "", short: "th", name: "Thai" },
    Entry { code: "tur", term: "", short: "tr", name: "Turkish" },
    Entry { code: "ukr", term: "", short: "uk", name: "Ukrainian" },
    Entry { code: "vie", term: "", short: "vi", name: "Vietnamese" },
];

/// A resolved preferred language.
///
/// Obtained via [`Language::resolve`]. Copyable handle into the static
/// language table; matching and accessors never allocate.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Language {
    entry: &'static Entry,
}

impl Language {
    /// Resolve user input to a known language.
    ///
    /// Accepts, case-insensitively: the bibliographic ISO 639-2 code
    /// (`fre`), the terminology code (`fra`), the ISO 639-1 code (`fr`),
    /// or the English name (`French`). Returns `None` for anything else.
    pub fn resolve(input: &str) -> Option<Language> {
        let needle = input.trim();
        if needle.is_empty() {
            return None;
        }
        LANGUAGES
            .iter()
            .find(|entry| {
                entry.code.eq_ignore_ascii_case(needle)
                    || (!entry.term.is_empty() && entry.term.eq_ignore_ascii_case(needle))
                    || (!entry.short.is_empty() && entry.short.eq_ignore_ascii_case(needle))
                    || entry.name.eq_ignore_ascii_case(needle)
            })
            .map(|entry| Language { entry })
    }

    /// The bibliographic ISO 639-2 code (e.g. `"fre"`).
    ///
    /// This is the form written into grafted stream tags, matching Matroska
    /// convention.
    pub fn code(&self) -> &'static str {
        self.entry.code
    }

    /// The terminology ISO 639-2 code where it differs from
    /// [`code`](Language::code) (e.g. `"fra"`), otherwise the same value.
    pub fn terminology_code(&self) -> &'static str {
        if self.entry.term.is_empty() {
            self.entry.code
        } else {
            self.entry.term
        }
    }

    /// The ISO 639-1 two-letter code, if the language has one.
    pub fn short_code(&self) -> Option<&'static str> {
        if self.entry.short.is_empty() {
            None
        } else {
            Some(self.entry.short)
        }
    }

    /// The English name (e.g. `"French"`).
    pub fn name(&self) -> &'static str {
        self.entry.name
    }

    /// Does a container language tag denote this language?
    ///
    /// Matches any ISO 639 alias, case-insensitively. BCP 47 tags are
    /// reduced to their primary subtag first, so `"fr-CA"` matches French.
    /// Undetermined tags never match (see [`is_undetermined`]).
    pub fn matches_tag(&self, tag: &str) -> bool {
        let primary = primary_subtag(tag);
        if primary.is_empty() || is_undetermined(primary) {
            return false;
        }
        self.entry.code.eq_ignore_ascii_case(primary)
            || (!self.entry.term.is_empty() && self.entry.term.eq_ignore_ascii_case(primary))
            || (!self.entry.short.is_empty() && self.entry.short.eq_ignore_ascii_case(primary))
    }

    /// Is the tag an exact (case-insensitive) match of the bibliographic
    /// ISO 639-2 code? Used to rank candidates during track selection.
    pub fn is_exact_code(&self, tag: &str) -> bool {
        self.entry.code.eq_ignore_ascii_case(tag.trim())
    }
}

impl Display for Language {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        write!(f, "{}", self.entry.name)
    }
}

/// Returns `true` when a stream tag carries no usable language information:
/// absent handled by callers, empty, or the ISO 639-2 `und` (undetermined)
/// code.
pub fn is_undetermined(tag: &str) -> bool {
    let primary = primary_subtag(tag);
    primary.is_empty() || primary.eq_ignore_ascii_case("und")
}

/// Reduce a possibly-BCP-47 tag (`fr-CA`, `pt_BR`) to its primary subtag.
fn primary_subtag(tag: &str) -> &str {
    tag.trim()
        .split(['-', '_'])
        .next()
        .unwrap_or("")
}
