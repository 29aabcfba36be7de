//! Given-name extraction: one pass over the dictionary, one candidate per
//! entry at most.

use std::collections::BTreeSet;
use std::io::Read;
use std::time::{Duration, Instant};

use indicatif::{ProgressBar, ProgressStyle};
use lazy_static::lazy_static;
use regex::Regex;
use tracing::{info, trace};

use crate::error::{Error, Result};
use crate::jmnedict::{DictionaryEntry, EntryStream};
use crate::romaji::Transliterator;
use crate::text::title_case;

pub const MIN_NAME_LEN: usize = 2;
pub const MAX_NAME_LEN: usize = 14;

lazy_static! {
    static ref KANA_ONLY: Regex = Regex::new(r"^[\x{3040}-\x{30FF}]+$").unwrap();
    static ref NAME_SHAPE: Regex = Regex::new(r"^[A-Za-z][A-Za-z' -]*$").unwrap();
}

/// Which set an accepted candidate lands in.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Classification {
    /// The entry carried at least one name-type tag
    Given,
    /// No name-type tag
    Fallback,
}

#[derive(Debug, Default, Clone)]
pub struct Stats {
    pub entries_scanned: usize,
    pub without_readings: usize,
    pub rejected: usize,
    pub given: usize,
    pub fallback: usize,
    pub elapsed: Duration,
}

/// Result of a full pass.
#[derive(Debug, Default)]
pub struct Extraction {
    pub given: BTreeSet<String>,
    pub fallback: BTreeSet<String>,
    pub stats: Stats,
}

impl Extraction {
    /// Sorted union of both sets.
    ///
    /// The split between explicit given names and fallback candidates does not
    /// filter anything here; both sets are always merged.
    pub fn into_names(self) -> Result<Vec<String>> {
        let mut names = self.given;
        names.extend(self.fallback);
        if names.is_empty() {
            return Err(Error::NoData);
        }
        Ok(names.into_iter().collect())
    }
}

/// First of the shortest strings, counting characters.
fn shortest<'a>(readings: impl IntoIterator<Item = &'a String>) -> Option<&'a str> {
    readings
        .into_iter()
        .fold(None, |best: Option<&'a String>, r| match best {
            Some(b) if b.chars().count() <= r.chars().count() => Some(b),
            _ => Some(r),
        })
        .map(String::as_str)
}

/// Picks the reading to romanize: the shortest pure-kana reading if there is
/// one, else the shortest kana reading of any kind, else the shortest kanji
/// reading. Compound "surname + given name" readings tend to be the longer
/// ones, so the shortest is preferred.
pub fn select_reading(entry: &DictionaryEntry) -> Option<&str> {
    if entry.kana_readings.is_empty() {
        return shortest(&entry.kanji_readings);
    }
    let pure: Vec<&String> = entry
        .kana_readings
        .iter()
        .filter(|r| KANA_ONLY.is_match(r))
        .collect();
    if pure.is_empty() {
        shortest(&entry.kana_readings)
    } else {
        shortest(pure)
    }
}

/// Length in `MIN_NAME_LEN..=MAX_NAME_LEN` and shaped like a Latin name.
pub fn is_valid_candidate(name: &str) -> bool {
    let len = name.chars().count();
    (MIN_NAME_LEN..=MAX_NAME_LEN).contains(&len) && NAME_SHAPE.is_match(name)
}

pub struct NameExtractor<'t, T: Transliterator + ?Sized> {
    transliterator: &'t T,
    quiet: bool,
}

impl<'t, T: Transliterator + ?Sized> NameExtractor<'t, T> {
    pub fn new(transliterator: &'t T) -> Self {
        Self {
            transliterator,
            quiet: false,
        }
    }

    pub fn quiet(mut self, quiet: bool) -> Self {
        self.quiet = quiet;
        self
    }

    /// Romanized, title-cased candidate for `entry`, if it passes validation.
    pub fn candidate(&self, entry: &DictionaryEntry) -> Option<String> {
        let reading = select_reading(entry)?;
        let romaji = self.transliterator.romanize(reading);
        let name = title_case(romaji.trim());
        if is_valid_candidate(&name) {
            Some(name)
        } else {
            trace!(reading, %name, "rejected candidate");
            None
        }
    }

    pub fn classify(&self, entry: &DictionaryEntry) -> Option<(Classification, String)> {
        let name = self.candidate(entry)?;
        let class = if entry.has_name_type() {
            Classification::Given
        } else {
            Classification::Fallback
        };
        Some((class, name))
    }

    /// Streams every entry of `reader` through [`classify`](Self::classify).
    ///
    /// Each raw entry is owned by one loop iteration and dropped at its end,
    /// whichever way the iteration exits.
    pub fn scan(&self, reader: impl Read) -> Result<Extraction> {
        let start_time = Instant::now();
        let mut out = Extraction::default();

        let pb = if self.quiet {
            ProgressBar::hidden()
        } else {
            let pb = ProgressBar::new_spinner();
            if let Ok(style) = ProgressStyle::default_spinner().template("{spinner} {msg}") {
                pb.set_style(style);
            }
            pb
        };

        for raw in EntryStream::new(reader) {
            let raw = raw.map_err(|e| Error::io("cannot read dictionary stream", e))?;
            let stats = &mut out.stats;
            stats.entries_scanned += 1;

            if stats.entries_scanned % 1000 == 0 {
                let rate = stats.entries_scanned as f64 / start_time.elapsed().as_secs_f64();
                pb.set_message(format!(
                    "Entries: {} | Given: {} | Fallback: {} | Rate: {:.0} entries/s",
                    stats.entries_scanned, stats.given, stats.fallback, rate
                ));
            }

            let entry = raw.parse();
            if !entry.has_readings() {
                stats.without_readings += 1;
                continue;
            }

            match self.classify(&entry) {
                Some((Classification::Given, name)) => {
                    stats.given += 1;
                    out.given.insert(name);
                }
                Some((Classification::Fallback, name)) => {
                    stats.fallback += 1;
                    out.fallback.insert(name);
                }
                None => stats.rejected += 1,
            }
        }

        pb.finish_and_clear();
        out.stats.elapsed = start_time.elapsed();

        let stats = &out.stats;
        info!(
            entries = stats.entries_scanned,
            without_readings = stats.without_readings,
            rejected = stats.rejected,
            given = stats.given,
            fallback = stats.fallback,
            unique_given = out.given.len(),
            unique_fallback = out.fallback.len(),
            "dictionary scan finished in {:.1}s",
            stats.elapsed.as_secs_f64()
        );
        Ok(out)
    }

    /// Sorted, de-duplicated names from the whole stream; fails with
    /// [`Error::NoData`] when nothing survives.
    pub fn extract_names(&self, reader: impl Read) -> Result<Vec<String>> {
        self.scan(reader)?.into_names()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::romaji::{Hepburn, KanjiHepburn};

    fn entry(kana: &[&str], kanji: &[&str], name_types: &[&str]) -> DictionaryEntry {
        DictionaryEntry {
            kana_readings: kana.iter().map(|s| s.to_string()).collect(),
            kanji_readings: kanji.iter().map(|s| s.to_string()).collect(),
            name_types: name_types.iter().map(|s| s.to_string()).collect(),
        }
    }

    fn xml_entry(reb: &str, name_type: Option<&str>) -> String {
        let trans = name_type
            .map(|t| format!("<trans><name_type>&{t};</name_type></trans>"))
            .unwrap_or_default();
        format!("<entry><r_ele><reb>{reb}</reb></r_ele>{trans}</entry>\n")
    }

    /// Returns the same romanization for every reading.
    struct Fixed(&'static str);

    impl Transliterator for Fixed {
        fn romanize(&self, _reading: &str) -> String {
            self.0.to_string()
        }
    }

    // ─────────────────────────────────────────────────────────────
    // Reading selection
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn shortest_kana_reading_wins() {
        let e = entry(&["あいこたろう", "あいこ"], &[], &[]);
        assert_eq!(select_reading(&e), Some("あいこ"));
        let e = entry(&["あいこ", "あいこたろう"], &[], &[]);
        assert_eq!(select_reading(&e), Some("あいこ"));
    }

    #[test]
    fn ties_go_to_first_reading() {
        let e = entry(&["けん", "じょう", "りく"], &[], &[]);
        assert_eq!(select_reading(&e), Some("けん"));
    }

    #[test]
    fn pure_kana_preferred_over_shorter_mixed() {
        let e = entry(&["あ1", "あいこたろう"], &[], &[]);
        assert_eq!(select_reading(&e), Some("あいこたろう"));
    }

    #[test]
    fn mixed_kana_used_when_nothing_is_pure() {
        let e = entry(&["あい子さん", "あ1"], &[], &[]);
        assert_eq!(select_reading(&e), Some("あ1"));
    }

    #[test]
    fn kanji_only_entries_use_shortest_kanji() {
        let e = entry(&[], &["愛子様", "愛子"], &[]);
        assert_eq!(select_reading(&e), Some("愛子"));
    }

    #[test]
    fn no_readings_no_selection() {
        assert_eq!(select_reading(&entry(&[], &[], &["given"])), None);
    }

    // ─────────────────────────────────────────────────────────────
    // Validation
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn length_boundaries() {
        assert!(!is_valid_candidate("A"));
        assert!(is_valid_candidate("Ai"));
        assert!(is_valid_candidate(&format!("A{}", "b".repeat(13))));
        assert!(!is_valid_candidate(&format!("A{}", "b".repeat(14))));
    }

    #[test]
    fn shape_boundaries() {
        assert!(is_valid_candidate("OBrien"));
        assert!(is_valid_candidate("O'Brien"));
        assert!(is_valid_candidate("Mary Ann"));
        assert!(is_valid_candidate("Jean-Luc"));
        assert!(!is_valid_candidate("1Aiko"));
        assert!(!is_valid_candidate("-Aiko"));
        assert!(!is_valid_candidate("Ai子"));
        assert!(!is_valid_candidate("Aikō"));
    }

    // ─────────────────────────────────────────────────────────────
    // Candidates and classification
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn candidate_is_title_cased_romaji() {
        let hepburn = Hepburn::new();
        let extractor = NameExtractor::new(&hepburn);
        assert_eq!(
            extractor.candidate(&entry(&["しゅんすけ"], &[], &[])),
            Some("Shunsuke".to_string())
        );
    }

    #[test]
    fn transliterator_is_injected() {
        let fixed = Fixed("  mary ann ");
        let extractor = NameExtractor::new(&fixed);
        assert_eq!(
            extractor.candidate(&entry(&["なんでも"], &[], &[])),
            Some("Mary Ann".to_string())
        );
    }

    #[test]
    fn kana_only_reader_rejects_kanji_entry() {
        let hepburn = Hepburn::new();
        let extractor = NameExtractor::new(&hepburn);
        assert_eq!(extractor.candidate(&entry(&[], &["太郎"], &["given"])), None);
    }

    #[test]
    fn kanji_only_entry_yields_a_given_name() {
        let reader = KanjiHepburn::new();
        let extractor = NameExtractor::new(&reader);
        let (class, name) = extractor
            .classify(&entry(&[], &["愛子"], &["given"]))
            .unwrap();
        assert_eq!(class, Classification::Given);
        assert!(is_valid_candidate(&name), "{name}");
        assert!(name.starts_with(|c: char| c.is_ascii_uppercase()));
    }

    #[test]
    fn mixed_kana_reading_is_read_through() {
        let reader = KanjiHepburn::new();
        let extractor = NameExtractor::new(&reader);
        let name = extractor.candidate(&entry(&["あい子"], &[], &[])).unwrap();
        assert!(is_valid_candidate(&name), "{name}");
    }

    #[test]
    fn name_type_decides_the_set() {
        let hepburn = Hepburn::new();
        let extractor = NameExtractor::new(&hepburn);
        assert_eq!(
            extractor.classify(&entry(&["あいこ"], &[], &["fem"])),
            Some((Classification::Given, "Aiko".to_string()))
        );
        assert_eq!(
            extractor.classify(&entry(&["あいこ"], &[], &[])),
            Some((Classification::Fallback, "Aiko".to_string()))
        );
    }

    // ─────────────────────────────────────────────────────────────
    // Full pass
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn output_is_sorted_union_without_duplicates() {
        let xml = [
            "<JMnedict>\n".to_string(),
            xml_entry("さくら", Some("fem")),
            xml_entry("ケンジ", None),
            xml_entry("あいこ", Some("fem")),
            xml_entry("アイコ", None),
            xml_entry("さくら", Some("given")),
            xml_entry("あ", Some("given")),
            "<entry><ent_seq>1</ent_seq></entry>\n".to_string(),
            "</JMnedict>\n".to_string(),
        ]
        .concat();

        let hepburn = Hepburn::new();
        let extraction = NameExtractor::new(&hepburn)
            .quiet(true)
            .scan(xml.as_bytes())
            .unwrap();

        assert_eq!(extraction.stats.entries_scanned, 7);
        assert_eq!(extraction.stats.without_readings, 1);
        assert_eq!(extraction.stats.rejected, 1);
        assert_eq!(
            extraction.given.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Aiko", "Sakura"]
        );
        assert_eq!(
            extraction.fallback.iter().map(String::as_str).collect::<Vec<_>>(),
            vec!["Aiko", "Kenji"]
        );

        let names = extraction.into_names().unwrap();
        assert_eq!(names, vec!["Aiko", "Kenji", "Sakura"]);
    }

    #[test]
    fn nothing_usable_is_no_data() {
        let xml = format!(
            "<JMnedict><entry><k_ele><keb>太郎</keb></k_ele></entry>{}</JMnedict>",
            xml_entry("あ", Some("given"))
        );
        let hepburn = Hepburn::new();
        let err = NameExtractor::new(&hepburn)
            .quiet(true)
            .extract_names(xml.as_bytes())
            .unwrap_err();
        assert!(matches!(err, Error::NoData));
    }

    #[test]
    fn empty_stream_is_no_data() {
        let hepburn = Hepburn::new();
        let err = NameExtractor::new(&hepburn)
            .quiet(true)
            .extract_names(&b"<JMnedict></JMnedict>"[..])
            .unwrap_err();
        assert!(matches!(err, Error::NoData));
    }
}
