//! Streaming access to JMnedict-style name dictionaries.
//!
//! [`EntryStream`] walks the XML in fixed-size chunks and hands out one
//! `<entry>` element at a time as an owned [`RawEntry`]; nothing outside the
//! current entry and a partial trailing chunk is kept in memory. Element names
//! are matched by suffix and without regard to case, so namespace prefixes
//! (`<jm:reb>`) are accepted.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::io::{self, Read};

use lazy_static::lazy_static;
use regex::Regex;

const CHUNK_SIZE: usize = 1024 * 1024;

lazy_static! {
    static ref ENTRY_START: Regex = Regex::new(r"(?i)<[\w.:-]*entry(?:\s[^>]*)?>").unwrap();
    static ref ENTRY_END: Regex = Regex::new(r"(?i)</[\w.:-]*entry\s*>").unwrap();
    static ref KANA_READING: Regex =
        Regex::new(r"(?i)<[\w.:-]*reb(?:\s[^>]*)?>([^<]*)</[\w.:-]*reb\s*>").unwrap();
    static ref KANJI_READING: Regex =
        Regex::new(r"(?i)<[\w.:-]*keb(?:\s[^>]*)?>([^<]*)</[\w.:-]*keb\s*>").unwrap();
    static ref NAME_TYPE: Regex =
        Regex::new(r"(?i)<[\w.:-]*name_type(?:\s[^>]*)?>([^<]*)</[\w.:-]*name_type\s*>").unwrap();
}

/// The markup of a single `<entry>` element.
#[derive(Debug)]
pub struct RawEntry {
    pub xml: String,
}

impl RawEntry {
    pub fn parse(&self) -> DictionaryEntry {
        DictionaryEntry::parse(&self.xml)
    }
}

/// Readings and name-type tags of one dictionary entry.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DictionaryEntry {
    /// `<reb>` texts in document order
    pub kana_readings: Vec<String>,
    /// `<keb>` texts in document order
    pub kanji_readings: Vec<String>,
    /// Lower-cased `<name_type>` values, entity markers removed (`&given;` -> `given`)
    pub name_types: BTreeSet<String>,
}

impl DictionaryEntry {
    pub fn parse(xml: &str) -> Self {
        let texts = |re: &Regex| -> Vec<String> {
            re.captures_iter(xml)
                .map(|cap| unescape(&cap[1]).into_owned())
                .filter(|text| !text.is_empty())
                .collect()
        };

        let name_types = NAME_TYPE
            .captures_iter(xml)
            .filter(|cap| !cap[1].is_empty())
            .map(|cap| {
                let value = cap[1].trim();
                value
                    .strip_prefix('&')
                    .and_then(|v| v.strip_suffix(';'))
                    .unwrap_or(value)
                    .to_lowercase()
            })
            .collect();

        Self {
            kana_readings: texts(&*KANA_READING),
            kanji_readings: texts(&*KANJI_READING),
            name_types,
        }
    }

    pub fn has_name_type(&self) -> bool {
        !self.name_types.is_empty()
    }

    pub fn has_readings(&self) -> bool {
        !self.kana_readings.is_empty() || !self.kanji_readings.is_empty()
    }
}

/// Resolves the predefined XML entities and numeric character references.
/// Anything else (DTD-declared entities) is left as written.
fn unescape(text: &str) -> Cow<'_, str> {
    if !text.contains('&') {
        return Cow::Borrowed(text);
    }

    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(amp) = rest.find('&') {
        out.push_str(&rest[..amp]);
        let tail = &rest[amp..];
        let Some(semi) = tail.find(';') else {
            rest = tail;
            break;
        };
        let name = &tail[1..semi];
        let resolved = match name {
            "lt" => Some('<'),
            "gt" => Some('>'),
            "amp" => Some('&'),
            "quot" => Some('"'),
            "apos" => Some('\''),
            _ => name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
                .and_then(|hex| u32::from_str_radix(hex, 16).ok())
                .or_else(|| name.strip_prefix('#').and_then(|dec| dec.parse().ok()))
                .and_then(char::from_u32),
        };
        match resolved {
            Some(ch) => out.push(ch),
            None => out.push_str(&tail[..=semi]),
        }
        rest = &tail[semi + 1..];
    }
    out.push_str(rest);
    Cow::Owned(out)
}

/// Iterator over the `<entry>` elements of a dictionary stream.
pub struct EntryStream<R> {
    reader: R,
    buffer: String,
    /// Bytes of a UTF-8 sequence split across two reads
    pending: Vec<u8>,
    chunk: Vec<u8>,
    eof: bool,
}

impl<R: Read> EntryStream<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: String::new(),
            pending: Vec::new(),
            chunk: vec![0u8; CHUNK_SIZE],
            eof: false,
        }
    }

    fn take_entry(&mut self) -> Option<RawEntry> {
        let Some(start) = ENTRY_START.find(&self.buffer) else {
            // keep a possibly truncated start tag
            let keep_from = self.buffer.rfind('<').unwrap_or(self.buffer.len());
            self.buffer.drain(..keep_from);
            return None;
        };
        let (start, open_end) = (start.start(), start.end());

        match ENTRY_END.find(&self.buffer[open_end..]) {
            Some(end) => {
                let stop = open_end + end.end();
                let xml = self.buffer[start..stop].to_string();
                self.buffer.drain(..stop);
                Some(RawEntry { xml })
            }
            None => {
                self.buffer.drain(..start);
                None
            }
        }
    }

    fn fill(&mut self) -> io::Result<()> {
        let n = self.reader.read(&mut self.chunk)?;
        if n == 0 {
            self.eof = true;
            if !self.pending.is_empty() {
                self.buffer.push_str(&String::from_utf8_lossy(&self.pending));
                self.pending.clear();
            }
            return Ok(());
        }

        self.pending.extend_from_slice(&self.chunk[..n]);
        // an incomplete sequence at the end waits for the next read
        let valid = match std::str::from_utf8(&self.pending) {
            Err(e) if e.error_len().is_none() => e.valid_up_to(),
            _ => self.pending.len(),
        };
        self.buffer
            .push_str(&String::from_utf8_lossy(&self.pending[..valid]));
        self.pending.drain(..valid);
        Ok(())
    }
}

impl<R: Read> Iterator for EntryStream<R> {
    type Item = io::Result<RawEntry>;

    fn next(&mut self) -> Option<Self::Item> {
        loop {
            if let Some(entry) = self.take_entry() {
                return Some(Ok(entry));
            }
            if self.eof {
                return None;
            }
            if let Err(e) = self.fill() {
                self.eof = true;
                return Some(Err(e));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Hands out one byte per read to exercise chunk boundaries.
    struct Trickle<'a>(&'a [u8]);

    impl Read for Trickle<'_> {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            match self.0.split_first() {
                Some((&b, rest)) if !buf.is_empty() => {
                    buf[0] = b;
                    self.0 = rest;
                    Ok(1)
                }
                _ => Ok(0),
            }
        }
    }

    const SAMPLE: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<!DOCTYPE JMnedict [
<!ELEMENT JMnedict (entry*)>
<!ELEMENT entry (ent_seq, k_ele*, r_ele+, trans+)>
<!ENTITY given "given name or forename, gender not specified">
]>
<JMnedict>
<entry>
<ent_seq>5000001</ent_seq>
<k_ele><keb>愛子</keb></k_ele>
<r_ele><reb>あいこ</reb></r_ele>
<trans><name_type>&fem;</name_type><trans_det>Aiko</trans_det></trans>
</entry>
<entry>
<ent_seq>5000002</ent_seq>
<r_ele><reb>スミス</reb></r_ele>
<trans><trans_det>Smith</trans_det></trans>
</entry>
</JMnedict>
"#;

    fn collect(reader: impl Read) -> Vec<DictionaryEntry> {
        EntryStream::new(reader)
            .map(|raw| raw.unwrap().parse())
            .collect()
    }

    // ─────────────────────────────────────────────────────────────
    // Entry splitting
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn yields_each_entry_once() {
        let entries = collect(SAMPLE.as_bytes());
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].kana_readings, vec!["あいこ"]);
        assert_eq!(entries[0].kanji_readings, vec!["愛子"]);
        assert_eq!(entries[1].kana_readings, vec!["スミス"]);
    }

    #[test]
    fn dtd_declarations_are_not_entries() {
        let entries = collect(SAMPLE.as_bytes());
        assert!(entries.iter().all(|e| e.has_readings()));
    }

    #[test]
    fn multibyte_text_survives_single_byte_reads() {
        let trickled = collect(Trickle(SAMPLE.as_bytes()));
        assert_eq!(trickled, collect(SAMPLE.as_bytes()));
    }

    #[test]
    fn namespaced_and_uppercase_tags_match() {
        let xml = "<jm:Entry><jm:r_ele><jm:REB>けん</jm:REB></jm:r_ele>\
                   <jm:name_type>&masc;</jm:name_type></jm:Entry>";
        let entries = collect(xml.as_bytes());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].kana_readings, vec!["けん"]);
        assert!(entries[0].has_name_type());
    }

    #[test]
    fn unterminated_entry_is_dropped() {
        let xml = "<entry><r_ele><reb>あ</reb></r_ele></entry><entry><r_ele><reb>い";
        assert_eq!(collect(xml.as_bytes()).len(), 1);
    }

    #[test]
    fn empty_input_yields_nothing() {
        assert!(collect(&b""[..]).is_empty());
    }

    // ─────────────────────────────────────────────────────────────
    // Entry fields
    // ─────────────────────────────────────────────────────────────

    #[test]
    fn name_types_are_lowercased_without_entity_markers() {
        let entry = DictionaryEntry::parse(
            "<entry><name_type>&Given;</name_type><name_type>surname</name_type></entry>",
        );
        let types: Vec<_> = entry.name_types.iter().map(String::as_str).collect();
        assert_eq!(types, vec!["given", "surname"]);
    }

    #[test]
    fn whitespace_name_type_still_counts() {
        let entry = DictionaryEntry::parse("<entry><name_type> </name_type></entry>");
        assert!(entry.has_name_type());
    }

    #[test]
    fn empty_name_type_does_not_count() {
        let entry = DictionaryEntry::parse("<entry><name_type></name_type></entry>");
        assert!(!entry.has_name_type());
    }

    #[test]
    fn empty_readings_are_ignored() {
        let entry = DictionaryEntry::parse("<entry><r_ele><reb></reb></r_ele></entry>");
        assert!(!entry.has_readings());
    }

    #[test]
    fn predefined_entities_are_resolved() {
        assert_eq!(unescape("a&amp;b&#x3042;&#12356;"), "a&bあい");
        assert_eq!(unescape("&unknown; &"), "&unknown; &");
    }
}
