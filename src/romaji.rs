//! Kana to Latin transliteration (modified Hepburn).
//!
//! The extractor receives a [`Transliterator`] rather than reaching for a
//! global converter. [`Hepburn`] reads kana only; [`KanjiHepburn`] first turns
//! kanji into hiragana with the `kakasi` reading dictionary. Both hold no
//! state and are safe to share between threads.

use std::collections::HashMap;

use lazy_static::lazy_static;
use unicode_normalization::UnicodeNormalization;

pub trait Transliterator {
    /// Romanizes `reading`. Characters that cannot be read are passed
    /// through unchanged.
    fn romanize(&self, reading: &str) -> String;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct Hepburn;

impl Hepburn {
    pub fn new() -> Self {
        Self
    }
}

const SOKUON: char = 'っ';
const CHOONPU: char = 'ー';
const ITERATION: char = 'ゝ';
const VOICED_ITERATION: char = 'ゞ';

lazy_static! {
    static ref MONOGRAPHS: HashMap<char, &'static str> = {
        let table: &[(char, &str)] = &[
            ('あ', "a"), ('い', "i"), ('う', "u"), ('え', "e"), ('お', "o"),
            ('か', "ka"), ('き', "ki"), ('く', "ku"), ('け', "ke"), ('こ', "ko"),
            ('が', "ga"), ('ぎ', "gi"), ('ぐ', "gu"), ('げ', "ge"), ('ご', "go"),
            ('さ', "sa"), ('し', "shi"), ('す', "su"), ('せ', "se"), ('そ', "so"),
            ('ざ', "za"), ('じ', "ji"), ('ず', "zu"), ('ぜ', "ze"), ('ぞ', "zo"),
            ('た', "ta"), ('ち', "chi"), ('つ', "tsu"), ('て', "te"), ('と', "to"),
            ('だ', "da"), ('ぢ', "ji"), ('づ', "zu"), ('で', "de"), ('ど', "do"),
            ('な', "na"), ('に', "ni"), ('ぬ', "nu"), ('ね', "ne"), ('の', "no"),
            ('は', "ha"), ('ひ', "hi"), ('ふ', "fu"), ('へ', "he"), ('ほ', "ho"),
            ('ば', "ba"), ('び', "bi"), ('ぶ', "bu"), ('べ', "be"), ('ぼ', "bo"),
            ('ぱ', "pa"), ('ぴ', "pi"), ('ぷ', "pu"), ('ぺ', "pe"), ('ぽ', "po"),
            ('ま', "ma"), ('み', "mi"), ('む', "mu"), ('め', "me"), ('も', "mo"),
            ('や', "ya"), ('ゆ', "yu"), ('よ', "yo"),
            ('ら', "ra"), ('り', "ri"), ('る', "ru"), ('れ', "re"), ('ろ', "ro"),
            ('わ', "wa"), ('ゐ', "i"), ('ゑ', "e"), ('を', "o"),
            ('ん', "n"),
            ('ゔ', "vu"),
            // small kana standing on their own
            ('ぁ', "a"), ('ぃ', "i"), ('ぅ', "u"), ('ぇ', "e"), ('ぉ', "o"),
            ('ゃ', "ya"), ('ゅ', "yu"), ('ょ', "yo"), ('ゎ', "wa"),
            ('ゕ', "ka"), ('ゖ', "ke"),
        ];
        table.iter().copied().collect()
    };

    static ref DIGRAPHS: HashMap<(char, char), String> = {
        let mut m = HashMap::new();

        // yoon: i-column kana + small ya/yu/yo
        let yoon: &[(char, &str)] = &[
            ('き', "ky"), ('ぎ', "gy"), ('し', "sh"), ('じ', "j"), ('ち', "ch"),
            ('ぢ', "j"), ('に', "ny"), ('ひ', "hy"), ('び', "by"), ('ぴ', "py"),
            ('み', "my"), ('り', "ry"),
        ];
        for &(base, onset) in yoon {
            for (small, vowel) in [('ゃ', 'a'), ('ゅ', 'u'), ('ょ', 'o')] {
                m.insert((base, small), format!("{onset}{vowel}"));
            }
        }

        // extended katakana combinations (already shifted to hiragana)
        let extended: &[(char, char, &str)] = &[
            ('し', 'ぇ', "she"), ('じ', 'ぇ', "je"), ('ち', 'ぇ', "che"),
            ('ふ', 'ぁ', "fa"), ('ふ', 'ぃ', "fi"), ('ふ', 'ぇ', "fe"), ('ふ', 'ぉ', "fo"),
            ('ふ', 'ゅ', "fyu"),
            ('て', 'ぃ', "ti"), ('で', 'ぃ', "di"), ('と', 'ぅ', "tu"), ('ど', 'ぅ', "du"),
            ('て', 'ゅ', "tyu"), ('で', 'ゅ', "dyu"),
            ('う', 'ぃ', "wi"), ('う', 'ぇ', "we"), ('う', 'ぉ', "wo"),
            ('ゔ', 'ぁ', "va"), ('ゔ', 'ぃ', "vi"), ('ゔ', 'ぇ', "ve"), ('ゔ', 'ぉ', "vo"),
            ('ゔ', 'ゅ', "vyu"),
            ('つ', 'ぁ', "tsa"), ('つ', 'ぃ', "tsi"), ('つ', 'ぇ', "tse"), ('つ', 'ぉ', "tso"),
            ('い', 'ぇ', "ye"),
            ('く', 'ぁ', "kwa"), ('ぐ', 'ぁ', "gwa"),
        ];
        for &(base, small, romaji) in extended {
            m.insert((base, small), romaji.to_string());
        }
        m
    };
}

/// Maps katakana (and the katakana iteration marks) onto hiragana; everything
/// else is returned unchanged.
fn to_hiragana(ch: char) -> char {
    match ch {
        '\u{30A1}'..='\u{30F6}' | '\u{30FD}'..='\u{30FE}' => {
            char::from_u32(ch as u32 - 0x60).unwrap_or(ch)
        }
        _ => ch,
    }
}

fn is_vowel(ch: char) -> bool {
    matches!(ch, 'a' | 'i' | 'u' | 'e' | 'o')
}

/// Voiced counterpart of a syllable, for `ゞ`.
fn voice(syllable: &str) -> String {
    for (plain, voiced) in [("sh", "j"), ("ch", "j"), ("ts", "z"), ("k", "g"), ("s", "z"), ("t", "d"), ("h", "b"), ("f", "b")] {
        if let Some(rest) = syllable.strip_prefix(plain) {
            return format!("{voiced}{rest}");
        }
    }
    syllable.to_string()
}

/// Kanji-capable reader: kanji go through the `kakasi` dictionary to
/// hiragana, then everything is romanized by [`Hepburn`].
#[derive(Debug, Default, Clone, Copy)]
pub struct KanjiHepburn {
    hepburn: Hepburn,
}

impl KanjiHepburn {
    pub fn new() -> Self {
        Self::default()
    }
}

fn is_kanji(ch: char) -> bool {
    matches!(ch,
        '\u{3005}' | '\u{3007}'
        | '\u{3400}'..='\u{4DBF}'
        | '\u{4E00}'..='\u{9FFF}'
        | '\u{F900}'..='\u{FAFF}'
        | '\u{20000}'..='\u{2FA1F}')
}

impl Transliterator for KanjiHepburn {
    fn romanize(&self, reading: &str) -> String {
        if reading.chars().any(is_kanji) {
            let kana = kakasi::convert(reading).hiragana;
            self.hepburn.romanize(&kana)
        } else {
            self.hepburn.romanize(reading)
        }
    }
}

impl Transliterator for Hepburn {
    fn romanize(&self, reading: &str) -> String {
        let chars: Vec<char> = reading.nfkc().map(to_hiragana).collect();
        let mut out = String::with_capacity(chars.len() * 2);
        let mut last_syllable = String::new();
        let mut geminate = false;
        let mut i = 0;

        while i < chars.len() {
            let ch = chars[i];

            let syllable = if let Some(pair) = chars
                .get(i + 1)
                .and_then(|&next| DIGRAPHS.get(&(ch, next)))
            {
                i += 2;
                pair.clone()
            } else {
                i += 1;
                match ch {
                    SOKUON => {
                        geminate = true;
                        continue;
                    }
                    CHOONPU => {
                        if let Some(vowel) = out.chars().last().filter(|&c| is_vowel(c)) {
                            out.push(vowel);
                        }
                        continue;
                    }
                    ITERATION => last_syllable.clone(),
                    VOICED_ITERATION => voice(&last_syllable),
                    _ => match MONOGRAPHS.get(&ch) {
                        Some(romaji) => romaji.to_string(),
                        None => {
                            out.push(ch);
                            geminate = false;
                            last_syllable.clear();
                            continue;
                        }
                    },
                }
            };

            if geminate {
                if syllable.starts_with("ch") {
                    out.push('t');
                } else if let Some(first) = syllable.chars().next().filter(|&c| !is_vowel(c)) {
                    out.push(first);
                }
                geminate = false;
            }
            out.push_str(&syllable);
            last_syllable = syllable;
        }

        out
    }
}
