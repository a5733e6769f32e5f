//! Phoneme-to-id encoding
//!
//! Acoustic models consume integer id sequences built from a fixed
//! `phonemes.txt` vocabulary with reserved symbols: pad `_`, beginning of
//! sequence `^`, end of sequence `$`, and a blank `#` interleaved between
//! words. Stress marks and clause punctuation are split off into their own
//! symbols; punctuation collapses to short/long pause markers. Phonemes
//! missing from the vocabulary go through an optional remapping table, and
//! anything still unresolved fails the unit.

use std::collections::BTreeMap;
use std::path::Path;

use crate::core::error::{Result, TtsError};

pub const PAD: &str = "_";
pub const BOS: &str = "^";
pub const EOS: &str = "$";
pub const BLANK: &str = "#";

/// IPA stress marks kept as standalone symbols
const STRESS: &[char] = &['\u{02C8}', '\u{02CC}'];

/// Vocabulary plus optional remapping table for one acoustic model
#[derive(Debug, Clone)]
pub struct PhonemeEncoder {
    phoneme_to_id: BTreeMap<String, i64>,
    phoneme_map: BTreeMap<String, Vec<String>>,
}

impl PhonemeEncoder {
    /// Load `phonemes.txt` and an optional `phoneme_map.txt` from a model dir
    pub fn from_model_dir(model_dir: &Path) -> Result<Self> {
        let phonemes_path = model_dir.join("phonemes.txt");
        let text = std::fs::read_to_string(&phonemes_path).map_err(|e| TtsError::Io {
            message: format!("cannot read phoneme table: {e}"),
            path: Some(phonemes_path),
        })?;
        let phoneme_to_id = parse_phoneme_ids(&text);

        let map_path = model_dir.join("phoneme_map.txt");
        let phoneme_map = if map_path.is_file() {
            let text = std::fs::read_to_string(&map_path).map_err(|e| TtsError::Io {
                message: format!("cannot read phoneme map: {e}"),
                path: Some(map_path),
            })?;
            parse_phoneme_map(&text)
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            phoneme_to_id,
            phoneme_map,
        })
    }

    #[cfg(test)]
    pub fn from_tables(
        phoneme_to_id: BTreeMap<String, i64>,
        phoneme_map: BTreeMap<String, Vec<String>>,
    ) -> Self {
        Self {
            phoneme_to_id,
            phoneme_map,
        }
    }

    /// Encode phonemizer output (words split by whitespace, phonemes by `_`)
    pub fn encode_ipa(&self, ipa: &str) -> Result<Vec<i64>> {
        let mut ipa = ipa.trim().to_string();

        // A final full stop gives the model a clean utterance ending
        if !ipa.ends_with('.') {
            ipa.push_str(" .");
        }

        let word_phonemes: Vec<Vec<String>> = ipa
            .split_whitespace()
            .map(|word| {
                word.split(PAD)
                    .filter(|p| !p.is_empty())
                    .flat_map(split_symbols)
                    .collect()
            })
            .collect();

        self.encode_words(&word_phonemes)
    }

    /// Encode pre-split words: `^` words-interleaved-with-`#` `$`
    pub fn encode_words(&self, word_phonemes: &[Vec<String>]) -> Result<Vec<i64>> {
        let mut ids = Vec::new();
        self.push_reserved(&mut ids, BOS);

        for (index, word) in word_phonemes.iter().enumerate() {
            if index > 0 {
                self.push_reserved(&mut ids, BLANK);
            }

            for phoneme in word {
                self.push_phoneme(&mut ids, phoneme)?;
            }
        }

        self.push_reserved(&mut ids, EOS);
        Ok(ids)
    }

    fn push_reserved(&self, ids: &mut Vec<i64>, symbol: &str) {
        if let Some(&id) = self.phoneme_to_id.get(symbol) {
            ids.push(id);
        }
    }

    fn push_phoneme(&self, ids: &mut Vec<i64>, phoneme: &str) -> Result<()> {
        if let Some(&id) = self.phoneme_to_id.get(phoneme) {
            ids.push(id);
            return Ok(());
        }

        if let Some(replacements) = self.phoneme_map.get(phoneme) {
            for replacement in replacements {
                self.push_phoneme(ids, replacement)?;
            }
            return Ok(());
        }

        Err(TtsError::Internal {
            message: format!("phoneme '{phoneme}' missing from model vocabulary"),
        })
    }

    pub fn len(&self) -> usize {
        self.phoneme_to_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.phoneme_to_id.is_empty()
    }
}

/// Break a combined token into standalone symbols
///
/// Leading stress marks split off, and clause punctuation collapses to the
/// short ("," ) or long (".") pause symbol.
fn split_symbols(token: &str) -> Vec<String> {
    match token {
        "," | ";" | ":" => return vec![",".to_string()],
        "." | "!" | "?" => return vec![".".to_string()],
        _ => {}
    }

    let mut symbols = Vec::new();
    let mut rest = token;
    while let Some(first) = rest.chars().next() {
        if STRESS.contains(&first) {
            symbols.push(first.to_string());
            rest = &rest[first.len_utf8()..];
        } else {
            break;
        }
    }

    if !rest.is_empty() {
        symbols.push(rest.to_string());
    }

    symbols
}

/// Parse "id phoneme" lines (or bare phonemes numbered by line)
fn parse_phoneme_ids(text: &str) -> BTreeMap<String, i64> {
    let mut table = BTreeMap::new();

    for (line_index, line) in text.lines().enumerate() {
        let line = line.trim_end();
        if line.is_empty() {
            continue;
        }

        let mut parts = line.split_whitespace();
        match (parts.next(), parts.next()) {
            (Some(first), Some(second)) => {
                if let Ok(id) = first.parse::<i64>() {
                    table.insert(second.to_string(), id);
                } else {
                    table.insert(first.to_string(), line_index as i64);
                }
            }
            (Some(only), None) => {
                table.insert(only.to_string(), line_index as i64);
            }
            _ => {}
        }
    }

    table
}

/// Parse "from to1 to2 ..." remapping lines
fn parse_phoneme_map(text: &str) -> BTreeMap<String, Vec<String>> {
    let mut map = BTreeMap::new();

    for line in text.lines() {
        let mut parts = line.split_whitespace();
        if let Some(from) = parts.next() {
            let to: Vec<String> = parts.map(str::to_string).collect();
            if !to.is_empty() {
                map.insert(from.to_string(), to);
            }
        }
    }

    map
}
