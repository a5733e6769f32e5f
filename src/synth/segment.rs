//! Request segmentation
//!
//! Splits an inbound request into ordered synthesis units: plain text by
//! line, SSML by sentence. SSML handling covers the subset the gateway
//! dispatches on: `<voice>` and `<lang>` overrides, `<s>`/`<p>` sentence
//! boundaries, and `<break time="..">` pause directives. Pauses accumulate
//! onto the neighboring unit (before it when no text has been collected
//! yet, after it otherwise).

use crate::core::error::{Result, TtsError};

/// Sentence-ending punctuation that closes a unit inside SSML text
const SENTENCE_ENDINGS: &[char] = &['.', '!', '?', '。', '！', '？'];

/// One line of plain text or one SSML sentence queued for synthesis
#[derive(Debug, Clone, PartialEq)]
pub struct SynthesisUnit {
    /// Text content with markup removed
    pub text: String,
    /// Per-sentence voice override from `<voice name="..">`
    pub voice: Option<String>,
    /// Per-sentence language override from `<lang xml:lang="..">`
    pub lang: Option<String>,
    /// Silence inserted before this unit, milliseconds
    pub pause_before_ms: u64,
    /// Silence inserted after this unit, milliseconds
    pub pause_after_ms: u64,
}

impl SynthesisUnit {
    fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            voice: None,
            lang: None,
            pause_before_ms: 0,
            pause_after_ms: 0,
        }
    }
}

/// Split plain text into one unit per non-blank line
pub fn segment_plain(text: &str) -> Vec<SynthesisUnit> {
    text.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .map(SynthesisUnit::plain)
        .collect()
}

/// Split SSML markup into sentence units with overrides and pauses
pub fn segment_ssml(ssml: &str) -> Result<Vec<SynthesisUnit>> {
    let mut parser = SsmlParser::default();
    parser.run(ssml)?;
    Ok(parser.units)
}

#[derive(Default)]
struct SsmlParser {
    units: Vec<SynthesisUnit>,
    buffer: String,
    voice_stack: Vec<String>,
    lang_stack: Vec<String>,
    pending_before_ms: u64,
}

impl SsmlParser {
    fn run(&mut self, ssml: &str) -> Result<()> {
        let mut chars = ssml.char_indices();

        while let Some((pos, ch)) = chars.next() {
            if ch != '<' {
                self.push_text_char(ch);
                continue;
            }

            let rest = &ssml[pos..];
            let end = rest.find('>').ok_or_else(|| TtsError::Internal {
                message: "unterminated tag in SSML input".to_string(),
            })?;
            let tag = &rest[1..end];

            // Advance past the tag body
            for _ in 0..tag.chars().count() + 1 {
                chars.next();
            }

            self.handle_tag(tag);
        }

        self.flush();
        Ok(())
    }

    fn push_text_char(&mut self, ch: char) {
        self.buffer.push(ch);
        if SENTENCE_ENDINGS.contains(&ch) {
            self.flush();
        }
    }

    fn handle_tag(&mut self, tag: &str) {
        let tag = tag.trim().trim_end_matches('/').trim();
        let (name, attrs) = match tag.split_once(char::is_whitespace) {
            Some((name, attrs)) => (name, attrs),
            None => (tag, ""),
        };

        match name {
            "voice" => {
                self.flush();
                if let Some(voice) = attr_value(attrs, "name") {
                    self.voice_stack.push(voice);
                }
            }
            "/voice" => {
                self.flush();
                self.voice_stack.pop();
            }
            "lang" => {
                self.flush();
                if let Some(lang) = attr_value(attrs, "xml:lang") {
                    self.lang_stack.push(lang);
                }
            }
            "/lang" => {
                self.flush();
                self.lang_stack.pop();
            }
            "s" | "p" | "/s" | "/p" | "/speak" => self.flush(),
            "speak" => {
                if let Some(lang) = attr_value(attrs, "xml:lang") {
                    self.lang_stack.push(lang);
                }
            }
            "break" => {
                let millis = attr_value(attrs, "time")
                    .map(|t| parse_duration_ms(&t))
                    .unwrap_or(0);
                self.add_break(millis);
            }
            _ => {}
        }
    }

    fn add_break(&mut self, millis: u64) {
        if millis == 0 {
            return;
        }

        if self.buffer.trim().is_empty() {
            // Nothing collected yet: the pause lands before the next unit
            self.pending_before_ms += millis;
        } else {
            // Pause after the sentence collected so far
            self.flush();
            if let Some(last) = self.units.last_mut() {
                last.pause_after_ms += millis;
            }
        }
    }

    fn flush(&mut self) {
        let text = unescape(self.buffer.trim());
        self.buffer.clear();

        if text.is_empty() {
            return;
        }

        self.units.push(SynthesisUnit {
            text,
            voice: self.voice_stack.last().cloned(),
            lang: self.lang_stack.last().cloned(),
            pause_before_ms: std::mem::take(&mut self.pending_before_ms),
            pause_after_ms: 0,
        });
    }
}

/// Extract `key="value"` (or single-quoted) from a tag attribute string
fn attr_value(attrs: &str, key: &str) -> Option<String> {
    let mut rest = attrs;
    while let Some(eq) = rest.find('=') {
        let found_key = rest[..eq].trim().rsplit(char::is_whitespace).next()?.trim();
        let after = rest[eq + 1..].trim_start();
        let quote = after.chars().next()?;
        if quote != '"' && quote != '\'' {
            return None;
        }
        let close = after[1..].find(quote)?;
        let value = &after[1..1 + close];

        if found_key == key {
            return Some(value.to_string());
        }
        rest = &after[1 + close + 1..];
    }
    None
}

/// Parse SSML time values: "500ms", "2s", or a bare millisecond count
fn parse_duration_ms(value: &str) -> u64 {
    let value = value.trim();
    if let Some(seconds) = value.strip_suffix('s').and_then(|v| {
        // "ms" also ends in 's'
        if v.ends_with('m') {
            None
        } else {
            v.trim().parse::<f64>().ok()
        }
    }) {
        return (seconds * 1000.0).round().max(0.0) as u64;
    }

    value
        .trim_end_matches("ms")
        .trim()
        .parse::<f64>()
        .map(|ms| ms.round().max(0.0) as u64)
        .unwrap_or(0)
}

fn unescape(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&amp;", "&")
}
