//! MaryTTS engine adapter (persistent subprocess per active voice)
//!
//! MaryTTS loads its voice model at JVM startup, so the adapter keeps one
//! `Txt2Wav` process alive and bound to the last-used voice. Switching
//! voices terminates the old process and starts a new one. The process is
//! a single shared resource: concurrent requests for different voices
//! serialize through replacement rather than running in parallel.
//!
//! Wire protocol with the child: write one UTF-8 text line, read back a
//! decimal byte-count line, then read exactly that many bytes of WAV.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufRead, BufReader as StdBufReader};
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::sync::OnceLock;
use std::time::Duration;

use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, AsyncReadExt, AsyncWriteExt, BufReader};
use tokio::process::{Child, ChildStdin, ChildStdout, Command};
use tokio::sync::Mutex;
use tracing::{debug, warn};

use crate::core::error::{Result, TtsError};
use crate::engine::process::find_program;
use crate::engine::traits::{Gender, SayOptions, TtsEngine, Voice};

const ENGINE_NAME: &str = "marytts";

/// Voice catalog discovered from the installation's jar files
struct Catalog {
    voices: BTreeMap<String, Voice>,
    jars: BTreeMap<String, PathBuf>,
}

/// The live child bound to one voice
struct VoiceProcess {
    child: Child,
    stdin: ChildStdin,
    stdout: BufReader<ChildStdout>,
    voice_id: String,
}

pub struct MaryTtsEngine {
    base_dir: PathBuf,
    timeout: Option<Duration>,
    catalog: OnceLock<Catalog>,
    // Single-slot process holder; locking serializes voice switches
    process: Mutex<Option<VoiceProcess>>,
}

impl MaryTtsEngine {
    pub fn new(base_dir: impl Into<PathBuf>, timeout: Option<Duration>) -> Result<Self> {
        if find_program(&["java"]).is_none() {
            return Err(TtsError::config("java binary not found on PATH", None));
        }

        let base_dir = base_dir.into();
        if !base_dir.is_dir() {
            return Err(TtsError::config(
                "MaryTTS installation directory does not exist",
                Some(base_dir),
            ));
        }

        Ok(Self {
            base_dir,
            timeout,
            catalog: OnceLock::new(),
            process: Mutex::new(None),
        })
    }

    fn catalog(&self) -> &Catalog {
        self.catalog.get_or_init(|| {
            let mut catalog = Catalog {
                voices: BTreeMap::new(),
                jars: BTreeMap::new(),
            };

            let mut jar_paths = Vec::new();
            collect_voice_jars(&self.base_dir, &mut jar_paths);

            for jar_path in jar_paths {
                match read_voice_config(&jar_path) {
                    Ok(Some(voice)) => {
                        debug!("marytts voice {} from {}", voice.id, jar_path.display());
                        catalog.jars.insert(voice.id.clone(), jar_path);
                        catalog.voices.insert(voice.id.clone(), voice);
                    }
                    Ok(None) => {}
                    Err(e) => warn!("skipping voice jar {}: {e}", jar_path.display()),
                }
            }

            catalog
        })
    }

    /// Classpath for a voice: its jar, the language jar, the txt2wav
    /// utility, and the MaryTTS runtime jars
    fn classpath(&self, voice: &Voice, voice_jar: &Path) -> Result<String> {
        let lib = self.base_dir.join("lib");
        let lang_jar = lib.join(format!("marytts-lang-{}-5.2.jar", voice.language));
        if !lang_jar.is_file() {
            return Err(TtsError::synthesis(
                ENGINE_NAME,
                format!("missing language jar {}", lang_jar.display()),
            ));
        }

        let mut jars = vec![
            voice_jar.to_path_buf(),
            lang_jar,
            lib.join("txt2wav-1.0-SNAPSHOT.jar"),
        ];

        if let Ok(entries) = std::fs::read_dir(lib.join("marytts")) {
            for entry in entries.flatten() {
                let path = entry.path();
                if path.extension().is_some_and(|e| e == "jar") {
                    jars.push(path);
                }
            }
        }

        Ok(jars
            .iter()
            .map(|p| p.to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join(":"))
    }

    /// Ensure the slot holds a process for `voice_id`, replacing any other
    async fn acquire<'a>(
        &self,
        slot: &'a mut Option<VoiceProcess>,
        voice_id: &str,
    ) -> Result<&'a mut VoiceProcess> {
        if slot.as_ref().is_some_and(|p| p.voice_id == voice_id) {
            return Ok(slot.as_mut().unwrap());
        }

        if let Some(mut old) = slot.take() {
            debug!("stopping marytts process (voice={})", old.voice_id);
            let _ = old.child.start_kill();
            let _ = old.child.wait().await;
        }

        let catalog = self.catalog();
        let voice = catalog.voices.get(voice_id).ok_or_else(|| {
            TtsError::synthesis(ENGINE_NAME, format!("unknown voice '{voice_id}'"))
        })?;
        let voice_jar = catalog.jars.get(voice_id).ok_or_else(|| {
            TtsError::synthesis(ENGINE_NAME, format!("no jar for voice '{voice_id}'"))
        })?;

        let classpath = self.classpath(voice, voice_jar)?;
        debug!("starting marytts process for voice {voice_id}");

        let mut child = Command::new("java")
            .args(["-cp", classpath.as_str(), "de.dfki.mary.Txt2Wav", "-v", voice_id])
            .stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| TtsError::synthesis(ENGINE_NAME, format!("failed to start java: {e}")))?;

        let stdin = child.stdin.take().ok_or_else(|| {
            TtsError::synthesis(ENGINE_NAME, "java process has no stdin handle")
        })?;
        let stdout = child.stdout.take().ok_or_else(|| {
            TtsError::synthesis(ENGINE_NAME, "java process has no stdout handle")
        })?;

        *slot = Some(VoiceProcess {
            child,
            stdin,
            stdout: BufReader::new(stdout),
            voice_id: voice_id.to_string(),
        });

        Ok(slot.as_mut().unwrap())
    }

    async fn exchange(process: &mut VoiceProcess, text: &str) -> Result<Vec<u8>> {
        let line = format!("{}\n", text.trim());
        process.stdin.write_all(line.as_bytes()).await.map_err(|e| {
            TtsError::synthesis(ENGINE_NAME, format!("failed writing text: {e}"))
        })?;
        process.stdin.flush().await.map_err(|e| {
            TtsError::synthesis(ENGINE_NAME, format!("failed flushing text: {e}"))
        })?;

        let mut size_line = String::new();
        process.stdout.read_line(&mut size_line).await.map_err(|e| {
            TtsError::synthesis(ENGINE_NAME, format!("failed reading size line: {e}"))
        })?;

        let num_bytes: usize = size_line.trim().parse().map_err(|_| {
            TtsError::synthesis(
                ENGINE_NAME,
                format!("bad size line from process: {size_line:?}"),
            )
        })?;

        debug!("reading {num_bytes} byte(s) of WAV audio from marytts");
        let mut wav = vec![0u8; num_bytes];
        process.stdout.read_exact(&mut wav).await.map_err(|e| {
            TtsError::synthesis(ENGINE_NAME, format!("failed reading audio: {e}"))
        })?;

        Ok(wav)
    }
}

#[async_trait]
impl TtsEngine for MaryTtsEngine {
    fn name(&self) -> &str {
        ENGINE_NAME
    }

    async fn voices(&self) -> Result<Vec<Voice>> {
        Ok(self.catalog().voices.values().cloned().collect())
    }

    async fn say(&self, text: &str, voice_id: &str, _opts: &SayOptions) -> Result<Vec<u8>> {
        // Held across the exchange: the process is a single shared resource
        let mut slot = self.process.lock().await;

        let exchange = async {
            let process = self.acquire(&mut slot, voice_id).await?;
            Self::exchange(process, text).await
        };

        let result = match self.timeout {
            Some(limit) => match tokio::time::timeout(limit, exchange).await {
                Ok(result) => result,
                Err(_) => Err(TtsError::synthesis(
                    ENGINE_NAME,
                    format!("voice process timed out after {limit:?}"),
                )),
            },
            None => exchange.await,
        };

        if result.is_err() {
            // Drop a wedged process so the next request starts clean
            if let Some(mut process) = slot.take() {
                let _ = process.child.start_kill();
            }
        }

        let wav = result?;
        if wav.is_empty() {
            return Err(TtsError::synthesis(
                ENGINE_NAME,
                format!("no audio for voice '{voice_id}'"),
            ));
        }

        Ok(wav)
    }
}

/// Recursively find `voice-*.jar` files under the installation
fn collect_voice_jars(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(entries) = std::fs::read_dir(dir) else {
        return;
    };

    for entry in entries.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_voice_jars(&path, out);
        } else if path
            .file_name()
            .and_then(|n| n.to_str())
            .is_some_and(|n| n.starts_with("voice-") && n.ends_with(".jar"))
        {
            out.push(path);
        }
    }
}

/// Parse the `voice.config` entry of a voice jar into a catalog entry
fn read_voice_config(jar_path: &Path) -> anyhow::Result<Option<Voice>> {
    let file = File::open(jar_path)?;
    let mut archive = zip::ZipArchive::new(file)?;

    for index in 0..archive.len() {
        let entry = archive.by_index(index)?;
        if !entry.name().ends_with("voice.config") {
            continue;
        }

        let mut name = String::new();
        let mut locale = String::new();
        let mut gender = String::new();

        for line in StdBufReader::new(entry).lines() {
            let line = match line {
                Ok(line) => line,
                Err(_) => continue,
            };
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let Some((key, value)) = line.split_once('=') else {
                continue;
            };
            let (key, value) = (key.trim(), value.trim());

            if key == "name" {
                name = value.to_string();
            } else if key == "locale" {
                locale = value.to_string();
            } else if key.ends_with(".gender") {
                gender = value.to_string();
            }
        }

        if name.is_empty() || locale.is_empty() {
            return Ok(None);
        }

        let locale = locale.to_ascii_lowercase().replace('_', "-");
        let language = locale
            .split('-')
            .next()
            .unwrap_or(&locale)
            .to_string();

        return Ok(Some(Voice::new(
            name.clone(),
            name,
            Gender::parse(&gender),
            language,
            locale,
        )));
    }

    Ok(None)
}
