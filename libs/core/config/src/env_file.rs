//! `.env` file backed configuration store.
//!
//! Lookups follow the dotenv convention: a variable already present in the
//! process environment wins over the file. Writes go to the file only, and
//! are atomic: the new content is written to a temporary file in the same
//! directory and renamed over the original.

use crate::{ConfigError, ConfigSource, ConfigStore};
use std::collections::HashMap;
use std::env;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use tracing::debug;

#[derive(Debug, Clone)]
enum Line {
    /// `raw` is written back verbatim unless `set` replaces the entry.
    Entry { key: String, raw: String },
    Other(String),
}

/// Key/value configuration persisted as a `.env` file.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
    lines: Vec<Line>,
    values: HashMap<String, String>,
}

impl EnvFile {
    /// Load `path`. A missing file is treated as empty and created on first `set`.
    pub fn load(path: impl Into<PathBuf>) -> Result<Self, ConfigError> {
        let path = path.into();
        let content = match fs::read_to_string(&path) {
            Ok(content) => content,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!(path = %path.display(), "Env file not found, starting empty");
                String::new()
            }
            Err(e) => {
                return Err(ConfigError::Invalid(format!(
                    "cannot read {}: {}",
                    path.display(),
                    e
                )));
            }
        };

        Ok(Self::parse(path, &content))
    }

    fn parse(path: PathBuf, content: &str) -> Self {
        let mut lines = Vec::new();
        let mut values = HashMap::new();

        for raw in content.lines() {
            match parse_entry(raw) {
                Some((key, value)) => {
                    values.insert(key.clone(), value);
                    lines.push(Line::Entry {
                        key,
                        raw: raw.to_string(),
                    });
                }
                None => lines.push(Line::Other(raw.to_string())),
            }
        }

        Self {
            path,
            lines,
            values,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Value stored in the file itself, ignoring the process environment.
    pub fn file_value(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    fn render(&self) -> String {
        let mut out = String::new();
        for line in &self.lines {
            match line {
                Line::Entry { raw, .. } | Line::Other(raw) => out.push_str(raw),
            }
            out.push('\n');
        }
        out
    }

    fn persist(&self) -> Result<(), ConfigError> {
        let persist_err = |details: String| ConfigError::Persist {
            path: self.path.display().to_string(),
            details,
        };

        let dir = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };

        let mut tmp = NamedTempFile::new_in(&dir).map_err(|e| persist_err(e.to_string()))?;
        tmp.write_all(self.render().as_bytes())
            .and_then(|_| tmp.as_file().sync_all())
            .map_err(|e| persist_err(e.to_string()))?;
        tmp.persist(&self.path)
            .map_err(|e| persist_err(e.error.to_string()))?;

        Ok(())
    }
}

impl ConfigSource for EnvFile {
    fn get(&self, key: &str) -> Option<String> {
        env::var(key)
            .ok()
            .or_else(|| self.values.get(key).cloned())
    }
}

impl ConfigStore for EnvFile {
    fn set(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        let rendered = format!("{}={}", key, quote_if_needed(value));
        let mut replaced = false;
        for line in &mut self.lines {
            if let Line::Entry { key: k, raw } = line {
                if k.as_str() == key {
                    *raw = rendered.clone();
                    replaced = true;
                }
            }
        }
        if !replaced {
            self.lines.push(Line::Entry {
                key: key.to_string(),
                raw: rendered,
            });
        }
        self.values.insert(key.to_string(), value.to_string());

        self.persist()?;
        debug!(path = %self.path.display(), key, "Persisted configuration value");
        Ok(())
    }
}

fn parse_entry(raw: &str) -> Option<(String, String)> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.starts_with('#') {
        return None;
    }

    let trimmed = trimmed.strip_prefix("export ").unwrap_or(trimmed);
    let (key, value) = trimmed.split_once('=')?;
    let key = key.trim();
    if key.is_empty() || key.contains(char::is_whitespace) {
        return None;
    }

    Some((key.to_string(), parse_value(value.trim()).to_string()))
}

/// Quoted values end at the closing quote; unquoted values end at a ` #` comment.
fn parse_value(value: &str) -> &str {
    for quote in ['"', '\''] {
        if let Some(rest) = value.strip_prefix(quote) {
            if let Some(end) = rest.find(quote) {
                return &rest[..end];
            }
        }
    }

    let comment = value
        .char_indices()
        .find(|&(i, c)| c == '#' && value[..i].ends_with(char::is_whitespace))
        .map(|(i, _)| i);
    match comment {
        Some(i) => value[..i].trim_end(),
        None => value,
    }
}

fn quote_if_needed(value: &str) -> String {
    if value.contains(char::is_whitespace) || value.contains('#') {
        format!("\"{}\"", value)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn write_env(content: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        fs::write(&path, content).unwrap();
        (dir, path)
    }

    #[test]
    fn test_parse_entries_comments_and_quotes() {
        let (_dir, path) = write_env(
            "# activity backend\nACTIVITY_API_URL=http://localhost:8000/api\n\nexport SMTP_PORT=587\nCAMPAIGN_SUBJECT=\"AI Engineer | USC\"\n",
        );
        let file = EnvFile::load(&path).unwrap();

        assert_eq!(file.file_value("ACTIVITY_API_URL"), Some("http://localhost:8000/api"));
        assert_eq!(file.file_value("SMTP_PORT"), Some("587"));
        assert_eq!(file.file_value("CAMPAIGN_SUBJECT"), Some("AI Engineer | USC"));
        assert_eq!(file.file_value("MISSING"), None);
    }

    #[test]
    fn test_missing_file_is_empty() {
        let dir = tempfile::tempdir().unwrap();
        let file = EnvFile::load(dir.path().join("absent.env")).unwrap();
        assert_eq!(file.file_value("ANY"), None);
    }

    #[test]
    fn test_set_replaces_value_and_keeps_other_lines() {
        let (_dir, path) = write_env("# token below\nACTIVITY_API_TOKEN=old\nOTHER=1\n");
        let mut file = EnvFile::load(&path).unwrap();

        file.set("ACTIVITY_API_TOKEN", "fresh-token").unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, "# token below\nACTIVITY_API_TOKEN=fresh-token\nOTHER=1\n");
    }

    #[test]
    fn test_inline_comments_are_not_part_of_the_value() {
        let (_dir, path) = write_env(
            "SMTP_PORT=587 # submission\nSMTP_SERVER=smtp.gmail.com\t# relay\nCAMPAIGN_SUBJECT=\"Jobs # 1\" # quoted\nREPLY_TO_EMAIL=a#b@example.com\n",
        );
        let file = EnvFile::load(&path).unwrap();

        assert_eq!(file.file_value("SMTP_PORT"), Some("587"));
        assert_eq!(file.file_value("SMTP_SERVER"), Some("smtp.gmail.com"));
        assert_eq!(file.file_value("CAMPAIGN_SUBJECT"), Some("Jobs # 1"));
        assert_eq!(file.file_value("REPLY_TO_EMAIL"), Some("a#b@example.com"));
        temp_env::with_var_unset("SMTP_PORT", || {
            assert_eq!(crate::value_parsed(&file, "SMTP_PORT", 0u16).unwrap(), 587);
        });
    }

    #[test]
    fn test_set_leaves_other_lines_byte_identical() {
        let original = "export SMTP_SERVER=smtp.gmail.com\nSMTP_PORT=587 # submission\n  # indented comment\nCAMPAIGN_SUBJECT='AI Engineer'\nACTIVITY_API_TOKEN=old\nTRAILING=x  \n";
        let (_dir, path) = write_env(original);
        let mut file = EnvFile::load(&path).unwrap();

        file.set("ACTIVITY_API_TOKEN", "new").unwrap();

        let written = fs::read_to_string(&path).unwrap();
        assert_eq!(written, original.replace("ACTIVITY_API_TOKEN=old", "ACTIVITY_API_TOKEN=new"));
        let reloaded = EnvFile::load(&path).unwrap();
        assert_eq!(reloaded.file_value("SMTP_SERVER"), Some("smtp.gmail.com"));
        assert_eq!(reloaded.file_value("SMTP_PORT"), Some("587"));
    }

    #[test]
    fn test_set_appends_new_key_and_reloads() {
        let (_dir, path) = write_env("OTHER=1\n");
        let mut file = EnvFile::load(&path).unwrap();

        file.set("ACTIVITY_API_TOKEN", "abc").unwrap();

        let reloaded = EnvFile::load(&path).unwrap();
        assert_eq!(reloaded.file_value("ACTIVITY_API_TOKEN"), Some("abc"));
        assert_eq!(reloaded.file_value("OTHER"), Some("1"));
    }

    #[test]
    fn test_set_creates_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join(".env");
        let mut file = EnvFile::load(&path).unwrap();

        file.set("KEY", "two words").unwrap();

        assert_eq!(fs::read_to_string(&path).unwrap(), "KEY=\"two words\"\n");
        assert_eq!(EnvFile::load(&path).unwrap().file_value("KEY"), Some("two words"));
    }

    #[test]
    fn test_process_env_wins_over_file() {
        let (_dir, path) = write_env("ENV_FILE_TEST_SHADOWED=from-file\n");
        let file = EnvFile::load(&path).unwrap();

        temp_env::with_var("ENV_FILE_TEST_SHADOWED", Some("from-env"), || {
            assert_eq!(file.get("ENV_FILE_TEST_SHADOWED").as_deref(), Some("from-env"));
        });
        temp_env::with_var_unset("ENV_FILE_TEST_SHADOWED", || {
            assert_eq!(file.get("ENV_FILE_TEST_SHADOWED").as_deref(), Some("from-file"));
        });
    }
}
