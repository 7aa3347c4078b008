/*
 * This file is part of rpigpiomon.
 *
 * Copyright (C) 2025 rpigpiomon contributors
 *
 * rpigpiomon is free software: you can redistribute it and/or modify
 * it under the terms of the GNU General Public License as published by
 * the Free Software Foundation, either version 3 of the License, or
 * (at your option) any later version.
 *
 * rpigpiomon is distributed in the hope that it will be useful,
 * but WITHOUT ANY WARRANTY; without even the implied warranty of
 * MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE. See the
 * GNU General Public License for more details.
 *
 * You should have received a copy of the GNU General Public License
 * along with rpigpiomon. If not, see <https://www.gnu.org/licenses/>.
 */

//! Sensor configuration loading.
//!
//! The configuration is an INI file with one section per sensor. Keys may use
//! `.` to describe a position in a nested tree (`states.ok.value = 0`); a key
//! starting with `'` keeps its dots literally.

use std::env;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

/// Nesting delimiter inside keys.
pub const SEPARATOR: char = '.';
/// Marks a key whose dots are literal.
pub const ESCAPE: char = '\'';

pub const CONFIG_FILE_NAME: &str = "rpigpiomonitor.ini";
pub const CONFIG_ENV_VAR: &str = "RPIGPIOMON_CONFIG";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: io::Error,
    },
    #[error("Syntax error on line {line}: {reason}")]
    Syntax { line: usize, reason: String },
}

fn syntax(line: usize, reason: impl Into<String>) -> ConfigError {
    ConfigError::Syntax { line, reason: reason.into() }
}

/// Sensor sections rebuilt into nested mappings, in declaration order.
///
/// Built once per invocation and only read afterwards.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigTree {
    sections: Map<String, Value>,
}

impl ConfigTree {
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let tree = Self::parse(&text)?;
        debug!(path = %path.display(), sensors = tree.len(), "configuration loaded");
        Ok(tree)
    }

    pub fn parse(text: &str) -> Result<Self, ConfigError> {
        let sections = parse_ini(text)?
            .into_iter()
            .map(|(name, pairs)| {
                let pairs = pairs.into_iter().map(|(k, v)| (k, Value::String(v)));
                (name, Value::Object(expand_keys(pairs)))
            })
            .collect();
        Ok(Self { sections })
    }

    /// Iterate `(sensor name, section)` pairs in the order they were declared.
    pub fn sections(&self) -> impl Iterator<Item = (&str, &Map<String, Value>)> {
        self.sections
            .iter()
            .filter_map(|(name, section)| section.as_object().map(|s| (name.as_str(), s)))
    }

    pub fn section(&self, name: &str) -> Option<&Map<String, Value>> {
        self.sections.get(name).and_then(Value::as_object)
    }

    pub fn len(&self) -> usize {
        self.sections.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }
}

type RawSection = (String, Vec<(String, String)>);

/// Split INI text into sections of raw `key = value` pairs.
///
/// Sections that appear more than once are merged into the first occurrence.
fn parse_ini(text: &str) -> Result<Vec<RawSection>, ConfigError> {
    let mut sections: Vec<RawSection> = Vec::new();
    let mut current: Option<usize> = None;

    for (idx, raw) in text.lines().enumerate() {
        let line_no = idx + 1;
        let line = raw.trim();
        if line.is_empty() || is_comment(line) {
            continue;
        }

        if let Some(rest) = line.strip_prefix('[') {
            let Some(end) = rest.find(']') else {
                return Err(syntax(line_no, "unterminated section header"));
            };
            let trailing = rest[end + 1..].trim();
            if !trailing.is_empty() && !is_comment(trailing) {
                return Err(syntax(line_no, format!("unexpected text after section header: {trailing}")));
            }
            let name = rest[..end].trim();
            if name.is_empty() {
                return Err(syntax(line_no, "empty section name"));
            }
            current = Some(match sections.iter().position(|(n, _)| n == name) {
                Some(pos) => pos,
                None => {
                    sections.push((name.to_string(), Vec::new()));
                    sections.len() - 1
                }
            });
            continue;
        }

        let Some((key, value)) = line.split_once('=') else {
            return Err(syntax(line_no, format!("expected `key = value`, found `{line}`")));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(syntax(line_no, "missing key before `=`"));
        }
        let value = parse_value(value.trim()).map_err(|reason| syntax(line_no, reason))?;
        let Some(section) = current else {
            return Err(syntax(line_no, format!("key `{key}` appears outside of a sensor section")));
        };
        sections[section].1.push((key.to_string(), value));
    }

    Ok(sections)
}

fn is_comment(s: &str) -> bool {
    s.starts_with(';') || s.starts_with('#')
}

fn parse_value(raw: &str) -> Result<String, String> {
    if let Some(quote) = raw.chars().next().filter(|c| *c == '"' || *c == '\'') {
        let body = &raw[1..];
        let Some(end) = body.find(quote) else {
            return Err("unterminated quoted value".to_string());
        };
        let trailing = body[end + 1..].trim();
        if !trailing.is_empty() && !is_comment(trailing) {
            return Err(format!("unexpected text after quoted value: {trailing}"));
        }
        return Ok(body[..end].to_string());
    }

    let value = match raw.find(';') {
        Some(pos) => raw[..pos].trim(),
        None => raw,
    };
    let value = match value.to_ascii_lowercase().as_str() {
        "true" | "on" | "yes" => "1",
        "false" | "off" | "no" | "none" | "null" => "",
        _ => value,
    };
    Ok(value.to_string())
}

/// Rebuild nested mappings from flat keys.
///
/// Keys without a separator, or whose only nesting would start at position 0,
/// are kept, escaped keys lose their quote markers and
/// keep their dots, every other key is split on `.` and walked from the root,
/// creating intermediate mappings as needed. A scalar sitting on an
/// intermediate position is replaced by a mapping; the last write wins.
pub fn expand_keys<I>(pairs: I) -> Map<String, Value>
where
    I: IntoIterator<Item = (String, Value)>,
{
    let mut root = Map::new();
    for (key, value) in pairs {
        // A separator in first position does not count as nesting.
        if key.find(SEPARATOR).map_or(true, |pos| pos == 0) {
            root.insert(key, value);
        } else if key.starts_with(ESCAPE) {
            root.insert(key.trim_matches(ESCAPE).to_string(), value);
        } else {
            let path: Vec<&str> = key.split(SEPARATOR).collect();
            insert_path(&mut root, &path, value);
        }
    }
    root
}

fn insert_path(node: &mut Map<String, Value>, path: &[&str], value: Value) {
    match path {
        [] => {}
        [leaf] => {
            node.insert((*leaf).to_string(), value);
        }
        [head, rest @ ..] => {
            let child = node
                .entry((*head).to_string())
                .or_insert_with(|| Value::Object(Map::new()));
            if !child.is_object() {
                *child = Value::Object(Map::new());
            }
            if let Value::Object(map) = child {
                insert_path(map, rest, value);
            }
        }
    }
}

/// Resolve which configuration file to read.
///
/// An explicit path wins, then `$RPIGPIOMON_CONFIG`, then `rpigpiomonitor.ini`
/// in the working directory or next to the executable, then the system path.
pub fn config_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    if let Ok(path) = env::var(CONFIG_ENV_VAR) {
        if !path.is_empty() {
            return PathBuf::from(path);
        }
    }
    let local = PathBuf::from(CONFIG_FILE_NAME);
    if local.exists() {
        return local;
    }
    if let Some(dir) = env::current_exe().ok().as_deref().and_then(Path::parent) {
        let beside = dir.join(CONFIG_FILE_NAME);
        if beside.exists() {
            return beside;
        }
    }
    system_config_path()
}

pub fn system_config_path() -> PathBuf {
    PathBuf::from("/etc/rpigpiomon").join(CONFIG_FILE_NAME)
}
