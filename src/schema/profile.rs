// src/schema/profile.rs

use anyhow::{bail, Context, Result};
use fitparser::profile::MesgNum;
use serde::Deserialize;
use std::{collections::BTreeSet, fs, path::Path};

use crate::decode::message_type_name;

/// Range markers in fitparser's message enum; never real message types.
const RANGE_MARKERS: &[&str] = &["mfg_range_min", "mfg_range_max"];

/// Every message name the decoder can produce by name.
fn decoder_message_names() -> impl Iterator<Item = String> {
    (0..=u16::MAX)
        .filter(|&n| MesgNum::is_named_variant(i64::from(n)))
        .map(|n| message_type_name(MesgNum::from(n)))
        .filter(|name| !RANGE_MARKERS.contains(&name.as_str()))
}

/// On-disk form of a custom profile.
///
/// ```yaml
/// messages:
///   - record
///   - lap
/// ```
#[derive(Debug, Deserialize)]
struct ProfileFile {
    messages: Vec<String>,
}

/// The set of message types considered part of the FIT profile.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Profile {
    messages: BTreeSet<String>,
}

impl Profile {
    /// The message types of the FIT profile compiled into the decoder.
    pub fn builtin() -> Self {
        Self::from_names(decoder_message_names())
    }

    pub fn from_names<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let messages = names
            .into_iter()
            .map(|n| n.as_ref().trim().to_string())
            .filter(|n| !n.is_empty())
            .collect();
        Self { messages }
    }

    /// Load a profile from a YAML file with a top-level `messages` list.
    pub fn from_yaml_path<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading profile {}", path.display()))?;
        Self::from_yaml_str(&text).with_context(|| format!("parsing profile {}", path.display()))
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        let file: ProfileFile = serde_yaml::from_str(text)?;
        let profile = Self::from_names(file.messages);
        if profile.is_empty() {
            bail!("profile lists no message types");
        }
        Ok(profile)
    }

    pub fn contains(&self, message_type: &str) -> bool {
        self.messages.contains(message_type)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.messages.iter().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }
}

impl Default for Profile {
    fn default() -> Self {
        Self::builtin()
    }
}
