use crate::id::FileId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;

const FALLBACK_NAME: &str = "upload";

/// How a stored file's display name is derived from the client's hint.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum NameMode {
    /// Keep the client's file name (sanitized).
    #[default]
    Keep,
    /// Hex id followed by the hint's extension, e.g. `9f86d081884c7d65.pdf`.
    IdExt,
}

impl FromStr for NameMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "keep" => Ok(NameMode::Keep),
            "id-ext" => Ok(NameMode::IdExt),
            other => Err(format!("unknown naming mode {other:?} (expected keep|id-ext)")),
        }
    }
}

impl fmt::Display for NameMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            NameMode::Keep => "keep",
            NameMode::IdExt => "id-ext",
        })
    }
}

/// Last path component of `hint` with control characters stripped.
pub fn sanitize(hint: &str) -> String {
    let base = hint.rsplit(['/', '\\']).next().unwrap_or_default();
    let clean: String = base.chars().filter(|c| !c.is_control()).collect();
    let clean = clean.trim();
    if clean.is_empty() || clean == "." || clean == ".." {
        FALLBACK_NAME.to_string()
    } else {
        clean.to_string()
    }
}

pub fn display_name(mode: NameMode, id: &FileId, hint: &str) -> String {
    let clean = sanitize(hint);
    match mode {
        NameMode::Keep => clean,
        NameMode::IdExt => match Path::new(&clean).extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("{id}.{ext}"),
            _ => id.to_string(),
        },
    }
}
