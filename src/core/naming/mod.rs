//! # Naming Module
//!
//! Turns the operator's subfolder and name into the final photo path.
//!
//! ## Duplicate policies
//! - `Ask` - stop and hand a [`Resolution::Conflict`] back to the caller
//! - `AutoIncrement` - `name.jpg`, `name_2.jpg`, `name_3.jpg`, ...
//! - `Replace` - reuse the taken path; the caller overwrites it

use crate::error::NamingError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

/// Extension used for every captured photo
pub const PHOTO_EXTENSION: &str = "jpg";

/// Directory inside the project folder that holds the trash
pub const TRASH_DIR_NAME: &str = ".trash";

/// Strategy for resolving filename collisions
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Ask the user what to do
    #[default]
    Ask,
    /// Append a numeric suffix until the name is free
    AutoIncrement,
    /// Overwrite the existing photo
    Replace,
}

impl DuplicatePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Ask => "ask",
            Self::AutoIncrement => "auto_increment",
            Self::Replace => "replace",
        }
    }
}

/// The user's answer to a [`Resolution::Conflict`]
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum DuplicateDecision {
    /// Replace the old photo
    Replace,
    /// Keep both, renaming the new one
    KeepBoth,
    /// Don't save
    Cancel,
}

impl DuplicateDecision {
    /// The policy that carries out this decision, or `None` for cancel
    pub fn as_policy(&self) -> Option<DuplicatePolicy> {
        match self {
            Self::Replace => Some(DuplicatePolicy::Replace),
            Self::KeepBoth => Some(DuplicatePolicy::AutoIncrement),
            Self::Cancel => None,
        }
    }
}

/// Outcome of resolving a desired name
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// The requested name is free
    Free(PathBuf),
    /// The requested name was taken; this is the next free numbered name
    Incremented { path: PathBuf, requested: PathBuf },
    /// The requested name is taken and will be overwritten
    Replace(PathBuf),
    /// The requested name is taken and the user must decide
    Conflict { existing: PathBuf },
}

impl Resolution {
    /// The path a photo would be written to, if one was decided
    pub fn target(&self) -> Option<&Path> {
        match self {
            Self::Free(path) | Self::Replace(path) => Some(path),
            Self::Incremented { path, .. } => Some(path),
            Self::Conflict { .. } => None,
        }
    }
}

/// Decides final photo paths inside a project folder
#[derive(Debug, Clone)]
pub struct NamingResolver {
    project_folder: PathBuf,
    policy: DuplicatePolicy,
}

impl NamingResolver {
    pub fn new(project_folder: impl Into<PathBuf>, policy: DuplicatePolicy) -> Self {
        Self {
            project_folder: project_folder.into(),
            policy,
        }
    }

    pub fn policy(&self) -> DuplicatePolicy {
        self.policy
    }

    /// Resolve against the real filesystem using the configured policy
    pub fn resolve(&self, subfolder: &str, name: &str) -> Result<Resolution, NamingError> {
        self.resolve_with(subfolder, name, self.policy, |p| p.exists())
    }

    /// Resolve with an explicit policy and existing-file check
    pub fn resolve_with<F>(
        &self,
        subfolder: &str,
        name: &str,
        policy: DuplicatePolicy,
        exists: F,
    ) -> Result<Resolution, NamingError>
    where
        F: Fn(&Path) -> bool,
    {
        let subfolder = validate_subfolder(subfolder)?;
        let name = validate_name(name)?;

        let folder = self.project_folder.join(subfolder);
        let requested = folder.join(photo_filename(name));

        if !exists(&requested) {
            return Ok(Resolution::Free(requested));
        }

        Ok(match policy {
            DuplicatePolicy::Ask => Resolution::Conflict {
                existing: requested,
            },
            DuplicatePolicy::Replace => Resolution::Replace(requested),
            DuplicatePolicy::AutoIncrement => {
                let path = next_free_path(&folder, name, &exists);
                tracing::debug!(
                    requested = %requested.display(),
                    chosen = %path.display(),
                    "name taken, auto-incremented"
                );
                Resolution::Incremented { path, requested }
            }
        })
    }
}

/// `<name>.jpg`
pub fn photo_filename(name: &str) -> String {
    format!("{}.{}", name, PHOTO_EXTENSION)
}

fn next_free_path<F>(folder: &Path, name: &str, exists: &F) -> PathBuf
where
    F: Fn(&Path) -> bool,
{
    let mut counter = 2usize;
    loop {
        let candidate = folder.join(format!("{}_{}.{}", name, counter, PHOTO_EXTENSION));
        if !exists(&candidate) {
            return candidate;
        }
        counter += 1;
    }
}

fn illegal_chars() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r#"[<>:"/\\|?*\x00-\x1F]"#).expect("static regex"))
}

fn reserved_device_name() -> &'static Regex {
    static RE: OnceLock<Regex> = OnceLock::new();
    RE.get_or_init(|| {
        Regex::new(r"(?i)^(con|prn|aux|nul|com[1-9]|lpt[1-9])(\..*)?$").expect("static regex")
    })
}

fn validate_component<'a>(field: &'static str, raw: &'a str) -> Result<&'a str, NamingError> {
    let value = raw.trim();

    if value.is_empty() {
        return Err(NamingError::Empty { field });
    }

    if illegal_chars().is_match(value) || value.ends_with('.') {
        return Err(NamingError::IllegalCharacters {
            field,
            value: value.to_string(),
        });
    }

    if reserved_device_name().is_match(value) {
        return Err(NamingError::Reserved {
            field,
            value: value.to_string(),
        });
    }

    Ok(value)
}

/// Validate and trim a photo name
pub fn validate_name(name: &str) -> Result<&str, NamingError> {
    validate_component("Name", name)
}

/// Validate and trim a subfolder name
pub fn validate_subfolder(subfolder: &str) -> Result<&str, NamingError> {
    let value = validate_component("Subfolder", subfolder)?;
    if value.eq_ignore_ascii_case(TRASH_DIR_NAME) {
        return Err(NamingError::Reserved {
            field: "Subfolder",
            value: value.to_string(),
        });
    }
    Ok(value)
}
