// Copyright (c) 2025 - Cowboy AI, Inc.
//! Credential Store
//!
//! Credentials come from the top-level `credentials` array of the landscape
//! document:
//!
//! ```json
//! { "identifier": "lab-admin", "category": ["basic", "ssh"],
//!   "username": "admin", "password": "secret" }
//! ```
//!
//! Known categories are `basic` (username + password) and `ssh`
//! (username + password or keyfile). Unknown categories are kept and
//! reported as warnings.

use serde::Deserialize;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

use crate::errors::{LandscapeError, LandscapeResult};

#[derive(Deserialize)]
#[serde(untagged)]
enum OneOrMany {
    One(String),
    Many(Vec<String>),
}

impl From<OneOrMany> for Vec<String> {
    fn from(value: OneOrMany) -> Self {
        match value {
            OneOrMany::One(one) => vec![one],
            OneOrMany::Many(many) => many,
        }
    }
}

#[derive(Deserialize)]
struct CredentialEntry {
    identifier: Option<String>,
    category: Option<OneOrMany>,
    role: Option<String>,
    username: Option<String>,
    password: Option<String>,
    keyfile: Option<PathBuf>,
    #[serde(default)]
    primitive: bool,
}

/// A named credential
#[derive(Clone, PartialEq, Eq)]
pub struct Credential {
    identifier: String,
    categories: Vec<String>,
    role: String,
    username: String,
    password: Option<String>,
    keyfile: Option<PathBuf>,
    primitive: bool,
}

impl Credential {
    pub fn identifier(&self) -> &str {
        &self.identifier
    }

    pub fn categories(&self) -> &[String] {
        &self.categories
    }

    pub fn has_category(&self, category: &str) -> bool {
        self.categories.iter().any(|c| c == category)
    }

    /// Role of the credential, `priv` unless declared
    pub fn role(&self) -> &str {
        &self.role
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn keyfile(&self) -> Option<&PathBuf> {
        self.keyfile.as_ref()
    }

    /// Sessions opened with this credential use a primitive shell
    pub fn primitive(&self) -> bool {
        self.primitive
    }
}

impl fmt::Debug for Credential {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credential")
            .field("identifier", &self.identifier)
            .field("categories", &self.categories)
            .field("role", &self.role)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| "<redacted>"))
            .field("keyfile", &self.keyfile)
            .field("primitive", &self.primitive)
            .finish()
    }
}

/// Credentials by identifier
#[derive(Debug, Clone, Default)]
pub struct CredentialStore {
    credentials: BTreeMap<String, Credential>,
}

impl CredentialStore {
    /// Validate and load a `credentials` section
    ///
    /// Returns the store and the warnings found while loading. Any error
    /// fails the whole section.
    pub fn from_section(section: &[Value]) -> LandscapeResult<(Self, Vec<String>)> {
        let mut errors = Vec::new();
        let mut warnings = Vec::new();
        let mut credentials = BTreeMap::new();

        for (index, raw) in section.iter().enumerate() {
            let path = format!("/credentials/{index}");
            let entry: CredentialEntry = match serde_json::from_value(raw.clone()) {
                Ok(entry) => entry,
                Err(err) => {
                    errors.push((path, err.to_string()));
                    continue;
                }
            };

            let Some(identifier) = entry.identifier.filter(|i| !i.is_empty()) else {
                errors.push((path, "credential must have an 'identifier' member".into()));
                continue;
            };
            let path = format!("{path} ({identifier})");

            let categories: Vec<String> = match entry.category {
                Some(category) => category.into(),
                None => Vec::new(),
            };
            if categories.is_empty() {
                errors.push((path, "credential must have a 'category' member".into()));
                continue;
            }

            let username = entry.username.unwrap_or_default();
            let mut problems = Vec::new();
            for category in &categories {
                match category.as_str() {
                    "basic" => {
                        if username.trim().is_empty() {
                            problems.push("basic credentials need a non-empty 'username'");
                        }
                        if entry.password.is_none() {
                            problems.push("basic credentials need a 'password'");
                        }
                    }
                    "ssh" => {
                        if username.trim().is_empty() {
                            problems.push("ssh credentials need a non-empty 'username'");
                        }
                        match &entry.keyfile {
                            None if entry.password.is_none() => {
                                problems.push("ssh credentials need a 'password' or 'keyfile'")
                            }
                            Some(keyfile) if !keyfile.exists() => {
                                problems.push("ssh keyfile does not exist")
                            }
                            _ => {}
                        }
                    }
                    other => warnings.push(format!(
                        "unknown credential category '{other}' in credential '{identifier}'"
                    )),
                }
            }
            if !problems.is_empty() {
                errors.extend(problems.into_iter().map(|p| (path.clone(), p.to_string())));
                continue;
            }

            if credentials.contains_key(&identifier) {
                errors.push((path, "duplicate credential identifier".into()));
                continue;
            }

            credentials.insert(
                identifier.clone(),
                Credential {
                    identifier,
                    categories,
                    role: entry.role.unwrap_or_else(|| "priv".to_string()),
                    username,
                    password: entry.password,
                    keyfile: entry.keyfile,
                    primitive: entry.primitive,
                },
            );
        }

        if !errors.is_empty() {
            return Err(LandscapeError::from_findings("Credentials", &errors));
        }

        Ok((Self { credentials }, warnings))
    }

    pub fn get(&self, identifier: &str) -> Option<&Credential> {
        self.credentials.get(identifier)
    }

    /// Look up a credential a configuration entry refers to
    pub fn require(&self, identifier: &str) -> LandscapeResult<&Credential> {
        self.get(identifier).ok_or_else(|| {
            LandscapeError::Configuration(format!("unknown credential '{identifier}'"))
        })
    }

    pub fn len(&self) -> usize {
        self.credentials.len()
    }

    pub fn is_empty(&self) -> bool {
        self.credentials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Credential> {
        self.credentials.values()
    }
}
