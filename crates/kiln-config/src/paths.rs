//! The path table: logical path roles resolved to concrete directories.
//!
//! Every location a pipeline step touches is composed here, once, from the
//! configuration document. Steps look paths up by role and never concatenate
//! fragments themselves.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use crate::document::KilnConfig;
use crate::error::{ConfigError, Result};

/// Logical locations inside the source, temporary, and public trees.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PathRole {
    StylesSource,
    ScriptsSource,
    ScriptsVendors,
    AssetsTemp,
    AssetsResult,
    ImagesSource,
    ImagesTemp,
    ImagesResult,
    TemplatesSource,
    TemplatesTemp,
    TemplatesResult,
    Temp,
    Public,
}

impl PathRole {
    /// Every role, in declaration order.
    pub const ALL: [PathRole; 13] = [
        PathRole::StylesSource,
        PathRole::ScriptsSource,
        PathRole::ScriptsVendors,
        PathRole::AssetsTemp,
        PathRole::AssetsResult,
        PathRole::ImagesSource,
        PathRole::ImagesTemp,
        PathRole::ImagesResult,
        PathRole::TemplatesSource,
        PathRole::TemplatesTemp,
        PathRole::TemplatesResult,
        PathRole::Temp,
        PathRole::Public,
    ];

    /// The role's name as it appears in log and error output.
    pub fn label(self) -> &'static str {
        match self {
            PathRole::StylesSource => "stylesSource",
            PathRole::ScriptsSource => "scriptsSource",
            PathRole::ScriptsVendors => "scriptsVendors",
            PathRole::AssetsTemp => "assetsTemp",
            PathRole::AssetsResult => "assetsResult",
            PathRole::ImagesSource => "imagesSource",
            PathRole::ImagesTemp => "imagesTemp",
            PathRole::ImagesResult => "imagesResult",
            PathRole::TemplatesSource => "templatesSource",
            PathRole::TemplatesTemp => "templatesTemp",
            PathRole::TemplatesResult => "templatesResult",
            PathRole::Temp => "temp",
            PathRole::Public => "public",
        }
    }
}

/// Flat mapping from [`PathRole`] to the concrete directory it names.
#[derive(Debug, Clone)]
pub struct PathTable {
    roles: HashMap<PathRole, PathBuf>,
}

impl PathTable {
    /// Compose every role from the configuration document's fragments.
    pub fn from_config(config: &KilnConfig) -> Self {
        let p = &config.paths;
        let d = &config.dirs;

        let mut roles = HashMap::with_capacity(PathRole::ALL.len());
        let mut insert = |role: PathRole, parts: &[&str]| {
            roles.insert(role, concat(parts));
        };

        insert(PathRole::StylesSource, &[&p.root, &p.sources, &d.css]);
        insert(PathRole::ScriptsSource, &[&p.root, &p.sources, &d.js]);
        insert(
            PathRole::ScriptsVendors,
            &[&p.root, &p.sources, &d.js, &d.vendors],
        );
        insert(
            PathRole::AssetsTemp,
            &[&p.root, &p.sources, &p.temp, &d.assets],
        );
        insert(PathRole::AssetsResult, &[&p.root, &p.results, &d.assets]);
        insert(PathRole::ImagesSource, &[&p.root, &p.sources, &d.img]);
        insert(PathRole::ImagesTemp, &[&p.root, &p.sources, &p.temp, &d.img]);
        insert(PathRole::ImagesResult, &[&p.root, &p.results, &d.img]);
        insert(
            PathRole::TemplatesSource,
            &[&p.root, &p.sources, &d.templates],
        );
        insert(
            PathRole::TemplatesTemp,
            &[&p.root, &p.sources, &p.temp, &d.templates],
        );
        insert(PathRole::TemplatesResult, &[&p.root, &p.results, &d.html]);
        insert(PathRole::Temp, &[&p.root, &p.sources, &p.temp]);
        insert(PathRole::Public, &[&p.root, &p.results]);

        Self { roles }
    }

    /// Resolve a role to its directory.
    ///
    /// An empty resolution is a configuration error, reported with the
    /// role's name rather than silently yielding an unusable path.
    pub fn get(&self, role: PathRole) -> Result<&Path> {
        let path = self
            .roles
            .get(&role)
            .ok_or(ConfigError::UnknownPathRole { role: role.label() })?;
        if path.as_os_str().is_empty() {
            return Err(ConfigError::EmptyPathRole { role: role.label() });
        }
        Ok(path)
    }
}

/// Join non-empty fragments into one path.
fn concat(parts: &[&str]) -> PathBuf {
    let mut out = PathBuf::new();
    for part in parts {
        if !part.is_empty() {
            out.push(part);
        }
    }
    out
}
