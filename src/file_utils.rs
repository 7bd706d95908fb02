/*!
 * File system utilities: stem parsing and data distribution audits.
 *
 * The catalog stores relative path stems without extension; the raw
 * recordings live in a user-supplied directory. This module checks the
 * two against each other.
 */

use anyhow::{Context, Result, anyhow};
use log::debug;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use crate::catalog::{Catalog, ObjectQuery};
use crate::database::models::{ClientGroup, Gender};
use crate::protocols::Protocol;

static STEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^(g1|g2|world)/(\d{4})/(\d{4})_([fm])_(g1|g2|world)_s(\d{2})_(\d{4})_en_(\d+)$",
    )
    .expect("stem pattern must compile")
});

/// Components encoded in a file path stem
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StemParts {
    /// Real identity of the recorded client
    pub client_id: i64,
    /// Gender of the client
    pub gender: Gender,
    /// Enrollment group of the client
    pub group: ClientGroup,
    /// Data session of the access
    pub session_id: i64,
    /// Identity claimed during the access
    pub claimed_id: i64,
    /// Shot number within the access
    pub shot_id: i64,
}

/// Parse a relative path stem into its components.
///
/// The directory prefix must agree with the encoded group and client
/// identifier; a mismatch marks a stem that was moved or renamed.
pub fn parse_stem(stem: &str) -> Result<StemParts> {
    let caps = STEM_RE
        .captures(stem)
        .ok_or_else(|| anyhow!("Malformed file stem: {}", stem))?;

    let dir_group: ClientGroup = caps[1].parse()?;
    let dir_id: i64 = caps[2].parse()?;
    let client_id: i64 = caps[3].parse()?;
    let gender: Gender = caps[4].parse()?;
    let group: ClientGroup = caps[5].parse()?;
    let session_id: i64 = caps[6].parse()?;
    let claimed_id: i64 = caps[7].parse()?;
    let shot_id: i64 = caps[8].parse()?;

    if dir_group != group || dir_id != client_id {
        return Err(anyhow!(
            "File stem directory does not match its encoded identity: {}",
            stem
        ));
    }

    Ok(StemParts {
        client_id,
        gender,
        group,
        session_id,
        claimed_id,
        shot_id,
    })
}

/// Result of auditing the external data distribution against the catalog
#[derive(Debug, Clone, Default)]
pub struct CheckReport {
    /// Number of cataloged files checked
    pub total: usize,
    /// Cataloged files absent from the data directory
    pub missing: Vec<PathBuf>,
    /// On-disk files whose stems are not cataloged
    pub extra: Vec<PathBuf>,
}

impl CheckReport {
    /// Whether the distribution holds exactly the cataloged files
    pub fn is_complete(&self) -> bool {
        self.missing.is_empty()
    }
}

/// Audit the raw data distribution under `directory`.
///
/// Every cataloged file (optionally restricted to the given protocols) is
/// expected to exist at `directory/<stem><extension>`; files found on disk
/// under that extension whose stems are not cataloged are reported as
/// extra. Missing raw files are a configuration problem on the user's
/// side, not a catalog defect.
pub async fn check_files(
    catalog: &Catalog,
    directory: &Path,
    extension: &str,
    protocols: &[Protocol],
) -> Result<CheckReport> {
    if !directory.is_dir() {
        return Err(anyhow!("Data directory does not exist: {:?}", directory));
    }

    let files = catalog
        .objects(&ObjectQuery::new().protocols(protocols))
        .await
        .context("Failed to enumerate cataloged files")?;

    let mut expected: HashSet<String> = HashSet::with_capacity(files.len());
    let mut report = CheckReport {
        total: files.len(),
        ..Default::default()
    };

    for file in &files {
        expected.insert(file.path.clone());
        let full = file.make_path(Some(directory), Some(extension));
        if !full.is_file() {
            report.missing.push(full);
        }
    }

    for entry in WalkDir::new(directory).into_iter().filter_map(|e| e.ok()) {
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        if !extension.is_empty() && !path.to_string_lossy().ends_with(extension) {
            continue;
        }

        let relative = path
            .strip_prefix(directory)
            .context("Walked outside the data directory")?;
        let mut stem = relative.to_string_lossy().into_owned();
        stem.truncate(stem.len() - extension.len());

        if !expected.contains(&stem) {
            debug!("Uncataloged file on disk: {:?}", path);
            report.extra.push(path.to_path_buf());
        }
    }

    Ok(report)
}
