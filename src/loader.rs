//! Document access for one reading session: local filing files are read
//! directly, taxonomy URIs go through the shared repository.

use crate::taxonomy::{PeriodKind, TaxonomyRepository};
use crate::{Error, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use url::Url;

/// Report date and period kind used to pick taxonomy versions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReportProfile {
    pub date: NaiveDate,
    pub kind: PeriodKind,
}

impl ReportProfile {
    pub fn new(date: NaiveDate, kind: PeriodKind) -> Self {
        Self { date, kind }
    }
}

pub struct DocumentLoader {
    repository: Option<Arc<TaxonomyRepository>>,
    profile: Option<ReportProfile>,
}

impl DocumentLoader {
    pub fn new(repository: Option<Arc<TaxonomyRepository>>, profile: Option<ReportProfile>) -> Self {
        Self {
            repository,
            profile,
        }
    }

    /// Loader that only sees local files.
    pub fn local() -> Self {
        Self::new(None, None)
    }

    pub fn profile(&self) -> Option<ReportProfile> {
        self.profile
    }

    pub fn repository(&self) -> Option<&Arc<TaxonomyRepository>> {
        self.repository.as_ref()
    }

    pub fn is_resolvable(&self, uri: &Url) -> bool {
        match uri.scheme() {
            "file" => true,
            _ => self
                .repository
                .as_ref()
                .is_some_and(|repo| repo.is_defined(uri.as_str())),
        }
    }

    pub fn locate(&self, uri: &Url) -> Result<PathBuf> {
        let uri = without_fragment(uri);
        if uri.scheme() == "file" {
            return uri
                .to_file_path()
                .map_err(|_| Error::Parse(format!("not a local path: {uri}")));
        }

        let repository = self
            .repository
            .as_ref()
            .filter(|repo| repo.is_defined(uri.as_str()))
            .ok_or_else(|| Error::UnknownNamespace(uri.to_string()))?;
        let profile = self
            .profile
            .ok_or_else(|| Error::NotFound(format!("report date needed to resolve {uri}")))?;
        repository.locate(uri.as_str(), profile.date, profile.kind)
    }

    pub fn read(&self, uri: &Url) -> Result<Vec<u8>> {
        let path = self.locate(uri)?;
        Ok(std::fs::read(path)?)
    }

    pub fn exists(&self, uri: &Url) -> bool {
        self.locate(uri).map(|path| path.is_file()).unwrap_or(false)
    }
}

pub fn file_url<P: AsRef<Path>>(path: P) -> Result<Url> {
    let path = path.as_ref();
    let absolute = match std::fs::canonicalize(path) {
        Ok(canonical) => canonical,
        Err(_) if path.is_absolute() => path.to_path_buf(),
        Err(_) => std::env::current_dir()?.join(path),
    };
    Url::from_file_path(&absolute)
        .map_err(|_| Error::Parse(format!("invalid path: {}", path.display())))
}

pub fn without_fragment(uri: &Url) -> Url {
    let mut uri = uri.clone();
    uri.set_fragment(None);
    uri
}

/// File name without extension, `""` when the URI has no path segments.
pub fn file_stem(uri: &Url) -> &str {
    let name = uri
        .path_segments()
        .and_then(|mut segments| segments.next_back())
        .unwrap_or("");
    match name.rsplit_once('.') {
        Some((stem, _)) => stem,
        None => name,
    }
}

pub(crate) fn decode(data: &[u8]) -> Result<&str> {
    // Skip BOM if present
    let data = data.strip_prefix(&[0xEF, 0xBB, 0xBF]).unwrap_or(data);
    std::str::from_utf8(data).map_err(|_| Error::Parse("Invalid UTF-8 in document".to_string()))
}

pub(crate) fn parse_xml(text: &str) -> Result<roxmltree::Document<'_>> {
    let options = roxmltree::ParsingOptions {
        allow_dtd: true,
        ..Default::default()
    };
    Ok(roxmltree::Document::parse_with_options(text, options)?)
}
