//! Taxonomy families, their published versions, and the on-disk repository
//! that acquires each version at most once.

use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};
use chrono::{Months, NaiveDate};
use log::{debug, info, warn};
use parking_lot::Mutex;
use std::ffi::OsStr;
use std::fs;
use std::io::Cursor;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

// ============================================================================
// Families and versions
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum TaxonomyFamily {
    /// FSA disclosure taxonomy (annual/quarterly securities reports).
    Edinet,
    /// TSE timely-disclosure taxonomy (earnings summaries, forecasts).
    Tdnet,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArchiveLayout {
    /// Files live below a `taxonomy/` directory inside the archive.
    Standard,
    /// Old edition packaged around a `jp/` directory instead.
    LegacyJp,
}

impl ArchiveLayout {
    fn anchor(self) -> &'static str {
        match self {
            ArchiveLayout::Standard => "taxonomy",
            ArchiveLayout::LegacyJp => "jp",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "cli", derive(clap::ValueEnum))]
pub enum PeriodKind {
    Annual,
    HalfYear,
    Quarterly,
}

impl PeriodKind {
    /// Maps the `TypeOfCurrentPeriodDEI` code.
    pub fn from_dei(code: &str) -> Option<Self> {
        match code.trim() {
            "FY" => Some(PeriodKind::Annual),
            "HY" | "Q2" => Some(PeriodKind::HalfYear),
            "Q1" | "Q3" | "Q4" => Some(PeriodKind::Quarterly),
            _ => None,
        }
    }
}

struct VersionEntry {
    version: &'static str,
    effective: (i32, u32, u32),
    source: &'static str,
    layout: ArchiveLayout,
}

const fn entry(version: &'static str, effective: (i32, u32, u32), source: &'static str) -> VersionEntry {
    VersionEntry {
        version,
        effective,
        source,
        layout: ArchiveLayout::Standard,
    }
}

const EDINET_VERSIONS: &[VersionEntry] = &[
    entry("2013-08-31", (2013, 8, 31), "https://www.fsa.go.jp/search/20130821/editaxonomy2013New.zip"),
    entry("2014-03-31", (2014, 3, 31), "https://www.fsa.go.jp/search/20140310/1c.zip"),
    entry("2015-03-31", (2015, 3, 31), "https://www.fsa.go.jp/search/20150310/1c.zip"),
    entry("2016-02-29", (2016, 2, 29), "https://www.fsa.go.jp/search/20160314/1c.zip"),
    entry("2017-02-28", (2017, 2, 28), "https://www.fsa.go.jp/search/20170228/1c.zip"),
    entry("2018-02-28", (2018, 2, 28), "https://www.fsa.go.jp/search/20180228/1c_Taxonomy.zip"),
    entry("2019-02-28", (2019, 2, 28), "https://www.fsa.go.jp/search/20190228/1c_Taxonomy.zip"),
    entry("2019-11-01", (2019, 11, 1), "https://www.fsa.go.jp/search/20191101/1c_Taxonomy.zip"),
    entry("2020-11-01", (2020, 11, 1), "https://www.fsa.go.jp/search/20201110/1c_Taxonomy.zip"),
    entry("2021-11-01", (2021, 11, 1), "https://www.fsa.go.jp/search/20211109/1c_Taxonomy.zip"),
    entry("2022-11-01", (2022, 11, 1), "https://www.fsa.go.jp/search/20221108/1c_Taxonomy.zip"),
];

const TDNET_VERSIONS: &[VersionEntry] = &[
    VersionEntry {
        version: "2011-06-30",
        effective: (2011, 6, 30),
        source: "https://www.jpx.co.jp/equities/listing/xbrl/tvdivq00000088ai-att/taxonomy_2011.zip",
        layout: ArchiveLayout::LegacyJp,
    },
    entry("2014-01-12", (2014, 1, 12), "https://www.jpx.co.jp/equities/listing/xbrl/tvdivq00000088ai-att/61_taxonomy.zip"),
];

/// One published edition of a family.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaxonomyVersion {
    pub family: TaxonomyFamily,
    pub version: &'static str,
    pub effective: NaiveDate,
    pub source: &'static str,
    pub layout: ArchiveLayout,
}

impl TaxonomyVersion {
    /// Maps a taxonomy document URI to its file below `version_root`.
    pub fn local_path(&self, version_root: &Path, uri: &str) -> Option<PathBuf> {
        let relative = uri.strip_prefix(self.family.namespace_prefix())?;
        let relative = match self.layout {
            ArchiveLayout::LegacyJp => relative.strip_prefix("jp/").unwrap_or(relative),
            ArchiveLayout::Standard => relative,
        };

        let mut path = version_root.to_path_buf();
        for segment in relative.split('/').filter(|s| !s.is_empty() && *s != ".") {
            if segment == ".." {
                return None;
            }
            path.push(segment);
        }
        Some(path)
    }
}

impl TaxonomyFamily {
    pub const ALL: [TaxonomyFamily; 2] = [TaxonomyFamily::Edinet, TaxonomyFamily::Tdnet];

    pub fn name(self) -> &'static str {
        match self {
            TaxonomyFamily::Edinet => "edinet",
            TaxonomyFamily::Tdnet => "tdnet",
        }
    }

    pub fn namespace_prefix(self) -> &'static str {
        match self {
            TaxonomyFamily::Edinet => "http://disclosure.edinet-fsa.go.jp/taxonomy/",
            TaxonomyFamily::Tdnet => "http://www.xbrl.tdnet.info/taxonomy/",
        }
    }

    pub fn is_defined(self, uri: &str) -> bool {
        uri.starts_with(self.namespace_prefix())
    }

    fn entries(self) -> &'static [VersionEntry] {
        match self {
            TaxonomyFamily::Edinet => EDINET_VERSIONS,
            TaxonomyFamily::Tdnet => TDNET_VERSIONS,
        }
    }

    pub fn versions(self) -> impl Iterator<Item = TaxonomyVersion> {
        self.entries().iter().filter_map(move |e| {
            let (y, m, d) = e.effective;
            Some(TaxonomyVersion {
                family: self,
                version: e.version,
                effective: NaiveDate::from_ymd_opt(y, m, d)?,
                source: e.source,
                layout: e.layout,
            })
        })
    }

    pub fn version(self, version: &str) -> Option<TaxonomyVersion> {
        self.versions().find(|v| v.version == version)
    }

    /// Latest edition in force on the report date. Quarterly and half-year
    /// reports are dated back one quarter so they resolve to the annual
    /// edition of the period they belong to.
    pub fn version_for(self, report_date: NaiveDate, kind: PeriodKind) -> Option<TaxonomyVersion> {
        let date = match kind {
            PeriodKind::Annual => report_date,
            PeriodKind::HalfYear | PeriodKind::Quarterly => report_date
                .checked_sub_months(Months::new(3))
                .unwrap_or(report_date),
        };
        self.versions()
            .filter(|v| v.effective <= date)
            .max_by_key(|v| v.effective)
    }
}

// ============================================================================
// Configuration
// ============================================================================

#[derive(Debug, Clone)]
pub struct RepositoryConfig {
    pub root: PathBuf,
    pub families: Vec<TaxonomyFamily>,
    pub sources: AHashMap<(TaxonomyFamily, String), String>,
    pub user_agent: String,
    pub timeout: Duration,
}

impl Default for RepositoryConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("data"),
            families: TaxonomyFamily::ALL.to_vec(),
            sources: AHashMap::new(),
            user_agent: concat!("jpxbrl/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(300),
        }
    }
}

impl RepositoryConfig {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self::default().with_root(root)
    }

    /// Reads `XBRL_TAXONOMY_ROOT` and `XBRL_USER_AGENT`, keeping defaults
    /// for whatever is unset.
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(root) = std::env::var("XBRL_TAXONOMY_ROOT") {
            config.root = PathBuf::from(root);
        }
        if let Ok(agent) = std::env::var("XBRL_USER_AGENT") {
            config.user_agent = agent;
        }
        config
    }

    pub fn with_root<P: Into<PathBuf>>(mut self, root: P) -> Self {
        self.root = root.into();
        self
    }

    pub fn with_families(mut self, families: &[TaxonomyFamily]) -> Self {
        self.families = families.to_vec();
        self
    }

    /// Overrides the archive location for one version.
    pub fn with_source(mut self, family: TaxonomyFamily, version: &str, source: &str) -> Self {
        self.sources
            .insert((family, version.to_string()), source.to_string());
        self
    }

    pub fn with_user_agent(mut self, user_agent: &str) -> Self {
        self.user_agent = user_agent.to_string();
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn source_for(&self, version: &TaxonomyVersion) -> String {
        self.sources
            .get(&(version.family, version.version.to_string()))
            .cloned()
            .unwrap_or_else(|| version.source.to_string())
    }
}

// ============================================================================
// Acquisition
// ============================================================================

pub trait ArchiveFetcher: Send + Sync {
    fn fetch(&self, source: &str) -> Result<Vec<u8>>;
}

pub struct HttpFetcher {
    client: reqwest::blocking::Client,
}

impl HttpFetcher {
    pub fn new(config: &RepositoryConfig) -> Result<Self> {
        let client = reqwest::blocking::Client::builder()
            .user_agent(config.user_agent.clone())
            .timeout(config.timeout)
            .build()?;
        Ok(Self { client })
    }
}

impl ArchiveFetcher for HttpFetcher {
    fn fetch(&self, source: &str) -> Result<Vec<u8>> {
        let response = self.client.get(source).send()?.error_for_status()?;
        Ok(response.bytes()?.to_vec())
    }
}

type VersionKey = (TaxonomyFamily, &'static str);

/// Version-keyed taxonomy cache under `<root>/taxonomy/<family>/<version>`.
/// Safe to share between reading sessions.
pub struct TaxonomyRepository {
    config: RepositoryConfig,
    fetcher: Box<dyn ArchiveFetcher>,
    provisioned: Mutex<AHashMap<VersionKey, Arc<Mutex<bool>>>>,
}

impl TaxonomyRepository {
    pub fn new(config: RepositoryConfig) -> Result<Self> {
        let fetcher = HttpFetcher::new(&config)?;
        Ok(Self::with_fetcher(config, fetcher))
    }

    pub fn with_fetcher<F: ArchiveFetcher + 'static>(config: RepositoryConfig, fetcher: F) -> Self {
        Self {
            config,
            fetcher: Box::new(fetcher),
            provisioned: Mutex::new(AHashMap::new()),
        }
    }

    pub fn config(&self) -> &RepositoryConfig {
        &self.config
    }

    pub fn family_for(&self, uri: &str) -> Option<TaxonomyFamily> {
        self.config
            .families
            .iter()
            .copied()
            .find(|family| family.is_defined(uri))
    }

    pub fn is_defined(&self, uri: &str) -> bool {
        self.family_for(uri).is_some()
    }

    pub fn version_dir(&self, version: &TaxonomyVersion) -> PathBuf {
        self.config
            .root
            .join("taxonomy")
            .join(version.family.name())
            .join(version.version)
    }

    /// Whether this repository has already provisioned the version.
    pub fn is_provisioned(&self, version: &TaxonomyVersion) -> bool {
        let slot = self
            .provisioned
            .lock()
            .get(&(version.family, version.version))
            .cloned();
        slot.map(|done| *done.lock()).unwrap_or(false)
    }

    /// Makes the version available on disk and returns its root. The
    /// version directory only appears once extraction has fully succeeded,
    /// so its presence short-circuits any later download.
    pub fn provision(&self, version: &TaxonomyVersion) -> Result<PathBuf> {
        let slot = self
            .provisioned
            .lock()
            .entry((version.family, version.version))
            .or_default()
            .clone();
        let mut done = slot.lock();

        let dir = self.version_dir(version);
        if *done {
            return Ok(dir);
        }
        if dir.is_dir() {
            debug!("taxonomy {} {} already on disk", version.family.name(), version.version);
            *done = true;
            return Ok(dir);
        }

        let failure = |reason: String| Error::Acquisition {
            version: format!("{} {}", version.family.name(), version.version),
            reason,
        };

        let source = self.config.source_for(version);
        info!("downloading taxonomy {} {} from {}", version.family.name(), version.version, source);
        let archive = self.fetcher.fetch(&source).map_err(|e| failure(e.to_string()))?;

        let family_dir = dir.parent().map(Path::to_path_buf).unwrap_or_default();
        fs::create_dir_all(&family_dir).map_err(|e| failure(e.to_string()))?;
        let staging = family_dir.join(format!(".{}.partial", version.version));
        if staging.exists() {
            fs::remove_dir_all(&staging).map_err(|e| failure(e.to_string()))?;
        }

        let extracted = extract_archive(&archive, &staging, version.layout).and_then(|count| {
            if count == 0 {
                return Err(Error::Parse(format!(
                    "archive has no entries below a `{}` directory",
                    version.layout.anchor()
                )));
            }
            fs::rename(&staging, &dir)?;
            Ok(count)
        });

        match extracted {
            Ok(count) => {
                info!("extracted {} files into {}", count, dir.display());
                *done = true;
                Ok(dir)
            }
            Err(e) => {
                if staging.exists() {
                    if let Err(cleanup) = fs::remove_dir_all(&staging) {
                        warn!("could not remove {}: {}", staging.display(), cleanup);
                    }
                }
                Err(failure(e.to_string()))
            }
        }
    }

    /// Local file for a taxonomy document URI, provisioning the version in
    /// force for the given report first.
    pub fn locate(&self, uri: &str, report_date: NaiveDate, kind: PeriodKind) -> Result<PathBuf> {
        let family = self
            .family_for(uri)
            .ok_or_else(|| Error::UnknownNamespace(uri.to_string()))?;
        let version = family.version_for(report_date, kind).ok_or_else(|| {
            Error::NotFound(format!("{} taxonomy in force on {}", family.name(), report_date))
        })?;
        let root = self.provision(&version)?;
        version
            .local_path(&root, uri)
            .ok_or_else(|| Error::UnknownNamespace(uri.to_string()))
    }
}

/// Copies every file below the layout's anchor directory into `dest`,
/// rebased so the anchor itself disappears. Returns the number written.
pub(crate) fn extract_archive(archive: &[u8], dest: &Path, layout: ArchiveLayout) -> Result<usize> {
    let mut zip = zip::ZipArchive::new(Cursor::new(archive))
        .map_err(|e| Error::Parse(format!("zip open error: {e}")))?;

    let mut written = AHashSet::new();
    for i in 0..zip.len() {
        let mut file = zip
            .by_index(i)
            .map_err(|e| Error::Parse(format!("zip entry error: {e}")))?;
        if file.is_dir() {
            continue;
        }
        let Some(name) = file.enclosed_name() else {
            debug!("skipping unsafe archive entry {}", file.name());
            continue;
        };
        let Some(relative) = rebase(&name, layout.anchor()) else {
            continue;
        };
        if !written.insert(relative.clone()) {
            debug!("skipping duplicate archive entry {}", name.display());
            continue;
        }

        let target = dest.join(&relative);
        if let Some(parent) = target.parent() {
            fs::create_dir_all(parent)?;
        }
        let mut out = fs::File::create(&target)?;
        std::io::copy(&mut file, &mut out)?;
    }

    Ok(written.len())
}

fn rebase(path: &Path, anchor: &str) -> Option<PathBuf> {
    let parts: Vec<&OsStr> = path
        .components()
        .filter_map(|c| match c {
            Component::Normal(part) => Some(part),
            _ => None,
        })
        .collect();
    let at = parts.iter().position(|part| *part == OsStr::new(anchor))?;
    let rest = &parts[at + 1..];
    if rest.is_empty() {
        return None;
    }
    Some(rest.iter().collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::{archive, CountingFetcher, FailingFetcher};
    use std::sync::atomic::Ordering;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_version_for_annual() {
        let v = TaxonomyFamily::Edinet
            .version_for(date(2021, 3, 31), PeriodKind::Annual)
            .unwrap();
        assert_eq!(v.version, "2020-11-01");

        let v = TaxonomyFamily::Edinet
            .version_for(date(2021, 11, 1), PeriodKind::Annual)
            .unwrap();
        assert_eq!(v.version, "2021-11-01");

        assert!(TaxonomyFamily::Edinet
            .version_for(date(2010, 3, 31), PeriodKind::Annual)
            .is_none());
    }

    #[test]
    fn test_version_for_quarterly_steps_back() {
        let annual = TaxonomyFamily::Edinet
            .version_for(date(2021, 12, 15), PeriodKind::Annual)
            .unwrap();
        let quarterly = TaxonomyFamily::Edinet
            .version_for(date(2021, 12, 15), PeriodKind::Quarterly)
            .unwrap();
        assert_eq!(annual.version, "2021-11-01");
        assert_eq!(quarterly.version, "2020-11-01");
    }

    #[test]
    fn test_is_defined() {
        assert!(TaxonomyFamily::Edinet
            .is_defined("http://disclosure.edinet-fsa.go.jp/taxonomy/jppfs/2020-11-01/jppfs_cor_2020-11-01.xsd"));
        assert!(!TaxonomyFamily::Edinet.is_defined("http://www.xbrl.org/2003/xbrl-instance-2003-12-31.xsd"));
        assert!(TaxonomyFamily::Tdnet.is_defined("http://www.xbrl.tdnet.info/taxonomy/jp/tse/tdnet/ed/t/2014-01-12/tse-ed-t-2014-01-12.xsd"));
    }

    #[test]
    fn test_rebase() {
        assert_eq!(
            rebase(Path::new("1c_Taxonomy/taxonomy/jppfs/2020-11-01/a.xsd"), "taxonomy"),
            Some(PathBuf::from("jppfs/2020-11-01/a.xsd"))
        );
        assert_eq!(
            rebase(Path::new("tdnet/jp/tse/tdnet/a.xsd"), "jp"),
            Some(PathBuf::from("tse/tdnet/a.xsd"))
        );
        assert_eq!(rebase(Path::new("docs/readme.pdf"), "taxonomy"), None);
        assert_eq!(rebase(Path::new("x/taxonomy"), "taxonomy"), None);
    }

    #[test]
    fn test_local_path_per_layout() {
        let root = Path::new("/cache/taxonomy/tdnet/2011-06-30");
        let legacy = TaxonomyFamily::Tdnet.version("2011-06-30").unwrap();
        assert_eq!(
            legacy.local_path(root, "http://www.xbrl.tdnet.info/taxonomy/jp/tse/tdnet/t.xsd"),
            Some(root.join("tse/tdnet/t.xsd"))
        );

        let root = Path::new("/cache/taxonomy/edinet/2020-11-01");
        let standard = TaxonomyFamily::Edinet.version("2020-11-01").unwrap();
        assert_eq!(
            standard.local_path(root, "http://disclosure.edinet-fsa.go.jp/taxonomy/jppfs/2020-11-01/jppfs_cor_2020-11-01.xsd"),
            Some(root.join("jppfs/2020-11-01/jppfs_cor_2020-11-01.xsd"))
        );
        assert_eq!(standard.local_path(root, "http://example.com/other.xsd"), None);
    }

    #[test]
    fn test_extract_skips_outside_and_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let data = archive(&[
            ("pkg/readme.txt", "ignored"),
            ("pkg/taxonomy/jppfs/a.xsd", "first"),
            ("pkg/copy/taxonomy/jppfs/a.xsd", "second"),
            ("pkg/taxonomy/jppfs/label/a_lab.xml", "label"),
        ]);
        let count = extract_archive(&data, dir.path(), ArchiveLayout::Standard).unwrap();
        assert_eq!(count, 2);
        assert_eq!(fs::read_to_string(dir.path().join("jppfs/a.xsd")).unwrap(), "first");
        assert!(dir.path().join("jppfs/label/a_lab.xml").exists());
        assert!(!dir.path().join("readme.txt").exists());
    }

    #[test]
    fn test_provision_downloads_once_across_sessions() {
        let dir = tempfile::tempdir().unwrap();
        let fetcher = CountingFetcher::new(archive(&[("1c/taxonomy/jppfs/2020-11-01/a.xsd", "<schema/>")]));
        let calls = fetcher.calls();
        let repo = Arc::new(TaxonomyRepository::with_fetcher(
            RepositoryConfig::new(dir.path()),
            fetcher,
        ));
        let version = TaxonomyFamily::Edinet.version("2020-11-01").unwrap();

        std::thread::scope(|s| {
            for _ in 0..2 {
                let repo = Arc::clone(&repo);
                s.spawn(move || repo.provision(&version).unwrap());
            }
        });

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(repo.is_provisioned(&version));
        assert!(repo.version_dir(&version).join("jppfs/2020-11-01/a.xsd").exists());

        // A fresh repository over the same root trusts the marker directory.
        let fetcher = CountingFetcher::new(Vec::new());
        let calls = fetcher.calls();
        let restarted = TaxonomyRepository::with_fetcher(RepositoryConfig::new(dir.path()), fetcher);
        restarted.provision(&version).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn test_failed_provision_leaves_no_marker() {
        let dir = tempfile::tempdir().unwrap();
        let version = TaxonomyFamily::Edinet.version("2020-11-01").unwrap();

        let repo = TaxonomyRepository::with_fetcher(RepositoryConfig::new(dir.path()), FailingFetcher);
        let err = repo.provision(&version).unwrap_err();
        assert!(matches!(err, Error::Acquisition { .. }));
        assert!(!repo.version_dir(&version).exists());
        assert!(!repo.is_provisioned(&version));

        // No taxonomy subtree: also a failure, and nothing left behind.
        let empty = CountingFetcher::new(archive(&[("docs/readme.txt", "x")]));
        let repo = TaxonomyRepository::with_fetcher(RepositoryConfig::new(dir.path()), empty);
        assert!(repo.provision(&version).is_err());
        assert!(!repo.version_dir(&version).exists());

        let good = CountingFetcher::new(archive(&[("taxonomy/jppfs/a.xsd", "x")]));
        let repo = TaxonomyRepository::with_fetcher(RepositoryConfig::new(dir.path()), good);
        let root = repo.provision(&version).unwrap();
        assert!(root.join("jppfs/a.xsd").exists());
    }

    #[test]
    fn test_locate_unknown_namespace() {
        let dir = tempfile::tempdir().unwrap();
        let repo = TaxonomyRepository::with_fetcher(RepositoryConfig::new(dir.path()), FailingFetcher);
        let err = repo
            .locate("http://example.com/x.xsd", date(2021, 3, 31), PeriodKind::Annual)
            .unwrap_err();
        assert!(matches!(err, Error::UnknownNamespace(_)));
    }

    #[test]
    fn test_source_override() {
        let config = RepositoryConfig::default().with_source(
            TaxonomyFamily::Edinet,
            "2020-11-01",
            "file:///mirror/2020.zip",
        );
        let version = TaxonomyFamily::Edinet.version("2020-11-01").unwrap();
        assert_eq!(config.source_for(&version), "file:///mirror/2020.zip");
        let other = TaxonomyFamily::Edinet.version("2021-11-01").unwrap();
        assert_eq!(config.source_for(&other), other.source);
    }

    #[test]
    fn test_config_builders() {
        let config = RepositoryConfig::new("cache")
            .with_families(&[TaxonomyFamily::Edinet])
            .with_user_agent("research contact@example.com")
            .with_timeout(Duration::from_secs(30));
        assert_eq!(config.root, PathBuf::from("cache"));
        assert_eq!(config.user_agent, "research contact@example.com");
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert!(HttpFetcher::new(&config).is_ok());

        // Disabled families are not resolved through the repository.
        let repository = TaxonomyRepository::with_fetcher(config, FailingFetcher);
        assert!(repository.is_defined("http://disclosure.edinet-fsa.go.jp/taxonomy/jppfs/2020-11-01/jppfs_cor"));
        assert!(!repository.is_defined("http://www.xbrl.tdnet.info/taxonomy/jp/tse/tdnet/ed/t/2014-01-12/tse-ed-t"));
        assert_eq!(repository.family_for("http://www.xbrl.tdnet.info/taxonomy/jp/tse/tdnet/ed/t/2014-01-12/tse-ed-t"), None);
    }
}
