//! Reading session over one filed instance document.
//!
//! A `Reader` parses the instance once, walks the schema it references and
//! builds statement tables on request. Taxonomy documents are resolved
//! through an optional shared `TaxonomyRepository`, using the report date
//! and period kind declared in the DEI facts.

use crate::cache::LinkbaseCache;
use crate::instance::FactStore;
use crate::linkbase::LinkbaseDocument;
use crate::loader::{file_url, DocumentLoader, ReportProfile};
use crate::model::{ElementSchema, Fact, QName, RoleSchema};
use crate::network::{ArcKind, Network, NetworkBuilder};
use crate::schema::SchemaRegistry;
use crate::schema_tree::{LinkbaseKind, SchemaTree};
use crate::statement::Statement;
use crate::taxonomy::{PeriodKind, TaxonomyRepository};
use crate::{Error, Result};
use ahash::AHashSet;
use chrono::NaiveDate;
use log::{debug, info};
use serde::ser::{SerializeMap, Serializer};
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

const FISCAL_YEAR_END_DEI: &str = "CurrentFiscalYearEndDateDEI";
const PERIOD_TYPE_DEI: &str = "TypeOfCurrentPeriodDEI";

#[derive(Clone, Default)]
pub struct ReaderOptions {
    /// Overrides the profile derived from DEI facts.
    pub profile: Option<ReportProfile>,
    /// Linkbase cache shared with other readers.
    pub cache: Option<Arc<LinkbaseCache>>,
}

impl ReaderOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_profile(mut self, date: NaiveDate, kind: PeriodKind) -> Self {
        self.profile = Some(ReportProfile::new(date, kind));
        self
    }

    pub fn with_cache(mut self, cache: Arc<LinkbaseCache>) -> Self {
        self.cache = Some(cache);
        self
    }
}

#[derive(Debug, Clone, Default)]
pub struct TableOptions {
    pub use_calculation_link: bool,
    /// Context id prefix, e.g. `Current`.
    pub scope: Option<String>,
}

impl TableOptions {
    pub fn new() -> Self {
        Self::default()
    }

    /// Current-period contexts only.
    pub fn current() -> Self {
        Self::new().with_scope("Current")
    }

    pub fn with_scope(mut self, scope: &str) -> Self {
        self.scope = Some(scope.to_string());
        self
    }

    pub fn with_calculation(mut self, use_calculation_link: bool) -> Self {
        self.use_calculation_link = use_calculation_link;
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentColumn {
    pub name: String,
    pub label: String,
    pub order: f64,
}

/// One bound fact at one placement in the hierarchy.
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Ancestors root first, padded with `None` to the table depth.
    pub parents: Vec<Option<ParentColumn>>,
    pub order: f64,
    pub depth: usize,
    pub name: String,
    pub reference: String,
    pub label: String,
    pub abstract_element: bool,
    pub data_type: Option<String>,
    pub period_type: Option<String>,
    pub balance: Option<String>,
    pub value: String,
    pub unit: Option<String>,
    pub decimals: Option<String>,
    pub consolidated: bool,
    pub context: String,
    pub member: Option<String>,
    pub period: Option<NaiveDate>,
    pub period_start: Option<NaiveDate>,
    /// Summation weight when calculation arcs are layered in.
    pub weight: Option<f64>,
    /// Whether other lines are summed into this one.
    pub total: bool,
}

impl Serialize for TableRow {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(None)?;
        for (i, parent) in self.parents.iter().enumerate() {
            map.serialize_entry(&format!("parent_{i}"), &parent.as_ref().map(|p| &p.name))?;
            map.serialize_entry(&format!("parent_{i}_label"), &parent.as_ref().map(|p| &p.label))?;
            map.serialize_entry(&format!("parent_{i}_order"), &parent.as_ref().map(|p| p.order))?;
        }
        map.serialize_entry("order", &self.order)?;
        map.serialize_entry("depth", &self.depth)?;
        map.serialize_entry("name", &self.name)?;
        map.serialize_entry("reference", &self.reference)?;
        map.serialize_entry("label", &self.label)?;
        map.serialize_entry("abstract", &self.abstract_element)?;
        map.serialize_entry("data_type", &self.data_type)?;
        map.serialize_entry("period_type", &self.period_type)?;
        map.serialize_entry("balance", &self.balance)?;
        map.serialize_entry("value", &self.value)?;
        map.serialize_entry("unit", &self.unit)?;
        map.serialize_entry("decimals", &self.decimals)?;
        map.serialize_entry("consolidated", &self.consolidated)?;
        map.serialize_entry("context", &self.context)?;
        map.serialize_entry("member", &self.member)?;
        map.serialize_entry("period", &self.period)?;
        map.serialize_entry("period_start", &self.period_start)?;
        map.serialize_entry("weight", &self.weight)?;
        map.serialize_entry("total", &self.total)?;
        map.end()
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct Table {
    pub role: String,
    pub depth: usize,
    pub rows: Vec<TableRow>,
}

impl Table {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

pub struct Reader {
    path: PathBuf,
    facts: FactStore,
    loader: DocumentLoader,
    tree: SchemaTree,
    registry: SchemaRegistry,
    roles: BTreeMap<String, RoleSchema>,
    cache: Arc<LinkbaseCache>,
}

impl Reader {
    pub fn open<P: AsRef<Path>>(path: P, repository: Option<Arc<TaxonomyRepository>>) -> Result<Self> {
        Self::with_options(path, repository, ReaderOptions::default())
    }

    pub fn with_options<P: AsRef<Path>>(
        path: P,
        repository: Option<Arc<TaxonomyRepository>>,
        options: ReaderOptions,
    ) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let facts = FactStore::parse_file(&path)?;
        let profile = options.profile.or_else(|| dei_profile(&facts));
        debug!("{}: {} facts, profile {:?}", path.display(), facts.len(), profile);

        let loader = DocumentLoader::new(repository, profile);
        let tree = match facts.schema_ref() {
            Some(schema_ref) => {
                let entry = file_url(&path)?.join(schema_ref)?;
                if entry.scheme() == "file" && !loader.exists(&entry) {
                    info!("schema {} not found, concepts resolve to stubs", entry);
                    SchemaTree::empty()
                } else {
                    SchemaTree::build(&loader, &entry)?
                }
            }
            None => SchemaTree::empty(),
        };

        let mut reader = Self {
            path,
            facts,
            loader,
            tree,
            registry: SchemaRegistry::new(),
            roles: BTreeMap::new(),
            cache: options.cache.unwrap_or_default(),
        };
        reader.collect_roles()?;
        Ok(reader)
    }

    /// Roles referenced by the filing's own presentation and calculation
    /// linkbases, keyed by the roleType id.
    fn collect_roles(&mut self) -> Result<()> {
        let local = self
            .tree
            .catalog()
            .iter()
            .filter(|entry| !entry.is_standard())
            .filter(|entry| {
                matches!(
                    entry.kind(),
                    Some(LinkbaseKind::Presentation | LinkbaseKind::Calculation)
                )
            });
        for entry in local {
            let linkbase = self.cache.get_or_try_insert_with(entry.uri.as_str(), || {
                let data = self.loader.read(&entry.uri)?;
                LinkbaseDocument::parse(&entry.uri, &data)
            })?;
            for role_ref in &linkbase.role_refs {
                let name = role_ref
                    .href
                    .rsplit_once('#')
                    .map(|(_, id)| id)
                    .unwrap_or(role_ref.role_uri.as_str());
                self.roles.entry(name.to_string()).or_insert_with(|| RoleSchema {
                    name: name.to_string(),
                    uri: role_ref.role_uri.clone(),
                    href: role_ref.href.clone(),
                    label: None,
                });
            }
        }
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn facts(&self) -> &FactStore {
        &self.facts
    }

    /// `xmlns:*` declarations of the instance root.
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        self.facts.namespaces()
    }

    pub fn profile(&self) -> Option<ReportProfile> {
        self.loader.profile()
    }

    pub fn schema_tree(&self) -> &SchemaTree {
        &self.tree
    }

    pub fn registry(&self) -> &SchemaRegistry {
        &self.registry
    }

    pub fn list_roles(&self) -> &BTreeMap<String, RoleSchema> {
        &self.roles
    }

    fn role(&self, name: &str) -> Result<&RoleSchema> {
        self.roles
            .get(name)
            .ok_or_else(|| Error::UnresolvedRole(name.to_string()))
    }

    /// Human label of a role from its roleType definition, resolved once.
    pub fn role_label(&mut self, name: &str) -> Result<Option<String>> {
        let role = self.role(name)?;
        if role.label.is_some() {
            return Ok(role.label.clone());
        }
        let href = role.href.clone();
        let label = self.registry.role_definition(&href, &self.loader)?;
        if let Some(role) = self.roles.get_mut(name) {
            role.label = label.clone();
        }
        Ok(label)
    }

    /// First fact for `prefix:local`, or for a bare local name in any
    /// namespace.
    pub fn find_fact(&self, name: &str) -> Option<&Fact> {
        if name.contains(':') {
            self.facts.find(name)
        } else {
            self.facts.find_local(name)
        }
    }

    pub fn build_network(&mut self, role_name: &str, kind: ArcKind) -> Result<Network> {
        let uri = self.role(role_name)?.uri.clone();
        NetworkBuilder::new(&mut self.registry, &self.loader, &self.tree, &self.cache).build(&uri, kind)
    }

    pub fn build_table(&mut self, role_name: &str, options: &TableOptions) -> Result<Table> {
        let uri = self.role(role_name)?.uri.clone();
        let mut builder = NetworkBuilder::new(&mut self.registry, &self.loader, &self.tree, &self.cache);
        let mut network = builder.build(&uri, ArcKind::Presentation)?;
        if options.use_calculation_link {
            builder.layer_calculation(&mut network)?;
        }
        Ok(self.bind(&network, options.scope.as_deref()))
    }

    /// Table of the first role candidate of `statement` the filing declares.
    pub fn statement(&mut self, statement: Statement, consolidated: bool, options: &TableOptions) -> Result<Table> {
        for candidate in statement.role_candidates(consolidated) {
            match self.build_table(candidate, options) {
                Err(Error::UnresolvedRole(_)) => continue,
                result => return result,
            }
        }
        Err(Error::UnresolvedRole(format!(
            "no role for {} ({})",
            statement.name(),
            if consolidated { "consolidated" } else { "non-consolidated" }
        )))
    }

    fn concept_facts(&self, schema: &ElementSchema) -> &[Fact] {
        if !schema.qname.namespace.is_empty() {
            return self.facts.facts(&schema.qname);
        }
        // Stub schemas only know their prefix.
        match self.facts.namespaces().get(schema.prefix.as_str()) {
            Some(namespace) => self.facts.facts(&QName::new(namespace, &schema.qname.local)),
            None => &[],
        }
    }

    fn bind(&self, network: &Network, scope: Option<&str>) -> Table {
        let flat = network.flatten();
        let depth = Network::max_depth(&flat);
        let mut rows = Vec::new();

        for placement in &flat {
            let schema = &self.registry[placement.element];
            let facts = self.concept_facts(schema);
            if facts.is_empty() {
                continue;
            }

            let mut parents: Vec<Option<ParentColumn>> = placement
                .ancestors
                .iter()
                .map(|ancestor| {
                    let parent = &self.registry[ancestor.element];
                    Some(ParentColumn {
                        name: parent.qualified_name(),
                        label: parent.display_label().to_string(),
                        order: ancestor.order,
                    })
                })
                .collect();
            parents.resize(depth, None);
            let node = network.node(placement.node);

            for fact in facts {
                if scope.is_some_and(|scope| !fact.context_ref.starts_with(scope)) {
                    continue;
                }
                let period = self.facts.context(&fact.context_ref).map(|c| &c.period);
                rows.push(TableRow {
                    parents: parents.clone(),
                    order: placement.order,
                    depth: placement.depth(),
                    name: schema.qualified_name(),
                    reference: schema.reference.clone(),
                    label: schema.display_label().to_string(),
                    abstract_element: schema.abstract_element,
                    data_type: schema.data_type.as_ref().map(|t| t.as_str().to_string()),
                    period_type: schema.period_type.map(|p| p.as_str().to_string()),
                    balance: schema.balance.map(|b| b.as_str().to_string()),
                    value: fact.value.clone(),
                    unit: fact.unit_ref.clone(),
                    decimals: fact.decimals.clone(),
                    consolidated: fact.is_consolidated(),
                    context: fact.context_id().to_string(),
                    member: fact.member().map(str::to_string),
                    period: period.and_then(|p| p.end()),
                    period_start: period.and_then(|p| p.start()),
                    weight: node.weight(),
                    total: node.is_total(),
                });
            }
        }

        let mut seen = AHashSet::new();
        rows.retain(|row| seen.insert((row.name.clone(), row.period_start, row.period)));

        Table {
            role: network.role.clone(),
            depth,
            rows,
        }
    }
}

/// Report date and period kind from DEI, else the latest context end as an
/// annual report.
fn dei_profile(facts: &FactStore) -> Option<ReportProfile> {
    let date = facts
        .find_local(FISCAL_YEAR_END_DEI)
        .and_then(|fact| NaiveDate::parse_from_str(fact.value.trim(), "%Y-%m-%d").ok())
        .or_else(|| facts.latest_period_end())?;
    let kind = facts
        .find_local(PERIOD_TYPE_DEI)
        .and_then(|fact| PeriodKind::from_dei(&fact.value))
        .unwrap_or(PeriodKind::Annual);
    Some(ReportProfile::new(date, kind))
}
