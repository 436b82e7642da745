//! Import graph of a taxonomy entry point and the catalog of linkbases it
//! references.

use crate::loader::{decode, file_stem, parse_xml, without_fragment, DocumentLoader};
use crate::model::ns;
use crate::Result;
use ahash::AHashMap;
use log::debug;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkbaseKind {
    Label,
    Presentation,
    Calculation,
    Definition,
    Reference,
}

impl LinkbaseKind {
    fn from_role(role: &str) -> Option<Self> {
        match role {
            "labelLinkbaseRef" => Some(LinkbaseKind::Label),
            "presentationLinkbaseRef" => Some(LinkbaseKind::Presentation),
            "calculationLinkbaseRef" => Some(LinkbaseKind::Calculation),
            "definitionLinkbaseRef" => Some(LinkbaseKind::Definition),
            "referenceLinkbaseRef" => Some(LinkbaseKind::Reference),
            _ => None,
        }
    }

    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "lab" => Some(LinkbaseKind::Label),
            "pre" => Some(LinkbaseKind::Presentation),
            "cal" => Some(LinkbaseKind::Calculation),
            "def" => Some(LinkbaseKind::Definition),
            "ref" => Some(LinkbaseKind::Reference),
            _ => None,
        }
    }
}

const LINKBASE_SUFFIXES: &[&str] = &["lab", "pre", "cal", "def", "ref", "gla"];
const ALTERNATE_LANGUAGE_SUFFIXES: &[&str] = &["-en"];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LinkbaseRef {
    pub uri: Url,
    /// Last segment of the linkbaseRef's `xlink:role`, e.g. `labelLinkbaseRef`.
    pub role: String,
}

impl LinkbaseRef {
    pub fn kind(&self) -> Option<LinkbaseKind> {
        LinkbaseKind::from_role(&self.role).or_else(|| {
            let stem = file_stem(&self.uri);
            let (_, suffix) = stem.rsplit_once('_')?;
            LinkbaseKind::from_suffix(suffix.split('-').next().unwrap_or(suffix))
        })
    }

    /// Whether the linkbase ships with the taxonomy rather than the filing.
    pub fn is_standard(&self) -> bool {
        self.uri.scheme() != "file"
    }
}

#[derive(Debug, Default)]
pub struct SchemaTree {
    root: Option<Url>,
    namespaces: AHashMap<String, Url>,
    linkbases: AHashMap<String, Vec<LinkbaseRef>>,
    catalog: Vec<LinkbaseRef>,
}

impl SchemaTree {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn build(loader: &DocumentLoader, entry: &Url) -> Result<Self> {
        let mut tree = Self::empty();
        let entry = without_fragment(entry);
        tree.walk(loader, &entry)?;
        tree.root = Some(entry);
        Ok(tree)
    }

    fn walk(&mut self, loader: &DocumentLoader, uri: &Url) -> Result<()> {
        let data = loader.read(uri)?;
        let doc = parse_xml(decode(&data)?)?;
        let root = doc.root_element();

        let namespace = root.attribute("targetNamespace").unwrap_or_default().to_string();
        if self.namespaces.contains_key(&namespace) {
            return Ok(());
        }
        self.namespaces.insert(namespace.clone(), uri.clone());

        let mut imports = Vec::new();
        for node in root.descendants().filter(|n| n.is_element()) {
            match (node.tag_name().namespace(), node.tag_name().name()) {
                (Some(ns::LINK), "linkbaseRef") => {
                    let Some(href) = node.attribute((ns::XLINK, "href")) else {
                        continue;
                    };
                    let role = node
                        .attribute((ns::XLINK, "role"))
                        .and_then(|role| role.rsplit('/').next())
                        .unwrap_or_default();
                    let entry = LinkbaseRef {
                        uri: uri.join(href)?,
                        role: role.to_string(),
                    };
                    self.linkbases
                        .entry(namespace.clone())
                        .or_default()
                        .push(entry.clone());
                    self.catalog.push(entry);
                }
                (Some(ns::XSD), "import") => {
                    if let Some(location) = node.attribute("schemaLocation") {
                        imports.push((
                            node.attribute("namespace").map(str::to_string),
                            uri.join(location)?,
                        ));
                    }
                }
                _ => {}
            }
        }

        for (import_namespace, location) in imports {
            if let Some(ns) = &import_namespace {
                if self.namespaces.contains_key(ns) {
                    continue;
                }
            }
            if !loader.is_resolvable(&location) {
                debug!("not following import {}", location);
                if let Some(ns) = import_namespace {
                    self.namespaces.entry(ns).or_insert(location);
                }
                continue;
            }
            self.walk(loader, &location)?;
        }

        Ok(())
    }

    pub fn root(&self) -> Option<&Url> {
        self.root.as_ref()
    }

    pub fn schema_for(&self, namespace: &str) -> Option<&Url> {
        self.namespaces.get(namespace)
    }

    pub fn namespace_of(&self, schema: &Url) -> Option<&str> {
        let schema = without_fragment(schema);
        self.namespaces
            .iter()
            .find(|(_, uri)| **uri == schema)
            .map(|(namespace, _)| namespace.as_str())
    }

    pub fn linkbases_of(&self, namespace: &str) -> &[LinkbaseRef] {
        self.linkbases.get(namespace).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn catalog(&self) -> &[LinkbaseRef] {
        &self.catalog
    }

    /// Catalogued linkbases of one kind, taxonomy documents before filer
    /// documents, each URI once.
    pub fn linkbases(&self, kind: LinkbaseKind) -> Vec<&LinkbaseRef> {
        let mut seen = Vec::new();
        let mut found: Vec<&LinkbaseRef> = Vec::new();
        for entry in &self.catalog {
            if entry.kind() == Some(kind) && !seen.contains(&&entry.uri) {
                seen.push(&entry.uri);
                found.push(entry);
            }
        }
        found.sort_by_key(|entry| !entry.is_standard());
        found
    }

    /// The linkbase of `kind` that belongs to `document`, matched by base
    /// name. Alternate-language label files are never returned.
    pub fn find_kind_uri(&self, kind: LinkbaseKind, document: &Url) -> Option<Url> {
        let base = schema_base_name(document);
        let scoped = self
            .namespace_of(document)
            .map(|namespace| self.linkbases_of(namespace))
            .unwrap_or_default();

        scoped
            .iter()
            .chain(self.catalog.iter())
            .filter(|entry| entry.kind() == Some(kind))
            .filter(|entry| kind != LinkbaseKind::Label || !is_alternate_language(&entry.uri))
            .find(|entry| linkbase_base_name(&entry.uri) == base)
            .map(|entry| entry.uri.clone())
    }
}

/// `jppfs_cor_2020-11-01.xsd` and `jppfs_2020-11-01_lab.xml` share the
/// base name `jppfs_2020-11-01`.
pub(crate) fn schema_base_name(schema: &Url) -> String {
    file_stem(schema).replacen("_cor", "", 1)
}

fn linkbase_base_name(linkbase: &Url) -> &str {
    let stem = file_stem(linkbase);
    match stem.rsplit_once('_') {
        Some((base, suffix))
            if LINKBASE_SUFFIXES
                .iter()
                .any(|s| suffix == *s || suffix.strip_prefix(s).is_some_and(|rest| rest.starts_with('-'))) =>
        {
            base
        }
        _ => stem,
    }
}

fn is_alternate_language(linkbase: &Url) -> bool {
    let stem = file_stem(linkbase);
    ALTERNATE_LANGUAGE_SUFFIXES
        .iter()
        .any(|suffix| stem.ends_with(suffix))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::file_url;
    use crate::testing::write;

    const FILER_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:link="http://www.xbrl.org/2003/linkbase"
    xmlns:xlink="http://www.w3.org/1999/xlink" targetNamespace="http://example.com/filer">
  <xsd:annotation><xsd:appinfo>
    <link:linkbaseRef xlink:type="simple" xlink:href="filer_2021-03-31_lab-en.xml" xlink:role="http://www.xbrl.org/2003/role/labelLinkbaseRef"/>
    <link:linkbaseRef xlink:type="simple" xlink:href="filer_2021-03-31_lab.xml" xlink:role="http://www.xbrl.org/2003/role/labelLinkbaseRef"/>
    <link:linkbaseRef xlink:type="simple" xlink:href="filer_2021-03-31_pre.xml" xlink:role="http://www.xbrl.org/2003/role/presentationLinkbaseRef"/>
    <link:linkbaseRef xlink:type="simple" xlink:href="filer_2021-03-31_cal.xml"/>
  </xsd:appinfo></xsd:annotation>
  <xsd:import namespace="http://www.xbrl.org/2003/instance" schemaLocation="http://www.xbrl.org/2003/xbrl-instance-2003-12-31.xsd"/>
  <xsd:import namespace="http://example.com/std" schemaLocation="std/std_cor_2020-11-01.xsd"/>
</xsd:schema>"#;

    const STD_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:link="http://www.xbrl.org/2003/linkbase"
    xmlns:xlink="http://www.w3.org/1999/xlink" targetNamespace="http://example.com/std">
  <xsd:annotation><xsd:appinfo>
    <link:linkbaseRef xlink:type="simple" xlink:href="label/std_2020-11-01_lab.xml" xlink:role="http://www.xbrl.org/2003/role/labelLinkbaseRef"/>
  </xsd:appinfo></xsd:annotation>
  <xsd:import namespace="http://example.com/filer" schemaLocation="../filer_2021-03-31.xsd"/>
</xsd:schema>"#;

    fn build() -> (tempfile::TempDir, SchemaTree, Url) {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "filer_2021-03-31.xsd", FILER_XSD);
        write(dir.path(), "std/std_cor_2020-11-01.xsd", STD_XSD);
        let entry = file_url(dir.path().join("filer_2021-03-31.xsd")).unwrap();
        let tree = SchemaTree::build(&DocumentLoader::local(), &entry).unwrap();
        (dir, tree, entry)
    }

    #[test]
    fn test_walks_imports_once() {
        let (_dir, tree, entry) = build();
        assert_eq!(tree.schema_for("http://example.com/filer"), Some(&entry));
        let std = tree.schema_for("http://example.com/std").unwrap();
        assert!(std.as_str().ends_with("std/std_cor_2020-11-01.xsd"));
        // Recorded but not followed.
        assert_eq!(
            tree.schema_for("http://www.xbrl.org/2003/instance").unwrap().as_str(),
            "http://www.xbrl.org/2003/xbrl-instance-2003-12-31.xsd"
        );
        assert_eq!(tree.catalog().len(), 5);
        assert_eq!(tree.linkbases_of("http://example.com/std").len(), 1);
    }

    #[test]
    fn test_find_kind_uri() {
        let (_dir, tree, entry) = build();
        let label = tree.find_kind_uri(LinkbaseKind::Label, &entry).unwrap();
        assert!(label.as_str().ends_with("filer_2021-03-31_lab.xml"));

        let calc = tree.find_kind_uri(LinkbaseKind::Calculation, &entry).unwrap();
        assert!(calc.as_str().ends_with("filer_2021-03-31_cal.xml"));

        let std = tree.schema_for("http://example.com/std").unwrap().clone();
        let std_label = tree.find_kind_uri(LinkbaseKind::Label, &std).unwrap();
        assert!(std_label.as_str().ends_with("std/label/std_2020-11-01_lab.xml"));
        assert_eq!(tree.find_kind_uri(LinkbaseKind::Presentation, &std), None);
    }

    #[test]
    fn test_linkbases_by_kind() {
        let (_dir, tree, _) = build();
        let labels = tree.linkbases(LinkbaseKind::Label);
        assert_eq!(labels.len(), 3);
        let presentation = tree.linkbases(LinkbaseKind::Presentation);
        assert_eq!(presentation.len(), 1);
        assert!(!presentation[0].is_standard());
    }

    #[test]
    fn test_base_names() {
        let schema = Url::parse("http://x/jppfs/2020-11-01/jppfs_cor_2020-11-01.xsd").unwrap();
        assert_eq!(schema_base_name(&schema), "jppfs_2020-11-01");
        let label = Url::parse("http://x/jppfs/2020-11-01/label/jppfs_2020-11-01_lab.xml").unwrap();
        assert_eq!(linkbase_base_name(&label), "jppfs_2020-11-01");
        let english = Url::parse("http://x/label/jppfs_2020-11-01_lab-en.xml").unwrap();
        assert_eq!(linkbase_base_name(&english), "jppfs_2020-11-01");
        assert!(is_alternate_language(&english));
    }
}
