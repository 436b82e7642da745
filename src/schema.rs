// Schema loading and label resolution for XBRL concepts
use crate::linkbase::LinkbaseDocument;
use crate::loader::{decode, parse_xml, without_fragment, DocumentLoader};
use crate::model::{ns, Balance, DataType, ElementSchema, PeriodType, QName, SchemaId};
use crate::schema_tree::{schema_base_name, LinkbaseKind, SchemaTree};
use crate::{Error, Result};
use ahash::{AHashMap, AHashSet};
use compact_str::CompactString;
use log::debug;
use roxmltree::Node;
use std::ops::Index;
use url::Url;

const LOCAL_LANGUAGE: &str = "ja";

/// Owns every `ElementSchema` seen in a reading session. Nodes and table
/// rows refer to concepts by `SchemaId`.
#[derive(Debug, Default)]
pub struct SchemaRegistry {
    schemas: Vec<ElementSchema>,
    by_reference: AHashMap<String, SchemaId>,
    by_qname: AHashMap<QName, SchemaId>,
    loaded: AHashSet<Url>,
    role_definitions: AHashMap<String, Option<String>>,
}

impl SchemaRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }

    pub fn get(&self, id: SchemaId) -> Option<&ElementSchema> {
        self.schemas.get(id)
    }

    pub fn find(&self, qname: &QName) -> Option<SchemaId> {
        self.by_qname.get(qname).copied()
    }

    pub fn find_reference(&self, reference: &str) -> Option<SchemaId> {
        self.by_reference.get(reference).copied()
    }

    /// Number of schema documents parsed so far.
    pub fn documents_loaded(&self) -> usize {
        self.loaded.len()
    }

    /// Resolves a locator href (`schemaUri#id`) to its concept. The first
    /// reference into a schema document registers every element it declares
    /// and applies its labels; concepts whose document is unavailable become
    /// stubs carrying only the name.
    pub fn resolve(&mut self, reference: &str, loader: &DocumentLoader, tree: &SchemaTree) -> Result<SchemaId> {
        if let Some(id) = self.find_reference(reference) {
            return Ok(id);
        }

        let uri = Url::parse(reference)?;
        let document = without_fragment(&uri);
        if !self.loaded.contains(&document) {
            let first = self.schemas.len();
            if let Err(e) = self.load_document(&document, loader, tree) {
                self.unregister_from(first);
                return Err(e);
            }
            self.loaded.insert(document.clone());
        }
        if let Some(id) = self.find_reference(reference) {
            return Ok(id);
        }

        let fragment = uri.fragment().unwrap_or_default();
        let (prefix, local) = fragment.rsplit_once('_').unwrap_or(("", fragment));
        let mut stub = ElementSchema::stub(reference, local);
        stub.prefix = CompactString::new(prefix);
        if let Some(namespace) = tree.namespace_of(&document) {
            stub.qname.namespace = CompactString::new(namespace);
        }
        debug!("stub schema for {}", reference);
        Ok(self.register(stub))
    }

    fn register(&mut self, schema: ElementSchema) -> SchemaId {
        let id = self.schemas.len();
        self.by_reference.insert(schema.reference.clone(), id);
        if !schema.qname.namespace.is_empty() {
            self.by_qname.entry(schema.qname.clone()).or_insert(id);
        }
        self.schemas.push(schema);
        id
    }

    /// Drops every schema registered at or after `first`, so a document
    /// whose labels failed to load is parsed again on the next reference.
    fn unregister_from(&mut self, first: SchemaId) {
        for (id, schema) in self.schemas.iter().enumerate().skip(first) {
            self.by_reference.remove(&schema.reference);
            if self.by_qname.get(&schema.qname) == Some(&id) {
                self.by_qname.remove(&schema.qname);
            }
        }
        self.schemas.truncate(first);
    }

    fn load_document(&mut self, document: &Url, loader: &DocumentLoader, tree: &SchemaTree) -> Result<()> {
        let Some(data) = read_optional(loader, document)? else {
            debug!("schema {} not available", document);
            return Ok(());
        };
        let doc = parse_xml(decode(&data)?)?;
        let root = doc.root_element();
        let namespace = root.attribute("targetNamespace").unwrap_or_default();

        let first = self.schemas.len();
        for element in root.children().filter(|n| is_xsd(n, "element")) {
            let (Some(name), Some(id)) = (element.attribute("name"), element.attribute("id")) else {
                continue;
            };
            let prefix = id
                .strip_suffix(name)
                .and_then(|rest| rest.strip_suffix('_'))
                .unwrap_or_default();
            let schema = ElementSchema {
                qname: QName::new(namespace, name),
                prefix: CompactString::new(prefix),
                reference: format!("{}#{}", document, id),
                label: None,
                verbose_label: None,
                data_type: element.attribute("type").map(DataType::from_type_ref),
                period_type: element
                    .attribute((ns::XBRLI, "periodType"))
                    .and_then(PeriodType::parse),
                balance: element.attribute((ns::XBRLI, "balance")).and_then(Balance::parse),
                abstract_element: element.attribute("abstract") == Some("true"),
            };
            self.register(schema);
        }
        debug!("registered {} elements from {}", self.schemas.len() - first, document);

        self.apply_labels(document, loader, tree)
    }

    fn apply_labels(&mut self, document: &Url, loader: &DocumentLoader, tree: &SchemaTree) -> Result<()> {
        let label_uri = match tree.find_kind_uri(LinkbaseKind::Label, document) {
            Some(uri) => Some(uri),
            None => conventional_label_uris(document)?
                .into_iter()
                .find(|uri| loader.exists(uri)),
        };
        let Some(label_uri) = label_uri else {
            debug!("no label linkbase for {}", document);
            return Ok(());
        };
        let Some(data) = read_optional(loader, &label_uri)? else {
            return Ok(());
        };
        let linkbase = LinkbaseDocument::parse(&label_uri, &data)?;

        // Local-language labels first; other languages only fill gaps.
        let (local, foreign): (Vec<_>, Vec<_>) = linkbase
            .labels
            .iter()
            .partition(|label| label.lang.is_empty() || label.lang == LOCAL_LANGUAGE);
        for (labels, overwrite) in [(local, true), (foreign, false)] {
            for label in labels {
                let Some(&id) = self.by_reference.get(&label.concept) else {
                    continue;
                };
                let schema = &mut self.schemas[id];
                let slot = match label.role.as_str() {
                    ns::ROLE_LABEL => &mut schema.label,
                    ns::ROLE_VERBOSE_LABEL => &mut schema.verbose_label,
                    _ => continue,
                };
                if overwrite || slot.is_none() {
                    *slot = Some(label.label.clone());
                }
            }
        }
        Ok(())
    }

    /// Text of the `link:definition` of the roleType at `href`
    /// (`schemaUri#roleTypeId`). Looked up once per href.
    pub fn role_definition(&mut self, href: &str, loader: &DocumentLoader) -> Result<Option<String>> {
        if let Some(definition) = self.role_definitions.get(href) {
            return Ok(definition.clone());
        }

        let uri = Url::parse(href)?;
        let id = uri.fragment().unwrap_or_default().to_string();
        let definition = match read_optional(loader, &without_fragment(&uri))? {
            Some(data) => {
                let doc = parse_xml(decode(&data)?)?;
                let found = doc
                    .descendants()
                    .filter(|n| n.is_element() && n.tag_name().name() == "roleType")
                    .find(|n| n.attribute("id") == Some(id.as_str()))
                    .and_then(|role_type| {
                        role_type
                            .children()
                            .find(|n| n.is_element() && n.tag_name().name() == "definition")
                    })
                    .and_then(|definition| definition.text())
                    .map(|text| text.trim().to_string());
                found
            }
            None => None,
        };

        self.role_definitions.insert(href.to_string(), definition.clone());
        Ok(definition)
    }
}

impl Index<SchemaId> for SchemaRegistry {
    type Output = ElementSchema;

    fn index(&self, id: SchemaId) -> &ElementSchema {
        &self.schemas[id]
    }
}

fn is_xsd(node: &Node, name: &str) -> bool {
    node.is_element() && node.tag_name().namespace() == Some(ns::XSD) && node.tag_name().name() == name
}

/// Reads a document, treating a missing local file as absent.
fn read_optional(loader: &DocumentLoader, uri: &Url) -> Result<Option<Vec<u8>>> {
    match loader.read(uri) {
        Ok(data) => Ok(Some(data)),
        Err(Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(e),
    }
}

/// `label/<base>_lab.xml` next to the schema, then `<base>_lab.xml`.
fn conventional_label_uris(document: &Url) -> Result<Vec<Url>> {
    let base = schema_base_name(document);
    Ok(vec![
        document.join(&format!("label/{base}_lab.xml"))?,
        document.join(&format!("{base}_lab.xml"))?,
    ])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::loader::file_url;
    use crate::testing::write;
    use pretty_assertions::assert_eq;

    const STD_XSD: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<xsd:schema xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:xbrli="http://www.xbrl.org/2003/instance"
    xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink"
    targetNamespace="http://example.com/std">
  <xsd:annotation><xsd:appinfo>
    <link:roleType roleURI="http://example.com/role/rol_BalanceSheet" id="rol_BalanceSheet">
      <link:definition> 貸借対照表 </link:definition>
      <link:usedOn>link:presentationLink</link:usedOn>
    </link:roleType>
  </xsd:appinfo></xsd:annotation>
  <xsd:element name="BalanceSheetHeading" id="std_cor_BalanceSheetHeading" type="xbrli:stringItemType" abstract="true" xbrli:periodType="duration" substitutionGroup="xbrli:item"/>
  <xsd:element name="CashAndDeposits" id="std_cor_CashAndDeposits" type="xbrli:monetaryItemType" xbrli:periodType="instant" xbrli:balance="debit" substitutionGroup="xbrli:item"/>
  <xsd:element name="Liabilities" id="std_cor_Liabilities" type="xbrli:monetaryItemType" xbrli:periodType="instant" xbrli:balance="credit" substitutionGroup="xbrli:item"/>
</xsd:schema>"#;

    const STD_LAB: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<link:linkbase xmlns:link="http://www.xbrl.org/2003/linkbase" xmlns:xlink="http://www.w3.org/1999/xlink">
  <link:labelLink xlink:type="extended" xlink:role="http://www.xbrl.org/2003/role/link">
    <link:loc xlink:type="locator" xlink:href="../std_cor_2020-11-01.xsd#std_cor_CashAndDeposits" xlink:label="Cash"/>
    <link:label xlink:type="resource" xlink:label="lab_Cash" xlink:role="http://www.xbrl.org/2003/role/label" xml:lang="en">Cash and deposits</link:label>
    <link:label xlink:type="resource" xlink:label="lab_Cash" xlink:role="http://www.xbrl.org/2003/role/label" xml:lang="ja">現金及び預金</link:label>
    <link:label xlink:type="resource" xlink:label="lab_Cash" xlink:role="http://www.xbrl.org/2003/role/verboseLabel" xml:lang="ja">現金及び預金（資産）</link:label>
    <link:labelArc xlink:type="arc" xlink:arcrole="http://www.xbrl.org/2003/arcrole/concept-label" xlink:from="Cash" xlink:to="lab_Cash"/>
    <link:loc xlink:type="locator" xlink:href="../std_cor_2020-11-01.xsd#std_cor_Liabilities" xlink:label="Liabilities"/>
    <link:label xlink:type="resource" xlink:label="lab_Liabilities" xlink:role="http://www.xbrl.org/2003/role/label" xml:lang="en">Liabilities</link:label>
    <link:labelArc xlink:type="arc" xlink:arcrole="http://www.xbrl.org/2003/arcrole/concept-label" xlink:from="Liabilities" xlink:to="lab_Liabilities"/>
  </link:labelLink>
</link:linkbase>"#;

    fn setup() -> (tempfile::TempDir, Url) {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "std_cor_2020-11-01.xsd", STD_XSD);
        // Found by naming convention; the schema has no linkbaseRef.
        write(dir.path(), "label/std_2020-11-01_lab.xml", STD_LAB);
        let schema = file_url(dir.path().join("std_cor_2020-11-01.xsd")).unwrap();
        (dir, schema)
    }

    #[test]
    fn test_resolve_registers_whole_document() {
        let (_dir, schema) = setup();
        let loader = DocumentLoader::local();
        let tree = SchemaTree::empty();
        let mut registry = SchemaRegistry::new();

        let reference = format!("{}#std_cor_CashAndDeposits", schema);
        let id = registry.resolve(&reference, &loader, &tree).unwrap();
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.documents_loaded(), 1);

        let cash = &registry[id];
        assert_eq!(cash.qualified_name(), "std_cor:CashAndDeposits");
        assert_eq!(cash.qname, QName::new("http://example.com/std", "CashAndDeposits"));
        assert_eq!(cash.data_type, Some(DataType::Monetary));
        assert_eq!(cash.period_type, Some(PeriodType::Instant));
        assert_eq!(cash.balance, Some(Balance::Debit));
        assert!(!cash.abstract_element);
        assert_eq!(cash.label.as_deref(), Some("現金及び預金"));
        assert_eq!(cash.verbose_label.as_deref(), Some("現金及び預金（資産）"));

        let heading = registry.resolve(&format!("{}#std_cor_BalanceSheetHeading", schema), &loader, &tree).unwrap();
        assert!(registry[heading].abstract_element);
        assert_eq!(registry.documents_loaded(), 1);
        assert_eq!(registry.resolve(&reference, &loader, &tree).unwrap(), id);
    }

    #[test]
    fn test_foreign_label_fills_gap() {
        let (_dir, schema) = setup();
        let mut registry = SchemaRegistry::new();
        let id = registry
            .resolve(
                &format!("{}#std_cor_Liabilities", schema),
                &DocumentLoader::local(),
                &SchemaTree::empty(),
            )
            .unwrap();
        assert_eq!(registry[id].display_label(), "Liabilities");
        assert_eq!(registry[id].balance, Some(Balance::Credit));
    }

    #[test]
    fn test_missing_document_degrades_to_stub() {
        let dir = tempfile::tempdir().unwrap();
        let missing = file_url(dir.path().join("missing.xsd")).unwrap();
        let reference = format!("{}#filer_NetSales", missing);
        let mut registry = SchemaRegistry::new();
        let id = registry
            .resolve(&reference, &DocumentLoader::local(), &SchemaTree::empty())
            .unwrap();
        let stub = &registry[id];
        assert_eq!(stub.qualified_name(), "filer:NetSales");
        assert_eq!(stub.reference, reference);
        assert_eq!(stub.label, None);
    }

    #[test]
    fn test_taxonomy_reference_without_repository() {
        let mut registry = SchemaRegistry::new();
        let err = registry
            .resolve(
                "http://disclosure.edinet-fsa.go.jp/taxonomy/jppfs/2020-11-01/jppfs_cor_2020-11-01.xsd#jppfs_cor_Assets",
                &DocumentLoader::local(),
                &SchemaTree::empty(),
            )
            .unwrap_err();
        assert!(matches!(err, Error::UnknownNamespace(_)));
    }

    #[test]
    fn test_broken_label_linkbase_fails_every_time() {
        let dir = tempfile::tempdir().unwrap();
        write(dir.path(), "std_cor_2020-11-01.xsd", STD_XSD);
        write(dir.path(), "label/std_2020-11-01_lab.xml", "<link:linkbase><unclosed>");
        let schema = file_url(dir.path().join("std_cor_2020-11-01.xsd")).unwrap();
        let loader = DocumentLoader::local();
        let tree = SchemaTree::empty();
        let mut registry = SchemaRegistry::new();

        let cash = format!("{}#std_cor_CashAndDeposits", schema);
        assert!(registry.resolve(&cash, &loader, &tree).is_err());
        assert!(registry.is_empty());
        assert_eq!(registry.documents_loaded(), 0);

        let liabilities = format!("{}#std_cor_Liabilities", schema);
        assert!(registry.resolve(&liabilities, &loader, &tree).is_err());
        assert_eq!(registry.find_reference(&liabilities), None);

        // Once the label file is fixed the document loads normally.
        write(dir.path(), "label/std_2020-11-01_lab.xml", STD_LAB);
        let id = registry.resolve(&cash, &loader, &tree).unwrap();
        assert_eq!(registry[id].label.as_deref(), Some("現金及び預金"));
        assert_eq!(registry.len(), 3);
        assert_eq!(registry.documents_loaded(), 1);
    }

    #[test]
    fn test_role_definition() {
        let (_dir, schema) = setup();
        let loader = DocumentLoader::local();
        let mut registry = SchemaRegistry::new();
        let href = format!("{}#rol_BalanceSheet", schema);
        assert_eq!(
            registry.role_definition(&href, &loader).unwrap().as_deref(),
            Some("貸借対照表")
        );
        let unknown = format!("{}#rol_Unknown", schema);
        assert_eq!(registry.role_definition(&unknown, &loader).unwrap(), None);
    }
}
