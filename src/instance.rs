// Instance document parsing: facts, contexts, units
use crate::loader::decode;
use crate::model::{ns, Context, DimensionMember, Fact, Period, QName};
use crate::{Error, Result};
use ahash::AHashMap;
use chrono::NaiveDate;
use compact_str::CompactString;
use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, ResolveResult};
use quick_xml::reader::NsReader;
use std::collections::BTreeMap;
use std::path::Path;
use unicode_normalization::UnicodeNormalization;

/// Every fact of one instance document, grouped by concept in document
/// order, with the context and unit tables they refer to.
#[derive(Debug, Default)]
pub struct FactStore {
    namespaces: BTreeMap<String, String>,
    schema_ref: Option<String>,
    contexts: AHashMap<String, Context>,
    units: AHashMap<String, String>,
    facts: AHashMap<QName, Vec<Fact>>,
    len: usize,
}

impl FactStore {
    pub fn parse_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read(path)?;
        Self::parse_bytes(&content)
    }

    pub fn parse_bytes(data: &[u8]) -> Result<Self> {
        Self::parse_str(decode(data)?)
    }

    pub fn parse_str(text: &str) -> Result<Self> {
        let mut reader = NsReader::from_str(text);
        reader.config_mut().trim_text(true);

        let mut store = FactStore::default();

        // Root element and its namespace declarations.
        loop {
            let (_, event) = reader.read_resolved_event()?;
            match event {
                Event::Start(e) => {
                    store.declare_namespaces(&e)?;
                    break;
                }
                Event::Empty(e) => {
                    store.declare_namespaces(&e)?;
                    return Ok(store);
                }
                Event::Eof => return Err(Error::Parse("document has no root element".to_string())),
                _ => {}
            }
        }

        loop {
            let (resolved, event) = reader.read_resolved_event()?;
            let namespace = namespace_of(resolved);
            match event {
                Event::Start(e) => {
                    let node = read_element(&mut reader, &e, namespace, false)?;
                    store.accept(node)?;
                }
                Event::Empty(e) => {
                    let node = read_element(&mut reader, &e, namespace, true)?;
                    store.accept(node)?;
                }
                Event::End(_) | Event::Eof => break,
                _ => {}
            }
        }

        Ok(store)
    }

    fn declare_namespaces(&mut self, root: &BytesStart) -> Result<()> {
        for attr in root.attributes().flatten() {
            let key = std::str::from_utf8(attr.key.as_ref()).unwrap_or("");
            if let Some(prefix) = key.strip_prefix("xmlns:") {
                let value = attr.unescape_value()?;
                self.namespaces.insert(prefix.to_string(), value.into_owned());
            }
        }
        Ok(())
    }

    fn accept(&mut self, node: XmlNode) -> Result<()> {
        match (node.namespace.as_str(), node.local.as_str()) {
            (ns::XBRLI, "context") => {
                let context = parse_context(&node)?;
                self.contexts.insert(context.id.clone(), context);
            }
            (ns::XBRLI, "unit") => {
                if let Some(id) = node.attribute(None, "id") {
                    self.units.insert(id.to_string(), unit_measure(&node));
                }
            }
            (ns::LINK, "schemaRef") => {
                self.schema_ref = node.attribute(Some(ns::XLINK), "href").map(str::to_string);
            }
            (namespace, _) if namespace.is_empty() || ns::STRUCTURAL.contains(&namespace) => {}
            _ => {
                let Some(context_ref) = node.attribute(None, "contextRef") else {
                    return Ok(());
                };
                let fact = Fact {
                    name: QName::new(&node.namespace, &node.local),
                    prefix: CompactString::new(&node.prefix),
                    id: node.attribute(None, "id").map(str::to_string),
                    value: normalize_numeric(&node.full_text()),
                    unit_ref: node.attribute(None, "unitRef").map(str::to_string),
                    decimals: node.attribute(None, "decimals").map(str::to_string),
                    context_ref: context_ref.to_string(),
                    nil: node.attribute(Some(ns::XSI), "nil") == Some("true"),
                };
                self.facts.entry(fact.name.clone()).or_default().push(fact);
                self.len += 1;
            }
        }
        Ok(())
    }

    /// `xmlns:*` declarations of the root element, prefix to URI.
    pub fn namespaces(&self) -> &BTreeMap<String, String> {
        &self.namespaces
    }

    pub fn schema_ref(&self) -> Option<&str> {
        self.schema_ref.as_deref()
    }

    pub fn context(&self, id: &str) -> Option<&Context> {
        self.contexts.get(id)
    }

    pub fn contexts(&self) -> impl Iterator<Item = &Context> {
        self.contexts.values()
    }

    pub fn unit_measure(&self, id: &str) -> Option<&str> {
        self.units.get(id).map(String::as_str)
    }

    pub fn facts(&self, name: &QName) -> &[Fact] {
        self.facts.get(name).map(Vec::as_slice).unwrap_or_default()
    }

    /// First fact for a `prefix:local` name.
    pub fn find(&self, qualified_name: &str) -> Option<&Fact> {
        let (prefix, local) = qualified_name.split_once(':')?;
        let namespace = self.namespaces.get(prefix)?;
        self.facts(&QName::new(namespace, local)).first()
    }

    /// First fact with the given local name in any namespace, namespaces
    /// compared in order.
    pub fn find_local(&self, local: &str) -> Option<&Fact> {
        self.facts
            .iter()
            .filter(|(name, facts)| name.local == local && !facts.is_empty())
            .min_by(|(a, _), (b, _)| a.namespace.cmp(&b.namespace))
            .and_then(|(_, facts)| facts.first())
    }

    /// Latest instant or duration end among all contexts.
    pub fn latest_period_end(&self) -> Option<NaiveDate> {
        self.contexts.values().filter_map(|c| c.period.end()).max()
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Numeric-looking text folded to ASCII (full-width digits, signs and
/// parentheses). Anything else is kept verbatim.
fn normalize_numeric(text: &str) -> String {
    let folded: String = text.nfkc().collect();
    let trimmed = folded.trim();
    let numeric = !trimmed.is_empty()
        && trimmed.chars().any(|c| c.is_ascii_digit())
        && trimmed
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ',' | '.' | '-' | '+' | '(' | ')' | ' ' | '△' | '▲'));
    if numeric {
        trimmed.to_string()
    } else {
        text.to_string()
    }
}

fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    let date = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(date, "%Y-%m-%d").map_err(|e| Error::Parse(format!("invalid date {text:?}: {e}")))
}

fn parse_context(node: &XmlNode) -> Result<Context> {
    let id = node
        .attribute(None, "id")
        .ok_or_else(|| Error::Parse("context without id".to_string()))?
        .to_string();

    let period = node
        .find(ns::XBRLI, "period")
        .ok_or_else(|| Error::Parse(format!("context {id} has no period")))?;
    let period = if let Some(instant) = period.find(ns::XBRLI, "instant") {
        Period::Instant {
            date: parse_date(&instant.text)?,
        }
    } else if let (Some(start), Some(end)) = (
        period.find(ns::XBRLI, "startDate"),
        period.find(ns::XBRLI, "endDate"),
    ) {
        Period::Duration {
            start: parse_date(&start.text)?,
            end: parse_date(&end.text)?,
        }
    } else {
        Period::Forever
    };

    let mut members = Vec::new();
    node.find_all(ns::XBRLDI, "explicitMember", &mut members);
    let members = members
        .into_iter()
        .map(|member| DimensionMember {
            dimension: member.attribute(None, "dimension").unwrap_or_default().to_string(),
            member: member.text.trim().to_string(),
        })
        .collect();

    Ok(Context { id, period, members })
}

fn unit_measure(node: &XmlNode) -> String {
    let measure = |node: &XmlNode| {
        node.find(ns::XBRLI, "measure")
            .map(|m| m.text.trim().to_string())
            .unwrap_or_default()
    };
    match node.find(ns::XBRLI, "divide") {
        Some(divide) => {
            let numerator = divide.find(ns::XBRLI, "unitNumerator").map(measure).unwrap_or_default();
            let denominator = divide.find(ns::XBRLI, "unitDenominator").map(measure).unwrap_or_default();
            format!("{numerator}/{denominator}")
        }
        None => measure(node),
    }
}

// ============================================================================
// Owned element subtrees
// ============================================================================

#[derive(Debug, Default)]
struct XmlNode {
    namespace: String,
    local: String,
    prefix: String,
    attributes: Vec<(String, String, String)>,
    text: String,
    children: Vec<XmlNode>,
}

impl XmlNode {
    fn attribute(&self, namespace: Option<&str>, local: &str) -> Option<&str> {
        let namespace = namespace.unwrap_or_default();
        self.attributes
            .iter()
            .find(|(ns, name, _)| ns == namespace && name == local)
            .map(|(_, _, value)| value.as_str())
    }

    /// First descendant with the given name, depth first.
    fn find(&self, namespace: &str, local: &str) -> Option<&XmlNode> {
        self.children.iter().find_map(|child| {
            if child.namespace == namespace && child.local == local {
                Some(child)
            } else {
                child.find(namespace, local)
            }
        })
    }

    fn find_all<'a>(&'a self, namespace: &str, local: &str, out: &mut Vec<&'a XmlNode>) {
        for child in &self.children {
            if child.namespace == namespace && child.local == local {
                out.push(child);
            }
            child.find_all(namespace, local, out);
        }
    }

    fn full_text(&self) -> String {
        let mut text = self.text.clone();
        for child in &self.children {
            text.push_str(&child.full_text());
        }
        text
    }
}

fn namespace_of(resolved: ResolveResult) -> String {
    match resolved {
        ResolveResult::Bound(Namespace(uri)) => String::from_utf8_lossy(uri).into_owned(),
        _ => String::new(),
    }
}

fn read_element(reader: &mut NsReader<&[u8]>, start: &BytesStart, namespace: String, empty: bool) -> Result<XmlNode> {
    let name = start.name();
    let mut node = XmlNode {
        namespace,
        local: String::from_utf8_lossy(name.local_name().as_ref()).into_owned(),
        prefix: name
            .prefix()
            .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned())
            .unwrap_or_default(),
        ..Default::default()
    };

    // Bindings of an empty element are only in scope until the next read.
    for attr in start.attributes().flatten() {
        let (resolved, local) = reader.resolve_attribute(attr.key);
        let attr_namespace = namespace_of(resolved);
        let local = String::from_utf8_lossy(local.as_ref()).into_owned();
        let value = attr.unescape_value()?.into_owned();
        node.attributes.push((attr_namespace, local, value));
    }

    if empty {
        return Ok(node);
    }

    loop {
        let (resolved, event) = reader.read_resolved_event()?;
        let child_namespace = namespace_of(resolved);
        match event {
            Event::Start(e) => node.children.push(read_element(reader, &e, child_namespace, false)?),
            Event::Empty(e) => node.children.push(read_element(reader, &e, child_namespace, true)?),
            Event::Text(e) => node.text.push_str(&e.unescape()?),
            Event::CData(e) => node.text.push_str(&String::from_utf8_lossy(&e.into_inner())),
            Event::End(_) => return Ok(node),
            Event::Eof => {
                return Err(Error::Parse(format!(
                    "unexpected end of document inside <{}>",
                    node.local
                )))
            }
            _ => {}
        }
    }
}
