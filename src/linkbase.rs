// Linkbase processing for XBRL
use crate::loader::{decode, parse_xml};
use crate::model::ns;
use crate::Result;
use ahash::AHashMap;
use log::warn;
use roxmltree::Node;
use url::Url;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LinkKind {
    Presentation,
    Calculation,
    Definition,
}

impl LinkKind {
    fn from_element(name: &str) -> Option<Self> {
        match name {
            "presentationLink" => Some(LinkKind::Presentation),
            "calculationLink" => Some(LinkKind::Calculation),
            "definitionLink" => Some(LinkKind::Definition),
            _ => None,
        }
    }

    fn arc_element(self) -> &'static str {
        match self {
            LinkKind::Presentation => "presentationArc",
            LinkKind::Calculation => "calculationArc",
            LinkKind::Definition => "definitionArc",
        }
    }

    fn expected_arcrole(self) -> Option<&'static str> {
        match self {
            LinkKind::Presentation => Some(ns::ARCROLE_PARENT_CHILD),
            LinkKind::Calculation => Some(ns::ARCROLE_SUMMATION_ITEM),
            LinkKind::Definition => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArcUse {
    Optional,
    Prohibited,
}

/// One arc with its locators already resolved to absolute concept hrefs.
#[derive(Debug, Clone)]
pub struct LinkArc {
    pub from: String,
    pub to: String,
    pub order: f64,
    pub priority: i32,
    pub arc_use: ArcUse,
    pub weight: Option<f64>,
}

impl LinkArc {
    pub fn is_prohibited(&self) -> bool {
        self.arc_use == ArcUse::Prohibited
    }
}

#[derive(Debug, Clone)]
pub struct ExtendedLink {
    pub kind: LinkKind,
    pub role: String,
    pub arcs: Vec<LinkArc>,
}

#[derive(Debug, Clone)]
pub struct RoleRef {
    pub role_uri: String,
    pub href: String,
}

#[derive(Debug, Clone)]
pub struct LabelLink {
    pub concept: String,
    pub label: String,
    pub role: String,
    pub lang: String,
}

#[derive(Debug, Clone)]
pub struct LinkbaseDocument {
    pub uri: Url,
    pub role_refs: Vec<RoleRef>,
    pub links: Vec<ExtendedLink>,
    pub labels: Vec<LabelLink>,
    /// Arcs dropped because their arcrole or locators did not fit the link.
    pub skipped: usize,
}

impl LinkbaseDocument {
    pub fn parse(uri: &Url, data: &[u8]) -> Result<Self> {
        let doc = parse_xml(decode(data)?)?;
        let mut linkbase = LinkbaseDocument {
            uri: uri.clone(),
            role_refs: Vec::new(),
            links: Vec::new(),
            labels: Vec::new(),
            skipped: 0,
        };

        for node in doc.root_element().children().filter(Node::is_element) {
            if node.tag_name().namespace() != Some(ns::LINK) {
                continue;
            }
            match node.tag_name().name() {
                "roleRef" => {
                    let (Some(role_uri), Some(href)) =
                        (node.attribute("roleURI"), node.attribute((ns::XLINK, "href")))
                    else {
                        continue;
                    };
                    linkbase.role_refs.push(RoleRef {
                        role_uri: role_uri.to_string(),
                        href: uri.join(href)?.to_string(),
                    });
                }
                "labelLink" => linkbase.parse_labels(node)?,
                name => {
                    if let Some(kind) = LinkKind::from_element(name) {
                        let link = linkbase.parse_extended_link(node, kind)?;
                        linkbase.links.push(link);
                    }
                }
            }
        }

        Ok(linkbase)
    }

    pub fn links_for<'a>(&'a self, kind: LinkKind, role: &'a str) -> impl Iterator<Item = &'a ExtendedLink> {
        self.links
            .iter()
            .filter(move |link| link.kind == kind && link.role == role)
    }

    fn locators<'a>(&self, link: Node<'a, '_>) -> Result<AHashMap<&'a str, Vec<String>>> {
        let mut locators: AHashMap<&str, Vec<String>> = AHashMap::new();
        for loc in link.children().filter(|n| is_link_element(n, "loc")) {
            let (Some(label), Some(href)) = (
                loc.attribute((ns::XLINK, "label")),
                loc.attribute((ns::XLINK, "href")),
            ) else {
                continue;
            };
            locators
                .entry(label)
                .or_default()
                .push(self.uri.join(href)?.to_string());
        }
        Ok(locators)
    }

    fn parse_extended_link(&mut self, link: Node, kind: LinkKind) -> Result<ExtendedLink> {
        let role = link.attribute((ns::XLINK, "role")).unwrap_or_default();
        let locators = self.locators(link)?;
        let mut arcs = Vec::new();

        for arc in link.children().filter(|n| is_link_element(n, kind.arc_element())) {
            let arcrole = arc.attribute((ns::XLINK, "arcrole")).unwrap_or_default();
            if let Some(expected) = kind.expected_arcrole() {
                if arcrole != expected {
                    warn!(
                        "skipping {} with arcrole {:?} in {} ({})",
                        kind.arc_element(),
                        arcrole,
                        role,
                        self.uri
                    );
                    self.skipped += 1;
                    continue;
                }
            }

            let from = arc
                .attribute((ns::XLINK, "from"))
                .and_then(|label| locators.get(label));
            let to = arc
                .attribute((ns::XLINK, "to"))
                .and_then(|label| locators.get(label));
            let (Some(from), Some(to)) = (from, to) else {
                warn!("skipping {} with unknown locator in {}", kind.arc_element(), self.uri);
                self.skipped += 1;
                continue;
            };

            let order = arc
                .attribute("order")
                .and_then(|v| v.trim().parse::<f64>().ok())
                .unwrap_or(1.0);
            let priority = arc
                .attribute("priority")
                .and_then(|v| v.trim().parse::<i32>().ok())
                .unwrap_or(0);
            let arc_use = match arc.attribute("use") {
                Some("prohibited") => ArcUse::Prohibited,
                _ => ArcUse::Optional,
            };
            let weight = match kind {
                LinkKind::Calculation => Some(
                    arc.attribute("weight")
                        .and_then(|v| v.trim().parse::<f64>().ok())
                        .unwrap_or(1.0),
                ),
                _ => None,
            };

            for from in from {
                for to in to {
                    arcs.push(LinkArc {
                        from: from.clone(),
                        to: to.clone(),
                        order,
                        priority,
                        arc_use,
                        weight,
                    });
                }
            }
        }

        Ok(ExtendedLink {
            kind,
            role: role.to_string(),
            arcs,
        })
    }

    fn parse_labels(&mut self, link: Node) -> Result<()> {
        let locators = self.locators(link)?;

        let mut resources: AHashMap<&str, Vec<(String, String, String)>> = AHashMap::new();
        for label in link.children().filter(|n| is_link_element(n, "label")) {
            let Some(key) = label.attribute((ns::XLINK, "label")) else {
                continue;
            };
            let role = label
                .attribute((ns::XLINK, "role"))
                .unwrap_or(ns::ROLE_LABEL)
                .to_string();
            let lang = label.attribute((ns::XML, "lang")).unwrap_or_default().to_string();
            let text: String = label
                .descendants()
                .filter(|n| n.is_text())
                .filter_map(|n| n.text())
                .collect();
            resources
                .entry(key)
                .or_default()
                .push((role, lang, text.trim().to_string()));
        }

        for arc in link.children().filter(|n| is_link_element(n, "labelArc")) {
            let from = arc
                .attribute((ns::XLINK, "from"))
                .and_then(|label| locators.get(label));
            let to = arc
                .attribute((ns::XLINK, "to"))
                .and_then(|label| resources.get(label));
            let (Some(concepts), Some(labels)) = (from, to) else {
                self.skipped += 1;
                continue;
            };
            for concept in concepts {
                for (role, lang, text) in labels {
                    self.labels.push(LabelLink {
                        concept: concept.clone(),
                        label: text.clone(),
                        role: role.clone(),
                        lang: lang.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn is_link_element(node: &Node, name: &str) -> bool {
    node.is_element()
        && node.tag_name().namespace() == Some(ns::LINK)
        && node.tag_name().name() == name
}
