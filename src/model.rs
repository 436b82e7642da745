use chrono::NaiveDate;
use compact_str::CompactString;
use serde::Serialize;
use std::fmt;

// ============================================================================
// Namespaces
// ============================================================================

pub mod ns {
    pub const XBRLI: &str = "http://www.xbrl.org/2003/instance";
    pub const LINK: &str = "http://www.xbrl.org/2003/linkbase";
    pub const XLINK: &str = "http://www.w3.org/1999/xlink";
    pub const XBRLDI: &str = "http://xbrl.org/2006/xbrldi";
    pub const XSI: &str = "http://www.w3.org/2001/XMLSchema-instance";
    pub const XML: &str = "http://www.w3.org/XML/1998/namespace";
    pub const XSD: &str = "http://www.w3.org/2001/XMLSchema";

    /// Namespaces whose elements are document structure, never facts.
    pub const STRUCTURAL: &[&str] = &[XBRLI, LINK, XLINK, XBRLDI, XSI];

    pub const ROLE_LABEL: &str = "http://www.xbrl.org/2003/role/label";
    pub const ROLE_VERBOSE_LABEL: &str = "http://www.xbrl.org/2003/role/verboseLabel";
    pub const ARCROLE_PARENT_CHILD: &str = "http://www.xbrl.org/2003/arcrole/parent-child";
    pub const ARCROLE_SUMMATION_ITEM: &str = "http://www.xbrl.org/2003/arcrole/summation-item";
}

// ============================================================================
// Concepts
// ============================================================================

/// Namespace-qualified concept name. Prefixes are document-local, so identity
/// is the namespace URI plus the local name.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct QName {
    pub namespace: CompactString,
    pub local: CompactString,
}

impl QName {
    pub fn new(namespace: &str, local: &str) -> Self {
        Self {
            namespace: CompactString::new(namespace),
            local: CompactString::new(local),
        }
    }
}

impl fmt::Display for QName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{}}}{}", self.namespace, self.local)
    }
}

pub type SchemaId = usize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum DataType {
    Monetary,
    TextBlock,
    Percent,
    PerShare,
    Boolean,
    Date,
    Decimal,
    NonNegativeInteger,
    Shares,
    String,
    Domain,
    Other(CompactString),
}

impl DataType {
    /// Maps an `xbrli:*ItemType` (or filer-defined) type reference.
    pub fn from_type_ref(type_ref: &str) -> Self {
        let local = type_ref.rsplit(':').next().unwrap_or(type_ref);
        match local {
            "monetaryItemType" => DataType::Monetary,
            "textBlockItemType" => DataType::TextBlock,
            "percentItemType" => DataType::Percent,
            "perShareItemType" => DataType::PerShare,
            "booleanItemType" => DataType::Boolean,
            "dateItemType" => DataType::Date,
            "decimalItemType" => DataType::Decimal,
            "nonNegativeIntegerItemType" => DataType::NonNegativeInteger,
            "sharesItemType" => DataType::Shares,
            "stringItemType" => DataType::String,
            "domainItemType" => DataType::Domain,
            other => DataType::Other(CompactString::new(other)),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            DataType::Monetary => "monetary",
            DataType::TextBlock => "textBlock",
            DataType::Percent => "percent",
            DataType::PerShare => "perShare",
            DataType::Boolean => "boolean",
            DataType::Date => "date",
            DataType::Decimal => "decimal",
            DataType::NonNegativeInteger => "nonNegativeInteger",
            DataType::Shares => "shares",
            DataType::String => "string",
            DataType::Domain => "domain",
            DataType::Other(name) => name.as_str(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodType {
    Instant,
    Duration,
}

impl PeriodType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "instant" => Some(PeriodType::Instant),
            "duration" => Some(PeriodType::Duration),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            PeriodType::Instant => "instant",
            PeriodType::Duration => "duration",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Balance {
    Debit,
    Credit,
}

impl Balance {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "debit" => Some(Balance::Debit),
            "credit" => Some(Balance::Credit),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Balance::Debit => "debit",
            Balance::Credit => "credit",
        }
    }
}

/// A taxonomy concept. Owned by the `SchemaRegistry`; networks refer to it
/// by `SchemaId`.
#[derive(Debug, Clone)]
pub struct ElementSchema {
    pub qname: QName,
    pub prefix: CompactString,
    /// Absolute locator href, `schemaUri#id`.
    pub reference: String,
    pub label: Option<String>,
    pub verbose_label: Option<String>,
    pub data_type: Option<DataType>,
    pub period_type: Option<PeriodType>,
    pub balance: Option<Balance>,
    pub abstract_element: bool,
}

impl ElementSchema {
    /// Placeholder for a concept whose schema document is not available.
    pub fn stub(reference: &str, name: &str) -> Self {
        Self {
            qname: QName::new("", name),
            prefix: CompactString::new(""),
            reference: reference.to_string(),
            label: None,
            verbose_label: None,
            data_type: None,
            period_type: None,
            balance: None,
            abstract_element: false,
        }
    }

    pub fn qualified_name(&self) -> String {
        if self.prefix.is_empty() {
            self.qname.local.to_string()
        } else {
            format!("{}:{}", self.prefix, self.qname.local)
        }
    }

    /// Standard label, falling back to the local name.
    pub fn display_label(&self) -> &str {
        self.label.as_deref().unwrap_or(self.qname.local.as_str())
    }
}

/// An extended-link role declared through a `link:roleRef`.
#[derive(Debug, Clone, Serialize)]
pub struct RoleSchema {
    pub name: String,
    pub uri: String,
    /// Href of the declaring `link:roleType`, `schemaUri#id`.
    pub href: String,
    pub label: Option<String>,
}

// ============================================================================
// Instance data
// ============================================================================

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Period {
    Instant { date: NaiveDate },
    Duration { start: NaiveDate, end: NaiveDate },
    Forever,
}

impl Period {
    /// Instant date or duration end.
    pub fn end(&self) -> Option<NaiveDate> {
        match self {
            Period::Instant { date } => Some(*date),
            Period::Duration { end, .. } => Some(*end),
            Period::Forever => None,
        }
    }

    pub fn start(&self) -> Option<NaiveDate> {
        match self {
            Period::Duration { start, .. } => Some(*start),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DimensionMember {
    pub dimension: String,
    pub member: String,
}

#[derive(Debug, Clone)]
pub struct Context {
    pub id: String,
    pub period: Period,
    pub members: Vec<DimensionMember>,
}

/// One reported value. Created once by the `FactStore` and never mutated.
#[derive(Debug, Clone)]
pub struct Fact {
    pub name: QName,
    pub prefix: CompactString,
    pub id: Option<String>,
    /// Text content; numeric-looking values are already folded to ASCII.
    pub value: String,
    pub unit_ref: Option<String>,
    pub decimals: Option<String>,
    pub context_ref: String,
    pub nil: bool,
}

const NON_CONSOLIDATED_MEMBER: &str = "NonConsolidatedMember";

impl Fact {
    pub fn qualified_name(&self) -> String {
        format!("{}:{}", self.prefix, self.name.local)
    }

    /// Context id without the member suffix: `CurrentYearDuration_XMember`
    /// yields `CurrentYearDuration`.
    pub fn context_id(&self) -> &str {
        match self.context_ref.split_once('_') {
            Some((context, _)) => context,
            None => &self.context_ref,
        }
    }

    pub fn member(&self) -> Option<&str> {
        self.context_ref
            .split_once('_')
            .map(|(_, member)| member)
            .filter(|member| !member.is_empty())
    }

    pub fn is_consolidated(&self) -> bool {
        !self.context_ref.contains(NON_CONSOLIDATED_MEMBER)
    }
}
