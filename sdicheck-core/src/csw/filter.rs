use std::collections::HashMap;
use std::fmt::Write as _;

/// Catalog queryable holding the record kind.
pub const TYPE_PROPERTY: &str = "Type";
/// Catalog queryable holding the record identifier.
pub const IDENTIFIER_PROPERTY: &str = "fileIdentifier";
/// GeoNetwork queryable flagging records harvested from another catalog.
pub const HARVESTED_PROPERTY: &str = "_isHarvested";

/// Anything a [`Filter`] can be evaluated against.
pub trait PropertySource {
    fn property(&self, name: &str) -> Option<&str>;
}

impl PropertySource for HashMap<String, String> {
    fn property(&self, name: &str) -> Option<&str> {
        self.get(name).map(String::as_str)
    }
}

/// A constraint of a `GetRecords` request, in the OGC Filter Encoding model.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Filter {
    PropertyIsEqualTo { property: String, literal: String },
    PropertyIsNotEqualTo { property: String, literal: String },
    And(Vec<Filter>),
    Or(Vec<Filter>),
    Not(Box<Filter>),
}

impl Filter {
    pub fn eq(property: impl Into<String>, literal: impl Into<String>) -> Self {
        Self::PropertyIsEqualTo {
            property: property.into(),
            literal: literal.into(),
        }
    }

    pub fn not_eq(property: impl Into<String>, literal: impl Into<String>) -> Self {
        Self::PropertyIsNotEqualTo {
            property: property.into(),
            literal: literal.into(),
        }
    }

    /// Conjunction of `filters`. A single filter is returned as is.
    #[must_use]
    pub fn and(mut filters: Vec<Self>) -> Self {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Self::And(filters)
        }
    }

    /// Disjunction of `filters`. A single filter is returned as is.
    #[must_use]
    pub fn or(mut filters: Vec<Self>) -> Self {
        if filters.len() == 1 {
            filters.remove(0)
        } else {
            Self::Or(filters)
        }
    }

    #[must_use]
    #[allow(clippy::should_implement_trait)]
    pub fn not(self) -> Self {
        Self::Not(Box::new(self))
    }

    fn of_kind(kind: &str, include_harvested: bool) -> Self {
        let kind = Self::eq(TYPE_PROPERTY, kind);
        if include_harvested {
            kind
        } else {
            Self::and(vec![kind, Self::eq(HARVESTED_PROPERTY, "n")])
        }
    }

    /// Dataset records, optionally restricted to the ones authored in this catalog.
    #[must_use]
    pub fn datasets(include_harvested: bool) -> Self {
        Self::of_kind("dataset", include_harvested)
    }

    /// Service records, optionally restricted to the ones authored in this catalog.
    #[must_use]
    pub fn services(include_harvested: bool) -> Self {
        Self::of_kind("service", include_harvested)
    }

    /// `self AND NOT (fileIdentifier = id1 OR fileIdentifier = id2 ...)`.
    #[must_use]
    pub fn excluding<'a>(&self, identifiers: impl IntoIterator<Item = &'a String>) -> Self {
        let excluded: Vec<_> = identifiers
            .into_iter()
            .map(|id| Self::eq(IDENTIFIER_PROPERTY, id.as_str()))
            .collect();
        if excluded.is_empty() {
            self.clone()
        } else {
            Self::And(vec![self.clone(), Self::or(excluded).not()])
        }
    }

    /// Evaluates the filter against a record. Missing properties never match.
    pub fn matches(&self, source: &impl PropertySource) -> bool {
        match self {
            Self::PropertyIsEqualTo { property, literal } => {
                source.property(property) == Some(literal.as_str())
            }
            Self::PropertyIsNotEqualTo { property, literal } => source
                .property(property)
                .is_some_and(|value| value != literal),
            Self::And(filters) => filters.iter().all(|f| f.matches(source)),
            Self::Or(filters) => filters.iter().any(|f| f.matches(source)),
            Self::Not(filter) => !filter.matches(source),
        }
    }

    /// Renders the filter as an `ogc:Filter` element (Filter Encoding 1.1).
    #[must_use]
    pub fn to_xml(&self) -> String {
        let mut xml = String::from(r#"<ogc:Filter xmlns:ogc="http://www.opengis.net/ogc">"#);
        self.write_xml(&mut xml);
        xml.push_str("</ogc:Filter>");
        xml
    }

    fn write_xml(&self, xml: &mut String) {
        match self {
            Self::PropertyIsEqualTo { property, literal } => {
                write_comparison(xml, "PropertyIsEqualTo", property, literal);
            }
            Self::PropertyIsNotEqualTo { property, literal } => {
                write_comparison(xml, "PropertyIsNotEqualTo", property, literal);
            }
            Self::And(filters) => write_logical(xml, "And", filters),
            Self::Or(filters) => write_logical(xml, "Or", filters),
            Self::Not(filter) => {
                xml.push_str("<ogc:Not>");
                filter.write_xml(xml);
                xml.push_str("</ogc:Not>");
            }
        }
    }
}

fn write_comparison(xml: &mut String, operator: &str, property: &str, literal: &str) {
    let _ = write!(
        xml,
        "<ogc:{operator}><ogc:PropertyName>{}</ogc:PropertyName><ogc:Literal>{}</ogc:Literal></ogc:{operator}>",
        escape(property),
        escape(literal),
    );
}

fn write_logical(xml: &mut String, operator: &str, filters: &[Filter]) {
    let _ = write!(xml, "<ogc:{operator}>");
    for filter in filters {
        filter.write_xml(xml);
    }
    let _ = write!(xml, "</ogc:{operator}>");
}

/// Escapes text for use in XML content or attribute values.
#[must_use]
pub fn escape(text: &str) -> String {
    let mut escaped = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            '\'' => escaped.push_str("&apos;"),
            c => escaped.push(c),
        }
    }
    escaped
}
