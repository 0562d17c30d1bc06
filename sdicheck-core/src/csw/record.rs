use std::fmt::{Display, Formatter};

use roxmltree::{Document, Node};
use serde::Serialize;

use crate::csw::filter::{IDENTIFIER_PROPERTY, PropertySource, TYPE_PROPERTY};
use crate::csw::{CswError, CswResult};

pub const GMD_NS: &str = "http://www.isotc211.org/2005/gmd";
pub const GCO_NS: &str = "http://www.isotc211.org/2005/gco";
pub const GMX_NS: &str = "http://www.isotc211.org/2005/gmx";
pub const SRV_NS: &str = "http://www.isotc211.org/2005/srv";
pub const XLINK_NS: &str = "http://www.w3.org/1999/xlink";

/// The kind of resource a catalog record describes.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RecordKind {
    Dataset,
    Service,
}

impl RecordKind {
    /// Maps a `MD_ScopeCode` value to a record kind. Every scope other than `service`
    /// describes data.
    #[must_use]
    pub fn from_scope_code(code: &str) -> Self {
        if code.trim().eq_ignore_ascii_case("service") {
            Self::Service
        } else {
            Self::Dataset
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Dataset => "dataset",
            Self::Service => "service",
        }
    }
}

impl Display for RecordKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// An online resource of a dataset record pointing at a service.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct ServiceReference {
    /// Free-form protocol tag, e.g. `OGC:WMS-1.3.0-http-get-map`.
    pub protocol: String,
    pub url: String,
    /// Layer or feature type name.
    pub name: Option<String>,
}

/// A backlink from a service record to a dataset it serves.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperatesOn {
    pub uuidref: String,
    pub href: Option<String>,
}

/// Connect point of the `GetCapabilities` operation of a service record.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct GetCapabilitiesEndpoint {
    pub url: String,
    pub protocol: Option<String>,
}

/// Binding of one service operation to one layer of one dataset.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct CoupledResource {
    pub operation_name: Option<String>,
    pub identifier: Option<String>,
    pub layer_name: Option<String>,
}

/// An ISO 19139 record returned by the catalog.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct CatalogRecord {
    pub identifier: String,
    pub title: Option<String>,
    pub kind: RecordKind,
    pub service_references: Vec<ServiceReference>,
    pub operates_on: Vec<OperatesOn>,
    pub get_capabilities: Option<GetCapabilitiesEndpoint>,
    pub coupled_resources: Vec<CoupledResource>,
}

fn is(node: Node<'_, '_>, ns: &str, name: &str) -> bool {
    node.is_element() && node.has_tag_name((ns, name))
}

fn children<'a, 'i>(
    node: Node<'a, 'i>,
    ns: &'static str,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'i>> {
    node.children().filter(move |n| is(*n, ns, name))
}

fn child<'a, 'i>(node: Node<'a, 'i>, ns: &'static str, name: &'static str) -> Option<Node<'a, 'i>> {
    children(node, ns, name).next()
}

fn descendants<'a, 'i>(
    node: Node<'a, 'i>,
    ns: &'static str,
    name: &'static str,
) -> impl Iterator<Item = Node<'a, 'i>> {
    node.descendants().filter(move |n| is(*n, ns, name))
}

fn trimmed(text: Option<&str>) -> Option<String> {
    text.map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

/// Text of a `gco:CharacterString` (or `gmx:Anchor`) property.
fn character_string(property: Node<'_, '_>) -> Option<String> {
    property
        .children()
        .find(|n| is(*n, GCO_NS, "CharacterString") || is(*n, GMX_NS, "Anchor"))
        .and_then(|n| trimmed(n.text()))
}

fn linkage(online_resource: Node<'_, '_>) -> Option<String> {
    child(online_resource, GMD_NS, "linkage")
        .and_then(|l| child(l, GMD_NS, "URL"))
        .and_then(|u| trimmed(u.text()))
}

fn online_protocol(online_resource: Node<'_, '_>) -> Option<String> {
    child(online_resource, GMD_NS, "protocol").and_then(character_string)
}

impl CatalogRecord {
    /// Parses a standalone `gmd:MD_Metadata` document.
    pub fn parse(xml: &str) -> CswResult<Self> {
        let doc = Document::parse(xml)?;
        Self::from_node(doc.root_element())
    }

    /// Builds a record from a `gmd:MD_Metadata` element.
    ///
    /// A record without a `fileIdentifier` is malformed.
    pub fn from_node(node: Node<'_, '_>) -> CswResult<Self> {
        if !is(node, GMD_NS, "MD_Metadata") {
            return Err(CswError::Malformed(format!(
                "expected gmd:MD_Metadata, found {}",
                node.tag_name().name()
            )));
        }
        let identifier = child(node, GMD_NS, "fileIdentifier")
            .and_then(character_string)
            .ok_or_else(|| CswError::Malformed("record has no fileIdentifier".to_string()))?;

        let kind = child(node, GMD_NS, "hierarchyLevel")
            .and_then(|h| child(h, GMD_NS, "MD_ScopeCode"))
            .and_then(|code| {
                code.attribute("codeListValue")
                    .map(ToString::to_string)
                    .or_else(|| trimmed(code.text()))
            })
            .map_or(RecordKind::Dataset, |code| RecordKind::from_scope_code(&code));

        let identification = child(node, GMD_NS, "identificationInfo")
            .and_then(|info| info.children().find(Node::is_element));

        let title = identification
            .and_then(|id| child(id, GMD_NS, "citation"))
            .and_then(|c| child(c, GMD_NS, "CI_Citation"))
            .and_then(|c| child(c, GMD_NS, "title"))
            .and_then(character_string);

        let service_references = child(node, GMD_NS, "distributionInfo")
            .into_iter()
            .flat_map(|d| descendants(d, GMD_NS, "CI_OnlineResource"))
            .filter_map(|resource| {
                Some(ServiceReference {
                    protocol: online_protocol(resource)?,
                    url: linkage(resource)?,
                    name: child(resource, GMD_NS, "name").and_then(character_string),
                })
            })
            .collect();

        let service = identification.filter(|id| is(*id, SRV_NS, "SV_ServiceIdentification"));

        let operates_on = service
            .into_iter()
            .flat_map(|s| children(s, SRV_NS, "operatesOn"))
            .filter_map(|op| {
                Some(OperatesOn {
                    uuidref: trimmed(op.attribute("uuidref"))?,
                    href: trimmed(op.attribute((XLINK_NS, "href"))),
                })
            })
            .collect();

        let get_capabilities = service
            .into_iter()
            .flat_map(|s| descendants(s, SRV_NS, "SV_OperationMetadata"))
            .find(|op| {
                child(*op, SRV_NS, "operationName")
                    .and_then(character_string)
                    .is_some_and(|name| name.eq_ignore_ascii_case("GetCapabilities"))
            })
            .and_then(|op| child(op, SRV_NS, "connectPoint"))
            .and_then(|cp| child(cp, GMD_NS, "CI_OnlineResource"))
            .and_then(|resource| {
                Some(GetCapabilitiesEndpoint {
                    url: linkage(resource)?,
                    protocol: online_protocol(resource),
                })
            });

        let coupled_resources = service
            .into_iter()
            .flat_map(|s| descendants(s, SRV_NS, "SV_CoupledResource"))
            .map(|cr| CoupledResource {
                operation_name: child(cr, SRV_NS, "operationName").and_then(character_string),
                identifier: child(cr, SRV_NS, "identifier").and_then(character_string),
                layer_name: child(cr, GCO_NS, "ScopedName").and_then(|n| trimmed(n.text())),
            })
            .collect();

        Ok(Self {
            identifier,
            title,
            kind,
            service_references,
            operates_on,
            get_capabilities,
            coupled_resources,
        })
    }

    /// Reads only the identifier of a `gmd:MD_Metadata` element, tolerating anything
    /// else being broken.
    #[must_use]
    pub fn identifier_of(node: Node<'_, '_>) -> Option<String> {
        child(node, GMD_NS, "fileIdentifier").and_then(character_string)
    }
}

impl PropertySource for CatalogRecord {
    fn property(&self, name: &str) -> Option<&str> {
        match name {
            TYPE_PROPERTY => Some(self.kind.as_str()),
            IDENTIFIER_PROPERTY | "Identifier" => Some(&self.identifier),
            "Title" => self.title.as_deref(),
            _ => None,
        }
    }
}
