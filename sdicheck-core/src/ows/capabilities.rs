use std::collections::BTreeMap;

use roxmltree::{Document, Node};

use crate::ows::OwsFamily;

pub type CapabilitiesResult<T> = Result<T, CapabilitiesError>;

#[derive(thiserror::Error, Debug)]
pub enum CapabilitiesError {
    #[error("Capabilities document is not well-formed XML: {0}")]
    InvalidXml(#[from] roxmltree::Error),

    #[error("Root element {found} is not a {expected} capabilities document")]
    UnexpectedRoot { found: String, expected: OwsFamily },

    #[error("Capabilities document has no {0} section")]
    MissingSection(&'static str),

    #[error("Capabilities document declares a {0} with an empty name")]
    EmptyName(&'static str),
}

/// A `MetadataURL` advertised for a layer or feature type.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MetadataLink {
    pub format: Option<String>,
    pub url: String,
}

/// Layer (or feature type) names advertised by one server for one service family.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CapabilitiesDocument {
    family: OwsFamily,
    layers: BTreeMap<String, Vec<MetadataLink>>,
}

fn child<'a, 'i>(node: Node<'a, 'i>, name: &str) -> Option<Node<'a, 'i>> {
    node.children()
        .find(|n| n.is_element() && n.tag_name().name() == name)
}

fn text_of(node: Node<'_, '_>) -> Option<String> {
    node.text()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(ToString::to_string)
}

fn href_of(node: Node<'_, '_>) -> Option<String> {
    node.attributes()
        .find(|a| a.name() == "href")
        .map(|a| a.value().trim().to_string())
        .filter(|s| !s.is_empty())
}

impl CapabilitiesDocument {
    /// Checks that the root element is a capabilities document for `family`.
    ///
    /// The comparison is done on the lowercased local name, so `WMS_Capabilities`
    /// and `wfs:WFS_Capabilities` both match their family.
    pub fn validate_root(doc: &Document<'_>, family: OwsFamily) -> CapabilitiesResult<()> {
        let root = doc.root_element().tag_name().name();
        if root.to_lowercase().ends_with(family.root_suffix()) {
            Ok(())
        } else {
            Err(CapabilitiesError::UnexpectedRoot {
                found: root.to_string(),
                expected: family,
            })
        }
    }

    /// Parses a capabilities body for `family`, validating the root element first.
    pub fn parse(body: &str, family: OwsFamily) -> CapabilitiesResult<Self> {
        let doc = Document::parse(body)?;
        Self::validate_root(&doc, family)?;
        let layers = match family {
            OwsFamily::Wms => Self::wms_layers(&doc)?,
            OwsFamily::Wfs => Self::wfs_feature_types(&doc)?,
        };
        Ok(Self { family, layers })
    }

    fn wms_layers(doc: &Document<'_>) -> CapabilitiesResult<BTreeMap<String, Vec<MetadataLink>>> {
        let capability = child(doc.root_element(), "Capability")
            .ok_or(CapabilitiesError::MissingSection("Capability"))?;
        let mut layers = BTreeMap::new();
        for layer in capability
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "Layer")
        {
            let Some(name) = child(layer, "Name") else {
                // Unnamed layers are only containers
                continue;
            };
            let name = text_of(name).ok_or(CapabilitiesError::EmptyName("Layer"))?;
            let links = layer
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "MetadataURL")
                .filter_map(|md| {
                    let url = child(md, "OnlineResource").and_then(href_of)?;
                    let format = child(md, "Format").and_then(text_of);
                    Some(MetadataLink { format, url })
                })
                .collect();
            layers.insert(name, links);
        }
        Ok(layers)
    }

    fn wfs_feature_types(
        doc: &Document<'_>,
    ) -> CapabilitiesResult<BTreeMap<String, Vec<MetadataLink>>> {
        let mut layers = BTreeMap::new();
        for feature_type in doc
            .descendants()
            .filter(|n| n.is_element() && n.tag_name().name() == "FeatureType")
        {
            let name = child(feature_type, "Name")
                .and_then(text_of)
                .ok_or(CapabilitiesError::EmptyName("FeatureType"))?;
            let links = feature_type
                .children()
                .filter(|n| n.is_element() && n.tag_name().name() == "MetadataURL")
                .filter_map(|md| {
                    // WFS 2.0 uses xlink:href, WFS 1.x puts the URL in the element text
                    let url = href_of(md).or_else(|| text_of(md))?;
                    let format = md.attribute("format").map(ToString::to_string);
                    Some(MetadataLink { format, url })
                })
                .collect();
            layers.insert(name, links);
        }
        Ok(layers)
    }

    #[must_use]
    pub fn family(&self) -> OwsFamily {
        self.family
    }

    /// Resolves a layer name to the name advertised by the server.
    ///
    /// The exact name is tried first. If absent and the name is workspace-qualified
    /// (`workspace:layer`), the unqualified name is tried, since some servers only
    /// advertise those.
    #[must_use]
    pub fn resolve_layer<'a>(&self, name: &'a str) -> Option<&'a str> {
        if self.layers.contains_key(name) {
            return Some(name);
        }
        name.split_once(':')
            .map(|(_, unqualified)| unqualified)
            .filter(|unqualified| self.layers.contains_key(*unqualified))
    }

    #[must_use]
    pub fn has_layer(&self, name: &str) -> bool {
        self.resolve_layer(name).is_some()
    }

    pub fn layer_names(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    #[must_use]
    pub fn metadata_links(&self, name: &str) -> &[MetadataLink] {
        self.resolve_layer(name)
            .and_then(|name| self.layers.get(name))
            .map(Vec::as_slice)
            .unwrap_or_default()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}
