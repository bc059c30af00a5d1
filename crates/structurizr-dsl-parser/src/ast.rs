//! Abstract syntax tree produced by the parser.
//!
//! Three trees share the root: model elements (people, software systems and
//! their nested containers/components, deployment environments), top-level
//! relationships, and views. Cross-references between them (`parentId`,
//! `sourceId`, `destinationId`) are plain strings — resolving those to
//! actual element references is the downstream workspace builder's job, not
//! this crate's (see the non-goals in the crate's top-level docs).
//!
//! Every non-root node carries a [`SourcePosition`]; nodes synthesized
//! during panic-mode recovery carry [`SourcePosition::SYNTHETIC`].

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use structurizr_dsl_core::SourcePosition;

/// String-keyed property bag. Insertion order is preserved for readability
/// of pretty-printed output, though no operation in this crate depends on
/// the order being meaningful.
pub type Properties = IndexMap<String, String>;

/// `!identifiers flat|hierarchical` directive, recorded on the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum IdentifierScheme {
    Flat,
    Hierarchical,
}

impl Default for IdentifierScheme {
    fn default() -> Self {
        IdentifierScheme::Flat
    }
}

/// A non-include pragma directive recognised at the top level or inside `model`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Directive {
    Identifiers(IdentifierScheme),
}

// ============================================================================
// Root
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WorkspaceNode {
    pub name: String,
    pub description: Option<String>,
    pub model: Option<ModelNode>,
    pub views: Option<ViewsNode>,
    pub styles: Option<StylesNode>,
    pub themes: Vec<String>,
    pub branding: Option<BrandingNode>,
    pub terminology: Option<TerminologyNode>,
    pub properties: Option<Properties>,
    pub configuration: Properties,
    pub documentation: Option<String>,
    pub decisions: Vec<DecisionNode>,
    pub directives: Vec<Directive>,
    /// `!include` file directives encountered anywhere in the top-level
    /// token stream, in encounter order. Expanded in place by the include
    /// resolver; left as-is (with `resolved: false`) when no `FileLoader`
    /// was configured.
    pub includes: Vec<FileIncludeNode>,
    pub source_position: SourcePosition,
}

impl WorkspaceNode {
    pub fn empty(name: impl Into<String>, source_position: SourcePosition) -> Self {
        Self {
            name: name.into(),
            description: None,
            model: None,
            views: None,
            styles: None,
            themes: Vec::new(),
            branding: None,
            terminology: None,
            properties: None,
            configuration: Properties::new(),
            documentation: None,
            decisions: Vec::new(),
            directives: Vec::new(),
            includes: Vec::new(),
            source_position,
        }
    }
}

// ============================================================================
// Model
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ModelNode {
    pub people: Vec<PersonNode>,
    pub software_systems: Vec<SoftwareSystemNode>,
    pub deployment_environments: Vec<DeploymentEnvironmentNode>,
    pub groups: Vec<GroupNode>,
    /// The `enterprise { ... }` boundary, if the workspace declared one.
    /// Structurally identical to a [`GroupNode`] (people, software systems,
    /// nested groups, relationships) but unnamed and at most one per model.
    pub enterprise: Option<GroupNode>,
    pub relationships: Vec<RelationshipNode>,
    pub identifier_scheme: IdentifierScheme,
}

/// Sum type over the model-element families named in the specification.
/// Downstream code should dispatch on this tag rather than down-casting,
/// replacing the inheritance hierarchy of the original Structurizr tooling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum ModelElement {
    Person(PersonNode),
    SoftwareSystem(SoftwareSystemNode),
    Container(ContainerNode),
    Component(ComponentNode),
    DeploymentEnvironment(DeploymentEnvironmentNode),
    DeploymentNode(DeploymentNodeNode),
    InfrastructureNode(InfrastructureNodeNode),
    ContainerInstance(ContainerInstanceNode),
}

impl ModelElement {
    pub fn id(&self) -> &str {
        match self {
            ModelElement::Person(n) => &n.id,
            ModelElement::SoftwareSystem(n) => &n.id,
            ModelElement::Container(n) => &n.id,
            ModelElement::Component(n) => &n.id,
            ModelElement::DeploymentEnvironment(n) => &n.id,
            ModelElement::DeploymentNode(n) => &n.id,
            ModelElement::InfrastructureNode(n) => &n.id,
            ModelElement::ContainerInstance(n) => &n.id,
        }
    }

    pub fn source_position(&self) -> SourcePosition {
        match self {
            ModelElement::Person(n) => n.source_position,
            ModelElement::SoftwareSystem(n) => n.source_position,
            ModelElement::Container(n) => n.source_position,
            ModelElement::Component(n) => n.source_position,
            ModelElement::DeploymentEnvironment(n) => n.source_position,
            ModelElement::DeploymentNode(n) => n.source_position,
            ModelElement::InfrastructureNode(n) => n.source_position,
            ModelElement::ContainerInstance(n) => n.source_position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PersonNode {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub properties: Properties,
    pub url: Option<String>,
    pub relationships: Vec<RelationshipNode>,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SoftwareSystemNode {
    pub id: String,
    pub name: String,
    pub description: Option<String>,
    pub tags: Vec<String>,
    pub properties: Properties,
    pub url: Option<String>,
    pub relationships: Vec<RelationshipNode>,
    pub containers: Vec<ContainerNode>,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerNode {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub description: Option<String>,
    pub technology: Option<String>,
    pub tags: Vec<String>,
    pub properties: Properties,
    pub url: Option<String>,
    pub relationships: Vec<RelationshipNode>,
    pub components: Vec<ComponentNode>,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentNode {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub description: Option<String>,
    pub technology: Option<String>,
    pub tags: Vec<String>,
    pub properties: Properties,
    pub url: Option<String>,
    pub relationships: Vec<RelationshipNode>,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentEnvironmentNode {
    pub id: String,
    pub name: String,
    pub deployment_nodes: Vec<DeploymentNodeNode>,
    pub properties: Properties,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentNodeNode {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub description: Option<String>,
    pub technology: Option<String>,
    pub tags: Vec<String>,
    pub properties: Properties,
    pub relationships: Vec<RelationshipNode>,
    pub deployment_nodes: Vec<DeploymentNodeNode>,
    pub infrastructure_nodes: Vec<InfrastructureNodeNode>,
    pub container_instances: Vec<ContainerInstanceNode>,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct InfrastructureNodeNode {
    pub id: String,
    pub parent_id: String,
    pub name: String,
    pub description: Option<String>,
    pub technology: Option<String>,
    pub tags: Vec<String>,
    pub properties: Properties,
    pub relationships: Vec<RelationshipNode>,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerInstanceNode {
    pub id: String,
    pub parent_id: String,
    pub container_id: String,
    pub tags: Vec<String>,
    pub properties: Properties,
    pub relationships: Vec<RelationshipNode>,
    pub source_position: SourcePosition,
}

/// A `group { ... }` block. Groups may nest arbitrarily and may contain
/// people, software systems, nested groups, and relationships.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct GroupNode {
    pub name: String,
    pub people: Vec<PersonNode>,
    pub software_systems: Vec<SoftwareSystemNode>,
    pub groups: Vec<GroupNode>,
    pub relationships: Vec<RelationshipNode>,
    pub source_position: SourcePosition,
}

// ============================================================================
// Relationships
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipNode {
    pub source_id: String,
    pub destination_id: String,
    pub description: Option<String>,
    pub technology: Option<String>,
    pub tags: Vec<String>,
    pub properties: Properties,
    pub source_position: SourcePosition,
}

impl RelationshipNode {
    /// Returns a copy with `source_id` replaced, all other fields unchanged.
    pub fn set_source(&self, new_id: impl Into<String>) -> Self {
        Self {
            source_id: new_id.into(),
            ..self.clone()
        }
    }

    /// Returns a copy with `destination_id` replaced, all other fields unchanged.
    pub fn set_destination(&self, new_id: impl Into<String>) -> Self {
        Self {
            destination_id: new_id.into(),
            ..self.clone()
        }
    }
}

// ============================================================================
// Views
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct ViewsNode {
    pub system_landscape_views: Vec<SystemLandscapeViewNode>,
    pub system_context_views: Vec<SystemContextViewNode>,
    pub container_views: Vec<ContainerViewNode>,
    pub component_views: Vec<ComponentViewNode>,
    pub dynamic_views: Vec<DynamicViewNode>,
    pub deployment_views: Vec<DeploymentViewNode>,
    pub filtered_views: Vec<FilteredViewNode>,
    pub custom_views: Vec<CustomViewNode>,
    pub image_views: Vec<ImageViewNode>,
    pub configuration: Properties,
}

/// Fields shared by every view kind. Composed into each concrete view node
/// rather than modeled as a base type, since Rust has no inheritance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ViewCommon {
    pub key: String,
    pub title: Option<String>,
    pub description: Option<String>,
    pub includes: Vec<IncludeNode>,
    pub excludes: Vec<ExcludeNode>,
    pub auto_layout: Option<AutoLayout>,
    pub animations: Vec<AnimationStep>,
    pub properties: Properties,
    pub source_position: SourcePosition,
}

impl ViewCommon {
    pub fn new(key: impl Into<String>, source_position: SourcePosition) -> Self {
        Self {
            key: key.into(),
            title: None,
            description: None,
            includes: Vec::new(),
            excludes: Vec::new(),
            auto_layout: None,
            animations: Vec::new(),
            properties: Properties::new(),
            source_position,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncludeNode {
    pub expression: String,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExcludeNode {
    pub expression: String,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutoLayout {
    pub direction: Option<String>,
    pub rank_separation: Option<i64>,
    pub node_separation: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnimationStep {
    pub order: u32,
    pub identifiers: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemLandscapeViewNode {
    pub common: ViewCommon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemContextViewNode {
    pub common: ViewCommon,
    pub system_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContainerViewNode {
    pub common: ViewCommon,
    pub system_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentViewNode {
    pub common: ViewCommon,
    pub container_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicViewNode {
    pub common: ViewCommon,
    pub scope_id: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DeploymentViewNode {
    pub common: ViewCommon,
    pub system_id: String,
    pub environment: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilteredViewNode {
    pub common: ViewCommon,
    pub base_view_key: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomViewNode {
    pub common: ViewCommon,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageViewNode {
    pub common: ViewCommon,
    pub image: Option<String>,
}

// ============================================================================
// Passthrough top-level blocks
// ============================================================================
//
// The specification names these on `WorkspaceNode` but leaves their inner
// grammar to the upstream DSL reference (§9, open questions); we capture
// them as property bags and small lists rather than inventing a detailed
// schema the spec never asks for.

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct StylesNode {
    pub elements: Vec<ElementStyleNode>,
    pub relationships: Vec<RelationshipStyleNode>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ElementStyleNode {
    pub tag: String,
    pub properties: Properties,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RelationshipStyleNode {
    pub tag: String,
    pub properties: Properties,
    pub source_position: SourcePosition,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct BrandingNode {
    pub logo: Option<String>,
    pub font: Option<String>,
    pub properties: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
pub struct TerminologyNode {
    pub terms: Properties,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DecisionNode {
    pub id: String,
    pub title: Option<String>,
    pub content: Option<String>,
    pub source_position: SourcePosition,
}

// ============================================================================
// Include directives
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileIncludeNode {
    pub path: String,
    pub source_position: SourcePosition,
    /// Set once the include resolver has expanded this directive.
    pub resolved: bool,
}

impl FileIncludeNode {
    pub fn new(path: impl Into<String>, source_position: SourcePosition) -> Self {
        Self {
            path: path.into(),
            source_position,
            resolved: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos() -> SourcePosition {
        SourcePosition::new(1, 1, 0)
    }

    #[test]
    fn set_source_preserves_other_fields() {
        let mut properties = Properties::new();
        properties.insert("k".into(), "v".into());
        let rel = RelationshipNode {
            source_id: "a".into(),
            destination_id: "b".into(),
            description: Some("reads".into()),
            technology: Some("HTTP".into()),
            tags: vec!["sync".into()],
            properties,
            source_position: pos(),
        };

        let updated = rel.set_source("c");
        assert_eq!(updated.source_id, "c");
        assert_eq!(updated.destination_id, rel.destination_id);
        assert_eq!(updated.description, rel.description);
        assert_eq!(updated.technology, rel.technology);
        assert_eq!(updated.tags, rel.tags);
        assert_eq!(updated.properties, rel.properties);
        assert_eq!(updated.source_position, rel.source_position);
    }

    #[test]
    fn set_destination_preserves_other_fields() {
        let rel = RelationshipNode {
            source_id: "a".into(),
            destination_id: "b".into(),
            description: None,
            technology: None,
            tags: Vec::new(),
            properties: Properties::new(),
            source_position: pos(),
        };

        let updated = rel.set_destination("z");
        assert_eq!(updated.destination_id, "z");
        assert_eq!(updated.source_id, rel.source_id);
    }

    #[test]
    fn model_element_id_dispatch() {
        let person = ModelElement::Person(PersonNode {
            id: "user".into(),
            name: "User".into(),
            description: None,
            tags: Vec::new(),
            properties: Properties::new(),
            url: None,
            relationships: Vec::new(),
            source_position: pos(),
        });
        assert_eq!(person.id(), "user");
    }

    #[test]
    fn person_node_serializes_with_stable_field_order() {
        let person = PersonNode {
            id: "user".into(),
            name: "User".into(),
            description: Some("A user".into()),
            tags: vec!["external".into()],
            properties: Properties::new(),
            url: None,
            relationships: Vec::new(),
            source_position: SourcePosition::new(2, 5, 12),
        };
        insta::assert_snapshot!(serde_json::to_string_pretty(&person).unwrap(), @r#"
        {
          "id": "user",
          "name": "User",
          "description": "A user",
          "tags": [
            "external"
          ],
          "properties": {},
          "url": null,
          "relationships": [],
          "source_position": {
            "line": 2,
            "column": 5,
            "offset": 12
          }
        }
        "#);
    }
}
