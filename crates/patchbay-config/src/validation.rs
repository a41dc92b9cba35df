//! Structural validation of graph documents.
//!
//! Validation walks the whole document, nested graphs included, and collects
//! every problem it finds rather than stopping at the first. Nodes inside a
//! sub-graph are reported by their scoped label, `outer/inner`.
//!
//! # Example
//!
//! ```rust
//! use patchbay_config::{ConnectionConfig, GraphDocument, NodeConfig, validate};
//!
//! let doc = GraphDocument::new("broken")
//!     .with_node(NodeConfig::builtin("a", "sine"))
//!     .with_connection(ConnectionConfig::new("a", "missing"));
//!
//! let report = validate(&doc).unwrap_err();
//! assert_eq!(report.issues().len(), 1);
//! ```

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use patchbay_core::{ComponentDescription, FourCc, MAX_PORTS};
use thiserror::Error;

use crate::document::{ConnectionConfig, EngineConfig, GraphDocument, NodeConfig};

/// A single validation problem.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ValidationIssue {
    /// A node has an empty label.
    #[error("node #{0} has an empty label")]
    EmptyLabel(usize),

    /// Two nodes in the same graph share a label.
    #[error("duplicate node label '{0}'")]
    DuplicateLabel(String),

    /// A label contains the scope separator.
    #[error("node label '{0}' must not contain '/'")]
    ReservedCharacter(String),

    /// A four-character code is not four printable ASCII characters.
    #[error("node '{node}': invalid {field} code '{value}'")]
    InvalidCode {
        /// Scoped node label.
        node: String,
        /// Which field, `type`, `subtype` or `manufacturer`.
        field: &'static str,
        /// The offending text.
        value: String,
    },

    /// A `builtin` name is not one of the built-in processors.
    #[error("node '{node}': unknown builtin '{name}'")]
    UnknownBuiltin {
        /// Scoped node label.
        node: String,
        /// The unknown name.
        name: String,
    },

    /// A node names no processor.
    #[error("node '{0}' needs a builtin, a type and subtype, or a subgraph")]
    MissingComponent(String),

    /// A node names more than one processor.
    #[error("node '{0}' must use exactly one of builtin, type/subtype, or subgraph")]
    AmbiguousComponent(String),

    /// A built-in processor was given more values than it has parameters.
    #[error("node '{node}': {builtin} takes at most {max} parameters, got {got}")]
    TooManyParams {
        /// Scoped node label.
        node: String,
        /// Built-in name.
        builtin: &'static str,
        /// Parameters the builtin accepts.
        max: usize,
        /// Parameters supplied.
        got: usize,
    },

    /// A parameter is NaN or infinite.
    #[error("node '{node}': parameter {index} is not finite")]
    NonFiniteParam {
        /// Scoped node label.
        node: String,
        /// Index into `params`.
        index: usize,
    },

    /// A connection names a node that does not exist in its graph.
    #[error("connection {connection}: unknown node '{label}'")]
    UnknownNode {
        /// Connection, rendered as `from:output -> to:input`.
        connection: String,
        /// Scoped label that was not found.
        label: String,
    },

    /// A connection port is out of range.
    #[error("connection {connection}: port {port} must be below {max}")]
    PortOutOfRange {
        /// Connection, rendered as `from:output -> to:input`.
        connection: String,
        /// Offending port.
        port: u32,
        /// Exclusive bound.
        max: u32,
    },

    /// Two connections feed the same input.
    #[error("input {node}:{input} is fed by more than one connection")]
    InputAlreadyConnected {
        /// Scoped destination label.
        node: String,
        /// Destination input.
        input: u32,
    },

    /// A connection feeds a node from itself.
    #[error("connection {0} connects a node to itself")]
    SelfConnection(String),

    /// A graph has more than one output node.
    #[error("graph '{scope}' has more than one output node: {nodes}")]
    MultipleOutputs {
        /// Scope of the graph, empty for the top level.
        scope: String,
        /// Comma-separated labels.
        nodes: String,
    },

    /// An engine setting is out of range.
    #[error("engine.{field}: {reason}")]
    InvalidEngine {
        /// Setting name.
        field: &'static str,
        /// What is wrong with it.
        reason: &'static str,
    },
}

/// Every issue found in a document.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationReport {
    issues: Vec<ValidationIssue>,
}

impl ValidationReport {
    /// Wraps a list of issues.
    pub fn new(issues: Vec<ValidationIssue>) -> Self {
        Self { issues }
    }

    /// The issues, in document order.
    pub fn issues(&self) -> &[ValidationIssue] {
        &self.issues
    }
}

impl fmt::Display for ValidationReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.issues.as_slice() {
            [single] => write!(f, "{single}"),
            issues => {
                write!(f, "{} issues", issues.len())?;
                for issue in issues {
                    write!(f, "; {issue}")?;
                }
                Ok(())
            }
        }
    }
}

impl std::error::Error for ValidationReport {}

/// Validates a document without building it.
///
/// # Errors
///
/// Returns every issue found. A document that validates may still fail to
/// build if a processor rejects its parameters when the graph is opened, or
/// if the connections form a cycle.
pub fn validate(doc: &GraphDocument) -> Result<(), ValidationReport> {
    let mut issues = Vec::new();
    validate_engine(&doc.engine, &mut issues);
    validate_graph("", &doc.nodes, &doc.connections, &mut issues);
    if issues.is_empty() {
        Ok(())
    } else {
        Err(ValidationReport::new(issues))
    }
}

fn validate_engine(engine: &EngineConfig, issues: &mut Vec<ValidationIssue>) {
    if !(engine.sample_rate.is_finite() && engine.sample_rate > 0.0) {
        issues.push(ValidationIssue::InvalidEngine {
            field: "sample_rate",
            reason: "must be a positive number",
        });
    }
    if engine.max_frames == 0 {
        issues.push(ValidationIssue::InvalidEngine {
            field: "max_frames",
            reason: "must be at least 1",
        });
    }
    if engine.failure_queue_capacity == 0 {
        issues.push(ValidationIssue::InvalidEngine {
            field: "failure_queue_capacity",
            reason: "must be at least 1",
        });
    }
}

/// Joins a scope and a label into a scoped label.
pub(crate) fn scoped(scope: &str, label: &str) -> String {
    if scope.is_empty() {
        label.to_string()
    } else {
        format!("{scope}/{label}")
    }
}

fn validate_graph(
    scope: &str,
    nodes: &[NodeConfig],
    connections: &[ConnectionConfig],
    issues: &mut Vec<ValidationIssue>,
) {
    let mut labels = BTreeSet::new();
    let mut outputs = Vec::new();

    for (index, node) in nodes.iter().enumerate() {
        let label = scoped(scope, &node.label);
        if node.label.is_empty() {
            issues.push(ValidationIssue::EmptyLabel(index));
        } else if node.label.contains('/') {
            issues.push(ValidationIssue::ReservedCharacter(label.clone()));
        } else if !labels.insert(node.label.as_str()) {
            issues.push(ValidationIssue::DuplicateLabel(label.clone()));
        }

        if let Some(index) = node.params.iter().position(|p| !p.is_finite()) {
            issues.push(ValidationIssue::NonFiniteParam {
                node: label.clone(),
                index,
            });
        }

        if let Some(description) = validate_node(&label, node, issues) {
            if description.is_output() {
                outputs.push(label.clone());
            }
        }

        if let Some(subgraph) = &node.subgraph {
            validate_graph(&label, &subgraph.nodes, &subgraph.connections, issues);
        }
    }

    if outputs.len() > 1 {
        issues.push(ValidationIssue::MultipleOutputs {
            scope: scope.to_string(),
            nodes: outputs.join(", "),
        });
    }

    let mut fed: BTreeMap<(&str, u32), usize> = BTreeMap::new();
    for connection in connections {
        let rendered = format!(
            "{}:{} -> {}:{}",
            scoped(scope, &connection.from),
            connection.output,
            scoped(scope, &connection.to),
            connection.input
        );
        for label in [&connection.from, &connection.to] {
            if !labels.contains(label.as_str()) {
                issues.push(ValidationIssue::UnknownNode {
                    connection: rendered.clone(),
                    label: scoped(scope, label),
                });
            }
        }
        for port in [connection.output, connection.input] {
            if port >= MAX_PORTS {
                issues.push(ValidationIssue::PortOutOfRange {
                    connection: rendered.clone(),
                    port,
                    max: MAX_PORTS,
                });
            }
        }
        if connection.from == connection.to {
            issues.push(ValidationIssue::SelfConnection(rendered.clone()));
        }
        let count = fed
            .entry((connection.to.as_str(), connection.input))
            .or_default();
        *count += 1;
        if *count == 2 {
            issues.push(ValidationIssue::InputAlreadyConnected {
                node: scoped(scope, &connection.to),
                input: connection.input,
            });
        }
    }
}

/// Checks how a node selects its processor. Returns the description when it
/// names a component.
fn validate_node(
    label: &str,
    node: &NodeConfig,
    issues: &mut Vec<ValidationIssue>,
) -> Option<ComponentDescription> {
    let typed = node.component_type.is_some() || node.subtype.is_some();
    let ways = usize::from(node.builtin.is_some())
        + usize::from(typed)
        + usize::from(node.subgraph.is_some());
    if ways == 0 {
        issues.push(ValidationIssue::MissingComponent(label.to_string()));
        return None;
    }
    if ways > 1 {
        issues.push(ValidationIssue::AmbiguousComponent(label.to_string()));
        return None;
    }

    if let Some(name) = &node.builtin {
        let Some(builtin) = patchbay_nodes::builtin_by_name(name) else {
            issues.push(ValidationIssue::UnknownBuiltin {
                node: label.to_string(),
                name: name.clone(),
            });
            return None;
        };
        check_param_count(label, builtin, node.params.len(), issues);
        return Some(builtin.description);
    }

    if typed {
        let component_type = parse_code(label, "type", node.component_type.as_deref(), issues);
        let subtype = parse_code(label, "subtype", node.subtype.as_deref(), issues);
        let manufacturer = parse_code(label, "manufacturer", Some(&node.manufacturer), issues);
        let description =
            ComponentDescription::new(component_type?, subtype?, manufacturer?);
        if let Some(builtin) = patchbay_nodes::find_builtin(&description) {
            check_param_count(label, builtin, node.params.len(), issues);
        }
        return Some(description);
    }

    None
}

fn check_param_count(
    label: &str,
    builtin: &patchbay_nodes::Builtin,
    got: usize,
    issues: &mut Vec<ValidationIssue>,
) {
    // The mixer takes one gain per input port.
    let max = if builtin.description == patchbay_nodes::MIXER {
        MAX_PORTS as usize
    } else {
        builtin.params.len()
    };
    if got > max {
        issues.push(ValidationIssue::TooManyParams {
            node: label.to_string(),
            builtin: builtin.name,
            max,
            got,
        });
    }
}

fn parse_code(
    label: &str,
    field: &'static str,
    value: Option<&str>,
    issues: &mut Vec<ValidationIssue>,
) -> Option<FourCc> {
    let value = value.unwrap_or("");
    match value.parse::<FourCc>() {
        Ok(code) if code.is_printable() => Some(code),
        _ => {
            issues.push(ValidationIssue::InvalidCode {
                node: label.to_string(),
                field,
                value: value.to_string(),
            });
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::SubGraphConfig;

    fn issues(doc: &GraphDocument) -> Vec<ValidationIssue> {
        validate(doc).map_or_else(|r| r.issues().to_vec(), |()| Vec::new())
    }

    fn chain() -> GraphDocument {
        GraphDocument::new("chain")
            .with_node(NodeConfig::builtin("osc", "sine"))
            .with_node(NodeConfig::builtin("gain", "gain").with_params([0.5]))
            .with_node(NodeConfig::builtin("out", "output"))
            .with_connection(ConnectionConfig::new("osc", "gain"))
            .with_connection(ConnectionConfig::new("gain", "out"))
    }

    #[test]
    fn valid_chain_passes() {
        assert_eq!(validate(&chain()), Ok(()));
    }

    #[test]
    fn labels_must_be_unique_and_nonempty() {
        let doc = chain()
            .with_node(NodeConfig::builtin("osc", "constant"))
            .with_node(NodeConfig::builtin("", "constant"))
            .with_node(NodeConfig::builtin("a/b", "constant"));
        assert_eq!(
            issues(&doc),
            vec![
                ValidationIssue::DuplicateLabel("osc".into()),
                ValidationIssue::EmptyLabel(4),
                ValidationIssue::ReservedCharacter("a/b".into()),
            ]
        );
    }

    #[test]
    fn node_must_name_exactly_one_processor() {
        let mut both = NodeConfig::builtin("both", "gain");
        both.subgraph = Some(SubGraphConfig::default());
        let none = NodeConfig {
            builtin: None,
            ..NodeConfig::builtin("none", "gain")
        };
        let doc = GraphDocument::new("x").with_node(both).with_node(none);
        assert_eq!(
            issues(&doc),
            vec![
                ValidationIssue::AmbiguousComponent("both".into()),
                ValidationIssue::MissingComponent("none".into()),
            ]
        );
    }

    #[test]
    fn bad_codes_are_reported_per_field() {
        let mut node = NodeConfig::component("fx", patchbay_nodes::GAIN);
        node.component_type = Some("toolong".into());
        node.manufacturer = "ab".into();
        let found = issues(&GraphDocument::new("x").with_node(node));
        assert_eq!(found.len(), 2);
        assert!(matches!(&found[0], ValidationIssue::InvalidCode { field: "type", .. }));
        assert!(matches!(
            &found[1],
            ValidationIssue::InvalidCode { field: "manufacturer", .. }
        ));
    }

    #[test]
    fn unregistered_component_is_not_a_validation_issue() {
        let external = ComponentDescription::from_bytes(b"aufx", b"xtrn", b"acme");
        let doc = GraphDocument::new("x").with_node(NodeConfig::component("ext", external));
        assert_eq!(validate(&doc), Ok(()));
    }

    #[test]
    fn builtin_parameter_count_is_checked() {
        let doc = GraphDocument::new("x")
            .with_node(NodeConfig::builtin("g", "gain").with_params([1.0, 2.0]))
            .with_node(NodeConfig::builtin("m", "mixer").with_params(vec![1.0; 8]))
            .with_node(NodeConfig::component("d", patchbay_nodes::DELAY).with_params([0.1; 4]))
            .with_node(NodeConfig::builtin("c", "constant").with_params([f32::NAN]));
        assert_eq!(
            issues(&doc),
            vec![
                ValidationIssue::TooManyParams {
                    node: "g".into(),
                    builtin: "gain",
                    max: 1,
                    got: 2
                },
                ValidationIssue::TooManyParams {
                    node: "d".into(),
                    builtin: "delay",
                    max: 3,
                    got: 4
                },
                ValidationIssue::NonFiniteParam {
                    node: "c".into(),
                    index: 0
                },
            ]
        );
    }

    #[test]
    fn connection_problems_are_all_reported() {
        let doc = chain()
            .with_connection(ConnectionConfig::new("osc", "nowhere"))
            .with_connection(ConnectionConfig::new("osc", "out"))
            .with_connection(ConnectionConfig::new("gain", "gain").input(1))
            .with_connection(ConnectionConfig::new("osc", "gain").output(MAX_PORTS).input(2));
        assert_eq!(
            issues(&doc),
            vec![
                ValidationIssue::UnknownNode {
                    connection: "osc:0 -> nowhere:0".into(),
                    label: "nowhere".into()
                },
                ValidationIssue::InputAlreadyConnected {
                    node: "out".into(),
                    input: 0
                },
                ValidationIssue::SelfConnection("gain:0 -> gain:1".into()),
                ValidationIssue::PortOutOfRange {
                    connection: "osc:64 -> gain:2".into(),
                    port: 64,
                    max: 64
                },
            ]
        );
    }

    #[test]
    fn nested_graphs_are_validated_with_scoped_labels() {
        let inner = SubGraphConfig::default()
            .with_node(NodeConfig::builtin("in", "host-input"))
            .with_node(NodeConfig::builtin("o1", "output"))
            .with_node(NodeConfig::builtin("o2", "output"))
            .with_connection(ConnectionConfig::new("in", "ghost"));
        let doc = chain().with_node(NodeConfig::subgraph("fx", inner));
        assert_eq!(
            issues(&doc),
            vec![
                ValidationIssue::MultipleOutputs {
                    scope: "fx".into(),
                    nodes: "fx/o1, fx/o2".into()
                },
                ValidationIssue::UnknownNode {
                    connection: "fx/in:0 -> fx/ghost:0".into(),
                    label: "fx/ghost".into()
                },
            ]
        );
    }

    #[test]
    fn engine_settings_are_checked() {
        let doc = chain().with_engine(EngineConfig {
            sample_rate: 0.0,
            max_frames: 0,
            failure_queue_capacity: 1,
        });
        assert_eq!(issues(&doc).len(), 2);
    }

    #[test]
    fn report_display() {
        let single = ValidationReport::new(vec![ValidationIssue::EmptyLabel(0)]);
        assert_eq!(single.to_string(), "node #0 has an empty label");
    }
}
