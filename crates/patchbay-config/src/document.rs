//! Graph document format and file operations.

use std::path::Path;

use patchbay_core::{ComponentDescription, FourCc, GraphSettings};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// A graph described in TOML.
///
/// # TOML Format
///
/// ```toml
/// name = "Echo"
/// description = "Sine through a feedback delay"
///
/// [engine]
/// sample_rate = 48000.0
/// max_frames = 512
///
/// [[nodes]]
/// label = "osc"
/// builtin = "sine"
/// params = [220.0, 0.3]
///
/// [[nodes]]
/// label = "echo"
/// type = "aufx"
/// subtype = "dely"
/// params = [0.25, 0.4, 0.5]
///
/// [[nodes]]
/// label = "out"
/// builtin = "output"
///
/// [[connections]]
/// from = "osc"
/// to = "echo"
///
/// [[connections]]
/// from = "echo"
/// to = "out"
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct GraphDocument {
    /// Name of the graph.
    pub name: String,

    /// Optional description.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    /// Engine settings.
    #[serde(default)]
    pub engine: EngineConfig,

    /// Nodes, in the order they are added.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,

    /// Connections, in the order they are made.
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

impl GraphDocument {
    /// Creates an empty document with default engine settings.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: None,
            engine: EngineConfig::default(),
            nodes: Vec::new(),
            connections: Vec::new(),
        }
    }

    /// Sets the description.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Sets the engine settings.
    pub fn with_engine(mut self, engine: EngineConfig) -> Self {
        self.engine = engine;
        self
    }

    /// Adds a node.
    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds a connection.
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connections.push(connection);
        self
    }

    /// Loads a document from a TOML file.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let content =
            std::fs::read_to_string(path).map_err(|e| ConfigError::read_file(path, e))?;
        Self::from_toml_str(&content)
    }

    /// Parses a document from a TOML string.
    pub fn from_toml_str(toml_str: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(toml_str)?)
    }

    /// Saves the document to a TOML file, creating parent directories.
    pub fn save(&self, path: impl AsRef<Path>) -> Result<(), ConfigError> {
        let path = path.as_ref();
        if let Some(parent) = path.parent()
            && !parent.as_os_str().is_empty()
            && !parent.exists()
        {
            std::fs::create_dir_all(parent).map_err(|e| ConfigError::create_dir(parent, e))?;
        }
        let content = self.to_toml_string()?;
        std::fs::write(path, content).map_err(|e| ConfigError::write_file(path, e))
    }

    /// Serializes the document to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// Finds a top-level node by label.
    pub fn node(&self, label: &str) -> Option<&NodeConfig> {
        self.nodes.iter().find(|n| n.label == label)
    }
}

/// Engine settings section.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct EngineConfig {
    /// Sample rate in Hz.
    pub sample_rate: f64,
    /// Largest block a render call may request.
    pub max_frames: usize,
    /// Capacity of the render failure channel.
    pub failure_queue_capacity: usize,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self::from(GraphSettings::default())
    }
}

impl From<GraphSettings> for EngineConfig {
    fn from(settings: GraphSettings) -> Self {
        Self {
            sample_rate: settings.sample_rate,
            max_frames: settings.max_frames,
            failure_queue_capacity: settings.failure_queue_capacity,
        }
    }
}

impl EngineConfig {
    /// Engine settings for [`Graph::with_settings`](patchbay_core::Graph::with_settings).
    pub fn settings(&self) -> GraphSettings {
        GraphSettings {
            sample_rate: self.sample_rate,
            max_frames: self.max_frames,
            failure_queue_capacity: self.failure_queue_capacity,
        }
    }
}

fn default_manufacturer() -> String {
    patchbay_core::MANUFACTURER.to_string()
}

fn is_default_manufacturer(value: &String) -> bool {
    *value == default_manufacturer()
}

/// One node.
///
/// A node names its processor in exactly one way: a `builtin` name, an
/// explicit `type`/`subtype` (with `manufacturer`, default `pbay`), or a
/// nested `subgraph`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeConfig {
    /// Label used by connections. Unique within its graph.
    pub label: String,

    /// Built-in processor name, e.g. `"gain"`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub builtin: Option<String>,

    /// Component type code, e.g. `"aufx"`.
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub component_type: Option<String>,

    /// Component subtype code.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subtype: Option<String>,

    /// Manufacturer code.
    #[serde(
        default = "default_manufacturer",
        skip_serializing_if = "is_default_manufacturer"
    )]
    pub manufacturer: String,

    /// Parameter values, packed into the node's configuration blob.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub params: Vec<f32>,

    /// Nested graph.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub subgraph: Option<SubGraphConfig>,
}

/// How a node selects its processor, once resolved.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum NodeSource<'a> {
    /// A registered component.
    Component(ComponentDescription),
    /// A nested graph.
    SubGraph(&'a SubGraphConfig),
}

impl NodeConfig {
    fn empty(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            builtin: None,
            component_type: None,
            subtype: None,
            manufacturer: default_manufacturer(),
            params: Vec::new(),
            subgraph: None,
        }
    }

    /// A node using a built-in processor.
    pub fn builtin(label: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            builtin: Some(name.into()),
            ..Self::empty(label)
        }
    }

    /// A node using an explicit component description.
    pub fn component(label: impl Into<String>, description: ComponentDescription) -> Self {
        Self {
            component_type: Some(description.component_type.to_string()),
            subtype: Some(description.subtype.to_string()),
            manufacturer: description.manufacturer.to_string(),
            ..Self::empty(label)
        }
    }

    /// A sub-graph node.
    pub fn subgraph(label: impl Into<String>, subgraph: SubGraphConfig) -> Self {
        Self {
            subgraph: Some(subgraph),
            ..Self::empty(label)
        }
    }

    /// Sets the parameters.
    pub fn with_params(mut self, params: impl Into<Vec<f32>>) -> Self {
        self.params = params.into();
        self
    }

    /// Resolves the processor selection.
    ///
    /// Returns `None` if the node names no processor, more than one, an
    /// unknown built-in, or a malformed code. [`validate`](crate::validate)
    /// reports which.
    pub fn source(&self) -> Option<NodeSource<'_>> {
        let typed = self.component_type.is_some() || self.subtype.is_some();
        match (&self.builtin, typed, &self.subgraph) {
            (Some(name), false, None) => patchbay_nodes::builtin_by_name(name)
                .map(|b| NodeSource::Component(b.description)),
            (None, true, None) => self.description().map(NodeSource::Component),
            (None, false, Some(subgraph)) => Some(NodeSource::SubGraph(subgraph)),
            _ => None,
        }
    }

    /// Parses `type`/`subtype`/`manufacturer` into a description.
    fn description(&self) -> Option<ComponentDescription> {
        let component_type: FourCc = self.component_type.as_deref()?.parse().ok()?;
        let subtype: FourCc = self.subtype.as_deref()?.parse().ok()?;
        let manufacturer: FourCc = self.manufacturer.parse().ok()?;
        let description = ComponentDescription::new(component_type, subtype, manufacturer);
        description.is_well_formed().then_some(description)
    }

    /// Packs `params` into a configuration blob.
    pub fn config_blob(&self) -> Vec<u8> {
        patchbay_core::params::encode(&self.params)
    }
}

/// Nodes and connections of a nested graph.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SubGraphConfig {
    /// Nodes of the nested graph.
    #[serde(default)]
    pub nodes: Vec<NodeConfig>,
    /// Connections of the nested graph.
    #[serde(default)]
    pub connections: Vec<ConnectionConfig>,
}

impl SubGraphConfig {
    /// Adds a node.
    pub fn with_node(mut self, node: NodeConfig) -> Self {
        self.nodes.push(node);
        self
    }

    /// Adds a connection.
    pub fn with_connection(mut self, connection: ConnectionConfig) -> Self {
        self.connections.push(connection);
        self
    }
}

/// One connection, by node label.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConnectionConfig {
    /// Source node label.
    pub from: String,
    /// Source output port.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub output: u32,
    /// Destination node label.
    pub to: String,
    /// Destination input port.
    #[serde(default, skip_serializing_if = "is_zero")]
    pub input: u32,
}

#[allow(clippy::trivially_copy_pass_by_ref)]
fn is_zero(port: &u32) -> bool {
    *port == 0
}

impl ConnectionConfig {
    /// Connects `from:0` to `to:0`.
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            output: 0,
            to: to.into(),
            input: 0,
        }
    }

    /// Sets the source output port.
    pub fn output(mut self, output: u32) -> Self {
        self.output = output;
        self
    }

    /// Sets the destination input port.
    pub fn input(mut self, input: u32) -> Self {
        self.input = input;
        self
    }
}
