//! Example graphs bundled with the library.
//!
//! These documents are embedded at compile time. They double as starting
//! points for hand-written graphs and as fixtures for the CLI.

use crate::GraphDocument;

/// Bundled documents by identifier.
static BUNDLED_TOML: &[(&str, &str)] = &[
    ("tone", TONE),
    ("chord", CHORD),
    ("echo", ECHO),
    ("passthrough", PASSTHROUGH),
    ("nested-echo", NESTED_ECHO),
    ("split-mix", SPLIT_MIX),
];

const TONE: &str = r#"
name = "Tone"
description = "A 440 Hz sine at half amplitude"

[[nodes]]
label = "osc"
builtin = "sine"
params = [440.0, 0.5]

[[nodes]]
label = "out"
builtin = "output"

[[connections]]
from = "osc"
to = "out"
"#;

const CHORD: &str = r#"
name = "Chord"
description = "Three sines summed by a mixer"

[[nodes]]
label = "root"
builtin = "sine"
params = [220.0, 0.3]

[[nodes]]
label = "third"
builtin = "sine"
params = [277.18, 0.3]

[[nodes]]
label = "fifth"
builtin = "sine"
params = [329.63, 0.3]

[[nodes]]
label = "mix"
builtin = "mixer"
params = [1.0, 0.8, 0.8]

[[nodes]]
label = "out"
builtin = "output"

[[connections]]
from = "root"
to = "mix"

[[connections]]
from = "third"
to = "mix"
input = 1

[[connections]]
from = "fifth"
to = "mix"
input = 2

[[connections]]
from = "mix"
to = "out"
"#;

const ECHO: &str = r#"
name = "Echo"
description = "Sine through a feedback delay"

[[nodes]]
label = "osc"
builtin = "sine"
params = [330.0, 0.4]

[[nodes]]
label = "echo"
type = "aufx"
subtype = "dely"
params = [0.25, 0.5, 0.4]

[[nodes]]
label = "out"
builtin = "output"

[[connections]]
from = "osc"
to = "echo"

[[connections]]
from = "echo"
to = "out"
"#;

const PASSTHROUGH: &str = r#"
name = "Passthrough"
description = "Host input channel 0 straight to the output"

[[nodes]]
label = "in"
builtin = "host-input"

[[nodes]]
label = "out"
builtin = "output"

[[connections]]
from = "in"
to = "out"
"#;

const NESTED_ECHO: &str = r#"
name = "Nested Echo"
description = "A delay wrapped in a sub-graph, fed by a sine in the parent"

[[nodes]]
label = "osc"
builtin = "sine"
params = [220.0, 0.5]

[[nodes]]
label = "fx"

[[nodes.subgraph.nodes]]
label = "in"
builtin = "host-input"

[[nodes.subgraph.nodes]]
label = "delay"
builtin = "delay"
params = [0.125, 0.3, 0.5]

[[nodes.subgraph.nodes]]
label = "out"
builtin = "output"

[[nodes.subgraph.connections]]
from = "in"
to = "delay"

[[nodes.subgraph.connections]]
from = "delay"
to = "out"

[[nodes]]
label = "out"
builtin = "output"

[[connections]]
from = "osc"
to = "fx"

[[connections]]
from = "fx"
to = "out"
"#;

const SPLIT_MIX: &str = r#"
name = "Split Mix"
description = "One source split into a dry and an attenuated branch, then mixed"

[[nodes]]
label = "osc"
builtin = "sine"
params = [110.0, 0.5]

[[nodes]]
label = "split"
builtin = "splitter"
params = [2.0]

[[nodes]]
label = "quiet"
builtin = "gain"
params = [0.25]

[[nodes]]
label = "mix"
builtin = "mixer"

[[nodes]]
label = "out"
builtin = "output"

[[connections]]
from = "osc"
to = "split"

[[connections]]
from = "split"
to = "mix"

[[connections]]
from = "split"
output = 1
to = "quiet"

[[connections]]
from = "quiet"
to = "mix"
input = 1

[[connections]]
from = "mix"
to = "out"
"#;

/// Every bundled document.
pub fn bundled_graphs() -> Vec<GraphDocument> {
    BUNDLED_TOML
        .iter()
        .filter_map(|(_, toml)| GraphDocument::from_toml_str(toml).ok())
        .collect()
}

/// A bundled document by identifier or display name, case-insensitive.
///
/// ```rust
/// use patchbay_config::bundled_graph;
///
/// assert_eq!(bundled_graph("echo").unwrap().name, "Echo");
/// assert_eq!(bundled_graph("Nested Echo").unwrap().nodes.len(), 3);
/// assert!(bundled_graph("missing").is_none());
/// ```
pub fn bundled_graph(name: &str) -> Option<GraphDocument> {
    BUNDLED_TOML.iter().find_map(|(id, toml)| {
        let doc = GraphDocument::from_toml_str(toml).ok()?;
        (id.eq_ignore_ascii_case(name) || doc.name.eq_ignore_ascii_case(name)).then_some(doc)
    })
}

/// Identifiers of the bundled documents.
pub fn bundled_graph_names() -> Vec<&'static str> {
    BUNDLED_TOML.iter().map(|(id, _)| *id).collect()
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::{build, validate};
    use patchbay_core::ComponentRegistry;

    #[test]
    fn every_bundled_graph_parses() {
        for (id, toml) in BUNDLED_TOML {
            let doc = GraphDocument::from_toml_str(toml);
            assert!(doc.is_ok(), "'{id}' should parse: {doc:?}");
            let doc = doc.unwrap();
            assert!(!doc.name.is_empty(), "'{id}' should have a name");
            assert!(doc.description.is_some(), "'{id}' should have a description");
        }
        assert_eq!(bundled_graphs().len(), BUNDLED_TOML.len());
    }

    #[test]
    fn every_bundled_graph_validates_and_builds() {
        let registry = Arc::new(ComponentRegistry::new());
        patchbay_nodes::register_builtins(&registry);
        for doc in bundled_graphs() {
            assert_eq!(validate(&doc), Ok(()), "{}", doc.name);
            let built = build(&doc, Arc::clone(&registry)).unwrap();
            assert!(built.graph.output_node().is_some(), "{}", doc.name);
            built.graph.open().unwrap();
            built.graph.close().unwrap();
        }
    }

    #[test]
    fn lookup_by_name() {
        assert!(bundled_graph("SPLIT-MIX").is_some());
        assert!(bundled_graph("split mix").is_some());
        assert_eq!(bundled_graph_names()[0], "tone");
    }
}
