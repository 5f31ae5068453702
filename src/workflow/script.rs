//! Intermediate Pipeline Script
//!
//! A target-agnostic, ordered description of what the pipeline runs and
//! what feeds what. It is built once from a [`SequencedGraph`]; the format
//! emitters only format it and never look at edges again.
//!
//! Path conventions shared by every emitter:
//! - tool outputs live at `results/<symbol>/<port file name>`
//! - file inputs default to `data/<port file name>`

use std::sync::Arc;

use log::{debug, info};

use super::model::{DataKind, NodeId, NodeKind, PortSpec, ToolDefinition};
use super::sequencer::SequencedGraph;
use super::validator::is_identifier;

/// Directory for generated step outputs.
pub const RESULTS_DIR: &str = "results";

/// Directory for default workflow input locations.
pub const DATA_DIR: &str = "data";

/// Where a step input (or workflow output) gets its value from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BindingSource {
    /// A workflow-level input, referenced by its interface name
    WorkflowInput {
        name: String,
        symbol: String,
        data_type: String,
    },
    /// An output port of an upstream step
    StepOutput {
        symbol: String,
        port_key: String,
        data_type: String,
        path: String,
    },
    /// Optional port left unconnected
    Unbound,
}

impl BindingSource {
    /// `name` for workflow inputs, `symbol.port_key` for step outputs.
    pub fn reference(&self) -> Option<String> {
        match self {
            Self::WorkflowInput { name, .. } => Some(name.clone()),
            Self::StepOutput {
                symbol, port_key, ..
            } => Some(format!("{}.{}", symbol, port_key)),
            Self::Unbound => None,
        }
    }

    pub fn is_bound(&self) -> bool {
        !matches!(self, Self::Unbound)
    }

    /// Kind of the value actually flowing through this binding.
    ///
    /// Step outputs are always materialised on disk, so a value-typed
    /// producer port still yields a file.
    pub fn kind(&self) -> Option<DataKind> {
        match self {
            Self::WorkflowInput { data_type, .. } => Some(DataKind::from_data_type(data_type)),
            Self::StepOutput { data_type, .. } => Some(materialized_kind(data_type)),
            Self::Unbound => None,
        }
    }
}

/// One input port of a step and its resolved producer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InputBinding {
    pub port: PortSpec,
    pub source: BindingSource,
}

impl InputBinding {
    /// Kind the step receives on this port.
    ///
    /// Follows the port's declared type, except that anything fed by an
    /// upstream step arrives as that step's materialised file or directory.
    pub fn kind(&self) -> DataKind {
        match &self.source {
            BindingSource::StepOutput { data_type, .. } => materialized_kind(data_type),
            _ => self.port.kind(),
        }
    }
}

/// One output port of a step and the file it is written to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputBinding {
    pub port: PortSpec,
    pub file_name: String,
    pub path: String,
}

/// A tool invocation in sequencer order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Step {
    pub symbol: String,
    pub node_id: NodeId,
    pub label: Option<String>,
    pub tool: Arc<ToolDefinition>,

    /// Every declared input port, in tool declaration order
    pub inputs: Vec<InputBinding>,

    /// Every declared output port, in tool declaration order
    pub outputs: Vec<OutputBinding>,
}

impl Step {
    pub fn input(&self, port_key: &str) -> Option<&InputBinding> {
        self.inputs.iter().find(|b| b.port.key == port_key)
    }

    pub fn output(&self, port_key: &str) -> Option<&OutputBinding> {
        self.outputs.iter().find(|b| b.port.key == port_key)
    }

    /// Splits the tool's command template into text and port references.
    ///
    /// `{key}` placeholders that name neither an input nor an output port
    /// are returned as text.
    pub fn command_parts(&self) -> Vec<CommandPart<'_>> {
        parse_template(&self.tool.command_template)
            .into_iter()
            .map(|segment| match segment {
                TemplateSegment::Text(text) => CommandPart::Text(text),
                TemplateSegment::Placeholder { key, raw } => {
                    if let Some(binding) = self.input(key) {
                        CommandPart::Input(binding)
                    } else if let Some(binding) = self.output(key) {
                        CommandPart::Output(binding)
                    } else {
                        CommandPart::Text(raw)
                    }
                }
            })
            .collect()
    }
}

/// Piece of a step command after placeholder resolution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CommandPart<'a> {
    Text(&'a str),
    Input(&'a InputBinding),
    Output(&'a OutputBinding),
}

/// A workflow-level input (an Input node).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowInput {
    pub symbol: String,
    pub node_id: NodeId,
    pub name: String,
    pub data_type: String,

    /// Suggested location for file inputs; `None` for scalar values
    pub default_path: Option<String>,
}

impl WorkflowInput {
    pub fn kind(&self) -> DataKind {
        DataKind::from_data_type(&self.data_type)
    }
}

/// A workflow-level output (an Output node) and what it is bound to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkflowOutput {
    pub symbol: String,
    pub node_id: NodeId,
    pub name: String,
    pub data_type: String,
    pub source: BindingSource,
}

/// Ordered, target-agnostic pipeline description.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PipelineScript {
    pub inputs: Vec<WorkflowInput>,
    pub steps: Vec<Step>,
    pub outputs: Vec<WorkflowOutput>,
}

impl PipelineScript {
    pub fn input(&self, name: &str) -> Option<&WorkflowInput> {
        self.inputs.iter().find(|i| i.name == name)
    }

    pub fn step(&self, symbol: &str) -> Option<&Step> {
        self.steps.iter().find(|s| s.symbol == symbol)
    }

    /// Number of input bindings that carry a producer.
    pub fn bound_input_count(&self) -> usize {
        self.steps
            .iter()
            .flat_map(|s| s.inputs.iter())
            .filter(|b| b.source.is_bound())
            .count()
    }
}

/// Output ports are written to disk even when they carry a scalar.
fn materialized_kind(data_type: &str) -> DataKind {
    match DataKind::from_data_type(data_type) {
        DataKind::Directory => DataKind::Directory,
        kind if kind.is_value() => DataKind::File {
            extension: Some("txt".to_string()),
        },
        kind => kind,
    }
}

/// Path a step writes the given output port to.
pub fn output_path(symbol: &str, port: &PortSpec) -> String {
    format!(
        "{}/{}/{}",
        RESULTS_DIR,
        symbol,
        materialized_kind(&port.data_type).file_name(&port.key)
    )
}

/// Default location of a file-typed workflow input.
pub fn default_input_path(name: &str, data_type: &str) -> Option<String> {
    let kind = DataKind::from_data_type(data_type);
    (!kind.is_value()).then(|| format!("{}/{}", DATA_DIR, kind.file_name(name)))
}

/// Raw piece of a command template.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TemplateSegment<'a> {
    Text(&'a str),
    /// `{key}`; `raw` includes the braces
    Placeholder { key: &'a str, raw: &'a str },
}

/// Tokenizes a command template into text and `{identifier}` placeholders.
///
/// Braces that do not enclose an identifier stay part of the text.
pub fn parse_template(template: &str) -> Vec<TemplateSegment<'_>> {
    let mut segments = Vec::new();
    let mut text_start = 0;
    let mut cursor = 0;

    while let Some(offset) = template[cursor..].find('{') {
        let open = cursor + offset;
        let body_start = open + 1;

        match template[body_start..].find('}') {
            Some(len) if is_identifier(&template[body_start..body_start + len]) => {
                if open > text_start {
                    segments.push(TemplateSegment::Text(&template[text_start..open]));
                }
                let close = body_start + len;
                segments.push(TemplateSegment::Placeholder {
                    key: &template[body_start..close],
                    raw: &template[open..=close],
                });
                cursor = close + 1;
                text_start = cursor;
            }
            _ => cursor = body_start,
        }
    }

    if text_start < template.len() {
        segments.push(TemplateSegment::Text(&template[text_start..]));
    }

    segments
}

/// Builds the pipeline script from a sequenced graph.
///
/// Walks nodes in sequencer order. Every tool input port is resolved to the
/// single edge feeding it: an Input node yields a workflow input binding, a
/// Tool node yields a reference to that step's output port.
pub fn build(sequenced: &SequencedGraph) -> PipelineScript {
    let graph = sequenced.graph();
    let mut script = PipelineScript::default();

    let resolve = |node_id: NodeId, port_key: &str| -> BindingSource {
        let Some(edge) = graph.producer_of(node_id, port_key) else {
            return BindingSource::Unbound;
        };
        let Some(producer) = graph.node(edge.source_node_id) else {
            return BindingSource::Unbound;
        };
        let symbol = sequenced
            .symbol(producer.id)
            .unwrap_or_default()
            .to_string();

        match &producer.kind {
            NodeKind::Input {
                port_key,
                data_type,
            } => BindingSource::WorkflowInput {
                name: port_key.clone(),
                symbol,
                data_type: data_type.clone(),
            },
            NodeKind::Tool { tool } => {
                let port = tool
                    .output(&edge.source_port_key)
                    .cloned()
                    .unwrap_or_else(|| PortSpec::required(edge.source_port_key.as_str(), ""));
                BindingSource::StepOutput {
                    path: output_path(&symbol, &port),
                    symbol,
                    port_key: port.key,
                    data_type: port.data_type,
                }
            }
            NodeKind::Output { .. } => BindingSource::Unbound,
        }
    };

    for (symbol, node) in sequenced.iter() {
        match &node.kind {
            NodeKind::Input {
                port_key,
                data_type,
            } => script.inputs.push(WorkflowInput {
                symbol: symbol.to_string(),
                node_id: node.id,
                name: port_key.clone(),
                data_type: data_type.clone(),
                default_path: default_input_path(port_key, data_type),
            }),
            NodeKind::Tool { tool } => {
                let inputs = tool
                    .inputs
                    .iter()
                    .map(|port| InputBinding {
                        port: port.clone(),
                        source: resolve(node.id, &port.key),
                    })
                    .collect();

                let outputs = tool
                    .outputs
                    .iter()
                    .map(|port| OutputBinding {
                        port: port.clone(),
                        file_name: materialized_kind(&port.data_type).file_name(&port.key),
                        path: output_path(symbol, port),
                    })
                    .collect();

                debug!("{} -> {}", symbol, node.describe());

                script.steps.push(Step {
                    symbol: symbol.to_string(),
                    node_id: node.id,
                    label: node.label.clone(),
                    tool: Arc::clone(tool),
                    inputs,
                    outputs,
                });
            }
            NodeKind::Output {
                port_key,
                data_type,
            } => script.outputs.push(WorkflowOutput {
                symbol: symbol.to_string(),
                node_id: node.id,
                name: port_key.clone(),
                data_type: data_type.clone(),
                source: resolve(node.id, port_key),
            }),
        }
    }

    info!(
        "Pipeline script: {} inputs, {} steps, {} outputs, {} bindings",
        script.inputs.len(),
        script.steps.len(),
        script.outputs.len(),
        script.bound_input_count()
    );

    script
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::workflow::catalog::ToolCatalog;
    use crate::workflow::model::{NodeDefinition, WorkflowDefinition};
    use crate::workflow::sequencer::sequence;
    use crate::workflow::validator::validate;

    fn script_for(definition: WorkflowDefinition) -> PipelineScript {
        let graph = ToolCatalog::builtin().resolve(&definition).unwrap();
        build(&sequence(validate(graph).unwrap()))
    }

    fn minimal_chain() -> WorkflowDefinition {
        WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::tool(2, "fastqc"))
            .with_node(NodeDefinition::output(3, "report", "html"))
            .connect(1, "reads", 2, "reads")
            .connect(2, "report", 3, "report")
    }

    #[test]
    fn test_binding_kind_follows_producer() {
        let from_step = |data_type: &str| InputBinding {
            port: PortSpec::required("n", "int"),
            source: BindingSource::StepOutput {
                symbol: "step_2".to_string(),
                port_key: "n".to_string(),
                data_type: data_type.to_string(),
                path: "results/step_2/n.txt".to_string(),
            },
        };
        assert_eq!(
            from_step("int").kind(),
            DataKind::File {
                extension: Some("txt".to_string())
            }
        );
        assert_eq!(from_step("directory").kind(), DataKind::Directory);

        let from_input = InputBinding {
            port: PortSpec::required("n", "int"),
            source: BindingSource::WorkflowInput {
                name: "n".to_string(),
                symbol: "step_1".to_string(),
                data_type: "int".to_string(),
            },
        };
        assert_eq!(from_input.kind(), DataKind::Int);

        let unbound = InputBinding {
            port: PortSpec::optional("n", "int"),
            source: BindingSource::Unbound,
        };
        assert_eq!(unbound.kind(), DataKind::Int);
    }

    #[test]
    fn test_parse_template_placeholders() {
        let segments = parse_template("fastqc {reads} -o {report}");
        assert_eq!(
            segments,
            vec![
                TemplateSegment::Text("fastqc "),
                TemplateSegment::Placeholder {
                    key: "reads",
                    raw: "{reads}"
                },
                TemplateSegment::Text(" -o "),
                TemplateSegment::Placeholder {
                    key: "report",
                    raw: "{report}"
                },
            ]
        );
    }

    #[test]
    fn test_parse_template_keeps_non_identifier_braces() {
        let segments = parse_template("awk '{ print $1 }' {table}");
        assert_eq!(
            segments,
            vec![
                TemplateSegment::Text("awk '{ print $1 }' "),
                TemplateSegment::Placeholder {
                    key: "table",
                    raw: "{table}"
                },
            ]
        );
        assert!(parse_template("").is_empty());
        assert_eq!(parse_template("{unclosed"), vec![TemplateSegment::Text("{unclosed")]);
    }

    #[test]
    fn test_path_conventions() {
        assert_eq!(
            output_path("step_2", &PortSpec::required("report", "html")),
            "results/step_2/report.html"
        );
        assert_eq!(
            output_path("step_3", &PortSpec::required("count", "int")),
            "results/step_3/count.txt"
        );
        assert_eq!(
            default_input_path("reads", "fastq"),
            Some("data/reads.fastq".to_string())
        );
        assert_eq!(default_input_path("threshold", "float"), None);
    }

    #[test]
    fn test_build_minimal_chain() {
        let script = script_for(minimal_chain());

        assert_eq!(script.inputs.len(), 1);
        assert_eq!(script.inputs[0].symbol, "step_1");
        assert_eq!(script.inputs[0].default_path.as_deref(), Some("data/reads.fastq"));

        assert_eq!(script.steps.len(), 1);
        let step = &script.steps[0];
        assert_eq!(step.symbol, "step_2");
        assert_eq!(step.tool.tool_id, "fastqc");
        assert_eq!(step.inputs.len(), 1);
        assert_eq!(step.input("reads").unwrap().source.reference(), Some("reads".to_string()));
        assert_eq!(step.outputs[0].path, "results/step_2/report.html");

        assert_eq!(script.outputs.len(), 1);
        assert_eq!(
            script.outputs[0].source.reference(),
            Some("step_2.report".to_string())
        );
    }

    #[test]
    fn test_build_fan_out_produces_distinct_bindings() {
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::tool(2, "cutadapt"))
            .with_node(NodeDefinition::tool(3, "fastqc"))
            .with_node(NodeDefinition::tool(4, "fastqc"))
            .with_node(NodeDefinition::output(5, "report_a", "html"))
            .with_node(NodeDefinition::output(6, "report_b", "html"))
            .connect(1, "reads", 2, "reads")
            .connect(2, "trimmed", 3, "reads")
            .connect(2, "trimmed", 4, "reads")
            .connect(3, "report", 5, "report_a")
            .connect(4, "report", 6, "report_b");

        let script = script_for(definition);
        let consumers: Vec<&Step> = script
            .steps
            .iter()
            .filter(|s| {
                s.input("reads").and_then(|b| b.source.reference())
                    == Some("step_2.trimmed".to_string())
            })
            .collect();

        assert_eq!(consumers.len(), 2);
        assert_ne!(consumers[0].symbol, consumers[1].symbol);
    }

    #[test]
    fn test_build_keeps_unbound_optional_port() {
        let definition = WorkflowDefinition::default()
            .with_node(NodeDefinition::input(1, "reads", "fastq"))
            .with_node(NodeDefinition::tool(2, "cutadapt"))
            .with_node(NodeDefinition::output(3, "trimmed", "fastq"))
            .connect(1, "reads", 2, "reads")
            .connect(2, "trimmed", 3, "trimmed");

        let script = script_for(definition);
        let step = &script.steps[0];
        assert_eq!(step.inputs.len(), 2);
        assert_eq!(step.inputs[1].port.key, "adapters");
        assert_eq!(step.inputs[1].source, BindingSource::Unbound);
        assert_eq!(script.bound_input_count(), 1);
    }

    #[test]
    fn test_command_parts_resolve_ports() {
        let script = script_for(minimal_chain());
        let parts = script.steps[0].command_parts();

        assert!(matches!(parts[0], CommandPart::Text("fastqc ")));
        assert!(matches!(parts[1], CommandPart::Input(b) if b.port.key == "reads"));
        assert!(parts
            .iter()
            .any(|p| matches!(p, CommandPart::Output(b) if b.port.key == "report")));
    }

    #[test]
    fn test_binding_source_kind() {
        let source = BindingSource::StepOutput {
            symbol: "step_2".to_string(),
            port_key: "count".to_string(),
            data_type: "int".to_string(),
            path: "results/step_2/count.txt".to_string(),
        };
        assert!(matches!(source.kind(), Some(DataKind::File { .. })));
        assert_eq!(BindingSource::Unbound.kind(), None);
    }
}
