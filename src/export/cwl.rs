//! CWL Emitter
//!
//! Emits a `class: Workflow` document. Workflow inputs and outputs come from
//! the graph's Input and Output nodes, and every tool becomes one `steps`
//! entry with an inline `CommandLineTool` built from its command template.
//!
//! The document is assembled as a `serde_yaml` mapping, which keeps
//! insertion order and handles scalar quoting.

use serde_yaml::{Mapping, Value};

use super::{header_lines, Emitter, ExportFormat};
use crate::error::Result;
use crate::workflow::model::{DataKind, WorkflowMetadata};
use crate::workflow::script::{BindingSource, CommandPart, PipelineScript, Step};

pub const CWL_VERSION: &str = "v1.2";

#[derive(Debug, Clone, Copy, Default)]
pub struct CwlEmitter;

impl Emitter for CwlEmitter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Cwl
    }

    fn emit(&self, script: &PipelineScript, options: &WorkflowMetadata) -> Result<String> {
        let document = workflow_document(script, options);
        let body = serde_yaml::to_string(&document)?;
        Ok(format!("#!/usr/bin/env cwl-runner\n{}", body))
    }
}

fn insert(mapping: &mut Mapping, key: impl Into<String>, value: impl Into<Value>) {
    mapping.insert(Value::String(key.into()), value.into());
}

fn cwl_type(kind: &DataKind, optional: bool) -> String {
    let base = match kind {
        DataKind::File { .. } => "File",
        DataKind::Directory => "Directory",
        DataKind::String => "string",
        DataKind::Int => "int",
        DataKind::Float => "float",
        DataKind::Boolean => "boolean",
    };
    if optional {
        format!("{}?", base)
    } else {
        base.to_string()
    }
}

/// `step_k/port` for step outputs, the input name for workflow inputs.
fn source_reference(source: &BindingSource) -> Option<String> {
    match source {
        BindingSource::WorkflowInput { name, .. } => Some(name.clone()),
        BindingSource::StepOutput {
            symbol, port_key, ..
        } => Some(format!("{}/{}", symbol, port_key)),
        BindingSource::Unbound => None,
    }
}

fn workflow_document(script: &PipelineScript, options: &WorkflowMetadata) -> Value {
    let mut document = Mapping::new();
    insert(&mut document, "cwlVersion", CWL_VERSION);
    insert(&mut document, "class", "Workflow");
    insert(&mut document, "label", options.name.as_str());
    insert(&mut document, "doc", header_lines(options).join(". "));

    let mut inputs = Mapping::new();
    for input in &script.inputs {
        let kind = input.kind();
        let mut entry = Mapping::new();
        insert(&mut entry, "type", cwl_type(&kind, false));
        if let Some(path) = &input.default_path {
            let mut default = Mapping::new();
            let class = if kind == DataKind::Directory {
                "Directory"
            } else {
                "File"
            };
            insert(&mut default, "class", class);
            insert(&mut default, "location", path.as_str());
            insert(&mut entry, "default", default);
        }
        insert(&mut inputs, input.name.as_str(), entry);
    }
    insert(&mut document, "inputs", inputs);

    let mut outputs = Mapping::new();
    for output in &script.outputs {
        let kind = output
            .source
            .kind()
            .unwrap_or_else(|| DataKind::from_data_type(&output.data_type));
        let mut entry = Mapping::new();
        insert(&mut entry, "type", cwl_type(&kind, !output.source.is_bound()));
        if let Some(source) = source_reference(&output.source) {
            insert(&mut entry, "outputSource", source);
        }
        insert(&mut outputs, output.name.as_str(), entry);
    }
    insert(&mut document, "outputs", outputs);

    let mut steps = Mapping::new();
    for step in &script.steps {
        insert(&mut steps, step.symbol.as_str(), workflow_step(step));
    }
    insert(&mut document, "steps", steps);

    Value::Mapping(document)
}

fn workflow_step(step: &Step) -> Mapping {
    let mut entry = Mapping::new();
    let label = step.label.as_deref().unwrap_or(step.tool.name.as_str());
    insert(&mut entry, "label", label);
    insert(&mut entry, "run", command_line_tool(step));

    let mut step_in = Mapping::new();
    for binding in &step.inputs {
        match source_reference(&binding.source) {
            Some(source) => insert(&mut step_in, binding.port.key.as_str(), source),
            // Declared but unconnected: no source, value stays null
            None => insert(&mut step_in, binding.port.key.as_str(), Mapping::new()),
        }
    }
    insert(&mut entry, "in", step_in);

    let step_out: Vec<Value> = step
        .outputs
        .iter()
        .map(|b| Value::String(b.port.key.clone()))
        .collect();
    insert(&mut entry, "out", step_out);

    entry
}

fn command_line_tool(step: &Step) -> Mapping {
    let mut tool = Mapping::new();
    insert(&mut tool, "class", "CommandLineTool");
    insert(&mut tool, "label", step.tool.name.as_str());

    let mut requirements = Mapping::new();
    insert(&mut requirements, "ShellCommandRequirement", Mapping::new());
    insert(&mut tool, "requirements", requirements);

    let mut inputs = Mapping::new();
    for binding in &step.inputs {
        let mut entry = Mapping::new();
        insert(
            &mut entry,
            "type",
            cwl_type(&binding.kind(), !binding.port.required),
        );
        insert(&mut inputs, binding.port.key.as_str(), entry);
    }
    insert(&mut tool, "inputs", inputs);

    let mut outputs = Mapping::new();
    for binding in &step.outputs {
        let class = if binding.port.kind() == DataKind::Directory {
            "Directory"
        } else {
            "File"
        };
        let mut glob = Mapping::new();
        insert(&mut glob, "glob", binding.file_name.as_str());
        let mut entry = Mapping::new();
        insert(&mut entry, "type", class);
        insert(&mut entry, "outputBinding", glob);
        insert(&mut outputs, binding.port.key.as_str(), entry);
    }
    insert(&mut tool, "outputs", outputs);

    let mut argument = Mapping::new();
    insert(&mut argument, "shellQuote", false);
    insert(&mut argument, "valueFrom", command_line(step));
    insert(&mut tool, "arguments", vec![Value::Mapping(argument)]);

    tool
}

/// Command template with placeholders turned into CWL parameter references.
fn command_line(step: &Step) -> String {
    step.command_parts()
        .into_iter()
        .map(|part| match part {
            CommandPart::Text(text) => text.replace("$(", "\\$(").replace("${", "\\${"),
            CommandPart::Input(binding) if binding.kind().is_value() => {
                format!("$(inputs.{})", binding.port.key)
            }
            CommandPart::Input(binding) => format!("$(inputs.{}.path)", binding.port.key),
            CommandPart::Output(binding) => binding.file_name.clone(),
        })
        .collect()
}
