//! Nextflow Emitter
//!
//! Emits a DSL2 script: one `params` default per workflow input, one
//! `process` per tool step, and a `workflow` block that wires channels
//! between processes in sequencer order.

use std::fmt::Write;

use super::{header_lines, single_line, Emitter, ExportFormat};
use crate::error::Result;
use crate::workflow::model::WorkflowMetadata;
use crate::workflow::script::{
    BindingSource, CommandPart, PipelineScript, Step, WorkflowInput, RESULTS_DIR,
};

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default)]
pub struct NextflowEmitter;

impl Emitter for NextflowEmitter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Nextflow
    }

    fn emit(&self, script: &PipelineScript, options: &WorkflowMetadata) -> Result<String> {
        let mut out = String::new();

        writeln!(out, "#!/usr/bin/env nextflow")?;
        writeln!(out)?;
        writeln!(out, "/*")?;
        for line in header_lines(options) {
            writeln!(out, " * {}", line.replace("*/", "* /"))?;
        }
        writeln!(out, " */")?;
        writeln!(out)?;
        writeln!(out, "nextflow.enable.dsl = 2")?;

        if !script.inputs.is_empty() {
            writeln!(out)?;
            for input in &script.inputs {
                writeln!(out, "params.{} = {}", input.name, param_default(input))?;
            }
        }

        for step in &script.steps {
            writeln!(out)?;
            write_process(&mut out, step)?;
        }

        writeln!(out)?;
        write_workflow(&mut out, script)?;

        Ok(out)
    }
}

/// Groovy single-quoted string literal.
fn quote(text: &str) -> String {
    format!("'{}'", text.replace('\\', "\\\\").replace('\'', "\\'"))
}

fn param_default(input: &WorkflowInput) -> String {
    match &input.default_path {
        Some(path) => quote(path),
        None => "null".to_string(),
    }
}

fn channel_name(name: &str) -> String {
    format!("ch_{}", name)
}

/// Expression passed to a process call for one input binding.
fn channel_argument(source: &BindingSource) -> String {
    match source {
        BindingSource::WorkflowInput { name, .. } => channel_name(name),
        BindingSource::StepOutput {
            symbol, port_key, ..
        } => format!("{}.out.{}", symbol, port_key),
        BindingSource::Unbound => "[]".to_string(),
    }
}

fn write_process(out: &mut String, step: &Step) -> std::fmt::Result {
    match &step.label {
        Some(label) => writeln!(
            out,
            "// {} ({})",
            single_line(label),
            single_line(&step.tool.name)
        )?,
        None => writeln!(out, "// {}", single_line(&step.tool.name))?,
    }
    writeln!(out, "process {} {{", step.symbol)?;
    writeln!(out, "{}tag {}", INDENT, quote(&step.tool.tool_id))?;
    writeln!(
        out,
        "{}publishDir {}, mode: 'copy'",
        INDENT,
        quote(&format!("{}/{}", RESULTS_DIR, step.symbol))
    )?;

    if !step.inputs.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}input:", INDENT)?;
        for binding in &step.inputs {
            let qualifier = if binding.kind().is_value() {
                "val"
            } else {
                "path"
            };
            writeln!(out, "{}{} {}", INDENT, qualifier, binding.port.key)?;
        }
    }

    if !step.outputs.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}output:", INDENT)?;
        for binding in &step.outputs {
            writeln!(
                out,
                "{}path {}, emit: {}",
                INDENT,
                quote(&binding.file_name),
                binding.port.key
            )?;
        }
    }

    writeln!(out)?;
    writeln!(out, "{}script:", INDENT)?;
    writeln!(out, "{}\"\"\"", INDENT)?;
    for line in script_body(step).lines() {
        writeln!(out, "{}{}", INDENT, line)?;
    }
    writeln!(out, "{}\"\"\"", INDENT)?;
    writeln!(out, "}}")
}

/// Escapes literal text for a Groovy triple-quoted GString.
fn escape_gstring(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('$', "\\$")
        .replace('"', "\\\"")
}

/// Command template inside a Groovy triple-quoted GString.
fn script_body(step: &Step) -> String {
    step.command_parts()
        .into_iter()
        .map(|part| match part {
            CommandPart::Text(text) => escape_gstring(text),
            CommandPart::Input(binding) => format!("${{{}}}", binding.port.key),
            CommandPart::Output(binding) => binding.file_name.clone(),
        })
        .collect()
}

fn write_workflow(out: &mut String, script: &PipelineScript) -> std::fmt::Result {
    writeln!(out, "workflow {{")?;

    for input in &script.inputs {
        let factory = if input.kind().is_value() {
            "Channel.value"
        } else {
            "Channel.fromPath"
        };
        writeln!(
            out,
            "{}{} = {}(params.{})",
            INDENT,
            channel_name(&input.name),
            factory,
            input.name
        )?;
    }

    if !script.steps.is_empty() {
        writeln!(out)?;
        for step in &script.steps {
            let arguments: Vec<String> = step
                .inputs
                .iter()
                .map(|b| channel_argument(&b.source))
                .collect();
            writeln!(out, "{}{}({})", INDENT, step.symbol, arguments.join(", "))?;
        }
    }

    if !script.outputs.is_empty() {
        writeln!(out)?;
        writeln!(out, "{}// Workflow outputs", INDENT)?;
        for output in &script.outputs {
            writeln!(
                out,
                "{}{} = {}",
                INDENT,
                channel_name(&output.name),
                channel_argument(&output.source)
            )?;
        }
    }

    writeln!(out, "}}")
}
