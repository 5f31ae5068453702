//! Snakemake Emitter
//!
//! Emits one rule per tool step plus a synthesized `rule all` whose inputs
//! are the workflow outputs. Snakemake resolves the DAG from file names, so
//! every step output gets a unique path under `results/<symbol>/` and
//! consumers reference that exact path.
//!
//! Value-typed ports fed by workflow inputs become `params`; everything
//! else goes through `input` so the dependency stays visible to Snakemake.

use std::fmt::Write;

use super::{header_lines, single_line, Emitter, ExportFormat};
use crate::error::Result;
use crate::workflow::model::{DataKind, WorkflowMetadata};
use crate::workflow::script::{
    default_input_path, BindingSource, CommandPart, InputBinding, OutputBinding, PipelineScript,
    Step,
};

const INDENT: &str = "    ";

#[derive(Debug, Clone, Copy, Default)]
pub struct SnakemakeEmitter;

impl Emitter for SnakemakeEmitter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Snakemake
    }

    fn emit(&self, script: &PipelineScript, options: &WorkflowMetadata) -> Result<String> {
        let mut out = String::new();

        for line in header_lines(options) {
            writeln!(out, "# {}", line)?;
        }
        writeln!(out)?;

        write_rule_all(&mut out, script)?;

        for step in &script.steps {
            writeln!(out)?;
            write_rule(&mut out, step)?;
        }

        Ok(out)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Input,
    Params,
}

fn section(binding: &InputBinding) -> Section {
    match &binding.source {
        BindingSource::StepOutput { .. } => Section::Input,
        _ if binding.port.kind().is_value() => Section::Params,
        _ => Section::Input,
    }
}

/// Python double-quoted string literal.
fn py_str(text: &str) -> String {
    let mut quoted = String::with_capacity(text.len() + 2);
    quoted.push('"');
    for c in text.chars() {
        match c {
            '\\' => quoted.push_str("\\\\"),
            '"' => quoted.push_str("\\\""),
            '\n' => quoted.push_str("\\n"),
            '\t' => quoted.push_str("\\t"),
            other => quoted.push(other),
        }
    }
    quoted.push('"');
    quoted
}

/// Rule names must be Python identifiers.
pub fn rule_name(tool_id: &str, symbol: &str) -> String {
    let mut name: String = tool_id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if name.is_empty() || name.starts_with(|c: char| c.is_ascii_digit()) {
        name.insert_str(0, "tool_");
    }
    format!("{}_{}", name, symbol)
}

/// Python expression producing the value of a binding.
fn source_expression(source: &BindingSource, section: Section) -> String {
    match source {
        BindingSource::WorkflowInput {
            name, data_type, ..
        } => match default_input_path(name, data_type) {
            Some(path) => format!("config.get({}, {})", py_str(name), py_str(&path)),
            None => format!("config.get({})", py_str(name)),
        },
        BindingSource::StepOutput { path, .. } => py_str(path),
        BindingSource::Unbound => match section {
            Section::Input => "[]".to_string(),
            Section::Params => py_str(""),
        },
    }
}

/// Output path, flagged with `directory()` when the port is a directory.
fn output_expression(binding: &OutputBinding) -> String {
    if binding.port.kind() == DataKind::Directory {
        format!("directory({})", py_str(&binding.path))
    } else {
        py_str(&binding.path)
    }
}

fn write_rule_all(out: &mut String, script: &PipelineScript) -> std::fmt::Result {
    writeln!(out, "rule all:")?;
    writeln!(out, "{}input:", INDENT)?;
    for output in &script.outputs {
        writeln!(
            out,
            "{}{}{}={},",
            INDENT,
            INDENT,
            output.name,
            source_expression(&output.source, Section::Input)
        )?;
    }
    Ok(())
}

fn write_rule(out: &mut String, step: &Step) -> std::fmt::Result {
    if let Some(label) = &step.label {
        writeln!(out, "# {}", single_line(label))?;
    }
    writeln!(out, "rule {}:", rule_name(&step.tool.tool_id, &step.symbol))?;

    let inputs: Vec<&InputBinding> = step
        .inputs
        .iter()
        .filter(|b| section(b) == Section::Input)
        .collect();
    let params: Vec<&InputBinding> = step
        .inputs
        .iter()
        .filter(|b| section(b) == Section::Params)
        .collect();

    if !inputs.is_empty() {
        writeln!(out, "{}input:", INDENT)?;
        for binding in inputs {
            writeln!(
                out,
                "{}{}{}={},",
                INDENT,
                INDENT,
                binding.port.key,
                source_expression(&binding.source, Section::Input)
            )?;
        }
    }

    if !step.outputs.is_empty() {
        writeln!(out, "{}output:", INDENT)?;
        for binding in &step.outputs {
            writeln!(
                out,
                "{}{}{}={},",
                INDENT,
                INDENT,
                binding.port.key,
                output_expression(binding)
            )?;
        }
    }

    if !params.is_empty() {
        writeln!(out, "{}params:", INDENT)?;
        for binding in params {
            writeln!(
                out,
                "{}{}{}={},",
                INDENT,
                INDENT,
                binding.port.key,
                source_expression(&binding.source, Section::Params)
            )?;
        }
    }

    writeln!(out, "{}shell:", INDENT)?;
    writeln!(out, "{}{}{}", INDENT, INDENT, py_str(&shell_command(step)))
}

/// Command template with Snakemake `{input.x}` style placeholders.
///
/// Literal braces are doubled since Snakemake formats the shell string.
fn shell_command(step: &Step) -> String {
    step.command_parts()
        .into_iter()
        .map(|part| match part {
            CommandPart::Text(text) => text.replace('{', "{{").replace('}', "}}"),
            CommandPart::Input(binding) => match section(binding) {
                Section::Input => format!("{{input.{}}}", binding.port.key),
                Section::Params => format!("{{params.{}}}", binding.port.key),
            },
            CommandPart::Output(binding) => format!("{{output.{}}}", binding.port.key),
        })
        .collect()
}
