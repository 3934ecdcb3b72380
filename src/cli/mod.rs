//! CF-011: CLI subcommands: validate, inspect, graph, order.

use crate::core::{parser, types};
use clap::Subcommand;
use std::path::{Path, PathBuf};

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Parse a template and report entity counts and warnings
    Validate {
        /// Path to the template (YAML or JSON)
        #[arg(short, long, default_value = "template.yaml")]
        file: PathBuf,

        /// Fail if any intrinsic was malformed (for CI)
        #[arg(long)]
        deny_warnings: bool,
    },

    /// Print the parsed template as JSON
    Inspect {
        /// Path to the template (YAML or JSON)
        #[arg(short, long, default_value = "template.yaml")]
        file: PathBuf,

        /// Pretty-print the JSON
        #[arg(long)]
        pretty: bool,
    },

    /// Print the logical names each resource and output references
    Graph {
        /// Path to the template (YAML or JSON)
        #[arg(short, long, default_value = "template.yaml")]
        file: PathBuf,
    },

    /// Print resources in deployment order
    Order {
        /// Path to the template (YAML or JSON)
        #[arg(short, long, default_value = "template.yaml")]
        file: PathBuf,
    },
}

/// Dispatch a CLI command.
pub fn dispatch(cmd: Commands) -> Result<(), String> {
    match cmd {
        Commands::Validate {
            file,
            deny_warnings,
        } => cmd_validate(&file, deny_warnings),
        Commands::Inspect { file, pretty } => cmd_inspect(&file, pretty),
        Commands::Graph { file } => cmd_graph(&file),
        Commands::Order { file } => cmd_order(&file),
    }
}

fn load(file: &Path) -> Result<types::Template, String> {
    parser::parse_template_file(file).map_err(|e| e.to_string())
}

fn cmd_validate(file: &Path, deny_warnings: bool) -> Result<(), String> {
    let template = load(file)?;

    for w in &template.warnings {
        eprintln!("  WARNING: {}", w);
    }

    if deny_warnings && template.has_warnings() {
        return Err(format!(
            "{} malformed intrinsic(s) in {}",
            template.warnings.len(),
            template.source
        ));
    }

    println!(
        "OK: {} ({} parameters, {} conditions, {} resources, {} outputs)",
        template.source,
        template.parameters.len(),
        template.conditions.len(),
        template.resources.len(),
        template.outputs.len()
    );
    Ok(())
}

fn cmd_inspect(file: &Path, pretty: bool) -> Result<(), String> {
    let template = load(file)?;
    println!("{}", render_json(&template, pretty)?);
    Ok(())
}

fn render_json(template: &types::Template, pretty: bool) -> Result<String, String> {
    let rendered = if pretty {
        serde_json::to_string_pretty(template)
    } else {
        serde_json::to_string(template)
    };
    rendered.map_err(|e| format!("JSON encode error: {}", e))
}

fn cmd_graph(file: &Path) -> Result<(), String> {
    let template = load(file)?;
    print!("{}", render_graph(&template));
    Ok(())
}

fn render_graph(template: &types::Template) -> String {
    let mut out = String::new();
    for (id, refs) in &template.reference_graph {
        if refs.is_empty() {
            out.push_str(&format!("{}\n", id));
        } else {
            out.push_str(&format!("{} -> {}\n", id, refs.join(", ")));
        }
    }
    out
}

fn cmd_order(file: &Path) -> Result<(), String> {
    let template = load(file)?;
    for (i, id) in template.deployment_order().iter().enumerate() {
        let resource_type = template
            .resources
            .get(id)
            .map(|r| r.resource_type.as_str())
            .unwrap_or("");
        println!("{:>3}. {} ({})", i + 1, id, resource_type);
    }
    Ok(())
}
