//! Formatted output helpers for CLI commands.

use tcinst_graph::converge::{Change, ConvergeReport};
use tcinst_graph::node::{Attributes, ResourceNode};

const BOLD: &str = "\x1b[1m";
const DIM: &str = "\x1b[2m";
const GREEN: &str = "\x1b[32m";
const YELLOW: &str = "\x1b[33m";
const RED: &str = "\x1b[31m";
const RESET: &str = "\x1b[0m";

/// Renders the attributes of a node as `key=value` pairs.
#[must_use]
pub fn format_attributes(attrs: &Attributes) -> String {
    let mut parts = vec![format!("ensure={}", attrs.ensure)];
    if let Some(owner) = &attrs.owner {
        parts.push(format!("owner={owner}"));
    }
    if let Some(group) = &attrs.group {
        parts.push(format!("group={group}"));
    }
    if let Some(mode) = attrs.mode {
        parts.push(format!("mode={mode}"));
    }
    if let Some(target) = &attrs.target {
        parts.push(format!("target={}", target.display()));
    }
    if let Some(source) = &attrs.source {
        parts.push(format!("source={source}"));
    }
    if let Some(content) = &attrs.content {
        parts.push(format!("content={} bytes", content.len()));
    }
    if !attrs.replace {
        parts.push("replace=false".into());
    }
    if attrs.recurse {
        parts.push(format!("recurse=true purge={}", attrs.purge));
    }
    if let Some(state) = attrs.service_state {
        parts.push(format!("state={state}"));
    }
    if let Some(enable) = attrs.enable {
        parts.push(format!("enable={enable}"));
    }
    parts.join(" ")
}

/// Prints one node of a plan.
pub fn print_node(index: usize, node: &ResourceNode) {
    println!("  {BOLD}{:>2}. {}{RESET} {DIM}({}){RESET}", index + 1, node.id, node.kind);
    println!("      {}", format_attributes(&node.attributes));
    for dep in &node.requires {
        println!("      {DIM}requires {dep}{RESET}");
    }
}

/// Prints the outcome of one convergence pass.
pub fn print_report(title: &str, report: &ConvergeReport) {
    println!("{BOLD}{title}{RESET}");
    if report.is_converged() {
        println!("  {GREEN}no changes{RESET}");
        return;
    }
    for (id, change) in report.changed() {
        let color = match change {
            Change::Created => GREEN,
            Change::Updated(_) => YELLOW,
            Change::Removed => RED,
            Change::Unchanged => DIM,
        };
        println!("  {color}{change:<10}{RESET} {id}");
    }
    println!("  {} change(s)", report.changed().count());
}
