use colored::*;
use scangate_core::{AggregatedReport, Finding, GateResult, Severity};

fn severity_colored(severity: Severity) -> ColoredString {
    match severity {
        Severity::Critical => severity.symbol().red().bold(),
        Severity::High => severity.symbol().red(),
        Severity::Medium => severity.symbol().yellow(),
        Severity::Low => severity.symbol().blue(),
        Severity::Info => severity.symbol().white(),
    }
}

/// Print the aggregated report to the terminal.
pub fn print_report(report: &AggregatedReport) {
    println!();
    println!(
        "{}",
        format!(" scangate v{} — aggregated scan report", env!("CARGO_PKG_VERSION")).bold()
    );
    println!();

    if report.partial {
        println!(
            " {} {}",
            "PARTIAL".yellow().bold(),
            "some tools did not contribute:".yellow()
        );
        for (tool, error) in &report.tool_errors {
            println!("   {} {}: {}", "|-".dimmed(), tool, error);
        }
        println!();
    }

    let active: Vec<&Finding> = report.findings.iter().filter(|f| !f.suppressed).collect();
    if active.is_empty() {
        println!(" {} No open findings.", "OK".green().bold());
    } else {
        for finding in &active {
            print_finding(finding);
        }
    }
    println!();

    println!(" {}", "=".repeat(60).dimmed());
    println!();

    println!(" {}", "Summary".bold().underline());
    for severity in Severity::ALL_DESC {
        let count = report.count(*severity);
        if count == 0 {
            continue;
        }
        println!(" {} {}: {}", "|-".dimmed(), severity_colored(*severity), count);
    }
    let suppressed = report.suppressed_count();
    if suppressed > 0 {
        println!(" {} suppressed: {}", "|-".dimmed(), suppressed);
    }
    for warning in &report.warnings {
        println!(" {} {}", "WARN".yellow(), warning);
    }
    println!();

    match &report.gate_result {
        GateResult::Pass => {
            println!(" {} gate passed", "PASS".green().bold());
        }
        GateResult::Fail { rule, offending } => {
            println!(
                " {} gate failed on policy rule '{}'",
                "FAIL".red().bold(),
                rule.bold()
            );
            for item in offending {
                println!("   {} {}", "|-".dimmed(), item);
            }
        }
    }
    println!();
}

fn print_finding(finding: &Finding) {
    let tools: Vec<&str> = finding
        .contributing_tools
        .iter()
        .map(|t| t.label())
        .collect();
    println!(
        " {} {} {} [{}]",
        severity_colored(finding.severity),
        finding.rule_id.bold(),
        finding.location.to_string().cyan(),
        tools.join(", ")
    );
    println!("   {}", finding.message.dimmed());
    for note in &finding.secondary_notes {
        println!("   {} {}", "|-".dimmed(), note.dimmed());
    }
}
