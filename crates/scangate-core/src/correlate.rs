//! Deduplication of findings that different tools report for the same
//! underlying issue.
//!
//! Findings are grouped by fingerprint and merged into one record per
//! group. The merge is commutative: permuting the order the tool
//! outputs arrive in never changes the final set or its severities.
//! Severity takes the group maximum, contributing tools are a sorted
//! union, and the surviving message is chosen by severity and fixed
//! tool order rather than arrival order.

use crate::finding::Finding;
use std::collections::BTreeMap;

/// Merge findings that share a fingerprint.
///
/// The merged record keeps the maximum severity seen in the group (the
/// gate must never under-report), the union of contributing tools, and
/// the message and location of the highest-severity contributor, ties
/// broken by tool. Messages from the other contributors are retained as
/// secondary notes.
pub fn correlate(findings: Vec<Finding>) -> Vec<Finding> {
    let mut groups: BTreeMap<String, Vec<Finding>> = BTreeMap::new();
    for finding in findings {
        groups
            .entry(finding.fingerprint.clone())
            .or_default()
            .push(finding);
    }

    let mut merged: Vec<Finding> = groups.into_values().map(merge_group).collect();

    // Deterministic output order: severity descending, then fingerprint.
    merged.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.fingerprint.cmp(&b.fingerprint))
    });
    merged
}

fn merge_group(mut group: Vec<Finding>) -> Finding {
    // Arrival order must not matter: impose a canonical order first.
    group.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| a.source_tool.cmp(&b.source_tool))
            .then_with(|| a.message.cmp(&b.message))
    });

    let mut iter = group.into_iter();
    let mut primary = match iter.next() {
        Some(first) => first,
        None => unreachable!("groups are never empty"),
    };

    for other in iter {
        for tool in other.contributing_tools {
            if !primary.contributing_tools.contains(&tool) {
                primary.contributing_tools.push(tool);
            }
        }
        if other.message != primary.message && !primary.secondary_notes.contains(&other.message) {
            primary.secondary_notes.push(other.message);
        }
        for note in other.secondary_notes {
            if note != primary.message && !primary.secondary_notes.contains(&note) {
                primary.secondary_notes.push(note);
            }
        }
        // `suppressed` survives a merge; suppression runs after
        // correlation, but re-correlating a suppressed set must not
        // un-suppress anything.
        primary.suppressed = primary.suppressed || other.suppressed;
    }

    primary.contributing_tools.sort();
    primary
}
