use rand::seq::SliceRandom;
use rand::Rng;
use std::collections::{BTreeMap, BTreeSet};

use crate::models::ranking::RankedValidator;

/// Display-prefix length for the heuristic grouping of validators that
/// share a naming scheme but declared no sub-identity.
const PREFIX_LEN: usize = 6;

/// Assign cluster membership to every validator, then randomly hide part
/// of each cluster according to its size band. Returns the set of
/// distinct cluster names.
pub fn analyze(validators: &mut [RankedValidator], rng: &mut impl Rng) -> BTreeSet<String> {
    assign_clusters(validators);
    sample_visibility(validators, rng);

    validators
        .iter()
        .filter(|v| !v.cluster_name.is_empty())
        .map(|v| v.cluster_name.clone())
        .collect()
}

fn display_prefix(name: &str) -> String {
    name.chars().take(PREFIX_LEN).collect()
}

/// Cluster names drop a trailing run of up to two digits and one trailing
/// separator, so "COMPANY-01" and "COMPANY-02" collapse to "COMPANY".
fn strip_cluster_suffix(display: &str) -> String {
    let mut name = display.to_string();
    let mut stripped = 0;
    while stripped < 2 && name.chars().last().is_some_and(|c| c.is_ascii_digit()) {
        name.pop();
        stripped += 1;
    }
    if name.ends_with('-') || name.ends_with('_') {
        name.pop();
    }
    name
}

fn assign_clusters(validators: &mut [RankedValidator]) {
    let mut parent_counts: BTreeMap<String, u32> = BTreeMap::new();
    let mut prefix_counts: BTreeMap<String, u32> = BTreeMap::new();

    for validator in validators.iter() {
        if let Some(parent) = validator.identity.display_parent.as_deref() {
            if !parent.is_empty() {
                *parent_counts.entry(parent.to_string()).or_insert(0) += 1;
            }
        }
        if let Some(display) = validator.identity.display.as_deref() {
            if !display.is_empty() {
                *prefix_counts.entry(display_prefix(display)).or_insert(0) += 1;
            }
        }
    }

    for validator in validators.iter_mut() {
        let display_parent = validator
            .identity
            .display_parent
            .as_deref()
            .filter(|s| !s.is_empty());
        let display = validator
            .identity
            .display
            .as_deref()
            .filter(|s| !s.is_empty());

        match (display_parent, display) {
            (Some(parent), _) => {
                validator.cluster_name = parent.to_string();
                validator.cluster_members = parent_counts.get(parent).copied().unwrap_or(1);
            }
            (None, Some(display)) => {
                validator.cluster_members = prefix_counts
                    .get(&display_prefix(display))
                    .copied()
                    .unwrap_or(1);
                validator.cluster_name = strip_cluster_suffix(display);
            }
            (None, None) => {
                validator.cluster_name = String::new();
                validator.cluster_members = 0;
            }
        }
        validator.part_of_cluster = validator.cluster_members > 1;
    }
}

/// Visible members per cluster size band.
fn visible_members(size: u32) -> u32 {
    match size {
        0..=2 => size,
        3..=10 => (0.8 * size as f64).floor() as u32,
        11..=20 => (0.6 * size as f64).floor() as u32,
        21..=50 => (0.4 * size as f64).floor() as u32,
        _ => (0.2 * size as f64).floor() as u32,
    }
}

fn sample_visibility(validators: &mut [RankedValidator], rng: &mut impl Rng) {
    let mut clusters: BTreeMap<String, Vec<usize>> = BTreeMap::new();
    for (index, validator) in validators.iter().enumerate() {
        if validator.part_of_cluster && !validator.cluster_name.is_empty() {
            clusters
                .entry(validator.cluster_name.clone())
                .or_default()
                .push(index);
        }
    }

    for (_, members) in clusters {
        let size = validators[members[0]].cluster_members;
        let show = visible_members(size);
        let hide = size.saturating_sub(show).min(members.len() as u32) as usize;
        if hide == 0 {
            continue;
        }
        for &index in members.choose_multiple(rng, hide) {
            validators[index].show_cluster_member = false;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_boundaries() {
        assert_eq!(visible_members(2), 2);
        assert_eq!(visible_members(3), 2);
        assert_eq!(visible_members(10), 8);
        assert_eq!(visible_members(12), 7);
        assert_eq!(visible_members(20), 12);
        assert_eq!(visible_members(21), 8);
        assert_eq!(visible_members(50), 20);
        assert_eq!(visible_members(51), 10);
    }

    #[test]
    fn suffix_stripping() {
        assert_eq!(strip_cluster_suffix("COMPANY-01"), "COMPANY");
        assert_eq!(strip_cluster_suffix("COMPANY_2"), "COMPANY");
        assert_eq!(strip_cluster_suffix("COMPANY"), "COMPANY");
        assert_eq!(strip_cluster_suffix("NODE123"), "NODE1");
    }
}
