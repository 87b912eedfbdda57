use rand::thread_rng;

use validator_ranking::models::identity::Identity;
use validator_ranking::models::ranking::RankedValidator;
use validator_ranking::services::cluster;

fn with_parent(parent: &str, display: &str) -> RankedValidator {
    RankedValidator {
        identity: Identity {
            display: Some(display.to_string()),
            display_parent: Some(parent.to_string()),
            ..Identity::default()
        },
        show_cluster_member: true,
        ..RankedValidator::default()
    }
}

fn with_display(display: &str) -> RankedValidator {
    RankedValidator {
        identity: Identity {
            display: Some(display.to_string()),
            ..Identity::default()
        },
        show_cluster_member: true,
        ..RankedValidator::default()
    }
}

fn anonymous() -> RankedValidator {
    RankedValidator {
        show_cluster_member: true,
        ..RankedValidator::default()
    }
}

/// M-band cluster of 12: exactly 7 visible, 5 hidden, on every run.
#[test]
fn cluster_of_twelve_hides_exactly_five()  {
    for _ in 0..10 {
        let mut validators: Vec<RankedValidator> = (0..12)
            .map(|i| with_parent("Acme", &format!("node-{:02}", i)))
            .collect();

        let clusters = cluster::analyze(&mut validators, &mut thread_rng());
        assert!(clusters.contains("Acme"));

        for validator in &validators {
            assert_eq!(validator.cluster_name, "Acme");
            assert_eq!(validator.cluster_members, 12);
            assert!(validator.part_of_cluster);
        }

        let hidden = validators.iter().filter(|v| !v.show_cluster_member).count();
        assert_eq!(hidden, 5);
    }
}

/// Different runs may hide different members, never different counts.
#[test]
fn hide_counts_are_stable_across_seeds() {
    let build = || -> Vec<RankedValidator> {
        (0..12)
            .map(|i| with_parent("Acme", &format!("node-{:02}", i)))
            .collect()
    };

    let mut first = build();
    let mut second = build();
    cluster::analyze(&mut first, &mut thread_rng());
    cluster::analyze(&mut second, &mut thread_rng());

    let hidden = |set: &[RankedValidator]| set.iter().filter(|v| !v.show_cluster_member).count();
    assert_eq!(hidden(&first), 5);
    assert_eq!(hidden(&second), 5);
}

/// Pairs are always fully visible.
#[test]
fn pair_cluster_shows_both() {
    let mut validators = vec![
        with_parent("Duo", "a"),
        with_parent("Duo", "b"),
    ];
    cluster::analyze(&mut validators, &mut thread_rng());
    assert!(validators.iter().all(|v| v.show_cluster_member));
    assert!(validators.iter().all(|v| v.cluster_members == 2));
}

/// Display-prefix heuristic groups validators without a sub-identity and
/// strips the numbered suffix from the cluster name.
#[test]
fn prefix_cluster_without_sub_identity() {
    let mut validators = vec![
        with_display("STAKER-1"),
        with_display("STAKER-2"),
        with_display("STAKER-3"),
        with_display("lonely"),
    ];
    cluster::analyze(&mut validators, &mut thread_rng());

    for validator in &validators[..3] {
        assert_eq!(validator.cluster_name, "STAKER");
        assert_eq!(validator.cluster_members, 3);
        assert!(validator.part_of_cluster);
    }
    assert!(!validators[3].part_of_cluster);
    assert_eq!(validators[3].cluster_members, 1);
}

/// No display at all means no cluster.
#[test]
fn no_display_no_cluster() {
    let mut validators = vec![anonymous(), anonymous()];
    cluster::analyze(&mut validators, &mut thread_rng());
    for validator in &validators {
        assert_eq!(validator.cluster_name, "");
        assert_eq!(validator.cluster_members, 0);
        assert!(!validator.part_of_cluster);
        assert!(validator.show_cluster_member);
    }
}

/// Singletons are never sampled.
#[test]
fn singleton_stays_visible() {
    let mut validators = vec![with_display("unique-name")];
    cluster::analyze(&mut validators, &mut thread_rng());
    assert!(validators[0].show_cluster_member);
    assert!(!validators[0].part_of_cluster);
}
