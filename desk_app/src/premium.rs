//! Lowest-combined-premium derivation.
//!
//! Every premium-channel message carries one snapshot per instance. For each
//! snapshot we derive the smallest combined premium across its strikes. The
//! functions here are pure; the store decides what to do with the output.

use crate::model::{InstanceId, InstancePremiumSnapshot, LowestPremiumResult};
use serde::{Deserialize, Serialize};
use std::fmt;

/// What to emit for an instance whose `combinedPremiumArray` is empty.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(tag = "mode", rename_all = "snake_case")]
pub enum EmptyPremiumPolicy {
    /// No entry for the instance.
    #[default]
    Omit,
    /// Emit this value as the lowest premium.
    Sentinel { value: f64 },
    /// Report the instance as rejected.
    Reject,
}

/// What to do with a sample whose premium is missing, non-numeric or non-finite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum NonFinitePolicy {
    /// Ignore the bad sample and reduce over the rest.
    #[default]
    Skip,
    /// Drop the whole instance from this reduction.
    RejectInstance,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PremiumPolicy {
    pub empty: EmptyPremiumPolicy,
    pub non_finite: NonFinitePolicy,
}

#[derive(Debug, Clone, PartialEq)]
pub enum RejectReason {
    EmptySamples,
    /// Sample `name` had no usable premium.
    BadSample { name: String },
    /// Every sample was skipped as unusable.
    NoUsableSamples { skipped: usize },
}

impl fmt::Display for RejectReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RejectReason::EmptySamples => write!(f, "combinedPremiumArray is empty"),
            RejectReason::BadSample { name } => {
                write!(f, "sample {name:?} has a missing or non-finite combinedPremium")
            }
            RejectReason::NoUsableSamples { skipped } => {
                write!(f, "all {skipped} samples were missing or non-finite")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Rejection {
    pub id: InstanceId,
    pub reason: RejectReason,
}

/// Output of one reduction pass.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct PremiumReduction {
    pub results: Vec<LowestPremiumResult>,
    pub rejected: Vec<Rejection>,
    /// Samples dropped under [`NonFinitePolicy::Skip`].
    pub skipped_samples: usize,
}

/// Outcome for a single snapshot.
#[derive(Debug, Clone, PartialEq)]
pub enum SnapshotOutcome {
    Lowest(f64),
    Omitted,
    Rejected(RejectReason),
}

/// Smallest finite combined premium of one snapshot under `policy`.
///
/// Returns the outcome together with the number of samples skipped.
pub fn lowest_for_snapshot(
    snapshot: &InstancePremiumSnapshot,
    policy: &PremiumPolicy,
) -> (SnapshotOutcome, usize) {
    let samples = &snapshot.combined_premium_array;
    if samples.is_empty() {
        let outcome = match policy.empty {
            EmptyPremiumPolicy::Omit => SnapshotOutcome::Omitted,
            EmptyPremiumPolicy::Sentinel { value } => SnapshotOutcome::Lowest(value),
            EmptyPremiumPolicy::Reject => SnapshotOutcome::Rejected(RejectReason::EmptySamples),
        };
        return (outcome, 0);
    }

    let mut lowest: Option<f64> = None;
    let mut skipped = 0usize;
    for sample in samples {
        match sample.combined_premium.filter(|v| v.is_finite()) {
            Some(v) => {
                lowest = Some(match lowest {
                    Some(cur) => cur.min(v),
                    None => v,
                });
            }
            None => match policy.non_finite {
                NonFinitePolicy::Skip => skipped += 1,
                NonFinitePolicy::RejectInstance => {
                    return (
                        SnapshotOutcome::Rejected(RejectReason::BadSample { name: sample.name.clone() }),
                        skipped,
                    );
                }
            },
        }
    }

    match lowest {
        Some(v) => (SnapshotOutcome::Lowest(v), skipped),
        None => (
            SnapshotOutcome::Rejected(RejectReason::NoUsableSamples { skipped }),
            skipped,
        ),
    }
}

/// Derive one [`LowestPremiumResult`] per usable snapshot.
///
/// Results come out in input order, but callers should key them by id.
pub fn lowest_combined_premiums(
    snapshots: &[InstancePremiumSnapshot],
    policy: &PremiumPolicy,
) -> PremiumReduction {
    let mut out = PremiumReduction::default();
    for snap in snapshots {
        let (outcome, skipped) = lowest_for_snapshot(snap, policy);
        out.skipped_samples += skipped;
        match outcome {
            SnapshotOutcome::Lowest(lowest_value) => out.results.push(LowestPremiumResult {
                id: snap.id.clone(),
                lowest_value,
            }),
            SnapshotOutcome::Omitted => {}
            SnapshotOutcome::Rejected(reason) => out.rejected.push(Rejection {
                id: snap.id.clone(),
                reason,
            }),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{InstanceId, PremiumSample};

    fn snap(id: &str, values: &[f64]) -> InstancePremiumSnapshot {
        InstancePremiumSnapshot::new(
            id,
            values
                .iter()
                .enumerate()
                .map(|(i, v)| PremiumSample::new(format!("S{}", i + 1), *v))
                .collect(),
        )
    }

    #[test]
    fn picks_minimum_of_concrete_snapshot() {
        let input = vec![snap("A", &[12.5, 9.25])];
        let out = lowest_combined_premiums(&input, &PremiumPolicy::default());
        assert_eq!(
            out.results,
            vec![LowestPremiumResult { id: InstanceId::new("A"), lowest_value: 9.25 }]
        );
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn result_is_a_member_and_lower_bound() {
        let cases: Vec<Vec<f64>> = vec![
            vec![3.0],
            vec![5.0, 5.0, 5.0],
            vec![-1.5, 2.0, 0.0],
            vec![100.0, 99.99, 100.01, 250.0],
            vec![7.75, 3.25, 3.25, 8.0],
        ];
        for values in cases {
            let out = lowest_combined_premiums(&[snap("X", &values)], &PremiumPolicy::default());
            let lowest = out.results[0].lowest_value;
            assert!(values.iter().all(|v| lowest <= *v), "{lowest} not <= all of {values:?}");
            assert!(values.contains(&lowest), "{lowest} not in {values:?}");
        }
    }

    #[test]
    fn empty_input_gives_empty_output() {
        let out = lowest_combined_premiums(&[], &PremiumPolicy::default());
        assert_eq!(out, PremiumReduction::default());
    }

    #[test]
    fn empty_samples_are_omitted_by_default() {
        let input = vec![snap("A", &[]), snap("B", &[4.0])];
        let out = lowest_combined_premiums(&input, &PremiumPolicy::default());
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].id, InstanceId::new("B"));
        assert!(out.rejected.is_empty());
    }

    #[test]
    fn empty_samples_follow_configured_policy() {
        let sentinel = PremiumPolicy {
            empty: EmptyPremiumPolicy::Sentinel { value: 0.0 },
            ..Default::default()
        };
        let out = lowest_combined_premiums(&[snap("A", &[])], &sentinel);
        assert_eq!(out.results[0].lowest_value, 0.0);

        let reject = PremiumPolicy { empty: EmptyPremiumPolicy::Reject, ..Default::default() };
        let out = lowest_combined_premiums(&[snap("A", &[])], &reject);
        assert!(out.results.is_empty());
        assert_eq!(out.rejected[0].reason, RejectReason::EmptySamples);
    }

    #[test]
    fn bad_samples_are_skipped_by_default() {
        let mut s = snap("A", &[8.0, f64::NAN, 6.5]);
        s.combined_premium_array.push(PremiumSample { name: "S4".into(), combined_premium: None });
        s.combined_premium_array.push(PremiumSample::new("S5", f64::NEG_INFINITY));
        let out = lowest_combined_premiums(&[s], &PremiumPolicy::default());
        assert_eq!(out.results[0].lowest_value, 6.5);
        assert_eq!(out.skipped_samples, 3);
    }

    #[test]
    fn all_bad_samples_reject_the_instance() {
        let s = snap("A", &[f64::NAN, f64::INFINITY]);
        let out = lowest_combined_premiums(&[s], &PremiumPolicy::default());
        assert!(out.results.is_empty());
        assert_eq!(out.rejected[0].reason, RejectReason::NoUsableSamples { skipped: 2 });
    }

    #[test]
    fn reject_instance_policy_drops_only_that_instance() {
        let policy = PremiumPolicy { non_finite: NonFinitePolicy::RejectInstance, ..Default::default() };
        let input = vec![snap("A", &[1.0, f64::NAN]), snap("B", &[2.0, 1.5])];
        let out = lowest_combined_premiums(&input, &policy);
        assert_eq!(out.results.len(), 1);
        assert_eq!(out.results[0].id, InstanceId::new("B"));
        assert_eq!(out.rejected[0].id, InstanceId::new("A"));
        assert_eq!(out.rejected[0].reason, RejectReason::BadSample { name: "S2".into() });
    }

    #[test]
    fn same_snapshot_twice_gives_same_result() {
        let input = vec![snap("A", &[12.5, 9.25]), snap("B", &[3.0, 4.0])];
        let before = input.clone();
        let first = lowest_combined_premiums(&input, &PremiumPolicy::default());
        let second = lowest_combined_premiums(&input, &PremiumPolicy::default());
        assert_eq!(first, second);
        assert_eq!(input, before);
    }

    #[test]
    fn policy_reads_from_config_json() {
        let p: PremiumPolicy = serde_json::from_str(
            r#"{"empty":{"mode":"sentinel","value":-1.0},"non_finite":"reject_instance"}"#,
        )
        .unwrap();
        assert_eq!(p.empty, EmptyPremiumPolicy::Sentinel { value: -1.0 });
        assert_eq!(p.non_finite, NonFinitePolicy::RejectInstance);
    }
}
