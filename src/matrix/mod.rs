//! Axis arithmetic — per member, per pair and per family.
//!
//! Every axis is `floor((a [+ b]) mod 100)` over chart longitudes, so all
//! values land in `[0, 99]`. Pair and family values are floored means of
//! member values and stay in the same range.

use smallvec::smallvec;

use crate::model::{AxisInput, AxisSet, BodyName, Member, MemberFlow, PairFlow};
use crate::{Error, Result};

/// Reduce one member's longitudes to the five axes.
pub fn compute_axes(input: &AxisInput) -> AxisSet {
    use BodyName::*;
    let deg = |b| input.degree(b);
    AxisSet {
        authority_flow: axis_value(deg(Sun)),
        care_flow: axis_value(deg(Moon)),
        emotional_dependency: axis_value(deg(Moon) + deg(Saturn)),
        decision_influence: axis_value(deg(Mercury) + deg(Jupiter)),
        resource_flow: axis_value(deg(Venus) + deg(Jupiter)),
    }
}

/// `floor(sum mod 100)`. Euclidean remainder keeps negative inputs in range.
fn axis_value(sum: f64) -> u8 {
    sum.rem_euclid(100.0).floor().min(f64::from(AxisSet::MAX)) as u8
}

/// Symmetric flow between two members: floored mean of their axes.
pub fn pair_flow(a: &AxisInput, b: &AxisInput) -> AxisSet {
    floored_pair_mean(&compute_axes(a), &compute_axes(b))
}

fn floored_pair_mean(a: &AxisSet, b: &AxisSet) -> AxisSet {
    a.zip_with(b, |x, y| ((u16::from(x) + u16::from(y)) / 2) as u8)
}

/// Key for the flow between two members, in iteration order.
pub fn pair_label(a: &str, b: &str) -> String {
    format!("{a}_to_{b}")
}

/// Everything the aggregator derives from a member list.
#[derive(Debug, Clone, PartialEq)]
pub struct FamilyAggregate {
    pub family_axes: AxisSet,
    /// One entry per member, in input order.
    pub member_axes: Vec<AxisSet>,
    /// `C(n, 2)` entries: outer index ascending, inner index ascending.
    pub pair_flows: Vec<PairFlow>,
    pub member_flows: Vec<MemberFlow>,
}

impl FamilyAggregate {
    /// Every produced axis set lies in `[0, 99]`.
    pub fn axes_in_range(&self) -> bool {
        self.family_axes.in_range()
            && self.member_axes.iter().all(AxisSet::in_range)
            && self.pair_flows.iter().all(|p| p.flows.in_range())
    }
}

/// Aggregate a family of at least two members.
pub fn aggregate(members: &[Member]) -> Result<FamilyAggregate> {
    if members.len() < 2 {
        return Err(Error::InputError(format!(
            "family aggregation needs at least 2 members, got {}",
            members.len()
        )));
    }

    let member_axes: Vec<AxisSet> = members.iter().map(|m| compute_axes(&m.planets)).collect();
    let family_axes = AxisSet::mean(&member_axes)
        .ok_or_else(|| Error::InputError("no members to aggregate".into()))?;

    let n = members.len();
    let mut pair_flows = Vec::with_capacity(n * (n - 1) / 2);
    for i in 0..n {
        for j in (i + 1)..n {
            pair_flows.push(PairFlow {
                pair: pair_label(&members[i].id, &members[j].id),
                flows: floored_pair_mean(&member_axes[i], &member_axes[j]),
            });
        }
    }

    let member_flows = members
        .iter()
        .zip(&member_axes)
        .map(|(m, own)| MemberFlow {
            member_id: m.id.clone(),
            roles_held: smallvec![m.role.clone()],
            incoming_flows: family_axes,
            outgoing_flows: *own,
        })
        .collect();

    tracing::debug!(
        members = n,
        pairs = pair_flows.len(),
        care_flow = family_axes.care_flow,
        authority_flow = family_axes.authority_flow,
        "family axes aggregated"
    );

    Ok(FamilyAggregate { family_axes, member_axes, pair_flows, member_flows })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn member(id: &str, planets: AxisInput) -> Member {
        Member { id: id.into(), role: "member".into(), planets }
    }

    #[test]
    fn test_axes_formulas() {
        let input = AxisInput::new()
            .with(BodyName::Sun, 245.7)
            .with(BodyName::Moon, 130.2)
            .with(BodyName::Saturn, 300.0)
            .with(BodyName::Mercury, 15.0)
            .with(BodyName::Jupiter, 90.5)
            .with(BodyName::Venus, 10.0);
        let axes = compute_axes(&input);
        assert_eq!(axes.authority_flow, 45);
        assert_eq!(axes.care_flow, 30);
        assert_eq!(axes.emotional_dependency, 30); // 430.2 mod 100
        assert_eq!(axes.decision_influence, 5); // 105.5 mod 100
        assert_eq!(axes.resource_flow, 0); // 100.5 mod 100
    }

    #[test]
    fn test_empty_input_is_all_zero() {
        assert_eq!(compute_axes(&AxisInput::new()), AxisSet::default());
    }

    #[test]
    fn test_negative_degree_stays_in_range() {
        let axes = compute_axes(&AxisInput::new().with(BodyName::Sun, -10.0));
        assert_eq!(axes.authority_flow, 90);
    }

    #[test]
    fn test_pair_flow_floors_mean() {
        let a = AxisInput::new().with(BodyName::Sun, 10.0);
        let b = AxisInput::new().with(BodyName::Sun, 13.0);
        assert_eq!(pair_flow(&a, &b).authority_flow, 11);
        assert_eq!(pair_flow(&a, &b), pair_flow(&b, &a));
    }

    #[test]
    fn test_aggregate_counts_and_labels() {
        let members: Vec<_> = ["a", "b", "c", "d"]
            .iter()
            .enumerate()
            .map(|(i, id)| member(id, AxisInput::new().with(BodyName::Moon, i as f64 * 10.0)))
            .collect();
        let agg = aggregate(&members).unwrap();
        assert_eq!(agg.pair_flows.len(), 6);
        assert_eq!(agg.member_flows.len(), 4);
        let labels: Vec<_> = agg.pair_flows.iter().map(|p| p.pair.as_str()).collect();
        assert_eq!(labels, vec!["a_to_b", "a_to_c", "a_to_d", "b_to_c", "b_to_d", "c_to_d"]);
        assert_eq!(agg.family_axes.care_flow, 15); // (0+10+20+30)/4
        assert!(agg.axes_in_range());
    }

    #[test]
    fn test_member_flows_carry_family_and_own() {
        let members = vec![
            member("p", AxisInput::new().with(BodyName::Sun, 20.0)),
            member("c", AxisInput::new().with(BodyName::Sun, 41.0)),
        ];
        let agg = aggregate(&members).unwrap();
        assert_eq!(agg.member_flows[1].incoming_flows, agg.family_axes);
        assert_eq!(agg.member_flows[1].outgoing_flows.authority_flow, 41);
        assert_eq!(agg.member_flows[0].roles_held.as_slice(), ["member".to_string()]);
        assert_eq!(agg.family_axes.authority_flow, 30);
    }

    #[test]
    fn test_aggregate_rejects_single_member() {
        let members = vec![member("solo", AxisInput::new())];
        assert!(matches!(aggregate(&members), Err(Error::InputError(_))));
    }
}
