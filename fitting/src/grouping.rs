/// Target columns that share one hyperparameter value and are fit together
#[derive(Debug, Clone, PartialEq)]
pub struct TargetGroup {
    /// The shared hyperparameter
    pub value: f64,
    /// Ascending column indices of the targets holding `value`
    pub columns: Vec<usize>,
}

/// Partition target columns by their hyperparameter.
///
/// Groups are ordered by ascending value and every column index ends up in exactly
/// one group, so the groups together cover `0..hyperparams.len()`.
/// The order never depends on hashing or on the order the values first appear in.
pub fn group_targets(hyperparams: &[f64]) -> Vec<TargetGroup> {
    let mut order: Vec<usize> = (0..hyperparams.len()).collect();
    // stable sort keeps the column indices ascending within a group
    order.sort_by(|a, b| hyperparams[*a].total_cmp(&hyperparams[*b]));

    let mut groups: Vec<TargetGroup> = Vec::new();
    for k in order {
        let value = hyperparams[k];
        match groups.last_mut() {
            Some(group) if group.value.total_cmp(&value).is_eq() => group.columns.push(k),
            _ => groups.push(TargetGroup {
                value,
                columns: vec![k],
            }),
        }
    }

    groups
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn groups_by_value() {
        let groups = group_targets(&[0.5, 0.1, 0.5, 1.0, 0.1]);

        assert_eq!(
            groups,
            vec![
                TargetGroup {
                    value: 0.1,
                    columns: vec![1, 4]
                },
                TargetGroup {
                    value: 0.5,
                    columns: vec![0, 2]
                },
                TargetGroup {
                    value: 1.0,
                    columns: vec![3]
                },
            ]
        );
    }

    #[test]
    fn covers_every_column_once() {
        let hyperparams = [0.3, 0.2, 0.3, 0.3, 0.9, 0.2, 0.7];
        let mut seen: Vec<usize> = group_targets(&hyperparams)
            .into_iter()
            .flat_map(|g| g.columns)
            .collect();
        seen.sort();

        assert_eq!(seen, (0..hyperparams.len()).collect::<Vec<_>>());
    }

    #[test]
    fn deterministic_order() {
        let a = group_targets(&[0.9, 0.1, 0.5]);
        let b = group_targets(&[0.1, 0.5, 0.9]);

        let values = |g: &[TargetGroup]| g.iter().map(|g| g.value).collect::<Vec<_>>();
        assert_eq!(values(&a), values(&b));
        assert_eq!(values(&a), vec![0.1, 0.5, 0.9]);
    }

    #[test]
    fn empty() {
        assert!(group_targets(&[]).is_empty());
    }
}
