use crate::models::ranking::RankedValidator;

/// Mark every Pareto-dominated validator: one that some other validator
/// weakly beats on relative performance, self stake, active eras, and
/// total rating simultaneously. Ties count as domination, so validators
/// equal on all four dimensions dominate each other. O(N²), fine for a
/// few thousand validators.
pub fn mark_dominated(validators: &mut [RankedValidator]) {
    let profiles: Vec<(f64, u128, u32, i32)> = validators
        .iter()
        .map(|v| (v.relative_performance, v.self_stake, v.active_eras, v.total_rating))
        .collect();

    for (index, validator) in validators.iter_mut().enumerate() {
        let own = profiles[index];
        validator.dominated = profiles.iter().enumerate().any(|(other, candidate)| {
            other != index
                && candidate.0 >= own.0
                && candidate.1 >= own.1
                && candidate.2 >= own.2
                && candidate.3 >= own.3
        });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn validator(performance: f64, self_stake: u128, active_eras: u32, rating: i32) -> RankedValidator {
        RankedValidator {
            relative_performance: performance,
            self_stake,
            total_stake: self_stake,
            active_eras,
            total_rating: rating,
            ..RankedValidator::default()
        }
    }

    #[test]
    fn equal_validators_dominate_each_other() {
        let mut set = vec![validator(0.5, 100, 10, 20), validator(0.5, 100, 10, 20)];
        mark_dominated(&mut set);
        assert!(set[0].dominated);
        assert!(set[1].dominated);
    }

    #[test]
    fn strict_winner_is_not_dominated() {
        let mut set = vec![
            validator(1.0, 200, 20, 30),
            validator(0.5, 100, 10, 20),
            validator(0.9, 300, 5, 25),
        ];
        mark_dominated(&mut set);
        assert!(!set[0].dominated);
        assert!(set[1].dominated);
        // Beats the winner on self stake, so it survives.
        assert!(!set[2].dominated);
    }
}
