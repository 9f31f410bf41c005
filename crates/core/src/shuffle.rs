//! Permutations for question and option ordering.
//!
//! Orderings are generated once, when an attempt is created or restarted, and
//! persisted with the attempt. Nothing here is seeded from attempt data.

use rand::Rng;

use crate::model::Question;

/// Unbiased Fisher–Yates permutation of `0..n`.
///
/// `n == 0` yields an empty vector.
pub fn generate_permutation<R: Rng + ?Sized>(n: usize, rng: &mut R) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..n).collect();
    for i in (1..n).rev() {
        let j = rng.random_range(0..=i);
        perm.swap(i, j);
    }
    perm
}

/// Returns true when `candidate` contains every index in `0..n` exactly once.
#[must_use]
pub fn is_permutation(candidate: &[usize], n: usize) -> bool {
    if candidate.len() != n {
        return false;
    }
    let mut seen = vec![false; n];
    for &index in candidate {
        match seen.get_mut(index) {
            Some(slot) if !*slot => *slot = true,
            _ => return false,
        }
    }
    true
}

/// Presentation order over `selected`, plus one option order per displayed position.
///
/// `option_order[i]` permutes the options of `selected[presentation_order[i]]`.
pub fn generate_orderings<R: Rng + ?Sized>(
    selected: &[Question],
    rng: &mut R,
) -> (Vec<usize>, Vec<Vec<usize>>) {
    let presentation_order = generate_permutation(selected.len(), rng);
    let option_order = presentation_order
        .iter()
        .map(|&index| generate_permutation(selected[index].option_count(), rng))
        .collect();
    (presentation_order, option_order)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::QuestionId;
    use proptest::prelude::*;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    proptest! {
        #[test]
        fn generated_permutation_covers_every_index(n in 0usize..200, seed in any::<u64>()) {
            let mut rng = StdRng::seed_from_u64(seed);
            let perm = generate_permutation(n, &mut rng);
            prop_assert!(is_permutation(&perm, n));
        }
    }

    #[test]
    fn empty_permutation() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(generate_permutation(0, &mut rng).is_empty());
        assert_eq!(generate_permutation(1, &mut rng), vec![0]);
    }

    #[test]
    fn is_permutation_rejects_duplicates_and_out_of_range() {
        assert!(is_permutation(&[2, 0, 1], 3));
        assert!(!is_permutation(&[0, 0, 1], 3));
        assert!(!is_permutation(&[0, 1, 3], 3));
        assert!(!is_permutation(&[0, 1], 3));
    }

    #[test]
    fn option_orders_follow_presentation_order() {
        let selected: Vec<Question> = [2_usize, 3, 5]
            .iter()
            .enumerate()
            .map(|(i, &n)| {
                let options = (0..n).map(|o| format!("o{o}")).collect();
                Question::new(QuestionId::new(i as u64 + 1), "Q", options, 0).unwrap()
            })
            .collect();
        let mut rng = StdRng::seed_from_u64(7);

        let (presentation, options) = generate_orderings(&selected, &mut rng);

        assert!(is_permutation(&presentation, 3));
        for (position, &index) in presentation.iter().enumerate() {
            assert!(is_permutation(&options[position], selected[index].option_count()));
        }
    }
}
