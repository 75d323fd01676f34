use proptest::prelude::*;
use std::collections::BTreeSet;
use tracker_core::order::siblings::{append, move_to, remove_by_id, replace_all};
use tracker_core::Topic;

#[derive(Debug, Clone)]
enum Op {
    Append,
    Remove(usize),
    Move(usize, usize),
    Rotate(usize),
}

fn op_strategy() -> impl Strategy<Value = Op> {
    prop_oneof![
        Just(Op::Append),
        any::<usize>().prop_map(Op::Remove),
        (any::<usize>(), any::<usize>()).prop_map(|(from, to)| Op::Move(from, to)),
        any::<usize>().prop_map(Op::Rotate),
    ]
}

fn ids(siblings: &[Topic]) -> BTreeSet<String> {
    siblings.iter().map(|topic| topic.id.clone()).collect()
}

fn assert_positional(siblings: &[Topic]) -> Result<(), TestCaseError> {
    for (index, topic) in siblings.iter().enumerate() {
        prop_assert_eq!(topic.order as usize, index);
    }
    Ok(())
}

proptest! {
    #![proptest_config(ProptestConfig {
        cases: 128,
        rng_seed: proptest::test_runner::RngSeed::Fixed(0),
        failure_persistence: None,
        .. ProptestConfig::default()
    })]

    #[test]
    fn orders_stay_dense_after_any_operation_sequence(
        ops in proptest::collection::vec(op_strategy(), 0..40)
    ) {
        let mut siblings: Vec<Topic> = Vec::new();
        let mut next_id = 0usize;

        for op in ops {
            match op {
                Op::Append => {
                    next_id += 1;
                    let topic = Topic::with_id(format!("t-{next_id}"), "T").unwrap();
                    append(&mut siblings, topic);
                }
                Op::Remove(pick) if !siblings.is_empty() => {
                    let id = siblings[pick % siblings.len()].id.clone();
                    let removed = remove_by_id(&mut siblings, &id).unwrap();
                    prop_assert_eq!(removed.id, id);
                }
                Op::Move(pick, to) if !siblings.is_empty() => {
                    let len = siblings.len();
                    let id = siblings[pick % len].id.clone();
                    move_to(&mut siblings, &id, to % len).unwrap();
                }
                Op::Rotate(by) if !siblings.is_empty() => {
                    let mut shuffled = std::mem::take(&mut siblings);
                    let len = shuffled.len();
                    shuffled.rotate_left(by % len);
                    siblings = replace_all(shuffled);
                }
                _ => {}
            }
            assert_positional(&siblings)?;
        }
    }

    #[test]
    fn move_is_a_pure_permutation(
        len in 1usize..20,
        pick in any::<usize>(),
        to in any::<usize>(),
    ) {
        let mut siblings: Vec<Topic> = Vec::new();
        for index in 0..len {
            append(&mut siblings, Topic::with_id(format!("t-{index}"), "T").unwrap());
        }
        let before = ids(&siblings);
        let id = siblings[pick % len].id.clone();
        let destination = to % len;

        move_to(&mut siblings, &id, destination).unwrap();

        prop_assert_eq!(ids(&siblings), before);
        prop_assert_eq!(&siblings[destination].id, &id);
        assert_positional(&siblings)?;
    }

    #[test]
    fn out_of_range_move_changes_nothing(len in 0usize..10, extra in 0usize..5) {
        let mut siblings: Vec<Topic> = Vec::new();
        for index in 0..len {
            append(&mut siblings, Topic::with_id(format!("t-{index}"), "T").unwrap());
        }
        let before = siblings.clone();
        let id = siblings.first().map_or_else(|| "t-none".to_string(), |topic| topic.id.clone());

        prop_assert!(move_to(&mut siblings, &id, len + extra).is_err());
        prop_assert_eq!(siblings, before);
    }
}
