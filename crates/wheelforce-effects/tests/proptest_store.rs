//! Property tests for the effect store state machine and aggregation.

use proptest::prelude::*;

use wheelforce_effects::{
    ConditionParams, EffectDef, EffectKind, EffectStore, Envelope, Replay, MAX_EFFECTS,
};
use wheelforce_hid_slot_protocol::slot_ids::{self, SLOT_COUNT};
use wheelforce_hid_slot_protocol::SlotParameters;

fn arb_condition() -> impl Strategy<Value = ConditionParams> {
    (
        any::<i16>(),
        any::<u16>(),
        any::<i16>(),
        any::<i16>(),
        any::<u16>(),
        any::<u16>(),
    )
        .prop_map(
            |(center, deadband, left_coeff, right_coeff, left_saturation, right_saturation)| {
                ConditionParams {
                    center,
                    deadband,
                    left_coeff,
                    right_coeff,
                    left_saturation,
                    right_saturation,
                }
            },
        )
}

fn spring_def(condition: ConditionParams) -> EffectDef {
    EffectDef {
        direction: 0,
        replay: Replay::default(),
        kind: EffectKind::Spring(condition),
    }
}

fn render(store: &mut EffectStore, now_ms: u64) -> [SlotParameters; SLOT_COUNT] {
    let mut channels = [SlotParameters::NEUTRAL; SLOT_COUNT];
    store.render(now_ms, &mut channels);
    channels
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(500))]

    /// Permuting the set of concurrently playing spring effects must not
    /// change the aggregated slot parameters.
    #[test]
    fn prop_spring_aggregation_order_independent(
        conditions in proptest::collection::vec(arb_condition(), 1..8),
        seed in any::<u64>(),
    ) {
        let mut forward = EffectStore::new();
        for c in &conditions {
            let id = forward.insert(spring_def(*c)).unwrap();
            forward.play(id, 1, 0).unwrap();
        }

        // Fisher-Yates with a cheap xorshift; the order the effects are
        // uploaded and started in must not matter.
        let mut shuffled = conditions.clone();
        let mut state = seed | 1;
        for i in (1..shuffled.len()).rev() {
            state ^= state << 13;
            state ^= state >> 7;
            state ^= state << 17;
            shuffled.swap(i, (state % (i as u64 + 1)) as usize);
        }
        let mut permuted = EffectStore::new();
        for c in &shuffled {
            let id = permuted.insert(spring_def(*c)).unwrap();
            permuted.play(id, 1, 0).unwrap();
        }

        prop_assert_eq!(render(&mut forward, 5), render(&mut permuted, 5));
    }

    /// Effects that were never started contribute nothing, no matter what
    /// their definitions say.
    #[test]
    fn prop_idle_effects_contribute_nothing(
        conditions in proptest::collection::vec(arb_condition(), 0..MAX_EFFECTS),
        now in 0u64..1_000_000,
    ) {
        let mut store = EffectStore::new();
        for c in &conditions {
            store.insert(spring_def(*c)).unwrap();
        }
        let channels = render(&mut store, now);
        prop_assert_eq!(channels, [SlotParameters::NEUTRAL; SLOT_COUNT]);
        prop_assert_eq!(store.active_effects(), 0);
    }

    /// Every repeat re-applies the start delay, so a bounded effect with
    /// `n` repeats retires exactly at `n * (delay + length)` when ticked
    /// every millisecond.
    #[test]
    fn prop_repeats_expire_on_schedule(
        level in 1i16..=i16::MAX,
        delay in 0u32..50,
        length in 1u32..50,
        count in 1u32..4,
    ) {
        let def = EffectDef {
            direction: 0,
            replay: Replay { delay_ms: delay, length_ms: length },
            kind: EffectKind::Constant { level, envelope: Envelope::default() },
        };
        let mut store = EffectStore::new();
        let id = store.insert(def).unwrap();
        store.play(id, count, 0).unwrap();

        let end = u64::from(count) * (u64::from(delay) + u64::from(length));
        let mut channels = [SlotParameters::NEUTRAL; SLOT_COUNT];
        for now in 0..end {
            prop_assert_eq!(store.render(now, &mut channels), 1, "still started at {}", now);
        }
        prop_assert_eq!(store.render(end, &mut channels), 0);
        prop_assert_eq!(channels[slot_ids::DIRECT as usize].level, 0);
    }
}
