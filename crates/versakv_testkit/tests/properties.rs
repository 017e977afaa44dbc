//! Property tests: random workloads against a model.

use proptest::prelude::*;
use versakv_core::Engine;
use versakv_testkit::prelude::*;

proptest! {
    #![proptest_config(PropTestConfig::default().to_proptest_config())]

    #[test]
    fn engine_matches_model(workload in workload_strategy(1, 20)) {
        let engine = Engine::open_in_memory();
        let mut harness = ModelHarness::new(&engine);

        for plan in &workload {
            harness.run(plan).unwrap();
        }

        harness.verify_all().unwrap();
        harness.verify_chains();
        prop_assert_eq!(engine.manager().active_count(), 0);
    }

    #[test]
    fn stats_count_every_transaction(workload in workload_strategy(1, 20)) {
        let engine = Engine::open_in_memory();
        let mut harness = ModelHarness::new(&engine);

        let mut committed = 0;
        for plan in &workload {
            if harness.run(plan).unwrap() == PlanOutcome::Committed {
                committed += 1;
            }
        }

        let stats = engine.stats().snapshot();
        prop_assert_eq!(stats.begins, workload.len() as u64);
        prop_assert_eq!(stats.commits, committed);
        prop_assert_eq!(stats.commits + stats.aborts, stats.begins);
    }
}
