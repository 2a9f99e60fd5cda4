//! Call-order tests: priorities, needs/provides, cycles and unconstrained
//! placement, plus property-based checks of the resolver through the
//! registry.


use herald_hooks::prelude::*;
use test_utils::{CallLog, call_order, record};

// ═══════════════════════════════════════════════════════════════════════════════
// PRIORITY
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn higher_priority_runs_first_ties_by_registration_order() {
    let registry = Registry::new();
    let log = CallLog::new();
    record(&registry, "h", &log, "a", RegisterOptions::new());
    record(&registry, "h", &log, "b", RegisterOptions::new().priority(10));
    record(&registry, "h", &log, "c", RegisterOptions::new());
    record(&registry, "h", &log, "d", RegisterOptions::new().priority(10));
    record(&registry, "h", &log, "e", RegisterOptions::new().priority(-1));

    registry.trigger("h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["b", "d", "a", "c", "e"]);
}

// ═══════════════════════════════════════════════════════════════════════════════
// NEEDS / PROVIDES
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn providers_run_before_needers() {
    let registry = Registry::new();
    let log = CallLog::new();
    record(&registry, "h", &log, "consumer", RegisterOptions::new().needs(["db"]));
    record(&registry, "h", &log, "producer", RegisterOptions::new().provides(["db"]));

    registry.trigger("h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["producer", "consumer"]);
}

#[test]
fn complex_dependency_chain() {
    let registry = Registry::new();
    let log = CallLog::new();
    let chain: [(&[&str], &str); 6] = [
        (&["1"], "0"),
        (&["2", "3"], "1"),
        (&["5"], "2"),
        (&["5"], "3"),
        (&["0"], "4"),
        (&[], "5"),
    ];
    for (index, (needs, provides)) in chain.iter().enumerate() {
        record(
            &registry,
            "h",
            &log,
            &index.to_string(),
            RegisterOptions::new()
                .needs(needs.to_vec())
                .provides([*provides]),
        );
    }

    registry.trigger("h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["5", "3", "2", "1", "0", "4"]);
}

#[test]
fn cyclic_registration_is_rejected_and_not_added() {
    let registry = Registry::new();
    let log = CallLog::new();
    for index in 0..4 {
        record(
            &registry,
            "h",
            &log,
            "x",
            RegisterOptions::new()
                .needs([(index + 1).to_string()])
                .provides([index.to_string()]),
        );
    }
    let err = registry
        .register(
            "h",
            log.recorder("cycle"),
            RegisterOptions::new().needs(["0"]).provides(["4"]),
        )
        .unwrap_err();
    assert!(matches!(err, RegistryError::CannotResolveDependencies { .. }));
    assert_eq!(registry.registrations("h").len(), 4);
    assert_eq!(registry.unmet_dependencies("h"), NameSet::from(["4"]));
}

#[test]
fn self_provided_need_is_a_cycle() {
    let registry = Registry::new();
    let err = registry
        .register(
            "fresh",
            |_ctx: &HandlerContext<'_>| Ok(()),
            RegisterOptions::new().needs(["a"]).provides(["a"]),
        )
        .unwrap_err();
    assert!(matches!(err, RegistryError::CannotResolveDependencies { .. }));
    assert!(!registry.contains_hook("fresh"));
}

#[test]
fn unmet_dependencies_fail_before_any_handler() {
    let registry = Registry::new();
    let log = CallLog::new();
    record(&registry, "h", &log, "free", RegisterOptions::new().priority(100));
    record(&registry, "h", &log, "needy", RegisterOptions::new().needs(["missing"]));

    let err = registry.trigger("h", Args::new()).unwrap_err();
    assert!(matches!(
        err,
        TriggerError::UnmetDependencies { ref missing, .. } if missing == &NameSet::from(["missing"])
    ));
    assert!(log.is_empty());
}

#[test]
fn no_op_provides_without_running() {
    let registry = Registry::new();
    let log = CallLog::new();
    record(&registry, "h", &log, "needy", RegisterOptions::new().needs(["db"]));
    let placeholder = registry
        .register_no_op("h", RegisterOptions::new().provides(["db"]))
        .unwrap();

    registry.trigger("h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["needy"]);
    assert_eq!(registry.no_op_registrations("h").len(), 1);
    assert!(placeholder.registration().is_no_op());

    registry.unregister(&placeholder).unwrap();
    assert!(matches!(
        registry.trigger("h", Args::new()),
        Err(TriggerError::UnmetDependencies { .. })
    ));
}

// ═══════════════════════════════════════════════════════════════════════════════
// UNREGISTRATION
// ═══════════════════════════════════════════════════════════════════════════════

#[test]
fn unregister_removes_exactly_one() {
    let registry = Registry::new();
    let log = CallLog::new();
    let first = record(&registry, "h", &log, "a", RegisterOptions::new());
    record(&registry, "h", &log, "b", RegisterOptions::new());

    registry.unregister(&first).unwrap();
    assert!(!first.is_active());
    assert_eq!(registry.registrations("h").len(), 1);

    assert!(matches!(
        first.unregister(&registry),
        Err(RegistryError::NotRegistered { .. })
    ));
    assert_eq!(registry.registrations("h").len(), 1);

    registry.trigger("h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["b"]);
}

#[test]
fn unregister_all_is_idempotent() {
    let registry = Registry::new();
    let log = CallLog::new();
    registry.unregister_all("never-created").unwrap();

    let handle = record(&registry, "h", &log, "a", RegisterOptions::new());
    registry.unregister_all("h").unwrap();
    registry.unregister_all("h").unwrap();
    assert!(registry.registrations("h").is_empty());
    assert!(!handle.is_active());
}

// ═══════════════════════════════════════════════════════════════════════════════
// UNCONSTRAINED PRIORITY
// ═══════════════════════════════════════════════════════════════════════════════

fn unconstrained_scenario(registry: &Registry, log: &CallLog) {
    record(registry, "s.h", log, "free1", RegisterOptions::new());
    record(registry, "s.h", log, "needy", RegisterOptions::new().needs(["x"]));
    record(registry, "s.h", log, "free2", RegisterOptions::new());
    record(registry, "s.h", log, "provider", RegisterOptions::new().provides(["x"]));
}

#[test]
fn unconstrained_first_and_last() {
    let registry = Registry::new();
    let log = CallLog::new();
    unconstrained_scenario(&registry, &log);

    registry
        .set_unconstrained_priority("s", UnconstrainedPriority::First)
        .unwrap();
    registry.trigger("s.h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["free1", "free2", "provider", "needy"]);

    log.clear();
    registry
        .set_unconstrained_priority("s", UnconstrainedPriority::Last)
        .unwrap();
    assert_eq!(registry.unconstrained_priority("s"), UnconstrainedPriority::Last);
    registry.trigger("s.h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["provider", "needy", "free2", "free1"]);

    log.clear();
    registry
        .set_unconstrained_priority("s", UnconstrainedPriority::DontCare)
        .unwrap();
    registry.trigger("s.h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["free1", "free2", "provider", "needy"]);
}

#[test]
fn new_subscopes_inherit_unconstrained_priority() {
    let registry = Registry::new();
    registry
        .set_unconstrained_priority("s", UnconstrainedPriority::Last)
        .unwrap();
    let log = CallLog::new();
    unconstrained_scenario(&registry, &log);
    registry.trigger("s.h", Args::new()).unwrap();
    assert_eq!(log.entries(), vec!["provider", "needy", "free2", "free1"]);
    assert_eq!(
        registry.unconstrained_priority("s.deeper"),
        UnconstrainedPriority::Last
    );
}

// ═══════════════════════════════════════════════════════════════════════════════
// PROPERTY-BASED
// ═══════════════════════════════════════════════════════════════════════════════

mod prop_tests {
    use std::collections::{BTreeSet, HashMap};

    use herald_hooks::prelude::*;
    use proptest::prelude::*;

    type Shape = (i32, BTreeSet<u8>, BTreeSet<u8>);

    fn keys(set: &BTreeSet<u8>) -> Vec<String> {
        set.iter().map(|key| format!("k{key}")).collect()
    }

    fn arb_shapes() -> impl Strategy<Value = Vec<Shape>> {
        prop::collection::vec(
            (
                0..3i32,
                prop::collection::btree_set(0..5u8, 0..3),
                prop::collection::btree_set(0..5u8, 0..3),
            ),
            1..10,
        )
    }

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(256))]

        /// Every accepted set is ordered topologically; every rejected
        /// registration leaves the count unchanged.
        #[test]
        fn prop_order_respects_dependencies(shapes in arb_shapes()) {
            let registry = Registry::new();
            let mut accepted = 0;
            for (priority, needs, provides) in &shapes {
                let before = registry.registrations("h").len();
                let result = registry.register(
                    "h",
                    |_ctx: &HandlerContext<'_>| Ok(()),
                    RegisterOptions::new()
                        .priority(*priority)
                        .needs(keys(needs))
                        .provides(keys(provides)),
                );
                match result {
                    Ok(_) => accepted += 1,
                    Err(err) => {
                        let is_cycle = matches!(err, RegistryError::CannotResolveDependencies { .. });
                        prop_assert!(is_cycle);
                        prop_assert_eq!(registry.registrations("h").len(), before);
                    }
                }
            }

            let order = registry.registrations("h");
            prop_assert_eq!(order.len(), accepted);
            let position: HashMap<RegistrationId, usize> = order
                .iter()
                .enumerate()
                .map(|(index, registration)| (registration.id(), index))
                .collect();
            for needer in &order {
                for key in needer.needs().iter() {
                    for provider in order.iter().filter(|r| r.provides().contains(key)) {
                        if provider.id() != needer.id() {
                            prop_assert!(position[&provider.id()] < position[&needer.id()]);
                        }
                    }
                }
            }
        }

        /// Without needs/provides the order is priority descending, then
        /// registration order.
        #[test]
        fn prop_unconstrained_order_is_priority_order(priorities in prop::collection::vec(-5..5i32, 0..12)) {
            let registry = Registry::new();
            for priority in &priorities {
                registry
                    .register("h", |_ctx: &HandlerContext<'_>| Ok(()), RegisterOptions::new().priority(*priority))
                    .unwrap();
            }
            let order: Vec<(i32, RegistrationId)> = registry
                .registrations("h")
                .iter()
                .map(|registration| (registration.priority(), registration.id()))
                .collect();
            let mut expected = order.clone();
            expected.sort_by(|a, b| b.0.cmp(&a.0).then(a.1.cmp(&b.1)));
            prop_assert_eq!(order, expected);
        }
    }
}

#[test]
fn call_order_matches_registrations() {
    let registry = Registry::new();
    let log = CallLog::new();
    let a = record(&registry, "h", &log, "a", RegisterOptions::new());
    let b = record(&registry, "h", &log, "b", RegisterOptions::new().priority(1));
    assert_eq!(call_order(&registry, "h"), vec![b.id(), a.id()]);
}
