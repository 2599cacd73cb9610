use super::*;

fn deps(entries: &[(&str, &[&str])]) -> BTreeMap<PackageName, Vec<PackageName>> {
    entries
        .iter()
        .map(|(pkg, ds)| {
            (
                PackageName::new(*pkg),
                ds.iter().map(|d| PackageName::new(*d)).collect(),
            )
        })
        .collect()
}

#[test]
fn test_dependencies_order_first() {
    let graph = PackageGraph::build(&deps(&[
        ("billing", &["core"]),
        ("crm", &["core"]),
        ("core", &[]),
    ]))
    .unwrap();

    let order = graph.topological_order().unwrap();
    assert_eq!(order[0], "core");
    assert!(order.iter().position(|p| p == "billing").unwrap() > 0);
    assert_eq!(order.len(), 3);
}

#[test]
fn test_independent_packages_break_ties_lexicographically() {
    let graph = PackageGraph::build(&deps(&[("zeta", &[]), ("alpha", &[]), ("mid", &[])])).unwrap();

    let order = graph.topological_order().unwrap();
    assert_eq!(order, vec!["alpha", "mid", "zeta"]);
}

#[test]
fn test_chain_ordering() {
    let graph = PackageGraph::build(&deps(&[
        ("c", &["b"]),
        ("b", &["a"]),
        ("a", &[]),
    ]))
    .unwrap();

    assert_eq!(graph.topological_order().unwrap(), vec!["a", "b", "c"]);
}

#[test]
fn test_diamond_is_deterministic() {
    let build = || {
        PackageGraph::build(&deps(&[
            ("top", &["left", "right"]),
            ("left", &["base"]),
            ("right", &["base"]),
            ("base", &[]),
        ]))
        .unwrap()
        .topological_order()
        .unwrap()
    };

    let first = build();
    assert_eq!(first, vec!["base", "left", "right", "top"]);
    for _ in 0..5 {
        assert_eq!(build(), first);
    }
}

#[test]
fn test_cycle_detected() {
    let result = PackageGraph::build(&deps(&[("a", &["b"]), ("b", &["a"])]));
    match result {
        Err(CoreError::DependencyCycle { cycle }) => {
            assert!(cycle.contains("a"));
            assert!(cycle.contains("b"));
        }
        other => panic!("expected DependencyCycle, got {:?}", other.map(|_| ())),
    }
}

#[test]
fn test_self_dependency_is_a_cycle() {
    let result = PackageGraph::build(&deps(&[("a", &["a"])]));
    assert!(matches!(result, Err(CoreError::DependencyCycle { .. })));
}

#[test]
fn test_direct_dependencies() {
    let graph = PackageGraph::build(&deps(&[("crm", &["core"]), ("core", &[])])).unwrap();

    let ds = graph.dependencies("crm");
    assert_eq!(ds, vec![PackageName::new("core")]);
    assert!(graph.dependencies("core").is_empty());
    assert!(graph.dependencies("missing").is_empty());
}

#[test]
fn test_contains() {
    let graph = PackageGraph::build(&deps(&[("core", &[])])).unwrap();
    assert!(graph.contains("core"));
    assert!(!graph.contains("crm"));
}
