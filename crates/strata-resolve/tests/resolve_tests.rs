//! Integration tests for resolution
//!
//! Covers closure, cycle detection, hash verification, readability and
//! export conflicts through the public `resolve` entry point.

use std::collections::BTreeMap;
use std::rc::Rc;
use strata_resolve::{
    resolve, Configuration, EmptyFinder, ExportConflict, HashAlgorithm, ModuleDescriptor,
    ModuleFinder, ModuleHashes, ModuleReference, ResolutionError, StaticFinder,
};

fn module(descriptor: ModuleDescriptor) -> ModuleReference {
    let location = format!("mem:/{}", descriptor.name());
    ModuleReference::new(descriptor, location)
}

fn finder(references: Vec<ModuleReference>) -> Rc<dyn ModuleFinder> {
    Rc::new(StaticFinder::new(references).unwrap())
}

fn empty() -> Rc<dyn ModuleFinder> {
    Rc::new(EmptyFinder)
}

fn names(cf: &Configuration) -> Vec<String> {
    let mut names: Vec<String> = cf.modules().map(|m| m.name().to_string()).collect();
    names.sort();
    names
}

fn reads(cf: &Configuration, name: &str) -> Vec<String> {
    cf.reads(name)
        .unwrap()
        .into_iter()
        .map(|m| m.name().to_string())
        .collect()
}

#[test]
fn test_public_requires_scenario() {
    let before = finder(vec![
        module(ModuleDescriptor::builder("A").requires("B").build().unwrap()),
        module(ModuleDescriptor::builder("B").requires_public("C").build().unwrap()),
        module(ModuleDescriptor::builder("C").build().unwrap()),
    ]);

    let cf = resolve(before, None, empty(), ["A"]).unwrap();

    assert_eq!(names(&cf), vec!["A", "B", "C"]);
    assert_eq!(reads(&cf, "A"), vec!["B", "C"]);
    assert_eq!(reads(&cf, "B"), vec!["C"]);
    assert!(reads(&cf, "C").is_empty());
}

#[test]
fn test_cycle_scenario() {
    let before = finder(vec![
        module(ModuleDescriptor::builder("X").requires("Y").build().unwrap()),
        module(ModuleDescriptor::builder("Y").requires("X").build().unwrap()),
    ]);

    let err = resolve(before, None, empty(), ["X"]).unwrap_err();
    match err {
        ResolutionError::CycleDetected(path) => assert_eq!(path, "X -> Y -> X"),
        other => panic!("expected a cycle, got {}", other),
    }
}

#[test]
fn test_longer_cycle_path_starts_and_ends_at_same_module() {
    let before = finder(vec![
        module(ModuleDescriptor::builder("root").requires("a").build().unwrap()),
        module(ModuleDescriptor::builder("a").requires("b").build().unwrap()),
        module(ModuleDescriptor::builder("b").requires("c").build().unwrap()),
        module(ModuleDescriptor::builder("c").requires("a").build().unwrap()),
    ]);

    let err = resolve(before, None, empty(), ["root"]).unwrap_err();
    let ResolutionError::CycleDetected(path) = err else {
        panic!("expected a cycle");
    };
    assert_eq!(path, "a -> b -> c -> a");
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let before = finder(vec![
        module(ModuleDescriptor::builder("top").requires("left").requires("right").build().unwrap()),
        module(ModuleDescriptor::builder("left").requires("bottom").build().unwrap()),
        module(ModuleDescriptor::builder("right").requires("bottom").build().unwrap()),
        module(ModuleDescriptor::builder("bottom").build().unwrap()),
    ]);

    let cf = resolve(before, None, empty(), ["top"]).unwrap();
    assert_eq!(names(&cf), vec!["bottom", "left", "right", "top"]);
}

#[test]
fn test_export_conflict_scenario() {
    let before = finder(vec![
        module(ModuleDescriptor::builder("M1").exports("p").build().unwrap()),
        module(ModuleDescriptor::builder("M2").exports("p").build().unwrap()),
        module(
            ModuleDescriptor::builder("N")
                .requires("M1")
                .requires("M2")
                .build()
                .unwrap(),
        ),
    ]);

    let err = resolve(before, None, empty(), ["N"]).unwrap_err();
    match err {
        ResolutionError::ExportConflict(ExportConflict::DuplicateSupplier {
            first,
            second,
            package,
            module,
        }) => {
            assert_eq!((first.as_str(), second.as_str()), ("M1", "M2"));
            assert_eq!(package, "p");
            assert_eq!(module, "N");
        }
        other => panic!("expected an export conflict, got {}", other),
    }
}

#[test]
fn test_local_package_conflict() {
    let before = finder(vec![
        module(ModuleDescriptor::builder("lib").exports("shared").build().unwrap()),
        module(
            ModuleDescriptor::builder("app")
                .requires("lib")
                .package("shared")
                .build()
                .unwrap(),
        ),
    ]);

    let err = resolve(before, None, empty(), ["app"]).unwrap_err();
    assert_eq!(
        err.to_string(),
        "Module app contains package shared, module lib exports package shared to app"
    );
}

#[test]
fn test_qualified_exports_do_not_conflict_elsewhere() {
    let before = finder(vec![
        module(ModuleDescriptor::builder("m1").exports("p").build().unwrap()),
        module(
            ModuleDescriptor::builder("m2")
                .exports_to("p", ["other"])
                .build()
                .unwrap(),
        ),
        module(
            ModuleDescriptor::builder("n")
                .requires("m1")
                .requires("m2")
                .build()
                .unwrap(),
        ),
    ]);

    assert!(resolve(before, None, empty(), ["n"]).is_ok());
}

#[test]
fn test_hash_mismatch_scenario() {
    let mut recorded = BTreeMap::new();
    recorded.insert("B".to_string(), "deadbeef".to_string());

    let before = finder(vec![
        ModuleReference::from_bytes(
            ModuleDescriptor::builder("A")
                .requires("B")
                .hashes(ModuleHashes::new("SHA-256", recorded))
                .build()
                .unwrap(),
            "mem:/A",
            b"a".to_vec(),
        ),
        ModuleReference::from_bytes(
            ModuleDescriptor::builder("B").build().unwrap(),
            "mem:/B",
            b"cafebabe".to_vec(),
        ),
    ]);

    let err = resolve(before, None, empty(), ["A"]).unwrap_err();
    match err {
        ResolutionError::HashMismatch {
            module,
            dependency,
            recorded,
            actual,
        } => {
            assert_eq!(module, "A");
            assert_eq!(dependency, "B");
            assert_eq!(recorded, "deadbeef");
            assert_eq!(actual, HashAlgorithm::Sha256.digest(b"cafebabe"));
        }
        other => panic!("expected a hash mismatch, got {}", other),
    }
}

#[test]
fn test_matching_hash_resolves() {
    let mut recorded = BTreeMap::new();
    recorded.insert(
        "B".to_string(),
        HashAlgorithm::Sha512.digest(b"content").to_uppercase(),
    );

    let before = finder(vec![
        module(
            ModuleDescriptor::builder("A")
                .requires("B")
                .hashes(ModuleHashes::new("SHA-512", recorded))
                .build()
                .unwrap(),
        ),
        ModuleReference::from_bytes(
            ModuleDescriptor::builder("B").build().unwrap(),
            "mem:/B",
            b"content".to_vec(),
        ),
    ]);

    assert!(resolve(before, None, empty(), ["A"]).is_ok());
}

#[test]
fn test_hash_unavailable() {
    let mut recorded = BTreeMap::new();
    recorded.insert("B".to_string(), "00".to_string());

    let before = finder(vec![
        module(
            ModuleDescriptor::builder("A")
                .requires("B")
                .hashes(ModuleHashes::new("SHA-256", recorded.clone()))
                .build()
                .unwrap(),
        ),
        module(ModuleDescriptor::builder("B").build().unwrap()),
    ]);
    let err = resolve(before, None, empty(), ["A"]).unwrap_err();
    assert!(matches!(err, ResolutionError::HashUnavailable { ref dependency, .. } if dependency == "B"));

    // An algorithm nobody knows is just as unusable
    let before = finder(vec![
        module(
            ModuleDescriptor::builder("A")
                .requires("B")
                .hashes(ModuleHashes::new("MD5", recorded))
                .build()
                .unwrap(),
        ),
        ModuleReference::from_bytes(
            ModuleDescriptor::builder("B").build().unwrap(),
            "mem:/B",
            b"b".to_vec(),
        ),
    ]);
    let err = resolve(before, None, empty(), ["A"]).unwrap_err();
    assert!(matches!(err, ResolutionError::HashUnavailable { .. }));
}

#[test]
fn test_recorded_hash_for_unselected_module_is_ignored() {
    let mut recorded = BTreeMap::new();
    recorded.insert("ghost".to_string(), "00".to_string());

    let before = finder(vec![module(
        ModuleDescriptor::builder("A")
            .hashes(ModuleHashes::new("SHA-256", recorded))
            .build()
            .unwrap(),
    )]);

    assert!(resolve(before, None, empty(), ["A"]).is_ok());
}

#[test]
fn test_module_not_found_messages() {
    let before = finder(vec![module(
        ModuleDescriptor::builder("app").requires("lib").build().unwrap(),
    )]);

    let err = resolve(Rc::clone(&before), None, empty(), ["missing"]).unwrap_err();
    assert_eq!(err.to_string(), "Module missing not found");

    let err = resolve(before, None, empty(), ["app"]).unwrap_err();
    assert_eq!(err.to_string(), "Module lib not found, required by app");
}

#[test]
fn test_bad_roots() {
    assert!(matches!(
        resolve(empty(), None, empty(), Vec::<String>::new()),
        Err(ResolutionError::NoRoots)
    ));
    assert!(matches!(
        resolve(empty(), None, empty(), ["not a name"]),
        Err(ResolutionError::InvalidRoot(_))
    ));
}

#[test]
fn test_resolution_is_deterministic() {
    let make = || {
        finder(vec![
            module(ModuleDescriptor::builder("app").requires("b").requires("a").build().unwrap()),
            module(ModuleDescriptor::builder("a").requires("c").build().unwrap()),
            module(ModuleDescriptor::builder("b").requires("c").build().unwrap()),
            module(ModuleDescriptor::builder("c").build().unwrap()),
        ])
    };

    let first = resolve(make(), None, empty(), ["app"]).unwrap();
    let second = resolve(make(), None, empty(), ["app"]).unwrap();

    let order = |cf: &Configuration| -> Vec<String> {
        cf.modules().map(|m| m.name().to_string()).collect()
    };
    assert_eq!(order(&first), order(&second));
    assert_eq!(first.modules().next().unwrap().name(), "app");
}

#[test]
fn test_reads_contain_requires() {
    let before = finder(vec![
        module(
            ModuleDescriptor::builder("app")
                .requires("a")
                .requires_public("b")
                .build()
                .unwrap(),
        ),
        module(ModuleDescriptor::builder("a").requires("b").build().unwrap()),
        module(ModuleDescriptor::builder("b").build().unwrap()),
    ]);

    let cf = resolve(before, None, empty(), ["app"]).unwrap();
    for descriptor in cf.descriptors() {
        let read: Vec<&str> = cf
            .read_dependences(descriptor)
            .unwrap()
            .into_iter()
            .map(|d| d.name())
            .collect();
        for requires in descriptor.requires() {
            assert!(read.contains(&requires.name()));
        }
    }
}

#[test]
fn test_after_finder_used_when_before_misses() {
    let before = finder(vec![module(
        ModuleDescriptor::builder("app").requires("lib").build().unwrap(),
    )]);
    let after = finder(vec![ModuleReference::new(
        ModuleDescriptor::builder("lib").build().unwrap(),
        "mem:/after/lib",
    )]);

    let cf = resolve(before, None, after, ["app"]).unwrap();
    assert_eq!(cf.find_module("lib").unwrap().location(), "mem:/after/lib");
}

#[test]
fn test_finder_errors_propagate() {
    struct Failing;

    impl ModuleFinder for Failing {
        fn find(&self, name: &str) -> Result<Option<ModuleReference>, strata_resolve::FinderError> {
            Err(strata_resolve::FinderError::InvalidModule {
                path: name.into(),
                reason: "unreadable".to_string(),
            })
        }

        fn find_all(&self) -> Result<Vec<ModuleReference>, strata_resolve::FinderError> {
            Ok(Vec::new())
        }
    }

    let err = resolve(Rc::new(Failing), None, empty(), ["app"]).unwrap_err();
    assert!(matches!(err, ResolutionError::Finder(_)));
}
