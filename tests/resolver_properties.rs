//! Contact resolver properties

use parley::contacts::{resolver::score, Contact, ContactResolver, Resolution};
use proptest::prelude::*;

fn directory(names: &[String]) -> Vec<Contact> {
    names
        .iter()
        .enumerate()
        .map(|(i, n)| Contact::new(format!("id{}", i), n.clone()))
        .collect()
}

proptest! {
    #[test]
    fn resolve_is_deterministic(
        query in "[a-zA-Z ]{0,12}",
        names in prop::collection::vec("[A-Z][a-z]{1,8}( [A-Z][a-z]{1,8})?", 0..8),
    ) {
        let resolver = ContactResolver::default();
        let contacts = directory(&names);
        prop_assert_eq!(
            resolver.resolve(&query, &contacts),
            resolver.resolve(&query, &contacts)
        );
    }

    #[test]
    fn score_stays_in_unit_interval(query in "\\PC{0,16}", candidate in "\\PC{0,16}") {
        let s = score(&query, &candidate);
        prop_assert!((0.0..=1.0).contains(&s), "score {} out of range", s);
    }

    #[test]
    fn exact_name_always_matches(name in "[A-Z][a-z]{2,8} [A-Z][a-z]{2,8}") {
        let contacts = vec![Contact::new("x", name.clone()), Contact::new("y", "Zz Qq")];
        let resolution = ContactResolver::default().resolve(&name, &contacts);
        prop_assert_eq!(resolution.contact().map(|c| c.id.as_str()), Some("x"));
    }

    #[test]
    fn ambiguous_lists_are_bounded(
        names in prop::collection::vec("Maria [A-Z][a-z]{3,6}", 2..10),
    ) {
        let resolver = ContactResolver::default();
        if let Resolution::Ambiguous(options) = resolver.resolve("maria", &directory(&names)) {
            prop_assert!(options.len() > 1);
            prop_assert!(options.len() <= resolver.config().max_ambiguous);
        }
    }
}

#[test]
fn test_two_marias_are_ambiguous() {
    let contacts = vec![
        Contact::new("id1", "Maria Silva"),
        Contact::new("id2", "Maria Souza"),
    ];
    match ContactResolver::default().resolve("maria", &contacts) {
        Resolution::Ambiguous(options) => {
            let ids: Vec<&str> = options.iter().map(|c| c.id.as_str()).collect();
            assert_eq!(ids, vec!["id1", "id2"]);
        }
        other => panic!("expected ambiguity, got {:?}", other),
    }
}

#[test]
fn test_accents_do_not_matter() {
    let contacts = vec![Contact::new("id1", "João Gonçalves")];
    let resolution = ContactResolver::default().resolve("joao goncalves", &contacts);
    assert_eq!(resolution.contact().map(|c| c.id.as_str()), Some("id1"));
}
