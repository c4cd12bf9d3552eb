use liso::server::registry::{Registry, LISTENER, WAKER};

#[test]
fn test_registry_insert_and_get() {
    let mut reg = Registry::new(4);
    let a = reg.insert("a").unwrap();
    let b = reg.insert("b").unwrap();

    assert_ne!(a, b);
    assert_eq!(reg.get(a), Some(&"a"));
    assert_eq!(reg.get(b), Some(&"b"));
    assert_eq!(reg.len(), 2);
}

#[test]
fn test_registry_rejects_when_full() {
    let mut reg = Registry::new(2);
    reg.insert(1).unwrap();
    reg.insert(2).unwrap();

    assert_eq!(reg.len(), reg.capacity());
    assert_eq!(reg.insert(3), Err(3));
    assert_eq!(reg.len(), 2);
}

#[test]
fn test_registry_remove_frees_slot() {
    let mut reg = Registry::new(1);
    let token = reg.insert("first").unwrap();
    assert_eq!(reg.remove(token), Some("first"));
    assert!(reg.is_empty());

    let again = reg.insert("second").unwrap();
    assert_eq!(reg.get(again), Some(&"second"));
}

#[test]
fn test_registry_stale_token_does_not_resolve() {
    let mut reg = Registry::new(1);
    let old = reg.insert("first").unwrap();
    reg.remove(old);
    let new = reg.insert("second").unwrap();

    assert_ne!(old, new);
    assert!(reg.get(old).is_none());
    assert!(reg.get_mut(old).is_none());
    assert_eq!(reg.remove(old), None);
    assert_eq!(reg.get(new), Some(&"second"));
}

#[test]
fn test_registry_double_remove() {
    let mut reg = Registry::new(2);
    let token = reg.insert(7).unwrap();
    assert_eq!(reg.remove(token), Some(7));
    assert_eq!(reg.remove(token), None);
    assert_eq!(reg.len(), 0);
}

#[test]
fn test_registry_get_mut() {
    let mut reg = Registry::new(2);
    let token = reg.insert(String::from("a")).unwrap();
    reg.get_mut(token).unwrap().push('b');
    assert_eq!(reg.get(token).map(String::as_str), Some("ab"));
}

#[test]
fn test_registry_tokens_lists_live_entries() {
    let mut reg = Registry::new(3);
    let a = reg.insert('a').unwrap();
    let b = reg.insert('b').unwrap();
    let c = reg.insert('c').unwrap();
    reg.remove(b);

    let tokens = reg.tokens();
    assert_eq!(tokens.len(), 2);
    assert!(tokens.contains(&a));
    assert!(tokens.contains(&c));
    assert!(!tokens.contains(&LISTENER));
    assert!(!tokens.contains(&WAKER));
}
