//! Resolver tests against a real object file: the test executable itself.

use std::path::PathBuf;
use std::sync::Arc;

use profscope::symbolization::ObjectSymbols;
use profscope::{ObjectSymbolLocator, ResolveError, SymbolLocator};

fn test_exe() -> PathBuf {
    std::env::current_exe().expect("test executable path")
}

#[test]
fn test_executable_has_a_symbol_table() {
    let symbols = ObjectSymbols::load(&test_exe()).expect("load test executable");
    assert!(symbols.len() > 0);
}

#[test]
fn locator_construction_fails_for_missing_executable() {
    assert!(matches!(
        ObjectSymbolLocator::with_maps("no/such/binary", ""),
        Err(ResolveError::OpenFileFailed { .. })
    ));
}

#[test]
fn empty_batch_is_rejected() {
    let locator = ObjectSymbolLocator::with_maps(test_exe(), "").unwrap();
    assert!(matches!(
        locator.search_symbols(&[]),
        Err(ResolveError::NoAddr)
    ));
}

#[test]
fn batch_absorbs_unresolvable_addresses() {
    let locator = ObjectSymbolLocator::with_maps(test_exe(), "").unwrap();
    // 0x1 sits below any plausible symbol; it must come back unresolved
    // rather than failing the batch.
    let mapping = locator.search_symbols(&[0x1]).unwrap();
    assert_eq!(mapping.len(), 1);
    assert!(mapping.contains_key(&0x1));
}

#[test]
fn concurrent_batches_share_one_locator() {
    let locator = Arc::new(ObjectSymbolLocator::with_maps(test_exe(), "").unwrap());
    let handles: Vec<_> = (0..4)
        .map(|i| {
            let locator = Arc::clone(&locator);
            std::thread::spawn(move || {
                let addrs: Vec<u64> = (1..32).map(|n| n * 0x40 + i).collect();
                locator.search_symbols(&addrs).unwrap()
            })
        })
        .collect();
    for handle in handles {
        let mapping = handle.join().unwrap();
        assert_eq!(mapping.len(), 31);
    }
}
