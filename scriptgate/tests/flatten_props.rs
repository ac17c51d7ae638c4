//! Property tests for directive-block flattening and lookup.

use proptest::prelude::*;
use proptest::test_runner::Config as ProptestConfig;

use scriptgate::{flatten, HandlerStatus, ParameterBlock};
use scriptrt::ScriptValue;

fn arb_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9-]{0,6}"
}

fn arb_value() -> impl Strategy<Value = String> {
    // Printable, may itself contain `=`.
    "[ -~]{0,8}"
}

fn arb_entry() -> impl Strategy<Value = String> {
    prop_oneof![
        (arb_name(), arb_value()).prop_map(|(name, value)| format!("{}={}", name, value)),
        // Delimiterless noise, possibly empty.
        "[a-z ]{0,10}",
    ]
}

proptest! {
    #![proptest_config(ProptestConfig {
        // Do not write `.proptest-regressions` files into the repo.
        failure_persistence: None,
        .. ProptestConfig::default()
    })]
    #[test]
    fn prop_flatten_accounts_for_every_entry(entries in prop::collection::vec(arb_entry(), 0..12)) {
        let mut block = ParameterBlock::new();
        for entry in &entries {
            block.push_raw(entry.clone());
        }
        let (mapping, report) = flatten(&block);

        let mut delimited = 0usize;
        let mut names_in_order: Vec<&str> = Vec::new();
        for entry in &entries {
            if let Some((name, _)) = entry.split_once('=') {
                delimited += 1;
                if !names_in_order.contains(&name) {
                    names_in_order.push(name);
                }
            }
        }

        // Every entry is exactly one of: mapped, an overwrite, or skipped.
        prop_assert_eq!(report.skipped, entries.len() - delimited);
        prop_assert_eq!(report.overwritten, delimited - mapping.len());

        // Keys keep first-occurrence order.
        let keys: Vec<&str> = mapping.keys().map(|k| k.as_str()).collect();
        prop_assert_eq!(keys, names_in_order);

        // Each retained value is the last occurrence's value.
        for (name, value) in &mapping {
            let last = entries
                .iter()
                .rev()
                .find_map(|entry| {
                    let (entry_name, entry_value) = entry.split_once('=')?;
                    (entry_name == name.as_str()).then_some(entry_value)
                })
                .expect("mapped name must come from some entry");
            prop_assert_eq!(value, &ScriptValue::String(last.to_string()));
        }
    }

    #[test]
    fn prop_find_value_sees_the_first_while_flatten_keeps_the_last(
        name in arb_name(),
        first in arb_value(),
        second in arb_value(),
        noise in prop::collection::vec(arb_entry(), 0..6),
    ) {
        let mut block = ParameterBlock::new();
        block.push(&name, &first);
        for entry in &noise {
            block.push_raw(entry.clone());
        }
        block.push(&name, &second);

        prop_assert_eq!(block.find_value(&name), Some(first.as_str()));

        let (mapping, _) = flatten(&block);
        prop_assert_eq!(
            mapping.get(&name),
            Some(&ScriptValue::String(second.clone()))
        );
    }

    #[test]
    fn prop_return_mapping_passes_codes_through(n in any::<i64>()) {
        let status = HandlerStatus::from_return(&ScriptValue::Integer(n));
        if n == 1 {
            prop_assert_eq!(status, HandlerStatus::Proceed);
            prop_assert_eq!(status.raw(), 0);
        } else {
            prop_assert_eq!(status, HandlerStatus::Code(n));
            prop_assert_eq!(status.raw(), n);
        }
    }
}
