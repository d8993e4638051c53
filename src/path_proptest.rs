//! Property-based tests for path cleaning and command-key compilation.
//!
//! These tests use proptest to generate random inputs and verify that
//! invariants hold for all possible inputs.

#[cfg(test)]
mod proptest_tests {
    use crate::config::{Configuration, StepConfiguration};
    use crate::path::{clean_relative_path, path_depth};
    use crate::workflow::compiler::{build_operations, command_keys};
    use proptest::prelude::*;
    use std::path::Path;

    // ============================================================================
    // clean_relative_path property tests
    // ============================================================================

    proptest! {
        /// Property: a cleaned path is never absolute and never climbs upwards
        #[test]
        fn clean_relative_path_output_stays_inside(input in "[a-zA-Z0-9_./-]{0,40}") {
            if let Ok(cleaned) = clean_relative_path(&input) {
                prop_assert!(!cleaned.starts_with('/'));
                prop_assert!(!cleaned.split('/').any(|part| part == ".."));
                prop_assert!(!cleaned.split('/').any(|part| part == "." || part.is_empty()));
            }
        }

        /// Property: cleaning is idempotent
        #[test]
        fn clean_relative_path_is_idempotent(input in "[a-zA-Z0-9_]{1,8}(/[a-zA-Z0-9_.]{1,8}){0,4}") {
            if let Ok(once) = clean_relative_path(&input) {
                let twice = clean_relative_path(&once).unwrap();
                prop_assert_eq!(once, twice);
            }
        }

        /// Property: absolute paths are always rejected
        #[test]
        fn clean_relative_path_rejects_absolute(input in "/[a-zA-Z0-9_/]{0,20}") {
            prop_assert!(clean_relative_path(&input).is_err());
        }

        /// Property: a child directory is always deeper than its parent
        #[test]
        fn path_depth_child_is_deeper(parent in "(/[a-z]{1,6}){1,4}", child in "[a-z]{1,6}") {
            let parent_path = Path::new(&parent);
            let child_path = parent_path.join(&child);
            prop_assert_eq!(path_depth(&child_path), path_depth(parent_path) + 1);
        }
    }

    // ============================================================================
    // compiler property tests
    // ============================================================================

    proptest! {
        /// Property: any command path outside the dispatch table yields the
        /// exact unsupported-command message
        #[test]
        fn unknown_command_paths_are_rejected(words in prop::collection::vec("[a-z]{1,8}", 1..4)) {
            let key = words.join(" ");
            prop_assume!(!command_keys().any(|known| known == key));

            let configuration = Configuration {
                steps: vec![StepConfiguration::new("probe", words.clone(), Default::default())],
            };
            let error = build_operations(&configuration).unwrap_err();
            prop_assert_eq!(error.to_string(), format!("unsupported workflow command: {}", key));
        }
    }
}
