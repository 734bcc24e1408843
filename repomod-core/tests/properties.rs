//! Property-based tests for the universal invariants in §8: CST
//! round-trip, rename idempotence/inverse, no-phantom-edits, and
//! module-name invariance under a file rename. The concrete scenarios
//! (simple rename, move with shared deps, file move) live as `#[test]`
//! fixtures alongside the modules they exercise; this file is only for
//! properties that should hold across many generated inputs.

use std::fs;
use std::path::Path;

use proptest::prelude::*;
use tempfile::TempDir;

use repomod_core::{module_of, rename_file, rename_symbol, Cst, RefactorOptions};

fn ident_strategy() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_]{0,6}"
}

/// A small, always-valid module body: one `def` per name, with
/// optional blank-line and leading-comment trivia so round-trip
/// coverage isn't limited to one fixed layout.
fn module_with(names: &[String], blank_lines: usize, with_comment: bool) -> String {
    let mut out = String::new();
    if with_comment {
        out.push_str("# module comment\n");
    }
    for (i, name) in names.iter().enumerate() {
        if i > 0 {
            for _ in 0..blank_lines {
                out.push('\n');
            }
        }
        out.push_str(&format!("def {name}(x):\n    return x\n"));
    }
    out
}

proptest! {
    #[test]
    fn cst_round_trip_is_lossless(
        names in prop::collection::vec(ident_strategy(), 1..4),
        blank_lines in 0usize..3,
        with_comment in any::<bool>(),
    ) {
        let source = module_with(&names, blank_lines, with_comment);
        let cst = Cst::parse(&source).unwrap();
        prop_assert_eq!(cst.print(), source.as_str());
    }

    #[test]
    fn rename_to_self_is_a_no_op(
        names in prop::collection::vec(ident_strategy(), 1..4),
    ) {
        let source = module_with(&names, 1, false);
        let cst = Cst::parse(&source).unwrap();
        let target = names[0].clone();
        let (renamed, _) = cst.rename_name(&target, &target);
        prop_assert_eq!(renamed.print(), source.as_str());
    }

    #[test]
    fn rename_then_rename_back_restores_original(
        names in prop::collection::vec(ident_strategy(), 1..4),
        suffix in "[a-z][a-z0-9_]{0,6}",
    ) {
        let source = module_with(&names, 1, false);
        let old_name = names[0].clone();
        let new_name = format!("{old_name}_{suffix}");
        prop_assume!(!names.contains(&new_name));

        let cst = Cst::parse(&source).unwrap();
        let (renamed, _) = cst.rename_name(&old_name, &new_name);
        let (back, _) = renamed.rename_name(&new_name, &old_name);
        prop_assert_eq!(back.print(), source.as_str());
    }

    #[test]
    fn rename_of_absent_name_changes_nothing(
        names in prop::collection::vec(ident_strategy(), 1..4),
        absent in "[a-z][a-z0-9_]{0,6}",
    ) {
        prop_assume!(!names.contains(&absent));
        let source = module_with(&names, 1, false);
        let cst = Cst::parse(&source).unwrap();
        let (renamed, n) = cst.rename_name(&absent, "replacement");
        prop_assert_eq!(n, 0);
        prop_assert_eq!(renamed.print(), source.as_str());
    }

    #[test]
    fn rename_symbol_leaves_unrelated_file_byte_identical(
        helper in ident_strategy(),
        new_name in ident_strategy(),
        unrelated_names in prop::collection::vec(ident_strategy(), 1..3),
    ) {
        prop_assume!(helper != new_name);
        prop_assume!(!unrelated_names.contains(&helper) && !unrelated_names.contains(&new_name));

        let tmp = TempDir::new().unwrap();
        fs::write(tmp.path().join("utils.py"), format!("def {helper}(x):\n    return x\n")).unwrap();
        let unrelated_src = module_with(&unrelated_names, 1, false);
        fs::write(tmp.path().join("unrelated.py"), &unrelated_src).unwrap();

        rename_symbol(
            tmp.path(),
            &format!("utils.py::{helper}"),
            &new_name,
            &RefactorOptions::default(),
        )
        .unwrap();

        let after = fs::read_to_string(tmp.path().join("unrelated.py")).unwrap();
        prop_assert_eq!(after, unrelated_src);
    }

    #[test]
    fn rename_file_replaces_only_the_last_module_component(
        stem in ident_strategy(),
        new_stem in ident_strategy(),
    ) {
        prop_assume!(stem != new_stem);

        let tmp = TempDir::new().unwrap();
        let file_name = format!("{stem}.py");
        fs::write(tmp.path().join(&file_name), "x = 1\n").unwrap();

        let old_module = module_of(tmp.path(), &tmp.path().join(&file_name), "py");

        rename_file(tmp.path(), Path::new(&file_name), &new_stem, &RefactorOptions::default()).unwrap();

        let new_path = tmp.path().join(format!("{new_stem}.py"));
        let new_module = module_of(tmp.path(), &new_path, "py");

        let mut expected: Vec<&str> = old_module.split('.').collect();
        expected.pop();
        expected.push(&new_stem);
        prop_assert_eq!(new_module, expected.join("."));
    }
}
