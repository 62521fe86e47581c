//! Integration tests for script discovery and the catalog

mod common;
use common::{discover, write_script};

use std::fs;

use moonspec::Runner;

mod registration {
    use super::*;

    #[test]
    fn definition_lines_are_recorded() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "lines.lua",
            "-- leading comment\n\
             moonspec.test('suite', 'first', function()\n\
             end)\n\
             \n\
             moonspec.test('suite', 'second', function()\n\
             end)\n",
        );
        let mut runner = Runner::new();
        assert!(discover(&mut runner, &script).is_empty());

        assert_eq!(runner.test("suite", "first").unwrap().line, 2);
        assert_eq!(runner.test("suite", "second").unwrap().line, 5);
        assert_eq!(runner.test("suite", "first").unwrap().source_file, script);
    }

    #[test]
    fn re_registering_a_pair_keeps_the_second_location() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "dup.lua",
            "moonspec.test('suite', 'case', function()\n\
             end)\n\
             moonspec.test('suite', 'case', function()\n\
             end)\n",
        );
        let mut runner = Runner::new();
        discover(&mut runner, &script);

        assert_eq!(runner.total_tests(), 1);
        assert_eq!(runner.test("suite", "case").unwrap().line, 3);
    }

    #[test]
    fn later_files_overwrite_earlier_registrations() {
        let dir = tempfile::tempdir().unwrap();
        let first = write_script(
            dir.path(),
            "first.lua",
            "moonspec.test('suite', 'case', function() end)",
        );
        let second = write_script(
            dir.path(),
            "second.lua",
            "\n\nmoonspec.test('suite', 'case', function() end)",
        );
        let mut runner = Runner::new();
        discover(&mut runner, &first);
        discover(&mut runner, &second);

        let test = runner.test("suite", "case").unwrap();
        assert_eq!(test.source_file, second);
        assert_eq!(test.line, 3);
    }

    #[test]
    fn top_level_code_runs_during_discovery() {
        let dir = tempfile::tempdir().unwrap();
        // Registration happens inside a loop; the names only exist after
        // the top-level code has actually executed.
        let script = write_script(
            dir.path(),
            "loop.lua",
            "for i = 1, 3 do\n\
                 moonspec.test('generated', 'case_' .. i, function() end)\n\
             end",
        );
        let mut runner = Runner::new();
        discover(&mut runner, &script);

        assert_eq!(
            runner.test_names("generated"),
            ["case_1", "case_2", "case_3"]
        );
    }
}

mod failures {
    use super::*;

    #[test]
    fn broken_files_are_skipped_without_stopping_the_pass() {
        let dir = tempfile::tempdir().unwrap();
        write_script(dir.path(), "broken.lua", "this is (not) lua");
        write_script(
            dir.path(),
            "works.lua",
            "moonspec.test('ok', 'runs', function() end)",
        );
        let config = dir.path().join(".moonspec");
        fs::write(&config, "broken.lua\nworks.lua\n").unwrap();

        let mut runner = Runner::new();
        let mut messages = Vec::new();
        runner.configure(&config, &mut |m: &str| messages.push(m.to_string()));

        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("broken.lua"));
        assert_eq!(runner.total_tests(), 1);
    }

    #[test]
    fn top_level_runtime_errors_count_as_load_failures() {
        let dir = tempfile::tempdir().unwrap();
        let script = write_script(
            dir.path(),
            "raises.lua",
            "moonspec.test('will', 'vanish', function() end)\n\
             error('top level exploded')",
        );
        let mut runner = Runner::new();
        let messages = discover(&mut runner, &script);

        assert_eq!(messages.len(), 1);
        assert!(messages[0].contains("top level exploded"));
        // Registration happened before the error, but the file failed to
        // load, so nothing was merged.
        assert_eq!(runner.total_tests(), 0);
    }
}

mod configuration {
    use super::*;

    #[test]
    fn directories_with_nested_configs_defer_to_them() {
        let dir = tempfile::tempdir().unwrap();
        let inner = dir.path().join("inner");
        fs::create_dir(&inner).unwrap();
        write_script(
            &inner,
            "picked.lua",
            "moonspec.test('inner', 'picked', function() end)",
        );
        write_script(
            &inner,
            "ignored.lua",
            "moonspec.test('inner', 'ignored', function() end)",
        );
        fs::write(inner.join(".moonspec"), "picked.lua\n").unwrap();
        let config = dir.path().join(".moonspec");
        fs::write(&config, "inner\n").unwrap();

        let mut runner = Runner::new();
        runner.configure(&config, &mut |_m: &str| {});

        assert_eq!(runner.test_names("inner"), ["picked"]);
    }

    #[test]
    fn directory_scans_collect_every_script_non_recursively() {
        let dir = tempfile::tempdir().unwrap();
        let scripts = dir.path().join("scripts");
        fs::create_dir(&scripts).unwrap();
        write_script(
            &scripts,
            "a.lua",
            "moonspec.test('scan', 'a', function() end)",
        );
        write_script(
            &scripts,
            "b.lua",
            "moonspec.test('scan', 'b', function() end)",
        );
        let nested = scripts.join("nested");
        fs::create_dir(&nested).unwrap();
        write_script(
            &nested,
            "deep.lua",
            "moonspec.test('scan', 'deep', function() end)",
        );
        let config = dir.path().join(".moonspec");
        fs::write(&config, "scripts\n").unwrap();

        let mut runner = Runner::new();
        runner.configure(&config, &mut |_m: &str| {});

        assert_eq!(runner.test_names("scan"), ["a", "b"]);
    }
}
