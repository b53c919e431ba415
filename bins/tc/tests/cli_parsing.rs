//! CLI argument parsing tests for the tc command.
//!
//! These tests run without network access or root privileges: requests are
//! encoded with `--dry-run` and rendered through the decoder.

use assert_cmd::Command;
use predicates::prelude::*;

fn tc_cmd() -> Command {
    Command::new(env!("CARGO_BIN_EXE_tc"))
}

fn dry_run(params: &[&str]) -> assert_cmd::assert::Assert {
    tc_cmd()
        .args(["--dry-run", "action", "add"])
        .args(params)
        .assert()
}

mod global_flags {
    use super::*;

    #[test]
    fn test_help() {
        tc_cmd()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Traffic control tool"));
    }

    #[test]
    fn test_version() {
        tc_cmd()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("tc"));
    }

    #[test]
    fn test_invalid_subcommand() {
        tc_cmd()
            .arg("invalid_command")
            .assert()
            .failure()
            .stderr(predicate::str::contains("error"));
    }

    #[test]
    fn test_flags_accepted() {
        for flag in ["-j", "--json", "-p", "-s", "--stats"] {
            tc_cmd().args([flag, "--help"]).assert().success();
        }
    }

    #[test]
    fn test_ctinfo_wire_values() {
        tc_cmd()
            .args(["--ctinfo-wire", "v1", "--help"])
            .assert()
            .success();
        tc_cmd()
            .args(["--ctinfo-wire", "v3", "action", "show", "ctinfo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("unknown ctinfo wire generation"));
    }
}

mod action_add {
    use super::*;

    #[test]
    fn test_ctinfo_round_trip() {
        dry_run(&["ctinfo", "dscp", "0x1e/0x3f", "zone", "5"])
            .success()
            .stdout(predicate::str::contains("action order 1: ctinfo zone 5 pipe"))
            .stdout(predicate::str::contains(" dscp 0x0000001e/0x0000003f"))
            .stdout(predicate::str::contains(" cpmark 0xffffffff"));
    }

    #[test]
    fn test_ctinfo_v1_round_trip() {
        tc_cmd()
            .args(["--ctinfo-wire", "v1", "--dry-run", "action", "add"])
            .args(["ctinfo", "dscp", "0xfc000000", "drop", "index", "3"])
            .assert()
            .success()
            .stdout(predicate::str::contains("ctinfo zone 0 drop"))
            .stdout(predicate::str::contains("\t index 3 ref 0 bind 0 dscp fc000000/00000000 "));
    }

    #[test]
    fn test_cpmark_does_not_swallow_zone() {
        dry_run(&["ctinfo", "cpmark", "zone", "9"])
            .success()
            .stdout(predicate::str::contains("ctinfo zone 9 pipe"))
            .stdout(predicate::str::contains(" cpmark 0xffffffff"));
    }

    #[test]
    fn test_conndscp_round_trip() {
        dry_run(&[
            "conndscp", "mask", "0xfc000000", "statemask", "0x01000000", "mode", "dscp", "zone",
            "2", "goto", "chain", "4",
        ])
        .success()
        .stdout(predicate::str::contains("conndscp zone 2 goto chain 4"))
        .stdout(predicate::str::contains(
            " mask 0xfc000000 statemask 0x01000000 mode dscp",
        ));
    }

    #[test]
    fn test_action_chain() {
        dry_run(&["ctinfo", "zone", "1", "action", "conndscp", "zone", "2"])
            .success()
            .stdout(predicate::str::contains("action order 1: ctinfo zone 1"))
            .stdout(predicate::str::contains("action order 2: conndscp zone 2"));
    }

    #[test]
    fn test_json_output() {
        tc_cmd()
            .args(["-j", "--dry-run", "action", "add", "ctinfo", "zone", "7"])
            .assert()
            .success()
            .stdout(predicate::str::contains("\"zone\":7"))
            .stdout(predicate::str::contains("\"kind\":\"ctinfo\""))
            .stdout(predicate::str::contains("\"control_action\":{\"type\":\"pipe\"}"));
    }

    #[test]
    fn test_replace_and_change_dry_run() {
        for verb in ["replace", "change"] {
            tc_cmd()
                .args(["--dry-run", "action", verb, "conndscp", "index", "8"])
                .assert()
                .success()
                .stdout(predicate::str::contains("index 8"));
        }
    }
}

mod usage_errors {
    use super::*;

    #[test]
    fn test_bad_mode_prints_usage() {
        dry_run(&["conndscp", "mode", "mark"])
            .failure()
            .stderr(predicate::str::contains("conndscp: Illegal \"mode\""))
            .stderr(predicate::str::contains("Usage: ... conndscp mask MASK"));
    }

    #[test]
    fn test_bad_zone() {
        dry_run(&["ctinfo", "zone", "70000"])
            .failure()
            .stderr(predicate::str::contains("Illegal \"zone\""))
            .stderr(predicate::str::contains("Usage: ... ctinfo"));
    }

    #[test]
    fn test_help_keyword() {
        dry_run(&["ctinfo", "help"])
            .failure()
            .stderr(predicate::str::contains("[cpmark [mask]]"));
    }

    #[test]
    fn test_leftover_tokens() {
        dry_run(&["conndscp", "zone", "2", "mask", "1"])
            .failure()
            .stderr(predicate::str::contains("unexpected argument \"mask\""));
    }

    #[test]
    fn test_unknown_kind() {
        dry_run(&["gact", "drop"])
            .failure()
            .stderr(predicate::str::contains("unknown action kind \"gact\""));
    }

    #[test]
    fn test_add_requires_params() {
        tc_cmd().args(["action", "add"]).assert().failure();
    }

    #[test]
    fn test_get_requires_index() {
        tc_cmd()
            .args(["action", "get", "ctinfo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("expected \"index INDEX\""));
    }

    #[test]
    fn test_dry_run_only_for_new_actions() {
        tc_cmd()
            .args(["--dry-run", "action", "show", "ctinfo"])
            .assert()
            .failure()
            .stderr(predicate::str::contains("--dry-run only applies"));
    }
}
