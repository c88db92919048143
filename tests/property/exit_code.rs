use proptest::prelude::*;

use pipewright::exec::{CommandLine, exit_code_indicates_error};

fn program_name() -> impl Strategy<Value = String> {
    "[a-z][a-z0-9_-]{0,11}"
}

proptest! {
    #[test]
    fn zero_is_never_an_error(
        program in program_name(),
        tool in proptest::option::of(program_name()),
    ) {
        let command = CommandLine::new(&[program.as_str()], false);
        prop_assert!(!exit_code_indicates_error(&command, Some(0), tool.as_deref()));
    }

    #[test]
    fn negative_codes_are_always_errors(
        program in program_name(),
        tool in proptest::option::of(program_name()),
        code in i32::MIN..0,
    ) {
        let command = CommandLine::new(&[program.as_str()], false);
        prop_assert!(exit_code_indicates_error(&command, Some(code), tool.as_deref()));
    }

    #[test]
    fn codes_above_one_are_always_errors(
        program in program_name(),
        tool in proptest::option::of(program_name()),
        code in 2..=255i32,
    ) {
        let command = CommandLine::new(&[program.as_str()], false);
        prop_assert!(exit_code_indicates_error(&command, Some(code), tool.as_deref()));
    }

    #[test]
    fn one_depends_only_on_program_identity(
        program in program_name(),
        tool in program_name(),
        shell in any::<bool>(),
    ) {
        let command = CommandLine::new(&[program.as_str(), "--arg"], shell);
        prop_assert_eq!(
            exit_code_indicates_error(&command, Some(1), Some(tool.as_str())),
            program != tool
        );
    }
}
