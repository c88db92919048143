use proptest::prelude::*;

use pipewright::exec::LastLines;
use pipewright::exec::pump::ERROR_OUTPUT_MAX_LINE_COUNT;

proptest! {
    #[test]
    fn keeps_the_most_recent_lines_in_order(
        lines in proptest::collection::vec("[a-z]{0,8}", 0..40),
    ) {
        let mut last_lines = LastLines::new();
        for line in lines.iter() {
            last_lines.push(line.clone());
        }

        let keep = lines.len().min(ERROR_OUTPUT_MAX_LINE_COUNT);
        let expected: Vec<&str> = lines[lines.len() - keep..].iter().map(String::as_str).collect();
        let actual: Vec<&str> = last_lines.iter().collect();

        prop_assert_eq!(actual, expected);
        prop_assert_eq!(last_lines.is_full(), lines.len() >= ERROR_OUTPUT_MAX_LINE_COUNT);
    }
}
