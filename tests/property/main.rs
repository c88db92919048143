// Property tests.

mod exit_code;
mod last_lines;
