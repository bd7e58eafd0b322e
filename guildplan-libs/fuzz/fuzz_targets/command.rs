#![no_main]
use guildplan_libs::command::{parse_command, MAX_WEEK_OFFSET};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|text: &str| {
    if let Ok(command) = parse_command(text) {
        assert!(command.week_offset <= MAX_WEEK_OFFSET);
        assert!(command.day < 7, "day out of range: {:?}", command);
        assert!(
            command.start_hour < command.end_hour && command.end_hour <= 24,
            "bad time range: {:?}",
            command
        );
        assert!(!command.title.is_empty());
        assert_eq!(command.title, command.title.trim());
    }
});
