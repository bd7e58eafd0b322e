#![no_main]
use guildplan_libs::{
    blocks::aggregate,
    matrix::Matrix,
    room::{Player, WeekEntry},
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (Vec<Matrix>, u8)| {
    #[cfg(feature = "log")]
    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "[{}][{}] {}",
                record.target(),
                record.level(),
                message
            ))
        })
        .level(log::LevelFilter::Debug)
        .chain(std::io::stdout())
        .apply();

    let (matrices, min_free) = data;
    let players = (0..matrices.len())
        .map(|i| Player::with_id(&i.to_string(), &i.to_string()))
        .collect::<Vec<_>>();
    let mut week = WeekEntry::default();
    for (player, matrix) in players.iter().zip(matrices) {
        week.availability.insert(player.id.clone(), matrix);
    }

    let blocks = match aggregate(Some(&week), &players, min_free as usize) {
        Ok(blocks) => blocks,
        Err(_) => {
            assert_eq!(min_free, 0);
            return;
        }
    };

    for pair in blocks.windows(2) {
        assert!(
            (pair[0].day, pair[0].end_hour) <= (pair[1].day, pair[1].start_hour),
            "Overlapping or unordered blocks: {:?}",
            pair
        );
    }

    for block in &blocks {
        assert!(block.start_hour < block.end_hour && block.end_hour <= 24);
        assert_eq!(
            block.fully_available.len()
                + block.partially_available.len()
                + block.unavailable.len(),
            players.len(),
            "Every player is classified exactly once"
        );
        assert!(block.fully_available.len() + block.partially_available.len() >= min_free as usize);
    }
});
