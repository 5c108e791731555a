//! Per-player zone partitioning of the strip

use std::ops::Range;

use crate::RGB8;

/// Contiguous run of LEDs assigned to one player.
///
/// `start` is the first LED index and `len` the number of LEDs; a zone can be
/// empty when the strip has fewer LEDs than there are players.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Zone {
    pub start: usize,
    pub len: usize,
}

impl Zone {
    /// One past the last LED of the zone.
    #[must_use]
    pub const fn end(&self) -> usize {
        self.start + self.len
    }

    /// Index of the last LED (inclusive), `None` for an empty zone.
    #[must_use]
    pub const fn last(&self) -> Option<usize> {
        if self.len == 0 {
            None
        } else {
            Some(self.start + self.len - 1)
        }
    }

    #[must_use]
    pub const fn range(&self) -> Range<usize> {
        self.start..self.end()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.len == 0
    }
}

/// Split `led_count` LEDs into `player_count` contiguous zones.
///
/// Every zone gets `led_count / player_count` LEDs and the first
/// `led_count % player_count` zones get one more, so the zones cover the whole
/// strip without gaps. A single player owns the entire strip. Returns no
/// zones for `player_count == 0`.
///
/// ```text
///   50 LEDs, 3 players: [0..=16] [17..=33] [34..=49]
/// ```
#[must_use]
pub fn partition(led_count: usize, player_count: u8) -> Vec<Zone> {
    match player_count {
        0 => Vec::new(),
        1 => vec![Zone {
            start: 0,
            len: led_count,
        }],
        _ => {
            let players = usize::from(player_count);
            let base = led_count / players;
            let remainder = led_count % players;

            let mut start = 0;
            (0..players)
                .map(|i| {
                    let len = base + usize::from(i < remainder);
                    let zone = Zone { start, len };
                    start += len;
                    zone
                })
                .collect()
        }
    }
}

/// Paint every pixel with the color of the player owning it.
///
/// Zone `i` gets `colors[i]`. Pixels no zone covers are turned off. This only
/// writes the buffer; flushing to the strip is up to the caller.
pub fn paint_zones(pixels: &mut [RGB8], player_count: u8, colors: &[RGB8]) {
    let zones = partition(pixels.len(), player_count);
    let mut covered = 0;

    for (i, zone) in zones.iter().enumerate() {
        let color = colors.get(i).copied().unwrap_or_default();
        pixels[zone.range()].fill(color);
        covered = covered.max(zone.end());
    }

    pixels[covered..].fill(RGB8::default());
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MAX_PLAYERS;

    #[test]
    fn test_fifty_leds_three_players() {
        let zones = partition(50, 3);

        assert_eq!(
            zones,
            vec![
                Zone { start: 0, len: 17 },
                Zone { start: 17, len: 17 },
                Zone { start: 34, len: 16 },
            ]
        );
        assert_eq!(zones[0].last(), Some(16));
        assert_eq!(zones[1].last(), Some(33));
        assert_eq!(zones[2].last(), Some(49));
    }

    #[test]
    fn test_single_player_owns_whole_strip() {
        let zones = partition(37, 1);
        assert_eq!(zones, vec![Zone { start: 0, len: 37 }]);
        assert_eq!(zones[0].last(), Some(36));
    }

    #[test]
    fn test_zones_cover_strip_for_all_player_counts() {
        #[allow(clippy::cast_possible_truncation)]
        for players in 1..=MAX_PLAYERS as u8 {
            for led_count in usize::from(players)..=120 {
                let zones = partition(led_count, players);
                assert_eq!(zones.len(), usize::from(players));

                // Contiguous, starting at 0, ending at led_count
                let mut expected_start = 0;
                for zone in &zones {
                    assert_eq!(zone.start, expected_start, "gap before zone {zone:?}");
                    expected_start = zone.end();
                }
                assert_eq!(expected_start, led_count);

                // Remainder goes to the front
                let base = led_count / usize::from(players);
                let remainder = led_count % usize::from(players);
                for (i, zone) in zones.iter().enumerate() {
                    let expected = if i < remainder { base + 1 } else { base };
                    assert_eq!(zone.len, expected, "{led_count} LEDs / {players} players, zone {i}");
                }
            }
        }
    }

    #[test]
    fn test_fewer_leds_than_players() {
        let zones = partition(3, 5);
        let lens: Vec<usize> = zones.iter().map(|z| z.len).collect();
        assert_eq!(lens, vec![1, 1, 1, 0, 0]);
        assert!(zones[4].is_empty());
        assert_eq!(zones[4].last(), None);
    }

    #[test]
    fn test_zero_players_has_no_zones() {
        assert!(partition(10, 0).is_empty());
    }

    #[test]
    fn test_paint_zones_uses_player_colors() {
        let colors = [
            RGB8::new(255, 0, 0),
            RGB8::new(0, 255, 0),
            RGB8::new(0, 0, 255),
        ];
        let mut pixels = vec![RGB8::new(9, 9, 9); 10];

        paint_zones(&mut pixels, 3, &colors);

        // 10 / 3 = 3 remainder 1 -> 4, 3, 3
        assert!(pixels[0..4].iter().all(|&p| p == colors[0]));
        assert!(pixels[4..7].iter().all(|&p| p == colors[1]));
        assert!(pixels[7..10].iter().all(|&p| p == colors[2]));
    }

    #[test]
    fn test_paint_zones_turns_off_uncovered_pixels() {
        let mut pixels = vec![RGB8::new(9, 9, 9); 4];
        paint_zones(&mut pixels, 0, &[RGB8::new(255, 0, 0)]);
        assert!(pixels.iter().all(|&p| p == RGB8::default()));
    }
}
