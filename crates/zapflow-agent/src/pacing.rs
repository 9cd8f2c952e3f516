// SPDX-FileCopyrightText: 2026 Zapflow Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Humanization delays: randomized pauses that mimic a human typing cadence.

use std::time::Duration;

use rand::Rng;
use zapflow_config::model::PacingConfig;

/// Sampled delay ranges for media sends and typing hints.
#[derive(Debug, Clone, Copy)]
pub struct Pacing {
    media_secs: (u64, u64),
    typing_secs: (u64, u64),
}

impl Pacing {
    pub fn from_config(config: &PacingConfig) -> Self {
        Self {
            media_secs: (config.media_delay_min_secs, config.media_delay_max_secs),
            typing_secs: (config.typing_delay_min_secs, config.typing_delay_max_secs),
        }
    }

    /// Local pause before dispatching a media item.
    pub fn media_delay(&self) -> Duration {
        Duration::from_secs(sample(self.media_secs))
    }

    /// Typing-presence hint forwarded to the gateway, in milliseconds.
    pub fn typing_delay_ms(&self) -> u64 {
        sample(self.typing_secs) * 1000
    }
}

fn sample((min, max): (u64, u64)) -> u64 {
    if max <= min {
        min
    } else {
        rand::thread_rng().gen_range(min..=max)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn samples_stay_in_range() {
        let pacing = Pacing::from_config(&PacingConfig::default());
        for _ in 0..100 {
            let media = pacing.media_delay().as_secs();
            assert!((4..=8).contains(&media), "media delay out of range: {media}");
            let typing = pacing.typing_delay_ms();
            assert!((4000..=9000).contains(&typing), "typing out of range: {typing}");
        }
    }

    #[test]
    fn zero_config_never_sleeps() {
        let pacing = Pacing::from_config(&PacingConfig::zero());
        assert_eq!(pacing.media_delay(), Duration::ZERO);
        assert_eq!(pacing.typing_delay_ms(), 0);
    }
}
