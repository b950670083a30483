//! Acquisition with synthetic fallback.
//!
//! Turns "I need a reading now" into a reading, always. The provider is
//! tried once per date it proposes; a response that fails validation moves
//! on to the next date, a transport failure abandons the provider at once.
//! When nothing usable comes back the synthetic model fills in and the
//! result is tagged [`Provenance::Synthetic`].

use std::collections::VecDeque;

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::Serialize;

use crate::error::ProviderError;
use crate::models::{Provenance, Reading};
use crate::provider::Provider;
use crate::synth::{synthesize_for, Noise};

// ---

/// Outcome of one acquisition.
#[derive(Debug, Clone, Serialize)]
pub struct Acquired {
    pub reading: Reading,
    pub provenance: Provenance,
    /// Provider calls made, including failed ones.
    pub attempts: u32,
    /// Why the provider result was not used, when it was not.
    pub fallback_reason: Option<String>,
}

impl Acquired {
    pub fn is_live(&self) -> bool {
        self.provenance == Provenance::Live
    }
}

enum State {
    TryLive {
        dates: VecDeque<NaiveDate>,
        attempts: u32,
        last_error: Option<ProviderError>,
    },
    Fallback {
        reason: String,
        attempts: u32,
    },
    Done(Acquired),
}

/// Obtain a reading for `now` from `provider`, degrading to the synthetic
/// model. Never fails.
///
/// Live readings keep `now` at one-second precision; synthetic readings are
/// stamped with the hour containing `now`.
pub async fn acquire(provider: &dyn Provider, now: NaiveDateTime, noise: &mut dyn Noise) -> Acquired {
    acquire_for(provider, now, strip_subsec(now), noise).await
}

/// Like [`acquire`], but the reading describes `target` rather than `now`.
///
/// The provider is still asked about `now`. A live reading is stamped with
/// `target` and its absent fields come from the model at `target`; the
/// fallback is the model at `target`, stamped with its hour.
pub async fn acquire_for(
    provider: &dyn Provider,
    now: NaiveDateTime,
    target: NaiveDateTime,
    noise: &mut dyn Noise,
) -> Acquired {
    // ---
    let source = provider.source();
    let mut state = State::TryLive {
        dates: provider.attempt_dates(now.date()).into(),
        attempts: 0,
        last_error: None,
    };

    loop {
        state = match state {
            State::TryLive {
                mut dates,
                attempts,
                last_error,
            } => match dates.pop_front() {
                None => State::Fallback {
                    reason: last_error
                        .map(|e| e.to_string())
                        .unwrap_or_else(|| "provider proposed no dates".to_string()),
                    attempts,
                },
                Some(date) => {
                    let attempts = attempts + 1;
                    let result = provider.fetch(date).await.and_then(|raw| {
                        raw.validate()?;
                        Ok(raw)
                    });

                    match result {
                        Ok(raw) => {
                            tracing::debug!(%source, %date, attempts, "accepted live reading");
                            let baseline = synthesize_for(source, target, noise);
                            State::Done(Acquired {
                                reading: raw.into_reading(source, target, &baseline),
                                provenance: Provenance::Live,
                                attempts,
                                fallback_reason: None,
                            })
                        }
                        Err(e @ ProviderError::InvalidData(_)) => {
                            tracing::debug!(%source, %date, "no usable data: {}", e);
                            State::TryLive {
                                dates,
                                attempts,
                                last_error: Some(e),
                            }
                        }
                        Err(e @ ProviderError::Unavailable(_)) => State::Fallback {
                            reason: e.to_string(),
                            attempts,
                        },
                    }
                }
            },
            State::Fallback { reason, attempts } => {
                tracing::warn!(%source, attempts, "using synthetic reading: {}", reason);
                let sample = synthesize_for(source, target, noise);
                State::Done(Acquired {
                    reading: sample.into_reading(source),
                    provenance: Provenance::Synthetic,
                    attempts,
                    fallback_reason: Some(reason),
                })
            }
            State::Done(acquired) => return acquired,
        };
    }
}

fn strip_subsec(ts: NaiveDateTime) -> NaiveDateTime {
    ts.with_nanosecond(0).unwrap_or(ts)
}

#[cfg(test)]
mod tests {
    // ---
    use super::*;
    use crate::models::Source;
    use crate::provider::ProviderReading;
    use crate::synth::{NoNoise, SeededNoise};
    use async_trait::async_trait;
    use chrono::Duration;
    use std::sync::atomic::{AtomicU32, Ordering};

    /// Provider scripted by the number of the call (1-based).
    struct Scripted {
        calls: AtomicU32,
        dates: u32,
        respond: fn(u32) -> Result<ProviderReading, ProviderError>,
    }

    impl Scripted {
        fn new(dates: u32, respond: fn(u32) -> Result<ProviderReading, ProviderError>) -> Self {
            Self {
                calls: AtomicU32::new(0),
                dates,
                respond,
            }
        }
    }

    #[async_trait]
    impl Provider for Scripted {
        fn source(&self) -> Source {
            Source::LiveSolar
        }

        fn attempt_dates(&self, today: NaiveDate) -> Vec<NaiveDate> {
            (1..=self.dates as i64)
                .map(|d| today - Duration::days(d))
                .collect()
        }

        async fn fetch(&self, _date: NaiveDate) -> Result<ProviderReading, ProviderError> {
            let n = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
            (self.respond)(n)
        }
    }

    fn now() -> NaiveDateTime {
        // ---
        NaiveDate::from_ymd_opt(2026, 3, 15)
            .unwrap()
            .and_hms_nano_opt(11, 42, 17, 123_456_789)
            .unwrap()
    }

    fn irradiance(value: f64) -> ProviderReading {
        ProviderReading {
            irradiance: Some(value),
            ..Default::default()
        }
    }

    #[tokio::test]
    async fn test_always_failing_provider_yields_synthetic() {
        // ---
        let provider = Scripted::new(7, |_| Err(ProviderError::Unavailable("timeout".into())));
        let acquired = acquire(&provider, now(), &mut SeededNoise::new(1)).await;

        assert_eq!(acquired.provenance, Provenance::Synthetic);
        assert_eq!(acquired.attempts, 1, "transport failure must not retry");
        assert_eq!(acquired.reading.source, Source::LiveSolar);
        assert_eq!(acquired.reading.timestamp.minute(), 0);
        assert!((40.0..=95.0).contains(&acquired.reading.humidity));
        assert!(acquired.fallback_reason.unwrap().contains("timeout"));
    }

    #[tokio::test]
    async fn test_invalid_days_are_skipped_until_valid() {
        // ---
        let provider = Scripted::new(7, |n| {
            if n < 3 {
                Ok(irradiance(-999.0))
            } else {
                Ok(irradiance(612.0))
            }
        });
        let acquired = acquire(&provider, now(), &mut NoNoise).await;

        assert!(acquired.is_live());
        assert_eq!(acquired.attempts, 3);
        assert_eq!(acquired.reading.irradiance, 612.0);
        assert_eq!(acquired.reading.timestamp, now().with_nanosecond(0).unwrap());
    }

    #[tokio::test]
    async fn test_lookback_exhausted_falls_back() {
        // ---
        let provider = Scripted::new(7, |_| Ok(irradiance(0.0)));
        let acquired = acquire(&provider, now(), &mut NoNoise).await;

        assert_eq!(acquired.provenance, Provenance::Synthetic);
        assert_eq!(acquired.attempts, 7);
        assert_eq!(provider.calls.load(Ordering::SeqCst), 7);
    }

    #[tokio::test]
    async fn test_no_dates_falls_back_without_calls() {
        // ---
        let provider = Scripted::new(0, |_| Ok(irradiance(500.0)));
        let acquired = acquire(&provider, now(), &mut NoNoise).await;

        assert_eq!(acquired.provenance, Provenance::Synthetic);
        assert_eq!(acquired.attempts, 0);
    }

    #[tokio::test]
    async fn test_fallback_describes_the_target_hour() {
        // ---
        let provider = Scripted::new(1, |_| Err(ProviderError::Unavailable("timeout".into())));
        let target = now() - Duration::hours(5);
        let acquired = acquire_for(&provider, now(), target, &mut NoNoise).await;

        let expected =
            synthesize_for(Source::LiveSolar, target, &mut NoNoise).into_reading(Source::LiveSolar);
        assert_eq!(acquired.provenance, Provenance::Synthetic);
        assert_eq!(acquired.reading, expected);
    }

    #[tokio::test]
    async fn test_live_fields_completed_from_the_target_hour() {
        // ---
        let provider = Scripted::new(1, |_| Ok(irradiance(640.0)));
        let target = now().with_hour(6).unwrap().with_minute(0).unwrap();
        let acquired = acquire_for(&provider, now(), target, &mut NoNoise).await;

        let model = synthesize_for(Source::LiveSolar, target, &mut NoNoise);
        assert!(acquired.is_live());
        assert_eq!(acquired.reading.timestamp, target);
        assert_eq!(acquired.reading.irradiance, 640.0);
        assert_eq!(acquired.reading.temperature, model.temperature);
        assert_eq!(acquired.reading.humidity, model.humidity);
    }
}
