use crate::sequence::SequenceCounter;
use chrono::{DateTime, Local, NaiveTime, TimeDelta, TimeZone};
use log::info;
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;

const DAY: Duration = Duration::from_secs(24 * 60 * 60);

// a timer that wakes a hair before midnight must not reset twice
const MIN_DELAY: Duration = Duration::from_secs(1);

pub type DelaySource = Box<dyn Fn(SchedulerState) -> Duration + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    ArmedFirst,
    ArmedRecurring,
}

impl fmt::Display for SchedulerState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SchedulerState::ArmedFirst => write!(f, "first"),
            SchedulerState::ArmedRecurring => write!(f, "recurring"),
        }
    }
}

/// Resets the counter at every local midnight.
///
/// The delay is recomputed after each firing, so the reset stays on local
/// midnight across daylight-saving changes.
pub struct MidnightScheduler {
    counter: Arc<SequenceCounter>,
    next_delay: DelaySource,
}

impl MidnightScheduler {
    pub fn new(counter: Arc<SequenceCounter>) -> Self {
        Self::with_delay_source(counter, Box::new(delay_until_local_midnight))
    }

    pub fn with_delay_source(counter: Arc<SequenceCounter>, next_delay: DelaySource) -> Self {
        MidnightScheduler {
            counter,
            next_delay,
        }
    }

    pub fn start(self) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut state = SchedulerState::ArmedFirst;

            loop {
                let delay = (self.next_delay)(state);

                info!("{} sequence reset in {:?}", state, delay);

                tokio::time::sleep(delay).await;

                self.counter.reset().await;

                state = SchedulerState::ArmedRecurring;
            }
        })
    }
}

fn delay_until_local_midnight(state: SchedulerState) -> Duration {
    next_reset_delay(&Local::now(), state)
}

/// Delay before the next reset. Only a recurring arm skips a midnight that
/// is less than `MIN_DELAY` away; that midnight was just handled.
pub fn next_reset_delay<Tz: TimeZone>(now: &DateTime<Tz>, state: SchedulerState) -> Duration {
    let delay = duration_until_next_midnight(now);

    if state == SchedulerState::ArmedFirst || delay >= MIN_DELAY {
        return delay;
    }

    let later = now.clone() + TimeDelta::from_std(MIN_DELAY).unwrap_or(TimeDelta::seconds(1));

    MIN_DELAY + duration_until_next_midnight(&later)
}

/// Time left until the start of tomorrow in `now`'s timezone. When local
/// midnight is skipped by a clock change, the first valid instant after it
/// is used.
pub fn duration_until_next_midnight<Tz: TimeZone>(now: &DateTime<Tz>) -> Duration {
    let Some(tomorrow) = now.date_naive().succ_opt() else {
        return DAY;
    };

    let midnight = tomorrow.and_time(NaiveTime::MIN);
    let timezone = now.timezone();

    let next = (0..=24)
        .map(|quarter| midnight + TimeDelta::minutes(15 * quarter))
        .find_map(|candidate| timezone.from_local_datetime(&candidate).earliest());

    match next {
        Some(next) => next
            .signed_duration_since(now)
            .to_std()
            .unwrap_or(Duration::ZERO),
        None => DAY,
    }
}

#[cfg(test)]
mod tests {
    use crate::scheduler::{
        duration_until_next_midnight, next_reset_delay, MidnightScheduler, SchedulerState,
    };
    use crate::sequence::SequenceCounter;
    use crate::storage::{MemoryStore, SequenceState};
    use chrono::{FixedOffset, TimeDelta, TimeZone, Utc};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    #[test]
    fn one_hour_before_midnight() {
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2023, 1, 2, 23, 0, 0).unwrap();

        assert_eq!(Duration::from_secs(3600), duration_until_next_midnight(&now));
    }

    #[test]
    fn exactly_midnight_waits_a_full_day() {
        let now = Utc.with_ymd_and_hms(2023, 1, 2, 0, 0, 0).unwrap();

        assert_eq!(
            Duration::from_secs(24 * 3600),
            duration_until_next_midnight(&now)
        );
    }

    #[test]
    fn crosses_month_and_year_boundaries() {
        let now = Utc.with_ymd_and_hms(2023, 12, 31, 12, 30, 15).unwrap();

        assert_eq!(
            Duration::from_secs(11 * 3600 + 29 * 60 + 45),
            duration_until_next_midnight(&now)
        );
    }

    #[test]
    fn uses_local_date_not_utc_date() {
        // 2023-01-02 20:00 UTC is already 2023-01-03 04:00 at +08:00
        let tz = FixedOffset::east_opt(8 * 3600).unwrap();
        let now = Utc
            .with_ymd_and_hms(2023, 1, 2, 20, 0, 0)
            .unwrap()
            .with_timezone(&tz);

        assert_eq!(
            Duration::from_secs(20 * 3600),
            duration_until_next_midnight(&now)
        );
    }

    #[test]
    fn first_arm_just_before_midnight_keeps_that_midnight() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2023, 1, 2, 23, 59, 59).unwrap() + TimeDelta::milliseconds(500);

        assert_eq!(
            Duration::from_millis(500),
            next_reset_delay(&now, SchedulerState::ArmedFirst)
        );
    }

    #[test]
    fn recurring_arm_just_before_midnight_skips_to_the_next_one() {
        let tz = FixedOffset::east_opt(3 * 3600).unwrap();
        let now = tz.with_ymd_and_hms(2023, 1, 2, 23, 59, 59).unwrap() + TimeDelta::milliseconds(500);

        assert_eq!(
            Duration::from_millis(24 * 3600 * 1000 + 500),
            next_reset_delay(&now, SchedulerState::ArmedRecurring)
        );
    }

    #[test]
    fn recurring_arm_after_midnight_waits_until_tomorrow() {
        let now = Utc.with_ymd_and_hms(2023, 1, 3, 0, 0, 0).unwrap() + TimeDelta::milliseconds(2);

        assert_eq!(
            Duration::from_millis(24 * 3600 * 1000 - 2),
            next_reset_delay(&now, SchedulerState::ArmedRecurring)
        );
    }

    #[tokio::test(start_paused = true)]
    async fn resets_on_every_firing_without_traffic() {
        let store = Arc::new(MemoryStore::new(SequenceState::new(42)));
        let counter = Arc::new(SequenceCounter::open(store.clone(), 4).await.unwrap());
        let armed = Arc::new(AtomicUsize::new(0));
        let states = Arc::new(Mutex::new(Vec::<SchedulerState>::new()));

        let scheduler = MidnightScheduler::with_delay_source(Arc::clone(&counter), {
            let armed = Arc::clone(&armed);
            let states = Arc::clone(&states);
            Box::new(move |state: SchedulerState| {
                armed.fetch_add(1, Ordering::SeqCst);
                states.lock().unwrap().push(state);
                Duration::from_secs(60)
            })
        })
        .start();

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(42, counter.current());

        tokio::time::sleep(Duration::from_secs(31)).await;
        assert_eq!(0, counter.current());
        assert_eq!(Some(&SequenceState::new(0)), store.saved().last());

        counter.increment();
        counter.increment();
        counter.increment();
        assert_eq!(3, counter.current());

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(0, counter.current());
        assert_eq!(3, armed.load(Ordering::SeqCst));
        assert_eq!(
            vec![
                SchedulerState::ArmedFirst,
                SchedulerState::ArmedRecurring,
                SchedulerState::ArmedRecurring
            ],
            *states.lock().unwrap()
        );

        scheduler.abort();
    }
}
