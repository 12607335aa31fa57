//! Fixed-width bar resampling from tick series.
//!
//! Builds a contiguous grid of OHLCV bars, one per window, including
//! windows with no ticks.

use std::borrow::Cow;

use tickbar_core::{
    ts_to_datetime, Bar, BarSeries, Error, ProductSeries, Resolution, Result, Tick, TimestampMs,
};

/// Resampler for one target resolution.
///
/// Windows are closed on the left and labelled by their start, aligned to
/// the Unix epoch. Ticks with a `NaN` price are left out of the prices and
/// ticks with a `NaN` amount are left out of the volume.
#[derive(Debug, Clone, Copy)]
pub struct Resampler {
    resolution: Resolution,
}

/// A bar that's currently being built.
#[derive(Debug, Clone)]
struct BarInProgress {
    ts_ms: TimestampMs,
    open: Option<f64>,
    high: f64,
    low: f64,
    close: f64,
    volume: f64,
    trade_count: u32,
}

impl BarInProgress {
    fn new(ts_ms: TimestampMs) -> Self {
        Self {
            ts_ms,
            open: None,
            high: f64::NEG_INFINITY,
            low: f64::INFINITY,
            close: f64::NAN,
            volume: 0.0,
            trade_count: 0,
        }
    }

    fn add_tick(&mut self, tick: &Tick) {
        self.trade_count += 1;
        if !tick.amount.is_nan() {
            self.volume += tick.size();
        }
        if tick.price.is_nan() {
            return;
        }
        if self.open.is_none() {
            self.open = Some(tick.price);
        }
        self.high = self.high.max(tick.price);
        self.low = self.low.min(tick.price);
        self.close = tick.price;
    }

    fn finish(self) -> Bar {
        let priced = self.open.is_some();
        Bar {
            ts_ms: self.ts_ms,
            open: self.open,
            high: priced.then_some(self.high),
            low: priced.then_some(self.low),
            close: priced.then_some(self.close),
            volume: self.volume,
            trade_count: self.trade_count,
        }
    }
}

impl Resampler {
    /// Create a resampler for the given resolution.
    pub fn new(resolution: Resolution) -> Self {
        Self { resolution }
    }

    pub fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Resample a validated product series.
    pub fn resample(&self, series: &ProductSeries) -> Result<BarSeries> {
        let bars = self.resample_ticks(&series.ticks)?;
        Ok(BarSeries::new(self.resolution, bars))
    }

    /// Resample a tick slice into contiguous bars.
    ///
    /// Out-of-order input is stable-sorted on a private copy first. Fails
    /// with [`Error::InvalidInput`] on an empty slice or on timestamps
    /// outside what a UTC datetime can hold.
    pub fn resample_ticks(&self, ticks: &[Tick]) -> Result<Vec<Bar>> {
        let ticks = sorted_by_time(ticks);
        let (first, last) = match (ticks.first(), ticks.last()) {
            (Some(first), Some(last)) => (first.ts_ms, last.ts_ms),
            _ => return Err(Error::invalid_input("cannot resample an empty series")),
        };
        for ts in [first, last] {
            if ts_to_datetime(ts).is_none() {
                return Err(Error::invalid_input(format!(
                    "timestamp {ts}ms is outside the representable range"
                )));
            }
        }

        let width = self.resolution.width_ms();
        let first_window = self.resolution.floor(first);
        let last_window = self.resolution.floor(last);
        let mut bars = Vec::with_capacity(self.resolution.window_count(first_window, last_window));

        let mut current = BarInProgress::new(first_window);
        for tick in ticks.iter() {
            let window = self.resolution.floor(tick.ts_ms);
            if window != current.ts_ms {
                let mut gap = current.ts_ms + width;
                bars.push(current.finish());
                while gap < window {
                    bars.push(Bar::empty(gap));
                    gap += width;
                }
                current = BarInProgress::new(window);
            }
            current.add_tick(tick);
        }
        bars.push(current.finish());

        debug_assert_eq!(
            bars.len(),
            self.resolution.window_count(first_window, last_window)
        );
        Ok(bars)
    }
}

fn sorted_by_time(ticks: &[Tick]) -> Cow<'_, [Tick]> {
    if ticks.windows(2).all(|w| w[0].ts_ms <= w[1].ts_ms) {
        Cow::Borrowed(ticks)
    } else {
        let mut owned = ticks.to_vec();
        owned.sort_by_key(|t| t.ts_ms);
        Cow::Owned(owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use proptest::prelude::*;

    // 2024-01-01 00:00:00 UTC
    const T0: i64 = 1_704_067_200_000;

    fn at(minutes: i64, seconds: i64) -> i64 {
        T0 + minutes * 60_000 + seconds * 1_000
    }

    fn minute_resampler() -> Resampler {
        Resampler::new(Resolution::MINUTE)
    }

    #[test]
    fn test_two_trades_then_one() {
        let ticks = vec![
            Tick::new(at(0, 10), 100.0, 5.0),
            Tick::new(at(0, 40), 101.0, -3.0),
            Tick::new(at(1, 5), 99.0, 2.0),
        ];
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].ts_ms, at(0, 0));
        assert_eq!(bars[0].open, Some(100.0));
        assert_eq!(bars[0].high, Some(101.0));
        assert_eq!(bars[0].low, Some(100.0));
        assert_eq!(bars[0].close, Some(101.0));
        assert_relative_eq!(bars[0].volume, 8.0);
        assert_eq!(bars[0].trade_count, 2);

        assert_eq!(bars[1].ts_ms, at(1, 0));
        assert_eq!(bars[1].open, Some(99.0));
        assert_eq!(bars[1].high, Some(99.0));
        assert_eq!(bars[1].low, Some(99.0));
        assert_eq!(bars[1].close, Some(99.0));
        assert_relative_eq!(bars[1].volume, 2.0);
    }

    #[test]
    fn test_gap_produces_empty_bar() {
        let ticks = vec![Tick::new(at(0, 5), 50.0, 1.0), Tick::new(at(2, 10), 52.0, 1.0)];
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        assert_eq!(bars.len(), 3);
        assert_eq!(bars[0].close, Some(50.0));
        assert_relative_eq!(bars[0].volume, 1.0);

        assert_eq!(bars[1].ts_ms, at(1, 0));
        assert!(bars[1].is_empty());
        assert_eq!(bars[1].high, None);
        assert_eq!(bars[1].low, None);
        assert_eq!(bars[1].close, None);
        assert_eq!(bars[1].volume, 0.0);
        assert_eq!(bars[1].trade_count, 0);

        assert_eq!(bars[2].open, Some(52.0));
        assert_eq!(bars[2].low, Some(52.0));
        assert_relative_eq!(bars[2].volume, 1.0);
    }

    #[test]
    fn test_grid_is_contiguous_over_long_gaps() {
        let ticks = vec![
            Tick::new(at(0, 59), 10.0, 1.0),
            Tick::new(at(7, 0), 11.0, 1.0),
            Tick::new(at(7, 30), 12.0, 1.0),
            Tick::new(at(30, 1), 13.0, 1.0),
        ];
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        assert_eq!(bars.len(), 31);
        for pair in bars.windows(2) {
            assert_eq!(pair[1].ts_ms - pair[0].ts_ms, 60_000);
        }
        assert_eq!(bars.iter().filter(|b| !b.is_empty()).count(), 3);
        for bar in bars.iter().filter(|b| b.is_empty()) {
            assert_eq!(bar.volume, 0.0);
            assert_eq!(bar.open, None);
        }
    }

    #[test]
    fn test_tick_on_boundary_opens_next_window() {
        let ticks = vec![Tick::new(at(0, 30), 1.0, 1.0), Tick::new(at(1, 0), 2.0, 1.0)];
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        assert_eq!(bars.len(), 2);
        assert_eq!(bars[0].close, Some(1.0));
        assert_eq!(bars[1].ts_ms, at(1, 0));
        assert_eq!(bars[1].open, Some(2.0));
    }

    #[test]
    fn test_volume_is_conserved() {
        let amounts = [0.5, -1.25, 3.0, -0.75, 2.0, -4.5, 0.1];
        let ticks: Vec<Tick> = amounts
            .iter()
            .enumerate()
            .map(|(i, &a)| Tick::new(T0 + i as i64 * 47_000, 100.0 + i as f64, a))
            .collect();
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        let expected: f64 = amounts.iter().map(|a| a.abs()).sum();
        let total: f64 = bars.iter().map(|b| b.volume).sum();
        assert_relative_eq!(total, expected, epsilon = 1e-12);
    }

    #[test]
    fn test_ohlc_consistency() {
        let prices = [100.0, 103.0, 98.0, 101.0, 99.5, 104.0, 97.0, 100.5];
        let ticks: Vec<Tick> = prices
            .iter()
            .enumerate()
            .map(|(i, &p)| Tick::new(T0 + i as i64 * 20_000, p, 1.0))
            .collect();
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        assert_eq!(bars.len(), 3);
        for bar in &bars {
            let (open, high, low, close) = (
                bar.open.unwrap(),
                bar.high.unwrap(),
                bar.low.unwrap(),
                bar.close.unwrap(),
            );
            assert!(low <= open && open <= high);
            assert!(low <= close && close <= high);
        }
        // Window 0 holds ticks 0..3, window 1 ticks 3..6, window 2 ticks 6..8
        assert_eq!(bars[0].open, Some(100.0));
        assert_eq!(bars[0].close, Some(98.0));
        assert_eq!(bars[1].open, Some(101.0));
        assert_eq!(bars[1].high, Some(104.0));
        assert_eq!(bars[2].low, Some(97.0));
        assert_eq!(bars[2].close, Some(100.5));
    }

    #[test]
    fn test_ties_keep_arrival_order() {
        let ticks = vec![
            Tick::new(at(0, 10), 5.0, 1.0),
            Tick::new(at(0, 10), 6.0, 1.0),
            Tick::new(at(0, 10), 4.0, 1.0),
        ];
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        assert_eq!(bars[0].open, Some(5.0));
        assert_eq!(bars[0].close, Some(4.0));
    }

    #[test]
    fn test_unsorted_input_matches_sorted() {
        let sorted = vec![
            Tick::new(at(0, 1), 1.0, 1.0),
            Tick::new(at(0, 50), 2.0, 1.0),
            Tick::new(at(3, 0), 3.0, 2.0),
        ];
        let shuffled = vec![sorted[2], sorted[0], sorted[1]];

        let r = minute_resampler();
        assert_eq!(
            r.resample_ticks(&shuffled).unwrap(),
            r.resample_ticks(&sorted).unwrap()
        );
    }

    #[test]
    fn test_empty_input_is_rejected() {
        let err = minute_resampler().resample_ticks(&[]).unwrap_err();
        assert!(matches!(err, Error::InvalidInput(_)));
    }

    #[test]
    fn test_out_of_range_timestamps_are_rejected() {
        let r = minute_resampler();
        for ts in [i64::MIN, i64::MAX] {
            let err = r.resample_ticks(&[Tick::new(ts, 1.0, 1.0)]).unwrap_err();
            assert!(matches!(err, Error::InvalidInput(_)));
        }
        let mixed = [Tick::new(T0, 1.0, 1.0), Tick::new(i64::MAX, 2.0, 1.0)];
        assert!(r.resample_ticks(&mixed).is_err());
    }

    #[test]
    fn test_huge_width_stays_in_range() {
        let r = Resampler::new(Resolution::from_millis(i64::MAX).unwrap());
        let ticks = [Tick::new(-5, 1.0, 1.0), Tick::new(T0, 2.0, 1.0)];
        let bars = r.resample_ticks(&ticks).unwrap();

        let starts: Vec<i64> = bars.iter().map(|b| b.ts_ms).collect();
        assert_eq!(starts, vec![-i64::MAX, 0]);
    }

    #[test]
    fn test_nan_price_is_skipped() {
        let ticks = vec![
            Tick::new(at(0, 1), f64::NAN, 2.0),
            Tick::new(at(0, 2), 10.0, 1.0),
            Tick::new(at(1, 0), f64::NAN, 3.0),
            Tick::new(at(2, 0), 11.0, f64::NAN),
        ];
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        assert_eq!(bars[0].open, Some(10.0));
        assert_eq!(bars[0].high, Some(10.0));
        assert_relative_eq!(bars[0].volume, 3.0);

        // Only an unpriced tick: prices empty, volume still counted
        assert!(bars[1].is_empty());
        assert_relative_eq!(bars[1].volume, 3.0);
        assert_eq!(bars[1].trade_count, 1);

        assert_eq!(bars[2].close, Some(11.0));
        assert_eq!(bars[2].volume, 0.0);
    }

    #[test]
    fn test_pre_epoch_alignment() {
        let ticks = vec![Tick::new(-90_000, 1.0, 1.0), Tick::new(10_000, 2.0, 1.0)];
        let bars = minute_resampler().resample_ticks(&ticks).unwrap();

        let starts: Vec<i64> = bars.iter().map(|b| b.ts_ms).collect();
        assert_eq!(starts, vec![-120_000, -60_000, 0]);
        assert!(bars[1].is_empty());
    }

    #[test]
    fn test_non_minute_resolution() {
        let r = Resampler::new(Resolution::from_secs(15).unwrap());
        let ticks = vec![Tick::new(at(0, 14), 1.0, 1.0), Tick::new(at(0, 46), 2.0, 1.0)];
        let bars = r.resample_ticks(&ticks).unwrap();

        assert_eq!(bars.len(), 4);
        assert_eq!(bars[0].ts_ms, at(0, 0));
        assert_eq!(bars[3].ts_ms, at(0, 45));
    }

    #[test]
    fn test_resampling_bars_again_is_stable() {
        let ticks = vec![
            Tick::new(at(0, 5), 50.0, 1.0),
            Tick::new(at(0, 55), 51.0, -2.0),
            Tick::new(at(3, 10), 52.0, 1.5),
        ];
        let r = minute_resampler();
        let product = ProductSeries::new("BTCUSD", ticks);
        let first = r.resample(&product).unwrap();
        let second = r.resample_ticks(&first.to_ticks()).unwrap();

        assert_eq!(first.len(), second.len());
        for (a, b) in first.iter().zip(second.iter()) {
            assert_eq!(a.ts_ms, b.ts_ms);
            assert_eq!(a.close, b.close);
            assert_eq!(a.is_empty(), b.is_empty());
            assert_relative_eq!(a.volume, b.volume);
            if a.is_empty() {
                assert_eq!(b.trade_count, 0);
            }
        }
    }

    #[test]
    fn test_resampling_again_keeps_unpriced_volume() {
        let ticks = vec![
            Tick::new(at(0, 0), 10.0, 1.0),
            Tick::new(at(1, 0), f64::NAN, 5.0),
            Tick::new(at(2, 0), 11.0, 1.0),
        ];
        let r = minute_resampler();
        let first = r.resample(&ProductSeries::new("BTCUSD", ticks)).unwrap();
        let second = r.resample_ticks(&first.to_ticks()).unwrap();

        let total: f64 = second.iter().map(|b| b.volume).sum();
        assert_relative_eq!(total, 7.0);
        assert!(second[1].is_empty());
        assert_relative_eq!(second[1].volume, 5.0);
    }

    fn tick_series() -> impl Strategy<Value = Vec<Tick>> {
        let price = prop_oneof![4 => 1.0f64..1_000.0, 1 => Just(f64::NAN)];
        let amount = prop_oneof![4 => -50.0f64..50.0, 1 => Just(f64::NAN)];
        (
            -5_000_000_000i64..5_000_000_000,
            prop::collection::vec((0i64..180_000, price, amount), 1..120),
        )
            .prop_map(|(start, steps)| {
                let mut ts = start;
                steps
                    .into_iter()
                    .map(|(step, price, amount)| {
                        ts += step;
                        Tick::new(ts, price, amount)
                    })
                    .collect::<Vec<_>>()
            })
    }

    fn close_enough(a: f64, b: f64) -> bool {
        (a - b).abs() <= 1e-9 * a.abs().max(b.abs()).max(1.0)
    }

    proptest! {
        #[test]
        fn test_grid_is_contiguous_for_any_series(
            ticks in tick_series(),
            width in 1i64..600_000,
        ) {
            let resolution = Resolution::from_millis(width).unwrap();
            let bars = Resampler::new(resolution).resample_ticks(&ticks).unwrap();

            let first = resolution.floor(ticks[0].ts_ms);
            let last = resolution.floor(ticks[ticks.len() - 1].ts_ms);
            prop_assert_eq!(bars.len() as i64, (last - first) / width + 1);
            prop_assert_eq!(bars[0].ts_ms, first);
            for pair in bars.windows(2) {
                prop_assert_eq!(pair[1].ts_ms - pair[0].ts_ms, width);
            }
            let assigned: u32 = bars.iter().map(|b| b.trade_count).sum();
            prop_assert_eq!(assigned as usize, ticks.len());
        }

        #[test]
        fn test_volume_is_conserved_for_any_series(
            ticks in tick_series(),
            width in 1i64..600_000,
        ) {
            let resolution = Resolution::from_millis(width).unwrap();
            let bars = Resampler::new(resolution).resample_ticks(&ticks).unwrap();

            let expected: f64 = ticks
                .iter()
                .filter(|t| !t.amount.is_nan())
                .map(Tick::size)
                .sum();
            let total: f64 = bars.iter().map(|b| b.volume).sum();
            prop_assert!(close_enough(total, expected), "{} vs {}", total, expected);
        }

        #[test]
        fn test_ohlc_matches_window_contents(
            ticks in tick_series(),
            width in 1i64..600_000,
        ) {
            let resolution = Resolution::from_millis(width).unwrap();
            let bars = Resampler::new(resolution).resample_ticks(&ticks).unwrap();
            let origin = bars[0].ts_ms;

            let mut priced: Vec<Vec<f64>> = vec![Vec::new(); bars.len()];
            for tick in ticks.iter().filter(|t| !t.price.is_nan()) {
                let idx = ((resolution.floor(tick.ts_ms) - origin) / width) as usize;
                priced[idx].push(tick.price);
            }

            for (bar, prices) in bars.iter().zip(&priced) {
                if prices.is_empty() {
                    prop_assert!(bar.is_empty());
                    prop_assert_eq!(bar.high, None);
                    prop_assert_eq!(bar.low, None);
                    prop_assert_eq!(bar.close, None);
                    if bar.trade_count == 0 {
                        prop_assert_eq!(bar.volume, 0.0);
                    }
                    continue;
                }
                let (open, high, low, close) = (
                    bar.open.unwrap(),
                    bar.high.unwrap(),
                    bar.low.unwrap(),
                    bar.close.unwrap(),
                );
                prop_assert_eq!(open, prices[0]);
                prop_assert_eq!(close, prices[prices.len() - 1]);
                prop_assert!(low <= open && open <= high);
                prop_assert!(low <= close && close <= high);
                prop_assert_eq!(high, prices.iter().cloned().fold(f64::NEG_INFINITY, f64::max));
                prop_assert_eq!(low, prices.iter().cloned().fold(f64::INFINITY, f64::min));
            }
        }

        #[test]
        fn test_resampling_again_reproduces_bars(
            ticks in tick_series(),
            width in 1i64..600_000,
        ) {
            let r = Resampler::new(Resolution::from_millis(width).unwrap());
            let first = r.resample(&ProductSeries::new("X", ticks)).unwrap();
            let second = r.resample_ticks(&first.to_ticks()).unwrap();

            prop_assert_eq!(first.len(), second.len());
            for (a, b) in first.iter().zip(&second) {
                prop_assert_eq!(a.ts_ms, b.ts_ms);
                prop_assert_eq!(a.close, b.close);
                prop_assert_eq!(a.is_empty(), b.is_empty());
                prop_assert!(close_enough(a.volume, b.volume));
            }
        }
    }
}
