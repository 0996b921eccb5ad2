// src/strategies/signals.rs
//! Candle heuristics feeding the decision rules.

use crate::error::EngineError;
use crate::types::Bar;
use rust_decimal::Decimal;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Up,
    Down,
}

/// Direction of the latest bar plus the open where the current run of opens started.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CandleStatus {
    pub direction: Direction,
    pub ref_open: Decimal,
    pub last_close: Decimal,
}

impl CandleStatus {
    /// `last_close / ref_open - 1`
    pub fn change(&self) -> Result<Decimal, EngineError> {
        relative_change(self.last_close, self.ref_open)
    }
}

/// `price / reference - 1`, rejecting a non-positive reference.
pub fn relative_change(price: Decimal, reference: Decimal) -> Result<Decimal, EngineError> {
    if reference <= Decimal::ZERO {
        return Err(EngineError::InvalidPrice(format!(
            "reference price {} is not positive",
            reference
        )));
    }
    price
        .checked_div(reference)
        .map(|ratio| ratio - Decimal::ONE)
        .ok_or_else(|| EngineError::InvalidPrice(format!("{} / {} overflowed", price, reference)))
}

/// Classifies the latest bar and walks back through older opens while they keep
/// extending the run: strictly lower opens for an up bar, strictly higher opens
/// for a down bar. The first open that breaks the run stops the scan.
pub fn candle_status(bars: &[Bar]) -> Result<CandleStatus, EngineError> {
    let last = match bars {
        [.., _, last] => last,
        _ => {
            return Err(EngineError::NotEnoughBars {
                need: 2,
                got: bars.len(),
            })
        }
    };

    let direction = if last.close > last.open {
        Direction::Up
    } else {
        Direction::Down
    };

    let mut ref_open = last.open;
    for older in bars[..bars.len() - 1].iter().rev() {
        let breaks_run = match direction {
            Direction::Up => older.open >= ref_open,
            Direction::Down => older.open <= ref_open,
        };
        if breaks_run {
            break;
        }
        ref_open = older.open;
    }

    Ok(CandleStatus {
        direction,
        ref_open,
        last_close: last.close,
    })
}

/// True when each of the last `window` bars closed at or above its open and volume
/// never dropped from one bar to the next.
///
/// Not part of the default entry rule; see `StrategyConfig::require_volume_confirmation`.
pub fn volume_status(bars: &[Bar], window: usize) -> Result<bool, EngineError> {
    if window == 0 || bars.len() < window {
        return Err(EngineError::NotEnoughBars {
            need: window.max(1),
            got: bars.len(),
        });
    }

    let recent = &bars[bars.len() - window..];
    if recent.iter().any(Bar::is_bearish) {
        return Ok(false);
    }
    Ok(recent.windows(2).all(|w| w[1].volume >= w[0].volume))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn bars(opens: &[i64], closes: &[i64], volumes: &[i64]) -> Vec<Bar> {
        opens
            .iter()
            .zip(closes)
            .zip(volumes)
            .map(|((o, c), v)| Bar::new(Decimal::from(*o), Decimal::from(*c), Decimal::from(*v)))
            .collect()
    }

    #[test]
    fn down_run_extends_to_oldest_higher_open() {
        let series = bars(&[9, 8, 7], &[10, 9, 6], &[1, 1, 1]);
        let status = candle_status(&series).unwrap();

        assert_eq!(status.direction, Direction::Down);
        assert_eq!(status.ref_open, Decimal::from(9));
        assert_eq!(status.last_close, Decimal::from(6));
        let change = status.change().unwrap();
        assert_eq!(change.round_dp(4), Decimal::new(-3333, 4));
    }

    #[test]
    fn up_bar_stops_at_first_higher_open() {
        let series = bars(&[12, 11, 10], &[11, 10, 12], &[1, 1, 1]);
        let status = candle_status(&series).unwrap();

        assert_eq!(status.direction, Direction::Up);
        assert_eq!(status.ref_open, Decimal::from(10));
        assert_eq!(status.change().unwrap(), Decimal::new(2, 1));
    }

    #[test]
    fn up_run_extends_through_rising_opens() {
        let series = bars(&[15, 8, 9, 10], &[8, 9, 10, 13], &[1, 1, 1, 1]);
        let status = candle_status(&series).unwrap();

        assert_eq!(status.direction, Direction::Up);
        assert_eq!(status.ref_open, Decimal::from(8));
    }

    #[test]
    fn doji_counts_as_down() {
        let series = bars(&[10, 10], &[10, 10], &[1, 1]);
        let status = candle_status(&series).unwrap();

        assert_eq!(status.direction, Direction::Down);
        // equal open breaks the run immediately
        assert_eq!(status.ref_open, Decimal::from(10));
    }

    #[test]
    fn single_bar_is_rejected() {
        let series = bars(&[10], &[11], &[1]);
        assert!(matches!(
            candle_status(&series),
            Err(EngineError::NotEnoughBars { need: 2, got: 1 })
        ));
    }

    #[test]
    fn zero_reference_open_is_an_error() {
        let series = bars(&[0, 0], &[1, 1], &[1, 1]);
        let status = candle_status(&series).unwrap();
        assert!(status.change().is_err());
    }

    #[test]
    fn volume_valid_for_rising_bullish_bars() {
        let series = bars(&[5, 10, 11], &[4, 11, 12], &[9, 100, 150]);
        assert!(volume_status(&series, 2).unwrap());
    }

    #[test]
    fn volume_equal_is_still_valid() {
        let series = bars(&[10, 11], &[11, 12], &[100, 100]);
        assert!(volume_status(&series, 2).unwrap());
    }

    #[test]
    fn volume_drop_invalidates() {
        let series = bars(&[10, 11], &[11, 12], &[150, 100]);
        assert!(!volume_status(&series, 2).unwrap());
    }

    #[test]
    fn bearish_bar_invalidates() {
        let series = bars(&[10, 12], &[11, 11], &[100, 200]);
        assert!(!volume_status(&series, 2).unwrap());
    }

    #[test]
    fn bars_outside_window_are_ignored() {
        // oldest bar is bearish with huge volume but sits outside the window
        let series = bars(&[20, 10, 11, 12], &[5, 11, 12, 13], &[999, 10, 20, 30]);
        assert!(volume_status(&series, 3).unwrap());
        assert!(!volume_status(&series, 4).unwrap());
    }

    #[test]
    fn window_longer_than_series_is_rejected() {
        let series = bars(&[10, 11], &[11, 12], &[1, 2]);
        assert!(volume_status(&series, 3).is_err());
    }
}
