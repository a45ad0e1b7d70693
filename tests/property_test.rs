use proptest::prelude::*;
use reputation_oracle::scoring::{round_probability, ScoreMapper};

proptest! {
    #[test]
    fn score_delta_is_floor_of_scaled_probability(p in 0.0f64..=1.0) {
        let delta = ScoreMapper.map(p).unwrap();
        let scaled = (p - 0.5) * 200.0;
        
        prop_assert!((-100..=100).contains(&delta));
        // Floor, up to float noise on exact integers.
        prop_assert!(delta as f64 <= scaled + 1e-9);
        prop_assert!(scaled < delta as f64 + 1.0);
    }
    
    #[test]
    fn score_delta_is_monotonic(a in 0.0f64..=1.0, b in 0.0f64..=1.0) {
        let (lo, hi) = if a <= b { (a, b) } else { (b, a) };
        prop_assert!(ScoreMapper.map(lo).unwrap() <= ScoreMapper.map(hi).unwrap());
    }
    
    #[test]
    fn out_of_range_probabilities_are_rejected(p in prop_oneof![-1e6f64..-1e-12, 1.0000001f64..1e6]) {
        prop_assert!(ScoreMapper.map(p).is_err());
    }
    
    #[test]
    fn rounded_probability_has_four_decimals(p in 0.0f64..=1.0) {
        let rounded = round_probability(p);
        prop_assert!((rounded - p).abs() <= 0.00005 + 1e-12);
        prop_assert!(((rounded * 10_000.0) - (rounded * 10_000.0).round()).abs() < 1e-6);
    }
}

#[test]
fn documented_scenarios() {
    assert_eq!(ScoreMapper.map(0.82).unwrap(), 64);
    assert_eq!(ScoreMapper.map(0.5).unwrap(), 0);
    assert_eq!(ScoreMapper.map(0.1).unwrap(), -80);
}
