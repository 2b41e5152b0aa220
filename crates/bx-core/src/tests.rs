//! Unit tests for bx-core primitives.

#[cfg(test)]
mod ids {
    use crate::{BoothId, CarId, QueueId};

    #[test]
    fn index_roundtrip() {
        let id = CarId(42);
        assert_eq!(id.index(), 42);
        assert_eq!(CarId::try_from(42usize).unwrap(), id);
    }

    #[test]
    fn ordering() {
        assert!(CarId(0) < CarId(1));
        assert!(QueueId(100) > QueueId(99));
    }

    #[test]
    fn invalid_sentinels_are_max() {
        assert_eq!(CarId::INVALID.0, u32::MAX);
        assert_eq!(QueueId::INVALID.0, u16::MAX);
        assert_eq!(BoothId::INVALID.0, u16::MAX);
    }

    #[test]
    fn display() {
        assert_eq!(CarId(7).to_string(), "CarId(7)");
    }
}

#[cfg(test)]
mod geo {
    use crate::GeoPoint;

    #[test]
    fn zero_distance() {
        let p = GeoPoint::new(31.766, -106.451);
        assert!(p.distance_m(p) < 0.01);
    }

    #[test]
    fn one_degree_latitude() {
        // ~1 degree of latitude ≈ 111 km
        let a = GeoPoint::new(31.0, -106.0);
        let b = GeoPoint::new(32.0, -106.0);
        let d = a.distance_m(b);
        assert!((d - 111_195.0).abs() < 500.0, "got {d}");
    }

    #[test]
    fn bearing_cardinal_directions() {
        let origin = GeoPoint::new(31.0, -106.0);
        let north = GeoPoint::new(31.01, -106.0);
        let east = GeoPoint::new(31.0, -105.99);
        assert!(origin.bearing_deg_to(north).abs() < 0.5);
        assert!((origin.bearing_deg_to(east) - 90.0).abs() < 0.5);
    }

    #[test]
    fn lerp_midpoint() {
        let a = GeoPoint::new(0.0, 0.0);
        let b = GeoPoint::new(2.0, 4.0);
        let mid = a.lerp(b, 0.5);
        assert_eq!(mid.lat, 1.0);
        assert_eq!(mid.lon, 2.0);
    }
}

#[cfg(test)]
mod rng {
    use crate::SimRng;

    #[test]
    fn deterministic_same_seed() {
        let mut r1 = SimRng::new(12345);
        let mut r2 = SimRng::new(12345);
        for _ in 0..100 {
            assert_eq!(r1.exponential(2.0), r2.exponential(2.0));
            assert_eq!(r1.gaussian(0.0, 1.0), r2.gaussian(0.0, 1.0));
        }
    }

    #[test]
    fn exponential_mean() {
        let mut rng = SimRng::new(7);
        let rate = 4.0;
        let n = 20_000;
        let mean: f64 = (0..n).map(|_| rng.exponential(rate)).sum::<f64>() / n as f64;
        let expected = 1.0 / rate;
        assert!(
            (mean - expected).abs() < expected * 0.05,
            "mean {mean} too far from {expected}"
        );
    }

    #[test]
    fn exponential_zero_rate_never_fires() {
        let mut rng = SimRng::new(0);
        assert!(rng.exponential(0.0).is_infinite());
        assert!(rng.exponential(-1.0).is_infinite());
    }

    #[test]
    fn gaussian_zero_std_is_exact() {
        let mut rng = SimRng::new(0);
        assert_eq!(rng.gaussian(5.0, 0.0), 5.0);
    }

    #[test]
    fn gen_range_in_bounds() {
        let mut rng = SimRng::new(0);
        for _ in 0..1000 {
            let v = rng.gen_range(0.0f64..1.0);
            assert!((0.0..1.0).contains(&v));
        }
    }
}

#[cfg(test)]
mod clock {
    use std::time::{Duration, Instant};

    use crate::SimClock;

    #[test]
    fn wall_slice_scales_by_time_factor() {
        let mut clock = SimClock::new(0, 10.0).with_max_slice(f64::INFINITY);
        let t0 = Instant::now();
        clock.mark_wall(t0);
        let dt = clock.wall_slice(t0 + Duration::from_millis(50));
        assert!((dt - 0.5).abs() < 1e-9, "got {dt}");
    }

    #[test]
    fn wall_slice_clamped() {
        let mut clock = SimClock::new(0, 1.0); // default 1 s cap
        let t0 = Instant::now();
        clock.mark_wall(t0);
        let dt = clock.wall_slice(t0 + Duration::from_secs(3600));
        assert_eq!(dt, 1.0, "a long pause must not produce a huge slice");
    }

    #[test]
    fn first_slice_without_mark_is_zero() {
        let mut clock = SimClock::new(0, 1.0);
        assert_eq!(clock.wall_slice(Instant::now()), 0.0);
    }

    #[test]
    fn advance_accumulates() {
        let mut clock = SimClock::new(1_700_000_000, 1.0);
        clock.advance(0.25);
        clock.advance(0.75);
        assert_eq!(clock.sim_time(), 1.0);
        assert_eq!(clock.unix_time_at(clock.sim_time()), 1_700_000_001.0);
    }
}

#[cfg(test)]
mod config {
    use crate::{ArrivalProfile, BorderConfig, PhoneConfig, SimulationConfig};

    #[test]
    fn defaults_validate() {
        BorderConfig::default().validate().unwrap();
        SimulationConfig::default().validate().unwrap();
        PhoneConfig::default().validate().unwrap();
    }

    #[test]
    fn node_count_mismatch_rejected() {
        let cfg = BorderConfig {
            num_queues: 2,
            nodes_per_queue: vec![1, 1, 1],
            ..BorderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn service_rate_count_mismatch_rejected() {
        let cfg = BorderConfig {
            num_queues: 1,
            nodes_per_queue: vec![2],
            service_rates: vec![3.0],
            ..BorderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn non_positive_rates_rejected() {
        let cfg = BorderConfig {
            num_queues: 1,
            nodes_per_queue: vec![1],
            service_rates: vec![0.0],
            ..BorderConfig::default()
        };
        assert!(cfg.validate().is_err());

        let cfg = BorderConfig {
            arrival_rate: -1.0,
            ..BorderConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn unknown_keys_rejected() {
        let err = serde_json::from_str::<BorderConfig>(r#"{"num_queues": 1, "lanes": 4}"#);
        assert!(err.is_err(), "unknown key must fail deserialization");
    }

    #[test]
    fn partial_json_fills_defaults() {
        let cfg: SimulationConfig =
            serde_json::from_str(r#"{"max_simulation_time": 120.0}"#).unwrap();
        assert_eq!(cfg.max_simulation_time, 120.0);
        assert_eq!(cfg.time_factor, 1.0);
        assert!(cfg.enable_telemetry);
    }

    #[test]
    fn assignment_snake_case_names() {
        let cfg: BorderConfig =
            serde_json::from_str(r#"{"queue_assignment": "round_robin"}"#).unwrap();
        assert_eq!(
            cfg.queue_assignment,
            crate::QueueAssignment::RoundRobin
        );
    }

    #[test]
    fn daily_profile_factors() {
        let p = ArrivalProfile::Daily;
        assert_eq!(p.factor_at(7.0 * 3600.0), 0.75); // morning rush
        assert_eq!(p.factor_at(17.0 * 3600.0), 0.9); // evening rush
        assert_eq!(p.factor_at(23.0 * 3600.0), 0.1); // night
        assert_eq!(p.factor_at(12.0 * 3600.0), 0.25); // off-peak
        assert_eq!(ArrivalProfile::Constant.factor_at(7.0 * 3600.0), 1.0);
    }
}
