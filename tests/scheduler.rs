use std::time::Duration;

use hot_potato_governor::config::SchedulerConfig;
use hot_potato_governor::driver::{Arrival, Driver, TraceFrame};
use hot_potato_governor::{
    Grid, MasterRotationMigrator, MigrationRecord, Migrator, RotationConfig, Snapshot,
    ThermalThresholds,
};

fn config() -> SchedulerConfig {
    let mut config = SchedulerConfig::default();
    config.grid = Grid::new(1, 8);
    config.dvfs.min_frequency = 1000;
    config.dvfs.max_frequency = 4000;
    config.dvfs.thermal = ThermalThresholds::new(80.0, 70.0);
    config.rotation = RotationConfig {
        start_interval: Duration::from_micros(1000),
        min_interval: Duration::from_micros(400),
        increment_step: Duration::from_micros(300),
        thermal: ThermalThresholds::new(80.0, 70.0),
    };
    config
}

fn frame(time_us: u64, temperature: f64) -> TraceFrame {
    TraceFrame {
        time_ns: time_us * 1000,
        cores: Snapshot::uniform(8, 2000, temperature, 0.5),
        active: None,
        tasks: None,
        departures: Vec::new(),
        arrivals: Vec::new(),
    }
}

fn swap(from_core: usize, to_core: usize) -> MigrationRecord {
    MigrationRecord {
        from_core,
        to_core,
        swap: true,
    }
}

#[test]
fn test_two_tasks_rotate_and_throttle() {
    let mut driver = Driver::new(&config());

    let mut first = frame(1000, 60.0);
    first.arrivals = vec![Arrival { task: 0, cores: 4 }, Arrival { task: 1, cores: 4 }];
    let decision = driver.step(&first).unwrap();
    assert!(decision.rejected.is_empty());
    assert_eq!(driver.tasks(), &[0, 0, 0, 0, 1, 1, 1, 1]);
    assert_eq!(decision.frequencies, vec![2000; 8]);
    assert_eq!(decision.migrations, vec![swap(0, 1), swap(4, 5)]);

    // too early for another pass
    let decision = driver.step(&frame(1500, 60.0)).unwrap();
    assert!(decision.migrations.is_empty());

    let decision = driver.step(&frame(2000, 90.0)).unwrap();
    assert_eq!(decision.frequencies, vec![1000; 8]);
    assert_eq!(decision.migrations, vec![swap(1, 2), swap(5, 6)]);
    let migrator = driver.hot_potato().migrator();
    assert_eq!(migrator.current_interval(), Duration::from_micros(700));

    // the shorter interval already allows the next pass
    let decision = driver.step(&frame(2700, 90.0)).unwrap();
    assert_eq!(decision.migrations, vec![swap(2, 3), swap(6, 7)]);
    assert_eq!(
        driver.hot_potato().migrator().current_interval(),
        Duration::from_micros(400)
    );
    // tasks never leave their own cores
    assert_eq!(driver.tasks(), &[0, 0, 0, 0, 1, 1, 1, 1]);
}

#[test]
fn test_departure_and_recovery() {
    let mut driver = Driver::new(&config());
    let mut first = frame(1000, 60.0);
    first.arrivals = vec![Arrival { task: 0, cores: 4 }, Arrival { task: 1, cores: 4 }];
    driver.step(&first).unwrap();
    driver.step(&frame(2000, 90.0)).unwrap();
    driver.step(&frame(2700, 90.0)).unwrap();

    let mut leave = frame(3100, 60.0);
    leave.departures = vec![1];
    let decision = driver.step(&leave).unwrap();
    assert_eq!(driver.tasks(), &[0, 0, 0, 0, -1, -1, -1, -1]);
    assert_eq!(
        decision.frequencies,
        vec![2000, 2000, 2000, 2000, 1000, 1000, 1000, 1000]
    );
    // the surviving master sat on the departed task's cores
    assert!(decision.migrations.is_empty());
    let migrator = driver.hot_potato().migrator();
    assert_eq!(migrator.current_interval(), Duration::from_micros(1000));
    assert_eq!(migrator.total_masters(), 0);

    // the remaining group gets a master again
    let decision = driver.step(&frame(4100, 60.0)).unwrap();
    assert_eq!(decision.migrations, vec![swap(0, 1)]);
    assert_eq!(driver.hot_potato().migrator().total_masters(), 1);
}

#[test]
fn test_oversized_arrival_is_rejected() {
    let mut driver = Driver::new(&config());
    let mut first = frame(1000, 60.0);
    first.arrivals = vec![Arrival { task: 3, cores: 6 }, Arrival { task: 4, cores: 3 }];
    let decision = driver.step(&first).unwrap();
    assert_eq!(decision.rejected, vec![4]);
    assert_eq!(driver.tasks(), &[3, 3, 3, 3, 3, 3, -1, -1]);
}

#[test]
fn test_mismatched_frame_is_an_error() {
    let mut driver = Driver::new(&config());
    let mut bad = frame(1000, 60.0);
    bad.active = Some(vec![true; 4]);
    assert!(driver.step(&bad).is_err());
}

#[test]
fn test_instances_do_not_share_state() {
    let grid = Grid::new(1, 4);
    let mut a = MasterRotationMigrator::new(grid, RotationConfig::default());
    let mut b = MasterRotationMigrator::new(grid, RotationConfig::default());
    let snapshot = Snapshot::uniform(4, 2000, 60.0, 0.5);
    let start = RotationConfig::default().start_interval;

    let out = a.next_migrations(start, &snapshot, &[0; 4], &[true; 4]).unwrap();
    assert_eq!(out.len(), 1);
    assert_eq!(b.last_migration(), Duration::ZERO);
    let out = b.next_migrations(start, &snapshot, &[0; 4], &[true; 4]).unwrap();
    assert_eq!(out.len(), 1);
}
