//! Turntable ownership across concurrent callers.

use super::*;
use plant::io::ActuatorAddr;
use plant_control::TurntableError;
use plant_control::turntable::{BeltDirection, Limit, TurntableCommand, WatchOutcome};

fn watched_forward(timeout: Duration) -> TurntableCommand {
    TurntableCommand::belt(BeltDirection::Forward).stop_at(Limit::Back, timeout)
}

#[test]
fn second_command_waits_for_the_watcher() {
    let rig = Rig::new();
    rig.bring_up();
    let tt1 = Arc::clone(rig.plant.tt1());

    tt1.execute(watched_forward(Duration::from_secs(1))).unwrap();
    assert!(tt1.is_watching());
    rig.io.schedule_sensor(SensorAddr(94), true, Duration::from_millis(100));

    let started = Instant::now();
    let second = {
        let tt1 = Arc::clone(&tt1);
        thread::spawn(move || tt1.execute(TurntableCommand::stop().turn(true)))
    };
    assert!(second.join().unwrap().is_ok());
    assert!(started.elapsed() >= Duration::from_millis(80));
    assert_eq!(tt1.last_watch_outcome(), Some(WatchOutcome::Limit));
    assert!(!rig.plant.ctx().read_actuator(ActuatorAddr(95)));
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(93)));
}

#[test]
fn command_rejected_after_guard_timeout() {
    let mut config = fast_config();
    config.turntable.guard_timeout_s = 0.1;
    let rig = Rig::with_config(config);
    rig.bring_up();
    let tt1 = Arc::clone(rig.plant.tt1());

    // The front limit never rises, so the watcher runs to its timeout.
    tt1.execute(
        TurntableCommand::belt(BeltDirection::Backward).stop_at(Limit::Front, Duration::from_millis(500)),
    )
    .unwrap();
    let err = tt1.execute(TurntableCommand::stop()).unwrap_err();
    assert!(matches!(err, TurntableError::Busy { .. }));

    assert!(wait_for(Duration::from_secs(2), || tt1.is_idle()));
    assert_eq!(tt1.last_watch_outcome(), Some(WatchOutcome::Timeout));
    assert!(!rig.plant.ctx().read_actuator(ActuatorAddr(94)));
    assert!(tt1.execute(TurntableCommand::stop()).is_ok());
}

#[test]
fn table_without_limit_sensor_runs_unwatched() {
    let rig = Rig::new();
    rig.bring_up();
    let tt2 = rig.plant.tt2();
    tt2.execute(watched_forward(Duration::from_millis(500))).unwrap();
    assert!(!tt2.is_watching());
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(40)));
    assert!(tt2.execute(TurntableCommand::stop()).is_ok());
}

#[test]
fn commands_require_running() {
    let rig = Rig::new();
    let err = rig.plant.tt1().execute(TurntableCommand::stop()).unwrap_err();
    assert!(matches!(err, TurntableError::NotRunning));
}
