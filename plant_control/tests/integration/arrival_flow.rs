//! Box arrival on turntable 1, from the arrival edge to production.

use super::*;
use plant::hal::LinkedSensor;
use plant::io::ActuatorAddr;
use plant_control::dispatch::ArrivalPhase;
use plant_control::lines::Line;
use plant_control::turntable::WatchOutcome;

const TT1_TURN: ActuatorAddr = ActuatorAddr(93);
const TT1_FORWARD: ActuatorAddr = ActuatorAddr(95);

fn link(actuator: u16, trigger: bool, sensor: u16, delay_s: f64) -> LinkedSensor {
    LinkedSensor {
        actuator: ActuatorAddr(actuator),
        trigger,
        sensor: SensorAddr(sensor),
        result: trigger,
        delay_s,
    }
}

/// Forward belt reaches the back limit after 100 ms. Final production
/// never fires, so discharge ends on its exit timeout.
fn linked_rig() -> Rig {
    let mut config = fast_config();
    config.arrival.green.exit_timeout_s = 0.2;
    config.arrival.blue.exit_timeout_s = 0.2;
    config.simulation.links = vec![link(95, true, 94, 0.1), link(95, false, 94, 0.0)];
    Rig::with_config(config)
}

fn transitions(mut log: Vec<bool>) -> Vec<bool> {
    log.dedup();
    log
}

#[test]
fn green_box_is_taken_returned_and_discharged() {
    let rig = linked_rig();
    rig.bring_up();

    rig.press(SensorAddr(78));
    let arrival = rig.plant.arrival();
    assert!(wait_for(Duration::from_millis(500), || arrival.is_busy()));
    assert!(wait_for(Duration::from_secs(3), || !arrival.is_busy()
        && rig.plant.lines().is_running(Line::Production)));

    assert_eq!(rig.plant.tt1().last_watch_outcome(), Some(WatchOutcome::Limit));
    assert_eq!(rig.io.actuator_log(TT1_TURN), vec![true, false]);
    assert_eq!(
        transitions(rig.io.actuator_log(TT1_FORWARD)),
        vec![true, false, true, false]
    );
    assert!(rig.plant.lines().is_running(Line::Green));
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(32)));
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(14)));
    assert!(wait_for(Duration::from_millis(200), || arrival.phase()
        == ArrivalPhase::Idle));
}

#[test]
fn arrivals_share_the_table_one_at_a_time() {
    let rig = linked_rig();
    rig.bring_up();

    rig.press(SensorAddr(78));
    rig.press(SensorAddr(81));
    let arrival = rig.plant.arrival();
    let tt1 = rig.plant.tt1();
    assert!(wait_for(Duration::from_secs(5), || {
        tt1.watcher_epoch() == 2 && arrival.pending() == 0 && !arrival.is_busy()
    }));
    assert!(wait_for(Duration::from_secs(2), || rig
        .plant
        .lines()
        .is_running(Line::Blue)));
    // Blue holds the rotation, so only the green box turns the table.
    let turns = rig.io.actuator_log(TT1_TURN);
    assert_eq!(turns.first(), Some(&true));
    assert_eq!(turns.iter().filter(|on| **on).count(), 1);
    assert!(rig.plant.lines().is_running(Line::Green));
}

#[test]
fn classification_is_not_held_behind_a_discharge() {
    let mut config = fast_config();
    config.arrival.green.exit_timeout_s = 3.0;
    config.arrival.blue.exit_timeout_s = 3.0;
    config.simulation.links = vec![link(95, true, 94, 0.1), link(95, false, 94, 0.0)];
    let rig = Rig::with_config(config);
    rig.bring_up();

    let start = Instant::now();
    rig.press(SensorAddr(78));
    rig.press(SensorAddr(81));
    rig.press(SensorAddr(90));
    assert!(wait_for(Duration::from_millis(2500), || rig.plant.stock().len() == 1));
    assert!(start.elapsed() < Duration::from_millis(2500));
    assert_eq!(rig.plant.arrival().pending(), 0);
}

#[test]
fn arrival_stops_its_line_until_released() {
    let mut config = fast_config();
    config.arrival.green.feed_delay_s = 0.3;
    let rig = Rig::with_config(config);
    rig.bring_up();
    rig.plant.lines().run(Line::Green);

    rig.press(SensorAddr(78));
    assert!(wait_for(Duration::from_millis(200), || !rig
        .plant
        .lines()
        .is_running(Line::Green)));
    assert!(wait_for(Duration::from_secs(1), || rig
        .plant
        .lines()
        .is_running(Line::Green)));
}
