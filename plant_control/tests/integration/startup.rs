//! Operator buttons against the live scan loop.

use super::*;
use plant::io::ActuatorAddr;
use plant_control::lines::Line;

fn lamp(rig: &Rig, addr: u16) -> bool {
    rig.plant.ctx().read_actuator(ActuatorAddr(addr))
}

#[test]
fn boots_in_emergency() {
    let rig = Rig::new();
    thread::sleep(Duration::from_millis(30));
    assert_eq!(rig.state(), MachineState::Emergency);
    assert!(!lamp(&rig, 0));
    assert!(lamp(&rig, 1));
    assert!(lamp(&rig, 2));
}

#[test]
fn start_is_ignored_until_emergency_released() {
    let rig = Rig::new();
    rig.press(START);
    assert_eq!(rig.state(), MachineState::Emergency);

    rig.bring_up();
    assert!(lamp(&rig, 0));
    assert!(!lamp(&rig, 1));
    assert!(!lamp(&rig, 2));
}

#[test]
fn infeed_falling_edge_runs_its_line() {
    let rig = Rig::new();
    rig.bring_up();
    assert!(!rig.plant.lines().is_running(Line::Green));

    rig.io.set_sensor(SensorAddr(77), true);
    thread::sleep(Duration::from_millis(20));
    rig.io.set_sensor(SensorAddr(77), false);
    assert!(wait_for(Duration::from_secs(1), || rig
        .plant
        .lines()
        .is_running(Line::Green)));
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(78)));
}

#[test]
fn stop_switches_every_tracked_output_off() {
    let rig = Rig::new();
    rig.bring_up();
    rig.plant.lines().all_on();
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(15)));

    rig.press(STOP);
    assert!(wait_for(Duration::from_secs(1), || rig.state() == MachineState::Stopped));
    let tracked = rig.plant.ctx().map().actuators.tracked();
    assert!(tracked.iter().all(|&a| !rig.plant.ctx().read_actuator(a)));
    assert!(Line::ALL.iter().all(|&l| !rig.plant.lines().is_running(l)));
    assert!(lamp(&rig, 1));

    rig.press(START);
    assert!(wait_for(Duration::from_secs(1), || rig.state() == MachineState::Running));
}
