//! Emergency capture and restart restore.

use super::*;
use plant::io::ActuatorAddr;
use plant_control::lines::Line;
use plant_control::supervisor::BeltSnapshot;
use plant_control::turntable::{BeltDirection, TurntableCommand};

const TT1_FORWARD: ActuatorAddr = ActuatorAddr(95);

#[test]
fn emergency_de_energizes_and_restart_restores_belt() {
    let rig = Rig::new();
    rig.bring_up();
    rig.plant
        .tt1()
        .execute(TurntableCommand::belt(BeltDirection::Forward))
        .unwrap();
    assert!(rig.plant.ctx().read_actuator(TT1_FORWARD));

    rig.io.set_sensor(EMERGENCY, false);
    assert!(wait_for(Duration::from_secs(1), || rig.state() == MachineState::Emergency));
    assert!(wait_for(Duration::from_secs(1), || !rig
        .plant
        .ctx()
        .read_actuator(TT1_FORWARD)));
    assert_eq!(
        rig.plant.supervisor().captured_belts(),
        Some(BeltSnapshot {
            forward: true,
            backward: false
        })
    );
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(2)));

    // Restart is refused while the emergency is engaged.
    rig.press(RESTART);
    assert_eq!(rig.state(), MachineState::Emergency);

    rig.io.set_sensor(EMERGENCY, true);
    assert!(wait_for(Duration::from_secs(1), || rig.state() == MachineState::Idle));

    rig.press(RESTART);
    assert!(wait_for(Duration::from_secs(1), || rig.state() == MachineState::Running));
    assert!(rig.plant.ctx().read_actuator(TT1_FORWARD));
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(15)));
    assert!(Line::ALL.iter().all(|&l| rig.plant.lines().is_running(l)));
    assert_eq!(rig.plant.supervisor().captured_belts(), None);
}

#[test]
fn restart_release_edge_does_nothing() {
    let rig = Rig::new();
    rig.bring_up();
    rig.press(STOP);
    assert!(wait_for(Duration::from_secs(1), || rig.state() == MachineState::Stopped));

    rig.io.set_sensor(RESTART, true);
    assert!(wait_for(Duration::from_secs(1), || rig.state() == MachineState::Running));
    rig.plant.supervisor().on_stop();
    assert_eq!(rig.state(), MachineState::Stopped);

    rig.io.set_sensor(RESTART, false);
    thread::sleep(Duration::from_millis(40));
    assert_eq!(rig.state(), MachineState::Stopped);
}
