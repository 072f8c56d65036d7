//! Shuttle routines triggered from the warehouse buttons.

use super::*;
use plant::color::BoxColor;
use plant::io::{ActuatorAddr, RegisterAddr};
use plant::store::OrderConfig;
use plant_control::warehouse::SlotPos;

const STOCK_PICKUP: SensorAddr = SensorAddr(13);
const CLIENT_PICKUP: SensorAddr = SensorAddr(14);
const RETRIEVE: SensorAddr = SensorAddr(29);

fn settle(rig: &Rig, occupied: usize) {
    let shuttle = rig.plant.shuttle();
    let warehouse = rig.plant.warehouse();
    assert!(wait_for(Duration::from_secs(2), || !shuttle.is_busy()
        && warehouse.occupied_count() == occupied));
}

#[test]
fn stock_pickup_stores_the_queued_color() {
    let rig = Rig::new();
    rig.bring_up();
    rig.plant.stock().push(BoxColor::Green);

    rig.press(STOCK_PICKUP);
    settle(&rig, 7);
    assert_eq!(rig.io.register_log(RegisterAddr(0)), vec![8, 5, 300]);
    let slot = rig.plant.warehouse().slot(SlotPos::new(5, 1).unwrap());
    assert_eq!(slot.color, Some(BoxColor::Green));
    assert!(rig.plant.stock().is_empty());
}

#[test]
fn client_pickup_stores_in_client_column() {
    let rig = Rig::new();
    rig.bring_up();

    rig.press(CLIENT_PICKUP);
    settle(&rig, 7);
    let targets = rig.io.register_log(RegisterAddr(0));
    assert_eq!(targets.first(), Some(&1));
    assert_eq!(targets.last(), Some(&300));
}

#[test]
fn retrieve_frees_a_slot_of_the_order_color() {
    let rig = Rig::new();
    rig.store.set_config(OrderConfig {
        order_color: BoxColor::Blue,
        ..OrderConfig::default()
    });
    rig.bring_up();

    rig.press(RETRIEVE);
    settle(&rig, 5);
    assert_eq!(rig.io.actuator_log(ActuatorAddr(41)), vec![true, false]);
    assert!(rig.plant.warehouse().find_occupied_by_color(BoxColor::Blue).is_some());
}

#[test]
fn retrieve_without_stock_lights_not_in_store() {
    let rig = Rig::new();
    rig.bring_up();

    rig.press(RETRIEVE);
    let shuttle = rig.plant.shuttle();
    assert!(wait_for(Duration::from_secs(1), || !shuttle.is_busy()
        && rig.io.actuator_log(ActuatorAddr(43)) == vec![true, false]));
    assert_eq!(rig.plant.warehouse().occupied_count(), 6);
    assert!(rig.io.register_log(RegisterAddr(0)).is_empty());
}

#[test]
fn triggers_are_dropped_while_stopped() {
    let rig = Rig::new();
    rig.bring_up();
    rig.press(STOP);
    assert!(wait_for(Duration::from_secs(1), || rig.state() == MachineState::Stopped));

    rig.press(STOCK_PICKUP);
    assert!(!rig.plant.shuttle().is_busy());
    assert!(rig.io.register_log(RegisterAddr(0)).is_empty());
}

#[test]
fn emergency_interrupts_a_store() {
    let mut config = fast_config();
    config.simulation.register_pulses[0].busy_s = 0.3;
    let rig = Rig::with_config(config);
    rig.bring_up();
    rig.plant.stock().push(BoxColor::Green);

    rig.press(STOCK_PICKUP);
    assert!(wait_for(Duration::from_millis(200), || rig.plant.shuttle().is_busy()));
    thread::sleep(Duration::from_millis(40));
    rig.io.set_sensor(EMERGENCY, false);

    settle(&rig, 6);
    assert_eq!(rig.state(), MachineState::Emergency);
    assert_eq!(rig.io.register_log(RegisterAddr(0)), vec![8]);
    assert!(!rig.io.actuator_log(ActuatorAddr(34)).contains(&true));
    assert_eq!(rig.plant.stock().len(), 1);
}
