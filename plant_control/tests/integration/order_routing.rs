//! Classification under the vision sensors and routing on turntable 2.

use super::*;
use plant::color::BoxColor;
use plant::io::ActuatorAddr;
use plant::store::OrderStore;
use plant_control::orders::FulfillmentMode;

const CREATE_ORDER: SensorAddr = SensorAddr(28);
const VISION_BLUE: SensorAddr = SensorAddr(88);
const VISION_GREEN: SensorAddr = SensorAddr(89);
const HALL: SensorAddr = SensorAddr(90);
const TT2_DISCHARGE: SensorAddr = SensorAddr(97);
const TT2_LOAD: SensorAddr = SensorAddr(96);
const TT2_FORWARD: ActuatorAddr = ActuatorAddr(40);

fn with_order() -> Rig {
    let rig = Rig::new();
    rig.bring_up();
    rig.press(CREATE_ORDER);
    assert!(wait_for(Duration::from_secs(1), || rig.plant.orders().has_pending()));
    assert_eq!(rig.plant.orders().mode(), FulfillmentMode::Order);
    rig
}

#[test]
fn green_box_fills_the_open_order() {
    let rig = with_order();
    assert_eq!(rig.store.persisted_orders()[0].boxes_remaining, 5);

    rig.io.set_sensor(VISION_GREEN, true);
    rig.press(HALL);
    assert!(wait_for(Duration::from_secs(1), || rig
        .plant
        .ctx()
        .read_actuator(ActuatorAddr(15))));
    rig.io.set_sensor(VISION_GREEN, false);

    rig.io.set_sensor(TT2_DISCHARGE, true);
    thread::sleep(Duration::from_millis(20));
    rig.io.set_sensor(TT2_DISCHARGE, false);
    assert!(wait_for(Duration::from_secs(1), || {
        rig.io.actuator_log(ActuatorAddr(40)).last() == Some(&false)
    }));

    let pending = rig.plant.orders().pending_orders();
    assert_eq!(pending[0].boxes_done, 1);
    assert_eq!(rig.store.persisted_orders()[0].boxes_remaining, 4);
    assert!(rig.plant.stock().is_empty());
}

#[test]
fn blue_box_goes_to_stock_once() {
    let rig = with_order();

    rig.io.set_sensor(VISION_BLUE, true);
    rig.press(HALL);
    assert!(wait_for(Duration::from_secs(1), || rig.plant.stock().len() == 1));
    rig.io.set_sensor(VISION_BLUE, false);

    assert!(wait_for(Duration::from_secs(2), || {
        rig.io.actuator_log(ActuatorAddr(38)) == vec![true, false]
    }));
    assert_eq!(rig.plant.stock().len(), 1);
    assert_eq!(rig.plant.stock().pop(), Some(BoxColor::Blue));
    assert_eq!(rig.plant.orders().pending_orders()[0].boxes_done, 0);
    assert!(rig.plant.ctx().read_actuator(ActuatorAddr(32)));
}

#[test]
fn nothing_seen_is_classified_other() {
    let rig = Rig::new();
    rig.bring_up();
    rig.press(HALL);
    assert!(wait_for(Duration::from_secs(1), || rig.plant.stock().len() == 1));
    assert_eq!(rig.plant.stock().pop(), Some(BoxColor::Other));
}

#[test]
fn load_sensor_starts_a_stock_cycle() {
    let rig = Rig::new();
    rig.bring_up();
    rig.press(TT2_LOAD);
    assert!(wait_for(Duration::from_secs(1), || rig
        .io
        .actuator_log(TT2_FORWARD)
        .contains(&true)));
    assert!(rig.plant.stock().is_empty());
}

#[test]
fn load_sensor_is_ignored_while_an_order_is_open() {
    let rig = with_order();
    rig.press(TT2_LOAD);
    thread::sleep(Duration::from_millis(150));
    assert!(!rig.io.actuator_log(TT2_FORWARD).contains(&true));
    assert_eq!(rig.plant.tt2_dispatcher().pending(), 0);
}
