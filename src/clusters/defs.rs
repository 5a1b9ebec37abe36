//! Cluster, attribute and command id tables.

pub mod cluster {
    pub const ON_OFF: u32 = 0x0006;
    pub const LEVEL_CONTROL: u32 = 0x0008;
    pub const BINDING: u32 = 0x001e;
    pub const ACCESS_CONTROL: u32 = 0x001f;
    pub const DESCRIPTOR: u32 = 0x001d;
    pub const BASIC_INFORMATION: u32 = 0x0028;
    pub const GENERAL_COMMISSIONING: u32 = 0x0030;
    pub const ADMINISTRATOR_COMMISSIONING: u32 = 0x003c;
    pub const OPERATIONAL_CREDENTIALS: u32 = 0x003e;
    pub const THERMOSTAT: u32 = 0x0201;
    pub const COLOR_CONTROL: u32 = 0x0300;
    pub const TEMPERATURE_MEASUREMENT: u32 = 0x0402;
    pub const THREAD_BORDER_ROUTER_MANAGEMENT: u32 = 0x0452;

    // Espressif vendor clusters
    pub const RAINMAKER: u32 = 320601088;
    pub const RAINMAKER_CONTROLLER: u32 = 320601089;
    pub const BORDER_ROUTER: u32 = 320601090;
    pub const PARTICIPANT_DATA: u32 = 320601091;
}

pub mod on_off {
    pub const ATTR_ON_OFF: u32 = 0x0000;
    pub const CMD_OFF: u32 = 0x00;
    pub const CMD_ON: u32 = 0x01;
    pub const CMD_TOGGLE: u32 = 0x02;
}

pub mod level {
    pub const ATTR_CURRENT_LEVEL: u32 = 0x0000;
    pub const CMD_MOVE_TO_LEVEL: u32 = 0x00;
}

pub mod color {
    pub const ATTR_CURRENT_HUE: u32 = 0x0000;
    pub const ATTR_CURRENT_SATURATION: u32 = 0x0001;
    pub const CMD_MOVE_TO_HUE: u32 = 0x00;
    pub const CMD_MOVE_TO_SATURATION: u32 = 0x03;
}

pub mod thermostat {
    pub const ATTR_LOCAL_TEMPERATURE: u32 = 0x0000;
    pub const ATTR_OCCUPIED_COOLING_SETPOINT: u32 = 0x0011;
    pub const ATTR_OCCUPIED_HEATING_SETPOINT: u32 = 0x0012;
    pub const ATTR_CONTROL_SEQUENCE: u32 = 0x001b;
    pub const ATTR_SYSTEM_MODE: u32 = 0x001c;
}

pub mod temperature_measurement {
    pub const ATTR_MEASURED_VALUE: u32 = 0x0000;
}

pub mod descriptor {
    pub const ATTR_DEVICE_TYPE_LIST: u32 = 0x0000;
    pub const ATTR_SERVER_LIST: u32 = 0x0001;
    pub const ATTR_CLIENT_LIST: u32 = 0x0002;
    pub const ATTR_PARTS_LIST: u32 = 0x0003;
}

pub mod basic_information {
    pub const ATTR_VENDOR_NAME: u32 = 0x0001;
    pub const ATTR_VENDOR_ID: u32 = 0x0002;
    pub const ATTR_PRODUCT_NAME: u32 = 0x0003;
    pub const ATTR_PRODUCT_ID: u32 = 0x0004;
    pub const ATTR_NODE_LABEL: u32 = 0x0005;
    pub const ATTR_SOFTWARE_VERSION: u32 = 0x0009;
    pub const ATTR_SOFTWARE_VERSION_STRING: u32 = 0x000a;
    pub const ATTR_SERIAL_NUMBER: u32 = 0x000f;
}

pub mod access_control {
    pub const ATTR_ACL: u32 = 0x0000;

    pub const PRIVILEGE_OPERATE: u64 = 3;
    pub const PRIVILEGE_ADMINISTER: u64 = 5;
    pub const AUTH_MODE_CASE: u64 = 2;
}

pub mod binding {
    pub const ATTR_BINDING: u32 = 0x0000;
}

pub mod general_commissioning {
    pub const CMD_ARM_FAIL_SAFE: u32 = 0x00;
    pub const CMD_COMMISSIONING_COMPLETE: u32 = 0x04;
}

pub mod thread_br_management {
    pub const ATTR_BORDER_ROUTER_NAME: u32 = 0x0000;
    pub const ATTR_BORDER_AGENT_ID: u32 = 0x0001;
    pub const ATTR_THREAD_VERSION: u32 = 0x0002;
    pub const ATTR_INTERFACE_ENABLED: u32 = 0x0003;
    pub const ATTR_ACTIVE_DATASET_TIMESTAMP: u32 = 0x0004;
    pub const ATTR_FEATURE_MAP: u32 = 0xfffc;

    pub const CMD_GET_ACTIVE_DATASET: u32 = 0x00;
    pub const CMD_GET_PENDING_DATASET: u32 = 0x01;
    pub const CMD_SET_ACTIVE_DATASET: u32 = 0x03;
    pub const CMD_SET_PENDING_DATASET: u32 = 0x04;

    /// Feature map bit: device accepts a pending dataset.
    pub const FEATURE_PAN_CHANGE: u64 = 1 << 0;
}

pub mod rainmaker {
    pub const ATTR_RAINMAKER_NODE_ID: u32 = 1;
    pub const ATTR_CHALLENGE: u32 = 2;
    pub const CMD_SEND_NODE_ID: u32 = 1;
}

pub mod rainmaker_controller {
    pub const ATTR_REFRESH_TOKEN: u32 = 0;
    pub const ATTR_ACCESS_TOKEN: u32 = 1;
    pub const ATTR_AUTHORIZED: u32 = 2;
    pub const ATTR_USER_NOC_INSTALLED: u32 = 3;
    pub const ATTR_ENDPOINT_URL: u32 = 4;

    pub const CMD_APPEND_REFRESH_TOKEN: u32 = 0;
    pub const CMD_RESET_REFRESH_TOKEN: u32 = 1;
    pub const CMD_AUTHORIZE: u32 = 2;
    pub const CMD_UPDATE_USER_NOC: u32 = 3;
    pub const CMD_UPDATE_DEVICE_LIST: u32 = 4;
}

pub mod border_router {
    pub const ATTR_ACTIVE_DATASET: u32 = 0;
    pub const ATTR_BORDER_AGENT_ID: u32 = 2;

    pub const CMD_CONFIGURE_DATASET: u32 = 0;
    pub const CMD_START_NETWORK: u32 = 1;
    pub const CMD_STOP_NETWORK: u32 = 2;
}

pub mod participant_data {
    pub const ATTR_NAME: u32 = 0;
    pub const ATTR_COMPANY_NAME: u32 = 1;
    pub const ATTR_EMAIL: u32 = 2;
    pub const ATTR_CONTACT: u32 = 3;
    pub const ATTR_EVENT_NAME: u32 = 4;
    pub const CMD_SEND_DATA: u32 = 0;
}
