use lazy_static::lazy_static;
use prometheus::{register_counter_vec, CounterVec};

lazy_static! {
    pub static ref LOGINS: CounterVec = register_counter_vec!(
        "api_logins_total",
        "Login attempts by status",
        &["status"]
    )
    .unwrap();

    pub static ref INVITATIONS: CounterVec = register_counter_vec!(
        "api_invitations_total",
        "Invitations issued by role",
        &["role"]
    )
    .unwrap();

    pub static ref RESOURCE_OPS: CounterVec = register_counter_vec!(
        "api_resource_ops_total",
        "Store operations by table and operation",
        &["table", "op"]
    )
    .unwrap();

    pub static ref CHANGE_EVENTS: CounterVec = register_counter_vec!(
        "api_change_events_total",
        "Change events published by table",
        &["table"]
    )
    .unwrap();
}
