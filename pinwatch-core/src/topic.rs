//! Topic-Namen für Telemetrie: `"<device-id>/sensorNN"`, NN 1-basiert

use core::fmt::Write;

use heapless::String;

use crate::traits::PublishError;

pub const TOPIC_CAPACITY: usize = 48;

pub type Topic = String<TOPIC_CAPACITY>;

pub fn sensor_topic(device_id: &str, channel: usize) -> Result<Topic, PublishError> {
    let mut topic = Topic::new();
    write!(topic, "{}/sensor{:02}", device_id, channel + 1).map_err(|_| PublishError::TooLong)?;
    Ok(topic)
}
