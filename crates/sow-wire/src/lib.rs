//! JSON shapes served by the calendar HTTP endpoints.

use serde::{
  Deserialize,
  Serialize
};

#[derive(
  Debug,
  Clone,
  Copy,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "lowercase")]
pub enum DayKindDto {
  Regular,
  Overflow
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarDto {
  pub year:        i64,
  pub month:       u32,
  pub day:         u32,
  pub week_day:    u32,
  pub day_of_year: u32,
  pub kind:        DayKindDto,
  pub is_sabbath:  bool
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct TimeDto {
  pub part:         u32,
  pub minute:       u32,
  pub display_text: String,
  pub progress:     f64,
  pub hand_angle:   f64
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct WheelDto {
  pub sun_rot:    f64,
  pub leader_rot: f64,
  pub civil_rot:  f64,
  pub week_rot:   f64,
  pub lunar_rot:  f64,
  pub part_rot:   f64
}

/// Full payload: everything a client needs to render the wheel.
#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
)]
#[serde(rename_all = "camelCase")]
pub struct CalendarPayload {
  pub timestamp:     String,
  pub timezone:      String,
  pub calendar:      CalendarDto,
  pub time:          TimeDto,
  pub wheel:         WheelDto,
  pub display_lines: Vec<String>
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct SummaryPayload {
  pub timestamp:   String,
  pub year:        i64,
  pub day_of_year: u32,
  /// Seconds since the unix epoch.
  pub unix:        i64,
  pub timezone:    String
}

#[derive(
  Debug,
  Clone,
  Serialize,
  Deserialize,
  PartialEq,
  Eq,
)]
pub struct ErrorBody {
  pub error: String
}

impl ErrorBody {
  pub fn new(
    message: impl Into<String>
  ) -> Self {
    Self {
      error: message.into()
    }
  }
}
