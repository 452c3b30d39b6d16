use serde::Serialize;

use crate::gesture::GestureLabel;

/// Key layout of the status body.
///
/// The deployed backend receives `"Action"` for every gesture except
/// right-hand-up, which arrives under `"Name"`. `Legacy` reproduces that;
/// `Uniform` always uses `"Action"`.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum PayloadStyle {
    #[default]
    Legacy,
    Uniform,
}

impl PayloadStyle {
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "legacy" => Some(PayloadStyle::Legacy),
            "uniform" => Some(PayloadStyle::Uniform),
            _ => None,
        }
    }
}

#[derive(Debug, Serialize)]
struct StatusPayload<'a> {
    #[serde(rename = "Id")]
    id: u8,
    #[serde(rename = "Action", skip_serializing_if = "Option::is_none")]
    action: Option<&'a str>,
    #[serde(rename = "Name", skip_serializing_if = "Option::is_none")]
    name: Option<&'a str>,
}

/// Encode the status body for a label.
pub fn encode(label: GestureLabel, style: PayloadStyle) -> String {
    let text = label.action_text();
    let use_name = style == PayloadStyle::Legacy && label == GestureLabel::RightHandUp;
    let payload = StatusPayload {
        id: label.id(),
        action: (!use_name).then_some(text),
        name: use_name.then_some(text),
    };
    // Plain struct of a u8 and &str fields, serialization cannot fail.
    serde_json::to_string(&payload).unwrap_or_default()
}
