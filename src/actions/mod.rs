//! Actions module for handling AI model outputs.

mod action;
mod handler;

pub use action::{parse_action, Action, ActionError, ActionKind, ActionType, SystemButton};
pub use handler::{
    map_coordinate, map_point, ActionExecutor, MAX_WAIT_SECS, NORMALIZED_COORDINATE_MAX,
    PIXEL_COORDINATE_MIN,
};
