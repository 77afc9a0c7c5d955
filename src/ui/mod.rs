pub mod gamepad;
pub mod input;
pub mod notification;
pub mod panel;
pub mod renderer;
pub mod sound;
pub mod state;
