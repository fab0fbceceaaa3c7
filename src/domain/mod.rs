// Domain layer - Pure models and rules, no I/O
pub mod display;
pub mod error;
pub mod fantasy;
pub mod live;
pub mod resolution;
pub mod widget;
pub mod widget_type;
