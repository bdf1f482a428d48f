// UI module - GUI logic and event loop bridge
//
// This module contains:
// - EventLoopBridge: Coordinates between tokio async runtime and Slint event loop
// - EventLoopSaveTarget: Opens save dialogs on the event loop thread
// - GuiController: Wires the Slint window to state and services
// - WindowView: Plain-data view model built from state snapshots

pub mod bridge;
pub mod controller;
pub mod view;

pub use bridge::{EventLoopBridge, EventLoopBridgeHandle, EventLoopSaveTarget};
pub use controller::GuiController;
pub use view::{InputView, WindowView};
