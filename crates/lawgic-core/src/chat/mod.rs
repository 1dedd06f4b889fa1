mod attachment;
mod controller;

pub use attachment::PendingAttachment;
pub use controller::{
    ChatController, ChatView, ControllerOptions, IgnoreReason, TurnEvent, TurnOutcome, TurnPhase,
};
