//! Conversation orchestration - multi-step admin dialogues

pub mod flow;
pub mod gate;
pub mod menu;
pub mod replies;
pub mod router;
pub mod session;

pub use flow::{FieldValue, FlowDefinition, FlowId, FlowRegistry, FlowState, Validator};
pub use gate::{AdminGate, Authorization};
pub use menu::{MenuAction, MenuDispatcher};
pub use router::ConversationRouter;
pub use session::{Session, SessionGuard, SessionStore};
