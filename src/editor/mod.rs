/// Editing Layer
///
/// Interactive editing sessions over a flow: graph mutations recorded into the
/// undo/redo history, plus the ephemeral selection those mutations keep valid.

// Graph + history session
pub mod session;

// Selected node/edge state
pub mod selection;

pub use selection::Selection;
pub use session::FlowEditor;
