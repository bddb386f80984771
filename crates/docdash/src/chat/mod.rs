//! Question answering over a processed document.

pub mod session;

pub use session::ChatSession;
