//! Typed models

mod envelope;
mod order;
mod ticket;
mod ticket_product;

pub use envelope::*;
pub use order::*;
pub use ticket::*;
pub use ticket_product::*;
