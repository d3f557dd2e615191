pub mod memory;
pub mod prompt;
pub mod router;
pub mod turn;
