// State derivation over the stock ledger
pub mod item_state;

// Lifecycle services that write the ledger
pub mod items;
pub mod job_works;
pub mod movements;
pub mod purchase_indents;
pub mod purchase_orders;
