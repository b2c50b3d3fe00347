// Credits: prepaid, expiring allowances that gate every AI operation.
// Callers charge here before invoking the orchestrator; the orchestrator never bills.

pub mod clock;
pub mod handlers;
pub mod ledger;
pub mod packages;
pub mod service;
pub mod store;
