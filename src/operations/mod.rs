pub mod payment;

pub use payment::{PaymentState, PaymentTracker};

#[cfg(test)]
mod tests;
