//! Domain models shared between the billing server and its clients

mod bill;
mod checkout;
mod order;

pub use bill::{
    Bill, BillAuditEntry, BillChanges, BillSnapshot, BillStatus, BranchContext, PaymentMethod,
    PaymentStatus, StaffIdentity,
};
pub use checkout::{GatewayCallback, PendingCheckout, SettledCheckout, StagedCheckout};
pub use order::{CartLine, Order, OrderDraft, OrderPaymentState, OrderStatus};
