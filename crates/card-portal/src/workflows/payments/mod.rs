//! Payment records: applicant-side finalization and the administrator ledger.

pub mod domain;
pub mod ledger;
pub mod stage;

pub use domain::{
    compute_total, transfer_reference, Amount, BankTransferConfirmation, FeeSchedule, NewPayment,
    Pagination, Payment, PaymentContact, PaymentId, PaymentMethod, PaymentPage, PaymentQuery,
    PaymentQuote, PaymentStatus, PaymentStatusUpdate, TransferDetails,
};
pub use ledger::{export_csv, LedgerError, LedgerFilter, LedgerPage, PaymentLedger};
pub use stage::{PaymentStage, PaymentStageError};
