//! Applicant and back-office workflows written against `PortalBackend`.

pub mod applications;
pub mod cards;
pub mod payments;

#[cfg(test)]
mod tests;
