//! Validated inputs for each ledger operation. Anything that reaches the
//! service has a strictly positive amount and integer ids.

use crate::domain::{AccountId, Amount, EntryId};

use super::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DepositCommand {
    pub account_id: AccountId,
    pub agent_id: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WithdrawCommand {
    pub account_id: AccountId,
    pub agent_id: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TransferCommand {
    pub sender_id: AccountId,
    pub receiver_id: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PaymentCommand {
    pub account_id: AccountId,
    pub operator_id: AccountId,
    pub amount: Amount,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CancelTransactionCommand {
    pub transaction_id: EntryId,
    /// Free text for the record; blank reasons are kept as `None`.
    pub reason: Option<String>,
}

impl CancelTransactionCommand {
    pub fn new(transaction_id: EntryId, reason: impl Into<String>) -> Self {
        let reason = reason.into().trim().to_string();
        Self {
            transaction_id,
            reason: (!reason.is_empty()).then_some(reason),
        }
    }

    pub fn without_reason(transaction_id: EntryId) -> Self {
        Self {
            transaction_id,
            reason: None,
        }
    }
}

pub const DEFAULT_PAGE_SIZE: u32 = 10;
pub const MAX_PAGE_SIZE: u32 = 100;

/// One-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: u32,
    pub limit: u32,
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: 1,
            limit: DEFAULT_PAGE_SIZE,
        }
    }
}

impl PageRequest {
    pub fn new(page: Option<u32>, limit: Option<u32>) -> Result<Self, AppError> {
        let page = page.unwrap_or(1);
        let limit = limit.unwrap_or(DEFAULT_PAGE_SIZE);

        if page == 0 {
            return Err(AppError::Validation("page starts at 1".to_string()));
        }
        if limit == 0 || limit > MAX_PAGE_SIZE {
            return Err(AppError::Validation(format!(
                "limit must be between 1 and {}",
                MAX_PAGE_SIZE
            )));
        }
        Ok(Self { page, limit })
    }

    pub fn offset(&self) -> i64 {
        (self.page as i64 - 1) * self.limit as i64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_defaults() {
        let page = PageRequest::new(None, None).unwrap();
        assert_eq!(page, PageRequest::default());
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn test_page_request_offset() {
        let page = PageRequest::new(Some(3), Some(20)).unwrap();
        assert_eq!(page.offset(), 40);
    }

    #[test]
    fn test_page_request_bounds() {
        assert!(PageRequest::new(Some(0), None).is_err());
        assert!(PageRequest::new(None, Some(0)).is_err());
        assert!(PageRequest::new(None, Some(MAX_PAGE_SIZE + 1)).is_err());
        assert!(PageRequest::new(None, Some(MAX_PAGE_SIZE)).is_ok());
    }

    #[test]
    fn test_cancel_reason_is_optional() {
        assert_eq!(CancelTransactionCommand::new(1, "   ").reason, None);
        assert_eq!(
            CancelTransactionCommand::new(1, "   "),
            CancelTransactionCommand::without_reason(1)
        );
        let cmd = CancelTransactionCommand::new(1, " wrong account ");
        assert_eq!(cmd.reason.as_deref(), Some("wrong account"));
    }
}
