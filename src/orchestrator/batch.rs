//! Batch transfers
//!
//! Each item runs through the single-transfer saga with its own
//! compensation log. Item failures become failure results for that item.

use futures::stream::{self, StreamExt};
use rust_decimal::Decimal;

use super::TransferOrchestrator;
use crate::domain::{BankingError, TransferRequest, TransferResult};

impl TransferOrchestrator {
    /// Run independent transfers, returning one result per request in
    /// request order.
    pub async fn execute_batch(
        &self,
        requests: Vec<TransferRequest>,
    ) -> Result<Vec<(TransferRequest, TransferResult)>, BankingError> {
        if requests.is_empty() {
            return Err(BankingError::InvalidArgument(
                "The transfer list must not be empty".to_string(),
            ));
        }

        let max = self.settings.batch_max_size;
        if requests.len() > max {
            return Err(BankingError::limit_exceeded(
                "BATCH_SIZE",
                Decimal::from(max),
                Decimal::from(requests.len()),
            ));
        }

        let total = requests.len();
        let results: Vec<(TransferRequest, TransferResult)> = stream::iter(requests)
            .map(|request| async move {
                let result = match self.execute_transfer(&request).await {
                    Ok(result) => result,
                    Err(e) => TransferResult::from_error(&e),
                };
                (request, result)
            })
            .buffered(self.settings.batch_concurrency.max(1))
            .collect()
            .await;

        let succeeded = results.iter().filter(|(_, r)| r.is_success()).count();
        tracing::info!(total, succeeded, failed = total - succeeded, "Batch completed");

        Ok(results)
    }
}
